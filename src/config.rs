// Copyright (c) 2026 rezky_nightky

use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_FPS: f64 = 15.0;
pub const DEFAULT_WIDTH: usize = 300;
pub const DEFAULT_HEIGHT: usize = 300;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// 24-bit escape sequences, raw stdin bytes
    #[value(name = "ansi")]
    Ansi,
    /// 16 console colors, crossterm input events
    #[value(name = "console")]
    Console,
}

impl Backend {
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Backend::Console
        } else {
            Backend::Ansi
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "blockpix", version, disable_version_flag = true)]
pub struct Args {
    #[arg(
        short = 'f',
        long = "fps",
        default_value_t = DEFAULT_FPS,
        help_heading = "GENERAL",
        help = "Target FPS (min 1 max 240)"
    )]
    pub fps: f64,

    #[arg(
        long = "width",
        default_value_t = DEFAULT_WIDTH,
        help_heading = "CANVAS",
        help = "Canvas width in pixels (min 1 max 1000)"
    )]
    pub width: usize,

    #[arg(
        long = "height",
        default_value_t = DEFAULT_HEIGHT,
        help_heading = "CANVAS",
        help = "Canvas height in pixels, two per terminal row (min 2 max 2000)"
    )]
    pub height: usize,

    #[arg(
        long = "backend",
        value_enum,
        help_heading = "GENERAL",
        help = "Output path: ansi (true-color) or console (16 colors) [default: platform]"
    )]
    pub backend: Option<Backend>,

    #[arg(
        long = "duration",
        help_heading = "GENERAL",
        help = "Stop after N seconds (min 0.1 max 86400; <=0 disables)"
    )]
    pub duration: Option<f64>,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        help_heading = "DIAGNOSTICS",
        help = "Write logs to PATH (filter with RUST_LOG, default info)"
    )]
    pub log_file: Option<PathBuf>,

    #[arg(
        long = "info",
        help_heading = "HELP",
        help = "Print build information and exit"
    )]
    pub info: bool,

    #[arg(
        short = 'v',
        long = "version",
        help_heading = "HELP",
        help = "Print version and exit"
    )]
    pub version: bool,
}

/// Validated run settings.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub fps: f64,
    pub width: usize,
    pub height: usize,
    pub backend: Backend,
    pub duration_s: Option<f64>,
}

fn require_f64_range(name: &str, v: f64, min: f64, max: f64) -> Result<f64, String> {
    if !v.is_finite() {
        return Err(format!("failed to apply {} {} (must be a finite number)", name, v));
    }
    if v < min || v > max {
        return Err(format!("failed to apply {} {} (min {} max {})", name, v, min, max));
    }
    Ok(v)
}

fn require_usize_range(name: &str, v: usize, min: usize, max: usize) -> Result<usize, String> {
    if v < min || v > max {
        return Err(format!("failed to apply {} {} (min {} max {})", name, v, min, max));
    }
    Ok(v)
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self, String> {
        let fps = require_f64_range("--fps", args.fps, 1.0, 240.0)?;
        let width = require_usize_range("--width", args.width, 1, 1000)?;
        let height = require_usize_range("--height", args.height, 2, 2000)?;

        let duration_s = match args.duration {
            None => None,
            Some(s) if !s.is_finite() => {
                return Err(format!(
                    "failed to apply --duration {} (must be a finite number)",
                    s
                ))
            }
            Some(s) if s <= 0.0 => None,
            Some(s) => Some(require_f64_range("--duration", s, 0.1, 86400.0)?),
        };

        Ok(Self {
            fps,
            width,
            height,
            backend: args.backend.unwrap_or_else(Backend::platform_default),
            duration_s,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        let mut full = vec!["blockpix"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn defaults_match_the_reference_canvas() {
        let s = Settings::from_args(&parse(&[])).unwrap();
        assert_eq!(s.fps, 15.0);
        assert_eq!((s.width, s.height), (300, 300));
        assert_eq!(s.backend, Backend::platform_default());
        assert_eq!(s.duration_s, None);
    }

    #[test]
    fn backend_and_canvas_flags_parse() {
        let s = Settings::from_args(&parse(&[
            "--backend", "console", "--width", "80", "--height", "48", "-f", "30",
        ]))
        .unwrap();
        assert_eq!(s.backend, Backend::Console);
        assert_eq!((s.width, s.height), (80, 48));
        assert_eq!(s.fps, 30.0);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(Settings::from_args(&parse(&["--fps", "0"])).is_err());
        assert!(Settings::from_args(&parse(&["--fps", "241"])).is_err());
        assert!(Settings::from_args(&parse(&["--width", "0"])).is_err());
        assert!(Settings::from_args(&parse(&["--height", "1"])).is_err());
        assert!(Settings::from_args(&parse(&["--duration", "0.01"])).is_err());
    }

    #[test]
    fn non_positive_duration_disables_the_limit() {
        let s = Settings::from_args(&parse(&["--duration", "0"])).unwrap();
        assert_eq!(s.duration_s, None);
        let s = Settings::from_args(&parse(&["--duration", "2.5"])).unwrap();
        assert_eq!(s.duration_s, Some(2.5));
    }

    #[test]
    fn unknown_backend_fails_to_parse() {
        assert!(Args::try_parse_from(["blockpix", "--backend", "vga"]).is_err());
    }
}
