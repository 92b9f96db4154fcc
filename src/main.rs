// Copyright (c) 2026 rezky_nightky

mod canvas;
mod color;
mod config;
mod encoder;
mod input;
mod logging;
mod pacer;
mod terminal;

use std::io;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::thread;

use clap::Parser;

#[cfg(unix)]
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook::iterator::Signals;

use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::{Args, Settings};
use crate::input::KeyEvent;
use crate::pacer::FramePacer;
use crate::terminal::{restore_terminal_best_effort, Console, MinSize};

fn build_info() -> &'static str {
    env!("BLOCKPIX_BUILD")
}

/// Set from the signal thread; the loop exits and the console guard restores
/// the terminal before the process ends.
struct StopFlag {
    requested: AtomicBool,
    signal: AtomicI32,
}

impl StopFlag {
    fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            signal: AtomicI32::new(0),
        }
    }

    fn request(&self, signal: i32) {
        self.signal.store(signal, Ordering::SeqCst);
        self.requested.store(true, Ordering::SeqCst);
    }

    fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

fn install_stop_handlers(stop: &Arc<StopFlag>) {
    #[cfg(unix)]
    {
        match Signals::new([SIGINT, SIGTERM, SIGHUP]) {
            Ok(mut signals) => {
                let stop = Arc::clone(stop);
                thread::spawn(move || {
                    if let Some(sig) = signals.forever().next() {
                        stop.request(sig);
                    }
                });
            }
            Err(e) => tracing::warn!(error = %e, "failed to install signal handlers"),
        }
    }

    #[cfg(windows)]
    {
        let stop = Arc::clone(stop);
        // SIGINT's number, so the exit status matches the unix path.
        if let Err(e) = ctrlc::set_handler(move || stop.request(2)) {
            eprintln!("failed to install Ctrl-C handler: {}", e);
        }
    }
}

fn draw_demo_scene(canvas: &mut Canvas) {
    canvas.clear(Color::BLACK);
    canvas.draw_pixel(0, 0, Color::rgb(255, 0, 0));
    canvas.draw_pixel(2, 2, Color::rgb(0, 255, 0));
    canvas.draw_line(4, 4, 40, 20, Color::rgb(255, 0, 0));
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameOutcome {
    Drawn,
    TooSmall,
    SizeUnavailable,
}

fn run(
    term: &mut dyn Console,
    canvas: &Canvas,
    settings: &Settings,
    stop: &StopFlag,
) -> io::Result<()> {
    let min = MinSize::for_resolution(canvas.width(), canvas.height());
    let mut pacer = FramePacer::new();
    let end_time = settings
        .duration_s
        .map(|s| Instant::now() + Duration::from_secs_f64(s));
    let mut last_outcome: Option<FrameOutcome> = None;
    let mut frames: u64 = 0;

    loop {
        if stop.is_requested() {
            tracing::info!("stop requested");
            break;
        }
        if end_time.is_some_and(|end| Instant::now() >= end) {
            tracing::info!("duration elapsed");
            break;
        }

        let keys = term.poll_keys()?;
        if !keys.is_empty() {
            tracing::trace!(?keys, "input");
        }
        if keys.contains(&KeyEvent::Escape) {
            tracing::info!("escape pressed");
            break;
        }

        let outcome = match term.size() {
            Ok((cols, rows)) if min.is_renderable(cols, rows) => {
                term.render(canvas, cols, rows)?;
                frames += 1;
                FrameOutcome::Drawn
            }
            Ok((cols, rows)) => {
                if last_outcome != Some(FrameOutcome::TooSmall) {
                    tracing::warn!(
                        cols,
                        rows,
                        min_cols = min.cols,
                        min_rows = min.rows,
                        "terminal too small, skipping frames"
                    );
                }
                FrameOutcome::TooSmall
            }
            Err(e) => {
                if last_outcome != Some(FrameOutcome::SizeUnavailable) {
                    tracing::warn!(error = %e, "terminal size unavailable, skipping frames");
                }
                FrameOutcome::SizeUnavailable
            }
        };
        if outcome == FrameOutcome::Drawn && last_outcome != Some(FrameOutcome::Drawn) {
            tracing::info!("rendering");
        }
        last_outcome = Some(outcome);

        pacer.limit(settings.fps);
    }

    tracing::info!(frames, "run loop finished");
    Ok(())
}

fn main() -> io::Result<()> {
    std::panic::set_hook(Box::new(|info| {
        restore_terminal_best_effort();
        eprintln!("{}", info);
    }));

    let args = Args::parse();

    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.info {
        println!("Version: v{}", env!("CARGO_PKG_VERSION"));
        println!("Build: {}", build_info());
        println!("Copyright: (c) 2026 {}", env!("CARGO_PKG_AUTHORS"));
        println!("License: {}", env!("CARGO_PKG_LICENSE"));
        return Ok(());
    }

    let settings = match Settings::from_args(&args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(args.log_file.as_deref()) {
        eprintln!("failed to open log file: {}", e);
        std::process::exit(1);
    }

    let stop = Arc::new(StopFlag::new());
    install_stop_handlers(&stop);

    let mut canvas = Canvas::new(settings.width, settings.height);
    draw_demo_scene(&mut canvas);

    tracing::info!(
        backend = ?settings.backend,
        width = settings.width,
        height = settings.height,
        fps = settings.fps,
        build = build_info(),
        "starting"
    );

    let result = {
        let mut term = terminal::open(settings.backend)?;
        run(term.as_mut(), &canvas, &settings, &stop)
        // `term` drops here and gives the terminal back, on error too.
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "run loop failed");
    }

    let sig = stop.signal.load(Ordering::SeqCst);
    if sig != 0 {
        result?;
        std::process::exit(128 + sig);
    }
    result
}
