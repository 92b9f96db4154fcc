// Copyright (c) 2026 rezky_nightky

use std::io::{stdout, Result, Stdout, Write};

use crossterm::{
    cursor, event,
    style::{
        Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
        SetForegroundColor,
    },
    terminal, ExecutableCommand, QueueableCommand,
};

use crate::canvas::Canvas;
use crate::color::{nearest_console_color, unpack};
use crate::config::Backend;
use crate::encoder::HALF_BLOCK;
use crate::input::KeyEvent;

/// Current terminal size in character cells.
pub fn query_size() -> Result<(u16, u16)> {
    terminal::size()
}

/// Smallest terminal that can show the whole canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinSize {
    pub cols: u16,
    pub rows: u16,
}

impl MinSize {
    /// One column per pixel, one row per pair of pixel rows.
    pub fn for_resolution(width: usize, height: usize) -> Self {
        Self {
            cols: u16::try_from(width).unwrap_or(u16::MAX),
            rows: u16::try_from(height / 2).unwrap_or(u16::MAX),
        }
    }

    pub fn is_renderable(&self, cols: u16, rows: u16) -> bool {
        cols >= self.cols && rows >= self.rows
    }
}

/// One platform path for terminal input and output. Implementations own
/// the terminal state they change and give it back when dropped.
pub trait Console {
    fn size(&self) -> Result<(u16, u16)> {
        query_size()
    }

    /// Key events that arrived since the last call. Never blocks.
    fn poll_keys(&mut self) -> Result<Vec<KeyEvent>>;

    /// Draws as much of `canvas` as fits in `cols` x `rows`.
    fn render(&mut self, canvas: &Canvas, cols: u16, rows: u16) -> Result<()>;
}

/// Takes over the terminal for `backend`. The returned console restores the
/// terminal when dropped.
pub fn open(backend: Backend) -> Result<Box<dyn Console>> {
    match backend {
        #[cfg(unix)]
        Backend::Ansi => Ok(Box::new(ansi::AnsiConsole::new()?)),
        #[cfg(not(unix))]
        Backend::Ansi => Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "the ansi backend needs a unix terminal",
        )),
        Backend::Console => Ok(Box::new(LegacyConsole::new()?)),
    }
}

fn enter_screen(out: &mut Stdout) -> Result<()> {
    out.execute(terminal::EnterAlternateScreen)?;
    out.execute(cursor::Hide)?;
    let _ = out.execute(terminal::DisableLineWrap);
    out.execute(SetAttribute(Attribute::Reset))?;
    out.execute(ResetColor)?;
    out.execute(terminal::Clear(terminal::ClearType::All))?;
    out.flush()
}

fn leave_screen(out: &mut Stdout) {
    let _ = out.execute(SetAttribute(Attribute::Reset));
    let _ = out.execute(ResetColor);
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::EnableLineWrap);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = out.flush();
}

#[cfg(unix)]
mod ansi {
    use std::fs::File;
    use std::io::{stdout, Result, Stdout, Write};
    use std::mem::ManuallyDrop;
    use std::os::unix::io::{FromRawFd, RawFd};

    use super::{enter_screen, leave_screen, Console};
    use crate::canvas::Canvas;
    use crate::encoder::FrameEncoder;
    use crate::input::{InputDecoder, KeyEvent, RawMode, StdinSource};

    /// Encodes frames and hands each one to the descriptor in a single
    /// unbuffered write, so the terminal never sees half a frame.
    pub(super) struct FramePresenter {
        // Borrowed descriptor; never closed here.
        out: ManuallyDrop<File>,
        encoder: FrameEncoder,
        last_size: Option<(u16, u16)>,
    }

    impl FramePresenter {
        /// # Safety
        ///
        /// `fd` must stay open for as long as the presenter is used.
        pub(super) unsafe fn from_raw_fd(fd: RawFd) -> Self {
            Self {
                out: ManuallyDrop::new(File::from_raw_fd(fd)),
                encoder: FrameEncoder::new(),
                last_size: None,
            }
        }

        pub(super) fn present(&mut self, canvas: &Canvas, cols: u16, rows: u16) -> Result<()> {
            let resized = self.last_size != Some((cols, rows));
            self.last_size = Some((cols, rows));
            let frame = self.encoder.encode(canvas, cols, rows, resized);
            self.out.write_all(frame.as_bytes())
        }
    }

    /// True-color escape output with raw byte input decoded in-process.
    pub struct AnsiConsole {
        stdout: Stdout,
        // Dropped after the screen is restored, see `Drop`.
        raw: Option<RawMode>,
        source: StdinSource,
        decoder: InputDecoder,
        presenter: FramePresenter,
    }

    impl AnsiConsole {
        pub fn new() -> Result<Self> {
            let raw = RawMode::enable()?;
            let mut out = stdout();
            if let Err(e) = enter_screen(&mut out) {
                leave_screen(&mut out);
                return Err(e);
            }
            tracing::debug!("ansi console acquired");
            Ok(Self {
                stdout: out,
                raw: Some(raw),
                source: StdinSource::new(),
                decoder: InputDecoder::new(),
                // Standard output outlives the console.
                presenter: unsafe { FramePresenter::from_raw_fd(libc::STDOUT_FILENO) },
            })
        }
    }

    impl Console for AnsiConsole {
        fn poll_keys(&mut self) -> Result<Vec<KeyEvent>> {
            self.decoder.poll(&mut self.source)
        }

        fn render(&mut self, canvas: &Canvas, cols: u16, rows: u16) -> Result<()> {
            // Nothing buffered in `Stdout` may land after the frame.
            self.stdout.flush()?;
            self.presenter.present(canvas, cols, rows)
        }
    }

    impl Drop for AnsiConsole {
        fn drop(&mut self) {
            leave_screen(&mut self.stdout);
            drop(self.raw.take());
            tracing::debug!("ansi console released");
        }
    }

    #[cfg(all(test, target_os = "linux"))]
    mod tests {
        use super::*;

        /// Reads one datagram, or `None` when nothing is queued.
        fn recv_datagram(fd: RawFd) -> Option<Vec<u8>> {
            let mut buf = vec![0u8; 64 * 1024];
            let n = unsafe {
                libc::recv(
                    fd,
                    buf.as_mut_ptr().cast(),
                    buf.len(),
                    libc::MSG_DONTWAIT,
                )
            };
            if n < 0 {
                return None;
            }
            buf.truncate(n as usize);
            Some(buf)
        }

        #[test]
        fn each_frame_reaches_the_descriptor_in_one_write() {
            // Packet sockets keep write boundaries, so every write(2) is
            // one datagram on the far end.
            let mut fds = [0 as RawFd; 2];
            let rc = unsafe {
                libc::socketpair(libc::AF_UNIX, libc::SOCK_SEQPACKET, 0, fds.as_mut_ptr())
            };
            assert_eq!(rc, 0);

            let canvas = Canvas::new(4, 4);
            let mut presenter = unsafe { FramePresenter::from_raw_fd(fds[0]) };
            let mut reference = FrameEncoder::new();

            presenter.present(&canvas, 4, 2).unwrap();
            let first = recv_datagram(fds[1]).unwrap();
            assert_eq!(first, reference.encode(&canvas, 4, 2, true).as_bytes());
            assert!(first.starts_with(b"\x1b[2J\x1b[H"));
            assert!(recv_datagram(fds[1]).is_none());

            presenter.present(&canvas, 4, 2).unwrap();
            let second = recv_datagram(fds[1]).unwrap();
            assert_eq!(second, reference.encode(&canvas, 4, 2, false).as_bytes());
            assert!(recv_datagram(fds[1]).is_none());

            presenter.present(&canvas, 5, 3).unwrap();
            let resized = recv_datagram(fds[1]).unwrap();
            assert!(resized.starts_with(b"\x1b[2J"));
            assert!(recv_datagram(fds[1]).is_none());

            drop(presenter);
            unsafe {
                libc::close(fds[0]);
                libc::close(fds[1]);
            }
        }
    }
}

/// Console path for terminals without true-color escapes: crossterm input
/// events and the 16 console colors.
pub struct LegacyConsole {
    stdout: Stdout,
}

impl LegacyConsole {
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = stdout();
        if let Err(e) = enter_screen(&mut out) {
            leave_screen(&mut out);
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        tracing::debug!("legacy console acquired");
        Ok(Self { stdout: out })
    }
}

impl Console for LegacyConsole {
    fn poll_keys(&mut self) -> Result<Vec<KeyEvent>> {
        let mut keys = Vec::new();
        while event::poll(std::time::Duration::from_millis(0))? {
            if let event::Event::Key(k) = event::read()? {
                if k.kind == event::KeyEventKind::Press {
                    keys.push(map_key(&k));
                }
            }
        }
        Ok(keys)
    }

    fn render(&mut self, canvas: &Canvas, cols: u16, rows: u16) -> Result<()> {
        let cell_rows = (canvas.height() / 2).min(rows as usize);
        let cell_cols = canvas.width().min(cols as usize);

        for row in 0..cell_rows {
            let upper = &canvas.row(row * 2)[..cell_cols];
            let lower = &canvas.row(row * 2 + 1)[..cell_cols];

            self.stdout.queue(cursor::MoveTo(0, row as u16))?;
            let mut cur_bg: Option<TermColor> = None;
            let mut cur_fg: Option<TermColor> = None;

            for (&top, &bottom) in upper.iter().zip(lower) {
                let bg = nearest_console_color(unpack(top));
                let fg = nearest_console_color(unpack(bottom));
                if cur_bg != Some(bg) {
                    self.stdout.queue(SetBackgroundColor(bg))?;
                    cur_bg = Some(bg);
                }
                if cur_fg != Some(fg) {
                    self.stdout.queue(SetForegroundColor(fg))?;
                    cur_fg = Some(fg);
                }
                self.stdout.queue(Print(HALF_BLOCK))?;
            }
            self.stdout.queue(ResetColor)?;
        }

        self.stdout.flush()
    }
}

impl Drop for LegacyConsole {
    fn drop(&mut self) {
        leave_screen(&mut self.stdout);
        let _ = terminal::disable_raw_mode();
        tracing::debug!("legacy console released");
    }
}

/// crossterm's raw mode turns off the interrupt signal, so Ctrl-C arrives as
/// a key. It quits like Escape.
fn map_key(key: &event::KeyEvent) -> KeyEvent {
    match key.code {
        event::KeyCode::Char('c' | 'C') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
            KeyEvent::Escape
        }
        code => map_key_code(code),
    }
}

fn map_key_code(code: event::KeyCode) -> KeyEvent {
    use event::KeyCode;

    match code {
        KeyCode::Enter => KeyEvent::Enter,
        KeyCode::Esc => KeyEvent::Escape,
        KeyCode::Up => KeyEvent::Up,
        KeyCode::Down => KeyEvent::Down,
        KeyCode::Left => KeyEvent::Left,
        KeyCode::Right => KeyEvent::Right,
        KeyCode::Backspace => KeyEvent::Backspace,
        KeyCode::Tab => KeyEvent::Tab,
        KeyCode::Char(c) if c.is_ascii() => KeyEvent::Char(c as u8),
        _ => KeyEvent::Unknown,
    }
}

/// Undoes everything either console may have changed. For the panic hook,
/// where the console value cannot be reached.
pub fn restore_terminal_best_effort() {
    let mut out = stdout();
    leave_screen(&mut out);
    let _ = terminal::disable_raw_mode();
    #[cfg(unix)]
    crate::input::restore_raw_mode_best_effort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use event::KeyCode;

    #[test]
    fn min_size_follows_resolution() {
        let m = MinSize::for_resolution(300, 300);
        assert_eq!(m, MinSize { cols: 300, rows: 150 });
        let odd = MinSize::for_resolution(10, 7);
        assert_eq!(odd, MinSize { cols: 10, rows: 3 });
    }

    #[test]
    fn renderable_is_inclusive_at_threshold() {
        let m = MinSize::for_resolution(300, 300);
        assert!(m.is_renderable(300, 150));
        assert!(m.is_renderable(301, 200));
        assert!(!m.is_renderable(299, 150));
        assert!(!m.is_renderable(300, 149));
        assert!(!m.is_renderable(0, 0));
    }

    #[test]
    fn huge_resolution_saturates_threshold() {
        let m = MinSize::for_resolution(100_000, 4);
        assert_eq!(m.cols, u16::MAX);
        assert!(m.is_renderable(u16::MAX, 2));
    }

    #[test]
    fn key_codes_map_to_key_events() {
        assert_eq!(map_key_code(KeyCode::Esc), KeyEvent::Escape);
        assert_eq!(map_key_code(KeyCode::Enter), KeyEvent::Enter);
        assert_eq!(map_key_code(KeyCode::Left), KeyEvent::Left);
        assert_eq!(map_key_code(KeyCode::Char('a')), KeyEvent::Char(b'a'));
        assert_eq!(map_key_code(KeyCode::Char('é')), KeyEvent::Unknown);
        assert_eq!(map_key_code(KeyCode::F(5)), KeyEvent::Unknown);
    }

    #[test]
    fn ctrl_c_quits_on_the_console_path() {
        use event::KeyModifiers;

        let ctrl_c = event::KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(&ctrl_c), KeyEvent::Escape);
        let plain_c = event::KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert_eq!(map_key(&plain_c), KeyEvent::Char(b'c'));
        let ctrl_x = event::KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert_eq!(map_key(&ctrl_x), KeyEvent::Char(b'x'));
    }
}
