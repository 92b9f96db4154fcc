// Copyright (c) 2026 rezky_nightky

use std::collections::VecDeque;
use std::io;

const ESC: u8 = 0x1b;
const BS: u8 = 0x08;
const TAB: u8 = b'\t';
const LF: u8 = b'\n';
const CR: u8 = b'\r';
const DEL: u8 = 0x7f;

const READ_CHUNK: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    Char(u8),
    Enter,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Backspace,
    Tab,
    Unknown,
}

/// A non-blocking byte stream. `Ok(0)` means nothing is available right now.
pub trait ByteSource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Ground,
    SawEscape,
    SawBracket,
}

enum Step {
    Emit(KeyEvent, usize),
    Incomplete(State),
}

/// Turns raw terminal bytes into key events.
///
/// Bytes that do not yet form a complete sequence stay queued until the
/// next poll, so `ESC [ A` split across reads still decodes to `Up`.
#[derive(Debug, Default)]
pub struct InputDecoder {
    pending: VecDeque<u8>,
}

impl InputDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drains whatever `src` has ready and returns the decoded events in
    /// arrival order. Never blocks.
    ///
    /// An incomplete `ESC` or `ESC [` stays queued across polls that bring
    /// new bytes. If a poll reads nothing at all, the prefix is given up on:
    /// the `ESC` is reported as `Escape` and a trailing `[` as a literal. A
    /// sequence split across reads still decodes as long as the next poll
    /// reads its remainder, and a lone Escape key press is reported one
    /// poll late.
    pub fn poll<S: ByteSource + ?Sized>(&mut self, src: &mut S) -> io::Result<Vec<KeyEvent>> {
        let mut buf = [0u8; READ_CHUNK];
        let mut received = 0usize;
        loop {
            let n = src.read_available(&mut buf)?;
            if n == 0 {
                break;
            }
            self.pending.extend(&buf[..n]);
            received += n;
        }

        let mut keys = Vec::new();
        self.decode(&mut keys, received == 0);
        Ok(keys)
    }

    /// Classifies bytes from the front of the queue. When `idle` is set no
    /// new bytes arrived since the last poll, so a dangling escape prefix is
    /// taken to be the Escape key itself.
    fn decode(&mut self, out: &mut Vec<KeyEvent>, idle: bool) {
        loop {
            match self.step() {
                Step::Emit(key, used) => {
                    self.pending.drain(..used);
                    out.push(key);
                }
                Step::Incomplete(State::Ground) => break,
                Step::Incomplete(_) if idle => {
                    // Only the ESC is consumed; a trailing '[' decodes as a
                    // literal on the next step.
                    self.pending.pop_front();
                    out.push(KeyEvent::Escape);
                }
                Step::Incomplete(state) => {
                    tracing::trace!(?state, pending = self.pending.len(), "escape deferred");
                    break;
                }
            }
        }
    }

    fn step(&self) -> Step {
        let mut state = State::Ground;
        for &b in &self.pending {
            state = match (state, b) {
                (State::Ground, ESC) => State::SawEscape,
                (State::Ground, b) => return Step::Emit(classify_byte(b), 1),
                (State::SawEscape, b'[') => State::SawBracket,
                (State::SawEscape, _) => return Step::Emit(KeyEvent::Escape, 1),
                (State::SawBracket, b) => return Step::Emit(classify_csi(b), 3),
            };
        }
        Step::Incomplete(state)
    }
}

fn classify_byte(b: u8) -> KeyEvent {
    match b {
        CR | LF => KeyEvent::Enter,
        DEL | BS => KeyEvent::Backspace,
        TAB => KeyEvent::Tab,
        other => KeyEvent::Char(other),
    }
}

fn classify_csi(b: u8) -> KeyEvent {
    match b {
        b'A' => KeyEvent::Up,
        b'B' => KeyEvent::Down,
        b'C' => KeyEvent::Right,
        b'D' => KeyEvent::Left,
        _ => KeyEvent::Unknown,
    }
}

/// Standard input in non-blocking mode.
#[cfg(unix)]
pub struct StdinSource {
    fd: std::os::unix::io::RawFd,
}

#[cfg(unix)]
impl StdinSource {
    pub fn new() -> Self {
        use std::os::unix::io::AsRawFd;
        Self {
            fd: io::stdin().as_raw_fd(),
        }
    }
}

#[cfg(unix)]
impl ByteSource for StdinSource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Bypass std's buffered Stdin so no bytes are held back from the
        // decoder between polls.
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n >= 0 {
            return Ok(n as usize);
        }
        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(0),
            _ => Err(err),
        }
    }
}

/// Termios settings that turn off canonical input and echo, plus a
/// non-blocking stdin descriptor. Dropping it restores both.
#[cfg(unix)]
pub struct RawMode {
    fd: std::os::unix::io::RawFd,
    original: libc::termios,
    original_flags: libc::c_int,
}

#[cfg(unix)]
static SAVED_TERMIOS: std::sync::OnceLock<(libc::termios, libc::c_int)> =
    std::sync::OnceLock::new();

#[cfg(unix)]
impl RawMode {
    pub fn enable() -> io::Result<Self> {
        use std::os::unix::io::AsRawFd;

        let fd = io::stdin().as_raw_fd();
        let mut original: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut original) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let original_flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if original_flags < 0 {
            return Err(io::Error::last_os_error());
        }

        let mut raw = original;
        // ISIG stays on so Ctrl-C still reaches the signal handler.
        raw.c_lflag &= !(libc::ICANON | libc::ECHO);
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = 0;
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }

        if unsafe { libc::fcntl(fd, libc::F_SETFL, original_flags | libc::O_NONBLOCK) } < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::tcsetattr(fd, libc::TCSANOW, &original) };
            return Err(err);
        }

        let _ = SAVED_TERMIOS.set((original, original_flags));
        Ok(Self {
            fd,
            original,
            original_flags,
        })
    }
}

#[cfg(unix)]
impl Drop for RawMode {
    fn drop(&mut self) {
        unsafe {
            libc::fcntl(self.fd, libc::F_SETFL, self.original_flags);
            libc::tcsetattr(self.fd, libc::TCSANOW, &self.original);
        }
    }
}

/// Puts stdin back the way `RawMode::enable` found it. Used from the panic
/// hook, where no `RawMode` value is reachable.
#[cfg(unix)]
pub fn restore_raw_mode_best_effort() {
    use std::os::unix::io::AsRawFd;

    if let Some((termios, flags)) = SAVED_TERMIOS.get() {
        let fd = io::stdin().as_raw_fd();
        unsafe {
            libc::fcntl(fd, libc::F_SETFL, *flags);
            libc::tcsetattr(fd, libc::TCSANOW, termios);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out one scripted chunk per poll, then nothing.
    struct Scripted {
        chunks: VecDeque<Vec<u8>>,
        served_this_poll: bool,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                chunks: VecDeque::new(),
                served_this_poll: false,
            }
        }

        fn push(&mut self, bytes: &[u8]) {
            self.chunks.push_back(bytes.to_vec());
        }
    }

    impl ByteSource for Scripted {
        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served_this_poll {
                self.served_this_poll = false;
                return Ok(0);
            }
            let Some(chunk) = self.chunks.pop_front() else {
                return Ok(0);
            };
            assert!(chunk.len() <= buf.len());
            buf[..chunk.len()].copy_from_slice(&chunk);
            self.served_this_poll = true;
            Ok(chunk.len())
        }
    }

    fn poll_with(dec: &mut InputDecoder, src: &mut Scripted, bytes: &[u8]) -> Vec<KeyEvent> {
        src.push(bytes);
        dec.poll(src).unwrap()
    }

    #[test]
    fn empty_poll_yields_nothing() {
        let mut dec = InputDecoder::new();
        let mut src = Scripted::new();
        assert!(dec.poll(&mut src).unwrap().is_empty());
    }

    #[test]
    fn mixed_bytes_keep_arrival_order() {
        let mut dec = InputDecoder::new();
        let mut src = Scripted::new();
        let keys = poll_with(&mut dec, &mut src, b"A\r\x7f");
        assert_eq!(
            keys,
            vec![KeyEvent::Char(b'A'), KeyEvent::Enter, KeyEvent::Backspace]
        );
    }

    #[test]
    fn control_bytes_map_to_named_keys() {
        let mut dec = InputDecoder::new();
        let mut src = Scripted::new();
        let keys = poll_with(&mut dec, &mut src, b"\n\x08\tz ");
        assert_eq!(
            keys,
            vec![
                KeyEvent::Enter,
                KeyEvent::Backspace,
                KeyEvent::Tab,
                KeyEvent::Char(b'z'),
                KeyEvent::Char(b' '),
            ]
        );
    }

    #[test]
    fn arrow_sequences() {
        let mut dec = InputDecoder::new();
        let mut src = Scripted::new();
        let keys = poll_with(&mut dec, &mut src, b"\x1b[A\x1b[B\x1b[C\x1b[D\x1b[Z");
        assert_eq!(
            keys,
            vec![
                KeyEvent::Up,
                KeyEvent::Down,
                KeyEvent::Right,
                KeyEvent::Left,
                KeyEvent::Unknown,
            ]
        );
        assert_eq!(dec.pending_len(), 0);
    }

    #[test]
    fn escape_split_across_polls_decodes_once_complete() {
        let mut dec = InputDecoder::new();
        let mut src = Scripted::new();
        assert!(poll_with(&mut dec, &mut src, b"\x1b").is_empty());
        assert_eq!(dec.pending_len(), 1);
        assert_eq!(poll_with(&mut dec, &mut src, b"[A"), vec![KeyEvent::Up]);
        assert_eq!(dec.pending_len(), 0);
    }

    #[test]
    fn escape_bracket_split_before_final_byte() {
        let mut dec = InputDecoder::new();
        let mut src = Scripted::new();
        assert_eq!(poll_with(&mut dec, &mut src, b"x\x1b["), vec![KeyEvent::Char(b'x')]);
        assert_eq!(dec.pending_len(), 2);
        assert_eq!(poll_with(&mut dec, &mut src, b"D"), vec![KeyEvent::Left]);
    }

    #[test]
    fn lone_escape_becomes_escape_after_an_idle_poll() {
        let mut dec = InputDecoder::new();
        let mut src = Scripted::new();
        assert!(poll_with(&mut dec, &mut src, b"\x1b").is_empty());
        assert_eq!(dec.poll(&mut src).unwrap(), vec![KeyEvent::Escape]);
        assert_eq!(dec.pending_len(), 0);
    }

    #[test]
    fn stale_escape_bracket_flushes_as_escape_then_literal() {
        let mut dec = InputDecoder::new();
        let mut src = Scripted::new();
        assert!(poll_with(&mut dec, &mut src, b"\x1b[").is_empty());
        assert_eq!(
            dec.poll(&mut src).unwrap(),
            vec![KeyEvent::Escape, KeyEvent::Char(b'[')]
        );
    }

    #[test]
    fn escape_followed_by_other_byte_is_escape_then_that_byte() {
        let mut dec = InputDecoder::new();
        let mut src = Scripted::new();
        assert_eq!(
            poll_with(&mut dec, &mut src, b"\x1bq\x1b\x1b[A"),
            vec![
                KeyEvent::Escape,
                KeyEvent::Char(b'q'),
                KeyEvent::Escape,
                KeyEvent::Up,
            ]
        );
    }
}
