// SPDX-License-Identifier: MIT
//
// Terminal input decoder.
//
// Safety: `read()` calls `poll` and `read` on the input descriptor and the
// timer descriptors. Each unsafe block is one FFI call on buffers owned by
// the decoder.
#![allow(unsafe_code)]
//
// Turns raw input bytes into `Event`s. Every read decodes everything that
// is buffered; a sequence cut off by the read boundary (a partial mouse
// report, half a UTF-8 codepoint) stays in the pending buffer and is
// completed by the next read. Input is never discarded except for byte
// runs that cannot be decoded at all, which are logged and skipped.
//
// Each decode step tries, in order:
//
//   1. SGR mouse report   `ESC [ < b ; x ; y M|m`
//   2. Focus              `ESC [ I`, `ESC [ O`
//   3. Key table          longest matching sequence (see `keys`)
//   4. UTF-8              one codepoint, plus a `Key` for letters, digits
//                         and space
//
// The blocking wait polls the input descriptor together with every active
// timer. Ready timers fire first, then input is read. A signal (SIGWINCH)
// interrupts the wait and `read()` returns no events so the caller can
// look at its flags before waiting again.

use std::time::Duration;

#[cfg(unix)]
use std::io;
#[cfg(unix)]
use std::os::fd::RawFd;

use crate::buffer::Pos;
use crate::error::Result;
use crate::event::{Event, Key, KeyEvent, Modifiers, MouseButton, MouseMove, MouseWheel};
use crate::keys::KeyTable;
use crate::timer::Stopwatch;
#[cfg(unix)]
use crate::timer::{Timer, Timers};
use crate::utf8::{self, Decoded};

const MOUSE_PREFIX: &[u8] = b"\x1b[<";
/// Longest SGR mouse report accepted, prefix included.
const MAX_MOUSE_LEN: usize = 16;
const FOCUS_IN: &[u8] = b"\x1b[I";
const FOCUS_OUT: &[u8] = b"\x1b[O";

#[cfg(unix)]
const READ_CHUNK: usize = 1024;

// ─── Config ──────────────────────────────────────────────────────────────────

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputConfig {
    /// A second left-button press within this window is a double click.
    pub double_click: Duration,
    /// Most timers that may be active at once.
    pub max_timers: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            double_click: Duration::from_millis(300),
            max_timers: 16,
        }
    }
}

// ─── Decoder ─────────────────────────────────────────────────────────────────

/// Stateful byte-to-event decoder. Owns the timers.
pub struct Decoder {
    keys: &'static KeyTable,
    config: InputConfig,
    /// Bytes of an incomplete sequence carried over to the next read.
    pending: Vec<u8>,
    /// Started by a left-button press that was not a double click.
    last_click: Option<Stopwatch>,
    #[cfg(unix)]
    fd: RawFd,
    #[cfg(unix)]
    timers: Timers,
    #[cfg(unix)]
    poll_set: Vec<libc::pollfd>,
    /// Timers fired by the last `read()`.
    #[cfg(unix)]
    fired: usize,
}

impl Decoder {
    /// A decoder reading standard input.
    ///
    /// # Errors
    ///
    /// [`Error::KeyTable`](crate::Error::KeyTable) if the built-in key
    /// table is inconsistent.
    pub fn new(config: InputConfig) -> Result<Self> {
        Ok(Self {
            keys: KeyTable::builtin()?,
            config,
            pending: Vec::new(),
            last_click: None,
            #[cfg(unix)]
            fd: libc::STDIN_FILENO,
            #[cfg(unix)]
            timers: Timers::new(config.max_timers),
            #[cfg(unix)]
            poll_set: Vec::with_capacity(config.max_timers + 1),
            #[cfg(unix)]
            fired: 0,
        })
    }

    /// A decoder reading `fd` instead of standard input.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    #[cfg(unix)]
    pub fn with_fd(fd: RawFd, config: InputConfig) -> Result<Self> {
        let mut decoder = Self::new(config)?;
        decoder.fd = fd;
        Ok(decoder)
    }

    #[must_use]
    pub const fn config(&self) -> &InputConfig {
        &self.config
    }

    /// Bytes held back waiting for the rest of a sequence.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Decode `bytes` (after anything still pending) into events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Event> {
        self.pending.extend_from_slice(bytes);

        let mut events = Vec::new();
        let mut at = 0;
        while at < self.pending.len() {
            match decode_one(self.keys, &self.pending[at..], &mut events) {
                Step::Consumed(n) => at += n,
                Step::Incomplete => break,
            }
        }
        self.pending.drain(..at);

        for event in &mut events {
            if let Event::MouseButton(button) = event {
                self.detect_double_click(button);
            }
        }
        events
    }

    fn detect_double_click(&mut self, ev: &mut MouseButton) {
        if ev.button != 0 || !ev.pressed {
            return;
        }
        let window = self.config.double_click;
        if self.last_click.as_ref().is_some_and(|sw| sw.elapsed() < window) {
            ev.pressed = false;
            ev.double_clicked = true;
        } else {
            self.last_click = Some(Stopwatch::new());
        }
    }
}

// ─── Blocking Read ───────────────────────────────────────────────────────────

#[cfg(unix)]
impl Decoder {
    /// Register a timer. `callback` runs on the thread calling
    /// [`read`](Self::read), before input is decoded.
    ///
    /// # Errors
    ///
    /// [`TooManyTimers`](crate::Error::TooManyTimers) when the registry is
    /// full, an I/O error if the timer descriptor cannot be created, or
    /// [`Unsupported`](crate::Error::Unsupported) off Linux.
    pub fn add_timer(
        &mut self,
        initial: Duration,
        interval: Duration,
        callback: impl FnMut() + 'static,
    ) -> Result<Timer> {
        self.timers.add(initial, interval, Box::new(callback))
    }

    /// Timers currently registered, cancelled ones included until the next
    /// wait prunes them.
    #[must_use]
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// How many timer callbacks ran during the last [`read`](Self::read).
    #[must_use]
    pub const fn timers_fired(&self) -> usize {
        self.fired
    }

    /// Wait for input or a timer, fire ready timers, and decode whatever
    /// input arrived.
    ///
    /// Returns no events when only timers fired or the wait was
    /// interrupted by a signal.
    ///
    /// # Errors
    ///
    /// `UnexpectedEof` when the input is closed, an error when the input
    /// descriptor is invalid or in an error state, or the error from `poll`
    /// or `read`.
    pub fn read(&mut self) -> io::Result<Vec<Event>> {
        self.fired = 0;
        self.timers.prune();

        self.poll_set.clear();
        self.poll_set.push(pollfd(self.fd));
        for fd in self.timers.fds() {
            self.poll_set.push(pollfd(fd));
        }

        // SAFETY: `poll_set` is a valid array of `len()` pollfds.
        let rc = unsafe {
            libc::poll(
                self.poll_set.as_mut_ptr(),
                self.poll_set.len() as libc::nfds_t,
                -1,
            )
        };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Vec::new());
            }
            return Err(err);
        }

        let ready: Vec<bool> = self.poll_set[1..]
            .iter()
            .map(|p| p.revents & libc::POLLIN != 0)
            .collect();
        if ready.contains(&true) {
            self.fired = self.timers.fire(&ready);
            log::trace!("{} timers fired", self.fired);
        }

        let revents = self.poll_set[0].revents;
        if revents & libc::POLLNVAL != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "input descriptor is not open",
            ));
        }
        if revents & libc::POLLERR != 0 {
            return Err(io::Error::other("error condition on input descriptor"));
        }
        if revents & (libc::POLLIN | libc::POLLHUP) == 0 {
            return Ok(Vec::new());
        }

        let mut buf = [0u8; READ_CHUNK];
        // SAFETY: reads at most `buf.len()` bytes into `buf`.
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Ok(Vec::new()),
                _ => Err(err),
            };
        }
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }

        #[allow(clippy::cast_sign_loss)] // checked non-negative above
        let n = n as usize;
        Ok(self.feed(&buf[..n]))
    }
}

#[cfg(unix)]
const fn pollfd(fd: RawFd) -> libc::pollfd {
    libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    }
}

// ─── Decoding ────────────────────────────────────────────────────────────────

enum Step {
    Consumed(usize),
    /// The input ends inside a sequence. Wait for more bytes.
    Incomplete,
}

fn decode_one(keys: &KeyTable, input: &[u8], out: &mut Vec<Event>) -> Step {
    if let Some(body) = input.strip_prefix(MOUSE_PREFIX) {
        match parse_mouse(body) {
            Mouse::Event(event, len) => {
                out.push(event);
                return Step::Consumed(MOUSE_PREFIX.len() + len);
            }
            Mouse::Incomplete => return Step::Incomplete,
            Mouse::Malformed => {
                log::debug!("malformed mouse report: {}", utf8::escape_debug(input));
            }
        }
    }

    if input.starts_with(FOCUS_IN) {
        out.push(Event::Focus(true));
        return Step::Consumed(FOCUS_IN.len());
    }
    if input.starts_with(FOCUS_OUT) {
        out.push(Event::Focus(false));
        return Step::Consumed(FOCUS_OUT.len());
    }

    if let Some(seq) = keys.longest_prefix(input) {
        out.push(Event::Key(seq.event()));
        return Step::Consumed(seq.bytes.len());
    }

    match utf8::decode(input) {
        Decoded::Char(ch, len) if ch.is_control() => {
            log::debug!("unmapped control: {} ({})", utf8::escape_debug(&input[..len]), utf8::hex(&input[..len]));
            Step::Consumed(len)
        }
        Decoded::Char(ch, len) => {
            out.push(Event::Input(ch));
            if let Some(key) = key_for_char(ch) {
                out.push(Event::Key(key));
            }
            Step::Consumed(len)
        }
        Decoded::Incomplete => Step::Incomplete,
        Decoded::Invalid(len) => {
            log::warn!(
                "parse failed: {} ({}), {len} bytes dropped",
                utf8::escape_debug(&input[..len]),
                utf8::hex(&input[..len])
            );
            Step::Consumed(len)
        }
    }
}

/// The key a typed character also stands for.
fn key_for_char(ch: char) -> Option<KeyEvent> {
    match ch {
        'A'..='Z' => Some(KeyEvent::new(Key::Char(ch.to_ascii_lowercase()), Modifiers::SHIFT)),
        'a'..='z' | '0'..='9' | ' ' => Some(KeyEvent::plain(Key::Char(ch))),
        _ => None,
    }
}

// ─── SGR Mouse ───────────────────────────────────────────────────────────────

enum Mouse {
    /// The event and the bytes it used after the prefix.
    Event(Event, usize),
    Incomplete,
    Malformed,
}

/// Parse the part of an SGR mouse report after `ESC [ <`.
fn parse_mouse(body: &[u8]) -> Mouse {
    let max_body = MAX_MOUSE_LEN - MOUSE_PREFIX.len();
    let scan = &body[..body.len().min(max_body)];

    let Some(end) = scan.iter().position(|&b| b == b'M' || b == b'm') else {
        let plausible = scan.iter().all(|&b| b.is_ascii_digit() || b == b';');
        return if plausible && body.len() < max_body {
            Mouse::Incomplete
        } else {
            Mouse::Malformed
        };
    };

    let mut fields = [0u32; 3];
    let mut count = 0;
    for part in body[..end].split(|&b| b == b';') {
        let Some(value) = parse_decimal(part) else {
            return Mouse::Malformed;
        };
        if count == fields.len() {
            return Mouse::Malformed;
        }
        fields[count] = value;
        count += 1;
    }
    if count != fields.len() {
        return Mouse::Malformed;
    }

    let [bits, x, y] = fields;
    let pos = Pos::new(coord(x), coord(y));

    let mut modifiers = Modifiers::NONE;
    if bits & 0x04 != 0 {
        modifiers |= Modifiers::SHIFT;
    }
    if bits & 0x08 != 0 {
        modifiers |= Modifiers::ALT;
    }
    if bits & 0x10 != 0 {
        modifiers |= Modifiers::CTRL;
    }

    let event = if bits & 0x20 != 0 {
        Event::MouseMove(MouseMove { pos, modifiers })
    } else {
        let base = bits & !(0x04 | 0x08 | 0x10 | 0x20);
        if (64..128).contains(&base) {
            // Wheel: 64 up, 65 down. Never a press or release.
            let button = i64::from(base & !0x40) + 3;
            let delta = -(button - 3) * 2 + 1;
            Event::MouseWheel(MouseWheel {
                delta: i8::try_from(delta).unwrap_or(i8::MIN),
                pos,
                modifiers,
            })
        } else {
            let button = if base >= 128 {
                (base & !0x80) + 5
            } else {
                base & 0x0f
            };
            let pressed = body[end] == b'M';
            Event::MouseButton(MouseButton {
                button: u8::try_from(button).unwrap_or(u8::MAX),
                pressed,
                released: !pressed,
                double_clicked: false,
                pos,
                modifiers,
            })
        }
    };

    Mouse::Event(event, end + 1)
}

fn parse_decimal(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// 1-based wire coordinate to 0-based column or row.
fn coord(v: u32) -> u16 {
    u16::try_from(v.saturating_sub(1)).unwrap_or(u16::MAX)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
