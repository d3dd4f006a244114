// SPDX-License-Identifier: MIT
//
// Event loop: the single place where events reach the application.
//
// Each iteration:
//
//   1. If SIGWINCH arrived, query the size, resize the screen and queue a
//      `Resize` event. The application's `on_start` runs after the first
//      resize that yields a real size.
//   2. Dispatch queued events.
//   3. `screen.update()` pushes whatever the handlers drew.
//   4. Block in `decoder.read()` until input or a timer, then dispatch.
//      If timers fired during the wait, `on_tick` runs after the events so
//      timer-driven state can be drawn before the next update.
//
// The resize flag is an `Arc<AtomicBool>` set by signal-hook. SIGWINCH also
// interrupts the poll inside `read()`, which then returns no events, so a
// resize is picked up on the very next iteration.
//
// Pointer motion reports repeat at the same cell while the mouse moves
// within it. The loop forwards a `MouseMove` only when the cell changed.

use std::io::{Stdout, Write};
#[cfg(unix)]
use std::sync::Arc;
#[cfg(unix)]
use std::sync::atomic::{AtomicBool, Ordering};

use crate::buffer::{Pos, Size};
use crate::event::{Event, Resize};
use crate::input::InputConfig;
#[cfg(unix)]
use crate::input::Decoder;
use crate::screen::Screen;
use crate::terminal::Options;
#[cfg(unix)]
use crate::terminal::{self, Terminal};

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application wants after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    /// Leave the loop. `on_exit` still runs.
    Quit,
}

/// Application callbacks. `W` is the screen's output stream.
pub trait App<W: Write = Stdout> {
    /// The screen has its first real size. Draw the initial frame here.
    fn on_start(&mut self, _screen: &mut Screen<W>) {}

    /// Handle one event. Draw into `screen`; the loop flushes after the
    /// batch.
    fn on_event(&mut self, screen: &mut Screen<W>, event: &Event) -> Action;

    /// One or more timer callbacks ran during the last wait.
    fn on_tick(&mut self, _screen: &mut Screen<W>) {}

    /// The loop is about to return.
    fn on_exit(&mut self, _screen: &mut Screen<W>) {}
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    pub options: Options,
    pub input: InputConfig,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            options: Options::HIDE_CURSOR | Options::MOUSE_BUTTON_EVENTS | Options::FOCUS_EVENTS,
            input: InputConfig::default(),
        }
    }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Hands events to the application, dropping repeated motion reports.
#[derive(Debug, Default)]
struct Dispatch {
    last_move: Option<Pos>,
}

impl Dispatch {
    fn run<W: Write, A: App<W> + ?Sized>(
        &mut self,
        app: &mut A,
        screen: &mut Screen<W>,
        events: impl IntoIterator<Item = Event>,
    ) -> Action {
        for event in events {
            if let Event::MouseMove(m) = event {
                if self.last_move == Some(m.pos) {
                    continue;
                }
                self.last_move = Some(m.pos);
            }
            if app.on_event(screen, &event) == Action::Quit {
                return Action::Quit;
            }
        }
        Action::Continue
    }

    /// Dispatch what one wait produced, then tell the application if
    /// timers fired.
    fn wake<W: Write, A: App<W> + ?Sized>(
        &mut self,
        app: &mut A,
        screen: &mut Screen<W>,
        events: Vec<Event>,
        timers_fired: usize,
    ) -> Action {
        if self.run(app, screen, events) == Action::Quit {
            return Action::Quit;
        }
        if timers_fired > 0 {
            app.on_tick(screen);
        }
        Action::Continue
    }
}

/// Resize `screen` to `size` and describe the change. An unknown (zero)
/// size is ignored until a later signal brings a real one.
fn resize_screen<W: Write>(screen: &mut Screen<W>, size: Size) -> Option<Event> {
    if size.is_empty() {
        log::debug!("terminal size unknown, resize deferred");
        return None;
    }
    let old_size = screen.size();
    screen.set_size(size);
    Some(Event::Resize(Resize { size, old_size }))
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// Owns the terminal, the screen and the decoder.
///
/// ```no_run
/// use termic::app::{Action, App, EventLoop, LoopConfig};
/// use termic::event::{Event, Key, KeyEvent};
/// use termic::screen::Screen;
///
/// struct Quit;
///
/// impl App for Quit {
///     fn on_event(&mut self, _: &mut Screen<std::io::Stdout>, event: &Event) -> Action {
///         match event {
///             Event::Key(KeyEvent { key: Key::Escape, .. }) => Action::Quit,
///             _ => Action::Continue,
///         }
///     }
/// }
///
/// EventLoop::new(LoopConfig::default())?.run(&mut Quit)?;
/// # Ok::<(), termic::Error>(())
/// ```
#[cfg(unix)]
pub struct EventLoop {
    screen: Screen<Stdout>,
    decoder: Decoder,
    resized: Arc<AtomicBool>,
    dispatch: Dispatch,
    started: bool,
    // Dropped last so the terminal is restored after everything else.
    terminal: Terminal,
}

#[cfg(unix)]
impl EventLoop {
    /// Put the terminal into application mode and register for SIGWINCH.
    ///
    /// # Errors
    ///
    /// Whatever [`Terminal::init`] or [`Decoder::new`] report, or an I/O
    /// error if the signal handler cannot be registered.
    pub fn new(config: LoopConfig) -> crate::Result<Self> {
        let terminal = Terminal::init(config.options)?;
        let decoder = Decoder::new(config.input)?;

        // Set initially so the first iteration picks up the size.
        let resized = Arc::new(AtomicBool::new(true));
        signal_hook::flag::register(signal_hook::consts::SIGWINCH, Arc::clone(&resized))?;

        Ok(Self {
            screen: Screen::new(std::io::stdout()),
            decoder,
            resized,
            dispatch: Dispatch::default(),
            started: false,
            terminal,
        })
    }

    /// Register timers and tune input here.
    pub const fn decoder_mut(&mut self) -> &mut Decoder {
        &mut self.decoder
    }

    pub const fn screen_mut(&mut self) -> &mut Screen<Stdout> {
        &mut self.screen
    }

    /// The flag SIGWINCH sets. Storing `true` forces a size check.
    #[must_use]
    pub fn resize_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.resized)
    }

    /// Run until the application quits, then restore the terminal.
    ///
    /// # Errors
    ///
    /// The first I/O error from drawing, reading input or restoring the
    /// terminal. `on_exit` runs either way.
    pub fn run(&mut self, app: &mut impl App) -> crate::Result<()> {
        let result = self.run_inner(app);
        app.on_exit(&mut self.screen);
        self.terminal.restore()?;
        result
    }

    fn run_inner(&mut self, app: &mut impl App) -> crate::Result<()> {
        loop {
            if self.resized.swap(false, Ordering::Relaxed) {
                let size = terminal::terminal_size(libc::STDOUT_FILENO);
                if let Some(event) = resize_screen(&mut self.screen, size) {
                    if !self.started {
                        self.started = true;
                        app.on_start(&mut self.screen);
                    }
                    if self.dispatch.run(app, &mut self.screen, [event]) == Action::Quit {
                        return Ok(());
                    }
                }
            }

            self.screen.update()?;

            let events = self.decoder.read()?;
            let fired = self.decoder.timers_fired();
            if self.dispatch.wake(app, &mut self.screen, events, fired) == Action::Quit {
                return Ok(());
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::event::{Key, Modifiers, MouseMove};

    /// Records every event; quits on Escape.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<Event>,
        ticks: usize,
    }

    impl App<Vec<u8>> for Recorder {
        fn on_event(&mut self, _: &mut Screen<Vec<u8>>, event: &Event) -> Action {
            self.seen.push(*event);
            match event {
                Event::Key(k) if k.key == Key::Escape => Action::Quit,
                _ => Action::Continue,
            }
        }

        fn on_tick(&mut self, screen: &mut Screen<Vec<u8>>) {
            self.ticks += 1;
            screen.print(Pos::ORIGIN, "t", crate::cell::Look::DEFAULT);
        }
    }

    fn mouse_move(x: u16, y: u16) -> Event {
        Event::MouseMove(MouseMove {
            pos: Pos::new(x, y),
            modifiers: Modifiers::NONE,
        })
    }

    // ── Config ────────────────────────────────────────────────────────

    #[test]
    fn default_loop_config() {
        let config = LoopConfig::default();
        assert!(config.options.contains(Options::HIDE_CURSOR));
        assert!(config.options.contains(Options::MOUSE_BUTTON_EVENTS));
        assert!(config.options.contains(Options::FOCUS_EVENTS));
        assert!(!config.options.contains(Options::MOUSE_MOVE_EVENTS));
        assert_eq!(config.input, InputConfig::default());
    }

    // ── Dispatch ──────────────────────────────────────────────────────

    #[test]
    fn repeated_moves_are_dropped() {
        let mut app = Recorder::default();
        let mut screen = Screen::new(Vec::new());
        let mut dispatch = Dispatch::default();

        let events = [mouse_move(1, 1), mouse_move(1, 1), mouse_move(2, 1)];
        assert_eq!(dispatch.run(&mut app, &mut screen, events), Action::Continue);
        // Still the same cell on the next batch.
        dispatch.run(&mut app, &mut screen, [mouse_move(2, 1), Event::Focus(true)]);

        assert_eq!(app.seen, vec![mouse_move(1, 1), mouse_move(2, 1), Event::Focus(true)]);
    }

    #[test]
    fn quit_stops_dispatch() {
        let mut app = Recorder::default();
        let mut screen = Screen::new(Vec::new());
        let events = [
            Event::Input('a'),
            Event::key(Key::Escape, Modifiers::NONE),
            Event::Input('b'),
        ];

        assert_eq!(Dispatch::default().run(&mut app, &mut screen, events), Action::Quit);
        assert_eq!(app.seen.len(), 2);
    }

    #[test]
    fn fired_timers_tick_after_events() {
        let mut app = Recorder::default();
        let mut screen = Screen::new(Vec::new());
        screen.set_size(Size::new(4, 1));
        let mut dispatch = Dispatch::default();

        assert_eq!(
            dispatch.wake(&mut app, &mut screen, Vec::new(), 1),
            Action::Continue
        );
        assert_eq!(app.ticks, 1);
        assert_eq!(screen.update().unwrap().cells, 1);

        dispatch.wake(&mut app, &mut screen, vec![Event::Focus(false)], 0);
        assert_eq!(app.ticks, 1);
        assert_eq!(app.seen, vec![Event::Focus(false)]);
    }

    #[test]
    fn quit_skips_tick() {
        let mut app = Recorder::default();
        let mut screen = Screen::new(Vec::new());
        let events = vec![Event::key(Key::Escape, Modifiers::NONE)];
        assert_eq!(
            Dispatch::default().wake(&mut app, &mut screen, events, 2),
            Action::Quit
        );
        assert_eq!(app.ticks, 0);
    }

    // ── Resize ────────────────────────────────────────────────────────

    #[test]
    fn resize_reports_old_and_new_size() {
        let mut screen = Screen::new(Vec::new());
        let first = resize_screen(&mut screen, Size::new(80, 24));
        assert_eq!(
            first,
            Some(Event::Resize(Resize {
                size: Size::new(80, 24),
                old_size: Size::new(0, 0),
            }))
        );

        let second = resize_screen(&mut screen, Size::new(100, 30));
        assert_eq!(
            second,
            Some(Event::Resize(Resize {
                size: Size::new(100, 30),
                old_size: Size::new(80, 24),
            }))
        );
        assert_eq!(screen.size(), Size::new(100, 30));
    }

    #[test]
    fn unknown_size_is_ignored() {
        let mut screen = Screen::new(Vec::new());
        screen.set_size(Size::new(10, 5));
        assert_eq!(resize_screen(&mut screen, Size::new(0, 0)), None);
        assert_eq!(resize_screen(&mut screen, Size::new(40, 0)), None);
        assert_eq!(screen.size(), Size::new(10, 5));
    }
}
