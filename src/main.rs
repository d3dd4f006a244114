// SPDX-License-Identifier: MIT
//
// termic-demo — an interactive event viewer.
//
// Shows the last decoded event, the pointer position, focus state and a
// counter driven by a repeating timer, under a wrapped paragraph that
// reflows when the terminal is resized. `q` or Escape quits.
//
// Logging goes to the file named by TERMIC_LOG (the terminal itself is
// busy), filtered by RUST_LOG. Without TERMIC_LOG nothing is logged.

use std::cell::Cell;
use std::fs::File;
use std::process;
use std::rc::Rc;
use std::time::Duration;

use termic::app::{Action, App, EventLoop, LoopConfig};
use termic::buffer::{Pos, Size};
use termic::cell::{Look, Style};
use termic::color::Color;
use termic::event::{Event, Key, KeyEvent};
use termic::screen::{Align, Screen};
use termic::terminal::Options;
use termic::text::BreakMode;

const ABOUT: &str = "Type, click, double click, scroll, resize. Every cell on this screen is \
                     diffed against the previous frame and only the changes are written. \
                     Wide glyphs like 漢字 take two columns and wrap as whole words.";

const TITLE: Look = Look::new(Color::BLACK, Color::CYAN, Style::BOLD);
const LABEL: Look = Look::new(Color::GREY60, Color::Default, Style::NORMAL);
const VALUE: Look = Look::new(Color::WHITE, Color::Default, Style::NORMAL);

type Stdout = std::io::Stdout;

struct Demo {
    ticks: Rc<Cell<u64>>,
    last_event: String,
    mouse: Option<Pos>,
    focused: bool,
    events: u64,
}

impl Demo {
    fn draw(&self, screen: &mut Screen<Stdout>) {
        let Size { width, height } = screen.size();
        screen.clear(Color::Default, Color::Default);
        if height < 4 {
            return;
        }

        for x in 0..width {
            screen.set_cell(Pos::new(x, 0), Some(' '), 1, TITLE);
        }
        screen.print_aligned(Align::Center, Pos::new(width / 2, 0), " termic demo ", TITLE);

        let wrap = usize::from(width.saturating_sub(4)).max(10);
        let rows = screen.print_wrapped(Pos::new(2, 2), ABOUT, Look::DEFAULT, wrap, BreakMode::Western);

        let mut y = u16::try_from(rows).unwrap_or(u16::MAX).saturating_add(3);
        let mouse = self
            .mouse
            .map_or_else(|| "-".to_owned(), |p| format!("{}, {}", p.x, p.y));
        let focus = if self.focused { "focused" } else { "unfocused" };
        let rows = [
            ("last event", self.last_event.clone()),
            ("events", self.events.to_string()),
            ("mouse", mouse),
            ("focus", focus.to_owned()),
            ("timer ticks", self.ticks.get().to_string()),
            ("size", format!("{width}x{height}")),
        ];
        for (label, value) in rows {
            if y + 1 >= height {
                break;
            }
            screen.print(Pos::new(2, y), label, LABEL);
            screen.print(Pos::new(16, y), &value, VALUE);
            y += 1;
        }

        screen.print_aligned(
            Align::Right,
            Pos::new(width.saturating_sub(1), height - 1),
            "q / Esc quits",
            LABEL.with_style(Style::ITALIC),
        );
    }

    fn describe(event: &Event) -> String {
        match event {
            Event::Key(k) => format!("key {k}"),
            Event::Input(c) => format!("input {c:?}"),
            Event::MouseMove(m) => format!("move {},{}", m.pos.x, m.pos.y),
            Event::MouseButton(b) => {
                let what = if b.double_clicked {
                    "double click"
                } else if b.pressed {
                    "press"
                } else {
                    "release"
                };
                format!("button {} {what} at {},{}", b.button, b.pos.x, b.pos.y)
            }
            Event::MouseWheel(w) => format!("wheel {:+} at {},{}", w.delta, w.pos.x, w.pos.y),
            Event::Resize(r) => format!(
                "resize {}x{} -> {}x{}",
                r.old_size.width, r.old_size.height, r.size.width, r.size.height
            ),
            Event::Focus(on) => format!("focus {on}"),
        }
    }
}

impl App for Demo {
    fn on_start(&mut self, screen: &mut Screen<Stdout>) {
        self.draw(screen);
    }

    fn on_tick(&mut self, screen: &mut Screen<Stdout>) {
        self.draw(screen);
    }

    fn on_event(&mut self, screen: &mut Screen<Stdout>, event: &Event) -> Action {
        if let Event::Key(KeyEvent {
            key: Key::Escape | Key::Char('q'),
            modifiers,
        }) = event
        {
            if modifiers.is_empty() {
                return Action::Quit;
            }
        }

        self.events += 1;
        match event {
            Event::MouseMove(m) => self.mouse = Some(m.pos),
            Event::MouseButton(b) => self.mouse = Some(b.pos),
            Event::Focus(on) => self.focused = *on,
            _ => {}
        }
        // Letters arrive as both Input and Key; show the richer one.
        if !matches!(event, Event::Input(_)) {
            self.last_event = Self::describe(event);
        }
        self.draw(screen);
        Action::Continue
    }
}

fn init_logging() {
    let Ok(path) = std::env::var("TERMIC_LOG") else {
        return;
    };
    match File::create(&path) {
        Ok(file) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
        Err(e) => eprintln!("termic-demo: cannot open log file {path}: {e}"),
    }
}

fn run() -> termic::Result<()> {
    let config = LoopConfig {
        options: LoopConfig::default().options | Options::MOUSE_MOVE_EVENTS,
        ..LoopConfig::default()
    };
    let mut event_loop = EventLoop::new(config)?;
    event_loop.screen_mut().set_synchronized(true);

    let ticks = Rc::new(Cell::new(0));
    let counter = Rc::clone(&ticks);
    let _timer = event_loop.decoder_mut().add_timer(
        Duration::from_millis(500),
        Duration::from_millis(500),
        move || counter.set(counter.get() + 1),
    )?;

    let mut demo = Demo {
        ticks,
        last_event: "-".to_owned(),
        mouse: None,
        focused: true,
        events: 0,
    };
    event_loop.run(&mut demo)
}

fn main() {
    init_logging();
    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("termic-demo: {e}");
        process::exit(1);
    }
}
