// SPDX-License-Identifier: MIT
//
// termic — terminal UI engine.
//
// Two halves that meet in the event loop:
//
//   output  draw calls land in a back buffer of cells; `Screen::update`
//           diffs it against what the terminal shows and writes the
//           shortest escape-sequence patch in a single write.
//   input   raw bytes from the terminal become keys, text, mouse, focus
//           and resize events; timers share the same blocking wait.
//
// Plus word wrapping for terminal text, where width is counted in cells
// and CJK glyphs take two.
//
// The library logs through `log` and never installs a logger.

pub mod ansi;
pub mod app;
pub mod buffer;
pub mod cell;
pub mod color;
pub mod error;
pub mod event;
pub mod input;
pub mod keys;
pub mod output;
pub mod screen;
pub mod terminal;
pub mod text;
pub mod timer;
pub mod utf8;

pub use error::{Error, Result};
