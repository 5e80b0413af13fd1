//! Terminal backend: the `Backend` trait (§6) plus a `crossterm`-based sink
//! that replays submitted drawlists onto an in-memory cell grid, diffs
//! against the previous frame, and writes only what changed.

mod backend;
mod caps;
mod error;
mod grid;
mod input;
mod writer;

pub use backend::{Backend, CrosstermBackend, TerminalGuard};
pub use caps::{ColorDepth, SgrMask, TerminalCaps};
pub use error::TerminalError;
pub use grid::{Cell, CursorState, Grid};
pub use input::CrosstermInputEventSource;
pub use writer::BatchWriter;
