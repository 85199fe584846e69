//! Terminal user interface for the live monitor.
//!
//! Presents the continuously refreshing, sortable per-table activity view,
//! top-style, over a raw-mode terminal.

mod app;
mod input;
mod render;
mod surface;

pub use app::{Monitor, run};
pub use input::{KeyAction, decode_key, read_key};
pub use render::draw;
pub use surface::{GridSurface, Surface, TermSurface, TerminalGuard};
