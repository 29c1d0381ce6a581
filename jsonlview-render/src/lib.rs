//! # jsonlview-render
//!
//! Turns one JSON log record into indented, color-annotated display lines.
//!
//! ```text
//! {"timestamp":"2024-06-01T10:00:00Z","type":"info","msg":"hello"}
//!
//! [18:00:00] [info]
//!   msg: hello
//! ```
//!
//! Rendering is pure: [`render_entry`] returns [`RenderedLine`]s and never
//! touches a terminal. [`Painter`] is the only piece that writes, emitting ANSI
//! colors through crossterm.

pub mod color;
pub mod entry;
pub mod paint;
pub mod record;
pub mod timestamp;

pub use color::field_color;
pub use entry::{RenderedLine, Span, render_entry};
pub use paint::Painter;
pub use record::LogRecord;
pub use timestamp::TimeShift;
