//! HTML format writing operations for interactive maps.

mod color;
mod writer;

pub(crate) use color::*;
pub(crate) use writer::*;
