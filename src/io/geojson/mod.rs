//! GeoJSON reading (input layers) and writing (map overlays).

mod read;
mod write;

pub(crate) use read::*;
pub(crate) use write::*;
