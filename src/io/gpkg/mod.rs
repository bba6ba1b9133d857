//! GeoPackage (SQLite container) reading operations.

mod read;

pub(crate) use read::*;
