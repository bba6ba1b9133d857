//! Well-Known Binary geometry decoding (GeoPackage feature blobs).

mod read;

pub(crate) use read::*;
