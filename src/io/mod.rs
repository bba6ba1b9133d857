//! IO module for format-specific reading and writing operations.
//!
//! Each format module handles reading and/or writing for one file format.
//!
//! # Format Modules
//!
//! - `shp` - Shapefile vector layers (`.shp` + `.dbf` + `.prj`)
//! - `gpkg` - GeoPackage containers (SQLite)
//! - `geojson` - GeoJSON layers in, map overlay payloads out
//! - `wkb` - Well-Known Binary geometry inside GeoPackage blobs
//! - `csv` - CSV tables for price listings
//! - `html` - HTML documents for Leaflet maps

pub(crate) mod csv;
pub(crate) mod geojson;
pub(crate) mod gpkg;
pub(crate) mod html;
pub(crate) mod shp;
pub(crate) mod wkb;
