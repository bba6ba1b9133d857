use tracing::{debug, warn};

use crate::{io::{geojson, gpkg::GeoPackage, shp}, layer::{Format, Layer, VectorFile}, Error};

/// Layers read from one file, plus the failures met along the way.
#[derive(Debug, Default)]
pub struct LayerSet {
    pub layers: Vec<Layer>,
    pub warnings: Vec<Error>,
}

impl LayerSet {
    /// Keep a parsed layer unless it has no features.
    fn push(&mut self, layer: Layer) {
        if layer.is_empty() {
            debug!("Skipping empty layer {}", layer.name());
        } else {
            self.layers.push(layer);
        }
    }

    fn warn(&mut self, error: Error) {
        warn!("Skipping: {error}");
        self.warnings.push(error);
    }
}

/// Read every non-empty layer of a discovered file.
///
/// Never fails: parse errors are returned as warnings next to whatever layers
/// did load. A container whose layer list cannot be read is retried as a
/// single unnamed layer.
pub fn read_layers(file: &VectorFile) -> LayerSet {
    let mut set = LayerSet::default();
    let path = file.path();
    let stem = file.stem();

    match file.format() {
        Format::Shapefile => match shp::read_shapefile(path, &stem) {
            Ok(layer) => set.push(layer),
            Err(e) => set.warn(Error::layer_parse(path, None, &e)),
        },
        Format::GeoJson => match geojson::read_geojson(path, &stem) {
            Ok(layer) => set.push(layer),
            Err(e) => set.warn(Error::layer_parse(path, None, &e)),
        },
        Format::GeoPackage => read_container(file, &mut set),
    }
    set
}

fn read_container(file: &VectorFile, set: &mut LayerSet) {
    let path = file.path();
    let stem = file.stem();

    let gpkg = match GeoPackage::open(path) {
        Ok(gpkg) => gpkg,
        Err(e) => return set.warn(Error::layer_parse(path, None, &e)),
    };

    let tables = match gpkg.feature_tables() {
        Ok(tables) if !tables.is_empty() => tables,
        Ok(_) => {
            debug!("{} registers no feature tables; reading it as a single layer", file.file_name());
            return read_single(&gpkg, file, set);
        }
        Err(e) => {
            warn!("Could not list layers in {}: {e:#}; reading it as a single layer", file.file_name());
            return read_single(&gpkg, file, set);
        }
    };

    for table in tables {
        match gpkg.read_layer(&table, &format!("{stem}:{table}")) {
            Ok(layer) => set.push(layer),
            Err(e) => set.warn(Error::layer_parse(path, Some(&table), &e)),
        }
    }
}

/// Fallback for a container without a usable layer list: its first geometry
/// table, named after the file.
fn read_single(gpkg: &GeoPackage, file: &VectorFile, set: &mut LayerSet) {
    let single = gpkg.first_geometry_table()
        .and_then(|table| gpkg.read_layer(&table, &file.stem()));
    match single {
        Ok(layer) => set.push(layer),
        Err(e) => set.warn(Error::layer_parse(file.path(), None, &e)),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rusqlite::{params, Connection};
    use shapefile::dbase::{FieldName, TableWriterBuilder};

    use super::*;
    use crate::layer::Value;

    const SRS_AND_GEOMETRY_COLUMNS: &str = r#"
        CREATE TABLE gpkg_spatial_ref_sys (
            srs_name TEXT NOT NULL, srs_id INTEGER PRIMARY KEY, organization TEXT NOT NULL,
            organization_coordsys_id INTEGER NOT NULL, definition TEXT NOT NULL, description TEXT);
        INSERT INTO gpkg_spatial_ref_sys VALUES ('WGS 84', 4326, 'EPSG', 4326, 'GEOGCS["WGS 84"]', NULL);
        CREATE TABLE gpkg_geometry_columns (
            table_name TEXT NOT NULL, column_name TEXT NOT NULL, geometry_type_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL, z TINYINT NOT NULL, m TINYINT NOT NULL);
        CREATE TABLE blocks (fid INTEGER PRIMARY KEY AUTOINCREMENT, geom BLOB, label TEXT);
        INSERT INTO gpkg_geometry_columns VALUES ('blocks', 'geom', 'POINT', 4326, 0, 0);
    "#;

    const CONTENTS: &str = r#"
        CREATE TABLE gpkg_contents (
            table_name TEXT NOT NULL PRIMARY KEY, data_type TEXT NOT NULL, identifier TEXT,
            description TEXT DEFAULT '', last_change DATETIME, min_x DOUBLE, min_y DOUBLE,
            max_x DOUBLE, max_y DOUBLE, srs_id INTEGER);
    "#;

    /// GP header (little endian, no envelope) followed by a WKB point.
    fn point_blob(x: f64, y: f64) -> Vec<u8> {
        let mut blob = b"GP".to_vec();
        blob.extend_from_slice(&[0, 0b0000_0001]);
        blob.extend_from_slice(&4326i32.to_le_bytes());
        blob.push(1);
        blob.extend_from_slice(&1u32.to_le_bytes());
        blob.extend_from_slice(&x.to_le_bytes());
        blob.extend_from_slice(&y.to_le_bytes());
        blob
    }

    fn gpkg(path: &Path, schema: &str, rows: &[(f64, f64, &str)]) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(schema).unwrap();
        for (x, y, label) in rows {
            conn.execute("INSERT INTO blocks (geom, label) VALUES (?1, ?2)", params![point_blob(*x, *y), label]).unwrap();
        }
    }

    fn read(path: &Path) -> LayerSet {
        read_layers(&VectorFile::new(path).unwrap())
    }

    #[test]
    fn gpkg_without_contents_reads_first_geometry_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.gpkg");
        gpkg(&path, SRS_AND_GEOMETRY_COLUMNS, &[(74.3, 31.5, "A"), (74.4, 31.6, "B")]);

        let set = read(&path);
        assert!(set.warnings.is_empty(), "{:?}", set.warnings);
        assert_eq!(set.layers.len(), 1);
        assert_eq!(set.layers[0].name(), "legacy");
        assert_eq!(set.layers[0].len(), 2);
    }

    #[test]
    fn gpkg_with_no_registered_features_reads_first_geometry_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unlisted.gpkg");
        gpkg(&path, &format!("{SRS_AND_GEOMETRY_COLUMNS}{CONTENTS}"), &[(74.3, 31.5, "A")]);

        let set = read(&path);
        assert!(set.warnings.is_empty(), "{:?}", set.warnings);
        assert_eq!(set.layers.len(), 1);
        assert_eq!(set.layers[0].name(), "unlisted");
        assert_eq!(set.layers[0].property(0, "label"), Some(&Value::Text("A".into())));
    }

    #[test]
    fn gpkg_table_without_rows_yields_no_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.gpkg");
        let schema = format!(
            "{SRS_AND_GEOMETRY_COLUMNS}{CONTENTS}
            INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id) VALUES ('blocks', 'features', 'blocks', 4326);"
        );
        gpkg(&path, &schema, &[]);

        let set = read(&path);
        assert!(set.layers.is_empty());
        assert!(set.warnings.is_empty(), "{:?}", set.warnings);
    }

    #[test]
    fn shapefile_without_shapes_yields_no_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.shp");
        let table = TableWriterBuilder::new()
            .add_character_field(FieldName::try_from("name").unwrap(), 16);
        drop(shapefile::Writer::from_path(&path, table).unwrap());

        let set = read(&path);
        assert!(set.layers.is_empty());
        assert!(set.warnings.is_empty(), "{:?}", set.warnings);
    }

    #[test]
    fn unreadable_file_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.geojson");
        std::fs::write(&path, "{ not json").unwrap();

        let set = read(&path);
        assert!(set.layers.is_empty());
        assert!(matches!(&set.warnings[..], [Error::LayerParse { layer: None, .. }]));
    }
}
