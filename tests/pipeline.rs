// End-to-end runs of the map builder and the GeoJSON export over fixture trees:
//   projected shapefiles, empty files, GeoPackages with a corrupt table

use std::path::Path;

use rusqlite::{params, Connection};
use shapefile::{
    dbase::{FieldName, FieldValue, Record, TableWriterBuilder},
    Point, Polygon, PolygonRing,
};
use societymap::{
    build_map, export_geojson, normalize, read_layers, BuildOptions, Crs, Error, ExportOptions, Value, VectorFile,
};

const UTM_43N_PRJ: &str = r#"PROJCS["WGS_1984_UTM_Zone_43N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",75.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

/// Three 1 km squares near Lahore in UTM zone 43N, with a `.prj`.
fn write_utm_shapefile(path: &Path) {
    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("name").unwrap(), 32);
    let mut writer = shapefile::Writer::from_path(path, table).unwrap();

    for (i, x0) in [438_000.0, 440_000.0, 442_000.0].into_iter().enumerate() {
        let y0 = 3_487_000.0;
        let ring = vec![
            Point::new(x0, y0),
            Point::new(x0, y0 + 1000.0),
            Point::new(x0 + 1000.0, y0 + 1000.0),
            Point::new(x0 + 1000.0, y0),
            Point::new(x0, y0),
        ];
        let mut record = Record::default();
        record.insert("name".to_string(), FieldValue::Character(Some(format!("Block {i}"))));
        writer.write_shape_and_record(&Polygon::new(PolygonRing::Outer(ring)), &record).unwrap();
    }
    drop(writer);
    std::fs::write(path.with_extension("prj"), UTM_43N_PRJ).unwrap();
}

/// Points without a `.prj`; the second one has NaN coordinates.
fn write_point_shapefile(path: &Path) {
    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("name").unwrap(), 32);
    let mut writer = shapefile::Writer::from_path(path, table).unwrap();
    for (name, x, y) in [("Gate", 74.35, 31.52), ("Lost", f64::NAN, f64::NAN)] {
        let mut record = Record::default();
        record.insert("name".to_string(), FieldValue::Character(Some(name.to_string())));
        writer.write_shape_and_record(&Point::new(x, y), &record).unwrap();
    }
}

/// GeoPackage geometry blob: little-endian header without envelope, then WKB.
fn gpkg_blob(wkb: &[u8]) -> Vec<u8> {
    let mut blob = b"GP".to_vec();
    blob.extend_from_slice(&[0, 0b0000_0001]);
    blob.extend_from_slice(&4326i32.to_le_bytes());
    blob.extend_from_slice(wkb);
    blob
}

fn wkb_point(x: f64, y: f64) -> Vec<u8> {
    let mut wkb = vec![1u8];
    wkb.extend_from_slice(&1u32.to_le_bytes());
    wkb.extend_from_slice(&x.to_le_bytes());
    wkb.extend_from_slice(&y.to_le_bytes());
    wkb
}

/// A GeoPackage with a readable `parks` table and a `plots` table holding a corrupt geometry.
fn write_gpkg(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(r#"
        CREATE TABLE gpkg_spatial_ref_sys (
            srs_name TEXT NOT NULL, srs_id INTEGER PRIMARY KEY, organization TEXT NOT NULL,
            organization_coordsys_id INTEGER NOT NULL, definition TEXT NOT NULL, description TEXT);
        INSERT INTO gpkg_spatial_ref_sys VALUES ('WGS 84', 4326, 'EPSG', 4326, 'GEOGCS["WGS 84"]', NULL);
        CREATE TABLE gpkg_contents (
            table_name TEXT NOT NULL PRIMARY KEY, data_type TEXT NOT NULL, identifier TEXT,
            description TEXT DEFAULT '', last_change DATETIME, min_x DOUBLE, min_y DOUBLE,
            max_x DOUBLE, max_y DOUBLE, srs_id INTEGER);
        CREATE TABLE gpkg_geometry_columns (
            table_name TEXT NOT NULL, column_name TEXT NOT NULL, geometry_type_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL, z TINYINT NOT NULL, m TINYINT NOT NULL);
        CREATE TABLE parks (fid INTEGER PRIMARY KEY AUTOINCREMENT, geom BLOB, name TEXT, opened DATE);
        CREATE TABLE plots (fid INTEGER PRIMARY KEY AUTOINCREMENT, geom BLOB, plot_no INTEGER);
        INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id) VALUES ('parks', 'features', 'parks', 4326);
        INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id) VALUES ('plots', 'features', 'plots', 4326);
        INSERT INTO gpkg_geometry_columns VALUES ('parks', 'geom', 'POINT', 4326, 0, 0);
        INSERT INTO gpkg_geometry_columns VALUES ('plots', 'geom', 'POINT', 4326, 0, 0);
    "#).unwrap();

    conn.execute(
        "INSERT INTO parks (geom, name, opened) VALUES (?1, ?2, ?3)",
        params![gpkg_blob(&wkb_point(74.35, 31.52)), "Jilani Park", "1997-03-12"],
    ).unwrap();
    conn.execute(
        "INSERT INTO parks (geom, name, opened) VALUES (?1, ?2, NULL)",
        params![gpkg_blob(&wkb_point(74.40, 31.47)), "Model Town Park"],
    ).unwrap();
    conn.execute(
        "INSERT INTO plots (geom, plot_no) VALUES (?1, 7)",
        params![gpkg_blob(&[1, 99, 0, 0, 0, 1, 2, 3])],
    ).unwrap();
}

#[test]
fn projected_shapefile_and_empty_geojson_yield_one_overlay() {
    let dir = tempfile::tempdir().unwrap();
    write_utm_shapefile(&dir.path().join("areas.shp"));
    std::fs::write(dir.path().join("empty.geojson"), r#"{"type":"FeatureCollection","features":[]}"#).unwrap();

    let report = build_map(&BuildOptions::new(dir.path())).unwrap();
    assert_eq!(report.overlays.len(), 1);
    assert_eq!(report.overlays[0].name, "areas");
    assert_eq!(report.overlays[0].features, 3);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.output, dir.path().join("full_map.html"));

    let html = std::fs::read_to_string(&report.output).unwrap();
    assert!(html.contains("Block 2"));
    assert!(!html.contains("\"empty\""));
}

#[test]
fn projected_shapefile_lands_in_lon_lat() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("areas.shp");
    write_utm_shapefile(&path);

    let set = read_layers(&VectorFile::new(&path).unwrap());
    let mut layer = set.layers.into_iter().next().unwrap();
    let mut warnings = Vec::new();
    normalize(&mut layer, &mut warnings);

    assert!(warnings.is_empty());
    let bbox = layer.bounding_box().unwrap();
    assert!((74.0..75.0).contains(&bbox.min().x) && (74.0..75.0).contains(&bbox.max().x));
    assert!((31.0..32.0).contains(&bbox.min().y) && (31.0..32.0).contains(&bbox.max().y));
}

#[test]
fn corrupt_gpkg_table_is_skipped_with_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    write_gpkg(&dir.path().join("zones.gpkg"));

    let report = build_map(&BuildOptions::new(dir.path())).unwrap();
    assert_eq!(report.overlays.len(), 1);
    assert_eq!(report.overlays[0].name, "zones:parks");
    assert_eq!(report.overlays[0].features, 2);

    assert_eq!(report.warnings.len(), 1);
    match &report.warnings[0] {
        Error::LayerParse { path, layer, .. } => {
            assert_eq!(path, &dir.path().join("zones.gpkg"));
            assert_eq!(layer.as_deref(), Some("plots"));
        }
        other => panic!("unexpected warning: {other}"),
    }

    // The date column mixed with nulls was sanitized to text.
    let html = std::fs::read_to_string(&report.output).unwrap();
    assert!(html.contains(r#""opened":"1997-03-12 00:00:00""#));
    assert!(html.contains(r#""opened":"""#));
}

#[test]
fn missing_root_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = build_map(&BuildOptions::new(dir.path().join("society-maps"))).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(!err.is_recoverable());
}

#[test]
fn empty_root_writes_a_base_map() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("maps/out.html");
    let opts = BuildOptions { output: Some(output.clone()), ..BuildOptions::new(dir.path()) };

    let report = build_map(&opts).unwrap();
    assert!(report.overlays.is_empty());
    assert_eq!(report.output, output);

    let html = std::fs::read_to_string(&output).unwrap();
    assert!(html.contains("center: [31.5204, 74.3587], zoom: 12"));
    assert!(html.contains("L.control.layers(null, overlays, {collapsed: false})"));
}

#[test]
fn same_named_shapefile_and_geojson_both_draw() {
    let dir = tempfile::tempdir().unwrap();
    let split = dir.path().join("DHA/Split_Areas");
    std::fs::create_dir_all(&split).unwrap();
    write_utm_shapefile(&split.join("DHA_AREA_split.shp"));
    std::fs::write(
        split.join("DHA_AREA_split.geojson"),
        r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{"id":5},"geometry":{"type":"Point","coordinates":[74.41,31.47]}}]}"#,
    ).unwrap();

    let report = build_map(&BuildOptions::new(dir.path())).unwrap();
    let names: Vec<&str> = report.overlays.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["DHA_AREA_split", "DHA_AREA_split #2"]);
    assert_eq!(report.overlays[1].features, 3);

    let html = std::fs::read_to_string(&report.output).unwrap();
    assert!(html.contains(r#"addOverlay("DHA_AREA_split #2","#));
}

#[test]
fn export_writes_lon_lat_geojson_next_to_the_shapefile() {
    let dir = tempfile::tempdir().unwrap();
    let shp = dir.path().join("DHA_AREA_split.shp");
    write_utm_shapefile(&shp);

    let report = export_geojson(&ExportOptions::new(&shp)).unwrap();
    assert_eq!(report.output, dir.path().join("DHA_AREA_split.geojson"));
    assert_eq!(report.features, 3);
    assert!(report.warnings.is_empty());

    let set = read_layers(&VectorFile::new(&report.output).unwrap());
    let layer = &set.layers[0];
    assert_eq!(layer.crs(), Some(&Crs::WGS84));
    assert_eq!(layer.property(2, "name"), Some(&Value::Text("Block 2".into())));
    let bbox = layer.bounding_box().unwrap();
    assert!((74.0..75.0).contains(&bbox.min().x) && (74.0..75.0).contains(&bbox.max().x));
    assert!((31.0..32.0).contains(&bbox.min().y) && (31.0..32.0).contains(&bbox.max().y));
}

#[test]
fn non_finite_coordinates_skip_only_their_overlay() {
    let dir = tempfile::tempdir().unwrap();
    write_utm_shapefile(&dir.path().join("areas.shp"));
    write_point_shapefile(&dir.path().join("gates.shp"));

    let report = build_map(&BuildOptions::new(dir.path())).unwrap();
    assert_eq!(report.overlays.len(), 1);
    assert_eq!(report.overlays[0].name, "areas");

    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(&report.warnings[0], Error::Serialization { layer, .. } if layer == "gates"), "{}", report.warnings[0]);

    let html = std::fs::read_to_string(&report.output).unwrap();
    assert!(html.contains("Block 2"));
    assert!(!html.contains("Gate"));
}
