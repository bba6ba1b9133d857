//! Shapefile reading operations.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use shapefile::{
    dbase::{self, FieldValue, Record},
    Reader, Shape,
};
use tracing::debug;

use crate::{geom::{self, Crs}, layer::{Feature, Layer, Value}};

/// Read a `.shp` with its `.dbf` attributes and `.prj` reference system.
///
/// Columns follow the `.dbf` header order. Null shapes are skipped.
pub(crate) fn read_shapefile(path: &Path, name: &str) -> Result<Layer> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp::read] Failed to open shapefile: {}", path.display()))?;

    let mut rows = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.context("[io::shp::read] Error reading shape+record")?;
        let Some(geometry) = shape_to_geo(&shape) else { continue };
        if geom::is_empty(&geometry) { continue }
        rows.push((geometry, record));
    }

    let columns = field_order(path, rows.first().map(|(_, r)| r));
    let features = rows.into_iter()
        .map(|(geometry, record)| {
            let properties = columns.iter()
                .map(|c| record.get(c).cloned().map(value_from_dbase).unwrap_or(Value::Null))
                .collect();
            Feature { properties, geometry }
        })
        .collect();

    Ok(Layer::new(name, columns, features, read_prj(path)?))
}

/// Column names in `.dbf` header order, falling back to sorted record keys.
fn field_order(path: &Path, first: Option<&Record>) -> Vec<String> {
    let header = dbase::Reader::from_path(path.with_extension("dbf"))
        .map(|reader| reader.fields().iter().map(|f| f.name().to_string()).collect::<Vec<_>>());

    match (header, first) {
        (Ok(names), Some(record)) => names.into_iter().filter(|n| record.get(n).is_some()).collect(),
        (Ok(names), None) => names,
        (Err(e), first) => {
            debug!("Could not read dbf header of {}: {e}", path.display());
            let mut names: Vec<String> = first
                .map(|r| r.clone().into_iter().map(|(k, _)| k).collect())
                .unwrap_or_default();
            names.sort();
            names
        }
    }
}

/// Reference system from the sibling `.prj`, if there is one.
fn read_prj(path: &Path) -> Result<Option<Crs>> {
    let prj = path.with_extension("prj");
    if !prj.exists() { return Ok(None) }
    let wkt = fs::read_to_string(&prj)
        .with_context(|| format!("[io::shp::read] Failed to read {}", prj.display()))?;
    Ok(Some(Crs::from_wkt(&wkt)))
}

fn value_from_dbase(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(s) => s.map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Value::Text)
            .unwrap_or(Value::Null),
        FieldValue::Memo(s) => match s.trim() {
            "" => Value::Null,
            s => Value::Text(s.to_string()),
        },
        FieldValue::Numeric(n) => n.map(Value::Float).unwrap_or(Value::Null),
        FieldValue::Float(f) => f.map(|f| Value::Float(f as f64)).unwrap_or(Value::Null),
        FieldValue::Double(d) => Value::Float(d),
        FieldValue::Currency(c) => Value::Float(c),
        FieldValue::Integer(i) => Value::Int(i as i64),
        FieldValue::Logical(b) => b.map(Value::Bool).unwrap_or(Value::Null),
        FieldValue::Date(d) => d.and_then(|d| NaiveDate::from_ymd_opt(d.year() as i32, d.month(), d.day()))
            .map(Value::Date)
            .unwrap_or(Value::Null),
        FieldValue::DateTime(dt) => {
            let (date, time) = (dt.date(), dt.time());
            NaiveDate::from_ymd_opt(date.year() as i32, date.month(), date.day())
                .zip(NaiveTime::from_hms_opt(time.hours(), time.minutes(), time.seconds()))
                .map(|(d, t)| Value::Timestamp(d.and_time(t)))
                .unwrap_or(Value::Null)
        }
    }
}

/// X/Y access shared by the 2D, M and Z point types; extra ordinates are dropped.
trait Xy {
    fn coord(&self) -> Coord<f64>;
}

impl Xy for shapefile::Point {
    #[inline] fn coord(&self) -> Coord<f64> { Coord { x: self.x, y: self.y } }
}

impl Xy for shapefile::PointM {
    #[inline] fn coord(&self) -> Coord<f64> { Coord { x: self.x, y: self.y } }
}

impl Xy for shapefile::PointZ {
    #[inline] fn coord(&self) -> Coord<f64> { Coord { x: self.x, y: self.y } }
}

fn line<P: Xy>(points: &[P]) -> LineString<f64> {
    LineString(points.iter().map(Xy::coord).collect())
}

fn multipoint<P: Xy>(points: &[P]) -> Geometry<f64> {
    Geometry::MultiPoint(MultiPoint(points.iter().map(|p| Point(p.coord())).collect()))
}

fn multiline<P: Xy>(parts: &[Vec<P>]) -> Geometry<f64> {
    Geometry::MultiLineString(MultiLineString(parts.iter().map(|p| line(p)).collect()))
}

/// Group shapefile rings into polygons: each clockwise exterior with the holes that follow it.
fn polygons<P: Xy>(rings: &[shapefile::PolygonRing<P>]) -> Geometry<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn ensure_closed(coords: &mut Vec<Coord<f64>>) {
        if coords.first() != coords.last() {
            coords.push(coords[0])
        }
    }

    /// Get the signed area of a coord list (negative for clockwise)
    fn signed_area(pts: &[Coord<f64>]) -> f64 {
        pts.windows(2).map(|w| w[0].x * w[1].y - w[1].x * w[0].y).sum::<f64>() / 2.0
    }

    let mut polys: Vec<Polygon<f64>> = Vec::new();
    let mut current_exterior: Option<LineString<f64>> = None;
    let mut current_holes: Vec<LineString<f64>> = Vec::new();

    for ring in rings {
        let mut coords: Vec<Coord<f64>> = ring.points().iter().map(Xy::coord).collect();
        if coords.is_empty() { continue }
        ensure_closed(&mut coords);

        if signed_area(&coords) < 0.0 {
            if let Some(ext) = current_exterior.take() {
                polys.push(Polygon::new(ext, std::mem::take(&mut current_holes)));
            }
            current_exterior = Some(LineString(coords));
        } else {
            current_holes.push(LineString(coords));
        }
    }
    match current_exterior {
        Some(ext) => polys.push(Polygon::new(ext, current_holes)),
        // Rings all wound counter-clockwise: treat each as its own polygon.
        None => polys.extend(current_holes.into_iter().map(|ring| Polygon::new(ring, vec![]))),
    }

    match polys.len() {
        1 => Geometry::Polygon(polys.remove(0)),
        _ => Geometry::MultiPolygon(MultiPolygon(polys)),
    }
}

/// Convert a shapefile shape to a geo geometry; `None` for null shapes and multipatches.
fn shape_to_geo(shape: &Shape) -> Option<Geometry<f64>> {
    let geometry = match shape {
        Shape::NullShape => return None,
        Shape::Point(p) => Geometry::Point(Point(p.coord())),
        Shape::PointM(p) => Geometry::Point(Point(p.coord())),
        Shape::PointZ(p) => Geometry::Point(Point(p.coord())),
        Shape::Multipoint(mp) => multipoint(mp.points()),
        Shape::MultipointM(mp) => multipoint(mp.points()),
        Shape::MultipointZ(mp) => multipoint(mp.points()),
        Shape::Polyline(pl) => multiline(pl.parts()),
        Shape::PolylineM(pl) => multiline(pl.parts()),
        Shape::PolylineZ(pl) => multiline(pl.parts()),
        Shape::Polygon(pg) => polygons(pg.rings()),
        Shape::PolygonM(pg) => polygons(pg.rings()),
        Shape::PolygonZ(pg) => polygons(pg.rings()),
        Shape::Multipatch(_) => {
            debug!("Skipping multipatch shape");
            return None;
        }
    };
    Some(geometry)
}
