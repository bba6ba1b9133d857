//! GeoJSON reading operations.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde_json::{Map, Value as Json};

use crate::{geom::{self, Crs}, layer::{Feature, Layer, Value}};

/// Read a GeoJSON file (FeatureCollection, Feature, or bare geometry) into one layer.
///
/// Property columns are the union of feature property keys in first-seen order.
/// Features without geometry are skipped.
pub(crate) fn read_geojson(path: &Path, name: &str) -> Result<Layer> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("[io::geojson::read] Failed to open {}", path.display()))?;
    let doc: Json = serde_json::from_str(&text)
        .with_context(|| format!("[io::geojson::read] Invalid JSON in {}", path.display()))?;
    layer_from_geojson(&doc, name)
}

pub(crate) fn layer_from_geojson(doc: &Json, name: &str) -> Result<Layer> {
    let crs = crs_member(doc);

    let objects: Vec<&Json> = match member_str(doc, "type")? {
        "FeatureCollection" => doc.get("features")
            .and_then(Json::as_array)
            .ok_or_else(|| anyhow!("[io::geojson::read] FeatureCollection without a features array"))?
            .iter()
            .collect(),
        "Feature" => vec![doc],
        _ => {
            let geometry = geometry_from_json(doc)?;
            let features = if geom::is_empty(&geometry) { vec![] } else { vec![Feature { properties: vec![], geometry }] };
            return Ok(Layer::new(name, vec![], features, crs));
        }
    };

    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<(Vec<(usize, Value)>, Geometry<f64>)> = Vec::with_capacity(objects.len());

    for (i, object) in objects.into_iter().enumerate() {
        let geometry = match object.get("geometry") {
            None | Some(Json::Null) => continue,
            Some(g) => geometry_from_json(g)
                .with_context(|| format!("[io::geojson::read] Invalid geometry in feature {i}"))?,
        };
        if geom::is_empty(&geometry) { continue }

        let empty = Map::new();
        let properties = match object.get("properties") {
            Some(Json::Object(map)) => map,
            None | Some(Json::Null) => &empty,
            Some(other) => bail!("[io::geojson::read] Feature {i} properties must be an object, got {other}"),
        };

        let values = properties.iter()
            .map(|(key, value)| {
                let idx = *index.entry(key.clone()).or_insert_with(|| {
                    columns.push(key.clone());
                    columns.len() - 1
                });
                (idx, value_from_json(value))
            })
            .collect();
        rows.push((values, geometry));
    }

    let width = columns.len();
    let features = rows.into_iter()
        .map(|(values, geometry)| {
            let mut properties = vec![Value::Null; width];
            for (idx, value) in values { properties[idx] = value }
            Feature { properties, geometry }
        })
        .collect();

    Ok(Layer::new(name, columns, features, crs))
}

/// Legacy `crs` member, or EPSG:4326 when absent.
fn crs_member(doc: &Json) -> Option<Crs> {
    let Some(crs) = doc.get("crs").filter(|c| !c.is_null()) else { return Some(Crs::WGS84) };
    let name = crs.get("properties").and_then(|p| p.get("name")).and_then(Json::as_str)?;
    Some(Crs::from_name(name).unwrap_or_else(|| Crs::Definition(name.to_string())))
}

fn member_str<'a>(object: &'a Json, key: &str) -> Result<&'a str> {
    object.get(key)
        .and_then(Json::as_str)
        .ok_or_else(|| anyhow!("[io::geojson::read] Missing \"{key}\" member"))
}

/// Attribute value from a JSON property; ISO date strings become temporal values.
fn value_from_json(value: &Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        Json::String(s) => Value::parse_temporal(s).unwrap_or_else(|| Value::Text(s.clone())),
        nested => Value::Nested(nested.clone()),
    }
}

fn position(value: &Json) -> Result<Coord<f64>> {
    let array = value.as_array()
        .ok_or_else(|| anyhow!("[io::geojson::read] Position must be an array, got {value}"))?;
    match (array.first().and_then(Json::as_f64), array.get(1).and_then(Json::as_f64)) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => bail!("[io::geojson::read] Position needs two numbers, got {value}"),
    }
}

fn positions(value: &Json) -> Result<Vec<Coord<f64>>> {
    value.as_array()
        .ok_or_else(|| anyhow!("[io::geojson::read] Expected an array of positions"))?
        .iter()
        .map(position)
        .collect()
}

fn polygon(value: &Json) -> Result<Polygon<f64>> {
    let mut rings = value.as_array()
        .ok_or_else(|| anyhow!("[io::geojson::read] Expected an array of rings"))?
        .iter()
        .map(|ring| positions(ring).map(LineString));
    let exterior = rings.next().transpose()?.unwrap_or_else(|| LineString(vec![]));
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn each<T>(value: &Json, f: impl Fn(&Json) -> Result<T>) -> Result<Vec<T>> {
    value.as_array()
        .ok_or_else(|| anyhow!("[io::geojson::read] Expected an array of coordinates"))?
        .iter()
        .map(f)
        .collect()
}

/// Parse a GeoJSON geometry object.
pub(crate) fn geometry_from_json(value: &Json) -> Result<Geometry<f64>> {
    let kind = member_str(value, "type")?;
    if kind == "GeometryCollection" {
        let members = value.get("geometries")
            .ok_or_else(|| anyhow!("[io::geojson::read] GeometryCollection without geometries"))?;
        return Ok(Geometry::GeometryCollection(GeometryCollection(each(members, geometry_from_json)?)));
    }

    let coords = value.get("coordinates")
        .ok_or_else(|| anyhow!("[io::geojson::read] {kind} without coordinates"))?;
    let geometry = match kind {
        "Point" => match coords.as_array() {
            Some(a) if a.is_empty() => Geometry::MultiPoint(MultiPoint(vec![])),
            _ => Geometry::Point(Point(position(coords)?)),
        },
        "MultiPoint" => Geometry::MultiPoint(MultiPoint(each(coords, |c| position(c).map(Point))?)),
        "LineString" => Geometry::LineString(LineString(positions(coords)?)),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString(each(coords, |c| positions(c).map(LineString))?)),
        "Polygon" => Geometry::Polygon(polygon(coords)?),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon(each(coords, polygon)?)),
        other => bail!("[io::geojson::read] Unsupported geometry type {other}"),
    };
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn properties_keep_first_seen_order() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"name": "A", "area": 2.5}, "geometry": {"type": "Point", "coordinates": [74.3, 31.5]}},
                {"type": "Feature", "properties": {"zone": [1, 2], "name": "B"}, "geometry": {"type": "Point", "coordinates": [74.4, 31.6]}},
                {"type": "Feature", "properties": {"name": "C"}, "geometry": null},
            ],
        });
        let layer = layer_from_geojson(&doc, "pts").unwrap();
        assert_eq!(layer.column_names().collect::<Vec<_>>(), vec!["name", "area", "zone"]);
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.property(1, "area"), Some(&Value::Null));
        assert_eq!(layer.property(1, "zone"), Some(&Value::Nested(json!([1, 2]))));
        assert_eq!(layer.crs(), Some(&Crs::WGS84));
    }

    #[test]
    fn legacy_crs_member_is_honored() {
        let doc = json!({
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32643"}},
            "features": [],
        });
        let layer = layer_from_geojson(&doc, "empty").unwrap();
        assert!(layer.is_empty());
        assert_eq!(layer.crs(), Some(&Crs::Epsg(32643)));
    }

    #[test]
    fn date_strings_become_temporal_values() {
        let doc = json!({"type": "Feature", "properties": {"listed": "2024-05-06", "note": "2024"}, "geometry": {"type": "Point", "coordinates": [0, 0]}});
        let layer = layer_from_geojson(&doc, "one").unwrap();
        assert!(matches!(layer.property(0, "listed"), Some(Value::Date(_))));
        assert_eq!(layer.property(0, "note"), Some(&Value::Text("2024".into())));
    }

    #[test]
    fn polygon_with_hole_parses() {
        let g = geometry_from_json(&json!({
            "type": "Polygon",
            "coordinates": [
                [[0, 0], [4, 0], [4, 4], [0, 0]],
                [[1, 1], [2, 1], [2, 2], [1, 1]],
            ],
        })).unwrap();
        let Geometry::Polygon(p) = g else { panic!("expected polygon") };
        assert_eq!(p.interiors().len(), 1);
        assert!(geometry_from_json(&json!({"type": "Circle", "coordinates": [0, 0]})).is_err());
    }
}
