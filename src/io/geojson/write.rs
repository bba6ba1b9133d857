//! GeoJSON writing operations.

use anyhow::{anyhow, ensure, Context, Result};
use geo::{Coord, Geometry, LineString, Polygon};
use serde_json::{json, Map, Value as Json};

use crate::layer::Layer;

/// Export a layer as a GeoJSON FeatureCollection.
///
/// Fails on any attribute that is not a JSON primitive and on any non-finite
/// coordinate, so the output is always valid JSON.
pub(crate) fn layer_to_geojson(layer: &Layer) -> Result<Json> {
    let features = layer.features().iter().enumerate()
        .map(|(row, feature)| {
            let mut properties = Map::new();
            for (field, value) in layer.fields().iter().zip(&feature.properties) {
                let json = value.to_json()
                    .ok_or_else(|| anyhow!("[io::geojson::write] Column {} row {row} is not JSON-safe: {value:?}", field.name))?;
                properties.insert(field.name.clone(), json);
            }
            let geometry = geometry_to_json(&feature.geometry)
                .with_context(|| format!("[io::geojson::write] Invalid geometry in row {row}"))?;
            Ok(json!({
                "type": "Feature",
                "geometry": geometry,
                "properties": properties,
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "type": "FeatureCollection",
        "features": features,
    }))
}

fn position(c: &Coord<f64>) -> Result<Json> {
    ensure!(c.x.is_finite() && c.y.is_finite(), "non-finite coordinate ({}, {})", c.x, c.y);
    Ok(json!([c.x, c.y]))
}

fn line(ls: &LineString<f64>) -> Result<Json> {
    ls.coords().map(position).collect::<Result<Vec<_>>>().map(Json::Array)
}

fn rings(polygon: &Polygon<f64>) -> Result<Json> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(line)
        .collect::<Result<Vec<_>>>()
        .map(Json::Array)
}

/// Convert a geometry to its GeoJSON object.
pub(crate) fn geometry_to_json(geometry: &Geometry<f64>) -> Result<Json> {
    let (kind, coordinates) = match geometry {
        Geometry::Point(p) => ("Point", position(&p.0)?),
        Geometry::Line(l) => ("LineString", json!([position(&l.start)?, position(&l.end)?])),
        Geometry::LineString(ls) => ("LineString", line(ls)?),
        Geometry::Polygon(p) => ("Polygon", rings(p)?),
        Geometry::MultiPoint(mp) => ("MultiPoint", mp.0.iter().map(|p| position(&p.0)).collect::<Result<Vec<_>>>()?.into()),
        Geometry::MultiLineString(mls) => ("MultiLineString", mls.0.iter().map(line).collect::<Result<Vec<_>>>()?.into()),
        Geometry::MultiPolygon(mp) => ("MultiPolygon", mp.0.iter().map(rings).collect::<Result<Vec<_>>>()?.into()),
        Geometry::Rect(r) => ("Polygon", rings(&r.to_polygon())?),
        Geometry::Triangle(t) => ("Polygon", rings(&t.to_polygon())?),
        Geometry::GeometryCollection(gc) => {
            let geometries = gc.0.iter().map(geometry_to_json).collect::<Result<Vec<_>>>()?;
            return Ok(json!({ "type": "GeometryCollection", "geometries": geometries }));
        }
    };
    Ok(json!({ "type": kind, "coordinates": coordinates }))
}
