use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, Geometry, MapCoords};
use proj4rs::{proj::Proj as Proj4, transform::transform};
use tracing::{debug, warn};

use crate::{geom::{crs::WGS84_LONGLAT, Crs}, layer::Layer, Error};

/// What the normalizer did with a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// No reference system declared; geometry passed through as-is.
    Undeclared,
    /// Already EPSG:4326.
    AlreadyWgs84,
    /// Geometry reprojected from the given system.
    Reprojected(Crs),
}

impl Layer {
    /// Reproject this layer into EPSG:4326.
    ///
    /// A layer without a declared system is left alone. On error the layer is
    /// untouched: every geometry is transformed before any is replaced.
    pub fn to_wgs84(&mut self) -> std::result::Result<Normalized, Error> {
        let Some(source) = self.crs().cloned() else { return Ok(Normalized::Undeclared) };
        if source.is_wgs84() { return Ok(Normalized::AlreadyWgs84) }

        let projected = reproject_geometries(self, &source).map_err(|e| Error::Reprojection {
            layer: self.name().to_string(),
            crs: source.to_string(),
            reason: format!("{e:#}"),
        })?;

        for (feature, geometry) in self.features_mut().iter_mut().zip(projected) {
            feature.geometry = geometry;
        }
        self.set_crs(Some(Crs::WGS84));
        Ok(Normalized::Reprojected(source))
    }
}

/// Normalizer stage: reproject to EPSG:4326, or log and keep the layer as it was.
pub fn normalize(layer: &mut Layer, warnings: &mut Vec<Error>) {
    match layer.to_wgs84() {
        Ok(Normalized::Reprojected(from)) => debug!("Reprojected layer {} from {from} to EPSG:4326", layer.name()),
        Ok(Normalized::Undeclared) => debug!("Layer {} declares no reference system; assuming lon/lat", layer.name()),
        Ok(Normalized::AlreadyWgs84) => {}
        Err(e) => {
            warn!("CRS transform warning: {e}");
            warnings.push(e);
        }
    }
}

/// Build the proj4rs projection of `crs`: registered EPSG codes come from the
/// bundled definitions, the rest from [`Crs::proj_string`].
fn source_proj(crs: &Crs) -> Result<Proj4> {
    if let Some(proj_string) = crs.proj_string() {
        return Proj4::from_proj_string(proj_string)
            .with_context(|| anyhow!("failed to build source PROJ.4: {proj_string}"));
    }
    let code = crs.epsg()
        .and_then(|code| u16::try_from(code).ok())
        .ok_or_else(|| anyhow!("no PROJ definition for {crs}"))?;
    Proj4::from_epsg_code(code).with_context(|| anyhow!("no PROJ definition for {crs}"))
}

/// Transform every geometry of `layer` from `source` into lon/lat degrees.
fn reproject_geometries(layer: &Layer, source: &Crs) -> Result<Vec<Geometry<f64>>> {
    let from = source_proj(source)?;
    let to = Proj4::from_proj_string(WGS84_LONGLAT)
        .with_context(|| anyhow!("failed to build target PROJ.4: {WGS84_LONGLAT}"))?;

    let geographic = from.is_latlong();
    layer.features().iter()
        .map(|feature| feature.geometry.try_map_coords(|coord: Coord<f64>| -> Result<Coord<f64>> {
            // proj4rs works in radians for geographic systems, in and out.
            let mut point = if geographic {
                (coord.x.to_radians(), coord.y.to_radians(), 0.0)
            } else {
                (coord.x, coord.y, 0.0)
            };
            transform(&from, &to, &mut point)
                .with_context(|| format!("transform failed at ({}, {})", coord.x, coord.y))?;

            let (lon, lat) = (point.0.to_degrees(), point.1.to_degrees());
            if !(lon.is_finite() && lat.is_finite() && lon.abs() <= 180.0 && lat.abs() <= 90.0) {
                bail!("({}, {}) projects outside lon/lat range: ({lon}, {lat})", coord.x, coord.y);
            }
            Ok(Coord { x: lon, y: lat })
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Feature, Value};
    use geo::{point, polygon, CoordsIter};

    fn layer(geometry: Geometry<f64>, crs: Option<Crs>) -> Layer {
        Layer::new("test", vec!["id".into()], vec![Feature { properties: vec![Value::Int(1)], geometry }], crs)
    }

    #[test]
    fn undeclared_layers_pass_through() {
        let mut l = layer(point!(x: 438000.0, y: 3487000.0).into(), None);
        let before = l.features()[0].geometry.clone();
        assert_eq!(l.to_wgs84().unwrap(), Normalized::Undeclared);
        assert_eq!(l.features()[0].geometry, before);
        assert_eq!(l.crs(), None);
    }

    #[test]
    fn wgs84_is_idempotent() {
        let mut l = layer(polygon![(x: 74.1, y: 31.4), (x: 74.5, y: 31.4), (x: 74.5, y: 31.6)].into(), Some(Crs::WGS84));
        let before = l.features()[0].geometry.clone();
        l.to_wgs84().unwrap();
        l.to_wgs84().unwrap();
        let bits = |g: &Geometry<f64>| g.coords_iter().map(|c| (c.x.to_bits(), c.y.to_bits())).collect::<Vec<_>>();
        assert_eq!(bits(&l.features()[0].geometry), bits(&before));
    }

    #[test]
    fn utm_43n_lands_near_lahore() {
        let mut l = layer(point!(x: 438_000.0, y: 3_487_000.0).into(), Some(Crs::Epsg(32643)));
        assert_eq!(l.to_wgs84().unwrap(), Normalized::Reprojected(Crs::Epsg(32643)));
        assert_eq!(l.crs(), Some(&Crs::WGS84));

        let Geometry::Point(p) = &l.features()[0].geometry else { panic!("expected point") };
        assert!((74.0..75.0).contains(&p.x()), "lon {}", p.x());
        assert!((31.0..32.0).contains(&p.y()), "lat {}", p.y());
    }

    #[test]
    fn registered_codes_resolve_without_a_local_table() {
        // Kalianpur 1975 / India zone I: the false origin sits at 68E 32.5N.
        let mut l = layer(point!(x: 2_743_195.5, y: 914_398.5).into(), Some(Crs::Epsg(24378)));
        assert_eq!(l.to_wgs84().unwrap(), Normalized::Reprojected(Crs::Epsg(24378)));

        let Geometry::Point(p) = &l.features()[0].geometry else { panic!("expected point") };
        assert!((p.x() - 68.0).abs() < 0.05, "lon {}", p.x());
        assert!((p.y() - 32.5).abs() < 0.05, "lat {}", p.y());
    }

    #[test]
    fn geographic_sources_convert_through_radians() {
        // NAD83 differs from WGS 84 by well under a metre.
        let mut l = layer(point!(x: -100.0, y: 40.0).into(), Some(Crs::Epsg(4269)));
        l.to_wgs84().unwrap();
        let Geometry::Point(p) = &l.features()[0].geometry else { panic!("expected point") };
        assert!((p.x() + 100.0).abs() < 1e-3 && (p.y() - 40.0).abs() < 1e-3, "{p:?}");
    }

    #[test]
    fn legacy_google_mercator_code() {
        let mut l = layer(point!(x: 0.0, y: 0.0).into(), Some(Crs::Epsg(900913)));
        l.to_wgs84().unwrap();
        let Geometry::Point(p) = &l.features()[0].geometry else { panic!("expected point") };
        assert!(p.x().abs() < 1e-9 && p.y().abs() < 1e-9, "{p:?}");
    }

    #[test]
    fn unregistered_code_fails() {
        let mut l = layer(point!(x: 1.0, y: 2.0).into(), Some(Crs::Epsg(99999)));
        let err = l.to_wgs84().unwrap_err();
        assert!(matches!(&err, Error::Reprojection { crs, .. } if crs == "EPSG:99999"), "{err}");
    }

    #[test]
    fn wkt_with_only_a_nested_authority_is_not_passed_through() {
        let wkt = r#"PROJCS["Lahore_Local_TM",GEOGCS["GCS_WGS_1984",AUTHORITY["EPSG","4326"]],PROJECTION["Transverse_Mercator"],UNIT["Meter",1.0]]"#;
        let mut l = layer(point!(x: 438_000.0, y: 3_487_000.0).into(), Some(Crs::from_wkt(wkt)));
        let mut warnings = Vec::new();
        normalize(&mut l, &mut warnings);

        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], Error::Reprojection { .. }));
        assert_ne!(l.crs(), Some(&Crs::WGS84));
    }

    #[test]
    fn unknown_definition_fails_and_keeps_layer() {
        let crs = Crs::Definition(r#"PROJCS["Local_Grid"]"#.into());
        let mut l = layer(point!(x: 10.0, y: 20.0).into(), Some(crs.clone()));
        let mut warnings = Vec::new();
        normalize(&mut l, &mut warnings);

        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], Error::Reprojection { .. }));
        assert_eq!(l.crs(), Some(&crs));
        assert_eq!(l.features()[0].geometry, point!(x: 10.0, y: 20.0).into());
    }
}
