use geo::{Coord, Rect};

use crate::{geom, layer::Layer};

/// Map center used when no layer has a usable extent (Lahore).
pub const FALLBACK_CENTER: (f64, f64) = (31.5204, 74.3587);

/// Zoom level of every generated map unless overridden.
pub const DEFAULT_ZOOM: u8 = 12;

/// Initial view of a map: center as (lat, lon), zoom, and the data extent if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: (f64, f64),
    pub zoom: u8,
    pub bounds: Option<Rect<f64>>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { center: FALLBACK_CENTER, zoom: DEFAULT_ZOOM, bounds: None }
    }
}

impl Viewport {
    /// Fixed center and zoom, no extent.
    pub fn centered(lat: f64, lon: f64, zoom: u8) -> Self {
        Self { center: (lat, lon), zoom, bounds: None }
    }

    /// Center on the union of the layers' bounding boxes.
    ///
    /// Layers without extent, or with non-finite bounds, are skipped. With
    /// nothing left the fallback center is used.
    pub fn from_layers<'a>(layers: impl IntoIterator<Item = &'a Layer>) -> Self {
        let bounds = layers.into_iter()
            .filter_map(Layer::bounding_box)
            .filter(|r| is_finite(r.min()) && is_finite(r.max()))
            .reduce(geom::union_rect);

        match bounds {
            Some(b) => {
                let c = b.center();
                Self { center: (c.y, c.x), zoom: DEFAULT_ZOOM, bounds: Some(b) }
            }
            None => Self::default(),
        }
    }
}

#[inline]
fn is_finite(c: Coord<f64>) -> bool { c.x.is_finite() && c.y.is_finite() }
