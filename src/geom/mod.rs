mod crs;
mod reproject;

pub use crs::Crs;
pub use reproject::{normalize, Normalized};

use geo::{Coord, CoordsIter, Geometry, Rect};

/// Smallest rectangle covering both `a` and `b`.
pub(crate) fn union_rect(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
        Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
    )
}

/// True when a geometry has no coordinates.
pub(crate) fn is_empty(geometry: &Geometry<f64>) -> bool {
    geometry.coords_iter().next().is_none()
}
