//! Map assembly: viewport, renderable overlays, the Leaflet writer and the build pipeline.

mod build;
mod leaflet;
mod render;
mod viewport;

pub use build::{build_map, BuildOptions, OverlaySummary, Report};
pub use leaflet::LeafletMap;
pub use render::{Choropleth, MapRenderer, Overlay, Style, TileTheme, TooltipField, MAX_TOOLTIP_FIELDS};
pub use viewport::{Viewport, DEFAULT_ZOOM, FALLBACK_CENTER};
