#![doc = "Society map builder public API"]
mod common;
mod error;
mod export;
mod geom;
mod io;
mod layer;
mod map;
mod prices;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use common::{find_vector_files, order_by_priority, require_dir_exists};

#[doc(inline)]
pub use export::{export_geojson, ExportOptions, ExportReport};

#[doc(inline)]
pub use geom::{normalize, Crs, Normalized};

#[doc(inline)]
pub use layer::{read_layers, sanitize, ColumnKind, Feature, Field, Format, Layer, LayerSet, Value, VectorFile};

#[doc(inline)]
pub use map::{
    build_map, BuildOptions, Choropleth, LeafletMap, MapRenderer, Overlay, OverlaySummary, Report,
    Style, TileTheme, TooltipField, Viewport, DEFAULT_ZOOM, FALLBACK_CENTER, MAX_TOOLTIP_FIELDS,
};

#[doc(inline)]
pub use prices::{
    build_choropleth, parse_price, ChoroplethOptions, ChoroplethReport, Listing, PriceListings,
    SocietyLookup, DHA_SOCIETIES,
};
