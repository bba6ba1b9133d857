use std::path::{Path, PathBuf};

use serde_json::Value as Json;

use crate::{io::geojson, layer::{Layer, Value}, Error};

/// Tooltips list at most this many attribute columns.
pub const MAX_TOOLTIP_FIELDS: usize = 10;

/// Base map tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileTheme {
    #[default]
    CartoDbPositron,
    OpenStreetMap,
}

impl TileTheme {
    pub fn url(&self) -> &'static str {
        match self {
            TileTheme::CartoDbPositron => "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
            TileTheme::OpenStreetMap => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            TileTheme::CartoDbPositron => "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>",
            TileTheme::OpenStreetMap => "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors",
        }
    }

    #[inline] pub fn max_zoom(&self) -> u8 { match self { TileTheme::CartoDbPositron => 20, TileTheme::OpenStreetMap => 19 } }
}

/// Vector styling of an overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    /// CSS color of outlines (and fills, unless a choropleth sets them).
    pub color: String,
    pub weight: f64,
    pub fill_opacity: f64,
}

impl Style {
    pub fn outline(color: impl Into<String>) -> Self {
        Self { color: color.into(), weight: 1.0, fill_opacity: 0.2 }
    }
}

/// A field shown in a tooltip, with its display label.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipField {
    pub field: String,
    pub alias: String,
}

impl TooltipField {
    pub fn new(field: impl Into<String>, alias: impl Into<String>) -> Self {
        Self { field: field.into(), alias: alias.into() }
    }
}

/// One layer converted into renderable GeoJSON.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub name: String,
    pub data: Json,
    pub style: Style,
    pub tooltip: Vec<TooltipField>,
    pub feature_count: usize,
}

impl Overlay {
    /// Convert a sanitized, normalized layer. Tooltips list the first ten columns.
    ///
    /// Fails with [`Error::Serialization`] if any attribute is not a JSON primitive
    /// or any coordinate is non-finite.
    pub fn from_layer(layer: &Layer, style: Style) -> Result<Self, Error> {
        let data = geojson::layer_to_geojson(layer).map_err(|e| Error::Serialization {
            layer: layer.name().to_string(),
            reason: format!("{e:#}"),
        })?;
        let tooltip = layer.column_names()
            .take(MAX_TOOLTIP_FIELDS)
            .map(|name| TooltipField::new(name, name))
            .collect();
        Ok(Self { name: layer.name().to_string(), data, style, tooltip, feature_count: layer.len() })
    }
}

/// A layer filled by a numeric attribute.
#[derive(Debug, Clone)]
pub struct Choropleth {
    pub name: String,
    pub data: Json,
    /// Attribute driving the fill color.
    pub value_field: String,
    /// Observed (min, max) of the value field; `None` when no feature has a value.
    pub range: Option<(f64, f64)>,
    pub fill_opacity: f64,
    pub line_opacity: f64,
    pub legend: String,
    pub tooltip: Vec<TooltipField>,
}

impl Choropleth {
    /// Convert a sanitized, normalized layer colored by `value_field`.
    pub fn from_layer(layer: &Layer, value_field: &str, legend: impl Into<String>, tooltip: Vec<TooltipField>) -> Result<Self, Error> {
        let data = geojson::layer_to_geojson(layer).map_err(|e| Error::Serialization {
            layer: layer.name().to_string(),
            reason: format!("{e:#}"),
        })?;

        let range = (0..layer.len())
            .filter_map(|row| match layer.property(row, value_field)? {
                Value::Int(i) => Some(*i as f64),
                Value::Float(f) if f.is_finite() => Some(*f),
                _ => None,
            })
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            });

        Ok(Self {
            name: layer.name().to_string(),
            data,
            value_field: value_field.to_string(),
            range,
            fill_opacity: 0.7,
            line_opacity: 0.2,
            legend: legend.into(),
            tooltip,
        })
    }
}

/// Something that can draw overlays onto a base map and write the result.
pub trait MapRenderer {
    /// Add a styled overlay with tooltip and legend entry.
    fn add_overlay(&mut self, overlay: Overlay) -> Result<(), Error>;

    /// Add a choropleth overlay with a color legend.
    fn add_choropleth(&mut self, choropleth: Choropleth) -> Result<(), Error>;

    /// Add a control toggling overlays.
    fn add_layer_control(&mut self, collapsed: bool);

    /// Write the map to `path`, returning the written path.
    fn save(&self, path: &Path) -> Result<PathBuf, Error>;
}
