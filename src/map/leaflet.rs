use std::{io::Write, path::{Path, PathBuf}};

use serde_json::{json, Value as Json};
use tracing::debug;

use crate::{
    common::PendingWrite,
    io::html::{js_literal, ColorScale, HtmlWriter},
    map::{render::{Choropleth, MapRenderer, Overlay, TileTheme, TooltipField}, Viewport},
    Error,
};

/// A Leaflet web map written as one self-contained HTML document.
#[derive(Debug, Clone)]
pub struct LeafletMap {
    title: String,
    viewport: Viewport,
    tiles: TileTheme,
    /// Script statements adding each overlay, in draw order.
    statements: Vec<String>,
    /// (layer name, outline color) for the overlay legend.
    legend: Vec<(String, String)>,
    layer_control: Option<bool>,
}

impl LeafletMap {
    /// Base map centred on `viewport`.
    pub fn new(viewport: Viewport, tiles: TileTheme) -> Self {
        Self {
            title: "Map".to_string(),
            viewport,
            tiles,
            statements: Vec::new(),
            legend: Vec::new(),
            layer_control: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[inline] pub fn viewport(&self) -> &Viewport { &self.viewport }
    #[inline] pub fn overlay_count(&self) -> usize { self.statements.len() }

    /// Render the document into any writer.
    pub fn write_to<W: Write>(&self, writer: W) -> std::io::Result<W> {
        let mut html = HtmlWriter::new(writer);
        html.write_header(&self.title)?;

        let (lat, lon) = self.viewport.center;
        writeln!(html, "var map = L.map(\"map\", {{center: [{lat}, {lon}], zoom: {}}});", self.viewport.zoom)?;
        writeln!(html, "L.tileLayer({}, {{attribution: {}, subdomains: \"abcd\", maxZoom: {}}}).addTo(map);",
            json!(self.tiles.url()), json!(self.tiles.attribution()), self.tiles.max_zoom())?;
        writeln!(html, "var overlays = {{}};")?;

        for statement in &self.statements {
            writeln!(html, "{statement}")?;
        }

        if !self.legend.is_empty() {
            let entries: Vec<[&str; 2]> = self.legend.iter().map(|(n, c)| [n.as_str(), c.as_str()]).collect();
            writeln!(html, "addLegend({});", js_literal(&entries)?)?;
        }
        if let Some(collapsed) = self.layer_control {
            writeln!(html, "L.control.layers(null, overlays, {{collapsed: {collapsed}}}).addTo(map);")?;
        }

        html.write_footer()?;
        Ok(html.into_inner())
    }
}

/// `addOverlay(...)` call for one layer.
fn overlay_statement(name: &str, data: &Json, style: &Json, tooltip: &[TooltipField]) -> serde_json::Result<String> {
    let fields: Vec<&str> = tooltip.iter().map(|t| t.field.as_str()).collect();
    let aliases: Vec<&str> = tooltip.iter().map(|t| t.alias.as_str()).collect();
    Ok(format!(
        "addOverlay({}, {}, {}, {}, {});",
        js_literal(name)?, js_literal(data)?, js_literal(style)?, js_literal(&fields)?, js_literal(&aliases)?,
    ))
}

impl MapRenderer for LeafletMap {
    fn add_overlay(&mut self, overlay: Overlay) -> Result<(), Error> {
        let style = json!({
            "color": overlay.style.color,
            "weight": overlay.style.weight,
            "fillOpacity": overlay.style.fill_opacity,
        });
        let statement = overlay_statement(&overlay.name, &overlay.data, &style, &overlay.tooltip)
            .map_err(|e| Error::Serialization { layer: overlay.name.clone(), reason: e.to_string() })?;

        debug!("Added overlay {} ({} features)", overlay.name, overlay.feature_count);
        self.statements.push(statement);
        self.legend.push((overlay.name, overlay.style.color));
        Ok(())
    }

    fn add_choropleth(&mut self, mut choropleth: Choropleth) -> Result<(), Error> {
        let (min, max) = choropleth.range.unwrap_or((0.0, 0.0));
        let scale = ColorScale::yl_or_rd(min, max);

        // Per-feature fill goes in a `style` foreign member, merged by addOverlay.
        if let Some(features) = choropleth.data.get_mut("features").and_then(Json::as_array_mut) {
            for feature in features {
                let value = feature.get("properties")
                    .and_then(|p| p.get(&choropleth.value_field))
                    .and_then(Json::as_f64);
                let fill = scale.color(value).to_string();
                if let Some(object) = feature.as_object_mut() {
                    object.insert("style".to_string(), json!({ "fillColor": fill }));
                }
            }
        }

        let style = json!({
            "color": "#000000",
            "weight": 1,
            "opacity": choropleth.line_opacity,
            "fillOpacity": choropleth.fill_opacity,
        });
        let statement = overlay_statement(&choropleth.name, &choropleth.data, &style, &choropleth.tooltip)
            .and_then(|overlay| {
                let colors: Vec<String> = scale.colors().iter().map(ToString::to_string).collect();
                Ok(format!(
                    "{overlay}\naddColorLegend({}, {}, {});",
                    js_literal(&choropleth.legend)?, js_literal(&colors)?, js_literal(&scale.breaks())?,
                ))
            })
            .map_err(|e| Error::Serialization { layer: choropleth.name.clone(), reason: e.to_string() })?;

        self.statements.push(statement);
        Ok(())
    }

    fn add_layer_control(&mut self, collapsed: bool) {
        self.layer_control = Some(collapsed);
    }

    fn save(&self, path: &Path) -> Result<PathBuf, Error> {
        let pending = self.write_to(PendingWrite::open(path)?)?;
        Ok(pending.finish()?)
    }
}
