//! HTML writing operations for Leaflet maps.

use std::io::{self, Write};

use serde::Serialize;

/// Leaflet release loaded from the CDN.
const LEAFLET_VERSION: &str = "1.9.4";

/// Helpers shared by every map script: overlay registration, tooltips and legends.
const MAP_SCRIPT_PRELUDE: &str = r#"
function escapeHtml(s) {
  return String(s).replace(/[&<>"']/g, function (c) {
    return {"&": "&amp;", "<": "&lt;", ">": "&gt;", '"': "&quot;", "'": "&#39;"}[c];
  });
}
function tooltipHtml(props, fields, aliases) {
  var rows = fields.map(function (f, i) {
    var v = props ? props[f] : null;
    var text = (v === null || v === undefined) ? ""
      : (typeof v === "number") ? v.toLocaleString() : String(v);
    return "<tr><th>" + escapeHtml(aliases[i]) + "</th><td>" + escapeHtml(text) + "</td></tr>";
  });
  return "<table>" + rows.join("") + "</table>";
}
function addOverlay(name, data, style, fields, aliases) {
  var layer = L.geoJSON(data, {
    style: function (feature) { return Object.assign({}, style, feature.style || {}); },
    pointToLayer: function (feature, latlng) { return L.circleMarker(latlng, {radius: 5}); },
    onEachFeature: function (feature, layer) {
      if (fields.length) { layer.bindTooltip(tooltipHtml(feature.properties, fields, aliases), {sticky: true}); }
    }
  }).addTo(map);
  overlays[name] = layer;
  return layer;
}
function addLegend(entries) {
  var legend = L.control({position: "bottomright"});
  legend.onAdd = function () {
    var div = L.DomUtil.create("div", "legend");
    div.innerHTML = entries.map(function (e) {
      return '<div><i style="border-color:' + e[1] + ';background:' + e[1] + '33"></i>' + escapeHtml(e[0]) + "</div>";
    }).join("");
    return div;
  };
  legend.addTo(map);
}
function addColorLegend(caption, colors, breaks) {
  var legend = L.control({position: "topright"});
  legend.onAdd = function () {
    var div = L.DomUtil.create("div", "legend");
    var html = "<b>" + escapeHtml(caption) + "</b>";
    colors.forEach(function (c, i) {
      html += '<div><i style="background:' + c + '"></i>' +
        Math.round(breaks[i]).toLocaleString() + " &ndash; " + Math.round(breaks[i + 1]).toLocaleString() + "</div>";
    });
    div.innerHTML = html;
    return div;
  };
  legend.addTo(map);
}
"#;

pub(crate) struct HtmlWriter<W: Write> {
    writer: W,
}

/// Implement std::io::Write so `write!` / `writeln!` work.
impl<W: Write> Write for HtmlWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> { self.writer.write(buf) }

    fn flush(&mut self) -> io::Result<()> { self.writer.flush() }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> { self.writer.write_all(buf) }
}

impl<W: Write> HtmlWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }

    pub(crate) fn into_inner(self) -> W { self.writer }

    /// Write the document head, the map container and the opening of the map script.
    pub(crate) fn write_header(&mut self, title: &str) -> io::Result<()> {
        writeln!(self, "<!DOCTYPE html>")?;
        writeln!(self, "<html>")?;
        writeln!(self, "<head>")?;
        writeln!(self, r#"<meta charset="utf-8"/>"#)?;
        writeln!(self, r#"<meta name="viewport" content="width=device-width, initial-scale=1.0"/>"#)?;
        writeln!(self, "<title>{}</title>", escape_html(title))?;
        writeln!(self, r#"<link rel="stylesheet" href="https://unpkg.com/leaflet@{LEAFLET_VERSION}/dist/leaflet.css"/>"#)?;
        writeln!(self, r#"<script src="https://unpkg.com/leaflet@{LEAFLET_VERSION}/dist/leaflet.js"></script>"#)?;
        writeln!(self, r##"<style>
    html, body, #map {{ width: 100%; height: 100%; margin: 0; padding: 0; }}
    .legend {{ background: #ffffff; padding: 6px 8px; border-radius: 4px; box-shadow: 0 0 6px rgba(0,0,0,0.3); font: 12px/1.4 sans-serif; }}
    .legend i {{ display: inline-block; width: 14px; height: 14px; margin-right: 6px; vertical-align: middle; border: 2px solid transparent; box-sizing: border-box; }}
    .leaflet-tooltip table th {{ text-align: left; padding-right: 8px; }}
</style>"##)?;
        writeln!(self, "</head>")?;
        writeln!(self, "<body>")?;
        writeln!(self, r#"<div id="map"></div>"#)?;
        writeln!(self, "<script>")?;
        self.write_all(MAP_SCRIPT_PRELUDE.as_bytes())?;
        Ok(())
    }

    /// Close the map script and the document.
    pub(crate) fn write_footer(&mut self) -> io::Result<()> {
        writeln!(self, "</script>")?;
        writeln!(self, "</body>")?;
        writeln!(self, "</html>")?;
        Ok(())
    }
}

/// Escape text for HTML element content and attribute values.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Serialize a value as a JavaScript literal that is safe inside a `<script>` element.
pub(crate) fn js_literal<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_is_well_formed() {
        let mut writer = HtmlWriter::new(Vec::new());
        writer.write_header("DHA <maps>").unwrap();
        writer.write_footer().unwrap();
        let html = String::from_utf8(writer.into_inner()).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>DHA &lt;maps&gt;</title>"));
        assert!(html.contains("leaflet@1.9.4/dist/leaflet.js"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn tooltip_numbers_use_thousands_separators() {
        let mut writer = HtmlWriter::new(Vec::new());
        writer.write_header("map").unwrap();
        let html = String::from_utf8(writer.into_inner()).unwrap();
        assert!(html.contains(r#"(typeof v === "number") ? v.toLocaleString() : String(v)"#));
    }

    #[test]
    fn js_literals_cannot_close_the_script() {
        assert_eq!(js_literal("</script>").unwrap(), r#""<\/script>""#);
    }
}
