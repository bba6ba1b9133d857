use std::path::PathBuf;

use tracing::{info, warn};

use crate::{
    geom::normalize,
    layer::{read_layers, sanitize, Value, VectorFile},
    map::{Choropleth, LeafletMap, MapRenderer, TileTheme, TooltipField, Viewport},
    prices::{PriceListings, SocietyLookup},
    Error,
};

const LEGEND: &str = "Average Price (PKR)";

/// Options for [`build_choropleth`].
#[derive(Debug, Clone)]
pub struct ChoroplethOptions {
    /// Listings CSV with `Location` and `Price` columns.
    pub listings: PathBuf,
    /// Area polygons carrying an id attribute.
    pub areas: PathBuf,
    pub output: PathBuf,
    /// Attribute of `areas` looked up in `lookup`.
    pub id_field: String,
    pub lookup: SocietyLookup,
    pub viewport: Viewport,
    pub tiles: TileTheme,
}

impl Default for ChoroplethOptions {
    fn default() -> Self {
        Self {
            listings: PathBuf::from("data/zameen_lahore_data.csv"),
            areas: PathBuf::from("society-maps/DHA/Split_Areas/DHA_AREA_split.geojson"),
            output: PathBuf::from("dha_price_heatmap.html"),
            id_field: "id".to_string(),
            lookup: SocietyLookup::dha(),
            viewport: Viewport::centered(31.4700, 74.4120, 13),
            tiles: TileTheme::CartoDbPositron,
        }
    }
}

/// Outcome of a choropleth run.
#[derive(Debug)]
pub struct ChoroplethReport {
    pub output: PathBuf,
    /// Area polygons drawn (those whose id names a society).
    pub areas: usize,
    /// Of those, how many have an average price.
    pub priced: usize,
    pub warnings: Vec<Error>,
}

/// Color each named area polygon by the average listing price of its society.
pub fn build_choropleth(opts: &ChoroplethOptions) -> Result<ChoroplethReport, Error> {
    let averages = PriceListings::from_csv(&opts.listings)?.averages();
    info!("Averaged prices for {} societies", averages.len());

    if !opts.areas.is_file() {
        return Err(Error::Configuration(format!("Area file does not exist: {}", opts.areas.display())));
    }
    let file = VectorFile::new(&opts.areas)
        .ok_or_else(|| Error::Configuration(format!("Unsupported area file: {}", opts.areas.display())))?;

    let mut set = read_layers(&file);
    let mut warnings = std::mem::take(&mut set.warnings);
    let Some(mut layer) = set.layers.into_iter().next() else {
        let reason = warnings.first().map(ToString::to_string).unwrap_or_else(|| "no features".to_string());
        return Err(Error::Configuration(format!("No area polygons read from {}: {reason}", opts.areas.display())));
    };
    normalize(&mut layer, &mut warnings);

    let id = layer.field_index(&opts.id_field).ok_or_else(|| {
        Error::Configuration(format!("Area layer {} has no '{}' attribute", layer.name(), opts.id_field))
    })?;

    layer.push_column("Name", |f| {
        f.properties.get(id)
            .and_then(|v| opts.lookup.name_of(v))
            .map_or(Value::Null, |name| Value::Text(name.to_string()))
    });
    let name = layer.fields().len() - 1;
    layer.retain(|f| !f.properties[name].is_null());
    layer.push_column("Price", |f| match &f.properties[name] {
        Value::Text(society) => averages.get(society).map_or(Value::Null, |p| Value::Float(*p)),
        _ => Value::Null,
    });
    layer.select(&["Name", "Price"]);
    sanitize(&mut layer);

    let priced = (0..layer.len())
        .filter(|&row| layer.property(row, "Price").is_some_and(|v| !v.is_null()))
        .count();
    if layer.is_empty() {
        warn!("No area in {} matched a society id", layer.name());
    }
    info!("Drawing {} areas, {priced} with prices", layer.len());

    let choropleth = Choropleth::from_layer(&layer, "Price", LEGEND, vec![
        TooltipField::new("Name", "Society"),
        TooltipField::new("Price", LEGEND),
    ])?;

    let mut map = LeafletMap::new(opts.viewport.clone(), opts.tiles).with_title(LEGEND);
    map.add_choropleth(choropleth)?;
    let output = map.save(&opts.output)?;
    info!("Saved map to {}", output.display());

    Ok(ChoroplethReport { output, areas: layer.len(), priced, warnings })
}
