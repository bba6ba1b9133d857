use std::path::PathBuf;

/// Society map builder
#[derive(clap::Parser, Debug)]
#[command(name = "societymap", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Draw every vector layer under a directory onto one web map
    Build(BuildArgs),

    /// Color DHA areas by average listing price
    Choropleth(ChoroplethArgs),

    /// Convert one vector layer to GeoJSON in EPSG:4326
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Directory searched for .shp, .gpkg, .geojson and .json files
    #[arg(default_value = "society-maps", value_hint = clap::ValueHint::DirPath)]
    pub root: PathBuf,

    /// Output HTML file, defaults to "<ROOT>/full_map.html"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Files under directories containing this name are drawn first
    #[arg(long, default_value = "split_areas")]
    pub priority: String,

    /// Use OpenStreetMap tiles instead of CartoDB Positron
    #[arg(long)]
    pub osm: bool,
}

#[derive(clap::Args, Debug)]
pub struct ChoroplethArgs {
    /// Listings CSV with Location and Price columns
    #[arg(long, default_value = "data/zameen_lahore_data.csv", value_hint = clap::ValueHint::FilePath)]
    pub listings: PathBuf,

    /// Area polygons with an id attribute
    #[arg(long, default_value = "society-maps/DHA/Split_Areas/DHA_AREA_split.geojson", value_hint = clap::ValueHint::FilePath)]
    pub areas: PathBuf,

    /// Attribute of the area polygons holding the area id
    #[arg(long, default_value = "id")]
    pub id_field: String,

    /// Output HTML file
    #[arg(short, long, default_value = "dha_price_heatmap.html", value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Shapefile, GeoPackage or GeoJSON to convert
    #[arg(default_value = "society-maps/DHA/Split_Areas/DHA_AREA_split.shp", value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output GeoJSON file, defaults to the input with a .geojson extension
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Layer to export from a GeoPackage, defaults to the first
    #[arg(long)]
    pub layer: Option<String>,
}
