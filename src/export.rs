//! Single-file conversion of a vector layer into a GeoJSON file in EPSG:4326.

use std::{io, path::PathBuf};

use tracing::{info, warn};

use crate::{
    common::PendingWrite,
    geom::Normalized,
    io::geojson,
    layer::{read_layers, sanitize, VectorFile},
    Error,
};

/// Options for [`export_geojson`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Shapefile, GeoPackage or GeoJSON to convert.
    pub input: PathBuf,
    /// Output file; defaults to the input path with a `.geojson` extension.
    pub output: Option<PathBuf>,
    /// Layer to export, by full name (`zones:parks`) or table name (`parks`).
    /// Defaults to the first non-empty layer.
    pub layer: Option<String>,
}

impl ExportOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self { input: input.into(), output: None, layer: None }
    }

    #[inline]
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| self.input.with_extension("geojson"))
    }
}

/// Outcome of an export.
#[derive(Debug)]
pub struct ExportReport {
    pub output: PathBuf,
    /// Name of the exported layer.
    pub layer: String,
    pub features: usize,
    /// Failures in other layers of the same file.
    pub warnings: Vec<Error>,
}

/// Read one layer, reproject it to EPSG:4326, sanitize its attributes and
/// write it as a GeoJSON FeatureCollection.
///
/// Unlike [`build_map`](crate::build_map), a failure in the exported layer
/// aborts: its parse, reprojection or serialization error is returned.
pub fn export_geojson(opts: &ExportOptions) -> Result<ExportReport, Error> {
    let output = opts.output_path();
    if !opts.input.is_file() {
        return Err(Error::Configuration(format!("Input file does not exist: {}", opts.input.display())));
    }
    if output == opts.input {
        return Err(Error::Configuration(format!("Output would overwrite the input: {}", output.display())));
    }
    let file = VectorFile::new(&opts.input)
        .ok_or_else(|| Error::Configuration(format!("Unsupported input file: {}", opts.input.display())))?;

    let set = read_layers(&file);
    let mut warnings = set.warnings;
    let found = match &opts.layer {
        Some(wanted) => set.layers.into_iter().find(|l| {
            l.name() == wanted || l.name().rsplit_once(':').is_some_and(|(_, table)| table == wanted)
        }),
        None => set.layers.into_iter().next(),
    };
    let Some(mut layer) = found else {
        return Err(match (&opts.layer, warnings.is_empty()) {
            (_, false) => warnings.remove(0),
            (Some(wanted), true) => Error::Configuration(format!("No layer named '{wanted}' in {}", file.file_name())),
            (None, true) => Error::Configuration(format!("No features read from {}", file.file_name())),
        });
    };

    match layer.to_wgs84()? {
        Normalized::Undeclared => warn!("Layer {} declares no reference system; writing coordinates unchanged", layer.name()),
        Normalized::Reprojected(from) => info!("Reprojected layer {} from {from} to EPSG:4326", layer.name()),
        Normalized::AlreadyWgs84 => {}
    }
    sanitize(&mut layer);

    let json = geojson::layer_to_geojson(&layer).map_err(|e| Error::Serialization {
        layer: layer.name().to_string(),
        reason: format!("{e:#}"),
    })?;

    let mut pending = PendingWrite::open(&output)?;
    serde_json::to_writer(&mut pending, &json).map_err(io::Error::from)?;
    let output = pending.finish()?;
    info!("Wrote {} features of {} to {}", layer.len(), layer.name(), output.display());

    Ok(ExportReport { output, layer: layer.name().to_string(), features: layer.len(), warnings })
}
