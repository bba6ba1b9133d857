use std::path::PathBuf;

/// Failures surfaced by the map-building pipeline.
///
/// Only `Configuration` and `Io` abort a run. The other variants are recorded
/// as warnings against the smallest unit they affect (one file, one internal
/// layer, one rendered overlay) and the pipeline carries on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input directory missing, or an option that cannot be satisfied.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A file, or one internal layer of a container file, could not be parsed.
    #[error("failed to read {}{}: {reason}", .path.display(), layer_suffix(.layer))]
    LayerParse {
        path: PathBuf,
        layer: Option<String>,
        reason: String,
    },

    /// A layer's geometry could not be moved into EPSG:4326.
    #[error("failed to reproject layer '{layer}' from {crs}: {reason}")]
    Reprojection {
        layer: String,
        crs: String,
        reason: String,
    },

    /// A layer could not be converted into the map's GeoJSON payload.
    #[error("failed to serialize layer '{layer}': {reason}")]
    Serialization {
        layer: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a `LayerParse` error from an `anyhow` chain, keeping every context line.
    pub(crate) fn layer_parse(path: impl Into<PathBuf>, layer: Option<&str>, err: &anyhow::Error) -> Self {
        Self::LayerParse {
            path: path.into(),
            layer: layer.map(str::to_string),
            reason: format!("{err:#}"),
        }
    }

    /// True for the variants the pipeline records and moves past.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::LayerParse { .. } | Self::Reprojection { .. } | Self::Serialization { .. })
    }
}

fn layer_suffix(layer: &Option<String>) -> String {
    layer.as_ref().map(|l| format!(" (layer '{l}')")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
