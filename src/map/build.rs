use std::{collections::HashSet, path::PathBuf};

use tracing::{info, warn};

use crate::{
    common::{find_vector_files, order_by_priority},
    geom::normalize,
    io::html::palette_color,
    layer::{read_layers, sanitize, Layer},
    map::{LeafletMap, MapRenderer, Overlay, Style, TileTheme, Viewport},
    Error,
};

/// Options for [`build_map`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory searched recursively for vector files.
    pub root: PathBuf,
    /// Output file; defaults to `<root>/full_map.html`.
    pub output: Option<PathBuf>,
    /// Files under a directory whose path contains this token are drawn first.
    pub priority: String,
    pub tiles: TileTheme,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("society-maps"),
            output: None,
            priority: "split_areas".to_string(),
            tiles: TileTheme::default(),
        }
    }
}

impl BuildOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), ..Self::default() }
    }

    #[inline]
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| self.root.join("full_map.html"))
    }
}

/// One overlay drawn on the output map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySummary {
    pub name: String,
    pub features: usize,
}

/// Outcome of a run: where the map went, what it shows, what was skipped.
#[derive(Debug)]
pub struct Report {
    pub output: PathBuf,
    pub overlays: Vec<OverlaySummary>,
    pub warnings: Vec<Error>,
}

/// Discover, read, normalize and sanitize every layer under `opts.root`,
/// then render them onto one map.
///
/// Only a missing root or a failure writing the output is an error; every
/// per-file or per-layer failure is logged and kept in [`Report::warnings`].
/// An empty tree still produces a base map.
pub fn build_map(opts: &BuildOptions) -> Result<Report, Error> {
    let files = order_by_priority(find_vector_files(&opts.root)?, &opts.priority);
    if files.is_empty() {
        warn!("No vector files found under {}", opts.root.display());
    }

    let mut layers: Vec<Layer> = Vec::new();
    let mut warnings: Vec<Error> = Vec::new();

    for file in &files {
        info!("Reading {}", file.path().display());
        let set = read_layers(file);
        warnings.extend(set.warnings);

        for mut layer in set.layers {
            normalize(&mut layer, &mut warnings);
            sanitize(&mut layer);
            info!("Loaded layer {} ({} features)", layer.name(), layer.len());
            layers.push(layer);
        }
    }

    let viewport = Viewport::from_layers(&layers);
    let mut map = LeafletMap::new(viewport, opts.tiles).with_title("Society maps");
    let mut overlays = Vec::with_capacity(layers.len());
    let mut taken = HashSet::new();

    for (i, layer) in layers.iter().enumerate() {
        let style = Style::outline(palette_color(i).to_string());
        let name = unique_name(&mut taken, layer.name());
        let added = Overlay::from_layer(layer, style).and_then(|mut overlay| {
            overlay.name.clone_from(&name);
            map.add_overlay(overlay)
        });
        match added {
            Ok(()) => overlays.push(OverlaySummary { name, features: layer.len() }),
            Err(e) => {
                warn!("Skipping overlay: {e}");
                warnings.push(e);
            }
        }
    }
    map.add_layer_control(false);

    let output = map.save(&opts.output_path())?;
    info!("Saved map to {}", output.display());

    Ok(Report { output, overlays, warnings })
}

/// `name`, or `name #2`, `name #3`... when an earlier overlay already uses it.
/// The layer control keys overlays by name.
fn unique_name(taken: &mut HashSet<String>, name: &str) -> String {
    let mut candidate = name.to_string();
    let mut n = 1;
    while !taken.insert(candidate.clone()) {
        n += 1;
        candidate = format!("{name} #{n}");
    }
    candidate
}
