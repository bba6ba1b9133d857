use anyhow::{Context, Result};
use societymap::{build_map, BuildOptions, TileTheme};
use tracing::info;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::BuildArgs) -> Result<()> {
    let opts = BuildOptions {
        root: args.root.clone(),
        output: args.output.clone(),
        priority: args.priority.clone(),
        tiles: if args.osm { TileTheme::OpenStreetMap } else { TileTheme::CartoDbPositron },
    };

    info!("Scanning for vector layers under {}", opts.root.display());
    let report = build_map(&opts).context("[build] map build failed")?;

    if !report.warnings.is_empty() {
        info!("{} overlays drawn, {} skipped inputs", report.overlays.len(), report.warnings.len());
    }
    println!("{}", report.output.display());

    Ok(())
}
