use anyhow::{Context, Result};
use societymap::{export_geojson, ExportOptions};
use tracing::info;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::ExportArgs) -> Result<()> {
    let opts = ExportOptions {
        input: args.input.clone(),
        output: args.output.clone(),
        layer: args.layer.clone(),
    };

    let report = export_geojson(&opts)
        .with_context(|| format!("[export] failed to export {}", opts.input.display()))?;

    if !report.warnings.is_empty() {
        info!("Exported {}; {} other layers skipped", report.layer, report.warnings.len());
    }
    println!("{}", report.output.display());

    Ok(())
}
