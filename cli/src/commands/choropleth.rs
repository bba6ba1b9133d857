use anyhow::{Context, Result};
use societymap::{build_choropleth, ChoroplethOptions};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::ChoroplethArgs) -> Result<()> {
    let opts = ChoroplethOptions {
        listings: args.listings.clone(),
        areas: args.areas.clone(),
        output: args.output.clone(),
        id_field: args.id_field.clone(),
        ..ChoroplethOptions::default()
    };

    let report = build_choropleth(&opts).context("[choropleth] price map failed")?;
    println!("{}", report.output.display());

    Ok(())
}
