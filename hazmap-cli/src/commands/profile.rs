use anyhow::{Context, Result};
use hazmap::analysis::{vulnerability_profiling, VulnerabilityParams};
use hazmap::QueryParams;

use super::StoreSource;

pub fn run(source: &StoreSource, unit_type: &str, fids: &str) -> Result<()> {
    let query: QueryParams = [("unit_type", unit_type), ("fids", fids)].into_iter().collect();
    let params = VulnerabilityParams::from_query(&query, chrono::Local::now().date_naive())
        .context("Invalid profile request")?;
    let store = source.load()?;

    let profiles = vulnerability_profiling(&store, &params).context("Profiling failed")?;
    println!("{}", serde_json::to_string_pretty(&profiles)?);

    Ok(())
}
