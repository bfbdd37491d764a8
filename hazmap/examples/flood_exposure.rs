//! Flood exposure over a directory of layer files.
//!
//! Run with: cargo run --example flood_exposure -- /path/to/layers [buffer_m]

use hazmap::analysis::{flood_exposure, FloodExposureParams};
use hazmap::params::UnitType;
use hazmap::{HazardError, SpatialStoreBuilder};
use std::env;

fn main() -> Result<(), HazardError> {
    let mut args = env::args().skip(1);
    let data_dir = args.next().unwrap_or_else(|| {
        eprintln!("Usage: cargo run --example flood_exposure -- /path/to/layers [buffer_m]");
        std::process::exit(1);
    });
    let buffer_m = args
        .next()
        .map(|raw| raw.parse::<f64>())
        .transpose()
        .map_err(|e| HazardError::validation(format!("invalid buffer: {e}")))?
        .unwrap_or(250.0);

    let store = SpatialStoreBuilder::new(&data_dir).build()?;

    for unit_type in [UnitType::Settlement, UnitType::LocalUnit] {
        let result = flood_exposure(
            &store,
            &FloodExposureParams {
                buffer_distance_meters: buffer_m,
                unit_type,
            },
        )?;
        println!(
            "{:?} within {}m of a river: {}",
            unit_type,
            buffer_m,
            result.affected_features.features.len()
        );
        for feature in result.affected_features.features.iter().take(10) {
            let fid = feature.property("fid").cloned().unwrap_or_default();
            match feature.property("percentage_affected") {
                Some(pct) => println!("  fid {fid}: {pct}% inside"),
                None => println!("  fid {fid}"),
            }
        }
    }

    Ok(())
}
