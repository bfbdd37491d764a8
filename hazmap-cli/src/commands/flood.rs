use anyhow::{Context, Result};
use hazmap::analysis::{flash_flood_warning, FlashFloodParams};
use hazmap::params::RainfallIntensity;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use super::StoreSource;

pub fn run(source: &StoreSource, buffer: f64, rainfall: &str, output: Option<PathBuf>) -> Result<()> {
    let rainfall_intensity: RainfallIntensity =
        rainfall.parse().context("Invalid rainfall intensity")?;
    let store = source.load()?;

    let params = FlashFloodParams {
        rainfall_intensity,
        buffer_distance_meters: buffer,
    };
    let warning = flash_flood_warning(&store, &params).context("Flash flood analysis failed")?;

    eprintln!(
        "Rainfall {} ({} m buffer): {} settlements, {} roads at risk",
        warning.simulated_rainfall_intensity,
        params.effective_buffer_m(),
        warning.affected_settlements.features.len(),
        warning.affected_roads.features.len()
    );

    match output {
        Some(path) => {
            let file = File::create(&path).context("Failed to create output file")?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &warning)?;
            writer.flush()?;
            println!("Output written to: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&warning)?),
    }

    Ok(())
}
