use anyhow::{Context, Result};
use hazmap::analysis::{closest_feature, ClosestFeature, ClosestLayer};
use serde::Serialize;

use super::StoreSource;

#[derive(Serialize)]
struct NearestResponse {
    lat: f64,
    lon: f64,
    #[serde(flatten)]
    result: ClosestFeature,
}

pub fn run(source: &StoreSource, layer: &str, lat: f64, lon: f64, json: bool) -> Result<()> {
    let layer: ClosestLayer = layer.parse().context("Invalid layer")?;
    let store = source.load()?;

    let result = closest_feature(&store, layer, lon, lat).context("Failed to find nearest feature")?;

    if json {
        let response = NearestResponse { lat, lon, result };
        println!("{}", serde_json::to_string(&response)?);
        return Ok(());
    }

    match &result.feature {
        Some(feature) => {
            let fid = feature
                .property("fid")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "?".to_string());
            match result.distance_meters {
                Some(d) => println!("fid {} at {:.1} m", fid, d),
                None => println!("fid {}", fid),
            }
        }
        None => println!(
            "{}",
            result.message.as_deref().unwrap_or("No feature found nearby.")
        ),
    }

    Ok(())
}
