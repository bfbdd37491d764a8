use anyhow::{Context, Result};
use hazmap::LAYER_NAMES;
use std::fs;

use super::StoreSource;

pub fn run(source: &StoreSource) -> Result<()> {
    let dir = source.dir()?;
    if !dir.exists() {
        anyhow::bail!("Data directory does not exist: {}", dir.display());
    }

    let store = source.load()?;
    let counts = store.summaries();

    println!("{:<14} {:>10} {:>12}", "LAYER", "FEATURES", "FILE SIZE");
    println!("{}", "-".repeat(38));

    let mut total_features = 0;
    let mut total_size: u64 = 0;
    let mut missing = Vec::new();

    for name in LAYER_NAMES {
        let path = dir.join(format!("{name}.geojson"));
        let size = fs::metadata(&path).map(|m| m.len()).ok();
        let features = counts
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.feature_count)
            .context("Layer missing from store")?;
        total_features += features;

        let size_label = match size {
            Some(bytes) => {
                total_size += bytes;
                format_size(bytes)
            }
            None => {
                missing.push(name);
                "-".to_string()
            }
        };
        println!("{:<14} {:>10} {:>12}", name, features, size_label);
    }

    // Summary
    println!();
    println!("Summary:");
    println!("  Total features: {}", total_features);
    println!("  Total size: {}", format_size(total_size));
    if !missing.is_empty() {
        println!("  Missing files: {}", missing.join(", "));
    }
    println!("  Data directory: {}", dir.display());

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
