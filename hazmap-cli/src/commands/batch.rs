use anyhow::{Context, Result};
use hazmap::analysis::{closest_feature, ClosestLayer};
use hazmap::SpatialStore;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::StoreSource;

pub fn run(
    source: &StoreSource,
    layer: &str,
    input: PathBuf,
    output: Option<PathBuf>,
    lat_col: &str,
    lon_col: &str,
) -> Result<()> {
    let layer: ClosestLayer = layer.parse().context("Invalid layer")?;
    let store = source.load()?;

    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if extension != "csv" {
        anyhow::bail!("Unsupported file format: {}. Use .csv", extension);
    }

    let output_path = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "points".to_string());
        input.with_file_name(format!("{}_nearest.csv", stem))
    });

    let rows = process_csv(&store, layer, &input, &output_path, lat_col, lon_col)?;
    println!("Processed {} rows", rows);
    println!("Output written to: {}", output_path.display());
    Ok(())
}

/// Append `nearest_fid` and `distance_m` to every row. Rows whose
/// coordinates can't be read get empty cells rather than aborting the run.
fn process_csv(
    store: &SpatialStore,
    layer: ClosestLayer,
    input: &Path,
    output: &Path,
    lat_col: &str,
    lon_col: &str,
) -> Result<usize> {
    let file = File::open(input).context("Failed to open input file")?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    // Find column indices
    let headers = reader.headers()?.clone();
    let lat_idx = headers
        .iter()
        .position(|h| h == lat_col)
        .with_context(|| format!("Column '{}' not found in CSV", lat_col))?;
    let lon_idx = headers
        .iter()
        .position(|h| h == lon_col)
        .with_context(|| format!("Column '{}' not found in CSV", lon_col))?;

    // Collect records for progress bar
    let records: Vec<_> = reader.records().collect::<Result<_, _>>()?;
    let total = records.len() as u64;

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let output_file = File::create(output).context("Failed to create output file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(output_file));

    let mut new_headers: Vec<&str> = headers.iter().collect();
    new_headers.push("nearest_fid");
    new_headers.push("distance_m");
    writer.write_record(&new_headers)?;

    for record in &records {
        let coords = record
            .get(lat_idx)
            .zip(record.get(lon_idx))
            .and_then(|(lat, lon)| Some((lat.trim().parse::<f64>().ok()?, lon.trim().parse::<f64>().ok()?)));

        let (fid, distance) = match coords {
            Some((lat, lon)) => match closest_feature(store, layer, lon, lat) {
                Ok(found) => (
                    found
                        .feature
                        .as_ref()
                        .and_then(|f| f.property("fid"))
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    found
                        .distance_meters
                        .map(|d| format!("{:.2}", d))
                        .unwrap_or_default(),
                ),
                Err(_) => (String::new(), String::new()),
            },
            None => (String::new(), String::new()),
        };

        let mut new_record: Vec<&str> = record.iter().collect();
        new_record.push(&fid);
        new_record.push(&distance);
        writer.write_record(&new_record)?;
        pb.inc(1);
    }

    pb.finish_with_message("done");
    writer.flush()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, Geometry};
    use hazmap::records::Settlement;
    use hazmap::{Feature, Layer, Projector};
    use tempfile::TempDir;

    fn store() -> SpatialStore {
        let p = Projector::utm45n().unwrap();
        let mut store = SpatialStore::in_memory(Projector::utm45n().unwrap());
        store.settlements = Layer::new(
            "settlements",
            vec![
                Feature::new(&p, 1, Geometry::Point(point!(x: 85.30, y: 27.70)), Settlement::default())
                    .unwrap(),
                Feature::new(&p, 2, Geometry::Point(point!(x: 85.40, y: 27.80)), Settlement::default())
                    .unwrap(),
            ],
        );
        store
    }

    #[test]
    fn test_process_csv() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("points.csv");
        let output = dir.path().join("out.csv");
        std::fs::write(&input, "name,lat,lon\na,27.7001,85.3001\nb,27.799,85.399\nc,north,85.3\n")
            .unwrap();

        let rows = process_csv(&store(), ClosestLayer::Settlement, &input, &output, "lat", "lon")
            .unwrap();
        assert_eq!(rows, 3);

        let mut reader = csv::Reader::from_path(&output).unwrap();
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            vec!["name", "lat", "lon", "nearest_fid", "distance_m"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][3], "1");
        assert_eq!(&rows[1][3], "2");
        assert!(rows[0][4].parse::<f64>().unwrap() < 20.0);
        assert_eq!(&rows[2][3], "");
    }

    #[test]
    fn test_missing_column() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("points.csv");
        std::fs::write(&input, "y,x\n27.7,85.3\n").unwrap();
        let err = process_csv(
            &store(),
            ClosestLayer::Settlement,
            &input,
            &dir.path().join("out.csv"),
            "lat",
            "lon",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Column 'lat' not found"));
    }
}
