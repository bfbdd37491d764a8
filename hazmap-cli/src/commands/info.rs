use anyhow::{Context, Result};
use geojson::{FeatureCollection, Value};
use std::collections::BTreeMap;

use super::StoreSource;

pub fn run(source: &StoreSource, layer: &str) -> Result<()> {
    let store = source.load()?;
    let fc = store
        .layer_collection(layer)
        .with_context(|| format!("Cannot describe layer '{layer}'"))?;
    let summary = LayerInfo::from_collection(&fc);

    println!("Layer Information");
    println!("=================");
    println!("Name:           {}", layer);
    println!("Features:       {}", summary.features);
    println!(
        "Source:         {}",
        store.data_dir().join(format!("{layer}.geojson")).display()
    );

    println!();
    println!("Geometry types:");
    if summary.kinds.is_empty() {
        println!("  (none)");
    }
    for (kind, count) in &summary.kinds {
        println!("  {:<18} {}", kind, count);
    }

    println!();
    match summary.extent {
        Some([min_lon, min_lat, max_lon, max_lat]) => {
            println!("Extent (lon/lat):");
            println!("  West:  {:.6}", min_lon);
            println!("  South: {:.6}", min_lat);
            println!("  East:  {:.6}", max_lon);
            println!("  North: {:.6}", max_lat);
        }
        None => println!("Extent: empty layer"),
    }

    if !summary.attributes.is_empty() {
        println!();
        println!("Attributes: {}", summary.attributes.join(", "));
    }

    Ok(())
}

/// Counts and bounds of a rendered layer.
#[derive(Debug, Default, PartialEq)]
struct LayerInfo {
    features: usize,
    kinds: BTreeMap<&'static str, usize>,
    /// `[min_lon, min_lat, max_lon, max_lat]`.
    extent: Option<[f64; 4]>,
    attributes: Vec<String>,
}

impl LayerInfo {
    fn from_collection(fc: &FeatureCollection) -> Self {
        let mut info = LayerInfo {
            features: fc.features.len(),
            ..LayerInfo::default()
        };
        for feature in &fc.features {
            if let Some(geometry) = &feature.geometry {
                *info.kinds.entry(kind(&geometry.value)).or_default() += 1;
                extend_extent(&mut info.extent, &geometry.value);
            }
        }
        if let Some(properties) = fc.features.first().and_then(|f| f.properties.as_ref()) {
            info.attributes = properties.keys().cloned().collect();
            info.attributes.sort();
        }
        info
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn extend_extent(extent: &mut Option<[f64; 4]>, value: &Value) {
    if let Value::GeometryCollection(geometries) = value {
        for g in geometries {
            extend_extent(extent, &g.value);
        }
        return;
    }
    let mut add = |pos: &Vec<f64>| {
        if pos.len() < 2 {
            return;
        }
        let (x, y) = (pos[0], pos[1]);
        *extent = Some(match *extent {
            None => [x, y, x, y],
            Some([a, b, c, d]) => [a.min(x), b.min(y), c.max(x), d.max(y)],
        });
    };
    match value {
        Value::Point(p) => add(p),
        Value::MultiPoint(ps) | Value::LineString(ps) => ps.iter().for_each(add),
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().for_each(add)
        }
        Value::MultiPolygon(polys) => polys.iter().flatten().flatten().for_each(add),
        Value::GeometryCollection(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_info() {
        let fc: FeatureCollection = serde_json::from_str(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "properties": {"fid": 1, "vdc_name": "Teku"},
                     "geometry": {"type": "Point", "coordinates": [85.30, 27.70]}},
                    {"type": "Feature", "properties": {"fid": 2},
                     "geometry": {"type": "LineString", "coordinates": [[85.1, 27.6], [85.4, 27.9]]}}
                ]
            }"#,
        )
        .unwrap();
        let info = LayerInfo::from_collection(&fc);
        assert_eq!(info.features, 2);
        assert_eq!(info.kinds.get("Point"), Some(&1));
        assert_eq!(info.kinds.get("LineString"), Some(&1));
        assert_eq!(info.extent, Some([85.1, 27.6, 85.4, 27.9]));
        assert_eq!(info.attributes, vec!["fid", "vdc_name"]);
    }

    #[test]
    fn test_empty_layer_info() {
        let fc: FeatureCollection =
            serde_json::from_str(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        assert_eq!(LayerInfo::from_collection(&fc), LayerInfo::default());
    }
}
