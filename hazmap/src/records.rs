//! Typed attribute records for each GIS layer.
//!
//! Layer files carry their attributes as GeoJSON properties. Each layer has a
//! record type here; unknown properties are ignored and missing ones default
//! to `None`. Numeric fields also accept numeric strings since shapefile
//! exports are inconsistent about column types.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

/// Attributes of one layer's features.
pub trait Record: DeserializeOwned + Serialize + Send + Sync + 'static {
    /// Human-readable kind, used in "not found" messages.
    const LABEL: &'static str;

    /// The attribute used as this feature's display name, if any.
    fn display_name(&self) -> Option<&str> {
        None
    }
}

/// A municipality (gaunpalika / nagarpalika).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalUnit {
    pub gapa_napa: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    pub type_gn: Option<String>,
    pub state_code: Option<String>,
}

impl Record for LocalUnit {
    const LABEL: &'static str = "Local unit";

    fn display_name(&self) -> Option<&str> {
        self.gapa_napa.as_deref()
    }
}

/// A district boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct District {
    pub district: Option<String>,
    pub first_stat: Option<String>,
    pub first_dist: Option<String>,
}

impl Record for District {
    const LABEL: &'static str = "District";

    fn display_name(&self) -> Option<&str> {
        self.district.as_deref()
    }
}

/// A province boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Province {
    pub first_stat: Option<String>,
}

impl Record for Province {
    const LABEL: &'static str = "Province";

    fn display_name(&self) -> Option<&str> {
        self.first_stat.as_deref()
    }
}

/// The national boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Boundary {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: Option<i64>,
}

impl Record for Boundary {
    const LABEL: &'static str = "Boundary";
}

/// A topographic map sheet of the national index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSheet {
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub shape_leng: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub shape_area: Option<f64>,
}

impl Record for IndexSheet {
    const LABEL: &'static str = "Index sheet";

    fn display_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// A river centreline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct River {
    pub river_code: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub shape_len: Option<f64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub fnode: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub tnode: Option<i64>,
}

impl Record for River {
    const LABEL: &'static str = "River";

    fn display_name(&self) -> Option<&str> {
        self.river_code.as_deref()
    }
}

/// A road centreline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Road {
    pub road_code: Option<String>,
    #[serde(rename = "type")]
    pub road_type: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub shape_len: Option<f64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub fnode: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub tnode: Option<i64>,
}

impl Record for Road {
    const LABEL: &'static str = "Road";

    fn display_name(&self) -> Option<&str> {
        self.road_code.as_deref()
    }
}

/// A settlement (village development committee centre).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settlement {
    pub vdc_name: Option<String>,
    pub dist_name: Option<String>,
}

impl Record for Settlement {
    const LABEL: &'static str = "Settlement";

    fn display_name(&self) -> Option<&str> {
        self.vdc_name.as_deref()
    }
}

/// A satellite active-fire detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireDetection {
    #[serde(deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub brightness: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub bright_t31: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub frp: Option<f64>,
    /// Acquisition date as a `YYYYMMDD` integer.
    #[serde(deserialize_with = "compact_date")]
    pub acq_date: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub acq_time: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub confidence: Option<i64>,
    pub satellite: Option<String>,
    pub instrument: Option<String>,
    pub daynight: Option<String>,
}

impl Record for FireDetection {
    const LABEL: &'static str = "Fire detection";
}

/// An evacuation shelter or public facility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shelter {
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    pub capacity: Option<i64>,
    #[serde(rename = "type")]
    pub shelter_type: Option<String>,
}

impl Record for Shelter {
    const LABEL: &'static str = "Shelter";

    fn display_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Int(v)) => Some(v as f64),
        Some(NumberOrText::Float(v)) => Some(v),
        Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Int(v)) => Some(v),
        Some(NumberOrText::Float(v)) if v.fract() == 0.0 => Some(v as i64),
        Some(NumberOrText::Float(_)) => None,
        Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Accepts `20240105`, `"20240105"` or `"2024-01-05"`.
fn compact_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Int(v)) => Some(v),
        Some(NumberOrText::Float(v)) => Some(v as i64),
        Some(NumberOrText::Text(s)) => s.trim().replace('-', "").parse().ok(),
        None => None,
    })
}
