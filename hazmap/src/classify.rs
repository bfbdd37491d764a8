//! Fixed-threshold classification of morphology ratios.
//!
//! All comparisons are strict: a ratio exactly on a threshold falls into the
//! lower class.

use serde::Serialize;

/// River sinuosity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SinuosityClass {
    #[serde(rename = "Highly Meandering")]
    HighlyMeandering,
    #[serde(rename = "Moderately Meandering")]
    ModeratelyMeandering,
    #[serde(rename = "Straight")]
    Straight,
}

/// Channel steepness class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SteepnessClass {
    High,
    Medium,
    Low,
}

/// Classify a sinuosity ratio (channel length / straight-line distance).
pub fn classify_sinuosity(ratio: f64) -> SinuosityClass {
    if ratio > 1.5 {
        SinuosityClass::HighlyMeandering
    } else if ratio > 1.2 {
        SinuosityClass::ModeratelyMeandering
    } else {
        SinuosityClass::Straight
    }
}

/// Classify a steepness ratio (elevation drop / length).
pub fn classify_steepness(ratio: f64) -> SteepnessClass {
    if ratio > 0.005 {
        SteepnessClass::High
    } else if ratio > 0.001 {
        SteepnessClass::Medium
    } else {
        SteepnessClass::Low
    }
}

impl SinuosityClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SinuosityClass::HighlyMeandering => "Highly Meandering",
            SinuosityClass::ModeratelyMeandering => "Moderately Meandering",
            SinuosityClass::Straight => "Straight",
        }
    }
}

impl SteepnessClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SteepnessClass::High => "High",
            SteepnessClass::Medium => "Medium",
            SteepnessClass::Low => "Low",
        }
    }
}
