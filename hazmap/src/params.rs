//! Request parameter resolution.
//!
//! Query strings arrive as raw `String` pairs. [`QueryParams`] coerces them to
//! typed values, applies defaults, and reports the first failure as a
//! [`HazardError::Validation`] naming the offending parameter.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{HazardError, Result};

/// Raw query-string parameters.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

impl From<HashMap<String, String>> for QueryParams {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl QueryParams {
    /// The raw, trimmed value of a parameter. Empty strings count as absent.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// A required parameter parsed as `T`.
    pub fn required<T: FromStr>(&self, name: &str) -> Result<T> {
        let raw = self
            .raw(name)
            .ok_or_else(|| HazardError::validation(format!("{name} parameter is required.")))?;
        parse_value(name, raw)
    }

    /// An optional parameter parsed as `T`, falling back to `default`.
    pub fn parse_or<T: FromStr>(&self, name: &str, default: T) -> Result<T> {
        match self.raw(name) {
            Some(raw) => parse_value(name, raw),
            None => Ok(default),
        }
    }

    /// A required finite float.
    pub fn required_f64(&self, name: &str) -> Result<f64> {
        finite(name, self.required(name)?)
    }

    /// An optional finite float.
    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64> {
        finite(name, self.parse_or(name, default)?)
    }

    /// An optional float that must be strictly positive.
    pub fn positive_f64_or(&self, name: &str, default: f64) -> Result<f64> {
        positive(name, self.f64_or(name, default)?)
    }

    /// A required integer.
    pub fn required_i64(&self, name: &str) -> Result<i64> {
        self.required(name)
    }

    /// A required feature id, with the message to report when it is absent.
    pub fn required_fid(&self, name: &str, missing: &str) -> Result<i64> {
        match self.raw(name) {
            Some(raw) => parse_value(name, raw),
            None => Err(HazardError::validation(missing)),
        }
    }

    /// Required `lat` and `lon`, as `(lat, lon)`. Either one missing is
    /// reported with a single message.
    pub fn lat_lon(&self) -> Result<(f64, f64)> {
        match (self.raw("lat"), self.raw("lon")) {
            (Some(_), Some(_)) => Ok((self.required_f64("lat")?, self.required_f64("lon")?)),
            _ => Err(HazardError::validation("Latitude and longitude are required.")),
        }
    }

    /// An optional integer.
    pub fn i64_or(&self, name: &str, default: i64) -> Result<i64> {
        self.parse_or(name, default)
    }

    /// A required comma-separated list of integer feature ids.
    pub fn fid_list(&self, name: &str) -> Result<Vec<i64>> {
        let raw = self
            .raw(name)
            .ok_or_else(|| HazardError::validation(format!("{name} parameter is required.")))?;
        let fids = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>().map_err(|_| {
                    HazardError::validation(format!(
                        "Invalid {name} format: '{s}'. Must be comma-separated integers."
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if fids.is_empty() {
            return Err(HazardError::validation(format!("{name} parameter is required.")));
        }
        Ok(fids)
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| HazardError::validation(format!("Invalid value for {name}: '{raw}'")))
}

fn finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(HazardError::validation(format!("{name} must be a finite number")))
    }
}

/// Reject zero, negative and non-finite values.
pub fn positive(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(HazardError::validation(format!("{name} must be positive")))
    }
}

/// Reject negative and non-finite values. Zero is allowed.
pub fn non_negative(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(HazardError::validation(format!("{name} must not be negative")))
    }
}

/// Parse a JSON request body into `T`, reporting failures as validation errors.
pub fn parse_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(HazardError::validation("Invalid JSON data"));
    }
    serde_json::from_slice(body)
        .map_err(|e| HazardError::validation(format!("Invalid JSON data: {e}")))
}

macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => [$($word:literal),+]),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl FromStr for $name {
            type Err = HazardError;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($($word)|+ => Ok($name::$variant),)+
                    other => Err(HazardError::validation(format!(
                        "Invalid {}: '{}'", stringify!($name), other
                    ))),
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(d)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

keyword_enum! {
    /// Which features flood exposure is reported for.
    UnitType { Settlement => ["settlement", "settlements"], LocalUnit => ["local_unit", "local_units"] }
}

keyword_enum! {
    /// Administrative level of a boundary lookup.
    AdminUnitType { District => ["district", "districts"], LocalUnit => ["local_unit", "local_units"] }
}

keyword_enum! {
    /// Simulated rainfall for the flash-flood warning.
    RainfallIntensity { Low => ["low"], Medium => ["medium"], High => ["high"] }
}

keyword_enum! {
    /// Linear infrastructure used for accessibility.
    Infrastructure { Roads => ["roads", "road"], Rivers => ["rivers", "river"] }
}

keyword_enum! {
    /// Facility types that accessibility can route to.
    FacilityType {
        DistrictHq => ["district_hq"],
        Hospital => ["hospital"],
        School => ["school"],
        CommunityHall => ["community_hall"],
        PoliceStation => ["police_station"],
    }
}

keyword_enum! {
    /// River morphology measure.
    MorphologyAnalysis { Steepness => ["steepness"], Confluence => ["confluence"], Sinuosity => ["sinuosity"] }
}

keyword_enum! {
    /// A hazard that multi-hazard exposure can score.
    Hazard { Flood => ["flood"], Fire => ["fire"] }
}

impl RainfallIntensity {
    /// Multiplier applied to the base flood buffer distance.
    pub fn multiplier(self) -> f64 {
        match self {
            RainfallIntensity::Low => 0.5,
            RainfallIntensity::Medium => 1.0,
            RainfallIntensity::High => 1.5,
        }
    }
}

impl fmt::Display for RainfallIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RainfallIntensity::Low => "low",
            RainfallIntensity::Medium => "medium",
            RainfallIntensity::High => "high",
        })
    }
}

impl AdminUnitType {
    pub fn as_str(self) -> &'static str {
        match self {
            AdminUnitType::District => "district",
            AdminUnitType::LocalUnit => "local_unit",
        }
    }
}

impl Infrastructure {
    /// Layer name of this infrastructure.
    pub fn layer_name(self) -> &'static str {
        match self {
            Infrastructure::Roads => "roads",
            Infrastructure::Rivers => "rivers",
        }
    }
}

impl FacilityType {
    /// Value of the shelter `type` attribute for this facility.
    pub fn as_str(self) -> &'static str {
        match self {
            FacilityType::DistrictHq => "district_hq",
            FacilityType::Hospital => "hospital",
            FacilityType::School => "school",
            FacilityType::CommunityHall => "community_hall",
            FacilityType::PoliceStation => "police_station",
        }
    }
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MorphologyAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MorphologyAnalysis::Steepness => "steepness",
            MorphologyAnalysis::Confluence => "confluence",
            MorphologyAnalysis::Sinuosity => "sinuosity",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_defaults_apply_when_absent() {
        let p = params(&[]);
        assert_eq!(p.f64_or("buffer_distance_meters", 500.0).unwrap(), 500.0);
        assert_eq!(p.i64_or("days_ago", 7).unwrap(), 7);
        assert_eq!(
            p.parse_or("rainfall_intensity", RainfallIntensity::Medium).unwrap(),
            RainfallIntensity::Medium
        );
    }

    #[test]
    fn test_blank_value_counts_as_absent() {
        let p = params(&[("min_magnitude", "  ")]);
        assert_eq!(p.f64_or("min_magnitude", 4.0).unwrap(), 4.0);
    }

    #[test]
    fn test_required_missing() {
        let err = params(&[]).required_i64("road_fid").unwrap_err();
        assert!(matches!(err, HazardError::Validation(_)));
        assert!(err.to_string().contains("road_fid"));
    }

    #[test]
    fn test_coercion_failure() {
        let err = params(&[("lat", "north")]).required_f64("lat").unwrap_err();
        assert!(err.to_string().contains("lat"));
        assert!(params(&[("lat", "NaN")]).required_f64("lat").is_err());
    }

    #[test]
    fn test_positive_rejects_zero_and_negative() {
        for raw in ["0", "-10", "inf"] {
            let p = params(&[("buffer_distance_meters", raw)]);
            assert!(
                p.positive_f64_or("buffer_distance_meters", 500.0).is_err(),
                "{raw} accepted"
            );
        }
        let p = params(&[("buffer_distance_meters", "400")]);
        assert_eq!(p.positive_f64_or("buffer_distance_meters", 500.0).unwrap(), 400.0);
    }

    #[test]
    fn test_non_negative_allows_zero() {
        assert_eq!(non_negative("buffer_m", 0.0).unwrap(), 0.0);
        assert_eq!(non_negative("buffer_m", 250.0).unwrap(), 250.0);
        assert!(non_negative("buffer_m", -1.0).is_err());
        assert!(non_negative("buffer_m", f64::NAN).is_err());
    }

    #[test]
    fn test_lat_lon() {
        let p = params(&[("lat", "27.7"), ("lon", "85.3")]);
        assert_eq!(p.lat_lon().unwrap(), (27.7, 85.3));

        for pairs in [&[("lat", "27.7")][..], &[("lon", "85.3")][..], &[][..]] {
            let err = params(pairs).lat_lon().unwrap_err();
            assert_eq!(err.to_string(), "Latitude and longitude are required.");
        }

        let err = params(&[("lat", "north"), ("lon", "85.3")]).lat_lon().unwrap_err();
        assert!(err.to_string().contains("lat"));
    }

    #[test]
    fn test_fid_list() {
        let p = params(&[("fids", "3, 5,8")]);
        assert_eq!(p.fid_list("fids").unwrap(), vec![3, 5, 8]);
        assert!(params(&[("fids", "3,x")]).fid_list("fids").is_err());
        assert!(params(&[("fids", ",")]).fid_list("fids").is_err());
        assert!(params(&[]).fid_list("fids").is_err());
    }

    #[test]
    fn test_keyword_enums() {
        assert_eq!("HIGH".parse::<RainfallIntensity>().unwrap(), RainfallIntensity::High);
        assert_eq!("districts".parse::<AdminUnitType>().unwrap(), AdminUnitType::District);
        assert_eq!("local_unit".parse::<AdminUnitType>().unwrap(), AdminUnitType::LocalUnit);
        assert!("province".parse::<AdminUnitType>().is_err());
        assert_eq!(RainfallIntensity::High.multiplier(), 1.5);
    }

    #[test]
    fn test_parse_body() {
        #[derive(Deserialize)]
        struct Body {
            hazards: Vec<Hazard>,
        }
        let body: Body = parse_body(br#"{"hazards": ["flood", "Fire"]}"#).unwrap();
        assert_eq!(body.hazards, vec![Hazard::Flood, Hazard::Fire]);
        assert!(parse_body::<Body>(b"").is_err());
        assert!(parse_body::<Body>(br#"{"hazards": ["quake"]}"#).is_err());
    }
}
