#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Plain data types shared by the rental proximity pipeline.
//!
//! Every amenity dataset (schools, stations, shopping centres, parks,
//! hospitals) is reduced to [`FeatureRecord`] rows before it is matched
//! against rental coordinates. [`FeatureCategory`] names the closed set
//! of supported dataset kinds.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// One physical amenity reduced to a point.
///
/// Produced by the feature normalizer; never contains a missing
/// coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Display name as it appears in the source dataset.
    pub name: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Category label (e.g. school sector) for kinds that carry one.
    pub type_tag: Option<String>,
}

impl FeatureRecord {
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// The supported amenity dataset kinds.
///
/// The string form (`"primary_school"`, `"train_station"`, ...) is also
/// the suffix used for annotation column names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureCategory {
    /// Every school, no type filter.
    School,
    /// Schools filtered to primary types.
    PrimarySchool,
    /// Schools filtered to secondary types.
    SecondarySchool,
    /// Active railway stations.
    TrainStation,
    /// Shopping centre polygons.
    Shopping,
    /// Park and reserve polygons.
    Parks,
    /// Hospital polygons.
    Hospital,
}

impl FeatureCategory {
    pub const ALL: &[Self] = &[
        Self::School,
        Self::PrimarySchool,
        Self::SecondarySchool,
        Self::TrainStation,
        Self::Shopping,
        Self::Parks,
        Self::Hospital,
    ];

    /// Whether matched rentals get a `nearest_<kind>_type` column.
    #[must_use]
    pub const fn carries_type_tag(self) -> bool {
        matches!(self, Self::PrimarySchool | Self::SecondarySchool)
    }
}

/// Travel mode requested from a routing service.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn category_round_trips_through_snake_case() {
        for category in FeatureCategory::ALL {
            let parsed = FeatureCategory::from_str(category.as_ref()).unwrap();
            assert_eq!(parsed, *category);
        }
        assert_eq!(FeatureCategory::TrainStation.to_string(), "train_station");
    }

    #[test]
    fn unknown_category_fails_to_parse() {
        assert!(FeatureCategory::from_str("library").is_err());
    }

    #[test]
    fn only_school_subkinds_carry_type_tag() {
        assert!(FeatureCategory::PrimarySchool.carries_type_tag());
        assert!(FeatureCategory::SecondarySchool.carries_type_tag());
        assert!(!FeatureCategory::School.carries_type_tag());
        assert!(!FeatureCategory::Parks.carries_type_tag());
    }
}
