#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Proximity features for rental listings.
//!
//! Takes rental coordinates and amenity datasets (schools, stations,
//! shopping centres, parks, hospitals) and annotates every rental with
//! its nearest amenity:
//!
//! 1. [`normalize`] reduces a raw dataset to [`FeatureRecord`] points
//!    according to a [`kind::FeatureSpec`].
//! 2. [`radians`] turns rentals, feature points, or a single fixed
//!    coordinate into radian pairs.
//! 3. [`matcher`] computes the haversine distance matrix and picks the
//!    nearest feature per rental.
//! 4. [`enrich`] optionally asks a routing service for the real travel
//!    distance of each pair, checkpointing the table as it goes.
//!
//! [`pipeline`] strings these together from a TOML run file.
//!
//! [`FeatureRecord`]: rental_proximity_models::FeatureRecord

pub mod checkpoint;
pub mod dataset;
pub mod enrich;
pub mod kind;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod radians;
pub mod table;

use thiserror::Error;

pub use matcher::AnnotationColumns;
pub use table::RentalTable;

/// Errors from the proximity pipeline.
///
/// Route lookup failures are not represented here: the enricher records
/// them as null distances and keeps going.
#[derive(Debug, Error)]
pub enum ProximityError {
    /// The feature kind string is not one of the supported kinds.
    #[error("Invalid feature kind '{kind}'")]
    InvalidFeatureKind {
        /// The kind that was requested.
        kind: String,
    },

    /// A feature kind's filter contract was violated.
    #[error("Invalid parameters for feature kind '{kind}': {message}")]
    InvalidParameters {
        /// The kind (or feature name) being configured.
        kind: String,
        /// Which filter was missing or forbidden.
        message: String,
    },

    /// A dataset or table lacks a column the stage depends on.
    #[error("Column '{column}' not found (required for '{kind}')")]
    MissingColumn {
        /// The kind (or feature name) that needs the column.
        kind: String,
        /// The missing column name.
        column: String,
    },

    /// A coordinate source had the wrong shape or an unparseable value.
    #[error("Invalid coordinate input: {message}")]
    InvalidCoordinateInput {
        /// Description including the offending value.
        message: String,
    },

    /// The matcher was handed a feature table with no rows.
    #[error("Feature set '{feature}' has no rows to match against")]
    EmptyFeatureSet {
        /// The feature name being matched.
        feature: String,
    },

    /// A rental table was structurally inconsistent.
    #[error("Malformed table: {message}")]
    MalformedTable {
        /// Description of the inconsistency.
        message: String,
    },

    /// A dataset file extension that has no loader.
    #[error("Unsupported dataset format: {path}")]
    UnsupportedFormat {
        /// The offending path.
        path: String,
    },

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// TOML run file could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
