//! Raw amenity datasets as loaded from open-data exports.
//!
//! School lists come as CSV with coordinate columns; stations and
//! polygon layers (shopping, parks, hospitals) come as `GeoJSON`
//! `FeatureCollection`s. Both load into the same [`RawDataset`] shape:
//! a property map per row plus an optional geometry, so the normalizer
//! can apply its per-kind schema rules without caring about the file
//! format.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use geojson::GeoJson;
use serde_json::{Map, Value};

use crate::ProximityError;

/// One row of a raw dataset.
#[derive(Debug, Clone, Default)]
pub struct RawFeature {
    /// Source attributes keyed by their original column names.
    pub properties: Map<String, Value>,
    /// Geometry in WGS84 degrees, if the source carries one.
    pub geometry: Option<geo::Geometry<f64>>,
}

impl RawFeature {
    /// Returns a property as trimmed text. Blank strings and nulls are
    /// `None`; numbers and booleans are rendered as text.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Returns a property as a finite float. Accepts JSON numbers and
    /// numeric strings.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        let value = match self.properties.get(key)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }
}

/// A loaded amenity dataset.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    columns: BTreeSet<String>,
    features: Vec<RawFeature>,
}

impl RawDataset {
    /// Builds a dataset from rows; the column set is the union of every
    /// row's property names.
    #[must_use]
    pub fn new(features: Vec<RawFeature>) -> Self {
        let columns = features
            .iter()
            .flat_map(|f| f.properties.keys().cloned())
            .collect();
        Self { columns, features }
    }

    /// Loads a dataset, choosing the parser from the file extension
    /// (`.csv`, `.geojson` or `.json`).
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::UnsupportedFormat`] for other extensions
    /// and any I/O or parse error from the chosen loader.
    pub fn load(path: &Path) -> Result<Self, ProximityError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let dataset = match extension.as_deref() {
            Some("csv") => Self::from_csv_reader(std::fs::File::open(path)?)?,
            Some("geojson" | "json") => {
                Self::from_geojson_str(&std::fs::read_to_string(path)?)?
            }
            _ => {
                return Err(ProximityError::UnsupportedFormat {
                    path: path.display().to_string(),
                });
            }
        };

        log::info!(
            "Loaded {} raw features ({} columns) from {}",
            dataset.len(),
            dataset.columns.len(),
            path.display()
        );

        Ok(dataset)
    }

    /// Parses a CSV export. Every header becomes a column and every
    /// cell a string property; rows have no geometry.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::Csv`] if the CSV is malformed.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, ProximityError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_owned())
            .collect();

        let mut features = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut properties = Map::new();
            for (i, header) in headers.iter().enumerate() {
                let value = record.get(i).unwrap_or("").trim().to_owned();
                properties.insert(header.clone(), Value::String(value));
            }
            features.push(RawFeature {
                properties,
                geometry: None,
            });
        }

        Ok(Self {
            columns: headers.into_iter().collect(),
            features,
        })
    }

    /// Parses a `GeoJSON` `FeatureCollection` (or a single `Feature`).
    ///
    /// Features whose geometry cannot be converted keep their
    /// properties but get no geometry; the normalizer drops them later.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::GeoJson`] if the text is not valid
    /// `GeoJSON`, or [`ProximityError::InvalidParameters`] if it is a
    /// bare geometry with no features.
    pub fn from_geojson_str(text: &str) -> Result<Self, ProximityError> {
        let features = match text.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err(ProximityError::InvalidParameters {
                    kind: "geojson".to_string(),
                    message: "expected a Feature or FeatureCollection, found a bare geometry"
                        .to_string(),
                });
            }
        };

        let features = features
            .into_iter()
            .map(|feature| {
                let geometry = feature.geometry.and_then(|geom| {
                    geo::Geometry::<f64>::try_from(geom)
                        .inspect_err(|e| log::debug!("Skipping unconvertible geometry: {e}"))
                        .ok()
                });
                RawFeature {
                    properties: feature.properties.unwrap_or_default(),
                    geometry,
                }
            })
            .collect();

        Ok(Self::new(features))
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    #[must_use]
    pub fn features(&self) -> &[RawFeature] {
        &self.features
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
