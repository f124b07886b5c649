//! Degree-to-radian conversion of coordinate sources.
//!
//! The matcher works on `[lat_rad, lon_rad]` pairs. Those come either
//! from a table (rentals or normalized features) or from a single
//! literal destination such as a CBD coordinate.

use rental_proximity_models::{Coordinate, FeatureRecord};

use crate::table::{LATITUDE_COLUMN, LONGITUDE_COLUMN, RentalTable};
use crate::ProximityError;

/// Anything that can be converted to radian coordinate pairs.
#[derive(Debug, Clone, Copy)]
pub enum CoordinateSource<'a> {
    /// Every row of a rental table, read from its `latitude` and
    /// `longitude` columns.
    Rentals(&'a RentalTable),
    /// Every normalized feature.
    Features(&'a [FeatureRecord]),
    /// A single `[latitude, longitude]` pair. Must have exactly two
    /// elements.
    Pair(&'a [f64]),
}

impl<'a> From<&'a RentalTable> for CoordinateSource<'a> {
    fn from(table: &'a RentalTable) -> Self {
        Self::Rentals(table)
    }
}

impl<'a> From<&'a [FeatureRecord]> for CoordinateSource<'a> {
    fn from(features: &'a [FeatureRecord]) -> Self {
        Self::Features(features)
    }
}

/// Converts `source` to `[lat_rad, lon_rad]` rows.
///
/// # Errors
///
/// Returns [`ProximityError::InvalidCoordinateInput`] if a table lacks
/// the coordinate columns or has an unparseable cell, or a pair does not
/// have exactly two elements.
pub fn to_radians(source: CoordinateSource<'_>) -> Result<Vec<[f64; 2]>, ProximityError> {
    match source {
        CoordinateSource::Rentals(table) => rental_radians(table),
        CoordinateSource::Features(features) => Ok(features
            .iter()
            .map(|f| coordinate_radians(f.coordinate()))
            .collect()),
        CoordinateSource::Pair(&[latitude, longitude]) => {
            Ok(vec![coordinate_radians(Coordinate::new(latitude, longitude))])
        }
        CoordinateSource::Pair(values) => Err(ProximityError::InvalidCoordinateInput {
            message: format!(
                "expected a [latitude, longitude] pair, got {} values: {values:?}",
                values.len()
            ),
        }),
    }
}

#[must_use]
pub fn coordinate_radians(coordinate: Coordinate) -> [f64; 2] {
    [
        coordinate.latitude.to_radians(),
        coordinate.longitude.to_radians(),
    ]
}

fn rental_radians(table: &RentalTable) -> Result<Vec<[f64; 2]>, ProximityError> {
    let column = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| ProximityError::InvalidCoordinateInput {
                message: format!("table has no '{name}' column"),
            })
    };
    let lat_idx = column(LATITUDE_COLUMN)?;
    let lon_idx = column(LONGITUDE_COLUMN)?;

    (0..table.len())
        .map(|row| {
            let latitude = parse_degrees(table, row, lat_idx, LATITUDE_COLUMN)?;
            let longitude = parse_degrees(table, row, lon_idx, LONGITUDE_COLUMN)?;
            Ok(coordinate_radians(Coordinate::new(latitude, longitude)))
        })
        .collect()
}

fn parse_degrees(
    table: &RentalTable,
    row: usize,
    column: usize,
    name: &str,
) -> Result<f64, ProximityError> {
    let raw = table.cell_at(row, column).unwrap_or("");
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ProximityError::InvalidCoordinateInput {
            message: format!("row {row} has invalid {name} '{raw}'"),
        })
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;

    fn table(csv: &str) -> RentalTable {
        RentalTable::from_csv_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn converts_every_table_row() {
        let rentals = table("latitude,longitude\n0,0\n90,180\n");
        let radians = to_radians(CoordinateSource::Rentals(&rentals)).unwrap();
        assert_eq!(radians.len(), 2);
        assert!(radians[0][0].abs() < 1e-12 && radians[0][1].abs() < 1e-12);
        assert!((radians[1][0] - FRAC_PI_2).abs() < 1e-12);
        assert!((radians[1][1] - PI).abs() < 1e-12);
    }

    #[test]
    fn wraps_single_pair_as_one_row() {
        let radians = to_radians(CoordinateSource::Pair(&[-37.8136, 144.9631])).unwrap();
        assert_eq!(radians.len(), 1);
        assert!((radians[0][0] - (-37.8136_f64).to_radians()).abs() < 1e-15);
        assert!((radians[0][1] - 144.9631_f64.to_radians()).abs() < 1e-15);
    }

    #[test]
    fn rejects_pair_of_wrong_length() {
        for values in [&[1.0][..], &[1.0, 2.0, 3.0][..], &[][..]] {
            assert!(matches!(
                to_radians(CoordinateSource::Pair(values)),
                Err(ProximityError::InvalidCoordinateInput { .. })
            ));
        }
    }

    #[test]
    fn rejects_table_without_coordinate_columns() {
        let rentals = table("lat,lon\n1,2\n");
        let err = to_radians(CoordinateSource::Rentals(&rentals)).unwrap_err();
        assert!(err.to_string().contains("latitude"), "{err}");
    }

    #[test]
    fn rejects_unparseable_cell_with_context() {
        let rentals = table("latitude,longitude\n-37.8,145.0\nnorth,145.1\n");
        let err = to_radians(CoordinateSource::Rentals(&rentals)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("row 1"), "{message}");
        assert!(message.contains("north"), "{message}");
    }

    #[test]
    fn converts_feature_records() {
        let features = [FeatureRecord {
            name: "A".to_string(),
            latitude: 90.0,
            longitude: -180.0,
            type_tag: None,
        }];
        let radians = to_radians(CoordinateSource::from(&features[..])).unwrap();
        assert!((radians[0][0] - FRAC_PI_2).abs() < 1e-12);
        assert!((radians[0][1] + PI).abs() < 1e-12);
    }
}
