//! Nearest-feature matching by great-circle distance.
//!
//! Distances are plain haversine on a sphere of radius
//! [`EARTH_RADIUS_KM`]; no ellipsoidal correction. For a feature table
//! the nearest feature per rental is the row with the smallest
//! distance, ties going to the lowest row index.

use rental_proximity_models::{Coordinate, FeatureCategory, FeatureRecord};

use crate::radians::{CoordinateSource, coordinate_radians, to_radians};
use crate::table::RentalTable;
use crate::ProximityError;

/// Mean Earth radius used for every distance in the pipeline.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Names of the columns a feature adds to the rental table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationColumns {
    pub name: String,
    pub type_tag: String,
    pub latitude: String,
    pub longitude: String,
    pub straight_line_distance: String,
    pub route_distance: String,
}

impl AnnotationColumns {
    #[must_use]
    pub fn new(feature: &str) -> Self {
        Self {
            name: format!("nearest_{feature}_name"),
            type_tag: format!("nearest_{feature}_type"),
            latitude: format!("nearest_{feature}_latitude"),
            longitude: format!("nearest_{feature}_longitude"),
            straight_line_distance: format!("straight_line_distance_{feature}"),
            route_distance: format!("route_distance_{feature}"),
        }
    }
}

/// What rentals are matched against.
#[derive(Debug, Clone, Copy)]
pub enum FeatureSource<'a> {
    /// A normalized feature table; must have at least one row.
    /// `category` decides which annotation columns are written.
    Features {
        records: &'a [FeatureRecord],
        category: FeatureCategory,
    },
    /// One fixed destination (e.g. the CBD). Every rental gets its
    /// distance to this point and no name/location columns.
    Destination(Coordinate),
}

impl<'a> FeatureSource<'a> {
    #[must_use]
    pub const fn features(records: &'a [FeatureRecord], category: FeatureCategory) -> Self {
        Self::Features { records, category }
    }
}

/// The feature chosen for one rental.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestMatch {
    /// Row index into the feature table.
    pub feature_index: usize,
    /// Great-circle distance in kilometers.
    pub distance_km: f64,
}

/// Central angle in radians between two `[lat_rad, lon_rad]` points.
#[must_use]
pub fn haversine_radians(a: [f64; 2], b: [f64; 2]) -> f64 {
    let half_dlat = (b[0] - a[0]) / 2.0;
    let half_dlon = (b[1] - a[1]) / 2.0;
    let h = half_dlon
        .sin()
        .powi(2)
        .mul_add(a[0].cos() * b[0].cos(), half_dlat.sin().powi(2));
    2.0 * h.sqrt().min(1.0).asin()
}

/// Great-circle distance in kilometers between two degree coordinates.
#[must_use]
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    haversine_radians(coordinate_radians(a), coordinate_radians(b)) * EARTH_RADIUS_KM
}

/// Pairwise distances in kilometers, indexed `[feature][rental]`.
#[must_use]
pub fn distance_matrix(features: &[[f64; 2]], rentals: &[[f64; 2]]) -> Vec<Vec<f64>> {
    features
        .iter()
        .map(|&feature| {
            rentals
                .iter()
                .map(|&rental| haversine_radians(feature, rental) * EARTH_RADIUS_KM)
                .collect()
        })
        .collect()
}

/// Picks the nearest feature for rental column `rental` of `matrix`.
///
/// Returns `None` only when the matrix has no feature rows.
#[must_use]
pub fn select_nearest(matrix: &[Vec<f64>], rental: usize) -> Option<NearestMatch> {
    let mut best: Option<NearestMatch> = None;

    for (feature_index, row) in matrix.iter().enumerate() {
        let distance_km = row[rental];
        match best {
            Some(current) if distance_km >= current.distance_km => {}
            _ => {
                best = Some(NearestMatch {
                    feature_index,
                    distance_km,
                });
            }
        }
    }

    best
}

/// Annotates every rental with its nearest feature and the straight-line
/// distance to it.
///
/// For [`FeatureSource::Features`] this adds `nearest_<feature>_name`
/// (title-cased), `nearest_<feature>_type` when the category carries a
/// type tag (null for untagged rows), `nearest_<feature>_latitude`, `nearest_<feature>_longitude`
/// and `straight_line_distance_<feature>`. For
/// [`FeatureSource::Destination`] only the distance column is added.
/// Existing annotation columns for the same feature are overwritten.
///
/// # Errors
///
/// * [`ProximityError::EmptyFeatureSet`] for an empty feature table.
/// * [`ProximityError::InvalidCoordinateInput`] if the rentals lack
///   usable coordinates.
pub fn match_nearest(
    mut table: RentalTable,
    source: FeatureSource<'_>,
    feature_name: &str,
) -> Result<RentalTable, ProximityError> {
    let columns = AnnotationColumns::new(feature_name);
    let rental_radians = to_radians(CoordinateSource::Rentals(&table))?;

    let distances = match source {
        FeatureSource::Destination(destination) => {
            let destination = coordinate_radians(destination);
            rental_radians
                .iter()
                .map(|&rental| haversine_radians(destination, rental) * EARTH_RADIUS_KM)
                .collect::<Vec<_>>()
        }
        FeatureSource::Features {
            records: features,
            category,
        } => {
            if features.is_empty() {
                return Err(ProximityError::EmptyFeatureSet {
                    feature: feature_name.to_string(),
                });
            }

            let feature_radians = to_radians(CoordinateSource::Features(features))?;
            let matrix = distance_matrix(&feature_radians, &rental_radians);

            let nearest = (0..rental_radians.len())
                .filter_map(|rental| select_nearest(&matrix, rental))
                .map(|m| (&features[m.feature_index], m.distance_km))
                .collect::<Vec<_>>();

            table.set_column(
                &columns.name,
                nearest.iter().map(|(f, _)| title_case(&f.name)).collect(),
            )?;
            if category.carries_type_tag() {
                table.set_column(
                    &columns.type_tag,
                    nearest
                        .iter()
                        .map(|(f, _)| f.type_tag.clone().unwrap_or_default())
                        .collect(),
                )?;
            }
            table.set_column(
                &columns.latitude,
                nearest.iter().map(|(f, _)| f.latitude.to_string()).collect(),
            )?;
            table.set_column(
                &columns.longitude,
                nearest.iter().map(|(f, _)| f.longitude.to_string()).collect(),
            )?;

            nearest.into_iter().map(|(_, distance)| distance).collect()
        }
    };

    log::info!(
        "Matched {} rentals to {feature_name} (mean straight-line distance {:.2} km)",
        table.len(),
        mean(&distances)
    );

    table.set_column(
        &columns.straight_line_distance,
        distances.iter().map(ToString::to_string).collect(),
    )?;

    Ok(table)
}

/// Capitalizes the first letter of every alphabetic run and lower-cases
/// the rest (`"ST. KILDA PARK"` becomes `"St. Kilda Park"`).
#[must_use]
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MELBOURNE_CBD: Coordinate = Coordinate::new(-37.8136, 144.9631);
    const SOUTHERN_CROSS: Coordinate = Coordinate::new(-37.8183, 144.9524);

    fn feature(name: &str, latitude: f64, longitude: f64) -> FeatureRecord {
        FeatureRecord {
            name: name.to_string(),
            latitude,
            longitude,
            type_tag: None,
        }
    }

    fn rentals(csv: &str) -> RentalTable {
        RentalTable::from_csv_reader(csv.as_bytes()).unwrap()
    }

    fn km(table: &RentalTable, row: usize, column: &str) -> f64 {
        table.cell(row, column).unwrap().parse().unwrap()
    }

    #[test]
    fn identical_points_are_zero_apart() {
        assert!(haversine_km(MELBOURNE_CBD, MELBOURNE_CBD).abs() < 1e-12);
    }

    #[test]
    fn cbd_to_southern_cross_is_about_a_kilometer() {
        let distance = haversine_km(MELBOURNE_CBD, SOUTHERN_CROSS);
        assert!((1.0..=1.3).contains(&distance), "distance was {distance}");
    }

    #[test]
    fn quarter_meridian_matches_radius() {
        let distance = haversine_km(Coordinate::new(0.0, 0.0), Coordinate::new(90.0, 0.0));
        let expected = EARTH_RADIUS_KM * std::f64::consts::FRAC_PI_2;
        assert!((distance - expected).abs() < 1e-9);
    }

    #[test]
    fn matrix_is_indexed_feature_then_rental() {
        let features = [[0.0, 0.0], [0.0, 0.1]];
        let rentals = [[0.0, 0.0], [0.0, 0.05], [0.0, 0.2]];
        let matrix = distance_matrix(&features, &rentals);
        assert_eq!(matrix.len(), 2);
        assert!(matrix.iter().all(|row| row.len() == 3));
        assert!(matrix[0][0].abs() < 1e-12);
        assert!(matrix[1][2] < matrix[0][2]);
    }

    #[test]
    fn selects_minimum_row() {
        let matrix = vec![vec![5.0], vec![1.0], vec![9.0]];
        let nearest = select_nearest(&matrix, 0).unwrap();
        assert_eq!(nearest.feature_index, 1);
        assert!((nearest.distance_km - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let matrix = vec![vec![3.0], vec![2.0], vec![2.0]];
        assert_eq!(select_nearest(&matrix, 0).unwrap().feature_index, 1);
    }

    #[test]
    fn empty_matrix_has_no_nearest() {
        assert_eq!(select_nearest(&[], 0), None);
    }

    #[test]
    fn assigns_nearest_of_three_features() {
        // Due north of the rental along a meridian: 1 degree is ~111.19 km.
        let table = rentals("id,latitude,longitude\nr1,0,0\n");
        let features = [
            feature("far away", 5.0 / 111.194_926_644_558_73, 0.0),
            feature("close by", 1.0 / 111.194_926_644_558_73, 0.0),
            feature("farthest", 9.0 / 111.194_926_644_558_73, 0.0),
        ];

        let table = match_nearest(table, FeatureSource::features(&features, FeatureCategory::Parks), "park").unwrap();
        assert_eq!(table.cell(0, "nearest_park_name"), Some("Close By"));
        assert_eq!(
            table.cell(0, "nearest_park_latitude"),
            Some(features[1].latitude.to_string().as_str())
        );
        assert_eq!(table.cell(0, "nearest_park_longitude"), Some("0"));
        assert!((km(&table, 0, "straight_line_distance_park") - 1.0).abs() < 1e-6);
        assert_eq!(table.cell(0, "id"), Some("r1"));
    }

    #[test]
    fn single_destination_gives_every_rental_its_own_distance() {
        let table = rentals(
            "latitude,longitude\n-37.8183,144.9524\n-37.8136,144.9631\n",
        );
        let table = match_nearest(table, FeatureSource::Destination(MELBOURNE_CBD), "cbd").unwrap();

        assert_eq!(
            table.columns(),
            &["latitude", "longitude", "straight_line_distance_cbd"]
        );
        let expected = haversine_km(SOUTHERN_CROSS, MELBOURNE_CBD);
        assert!((km(&table, 0, "straight_line_distance_cbd") - expected).abs() < 1e-9);
        assert!(km(&table, 1, "straight_line_distance_cbd").abs() < 1e-9);
    }

    #[test]
    fn nearest_school_end_to_end() {
        let table = rentals("address,latitude,longitude\n1 Test St,-37.81,145.01\n");
        let schools = [
            feature("NORTH PRIMARY", -37.80, 145.00),
            feature("SOUTH COLLEGE", -37.90, 145.10),
        ];

        let table = match_nearest(table, FeatureSource::features(&schools, FeatureCategory::School), "school").unwrap();
        assert_eq!(table.cell(0, "nearest_school_name"), Some("North Primary"));
        let distance = km(&table, 0, "straight_line_distance_school");
        assert!((distance - 1.4).abs() < 0.05, "distance was {distance}");
    }

    #[test]
    fn type_column_follows_category_not_data() {
        let mut schools = vec![feature("A", -37.80, 145.00)];
        schools[0].type_tag = Some("Government".to_string());
        let table = rentals("latitude,longitude\n-37.81,145.01\n");

        let generic = match_nearest(
            table.clone(),
            FeatureSource::features(&schools, FeatureCategory::School),
            "school",
        )
        .unwrap();
        assert_eq!(generic.column_index("nearest_school_type"), None);

        let tagged = match_nearest(
            table,
            FeatureSource::features(&schools, FeatureCategory::PrimarySchool),
            "primary_school",
        )
        .unwrap();
        assert_eq!(tagged.cell(0, "nearest_primary_school_type"), Some("Government"));
    }

    #[test]
    fn type_column_kept_when_every_sector_is_blank() {
        let schools = [feature("A", -37.80, 145.00), feature("B", -37.90, 145.10)];
        let table = rentals("latitude,longitude\n-37.81,145.01\n");

        let table = match_nearest(
            table,
            FeatureSource::features(&schools, FeatureCategory::SecondarySchool),
            "secondary_school",
        )
        .unwrap();

        assert_eq!(
            table.columns(),
            &[
                "latitude",
                "longitude",
                "nearest_secondary_school_name",
                "nearest_secondary_school_type",
                "nearest_secondary_school_latitude",
                "nearest_secondary_school_longitude",
                "straight_line_distance_secondary_school",
            ]
        );
        assert_eq!(table.cell(0, "nearest_secondary_school_type"), None);
    }

    #[test]
    fn empty_feature_table_is_an_error() {
        let table = rentals("latitude,longitude\n-37.81,145.01\n");
        let err = match_nearest(table, FeatureSource::features(&[], FeatureCategory::Parks), "parks").unwrap_err();
        assert!(matches!(err, ProximityError::EmptyFeatureSet { .. }));
    }

    #[test]
    fn rematching_overwrites_previous_annotation() {
        let table = rentals("latitude,longitude\n-37.81,145.01\n");
        let first = [feature("first", -37.80, 145.00)];
        let second = [feature("second", -37.81, 145.01)];

        let table = match_nearest(table, FeatureSource::features(&first, FeatureCategory::Parks), "parks").unwrap();
        let width = table.columns().len();
        let table = match_nearest(table, FeatureSource::features(&second, FeatureCategory::Parks), "parks").unwrap();

        assert_eq!(table.columns().len(), width);
        assert_eq!(table.cell(0, "nearest_parks_name"), Some("Second"));
    }

    #[test]
    fn title_case_follows_word_boundaries() {
        assert_eq!(title_case("MELBOURNE HIGH SCHOOL"), "Melbourne High School");
        assert_eq!(title_case("st. kilda-east p.s."), "St. Kilda-East P.S.");
        assert_eq!(title_case("mary's 2nd campus"), "Mary'S 2Nd Campus");
        assert_eq!(title_case(""), "");
    }
}
