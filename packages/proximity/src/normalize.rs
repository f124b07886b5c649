//! Reduces raw amenity datasets to [`FeatureRecord`] points.
//!
//! The column names below are the ones used by the Victorian government
//! open-data exports (school locations, `VicMap` railway stations and
//! `VicMap` topographic feature polygons). Rows that cannot be resolved
//! to a coordinate are dropped rather than reported.

use geo::Centroid as _;
use rental_proximity_models::FeatureRecord;

use crate::dataset::{RawDataset, RawFeature};
use crate::kind::{FeatureSpec, PolygonSpec, SchoolSpec};
use crate::ProximityError;

/// Source column names, fixed per dataset kind.
pub mod columns {
    pub const SCHOOL_NAME: &str = "School_Name";
    pub const SCHOOL_TYPE: &str = "School_Type";
    pub const EDUCATION_SECTOR: &str = "Education_Sector";
    /// School latitude.
    pub const SCHOOL_LATITUDE: &str = "Y";
    /// School longitude.
    pub const SCHOOL_LONGITUDE: &str = "X";

    pub const STATION_NAME: &str = "STATION";
    pub const STATION_STATUS: &str = "STATUS";

    pub const POLYGON_STATE: &str = "STATE";
    pub const POLYGON_FEATURE_TYPE: &str = "FTYPE";
    pub const POLYGON_SUBTYPE: &str = "FEATSUBTYP";
    pub const POLYGON_NAME: &str = "NAME";
}

/// `STATUS` value of stations still in service.
pub const ACTIVE_STATION_STATUS: &str = "Active";

/// Validates a kind string plus filters and normalizes `dataset`.
///
/// # Errors
///
/// See [`FeatureSpec::from_parts`] and [`normalize_features`].
pub fn normalize(
    dataset: &RawDataset,
    kind: &str,
    types: Option<Vec<String>>,
    subtypes: Option<Vec<String>>,
) -> Result<Vec<FeatureRecord>, ProximityError> {
    let spec = FeatureSpec::from_parts(kind, types, subtypes)?;
    normalize_features(dataset, &spec)
}

/// Applies `spec` to `dataset`, returning one record per kept row.
///
/// # Errors
///
/// Returns [`ProximityError::MissingColumn`] if the dataset lacks a
/// column the kind depends on.
pub fn normalize_features(
    dataset: &RawDataset,
    spec: &FeatureSpec,
) -> Result<Vec<FeatureRecord>, ProximityError> {
    let key = spec.key();

    for column in required_columns(spec) {
        if !dataset.has_column(column) {
            return Err(ProximityError::MissingColumn {
                kind: key,
                column: (*column).to_string(),
            });
        }
    }

    let carries_type_tag = spec.category().carries_type_tag();
    let mut filtered_out = 0usize;
    let mut unresolved = 0usize;
    let mut records = Vec::new();

    for (idx, feature) in dataset.features().iter().enumerate() {
        if !accepts(spec, feature) {
            filtered_out += 1;
            continue;
        }

        let record = match spec {
            FeatureSpec::School(_) => school_record(feature, carries_type_tag),
            FeatureSpec::TrainStation => centroid_record(feature, columns::STATION_NAME),
            FeatureSpec::Polygon(_) => centroid_record(feature, columns::POLYGON_NAME),
        };

        if let Some(record) = record {
            records.push(record);
        } else {
            log::debug!("Dropping {key} row {idx}: no resolvable coordinate");
            unresolved += 1;
        }
    }

    log::info!(
        "Normalized {key}: kept {} of {} rows ({filtered_out} filtered out, \
         {unresolved} without coordinates)",
        records.len(),
        dataset.len()
    );

    Ok(records)
}

fn required_columns(spec: &FeatureSpec) -> &'static [&'static str] {
    match spec {
        FeatureSpec::School(SchoolSpec::All) => &[
            columns::SCHOOL_NAME,
            columns::SCHOOL_LATITUDE,
            columns::SCHOOL_LONGITUDE,
        ],
        FeatureSpec::School(_) => &[
            columns::SCHOOL_NAME,
            columns::SCHOOL_TYPE,
            columns::EDUCATION_SECTOR,
            columns::SCHOOL_LATITUDE,
            columns::SCHOOL_LONGITUDE,
        ],
        FeatureSpec::TrainStation => &[columns::STATION_NAME, columns::STATION_STATUS],
        FeatureSpec::Polygon(_) => &[
            columns::POLYGON_STATE,
            columns::POLYGON_FEATURE_TYPE,
            columns::POLYGON_SUBTYPE,
            columns::POLYGON_NAME,
        ],
    }
}

fn accepts(spec: &FeatureSpec, feature: &RawFeature) -> bool {
    match spec {
        FeatureSpec::School(SchoolSpec::All) => true,
        FeatureSpec::School(
            SchoolSpec::Primary { school_types } | SchoolSpec::Secondary { school_types },
        ) => is_one_of(feature.text(columns::SCHOOL_TYPE), school_types),
        FeatureSpec::TrainStation => {
            feature.text(columns::STATION_STATUS).as_deref() == Some(ACTIVE_STATION_STATUS)
        }
        FeatureSpec::Polygon(polygon) => accepts_polygon(polygon, feature),
    }
}

fn accepts_polygon(polygon: &PolygonSpec, feature: &RawFeature) -> bool {
    feature.text(columns::POLYGON_STATE).as_deref() == Some(polygon.jurisdiction())
        && is_one_of(
            feature.text(columns::POLYGON_FEATURE_TYPE),
            polygon.feature_types(),
        )
        && is_one_of(feature.text(columns::POLYGON_SUBTYPE), polygon.subtypes())
}

fn is_one_of(value: Option<String>, allowed: &[String]) -> bool {
    value.is_some_and(|v| allowed.iter().any(|a| *a == v))
}

fn school_record(feature: &RawFeature, carries_type_tag: bool) -> Option<FeatureRecord> {
    let latitude = feature.number(columns::SCHOOL_LATITUDE)?;
    let longitude = feature.number(columns::SCHOOL_LONGITUDE)?;

    Some(FeatureRecord {
        name: feature.text(columns::SCHOOL_NAME).unwrap_or_default(),
        latitude,
        longitude,
        type_tag: if carries_type_tag {
            feature.text(columns::EDUCATION_SECTOR)
        } else {
            None
        },
    })
}

/// Uses the centroid of the row's geometry; for point layers that is the
/// point itself.
fn centroid_record(feature: &RawFeature, name_column: &str) -> Option<FeatureRecord> {
    let centroid = feature.geometry.as_ref()?.centroid()?;
    let (latitude, longitude) = (centroid.y(), centroid.x());
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }

    Some(FeatureRecord {
        name: feature.text(name_column).unwrap_or_default(),
        latitude,
        longitude,
        type_tag: None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn strings(values: &[&str]) -> Option<Vec<String>> {
        Some(values.iter().map(ToString::to_string).collect())
    }

    fn schools() -> RawDataset {
        let csv = "School_Name,School_Type,Education_Sector,Y,X\n\
                   NORTH PRIMARY,Primary,Government,-37.80,145.00\n\
                   SOUTH COLLEGE,Secondary,Catholic,-37.90,145.10\n\
                   LOST PRIMARY,Primary,Independent,,145.20\n\
                   BOTH WAYS,Pri/Sec,Government,-37.70,144.90\n";
        RawDataset::from_csv_reader(csv.as_bytes()).unwrap()
    }

    fn square(lon: f64, lat: f64, size: f64) -> serde_json::Value {
        json!({
            "type": "Polygon",
            "coordinates": [[
                [lon, lat],
                [lon + size, lat],
                [lon + size, lat + size],
                [lon, lat + size],
                [lon, lat]
            ]]
        })
    }

    fn polygons() -> RawDataset {
        let text = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {
                        "STATE": "VIC", "FTYPE": "recreation",
                        "FEATSUBTYP": "park", "NAME": "FLAGSTAFF GARDENS"
                    },
                    "geometry": square(144.95, -37.82, 0.02)
                },
                {
                    "type": "Feature",
                    "properties": {
                        "STATE": "NSW", "FTYPE": "recreation",
                        "FEATSUBTYP": "park", "NAME": "HYDE PARK"
                    },
                    "geometry": square(151.20, -33.88, 0.01)
                },
                {
                    "type": "Feature",
                    "properties": {
                        "STATE": "VIC", "FTYPE": "recreation",
                        "FEATSUBTYP": "golf course", "NAME": "ROYAL PARK GOLF"
                    },
                    "geometry": square(144.94, -37.78, 0.01)
                },
                {
                    "type": "Feature",
                    "properties": {
                        "STATE": "VIC", "FTYPE": "recreation",
                        "FEATSUBTYP": "park", "NAME": "NO SHAPE"
                    },
                    "geometry": null
                }
            ]
        })
        .to_string();
        RawDataset::from_geojson_str(&text).unwrap()
    }

    #[test]
    fn generic_school_keeps_every_located_row() {
        let records = normalize(&schools(), "school", None, None).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.type_tag.is_none()));
        assert_eq!(records[0].name, "NORTH PRIMARY");
        assert!((records[0].latitude - -37.80).abs() < 1e-9);
        assert!((records[0].longitude - 145.00).abs() < 1e-9);
    }

    #[test]
    fn primary_school_filters_by_type_and_tags_sector() {
        let records =
            normalize(&schools(), "primary_school", strings(&["Primary", "Pri/Sec"]), None)
                .unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["NORTH PRIMARY", "BOTH WAYS"]);
        assert_eq!(records[0].type_tag.as_deref(), Some("Government"));
    }

    #[test]
    fn output_never_exceeds_input_and_has_coordinates() {
        let dataset = schools();
        let records = normalize(&dataset, "school", None, None).unwrap();
        assert!(records.len() <= dataset.len());
        assert!(
            records
                .iter()
                .all(|r| r.latitude.is_finite() && r.longitude.is_finite())
        );
    }

    #[test]
    fn missing_school_column_is_reported() {
        let csv = "Name,Y,X\nA,-37.8,145.0\n";
        let dataset = RawDataset::from_csv_reader(csv.as_bytes()).unwrap();
        let err = normalize(&dataset, "school", None, None).unwrap_err();
        let ProximityError::MissingColumn { kind, column } = err else {
            panic!("expected MissingColumn, got {err:?}");
        };
        assert_eq!(kind, "school");
        assert_eq!(column, "School_Name");
    }

    #[test]
    fn stations_keep_only_active_rows() {
        let text = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "STATION": "SOUTHERN CROSS", "STATUS": "Active" },
                    "geometry": { "type": "Point", "coordinates": [144.9524, -37.8183] }
                },
                {
                    "type": "Feature",
                    "properties": { "STATION": "OLD YARD", "STATUS": "Disused" },
                    "geometry": { "type": "Point", "coordinates": [144.90, -37.80] }
                }
            ]
        })
        .to_string();
        let dataset = RawDataset::from_geojson_str(&text).unwrap();

        let records = normalize(&dataset, "train_station", None, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "SOUTHERN CROSS");
        assert!((records[0].latitude - -37.8183).abs() < 1e-9);
        assert!((records[0].longitude - 144.9524).abs() < 1e-9);
    }

    #[test]
    fn polygons_filter_by_state_type_and_subtype() {
        let records = normalize(
            &polygons(),
            "parks",
            strings(&["recreation"]),
            strings(&["park"]),
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "FLAGSTAFF GARDENS");
    }

    #[test]
    fn polygon_coordinate_is_centroid() {
        let records = normalize(
            &polygons(),
            "parks",
            strings(&["recreation"]),
            strings(&["park", "golf course"]),
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        let flagstaff = &records[0];
        assert!((flagstaff.latitude - -37.81).abs() < 1e-9);
        assert!((flagstaff.longitude - 144.96).abs() < 1e-9);
    }

    #[test]
    fn polygon_jurisdiction_can_be_overridden() {
        let spec = FeatureSpec::from_parts(
            "parks",
            strings(&["recreation"]),
            strings(&["park"]),
        )
        .unwrap()
        .with_jurisdiction("NSW");
        let records = normalize_features(&polygons(), &spec).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "HYDE PARK");
    }

    #[test]
    fn filter_contract_checked_before_data() {
        let err = normalize(&polygons(), "parks", None, strings(&["park"])).unwrap_err();
        assert!(matches!(err, ProximityError::InvalidParameters { .. }));

        let err = normalize(&polygons(), "museum", None, None).unwrap_err();
        assert!(matches!(err, ProximityError::InvalidFeatureKind { .. }));
    }
}
