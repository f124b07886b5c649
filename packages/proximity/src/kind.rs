//! Feature kind configuration.
//!
//! Each amenity kind has its own filter contract: school sub-kinds need
//! a list of school types, stations take no filters, and polygon layers
//! need both a feature type and a set of subtypes. [`FeatureSpec`]
//! encodes each contract as its own variant so an invalid combination
//! cannot be constructed; [`FeatureSpec::from_parts`] is the single place
//! where loosely-typed caller input is checked.

use std::str::FromStr as _;

use rental_proximity_models::FeatureCategory;

use crate::ProximityError;

/// Jurisdiction polygon layers are restricted to unless overridden.
pub const DEFAULT_JURISDICTION: &str = "VIC";

/// A validated, ready-to-apply feature configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSpec {
    /// Point rows from a school list.
    School(SchoolSpec),
    /// Active stations from a station layer.
    TrainStation,
    /// Polygon centroids from a topographic feature layer.
    Polygon(PolygonSpec),
}

/// Which schools to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchoolSpec {
    /// Every school in the list.
    All,
    /// Schools whose type is one of `school_types`.
    Primary {
        /// Accepted `School_Type` values.
        school_types: Vec<String>,
    },
    /// Schools whose type is one of `school_types`.
    Secondary {
        /// Accepted `School_Type` values.
        school_types: Vec<String>,
    },
}

/// The polygon-backed amenity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonKind {
    Shopping,
    Parks,
    Hospital,
}

impl PolygonKind {
    #[must_use]
    pub const fn category(self) -> FeatureCategory {
        match self {
            Self::Shopping => FeatureCategory::Shopping,
            Self::Parks => FeatureCategory::Parks,
            Self::Hospital => FeatureCategory::Hospital,
        }
    }
}

/// Filters for a polygon layer. Both filter lists are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolygonSpec {
    kind: PolygonKind,
    feature_types: Vec<String>,
    subtypes: Vec<String>,
    jurisdiction: String,
}

impl PolygonSpec {
    /// # Errors
    ///
    /// Returns [`ProximityError::InvalidParameters`] if either filter
    /// list is empty.
    pub fn new(
        kind: PolygonKind,
        feature_types: Vec<String>,
        subtypes: Vec<String>,
    ) -> Result<Self, ProximityError> {
        if feature_types.is_empty() || subtypes.is_empty() {
            return Err(ProximityError::InvalidParameters {
                kind: kind.category().to_string(),
                message: format!(
                    "both feat_type and feat_subtypes must have a value \
                     (got {} types, {} subtypes)",
                    feature_types.len(),
                    subtypes.len()
                ),
            });
        }

        Ok(Self {
            kind,
            feature_types,
            subtypes,
            jurisdiction: DEFAULT_JURISDICTION.to_string(),
        })
    }

    /// Restricts the layer to a different `STATE` value.
    #[must_use]
    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = jurisdiction.into();
        self
    }

    #[must_use]
    pub const fn kind(&self) -> PolygonKind {
        self.kind
    }

    #[must_use]
    pub fn feature_types(&self) -> &[String] {
        &self.feature_types
    }

    #[must_use]
    pub fn subtypes(&self) -> &[String] {
        &self.subtypes
    }

    #[must_use]
    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }
}

impl FeatureSpec {
    /// Validates a kind string and its optional filters.
    ///
    /// A supplied-but-empty filter list counts as supplied where filters
    /// are forbidden and as missing where they are required.
    ///
    /// # Errors
    ///
    /// * [`ProximityError::InvalidFeatureKind`] for an unknown kind.
    /// * [`ProximityError::InvalidParameters`] when a required filter is
    ///   missing or a forbidden one is given.
    pub fn from_parts(
        kind: &str,
        types: Option<Vec<String>>,
        subtypes: Option<Vec<String>>,
    ) -> Result<Self, ProximityError> {
        let category =
            FeatureCategory::from_str(kind).map_err(|_| ProximityError::InvalidFeatureKind {
                kind: kind.to_string(),
            })?;

        let invalid = |message: &str| ProximityError::InvalidParameters {
            kind: kind.to_string(),
            message: format!(
                "{message} (feat_type: {}, feat_subtypes: {})",
                describe(types.as_deref()),
                describe(subtypes.as_deref())
            ),
        };

        match category {
            FeatureCategory::School
            | FeatureCategory::PrimarySchool
            | FeatureCategory::SecondarySchool => {
                if subtypes.is_some() {
                    return Err(invalid("feat_subtypes must be none for school kinds"));
                }
                let school = match (category, types.clone()) {
                    (FeatureCategory::School, None) => SchoolSpec::All,
                    (FeatureCategory::PrimarySchool, Some(school_types))
                        if !school_types.is_empty() =>
                    {
                        SchoolSpec::Primary { school_types }
                    }
                    (FeatureCategory::SecondarySchool, Some(school_types))
                        if !school_types.is_empty() =>
                    {
                        SchoolSpec::Secondary { school_types }
                    }
                    _ => {
                        return Err(invalid(
                            "feat_type must be none for \"school\" and must list \
                             school types for primary_school/secondary_school",
                        ));
                    }
                };
                Ok(Self::School(school))
            }
            FeatureCategory::TrainStation => {
                if types.is_some() || subtypes.is_some() {
                    return Err(invalid("both feat_type and feat_subtypes must be none"));
                }
                Ok(Self::TrainStation)
            }
            FeatureCategory::Shopping | FeatureCategory::Parks | FeatureCategory::Hospital => {
                let polygon_kind = match category {
                    FeatureCategory::Shopping => PolygonKind::Shopping,
                    FeatureCategory::Parks => PolygonKind::Parks,
                    _ => PolygonKind::Hospital,
                };
                match (types.clone(), subtypes.clone()) {
                    (Some(feature_types), Some(subtypes)) => Ok(Self::Polygon(
                        PolygonSpec::new(polygon_kind, feature_types, subtypes)?,
                    )),
                    _ => Err(invalid("both feat_type and feat_subtypes must have a value")),
                }
            }
        }
    }

    #[must_use]
    pub const fn category(&self) -> FeatureCategory {
        match self {
            Self::School(SchoolSpec::All) => FeatureCategory::School,
            Self::School(SchoolSpec::Primary { .. }) => FeatureCategory::PrimarySchool,
            Self::School(SchoolSpec::Secondary { .. }) => FeatureCategory::SecondarySchool,
            Self::TrainStation => FeatureCategory::TrainStation,
            Self::Polygon(polygon) => polygon.kind.category(),
        }
    }

    /// The feature name used in annotation column names.
    #[must_use]
    pub fn key(&self) -> String {
        self.category().to_string()
    }

    /// Overrides the jurisdiction of a polygon spec; other kinds are
    /// returned unchanged.
    #[must_use]
    pub fn with_jurisdiction(self, jurisdiction: impl Into<String>) -> Self {
        match self {
            Self::Polygon(polygon) => Self::Polygon(polygon.with_jurisdiction(jurisdiction)),
            other => other,
        }
    }
}

fn describe(filter: Option<&[String]>) -> String {
    filter.map_or_else(|| "none".to_string(), |values| format!("{values:?}"))
}
