//! TOML-driven pipeline runs.
//!
//! A run file names the rental CSV, an output directory and an ordered
//! list of `[[feature]]` steps:
//!
//! ```toml
//! rentals = "data/rentals.csv"
//! output_dir = "out"
//! checkpoint_interval = 100
//!
//! [[feature]]
//! kind = "train_station"
//! dataset = "data/stations.geojson"
//! route = true
//!
//! [[feature]]
//! kind = "parks"
//! dataset = "data/parks.geojson"
//! types = ["park"]
//! subtypes = ["park", "reserve"]
//!
//! [[feature]]
//! name = "cbd"
//! destination = [-37.8136, 144.9631]
//! route = true
//! ```
//!
//! Steps run strictly in order on the same table. Each routed step
//! checkpoints to `<output_dir>/rental_with_<feature>.csv`; the final
//! table goes to `<output_dir>/rental_with_proximity.csv`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rental_proximity_models::{Coordinate, TravelMode};
use rental_proximity_routing::RoutingClient;
use serde::Deserialize;

use crate::checkpoint::CsvCheckpoint;
use crate::dataset::RawDataset;
use crate::enrich::{DEFAULT_CHECKPOINT_INTERVAL, RouteRequest, enrich_routes};
use crate::kind::FeatureSpec;
use crate::matcher::{FeatureSource, match_nearest};
use crate::normalize::normalize_features;
use crate::progress::ProgressCallback;
use crate::table::RentalTable;
use crate::ProximityError;

/// File name of the fully annotated table inside `output_dir`.
pub const FINAL_OUTPUT_FILE: &str = "rental_with_proximity.csv";

/// A parsed pipeline run file.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Rental CSV with `latitude` and `longitude` columns.
    pub rentals: PathBuf,
    /// Directory for checkpoints and the final table.
    pub output_dir: PathBuf,
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
    /// Routing service id; `None` picks the default service.
    #[serde(default)]
    pub routing_service: Option<String>,
    #[serde(default)]
    pub mode: TravelMode,
    #[serde(rename = "feature", default)]
    pub features: Vec<FeatureStep>,
}

const fn default_checkpoint_interval() -> usize {
    DEFAULT_CHECKPOINT_INTERVAL
}

/// One `[[feature]]` table as written in the run file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureStep {
    pub kind: Option<String>,
    /// Column suffix override. Required for fixed destinations.
    pub name: Option<String>,
    pub dataset: Option<PathBuf>,
    pub types: Option<Vec<String>>,
    pub subtypes: Option<Vec<String>>,
    pub jurisdiction: Option<String>,
    /// Fixed `[latitude, longitude]` instead of a dataset.
    pub destination: Option<[f64; 2]>,
    #[serde(default)]
    pub route: bool,
}

/// Where a step's features come from, after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum StepSource {
    Dataset { path: PathBuf, spec: FeatureSpec },
    Destination(Coordinate),
}

/// A validated step.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStep {
    pub name: String,
    pub source: StepSource,
    pub route: bool,
}

impl FeatureStep {
    /// Validates the step's fields and its kind's filter contract.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::InvalidParameters`] if the step mixes a
    /// dataset with a fixed destination, lacks both, or a destination
    /// step has no `name` or carries dataset filters; plus any error from
    /// [`FeatureSpec::from_parts`].
    pub fn resolve(&self) -> Result<ResolvedStep, ProximityError> {
        let label = self
            .name
            .clone()
            .or_else(|| self.kind.clone())
            .unwrap_or_else(|| "<unnamed>".to_string());
        let invalid = |message: &str| ProximityError::InvalidParameters {
            kind: label.clone(),
            message: message.to_string(),
        };

        match (&self.dataset, self.destination) {
            (Some(_), Some(_)) => Err(invalid("set either dataset or destination, not both")),
            (None, Some([latitude, longitude])) => {
                let filters = [
                    ("kind", self.kind.is_some()),
                    ("types", self.types.is_some()),
                    ("subtypes", self.subtypes.is_some()),
                    ("jurisdiction", self.jurisdiction.is_some()),
                ];
                if let Some((field, _)) = filters.iter().find(|(_, set)| *set) {
                    return Err(invalid(&format!(
                        "a destination step does not accept `{field}`"
                    )));
                }
                let name = self
                    .name
                    .clone()
                    .ok_or_else(|| invalid("a destination step needs a name"))?;
                Ok(ResolvedStep {
                    name,
                    source: StepSource::Destination(Coordinate::new(latitude, longitude)),
                    route: self.route,
                })
            }
            (Some(path), None) => {
                let kind = self
                    .kind
                    .as_deref()
                    .ok_or_else(|| invalid("a dataset step needs a kind"))?;
                let mut spec =
                    FeatureSpec::from_parts(kind, self.types.clone(), self.subtypes.clone())?;
                if let Some(jurisdiction) = &self.jurisdiction {
                    spec = spec.with_jurisdiction(jurisdiction.clone());
                }
                Ok(ResolvedStep {
                    name: self.name.clone().unwrap_or_else(|| spec.key()),
                    source: StepSource::Dataset {
                        path: path.clone(),
                        spec,
                    },
                    route: self.route,
                })
            }
            (None, None) => Err(invalid("a step needs a dataset or a destination")),
        }
    }
}

impl PipelineConfig {
    /// # Errors
    ///
    /// Returns [`ProximityError::Toml`] if the text is not a valid run
    /// file.
    pub fn from_toml_str(text: &str) -> Result<Self, ProximityError> {
        Ok(toml::de::from_str(text)?)
    }

    /// # Errors
    ///
    /// Returns [`ProximityError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ProximityError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Validates every step up front.
    ///
    /// # Errors
    ///
    /// Returns the first step error.
    pub fn resolve_steps(&self) -> Result<Vec<ResolvedStep>, ProximityError> {
        self.features.iter().map(FeatureStep::resolve).collect()
    }

    /// Whether any step asks for route distances.
    #[must_use]
    pub fn needs_routing(&self) -> bool {
        self.features.iter().any(|step| step.route)
    }

    #[must_use]
    pub fn final_output_path(&self) -> PathBuf {
        self.output_dir.join(FINAL_OUTPUT_FILE)
    }
}

/// Runs every step of `config` in order and writes the final table.
///
/// `make_progress` is called once per routed step with the step name.
///
/// # Errors
///
/// Fails before touching any file if a step is invalid or a step needs
/// routing and `client` is `None`. Otherwise returns the first load,
/// normalize, match or checkpoint error.
pub async fn run_pipeline(
    config: &PipelineConfig,
    client: Option<&dyn RoutingClient>,
    make_progress: &dyn Fn(&str) -> Arc<dyn ProgressCallback>,
) -> Result<RentalTable, ProximityError> {
    let steps = config.resolve_steps()?;

    if client.is_none()
        && let Some(step) = steps.iter().find(|step| step.route)
    {
        return Err(ProximityError::InvalidParameters {
            kind: step.name.clone(),
            message: "route = true requires a routing service".to_string(),
        });
    }

    log::info!(
        "Running pipeline with {} feature steps into {}",
        steps.len(),
        config.output_dir.display()
    );

    let mut table = RentalTable::from_csv_path(&config.rentals)?;

    for step in &steps {
        let destination = match &step.source {
            StepSource::Dataset { path, spec } => {
                let dataset = RawDataset::load(path)?;
                let features = normalize_features(&dataset, spec)?;
                table = match_nearest(
                    table,
                    FeatureSource::features(&features, spec.category()),
                    &step.name,
                )?;
                None
            }
            StepSource::Destination(coordinate) => {
                table = match_nearest(table, FeatureSource::Destination(*coordinate), &step.name)?;
                Some(*coordinate)
            }
        };

        if let (true, Some(client)) = (step.route, client) {
            let request = RouteRequest::new(&step.name)
                .with_destination(destination)
                .with_mode(config.mode)
                .with_interval(config.checkpoint_interval);
            let mut checkpoint = CsvCheckpoint::for_feature(&config.output_dir, &step.name);
            let progress = make_progress(&step.name);
            table = enrich_routes(table, &request, client, &mut checkpoint, progress.as_ref())
                .await?;
        }
    }

    std::fs::create_dir_all(&config.output_dir)?;
    let output = config.final_output_path();
    table.write_csv_path(&output)?;
    log::info!(
        "Wrote {} rentals ({} columns) to {}",
        table.len(),
        table.columns().len(),
        output.display()
    );

    Ok(table)
}
