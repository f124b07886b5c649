#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for rental proximity annotation.
//!
//! Without a subcommand, falls back to an interactive prompt that runs a
//! pipeline file.

mod interactive;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use rental_proximity::RentalTable;
use rental_proximity::checkpoint::CsvCheckpoint;
use rental_proximity::dataset::RawDataset;
use rental_proximity::enrich::{DEFAULT_CHECKPOINT_INTERVAL, RouteRequest, enrich_routes};
use rental_proximity::kind::{DEFAULT_JURISDICTION, FeatureSpec};
use rental_proximity::matcher::{FeatureSource, match_nearest};
use rental_proximity::normalize::normalize_features;
use rental_proximity::pipeline::{PipelineConfig, run_pipeline};
use rental_proximity_cli_utils::{IndicatifProgress, MultiProgress, rows_bar_factory};
use rental_proximity_models::{Coordinate, FeatureCategory, TravelMode};
use rental_proximity_routing::service_registry::{RoutingService, all_services, find_service};
use rental_proximity_routing::{RoutingClient, client_from_service};

#[derive(Parser)]
#[command(
    name = "rental_proximity",
    about = "Annotate rental listings with their nearest amenities"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported feature kinds and the filters each one takes
    Kinds,
    /// List configured routing services
    Services,
    /// Annotate rentals with their nearest feature (straight-line)
    Match {
        /// Rental CSV with `latitude` and `longitude` columns
        #[arg(long)]
        rentals: PathBuf,
        /// Feature dataset (`.csv`, `.geojson`)
        #[arg(long, conflicts_with = "destination")]
        dataset: Option<PathBuf>,
        /// Feature kind (see `kinds`)
        #[arg(long, requires = "dataset")]
        kind: Option<String>,
        /// Comma-separated type filter
        #[arg(long, value_delimiter = ',')]
        types: Option<Vec<String>>,
        /// Comma-separated subtype filter (polygon kinds)
        #[arg(long, value_delimiter = ',')]
        subtypes: Option<Vec<String>>,
        /// Jurisdiction for polygon kinds
        #[arg(long)]
        jurisdiction: Option<String>,
        /// Fixed destination as `lat,lon` instead of a dataset
        #[arg(
            long,
            value_parser = parse_destination,
            requires = "name",
            conflicts_with_all = ["types", "subtypes", "jurisdiction"]
        )]
        destination: Option<Coordinate>,
        /// Column suffix for a fixed destination (e.g. `cbd`)
        #[arg(long)]
        name: Option<String>,
        /// Where to write the annotated CSV
        #[arg(long)]
        output: PathBuf,
    },
    /// Add route distances to rentals already matched to a feature
    Route {
        /// Rental CSV, usually the output of `match`
        #[arg(long)]
        rentals: PathBuf,
        /// Feature name the rentals were matched to (e.g. `train_station`)
        #[arg(long)]
        feature: String,
        /// Fixed destination as `lat,lon` instead of the matched feature
        #[arg(long, value_parser = parse_destination)]
        destination: Option<Coordinate>,
        /// Directory for `rental_with_<feature>.csv`
        #[arg(long)]
        output_dir: PathBuf,
        /// Routing service id (default: highest-priority enabled service)
        #[arg(long)]
        service: Option<String>,
        /// Rows between checkpoints
        #[arg(long, default_value_t = DEFAULT_CHECKPOINT_INTERVAL)]
        checkpoint_every: usize,
        /// Travel mode (`driving`, `walking`, `bicycling`)
        #[arg(long, default_value = "driving")]
        mode: TravelMode,
    },
    /// Run every step of a pipeline TOML file
    Run {
        /// Pipeline run file
        pipeline: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = rental_proximity_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::Kinds => print_kinds(),
        Commands::Services => print_services(&all_services()),
        Commands::Match {
            rentals,
            dataset,
            kind,
            types,
            subtypes,
            jurisdiction,
            destination,
            name,
            output,
        } => {
            let table = RentalTable::from_csv_path(&rentals)?;
            let table = match (destination, dataset, kind) {
                (Some(destination), _, _) => {
                    let name = name.ok_or("--destination requires --name")?;
                    match_nearest(table, FeatureSource::Destination(destination), &name)?
                }
                (None, Some(dataset), Some(kind)) => {
                    let spec = FeatureSpec::from_parts(&kind, types, subtypes)?
                        .with_jurisdiction(
                            jurisdiction.unwrap_or_else(|| DEFAULT_JURISDICTION.to_string()),
                        );
                    let raw = RawDataset::load(&dataset)?;
                    let features = normalize_features(&raw, &spec)?;
                    let name = name.unwrap_or_else(|| spec.key());
                    let source = FeatureSource::features(&features, spec.category());
                    match_nearest(table, source, &name)?
                }
                _ => return Err("either --destination or --dataset with --kind is required".into()),
            };
            write_table(&table, &output)?;
        }
        Commands::Route {
            rentals,
            feature,
            destination,
            output_dir,
            service,
            checkpoint_every,
            mode,
        } => {
            let table = RentalTable::from_csv_path(&rentals)?;
            let client = routing_client(service.as_deref())?;
            let request = RouteRequest::new(&feature)
                .with_destination(destination)
                .with_mode(mode)
                .with_interval(checkpoint_every);
            let mut checkpoint = CsvCheckpoint::for_feature(&output_dir, &feature);
            let progress = IndicatifProgress::rows_bar(&multi, &format!("Routing to {feature}"));

            let start = Instant::now();
            enrich_routes(
                table,
                &request,
                client.as_ref(),
                &mut checkpoint,
                progress.as_ref(),
            )
            .await?;
            log::info!(
                "Route distances written to {} in {:.1}s",
                checkpoint.path().display(),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Run { pipeline } => run_pipeline_file(&pipeline, &multi).await?,
    }

    Ok(())
}

/// Loads and runs a pipeline file, building a routing client only if a
/// step routes.
async fn run_pipeline_file(
    path: &Path,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::load(path)?;
    let client = if config.needs_routing() {
        Some(routing_client(config.routing_service.as_deref())?)
    } else {
        None
    };

    let start = Instant::now();
    run_pipeline(&config, client.as_deref(), &rows_bar_factory(multi)).await?;
    log::info!(
        "Pipeline finished in {:.1}s: {}",
        start.elapsed().as_secs_f64(),
        config.final_output_path().display()
    );
    Ok(())
}

fn routing_client(id: Option<&str>) -> Result<Box<dyn RoutingClient>, Box<dyn std::error::Error>> {
    let service = find_service(id).ok_or_else(|| match id {
        Some(id) => format!("Unknown routing service: {id}"),
        None => "No routing service is enabled".to_string(),
    })?;
    Ok(client_from_service(&service)?)
}

fn write_table(table: &RentalTable, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    table.write_csv_path(output)?;
    log::info!("Wrote {} rentals to {}", table.len(), output.display());
    Ok(())
}

fn print_kinds() {
    println!("{:<18} FILTERS", "KIND");
    println!("{}", "-".repeat(60));
    for category in FeatureCategory::ALL {
        let filters = match category {
            FeatureCategory::School => "none",
            FeatureCategory::PrimarySchool | FeatureCategory::SecondarySchool => {
                "--types <school types>"
            }
            FeatureCategory::TrainStation => "none (active stations only)",
            FeatureCategory::Shopping | FeatureCategory::Parks | FeatureCategory::Hospital => {
                "--types <FTYPE> --subtypes <FEATSUBTYP> [--jurisdiction]"
            }
        };
        println!("{:<18} {filters}", category.as_ref());
    }
}

fn print_services(services: &[RoutingService]) {
    println!("{:<18} {:<8} {:<9} {:<22} NAME", "ID", "ENABLED", "PRIORITY", "API KEY");
    println!("{}", "-".repeat(80));
    for service in services {
        println!(
            "{:<18} {:<8} {:<9} {:<22} {}",
            service.id,
            service.enabled,
            service.priority,
            service.api_key_env(),
            service.name
        );
    }
}

/// Parses `lat,lon` into a coordinate.
fn parse_destination(value: &str) -> Result<Coordinate, String> {
    let (latitude, longitude) = value
        .split_once(',')
        .ok_or_else(|| format!("expected 'lat,lon', got '{value}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{part}': {e}"))
    };
    let coordinate = Coordinate::new(parse(latitude)?, parse(longitude)?);

    if !(-90.0..=90.0).contains(&coordinate.latitude)
        || !(-180.0..=180.0).contains(&coordinate.longitude)
    {
        return Err(format!("coordinate out of range: {coordinate}"));
    }
    Ok(coordinate)
}
