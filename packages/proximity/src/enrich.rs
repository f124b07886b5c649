//! Route-distance enrichment.
//!
//! For every rental, asks a [`RoutingClient`] for the travel distance to
//! its matched feature (or to a fixed destination) and records it in
//! `route_distance_<feature>` as kilometers. Rows are processed strictly
//! in table order, one request at a time.
//!
//! A failed lookup never stops the batch: the row gets a null distance
//! and a warning naming the coordinate pair. The whole table is handed
//! to a [`CheckpointWriter`] every `checkpoint_interval` rows and once
//! more after the last row, so an interruption loses at most one
//! interval of lookups.

use rental_proximity_models::{Coordinate, TravelMode};
use rental_proximity_routing::{RouteOutcome, RoutingClient};

use crate::checkpoint::CheckpointWriter;
use crate::matcher::AnnotationColumns;
use crate::progress::ProgressCallback;
use crate::table::{LATITUDE_COLUMN, LONGITUDE_COLUMN, RentalTable};
use crate::ProximityError;

/// Rows between checkpoints unless the caller says otherwise.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 100;

/// What to route and how often to checkpoint.
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    /// Feature name the annotation columns are keyed by.
    pub feature_name: &'a str,
    /// Fixed destination for every row. When `None`, each row's
    /// `nearest_<feature>_latitude/longitude` cells are used.
    pub destination: Option<Coordinate>,
    pub mode: TravelMode,
    /// Rows between checkpoint writes. Zero disables the periodic
    /// writes; the final write always happens.
    pub checkpoint_interval: usize,
}

impl<'a> RouteRequest<'a> {
    #[must_use]
    pub fn new(feature_name: &'a str) -> Self {
        Self {
            feature_name,
            destination: None,
            mode: TravelMode::default(),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }

    #[must_use]
    pub const fn with_destination(mut self, destination: Option<Coordinate>) -> Self {
        self.destination = destination;
        self
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: TravelMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn with_interval(mut self, checkpoint_interval: usize) -> Self {
        self.checkpoint_interval = checkpoint_interval;
        self
    }
}

/// Annotates every rental with its routed distance.
///
/// Any previous `route_distance_<feature>` values are cleared first.
///
/// # Errors
///
/// * [`ProximityError::MissingColumn`] if the table has no
///   `latitude`/`longitude` columns, or no fixed destination was given
///   and the `nearest_<feature>_latitude/longitude` columns are absent.
/// * Any error from `checkpoint`. Route lookup failures are never
///   errors.
pub async fn enrich_routes(
    mut table: RentalTable,
    request: &RouteRequest<'_>,
    client: &dyn RoutingClient,
    checkpoint: &mut dyn CheckpointWriter,
    progress: &dyn ProgressCallback,
) -> Result<RentalTable, ProximityError> {
    let feature = request.feature_name;
    let columns = AnnotationColumns::new(feature);

    let origin_columns = (
        require_column(&table, feature, LATITUDE_COLUMN)?,
        require_column(&table, feature, LONGITUDE_COLUMN)?,
    );
    let destination_columns = match request.destination {
        Some(_) => None,
        None => Some((
            require_column(&table, feature, &columns.latitude)?,
            require_column(&table, feature, &columns.longitude)?,
        )),
    };

    let route_idx = table.reset_column(&columns.route_distance);
    let total = table.len();

    log::info!(
        "Routing {total} rentals to {feature} via {} ({}, checkpoint every {} rows)",
        client.id(),
        request.mode,
        request.checkpoint_interval
    );
    progress.set_total(total as u64);
    progress.set_message(format!("Routing to {feature}"));

    let mut routed = 0_usize;
    for row in 0..total {
        let origin = row_coordinate(&table, row, origin_columns);
        let destination = request
            .destination
            .or_else(|| destination_columns.and_then(|cols| row_coordinate(&table, row, cols)));

        let distance = match (origin, destination) {
            (Some(origin), Some(destination)) => {
                lookup(client, origin, destination, request.mode).await
            }
            _ => {
                log::warn!(
                    "Row {row}: unusable coordinates (origin {origin:?}, destination \
                     {destination:?}); leaving {} null",
                    columns.route_distance
                );
                None
            }
        };

        if distance.is_some() {
            routed += 1;
        }
        table.set_cell(row, route_idx, distance.map(|km| km.to_string()));
        progress.inc(1);

        if (row + 1).checked_rem(request.checkpoint_interval) == Some(0) {
            checkpoint.write(&table)?;
        }
    }

    checkpoint.write(&table)?;

    log::info!(
        "Routed {routed}/{total} rentals to {feature} ({} left null)",
        total - routed
    );
    progress.finish(format!("{routed}/{total} routed to {feature}"));

    Ok(table)
}

async fn lookup(
    client: &dyn RoutingClient,
    origin: Coordinate,
    destination: Coordinate,
    mode: TravelMode,
) -> Option<f64> {
    match client.distance(origin, destination, mode).await {
        Ok(outcome @ RouteOutcome::Found { .. }) => outcome.kilometers(),
        Ok(RouteOutcome::NoRoute { status }) => {
            log::warn!("No route from {origin} to {destination}: {status}");
            None
        }
        Err(e) => {
            log::warn!("Route lookup from {origin} to {destination} failed: {e}");
            None
        }
    }
}

fn require_column(
    table: &RentalTable,
    feature: &str,
    column: &str,
) -> Result<usize, ProximityError> {
    table
        .column_index(column)
        .ok_or_else(|| ProximityError::MissingColumn {
            kind: feature.to_string(),
            column: column.to_string(),
        })
}

fn row_coordinate(
    table: &RentalTable,
    row: usize,
    (latitude, longitude): (usize, usize),
) -> Option<Coordinate> {
    let parse = |column| {
        table
            .cell_at(row, column)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };
    Some(Coordinate::new(parse(latitude)?, parse(longitude)?))
}
