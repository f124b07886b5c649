#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Travel-distance lookups for rental/amenity pairs.
//!
//! Straight-line distance underestimates how far a rental really is from
//! a station or school. This crate asks an external routing service for
//! the travel distance of a single origin/destination pair:
//!
//! 1. **Google Maps Distance Matrix** ([`google`]): one origin, one
//!    destination per request, API key in the query string.
//! 2. **`OpenRouteService`** ([`openrouteservice`]): directions endpoint,
//!    API key in the `Authorization` header.
//!
//! Services are configured via TOML files in `services/` (see
//! [`service_registry`]). No request is retried: callers decide what a
//! failed lookup means.

pub mod google;
pub mod openrouteservice;
pub mod service_registry;

use std::time::Duration;

use async_trait::async_trait;
use rental_proximity_models::{Coordinate, TravelMode};
use thiserror::Error;

use crate::service_registry::{ProviderConfig, RoutingService};

/// The answer to a single distance lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// The service found a route of this length.
    Found {
        /// Route length in meters.
        meters: f64,
    },
    /// The service answered but had no route for the pair.
    NoRoute {
        /// The service's status or error text.
        status: String,
    },
}

impl RouteOutcome {
    /// Route length in kilometers, if a route was found.
    #[must_use]
    pub fn kilometers(&self) -> Option<f64> {
        match self {
            Self::Found { meters } => Some(meters / 1000.0),
            Self::NoRoute { .. } => None,
        }
    }
}

/// Errors from routing lookups.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// HTTP request failed (connection, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit or quota exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The service is misconfigured (e.g. API key not set).
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is missing.
        message: String,
    },
}

/// A service that can measure the travel distance between two points.
#[async_trait]
pub trait RoutingClient: Send + Sync {
    /// Returns a short identifier for log lines (e.g. `"google_maps"`).
    fn id(&self) -> &str;

    /// Looks up the travel distance from `origin` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError`] on transport failures, unparseable
    /// responses, or rate limiting. A well-formed "no route" answer is
    /// `Ok(RouteOutcome::NoRoute { .. })`, not an error.
    async fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<RouteOutcome, RoutingError>;
}

/// Builds the client described by `service`, reading its API key from
/// the environment.
///
/// # Errors
///
/// Returns [`RoutingError::Config`] if the API key variable is unset or
/// empty, or [`RoutingError::Http`] if the HTTP client cannot be built.
pub fn client_from_service(
    service: &RoutingService,
) -> Result<Box<dyn RoutingClient>, RoutingError> {
    let api_key = api_key_from_env(service)?;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(service.timeout_secs()))
        .build()?;

    log::info!(
        "Using routing service {} ({}, timeout {}s)",
        service.id,
        service.base_url(),
        service.timeout_secs()
    );

    Ok(match &service.provider {
        ProviderConfig::GoogleDistanceMatrix { base_url, .. } => Box::new(
            google::GoogleDistanceMatrix::new(http, &service.id, base_url, api_key),
        ),
        ProviderConfig::OpenRouteService { base_url, .. } => Box::new(
            openrouteservice::OpenRouteService::new(http, &service.id, base_url, api_key),
        ),
    })
}

fn api_key_from_env(service: &RoutingService) -> Result<String, RoutingError> {
    let var = service.api_key_env();
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(RoutingError::Config {
            message: format!(
                "{var} is not set (required by routing service '{}')",
                service.id
            ),
        }),
    }
}

/// Formats a coordinate as `"lat,lon"`.
pub(crate) fn lat_lon_param(coordinate: Coordinate) -> String {
    format!("{},{}", coordinate.latitude, coordinate.longitude)
}
