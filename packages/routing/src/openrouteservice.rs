//! `OpenRouteService` directions client.
//!
//! Posts a two-point coordinate list to `/v2/directions/{profile}` and
//! reads the length of the first returned route. Coordinates go over the
//! wire longitude first.
//!
//! See <https://openrouteservice.org/dev/#/api-docs/v2/directions>

use async_trait::async_trait;
use rental_proximity_models::{Coordinate, TravelMode};

use crate::{RouteOutcome, RoutingClient, RoutingError};

/// Directions API client.
pub struct OpenRouteService {
    client: reqwest::Client,
    id: String,
    base_url: String,
    api_key: String,
}

impl OpenRouteService {
    #[must_use]
    pub fn new(client: reqwest::Client, id: &str, base_url: &str, api_key: String) -> Self {
        Self {
            client,
            id: id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

/// Maps a travel mode to an `OpenRouteService` routing profile.
#[must_use]
pub const fn profile(mode: TravelMode) -> &'static str {
    match mode {
        TravelMode::Driving => "driving-car",
        TravelMode::Walking => "foot-walking",
        TravelMode::Bicycling => "cycling-regular",
    }
}

#[async_trait]
impl RoutingClient for OpenRouteService {
    fn id(&self) -> &str {
        &self.id
    }

    async fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<RouteOutcome, RoutingError> {
        let url = format!("{}/v2/directions/{}", self.base_url, profile(mode));
        let payload = request_body(origin, destination);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RoutingError::RateLimited);
        }

        // Unroutable points come back as 404 with an error body.
        if status == reqwest::StatusCode::NOT_FOUND {
            let body: serde_json::Value = resp.json().await?;
            return Ok(RouteOutcome::NoRoute {
                status: error_message(&body).unwrap_or_else(|| status.to_string()),
            });
        }

        if !status.is_success() {
            return Err(RoutingError::Parse {
                message: format!("OpenRouteService returned status {status}"),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

fn request_body(origin: Coordinate, destination: Coordinate) -> serde_json::Value {
    serde_json::json!({
        "coordinates": [
            [origin.longitude, origin.latitude],
            [destination.longitude, destination.latitude]
        ]
    })
}

fn error_message(body: &serde_json::Value) -> Option<String> {
    let error = body.get("error")?;
    error
        .get("message")
        .and_then(serde_json::Value::as_str)
        .or_else(|| error.as_str())
        .map(String::from)
}

/// Parses a directions JSON response.
fn parse_response(body: &serde_json::Value) -> Result<RouteOutcome, RoutingError> {
    if let Some(message) = error_message(body) {
        return Ok(RouteOutcome::NoRoute { status: message });
    }

    let routes = body
        .get("routes")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| RoutingError::Parse {
            message: "OpenRouteService response missing 'routes' array".to_string(),
        })?;

    let Some(first) = routes.first() else {
        return Ok(RouteOutcome::NoRoute {
            status: "NO_ROUTE".to_string(),
        });
    };

    let summary = first.get("summary").ok_or_else(|| RoutingError::Parse {
        message: "OpenRouteService route missing 'summary'".to_string(),
    })?;

    // The summary omits `distance` for zero-length routes.
    let meters = summary
        .get("distance")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0);

    Ok(RouteOutcome::Found { meters })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_puts_longitude_first() {
        let body = request_body(
            Coordinate::new(-37.8136, 144.9631),
            Coordinate::new(-37.8172, 144.9514),
        );
        assert_eq!(
            body,
            serde_json::json!({
                "coordinates": [[144.9631, -37.8136], [144.9514, -37.8172]]
            })
        );
    }

    #[test]
    fn parses_route_summary() {
        let body = serde_json::json!({
            "routes": [{
                "summary": { "distance": 1832.4, "duration": 301.2 },
                "segments": []
            }]
        });
        assert_eq!(
            parse_response(&body).unwrap(),
            RouteOutcome::Found { meters: 1832.4 }
        );
    }

    #[test]
    fn empty_summary_is_zero_length_route() {
        let body = serde_json::json!({ "routes": [{ "summary": {} }] });
        assert_eq!(
            parse_response(&body).unwrap(),
            RouteOutcome::Found { meters: 0.0 }
        );
    }

    #[test]
    fn no_routes_is_no_route() {
        let body = serde_json::json!({ "routes": [] });
        assert!(matches!(
            parse_response(&body).unwrap(),
            RouteOutcome::NoRoute { .. }
        ));
    }

    #[test]
    fn error_body_is_no_route_with_message() {
        let body = serde_json::json!({
            "error": {
                "code": 2010,
                "message": "Could not find routable point within a radius of 350.0 meters"
            }
        });
        let RouteOutcome::NoRoute { status } = parse_response(&body).unwrap() else {
            panic!("expected NoRoute");
        };
        assert!(status.contains("routable point"));
    }

    #[test]
    fn missing_routes_is_parse_error() {
        let body = serde_json::json!({ "type": "FeatureCollection" });
        assert!(matches!(
            parse_response(&body),
            Err(RoutingError::Parse { .. })
        ));
    }

    #[test]
    fn profiles_match_modes() {
        assert_eq!(profile(TravelMode::Driving), "driving-car");
        assert_eq!(profile(TravelMode::Walking), "foot-walking");
        assert_eq!(profile(TravelMode::Bicycling), "cycling-regular");
    }
}
