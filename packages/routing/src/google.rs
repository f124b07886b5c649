//! Google Maps Distance Matrix client.
//!
//! Sends a single origin and a single destination per request and reads
//! the one element of the returned matrix. The element's `status` is
//! `"OK"` when a route exists; anything else (`"ZERO_RESULTS"`,
//! `"NOT_FOUND"`) means no route for the pair.
//!
//! See <https://developers.google.com/maps/documentation/distance-matrix>

use async_trait::async_trait;
use rental_proximity_models::{Coordinate, TravelMode};

use crate::{RouteOutcome, RoutingClient, RoutingError, lat_lon_param};

/// Distance Matrix API client.
pub struct GoogleDistanceMatrix {
    client: reqwest::Client,
    id: String,
    base_url: String,
    api_key: String,
}

impl GoogleDistanceMatrix {
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

#[async_trait]
impl RoutingClient for GoogleDistanceMatrix {
    fn id(&self) -> &str {
        &self.id
    }

    async fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<RouteOutcome, RoutingError> {
        let url = format!("{}/distancematrix/json", self.base_url);
        let origins = lat_lon_param(origin);
        let destinations = lat_lon_param(destination);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("origins", origins.as_str()),
                ("destinations", destinations.as_str()),
                ("mode", mode.as_ref()),
                ("units", "metric"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RoutingError::RateLimited);
        }

        if !resp.status().is_success() {
            return Err(RoutingError::Parse {
                message: format!("Distance Matrix returned status {}", resp.status()),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses a Distance Matrix JSON response for a 1x1 request.
fn parse_response(body: &serde_json::Value) -> Result<RouteOutcome, RoutingError> {
    let top_status = body["status"].as_str().unwrap_or("");
    match top_status {
        "OK" => {}
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => return Err(RoutingError::RateLimited),
        other => {
            let detail = body["error_message"].as_str().unwrap_or("no error message");
            return Err(RoutingError::Parse {
                message: format!("Distance Matrix request status '{other}': {detail}"),
            });
        }
    }

    let element = &body["rows"][0]["elements"][0];
    let status = element["status"]
        .as_str()
        .ok_or_else(|| RoutingError::Parse {
            message: "Distance Matrix response missing rows[0].elements[0].status".to_string(),
        })?;

    if status != "OK" {
        return Ok(RouteOutcome::NoRoute {
            status: status.to_string(),
        });
    }

    let meters = element["distance"]["value"]
        .as_f64()
        .ok_or_else(|| RoutingError::Parse {
            message: "Distance Matrix element missing distance.value".to_string(),
        })?;

    Ok(RouteOutcome::Found { meters })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ok_element() {
        let body = serde_json::json!({
            "status": "OK",
            "origin_addresses": ["Flinders St, Melbourne VIC 3000, Australia"],
            "destination_addresses": ["Spencer St, Docklands VIC 3008, Australia"],
            "rows": [{
                "elements": [{
                    "status": "OK",
                    "distance": { "text": "1.6 km", "value": 1623 },
                    "duration": { "text": "6 mins", "value": 352 }
                }]
            }]
        });
        let outcome = parse_response(&body).unwrap();
        assert_eq!(outcome, RouteOutcome::Found { meters: 1623.0 });
        assert_eq!(outcome.kilometers(), Some(1.623));
    }

    #[test]
    fn element_without_route_is_no_route() {
        let body = serde_json::json!({
            "status": "OK",
            "rows": [{ "elements": [{ "status": "ZERO_RESULTS" }] }]
        });
        assert_eq!(
            parse_response(&body).unwrap(),
            RouteOutcome::NoRoute {
                status: "ZERO_RESULTS".to_string()
            }
        );
    }

    #[test]
    fn quota_status_is_rate_limited() {
        let body = serde_json::json!({ "status": "OVER_QUERY_LIMIT", "rows": [] });
        assert!(matches!(
            parse_response(&body),
            Err(RoutingError::RateLimited)
        ));
    }

    #[test]
    fn denied_request_is_parse_error_with_detail() {
        let body = serde_json::json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "rows": []
        });
        let err = parse_response(&body).unwrap_err();
        assert!(err.to_string().contains("API key is invalid"), "{err}");
    }

    #[test]
    fn missing_element_is_parse_error() {
        let body = serde_json::json!({ "status": "OK", "rows": [] });
        assert!(matches!(
            parse_response(&body),
            Err(RoutingError::Parse { .. })
        ));
    }
}
