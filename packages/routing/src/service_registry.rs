//! Compile-time registry of routing service configurations.
//!
//! Each routing provider is defined in a TOML file under `services/`.
//! The registry embeds these at compile time and exposes them via
//! [`all_services`], [`enabled_services`] and [`find_service`].

use serde::Deserialize;

/// A routing service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingService {
    /// Unique identifier (e.g., `"google_maps"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may be picked by default.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Preference order; lower values are picked first.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Google Maps Distance Matrix API.
    GoogleDistanceMatrix {
        /// API base URL (e.g., `"https://maps.googleapis.com/maps/api"`).
        base_url: String,
        /// Environment variable holding the API key.
        api_key_env: String,
        /// Per-request timeout in seconds.
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// `OpenRouteService` directions API.
    OpenRouteService {
        /// API base URL (e.g., `"https://api.openrouteservice.org"`).
        base_url: String,
        /// Environment variable holding the API key.
        api_key_env: String,
        /// Per-request timeout in seconds.
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_secs() -> u64 {
    30
}

impl RoutingService {
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::GoogleDistanceMatrix { base_url, .. }
            | ProviderConfig::OpenRouteService { base_url, .. } => base_url,
        }
    }

    #[must_use]
    pub fn api_key_env(&self) -> &str {
        match &self.provider {
            ProviderConfig::GoogleDistanceMatrix { api_key_env, .. }
            | ProviderConfig::OpenRouteService { api_key_env, .. } => api_key_env,
        }
    }

    #[must_use]
    pub const fn timeout_secs(&self) -> u64 {
        match &self.provider {
            ProviderConfig::GoogleDistanceMatrix { timeout_secs, .. }
            | ProviderConfig::OpenRouteService { timeout_secs, .. } => *timeout_secs,
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("google_maps", include_str!("../services/google_maps.toml")),
    (
        "openrouteservice",
        include_str!("../services/openrouteservice.toml"),
    ),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all routing service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<RoutingService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse routing service '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
#[must_use]
pub fn enabled_services() -> Vec<RoutingService> {
    let mut services: Vec<RoutingService> =
        all_services().into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    services
}

/// Looks up a service by id, or the highest-priority enabled service
/// when `id` is `None`.
#[must_use]
pub fn find_service(id: Option<&str>) -> Option<RoutingService> {
    match id {
        Some(id) => all_services().into_iter().find(|s| s.id == id),
        None => enabled_services().into_iter().next(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_services() {
        let services = all_services();
        assert_eq!(services.len(), EXPECTED_SERVICE_COUNT);
    }

    #[test]
    fn service_ids_are_unique() {
        let services = all_services();
        let mut seen = BTreeSet::new();
        for svc in &services {
            assert!(seen.insert(&svc.id), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn all_services_have_required_fields() {
        for svc in &all_services() {
            assert!(!svc.id.is_empty(), "Service has empty id");
            assert!(!svc.name.is_empty(), "Service {} has empty name", svc.id);
            assert!(
                !svc.base_url().is_empty(),
                "Service {} has empty base_url",
                svc.id
            );
            assert!(
                !svc.api_key_env().is_empty(),
                "Service {} has empty api_key_env",
                svc.id
            );
            assert!(svc.timeout_secs() > 0, "Service {} has zero timeout", svc.id);
        }
    }

    #[test]
    fn enabled_services_sorted_by_priority() {
        let services = enabled_services();
        for window in services.windows(2) {
            assert!(
                window[0].priority <= window[1].priority,
                "Services not sorted by priority: {} ({}) > {} ({})",
                window[0].id,
                window[0].priority,
                window[1].id,
                window[1].priority
            );
        }
    }

    #[test]
    fn default_service_is_google() {
        let service = find_service(None).unwrap();
        assert_eq!(service.id, "google_maps");
        assert!(find_service(Some("openrouteservice")).is_some());
        assert!(find_service(Some("carrier_pigeon")).is_none());
    }
}
