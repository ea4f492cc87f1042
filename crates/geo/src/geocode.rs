//! # Address Geocoding
//!
//! Resolves a free-text address to a single lon/lat point. The pipeline only
//! sees the [`Geocoder`] trait, so tests can inject a deterministic closure in
//! place of the network provider.
//!
//! ## Table of Contents
//! 1. Geocoder — Capability trait
//! 2. StaticGeocoder — Lookup table
//! 3. NominatimGeocoder — OpenStreetMap Nominatim over HTTP
//! 4. Construction from config

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::{GeocoderConfig, GeocoderProvider};
use crate::coords::{lon_lat, Point};
use crate::error::{GridError, Result};

// ============================================================================
// 1. Geocoder — Capability trait
// ============================================================================

/// Address → best-match point.
///
/// `Ok(None)` means the provider answered but found nothing; transport and
/// protocol failures are [`GridError::ExternalService`].
pub trait Geocoder {
    fn geocode(&self, address: &str) -> Result<Option<Point>>;
}

impl<F> Geocoder for F
where
    F: Fn(&str) -> Option<Point>,
{
    fn geocode(&self, address: &str) -> Result<Option<Point>> {
        Ok(self(address))
    }
}

fn normalize(address: &str) -> String {
    address.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn require_address(address: &str) -> Result<()> {
    if address.trim().is_empty() {
        return Err(GridError::validation("address must not be empty"));
    }
    Ok(())
}

// ============================================================================
// 2. StaticGeocoder — Lookup table
// ============================================================================

/// Fixed address table; matching ignores case and repeated whitespace
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    places: HashMap<String, Point>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, address: &str, point: Point) -> Self {
        self.places.insert(normalize(address), point);
        self
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl Geocoder for StaticGeocoder {
    fn geocode(&self, address: &str) -> Result<Option<Point>> {
        require_address(address)?;
        Ok(self.places.get(&normalize(address)).copied())
    }
}

// ============================================================================
// 3. NominatimGeocoder — OpenStreetMap Nominatim over HTTP
// ============================================================================

/// Single-attempt blocking client for the Nominatim `/search` endpoint
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| GridError::ExternalService(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, address: &str) -> Result<Option<Point>> {
        require_address(address)?;
        let url = format!("{}/search", self.endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .map_err(|e| GridError::ExternalService(format!("request to {} failed: {}", url, e)))?
            .error_for_status()
            .map_err(|e| GridError::ExternalService(e.to_string()))?;

        let body = response
            .text()
            .map_err(|e| GridError::ExternalService(format!("unreadable response: {}", e)))?;
        parse_search_response(&body)
    }
}

/// First result of a Nominatim JSON search response
fn parse_search_response(body: &str) -> Result<Option<Point>> {
    let places: Vec<NominatimPlace> = serde_json::from_str(body)
        .map_err(|e| GridError::ExternalService(format!("malformed geocoder response: {}", e)))?;

    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };

    let parse = |value: &str, what: &str| {
        value.trim().parse::<f64>().map_err(|_| {
            GridError::ExternalService(format!("geocoder returned invalid {} '{}'", what, value))
        })
    };
    let point = lon_lat(parse(&place.lon, "longitude")?, parse(&place.lat, "latitude")?);

    tracing::debug!(
        "Nominatim match: {}",
        place.display_name.as_deref().unwrap_or("<unnamed>")
    );
    Ok(Some(point))
}

// ============================================================================
// 4. Construction from config
// ============================================================================

/// Build the provider selected in `[geocoder]`
pub fn from_config(config: &GeocoderConfig) -> Result<Box<dyn Geocoder>> {
    match config.provider {
        GeocoderProvider::Nominatim => Ok(Box::new(NominatimGeocoder::new(
            &config.endpoint,
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
        )?)),
        GeocoderProvider::Static => {
            let geocoder = config
                .places
                .iter()
                .fold(StaticGeocoder::new(), |g, (address, [lon, lat])| {
                    g.with_place(address, lon_lat(*lon, *lat))
                });
            Ok(Box::new(geocoder))
        }
    }
}
