//! Forward geocoding: free-text location to coordinates.
//! Talks to a Nominatim-compatible search endpoint (OpenStreetMap).

use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{Result, WeatherError},
    model::{Coordinates, Location},
    session::{CachedSession, HttpRequest, QueryParams},
};

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

/// Build the search string: non-empty parts of city, postal code and country,
/// in that order, separated by ", ".
pub fn geocode_query(location: &Location) -> String {
    [&location.city, &location.postal_code, &location.country]
        .into_iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    session: Arc<CachedSession>,
    search_url: String,
}

impl Geocoder {
    pub fn new(session: Arc<CachedSession>, search_url: impl Into<String>) -> Self {
        Self { session, search_url: search_url.into() }
    }

    /// Resolve `location`; the first match is authoritative.
    pub async fn resolve(&self, location: &Location) -> Result<Coordinates> {
        let query = geocode_query(location);

        let mut params = QueryParams::new();
        params.push("q", &query);
        params.push("format", "json");
        params.push("limit", 1);

        let response = self
            .session
            .execute(&HttpRequest::get(&self.search_url, params))
            .await?
            .error_for_status()?;

        let places: Vec<NominatimPlace> = serde_json::from_str(&response.body)?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::LocationNotFound(query.clone()))?;

        let coordinates = Coordinates {
            latitude: parse_degrees(&place.lat, "lat")?,
            longitude: parse_degrees(&place.lon, "lon")?,
        };

        tracing::info!(
            "Geocoded '{}' to {:.4}, {:.4} ({})",
            query,
            coordinates.latitude,
            coordinates.longitude,
            place.display_name.as_deref().unwrap_or("unnamed place")
        );
        Ok(coordinates)
    }
}

fn parse_degrees(raw: &str, field: &str) -> Result<f64> {
    raw.trim().parse::<f64>().map_err(|_| {
        WeatherError::UnexpectedResponseShape(format!("geocoder returned non-numeric {field}: {raw:?}"))
    })
}
