use std::sync::Arc;

use crate::{
    Config,
    config::VariableSets,
    error::{FetchFailed, Result},
    geocode::Geocoder,
    model::{ForecastMode, Interval, Location},
    normalize::normalize_table,
    provider::{WeatherClient, client_from_config},
    session::CachedSession,
    table::WeatherTable,
};

/// Entry point for the presentation layer: location in, weather table out.
#[derive(Debug)]
pub struct WeatherFacade {
    geocoder: Geocoder,
    client: Box<dyn WeatherClient>,
    variables: VariableSets,
}

impl WeatherFacade {
    /// Wire a session, geocoder and provider client from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;

        let session = Arc::new(CachedSession::from_config(config)?);
        let geocoder = Geocoder::new(Arc::clone(&session), config.geocoding_url.clone());
        let client = client_from_config(config, session)?;

        Ok(Self::with_parts(geocoder, client, config.variables.clone()))
    }

    pub fn with_parts(
        geocoder: Geocoder,
        client: Box<dyn WeatherClient>,
        variables: VariableSets,
    ) -> Self {
        Self { geocoder, client, variables }
    }

    /// Return `location` with coordinates attached, geocoding it if needed.
    pub async fn resolve_location(&self, location: &Location) -> Result<Location, FetchFailed> {
        location.validate()?;
        if location.coordinates.is_some() {
            return Ok(location.clone());
        }
        let coordinates = self.geocoder.resolve(location).await?;
        Ok(location.with_coordinates(coordinates))
    }

    /// Fetch and normalize weather for `location`.
    ///
    /// Location fields and the mode/interval pair are checked before any
    /// network call. Coordinates already present on `location` are reused.
    /// Every failure comes back as a single [`FetchFailed`].
    pub async fn get_weather(
        &self,
        location: &Location,
        mode: ForecastMode,
        interval: Interval,
        span: u32,
    ) -> Result<WeatherTable, FetchFailed> {
        self.fetch(location, mode, interval, span).await.map_err(|e| {
            tracing::warn!("Weather fetch failed: {}", e);
            FetchFailed::from(e)
        })
    }

    async fn fetch(
        &self,
        location: &Location,
        mode: ForecastMode,
        interval: Interval,
        span: u32,
    ) -> Result<WeatherTable> {
        location.validate()?;
        mode.validate_interval(interval)?;

        let coordinates = match location.coordinates {
            Some(c) => c,
            None => self.geocoder.resolve(location).await?,
        };

        let raw = self.client.fetch(coordinates, mode, interval, span).await?;
        let table = normalize_table(&raw, &self.variables)?;

        tracing::info!(
            provider = %self.client.id(),
            "Fetched {} {} rows ({} columns) for {:.4}, {:.4}",
            table.len(),
            interval,
            table.columns.len(),
            coordinates.latitude,
            coordinates.longitude
        );
        Ok(table)
    }
}
