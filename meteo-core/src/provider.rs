use crate::{
    Config,
    error::{Result, WeatherError},
    model::{Coordinates, ForecastMode, Interval},
    provider::open_meteo::OpenMeteoClient,
    session::{CachedSession, QueryParams},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod open_meteo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenMeteo,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenMeteo => "open-meteo",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenMeteo]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = WeatherError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "open-meteo" | "openmeteo" => Ok(ProviderId::OpenMeteo),
            _ => Err(WeatherError::UnsupportedProvider(value.to_string())),
        }
    }
}

/// Raw provider answer together with the parameters that produced it.
///
/// The normalizer needs both: the parameters say which granularity was
/// requested and in which order the variables come back.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub params: QueryParams,
    pub body: serde_json::Value,
}

#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// Provider-specific query parameters for one fetch.
    ///
    /// `span` is in days for daily data, in hours for hourly data and ignored
    /// for current conditions.
    fn build_params(
        &self,
        coordinates: Coordinates,
        mode: ForecastMode,
        interval: Interval,
        span: u32,
    ) -> Result<QueryParams>;

    async fn fetch(
        &self,
        coordinates: Coordinates,
        mode: ForecastMode,
        interval: Interval,
        span: u32,
    ) -> Result<RawResponse>;
}

/// Construct the client named by `config.provider`.
pub fn client_from_config(
    config: &Config,
    session: Arc<CachedSession>,
) -> Result<Box<dyn WeatherClient>> {
    let id = ProviderId::try_from(config.provider.as_str())?;
    client_for(id, config, session)
}

pub fn client_for(
    id: ProviderId,
    config: &Config,
    session: Arc<CachedSession>,
) -> Result<Box<dyn WeatherClient>> {
    config.variables.validate()?;

    let boxed: Box<dyn WeatherClient> = match id {
        ProviderId::OpenMeteo => Box::new(OpenMeteoClient::new(
            session,
            config.forecast_url.clone(),
            config.timezone.clone(),
            config.variables.clone(),
        )),
    };

    Ok(boxed)
}
