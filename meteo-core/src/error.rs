use thiserror::Error;

use crate::model::{ForecastMode, Interval};

/// Every failure the core can raise while fetching and normalizing weather data.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Interval '{interval}' is not available in '{mode}' mode (allowed: {allowed})")]
    InvalidInterval {
        mode: ForecastMode,
        interval: Interval,
        allowed: String,
    },

    #[error("Unsupported weather provider '{0}'. Supported providers: open-meteo.")]
    UnsupportedProvider(String),

    #[error("Malformed weather data: {0}")]
    DataShape(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedResponseShape(String),

    #[error("Network failure after {attempts} attempt(s): {message}")]
    NetworkFailure { attempts: u32, message: String },

    #[error("Request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Coarse classification of a [`WeatherError`], for callers that introspect
/// a [`FetchFailed`] cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LocationNotFound,
    InvalidLocation,
    InvalidInterval,
    UnsupportedProvider,
    DataShape,
    UnexpectedResponseShape,
    NetworkFailure,
    Http,
    Decode,
}

impl WeatherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::LocationNotFound(_) => ErrorKind::LocationNotFound,
            WeatherError::InvalidLocation(_) => ErrorKind::InvalidLocation,
            WeatherError::InvalidInterval { .. } => ErrorKind::InvalidInterval,
            WeatherError::UnsupportedProvider(_) => ErrorKind::UnsupportedProvider,
            WeatherError::DataShape(_) => ErrorKind::DataShape,
            WeatherError::UnexpectedResponseShape(_) => ErrorKind::UnexpectedResponseShape,
            WeatherError::NetworkFailure { .. } => ErrorKind::NetworkFailure,
            WeatherError::Http { .. } => ErrorKind::Http,
            WeatherError::Decode(_) => ErrorKind::Decode,
        }
    }
}

/// The single user-facing error returned by the facade.
///
/// Wraps whatever went wrong underneath; `kind()` and `source()` expose the cause.
#[derive(Debug, Error)]
#[error("Failed to fetch weather: {source}")]
pub struct FetchFailed {
    #[source]
    source: WeatherError,
}

impl FetchFailed {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn cause(&self) -> &WeatherError {
        &self.source
    }

    pub fn into_cause(self) -> WeatherError {
        self.source
    }
}

impl From<WeatherError> for FetchFailed {
    fn from(source: WeatherError) -> Self {
        Self { source }
    }
}

pub type Result<T, E = WeatherError> = std::result::Result<T, E>;
