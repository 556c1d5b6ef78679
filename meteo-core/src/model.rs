use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{Result, WeatherError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A location as typed by the user, optionally with resolved coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
    pub city: String,
    pub postal_code: String,
    pub coordinates: Option<Coordinates>,
}

impl Location {
    pub fn new(
        country: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            city: city.into(),
            postal_code: postal_code.into(),
            coordinates: None,
        }
    }

    /// Return a resolved copy carrying `coordinates`.
    pub fn with_coordinates(&self, coordinates: Coordinates) -> Self {
        Self {
            coordinates: Some(coordinates),
            ..self.clone()
        }
    }

    /// Country is required, plus at least one of city or postal code.
    pub fn validate(&self) -> Result<()> {
        if self.country.trim().is_empty() {
            return Err(WeatherError::InvalidLocation("country must not be empty".into()));
        }
        if self.city.trim().is_empty() && self.postal_code.trim().is_empty() {
            return Err(WeatherError::InvalidLocation(
                "either a city or a postal code is required".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "country: {:?}, city: {:?}, postal code: {:?}",
            self.country, self.city, self.postal_code
        )
    }
}

/// Which temporal frame is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastMode {
    Current,
    Past,
    Forecast,
}

/// Sampling resolution of the returned records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Current,
    Hourly,
    Daily,
}

const ALLOWED_INTERVALS: &[(ForecastMode, &[Interval])] = &[
    (ForecastMode::Current, &[Interval::Current]),
    (ForecastMode::Past, &[Interval::Daily, Interval::Hourly]),
    (ForecastMode::Forecast, &[Interval::Daily, Interval::Hourly]),
];

impl ForecastMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMode::Current => "current",
            ForecastMode::Past => "past",
            ForecastMode::Forecast => "forecast",
        }
    }

    pub const fn all() -> &'static [ForecastMode] {
        &[ForecastMode::Current, ForecastMode::Past, ForecastMode::Forecast]
    }

    pub fn allowed_intervals(&self) -> &'static [Interval] {
        ALLOWED_INTERVALS
            .iter()
            .find(|(mode, _)| mode == self)
            .map(|(_, intervals)| *intervals)
            .unwrap_or(&[])
    }

    pub fn allows(&self, interval: Interval) -> bool {
        self.allowed_intervals().contains(&interval)
    }

    /// Reject `interval` unless it belongs to this mode's allowed set.
    pub fn validate_interval(&self, interval: Interval) -> Result<()> {
        if self.allows(interval) {
            return Ok(());
        }
        let allowed = self
            .allowed_intervals()
            .iter()
            .map(Interval::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        Err(WeatherError::InvalidInterval { mode: *self, interval, allowed })
    }
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Current => "current",
            Interval::Hourly => "hourly",
            Interval::Daily => "daily",
        }
    }

    pub const fn all() -> &'static [Interval] {
        &[Interval::Current, Interval::Hourly, Interval::Daily]
    }
}

impl fmt::Display for ForecastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecastMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "current" | "now" => Ok(ForecastMode::Current),
            "past" => Ok(ForecastMode::Past),
            "forecast" => Ok(ForecastMode::Forecast),
            _ => Err(format!("Unknown mode '{value}'. Expected one of: current, past, forecast.")),
        }
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "current" => Ok(Interval::Current),
            "hourly" | "hours" => Ok(Interval::Hourly),
            "daily" | "days" => Ok(Interval::Daily),
            _ => Err(format!("Unknown interval '{value}'. Expected one of: current, hourly, daily.")),
        }
    }
}
