//! Per-timestamp weather record and the mapping from backend variable names
//! onto its fields.
//!
//! Current and hourly responses fill the instantaneous fields, daily responses
//! fill the aggregates. `weather_code` is shared by all three.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{Result, WeatherError},
    model::Interval,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherRecord {
    pub timestamp: DateTime<Utc>,

    pub weather_code: Option<f64>,

    // Instantaneous values (current and hourly).
    pub temperature_2m: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub precipitation: Option<f64>,
    pub rain: Option<f64>,
    pub showers: Option<f64>,
    pub snowfall: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub cloud_cover_low: Option<f64>,
    pub cloud_cover_mid: Option<f64>,
    pub cloud_cover_high: Option<f64>,
    pub visibility: Option<f64>,
    pub wind_speed_10m: Option<f64>,
    pub wind_direction_10m: Option<f64>,
    pub wind_gusts_10m: Option<f64>,

    // Daily aggregates.
    pub temperature_2m_max: Option<f64>,
    pub temperature_2m_min: Option<f64>,
    pub temperature_2m_mean: Option<f64>,
    pub apparent_temperature_max: Option<f64>,
    pub apparent_temperature_min: Option<f64>,
    pub apparent_temperature_mean: Option<f64>,
    pub rain_sum: Option<f64>,
    pub showers_sum: Option<f64>,
    pub snowfall_sum: Option<f64>,
    pub wind_speed_10m_max: Option<f64>,
    pub wind_speed_10m_min: Option<f64>,
    pub wind_speed_10m_mean: Option<f64>,
    pub wind_direction_10m_dominant: Option<f64>,
    pub wind_gusts_10m_max: Option<f64>,
    pub wind_gusts_10m_min: Option<f64>,
    pub wind_gusts_10m_mean: Option<f64>,
    pub visibility_max: Option<f64>,
    pub visibility_min: Option<f64>,
    pub visibility_mean: Option<f64>,
    pub cloud_cover_max: Option<f64>,
    pub cloud_cover_min: Option<f64>,
    pub cloud_cover_mean: Option<f64>,
    pub relative_humidity_2m_max: Option<f64>,
    pub relative_humidity_2m_min: Option<f64>,
    pub relative_humidity_2m_mean: Option<f64>,
}

pub const COLUMN_COUNT: usize = 41;

/// Column names in table order; matches [`WeatherRecord::values`].
pub const COLUMNS: [&str; COLUMN_COUNT] = [
    "weather_code",
    "temperature_2m",
    "apparent_temperature",
    "relative_humidity_2m",
    "precipitation",
    "rain",
    "showers",
    "snowfall",
    "cloud_cover",
    "cloud_cover_low",
    "cloud_cover_mid",
    "cloud_cover_high",
    "visibility",
    "wind_speed_10m",
    "wind_direction_10m",
    "wind_gusts_10m",
    "temperature_2m_max",
    "temperature_2m_min",
    "temperature_2m_mean",
    "apparent_temperature_max",
    "apparent_temperature_min",
    "apparent_temperature_mean",
    "rain_sum",
    "showers_sum",
    "snowfall_sum",
    "wind_speed_10m_max",
    "wind_speed_10m_min",
    "wind_speed_10m_mean",
    "wind_direction_10m_dominant",
    "wind_gusts_10m_max",
    "wind_gusts_10m_min",
    "wind_gusts_10m_mean",
    "visibility_max",
    "visibility_min",
    "visibility_mean",
    "cloud_cover_max",
    "cloud_cover_min",
    "cloud_cover_mean",
    "relative_humidity_2m_max",
    "relative_humidity_2m_min",
    "relative_humidity_2m_mean",
];

impl WeatherRecord {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, ..Self::default() }
    }

    /// Store `value` in the field that backend variable `name` maps to.
    pub fn set(&mut self, interval: Interval, name: &str, value: Option<f64>) -> Result<()> {
        let field = slot(self, interval, name).ok_or_else(|| unmapped(interval, name))?;
        *field = value;
        Ok(())
    }

    pub fn values(&self) -> [Option<f64>; COLUMN_COUNT] {
        [
            self.weather_code,
            self.temperature_2m,
            self.apparent_temperature,
            self.relative_humidity_2m,
            self.precipitation,
            self.rain,
            self.showers,
            self.snowfall,
            self.cloud_cover,
            self.cloud_cover_low,
            self.cloud_cover_mid,
            self.cloud_cover_high,
            self.visibility,
            self.wind_speed_10m,
            self.wind_direction_10m,
            self.wind_gusts_10m,
            self.temperature_2m_max,
            self.temperature_2m_min,
            self.temperature_2m_mean,
            self.apparent_temperature_max,
            self.apparent_temperature_min,
            self.apparent_temperature_mean,
            self.rain_sum,
            self.showers_sum,
            self.snowfall_sum,
            self.wind_speed_10m_max,
            self.wind_speed_10m_min,
            self.wind_speed_10m_mean,
            self.wind_direction_10m_dominant,
            self.wind_gusts_10m_max,
            self.wind_gusts_10m_min,
            self.wind_gusts_10m_mean,
            self.visibility_max,
            self.visibility_min,
            self.visibility_mean,
            self.cloud_cover_max,
            self.cloud_cover_min,
            self.cloud_cover_mean,
            self.relative_humidity_2m_max,
            self.relative_humidity_2m_min,
            self.relative_humidity_2m_mean,
        ]
    }
}

/// Fails with `DataShape` if `name` has no destination field for `interval`.
pub fn ensure_mapped(interval: Interval, name: &str) -> Result<()> {
    let mut probe = WeatherRecord::default();
    match slot(&mut probe, interval, name) {
        Some(_) => Ok(()),
        None => Err(unmapped(interval, name)),
    }
}

fn unmapped(interval: Interval, name: &str) -> WeatherError {
    WeatherError::DataShape(format!("{interval} variable '{name}' has no destination field"))
}

fn slot<'a>(r: &'a mut WeatherRecord, interval: Interval, name: &str) -> Option<&'a mut Option<f64>> {
    match interval {
        Interval::Current | Interval::Hourly => instant_slot(r, name),
        Interval::Daily => daily_slot(r, name),
    }
}

fn instant_slot<'a>(r: &'a mut WeatherRecord, name: &str) -> Option<&'a mut Option<f64>> {
    let field = match name {
        "weather_code" => &mut r.weather_code,
        "temperature_2m" => &mut r.temperature_2m,
        "apparent_temperature" => &mut r.apparent_temperature,
        "relative_humidity_2m" => &mut r.relative_humidity_2m,
        "precipitation" => &mut r.precipitation,
        "rain" => &mut r.rain,
        "showers" => &mut r.showers,
        "snowfall" => &mut r.snowfall,
        "cloud_cover" => &mut r.cloud_cover,
        "cloud_cover_low" => &mut r.cloud_cover_low,
        "cloud_cover_mid" => &mut r.cloud_cover_mid,
        "cloud_cover_high" => &mut r.cloud_cover_high,
        "visibility" => &mut r.visibility,
        "wind_speed_10m" => &mut r.wind_speed_10m,
        "wind_direction_10m" => &mut r.wind_direction_10m,
        "wind_gusts_10m" => &mut r.wind_gusts_10m,
        _ => return None,
    };
    Some(field)
}

fn daily_slot<'a>(r: &'a mut WeatherRecord, name: &str) -> Option<&'a mut Option<f64>> {
    let field = match name {
        "weather_code" => &mut r.weather_code,
        "temperature_2m_max" => &mut r.temperature_2m_max,
        "temperature_2m_min" => &mut r.temperature_2m_min,
        "temperature_2m_mean" => &mut r.temperature_2m_mean,
        "apparent_temperature_max" => &mut r.apparent_temperature_max,
        "apparent_temperature_min" => &mut r.apparent_temperature_min,
        "apparent_temperature_mean" => &mut r.apparent_temperature_mean,
        "rain_sum" => &mut r.rain_sum,
        "showers_sum" => &mut r.showers_sum,
        "snowfall_sum" => &mut r.snowfall_sum,
        "wind_speed_10m_max" => &mut r.wind_speed_10m_max,
        "wind_speed_10m_min" => &mut r.wind_speed_10m_min,
        "wind_speed_10m_mean" => &mut r.wind_speed_10m_mean,
        "wind_direction_10m_dominant" => &mut r.wind_direction_10m_dominant,
        "wind_gusts_10m_max" => &mut r.wind_gusts_10m_max,
        "wind_gusts_10m_min" => &mut r.wind_gusts_10m_min,
        "wind_gusts_10m_mean" => &mut r.wind_gusts_10m_mean,
        "visibility_max" => &mut r.visibility_max,
        "visibility_min" => &mut r.visibility_min,
        "visibility_mean" => &mut r.visibility_mean,
        "cloud_cover_max" => &mut r.cloud_cover_max,
        "cloud_cover_min" => &mut r.cloud_cover_min,
        "cloud_cover_mean" => &mut r.cloud_cover_mean,
        "relative_humidity_2m_max" => &mut r.relative_humidity_2m_max,
        "relative_humidity_2m_min" => &mut r.relative_humidity_2m_min,
        "relative_humidity_2m_mean" => &mut r.relative_humidity_2m_mean,
        _ => return None,
    };
    Some(field)
}
