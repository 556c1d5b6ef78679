use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{model::Interval, record};

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_GEOCODING_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Caching and retry policy for outbound HTTP calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// File stem of the cache file inside the cache directory.
    pub name: String,
    /// Overrides the platform cache directory.
    pub dir: Option<PathBuf>,
    pub ttl_secs: u64,
    pub retries: u32,
    /// Base delay in seconds; doubles with every retry.
    pub backoff_factor: f64,
    pub max_backoff_secs: f64,
    /// Per-attempt timeout.
    pub timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "http-cache".to_string(),
            dir: None,
            ttl_secs: 3600,
            retries: 5,
            backoff_factor: 0.2,
            max_backoff_secs: 30.0,
            timeout_secs: 10,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Location pre-filled when the user does not type one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultLocation {
    pub country: String,
    pub city: String,
    pub postal_code: String,
}

impl Default for DefaultLocation {
    fn default() -> Self {
        Self {
            country: "Germany".to_string(),
            city: "Saarbrücken".to_string(),
            postal_code: "66111".to_string(),
        }
    }
}

/// Ordered variable lists requested per granularity.
///
/// The weather backend answers with parallel arrays in exactly this order, so
/// the same lists drive both the request and the normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableSets {
    pub current: Vec<String>,
    pub hourly: Vec<String>,
    pub daily: Vec<String>,
}

const CURRENT_VARIABLES: &[&str] = &[
    "temperature_2m",
    "apparent_temperature",
    "relative_humidity_2m",
    "precipitation",
    "rain",
    "showers",
    "snowfall",
    "weather_code",
    "wind_speed_10m",
    "wind_direction_10m",
    "wind_gusts_10m",
];

const HOURLY_VARIABLES: &[&str] = &[
    "temperature_2m",
    "weather_code",
    "apparent_temperature",
    "relative_humidity_2m",
    "snowfall",
    "showers",
    "rain",
    "cloud_cover_low",
    "cloud_cover_mid",
    "cloud_cover_high",
    "cloud_cover",
    "visibility",
    "wind_speed_10m",
    "wind_direction_10m",
    "wind_gusts_10m",
];

const DAILY_VARIABLES: &[&str] = &[
    "temperature_2m_max",
    "temperature_2m_min",
    "weather_code",
    "apparent_temperature_max",
    "apparent_temperature_min",
    "apparent_temperature_mean",
    "temperature_2m_mean",
    "rain_sum",
    "showers_sum",
    "snowfall_sum",
    "wind_speed_10m_max",
    "wind_direction_10m_dominant",
    "visibility_max",
    "visibility_min",
    "visibility_mean",
    "wind_speed_10m_mean",
    "wind_speed_10m_min",
    "wind_gusts_10m_min",
    "wind_gusts_10m_max",
    "wind_gusts_10m_mean",
    "relative_humidity_2m_min",
    "relative_humidity_2m_max",
    "relative_humidity_2m_mean",
    "cloud_cover_mean",
    "cloud_cover_max",
    "cloud_cover_min",
];

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for VariableSets {
    fn default() -> Self {
        Self {
            current: owned(CURRENT_VARIABLES),
            hourly: owned(HOURLY_VARIABLES),
            daily: owned(DAILY_VARIABLES),
        }
    }
}

impl VariableSets {
    pub fn for_interval(&self, interval: Interval) -> &[String] {
        match interval {
            Interval::Current => &self.current,
            Interval::Hourly => &self.hourly,
            Interval::Daily => &self.daily,
        }
    }

    /// Every configured name must have a destination field for its granularity.
    pub fn validate(&self) -> crate::Result<()> {
        for interval in Interval::all() {
            let names = self.for_interval(*interval);
            if names.is_empty() {
                return Err(crate::WeatherError::DataShape(format!(
                    "no {interval} variables configured"
                )));
            }
            for name in names {
                record::ensure_mapped(*interval, name)?;
            }
        }
        Ok(())
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// User agent sent to the geocoding backend.
    pub agent_name: String,

    /// Weather data provider, e.g. "open-meteo".
    pub provider: String,

    /// IANA zone name or "auto".
    pub timezone: String,

    pub forecast_url: String,
    pub geocoding_url: String,

    pub cache: CacheConfig,

    /// Example TOML:
    /// [defaults]
    /// country = "Germany"
    /// city = "Berlin"
    pub defaults: DefaultLocation,

    pub variables: VariableSets,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent_name: concat!("meteo/", env!("CARGO_PKG_VERSION")).to_string(),
            provider: "open-meteo".to_string(),
            timezone: "auto".to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            cache: CacheConfig::default(),
            defaults: DefaultLocation::default(),
            variables: VariableSets::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "meteo", "meteo")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory holding the HTTP cache file.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.cache_dir().to_path_buf()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.cache.backoff_factor >= 0.0 && self.cache.backoff_factor.is_finite()) {
            bail!("cache.backoff_factor must be a non-negative number");
        }
        if !(self.cache.max_backoff_secs >= 0.0 && self.cache.max_backoff_secs.is_finite()) {
            bail!("cache.max_backoff_secs must be a non-negative number");
        }
        if self.cache.timeout_secs == 0 {
            bail!("cache.timeout_secs must be greater than zero");
        }
        if self.cache.name.trim().is_empty() {
            bail!("cache.name must not be empty");
        }
        self.variables.validate().context("Invalid [variables] section")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let cfg = Config::default();

        assert_eq!(cfg.cache.ttl(), Duration::from_secs(3600));
        assert_eq!(cfg.cache.retries, 5);
        assert_eq!(cfg.cache.backoff_factor, 0.2);
        assert_eq!(cfg.timezone, "auto");
        assert_eq!(cfg.variables.daily.len(), 26);
        assert_eq!(cfg.variables.hourly.len(), 15);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            timezone = "Europe/Berlin"

            [cache]
            ttl_secs = 60

            [defaults]
            city = "Berlin"
            "#,
        )
        .expect("partial config must parse");

        assert_eq!(cfg.timezone, "Europe/Berlin");
        assert_eq!(cfg.cache.ttl_secs, 60);
        assert_eq!(cfg.cache.retries, 5);
        assert_eq!(cfg.defaults.city, "Berlin");
        assert_eq!(cfg.defaults.country, "Germany");
        assert_eq!(cfg.variables, VariableSets::default());
    }

    #[test]
    fn unknown_variable_is_rejected() {
        let err = Config::from_toml_str(
            r#"
            [variables]
            hourly = ["temperature_2m", "uv_index"]
            "#,
        )
        .unwrap_err();

        let msg = format!("{err:#}");
        assert!(msg.contains("Invalid [variables] section"));
        assert!(msg.contains("uv_index"));
    }

    #[test]
    fn negative_backoff_is_rejected() {
        let err = Config::from_toml_str("[cache]\nbackoff_factor = -1.0\n").unwrap_err();
        assert!(err.to_string().contains("backoff_factor"));
    }

    #[test]
    fn explicit_cache_dir_wins() {
        let mut cfg = Config::default();
        cfg.cache.dir = Some(PathBuf::from("/tmp/meteo-cache"));
        assert_eq!(cfg.cache_dir().unwrap(), PathBuf::from("/tmp/meteo-cache"));
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let mut cfg = Config::default();
        cfg.defaults.city = "Hamburg".into();

        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(parsed, cfg);
    }
}
