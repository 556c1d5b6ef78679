//! Core library for the `meteo` CLI.
//!
//! This crate defines:
//! - Configuration (TOML on disk, injected everywhere else)
//! - A cached, retrying HTTP session
//! - Geocoding and the weather provider abstraction
//! - Normalization of columnar provider responses into a weather table
//! - The facade that chains all of the above
//!
//! It is used by `meteo-cli`, but can also be reused by other front ends.

pub mod config;
pub mod error;
pub mod facade;
pub mod geocode;
pub mod model;
pub mod normalize;
pub mod present;
pub mod provider;
pub mod record;
pub mod session;
pub mod table;

pub use config::{CacheConfig, Config, DefaultLocation, VariableSets};
pub use error::{ErrorKind, FetchFailed, Result, WeatherError};
pub use facade::WeatherFacade;
pub use geocode::Geocoder;
pub use model::{Coordinates, ForecastMode, Interval, Location};
pub use provider::{ProviderId, RawResponse, WeatherClient};
pub use record::WeatherRecord;
pub use session::{CachedSession, SessionOptions};
pub use table::{TableRow, WeatherTable};
