//! HTTP session with a persistent response cache in front of a retrying
//! client.

use reqwest::Client;
use reqwest_middleware::ClientWithMiddleware;
use std::{path::PathBuf, sync::Mutex, time::Duration};

use crate::{
    Config,
    error::{Result, WeatherError},
    session::{
        cache::ResponseCache,
        retry::{RetryPolicy, is_transient, is_transient_status},
    },
};

pub mod cache;
pub mod retry;

/// Ordered query parameters. Order is part of the cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.push((key.into(), value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub query: QueryParams,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, query: QueryParams) -> Self {
        Self { url: url.into(), query }
    }

    pub fn cache_key(&self) -> String {
        format!("{}?{}", self.url, self.query.encode())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub from_cache: bool,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into an `Http` error.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(WeatherError::Http { status: self.status, body: truncate_body(&self.body) })
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub user_agent: String,
    pub timeout: Duration,
    pub ttl: Duration,
    pub retry: RetryPolicy,
    /// `None` keeps the cache in memory.
    pub cache_path: Option<PathBuf>,
}

impl SessionOptions {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let cache_path = cfg.cache_dir()?.join(format!("{}.json", cfg.cache.name));
        Ok(Self {
            user_agent: cfg.agent_name.clone(),
            timeout: cfg.cache.timeout(),
            ttl: cfg.cache.ttl(),
            retry: RetryPolicy::from_config(&cfg.cache),
            cache_path: Some(cache_path),
        })
    }
}

/// Wraps a [`reqwest::Client`]: identical GETs within the TTL are answered
/// from the cache, transient failures are retried with exponential backoff by
/// the client middleware.
#[derive(Debug)]
pub struct CachedSession {
    http: ClientWithMiddleware,
    retry: RetryPolicy,
    cache: Mutex<ResponseCache>,
}

impl CachedSession {
    pub fn new(options: SessionOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent)
            .timeout(options.timeout)
            .build()
            .map_err(|e| WeatherError::NetworkFailure {
                attempts: 0,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let cache = match options.cache_path {
            Some(path) => ResponseCache::open(path, options.ttl),
            None => ResponseCache::in_memory(options.ttl),
        };

        Ok(Self {
            http: options.retry.wrap(client),
            retry: options.retry,
            cache: Mutex::new(cache),
        })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(SessionOptions::from_config(cfg)?)?)
    }

    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let key = request.cache_key();

        if let Some(hit) = self.cached(&key) {
            tracing::debug!(url = %request.url, "HTTP cache hit");
            return Ok(hit);
        }

        let res = match self.http.get(&request.url).query(request.query.pairs()).send().await {
            Ok(res) => res,
            Err(e) => {
                let attempts = if is_transient(&e) { self.retry.max_attempts() } else { 1 };
                tracing::error!(url = %request.url, "Request failed after {} attempt(s): {}", attempts, e);
                return Err(WeatherError::NetworkFailure { attempts, message: e.to_string() });
            }
        };

        let status = res.status();
        if is_transient_status(status) {
            let attempts = self.retry.max_attempts();
            tracing::error!(url = %request.url, "All {} attempts exhausted: {}", attempts, status);
            return Err(WeatherError::NetworkFailure {
                attempts,
                message: format!("server responded with {status}"),
            });
        }

        let body = res.text().await.map_err(|e| WeatherError::NetworkFailure {
            attempts: 1,
            message: format!("failed to read response body: {e}"),
        })?;

        if status.is_success() {
            self.store(key, status.as_u16(), body.clone());
        }
        Ok(HttpResponse { status: status.as_u16(), body, from_cache: false })
    }

    fn cached(&self, key: &str) -> Option<HttpResponse> {
        let cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.get(key).map(|entry| HttpResponse {
            status: entry.status,
            body: entry.body.clone(),
            from_cache: true,
        })
    }

    fn store(&self, key: String, status: u16, body: String) {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.insert(key, status, body);
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_keeps_parameter_order() {
        let mut query = QueryParams::new();
        query.push("latitude", 52.52);
        query.push("daily", "rain_sum,snowfall_sum");

        let req = HttpRequest::get("https://api.test/v1/forecast", query);
        assert_eq!(req.cache_key(), "https://api.test/v1/forecast?latitude=52.52&daily=rain_sum,snowfall_sum");
    }

    #[test]
    fn query_lookup() {
        let mut query = QueryParams::new();
        query.push("forecast_days", 5);

        assert_eq!(query.get("forecast_days"), Some("5"));
        assert!(!query.contains("past_days"));
    }

    #[test]
    fn error_for_status_truncates_long_bodies() {
        let res = HttpResponse { status: 400, body: "é".repeat(300), from_cache: false };
        match res.error_for_status() {
            Err(WeatherError::Http { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.ends_with("..."));
                assert!(body.len() <= 203);
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }
}
