use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    config::VariableSets,
    error::{Result, WeatherError},
    model::{Coordinates, ForecastMode, Interval},
    provider::{ProviderId, RawResponse, WeatherClient},
    session::{CachedSession, HttpRequest, QueryParams, truncate_body},
};

/// Client for the Open-Meteo forecast endpoint.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    session: Arc<CachedSession>,
    url: String,
    timezone: String,
    variables: VariableSets,
}

#[derive(Debug, Deserialize)]
struct OmErrorBody {
    reason: String,
}

impl OpenMeteoClient {
    pub fn new(
        session: Arc<CachedSession>,
        url: String,
        timezone: String,
        variables: VariableSets,
    ) -> Self {
        Self { session, url, timezone, variables }
    }

    fn push_days(params: &mut QueryParams, mode: ForecastMode, days: u32) {
        match mode {
            ForecastMode::Past => {
                params.push("forecast_days", 1);
                params.push("past_days", days);
            }
            ForecastMode::Forecast | ForecastMode::Current => params.push("forecast_days", days),
        }
    }
}

#[async_trait]
impl WeatherClient for OpenMeteoClient {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    fn build_params(
        &self,
        coordinates: Coordinates,
        mode: ForecastMode,
        interval: Interval,
        span: u32,
    ) -> Result<QueryParams> {
        mode.validate_interval(interval)?;

        let mut params = QueryParams::new();
        params.push("latitude", coordinates.latitude);
        params.push("longitude", coordinates.longitude);
        params.push("timezone", &self.timezone);
        params.push("timeformat", "unixtime");

        let variables = self.variables.for_interval(interval).join(",");
        match interval {
            Interval::Current => params.push("current", variables),
            Interval::Daily => {
                params.push("daily", variables);
                Self::push_days(&mut params, mode, span);
            }
            Interval::Hourly => {
                params.push("hourly", variables);
                Self::push_days(&mut params, mode, span.div_ceil(24));
            }
        }

        tracing::debug!(?params, "Built Open-Meteo parameters");
        Ok(params)
    }

    async fn fetch(
        &self,
        coordinates: Coordinates,
        mode: ForecastMode,
        interval: Interval,
        span: u32,
    ) -> Result<RawResponse> {
        let params = self.build_params(coordinates, mode, interval, span)?;

        let response = self.session.execute(&HttpRequest::get(&self.url, params.clone())).await?;

        if !response.is_success() {
            // Open-Meteo explains rejected parameters as {"error": true, "reason": "..."}.
            let body = serde_json::from_str::<OmErrorBody>(&response.body)
                .map(|e| e.reason)
                .unwrap_or_else(|_| truncate_body(&response.body));
            return Err(WeatherError::Http { status: response.status, body });
        }

        let body: serde_json::Value = serde_json::from_str(&response.body)?;

        tracing::debug!(
            from_cache = response.from_cache,
            "Received Open-Meteo {} response",
            interval
        );
        Ok(RawResponse { params, body })
    }
}
