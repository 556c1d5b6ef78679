//! Turns the columnar weather response into per-timestamp records.
//!
//! The backend answers with one section per granularity: a start time, a fixed
//! sampling interval and one array per requested variable, in request order.
//! Timestamps are regenerated over `[start, end)` and every array must have
//! exactly one value per timestamp.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde_json::Value;

use crate::{
    config::VariableSets,
    error::{Result, WeatherError},
    model::Interval,
    provider::RawResponse,
    record::WeatherRecord,
    table::WeatherTable,
};

const HOUR_SECS: i64 = 3600;
const DAY_SECS: i64 = 86_400;
/// Open-Meteo refreshes current conditions every 15 minutes.
const DEFAULT_CURRENT_INTERVAL_SECS: i64 = 900;
/// Daily stamps are local midnights, so a DST change moves them off the
/// 24 h grid by up to an hour.
const MAX_DAILY_DRIFT_SECS: i64 = HOUR_SECS;

/// One granularity's worth of columnar data.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBlock {
    /// Unix seconds, inclusive.
    pub start: i64,
    /// Unix seconds, exclusive.
    pub end: i64,
    pub interval: i64,
    /// One array per variable, in requested order.
    pub variables: Vec<Vec<Option<f64>>>,
}

impl SeriesBlock {
    pub fn timestamps(&self) -> Result<Vec<DateTime<Utc>>> {
        if self.interval <= 0 {
            return Err(WeatherError::DataShape(format!(
                "sampling interval must be positive, got {}",
                self.interval
            )));
        }

        let mut stamps = Vec::new();
        let mut t = self.start;
        while t < self.end {
            let stamp = DateTime::from_timestamp(t, 0)
                .ok_or_else(|| WeatherError::DataShape(format!("timestamp {t} out of range")))?;
            stamps.push(stamp);
            match t.checked_add(self.interval) {
                Some(next) => t = next,
                None => break,
            }
        }
        Ok(stamps)
    }
}

/// Decode and normalize a raw response using the configured variable order.
pub fn normalize(raw: &RawResponse, variables: &VariableSets) -> Result<Vec<WeatherRecord>> {
    let body = unwrap_single(&raw.body)?;
    let interval = requested_interval(raw)?;
    let names = variables.for_interval(interval);

    let reordered = raw
        .params
        .get(interval.as_str())
        .is_some_and(|requested| requested.split(',').ne(names.iter().map(String::as_str)));
    if reordered {
        return Err(WeatherError::DataShape(format!(
            "requested {interval} variables do not match the configured order"
        )));
    }

    let section = body.get(interval.as_str()).ok_or_else(|| {
        WeatherError::UnexpectedResponseShape(format!("response has no '{interval}' section"))
    })?;

    let block = decode_block(section, interval, names)?;
    let records = records_from_block(&block, interval, names)?;

    tracing::debug!("Normalized {} {} records", records.len(), interval);
    Ok(records)
}

/// [`normalize`] followed by table materialization at the location's offset.
pub fn normalize_table(raw: &RawResponse, variables: &VariableSets) -> Result<WeatherTable> {
    let offset = utc_offset(raw)?;
    Ok(WeatherTable::from_records(&normalize(raw, variables)?)?.with_utc_offset(offset))
}

/// The `utc_offset_seconds` echoed by the backend, UTC when absent.
pub fn utc_offset(raw: &RawResponse) -> Result<FixedOffset> {
    let body = unwrap_single(&raw.body)?;
    let Some(value) = body.get("utc_offset_seconds") else {
        return Ok(Utc.fix());
    };

    value
        .as_i64()
        .and_then(|secs| i32::try_from(secs).ok())
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            WeatherError::UnexpectedResponseShape(format!("invalid utc_offset_seconds: {value}"))
        })
}

/// Zip every index of the block into a record, mapping names onto fields.
pub fn records_from_block(
    block: &SeriesBlock,
    interval: Interval,
    names: &[String],
) -> Result<Vec<WeatherRecord>> {
    if block.variables.len() != names.len() {
        return Err(WeatherError::DataShape(format!(
            "expected {} variable arrays, got {}",
            names.len(),
            block.variables.len()
        )));
    }

    let stamps = block.timestamps()?;

    for (name, values) in names.iter().zip(&block.variables) {
        if values.len() != stamps.len() {
            return Err(WeatherError::DataShape(format!(
                "variable '{name}' has {} values for {} timestamps",
                values.len(),
                stamps.len()
            )));
        }
    }

    stamps
        .into_iter()
        .enumerate()
        .map(|(i, stamp)| -> Result<WeatherRecord> {
            let mut record = WeatherRecord::new(stamp);
            for (name, values) in names.iter().zip(&block.variables) {
                record.set(interval, name, values[i])?;
            }
            Ok(record)
        })
        .collect()
}

fn unwrap_single(body: &Value) -> Result<&Value> {
    match body {
        Value::Array(items) if items.len() == 1 => Ok(&items[0]),
        Value::Array(items) => Err(WeatherError::UnexpectedResponseShape(format!(
            "expected a single location in the response, got {}",
            items.len()
        ))),
        other => Ok(other),
    }
}

fn requested_interval(raw: &RawResponse) -> Result<Interval> {
    [Interval::Daily, Interval::Hourly, Interval::Current]
        .into_iter()
        .find(|interval| raw.params.contains(interval.as_str()))
        .ok_or_else(|| {
            WeatherError::UnexpectedResponseShape(
                "request parameters name none of daily, hourly or current".into(),
            )
        })
}

fn decode_block(section: &Value, interval: Interval, names: &[String]) -> Result<SeriesBlock> {
    match interval {
        Interval::Current => decode_current(section, names),
        Interval::Hourly => decode_series(section, HOUR_SECS, names),
        Interval::Daily => decode_series(section, DAY_SECS, names),
    }
}

fn decode_current(section: &Value, names: &[String]) -> Result<SeriesBlock> {
    let start = section.get("time").and_then(Value::as_i64).ok_or_else(|| {
        WeatherError::UnexpectedResponseShape("current section has no unix 'time'".into())
    })?;
    let interval = match section.get("interval") {
        Some(v) => v.as_i64().ok_or_else(|| {
            WeatherError::UnexpectedResponseShape("current 'interval' is not an integer".into())
        })?,
        None => DEFAULT_CURRENT_INTERVAL_SECS,
    };

    let variables = names
        .iter()
        .map(|name| -> Result<Vec<Option<f64>>> { Ok(vec![number(lookup(section, name)?, name)?]) })
        .collect::<Result<Vec<_>>>()?;

    let end = start.checked_add(interval).ok_or_else(|| overflow(start, interval))?;
    Ok(SeriesBlock { start, end, interval, variables })
}

fn decode_series(section: &Value, interval: i64, names: &[String]) -> Result<SeriesBlock> {
    let times = section
        .get("time")
        .and_then(Value::as_array)
        .ok_or_else(|| WeatherError::UnexpectedResponseShape("series section has no 'time' array".into()))?
        .iter()
        .map(|t| {
            t.as_i64().ok_or_else(|| {
                WeatherError::UnexpectedResponseShape("'time' values must be unix seconds".into())
            })
        })
        .collect::<Result<Vec<i64>>>()?;

    let start = times.first().copied().unwrap_or(0);
    let end = i64::try_from(times.len())
        .ok()
        .and_then(|n| n.checked_mul(interval))
        .and_then(|span| start.checked_add(span))
        .ok_or_else(|| overflow(start, interval))?;

    let drift = if interval == DAY_SECS { MAX_DAILY_DRIFT_SECS } else { 0 };
    check_grid(&times, interval, drift)?;

    let variables = names
        .iter()
        .map(|name| -> Result<Vec<Option<f64>>> {
            let values = lookup(section, name)?.as_array().ok_or_else(|| {
                WeatherError::DataShape(format!("variable '{name}' is not an array"))
            })?;
            values.iter().map(|v| number(v, name)).collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SeriesBlock { start, end, interval, variables })
}

/// Every echoed timestamp must sit on `time[0] + i * interval`, give or take
/// `drift` seconds.
fn check_grid(times: &[i64], interval: i64, drift: i64) -> Result<()> {
    let Some(&start) = times.first() else {
        return Ok(());
    };

    for (i, &actual) in times.iter().enumerate() {
        let expected = i64::try_from(i)
            .ok()
            .and_then(|i| i.checked_mul(interval))
            .and_then(|offset| start.checked_add(offset))
            .ok_or_else(|| overflow(start, interval))?;
        if actual.abs_diff(expected) > drift.unsigned_abs() {
            return Err(WeatherError::DataShape(format!(
                "timestamp {actual} at index {i} is off the {interval}s grid starting at {start}"
            )));
        }
    }
    Ok(())
}

fn overflow(start: i64, interval: i64) -> WeatherError {
    WeatherError::DataShape(format!(
        "time range starting at {start} with interval {interval}s overflows"
    ))
}

fn lookup<'a>(section: &'a Value, name: &str) -> Result<&'a Value> {
    section
        .get(name)
        .ok_or_else(|| WeatherError::DataShape(format!("requested variable '{name}' missing from response")))
}

fn number(value: &Value, name: &str) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        other => Err(WeatherError::DataShape(format!(
            "variable '{name}' holds a non-numeric value: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::QueryParams;
    use serde_json::json;

    const T0: i64 = 1_709_251_200; // 2024-03-01T00:00:00Z

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn vars(hourly: &[&str], daily: &[&str], current: &[&str]) -> VariableSets {
        VariableSets { current: names(current), hourly: names(hourly), daily: names(daily) }
    }

    fn raw(key: &str, list: &[&str], body: Value) -> RawResponse {
        let mut params = QueryParams::new();
        params.push("latitude", 52.52);
        params.push(key, list.join(","));
        RawResponse { params, body }
    }

    #[test]
    fn single_interval_yields_one_record_at_start() {
        let block = SeriesBlock {
            start: T0,
            end: T0 + 3600,
            interval: 3600,
            variables: vec![vec![Some(4.2)]],
        };
        let records = records_from_block(&block, Interval::Hourly, &names(&["temperature_2m"])).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp.timestamp(), T0);
        assert_eq!(records[0].temperature_2m, Some(4.2));
    }

    #[test]
    fn length_mismatch_is_a_shape_error() {
        let block = SeriesBlock {
            start: T0,
            end: T0 + 2 * 3600,
            interval: 3600,
            variables: vec![vec![Some(1.0), Some(2.0), Some(3.0)]],
        };
        let err = records_from_block(&block, Interval::Hourly, &names(&["temperature_2m"])).unwrap_err();

        assert!(matches!(err, WeatherError::DataShape(_)));
        assert!(err.to_string().contains("3 values for 2 timestamps"));
    }

    #[test]
    fn empty_span_is_not_an_error() {
        let block = SeriesBlock { start: T0, end: T0, interval: 3600, variables: vec![vec![]] };
        let records = records_from_block(&block, Interval::Hourly, &names(&["rain"])).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let block = SeriesBlock { start: T0, end: T0 + 10, interval: 0, variables: vec![] };
        assert!(matches!(block.timestamps(), Err(WeatherError::DataShape(_))));
    }

    #[test]
    fn hourly_section_becomes_ascending_records() {
        let hourly = ["temperature_2m", "rain", "wind_direction_10m"];
        let body = json!({
            "latitude": 52.52,
            "hourly": {
                "time": [T0, T0 + 3600, T0 + 7200],
                "temperature_2m": [1.0, 1.5, null],
                "rain": [0.0, 0.2, 0.0],
                "wind_direction_10m": [350, 10, 20]
            }
        });

        let records = normalize(&raw("hourly", &hourly, body), &vars(&hourly, &["rain_sum"], &["rain"])).unwrap();

        assert_eq!(records.len(), 3);
        assert!(records.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(records[1].rain, Some(0.2));
        assert_eq!(records[2].temperature_2m, None);
        assert_eq!(records[0].wind_direction_10m, Some(350.0));
        assert_eq!(records[0].rain_sum, None);
    }

    #[test]
    fn daily_section_fills_aggregates_only() {
        let daily = ["temperature_2m_max", "weather_code", "visibility_mean"];
        let body = json!({
            "daily": {
                "time": [T0, T0 + 86_400],
                "temperature_2m_max": [8.1, 9.4],
                "weather_code": [3, 61],
                "visibility_mean": [null, null]
            }
        });

        let raw = raw("daily", &daily, body);
        let table = normalize_table(&raw, &vars(&["rain"], &daily, &["rain"])).unwrap();

        assert_eq!(table.columns, vec!["weather_code", "temperature_2m_max"]);
        assert_eq!(table.column("weather_code"), Some(vec![Some(3.0), Some(61.0)]));
        assert_eq!(table.rows[1].timestamp.timestamp(), T0 + 86_400);
    }

    #[test]
    fn current_section_is_a_single_record() {
        let current = ["temperature_2m", "wind_speed_10m"];
        let body = json!({
            "current": { "time": T0, "interval": 900, "temperature_2m": 6.3, "wind_speed_10m": 11.2 }
        });

        let records = normalize(&raw("current", &current, body), &vars(&["rain"], &["rain_sum"], &current)).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp.timestamp(), T0);
        assert_eq!(records[0].wind_speed_10m, Some(11.2));
    }

    #[test]
    fn one_element_outer_array_is_unwrapped() {
        let hourly = ["rain"];
        let body = json!([{ "hourly": { "time": [T0], "rain": [0.4] } }]);

        let records = normalize(&raw("hourly", &hourly, body), &vars(&hourly, &["rain_sum"], &["rain"])).unwrap();
        assert_eq!(records[0].rain, Some(0.4));
    }

    #[test]
    fn empty_time_array_gives_no_records() {
        let hourly = ["rain"];
        let body = json!({ "hourly": { "time": [], "rain": [] } });

        let records = normalize(&raw("hourly", &hourly, body), &vars(&hourly, &["rain_sum"], &["rain"])).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn missing_granularity_marker_is_unexpected_shape() {
        let mut params = QueryParams::new();
        params.push("latitude", 1.0);
        let raw = RawResponse { params, body: json!({ "hourly": {} }) };

        let err = normalize(&raw, &VariableSets::default()).unwrap_err();
        assert!(matches!(err, WeatherError::UnexpectedResponseShape(_)));
    }

    #[test]
    fn missing_section_is_unexpected_shape() {
        let hourly = ["rain"];
        let body = json!({ "latitude": 52.52 });

        let err = normalize(&raw("hourly", &hourly, body), &vars(&hourly, &["rain_sum"], &["rain"])).unwrap_err();
        assert!(matches!(err, WeatherError::UnexpectedResponseShape(_)));
    }

    #[test]
    fn missing_variable_is_a_shape_error() {
        let hourly = ["rain", "snowfall"];
        let body = json!({ "hourly": { "time": [T0], "rain": [0.0] } });

        let err = normalize(&raw("hourly", &hourly, body), &vars(&hourly, &["rain_sum"], &["rain"])).unwrap_err();
        assert!(err.to_string().contains("snowfall"));
    }

    #[test]
    fn unmapped_variable_is_a_shape_error() {
        let hourly = ["rain", "uv_index"];
        let body = json!({ "hourly": { "time": [T0], "rain": [0.0], "uv_index": [3.0] } });

        let err = normalize(&raw("hourly", &hourly, body), &vars(&hourly, &["rain_sum"], &["rain"])).unwrap_err();
        assert!(matches!(err, WeatherError::DataShape(_)));
        assert!(err.to_string().contains("uv_index"));
    }

    #[test]
    fn request_order_must_match_configuration() {
        let body = json!({ "hourly": { "time": [T0], "rain": [0.0], "snowfall": [0.0] } });
        let raw = raw("hourly", &["snowfall", "rain"], body);

        let err = normalize(&raw, &vars(&["rain", "snowfall"], &["rain_sum"], &["rain"])).unwrap_err();
        assert!(err.to_string().contains("configured order"));
    }

    #[test]
    fn huge_current_interval_is_a_shape_error() {
        let current = ["temperature_2m"];
        let body = json!({
            "current": { "time": T0, "interval": i64::MAX, "temperature_2m": 6.3 }
        });

        let err = normalize(&raw("current", &current, body), &vars(&["rain"], &["rain_sum"], &current)).unwrap_err();
        assert!(matches!(err, WeatherError::DataShape(_)));
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn series_near_the_end_of_time_is_a_shape_error() {
        let hourly = ["rain"];
        let last = i64::MAX - 10;
        let body = json!({ "hourly": { "time": [last, last], "rain": [0.0, 0.1] } });

        let err = normalize(&raw("hourly", &hourly, body), &vars(&hourly, &["rain_sum"], &["rain"])).unwrap_err();
        assert!(matches!(err, WeatherError::DataShape(_)));
    }

    #[test]
    fn timestamps_stop_instead_of_wrapping() {
        let block = SeriesBlock {
            start: T0,
            end: i64::MAX,
            interval: i64::MAX - T0 + 1,
            variables: vec![],
        };
        assert_eq!(block.timestamps().unwrap().len(), 1);
    }

    #[test]
    fn hourly_gap_is_a_shape_error() {
        let hourly = ["rain"];
        let body = json!({
            "hourly": { "time": [T0, T0 + 3600, T0 + 3 * 3600], "rain": [0.0, 0.1, 0.2] }
        });

        let err = normalize(&raw("hourly", &hourly, body), &vars(&hourly, &["rain_sum"], &["rain"])).unwrap_err();
        assert!(matches!(err, WeatherError::DataShape(_)));
        assert!(err.to_string().contains("index 2"));
    }

    #[test]
    fn daily_dst_shift_is_tolerated_but_larger_drift_is_not() {
        let daily = ["rain_sum"];
        let vars = vars(&["rain"], &daily, &["rain"]);

        // Local midnights across a spring-forward change.
        let dst = json!({
            "daily": { "time": [T0, T0 + 86_400, T0 + 2 * 86_400 - 3600], "rain_sum": [0.0, 1.0, 2.0] }
        });
        let records = normalize(&raw("daily", &daily, dst), &vars).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].timestamp.timestamp(), T0 + 2 * 86_400);

        let skewed = json!({
            "daily": { "time": [T0, T0 + 86_400, T0 + 3 * 86_400], "rain_sum": [0.0, 1.0, 2.0] }
        });
        let err = normalize(&raw("daily", &daily, skewed), &vars).unwrap_err();
        assert!(matches!(err, WeatherError::DataShape(_)));
    }

    #[test]
    fn table_carries_the_location_offset() {
        let daily = ["rain_sum"];
        let body = json!({
            "utc_offset_seconds": 32_400,
            "daily": { "time": [T0 - 9 * 3600], "rain_sum": [1.0] }
        });

        let table = normalize_table(&raw("daily", &daily, body), &vars(&["rain"], &daily, &["rain"])).unwrap();
        let local = table.rows[0].timestamp.with_timezone(&table.utc_offset());
        assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2024-03-01 00:00");
    }

    #[test]
    fn missing_offset_means_utc_and_garbage_is_rejected() {
        let daily = ["rain_sum"];
        let plain = raw("daily", &daily, json!({ "daily": { "time": [], "rain_sum": [] } }));
        assert_eq!(utc_offset(&plain).unwrap(), Utc.fix());

        let bogus = raw("daily", &daily, json!({ "utc_offset_seconds": "+09:00" }));
        assert!(matches!(utc_offset(&bogus), Err(WeatherError::UnexpectedResponseShape(_))));
    }

    #[test]
    fn string_timestamps_are_rejected() {
        let hourly = ["rain"];
        let body = json!({ "hourly": { "time": ["2024-03-01T00:00"], "rain": [0.0] } });

        let err = normalize(&raw("hourly", &hourly, body), &vars(&hourly, &["rain_sum"], &["rain"])).unwrap_err();
        assert!(matches!(err, WeatherError::UnexpectedResponseShape(_)));
    }
}
