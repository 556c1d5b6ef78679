use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Serialize;

use crate::{
    error::{Result, WeatherError},
    record::{COLUMN_COUNT, COLUMNS, WeatherRecord},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub timestamp: DateTime<Utc>,
    /// One cell per entry of [`WeatherTable::columns`].
    pub values: Vec<Option<f64>>,
}

/// Weather records indexed by ascending timestamp.
///
/// Only columns holding at least one value survive materialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<TableRow>,
    /// Offset of the location the data was fetched for.
    pub utc_offset_seconds: i32,
}

impl WeatherTable {
    pub fn from_records(records: &[WeatherRecord]) -> Result<Self> {
        let mut sorted: Vec<&WeatherRecord> = records.iter().collect();
        sorted.sort_by_key(|r| r.timestamp);

        if let Some(pair) = sorted.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            return Err(WeatherError::DataShape(format!(
                "duplicate timestamp {}",
                pair[0].timestamp
            )));
        }

        let values: Vec<[Option<f64>; COLUMN_COUNT]> = sorted.iter().map(|r| r.values()).collect();

        let kept: Vec<usize> = (0..COLUMN_COUNT)
            .filter(|&col| values.iter().any(|row| row[col].is_some()))
            .collect();

        let rows = sorted
            .iter()
            .zip(&values)
            .map(|(record, row)| TableRow {
                timestamp: record.timestamp,
                values: kept.iter().map(|&col| row[col]).collect(),
            })
            .collect();

        Ok(Self {
            columns: kept.iter().map(|&col| COLUMNS[col]).collect(),
            rows,
            utc_offset_seconds: 0,
        })
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset_seconds = offset.local_minus_utc();
        self
    }

    /// Wall-clock offset at the location; daily rows are midnights in it.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_seconds).unwrap_or_else(|| Utc.fix())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == name)
    }

    /// All cells of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row.values[idx]).collect())
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.rows.iter().map(|row| row.timestamp)
    }
}
