use chrono::{DateTime, FixedOffset, Utc};
use meteo_core::{
    ForecastMode, Interval, Location, WeatherTable,
    present::{compass_arrow, compass_point, weather_code_icon, weather_code_label},
};

pub fn header(location: &Location, mode: ForecastMode, interval: Interval) -> String {
    let place = [&location.city, &location.postal_code, &location.country]
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    match location.coordinates {
        Some(c) => format!("{place} ({:.4}, {:.4}) · {mode} · {interval}", c.latitude, c.longitude),
        None => format!("{place} · {mode} · {interval}"),
    }
}

/// Plain-text table: one line per timestamp, one padded column per field.
pub fn render_table(table: &WeatherTable, interval: Interval) -> String {
    let mut grid: Vec<Vec<String>> = Vec::with_capacity(table.rows.len() + 1);

    let mut heading = vec!["time".to_string()];
    heading.extend(table.columns.iter().map(|c| c.to_string()));
    grid.push(heading);

    let offset = table.utc_offset();
    for row in &table.rows {
        let mut line = vec![format_time(row.timestamp, offset, interval)];
        line.extend(
            table
                .columns
                .iter()
                .zip(&row.values)
                .map(|(column, value)| format_cell(column, *value)),
        );
        grid.push(line);
    }

    let widths: Vec<usize> = (0..grid[0].len())
        .map(|col| grid.iter().map(|line| line[col].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for line in &grid {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}

/// Wall-clock time at the location, not on this machine.
fn format_time(timestamp: DateTime<Utc>, offset: FixedOffset, interval: Interval) -> String {
    let local = timestamp.with_timezone(&offset);
    match interval {
        Interval::Daily => local.format("%Y-%m-%d").to_string(),
        Interval::Hourly | Interval::Current => local.format("%Y-%m-%d %H:%M").to_string(),
    }
}

fn format_cell(column: &str, value: Option<f64>) -> String {
    let Some(v) = value else {
        return "-".to_string();
    };

    if column == "weather_code" {
        let code = v.round().clamp(0.0, 255.0) as u8;
        return format!("{} {}", weather_code_icon(code), weather_code_label(code));
    }
    if column.starts_with("wind_direction") {
        return format!("{v:.0}° {} {}", compass_point(v), compass_arrow(v));
    }
    format!("{v:.1}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use meteo_core::{Coordinates, WeatherRecord};

    #[test]
    fn cells_are_formatted_by_column() {
        assert_eq!(format_cell("temperature_2m", Some(3.26)), "3.3");
        assert_eq!(format_cell("rain_sum", None), "-");
        assert_eq!(format_cell("wind_direction_10m", Some(270.0)), "270° W ←");
        assert_eq!(format_cell("weather_code", Some(3.0)), "☁️ Overcast");
    }

    #[test]
    fn daily_rows_use_the_location_calendar() {
        // 2024-03-01 00:00 in Tokyo.
        let midnight = DateTime::from_timestamp(1_709_218_800, 0).unwrap();
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let berlin = FixedOffset::east_opt(3600).unwrap();

        assert_eq!(format_time(midnight, tokyo, Interval::Daily), "2024-03-01");
        assert_eq!(format_time(midnight, berlin, Interval::Daily), "2024-02-29");
        assert_eq!(format_time(midnight, tokyo, Interval::Hourly), "2024-03-01 00:00");
    }

    #[test]
    fn table_rows_render_at_table_offset() {
        let mut record = WeatherRecord::new(DateTime::from_timestamp(1_709_218_800, 0).unwrap());
        record.set(Interval::Daily, "rain_sum", Some(1.0)).unwrap();
        let table = WeatherTable::from_records(&[record])
            .unwrap()
            .with_utc_offset(FixedOffset::east_opt(9 * 3600).unwrap());

        let text = render_table(&table, Interval::Daily);
        assert!(text.lines().nth(1).unwrap().starts_with("2024-03-01"));
    }

    #[test]
    fn header_includes_coordinates_when_resolved() {
        let loc = Location::new("Germany", "Berlin", "")
            .with_coordinates(Coordinates { latitude: 52.52, longitude: 13.405 });
        assert_eq!(
            header(&loc, ForecastMode::Forecast, Interval::Daily),
            "Berlin, Germany (52.5200, 13.4050) · forecast · daily"
        );
    }

    #[test]
    fn table_has_heading_and_one_line_per_row() {
        let mut records = Vec::new();
        for day in 0..3 {
            let mut record = WeatherRecord::new(DateTime::from_timestamp(1_709_251_200 + day * 86_400, 0).unwrap());
            record.set(Interval::Daily, "rain_sum", Some(day as f64)).unwrap();
            records.push(record);
        }
        let table = WeatherTable::from_records(&records).unwrap();

        let text = render_table(&table, Interval::Daily);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("time"));
        assert!(lines[0].ends_with("rain_sum"));
        assert!(lines[3].ends_with("2.0"));
    }
}
