//! Label and icon lookups for front ends.

/// Human-readable description of a WMO weather code.
/// See: https://open-meteo.com/en/docs#weathervariables
pub fn weather_code_label(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Rime fog",
        51 => "Light drizzle",
        53 => "Drizzle",
        55 => "Dense drizzle",
        56 | 57 => "Freezing drizzle",
        61 => "Slight rain",
        63 => "Rain",
        65 => "Heavy rain",
        66 | 67 => "Freezing rain",
        71 => "Slight snow",
        73 => "Snow",
        75 => "Heavy snow",
        77 => "Snow grains",
        80 => "Rain showers",
        81 => "Heavy rain showers",
        82 => "Violent rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}

pub fn weather_code_icon(code: u8) -> &'static str {
    match code {
        0 => "☀️",
        1 => "🌤️",
        2 => "⛅",
        3 => "☁️",
        45 | 48 => "🌫️",
        51 | 53 | 55 => "🌦️",
        56 | 57 | 66 | 67 | 77 | 85 | 86 => "🌨️",
        61 | 80 => "🌦️",
        63 | 65 | 81 | 82 => "🌧️",
        71 | 73 | 75 => "❄️",
        95 | 96 | 99 => "⛈️",
        _ => "❔",
    }
}

const COMPASS: [(&str, &str); 16] = [
    ("N", "↑"),
    ("NNE", "↗"),
    ("NE", "↗"),
    ("ENE", "↗"),
    ("E", "→"),
    ("ESE", "↘"),
    ("SE", "↘"),
    ("SSE", "↘"),
    ("S", "↓"),
    ("SSW", "↙"),
    ("SW", "↙"),
    ("WSW", "↙"),
    ("W", "←"),
    ("WNW", "↖"),
    ("NW", "↖"),
    ("NNW", "↖"),
];

/// 16-point compass name for a direction in degrees (22.5° sectors, N centred on 0°).
pub fn compass_point(degrees: f64) -> &'static str {
    COMPASS[sector(degrees)].0
}

pub fn compass_arrow(degrees: f64) -> &'static str {
    COMPASS[sector(degrees)].1
}

fn sector(degrees: f64) -> usize {
    let normalized = degrees.rem_euclid(360.0);
    ((normalized + 11.25) / 22.5) as usize % COMPASS.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compass_sectors() {
        assert_eq!(compass_point(0.0), "N");
        assert_eq!(compass_point(350.0), "N");
        assert_eq!(compass_point(11.25), "NNE");
        assert_eq!(compass_point(90.0), "E");
        assert_eq!(compass_point(200.0), "SSW");
        assert_eq!(compass_point(-90.0), "W");
        assert_eq!(compass_arrow(180.0), "↓");
    }

    #[test]
    fn weather_codes() {
        assert_eq!(weather_code_label(0), "Clear sky");
        assert_eq!(weather_code_label(65), "Heavy rain");
        assert_eq!(weather_code_label(42), "Unknown");
        assert_eq!(weather_code_icon(95), "⛈️");
    }
}
