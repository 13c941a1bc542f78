//! crates/anglerhub_core/src/weather.rs
//!
//! Read-only fields derived from a weather log and the owner's preferences.

use serde::Serialize;

use crate::domain::WeatherLog;
use crate::units::{self, UserPreferences};

/// Pressure change (hPa) beyond which the trend is no longer "stable".
const PRESSURE_TREND_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureTrend {
    Rising,
    Falling,
    Stable,
}

impl PressureTrend {
    pub fn between(previous: Option<&WeatherLog>, current: &WeatherLog) -> Self {
        let Some(previous) = previous else {
            return Self::Stable;
        };
        let diff = current.reading.pressure - previous.reading.pressure;
        if diff > PRESSURE_TREND_THRESHOLD {
            Self::Rising
        } else if diff < -PRESSURE_TREND_THRESHOLD {
            Self::Falling
        } else {
            Self::Stable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherInsights {
    pub formatted_temperature: String,
    pub formatted_wind_speed: Option<String>,
    pub wind_direction_compass: Option<&'static str>,
    pub weather_summary: String,
    pub is_fishing_friendly: bool,
    pub pressure_trend: PressureTrend,
}

impl WeatherInsights {
    pub fn derive(
        log: &WeatherLog,
        previous: Option<&WeatherLog>,
        preferences: &UserPreferences,
    ) -> Self {
        let reading = &log.reading;
        let formatted_temperature = units::format_temperature(reading.temperature, preferences);
        let formatted_wind_speed = units::format_wind_speed(reading.wind_speed, preferences);
        let wind_direction_compass = units::compass_direction(reading.wind_direction);

        let mut weather_summary = reading.weather_main.clone();
        if reading.temperature != 0.0 {
            weather_summary.push_str(&format!(", {formatted_temperature}"));
        }
        if let Some(wind) = &formatted_wind_speed {
            weather_summary.push_str(&format!(", Wind: {wind}"));
            if let Some(compass) = wind_direction_compass {
                weather_summary.push_str(&format!(" {compass}"));
            }
        }

        Self {
            formatted_temperature,
            formatted_wind_speed,
            wind_direction_compass,
            weather_summary,
            is_fishing_friendly: is_fishing_friendly(log),
            pressure_trend: PressureTrend::between(previous, log),
        }
    }
}

/// 10-30 degrees, at most 5 m/s of wind and no heavy rain.
pub fn is_fishing_friendly(log: &WeatherLog) -> bool {
    let reading = &log.reading;
    let good_temperature = (10.0..=30.0).contains(&reading.temperature);
    let low_wind = reading.wind_speed.map_or(true, |speed| speed <= 5.0);
    let wet = matches!(
        reading.weather_main.as_str(),
        "Thunderstorm" | "Drizzle" | "Rain"
    );
    let not_heavy_rain = !wet || reading.precipitation.is_some_and(|mm| mm > 0.0 && mm < 5.0);
    good_temperature && low_wind && not_heavy_rain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WeatherReading;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn log(temperature: f64, pressure: f64, weather_main: &str) -> WeatherLog {
        let at = Utc.with_ymd_and_hms(2024, 7, 4, 6, 0, 0).unwrap();
        WeatherLog {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            reading: WeatherReading {
                latitude: 45.0,
                longitude: -93.0,
                location_name: "Lake Harriet".into(),
                temperature,
                feels_like: None,
                humidity: 60,
                pressure,
                wind_speed: Some(3.2),
                wind_direction: Some(225),
                weather_main: weather_main.into(),
                weather_description: "".into(),
                precipitation: None,
                cloud_cover: None,
                uv_index: None,
                visibility: None,
                recorded_at: at,
                api_source: "openweathermap".into(),
            },
            created_at: at,
        }
    }

    #[test]
    fn summary_and_friendliness() {
        let current = log(21.04, 1015.0, "Clouds");
        let insights = WeatherInsights::derive(&current, None, &UserPreferences::default());
        assert_eq!(insights.formatted_temperature, "21°C");
        assert_eq!(insights.wind_direction_compass, Some("SW"));
        assert_eq!(insights.weather_summary, "Clouds, 21°C, Wind: 3.2 m/s SW");
        assert!(insights.is_fishing_friendly);
        assert_eq!(insights.pressure_trend, PressureTrend::Stable);
    }

    #[test]
    fn heavy_rain_is_not_friendly() {
        let mut rainy = log(18.0, 1000.0, "Rain");
        assert!(!is_fishing_friendly(&rainy));
        rainy.reading.precipitation = Some(2.0);
        assert!(is_fishing_friendly(&rainy));
        rainy.reading.precipitation = Some(7.5);
        assert!(!is_fishing_friendly(&rainy));
    }

    #[test]
    fn pressure_trend() {
        let previous = log(18.0, 1010.0, "Clear");
        assert_eq!(
            PressureTrend::between(Some(&previous), &log(18.0, 1013.0, "Clear")),
            PressureTrend::Rising
        );
        assert_eq!(
            PressureTrend::between(Some(&previous), &log(18.0, 1007.5, "Clear")),
            PressureTrend::Falling
        );
        assert_eq!(
            PressureTrend::between(Some(&previous), &log(18.0, 1011.0, "Clear")),
            PressureTrend::Stable
        );
    }
}
