//! crates/anglerhub_core/src/units.rs
//!
//! User display preferences and the formatters that consult them. Stored
//! values are already in the user's unit; formatting never converts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightUnit {
    #[default]
    #[serde(rename = "kg")]
    Kilograms,
    #[serde(rename = "lbs")]
    Pounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LengthUnit {
    #[default]
    #[serde(rename = "cm")]
    Centimetres,
    #[serde(rename = "inches")]
    Inches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindSpeedUnit {
    #[default]
    #[serde(rename = "m/s")]
    MetresPerSecond,
    #[serde(rename = "mph")]
    MilesPerHour,
    #[serde(rename = "knots")]
    Knots,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceUnit {
    #[default]
    #[serde(rename = "km")]
    Kilometres,
    #[serde(rename = "miles")]
    Miles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "Y-m-d")]
    YearMonthDay,
    #[serde(rename = "d/m/Y")]
    DayMonthYear,
    #[serde(rename = "m/d/Y")]
    MonthDayYear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "12h")]
    TwelveHour,
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
}

impl WeightUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Kilograms => "kg",
            Self::Pounds => "lbs",
        }
    }
}

impl LengthUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Centimetres => "cm",
            Self::Inches => "inches",
        }
    }
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        }
    }
}

impl WindSpeedUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::MetresPerSecond => "m/s",
            Self::MilesPerHour => "mph",
            Self::Knots => "knots",
        }
    }
}

impl DateFormat {
    /// The matching `chrono` format string.
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::YearMonthDay => "%Y-%m-%d",
            Self::DayMonthYear => "%d/%m/%Y",
            Self::MonthDayYear => "%m/%d/%Y",
        }
    }
}

/// Per-user display and notification settings, stored as a JSON document.
/// Missing keys fall back to their defaults so older documents keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub weight_unit: WeightUnit,
    pub length_unit: LengthUnit,
    pub temperature_unit: TemperatureUnit,
    pub wind_speed_unit: WindSpeedUnit,
    pub distance_unit: DistanceUnit,
    pub date_format: DateFormat,
    pub time_format: TimeFormat,
    pub notifications_enabled: bool,
    pub public_profile: bool,
    pub auto_weather_logging: bool,
    pub goal_reminders: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            weight_unit: WeightUnit::default(),
            length_unit: LengthUnit::default(),
            temperature_unit: TemperatureUnit::default(),
            wind_speed_unit: WindSpeedUnit::default(),
            distance_unit: DistanceUnit::default(),
            date_format: DateFormat::default(),
            time_format: TimeFormat::default(),
            notifications_enabled: true,
            public_profile: false,
            auto_weather_logging: false,
            goal_reminders: false,
        }
    }
}

/// A partial preferences update; only the supplied keys change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    pub weight_unit: Option<WeightUnit>,
    pub length_unit: Option<LengthUnit>,
    pub temperature_unit: Option<TemperatureUnit>,
    pub wind_speed_unit: Option<WindSpeedUnit>,
    pub distance_unit: Option<DistanceUnit>,
    pub date_format: Option<DateFormat>,
    pub time_format: Option<TimeFormat>,
    pub notifications_enabled: Option<bool>,
    pub public_profile: Option<bool>,
    pub auto_weather_logging: Option<bool>,
    pub goal_reminders: Option<bool>,
}

impl UserPreferences {
    pub fn merge(&mut self, update: &PreferencesUpdate) {
        fn set<T: Copy>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }
        set(&mut self.weight_unit, update.weight_unit);
        set(&mut self.length_unit, update.length_unit);
        set(&mut self.temperature_unit, update.temperature_unit);
        set(&mut self.wind_speed_unit, update.wind_speed_unit);
        set(&mut self.distance_unit, update.distance_unit);
        set(&mut self.date_format, update.date_format);
        set(&mut self.time_format, update.time_format);
        set(&mut self.notifications_enabled, update.notifications_enabled);
        set(&mut self.public_profile, update.public_profile);
        set(&mut self.auto_weather_logging, update.auto_weather_logging);
        set(&mut self.goal_reminders, update.goal_reminders);
    }
}

/// `"4.2 kg"`; absent for missing or zero weights.
pub fn format_weight(weight: Option<f64>, preferences: &UserPreferences) -> Option<String> {
    weight
        .filter(|w| *w != 0.0)
        .map(|w| format!("{} {}", w, preferences.weight_unit.symbol()))
}

pub fn format_length(length: Option<f64>, preferences: &UserPreferences) -> Option<String> {
    length
        .filter(|l| *l != 0.0)
        .map(|l| format!("{} {}", l, preferences.length_unit.symbol()))
}

/// `"18.5°C"`, rounded to one decimal.
pub fn format_temperature(temperature: f64, preferences: &UserPreferences) -> String {
    format!(
        "{}°{}",
        round_one(temperature),
        preferences.temperature_unit.symbol()
    )
}

pub fn format_wind_speed(speed: Option<f64>, preferences: &UserPreferences) -> Option<String> {
    speed
        .filter(|s| *s != 0.0)
        .map(|s| format!("{} {}", round_one(s), preferences.wind_speed_unit.symbol()))
}

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass name for a bearing in degrees; absent for a zero bearing.
pub fn compass_direction(degrees: Option<i32>) -> Option<&'static str> {
    let degrees = degrees.filter(|d| *d != 0)?;
    let index = (f64::from(degrees) / 22.5).round() as i64;
    Some(COMPASS_POINTS[index.rem_euclid(16) as usize])
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
