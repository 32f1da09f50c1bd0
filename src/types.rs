use chrono::{Datelike, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::angles::wrap_minutes;
use crate::constants::DEFAULT_CHANNEL_MAX_CURRENT;

/// Civil calendar timestamp. The timezone is owned by whoever interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl DateTime {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    pub fn from_chrono<Tz: TimeZone>(dt: &chrono::DateTime<Tz>) -> Self {
        Self::new(
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
    }

    pub fn start_of_day(&self) -> Self {
        Self::new(self.year, self.month, self.day, 0, 0, 0)
    }

    pub fn hour_fraction(&self) -> f64 {
        self.hour as f64 + self.minute as f64 / 60.0 + self.second as f64 / 3600.0
    }

    pub fn minutes_of_day(&self) -> u16 {
        wrap_minutes((self.hour * 60 + self.minute) as i32)
    }

    pub fn same_date(&self, other: &DateTime) -> bool {
        self.year == other.year && self.month == other.month && self.day == other.day
    }
}

impl Default for DateTime {
    fn default() -> Self {
        Self::new(2025, 1, 1, 0, 0, 0)
    }
}

impl From<NaiveDateTime> for DateTime {
    fn from(dt: NaiveDateTime) -> Self {
        Self::new(
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CelestialPosition {
    pub altitude: f64,
    pub azimuth: f64,
}

impl Default for CelestialPosition {
    fn default() -> Self {
        Self {
            altitude: -90.0,
            azimuth: 0.0,
        }
    }
}

/// Rise and set as minutes from local midnight; `None` when the event does not occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RiseSetTimes {
    pub rise_minutes: Option<u16>,
    pub set_minutes: Option<u16>,
}

pub type SunTimes = RiseSetTimes;
pub type MoonTimes = RiseSetTimes;

impl RiseSetTimes {
    pub fn rise_valid(&self) -> bool {
        self.rise_minutes.is_some()
    }

    pub fn set_valid(&self) -> bool {
        self.set_minutes.is_some()
    }

    pub fn shifted(&self, shift_minutes: i32) -> Self {
        Self {
            rise_minutes: self
                .rise_minutes
                .map(|m| wrap_minutes(m as i32 + shift_minutes)),
            set_minutes: self
                .set_minutes
                .map(|m| wrap_minutes(m as i32 + shift_minutes)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    pub enabled: bool,
    pub shift_hours: i32,
    pub shift_minutes: i32,
}

impl ProjectionSettings {
    pub fn new(enabled: bool, shift_hours: i32, shift_minutes: i32) -> Self {
        Self {
            enabled,
            shift_hours,
            shift_minutes,
        }
    }

    pub fn total_shift_minutes(&self) -> i32 {
        self.shift_hours * 60 + self.shift_minutes
    }

    pub fn shift_in_hours(&self) -> f64 {
        self.shift_hours as f64 + self.shift_minutes as f64 / 60.0
    }
}

/// Daily solar (and lunar) event times that dynamic schedule points are anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AstronomicalTimes {
    pub sunrise_minutes: u16,
    pub sunset_minutes: u16,
    pub solar_noon_minutes: u16,
    pub civil_dawn_minutes: u16,
    pub civil_dusk_minutes: u16,
    pub nautical_dawn_minutes: u16,
    pub nautical_dusk_minutes: u16,
    pub astronomical_dawn_minutes: u16,
    pub astronomical_dusk_minutes: u16,
    pub moon_rise_minutes: Option<u16>,
    pub moon_set_minutes: Option<u16>,
    pub moon_phase: f32,
    pub valid: bool,
}

impl Default for AstronomicalTimes {
    fn default() -> Self {
        Self {
            sunrise_minutes: 420,
            sunset_minutes: 1080,
            solar_noon_minutes: 750,
            civil_dawn_minutes: 390,
            civil_dusk_minutes: 1110,
            nautical_dawn_minutes: 360,
            nautical_dusk_minutes: 1140,
            astronomical_dawn_minutes: 330,
            astronomical_dusk_minutes: 1170,
            moon_rise_minutes: None,
            moon_set_minutes: None,
            moon_phase: 0.0,
            valid: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeType {
    #[default]
    Fixed,
    SunriseRelative,
    SunsetRelative,
    SolarNoon,
    CivilDawn,
    CivilDusk,
    NauticalDawn,
    NauticalDusk,
    AstronomicalDawn,
    AstronomicalDusk,
}

impl TimeType {
    pub const ALL: [TimeType; 10] = [
        TimeType::Fixed,
        TimeType::SunriseRelative,
        TimeType::SunsetRelative,
        TimeType::SolarNoon,
        TimeType::CivilDawn,
        TimeType::CivilDusk,
        TimeType::NauticalDawn,
        TimeType::NauticalDusk,
        TimeType::AstronomicalDawn,
        TimeType::AstronomicalDusk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeType::Fixed => "fixed",
            TimeType::SunriseRelative => "sunrise_relative",
            TimeType::SunsetRelative => "sunset_relative",
            TimeType::SolarNoon => "solar_noon",
            TimeType::CivilDawn => "civil_dawn",
            TimeType::CivilDusk => "civil_dusk",
            TimeType::NauticalDawn => "nautical_dawn",
            TimeType::NauticalDusk => "nautical_dusk",
            TimeType::AstronomicalDawn => "astronomical_dawn",
            TimeType::AstronomicalDusk => "astronomical_dusk",
        }
    }

    /// Unrecognised names fall back to `Fixed`.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == name)
            .unwrap_or(TimeType::Fixed)
    }

    pub fn tag(&self) -> u8 {
        match self {
            TimeType::Fixed => 0,
            TimeType::SunriseRelative => 1,
            TimeType::SunsetRelative => 2,
            TimeType::SolarNoon => 3,
            TimeType::CivilDawn => 4,
            TimeType::CivilDusk => 5,
            TimeType::NauticalDawn => 6,
            TimeType::NauticalDusk => 7,
            TimeType::AstronomicalDawn => 8,
            TimeType::AstronomicalDusk => 9,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, TimeType::Fixed)
    }

    /// The event minute this type is anchored to, or `None` for fixed points.
    pub fn anchor_minutes(&self, astro: &AstronomicalTimes) -> Option<u16> {
        match self {
            TimeType::Fixed => None,
            TimeType::SunriseRelative => Some(astro.sunrise_minutes),
            TimeType::SunsetRelative => Some(astro.sunset_minutes),
            TimeType::SolarNoon => Some(astro.solar_noon_minutes),
            TimeType::CivilDawn => Some(astro.civil_dawn_minutes),
            TimeType::CivilDusk => Some(astro.civil_dusk_minutes),
            TimeType::NauticalDawn => Some(astro.nautical_dawn_minutes),
            TimeType::NauticalDusk => Some(astro.nautical_dusk_minutes),
            TimeType::AstronomicalDawn => Some(astro.astronomical_dawn_minutes),
            TimeType::AstronomicalDusk => Some(astro.astronomical_dusk_minutes),
        }
    }
}

impl std::fmt::Display for TimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TimeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TimeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(TimeType::from_name(&name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulePoint {
    pub time_type: TimeType,
    pub time_minutes: u16,
    pub offset_minutes: i16,
    pub pwm_values: Vec<f32>,
    pub current_values: Vec<f32>,
}

impl SchedulePoint {
    pub fn fixed(time_minutes: u16, pwm_values: Vec<f32>, current_values: Vec<f32>) -> Self {
        Self {
            time_type: TimeType::Fixed,
            time_minutes,
            offset_minutes: 0,
            pwm_values,
            current_values,
        }
    }

    pub fn dynamic(
        time_type: TimeType,
        offset_minutes: i16,
        pwm_values: Vec<f32>,
        current_values: Vec<f32>,
    ) -> Self {
        Self {
            time_type,
            time_minutes: 0,
            offset_minutes,
            pwm_values,
            current_values,
        }
    }

    /// Two points occupy the same slot when a new one should replace the old.
    pub fn same_slot(&self, other: &SchedulePoint) -> bool {
        match (self.time_type.is_fixed(), other.time_type.is_fixed()) {
            (true, true) => self.time_minutes == other.time_minutes,
            (false, false) => {
                self.time_type == other.time_type && self.offset_minutes == other.offset_minutes
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationResult {
    pub pwm_values: Vec<f32>,
    pub current_values: Vec<f32>,
    pub valid: bool,
}

impl InterpolationResult {
    pub fn new(pwm_values: Vec<f32>, current_values: Vec<f32>) -> Self {
        Self {
            pwm_values,
            current_values,
            valid: true,
        }
    }

    /// All-zero values that must not be applied.
    pub fn invalid(num_channels: usize) -> Self {
        Self {
            pwm_values: vec![0.0; num_channels],
            current_values: vec![0.0; num_channels],
            valid: false,
        }
    }
}

const DEFAULT_COLORS: [&str; 8] = [
    "#FFFFFF", "#0000FF", "#00FFFF", "#00FF00", "#FF0000", "#FF00FF", "#FFFF00", "#FF8000",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_rgb_hex")]
    pub rgb_hex: String,
    #[serde(default = "default_max_current")]
    pub max_current: f32,
}

fn default_rgb_hex() -> String {
    "#FFFFFF".to_string()
}

fn default_max_current() -> f32 {
    DEFAULT_CHANNEL_MAX_CURRENT
}

impl ChannelConfig {
    pub fn default_for(index: usize) -> Self {
        Self {
            name: format!("Channel {}", index + 1),
            rgb_hex: DEFAULT_COLORS.get(index).copied().unwrap_or("#FFFFFF").to_string(),
            max_current: DEFAULT_CHANNEL_MAX_CURRENT,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::default_for(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoonSimulation {
    pub enabled: bool,
    pub base_intensity: Vec<f32>,
    pub phase_scaling: bool,
}

impl Default for MoonSimulation {
    fn default() -> Self {
        Self {
            enabled: false,
            base_intensity: Vec::new(),
            phase_scaling: true,
        }
    }
}
