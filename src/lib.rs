pub mod angles;
pub mod calculator;
pub mod codec;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod interpolation;
pub mod json;
pub mod lunar;
pub mod riseset;
pub mod scheduler;
pub mod solar;
pub mod types;

pub use angles::{
    deg_to_rad, format_minutes, julian_centuries, julian_day, minutes_to_time, normalize_angle,
    rad_to_deg, time_to_minutes, wrap_minutes,
};

pub use calculator::AstronomicalCalculator;

pub use codec::SerializedSchedule;

pub use config::ControllerConfig;

pub use controller::{
    ChannelOutput, FileStore, FixedTimeSource, LedBrickController, MemoryStore, ScheduleStore,
    SystemTimeSource, TimeSource, SCHEDULE_STORAGE_KEY,
};

pub use error::{Error, Result};

pub use interpolation::{find_bracketing_entries, interpolate_linear, HasMinutes};

pub use scheduler::{LedScheduler, BUILTIN_PRESETS};

pub use types::{
    AstronomicalTimes, CelestialPosition, ChannelConfig, DateTime, InterpolationResult,
    MoonSimulation, MoonTimes, ProjectionSettings, RiseSetTimes, SchedulePoint, SunTimes,
    TimeType,
};
