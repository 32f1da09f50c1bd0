pub const J2000_EPOCH: f64 = 2451545.0;
pub const DAYS_PER_CENTURY: f64 = 36525.0;

pub const MINUTES_PER_DAY: i32 = 1440;
pub const MAX_TIME_MINUTES: u16 = 1439;
pub const MAX_OFFSET_MINUTES: i16 = 1439;

/// Atmospheric refraction at the horizon, 34 arcminutes.
pub const REFRACTION_AT_HORIZON: f64 = 34.0 / 60.0;
pub const SUN_SEMI_DIAMETER: f64 = 16.0 / 60.0;
pub const MOON_SEMI_DIAMETER: f64 = 15.5 / 60.0;

/// Altitude of the sun's centre when its upper limb touches the apparent horizon.
pub const SUN_RISE_SET_ALTITUDE: f64 = -(REFRACTION_AT_HORIZON + SUN_SEMI_DIAMETER);
pub const MOON_RISE_SET_ALTITUDE: f64 = -(REFRACTION_AT_HORIZON + MOON_SEMI_DIAMETER);

pub const MEAN_OBLIQUITY_J2000: f64 = 23.439;

pub const SUN_SCAN_STEP_MINUTES: i32 = 15;
pub const SUN_SCAN_MIDPOINT_BACKOFF: i32 = 7;
pub const MOON_SCAN_STEP_MINUTES: i32 = 5;
pub const MOON_SCAN_START_MINUTES: i32 = -12 * 60;
pub const MOON_SCAN_END_MINUTES: i32 = 36 * 60;

pub const MIN_CHANNELS: u8 = 1;
pub const MAX_CHANNELS: u8 = 16;
pub const DEFAULT_CHANNELS: u8 = 8;
pub const MAX_PWM: f32 = 100.0;
pub const MAX_CURRENT: f32 = 5.0;
pub const MIN_CHANNEL_MAX_CURRENT: f32 = 0.1;
pub const DEFAULT_CHANNEL_MAX_CURRENT: f32 = 2.0;
