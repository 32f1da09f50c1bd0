use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use log::{debug, info, trace, warn};
use serde_json::Value;

use crate::angles::format_minutes;
use crate::calculator::AstronomicalCalculator;
use crate::codec::SerializedSchedule;
use crate::config::ControllerConfig;
use crate::constants::MAX_TIME_MINUTES;
use crate::error::Result;
use crate::scheduler::LedScheduler;
use crate::types::{
    AstronomicalTimes, DateTime, InterpolationResult, MoonTimes, ProjectionSettings,
    SchedulePoint, SunTimes, TimeType,
};

/// Storage key of the persisted schedule blob.
pub const SCHEDULE_STORAGE_KEY: u32 = 0x1234_5678;

const PWM_CHANGE_THRESHOLD: f32 = 0.001;
const CURRENT_CHANGE_THRESHOLD: f32 = 0.01;
const FALLBACK_SUNRISE: u16 = 420;
const FALLBACK_SUNSET: u16 = 1080;

pub trait TimeSource {
    /// Local civil time, or `None` when the clock is not yet valid.
    fn now(&self) -> Option<DateTime>;
}

pub trait ScheduleStore {
    fn save(&mut self, key: u32, data: &[u8]) -> Result<()>;
    fn load(&self, key: u32) -> Result<Option<Vec<u8>>>;
}

pub trait ChannelOutput {
    /// Brightness as a fraction in `[0, 1]`.
    fn apply_pwm(&mut self, channel: usize, fraction: f32);
    fn apply_current(&mut self, channel: usize, amps: f32);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Option<DateTime> {
        Some(DateTime::from_chrono(&chrono::Local::now()))
    }
}

/// Manually driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct FixedTimeSource {
    time: Rc<Cell<Option<DateTime>>>,
}

impl FixedTimeSource {
    pub fn new(time: Option<DateTime>) -> Self {
        Self {
            time: Rc::new(Cell::new(time)),
        }
    }

    pub fn set(&self, time: Option<DateTime>) {
        self.time.set(time);
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Option<DateTime> {
        self.time.get()
    }
}

/// In-process store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Rc<RefCell<HashMap<u32, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: u32) -> Option<Vec<u8>> {
        self.blobs.borrow().get(&key).cloned()
    }
}

impl ScheduleStore for MemoryStore {
    fn save(&mut self, key: u32, data: &[u8]) -> Result<()> {
        self.blobs.borrow_mut().insert(key, data.to_vec());
        Ok(())
    }

    fn load(&self, key: u32) -> Result<Option<Vec<u8>>> {
        Ok(self.get(key))
    }
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: u32) -> PathBuf {
        self.dir.join(format!("{:08x}.bin", key))
    }
}

impl ScheduleStore for FileStore {
    fn save(&mut self, key: u32, data: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), data)?;
        Ok(())
    }

    fn load(&self, key: u32) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read(path)?))
    }
}

/// Ties the clock, the ephemeris and the schedule to the channel outputs.
pub struct LedBrickController {
    config: ControllerConfig,
    calculator: AstronomicalCalculator,
    scheduler: LedScheduler,
    time_source: Box<dyn TimeSource>,
    store: Box<dyn ScheduleStore>,
    output: Box<dyn ChannelOutput>,
    astro_date: Option<DateTime>,
    last_pwm: Vec<Option<f32>>,
    last_current: Vec<Option<f32>>,
}

impl LedBrickController {
    pub fn new(
        config: ControllerConfig,
        time_source: Box<dyn TimeSource>,
        store: Box<dyn ScheduleStore>,
        output: Box<dyn ChannelOutput>,
    ) -> Result<Self> {
        config.validate()?;
        let mut calculator = AstronomicalCalculator::new(config.latitude, config.longitude)
            .with_timezone_offset(config.effective_timezone_offset());
        calculator.set_projection_settings(config.projection);
        let scheduler = LedScheduler::new(config.num_channels);
        Ok(Self {
            config,
            calculator,
            scheduler,
            time_source,
            store,
            output,
            astro_date: None,
            last_pwm: Vec::new(),
            last_current: Vec::new(),
        })
    }

    /// Restores the persisted schedule, or seeds a sunrise/sunset schedule from
    /// today's sun times and persists it.
    pub fn setup(&mut self) {
        info!(
            "setting up scheduler at {:.4},{:.4} with {} channels",
            self.config.latitude, self.config.longitude, self.config.num_channels
        );
        self.load_schedule();

        if self.scheduler.is_empty() {
            info!("no saved schedule found, loading default preset");
            self.create_sunrise_sunset_preset_from_sun();
            self.persist();
        }
    }

    fn load_schedule(&mut self) {
        let bytes = match self.store.load(SCHEDULE_STORAGE_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no saved schedule in storage");
                return;
            }
            Err(e) => {
                warn!("failed to read saved schedule: {}", e);
                return;
            }
        };
        let loaded = SerializedSchedule::from_bytes(&bytes)
            .and_then(|serialized| self.scheduler.deserialize(&serialized));
        match loaded {
            Ok(()) => info!("loaded {} schedule points from storage", self.scheduler.len()),
            Err(e) => warn!("failed to deserialize saved schedule: {}", e),
        }
    }

    pub fn save_schedule(&mut self) -> Result<()> {
        let bytes = self.scheduler.serialize().to_bytes();
        self.store.save(SCHEDULE_STORAGE_KEY, &bytes)?;
        debug!(
            "saved schedule ({} points, {} bytes)",
            self.scheduler.len(),
            bytes.len()
        );
        Ok(())
    }

    fn persist(&mut self) {
        if let Err(e) = self.save_schedule() {
            warn!("failed to save schedule: {}", e);
        }
    }

    /// One control-loop step. Returns the values computed for this instant; they
    /// are applied only when valid and the controller is enabled.
    pub fn tick(&mut self) -> InterpolationResult {
        if !self.config.enabled {
            trace!("scheduler disabled, skipping update");
            return InterpolationResult::invalid(self.scheduler.num_channels() as usize);
        }
        let now = self.now();
        self.refresh_astronomical_times(&now);

        let minutes = now.minutes_of_day();
        let values = self
            .scheduler
            .get_values_at_time_with_astro(minutes, self.scheduler.astronomical_times());
        if values.valid {
            self.apply_values(&values);
        }
        trace!(
            "scheduler at {}: ch1 pwm={:.1}% current={:.2}A",
            format_minutes(minutes),
            values.pwm_values.first().copied().unwrap_or(0.0),
            values.current_values.first().copied().unwrap_or(0.0)
        );
        values
    }

    fn refresh_astronomical_times(&mut self, now: &DateTime) {
        if self.astro_date.is_some_and(|d| d.same_date(now)) {
            return;
        }
        let times = self.compute_astronomical_times(now);
        debug!(
            "astronomical times: sunrise {}, sunset {}, noon {}",
            format_minutes(times.sunrise_minutes),
            format_minutes(times.sunset_minutes),
            format_minutes(times.solar_noon_minutes)
        );
        if times.moon_rise_minutes.is_some() || times.moon_set_minutes.is_some() {
            debug!(
                "moon: rise {:?}, set {:?}, phase {:.1}%",
                times.moon_rise_minutes,
                times.moon_set_minutes,
                times.moon_phase * 100.0
            );
        }
        self.scheduler.set_astronomical_times(times);
        self.astro_date = Some(now.start_of_day());
    }

    /// Sun events for `dt`'s date with twilight bands approximated as fixed
    /// 30-minute steps beyond sunrise and sunset.
    pub fn compute_astronomical_times(&self, dt: &DateTime) -> AstronomicalTimes {
        let sun = if self.config.projection.enabled {
            self.calculator.get_projected_sun_rise_set_times(dt)
        } else {
            self.calculator.get_sun_rise_set_times(dt)
        };
        let moon = self.calculator.get_moon_rise_set_times(dt);

        let solar_noon = match (sun.rise_minutes, sun.set_minutes) {
            (Some(rise), Some(set)) if set > rise => (rise + set) / 2,
            _ => 720,
        };
        let civil_dawn = sun.rise_minutes.map_or(390, |r| r.saturating_sub(30));
        let civil_dusk = sun.set_minutes.map_or(1110, |s| (s + 30).min(MAX_TIME_MINUTES));

        AstronomicalTimes {
            sunrise_minutes: sun.rise_minutes.unwrap_or(FALLBACK_SUNRISE),
            sunset_minutes: sun.set_minutes.unwrap_or(FALLBACK_SUNSET),
            solar_noon_minutes: solar_noon,
            civil_dawn_minutes: civil_dawn,
            civil_dusk_minutes: civil_dusk,
            nautical_dawn_minutes: civil_dawn.saturating_sub(30),
            nautical_dusk_minutes: (civil_dusk + 30).min(MAX_TIME_MINUTES),
            astronomical_dawn_minutes: civil_dawn.saturating_sub(60),
            astronomical_dusk_minutes: (civil_dusk + 60).min(MAX_TIME_MINUTES),
            moon_rise_minutes: moon.rise_minutes,
            moon_set_minutes: moon.set_minutes,
            moon_phase: self.calculator.get_moon_phase(dt),
            valid: true,
        }
    }

    fn apply_values(&mut self, values: &InterpolationResult) {
        let n = self.scheduler.num_channels() as usize;
        self.last_pwm.resize(n, None);
        self.last_current.resize(n, None);

        for channel in 0..n {
            if let Some(&pwm) = values.pwm_values.get(channel) {
                let fraction = (pwm * self.config.pwm_scale / 100.0).clamp(0.0, 1.0);
                if self.last_pwm[channel]
                    .map_or(true, |last| (fraction - last).abs() > PWM_CHANGE_THRESHOLD)
                {
                    self.output.apply_pwm(channel, fraction);
                    self.last_pwm[channel] = Some(fraction);
                    trace!("channel {} brightness {:.3}", channel, fraction);
                }
            }
            if let Some(&current) = values.current_values.get(channel) {
                let limited = current.min(self.scheduler.channel_max_current(channel));
                if self.last_current[channel]
                    .map_or(true, |last| (limited - last).abs() > CURRENT_CHANGE_THRESHOLD)
                {
                    self.output.apply_current(channel, limited);
                    self.last_current[channel] = Some(limited);
                    trace!("channel {} current {:.3}A (requested {:.3}A)", channel, limited, current);
                }
            }
        }
    }

    /// Current local time; midnight on 2025-01-01 when no valid time is available.
    pub fn now(&self) -> DateTime {
        match self.time_source.now() {
            Some(dt) => dt,
            None => {
                warn!("time source not available");
                DateTime::default()
            }
        }
    }

    pub fn current_time_minutes(&self) -> u16 {
        self.now().minutes_of_day()
    }

    /// Fade-to-dark interpolation of the stored schedule at the current time.
    pub fn get_current_values(&self) -> InterpolationResult {
        self.scheduler.get_values_at_time(self.current_time_minutes())
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn pwm_scale(&self) -> f32 {
        self.config.pwm_scale
    }

    /// Clamped to `[0, 1]`; a real change is applied immediately.
    pub fn set_pwm_scale(&mut self, scale: f32) {
        let scale = scale.clamp(0.0, 1.0);
        if (self.config.pwm_scale - scale).abs() > PWM_CHANGE_THRESHOLD {
            self.config.pwm_scale = scale;
            info!("PWM scale set to {:.2} ({:.0}%)", scale, scale * 100.0);
            self.tick();
        }
    }

    pub fn set_location(&mut self, latitude: f64, longitude: f64) {
        self.config.latitude = latitude;
        self.config.longitude = longitude;
        self.calculator.set_location(latitude, longitude);
        self.calculator
            .set_timezone_offset(self.config.effective_timezone_offset());
        self.astro_date = None;
    }

    pub fn set_timezone_offset(&mut self, hours: Option<f64>) {
        self.config.timezone_offset_hours = hours;
        self.calculator
            .set_timezone_offset(self.config.effective_timezone_offset());
        self.astro_date = None;
    }

    pub fn set_projection(&mut self, projection: ProjectionSettings) {
        self.config.projection = projection;
        self.calculator.set_projection_settings(projection);
        self.astro_date = None;
    }

    pub fn calculator(&self) -> &AstronomicalCalculator {
        &self.calculator
    }

    pub fn scheduler(&self) -> &LedScheduler {
        &self.scheduler
    }

    /// Direct access for settings that are not persisted, such as channel configs
    /// and moonlight. Schedule changes made here are not saved automatically.
    pub fn scheduler_mut(&mut self) -> &mut LedScheduler {
        &mut self.scheduler
    }

    pub fn astronomical_times(&self) -> &AstronomicalTimes {
        self.scheduler.astronomical_times()
    }

    pub fn add_schedule_point(&mut self, point: SchedulePoint) -> Result<()> {
        let label = describe_point(&point);
        self.scheduler.add_schedule_point(point)?;
        self.persist();
        debug!("added schedule point {}", label);
        Ok(())
    }

    pub fn set_schedule_point(
        &mut self,
        time_minutes: u16,
        pwm_values: Vec<f32>,
        current_values: Vec<f32>,
    ) -> Result<()> {
        self.scheduler
            .set_schedule_point(time_minutes, pwm_values, current_values)?;
        self.persist();
        debug!("set schedule point at {}", format_minutes(time_minutes));
        Ok(())
    }

    pub fn add_dynamic_schedule_point(
        &mut self,
        time_type: TimeType,
        offset_minutes: i16,
        pwm_values: Vec<f32>,
        current_values: Vec<f32>,
    ) -> Result<()> {
        self.scheduler
            .add_dynamic_schedule_point(time_type, offset_minutes, pwm_values, current_values)?;
        self.persist();
        debug!("added dynamic schedule point {} {:+}", time_type, offset_minutes);
        Ok(())
    }

    pub fn remove_schedule_point(&mut self, time_minutes: u16) -> bool {
        let removed = self.scheduler.remove_schedule_point(time_minutes);
        self.persist();
        debug!("removed schedule point at {}", format_minutes(time_minutes));
        removed
    }

    pub fn remove_dynamic_schedule_point(&mut self, time_type: TimeType, offset_minutes: i16) -> bool {
        let removed = self
            .scheduler
            .remove_dynamic_schedule_point(time_type, offset_minutes);
        self.persist();
        debug!("removed dynamic schedule point {} {:+}", time_type, offset_minutes);
        removed
    }

    pub fn clear_schedule(&mut self) {
        self.scheduler.clear_schedule();
        self.persist();
        debug!("cleared all schedule points");
    }

    /// `sunrise_sunset` is built from today's computed sun times rather than fixed defaults.
    pub fn load_preset(&mut self, name: &str) -> Result<()> {
        if name == "sunrise_sunset" {
            self.create_sunrise_sunset_preset_from_sun();
        } else {
            self.scheduler.load_preset(name)?;
        }
        self.persist();
        info!("loaded preset '{}' with {} points", name, self.scheduler.len());
        Ok(())
    }

    pub fn save_preset(&mut self, name: &str) {
        self.scheduler.save_preset(name);
        info!("saved current schedule as preset '{}'", name);
    }

    fn create_sunrise_sunset_preset_from_sun(&mut self) {
        let sun = self.get_projected_sun_rise_set_times();
        let sunrise = sun.rise_minutes.unwrap_or(FALLBACK_SUNRISE);
        let sunset = sun.set_minutes.unwrap_or(FALLBACK_SUNSET);
        info!(
            "creating sunrise/sunset preset: sunrise={}, sunset={}",
            format_minutes(sunrise),
            format_minutes(sunset)
        );
        self.scheduler.create_sunrise_sunset_preset(sunrise, sunset);
    }

    /// Schedule export plus controller state.
    pub fn export_json(&self) -> Result<String> {
        let mut value = self.scheduler.to_json_value()?;
        if let Value::Object(map) = &mut value {
            map.insert(
                "timezone_offset_hours".to_string(),
                Value::from(self.calculator.timezone_offset_hours()),
            );
            map.insert(
                "current_time_minutes".to_string(),
                Value::from(self.current_time_minutes()),
            );
            map.insert("enabled".to_string(), Value::from(self.config.enabled));
        }
        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// Imports a schedule document, honouring its `enabled` flag, and persists it.
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        info!("importing schedule from JSON ({} chars)", json.len());
        let value: Value = serde_json::from_str(json)?;
        match self.scheduler.import_json_value(&value) {
            Ok(count) => {
                if let Some(enabled) = value.get("enabled").and_then(Value::as_bool) {
                    self.config.enabled = enabled;
                }
                self.persist();
                info!(
                    "imported {} schedule points, enabled={}",
                    count, self.config.enabled
                );
                Ok(count)
            }
            Err(e) => {
                warn!("failed to import JSON schedule: {}", e);
                Err(e)
            }
        }
    }

    pub fn get_moon_phase(&self) -> f32 {
        self.calculator.get_moon_phase(&self.now())
    }

    pub fn get_moon_rise_set_times(&self) -> MoonTimes {
        self.calculator.get_moon_rise_set_times(&self.now())
    }

    pub fn get_sun_rise_set_times(&self) -> SunTimes {
        self.calculator.get_sun_rise_set_times(&self.now())
    }

    pub fn get_projected_sun_rise_set_times(&self) -> SunTimes {
        self.calculator.get_projected_sun_rise_set_times(&self.now())
    }

    pub fn get_sun_intensity(&self) -> f32 {
        self.calculator.get_sun_intensity(&self.now())
    }

    pub fn get_moon_intensity(&self) -> f32 {
        self.calculator.get_moon_intensity(&self.now())
    }

    pub fn get_projected_sun_intensity(&self) -> f32 {
        self.calculator.get_projected_sun_intensity(&self.now())
    }

    pub fn get_projected_moon_intensity(&self) -> f32 {
        self.calculator.get_projected_moon_intensity(&self.now())
    }
}

fn describe_point(point: &SchedulePoint) -> String {
    if point.time_type.is_fixed() {
        format!("at {}", format_minutes(point.time_minutes))
    } else {
        format!("{} {:+}", point.time_type, point.offset_minutes)
    }
}
