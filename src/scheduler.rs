use std::cmp::Ordering;
use std::collections::BTreeMap;

use log::debug;

use crate::angles::wrap_minutes;
use crate::constants::{
    DEFAULT_CHANNELS, DEFAULT_CHANNEL_MAX_CURRENT, MAX_CHANNELS, MAX_CURRENT, MAX_OFFSET_MINUTES,
    MAX_PWM, MAX_TIME_MINUTES, MINUTES_PER_DAY, MIN_CHANNELS, MIN_CHANNEL_MAX_CURRENT,
};
use crate::error::{Error, Result};
use crate::interpolation::{interpolate_fixed, interpolate_wrapped};
use crate::types::{
    AstronomicalTimes, ChannelConfig, InterpolationResult, MoonSimulation, SchedulePoint, TimeType,
};

pub const BUILTIN_PRESETS: [&str; 4] = [
    "sunrise_sunset",
    "dynamic_sunrise_sunset",
    "full_spectrum",
    "simple",
];

const DEFAULT_PRESET_SUNRISE: u16 = 420;
const DEFAULT_PRESET_SUNSET: u16 = 1020;

/// PWM at or below this on every channel counts as dark for moonlight.
const MOONLIGHT_DARK_THRESHOLD: f32 = 0.1;
const MOONLIGHT_CURRENT_RATIO: f32 = 0.02;

/// Multi-channel lighting timeline of fixed and astronomically anchored points.
#[derive(Debug, Clone)]
pub struct LedScheduler {
    num_channels: u8,
    schedule_points: Vec<SchedulePoint>,
    presets: BTreeMap<String, Vec<SchedulePoint>>,
    channel_configs: Vec<ChannelConfig>,
    moon_simulation: MoonSimulation,
    astronomical_times: AstronomicalTimes,
}

impl Default for LedScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNELS)
    }
}

impl LedScheduler {
    /// Channel counts outside `1..=16` are clamped.
    pub fn new(num_channels: u8) -> Self {
        let n = num_channels.clamp(MIN_CHANNELS, MAX_CHANNELS);
        Self {
            num_channels: n,
            schedule_points: Vec::new(),
            presets: BTreeMap::new(),
            channel_configs: (0..n as usize).map(ChannelConfig::default_for).collect(),
            moon_simulation: MoonSimulation {
                base_intensity: vec![0.0; n as usize],
                ..MoonSimulation::default()
            },
            astronomical_times: AstronomicalTimes::default(),
        }
    }

    pub fn num_channels(&self) -> u8 {
        self.num_channels
    }

    /// Resizes every stored point, preset, channel config and moonlight level.
    /// New channels start at zero.
    pub fn set_num_channels(&mut self, num_channels: u8) -> Result<()> {
        if !(MIN_CHANNELS..=MAX_CHANNELS).contains(&num_channels) {
            return Err(Error::InvalidChannelCount(num_channels as usize));
        }
        let n = num_channels as usize;
        self.num_channels = num_channels;

        for point in self.schedule_points.iter_mut() {
            resize_point(point, n);
        }
        for points in self.presets.values_mut() {
            for point in points.iter_mut() {
                resize_point(point, n);
            }
        }

        let old_len = self.channel_configs.len();
        self.channel_configs.truncate(n);
        self.channel_configs
            .extend((old_len..n).map(ChannelConfig::default_for));
        self.moon_simulation.base_intensity.resize(n, 0.0);
        Ok(())
    }

    pub fn validate_point(&self, point: &SchedulePoint) -> Result<()> {
        if point.time_type.is_fixed() {
            if point.time_minutes > MAX_TIME_MINUTES {
                return Err(Error::TimeOutOfRange(point.time_minutes));
            }
        } else if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&point.offset_minutes) {
            return Err(Error::OffsetOutOfRange(point.offset_minutes));
        }

        let n = self.num_channels as usize;
        for values in [&point.pwm_values, &point.current_values] {
            if values.len() != n {
                return Err(Error::ChannelCountMismatch {
                    expected: n,
                    actual: values.len(),
                });
            }
        }
        if let Some(&pwm) = point.pwm_values.iter().find(|v| !(0.0..=MAX_PWM).contains(*v)) {
            return Err(Error::PwmOutOfRange(pwm));
        }
        if let Some(&current) = point
            .current_values
            .iter()
            .find(|v| !(0.0..=MAX_CURRENT).contains(*v))
        {
            return Err(Error::CurrentOutOfRange(current));
        }
        Ok(())
    }

    /// Inserts a point, replacing any point in the same slot. Rejected points leave
    /// the schedule unchanged.
    pub fn add_schedule_point(&mut self, point: SchedulePoint) -> Result<()> {
        if let Err(e) = self.validate_point(&point) {
            debug!("rejected {} schedule point: {}", point.time_type, e);
            return Err(e);
        }
        self.schedule_points.retain(|p| !p.same_slot(&point));
        self.schedule_points.push(point);
        self.sort_schedule_points();
        Ok(())
    }

    pub fn set_schedule_point(
        &mut self,
        time_minutes: u16,
        pwm_values: Vec<f32>,
        current_values: Vec<f32>,
    ) -> Result<()> {
        self.add_schedule_point(SchedulePoint::fixed(time_minutes, pwm_values, current_values))
    }

    /// A `Fixed` type is taken as a fixed point at `offset_minutes` past midnight.
    pub fn add_dynamic_schedule_point(
        &mut self,
        time_type: TimeType,
        offset_minutes: i16,
        pwm_values: Vec<f32>,
        current_values: Vec<f32>,
    ) -> Result<()> {
        if time_type.is_fixed() {
            let time = u16::try_from(offset_minutes)
                .map_err(|_| Error::OffsetOutOfRange(offset_minutes))?;
            return self.set_schedule_point(time, pwm_values, current_values);
        }
        self.add_schedule_point(SchedulePoint::dynamic(
            time_type,
            offset_minutes,
            pwm_values,
            current_values,
        ))
    }

    pub fn remove_schedule_point(&mut self, time_minutes: u16) -> bool {
        let before = self.schedule_points.len();
        self.schedule_points
            .retain(|p| !(p.time_type.is_fixed() && p.time_minutes == time_minutes));
        self.schedule_points.len() != before
    }

    pub fn remove_dynamic_schedule_point(&mut self, time_type: TimeType, offset_minutes: i16) -> bool {
        let before = self.schedule_points.len();
        self.schedule_points.retain(|p| {
            p.time_type.is_fixed() || p.time_type != time_type || p.offset_minutes != offset_minutes
        });
        self.schedule_points.len() != before
    }

    pub fn clear_schedule(&mut self) {
        self.schedule_points.clear();
    }

    /// Stored order: fixed points by time, then dynamic points in insertion order.
    pub fn schedule_points(&self) -> &[SchedulePoint] {
        &self.schedule_points
    }

    pub fn len(&self) -> usize {
        self.schedule_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedule_points.is_empty()
    }

    fn sort_schedule_points(&mut self) {
        self.schedule_points.sort_by(|a, b| {
            match (a.time_type.is_fixed(), b.time_type.is_fixed()) {
                (true, true) => a.time_minutes.cmp(&b.time_minutes),
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => Ordering::Equal,
            }
        });
    }

    /// Swaps in a decoded schedule wholesale.
    pub(crate) fn replace_schedule(&mut self, num_channels: u8, points: Vec<SchedulePoint>) -> Result<()> {
        self.set_num_channels(num_channels)?;
        self.schedule_points = points;
        self.sort_schedule_points();
        Ok(())
    }

    pub fn calculate_dynamic_time(&self, point: &SchedulePoint, astro_times: &AstronomicalTimes) -> u16 {
        match point.time_type.anchor_minutes(astro_times) {
            None => point.time_minutes,
            Some(base) => wrap_minutes(base as i32 + point.offset_minutes as i32),
        }
    }

    /// Copies of the stored points with absolute times, sorted by time. When two
    /// points land on the same minute the one stored first is kept.
    pub fn resolve_dynamic_points(&self, astro_times: &AstronomicalTimes) -> Vec<SchedulePoint> {
        let mut resolved: Vec<SchedulePoint> = self
            .schedule_points
            .iter()
            .map(|p| SchedulePoint {
                time_minutes: self.calculate_dynamic_time(p, astro_times),
                ..p.clone()
            })
            .collect();
        resolved.sort_by_key(|p| p.time_minutes);
        resolved.dedup_by_key(|p| p.time_minutes);
        resolved
    }

    /// Values with the day treated as dark outside the scheduled span. Dynamic points
    /// resolve against the stored astronomical times.
    pub fn get_values_at_time(&self, minutes: u16) -> InterpolationResult {
        let n = self.num_channels as usize;
        if minutes as i32 >= MINUTES_PER_DAY {
            return InterpolationResult::invalid(n);
        }
        let resolved = self.resolve_dynamic_points(&self.astronomical_times);
        interpolate_fixed(&resolved, minutes, n)
    }

    /// Values on a circular timeline, with moonlight applied when configured.
    pub fn get_values_at_time_with_astro(
        &self,
        minutes: u16,
        astro_times: &AstronomicalTimes,
    ) -> InterpolationResult {
        let n = self.num_channels as usize;
        if minutes as i32 >= MINUTES_PER_DAY {
            return InterpolationResult::invalid(n);
        }
        let resolved = self.resolve_dynamic_points(astro_times);
        let result = interpolate_wrapped(&resolved, minutes, n);
        if self.moon_simulation.enabled && astro_times.valid && result.valid {
            return self.apply_moon_simulation(result, minutes, astro_times);
        }
        result
    }

    /// Inside the moonrise..moonset window, which may span midnight. A missing
    /// set runs to midnight and a missing rise starts at midnight.
    pub fn is_moon_visible(&self, minutes: u16, astro_times: &AstronomicalTimes) -> bool {
        match (astro_times.moon_rise_minutes, astro_times.moon_set_minutes) {
            (Some(rise), Some(set)) if rise < set => minutes >= rise && minutes <= set,
            (Some(rise), Some(set)) => minutes >= rise || minutes <= set,
            (Some(rise), None) => minutes >= rise,
            (None, Some(set)) => minutes <= set,
            (None, None) => false,
        }
    }

    fn apply_moon_simulation(
        &self,
        mut result: InterpolationResult,
        minutes: u16,
        astro_times: &AstronomicalTimes,
    ) -> InterpolationResult {
        if !self.is_moon_visible(minutes, astro_times) {
            return result;
        }
        if result.pwm_values.iter().any(|&v| v > MOONLIGHT_DARK_THRESHOLD) {
            return result;
        }

        let phase = astro_times.moon_phase;
        let brightness = 2.0 * phase.min(1.0 - phase);
        for (i, &base) in self.moon_simulation.base_intensity.iter().enumerate() {
            let level = if self.moon_simulation.phase_scaling {
                base * brightness
            } else {
                base
            };
            if let (Some(pwm), Some(current)) =
                (result.pwm_values.get_mut(i), result.current_values.get_mut(i))
            {
                *pwm = level;
                *current = level * MOONLIGHT_CURRENT_RATIO;
            }
        }
        result
    }

    pub fn moon_simulation(&self) -> &MoonSimulation {
        &self.moon_simulation
    }

    pub fn set_moon_simulation(&mut self, mut config: MoonSimulation) {
        config.base_intensity.resize(self.num_channels as usize, 0.0);
        self.moon_simulation = config;
    }

    pub fn enable_moon_simulation(&mut self, enabled: bool) {
        self.moon_simulation.enabled = enabled;
    }

    pub fn set_moon_base_intensity(&mut self, mut intensity: Vec<f32>) {
        intensity.resize(self.num_channels as usize, 0.0);
        self.moon_simulation.base_intensity = intensity;
    }

    pub fn set_astronomical_times(&mut self, times: AstronomicalTimes) {
        self.astronomical_times = times;
    }

    pub fn astronomical_times(&self) -> &AstronomicalTimes {
        &self.astronomical_times
    }

    pub fn channel_configs(&self) -> &[ChannelConfig] {
        &self.channel_configs
    }

    pub fn channel_config(&self, channel: usize) -> Option<&ChannelConfig> {
        self.channel_configs.get(channel)
    }

    /// Returns false when `channel` is out of range.
    pub fn set_channel_config(&mut self, channel: usize, mut config: ChannelConfig) -> bool {
        match self.channel_configs.get_mut(channel) {
            Some(slot) => {
                config.max_current = clamp_max_current(config.max_current);
                *slot = config;
                true
            }
            None => false,
        }
    }

    pub fn set_channel_max_current(&mut self, channel: usize, max_current: f32) -> bool {
        match self.channel_configs.get_mut(channel) {
            Some(config) => {
                config.max_current = clamp_max_current(max_current);
                true
            }
            None => false,
        }
    }

    pub fn set_channel_color(&mut self, channel: usize, rgb_hex: &str) -> bool {
        match self.channel_configs.get_mut(channel) {
            Some(config) => {
                config.rgb_hex = rgb_hex.to_string();
                true
            }
            None => false,
        }
    }

    pub fn channel_max_current(&self, channel: usize) -> f32 {
        self.channel_configs
            .get(channel)
            .map_or(DEFAULT_CHANNEL_MAX_CURRENT, |c| c.max_current)
    }

    pub fn load_preset(&mut self, name: &str) -> Result<()> {
        match name {
            "sunrise_sunset" => {
                self.create_sunrise_sunset_preset(DEFAULT_PRESET_SUNRISE, DEFAULT_PRESET_SUNSET)
            }
            "dynamic_sunrise_sunset" => self.create_dynamic_sunrise_sunset_preset(),
            "full_spectrum" => self.create_full_spectrum_preset(),
            "simple" => self.create_simple_preset(),
            _ => {
                let points = self
                    .presets
                    .get(name)
                    .ok_or_else(|| Error::UnknownPreset(name.to_string()))?;
                self.schedule_points = points.clone();
                self.sort_schedule_points();
            }
        }
        debug!("loaded preset {} with {} points", name, self.schedule_points.len());
        Ok(())
    }

    pub fn save_preset(&mut self, name: &str) {
        self.presets
            .insert(name.to_string(), self.schedule_points.clone());
    }

    pub fn delete_preset(&mut self, name: &str) -> bool {
        self.presets.remove(name).is_some()
    }

    /// Built-ins first, then saved presets by name.
    pub fn preset_names(&self) -> Vec<String> {
        BUILTIN_PRESETS
            .iter()
            .map(|s| s.to_string())
            .chain(self.presets.keys().cloned())
            .collect()
    }

    fn uniform(&self, value: f32) -> Vec<f32> {
        vec![value; self.num_channels as usize]
    }

    fn add_preset_point(&mut self, point: SchedulePoint) {
        // out-of-range preset points (e.g. past midnight) are skipped
        let _ = self.add_schedule_point(point);
    }

    pub fn create_sunrise_sunset_preset(&mut self, sunrise_minutes: u16, sunset_minutes: u16) {
        self.clear_schedule();
        let noon = if sunset_minutes > sunrise_minutes {
            (sunrise_minutes + sunset_minutes) / 2
        } else {
            720
        };
        let points = [
            (sunrise_minutes, 20.0, 0.3),
            (noon, 85.0, 1.8),
            (sunset_minutes, 15.0, 0.2),
            (sunset_minutes.saturating_add(60), 0.0, 0.0),
        ];
        for (time, pwm, current) in points {
            let point = SchedulePoint::fixed(time, self.uniform(pwm), self.uniform(current));
            self.add_preset_point(point);
        }
    }

    pub fn create_dynamic_sunrise_sunset_preset(&mut self) {
        self.clear_schedule();
        let points = [
            (TimeType::SunriseRelative, -30, 5.0, 0.1),
            (TimeType::SunriseRelative, 0, 20.0, 0.3),
            (TimeType::SunriseRelative, 30, 50.0, 1.0),
            (TimeType::SolarNoon, 0, 85.0, 1.8),
            (TimeType::SunsetRelative, -30, 50.0, 1.0),
            (TimeType::SunsetRelative, 0, 20.0, 0.3),
            (TimeType::SunsetRelative, 30, 5.0, 0.1),
        ];
        for (time_type, offset, pwm, current) in points {
            let point =
                SchedulePoint::dynamic(time_type, offset, self.uniform(pwm), self.uniform(current));
            self.add_preset_point(point);
        }
    }

    pub fn create_full_spectrum_preset(&mut self) {
        self.clear_schedule();
        let n = self.num_channels as usize;
        let points: [(u16, [f32; 8], [f32; 8]); 4] = [
            (
                480,
                [40.0, 60.0, 80.0, 100.0, 80.0, 60.0, 40.0, 20.0],
                [0.6, 1.0, 1.5, 2.0, 1.5, 1.0, 0.6, 0.3],
            ),
            (
                720,
                [80.0, 100.0, 100.0, 100.0, 100.0, 100.0, 80.0, 60.0],
                [1.5, 2.0, 2.0, 2.0, 2.0, 2.0, 1.5, 1.0],
            ),
            (
                960,
                [60.0, 80.0, 100.0, 100.0, 80.0, 60.0, 40.0, 30.0],
                [1.0, 1.5, 2.0, 2.0, 1.5, 1.0, 0.6, 0.4],
            ),
            (
                1200,
                [20.0, 30.0, 40.0, 60.0, 40.0, 30.0, 20.0, 10.0],
                [0.3, 0.4, 0.6, 1.0, 0.6, 0.4, 0.3, 0.1],
            ),
        ];
        for (time, pwm, current) in points {
            let point = SchedulePoint::fixed(time, fit_channels(&pwm, n), fit_channels(&current, n));
            self.add_preset_point(point);
        }
    }

    pub fn create_simple_preset(&mut self) {
        self.clear_schedule();
        let on = SchedulePoint::fixed(480, self.uniform(70.0), self.uniform(1.2));
        let off = SchedulePoint::fixed(1200, self.uniform(0.0), self.uniform(0.0));
        self.add_preset_point(on);
        self.add_preset_point(off);
    }
}

fn resize_point(point: &mut SchedulePoint, num_channels: usize) {
    point.pwm_values.resize(num_channels, 0.0);
    point.current_values.resize(num_channels, 0.0);
}

fn clamp_max_current(max_current: f32) -> f32 {
    max_current.clamp(MIN_CHANNEL_MAX_CURRENT, MAX_CURRENT)
}

/// Truncates or extends with the last value.
fn fit_channels(values: &[f32], num_channels: usize) -> Vec<f32> {
    let last = values.last().copied().unwrap_or(0.0);
    let mut fitted: Vec<f32> = values.iter().copied().take(num_channels).collect();
    fitted.resize(num_channels, last);
    fitted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_channels_repeats_last_value() {
        assert_eq!(fit_channels(&[1.0, 2.0], 4), vec![1.0, 2.0, 2.0, 2.0]);
        assert_eq!(fit_channels(&[1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
    }

    #[test]
    fn fixed_points_sort_before_dynamic() {
        let mut s = LedScheduler::new(1);
        s.add_dynamic_schedule_point(TimeType::SunsetRelative, 0, vec![1.0], vec![0.1])
            .unwrap();
        s.set_schedule_point(900, vec![2.0], vec![0.2]).unwrap();
        s.set_schedule_point(100, vec![3.0], vec![0.3]).unwrap();
        let kinds: Vec<(TimeType, u16)> = s
            .schedule_points()
            .iter()
            .map(|p| (p.time_type, p.time_minutes))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (TimeType::Fixed, 100),
                (TimeType::Fixed, 900),
                (TimeType::SunsetRelative, 0)
            ]
        );
    }

    #[test]
    fn moon_window_spanning_midnight() {
        let s = LedScheduler::new(1);
        let astro = AstronomicalTimes {
            moon_rise_minutes: Some(1300),
            moon_set_minutes: Some(400),
            ..AstronomicalTimes::default()
        };
        assert!(s.is_moon_visible(1350, &astro));
        assert!(s.is_moon_visible(100, &astro));
        assert!(!s.is_moon_visible(800, &astro));
        assert!(!s.is_moon_visible(100, &AstronomicalTimes::default()));
    }
}
