use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::angles::format_minutes;
use crate::constants::{MAX_CHANNELS, MIN_CHANNELS};
use crate::error::{Error, Result};
use crate::scheduler::LedScheduler;
use crate::types::{AstronomicalTimes, ChannelConfig, MoonSimulation, TimeType};

#[derive(Serialize)]
struct ScheduleExport<'a> {
    num_channels: u8,
    astronomical_times: &'a AstronomicalTimes,
    channel_configs: &'a [ChannelConfig],
    schedule_points: Vec<PointExport>,
    moon_simulation: &'a MoonSimulation,
}

#[derive(Serialize)]
struct PointExport {
    time_type: TimeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset_minutes: Option<i16>,
    time_minutes: u16,
    time_formatted: String,
    pwm_values: Vec<f32>,
    current_values: Vec<f32>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ScheduleImport {
    num_channels: Option<u8>,
    channel_configs: Vec<ChannelConfigPatch>,
    schedule_points: Option<Vec<PointImport>>,
    moon_simulation: Option<MoonSimulation>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ChannelConfigPatch {
    name: Option<String>,
    rgb_hex: Option<String>,
    max_current: Option<f32>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PointImport {
    time_type: TimeType,
    offset_minutes: i32,
    time_minutes: u32,
    pwm_values: Vec<f32>,
    current_values: Vec<f32>,
}

impl LedScheduler {
    fn export(&self) -> ScheduleExport<'_> {
        let astro = self.astronomical_times();
        let schedule_points = self
            .schedule_points()
            .iter()
            .map(|p| {
                let time = self.calculate_dynamic_time(p, astro);
                PointExport {
                    time_type: p.time_type,
                    offset_minutes: (!p.time_type.is_fixed()).then_some(p.offset_minutes),
                    time_minutes: time,
                    time_formatted: format_minutes(time),
                    pwm_values: p.pwm_values.clone(),
                    current_values: p.current_values.clone(),
                }
            })
            .collect();
        ScheduleExport {
            num_channels: self.num_channels(),
            astronomical_times: astro,
            channel_configs: self.channel_configs(),
            schedule_points,
            moon_simulation: self.moon_simulation(),
        }
    }

    /// Dynamic points carry their offset and the time they resolve to against the
    /// stored astronomical times.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    pub fn export_json_minified(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.export())?)
    }

    pub fn to_json_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.export())?)
    }

    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        let value: Value = serde_json::from_str(json)?;
        self.import_json_value(&value)
    }

    /// Replaces the schedule with the document's points and returns how many were
    /// accepted. Value arrays are fitted to the channel count; points that still fail
    /// validation are skipped. A rejected document leaves the scheduler untouched.
    pub fn import_json_value(&mut self, value: &Value) -> Result<usize> {
        let doc = ScheduleImport::deserialize(value)?;
        if let Some(n) = doc.num_channels {
            if !(MIN_CHANNELS..=MAX_CHANNELS).contains(&n) {
                return Err(Error::InvalidChannelCount(n as usize));
            }
        }

        let mut staged = self.clone();
        let count = staged.apply_import(doc)?;
        *self = staged;
        Ok(count)
    }

    fn apply_import(&mut self, doc: ScheduleImport) -> Result<usize> {
        self.clear_schedule();
        if let Some(n) = doc.num_channels {
            self.set_num_channels(n)?;
        }
        let n = self.num_channels() as usize;

        for (channel, patch) in doc.channel_configs.into_iter().enumerate().take(n) {
            let mut config = self
                .channel_config(channel)
                .cloned()
                .unwrap_or_else(|| ChannelConfig::default_for(channel));
            if let Some(name) = patch.name {
                config.name = name;
            }
            if let Some(rgb_hex) = patch.rgb_hex {
                config.rgb_hex = rgb_hex;
            }
            if let Some(max_current) = patch.max_current {
                config.max_current = max_current;
            }
            self.set_channel_config(channel, config);
        }

        for point in doc.schedule_points.unwrap_or_default() {
            if point.pwm_values.is_empty() || point.current_values.is_empty() {
                continue;
            }
            let mut pwm = point.pwm_values;
            let mut current = point.current_values;
            pwm.resize(n, 0.0);
            current.resize(n, 0.0);

            let added = if point.time_type.is_fixed() {
                u16::try_from(point.time_minutes)
                    .map_err(|_| Error::TimeOutOfRange(u16::MAX))
                    .and_then(|t| self.set_schedule_point(t, pwm, current))
            } else {
                i16::try_from(point.offset_minutes)
                    .map_err(|_| Error::OffsetOutOfRange(i16::MAX))
                    .and_then(|o| self.add_dynamic_schedule_point(point.time_type, o, pwm, current))
            };
            if let Err(e) = added {
                debug!("skipping imported point: {}", e);
            }
        }

        if let Some(moon) = doc.moon_simulation {
            self.set_moon_simulation(moon);
        }

        if self.is_empty() {
            return Err(Error::EmptySchedule);
        }
        Ok(self.len())
    }
}
