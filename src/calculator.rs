use crate::angles::julian_day;
use crate::constants::{MINUTES_PER_DAY, MOON_RISE_SET_ALTITUDE, SUN_RISE_SET_ALTITUDE};
use crate::lunar::{moon_intensity, moon_phase_at, moon_position};
use crate::riseset::{scan_moon, scan_sun};
use crate::solar::{sun_intensity_from_altitude, sun_position};
use crate::types::{CelestialPosition, DateTime, MoonTimes, ProjectionSettings, SunTimes};

/// Sun and moon ephemeris for one observer. Civil times passed in are local to
/// `timezone_offset_hours`, which defaults to the longitude-derived offset.
#[derive(Debug, Clone, PartialEq)]
pub struct AstronomicalCalculator {
    latitude: f64,
    longitude: f64,
    timezone_offset_hours: f64,
    projection: ProjectionSettings,
}

impl AstronomicalCalculator {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timezone_offset_hours: longitude / 15.0,
            projection: ProjectionSettings::default(),
        }
    }

    pub fn with_timezone_offset(mut self, hours: f64) -> Self {
        self.timezone_offset_hours = hours;
        self
    }

    pub fn set_location(&mut self, latitude: f64, longitude: f64) {
        self.latitude = latitude;
        self.longitude = longitude;
    }

    pub fn set_timezone_offset(&mut self, hours: f64) {
        self.timezone_offset_hours = hours;
    }

    pub fn set_projection_settings(&mut self, settings: ProjectionSettings) {
        self.projection = settings;
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn timezone_offset_hours(&self) -> f64 {
        self.timezone_offset_hours
    }

    pub fn projection(&self) -> ProjectionSettings {
        self.projection
    }

    /// Julian Day (UT) for a local civil time.
    pub fn calculate_julian_day(&self, dt: &DateTime) -> f64 {
        julian_day(dt.year, dt.month as i32, dt.day as i32, dt.hour_fraction())
            - self.timezone_offset_hours / 24.0
    }

    /// Shifted by the projection offset, then by the longitude-derived offset.
    pub fn get_projected_julian_day(&self, dt: &DateTime) -> f64 {
        let mut jd = self.calculate_julian_day(dt);
        if !self.projection.enabled {
            return jd;
        }
        jd += self.projection.shift_in_hours() / 24.0;
        jd -= (self.longitude / 15.0) / 24.0;
        jd
    }

    pub fn get_moon_phase(&self, dt: &DateTime) -> f32 {
        moon_phase_at(self.calculate_julian_day(dt))
    }

    pub fn calculate_sun_position(&self, dt: &DateTime) -> CelestialPosition {
        self.calculate_sun_position_at_time(self.calculate_julian_day(dt))
    }

    pub fn calculate_sun_position_at_time(&self, jd: f64) -> CelestialPosition {
        sun_position(jd, self.latitude, self.longitude)
    }

    pub fn calculate_moon_position(&self, dt: &DateTime) -> CelestialPosition {
        self.calculate_moon_position_at_time(self.calculate_julian_day(dt))
    }

    pub fn calculate_moon_position_at_time(&self, jd: f64) -> CelestialPosition {
        moon_position(jd, self.latitude, self.longitude)
    }

    pub fn get_sun_intensity(&self, dt: &DateTime) -> f32 {
        sun_intensity_from_altitude(self.calculate_sun_position(dt).altitude)
    }

    pub fn get_moon_intensity(&self, dt: &DateTime) -> f32 {
        let pos = self.calculate_moon_position(dt);
        moon_intensity(pos.altitude, self.get_moon_phase(dt))
    }

    pub fn get_projected_sun_intensity(&self, dt: &DateTime) -> f32 {
        if !self.projection.enabled {
            return self.get_sun_intensity(dt);
        }
        let pos = self.calculate_sun_position_at_time(self.get_projected_julian_day(dt));
        sun_intensity_from_altitude(pos.altitude)
    }

    /// Position follows the projected time; the phase stays that of the real date.
    pub fn get_projected_moon_intensity(&self, dt: &DateTime) -> f32 {
        if !self.projection.enabled {
            return self.get_moon_intensity(dt);
        }
        let pos = self.calculate_moon_position_at_time(self.get_projected_julian_day(dt));
        moon_intensity(pos.altitude, self.get_moon_phase(dt))
    }

    pub fn get_sun_rise_set_times(&self, dt: &DateTime) -> SunTimes {
        let jd_base = self.calculate_julian_day(&dt.start_of_day());
        scan_sun(
            |minute| self.calculate_sun_position_at_time(jd_at(jd_base, minute)).altitude,
            SUN_RISE_SET_ALTITUDE,
        )
    }

    pub fn get_moon_rise_set_times(&self, dt: &DateTime) -> MoonTimes {
        let jd_base = self.calculate_julian_day(&dt.start_of_day());
        scan_moon(
            |minute| self.calculate_moon_position_at_time(jd_at(jd_base, minute)).altitude,
            MOON_RISE_SET_ALTITUDE,
        )
    }

    /// Real rise/set times moved by the projection shift on the clock.
    pub fn get_projected_sun_rise_set_times(&self, dt: &DateTime) -> SunTimes {
        let times = self.get_sun_rise_set_times(dt);
        if !self.projection.enabled {
            return times;
        }
        times.shifted(self.projection.total_shift_minutes())
    }

    pub fn get_projected_moon_rise_set_times(&self, dt: &DateTime) -> MoonTimes {
        let times = self.get_moon_rise_set_times(dt);
        if !self.projection.enabled {
            return times;
        }
        times.shifted(self.projection.total_shift_minutes())
    }
}

fn jd_at(jd_base: f64, minute: i32) -> f64 {
    jd_base + minute as f64 / MINUTES_PER_DAY as f64
}
