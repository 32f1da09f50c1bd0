use crate::constants::{DAYS_PER_CENTURY, J2000_EPOCH, MINUTES_PER_DAY};

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * (std::f64::consts::PI / 180.0)
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad * (180.0 / std::f64::consts::PI)
}

pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Julian Day for a Gregorian calendar date at `hour_frac` hours past midnight UT.
///
/// January and February are counted as months 13 and 14 of the previous year.
pub fn julian_day(year: i32, month: i32, day: i32, hour_frac: f64) -> f64 {
    let (y, m) = if month <= 2 {
        (year - 1, month + 12)
    } else {
        (year, month)
    };

    let a = y / 100;
    let b = 2 - a + a / 4;

    let jd = (365.25 * (y + 4716) as f64) as i32 as f64
        + (30.6001 * (m + 1) as f64) as i32 as f64
        + day as f64
        + b as f64
        - 1524.5;
    jd + hour_frac / 24.0
}

pub fn julian_centuries(jd: f64) -> f64 {
    (jd - J2000_EPOCH) / DAYS_PER_CENTURY
}

/// Wraps a signed minute count into `0..1440` by repeated whole-day steps.
pub fn wrap_minutes(minutes: i32) -> u16 {
    let mut m = minutes;
    while m < 0 {
        m += MINUTES_PER_DAY;
    }
    while m >= MINUTES_PER_DAY {
        m -= MINUTES_PER_DAY;
    }
    m as u16
}

pub fn minutes_to_time(total_minutes: u16) -> (u16, u16) {
    (total_minutes / 60, total_minutes % 60)
}

pub fn time_to_minutes(time: (u16, u16)) -> u16 {
    time.0 * 60 + time.1
}

pub fn format_minutes(total_minutes: u16) -> String {
    let (h, m) = minutes_to_time(total_minutes);
    format!("{:02}:{:02}", h, m)
}
