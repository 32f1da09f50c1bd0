use crate::angles::{deg_to_rad, julian_centuries, normalize_angle};
use crate::constants::MEAN_OBLIQUITY_J2000;
use crate::solar::{ecliptic_to_equatorial, horizontal_position};
use crate::types::CelestialPosition;

/// Periodic term multipliers of D, M, M', F and the coefficient in 1e-6 degrees.
type PeriodicTerm = (i8, i8, i8, i8, f64);

const LONGITUDE_TERMS: [PeriodicTerm; 24] = [
    (0, 0, 1, 0, 6_288_774.0),
    (2, 0, -1, 0, 1_274_027.0),
    (2, 0, 0, 0, 658_314.0),
    (0, 0, 2, 0, 213_618.0),
    (0, 1, 0, 0, -185_116.0),
    (0, 0, 0, 2, -114_332.0),
    (2, 0, -2, 0, 58_793.0),
    (2, -1, -1, 0, 57_066.0),
    (2, 0, 1, 0, 53_322.0),
    (2, -1, 0, 0, 45_758.0),
    (0, 1, -1, 0, -40_923.0),
    (1, 0, 0, 0, -34_720.0),
    (0, 1, 1, 0, -30_383.0),
    (2, 0, 0, -2, 15_327.0),
    (0, 0, 1, 2, -12_528.0),
    (0, 0, 1, -2, 10_980.0),
    (4, 0, -1, 0, 10_675.0),
    (0, 0, 3, 0, 10_034.0),
    (4, 0, -2, 0, 8_548.0),
    (2, 1, -1, 0, -7_888.0),
    (2, 1, 0, 0, -6_766.0),
    (1, 0, -1, 0, -5_163.0),
    (1, 1, 0, 0, 4_987.0),
    (2, -1, 1, 0, 4_036.0),
];

const LATITUDE_TERMS: [PeriodicTerm; 13] = [
    (0, 0, 0, 1, 5_128_122.0),
    (0, 0, 1, 1, 280_602.0),
    (0, 0, 1, -1, 277_693.0),
    (2, 0, 0, -1, 173_237.0),
    (2, 0, -1, 1, 55_413.0),
    (2, 0, -1, -1, 46_271.0),
    (2, 0, 0, 1, 32_573.0),
    (0, 0, 2, 1, 17_198.0),
    (2, 0, 1, -1, 9_266.0),
    (0, 0, 2, -1, 8_822.0),
    (2, -1, 0, -1, 8_216.0),
    (2, 0, -2, -1, 4_324.0),
    (2, 0, 1, 1, 4_200.0),
];

/// Leading longitude terms used for the phase estimate.
const PHASE_LONGITUDE_TERMS: usize = 10;

struct FundamentalArguments {
    mean_longitude: f64,
    elongation: f64,
    sun_anomaly: f64,
    moon_anomaly: f64,
    latitude_argument: f64,
    eccentricity: f64,
}

fn fundamental_arguments(t: f64) -> FundamentalArguments {
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    FundamentalArguments {
        mean_longitude: normalize_angle(
            218.3164477 + 481267.88123421 * t - 0.0015786 * t2 + t3 / 538841.0 - t4 / 65194000.0,
        ),
        elongation: normalize_angle(
            297.8501921 + 445267.1114034 * t - 0.0018819 * t2 + t3 / 545868.0 - t4 / 113065000.0,
        ),
        sun_anomaly: normalize_angle(357.5291092 + 35999.0502909 * t - 0.0001536 * t2 + t3 / 24490000.0),
        moon_anomaly: normalize_angle(
            134.9633964 + 477198.8675055 * t + 0.0087414 * t2 + t3 / 69699.0 - t4 / 14712000.0,
        ),
        latitude_argument: normalize_angle(
            93.2720950 + 483202.0175233 * t - 0.0036539 * t2 - t3 / 3526000.0 + t4 / 863310000.0,
        ),
        eccentricity: 1.0 - 0.002516 * t - 0.0000074 * t2,
    }
}

fn sum_sine_terms(terms: &[PeriodicTerm], args: &FundamentalArguments) -> f64 {
    terms
        .iter()
        .map(|&(d, m, mp, f, coeff)| {
            let arg = d as f64 * args.elongation
                + m as f64 * args.sun_anomaly
                + mp as f64 * args.moon_anomaly
                + f as f64 * args.latitude_argument;
            let e_factor = match m.abs() {
                0 => 1.0,
                1 => args.eccentricity,
                _ => args.eccentricity * args.eccentricity,
            };
            coeff * e_factor * deg_to_rad(arg).sin()
        })
        .sum()
}

/// Apparent geocentric ecliptic (longitude, latitude) of the moon in degrees.
pub fn moon_ecliptic_coordinates(jd: f64) -> (f64, f64) {
    let t = julian_centuries(jd);
    let args = fundamental_arguments(t);

    let a1 = deg_to_rad(normalize_angle(119.75 + 131.849 * t));
    let a2 = deg_to_rad(normalize_angle(53.09 + 479264.290 * t));
    let a3 = deg_to_rad(normalize_angle(313.45 + 481266.484 * t));
    let lp = deg_to_rad(args.mean_longitude);
    let mp = deg_to_rad(args.moon_anomaly);
    let f = deg_to_rad(args.latitude_argument);

    let sum_l = sum_sine_terms(&LONGITUDE_TERMS, &args)
        + 3958.0 * a1.sin()
        + 1962.0 * (lp - f).sin()
        + 318.0 * a2.sin();

    let sum_b = sum_sine_terms(&LATITUDE_TERMS, &args) - 2235.0 * lp.sin()
        + 382.0 * a3.sin()
        + 175.0 * (a1 - f).sin()
        + 175.0 * (a1 + f).sin()
        + 127.0 * (lp - mp).sin()
        - 115.0 * (lp + mp).sin();

    let omega = deg_to_rad(normalize_angle(125.04452 - 1934.136261 * t));
    let nutation_longitude = -17.20 * omega.sin() / 3600.0;

    let longitude = normalize_angle(args.mean_longitude + sum_l / 1_000_000.0 + nutation_longitude);
    let latitude = sum_b / 1_000_000.0;
    (longitude, latitude)
}

pub fn moon_position(jd: f64, latitude: f64, longitude: f64) -> CelestialPosition {
    let (lambda, beta) = moon_ecliptic_coordinates(jd);
    let (ra, dec) = ecliptic_to_equatorial(lambda, beta, MEAN_OBLIQUITY_J2000);
    horizontal_position(ra, dec, jd, latitude, longitude)
}

/// Phase in `[0, 1)`: 0 new, 0.5 full.
pub fn moon_phase_at(jd: f64) -> f32 {
    let t = julian_centuries(jd);

    let l0 = 280.46646 + 36000.76983 * t;
    let m = deg_to_rad(normalize_angle(357.52911 + 35999.05029 * t));
    let centre = (1.914602 - 0.004817 * t) * m.sin()
        + 0.019993 * (2.0 * m).sin()
        + 0.000289 * (3.0 * m).sin();
    let sun_longitude = normalize_angle(l0 + centre);

    let args = fundamental_arguments(t);
    let moon_longitude = normalize_angle(
        args.mean_longitude
            + sum_sine_terms(&LONGITUDE_TERMS[..PHASE_LONGITUDE_TERMS], &args) / 1_000_000.0,
    );

    let phase = (normalize_angle(moon_longitude - sun_longitude) / 360.0) as f32;
    // f32 rounding can land a value just below 1.0 on 1.0 itself
    if phase >= 1.0 {
        0.0
    } else {
        phase
    }
}

/// Brightness factor from phase, 1.0 at full moon and 0.1 at new moon.
pub fn phase_brightness(phase: f32) -> f32 {
    0.1 + 0.9 * (1.0 - (phase - 0.5).abs() * 2.0)
}

pub fn moon_intensity(altitude: f64, phase: f32) -> f32 {
    if altitude <= 0.0 {
        return 0.0;
    }
    deg_to_rad(altitude).sin() as f32 * phase_brightness(phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angles::julian_day;

    #[test]
    fn meeus_example_47a_longitude() {
        // 1992-04-12 0h TD: apparent longitude 133.167, latitude -3.229
        let (lon, lat) = moon_ecliptic_coordinates(2448724.5);
        assert!((lon - 133.167).abs() < 0.1, "lon={}", lon);
        assert!((lat - -3.229).abs() < 0.1, "lat={}", lat);
    }

    #[test]
    fn full_and_new_moon_phases() {
        // full moon 2024-01-25 17:54 UT, new moon 2024-01-11 11:57 UT
        let full = moon_phase_at(julian_day(2024, 1, 25, 17.9));
        let new = moon_phase_at(julian_day(2024, 1, 11, 11.95));
        assert!((full - 0.5).abs() < 0.02, "full={}", full);
        assert!(new < 0.02 || new > 0.98, "new={}", new);
    }

    #[test]
    fn intensity_is_zero_below_horizon() {
        assert_eq!(moon_intensity(-1.0, 0.5), 0.0);
        assert_eq!(moon_intensity(0.0, 0.5), 0.0);
        assert!((moon_intensity(90.0, 0.5) - 1.0).abs() < 1e-6);
        assert!((moon_intensity(90.0, 0.0) - 0.1).abs() < 1e-6);
    }
}
