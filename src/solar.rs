use crate::angles::{deg_to_rad, julian_centuries, normalize_angle, rad_to_deg};
use crate::constants::{J2000_EPOCH, MEAN_OBLIQUITY_J2000};
use crate::types::CelestialPosition;

/// Apparent ecliptic longitude of the sun from mean longitude plus the two-term equation of centre.
pub fn sun_ecliptic_longitude(jd: f64) -> f64 {
    let n = jd - J2000_EPOCH;
    let l = normalize_angle(280.460 + 0.98564736 * n);
    let g = deg_to_rad(normalize_angle(357.528 + 0.98560028 * n));
    normalize_angle(l + 1.915 * g.sin() + 0.020 * (2.0 * g).sin())
}

/// Ecliptic (longitude, latitude) to equatorial (right ascension, declination), all in degrees.
pub fn ecliptic_to_equatorial(longitude: f64, latitude: f64, obliquity: f64) -> (f64, f64) {
    let lambda = deg_to_rad(longitude);
    let beta = deg_to_rad(latitude);
    let eps = deg_to_rad(obliquity);

    let ra = (lambda.sin() * eps.cos() - beta.tan() * eps.sin()).atan2(lambda.cos());
    let dec = (beta.sin() * eps.cos() + beta.cos() * eps.sin() * lambda.sin())
        .clamp(-1.0, 1.0)
        .asin();
    (normalize_angle(rad_to_deg(ra)), rad_to_deg(dec))
}

pub fn greenwich_mean_sidereal_time(jd: f64) -> f64 {
    let n = jd - J2000_EPOCH;
    let t = julian_centuries(jd);
    normalize_angle(280.46061837 + 360.98564736629 * n + 0.000387933 * t * t - t * t * t / 38710000.0)
}

/// Observer-relative altitude and azimuth (from north, clockwise) for an equatorial position.
pub fn horizontal_position(
    right_ascension: f64,
    declination: f64,
    jd: f64,
    latitude: f64,
    longitude: f64,
) -> CelestialPosition {
    let lmst = normalize_angle(greenwich_mean_sidereal_time(jd) + longitude);
    let h = deg_to_rad(lmst - right_ascension);
    let lat = deg_to_rad(latitude);
    let dec = deg_to_rad(declination);

    let sin_alt = (lat.sin() * dec.sin() + lat.cos() * dec.cos() * h.cos()).clamp(-1.0, 1.0);
    let altitude = rad_to_deg(sin_alt.asin());

    let y = h.sin();
    let x = h.cos() * lat.sin() - dec.tan() * lat.cos();
    let azimuth = normalize_angle(rad_to_deg(y.atan2(x)) + 180.0);

    CelestialPosition { altitude, azimuth }
}

pub fn sun_position(jd: f64, latitude: f64, longitude: f64) -> CelestialPosition {
    let lambda = sun_ecliptic_longitude(jd);
    let (ra, dec) = ecliptic_to_equatorial(lambda, 0.0, MEAN_OBLIQUITY_J2000);
    horizontal_position(ra, dec, jd, latitude, longitude)
}

/// Relative daylight intensity in `[0, 1]` for a given solar altitude in degrees.
pub fn sun_intensity_from_altitude(altitude: f64) -> f32 {
    if altitude <= -6.0 {
        0.0
    } else if altitude <= 0.0 {
        let twilight = ((altitude + 6.0) / 6.0) as f32;
        0.1 * twilight
    } else if altitude <= 6.0 {
        let dawn = (altitude / 6.0) as f32;
        let base = deg_to_rad(altitude).sin() as f32;
        0.1 + (base - 0.1) * dawn
    } else {
        let mut intensity = deg_to_rad(altitude).sin() as f32;
        // atmospheric dimming for a low sun
        if altitude < 30.0 {
            intensity *= 0.7 + 0.3 * (altitude / 30.0) as f32;
        }
        intensity
    }
}
