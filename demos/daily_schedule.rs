use chrono::TimeZone;
use chrono_tz::America::Los_Angeles;

use ledbrick_scheduler::{
    format_minutes, AstronomicalCalculator, AstronomicalTimes, DateTime, LedScheduler,
    MoonSimulation,
};

fn show(label: &str, minutes: Option<u16>) -> String {
    match minutes {
        Some(m) => format!("{}: {}", label, format_minutes(m)),
        None => format!("{}: --:--", label),
    }
}

fn main() {
    let latitude = 37.7749;
    let longitude = -122.4194;

    let zoned = Los_Angeles.with_ymd_and_hms(2025, 1, 13, 12, 0, 0).unwrap();
    let offset_hours = -8.0;
    let dt = DateTime::from_chrono(&zoned);

    let calc = AstronomicalCalculator::new(latitude, longitude).with_timezone_offset(offset_hours);
    let sun = calc.get_sun_rise_set_times(&dt);
    let moon = calc.get_moon_rise_set_times(&dt);
    let phase = calc.get_moon_phase(&dt);

    println!("=== LED Daylight Schedule Example ===");
    println!(
        "Location: San Francisco, CA ({:.4}°N, {:.4}°W)",
        latitude, -longitude
    );
    println!("Date: {}", zoned.date_naive());
    println!();
    println!("--- Sky ---");
    println!("{}  {}", show("Sunrise", sun.rise_minutes), show("Sunset", sun.set_minutes));
    println!("{}  {}", show("Moonrise", moon.rise_minutes), show("Moonset", moon.set_minutes));
    println!("Moon phase: {:.2} (0 new, 0.5 full)", phase);

    let sunrise = sun.rise_minutes.unwrap_or(420);
    let sunset = sun.set_minutes.unwrap_or(1080);
    let astro = AstronomicalTimes {
        sunrise_minutes: sunrise,
        sunset_minutes: sunset,
        solar_noon_minutes: (sunrise + sunset) / 2,
        civil_dawn_minutes: sunrise.saturating_sub(30),
        civil_dusk_minutes: (sunset + 30).min(1439),
        moon_rise_minutes: moon.rise_minutes,
        moon_set_minutes: moon.set_minutes,
        moon_phase: phase,
        valid: true,
        ..AstronomicalTimes::default()
    };

    let mut scheduler = LedScheduler::new(4);
    scheduler.load_preset("dynamic_sunrise_sunset").unwrap();
    scheduler.set_moon_simulation(MoonSimulation {
        enabled: true,
        base_intensity: vec![0.0, 4.0, 2.0, 0.0],
        phase_scaling: true,
    });

    println!();
    println!("--- Resolved Schedule ---");
    for point in scheduler.resolve_dynamic_points(&astro) {
        println!(
            "{}  {:<17} pwm={:>5.1}%  current={:.2}A",
            format_minutes(point.time_minutes),
            point.time_type.to_string(),
            point.pwm_values[0],
            point.current_values[0]
        );
    }

    println!();
    println!("--- Channel Output (hourly) ---");
    for hour in 0..24u16 {
        let minutes = hour * 60;
        let values = scheduler.get_values_at_time_with_astro(minutes, &astro);
        let pwm: Vec<String> = values.pwm_values.iter().map(|v| format!("{:5.1}", v)).collect();
        println!("{}  [{}]", format_minutes(minutes), pwm.join(" "));
    }
}
