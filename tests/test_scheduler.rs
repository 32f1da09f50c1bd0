use ledbrick_scheduler::{
    AstronomicalTimes, Error, LedScheduler, MoonSimulation, SchedulePoint, TimeType,
    BUILTIN_PRESETS,
};

macro_rules! assert_approx {
    ($left:expr, $right:expr, $tol:expr) => {
        let (l, r) = ($left as f64, $right as f64);
        assert!(
            (l - r).abs() <= $tol,
            "assert_approx failed: left={}, right={}, diff={}, tol={}",
            l, r, (l - r).abs(), $tol
        );
    };
}

fn two_point_schedule() -> LedScheduler {
    let mut s = LedScheduler::new(2);
    s.set_schedule_point(480, vec![20.0, 30.0], vec![0.4, 0.6]).unwrap();
    s.set_schedule_point(1200, vec![80.0, 90.0], vec![1.6, 1.8]).unwrap();
    s
}

fn times(points: &[SchedulePoint]) -> Vec<u16> {
    points.iter().map(|p| p.time_minutes).collect()
}

// ── Construction ──

#[test]
fn test_new_clamps_channel_count() {
    assert_eq!(LedScheduler::new(0).num_channels(), 1);
    assert_eq!(LedScheduler::new(40).num_channels(), 16);
    assert_eq!(LedScheduler::default().num_channels(), 8);
}

#[test]
fn test_default_channel_configs() {
    let s = LedScheduler::new(10);
    let configs = s.channel_configs();
    assert_eq!(configs.len(), 10);
    assert_eq!(configs[0].name, "Channel 1");
    assert_eq!(configs[0].rgb_hex, "#FFFFFF");
    assert_eq!(configs[1].rgb_hex, "#0000FF");
    assert_eq!(configs[7].rgb_hex, "#FF8000");
    assert_eq!(configs[8].rgb_hex, "#FFFFFF");
    assert_eq!(configs[9].name, "Channel 10");
    assert_approx!(configs[3].max_current, 2.0, 1e-6);
}

// ── Validation ──

#[test]
fn test_rejected_points_leave_schedule_unchanged() {
    let mut s = two_point_schedule();
    let before = s.schedule_points().to_vec();

    assert!(matches!(
        s.set_schedule_point(600, vec![10.0], vec![0.1, 0.1]),
        Err(Error::ChannelCountMismatch { expected: 2, actual: 1 })
    ));
    assert!(matches!(
        s.set_schedule_point(600, vec![10.0, 101.0], vec![0.1, 0.1]),
        Err(Error::PwmOutOfRange(_))
    ));
    assert!(matches!(
        s.set_schedule_point(600, vec![10.0, 10.0], vec![0.1, 5.5]),
        Err(Error::CurrentOutOfRange(_))
    ));
    assert!(matches!(
        s.set_schedule_point(600, vec![10.0, -1.0], vec![0.1, 0.1]),
        Err(Error::PwmOutOfRange(_))
    ));
    assert!(matches!(
        s.set_schedule_point(1440, vec![10.0, 10.0], vec![0.1, 0.1]),
        Err(Error::TimeOutOfRange(1440))
    ));
    assert!(matches!(
        s.add_dynamic_schedule_point(TimeType::SunsetRelative, 1500, vec![1.0, 1.0], vec![0.1, 0.1]),
        Err(Error::OffsetOutOfRange(1500))
    ));

    assert_eq!(s.schedule_points(), before.as_slice());
}

#[test]
fn test_boundary_values_accepted() {
    let mut s = LedScheduler::new(1);
    s.set_schedule_point(0, vec![0.0], vec![0.0]).unwrap();
    s.set_schedule_point(1439, vec![100.0], vec![5.0]).unwrap();
    s.add_dynamic_schedule_point(TimeType::CivilDusk, -1439, vec![1.0], vec![0.1])
        .unwrap();
    s.add_dynamic_schedule_point(TimeType::CivilDawn, 1439, vec![1.0], vec![0.1])
        .unwrap();
    assert_eq!(s.len(), 4);
}

// ── Upsert ──

#[test]
fn test_fixed_upsert_keeps_one_point() {
    let mut s = LedScheduler::new(2);
    s.set_schedule_point(600, vec![10.0, 10.0], vec![0.1, 0.1]).unwrap();
    s.set_schedule_point(600, vec![40.0, 50.0], vec![0.8, 0.9]).unwrap();
    assert_eq!(s.len(), 1);
    assert_eq!(s.schedule_points()[0].pwm_values, vec![40.0, 50.0]);
    assert_eq!(s.schedule_points()[0].current_values, vec![0.8, 0.9]);
}

#[test]
fn test_dynamic_upsert_matches_type_and_offset() {
    let mut s = LedScheduler::new(1);
    s.add_dynamic_schedule_point(TimeType::SunriseRelative, 30, vec![10.0], vec![0.1])
        .unwrap();
    s.add_dynamic_schedule_point(TimeType::SunriseRelative, 30, vec![60.0], vec![1.0])
        .unwrap();
    s.add_dynamic_schedule_point(TimeType::SunriseRelative, 45, vec![70.0], vec![1.1])
        .unwrap();
    s.add_dynamic_schedule_point(TimeType::SunsetRelative, 30, vec![20.0], vec![0.2])
        .unwrap();
    assert_eq!(s.len(), 3);
    assert_eq!(s.schedule_points()[0].pwm_values, vec![60.0]);
}

#[test]
fn test_fixed_type_dynamic_point_uses_offset_as_time() {
    let mut s = LedScheduler::new(1);
    s.add_dynamic_schedule_point(TimeType::Fixed, 615, vec![10.0], vec![0.1])
        .unwrap();
    assert_eq!(s.schedule_points()[0].time_type, TimeType::Fixed);
    assert_eq!(s.schedule_points()[0].time_minutes, 615);
    assert!(matches!(
        s.add_dynamic_schedule_point(TimeType::Fixed, -5, vec![10.0], vec![0.1]),
        Err(Error::OffsetOutOfRange(-5))
    ));
}

#[test]
fn test_remove_points() {
    let mut s = LedScheduler::new(1);
    s.set_schedule_point(600, vec![10.0], vec![0.1]).unwrap();
    s.add_dynamic_schedule_point(TimeType::SolarNoon, 0, vec![50.0], vec![1.0])
        .unwrap();

    assert!(!s.remove_schedule_point(601));
    assert!(!s.remove_dynamic_schedule_point(TimeType::SolarNoon, 10));
    assert!(!s.remove_dynamic_schedule_point(TimeType::Fixed, 0));
    assert!(s.remove_dynamic_schedule_point(TimeType::SolarNoon, 0));
    assert!(s.remove_schedule_point(600));
    assert!(s.is_empty());
}

// ── Channels ──

#[test]
fn test_channel_resize_pads_with_zero() {
    let mut s = two_point_schedule();
    s.set_num_channels(4).unwrap();
    assert_eq!(s.schedule_points()[0].pwm_values, vec![20.0, 30.0, 0.0, 0.0]);
    assert_eq!(s.schedule_points()[1].current_values, vec![1.6, 1.8, 0.0, 0.0]);
    assert_eq!(s.channel_configs().len(), 4);
    assert_eq!(s.moon_simulation().base_intensity.len(), 4);

    s.set_num_channels(1).unwrap();
    assert_eq!(s.schedule_points()[1].pwm_values, vec![80.0]);
}

#[test]
fn test_channel_resize_rejects_out_of_range() {
    let mut s = two_point_schedule();
    assert!(matches!(s.set_num_channels(0), Err(Error::InvalidChannelCount(0))));
    assert!(matches!(s.set_num_channels(17), Err(Error::InvalidChannelCount(17))));
    assert_eq!(s.num_channels(), 2);
}

#[test]
fn test_channel_max_current_is_clamped() {
    let mut s = LedScheduler::new(2);
    assert!(s.set_channel_max_current(0, 10.0));
    assert!(s.set_channel_max_current(1, 0.0));
    assert!(!s.set_channel_max_current(2, 1.0));
    assert_approx!(s.channel_max_current(0), 5.0, 1e-6);
    assert_approx!(s.channel_max_current(1), 0.1, 1e-6);

    assert!(s.set_channel_color(1, "#123456"));
    assert_eq!(s.channel_config(1).unwrap().rgb_hex, "#123456");
    assert!(!s.set_channel_color(5, "#000000"));
}

// ── Interpolation ──

#[test]
fn test_empty_and_single_point() {
    let mut s = LedScheduler::new(2);
    let empty = s.get_values_at_time(600);
    assert!(!empty.valid);
    assert_eq!(empty.pwm_values, vec![0.0, 0.0]);

    s.set_schedule_point(300, vec![25.0, 35.0], vec![0.5, 0.7]).unwrap();
    for minutes in [0, 300, 1439] {
        let r = s.get_values_at_time(minutes);
        assert!(r.valid);
        assert_eq!(r.pwm_values, vec![25.0, 35.0]);
        let r = s.get_values_at_time_with_astro(minutes, &AstronomicalTimes::default());
        assert_eq!(r.current_values, vec![0.5, 0.7]);
    }
}

#[test]
fn test_exact_match_returns_point_values() {
    let s = two_point_schedule();
    let r = s.get_values_at_time(480);
    assert!(r.valid);
    assert_eq!(r.pwm_values, vec![20.0, 30.0]);
    assert_eq!(r.current_values, vec![0.4, 0.6]);
}

#[test]
fn test_linear_interpolation_between_points() {
    let s = two_point_schedule();
    let r = s.get_values_at_time(840);
    assert!(r.valid);
    assert_approx!(r.pwm_values[0], 50.0, 1.0);
    assert_approx!(r.pwm_values[1], 60.0, 1.0);
    assert_approx!(r.current_values[0], 1.0, 0.01);
    assert_approx!(r.current_values[1], 1.2, 0.01);
}

#[test]
fn test_fixed_mode_fades_outside_span() {
    let s = two_point_schedule();
    let before = s.get_values_at_time(240);
    assert_approx!(before.pwm_values[0], 10.0, 1e-3);
    assert_approx!(before.pwm_values[1], 15.0, 1e-3);

    let after = s.get_values_at_time(1320);
    assert_approx!(after.pwm_values[0], 40.0, 1e-3);
    assert_approx!(after.current_values[1], 0.9, 1e-3);

    assert_approx!(s.get_values_at_time(0).pwm_values[0], 0.0, 1e-6);
}

#[test]
fn test_out_of_range_query_is_invalid() {
    let s = two_point_schedule();
    assert!(!s.get_values_at_time(1440).valid);
    assert!(!s
        .get_values_at_time_with_astro(1440, &AstronomicalTimes::default())
        .valid);
}

#[test]
fn test_astro_mode_wraps_across_midnight() {
    let s = two_point_schedule();
    let r = s.get_values_at_time_with_astro(240, &AstronomicalTimes::default());
    assert!(r.valid);
    // 1200 -> 480 spans 720 minutes, 240 is 480 minutes in
    assert_approx!(r.pwm_values[0], 40.0, 1e-3);
    assert_approx!(r.pwm_values[1], 50.0, 1e-3);
    assert_approx!(r.current_values[0], 0.8, 1e-3);

    let late = s.get_values_at_time_with_astro(1320, &AstronomicalTimes::default());
    assert_approx!(late.pwm_values[0], 70.0, 1e-3);
}

#[test]
fn test_dynamic_points_follow_astronomical_times() {
    let mut s = LedScheduler::new(1);
    s.add_dynamic_schedule_point(TimeType::SunriseRelative, 0, vec![20.0], vec![0.2])
        .unwrap();
    s.add_dynamic_schedule_point(TimeType::SunsetRelative, 0, vec![80.0], vec![0.8])
        .unwrap();

    let astro = AstronomicalTimes {
        sunrise_minutes: 400,
        sunset_minutes: 1000,
        ..AstronomicalTimes::default()
    };
    assert_approx!(s.get_values_at_time_with_astro(400, &astro).pwm_values[0], 20.0, 1e-6);
    assert_approx!(s.get_values_at_time_with_astro(700, &astro).pwm_values[0], 50.0, 1e-3);

    let later = AstronomicalTimes {
        sunrise_minutes: 460,
        sunset_minutes: 1060,
        ..AstronomicalTimes::default()
    };
    assert_approx!(s.get_values_at_time_with_astro(460, &later).pwm_values[0], 20.0, 1e-6);
    // before the first resolved point the schedule continues from sunset
    assert!(s.get_values_at_time_with_astro(100, &later).pwm_values[0] > 20.0);
}

#[test]
fn test_stored_astronomical_times_drive_fixed_mode() {
    let mut s = LedScheduler::new(1);
    s.add_dynamic_schedule_point(TimeType::SolarNoon, 0, vec![90.0], vec![1.5])
        .unwrap();
    s.set_schedule_point(300, vec![0.0], vec![0.0]).unwrap();
    s.set_astronomical_times(AstronomicalTimes {
        solar_noon_minutes: 700,
        ..AstronomicalTimes::default()
    });
    assert_approx!(s.get_values_at_time(700).pwm_values[0], 90.0, 1e-6);
}

// ── Resolution ──

#[test]
fn test_resolve_wraps_negative_offsets() {
    let mut s = LedScheduler::new(1);
    s.add_dynamic_schedule_point(TimeType::SunriseRelative, -500, vec![5.0], vec![0.1])
        .unwrap();
    s.add_dynamic_schedule_point(TimeType::SunsetRelative, 400, vec![6.0], vec![0.1])
        .unwrap();
    let resolved = s.resolve_dynamic_points(&AstronomicalTimes::default());
    // 420 - 500 and 1080 + 400, both wrapped
    assert_eq!(times(&resolved), vec![40, 1360]);

    let stored = s.schedule_points();
    assert_eq!(stored[0].offset_minutes, -500);
    assert_eq!(stored[0].time_minutes, 0);
}

#[test]
fn test_resolve_keeps_first_of_colliding_points() {
    let mut s = LedScheduler::new(1);
    s.add_dynamic_schedule_point(TimeType::SunriseRelative, -30, vec![5.0], vec![0.1])
        .unwrap();
    s.set_schedule_point(390, vec![7.0], vec![0.2]).unwrap();
    let resolved = s.resolve_dynamic_points(&AstronomicalTimes::default());
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].time_type, TimeType::Fixed);
    assert_eq!(resolved[0].pwm_values, vec![7.0]);
}

#[test]
fn test_calculate_dynamic_time_per_type() {
    let s = LedScheduler::new(1);
    let astro = AstronomicalTimes::default();
    let cases = [
        (TimeType::SunriseRelative, 420),
        (TimeType::SunsetRelative, 1080),
        (TimeType::SolarNoon, 750),
        (TimeType::CivilDawn, 390),
        (TimeType::CivilDusk, 1110),
        (TimeType::NauticalDawn, 360),
        (TimeType::NauticalDusk, 1140),
        (TimeType::AstronomicalDawn, 330),
        (TimeType::AstronomicalDusk, 1170),
    ];
    for (time_type, expected) in cases {
        let point = SchedulePoint::dynamic(time_type, 10, vec![0.0], vec![0.0]);
        assert_eq!(s.calculate_dynamic_time(&point, &astro), expected + 10, "{}", time_type);
    }
    let fixed = SchedulePoint::fixed(123, vec![0.0], vec![0.0]);
    assert_eq!(s.calculate_dynamic_time(&fixed, &astro), 123);
}

// ── Moonlight ──

fn night_schedule() -> LedScheduler {
    let mut s = LedScheduler::new(2);
    for (time, pwm) in [(360, 0.0), (480, 50.0), (1080, 50.0), (1200, 0.0)] {
        s.set_schedule_point(time, vec![pwm; 2], vec![pwm / 50.0; 2]).unwrap();
    }
    s.set_moon_simulation(MoonSimulation {
        enabled: true,
        base_intensity: vec![10.0, 20.0],
        phase_scaling: true,
    });
    s
}

fn moonlit(phase: f32) -> AstronomicalTimes {
    AstronomicalTimes {
        moon_rise_minutes: Some(1250),
        moon_set_minutes: Some(300),
        moon_phase: phase,
        valid: true,
        ..AstronomicalTimes::default()
    }
}

#[test]
fn test_moonlight_replaces_dark_channels() {
    let s = night_schedule();
    let r = s.get_values_at_time_with_astro(1300, &moonlit(0.5));
    assert_approx!(r.pwm_values[0], 10.0, 1e-4);
    assert_approx!(r.pwm_values[1], 20.0, 1e-4);
    assert_approx!(r.current_values[0], 0.2, 1e-4);
    assert_approx!(r.current_values[1], 0.4, 1e-4);

    let quarter = s.get_values_at_time_with_astro(1300, &moonlit(0.25));
    assert_approx!(quarter.pwm_values[1], 10.0, 1e-4);
}

#[test]
fn test_moonlight_only_when_dark_and_visible() {
    let s = night_schedule();
    // daylight values are left alone
    assert_approx!(s.get_values_at_time_with_astro(720, &moonlit(0.5)).pwm_values[0], 50.0, 1e-4);
    // before moonrise
    assert_approx!(s.get_values_at_time_with_astro(1240, &moonlit(0.5)).pwm_values[0], 0.0, 1e-6);
    // invalid snapshot disables moonlight
    let stale = AstronomicalTimes {
        valid: false,
        ..moonlit(0.5)
    };
    assert_approx!(s.get_values_at_time_with_astro(1300, &stale).pwm_values[0], 0.0, 1e-6);
    // fade mode never applies moonlight
    assert_approx!(s.get_values_at_time(1300).pwm_values[0], 0.0, 1e-6);
}

#[test]
fn test_moonlight_rise_without_set_runs_to_midnight() {
    let s = night_schedule();
    let astro = AstronomicalTimes {
        moon_set_minutes: None,
        ..moonlit(0.5)
    };
    assert!(s.is_moon_visible(1300, &astro));
    assert!(!s.is_moon_visible(100, &astro));
    assert_approx!(s.get_values_at_time_with_astro(1300, &astro).pwm_values[0], 10.0, 1e-4);
    assert_approx!(s.get_values_at_time_with_astro(1240, &astro).pwm_values[0], 0.0, 1e-6);
}

#[test]
fn test_moonlight_set_without_rise_starts_at_midnight() {
    let s = night_schedule();
    let astro = AstronomicalTimes {
        moon_rise_minutes: None,
        ..moonlit(0.5)
    };
    assert!(s.is_moon_visible(100, &astro));
    assert!(!s.is_moon_visible(1300, &astro));
    assert_approx!(s.get_values_at_time_with_astro(100, &astro).pwm_values[1], 20.0, 1e-4);
    assert_approx!(s.get_values_at_time_with_astro(330, &astro).pwm_values[1], 0.0, 1e-6);

    let moonless = AstronomicalTimes {
        moon_set_minutes: None,
        ..astro
    };
    assert!(!s.is_moon_visible(100, &moonless));
}

#[test]
fn test_moonlight_without_phase_scaling() {
    let mut s = night_schedule();
    s.set_moon_simulation(MoonSimulation {
        enabled: true,
        base_intensity: vec![3.0],
        phase_scaling: false,
    });
    assert_eq!(s.moon_simulation().base_intensity, vec![3.0, 0.0]);
    let r = s.get_values_at_time_with_astro(100, &moonlit(0.02));
    assert_approx!(r.pwm_values[0], 3.0, 1e-6);
    assert_approx!(r.pwm_values[1], 0.0, 1e-6);

    s.enable_moon_simulation(false);
    let r = s.get_values_at_time_with_astro(100, &moonlit(0.02));
    assert_approx!(r.pwm_values[0], 0.0, 1e-6);
}

// ── Presets ──

#[test]
fn test_builtin_presets() {
    let mut s = LedScheduler::new(4);

    s.load_preset("simple").unwrap();
    assert_eq!(times(s.schedule_points()), vec![480, 1200]);
    assert_eq!(s.schedule_points()[0].pwm_values, vec![70.0; 4]);

    s.load_preset("sunrise_sunset").unwrap();
    assert_eq!(times(s.schedule_points()), vec![420, 720, 1020, 1080]);

    s.load_preset("full_spectrum").unwrap();
    assert_eq!(s.len(), 4);
    assert_eq!(s.schedule_points()[0].pwm_values, vec![40.0, 60.0, 80.0, 100.0]);

    s.load_preset("dynamic_sunrise_sunset").unwrap();
    assert_eq!(s.len(), 7);
    let resolved = s.resolve_dynamic_points(&AstronomicalTimes::default());
    assert_eq!(times(&resolved), vec![390, 420, 450, 750, 1050, 1080, 1110]);
}

#[test]
fn test_full_spectrum_preset_extends_last_channel() {
    let mut s = LedScheduler::new(10);
    s.load_preset("full_spectrum").unwrap();
    let first = &s.schedule_points()[0];
    assert_eq!(first.pwm_values.len(), 10);
    assert_eq!(first.pwm_values[9], 20.0);
}

#[test]
fn test_sunrise_sunset_preset_past_midnight_is_skipped() {
    let mut s = LedScheduler::new(1);
    s.create_sunrise_sunset_preset(400, 1400);
    // the fade-out point at 1460 cannot be stored
    assert_eq!(times(s.schedule_points()), vec![400, 900, 1400]);
}

#[test]
fn test_user_presets() {
    let mut s = two_point_schedule();
    s.save_preset("mine");
    s.clear_schedule();
    assert!(s.is_empty());

    s.load_preset("mine").unwrap();
    assert_eq!(times(s.schedule_points()), vec![480, 1200]);

    let names = s.preset_names();
    assert_eq!(&names[..BUILTIN_PRESETS.len()], &BUILTIN_PRESETS.map(String::from)[..]);
    assert_eq!(names.last().map(String::as_str), Some("mine"));

    assert!(s.delete_preset("mine"));
    assert!(!s.delete_preset("mine"));
    assert!(matches!(s.load_preset("mine"), Err(Error::UnknownPreset(_))));
}
