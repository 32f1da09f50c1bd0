use crate::angles::wrap_minutes;
use crate::constants::{
    MINUTES_PER_DAY, MOON_SCAN_END_MINUTES, MOON_SCAN_START_MINUTES, MOON_SCAN_STEP_MINUTES,
    SUN_SCAN_MIDPOINT_BACKOFF, SUN_SCAN_STEP_MINUTES,
};
use crate::types::{MoonTimes, SunTimes};

const EVENING_START: i32 = 18 * 60;
const MORNING_END: i32 = 6 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    Rise,
    Set,
}

/// A threshold crossing between two consecutive samples. `minute` is the later sample,
/// relative to local midnight of the civil day (may be negative or past 1440).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossingEvent {
    pub kind: Crossing,
    pub minute: i32,
    pub altitude_before: f64,
    pub altitude_after: f64,
    pub is_night: bool,
}

impl CrossingEvent {
    pub fn new(kind: Crossing, minute: i32, altitude_before: f64, altitude_after: f64) -> Self {
        Self {
            kind,
            minute,
            altitude_before,
            altitude_after,
            is_night: is_night_minute(minute),
        }
    }

    fn is_rise(&self) -> bool {
        self.kind == Crossing::Rise
    }

    fn is_set(&self) -> bool {
        self.kind == Crossing::Set
    }
}

/// 18:00 to 06:00 local, judged on the time of day.
pub fn is_night_minute(minute: i32) -> bool {
    let tod = minute.rem_euclid(MINUTES_PER_DAY);
    tod >= EVENING_START || tod < MORNING_END
}

/// Coarse 15-minute scan of the civil day. The first upward and first downward
/// crossing are reported at the sample minute less the midpoint backoff.
pub fn scan_sun<F: Fn(i32) -> f64>(altitude_at: F, threshold: f64) -> SunTimes {
    let mut times = SunTimes::default();
    let mut prev: Option<f64> = None;
    let mut minute = 0;

    while minute < MINUTES_PER_DAY && (times.rise_minutes.is_none() || times.set_minutes.is_none()) {
        let altitude = altitude_at(minute);
        if let Some(prev_altitude) = prev {
            let event_minute = wrap_minutes(minute - SUN_SCAN_MIDPOINT_BACKOFF);
            if prev_altitude < threshold && altitude >= threshold && times.rise_minutes.is_none() {
                times.rise_minutes = Some(event_minute);
            } else if prev_altitude >= threshold && altitude < threshold && times.set_minutes.is_none() {
                times.set_minutes = Some(event_minute);
            }
        }
        prev = Some(altitude);
        minute += SUN_SCAN_STEP_MINUTES;
    }
    times
}

/// Every crossing of `threshold` between `start` (inclusive) and `end` (exclusive).
pub fn scan_crossings<F: Fn(i32) -> f64>(
    altitude_at: F,
    threshold: f64,
    start: i32,
    end: i32,
    step: i32,
) -> Vec<CrossingEvent> {
    let mut events = Vec::new();
    let mut prev: Option<f64> = None;
    let mut minute = start;

    while minute < end {
        let altitude = altitude_at(minute);
        if let Some(before) = prev {
            if before < threshold && altitude >= threshold {
                events.push(CrossingEvent::new(Crossing::Rise, minute, before, altitude));
            } else if before >= threshold && altitude < threshold {
                events.push(CrossingEvent::new(Crossing::Set, minute, before, altitude));
            }
        }
        prev = Some(altitude);
        minute += step;
    }
    events
}

fn next_set_after(events: &[CrossingEvent], minute: i32) -> Option<&CrossingEvent> {
    events.iter().find(|e| e.is_set() && e.minute > minute)
}

fn evening_pair_score(rise: &CrossingEvent, set: &CrossingEvent) -> u32 {
    let mut score = 0;
    if rise.is_night {
        score += 10;
    }
    if set.is_night {
        score += 10;
    }
    if (MINUTES_PER_DAY..MINUTES_PER_DAY + 12 * 60).contains(&set.minute) {
        score += 5;
    }
    if (6 * 60..=15 * 60).contains(&(set.minute - rise.minute)) {
        score += 5;
    }
    score
}

/// Picks the rise/set pair most useful for an overnight moonlight window.
///
/// In order of preference: the best-scoring evening rise with its following set,
/// then the first night rise in `[-6h, +30h]` whose set follows within 15 hours,
/// then the first rise of the civil day with whatever set follows it. A day without
/// any rise reports its first set alone.
pub fn select_moon_pair(
    events: &[CrossingEvent],
) -> (Option<CrossingEvent>, Option<CrossingEvent>) {
    let mut best: Option<(u32, &CrossingEvent, &CrossingEvent)> = None;
    for rise in events
        .iter()
        .filter(|e| e.is_rise() && (EVENING_START..MINUTES_PER_DAY).contains(&e.minute))
    {
        if let Some(set) = next_set_after(events, rise.minute) {
            let score = evening_pair_score(rise, set);
            if best.map_or(true, |(top, _, _)| score > top) {
                best = Some((score, rise, set));
            }
        }
    }
    if let Some((_, rise, set)) = best {
        return (Some(*rise), Some(*set));
    }

    for rise in events
        .iter()
        .filter(|e| e.is_rise() && e.is_night && (-6 * 60..=30 * 60).contains(&e.minute))
    {
        if let Some(set) = next_set_after(events, rise.minute) {
            if set.minute - rise.minute <= 15 * 60 {
                return (Some(*rise), Some(*set));
            }
        }
    }

    let civil_day = 0..MINUTES_PER_DAY;
    if let Some(rise) = events
        .iter()
        .find(|e| e.is_rise() && civil_day.contains(&e.minute))
    {
        return (Some(*rise), next_set_after(events, rise.minute).copied());
    }
    let set = events
        .iter()
        .find(|e| e.is_set() && civil_day.contains(&e.minute))
        .copied();
    (None, set)
}

/// Linear interpolation between the bracketing samples, rounded and wrapped into the day.
pub fn refine_minute(event: &CrossingEvent, threshold: f64, step: i32) -> u16 {
    let span = event.altitude_after - event.altitude_before;
    let ratio = if span != 0.0 {
        (threshold - event.altitude_before) / span
    } else {
        0.0
    };
    let before_minute = (event.minute - step) as f64;
    wrap_minutes((before_minute + step as f64 * ratio).round() as i32)
}

/// 48-hour scan around the civil day followed by pair selection and refinement.
pub fn scan_moon<F: Fn(i32) -> f64>(altitude_at: F, threshold: f64) -> MoonTimes {
    let events = scan_crossings(
        altitude_at,
        threshold,
        MOON_SCAN_START_MINUTES,
        MOON_SCAN_END_MINUTES,
        MOON_SCAN_STEP_MINUTES,
    );
    log::trace!("moon scan found {} crossings", events.len());

    let (rise, set) = select_moon_pair(&events);
    MoonTimes {
        rise_minutes: rise.map(|e| refine_minute(&e, threshold, MOON_SCAN_STEP_MINUTES)),
        set_minutes: set.map(|e| refine_minute(&e, threshold, MOON_SCAN_STEP_MINUTES)),
    }
}
