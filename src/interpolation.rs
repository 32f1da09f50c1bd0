use crate::constants::MINUTES_PER_DAY;
use crate::types::{InterpolationResult, SchedulePoint};

pub trait HasMinutes {
    fn minutes(&self) -> u16;
}

impl HasMinutes for SchedulePoint {
    fn minutes(&self) -> u16 {
        self.time_minutes
    }
}

pub fn interpolate_linear(v1: f32, v2: f32, fraction: f32) -> f32 {
    v1 + fraction * (v2 - v1)
}

fn lerp_values(before: &[f32], after: &[f32], fraction: f32) -> Vec<f32> {
    before
        .iter()
        .zip(after)
        .map(|(&a, &b)| interpolate_linear(a, b, fraction))
        .collect()
}

fn scale_values(values: &[f32], factor: f32) -> Vec<f32> {
    values.iter().map(|v| v * factor).collect()
}

fn has_channels(point: &SchedulePoint, num_channels: usize) -> bool {
    point.pwm_values.len() == num_channels && point.current_values.len() == num_channels
}

fn point_values(point: &SchedulePoint, num_channels: usize) -> InterpolationResult {
    if !has_channels(point, num_channels) {
        return InterpolationResult::invalid(num_channels);
    }
    InterpolationResult::new(point.pwm_values.clone(), point.current_values.clone())
}

fn blend(
    before: &SchedulePoint,
    after: &SchedulePoint,
    fraction: f32,
    num_channels: usize,
) -> InterpolationResult {
    if !has_channels(before, num_channels) || !has_channels(after, num_channels) {
        return InterpolationResult::invalid(num_channels);
    }
    InterpolationResult::new(
        lerp_values(&before.pwm_values, &after.pwm_values, fraction),
        lerp_values(&before.current_values, &after.current_values, fraction),
    )
}

/// Circular bracketing: the last entry at or before `minutes` and the first at or
/// after it, each wrapping to the opposite end of the day when absent.
pub fn find_bracketing_entries<E: HasMinutes>(entries: &[E], minutes: u16) -> Option<(&E, &E)> {
    let first = entries.first()?;
    let last = entries.last()?;

    let mut before = None;
    let mut after = None;
    for entry in entries {
        if entry.minutes() <= minutes {
            before = Some(entry);
        }
        if entry.minutes() >= minutes {
            after = Some(entry);
            break;
        }
    }
    Some((before.unwrap_or(last), after.unwrap_or(first)))
}

/// Minutes from `from` forward to `to` on a 24-hour clock.
pub fn wrapped_span(from: u16, to: u16) -> u16 {
    if to >= from {
        to - from
    } else {
        (MINUTES_PER_DAY as u16 - from) + to
    }
}

/// Sorted points, with the day treated as off outside their span: values ramp up
/// from zero at midnight to the first point and back down to zero at the next midnight.
pub fn interpolate_fixed(points: &[SchedulePoint], minutes: u16, num_channels: usize) -> InterpolationResult {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return InterpolationResult::invalid(num_channels),
    };
    if points.len() == 1 {
        return point_values(first, num_channels);
    }
    if let Some(exact) = points.iter().find(|p| p.time_minutes == minutes) {
        return point_values(exact, num_channels);
    }

    if minutes < first.time_minutes {
        if !has_channels(first, num_channels) {
            return InterpolationResult::invalid(num_channels);
        }
        let ratio = minutes as f32 / first.time_minutes as f32;
        return InterpolationResult::new(
            scale_values(&first.pwm_values, ratio),
            scale_values(&first.current_values, ratio),
        );
    }

    if minutes > last.time_minutes {
        if !has_channels(last, num_channels) {
            return InterpolationResult::invalid(num_channels);
        }
        let span = (MINUTES_PER_DAY as u16 - last.time_minutes) as f32;
        let fade = 1.0 - (minutes - last.time_minutes) as f32 / span;
        return InterpolationResult::new(
            scale_values(&last.pwm_values, fade),
            scale_values(&last.current_values, fade),
        );
    }

    match points
        .windows(2)
        .find(|pair| pair[0].time_minutes <= minutes && minutes <= pair[1].time_minutes)
    {
        Some(pair) => {
            let span = pair[1].time_minutes - pair[0].time_minutes;
            let ratio = if span > 0 {
                (minutes - pair[0].time_minutes) as f32 / span as f32
            } else {
                0.0
            };
            blend(&pair[0], &pair[1], ratio, num_channels)
        }
        None => InterpolationResult::invalid(num_channels),
    }
}

/// Sorted points on a circular timeline: before the first point the schedule
/// continues from the last one, across midnight.
pub fn interpolate_wrapped(points: &[SchedulePoint], minutes: u16, num_channels: usize) -> InterpolationResult {
    if points.len() == 1 {
        return point_values(&points[0], num_channels);
    }
    let (before, after) = match find_bracketing_entries(points, minutes) {
        Some(pair) => pair,
        None => return InterpolationResult::invalid(num_channels),
    };
    if before.time_minutes == minutes {
        return point_values(before, num_channels);
    }

    // a lone distinct time brackets itself across a full day
    let span = if after.time_minutes > before.time_minutes {
        after.time_minutes - before.time_minutes
    } else {
        (MINUTES_PER_DAY as u16 - before.time_minutes) + after.time_minutes
    };
    let elapsed = wrapped_span(before.time_minutes, minutes);
    let ratio = if span > 0 {
        elapsed as f32 / span as f32
    } else {
        0.0
    };
    blend(before, after, ratio, num_channels)
}
