//! Move timing
//!
//! The device is told how long to wait between steps of the axis that
//! steps the most (the DDA rate, in microseconds). The rate is chosen so
//! that no axis exceeds its maximum feedrate, which can make a move slower
//! than the feedrate the G-code asked for.

use super::error::GcodeErrorKind;
use crate::protocol::AxisSet;

const MICROSECONDS_PER_MINUTE: f64 = 60.0 * 1_000_000.0;

/// `target - initial`, per axis
#[must_use]
pub fn displacement(initial: &[f64; 5], target: &[f64; 5]) -> [f64; 5] {
    std::array::from_fn(|i| target[i] - initial[i])
}

/// Euclidean length
#[must_use]
pub fn magnitude(vector: &[f64; 5]) -> f64 {
    vector.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Millimetres to steps, per axis
#[must_use]
pub fn to_steps(vector: &[f64; 5], steps_per_mm: &[f64; 5]) -> [f64; 5] {
    std::array::from_fn(|i| vector[i] * steps_per_mm[i])
}

/// Largest absolute component
#[must_use]
pub fn longest(vector: &[f64; 5]) -> f64 {
    vector.iter().fold(0.0, |max, v| max.max(v.abs()))
}

/// Feedrate for the move once every axis is kept under its maximum, mm/min
#[must_use]
pub fn safe_feedrate(delta: &[f64; 5], feedrate: f64, max_feedrates: &[f64; 5]) -> f64 {
    let distance = magnitude(delta);
    let mut actual = feedrate;

    for (d, max) in delta.iter().zip(max_feedrates) {
        if *d == 0.0 {
            continue;
        }
        let axis_feedrate = feedrate * d.abs() / distance;
        if axis_feedrate > *max {
            actual = actual.min(max * distance / d.abs());
        }
    }
    actual
}

/// DDA rate for a move from `initial` to `target`, microseconds per step.
///
/// Fails with [`GcodeErrorKind::ZeroLengthMove`] when nothing moves and
/// with [`GcodeErrorKind::OutOfRange`] for a feedrate that is not positive.
pub fn calculate_dda_speed(
    initial: &[f64; 5],
    target: &[f64; 5],
    feedrate: f64,
    max_feedrates: &[f64; 5],
    steps_per_mm: &[f64; 5],
) -> Result<f64, GcodeErrorKind> {
    let delta = displacement(initial, target);
    let distance = magnitude(&delta);
    let steps = longest(&to_steps(&delta, steps_per_mm));
    if distance == 0.0 || steps == 0.0 {
        return Err(GcodeErrorKind::ZeroLengthMove);
    }
    if feedrate <= 0.0 {
        return Err(GcodeErrorKind::OutOfRange {
            letter: 'F',
            value: feedrate,
        });
    }

    let actual = safe_feedrate(&delta, feedrate, max_feedrates);
    let minutes = distance / actual;
    Ok(minutes * MICROSECONDS_PER_MINUTE / steps)
}

/// Step interval for a homing search, microseconds per step.
///
/// Each selected axis moves at `feedrate` capped to its maximum; the
/// slowest resulting interval wins.
pub fn homing_rate(
    axes: AxisSet,
    feedrate: f64,
    max_feedrates: &[f64; 5],
    steps_per_mm: &[f64; 5],
) -> Result<f64, GcodeErrorKind> {
    if feedrate <= 0.0 {
        return Err(GcodeErrorKind::OutOfRange {
            letter: 'F',
            value: feedrate,
        });
    }
    Ok(axes.iter().fold(0.0, |rate: f64, axis| {
        let i = axis.index();
        let capped = feedrate.min(max_feedrates[i]);
        rate.max(MICROSECONDS_PER_MINUTE / (capped * steps_per_mm[i]))
    }))
}
