//! Pure derivations between pulse counts and chain length.
//!
//! DeployedLength is never stored; it is recomputed from the count and the
//! fixed ticks-per-meter constant, so the two can never drift apart.

/// Deployed length in meters for a pulse count. Total: a zero ticks-per-meter
/// is clamped to 1 rather than dividing by zero (the builder rejects it
/// anyway). Negative counts yield negative lengths.
#[inline]
pub fn ticks_to_meters(count: i32, ticks_per_meter: u32) -> f32 {
    count as f32 / ticks_per_meter.max(1) as f32
}

/// Inverse bound: pulse count corresponding to a length, rounded to nearest.
/// Used to compare the running count against the configured chain capacity.
#[inline]
pub fn meters_to_ticks(meters: f32, ticks_per_meter: u32) -> i32 {
    let t = meters * ticks_per_meter.max(1) as f32;
    if !t.is_finite() {
        return 0;
    }
    if t >= i32::MAX as f32 {
        i32::MAX
    } else if t <= i32::MIN as f32 {
        i32::MIN
    } else {
        t.round() as i32
    }
}
