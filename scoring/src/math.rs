//! Numeric primitives shared by the scoring functions.

/// Clamp `value` into `[min, max]`. NaN maps to `min`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// Clamp into the unit interval.
pub fn clamp_unit(value: f64) -> f64 {
    clamp(value, 0.0, 1.0)
}

/// Linear growth per item, saturating at `cap`.
pub fn saturating_linear(count: f64, per_item: f64, cap: f64) -> f64 {
    (count * per_item).min(cap)
}

/// `exp(-rate * distance)`. Negative distances count as zero.
pub fn exp_decay(distance: f64, rate: f64) -> f64 {
    (-rate * distance.max(0.0)).exp()
}

/// Laplace-smoothed ratio `(s + 1) / (s + f + 2)`.
///
/// Yields exactly 0.5 with no observations and never reaches 0 or 1.
pub fn laplace_smooth(successes: u64, failures: u64) -> f64 {
    (successes as f64 + 1.0) / (successes as f64 + failures as f64 + 2.0)
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Scale a unit value to an integer score in `[0, 100]`.
pub fn round_score(unit: f64) -> u8 {
    clamp(100.0 * unit, 0.0, 100.0).round() as u8
}
