/// Clamps `val` into `[-limit, limit]`
///
/// Never panics, a negative `limit` just collapses the range onto `-limit`.
pub fn clamp_symmetric(val: f64, limit: f64) -> f64 {
    val.min(limit).max(-limit)
}

/// Clamps `val` into `[min, max]`
///
/// If the range is inverted `min` wins.
pub fn clamp_range(val: f64, min: f64, max: f64) -> f64 {
    val.min(max).max(min)
}

/// Single pole low pass filter
///
/// `alpha` is the weight of the new sample: 0 keeps `prev` forever, 1 passes `sample` through.
pub fn ema(prev: f64, sample: f64, alpha: f64) -> f64 {
    (1.0 - alpha) * prev + alpha * sample
}
