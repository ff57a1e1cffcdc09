/// Decimal places kept in interpolated prices
const PRICE_DECIMALS: i32 = 10;

/// True when the bracketing instants coincide and no interpolation is possible
pub fn is_degenerate(before_time: i64, after_time: i64) -> bool {
    before_time == after_time
}

/// Linear estimate of the price at `target_time` from two bracketing prices.
///
/// The time fraction is clamped to `[0, 1]`, so targets outside the bracket
/// return the nearer price. A degenerate bracket returns `before_price`
/// unchanged.
pub fn interpolate(
    target_time: i64,
    before_time: i64,
    after_time: i64,
    before_price: f64,
    after_price: f64,
) -> f64 {
    if is_degenerate(before_time, after_time) {
        return before_price;
    }

    let fraction = ((target_time - before_time) as f64 / (after_time - before_time) as f64).clamp(0.0, 1.0);

    round_decimals(before_price + fraction * (after_price - before_price), PRICE_DECIMALS)
}

fn round_decimals(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}
