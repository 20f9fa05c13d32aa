use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// A flow rate in units per minute.
pub type Rate = Fixed64;

/// A recipe craft time in minutes.
pub type Minutes = Fixed64;

/// Tolerance for flow-conservation checks. Absorbs the rounding of
/// fixed-point divisions accumulated across summed link rates.
pub fn rate_tolerance() -> Rate {
    // 2^-20, roughly 1e-6 units per minute.
    Fixed64::from_bits(1 << 12)
}

/// Convert an f64 to Fixed64. Use only for initialization, never while planning.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never while planning.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Ceiling of `num / den` as a whole unit count (industries, links).
///
/// Fixed-point division can land a hair above an exact integer quotient;
/// a small slop is subtracted before taking the ceiling so that e.g. a
/// true ratio of 2 never rounds up to 3 units. Non-positive numerators
/// yield zero.
pub fn ceil_units(num: Rate, den: Rate) -> u32 {
    if num <= Rate::ZERO {
        return 0;
    }
    let slop = Fixed64::from_bits(1 << 12);
    let q = num / den - slop;
    let units: i64 = q.ceil().to_num();
    units.max(0) as u32
}

/// Ceiling of `value * fraction` as a whole item count (maintained stock).
pub fn ceil_scaled(value: u64, fraction: Fixed64) -> u64 {
    let scaled = Fixed64::from_num(value as i64) * fraction;
    let count: i64 = scaled.ceil().to_num();
    count.max(0) as u64
}
