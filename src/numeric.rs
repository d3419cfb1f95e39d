//! Numeric conversion helpers used across the project.
//!
//! The bridge computes in `f64`; the host plugin writes `f32` transforms.
//! These utilities guard the narrowing while keeping call-sites terse.

use ordered_float::OrderedFloat;

/// Narrow to `f32`, returning `None` when the value is not representable.
#[expect(
    clippy::cast_possible_truncation,
    reason = "value bounds are checked before casting to f32"
)]
#[must_use]
pub fn f32_from_f64(value: f64) -> Option<f32> {
    if !value.is_finite() || value > f64::from(f32::MAX) || value < f64::from(f32::MIN) {
        return None;
    }
    Some(value as f32)
}

/// Total ordering key for distances so neighbour lists sort without
/// `partial_cmp` unwraps.
#[must_use]
pub const fn distance_key(distance_sq: f64) -> OrderedFloat<f64> {
    OrderedFloat(distance_sq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.5, Some(1.5))]
    #[case(f64::NAN, None)]
    #[case(f64::INFINITY, None)]
    #[case(1e300, None)]
    fn narrowing_checks_range(#[case] value: f64, #[case] expected: Option<f32>) {
        assert_eq!(f32_from_f64(value), expected);
    }

    #[rstest]
    fn distance_keys_order_totally() {
        let mut keys = vec![distance_key(4.0), distance_key(1.0), distance_key(2.5)];
        keys.sort();
        assert_eq!(keys.first().map(|k| k.into_inner()), Some(1.0));
    }
}
