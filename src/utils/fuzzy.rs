//! Fuzzy logic helpers
//!
//! Truth levels are plain `f64` values in [0, 1]. Ramps are piecewise
//! linear and clamped, conjunction is `min` and disjunction is `max`.

/// 0 for `x <= 0`, 1 for `x >= delta`, linear in between
pub fn positive(x: f64, delta: f64) -> f64 {
    (x / delta).clamp(0.0, 1.0)
}

/// 0 for `x >= 0`, 1 for `x <= -delta`, linear in between
pub fn negative(x: f64, delta: f64) -> f64 {
    (-x / delta).clamp(0.0, 1.0)
}

pub fn not(x: f64) -> f64 {
    1.0 - x
}

pub fn and(a: f64, b: f64) -> f64 {
    a.min(b)
}

pub fn or(a: f64, b: f64) -> f64 {
    a.max(b)
}

/// Trapezoid 0 → 1 over `[x0, x1]`, 1 over `[x1, x2]`, 1 → 0 over `[x2, x3]`
pub fn between(x: f64, x0: f64, x1: f64, x2: f64, x3: f64) -> f64 {
    debug_assert!(x0 < x1 && x1 <= x2 && x2 < x3);
    and(positive(x - x0, x1 - x0), negative(x - x3, x3 - x2))
}

/// Weighted average of `(value, weight)` pairs
///
/// Returns 0 when all the weights are 0.
pub fn defuzzy(terms: &[(f64, f64)]) -> f64 {
    let (sum, norm) = terms
        .iter()
        .fold((0.0, 0.0), |(s, n), &(value, weight)| (s + value * weight, n + weight));
    if norm > 0.0 {
        sum / norm
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-1.0, 0.0)]
    #[case(0.0, 0.0)]
    #[case(0.05, 0.5)]
    #[case(0.1, 1.0)]
    #[case(3.0, 1.0)]
    fn test_positive(#[case] x: f64, #[case] expected: f64) {
        assert!((positive(x, 0.1) - expected).abs() < 1e-12);
        assert!((negative(-x, 0.1) - expected).abs() < 1e-12);
    }

    #[rstest]
    #[case(-40.0, 0.0)]
    #[case(-30.0, 0.0)]
    #[case(-22.5, 0.5)]
    #[case(-15.0, 1.0)]
    #[case(0.0, 1.0)]
    #[case(15.0, 1.0)]
    #[case(22.5, 0.5)]
    #[case(30.0, 0.0)]
    fn test_between(#[case] x: f64, #[case] expected: f64) {
        assert!((between(x, -30.0, -15.0, 15.0, 30.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_defuzzy() {
        assert!((defuzzy(&[(1.0, 1.0), (0.0, 1.0)]) - 0.5).abs() < 1e-12);
        assert!((defuzzy(&[(0.5, 1.0), (1.0, 0.0)]) - 0.5).abs() < 1e-12);
        assert_eq!(defuzzy(&[(1.0, 0.0)]), 0.0);
    }
}
