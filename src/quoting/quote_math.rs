//! Pure price arithmetic for quote projection and placement.
//!
//! Placement targets offset the mid by the full basis-point spread on each
//! side; the cycle projection offsets by half of it. Both forms are in use
//! and must stay distinct.

pub fn bp_to_decimal(bp: f64) -> f64 {
    bp / 10_000.0
}

pub fn bid_target(mid: f64, spread_bp: f64) -> f64 {
    mid - mid * bp_to_decimal(spread_bp)
}

pub fn ask_target(mid: f64, spread_bp: f64) -> f64 {
    mid + mid * bp_to_decimal(spread_bp)
}

/// Nearest multiple of `tick`, ties rounding away from zero. A non-positive
/// tick leaves the price untouched.
pub fn round_to_tick(price: f64, tick: f64) -> f64 {
    if tick <= 0.0 || !price.is_finite() || !tick.is_finite() {
        return price;
    }

    (price / tick).round() * tick
}

pub fn max_dev_abs(price: f64, pct: f64) -> f64 {
    price * pct / 100.0
}

pub fn dev(a: f64, b: f64) -> f64 {
    (a - b).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_straddle_the_mid() {
        // 10 bp of 50_000 = 50, applied in full on each side.
        assert_eq!(bid_target(50_000.0, 10.0), 49_950.0);
        assert_eq!(ask_target(50_000.0, 10.0), 50_050.0);
    }

    #[test]
    fn zero_spread_collapses_to_mid() {
        assert_eq!(bid_target(50_000.0, 0.0), 50_000.0);
        assert_eq!(ask_target(50_000.0, 0.0), 50_000.0);
    }

    #[test]
    fn targets_bracket_mid_for_any_non_negative_spread() {
        for spread_bp in [0.0, 1.0, 10.0, 250.0, 10_000.0] {
            let mid = 3_141.59;
            assert!(bid_target(mid, spread_bp) <= mid);
            assert!(ask_target(mid, spread_bp) >= mid);
        }
    }

    #[test]
    fn round_to_tick_snaps_to_multiples() {
        assert_eq!(round_to_tick(49_950.4, 1.0), 49_950.0);
        assert_eq!(round_to_tick(49_950.6, 1.0), 49_951.0);
        assert_eq!(round_to_tick(101.3, 0.5), 101.5);
    }

    #[test]
    fn round_to_tick_half_rounds_up() {
        assert_eq!(round_to_tick(0.5, 1.0), 1.0);
        assert_eq!(round_to_tick(2.5, 1.0), 3.0);
    }

    #[test]
    fn rounded_price_is_within_half_a_tick() {
        for price in [0.0, 0.7, 12.34, 49_950.49, 103_862.2] {
            for tick in [0.01, 0.5, 1.0, 5.0] {
                let rounded = round_to_tick(price, tick);
                let steps = rounded / tick;
                assert!((steps - steps.round()).abs() < 1e-9, "{rounded} not on {tick} grid");
                assert!((rounded - price).abs() <= tick / 2.0 + 1e-9);
            }
        }
    }

    #[test]
    fn round_to_tick_ignores_non_positive_tick() {
        assert_eq!(round_to_tick(123.456, 0.0), 123.456);
        assert_eq!(round_to_tick(123.456, -1.0), 123.456);
    }

    #[test]
    fn deviation_threshold_is_percentage_based() {
        // 5% of 53_000 = 2_650.
        assert_eq!(max_dev_abs(53_000.0, 5.0), 2_650.0);
        assert_eq!(max_dev_abs(0.0, 5.0), 0.0);
    }

    #[test]
    fn dev_is_symmetric() {
        assert_eq!(dev(49_950.0, 53_000.0), 3_050.0);
        assert_eq!(dev(53_000.0, 49_950.0), 3_050.0);
    }
}
