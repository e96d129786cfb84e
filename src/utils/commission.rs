/// Rate every affiliate starts at.
pub const BASE_COMMISSION_RATE: f64 = 0.05;
const MID_COMMISSION_RATE: f64 = 0.075;
const TOP_COMMISSION_RATE: f64 = 0.10;

const MID_TIER_MIN_SALES: i64 = 11;
const TOP_TIER_MIN_SALES: i64 = 25;

/// Commission tier for an affiliate's cumulative sales count.
pub fn commission_rate_for_sales(total_sales: i64) -> f64 {
    if total_sales >= TOP_TIER_MIN_SALES {
        TOP_COMMISSION_RATE
    } else if total_sales >= MID_TIER_MIN_SALES {
        MID_COMMISSION_RATE
    } else {
        BASE_COMMISSION_RATE
    }
}

/// Signups per click, as a percentage. Zero clicks gives zero.
pub fn conversion_rate(signups: i64, clicks: i64) -> f64 {
    if clicks <= 0 {
        return 0.0;
    }
    signups as f64 / clicks as f64 * 100.0
}

/// Commission owed on a referred purchase, rounded to two decimals.
pub fn commission_for(amount: f64, rate: f64) -> f64 {
    (amount * rate * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_tier_boundaries() {
        assert_eq!(commission_rate_for_sales(0), 0.05);
        assert_eq!(commission_rate_for_sales(10), 0.05);
        assert_eq!(commission_rate_for_sales(11), 0.075);
        assert_eq!(commission_rate_for_sales(24), 0.075);
        assert_eq!(commission_rate_for_sales(25), 0.10);
        assert_eq!(commission_rate_for_sales(400), 0.10);
    }

    #[test]
    fn test_conversion_rate() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(3, 0), 0.0);
        assert_eq!(conversion_rate(1, 4), 25.0);
        assert_eq!(conversion_rate(2, 2), 100.0);
        assert!((conversion_rate(1, 3) - 33.333333).abs() < 0.0001);
    }

    #[test]
    fn test_commission_for() {
        assert_eq!(commission_for(10000.0, 0.05), 500.0);
        assert_eq!(commission_for(3333.0, 0.05), 166.65);
        assert_eq!(commission_for(1000.0, 0.075), 75.0);
        assert_eq!(commission_for(0.0, 0.10), 0.0);
    }
}
