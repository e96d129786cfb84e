// Per-kg shipping rates to Cameroon, in XAF.
const RATES: &[(&str, &str, f64)] = &[
    ("china", "air", 10_000.0),
    ("china", "sea", 1_500.0),
    ("nigeria", "air", 6_000.0),
    ("nigeria", "road", 2_500.0),
];

const MIN_BILLABLE_KG: f64 = 1.0;

pub fn rate_per_kg(country: &str, method: &str) -> Option<f64> {
    let country = country.trim().to_lowercase();
    let method = method.trim().to_lowercase();
    RATES
        .iter()
        .find(|(c, m, _)| *c == country && *m == method)
        .map(|(_, _, rate)| *rate)
}

pub fn available_methods(country: &str) -> Vec<&'static str> {
    let country = country.trim().to_lowercase();
    RATES
        .iter()
        .filter(|(c, _, _)| *c == country)
        .map(|(_, m, _)| *m)
        .collect()
}

/// Weight billed: at least 1 kg, rounded up to the next half kilo.
pub fn billable_weight(weight_kg: f64) -> f64 {
    let rounded = (weight_kg * 2.0).ceil() / 2.0;
    rounded.max(MIN_BILLABLE_KG)
}

pub fn shipping_cost(country: &str, method: &str, weight_kg: f64) -> Result<f64, String> {
    if weight_kg < 0.0 {
        return Err("Weight cannot be negative".to_string());
    }
    let rate = rate_per_kg(country, method)
        .ok_or_else(|| format!("Shipping by {} from {} is not available", method, country))?;
    Ok(billable_weight(weight_kg) * rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billable_weight() {
        assert_eq!(billable_weight(0.0), 1.0);
        assert_eq!(billable_weight(0.3), 1.0);
        assert_eq!(billable_weight(1.0), 1.0);
        assert_eq!(billable_weight(1.2), 1.5);
        assert_eq!(billable_weight(2.5), 2.5);
        assert_eq!(billable_weight(2.51), 3.0);
    }

    #[test]
    fn test_shipping_cost() {
        assert_eq!(shipping_cost("China", "Air", 2.2).unwrap(), 25_000.0);
        assert_eq!(shipping_cost("nigeria", "road", 0.4).unwrap(), 2_500.0);
        assert!(shipping_cost("nigeria", "sea", 1.0).is_err());
        assert!(shipping_cost("ghana", "air", 1.0).is_err());
    }

    #[test]
    fn test_available_methods() {
        assert_eq!(available_methods("CHINA"), vec!["air", "sea"]);
        assert!(available_methods("ghana").is_empty());
    }
}
