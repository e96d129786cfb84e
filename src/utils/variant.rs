/// Cart key for one purchasable variant: `size` or `size-colorHex`.
pub fn variant_key(size: &str, color_hex: Option<&str>) -> String {
    match color_hex.filter(|hex| !hex.is_empty()) {
        Some(hex) => format!("{}-{}", size, hex),
        None => size.to_string(),
    }
}

/// Splits a variant key back into size and color hex.
/// The color part starts at the last `-#`, so sizes may contain dashes.
pub fn parse_variant_key(key: &str) -> (String, Option<String>) {
    match key.rfind("-#") {
        Some(idx) if idx > 0 => {
            let (size, hex) = key.split_at(idx);
            (size.to_string(), Some(hex[1..].to_string()))
        }
        _ => (key.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_key_format() {
        assert_eq!(variant_key("M", Some("#FF0000")), "M-#FF0000");
        assert_eq!(variant_key("N/A", None), "N/A");
        assert_eq!(variant_key("L", Some("")), "L");
    }

    #[test]
    fn test_parse_variant_key() {
        assert_eq!(parse_variant_key("M-#FF0000"), ("M".to_string(), Some("#FF0000".to_string())));
        assert_eq!(parse_variant_key("N/A"), ("N/A".to_string(), None));
        assert_eq!(parse_variant_key("EU-42-#000"), ("EU-42".to_string(), Some("#000".to_string())));
        assert_eq!(parse_variant_key("EU-42"), ("EU-42".to_string(), None));
    }
}
