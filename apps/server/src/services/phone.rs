//! Phone normalization for WhatsApp destinations.

/// Country calling code used when none is configured
pub const DEFAULT_COUNTRY_CODE: &str = "55";

/// Normalizes a raw phone with the default country code
pub fn normalize(raw: &str) -> String {
    normalize_with_country_code(raw, DEFAULT_COUNTRY_CODE)
}

/// Strips every non-digit and prefixes `country_code` unless already present.
///
/// No length validation: malformed numbers pass through and fail at the
/// provider. A local number whose area code happens to equal the country
/// code is left unprefixed.
pub fn normalize_with_country_code(raw: &str, country_code: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    if digits.starts_with(country_code) {
        digits
    } else {
        format!("{}{}", country_code, digits)
    }
}
