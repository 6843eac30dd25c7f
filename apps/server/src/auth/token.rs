use rand::Rng;
use subtle::ConstantTimeEq;

/// Generates a cryptographically secure 40-character hex token
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 20] = rng.random();
    hex::encode(bytes)
}

/// Validates token format (40 lowercase hex chars)
pub fn is_valid_token_format(token: &str) -> bool {
    token.len() == 40
        && token
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_uppercase())
}

/// Compares a presented secret against the expected one in constant time
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
