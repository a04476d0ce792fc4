use rand::RngCore;
use subtle::ConstantTimeEq;

/// Length in bytes of session and CSRF tokens before hex encoding.
pub const TOKEN_BYTES: usize = 32;

/// Generate a random 256-bit token, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compare two tokens without leaking the position of the first mismatch.
pub fn tokens_match(expected: &str, candidate: &str) -> bool {
    expected.as_bytes().ct_eq(candidate.as_bytes()).into()
}
