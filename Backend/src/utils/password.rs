// Werkzeug-compatible password hashes:
//   pbkdf2:sha256:<iterations>$<salt>$<hash>
// Salt and hash are written as unpadded URL-safe base64; older rows may carry
// padded/standard base64 or hex, all of which verify.

use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::Rng;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[cfg(not(test))]
const ITERATIONS: u32 = 260_000;
#[cfg(test)]
const ITERATIONS: u32 = 1_000;
const KEY_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;
const METHOD: &str = "pbkdf2:sha256";

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Malformed password hash")]
    Malformed,

    #[error("Undecodable {0} in password hash")]
    Encoding(&'static str),

    #[error("PBKDF2 failed: {0}")]
    Derive(String),
}

struct StoredHash {
    iterations: u32,
    salt: Vec<u8>,
    key: Vec<u8>,
}

impl StoredHash {
    fn parse(stored: &str) -> Result<Self, PasswordError> {
        let mut parts = stored.split('$');
        let (Some(header), Some(salt), Some(key), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(PasswordError::Malformed);
        };

        let iterations = header
            .strip_prefix(METHOD)
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or(PasswordError::Malformed)?;

        Ok(Self {
            iterations,
            salt: decode_any(salt).ok_or(PasswordError::Encoding("salt"))?,
            key: decode_any(key).ok_or(PasswordError::Encoding("hash"))?,
        })
    }
}

fn derive(secret: &str, salt: &[u8], iterations: u32, out: &mut [u8]) -> Result<(), PasswordError> {
    pbkdf2::<HmacSha256>(secret.as_bytes(), salt, iterations, out).map_err(|e| PasswordError::Derive(e.to_string()))
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill(&mut salt);

    let mut key = [0u8; KEY_LENGTH];
    derive(password, &salt, ITERATIONS, &mut key)?;

    Ok(format!(
        "{}:{}${}${}",
        METHOD,
        ITERATIONS,
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(key)
    ))
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let stored = StoredHash::parse(stored)?;

    let mut computed = vec![0u8; stored.key.len()];
    derive(password, &stored.salt, stored.iterations, &mut computed)?;

    Ok(constant_time_eq(&computed, &stored.key))
}

/// Security answers share the password format, over the trimmed lower-cased text
pub fn hash_answer(answer: &str) -> Result<String, PasswordError> {
    hash_password(&normalize_answer(answer))
}

pub fn verify_answer(answer: &str, stored: &str) -> Result<bool, PasswordError> {
    verify_password(&normalize_answer(answer), stored)
}

fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn decode_any(input: &str) -> Option<Vec<u8>> {
    // 32-byte keys written as hex
    if input.len() == 2 * KEY_LENGTH && input.chars().all(|c| c.is_ascii_hexdigit()) {
        return hex::decode(input).ok();
    }

    let padded = format!("{}{}", input, "=".repeat((4 - input.len() % 4) % 4));
    [&URL_SAFE_NO_PAD, &STANDARD_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(input).ok())
        .or_else(|| [&URL_SAFE, &STANDARD].iter().find_map(|engine| engine.decode(&padded).ok()))
        .or_else(|| hex::decode(input).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("tilapia-2024").unwrap();

        assert!(hash.starts_with(&format!("pbkdf2:sha256:{}$", ITERATIONS)));
        assert!(verify_password("tilapia-2024", &hash).unwrap());
        assert!(!verify_password("tilapia-2025", &hash).unwrap());
    }

    #[test]
    fn test_answer_is_normalized() {
        let hash = hash_answer("  Lima ").unwrap();

        assert!(verify_answer("lima", &hash).unwrap());
        assert!(verify_answer("LIMA", &hash).unwrap());
        assert!(!verify_answer("cusco", &hash).unwrap());
    }

    #[test]
    fn test_hex_encoded_hash_verifies() {
        let salt = b"0123456789abcdef";
        let mut key = [0u8; KEY_LENGTH];
        derive("trucha", salt, 1_000, &mut key).unwrap();
        let stored = format!("pbkdf2:sha256:1000${}${}", URL_SAFE_NO_PAD.encode(salt), hex::encode(key));

        assert!(verify_password("trucha", &stored).unwrap());
    }

    #[test]
    fn test_malformed_hash_rejected() {
        assert!(matches!(verify_password("x", "not-a-hash"), Err(PasswordError::Malformed)));
        assert!(matches!(verify_password("x", "md5:1$a$b"), Err(PasswordError::Malformed)));
    }
}
