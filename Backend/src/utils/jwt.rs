// Session tokens: HS256, signed with JWT_SECRET, valid for TOKEN_TTL_HOURS.
// The claims carry the permission groups so route guards never hit the DB.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

use crate::models::user_group::AccessGroup;

pub const TOKEN_TTL_HOURS: i64 = 24;

static SECRET: OnceLock<String> = OnceLock::new();

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Sign(jsonwebtoken::errors::Error),

    #[error("Invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub username: String,
    pub is_staff: bool,
    pub groups: Vec<AccessGroup>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn for_user(user_id: i32, username: &str, is_staff: bool, groups: Vec<AccessGroup>) -> Self {
        let issued = Utc::now();
        Self {
            sub: user_id,
            username: username.to_string(),
            is_staff,
            groups,
            iat: issued.timestamp(),
            exp: (issued + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        }
    }
}

fn secret() -> &'static [u8] {
    SECRET
        .get_or_init(|| {
            env::var("JWT_SECRET").unwrap_or_else(|_| {
                warn!("⚠️  JWT_SECRET not set, using the built-in key (INSECURE)");
                "sierra-nevada-insecure-dev-key".to_string()
            })
        })
        .as_bytes()
}

pub fn sign(claims: &Claims) -> Result<String, TokenError> {
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret()))
        .map_err(TokenError::Sign)
}

/// Checks signature and expiry
pub fn verify(token: &str) -> Result<Claims, TokenError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret()), &Validation::new(Algorithm::HS256))
        .map(|data| data.claims)
        .map_err(TokenError::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let token = sign(&Claims::for_user(123, "operator", false, vec![AccessGroup::Production])).unwrap();
        let claims = verify(&token).unwrap();

        assert_eq!(claims.sub, 123);
        assert_eq!(claims.username, "operator");
        assert!(!claims.is_staff);
        assert_eq!(claims.groups, vec![AccessGroup::Production]);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut claims = Claims::for_user(1, "old", true, vec![]);
        claims.iat -= 3 * 24 * 3600;
        claims.exp -= 3 * 24 * 3600;

        let token = sign(&claims).unwrap();
        assert!(matches!(verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(verify("invalid.token.here").is_err());
    }
}
