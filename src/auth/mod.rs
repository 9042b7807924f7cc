use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claim name carrying the caller's role
pub const ROLE_CLAIM: &str = "custom:role";

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Id,
    Access,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(rename = "custom:role", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub token_use: TokenUse,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// Signs and verifies the HS256 tokens handed out at login
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    expiry_hours: u64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("expiry_hours", &self.expiry_hours)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, expiry_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            expiry_hours,
        }
    }

    pub fn from_config(security: &crate::config::SecurityConfig) -> Self {
        Self::new(security.jwt_secret.clone(), security.jwt_expiry_hours)
    }

    /// Build claims for a user, stamped with the configured expiry
    pub fn claims(&self, sub: &str, email: &str, role: Option<&str>, token_use: TokenUse) -> Claims {
        let now = Utc::now();
        let exp = (now + Duration::hours(self.expiry_hours as i64)).timestamp();

        Claims {
            sub: sub.to_string(),
            email: email.to_string(),
            // Access tokens never carry profile attributes
            role: match token_use {
                TokenUse::Id => role.map(str::to_string),
                TokenUse::Access => None,
            },
            token_use,
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::default(), claims, &encoding_key)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
            .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_token_roundtrip_keeps_role() {
        let issuer = TokenIssuer::new("secret", 1);
        let claims = issuer.claims("u-1", "a@example.com", Some("admin"), TokenUse::Id);
        let token = issuer.issue(&claims).unwrap();

        let decoded = issuer.verify(&token).unwrap();
        assert_eq!(decoded.sub, "u-1");
        assert_eq!(decoded.role.as_deref(), Some("admin"));
        assert_eq!(decoded.token_use, TokenUse::Id);
    }

    #[test]
    fn access_token_has_no_role() {
        let issuer = TokenIssuer::new("secret", 1);
        let claims = issuer.claims("u-1", "a@example.com", Some("admin"), TokenUse::Access);
        let token = issuer.issue(&claims).unwrap();
        assert_eq!(issuer.verify(&token).unwrap().role, None);
    }

    #[test]
    fn role_serializes_under_custom_claim_name() {
        let issuer = TokenIssuer::new("secret", 1);
        let claims = issuer.claims("u-1", "a@example.com", Some("user"), TokenUse::Id);
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value[ROLE_CLAIM], "user");
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let issuer = TokenIssuer::new("secret", 1);
        let other = TokenIssuer::new("other", 1);
        let token = other
            .issue(&other.claims("u", "e@x.io", Some("admin"), TokenUse::Id))
            .unwrap();
        assert!(matches!(issuer.verify(&token), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn empty_secret_is_refused() {
        let issuer = TokenIssuer::new("", 1);
        let claims = issuer.claims("u", "e@x.io", None, TokenUse::Id);
        assert!(matches!(issuer.issue(&claims), Err(JwtError::InvalidSecret)));
    }
}
