// Identity provider seam: account registration, confirmation and password login.

pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use local::LocalIdentityProvider;

/// Errors surfaced by the identity provider
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("confirmation code does not match")]
    CodeMismatch,

    #[error("confirmation code expired")]
    ExpiredCode,

    #[error("user is not confirmed: {0}")]
    UserNotConfirmed(String),

    #[error("incorrect username or password")]
    NotAuthorized,

    #[error("username already exists: {0}")]
    UsernameExists(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// A named profile attribute recorded at sign-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAttribute {
    pub name: String,
    pub value: String,
}

impl UserAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Tokens issued by a successful password login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        username: &str,
        password: &str,
        attributes: &[UserAttribute],
    ) -> Result<(), IdentityError>;

    async fn confirm_sign_up(&self, code: &str, username: &str) -> Result<(), IdentityError>;

    async fn initiate_auth(&self, username: &str, password: &str) -> Result<AuthTokens, IdentityError>;
}
