use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::{AuthTokens, IdentityError, IdentityProvider, UserAttribute};
use crate::auth::{TokenIssuer, TokenUse, ROLE_CLAIM};

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct LocalUser {
    sub: Uuid,
    /// bcrypt hash, salt and cost embedded
    password_hash: String,
    attributes: HashMap<String, String>,
    confirmed: bool,
    pending: Option<PendingCode>,
}

/// In-process identity provider.
///
/// Users sign up, receive a six digit confirmation code (written to the log), and once
/// confirmed can log in to receive HS256 id/access tokens from the shared [`TokenIssuer`].
pub struct LocalIdentityProvider {
    users: DashMap<String, LocalUser>,
    tokens: TokenIssuer,
    code_ttl: Duration,
    password_cost: u32,
    bootstrap_admins: HashSet<String>,
}

impl LocalIdentityProvider {
    pub fn new(tokens: TokenIssuer, config: &crate::config::IdentityConfig) -> Self {
        Self {
            users: DashMap::new(),
            tokens,
            code_ttl: Duration::hours(config.confirmation_code_ttl_hours as i64),
            password_cost: config.password_cost,
            bootstrap_admins: config.bootstrap_admins.iter().cloned().collect(),
        }
    }

    /// The outstanding confirmation code for a user, if any
    pub fn pending_confirmation_code(&self, username: &str) -> Option<String> {
        self.users
            .get(username)
            .and_then(|user| user.pending.as_ref().map(|p| p.code.clone()))
    }

    /// Replace a user's role attribute (administrative action)
    pub fn set_role(&self, username: &str, role: &str) -> Result<(), IdentityError> {
        let mut user = self
            .users
            .get_mut(username)
            .ok_or_else(|| IdentityError::UserNotFound(username.to_string()))?;
        user.attributes.insert(ROLE_CLAIM.to_string(), role.to_string());
        tracing::info!("Role for {} set to {}", username, role);
        Ok(())
    }

    #[cfg(test)]
    fn expire_pending_code(&self, username: &str) {
        if let Some(mut user) = self.users.get_mut(username) {
            if let Some(pending) = user.pending.as_mut() {
                pending.expires_at = Utc::now() - Duration::seconds(1);
            }
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String, IdentityError> {
        let (password, cost) = (password.to_string(), self.password_cost);
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?
            .map_err(|e| IdentityError::Unavailable(format!("password hashing failed: {}", e)))
    }

    async fn verify_password(password: &str, hash: &str) -> Result<bool, IdentityError> {
        let (password, hash) = (password.to_string(), hash.to_string());
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?
            .map_err(|e| IdentityError::Unavailable(format!("password verification failed: {}", e)))
    }

    fn new_confirmation_code() -> String {
        format!("{:06}", Uuid::new_v4().as_u128() % 1_000_000)
    }

    fn token(&self, user: &LocalUser, username: &str, token_use: TokenUse) -> Result<String, IdentityError> {
        let role = user.attributes.get(ROLE_CLAIM).map(String::as_str);
        let claims = self.tokens.claims(&user.sub.to_string(), username, role, token_use);
        self.tokens
            .issue(&claims)
            .map_err(|e| IdentityError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(
        &self,
        username: &str,
        password: &str,
        attributes: &[UserAttribute],
    ) -> Result<(), IdentityError> {
        let mut attributes: HashMap<String, String> = attributes
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        if self.bootstrap_admins.contains(username) {
            attributes.insert(ROLE_CLAIM.to_string(), "admin".to_string());
        }

        if self.users.contains_key(username) {
            return Err(IdentityError::UsernameExists(username.to_string()));
        }

        let code = Self::new_confirmation_code();
        let user = LocalUser {
            sub: Uuid::new_v4(),
            password_hash: self.hash_password(password).await?,
            attributes,
            confirmed: false,
            pending: Some(PendingCode {
                code: code.clone(),
                expires_at: Utc::now() + self.code_ttl,
            }),
        };

        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => Err(IdentityError::UsernameExists(username.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(user);
                tracing::info!(target: "identity", username, code = %code, "Confirmation code issued");
                Ok(())
            }
        }
    }

    async fn confirm_sign_up(&self, code: &str, username: &str) -> Result<(), IdentityError> {
        let mut user = self
            .users
            .get_mut(username)
            .ok_or_else(|| IdentityError::UserNotFound(username.to_string()))?;

        let pending = user.pending.as_ref().ok_or(IdentityError::CodeMismatch)?;
        if pending.code != code {
            return Err(IdentityError::CodeMismatch);
        }
        if pending.expires_at < Utc::now() {
            return Err(IdentityError::ExpiredCode);
        }

        user.confirmed = true;
        user.pending = None;
        tracing::info!("User {} confirmed", username);
        Ok(())
    }

    async fn initiate_auth(&self, username: &str, password: &str) -> Result<AuthTokens, IdentityError> {
        let user = self
            .users
            .get(username)
            .map(|u| u.value().clone())
            .ok_or_else(|| IdentityError::UserNotFound(username.to_string()))?;

        if !Self::verify_password(password, &user.password_hash).await? {
            return Err(IdentityError::NotAuthorized);
        }
        if !user.confirmed {
            return Err(IdentityError::UserNotConfirmed(username.to_string()));
        }

        Ok(AuthTokens {
            id_token: self.token(&user, username, TokenUse::Id)?,
            access_token: self.token(&user, username, TokenUse::Access)?,
            refresh_token: Uuid::new_v4().simple().to_string(),
        })
    }
}
