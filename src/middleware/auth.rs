use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{Claims, TokenIssuer};
use crate::error::ApiError;

/// Who is calling, as established from the id token
#[derive(Clone, Debug, Default)]
pub struct Caller {
    pub subject: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.subject.is_none()
    }
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self {
            subject: Some(claims.sub),
            email: Some(claims.email),
            role: claims.role,
        }
    }
}

/// Resolves the `Authorization` header into a [`Caller`] extension.
///
/// A missing header yields an anonymous caller; whether that is acceptable is decided
/// per operation by the request pipeline. A present but invalid token is rejected here.
pub async fn caller_middleware(
    State(tokens): State<Arc<TokenIssuer>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = match extract_token(request.headers())? {
        Some(token) => Caller::from(tokens.verify(&token)?),
        None => Caller::anonymous(),
    };

    tracing::trace!("Caller resolved: subject={:?}, role={:?}", caller.subject, caller.role);
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Token from the Authorization header, with or without a `Bearer ` prefix
fn extract_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized("Empty token"));
    }
    Ok(Some(token.to_string()))
}
