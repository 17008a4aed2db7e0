//! Request extractors for caller identity.
//!
//! `Caller` accepts anonymous requests but rejects a bearer token that fails
//! verification. `AuthUser` additionally requires a token.

use crate::error::ApiError;
use crate::rest::AppState;
use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use binthere_accounts::Claims;
use binthere_session::CallerContext;
use std::net::SocketAddr;
use tracing::warn;

/// The caller of the current request, authenticated or not.
#[derive(Debug, Clone)]
pub struct Caller {
    pub context: CallerContext,
    pub claims: Option<Claims>,
}

/// A caller that presented a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let claims = match bearer_token(&parts.headers) {
            Some(token) => Some(state.accounts.authenticate(token).map_err(|e| {
                warn!(error = %e, "Rejected bearer token");
                ApiError::Forbidden("Invalid or expired token".into())
            })?),
            None => None,
        };

        let context = CallerContext {
            user_id: claims.as_ref().map(|c| c.id.to_string()),
            ip: client_ip(parts, state.trust_forwarded_for),
            user_agent: parts
                .headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        };

        Ok(Caller { context, claims })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let caller = Caller::from_request_parts(parts, state).await?;
        caller
            .claims
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("Access token required".into()))
    }
}

/// Second whitespace-separated word of the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .split_whitespace()
        .nth(1)
}

fn client_ip(parts: &Parts, trust_forwarded_for: bool) -> Option<String> {
    if trust_forwarded_for {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}
