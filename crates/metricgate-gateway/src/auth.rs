//! Bearer-token tiers.
//!
//! The read tier guards catalog and query routes; the admin tier guards
//! manifest refresh. The two keys are independent: neither is accepted in
//! place of the other.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use metricgate_core::error::GateError;

use crate::app_state::AppState;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Read,
    Admin,
}

/// The two configured keys.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    admin_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, admin_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            admin_key: admin_key.into(),
        }
    }

    fn expected(&self, tier: Tier) -> &str {
        match tier {
            Tier::Read => &self.api_key,
            Tier::Admin => &self.admin_key,
        }
    }

    pub fn verify(&self, tier: Tier, headers: &HeaderMap) -> Result<(), GateError> {
        let presented = bearer_token(headers).ok_or(GateError::Unauthorized("Not authenticated"))?;
        if tokens_match(presented, self.expected(tier)) {
            return Ok(());
        }
        Err(GateError::Unauthorized(match tier {
            Tier::Read => "Invalid API key",
            Tier::Admin => "Invalid admin key",
        }))
    }
}

/// Constant-time comparison; length mismatch still returns false.
pub fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// `Authorization: Bearer <token>`, scheme case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub async fn require_read(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    state.credentials().verify(Tier::Read, request.headers())?;
    Ok(next.run(request).await)
}

pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    state.credentials().verify(Tier::Admin, request.headers())?;
    Ok(next.run(request).await)
}
