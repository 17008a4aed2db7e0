//! Caller identity for prediction sessions.
//!
//! Authenticated callers are keyed by user id. Anonymous callers are keyed by
//! the base64 encoding of their network address followed by their user agent.
//! The anonymous key is an encoding, not a hash: two browsers with the same
//! UA behind one NAT share a session, and changing the UA starts a new one.

use base64::Engine;
use std::fmt;

const UNKNOWN: &str = "unknown";

/// Per-request facts the tracker needs to identify a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl CallerContext {
    pub fn anonymous(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            user_id: None,
            ip: Some(ip.into()),
            user_agent: Some(user_agent.into()),
        }
    }

    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        non_empty(self.user_id.as_deref()).is_some()
    }

    /// Derive the session key for this caller.
    pub fn identity(&self) -> SessionIdentity {
        if let Some(user_id) = non_empty(self.user_id.as_deref()) {
            return SessionIdentity(format!("user_{user_id}"));
        }

        let ip = non_empty(self.ip.as_deref()).unwrap_or(UNKNOWN);
        let user_agent = non_empty(self.user_agent.as_deref()).unwrap_or(UNKNOWN);
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{ip}{user_agent}"));
        SessionIdentity(format!("anon_{encoded}"))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Opaque session key. `user_<id>` or `anon_<base64>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionIdentity(String);

impl SessionIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&CallerContext> for SessionIdentity {
    fn from(ctx: &CallerContext) -> Self {
        ctx.identity()
    }
}
