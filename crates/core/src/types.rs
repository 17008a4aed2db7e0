//! Shared domain and wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Users ──────────────────────────────────────────────────────────────────

/// A stored user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub items_sorted_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The part of a user account that is safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub items_sorted_count: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            items_sorted_count: user.items_sorted_count,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdateRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// Returned by register and login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

// ─── Sessions ───────────────────────────────────────────────────────────────

/// Snapshot of the prediction session registry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total: usize,
    pub with_predictions: usize,
    pub confirmed: usize,
}

/// Body of a successful disposal confirmation. `items_sorted_count` is only
/// present for authenticated callers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisposalResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_sorted_count: Option<u64>,
}

// ─── Contact ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

/// Generic `{success, message}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stats_wire_names() {
        let stats = SessionStats {
            total: 3,
            with_predictions: 2,
            confirmed: 1,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"total": 3, "withPredictions": 2, "confirmed": 1})
        );
    }

    #[test]
    fn test_public_user_hides_password_hash() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "sorter".into(),
            email: "sorter@example.com".into(),
            password_hash: "abc$def".into(),
            items_sorted_count: 4,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(!json.contains("abc$def"));
        assert!(json.contains("\"itemsSortedCount\":4"));
    }

    #[test]
    fn test_anonymous_disposal_response_omits_count() {
        let resp = DisposalResponse {
            success: true,
            message: "Disposal confirmed".into(),
            items_sorted_count: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("itemsSortedCount"));
    }
}
