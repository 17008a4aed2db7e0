//! Account operations used by the auth and disposal endpoints.

use crate::error::AccountError;
use crate::password::{hash_password, verify_password};
use crate::store::UserStore;
use crate::token::{Claims, TokenIssuer};
use crate::validation::{check_password, check_username, is_valid_email, normalize_email};
use binthere_core::types::{PublicUser, User};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct AccountService {
    store: Arc<dyn UserStore>,
    tokens: TokenIssuer,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    /// Create an account and return a token for it.
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(String, PublicUser), AccountError> {
        let username = username.trim();
        let email = normalize_email(email);

        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AccountError::Validation(
                "Username, email, and password are required".into(),
            ));
        }
        check_password(password, "Password")?;
        check_username(username)?;
        if !is_valid_email(&email) {
            return Err(AccountError::Validation(
                "Please provide a valid email address".into(),
            ));
        }

        if self.store.find_by_email(&email).is_some() {
            return Err(AccountError::EmailTaken);
        }
        if self.store.find_by_username(username).is_some() {
            return Err(AccountError::UsernameTaken);
        }

        let now = Utc::now();
        let user = self.store.insert(User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email,
            password_hash: hash_password(password)?,
            items_sorted_count: 0,
            created_at: now,
            updated_at: now,
        })?;

        let token = self.tokens.issue(&user)?;
        metrics::counter!("accounts.registered").increment(1);
        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok((token, PublicUser::from(&user)))
    }

    pub fn login(&self, email: &str, password: &str) -> Result<(String, PublicUser), AccountError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AccountError::Validation(
                "Email and password are required".into(),
            ));
        }

        let user = self
            .store
            .find_by_email(&normalize_email(email))
            .ok_or(AccountError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash) {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user)?;
        info!(user_id = %user.id, "User logged in");
        Ok((token, PublicUser::from(&user)))
    }

    /// Verify a bearer token.
    pub fn authenticate(&self, token: &str) -> Result<Claims, AccountError> {
        Ok(self.tokens.verify(token)?)
    }

    pub fn current_user(&self, id: Uuid) -> Result<PublicUser, AccountError> {
        self.store
            .find_by_id(id)
            .map(|u| PublicUser::from(&u))
            .ok_or(AccountError::NotFound)
    }

    pub fn list_users(&self) -> Vec<PublicUser> {
        self.store.list().iter().map(PublicUser::from).collect()
    }

    pub fn update_password(
        &self,
        id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(AccountError::Validation(
                "Current password and new password are required".into(),
            ));
        }
        check_password(new_password, "New password")?;

        let user = self.store.find_by_id(id).ok_or(AccountError::NotFound)?;
        if !verify_password(current_password, &user.password_hash) {
            return Err(AccountError::WrongPassword);
        }

        self.store
            .update_password_hash(id, hash_password(new_password)?)?;
        info!(user_id = %id, "Password updated");
        Ok(())
    }

    pub fn delete_user(&self, id: Uuid) -> Result<(), AccountError> {
        if !self.store.delete(id) {
            return Err(AccountError::NotFound);
        }
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    pub fn increment_items_sorted(&self, id: Uuid) -> Result<u64, AccountError> {
        let count = self.store.increment_items_sorted(id)?;
        metrics::counter!("accounts.items_sorted").increment(1);
        Ok(count)
    }
}
