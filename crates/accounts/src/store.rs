//! User persistence behind a narrow trait, with a DashMap-backed default.

use crate::error::AccountError;
use binthere_core::types::User;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Storage for user accounts. Email and username are unique keys.
pub trait UserStore: Send + Sync {
    fn insert(&self, user: User) -> Result<User, AccountError>;
    fn find_by_id(&self, id: Uuid) -> Option<User>;
    fn find_by_email(&self, email: &str) -> Option<User>;
    fn find_by_username(&self, username: &str) -> Option<User>;
    fn list(&self) -> Vec<User>;
    fn update_password_hash(&self, id: Uuid, password_hash: String) -> Result<(), AccountError>;
    /// Returns `true` when the user existed.
    fn delete(&self, id: Uuid) -> bool;
    /// Atomically add one to the user's sorted-items counter and return the new value.
    fn increment_items_sorted(&self, id: Uuid) -> Result<u64, AccountError>;
}

/// In-process user store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: DashMap<Uuid, User>,
    by_email: DashMap<String, Uuid>,
    by_username: DashMap<String, Uuid>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, id: Option<Uuid>) -> Option<User> {
        id.and_then(|id| self.users.get(&id).map(|u| u.clone()))
    }
}

impl UserStore for InMemoryUserStore {
    fn insert(&self, user: User) -> Result<User, AccountError> {
        // Claim both unique keys before the record becomes visible.
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => return Err(AccountError::EmailTaken),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }
        match self.by_username.entry(user.username.clone()) {
            Entry::Occupied(_) => {
                self.by_email.remove(&user.email);
                return Err(AccountError::UsernameTaken);
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }

        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn find_by_id(&self, id: Uuid) -> Option<User> {
        self.lookup(Some(id))
    }

    fn find_by_email(&self, email: &str) -> Option<User> {
        self.lookup(self.by_email.get(email).map(|id| *id))
    }

    fn find_by_username(&self, username: &str) -> Option<User> {
        self.lookup(self.by_username.get(username).map(|id| *id))
    }

    fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by_key(|u| u.created_at);
        users
    }

    fn update_password_hash(&self, id: Uuid, password_hash: String) -> Result<(), AccountError> {
        let mut user = self.users.get_mut(&id).ok_or(AccountError::NotFound)?;
        user.password_hash = password_hash;
        user.updated_at = Utc::now();
        Ok(())
    }

    fn delete(&self, id: Uuid) -> bool {
        match self.users.remove(&id) {
            Some((_, user)) => {
                self.by_email.remove(&user.email);
                self.by_username.remove(&user.username);
                true
            }
            None => false,
        }
    }

    fn increment_items_sorted(&self, id: Uuid) -> Result<u64, AccountError> {
        let mut user = self.users.get_mut(&id).ok_or(AccountError::NotFound)?;
        user.items_sorted_count += 1;
        user.updated_at = Utc::now();
        Ok(user.items_sorted_count)
    }
}
