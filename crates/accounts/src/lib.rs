//! User accounts: storage, password hashing, bearer tokens, and the account
//! service the HTTP layer talks to.

#![warn(clippy::unwrap_used)]

pub mod error;
pub mod password;
pub mod service;
pub mod store;
pub mod token;
pub mod validation;

pub use error::{AccountError, TokenError};
pub use service::AccountService;
pub use store::{InMemoryUserStore, UserStore};
pub use token::{Claims, TokenIssuer};
