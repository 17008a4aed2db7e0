#![warn(clippy::unwrap_used)]

pub mod identity;
pub mod tracker;

pub use identity::{CallerContext, SessionIdentity};
pub use tracker::{SessionRecord, SessionTracker};
