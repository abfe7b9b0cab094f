pub mod auth;
pub mod email_token;
pub mod leave;
pub(crate) mod macros;
pub mod profile;
pub mod shift;
pub mod team;
pub mod transfer;

// Re-export all models for easy importing
pub use auth::*;
pub use email_token::*;
pub use leave::*;
pub use profile::*;
pub use shift::*;
pub use team::*;
pub use transfer::*;

/// A workflow action that is not an edge out of the record's current status
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} a request that is {from}")]
pub struct TransitionError {
    pub from: &'static str,
    pub action: &'static str,
}

impl TransitionError {
    pub fn new(from: &'static str, action: &'static str) -> Self {
        Self { from, action }
    }
}
