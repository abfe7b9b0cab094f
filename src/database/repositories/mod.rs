use uuid::Uuid;

pub mod email_token;
pub mod leave;
pub mod profile;
pub mod shift;
pub mod shift_template;
pub mod team;
pub mod transfer;

// Re-export all repositories for easy importing
pub use email_token::EmailTokenRepository;
pub use leave::LeaveRepository;
pub use profile::ProfileRepository;
pub use shift::ShiftRepository;
pub use shift_template::ShiftTemplateRepository;
pub use team::TeamRepository;
pub use transfer::{Responder, TransferRepository};

/// Row visibility applied inside queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every row (admins)
    All,
    /// Rows the profile owns or that belong to teams it manages
    Restricted(Uuid),
}
