use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum TokenPurpose {
        SignupConfirmation => "signup_confirmation",
        EmailChange => "email_change",
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailToken {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub token: String,
    pub purpose: TokenPurpose,
    pub new_email: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EmailToken {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}
