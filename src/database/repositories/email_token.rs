use chrono::{Duration, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::database::models::{EmailToken, TokenPurpose};

const TOKEN_TTL_HOURS: i64 = 24;

/// Generate a cryptographically secure random token
fn generate_secure_token() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                                abcdefghijklmnopqrstuvwxyz\
                                0123456789";
    const TOKEN_LEN: usize = 48;
    let mut rng = rand::rng();

    (0..TOKEN_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[derive(Clone)]
pub struct EmailTokenRepository {
    pool: SqlitePool,
}

impl EmailTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        profile_id: Uuid,
        purpose: TokenPurpose,
        new_email: Option<&str>,
    ) -> Result<EmailToken, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, EmailToken>(
            r#"
            INSERT INTO email_tokens (id, profile_id, token, purpose, new_email, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, profile_id, token, purpose, new_email, expires_at, used_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(profile_id)
        .bind(generate_secure_token())
        .bind(purpose)
        .bind(new_email)
        .bind(now + Duration::hours(TOKEN_TTL_HOURS))
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<EmailToken>, sqlx::Error> {
        sqlx::query_as::<_, EmailToken>(
            r#"
            SELECT id, profile_id, token, purpose, new_email, expires_at, used_at, created_at
            FROM email_tokens
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Single-use guard: false when another request consumed it first
    pub async fn mark_used(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE email_tokens SET used_at = ? WHERE id = ? AND used_at IS NULL")
                .bind(Utc::now())
                .bind(id)
                .execute(&mut **tx)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_tokens WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
