use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::models::{ShiftTemplate, ShiftTemplateInput};

#[derive(Clone)]
pub struct ShiftTemplateRepository {
    pool: SqlitePool,
}

impl ShiftTemplateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        input: &ShiftTemplateInput,
        created_by: Uuid,
    ) -> Result<ShiftTemplate, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, ShiftTemplate>(
            r#"
            INSERT INTO shift_templates (id, title, start_time, end_time, notes, color,
                                         created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, title, start_time, end_time, notes, color, created_by, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.title)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(&input.notes)
        .bind(&input.color)
        .bind(created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ShiftTemplate>, sqlx::Error> {
        sqlx::query_as::<_, ShiftTemplate>(
            r#"
            SELECT id, title, start_time, end_time, notes, color, created_by, created_at, updated_at
            FROM shift_templates
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list(&self) -> Result<Vec<ShiftTemplate>, sqlx::Error> {
        sqlx::query_as::<_, ShiftTemplate>(
            r#"
            SELECT id, title, start_time, end_time, notes, color, created_by, created_at, updated_at
            FROM shift_templates
            ORDER BY start_time, title
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: &ShiftTemplateInput,
    ) -> Result<Option<ShiftTemplate>, sqlx::Error> {
        sqlx::query_as::<_, ShiftTemplate>(
            r#"
            UPDATE shift_templates
            SET title = ?, start_time = ?, end_time = ?, notes = ?, color = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, title, start_time, end_time, notes, color, created_by, created_at, updated_at
            "#,
        )
        .bind(&input.title)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(&input.notes)
        .bind(&input.color)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM shift_templates WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
