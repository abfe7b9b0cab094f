use chrono::{NaiveDate, Utc};
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::database::models::{ConflictingShift, Shift, ShiftQuery, ShiftStatus};
use crate::database::repositories::Scope;

const DEFAULT_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Shift>, sqlx::Error> {
        Self::fetch_by_id(&self.pool, id).await
    }

    pub async fn find_by_id_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
    ) -> Result<Option<Shift>, sqlx::Error> {
        Self::fetch_by_id(&mut **tx, id).await
    }

    async fn fetch_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Shift>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, employee_id, team_id, title, shift_date, start_time, end_time,
                   status, notes, created_by, created_at, updated_at
            FROM shifts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Shifts matching the filters, restricted to what the scope may see
    pub async fn list(&self, query: &ShiftQuery, scope: Scope) -> Result<Vec<Shift>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT id, employee_id, team_id, title, shift_date, start_time, end_time,
                   status, notes, created_by, created_at, updated_at
            FROM shifts
            WHERE 1 = 1
            "#,
        );

        if let Scope::Restricted(viewer) = scope {
            builder
                .push(" AND (employee_id = ")
                .push_bind(viewer)
                .push(" OR team_id IN (SELECT team_id FROM team_members WHERE role = 'manager' AND profile_id = ")
                .push_bind(viewer)
                .push("))");
        }
        if let Some(start) = query.start_date {
            builder.push(" AND shift_date >= ").push_bind(start);
        }
        if let Some(end) = query.end_date {
            builder.push(" AND shift_date <= ").push_bind(end);
        }
        if let Some(team_id) = query.team_id {
            builder.push(" AND team_id = ").push_bind(team_id);
        }
        if let Some(employee_id) = query.employee_id {
            builder.push(" AND employee_id = ").push_bind(employee_id);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }

        builder
            .push(" ORDER BY shift_date, start_time LIMIT ")
            .push_bind(query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, DEFAULT_LIMIT))
            .push(" OFFSET ")
            .push_bind(query.offset.unwrap_or(0).max(0));

        builder.build_query_as::<Shift>().fetch_all(&self.pool).await
    }

    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        shift: &Shift,
    ) -> Result<Shift, sqlx::Error> {
        sqlx::query_as::<_, Shift>(
            r#"
            INSERT INTO shifts (id, employee_id, team_id, title, shift_date, start_time, end_time,
                                status, notes, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, employee_id, team_id, title, shift_date, start_time, end_time,
                      status, notes, created_by, created_at, updated_at
            "#,
        )
        .bind(shift.id)
        .bind(shift.employee_id)
        .bind(shift.team_id)
        .bind(&shift.title)
        .bind(shift.shift_date)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.status)
        .bind(&shift.notes)
        .bind(shift.created_by)
        .bind(shift.created_at)
        .bind(shift.updated_at)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn update(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        shift: &Shift,
    ) -> Result<Shift, sqlx::Error> {
        sqlx::query_as::<_, Shift>(
            r#"
            UPDATE shifts
            SET employee_id = ?, team_id = ?, title = ?, shift_date = ?, start_time = ?,
                end_time = ?, status = ?, notes = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, employee_id, team_id, title, shift_date, start_time, end_time,
                      status, notes, created_by, created_at, updated_at
            "#,
        )
        .bind(shift.employee_id)
        .bind(shift.team_id)
        .bind(&shift.title)
        .bind(shift.shift_date)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.status)
        .bind(&shift.notes)
        .bind(Utc::now())
        .bind(shift.id)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn delete(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM shifts WHERE id = ?")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Moves a still-scheduled shift from one employee to another.
    /// Returns false when the shift no longer matches.
    pub async fn reassign(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        shift_id: Uuid,
        from_employee: Uuid,
        to_employee: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE shifts SET employee_id = ?, updated_at = ?
            WHERE id = ? AND employee_id = ? AND status = ?
            "#,
        )
        .bind(to_employee)
        .bind(Utc::now())
        .bind(shift_id)
        .bind(from_employee)
        .bind(ShiftStatus::Scheduled)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn cancel(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        shift_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE shifts SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(ShiftStatus::Cancelled)
        .bind(Utc::now())
        .bind(shift_id)
        .bind(ShiftStatus::Scheduled)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Marks every scheduled shift dated before `today` as completed
    pub async fn complete_past(&self, today: NaiveDate) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE shifts SET status = ?, updated_at = ? WHERE status = ? AND shift_date < ?",
        )
        .bind(ShiftStatus::Completed)
        .bind(Utc::now())
        .bind(ShiftStatus::Scheduled)
        .bind(today)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn conflicting(
        &self,
        employee_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ConflictingShift>, sqlx::Error> {
        Self::fetch_conflicting(&self.pool, employee_id, start, end).await
    }

    pub async fn conflicting_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        employee_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ConflictingShift>, sqlx::Error> {
        Self::fetch_conflicting(&mut **tx, employee_id, start, end).await
    }

    async fn fetch_conflicting<'e, E>(
        executor: E,
        employee_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ConflictingShift>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ConflictingShift>(
            r#"
            SELECT s.id AS shift_id, s.title, s.shift_date, s.start_time, s.end_time,
                   s.team_id, t.name AS team_name,
                   EXISTS (
                       SELECT 1 FROM shift_transfer_requests r
                       WHERE r.shift_id = s.id
                         AND r.status IN ('pending_target', 'pending_manager')
                   ) AS has_pending_transfer
            FROM shifts s
            LEFT JOIN teams t ON t.id = s.team_id
            WHERE s.employee_id = ?
              AND s.status = 'scheduled'
              AND s.shift_date >= ?
              AND s.shift_date <= ?
            ORDER BY s.shift_date, s.start_time
            "#,
        )
        .bind(employee_id)
        .bind(start)
        .bind(end)
        .fetch_all(executor)
        .await
    }
}
