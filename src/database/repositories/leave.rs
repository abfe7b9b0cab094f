use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::database::models::{
    LeaveRequest, LeaveRequestDetail, LeaveStatus, LeaveType, ProfileSummary,
};
use crate::database::repositories::Scope;

#[derive(sqlx::FromRow)]
struct LeaveRequestDetailRaw {
    id: Uuid,
    employee_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    leave_type: LeaveType,
    status: LeaveStatus,
    employee_note: Option<String>,
    manager_note: Option<String>,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    employee_email: String,
    employee_full_name: String,
    employee_avatar_url: Option<String>,
}

impl From<LeaveRequestDetailRaw> for LeaveRequestDetail {
    fn from(raw: LeaveRequestDetailRaw) -> Self {
        LeaveRequestDetail {
            employee: ProfileSummary {
                id: raw.employee_id,
                email: raw.employee_email,
                full_name: raw.employee_full_name,
                avatar_url: raw.employee_avatar_url,
            },
            request: LeaveRequest {
                id: raw.id,
                employee_id: raw.employee_id,
                start_date: raw.start_date,
                end_date: raw.end_date,
                leave_type: raw.leave_type,
                status: raw.status,
                employee_note: raw.employee_note,
                manager_note: raw.manager_note,
                reviewed_by: raw.reviewed_by,
                reviewed_at: raw.reviewed_at,
                created_at: raw.created_at,
                updated_at: raw.updated_at,
            },
        }
    }
}

const DETAIL_SELECT: &str = r#"
    SELECT l.id, l.employee_id, l.start_date, l.end_date, l.leave_type, l.status,
           l.employee_note, l.manager_note, l.reviewed_by, l.reviewed_at,
           l.created_at, l.updated_at,
           p.email AS employee_email, p.full_name AS employee_full_name,
           p.avatar_url AS employee_avatar_url
    FROM leave_requests l
    JOIN profiles p ON p.id = l.employee_id
    WHERE 1 = 1
"#;

#[derive(Clone)]
pub struct LeaveRepository {
    pool: SqlitePool,
}

impl LeaveRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &LeaveRequest) -> Result<LeaveRequest, sqlx::Error> {
        sqlx::query_as::<_, LeaveRequest>(
            r#"
            INSERT INTO leave_requests (id, employee_id, start_date, end_date, leave_type, status,
                                        employee_note, manager_note, reviewed_by, reviewed_at,
                                        created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, employee_id, start_date, end_date, leave_type, status, employee_note,
                      manager_note, reviewed_by, reviewed_at, created_at, updated_at
            "#,
        )
        .bind(request.id)
        .bind(request.employee_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.leave_type)
        .bind(request.status)
        .bind(&request.employee_note)
        .bind(&request.manager_note)
        .bind(request.reviewed_by)
        .bind(request.reviewed_at)
        .bind(request.created_at)
        .bind(request.updated_at)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>, sqlx::Error> {
        Self::fetch_by_id(&self.pool, id).await
    }

    pub async fn find_by_id_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
    ) -> Result<Option<LeaveRequest>, sqlx::Error> {
        Self::fetch_by_id(&mut **tx, id).await
    }

    async fn fetch_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<LeaveRequest>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, LeaveRequest>(
            r#"
            SELECT id, employee_id, start_date, end_date, leave_type, status, employee_note,
                   manager_note, reviewed_by, reviewed_at, created_at, updated_at
            FROM leave_requests
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_detail(&self, id: Uuid) -> Result<Option<LeaveRequestDetail>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(DETAIL_SELECT);
        builder.push(" AND l.id = ").push_bind(id);
        let raw = builder
            .build_query_as::<LeaveRequestDetailRaw>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(raw.map(Into::into))
    }

    pub async fn list_for_employee(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<LeaveRequest>, sqlx::Error> {
        sqlx::query_as::<_, LeaveRequest>(
            r#"
            SELECT id, employee_id, start_date, end_date, leave_type, status, employee_note,
                   manager_note, reviewed_by, reviewed_at, created_at, updated_at
            FROM leave_requests
            WHERE employee_id = ?
            ORDER BY start_date DESC, created_at DESC
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Requests a reviewer may act on: never their own, and outside admin
    /// scope only those of employees in teams the reviewer manages
    pub async fn list_for_reviewer(
        &self,
        reviewer_id: Uuid,
        scope: Scope,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequestDetail>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(DETAIL_SELECT);
        builder.push(" AND l.employee_id != ").push_bind(reviewer_id);
        if let Scope::Restricted(viewer) = scope {
            builder.push(" AND ");
            push_managed_employees(&mut builder, viewer);
        }
        if let Some(status) = status {
            builder.push(" AND l.status = ").push_bind(status);
        }
        builder.push(" ORDER BY l.start_date, l.created_at");

        let rows = builder
            .build_query_as::<LeaveRequestDetailRaw>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Approved and pending leave overlapping `[start, end]`
    pub async fn list_for_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        scope: Scope,
    ) -> Result<Vec<LeaveRequestDetail>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(DETAIL_SELECT);
        builder
            .push(" AND l.status IN ('approved', 'pending') AND l.start_date <= ")
            .push_bind(end)
            .push(" AND l.end_date >= ")
            .push_bind(start);
        if let Scope::Restricted(viewer) = scope {
            builder.push(" AND (l.employee_id = ").push_bind(viewer).push(" OR ");
            push_managed_employees(&mut builder, viewer);
            builder.push(")");
        }
        builder.push(" ORDER BY l.start_date");

        let rows = builder
            .build_query_as::<LeaveRequestDetailRaw>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Whether the employee already holds pending or approved leave touching the range
    pub async fn overlaps_open_request(
        &self,
        employee_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM leave_requests
            WHERE employee_id = ?
              AND status IN ('pending', 'approved')
              AND start_date <= ?
              AND end_date >= ?
            "#,
        )
        .bind(employee_id)
        .bind(end)
        .bind(start)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn approved_covering(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<LeaveRequest>, sqlx::Error> {
        Self::fetch_approved_covering(&self.pool, employee_id, date).await
    }

    pub async fn approved_covering_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<LeaveRequest>, sqlx::Error> {
        Self::fetch_approved_covering(&mut **tx, employee_id, date).await
    }

    async fn fetch_approved_covering<'e, E>(
        executor: E,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<LeaveRequest>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, LeaveRequest>(
            r#"
            SELECT id, employee_id, start_date, end_date, leave_type, status, employee_note,
                   manager_note, reviewed_by, reviewed_at, created_at, updated_at
            FROM leave_requests
            WHERE employee_id = ? AND status = 'approved' AND start_date <= ? AND end_date >= ?
            ORDER BY start_date
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .bind(date)
        .fetch_optional(executor)
        .await
    }

    /// Conditional status write; `None` means the row left `from` first
    pub async fn transition(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
        from: LeaveStatus,
        to: LeaveStatus,
        reviewer: Option<Uuid>,
        manager_note: Option<&str>,
    ) -> Result<Option<LeaveRequest>, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, LeaveRequest>(
            r#"
            UPDATE leave_requests
            SET status = ?,
                manager_note = COALESCE(?, manager_note),
                reviewed_by = COALESCE(?, reviewed_by),
                reviewed_at = CASE WHEN ? IS NULL THEN reviewed_at ELSE ? END,
                updated_at = ?
            WHERE id = ? AND status = ?
            RETURNING id, employee_id, start_date, end_date, leave_type, status, employee_note,
                      manager_note, reviewed_by, reviewed_at, created_at, updated_at
            "#,
        )
        .bind(to)
        .bind(manager_note)
        .bind(reviewer)
        .bind(reviewer)
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(from)
        .fetch_optional(&mut **tx)
        .await
    }
}

fn push_managed_employees(builder: &mut QueryBuilder<'_, Sqlite>, viewer: Uuid) {
    builder
        .push(
            r#"l.employee_id IN (
                SELECT e.profile_id FROM team_members e
                JOIN team_members m ON m.team_id = e.team_id
                WHERE m.role = 'manager' AND m.profile_id = "#,
        )
        .push_bind(viewer)
        .push(")");
}
