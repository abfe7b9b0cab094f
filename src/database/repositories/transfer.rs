use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::database::models::{
    ProfileSummary, ShiftStatus, TransferRequest, TransferRequestDetail, TransferShift,
    TransferStatus,
};
use crate::database::repositories::Scope;

#[derive(sqlx::FromRow)]
struct TransferRequestDetailRaw {
    id: Uuid,
    shift_id: Uuid,
    team_id: Option<Uuid>,
    requester_id: Uuid,
    target_id: Uuid,
    status: TransferStatus,
    requester_note: Option<String>,
    target_note: Option<String>,
    manager_note: Option<String>,
    manager_id: Option<Uuid>,
    target_responded_at: Option<DateTime<Utc>>,
    manager_responded_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    // Shift
    shift_title: String,
    shift_date: NaiveDate,
    shift_start_time: NaiveTime,
    shift_end_time: NaiveTime,
    shift_status: ShiftStatus,
    shift_team_id: Option<Uuid>,
    // Requester and target
    requester_email: String,
    requester_full_name: String,
    requester_avatar_url: Option<String>,
    target_email: String,
    target_full_name: String,
    target_avatar_url: Option<String>,
    team_name: Option<String>,
}

impl From<TransferRequestDetailRaw> for TransferRequestDetail {
    fn from(raw: TransferRequestDetailRaw) -> Self {
        TransferRequestDetail {
            shift: TransferShift {
                id: raw.shift_id,
                title: raw.shift_title,
                shift_date: raw.shift_date,
                start_time: raw.shift_start_time,
                end_time: raw.shift_end_time,
                status: raw.shift_status,
                team_id: raw.shift_team_id,
            },
            requester: ProfileSummary {
                id: raw.requester_id,
                email: raw.requester_email,
                full_name: raw.requester_full_name,
                avatar_url: raw.requester_avatar_url,
            },
            target: ProfileSummary {
                id: raw.target_id,
                email: raw.target_email,
                full_name: raw.target_full_name,
                avatar_url: raw.target_avatar_url,
            },
            team_name: raw.team_name,
            request: TransferRequest {
                id: raw.id,
                shift_id: raw.shift_id,
                team_id: raw.team_id,
                requester_id: raw.requester_id,
                target_id: raw.target_id,
                status: raw.status,
                requester_note: raw.requester_note,
                target_note: raw.target_note,
                manager_note: raw.manager_note,
                manager_id: raw.manager_id,
                target_responded_at: raw.target_responded_at,
                manager_responded_at: raw.manager_responded_at,
                expires_at: raw.expires_at,
                created_at: raw.created_at,
                updated_at: raw.updated_at,
            },
        }
    }
}

const DETAIL_SELECT: &str = r#"
    SELECT r.id, r.shift_id, r.team_id, r.requester_id, r.target_id, r.status,
           r.requester_note, r.target_note, r.manager_note, r.manager_id,
           r.target_responded_at, r.manager_responded_at, r.expires_at,
           r.created_at, r.updated_at,
           s.title AS shift_title, s.shift_date, s.start_time AS shift_start_time,
           s.end_time AS shift_end_time, s.status AS shift_status, s.team_id AS shift_team_id,
           rq.email AS requester_email, rq.full_name AS requester_full_name,
           rq.avatar_url AS requester_avatar_url,
           tg.email AS target_email, tg.full_name AS target_full_name,
           tg.avatar_url AS target_avatar_url,
           t.name AS team_name
    FROM shift_transfer_requests r
    JOIN shifts s ON s.id = r.shift_id
    JOIN profiles rq ON rq.id = r.requester_id
    JOIN profiles tg ON tg.id = r.target_id
    LEFT JOIN teams t ON t.id = r.team_id
    WHERE 1 = 1
"#;

const REQUEST_COLUMNS: &str = r#"
    id, shift_id, team_id, requester_id, target_id, status, requester_note, target_note,
    manager_note, manager_id, target_responded_at, manager_responded_at, expires_at,
    created_at, updated_at
"#;

/// Which party's response fields a transition stamps
#[derive(Debug, Clone, Copy)]
pub enum Responder<'a> {
    Target { note: Option<&'a str> },
    Manager { id: Uuid, note: Option<&'a str> },
    Nobody,
}

#[derive(Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &TransferRequest) -> Result<TransferRequest, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO shift_transfer_requests ({REQUEST_COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TransferRequest>(&sql)
            .bind(request.id)
            .bind(request.shift_id)
            .bind(request.team_id)
            .bind(request.requester_id)
            .bind(request.target_id)
            .bind(request.status)
            .bind(&request.requester_note)
            .bind(&request.target_note)
            .bind(&request.manager_note)
            .bind(request.manager_id)
            .bind(request.target_responded_at)
            .bind(request.manager_responded_at)
            .bind(request.expires_at)
            .bind(request.created_at)
            .bind(request.updated_at)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TransferRequest>, sqlx::Error> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM shift_transfer_requests WHERE id = ?");
        sqlx::query_as::<_, TransferRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_id_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
    ) -> Result<Option<TransferRequest>, sqlx::Error> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM shift_transfer_requests WHERE id = ?");
        sqlx::query_as::<_, TransferRequest>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn find_detail(
        &self,
        id: Uuid,
    ) -> Result<Option<TransferRequestDetail>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(DETAIL_SELECT);
        builder.push(" AND r.id = ").push_bind(id);
        let raw = builder
            .build_query_as::<TransferRequestDetailRaw>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(raw.map(Into::into))
    }

    pub async fn list_outgoing(
        &self,
        requester_id: Uuid,
    ) -> Result<Vec<TransferRequestDetail>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(DETAIL_SELECT);
        builder
            .push(" AND r.requester_id = ")
            .push_bind(requester_id)
            .push(" ORDER BY r.created_at DESC");
        self.fetch_details(builder).await
    }

    pub async fn list_incoming(
        &self,
        target_id: Uuid,
    ) -> Result<Vec<TransferRequestDetail>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(DETAIL_SELECT);
        builder
            .push(" AND r.target_id = ")
            .push_bind(target_id)
            .push(" ORDER BY r.created_at DESC");
        self.fetch_details(builder).await
    }

    /// Requests waiting on a manager. A restricted reviewer sees only their
    /// teams' requests and none they take part in.
    pub async fn manager_queue(
        &self,
        scope: Scope,
    ) -> Result<Vec<TransferRequestDetail>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(DETAIL_SELECT);
        builder
            .push(" AND r.status = ")
            .push_bind(TransferStatus::PendingManager);
        if let Scope::Restricted(viewer) = scope {
            builder
                .push(" AND r.requester_id != ")
                .push_bind(viewer)
                .push(" AND r.target_id != ")
                .push_bind(viewer)
                .push(" AND r.team_id IN (SELECT team_id FROM team_members WHERE role = 'manager' AND profile_id = ")
                .push_bind(viewer)
                .push(")");
        }
        builder.push(" ORDER BY r.expires_at");
        self.fetch_details(builder).await
    }

    async fn fetch_details(
        &self,
        mut builder: QueryBuilder<'_, Sqlite>,
    ) -> Result<Vec<TransferRequestDetail>, sqlx::Error> {
        let rows = builder
            .build_query_as::<TransferRequestDetailRaw>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Shifts the requester currently has an active transfer out for
    pub async fn active_shift_ids_for_requester(
        &self,
        requester_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT shift_id FROM shift_transfer_requests
            WHERE requester_id = ? AND status IN ('pending_target', 'pending_manager')
            "#,
        )
        .bind(requester_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Conditional status write; `None` means the row left `from` first
    pub async fn transition(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
        from: TransferStatus,
        to: TransferStatus,
        responder: Responder<'_>,
    ) -> Result<Option<TransferRequest>, sqlx::Error> {
        let now = Utc::now();
        let stamp = match responder {
            Responder::Target { .. } => {
                "target_note = COALESCE(?, target_note), target_responded_at = ?,"
            }
            Responder::Manager { .. } => {
                "manager_note = COALESCE(?, manager_note), manager_id = ?, manager_responded_at = ?,"
            }
            Responder::Nobody => "",
        };
        let sql = format!(
            r#"
            UPDATE shift_transfer_requests
            SET status = ?, {stamp} updated_at = ?
            WHERE id = ? AND status = ?
            RETURNING {REQUEST_COLUMNS}
            "#
        );

        let mut query = sqlx::query_as::<_, TransferRequest>(&sql).bind(to);
        query = match responder {
            Responder::Target { note } => query.bind(note.map(str::to_string)).bind(now),
            Responder::Manager { id: manager_id, note } => query
                .bind(note.map(str::to_string))
                .bind(manager_id)
                .bind(now),
            Responder::Nobody => query,
        };

        query
            .bind(now)
            .bind(id)
            .bind(from)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Moves every request of the shift that sits in `from` to `to`
    pub async fn transition_all_for_shift(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        shift_id: Uuid,
        from: TransferStatus,
        to: TransferStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE shift_transfer_requests SET status = ?, updated_at = ?
            WHERE shift_id = ? AND status = ?
            "#,
        )
        .bind(to)
        .bind(Utc::now())
        .bind(shift_id)
        .bind(from)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Moves the expiry of the shift's active requests to its new start
    pub async fn reschedule_active_for_shift(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        shift_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE shift_transfer_requests SET expires_at = ?, updated_at = ?
            WHERE shift_id = ? AND status IN (?, ?)
            "#,
        )
        .bind(expires_at)
        .bind(Utc::now())
        .bind(shift_id)
        .bind(TransferStatus::PendingTarget)
        .bind(TransferStatus::PendingManager)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Moves every request in `from` whose expiry has passed to `to`
    pub async fn transition_all_due(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        from: TransferStatus,
        to: TransferStatus,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE shift_transfer_requests SET status = ?, updated_at = ?
            WHERE status = ? AND expires_at <= ?
            "#,
        )
        .bind(to)
        .bind(now)
        .bind(from)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
