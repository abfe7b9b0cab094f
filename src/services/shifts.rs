use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::database::models::{
    LeaveCheckQuery, LeaveRequest, Shift, ShiftInput, ShiftQuery, ShiftStatus,
};
use crate::database::repositories::{LeaveRepository, ShiftRepository, TeamRepository};
use crate::error::{AppError, ConflictReason};
use crate::services::transfers::TransferService;
use crate::services::user_context::UserContext;

#[derive(Clone)]
pub struct ShiftService {
    pool: SqlitePool,
    shift_repository: ShiftRepository,
    team_repository: TeamRepository,
    leave_repository: LeaveRepository,
    transfers: TransferService,
}

impl ShiftService {
    pub fn new(
        pool: SqlitePool,
        shift_repository: ShiftRepository,
        team_repository: TeamRepository,
        leave_repository: LeaveRepository,
        transfers: TransferService,
    ) -> Self {
        Self {
            pool,
            shift_repository,
            team_repository,
            leave_repository,
            transfers,
        }
    }

    pub async fn list(
        &self,
        context: &UserContext,
        query: &ShiftQuery,
    ) -> Result<Vec<Shift>, AppError> {
        Ok(self.shift_repository.list(query, context.scope()).await?)
    }

    pub async fn get(&self, context: &UserContext, id: Uuid) -> Result<Shift, AppError> {
        let shift = self.find(id).await?;
        let visible = shift.employee_id == context.user_id()
            || context.is_admin()
            || shift.team_id.is_some_and(|team_id| context.manages_team(team_id));

        if !visible {
            return Err(AppError::not_found("Shift not found"));
        }
        Ok(shift)
    }

    pub async fn create(&self, context: &UserContext, input: ShiftInput) -> Result<Shift, AppError> {
        self.check_input(context, &input).await?;

        let now = Utc::now();
        let shift = Shift {
            id: Uuid::new_v4(),
            employee_id: input.employee_id,
            team_id: input.team_id,
            title: input.title.trim().to_string(),
            shift_date: input.shift_date,
            start_time: input.start_time,
            end_time: input.end_time,
            status: input.status.unwrap_or(ShiftStatus::Scheduled),
            notes: input.notes,
            created_by: Some(context.user_id()),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;
        self.ensure_no_leave(&mut tx, &shift).await?;
        let created = self.shift_repository.insert(&mut tx, &shift).await?;
        tx.commit().await?;

        log::info!(
            "shift {}: scheduled {} for {} on {}",
            created.id,
            created.title,
            created.employee_id,
            created.shift_date
        );
        Ok(created)
    }

    pub async fn update(
        &self,
        context: &UserContext,
        id: Uuid,
        input: ShiftInput,
    ) -> Result<Shift, AppError> {
        let existing = self.find(id).await?;
        authorize_team(context, existing.team_id)?;
        self.check_input(context, &input).await?;

        let shift = Shift {
            employee_id: input.employee_id,
            team_id: input.team_id,
            title: input.title.trim().to_string(),
            shift_date: input.shift_date,
            start_time: input.start_time,
            end_time: input.end_time,
            status: input.status.unwrap_or(existing.status),
            notes: input.notes,
            ..existing.clone()
        };

        let mut tx = self.pool.begin().await?;
        self.ensure_no_leave(&mut tx, &shift).await?;
        if shift.status != ShiftStatus::Scheduled
            || shift.employee_id != existing.employee_id
            || shift.team_id != existing.team_id
        {
            self.transfers.supersede_for_shift(&mut tx, shift.id).await?;
        } else if shift.starts_at() != existing.starts_at() {
            self.transfers.reschedule_for_shift(&mut tx, &shift).await?;
        }
        let updated = self.shift_repository.update(&mut tx, &shift).await?;
        tx.commit().await?;

        if existing.status != updated.status {
            log::info!("shift {}: {} -> {}", id, existing.status, updated.status);
        }
        Ok(updated)
    }

    pub async fn delete(&self, context: &UserContext, id: Uuid) -> Result<(), AppError> {
        let existing = self.find(id).await?;
        authorize_team(context, existing.team_id)?;

        let mut tx = self.pool.begin().await?;
        self.transfers.supersede_for_shift(&mut tx, id).await?;
        if !self.shift_repository.delete(&mut tx, id).await? {
            return Err(AppError::not_found("Shift not found"));
        }
        tx.commit().await?;

        log::info!("shift {}: deleted by {}", id, context.user_id());
        Ok(())
    }

    /// Approved leave that covers the date, if any. Advisory only: saving
    /// re-checks inside the write transaction.
    pub async fn leave_check(
        &self,
        context: &UserContext,
        query: &LeaveCheckQuery,
    ) -> Result<Option<LeaveRequest>, AppError> {
        if query.employee_id != context.user_id() {
            context.requires_manager()?;
        }
        Ok(self
            .leave_repository
            .approved_covering(query.employee_id, query.date)
            .await?)
    }

    async fn check_input(&self, context: &UserContext, input: &ShiftInput) -> Result<(), AppError> {
        if input.title.trim().is_empty() {
            return Err(AppError::validation("title", "is required"));
        }
        if input.end_time <= input.start_time {
            return Err(AppError::validation(
                "end_time",
                "must be after the start time",
            ));
        }

        authorize_team(context, input.team_id)?;

        if let Some(team_id) = input.team_id {
            if !self
                .team_repository
                .is_member(team_id, input.employee_id)
                .await?
            {
                return Err(AppError::validation(
                    "employee_id",
                    "must be a member of the shift's team",
                ));
            }
        }
        Ok(())
    }

    async fn ensure_no_leave(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        shift: &Shift,
    ) -> Result<(), AppError> {
        if shift.status != ShiftStatus::Scheduled {
            return Ok(());
        }
        if let Some(leave) = self
            .leave_repository
            .approved_covering_tx(tx, shift.employee_id, shift.shift_date)
            .await?
        {
            log::warn!(
                "Refusing to schedule {} on {}: approved leave {}",
                shift.employee_id,
                shift.shift_date,
                leave.id
            );
            return Err(AppError::Conflict(ConflictReason::LeaveConflict));
        }
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Shift, AppError> {
        self.shift_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Shift not found"))
    }
}

/// Shifts of a team are managed by its managers; teamless shifts by admins
fn authorize_team(context: &UserContext, team_id: Option<Uuid>) -> Result<(), AppError> {
    match team_id {
        Some(team_id) => context.requires_team_manager(team_id),
        None => context.requires_admin(),
    }
}
