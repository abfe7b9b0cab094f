use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::database::models::{
    CreateTransferInput, MyTransfers, Shift, ShiftStatus, TeamMemberDetail, TransferAction,
    TransferActor, TransferRequest, TransferRequestDetail, TransferStatus,
};
use crate::database::repositories::{
    LeaveRepository, Responder, ShiftRepository, TeamRepository, TransferRepository,
};
use crate::error::{AppError, ConflictReason};
use crate::services::user_context::UserContext;

#[derive(Clone)]
pub struct TransferService {
    pool: SqlitePool,
    transfer_repository: TransferRepository,
    shift_repository: ShiftRepository,
    team_repository: TeamRepository,
    leave_repository: LeaveRepository,
}

impl TransferService {
    pub fn new(
        pool: SqlitePool,
        transfer_repository: TransferRepository,
        shift_repository: ShiftRepository,
        team_repository: TeamRepository,
        leave_repository: LeaveRepository,
    ) -> Self {
        Self {
            pool,
            transfer_repository,
            shift_repository,
            team_repository,
            leave_repository,
        }
    }

    /// Offers one of the caller's upcoming shifts to a teammate
    pub async fn create(
        &self,
        context: &UserContext,
        input: CreateTransferInput,
    ) -> Result<TransferRequestDetail, AppError> {
        let shift = self
            .shift_repository
            .find_by_id(input.shift_id)
            .await?
            .ok_or_else(|| AppError::not_found("Shift not found"))?;

        if shift.employee_id != context.user_id() {
            return Err(AppError::forbidden(
                "Only the assigned employee can request a transfer",
            ));
        }
        if shift.status != ShiftStatus::Scheduled {
            return Err(AppError::validation("shift_id", "shift is not scheduled"));
        }

        let now = Utc::now();
        if shift.shift_date < now.date_naive() || shift.starts_at() <= now {
            return Err(AppError::validation("shift_id", "shift has already started"));
        }

        let Some(team_id) = shift.team_id else {
            return Err(AppError::validation("shift_id", "shift does not belong to a team"));
        };
        if input.target_id == context.user_id() {
            return Err(AppError::validation(
                "target_id",
                "cannot transfer a shift to yourself",
            ));
        }
        if !self
            .team_repository
            .is_member(team_id, input.target_id)
            .await?
        {
            return Err(AppError::validation(
                "target_id",
                "must be a member of the shift's team",
            ));
        }

        let request = TransferRequest {
            id: Uuid::new_v4(),
            shift_id: shift.id,
            team_id: Some(team_id),
            requester_id: context.user_id(),
            target_id: input.target_id,
            status: TransferStatus::PendingTarget,
            requester_note: input.requester_note.filter(|note| !note.trim().is_empty()),
            target_note: None,
            manager_note: None,
            manager_id: None,
            target_responded_at: None,
            manager_responded_at: None,
            expires_at: shift.starts_at(),
            created_at: now,
            updated_at: now,
        };

        // The partial unique index rejects a second active request for the shift
        let created = self.transfer_repository.create(&request).await?;
        log::info!(
            "transfer {}: created for shift {} ({} -> {})",
            created.id,
            created.shift_id,
            created.requester_id,
            created.target_id
        );

        self.detail(created.id).await
    }

    pub async fn accept(
        &self,
        context: &UserContext,
        id: Uuid,
        note: Option<String>,
    ) -> Result<TransferRequestDetail, AppError> {
        self.transition(context, id, TransferAction::Accept, note).await
    }

    pub async fn reject(
        &self,
        context: &UserContext,
        id: Uuid,
        note: Option<String>,
    ) -> Result<TransferRequestDetail, AppError> {
        self.transition(context, id, TransferAction::Reject, note).await
    }

    pub async fn cancel(
        &self,
        context: &UserContext,
        id: Uuid,
    ) -> Result<TransferRequestDetail, AppError> {
        self.transition(context, id, TransferAction::Cancel, None).await
    }

    pub async fn decline(
        &self,
        context: &UserContext,
        id: Uuid,
        note: Option<String>,
    ) -> Result<TransferRequestDetail, AppError> {
        self.transition(context, id, TransferAction::Decline, note).await
    }

    /// Approves and hands the shift to the target in one transaction
    pub async fn approve(
        &self,
        context: &UserContext,
        id: Uuid,
        note: Option<String>,
    ) -> Result<TransferRequestDetail, AppError> {
        self.transition(context, id, TransferAction::Approve, note).await
    }

    async fn transition(
        &self,
        context: &UserContext,
        id: Uuid,
        action: TransferAction,
        note: Option<String>,
    ) -> Result<TransferRequestDetail, AppError> {
        let request = self
            .transfer_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Transfer request not found"))?;

        authorize(context, &request, action)?;
        let next = request.status.apply(action)?;

        let now = Utc::now();
        if request.is_past_expiry(now) {
            return Err(AppError::Conflict(ConflictReason::RequestExpired));
        }

        let note = note.as_deref().map(str::trim).filter(|note| !note.is_empty());
        let responder = match action.actor() {
            TransferActor::Target => Responder::Target { note },
            TransferActor::Manager => Responder::Manager {
                id: context.user_id(),
                note,
            },
            TransferActor::Requester | TransferActor::System => Responder::Nobody,
        };

        let mut tx = self.pool.begin().await?;
        let updated = self
            .transfer_repository
            .transition(&mut tx, id, request.status, next, responder)
            .await?
            .ok_or(AppError::Conflict(ConflictReason::StateChanged))?;

        if action == TransferAction::Approve {
            self.hand_over_shift(&mut tx, &updated).await?;
        }
        tx.commit().await?;

        log::info!("transfer {}: {} -> {}", id, request.status, updated.status);
        self.detail(id).await
    }

    async fn hand_over_shift(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        request: &TransferRequest,
    ) -> Result<(), AppError> {
        let shift = self
            .shift_repository
            .find_by_id_tx(tx, request.shift_id)
            .await?
            .ok_or_else(|| AppError::not_found("Shift not found"))?;

        if let Some(team_id) = shift.team_id {
            if !self
                .team_repository
                .is_member_tx(tx, team_id, request.target_id)
                .await?
            {
                return Err(AppError::validation(
                    "target_id",
                    "target is no longer a member of the shift's team",
                ));
            }
        }

        if self
            .leave_repository
            .approved_covering_tx(tx, request.target_id, shift.shift_date)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(ConflictReason::LeaveConflict));
        }

        if !self
            .shift_repository
            .reassign(tx, shift.id, request.requester_id, request.target_id)
            .await?
        {
            return Err(AppError::Conflict(ConflictReason::StateChanged));
        }

        Ok(())
    }

    /// Cancels whatever active requests the shift has; used when the shift is
    /// cancelled, deleted or handed to someone else
    pub async fn supersede_for_shift(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        shift_id: Uuid,
    ) -> Result<u64, AppError> {
        let mut superseded = 0;
        for from in TransferStatus::ACTIVE {
            let to = from.apply(TransferAction::Supersede)?;
            superseded += self
                .transfer_repository
                .transition_all_for_shift(tx, shift_id, from, to)
                .await?;
        }
        if superseded > 0 {
            log::info!(
                "Cancelled {} active transfer request(s) for shift {}",
                superseded,
                shift_id
            );
        }
        Ok(superseded)
    }

    /// Keeps active requests expiring at the shift's start after it moves
    pub async fn reschedule_for_shift(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        shift: &Shift,
    ) -> Result<u64, AppError> {
        let moved = self
            .transfer_repository
            .reschedule_active_for_shift(tx, shift.id, shift.starts_at())
            .await?;
        if moved > 0 {
            log::info!(
                "Moved expiry of {} transfer request(s) for shift {} to {}",
                moved,
                shift.id,
                shift.starts_at()
            );
        }
        Ok(moved)
    }

    /// Expires every active request whose shift has started
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut expired = 0;
        for from in TransferStatus::ACTIVE {
            let to = from.apply(TransferAction::Expire)?;
            expired += self
                .transfer_repository
                .transition_all_due(&mut tx, from, to, now)
                .await?;
        }
        tx.commit().await?;
        Ok(expired)
    }

    pub async fn mine(&self, context: &UserContext) -> Result<MyTransfers, AppError> {
        let user_id = context.user_id();
        Ok(MyTransfers {
            outgoing: self.transfer_repository.list_outgoing(user_id).await?,
            incoming: self.transfer_repository.list_incoming(user_id).await?,
            pending_transfer_shift_ids: self
                .transfer_repository
                .active_shift_ids_for_requester(user_id)
                .await?,
        })
    }

    /// Requests waiting on the caller's approval
    pub async fn queue(&self, context: &UserContext) -> Result<Vec<TransferRequestDetail>, AppError> {
        context.requires_manager()?;
        Ok(self
            .transfer_repository
            .manager_queue(context.scope())
            .await?)
    }

    pub async fn get(
        &self,
        context: &UserContext,
        id: Uuid,
    ) -> Result<TransferRequestDetail, AppError> {
        let detail = self.detail(id).await?;
        let request = &detail.request;
        let involved = request.requester_id == context.user_id()
            || request.target_id == context.user_id()
            || request.team_id.is_some_and(|team_id| context.manages_team(team_id))
            || context.is_admin();

        if !involved {
            return Err(AppError::not_found("Transfer request not found"));
        }
        Ok(detail)
    }

    /// Teammates the caller could hand a shift of this team to
    pub async fn targets(
        &self,
        context: &UserContext,
        team_id: Uuid,
    ) -> Result<Vec<TeamMemberDetail>, AppError> {
        if !context.manages_team(team_id)
            && !self
                .team_repository
                .is_member(team_id, context.user_id())
                .await?
        {
            return Err(AppError::forbidden("You are not a member of this team"));
        }

        Ok(self
            .team_repository
            .members_excluding(team_id, context.user_id())
            .await?)
    }

    async fn detail(&self, id: Uuid) -> Result<TransferRequestDetail, AppError> {
        self.transfer_repository
            .find_detail(id)
            .await?
            .ok_or_else(|| AppError::not_found("Transfer request not found"))
    }
}

/// Checks the caller may perform `action` on `request`
fn authorize(
    context: &UserContext,
    request: &TransferRequest,
    action: TransferAction,
) -> Result<(), AppError> {
    match action.actor() {
        TransferActor::Requester => {
            if request.requester_id != context.user_id() {
                return Err(AppError::forbidden(
                    "Only the requester can cancel this request",
                ));
            }
        }
        TransferActor::Target => {
            if request.target_id != context.user_id() {
                return Err(AppError::forbidden(
                    "Only the target can respond to this request",
                ));
            }
        }
        TransferActor::Manager => {
            let manages = match request.team_id {
                Some(team_id) => context.manages_team(team_id),
                None => context.is_admin(),
            };
            if !manages {
                return Err(AppError::forbidden("You do not manage this team"));
            }
            if !context.is_admin()
                && (request.requester_id == context.user_id()
                    || request.target_id == context.user_id())
            {
                return Err(AppError::forbidden(
                    "Managers cannot review transfers they take part in",
                ));
            }
        }
        TransferActor::System => {
            return Err(AppError::forbidden("This action is performed by the system"));
        }
    }
    Ok(())
}
