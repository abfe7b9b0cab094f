use std::collections::HashSet;

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::database::models::{
    ApproveLeaveInput, ConflictingShift, LeaveAction, LeaveApprovalSummary, LeaveRequest,
    LeaveRequestDetail, LeaveRequestInput, LeaveStatus, Reassignment, TeamMemberDetail,
};
use crate::database::repositories::{LeaveRepository, ShiftRepository, TeamRepository};
use crate::error::{AppError, ConflictReason};
use crate::services::transfers::TransferService;
use crate::services::user_context::UserContext;

#[derive(Clone)]
pub struct LeaveService {
    pool: SqlitePool,
    leave_repository: LeaveRepository,
    shift_repository: ShiftRepository,
    team_repository: TeamRepository,
    transfers: TransferService,
}

impl LeaveService {
    pub fn new(
        pool: SqlitePool,
        leave_repository: LeaveRepository,
        shift_repository: ShiftRepository,
        team_repository: TeamRepository,
        transfers: TransferService,
    ) -> Self {
        Self {
            pool,
            leave_repository,
            shift_repository,
            team_repository,
            transfers,
        }
    }

    pub async fn create(
        &self,
        context: &UserContext,
        input: LeaveRequestInput,
    ) -> Result<LeaveRequest, AppError> {
        if input.start_date > input.end_date {
            return Err(AppError::validation(
                "end_date",
                "must be on or after the start date",
            ));
        }

        if self
            .leave_repository
            .overlaps_open_request(context.user_id(), input.start_date, input.end_date)
            .await?
        {
            return Err(AppError::Conflict(ConflictReason::OverlappingLeave));
        }

        let now = Utc::now();
        let request = LeaveRequest {
            id: Uuid::new_v4(),
            employee_id: context.user_id(),
            start_date: input.start_date,
            end_date: input.end_date,
            leave_type: input.leave_type,
            status: LeaveStatus::Pending,
            employee_note: input.employee_note.filter(|note| !note.trim().is_empty()),
            manager_note: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.leave_repository.create(&request).await?;
        log::info!(
            "leave {}: submitted by {} for {}..{}",
            created.id,
            created.employee_id,
            created.start_date,
            created.end_date
        );
        Ok(created)
    }

    pub async fn mine(&self, context: &UserContext) -> Result<Vec<LeaveRequest>, AppError> {
        Ok(self
            .leave_repository
            .list_for_employee(context.user_id())
            .await?)
    }

    /// Requests the caller may review
    pub async fn team(
        &self,
        context: &UserContext,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequestDetail>, AppError> {
        context.requires_manager()?;
        Ok(self
            .leave_repository
            .list_for_reviewer(context.user_id(), context.scope(), status)
            .await?)
    }

    pub async fn period(
        &self,
        context: &UserContext,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> Result<Vec<LeaveRequestDetail>, AppError> {
        if start > end {
            return Err(AppError::validation(
                "end_date",
                "must be on or after the start date",
            ));
        }
        Ok(self
            .leave_repository
            .list_for_period(start, end, context.scope())
            .await?)
    }

    pub async fn get(
        &self,
        context: &UserContext,
        id: Uuid,
    ) -> Result<LeaveRequestDetail, AppError> {
        let detail = self
            .leave_repository
            .find_detail(id)
            .await?
            .ok_or_else(|| AppError::not_found("Leave request not found"))?;

        let employee_id = detail.request.employee_id;
        let visible = employee_id == context.user_id()
            || context.is_admin()
            || (context.is_manager()
                && self
                    .team_repository
                    .manages_employee(context.user_id(), employee_id)
                    .await?);

        if !visible {
            return Err(AppError::not_found("Leave request not found"));
        }
        Ok(detail)
    }

    /// Employee withdraws their own pending request
    pub async fn cancel_own(
        &self,
        context: &UserContext,
        id: Uuid,
    ) -> Result<LeaveRequest, AppError> {
        let request = self.find(id).await?;
        context.requires_same_user(request.employee_id)?;
        self.apply(&request, LeaveAction::Cancel, None, None).await
    }

    pub async fn reject(
        &self,
        context: &UserContext,
        id: Uuid,
        manager_note: Option<String>,
    ) -> Result<LeaveRequest, AppError> {
        let request = self.find(id).await?;
        self.authorize_reviewer(context, &request).await?;
        self.apply(
            &request,
            LeaveAction::Reject,
            Some(context.user_id()),
            clean_note(manager_note).as_deref(),
        )
        .await
    }

    /// Revokes leave that was already approved; the reviewer must say why
    pub async fn cancel_approved(
        &self,
        context: &UserContext,
        id: Uuid,
        manager_note: Option<String>,
    ) -> Result<LeaveRequest, AppError> {
        let Some(note) = clean_note(manager_note) else {
            return Err(AppError::validation("manager_note", "is required"));
        };

        let request = self.find(id).await?;
        self.authorize_reviewer(context, &request).await?;
        self.apply(
            &request,
            LeaveAction::CancelApproved,
            Some(context.user_id()),
            Some(&note),
        )
        .await
    }

    async fn apply(
        &self,
        request: &LeaveRequest,
        action: LeaveAction,
        reviewer: Option<Uuid>,
        manager_note: Option<&str>,
    ) -> Result<LeaveRequest, AppError> {
        let next = request.status.apply(action)?;

        let mut tx = self.pool.begin().await?;
        let updated = self
            .leave_repository
            .transition(&mut tx, request.id, request.status, next, reviewer, manager_note)
            .await?
            .ok_or(AppError::Conflict(ConflictReason::StateChanged))?;
        tx.commit().await?;

        log::info!("leave {}: {} -> {}", request.id, request.status, updated.status);
        Ok(updated)
    }

    /// Scheduled shifts of the employee that fall inside the leave range
    pub async fn conflicts(
        &self,
        context: &UserContext,
        id: Uuid,
    ) -> Result<Vec<ConflictingShift>, AppError> {
        let request = self.find(id).await?;
        if request.employee_id != context.user_id() {
            self.authorize_reviewer(context, &request).await?;
        }

        Ok(self
            .shift_repository
            .conflicting(request.employee_id, request.start_date, request.end_date)
            .await?)
    }

    /// Members of `team_id` who could take over the employee's shifts
    pub async fn candidates(
        &self,
        context: &UserContext,
        id: Uuid,
        team_id: Uuid,
    ) -> Result<Vec<TeamMemberDetail>, AppError> {
        let request = self.find(id).await?;
        self.authorize_reviewer(context, &request).await?;
        context.requires_team_manager(team_id)?;

        Ok(self
            .team_repository
            .members_excluding(team_id, request.employee_id)
            .await?)
    }

    /// Approves the request. Conflicting shifts listed in `reassignments` move
    /// to the named employee, the rest are cancelled, and active transfers on
    /// every touched shift are cancelled. All of it commits or none of it does.
    pub async fn approve(
        &self,
        context: &UserContext,
        id: Uuid,
        input: ApproveLeaveInput,
    ) -> Result<LeaveApprovalSummary, AppError> {
        let request = self.find(id).await?;
        self.authorize_reviewer(context, &request).await?;
        request.status.apply(LeaveAction::Approve)?;

        let mut tx = self.pool.begin().await?;

        let request = self
            .leave_repository
            .find_by_id_tx(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Leave request not found"))?;
        let next = request.status.apply(LeaveAction::Approve)?;

        let conflicts = self
            .shift_repository
            .conflicting_tx(&mut tx, request.employee_id, request.start_date, request.end_date)
            .await?;
        self.validate_reassignments(&mut tx, context, &request, &conflicts, &input.reassignments)
            .await?;

        let mut summary = LeaveApprovalSummary::default();
        for conflict in &conflicts {
            summary.cancelled_transfers +=
                self.transfers.supersede_for_shift(&mut tx, conflict.shift_id).await? as i64;

            let reassignment = input
                .reassignments
                .iter()
                .find(|r| r.shift_id == conflict.shift_id);

            let applied = match reassignment {
                Some(r) => {
                    summary.reassigned_shifts += 1;
                    self.shift_repository
                        .reassign(&mut tx, conflict.shift_id, request.employee_id, r.new_employee_id)
                        .await?
                }
                None => {
                    summary.cancelled_shifts += 1;
                    self.shift_repository.cancel(&mut tx, conflict.shift_id).await?
                }
            };
            if !applied {
                return Err(AppError::Conflict(ConflictReason::StateChanged));
            }
        }

        self.leave_repository
            .transition(
                &mut tx,
                request.id,
                request.status,
                next,
                Some(context.user_id()),
                clean_note(input.manager_note).as_deref(),
            )
            .await?
            .ok_or(AppError::Conflict(ConflictReason::StateChanged))?;

        tx.commit().await?;

        log::info!(
            "leave {}: pending -> approved (cancelled_shifts={}, reassigned_shifts={}, cancelled_transfers={})",
            request.id,
            summary.cancelled_shifts,
            summary.reassigned_shifts,
            summary.cancelled_transfers
        );
        Ok(summary)
    }

    async fn validate_reassignments(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        context: &UserContext,
        request: &LeaveRequest,
        conflicts: &[ConflictingShift],
        reassignments: &[Reassignment],
    ) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        for reassignment in reassignments {
            let Some(conflict) = conflicts
                .iter()
                .find(|c| c.shift_id == reassignment.shift_id)
            else {
                return Err(AppError::validation(
                    "reassignments",
                    format!(
                        "shift {} does not conflict with this leave",
                        reassignment.shift_id
                    ),
                ));
            };

            if !seen.insert(reassignment.shift_id) {
                return Err(AppError::validation(
                    "reassignments",
                    format!("shift {} is listed more than once", reassignment.shift_id),
                ));
            }

            if reassignment.new_employee_id == request.employee_id {
                return Err(AppError::validation(
                    "reassignments",
                    "cannot reassign a shift to the employee taking leave",
                ));
            }

            if let Some(team_id) = conflict.team_id {
                context.requires_team_manager(team_id)?;
                if !self
                    .team_repository
                    .is_member_tx(tx, team_id, reassignment.new_employee_id)
                    .await?
                {
                    return Err(AppError::validation(
                        "reassignments",
                        format!(
                            "{} is not a member of the shift's team",
                            reassignment.new_employee_id
                        ),
                    ));
                }
            }

            if self
                .leave_repository
                .approved_covering_tx(tx, reassignment.new_employee_id, conflict.shift_date)
                .await?
                .is_some()
            {
                return Err(AppError::Conflict(ConflictReason::LeaveConflict));
            }
        }
        Ok(())
    }

    /// Admins review anything; managers review employees of their teams but
    /// never their own requests
    async fn authorize_reviewer(
        &self,
        context: &UserContext,
        request: &LeaveRequest,
    ) -> Result<(), AppError> {
        if context.is_admin() {
            return Ok(());
        }
        if request.employee_id == context.user_id() {
            return Err(AppError::forbidden("You cannot review your own leave request"));
        }
        if context.is_manager()
            && self
                .team_repository
                .manages_employee(context.user_id(), request.employee_id)
                .await?
        {
            return Ok(());
        }
        Err(AppError::forbidden(
            "You do not manage a team this employee belongs to",
        ))
    }

    async fn find(&self, id: Uuid) -> Result<LeaveRequest, AppError> {
        self.leave_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Leave request not found"))
    }
}

fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|note| note.trim().to_string())
        .filter(|note| !note.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_notes_count_as_missing() {
        assert_eq!(clean_note(Some("   ".to_string())), None);
        assert_eq!(clean_note(None), None);
        assert_eq!(
            clean_note(Some(" short notice ".to_string())).as_deref(),
            Some("short notice")
        );
    }
}
