use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::macros::string_enum;
use crate::database::models::{ProfileSummary, TransitionError};

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum LeaveType {
        Sick => "sick",
        Vacation => "vacation",
        Personal => "personal",
        Other => "other",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum LeaveStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum LeaveAction {
        Approve => "approve",
        Reject => "reject",
        /// Employee withdraws their own pending request
        Cancel => "cancel",
        /// Reviewer revokes leave that was already approved
        CancelApproved => "cancel_approved",
    }
}

impl LeaveStatus {
    pub fn apply(self, action: LeaveAction) -> Result<LeaveStatus, TransitionError> {
        use LeaveAction as A;
        use LeaveStatus as S;

        match (self, action) {
            (S::Pending, A::Approve) => Ok(S::Approved),
            (S::Pending, A::Reject) => Ok(S::Rejected),
            (S::Pending, A::Cancel) => Ok(S::Cancelled),
            (S::Approved, A::CancelApproved) => Ok(S::Cancelled),
            (S::Pending, A::CancelApproved)
            | (S::Approved, A::Approve | A::Reject | A::Cancel)
            | (S::Rejected | S::Cancelled, _) => {
                Err(TransitionError::new(self.as_str(), action.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
    pub employee_note: Option<String>,
    pub manager_note: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaveRequestDetail {
    #[serde(flatten)]
    pub request: LeaveRequest,
    pub employee: ProfileSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequestInput {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub employee_note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerNoteInput {
    pub manager_note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaveQuery {
    pub status: Option<LeaveStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateQuery {
    pub team_id: Uuid,
}

/// A scheduled shift that falls inside a leave range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct ConflictingShift {
    pub shift_id: Uuid,
    pub title: String,
    pub shift_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub team_id: Option<Uuid>,
    pub team_name: Option<String>,
    pub has_pending_transfer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reassignment {
    pub shift_id: Uuid,
    pub new_employee_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveLeaveInput {
    #[serde(default)]
    pub reassignments: Vec<Reassignment>,
    pub manager_note: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaveApprovalSummary {
    pub cancelled_shifts: i64,
    pub reassigned_shifts: i64,
    pub cancelled_transfers: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pending_leave_can_be_reviewed_or_withdrawn() {
        assert_eq!(
            LeaveStatus::Pending.apply(LeaveAction::Approve).unwrap(),
            LeaveStatus::Approved
        );
        assert_eq!(
            LeaveStatus::Pending.apply(LeaveAction::Reject).unwrap(),
            LeaveStatus::Rejected
        );
        assert_eq!(
            LeaveStatus::Pending.apply(LeaveAction::Cancel).unwrap(),
            LeaveStatus::Cancelled
        );
    }

    #[test]
    fn approved_leave_is_only_revoked_through_its_own_action() {
        assert!(LeaveStatus::Approved.apply(LeaveAction::Cancel).is_err());
        assert!(LeaveStatus::Approved.apply(LeaveAction::Reject).is_err());
        assert_eq!(
            LeaveStatus::Approved
                .apply(LeaveAction::CancelApproved)
                .unwrap(),
            LeaveStatus::Cancelled
        );
        assert!(
            LeaveStatus::Pending
                .apply(LeaveAction::CancelApproved)
                .is_err()
        );
    }

    #[test]
    fn closed_requests_stay_closed() {
        for status in [LeaveStatus::Rejected, LeaveStatus::Cancelled] {
            for action in [
                LeaveAction::Approve,
                LeaveAction::Reject,
                LeaveAction::Cancel,
                LeaveAction::CancelApproved,
            ] {
                assert!(status.apply(action).is_err());
            }
        }
    }

    #[test]
    fn covers_is_inclusive_on_both_ends() {
        let now = Utc::now();
        let request = LeaveRequest {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
            leave_type: LeaveType::Vacation,
            status: LeaveStatus::Approved,
            employee_note: None,
            manager_note: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };

        assert!(request.covers(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()));
        assert!(request.covers(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()));
        assert!(!request.covers(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()));
    }

    #[test]
    fn leave_type_parses_case_insensitively() {
        assert_eq!("Vacation".parse::<LeaveType>().unwrap(), LeaveType::Vacation);
        assert!("holiday".parse::<LeaveType>().is_err());
    }
}
