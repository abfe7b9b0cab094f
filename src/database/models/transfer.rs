use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::macros::string_enum;
use crate::database::models::{ProfileSummary, ShiftStatus, TransitionError};

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
    #[serde(rename_all = "snake_case")]
    pub enum TransferStatus {
        PendingTarget => "pending_target",
        PendingManager => "pending_manager",
        Approved => "approved",
        Rejected => "rejected",
        Declined => "declined",
        Cancelled => "cancelled",
        Expired => "expired",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum TransferAction {
        Accept => "accept",
        Reject => "reject",
        Cancel => "cancel",
        Approve => "approve",
        Decline => "decline",
        Expire => "expire",
        /// The shift was cancelled or handed to someone else underneath the request
        Supersede => "supersede",
    }
}

/// Who is allowed to perform a transfer action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferActor {
    Requester,
    Target,
    Manager,
    System,
}

impl TransferStatus {
    pub const ACTIVE: [TransferStatus; 2] =
        [TransferStatus::PendingTarget, TransferStatus::PendingManager];

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            TransferStatus::PendingTarget | TransferStatus::PendingManager
        )
    }

    pub fn apply(self, action: TransferAction) -> Result<TransferStatus, TransitionError> {
        use TransferAction as A;
        use TransferStatus as S;

        match (self, action) {
            (S::PendingTarget, A::Accept) => Ok(S::PendingManager),
            (S::PendingTarget, A::Reject) => Ok(S::Rejected),
            (S::PendingTarget, A::Cancel) => Ok(S::Cancelled),
            (S::PendingManager, A::Approve) => Ok(S::Approved),
            (S::PendingManager, A::Decline) => Ok(S::Declined),
            (S::PendingTarget | S::PendingManager, A::Expire) => Ok(S::Expired),
            (S::PendingTarget | S::PendingManager, A::Supersede) => Ok(S::Cancelled),
            (S::PendingTarget, A::Approve | A::Decline)
            | (S::PendingManager, A::Accept | A::Reject | A::Cancel)
            | (
                S::Approved | S::Rejected | S::Declined | S::Cancelled | S::Expired,
                A::Accept
                | A::Reject
                | A::Cancel
                | A::Approve
                | A::Decline
                | A::Expire
                | A::Supersede,
            ) => Err(TransitionError::new(self.as_str(), action.as_str())),
        }
    }
}

impl TransferAction {
    pub fn actor(&self) -> TransferActor {
        match self {
            TransferAction::Accept | TransferAction::Reject => TransferActor::Target,
            TransferAction::Cancel => TransferActor::Requester,
            TransferAction::Approve | TransferAction::Decline => TransferActor::Manager,
            TransferAction::Expire | TransferAction::Supersede => TransferActor::System,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct TransferRequest {
    pub id: Uuid,
    pub shift_id: Uuid,
    pub team_id: Option<Uuid>,
    pub requester_id: Uuid,
    pub target_id: Uuid,
    pub status: TransferStatus,
    pub requester_note: Option<String>,
    pub target_note: Option<String>,
    pub manager_note: Option<String>,
    pub manager_id: Option<Uuid>,
    pub target_responded_at: Option<DateTime<Utc>>,
    pub manager_responded_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferRequest {
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Shift fields embedded in a transfer listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferShift {
    pub id: Uuid,
    pub title: String,
    pub shift_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: ShiftStatus,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferRequestDetail {
    #[serde(flatten)]
    pub request: TransferRequest,
    pub shift: TransferShift,
    pub requester: ProfileSummary,
    pub target: ProfileSummary,
    pub team_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransferInput {
    pub shift_id: Uuid,
    pub target_id: Uuid,
    pub requester_note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferNoteInput {
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyTransfers {
    pub outgoing: Vec<TransferRequestDetail>,
    pub incoming: Vec<TransferRequestDetail>,
    pub pending_transfer_shift_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ALL_STATUSES: [TransferStatus; 7] = [
        TransferStatus::PendingTarget,
        TransferStatus::PendingManager,
        TransferStatus::Approved,
        TransferStatus::Rejected,
        TransferStatus::Declined,
        TransferStatus::Cancelled,
        TransferStatus::Expired,
    ];

    const ALL_ACTIONS: [TransferAction; 7] = [
        TransferAction::Accept,
        TransferAction::Reject,
        TransferAction::Cancel,
        TransferAction::Approve,
        TransferAction::Decline,
        TransferAction::Expire,
        TransferAction::Supersede,
    ];

    #[test]
    fn happy_path_goes_through_manager() {
        let status = TransferStatus::PendingTarget
            .apply(TransferAction::Accept)
            .unwrap();
        assert_eq!(status, TransferStatus::PendingManager);
        assert_eq!(
            status.apply(TransferAction::Approve).unwrap(),
            TransferStatus::Approved
        );
    }

    #[test]
    fn approval_cannot_skip_target_acceptance() {
        assert!(
            TransferStatus::PendingTarget
                .apply(TransferAction::Approve)
                .is_err()
        );
        assert!(
            TransferStatus::PendingTarget
                .apply(TransferAction::Decline)
                .is_err()
        );
    }

    #[test]
    fn requester_can_only_cancel_before_target_responds() {
        assert_eq!(
            TransferStatus::PendingTarget
                .apply(TransferAction::Cancel)
                .unwrap(),
            TransferStatus::Cancelled
        );
        assert!(
            TransferStatus::PendingManager
                .apply(TransferAction::Cancel)
                .is_err()
        );
    }

    #[test]
    fn terminal_states_absorb_every_action() {
        for status in ALL_STATUSES.iter().filter(|s| s.is_terminal()) {
            for action in ALL_ACTIONS {
                assert!(
                    status.apply(action).is_err(),
                    "{} should not accept {}",
                    status,
                    action
                );
            }
        }
    }

    #[test]
    fn every_legal_edge_lands_on_a_known_target() {
        let mut edges = Vec::new();
        for status in ALL_STATUSES {
            for action in ALL_ACTIONS {
                if let Ok(next) = status.apply(action) {
                    edges.push((status, action, next));
                }
            }
        }

        use TransferAction as A;
        use TransferStatus as S;
        assert_eq!(
            edges,
            vec![
                (S::PendingTarget, A::Accept, S::PendingManager),
                (S::PendingTarget, A::Reject, S::Rejected),
                (S::PendingTarget, A::Cancel, S::Cancelled),
                (S::PendingTarget, A::Expire, S::Expired),
                (S::PendingTarget, A::Supersede, S::Cancelled),
                (S::PendingManager, A::Approve, S::Approved),
                (S::PendingManager, A::Decline, S::Declined),
                (S::PendingManager, A::Expire, S::Expired),
                (S::PendingManager, A::Supersede, S::Cancelled),
            ]
        );
    }

    #[test]
    fn actions_name_their_actor() {
        assert_eq!(TransferAction::Accept.actor(), TransferActor::Target);
        assert_eq!(TransferAction::Cancel.actor(), TransferActor::Requester);
        assert_eq!(TransferAction::Decline.actor(), TransferActor::Manager);
        assert_eq!(TransferAction::Expire.actor(), TransferActor::System);
    }

    #[test]
    fn status_round_trips_through_its_column_text() {
        assert_eq!(
            "pending_manager".parse::<TransferStatus>().unwrap(),
            TransferStatus::PendingManager
        );
        assert_eq!(TransferStatus::PendingTarget.to_string(), "pending_target");
    }
}
