use chrono::{DateTime, NaiveDate, Utc};

use crate::database::repositories::ShiftRepository;
use crate::error::AppError;
use crate::services::transfers::TransferService;

/// Bulk transitions for records whose validity window has passed.
/// Both sweeps are idempotent and only run when a client asks.
#[derive(Clone)]
pub struct SweeperService {
    shift_repository: ShiftRepository,
    transfers: TransferService,
}

impl SweeperService {
    pub fn new(shift_repository: ShiftRepository, transfers: TransferService) -> Self {
        Self {
            shift_repository,
            transfers,
        }
    }

    pub async fn complete_past_shifts(&self, today: NaiveDate) -> Result<u64, AppError> {
        let completed = self.shift_repository.complete_past(today).await?;
        log::info!("Sweep: completed {} past shift(s)", completed);
        Ok(completed)
    }

    pub async fn expire_transfer_requests(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let expired = self.transfers.expire_due(now).await?;
        log::info!("Sweep: expired {} transfer request(s)", expired);
        Ok(expired)
    }
}
