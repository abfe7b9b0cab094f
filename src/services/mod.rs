pub mod auth;
pub mod leave;
pub mod shifts;
pub mod storage;
pub mod sweeper;
pub mod transfers;
pub mod user_context;

pub use auth::{AuthService, Claims};
pub use leave::LeaveService;
pub use shifts::ShiftService;
pub use storage::AvatarStorage;
pub use sweeper::SweeperService;
pub use transfers::TransferService;
pub use user_context::{UserContext, UserContextService};
