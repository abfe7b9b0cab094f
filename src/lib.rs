pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

use sqlx::SqlitePool;

pub use config::Config;
use database::repositories::{
    EmailTokenRepository, LeaveRepository, ProfileRepository, ShiftRepository,
    ShiftTemplateRepository, TeamRepository, TransferRepository,
};
use middleware::RateLimitStore;
pub use services::{
    AuthService, AvatarStorage, LeaveService, ShiftService, SweeperService, TransferService,
    UserContextService,
};

/// Everything a handler may reach, shared across workers
pub struct AppState {
    pub config: Config,
    pub auth_service: AuthService,
    pub user_context_service: UserContextService,
    pub transfer_service: TransferService,
    pub leave_service: LeaveService,
    pub shift_service: ShiftService,
    pub sweeper_service: SweeperService,
    pub avatar_storage: AvatarStorage,
    pub profile_repository: ProfileRepository,
    pub team_repository: TeamRepository,
    pub shift_template_repository: ShiftTemplateRepository,
    pub auth_rate_limit: RateLimitStore,
}

impl AppState {
    pub fn build(pool: SqlitePool, config: Config) -> Self {
        let profile_repository = ProfileRepository::new(pool.clone());
        let team_repository = TeamRepository::new(pool.clone());
        let shift_repository = ShiftRepository::new(pool.clone());
        let leave_repository = LeaveRepository::new(pool.clone());
        let transfer_repository = TransferRepository::new(pool.clone());

        let user_context_service = UserContextService::new(
            profile_repository.clone(),
            team_repository.clone(),
            config.context_cache_ttl_seconds,
        );
        let auth_service = AuthService::new(
            pool.clone(),
            profile_repository.clone(),
            EmailTokenRepository::new(pool.clone()),
            user_context_service.clone(),
            config.clone(),
        );
        let transfer_service = TransferService::new(
            pool.clone(),
            transfer_repository,
            shift_repository.clone(),
            team_repository.clone(),
            leave_repository.clone(),
        );
        let leave_service = LeaveService::new(
            pool.clone(),
            leave_repository.clone(),
            shift_repository.clone(),
            team_repository.clone(),
            transfer_service.clone(),
        );
        let shift_service = ShiftService::new(
            pool.clone(),
            shift_repository.clone(),
            team_repository.clone(),
            leave_repository,
            transfer_service.clone(),
        );
        let sweeper_service = SweeperService::new(shift_repository, transfer_service.clone());
        let avatar_storage = AvatarStorage::new(
            &config.storage_dir,
            &config.public_base_url,
            config.avatar_max_bytes,
        );

        Self {
            auth_service,
            user_context_service,
            transfer_service,
            leave_service,
            shift_service,
            sweeper_service,
            avatar_storage,
            profile_repository,
            team_repository,
            shift_template_repository: ShiftTemplateRepository::new(pool),
            auth_rate_limit: RateLimitStore::new(),
            config,
        }
    }
}
