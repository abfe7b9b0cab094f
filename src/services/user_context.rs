use std::time::Duration;

use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use futures_util::future::LocalBoxFuture;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{GlobalRole, Profile};
use crate::database::repositories::{ProfileRepository, Scope, TeamRepository};
use crate::error::AppError;
use crate::services::auth::Claims;

/// Effective role of a caller, derived from the global role and team memberships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    Employee,
    TeamManager,
    Admin,
}

impl CallerRole {
    pub fn classify(global_role: GlobalRole, managed_team_ids: &[Uuid]) -> Self {
        match global_role {
            GlobalRole::Admin => CallerRole::Admin,
            GlobalRole::Employee if !managed_team_ids.is_empty() => CallerRole::TeamManager,
            GlobalRole::Employee => CallerRole::Employee,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_manage_shifts: bool,
    pub can_review_leave: bool,
    pub can_approve_transfers: bool,
    pub can_manage_teams: bool,
    pub can_manage_templates: bool,
    pub can_manage_roles: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavItem {
    pub key: String,
    pub label: String,
    pub href: String,
}

impl NavItem {
    fn new(key: &str, label: &str, href: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            href: href.to_string(),
        }
    }
}

/// The caller's profile together with the teams they manage.
/// Extracted per request from the bearer token; see [`UserContextService`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub profile: Profile,
    pub managed_team_ids: Vec<Uuid>,
    pub role: CallerRole,
}

impl UserContext {
    pub fn new(profile: Profile, managed_team_ids: Vec<Uuid>) -> Self {
        let role = CallerRole::classify(profile.role, &managed_team_ids);
        Self {
            profile,
            managed_team_ids,
            role,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.profile.id
    }

    pub fn is_admin(&self) -> bool {
        self.role == CallerRole::Admin
    }

    /// Manages at least one team, or is an admin
    pub fn is_manager(&self) -> bool {
        matches!(self.role, CallerRole::TeamManager | CallerRole::Admin)
    }

    /// Admins implicitly manage every team
    pub fn manages_team(&self, team_id: Uuid) -> bool {
        self.is_admin() || self.managed_team_ids.contains(&team_id)
    }

    pub fn scope(&self) -> Scope {
        if self.is_admin() {
            Scope::All
        } else {
            Scope::Restricted(self.user_id())
        }
    }

    pub fn requires_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin access required"))
        }
    }

    pub fn requires_manager(&self) -> Result<(), AppError> {
        if self.is_manager() {
            Ok(())
        } else {
            Err(AppError::forbidden("Manager access required"))
        }
    }

    pub fn requires_team_manager(&self, team_id: Uuid) -> Result<(), AppError> {
        if self.manages_team(team_id) {
            Ok(())
        } else {
            Err(AppError::forbidden("You do not manage this team"))
        }
    }

    pub fn requires_same_user(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.user_id() == user_id {
            Ok(())
        } else {
            Err(AppError::forbidden("You can only act on your own records"))
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        let manager = self.is_manager();
        Capabilities {
            can_manage_shifts: manager,
            can_review_leave: manager,
            can_approve_transfers: manager,
            can_manage_teams: manager,
            can_manage_templates: manager,
            can_manage_roles: self.is_admin(),
        }
    }

    pub fn navigation(&self) -> Vec<NavItem> {
        let mut items = vec![
            NavItem::new("dashboard", "Dashboard", "/dashboard"),
            NavItem::new("schedule", "Schedule", "/schedule"),
            NavItem::new("transfers", "Transfers", "/transfers"),
            NavItem::new("leave", "Leave", "/leave"),
        ];
        if self.is_manager() {
            items.push(NavItem::new("teams", "Teams", "/teams"));
        }
        items
    }
}

impl FromRequest for UserContext {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let claims = Claims::from_request(req, payload).into_inner();
        let service = req
            .app_data::<Data<AppState>>()
            .map(|state| state.user_context_service.clone());

        Box::pin(async move {
            let claims = claims?;
            let service = service.ok_or_else(|| {
                AppError::internal_server_error_message("Application state not configured")
            })?;
            service.context_for(&claims).await
        })
    }
}

/// Resolves and memoises [`UserContext`] per user until its TTL runs out or
/// something that feeds it changes
#[derive(Clone)]
pub struct UserContextService {
    profile_repository: ProfileRepository,
    team_repository: TeamRepository,
    cache: Cache<Uuid, UserContext>,
}

impl UserContextService {
    pub fn new(
        profile_repository: ProfileRepository,
        team_repository: TeamRepository,
        ttl_seconds: u64,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();

        Self {
            profile_repository,
            team_repository,
            cache,
        }
    }

    /// Context for a verified token; rejects tokens minted before the last sign-out
    pub async fn context_for(&self, claims: &Claims) -> Result<UserContext, AppError> {
        let context = match self.cache.get(&claims.sub).await {
            Some(context) => context,
            None => {
                let context = self.load(claims.sub).await?;
                self.cache.insert(claims.sub, context.clone()).await;
                context
            }
        };

        if context.profile.session_epoch != claims.epoch {
            return Err(AppError::Unauthorized("Session has been revoked".to_string()));
        }

        Ok(context)
    }

    /// Reads the context straight from the store, bypassing the cache
    pub async fn load(&self, user_id: Uuid) -> Result<UserContext, AppError> {
        let profile = self
            .profile_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;
        let managed_team_ids = self.team_repository.managed_team_ids(user_id).await?;

        Ok(UserContext::new(profile, managed_team_ids))
    }

    pub async fn invalidate(&self, user_id: Uuid) {
        log::debug!("Invalidating cached context for {}", user_id);
        self.cache.invalidate(&user_id).await;
    }

    pub fn invalidate_all(&self) {
        log::debug!("Invalidating all cached contexts");
        self.cache.invalidate_all();
    }
}
