use actix_web::{HttpResponse, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::Profile;
use crate::handlers::shared::ApiResponse;
use crate::services::user_context::{CallerRole, Capabilities, NavItem, UserContext};

/// What the client needs to render its shell for the caller
#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub profile: Profile,
    pub role: CallerRole,
    pub managed_team_ids: Vec<Uuid>,
    pub capabilities: Capabilities,
    pub navigation: Vec<NavItem>,
}

pub async fn me(ctx: UserContext) -> Result<HttpResponse> {
    let capabilities = ctx.capabilities();
    let navigation = ctx.navigation();
    Ok(ApiResponse::ok(ContextResponse {
        profile: ctx.profile,
        role: ctx.role,
        managed_team_ids: ctx.managed_team_ids,
        capabilities,
        navigation,
    }))
}
