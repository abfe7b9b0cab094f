use actix_web::{HttpResponse, Result, web};
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{AddMemberInput, TeamInput};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::user_context::UserContext;

fn validate_team(input: &TeamInput) -> Result<(), AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::validation("name", "is required"));
    }
    Ok(())
}

/// Admins see every team; others the teams they belong to
pub async fn list(state: web::Data<AppState>, ctx: UserContext) -> Result<HttpResponse> {
    let teams = if ctx.is_admin() {
        state.team_repository.list_all().await
    } else {
        state.team_repository.list_for_profile(ctx.user_id()).await
    }
    .map_err(AppError::from)?;

    Ok(ApiResponse::ok(teams))
}

pub async fn managed(state: web::Data<AppState>, ctx: UserContext) -> Result<HttpResponse> {
    let teams = if ctx.is_admin() {
        state.team_repository.list_all().await
    } else {
        state.team_repository.list_by_ids(&ctx.managed_team_ids).await
    }
    .map_err(AppError::from)?;

    Ok(ApiResponse::ok(teams))
}

pub async fn create(
    state: web::Data<AppState>,
    ctx: UserContext,
    input: web::Json<TeamInput>,
) -> Result<HttpResponse> {
    ctx.requires_admin()?;
    validate_team(&input)?;

    let team = state
        .team_repository
        .create(&input, ctx.user_id())
        .await
        .map_err(AppError::from)?;

    log::info!("Team {} ({}) created by {}", team.id, team.name, ctx.user_id());
    Ok(ApiResponse::created(team))
}

pub async fn get(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let team_id = path.into_inner();
    ensure_can_view(&state, &ctx, team_id).await?;

    let team = state
        .team_repository
        .find_by_id(team_id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found("Team not found"))?;

    Ok(ApiResponse::ok(team))
}

pub async fn update(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    input: web::Json<TeamInput>,
) -> Result<HttpResponse> {
    let team_id = path.into_inner();
    ctx.requires_team_manager(team_id)?;
    validate_team(&input)?;

    let team = state
        .team_repository
        .update(team_id, &input)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found("Team not found"))?;

    Ok(ApiResponse::ok(team))
}

pub async fn delete(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    ctx.requires_admin()?;
    let team_id = path.into_inner();

    if !state
        .team_repository
        .delete(team_id)
        .await
        .map_err(AppError::from)?
    {
        return Err(AppError::not_found("Team not found").into());
    }
    // Any cached context may list this team as managed
    state.user_context_service.invalidate_all();

    log::info!("Team {} deleted by {}", team_id, ctx.user_id());
    Ok(ApiResponse::message("Team deleted"))
}

pub async fn members(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let team_id = path.into_inner();
    ensure_can_view(&state, &ctx, team_id).await?;

    let members = state
        .team_repository
        .members(team_id)
        .await
        .map_err(AppError::from)?;

    Ok(ApiResponse::ok(members))
}

pub async fn add_member(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    input: web::Json<AddMemberInput>,
) -> Result<HttpResponse> {
    let team_id = path.into_inner();
    ctx.requires_team_manager(team_id)?;

    if state
        .team_repository
        .find_by_id(team_id)
        .await
        .map_err(AppError::from)?
        .is_none()
    {
        return Err(AppError::not_found("Team not found").into());
    }
    if state
        .profile_repository
        .find_by_id(input.profile_id)
        .await
        .map_err(AppError::from)?
        .is_none()
    {
        return Err(AppError::validation("profile_id", "profile does not exist").into());
    }

    let member = state
        .team_repository
        .add_member(team_id, input.profile_id, input.role)
        .await
        .map_err(AppError::from)?;
    state.user_context_service.invalidate(input.profile_id).await;

    log::info!(
        "Profile {} joined team {} as {}",
        member.profile_id,
        team_id,
        member.role
    );
    Ok(ApiResponse::created(member))
}

pub async fn remove_member(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let (team_id, member_id) = path.into_inner();
    ctx.requires_team_manager(team_id)?;

    let member = state
        .team_repository
        .find_member(member_id)
        .await
        .map_err(AppError::from)?
        .filter(|member| member.team_id == team_id)
        .ok_or_else(|| AppError::not_found("Membership not found"))?;

    state
        .team_repository
        .remove_member(member.id)
        .await
        .map_err(AppError::from)?;
    state.user_context_service.invalidate(member.profile_id).await;

    log::info!("Profile {} left team {}", member.profile_id, team_id);
    Ok(ApiResponse::message("Member removed"))
}

/// Teammates the caller can offer a shift to; never cached
pub async fn transfer_targets(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let targets = state
        .transfer_service
        .targets(&ctx, path.into_inner())
        .await?;
    Ok(ApiResponse::ok(targets))
}

async fn ensure_can_view(
    state: &AppState,
    ctx: &UserContext,
    team_id: Uuid,
) -> Result<(), AppError> {
    if ctx.manages_team(team_id)
        || state
            .team_repository
            .is_member(team_id, ctx.user_id())
            .await?
    {
        Ok(())
    } else {
        Err(AppError::forbidden("You are not a member of this team"))
    }
}
