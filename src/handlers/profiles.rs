use actix_web::{HttpResponse, Result, web};
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{UpdateProfileInput, UpdateRoleInput};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::user_context::UserContext;

pub async fn get_me(ctx: UserContext) -> Result<HttpResponse> {
    Ok(ApiResponse::ok(ctx.profile))
}

pub async fn update_me(
    state: web::Data<AppState>,
    ctx: UserContext,
    input: web::Json<UpdateProfileInput>,
) -> Result<HttpResponse> {
    let full_name = input.full_name.trim();
    if full_name.is_empty() {
        return Err(AppError::validation("full_name", "is required").into());
    }

    let profile = state
        .profile_repository
        .update_full_name(ctx.user_id(), full_name)
        .await
        .map_err(AppError::from)?;
    state.user_context_service.invalidate(ctx.user_id()).await;

    Ok(ApiResponse::ok(profile))
}

/// Admins see everyone; others see themselves and their teammates
pub async fn list(state: web::Data<AppState>, ctx: UserContext) -> Result<HttpResponse> {
    let profiles = if ctx.is_admin() {
        state.profile_repository.list_all().await
    } else {
        state.profile_repository.list_visible_to(ctx.user_id()).await
    }
    .map_err(AppError::from)?;

    Ok(ApiResponse::ok(profiles))
}

pub async fn get(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let visible = id == ctx.user_id()
        || ctx.is_admin()
        || state
            .profile_repository
            .shares_team(ctx.user_id(), id)
            .await
            .map_err(AppError::from)?;
    if !visible {
        return Err(AppError::not_found("Profile not found").into());
    }

    let profile = state
        .profile_repository
        .find_by_id(id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;

    Ok(ApiResponse::ok(profile))
}

pub async fn update_role(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    input: web::Json<UpdateRoleInput>,
) -> Result<HttpResponse> {
    ctx.requires_admin()?;
    let id = path.into_inner();
    if id == ctx.user_id() {
        return Err(AppError::validation("role", "cannot change your own role").into());
    }

    let profile = state
        .profile_repository
        .update_role(id, input.role)
        .await
        .map_err(AppError::from)?;
    state.user_context_service.invalidate(id).await;

    log::info!("Profile {} role set to {} by {}", id, input.role, ctx.user_id());
    Ok(ApiResponse::ok(profile))
}

/// Raw image body; replaces any previous avatar
pub async fn upload_avatar(
    state: web::Data<AppState>,
    ctx: UserContext,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let url = state.avatar_storage.save(ctx.user_id(), &body).await?;
    let profile = state
        .profile_repository
        .update_avatar_url(ctx.user_id(), &url)
        .await
        .map_err(AppError::from)?;
    state.user_context_service.invalidate(ctx.user_id()).await;

    Ok(ApiResponse::ok(profile))
}
