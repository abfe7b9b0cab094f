use std::sync::LazyLock;

use actix_web::{HttpResponse, Result, web};
use regex::Regex;
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{ShiftTemplate, ShiftTemplateInput};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::user_context::UserContext;

static COLOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("color pattern compiles"));

fn validate(input: &ShiftTemplateInput) -> Result<(), AppError> {
    if input.title.trim().is_empty() {
        return Err(AppError::validation("title", "is required"));
    }
    if input.end_time <= input.start_time {
        return Err(AppError::validation("end_time", "must be after the start time"));
    }
    if let Some(color) = &input.color {
        if !COLOR_PATTERN.is_match(color) {
            return Err(AppError::validation("color", "must look like #rrggbb"));
        }
    }
    Ok(())
}

/// Templates are edited by whoever created them, or an admin
fn ensure_owner(ctx: &UserContext, template: &ShiftTemplate) -> Result<(), AppError> {
    if ctx.is_admin() || template.created_by == Some(ctx.user_id()) {
        Ok(())
    } else {
        Err(AppError::forbidden("Only the template's creator can change it"))
    }
}

pub async fn list(state: web::Data<AppState>, ctx: UserContext) -> Result<HttpResponse> {
    ctx.requires_manager()?;
    let templates = state
        .shift_template_repository
        .list()
        .await
        .map_err(AppError::from)?;
    Ok(ApiResponse::ok(templates))
}

pub async fn create(
    state: web::Data<AppState>,
    ctx: UserContext,
    input: web::Json<ShiftTemplateInput>,
) -> Result<HttpResponse> {
    ctx.requires_manager()?;
    validate(&input)?;

    let template = state
        .shift_template_repository
        .create(&input, ctx.user_id())
        .await
        .map_err(AppError::from)?;
    Ok(ApiResponse::created(template))
}

pub async fn update(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    input: web::Json<ShiftTemplateInput>,
) -> Result<HttpResponse> {
    ctx.requires_manager()?;
    let id = path.into_inner();
    let existing = find(&state, id).await?;
    ensure_owner(&ctx, &existing)?;
    validate(&input)?;

    let template = state
        .shift_template_repository
        .update(id, &input)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found("Template not found"))?;
    Ok(ApiResponse::ok(template))
}

pub async fn delete(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    ctx.requires_manager()?;
    let id = path.into_inner();
    let existing = find(&state, id).await?;
    ensure_owner(&ctx, &existing)?;

    state
        .shift_template_repository
        .delete(id)
        .await
        .map_err(AppError::from)?;
    Ok(ApiResponse::message("Template deleted"))
}

async fn find(state: &AppState, id: Uuid) -> Result<ShiftTemplate, AppError> {
    state
        .shift_template_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Template not found"))
}
