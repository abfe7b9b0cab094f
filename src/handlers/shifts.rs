use actix_web::{HttpResponse, Result, web};
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{LeaveCheckQuery, ShiftInput, ShiftQuery};
use crate::handlers::shared::ApiResponse;
use crate::services::user_context::UserContext;

pub async fn list(
    state: web::Data<AppState>,
    ctx: UserContext,
    query: web::Query<ShiftQuery>,
) -> Result<HttpResponse> {
    let shifts = state.shift_service.list(&ctx, &query).await?;
    Ok(ApiResponse::ok(shifts))
}

pub async fn get(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let shift = state.shift_service.get(&ctx, path.into_inner()).await?;
    Ok(ApiResponse::ok(shift))
}

pub async fn create(
    state: web::Data<AppState>,
    ctx: UserContext,
    input: web::Json<ShiftInput>,
) -> Result<HttpResponse> {
    let shift = state.shift_service.create(&ctx, input.into_inner()).await?;
    Ok(ApiResponse::created(shift))
}

pub async fn update(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    input: web::Json<ShiftInput>,
) -> Result<HttpResponse> {
    let shift = state
        .shift_service
        .update(&ctx, path.into_inner(), input.into_inner())
        .await?;
    Ok(ApiResponse::ok(shift))
}

pub async fn delete(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.shift_service.delete(&ctx, path.into_inner()).await?;
    Ok(ApiResponse::message("Shift deleted"))
}

pub async fn leave_check(
    state: web::Data<AppState>,
    ctx: UserContext,
    query: web::Query<LeaveCheckQuery>,
) -> Result<HttpResponse> {
    let leave = state.shift_service.leave_check(&ctx, &query).await?;
    Ok(ApiResponse::ok(leave))
}
