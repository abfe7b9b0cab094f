//! Remote procedures the client calls by name under `/rpc/{name}`.
//! Parameter names follow the client's calling convention.

use actix_web::{HttpRequest, HttpResponse, Result, web};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{ApproveLeaveInput, Reassignment};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::middleware::RequestIdExt;
use crate::services::user_context::UserContext;

#[derive(Debug, Deserialize)]
pub struct ApproveTransferParams {
    pub request_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ApproveLeaveParams {
    pub p_request_id: Uuid,
    #[serde(default)]
    pub p_reassignments: Vec<Reassignment>,
    #[serde(default)]
    pub p_manager_note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConflictingShiftsParams {
    pub p_request_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AvailableProfilesParams {
    pub target_team_id: Uuid,
}

/// Marks scheduled shifts dated before today as completed; returns the count
pub async fn complete_past_shifts(
    req: HttpRequest,
    state: web::Data<AppState>,
    ctx: UserContext,
) -> Result<HttpResponse> {
    log::info!(
        "[{}] complete_past_shifts requested by {}",
        req.correlation_id().unwrap_or_default(),
        ctx.profile.id
    );
    let today = Utc::now().date_naive();
    let count = state.sweeper_service.complete_past_shifts(today).await?;
    Ok(ApiResponse::ok(count))
}

/// Expires active transfer requests whose shift has started; returns the count
pub async fn expire_transfer_requests(
    req: HttpRequest,
    state: web::Data<AppState>,
    ctx: UserContext,
) -> Result<HttpResponse> {
    log::info!(
        "[{}] expire_transfer_requests requested by {}",
        req.correlation_id().unwrap_or_default(),
        ctx.profile.id
    );
    let count = state
        .sweeper_service
        .expire_transfer_requests(Utc::now())
        .await?;
    Ok(ApiResponse::ok(count))
}

pub async fn approve_shift_transfer(
    state: web::Data<AppState>,
    ctx: UserContext,
    params: web::Json<ApproveTransferParams>,
) -> Result<HttpResponse> {
    let request = state
        .transfer_service
        .approve(&ctx, params.request_id, None)
        .await?;
    Ok(ApiResponse::ok(request))
}

pub async fn approve_leave_request(
    state: web::Data<AppState>,
    ctx: UserContext,
    params: web::Json<ApproveLeaveParams>,
) -> Result<HttpResponse> {
    let params = params.into_inner();
    let summary = state
        .leave_service
        .approve(
            &ctx,
            params.p_request_id,
            ApproveLeaveInput {
                reassignments: params.p_reassignments,
                manager_note: params.p_manager_note,
            },
        )
        .await?;
    Ok(ApiResponse::ok(summary))
}

pub async fn get_conflicting_shifts(
    state: web::Data<AppState>,
    ctx: UserContext,
    params: web::Json<ConflictingShiftsParams>,
) -> Result<HttpResponse> {
    let shifts = state
        .leave_service
        .conflicts(&ctx, params.p_request_id)
        .await?;
    Ok(ApiResponse::ok(shifts))
}

pub async fn get_available_profiles_for_team(
    state: web::Data<AppState>,
    ctx: UserContext,
    params: web::Json<AvailableProfilesParams>,
) -> Result<HttpResponse> {
    ctx.requires_team_manager(params.target_team_id)?;
    let profiles = state
        .profile_repository
        .available_for_team(params.target_team_id)
        .await
        .map_err(AppError::from)?;
    Ok(ApiResponse::ok(profiles))
}
