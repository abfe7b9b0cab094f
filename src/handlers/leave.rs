use actix_web::{HttpResponse, Result, web};
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{
    ApproveLeaveInput, CandidateQuery, LeaveQuery, LeaveRequestInput, ManagerNoteInput,
    PeriodQuery,
};
use crate::handlers::shared::ApiResponse;
use crate::services::user_context::UserContext;

pub async fn create(
    state: web::Data<AppState>,
    ctx: UserContext,
    input: web::Json<LeaveRequestInput>,
) -> Result<HttpResponse> {
    let request = state.leave_service.create(&ctx, input.into_inner()).await?;
    Ok(ApiResponse::created(request))
}

pub async fn mine(state: web::Data<AppState>, ctx: UserContext) -> Result<HttpResponse> {
    let requests = state.leave_service.mine(&ctx).await?;
    Ok(ApiResponse::ok(requests))
}

pub async fn team(
    state: web::Data<AppState>,
    ctx: UserContext,
    query: web::Query<LeaveQuery>,
) -> Result<HttpResponse> {
    let requests = state.leave_service.team(&ctx, query.status).await?;
    Ok(ApiResponse::ok(requests))
}

pub async fn period(
    state: web::Data<AppState>,
    ctx: UserContext,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    let requests = state
        .leave_service
        .period(&ctx, query.start_date, query.end_date)
        .await?;
    Ok(ApiResponse::ok(requests))
}

pub async fn get(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let request = state.leave_service.get(&ctx, path.into_inner()).await?;
    Ok(ApiResponse::ok(request))
}

pub async fn cancel(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let request = state
        .leave_service
        .cancel_own(&ctx, path.into_inner())
        .await?;
    Ok(ApiResponse::ok(request))
}

pub async fn reject(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    input: Option<web::Json<ManagerNoteInput>>,
) -> Result<HttpResponse> {
    let note = input.and_then(|input| input.into_inner().manager_note);
    let request = state
        .leave_service
        .reject(&ctx, path.into_inner(), note)
        .await?;
    Ok(ApiResponse::ok(request))
}

pub async fn cancel_approved(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    input: web::Json<ManagerNoteInput>,
) -> Result<HttpResponse> {
    let request = state
        .leave_service
        .cancel_approved(&ctx, path.into_inner(), input.into_inner().manager_note)
        .await?;
    Ok(ApiResponse::ok(request))
}

pub async fn approve(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    input: Option<web::Json<ApproveLeaveInput>>,
) -> Result<HttpResponse> {
    let input = input.map(web::Json::into_inner).unwrap_or_default();
    let summary = state
        .leave_service
        .approve(&ctx, path.into_inner(), input)
        .await?;
    Ok(ApiResponse::ok(summary))
}

pub async fn conflicts(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let shifts = state
        .leave_service
        .conflicts(&ctx, path.into_inner())
        .await?;
    Ok(ApiResponse::ok(shifts))
}

pub async fn reassignment_candidates(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    query: web::Query<CandidateQuery>,
) -> Result<HttpResponse> {
    let members = state
        .leave_service
        .candidates(&ctx, path.into_inner(), query.team_id)
        .await?;
    Ok(ApiResponse::ok(members))
}
