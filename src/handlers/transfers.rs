use actix_web::{HttpResponse, Result, web};
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{CreateTransferInput, TransferNoteInput};
use crate::handlers::shared::ApiResponse;
use crate::services::user_context::UserContext;

fn note_of(input: Option<web::Json<TransferNoteInput>>) -> Option<String> {
    input.and_then(|input| input.into_inner().note)
}

pub async fn create(
    state: web::Data<AppState>,
    ctx: UserContext,
    input: web::Json<CreateTransferInput>,
) -> Result<HttpResponse> {
    let request = state
        .transfer_service
        .create(&ctx, input.into_inner())
        .await?;
    Ok(ApiResponse::created(request))
}

pub async fn mine(state: web::Data<AppState>, ctx: UserContext) -> Result<HttpResponse> {
    let transfers = state.transfer_service.mine(&ctx).await?;
    Ok(ApiResponse::ok(transfers))
}

pub async fn queue(state: web::Data<AppState>, ctx: UserContext) -> Result<HttpResponse> {
    let requests = state.transfer_service.queue(&ctx).await?;
    Ok(ApiResponse::ok(requests))
}

pub async fn get(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let request = state.transfer_service.get(&ctx, path.into_inner()).await?;
    Ok(ApiResponse::ok(request))
}

pub async fn accept(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    input: Option<web::Json<TransferNoteInput>>,
) -> Result<HttpResponse> {
    let request = state
        .transfer_service
        .accept(&ctx, path.into_inner(), note_of(input))
        .await?;
    Ok(ApiResponse::ok(request))
}

pub async fn reject(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    input: Option<web::Json<TransferNoteInput>>,
) -> Result<HttpResponse> {
    let request = state
        .transfer_service
        .reject(&ctx, path.into_inner(), note_of(input))
        .await?;
    Ok(ApiResponse::ok(request))
}

pub async fn cancel(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let request = state
        .transfer_service
        .cancel(&ctx, path.into_inner())
        .await?;
    Ok(ApiResponse::ok(request))
}

pub async fn decline(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    input: Option<web::Json<TransferNoteInput>>,
) -> Result<HttpResponse> {
    let request = state
        .transfer_service
        .decline(&ctx, path.into_inner(), note_of(input))
        .await?;
    Ok(ApiResponse::ok(request))
}

pub async fn approve(
    state: web::Data<AppState>,
    ctx: UserContext,
    path: web::Path<Uuid>,
    input: Option<web::Json<TransferNoteInput>>,
) -> Result<HttpResponse> {
    let request = state
        .transfer_service
        .approve(&ctx, path.into_inner(), note_of(input))
        .await?;
    Ok(ApiResponse::ok(request))
}
