use actix_web::{HttpResponse, Result, web};

use crate::AppState;
use crate::database::models::{
    ChangeEmailInput, ChangePasswordInput, ConfirmTokenInput, LoginInput, SignupInput,
};
use crate::handlers::shared::ApiResponse;
use crate::services::user_context::UserContext;

pub async fn signup(
    state: web::Data<AppState>,
    input: web::Json<SignupInput>,
) -> Result<HttpResponse> {
    let response = state.auth_service.signup(input.into_inner()).await?;
    Ok(ApiResponse::created(response))
}

pub async fn login(
    state: web::Data<AppState>,
    input: web::Json<LoginInput>,
) -> Result<HttpResponse> {
    let response = state.auth_service.login(input.into_inner()).await?;
    Ok(ApiResponse::ok(response))
}

pub async fn logout(state: web::Data<AppState>, ctx: UserContext) -> Result<HttpResponse> {
    state.auth_service.logout(&ctx).await?;
    Ok(ApiResponse::message("Signed out"))
}

/// Current user, validated against the store on every call
pub async fn user(ctx: UserContext) -> Result<HttpResponse> {
    Ok(ApiResponse::ok(ctx.profile))
}

pub async fn change_password(
    state: web::Data<AppState>,
    ctx: UserContext,
    input: web::Json<ChangePasswordInput>,
) -> Result<HttpResponse> {
    let response = state
        .auth_service
        .change_password(&ctx, input.into_inner())
        .await?;
    Ok(ApiResponse::ok(response))
}

pub async fn change_email(
    state: web::Data<AppState>,
    ctx: UserContext,
    input: web::Json<ChangeEmailInput>,
) -> Result<HttpResponse> {
    let response = state
        .auth_service
        .request_email_change(&ctx, input.into_inner())
        .await?;
    Ok(ApiResponse::ok(response))
}

pub async fn confirm(
    state: web::Data<AppState>,
    input: web::Json<ConfirmTokenInput>,
) -> Result<HttpResponse> {
    let profile = state.auth_service.confirm(&input.token).await?;
    Ok(ApiResponse::ok(profile))
}
