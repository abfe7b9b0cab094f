use std::net::SocketAddr;

use actix_web::{http::StatusCode, test};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use serial_test::serial;

use shiftscheduler::database::models::{
    AuthResponse, ChangeEmailResponse, LoginInput, Profile, SignupInput, SignupResponse,
};
use shiftscheduler::error::{AppError, AuthFailure, ConflictReason};

#[macro_use]
mod common;

use common::{PASSWORD, TestAssertions, TestContext, read_data, read_json};

fn signup_input(email: &str) -> SignupInput {
    SignupInput {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        full_name: "Sam Carter".to_string(),
    }
}

#[tokio::test]
async fn signup_issues_a_session_when_confirmation_is_off() {
    common::setup_test_env();
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .state
        .auth_service
        .signup(signup_input("  Sam@Example.com "))
        .await
        .unwrap();

    assert!(!response.confirmation_required);
    let session = response.session.expect("session issued");
    assert!(!session.token.is_empty());
    assert_eq!(session.profile.email, "sam@example.com");
    assert!(session.profile.email_confirmed_at.is_some());
    assert_ne!(session.profile.password_hash, PASSWORD);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let ctx = TestContext::new().await.unwrap();
    let auth = &ctx.state.auth_service;

    auth.signup(signup_input("dup@example.com")).await.unwrap();
    let err = auth
        .signup(signup_input("DUP@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(ConflictReason::EmailTaken)));
}

#[tokio::test]
async fn signup_rejects_weak_input() {
    let ctx = TestContext::new().await.unwrap();
    let auth = &ctx.state.auth_service;

    let err = auth.signup(signup_input("not-an-email")).await.unwrap_err();
    assert_eq!(err.detail().field.as_deref(), Some("email"));

    let mut short = signup_input("short@example.com");
    short.password = "abc".to_string();
    let err = auth.signup(short).await.unwrap_err();
    assert_eq!(err.detail().field.as_deref(), Some("password"));
}

#[tokio::test]
async fn login_checks_the_password() {
    let ctx = TestContext::new().await.unwrap();
    let auth = &ctx.state.auth_service;
    auth.signup(signup_input("login@example.com")).await.unwrap();

    let response = auth
        .login(LoginInput {
            email: "login@example.com".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    let claims = auth.verify_token(&response.token).unwrap();
    assert_eq!(claims.sub, response.profile.id);

    let err = auth
        .login(LoginInput {
            email: "login@example.com".to_string(),
            password: "wrong-password".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Auth(AuthFailure::InvalidCredentials)
    ));

    let err = auth
        .login(LoginInput {
            email: "nobody@example.com".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Auth(AuthFailure::InvalidCredentials)
    ));
}

#[tokio::test]
async fn unconfirmed_accounts_cannot_sign_in_until_confirmed() {
    let ctx = TestContext::with_config(|config| config.require_email_confirmation = true)
        .await
        .unwrap();
    let auth = &ctx.state.auth_service;

    let response = auth
        .signup(signup_input("pending@example.com"))
        .await
        .unwrap();
    assert!(response.confirmation_required);
    assert!(response.session.is_none());
    let token = response.confirmation_token.expect("token exposed outside production");

    let login = || LoginInput {
        email: "pending@example.com".to_string(),
        password: PASSWORD.to_string(),
    };
    let err = auth.login(login()).await.unwrap_err();
    assert!(matches!(err, AppError::Auth(AuthFailure::EmailNotConfirmed)));

    let profile = auth.confirm(&token).await.unwrap();
    assert!(profile.email_confirmed_at.is_some());
    assert!(auth.login(login()).await.is_ok());

    // Tokens are single use
    let err = auth.confirm(&token).await.unwrap_err();
    assert_eq!(err.detail().field.as_deref(), Some("token"));
}

#[actix_web::test]
#[serial]
async fn signup_and_current_user_over_http() {
    let ctx = TestContext::new().await.unwrap();
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(json!({
            "email": "http@example.com",
            "password": PASSWORD,
            "full_name": "Http User"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = test::read_body(resp).await;
    assert!(!String::from_utf8_lossy(&body).contains("password_hash"));
    let signup: SignupResponse = TestAssertions::assert_success_response(&body);
    let session = signup.session.expect("session issued");

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/user")
        .insert_header(common::AuthHelper::auth_header(&session.token))
        .to_request();
    let profile: Profile = read_data(test::call_service(&app, req).await).await;
    assert_eq!(profile.id, session.profile.id);
    assert_eq!(profile.full_name, "Http User");
}

#[actix_web::test]
async fn bad_credentials_report_their_kind() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.employee().await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": user.profile.email, "password": "nope-nope" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = read_json(resp).await;
    TestAssertions::assert_error(&body, "invalid_credentials", None);

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/user")
        .insert_header(("Authorization", "Bearer not.a.token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = read_json(resp).await;
    TestAssertions::assert_error(&body, "unauthorized", None);
}

#[actix_web::test]
async fn logout_revokes_outstanding_tokens() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.employee().await;
    let app = test_app!(ctx);

    let whoami = |token: &str| {
        test::TestRequest::get()
            .uri("/api/v1/auth/user")
            .insert_header(common::AuthHelper::auth_header(token))
            .to_request()
    };

    let resp = test::call_service(&app, whoami(&user.token)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .insert_header(user.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, whoami(&user.token)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": user.profile.email, "password": PASSWORD }))
        .to_request();
    let session: AuthResponse = read_data(test::call_service(&app, req).await).await;
    let resp = test::call_service(&app, whoami(&session.token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn password_change_rotates_the_session() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.employee().await;
    let app = test_app!(ctx);

    let req = test::TestRequest::put()
        .uri("/api/v1/auth/password")
        .insert_header(user.bearer())
        .set_json(json!({ "current_password": "wrong-one", "new_password": "another-secret" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::put()
        .uri("/api/v1/auth/password")
        .insert_header(user.bearer())
        .set_json(json!({ "current_password": PASSWORD, "new_password": "another-secret" }))
        .to_request();
    let session: AuthResponse = read_data(test::call_service(&app, req).await).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/user")
        .insert_header(user.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": session.profile.email, "password": "another-secret" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn email_change_applies_after_confirmation() {
    let ctx = TestContext::new().await.unwrap();
    let user = ctx.employee().await;
    let other = ctx.employee().await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/email")
        .insert_header(user.bearer())
        .set_json(json!({ "new_email": other.profile.email, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = read_json(resp).await;
    TestAssertions::assert_error(&body, "conflict", Some("email_taken"));

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/email")
        .insert_header(user.bearer())
        .set_json(json!({ "new_email": "Moved@Example.com", "password": PASSWORD }))
        .to_request();
    let pending: ChangeEmailResponse = read_data(test::call_service(&app, req).await).await;
    assert_eq!(pending.pending_email, "moved@example.com");

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/user")
        .insert_header(user.bearer())
        .to_request();
    let profile: Profile = read_data(test::call_service(&app, req).await).await;
    assert_eq!(profile.email, user.profile.email);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/confirm")
        .set_json(json!({ "token": pending.confirmation_token.expect("token exposed") }))
        .to_request();
    let profile: Profile = read_data(test::call_service(&app, req).await).await;
    assert_eq!(profile.email, "moved@example.com");
}

#[actix_web::test]
async fn repeated_logins_from_one_address_are_throttled() {
    let ctx = TestContext::with_config(|config| config.auth_rate_limit_max_requests = 2)
        .await
        .unwrap();
    let app = test_app!(ctx);
    let addr: SocketAddr = "10.0.0.7:40000".parse().unwrap();

    let attempt = || {
        test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .peer_addr(addr)
            .set_json(json!({ "email": "x@example.com", "password": "whatever1" }))
            .to_request()
    };

    for _ in 0..2 {
        let resp = test::call_service(&app, attempt()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    let resp = test::call_service(&app, attempt()).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = read_json(resp).await;
    TestAssertions::assert_error(&body, "rate_limited", None);

    // Other addresses keep their own budget
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .peer_addr("10.0.0.8:40000".parse().unwrap())
        .set_json(json!({ "email": "x@example.com", "password": "whatever1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
