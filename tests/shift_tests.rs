use actix_web::{http::StatusCode, test};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use serial_test::serial;

use shiftscheduler::database::models::{
    LeaveStatus, Shift, ShiftStatus, TeamRole, TransferStatus,
};

#[macro_use]
mod common;

use common::{TestAssertions, TestContext, date, days_from_today, read_data, read_json};

fn shift_body(employee_id: uuid::Uuid, team_id: uuid::Uuid, shift_date: &str) -> Value {
    json!({
        "employee_id": employee_id,
        "team_id": team_id,
        "title": "Evening",
        "shift_date": shift_date,
        "start_time": "17:00:00",
        "end_time": "23:00:00",
        "notes": null
    })
}

#[actix_web::test]
#[serial]
async fn manager_schedules_a_team_member() {
    common::setup_test_env();
    let ctx = TestContext::new().await.unwrap();
    let fx = ctx.team_with_members().await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/v1/shifts")
        .insert_header(fx.manager.bearer())
        .set_json(shift_body(fx.alice.id(), fx.team.id, "2030-07-01"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let shift: Shift = read_data(resp).await;
    assert_eq!(shift.employee_id, fx.alice.id());
    assert_eq!(shift.status, ShiftStatus::Scheduled);
    assert_eq!(shift.created_by, Some(fx.manager.id()));

    // Members cannot schedule
    let req = test::TestRequest::post()
        .uri("/api/v1/shifts")
        .insert_header(fx.alice.bearer())
        .set_json(shift_body(fx.bob.id(), fx.team.id, "2030-07-01"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn shift_inputs_are_validated() {
    let ctx = TestContext::new().await.unwrap();
    let fx = ctx.team_with_members().await;
    let outsider = ctx.employee().await;
    let app = test_app!(ctx);

    let mut backwards = shift_body(fx.alice.id(), fx.team.id, "2030-07-01");
    backwards["end_time"] = json!("08:00:00");
    let mut untitled = shift_body(fx.alice.id(), fx.team.id, "2030-07-01");
    untitled["title"] = json!("  ");

    for (body, field) in [
        (backwards, "end_time"),
        (untitled, "title"),
        (
            shift_body(outsider.id(), fx.team.id, "2030-07-01"),
            "employee_id",
        ),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/v1/shifts")
            .insert_header(fx.manager.bearer())
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = read_json(resp).await;
        assert_eq!(body["error"]["field"], field);
    }
}

#[actix_web::test]
async fn approved_leave_blocks_scheduling_on_covered_dates() {
    let ctx = TestContext::new().await.unwrap();
    let fx = ctx.team_with_members().await;
    ctx.create_leave(
        fx.alice.id(),
        date(2030, 7, 1),
        date(2030, 7, 3),
        LeaveStatus::Approved,
    )
    .await;
    // Pending leave is advisory only
    ctx.create_leave(
        fx.bob.id(),
        date(2030, 7, 1),
        date(2030, 7, 3),
        LeaveStatus::Pending,
    )
    .await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/v1/shifts")
        .insert_header(fx.manager.bearer())
        .set_json(shift_body(fx.alice.id(), fx.team.id, "2030-07-02"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = read_json(resp).await;
    TestAssertions::assert_error(&body, "conflict", Some("leave_conflict"));

    let req = test::TestRequest::post()
        .uri("/api/v1/shifts")
        .insert_header(fx.manager.bearer())
        .set_json(shift_body(fx.bob.id(), fx.team.id, "2030-07-02"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let bobs: Shift = read_data(resp).await;

    // Moving an existing shift onto the leave is refused the same way
    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/shifts/{}", bobs.id))
        .insert_header(fx.manager.bearer())
        .set_json(shift_body(fx.alice.id(), fx.team.id, "2030-07-02"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(ctx.shift(bobs.id).await.employee_id, fx.bob.id());

    // A cancelled shift may sit on the leave
    let mut cancelled = shift_body(fx.alice.id(), fx.team.id, "2030-07-02");
    cancelled["status"] = json!("cancelled");
    let req = test::TestRequest::post()
        .uri("/api/v1/shifts")
        .insert_header(fx.manager.bearer())
        .set_json(cancelled)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    TestAssertions::assert_record_count(&ctx.pool, "shifts", 2).await;
}

#[actix_web::test]
async fn leave_check_reports_covering_leave() {
    let ctx = TestContext::new().await.unwrap();
    let fx = ctx.team_with_members().await;
    let leave = ctx
        .create_leave(
            fx.alice.id(),
            date(2030, 7, 1),
            date(2030, 7, 3),
            LeaveStatus::Approved,
        )
        .await;
    let app = test_app!(ctx);

    let check = |user: &common::TestUser, day: &str| {
        test::TestRequest::get()
            .uri(&format!(
                "/api/v1/shifts/leave-check?employee_id={}&date={}",
                fx.alice.id(),
                day
            ))
            .insert_header(user.bearer())
            .to_request()
    };

    let found: Option<Value> = read_data(test::call_service(&app, check(&fx.manager, "2030-07-03")).await).await;
    assert_eq!(
        found.and_then(|leave| leave["id"].as_str().map(str::to_string)),
        Some(leave.id.to_string())
    );

    let resp = test::call_service(&app, check(&fx.manager, "2030-07-04")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = read_json(resp).await;
    assert!(body["data"].is_null());

    let resp = test::call_service(&app, check(&fx.bob, "2030-07-02")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn cancelling_a_shift_cancels_its_active_transfer() {
    let ctx = TestContext::new().await.unwrap();
    let fx = ctx.team_with_members().await;
    let shift = ctx
        .create_shift(
            fx.alice.id(),
            Some(fx.team.id),
            days_from_today(3),
            ShiftStatus::Scheduled,
        )
        .await;
    let transfer = ctx
        .create_transfer(&shift, fx.bob.id(), TransferStatus::PendingManager)
        .await;
    let app = test_app!(ctx);

    let mut body = shift_body(
        fx.alice.id(),
        fx.team.id,
        &shift.shift_date.format("%Y-%m-%d").to_string(),
    );
    body["status"] = json!("cancelled");
    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/shifts/{}", shift.id))
        .insert_header(fx.manager.bearer())
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(ctx.shift(shift.id).await.status, ShiftStatus::Cancelled);
    assert_eq!(
        ctx.transfer(transfer.id).await.status,
        TransferStatus::Cancelled
    );
}

#[actix_web::test]
async fn moving_a_shift_moves_its_transfer_expiry() {
    let ctx = TestContext::new().await.unwrap();
    let fx = ctx.team_with_members().await;
    let shift = ctx
        .create_shift(
            fx.alice.id(),
            Some(fx.team.id),
            days_from_today(3),
            ShiftStatus::Scheduled,
        )
        .await;
    let transfer = ctx
        .create_transfer(&shift, fx.bob.id(), TransferStatus::PendingTarget)
        .await;
    let app = test_app!(ctx);

    let later = days_from_today(10).format("%Y-%m-%d").to_string();
    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/shifts/{}", shift.id))
        .insert_header(fx.manager.bearer())
        .set_json(shift_body(fx.alice.id(), fx.team.id, &later))
        .to_request();
    let moved: Shift = read_data(test::call_service(&app, req).await).await;
    assert_eq!(moved.shift_date, days_from_today(10));

    let transfer = ctx.transfer(transfer.id).await;
    assert_eq!(transfer.status, TransferStatus::PendingTarget);
    assert_eq!(transfer.expires_at, moved.starts_at());

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/transfers/{}/accept", transfer.id))
        .insert_header(fx.bob.bearer())
        .set_json(json!({ "note": "happy to" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn moving_a_shift_to_another_team_cancels_its_transfer() {
    let ctx = TestContext::new().await.unwrap();
    let fx = ctx.team_with_members().await;
    let other = ctx.create_team("Kitchen", fx.manager.id()).await;
    ctx.add_member(other.id, fx.manager.id(), TeamRole::Manager)
        .await;
    ctx.add_member(other.id, fx.alice.id(), TeamRole::Member)
        .await;
    let shift = ctx
        .create_shift(
            fx.alice.id(),
            Some(fx.team.id),
            days_from_today(3),
            ShiftStatus::Scheduled,
        )
        .await;
    let transfer = ctx
        .create_transfer(&shift, fx.bob.id(), TransferStatus::PendingTarget)
        .await;
    let app = test_app!(ctx);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/shifts/{}", shift.id))
        .insert_header(fx.manager.bearer())
        .set_json(shift_body(
            fx.alice.id(),
            other.id,
            &shift.shift_date.format("%Y-%m-%d").to_string(),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(
        ctx.transfer(transfer.id).await.status,
        TransferStatus::Cancelled
    );
}

#[actix_web::test]
async fn deleting_a_shift_closes_its_transfers_first() {
    let ctx = TestContext::new().await.unwrap();
    let fx = ctx.team_with_members().await;
    let shift = ctx
        .create_shift(
            fx.alice.id(),
            Some(fx.team.id),
            days_from_today(3),
            ShiftStatus::Scheduled,
        )
        .await;
    ctx.create_transfer(&shift, fx.bob.id(), TransferStatus::PendingTarget)
        .await;
    let app = test_app!(ctx);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/shifts/{}", shift.id))
        .insert_header(fx.alice.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/shifts/{}", shift.id))
        .insert_header(fx.manager.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    TestAssertions::assert_record_count(&ctx.pool, "shifts", 0).await;
}

#[actix_web::test]
async fn listing_is_scoped_to_own_and_managed_shifts() {
    let ctx = TestContext::new().await.unwrap();
    let fx = ctx.team_with_members().await;
    let admin = ctx.admin().await;
    let loner = ctx.employee().await;

    for employee in [fx.alice.id(), fx.bob.id()] {
        ctx.create_shift(
            employee,
            Some(fx.team.id),
            date(2030, 8, 1),
            ShiftStatus::Scheduled,
        )
        .await;
    }
    ctx.create_shift(loner.id(), None, date(2030, 8, 1), ShiftStatus::Scheduled)
        .await;
    let app = test_app!(ctx);

    let list = |user: &common::TestUser| {
        test::TestRequest::get()
            .uri("/api/v1/shifts?start_date=2030-08-01&end_date=2030-08-31")
            .insert_header(user.bearer())
            .to_request()
    };

    let shifts: Vec<Shift> = read_data(test::call_service(&app, list(&fx.alice)).await).await;
    assert_eq!(shifts.len(), 1);
    assert_eq!(shifts[0].employee_id, fx.alice.id());

    let shifts: Vec<Shift> = read_data(test::call_service(&app, list(&fx.manager)).await).await;
    assert_eq!(shifts.len(), 2);

    let shifts: Vec<Shift> = read_data(test::call_service(&app, list(&admin)).await).await;
    assert_eq!(shifts.len(), 3);
}

#[actix_web::test]
async fn past_shifts_are_completed_once() {
    let ctx = TestContext::new().await.unwrap();
    let fx = ctx.team_with_members().await;

    let yesterday = ctx
        .create_shift(
            fx.alice.id(),
            Some(fx.team.id),
            days_from_today(-1),
            ShiftStatus::Scheduled,
        )
        .await;
    let cancelled = ctx
        .create_shift(
            fx.alice.id(),
            Some(fx.team.id),
            days_from_today(-2),
            ShiftStatus::Cancelled,
        )
        .await;
    let today = ctx
        .create_shift(
            fx.bob.id(),
            Some(fx.team.id),
            days_from_today(0),
            ShiftStatus::Scheduled,
        )
        .await;
    let app = test_app!(ctx);

    let sweep = || {
        test::TestRequest::post()
            .uri("/api/v1/rpc/complete_past_shifts")
            .insert_header(fx.bob.bearer())
            .to_request()
    };

    let count: u64 = read_data(test::call_service(&app, sweep()).await).await;
    assert_eq!(count, 1);
    let after_first = ctx.shift(yesterday.id).await;
    assert_eq!(after_first.status, ShiftStatus::Completed);

    let count: u64 = read_data(test::call_service(&app, sweep()).await).await;
    assert_eq!(count, 0);
    assert_eq!(ctx.shift(yesterday.id).await, after_first);

    assert_eq!(ctx.shift(cancelled.id).await.status, ShiftStatus::Cancelled);
    assert_eq!(ctx.shift(today.id).await.status, ShiftStatus::Scheduled);
}

#[actix_web::test]
async fn sweeps_require_a_session() {
    let ctx = TestContext::new().await.unwrap();
    let app = test_app!(ctx);

    for uri in [
        "/api/v1/rpc/complete_past_shifts",
        "/api/v1/rpc/expire_transfer_requests",
    ] {
        let req = test::TestRequest::post().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
