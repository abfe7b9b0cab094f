use actix_web::web;

use crate::handlers::rpc;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rpc")
            .route(
                "/complete_past_shifts",
                web::post().to(rpc::complete_past_shifts),
            )
            .route(
                "/expire_transfer_requests",
                web::post().to(rpc::expire_transfer_requests),
            )
            .route(
                "/approve_shift_transfer",
                web::post().to(rpc::approve_shift_transfer),
            )
            .route(
                "/approve_leave_request",
                web::post().to(rpc::approve_leave_request),
            )
            .route(
                "/get_conflicting_shifts",
                web::post().to(rpc::get_conflicting_shifts),
            )
            .route(
                "/get_available_profiles_for_team",
                web::post().to(rpc::get_available_profiles_for_team),
            ),
    );
}
