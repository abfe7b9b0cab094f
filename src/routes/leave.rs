use actix_web::web;

use crate::handlers::leave;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leave-requests")
            .route("", web::post().to(leave::create))
            .route("/mine", web::get().to(leave::mine))
            .route("/team", web::get().to(leave::team))
            .route("/period", web::get().to(leave::period))
            .route("/{id}", web::get().to(leave::get))
            .route("/{id}/cancel", web::post().to(leave::cancel))
            .route("/{id}/reject", web::post().to(leave::reject))
            .route("/{id}/cancel-approved", web::post().to(leave::cancel_approved))
            .route("/{id}/approve", web::post().to(leave::approve))
            .route("/{id}/conflicts", web::get().to(leave::conflicts))
            .route(
                "/{id}/reassignment-candidates",
                web::get().to(leave::reassignment_candidates),
            ),
    );
}
