use actix_web::web;

use crate::handlers::teams;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/teams")
            .route("", web::get().to(teams::list))
            .route("", web::post().to(teams::create))
            .route("/managed", web::get().to(teams::managed))
            .route("/{id}", web::get().to(teams::get))
            .route("/{id}", web::put().to(teams::update))
            .route("/{id}", web::delete().to(teams::delete))
            .route("/{id}/members", web::get().to(teams::members))
            .route("/{id}/members", web::post().to(teams::add_member))
            .route(
                "/{id}/members/{member_id}",
                web::delete().to(teams::remove_member),
            )
            .route(
                "/{id}/transfer-targets",
                web::get().to(teams::transfer_targets),
            ),
    );
}
