use actix_web::web;

use crate::handlers::shifts;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/shifts")
            .route("", web::get().to(shifts::list))
            .route("", web::post().to(shifts::create))
            .route("/leave-check", web::get().to(shifts::leave_check))
            .route("/{id}", web::get().to(shifts::get))
            .route("/{id}", web::put().to(shifts::update))
            .route("/{id}", web::delete().to(shifts::delete)),
    );
}
