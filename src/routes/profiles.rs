use actix_web::web;

use crate::handlers::profiles;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/profiles")
            .route("", web::get().to(profiles::list))
            .route("/me", web::get().to(profiles::get_me))
            .route("/me", web::put().to(profiles::update_me))
            .route("/me/avatar", web::put().to(profiles::upload_avatar))
            .route("/{id}", web::get().to(profiles::get))
            .route("/{id}/role", web::put().to(profiles::update_role)),
    );
}
