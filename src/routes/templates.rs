use actix_web::web;

use crate::handlers::templates;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/templates")
            .route("", web::get().to(templates::list))
            .route("", web::post().to(templates::create))
            .route("/{id}", web::put().to(templates::update))
            .route("/{id}", web::delete().to(templates::delete)),
    );
}
