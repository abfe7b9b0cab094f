use actix_web::web;

use crate::handlers::transfers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/transfers")
            .route("", web::post().to(transfers::create))
            .route("/mine", web::get().to(transfers::mine))
            .route("/queue", web::get().to(transfers::queue))
            .route("/{id}", web::get().to(transfers::get))
            .route("/{id}/accept", web::post().to(transfers::accept))
            .route("/{id}/reject", web::post().to(transfers::reject))
            .route("/{id}/cancel", web::post().to(transfers::cancel))
            .route("/{id}/decline", web::post().to(transfers::decline))
            .route("/{id}/approve", web::post().to(transfers::approve)),
    );
}
