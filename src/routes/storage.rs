use actix_web::web;

use crate::handlers::storage;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/storage")
            .route("/avatars/{user_id}/avatar", web::get().to(storage::get_avatar)),
    );
}
