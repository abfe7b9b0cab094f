use actix_web::web;

use crate::AppState;
use crate::handlers::auth;
use crate::middleware::RateLimitMiddleware;

pub fn configure(cfg: &mut web::ServiceConfig, state: &web::Data<AppState>) {
    let limiter = || RateLimitMiddleware::auth(&state.config, state.auth_rate_limit.clone());

    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/signup")
                    .wrap(limiter())
                    .route(web::post().to(auth::signup)),
            )
            .service(
                web::resource("/login")
                    .wrap(limiter())
                    .route(web::post().to(auth::login)),
            )
            .route("/logout", web::post().to(auth::logout))
            .route("/user", web::get().to(auth::user))
            .route("/password", web::put().to(auth::change_password))
            .route("/email", web::post().to(auth::change_email))
            .route("/confirm", web::post().to(auth::confirm)),
    );
}
