use actix_web::web;

use crate::AppState;

pub mod auth;
pub mod context;
pub mod leave;
pub mod profiles;
pub mod rpc;
pub mod shifts;
pub mod storage;
pub mod teams;
pub mod templates;
pub mod transfers;

pub fn configure(cfg: &mut web::ServiceConfig, state: &web::Data<AppState>) {
    cfg.service(
        web::scope("/api/v1")
            // Raw avatar uploads are the only large bodies
            .app_data(web::PayloadConfig::new(state.config.avatar_max_bytes))
            .configure(|cfg| auth::configure(cfg, state))
            .configure(context::configure)
            .configure(profiles::configure)
            .configure(teams::configure)
            .configure(shifts::configure)
            .configure(templates::configure)
            .configure(leave::configure)
            .configure(transfers::configure)
            .configure(rpc::configure)
            .configure(storage::configure),
    );
}
