use actix_web::web;

use crate::handlers::context;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/me").route("/context", web::get().to(context::me)));
}
