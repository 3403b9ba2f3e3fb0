use actix_web::web;
use actix_web::web::Data;
use actix_web::get;

use crate::activities::Activity;
use crate::db;
use crate::server;

#[get("/activities")]
async fn latest(pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let activities = web::block(move || Activity::latest(&conn)).await?;

    http_ok_json!(activities);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(latest);
}
