use actix_web::web;
use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, put};

use crate::db;
use crate::server;
use crate::sport_centers::{SportCenter, SportCenterMessage};
use crate::validator::Validator;

#[get("/sportcenters")]
async fn find_all(pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let centers = web::block(move || SportCenter::find_all(&conn)).await?;

    http_ok_json!(centers);
}

#[get("/sportcenters/options")]
async fn options(pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let choices = web::block(move || SportCenter::options(&conn)).await?;

    http_ok_json!(choices);
}

#[post("/sportcenters")]
async fn create(center: Json<SportCenterMessage>, pool: Data<db::Pool>) -> server::Response {
    let center = Validator::new(center.into_inner()).validate()?;

    let conn = pool.get()?;

    let center = web::block(move || SportCenter::create(center, &conn)).await?;

    http_created_json!(center);
}

#[put("/sportcenters/{id}")]
async fn update(
    id: Path<i64>,
    center: Json<SportCenterMessage>,
    pool: Data<db::Pool>,
) -> server::Response {
    let center = Validator::new(center.into_inner()).validate()?;

    let conn = pool.get()?;

    let center = web::block(move || SportCenter::update(*id, center, &conn)).await?;

    http_ok_json!(center);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(options);
    cfg.service(create);
    cfg.service(update);
}
