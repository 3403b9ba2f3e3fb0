use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::web::{Data, HttpResponse, Json, Path};
use actix_web::{delete, get, post};

use crate::db;
use crate::server;
use crate::share_codes::{ShareCode, ShareUrlMessage};
use crate::validator::Validator;

#[get("/share-codes")]
async fn find_all(pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let codes = web::block(move || ShareCode::find_all(&conn)).await?;

    http_ok_json!(codes);
}

#[post("/share-codes")]
async fn create(message: Json<ShareUrlMessage>, pool: Data<db::Pool>) -> server::Response {
    let message = Validator::new(message.into_inner()).validate()?;

    let conn = pool.get()?;

    let code = web::block(move || ShareCode::create(message, &conn)).await?;

    http_created_json!(code);
}

#[delete("/share-codes/{id}")]
async fn delete(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    web::block(move || ShareCode::delete(*id, &conn)).await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(create);
    cfg.service(delete);
}
