use actix_web::web;
use actix_web::web::{Data, Json, Path};
use actix_web::{get, post};

use crate::db;
use crate::server;
use crate::validator::Validator;
use crate::wallets::{AmountMessage, Wallet, WalletMessage};

#[get("/wallets")]
async fn find_all(pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let wallets = web::block(move || Wallet::find_all(&conn)).await?;

    http_ok_json!(wallets);
}

#[get("/wallets/{id}")]
async fn find(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let wallet = web::block(move || Wallet::find(*id, &conn)).await?;

    http_ok_json!(wallet);
}

#[post("/wallets")]
async fn create(wallet: Json<WalletMessage>, pool: Data<db::Pool>) -> server::Response {
    let wallet = Validator::new(wallet.into_inner()).validate()?;

    let conn = pool.get()?;

    let wallet = web::block(move || Wallet::create(wallet, &conn)).await?;

    http_created_json!(wallet);
}

#[post("/wallets/{id}/credit")]
async fn credit(
    id: Path<i64>,
    message: Json<AmountMessage>,
    pool: Data<db::Pool>,
) -> server::Response {
    let message = Validator::new(message.into_inner()).validate()?;

    let conn = pool.get()?;

    let response = web::block(move || Wallet::credit(*id, message, &conn)).await?;

    http_ok_json!(response);
}

#[post("/wallets/{id}/debit")]
async fn debit(
    id: Path<i64>,
    message: Json<AmountMessage>,
    pool: Data<db::Pool>,
) -> server::Response {
    let message = Validator::new(message.into_inner()).validate()?;

    let conn = pool.get()?;

    let response = web::block(move || Wallet::debit(*id, message, &conn)).await?;

    http_ok_json!(response);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(find);
    cfg.service(create);
    cfg.service(credit);
    cfg.service(debit);
}
