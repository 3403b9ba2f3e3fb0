use actix_web::web;
use actix_web::web::{Data, Query};
use actix_web::get;

use crate::db;
use crate::payments::{OutstandingPayment, ShareCodeQuery};
use crate::server;
use crate::share_codes::ShareCode;

#[get("/reports/outstanding-payments")]
async fn report(pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let outstanding = web::block(move || OutstandingPayment::report(&conn)).await?;

    http_ok_json!(outstanding);
}

#[get("/anonymous/reports/outstanding-payments")]
async fn public_report(query: Query<ShareCodeQuery>, pool: Data<db::Pool>) -> server::Response {
    let code = match query.into_inner().share_code {
        Some(code) if !code.trim().is_empty() => code,
        _ => {
            forbidden!("a share code is required");
        }
    };

    let conn = pool.get()?;

    let masked = web::block(move || {
        if !ShareCode::exists(&code, &conn)? {
            forbidden!("access denied");
        }
        OutstandingPayment::public_report(&conn)
    })
    .await?;

    http_ok_json!(masked);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(report);
    cfg.service(public_report);
}
