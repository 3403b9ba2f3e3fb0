use actix_web::web;
use actix_web::web::{Data, Json};
use actix_web::{get, post};

use crate::db;
use crate::server;
use crate::users::{ExternalIdentity, User};
use crate::validator::Validator;

#[get("/users")]
async fn find_all(pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let users = web::block(move || User::find_all(&conn)).await?;

    http_ok_json!(users);
}

#[post("/users/sync")]
async fn sync(identities: Json<Vec<ExternalIdentity>>, pool: Data<db::Pool>) -> server::Response {
    let identities = Validator::new(identities.into_inner()).validate()?;

    let conn = pool.get()?;

    let summary = web::block(move || User::sync(identities, &conn)).await?;

    http_ok_json!(summary);
}

/// called by the identity provider when a user signs up or changes
#[post("/anonymous/webhooks/identity")]
async fn identity_webhook(
    identity: Json<ExternalIdentity>,
    pool: Data<db::Pool>,
) -> server::Response {
    let identity = Validator::new(identity.into_inner()).validate()?;

    let conn = pool.get()?;

    let summary = web::block(move || User::sync(vec![identity], &conn)).await?;

    http_ok_json!(summary);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(sync);
    cfg.service(identity_webhook);
}
