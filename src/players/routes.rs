use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::web::{Data, HttpResponse, Json, Path};
use actix_web::{delete, get, post, put};

use crate::db;
use crate::players::{Player, PlayerMessage};
use crate::server;
use crate::validator::Validator;

#[get("/players")]
async fn find_all(pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let players = web::block(move || Player::find_all(&conn)).await?;

    http_ok_json!(players);
}

#[post("/players")]
async fn create(player: Json<PlayerMessage>, pool: Data<db::Pool>) -> server::Response {
    let player = Validator::new(player.into_inner()).validate()?;

    let conn = pool.get()?;

    let player = web::block(move || Player::create(player, &conn)).await?;

    http_created_json!(player);
}

#[put("/players/{id}")]
async fn update(
    id: Path<i64>,
    player: Json<PlayerMessage>,
    pool: Data<db::Pool>,
) -> server::Response {
    let player = Validator::new(player.into_inner()).validate()?;

    let conn = pool.get()?;

    let player = web::block(move || Player::update(*id, player, &conn)).await?;

    http_ok_json!(player);
}

#[delete("/players/{id}")]
async fn delete(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    web::block(move || Player::delete(*id, &conn)).await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

#[put("/players/{id}/outstanding-payments/paid")]
async fn mark_outstanding_paid(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let updated = web::block(move || Player::mark_outstanding_paid(*id, &conn)).await?;

    http_ok_json!(json!({ "updated": updated }));
}

#[get("/players/external-users/{external_id}/attendant-requests")]
async fn attendant_requests(external_id: Path<String>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let requests =
        web::block(move || Player::attendant_requests(&external_id.into_inner(), &conn)).await?;

    http_ok_json!(requests);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(create);
    cfg.service(update);
    cfg.service(delete);
    cfg.service(mark_outstanding_paid);
    cfg.service(attendant_requests);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_rt::test]
    async fn create_rejects_blank_names() {
        let mut app = test::init_service(
            App::new()
                .data(db::lazy_pool())
                .configure(register),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/players")
            .set_json(&json!({ "first_name": "  " }))
            .to_request();
        let resp = test::call_service(&mut app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
