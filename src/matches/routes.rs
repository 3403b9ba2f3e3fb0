use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::web::{Data, HttpResponse, Json, Path};
use actix_web::{delete, get, post, put};

use crate::auth::CurrentUser;
use crate::db;
use crate::errors::ServiceError;
use crate::matches::{AdditionalCostMessage, CostOverride, Match, MatchMessage, MatchResponse, View};
use crate::players::Player;
use crate::server;
use crate::validator::Validator;

/// loads a view, marking the matches the caller is registered for
async fn view(
    view: View,
    user: Option<CurrentUser>,
    pool: Data<db::Pool>,
) -> Result<Vec<MatchResponse>, ServiceError> {
    let conn = pool.get()?;

    let matches = web::block(move || {
        let player = match user {
            Some(user) => Player::find_by_external_id(&user.external_user_id, &conn)?,
            None => None,
        };
        Match::find_view(view, player.as_ref(), &conn)
    })
    .await?;

    Ok(matches)
}

#[get("/matches")]
async fn find_all(user: Option<CurrentUser>, pool: Data<db::Pool>) -> server::Response {
    let matches = view(View::All, user, pool).await?;

    http_ok_json!(matches);
}

#[get("/matches/upcoming")]
async fn upcoming(user: Option<CurrentUser>, pool: Data<db::Pool>) -> server::Response {
    let matches = view(View::Upcoming, user, pool).await?;

    http_ok_json!(matches);
}

#[get("/matches/today")]
async fn today(user: Option<CurrentUser>, pool: Data<db::Pool>) -> server::Response {
    let matches = view(View::Today, user, pool).await?;

    http_ok_json!(matches);
}

#[get("/matches/future")]
async fn future(user: Option<CurrentUser>, pool: Data<db::Pool>) -> server::Response {
    let matches = view(View::Future, user, pool).await?;

    http_ok_json!(matches);
}

#[get("/matches/archived")]
async fn archived(user: Option<CurrentUser>, pool: Data<db::Pool>) -> server::Response {
    let matches = view(View::Archived, user, pool).await?;

    http_ok_json!(matches);
}

#[post("/matches")]
async fn create(message: Json<MatchMessage>, pool: Data<db::Pool>) -> server::Response {
    let message = Validator::new(message.into_inner()).validate()?;

    let conn = pool.get()?;

    let created = web::block(move || Match::create(message, &conn)).await?;

    http_created_json!(created);
}

#[put("/matches/{id}")]
async fn update(
    id: Path<i64>,
    message: Json<MatchMessage>,
    pool: Data<db::Pool>,
) -> server::Response {
    let message = Validator::new(message.into_inner()).validate()?;

    let conn = pool.get()?;

    let updated = web::block(move || Match::update(*id, message, &conn)).await?;

    http_ok_json!(updated);
}

#[delete("/matches/{id}")]
async fn delete(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    web::block(move || Match::delete(*id, &conn)).await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

#[post("/matches/{id}/clone")]
async fn clone_match(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let cloned = web::block(move || Match::clone_match(*id, &conn)).await?;

    http_created_json!(cloned);
}

#[get("/matches/{id}/cost")]
async fn cost(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let breakdown = web::block(move || Match::cost_breakdown(*id, &conn)).await?;

    http_ok_json!(breakdown);
}

#[put("/matches/{id}/cost")]
async fn override_cost(
    id: Path<i64>,
    body: Json<CostOverride>,
    pool: Data<db::Pool>,
) -> server::Response {
    let cost_override = Validator::new(body.into_inner()).validate()?;

    let conn = pool.get()?;

    let updated = web::block(move || Match::override_cost(*id, cost_override, &conn)).await?;

    http_ok_json!(updated);
}

#[get("/matches/{id}/additional-costs")]
async fn additional_costs(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let costs = web::block(move || Match::additional_costs(*id, &conn)).await?;

    http_ok_json!(costs);
}

#[post("/matches/{id}/additional-costs")]
async fn add_costs(
    id: Path<i64>,
    costs: Json<Vec<AdditionalCostMessage>>,
    pool: Data<db::Pool>,
) -> server::Response {
    let costs = Validator::new(costs.into_inner()).validate()?;

    let conn = pool.get()?;

    let costs = web::block(move || Match::add_costs(*id, costs, &conn)).await?;

    http_created_json!(costs);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_all);
    cfg.service(upcoming);
    cfg.service(today);
    cfg.service(future);
    cfg.service(archived);
    cfg.service(create);
    cfg.service(update);
    cfg.service(delete);
    cfg.service(clone_match);
    cfg.service(cost);
    cfg.service(override_cost);
    cfg.service(additional_costs);
    cfg.service(add_costs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_rt::test]
    async fn negative_cost_overrides_are_rejected() {
        let mut app = test::init_service(
            App::new()
                .data(db::lazy_pool())
                .configure(register),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/matches/1/cost")
            .set_json(&json!({ "cost": -10.0 }))
            .to_request();
        let resp = test::call_service(&mut app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn matches_must_end_after_they_start() {
        let mut app = test::init_service(
            App::new()
                .data(db::lazy_pool())
                .configure(register),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/matches")
            .set_json(&json!({
                "sport_center_id": 1,
                "start_time": "2024-03-01T21:00:00Z",
                "end_time": "2024-03-01T19:00:00Z"
            }))
            .to_request();
        let resp = test::call_service(&mut app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
