use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::web::{Data, HttpResponse, Json, Path};
use actix_web::{delete, get, post, put};

use crate::auth::CurrentUser;
use crate::db;
use crate::server;
use crate::teams::{MemberMessage, Team, TeamMessage, TeamUpdate};
use crate::validator::Validator;

#[get("/teams")]
async fn find_mine(user: CurrentUser, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let teams = web::block(move || Team::find_for_user(&user.external_user_id, &conn)).await?;

    http_ok_json!(teams);
}

#[get("/teams/{id}")]
async fn find(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let team = web::block(move || Team::find_with_members(*id, &conn)).await?;

    http_ok_json!(team);
}

#[post("/teams")]
async fn create(
    team: Json<TeamMessage>,
    user: CurrentUser,
    pool: Data<db::Pool>,
) -> server::Response {
    let team = Validator::new(team.into_inner()).validate()?;

    let conn = pool.get()?;

    let team = web::block(move || Team::create(team, &user.external_user_id, &conn)).await?;

    http_created_json!(team);
}

#[put("/teams/{id}")]
async fn update(
    id: Path<i64>,
    changes: Json<TeamUpdate>,
    user: CurrentUser,
    pool: Data<db::Pool>,
) -> server::Response {
    let changes = Validator::new(changes.into_inner()).validate()?;

    let conn = pool.get()?;

    let team =
        web::block(move || Team::update(*id, changes, &user.external_user_id, &conn)).await?;

    http_ok_json!(team);
}

#[delete("/teams/{id}")]
async fn delete(id: Path<i64>, user: CurrentUser, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    web::block(move || Team::delete(*id, &user.external_user_id, &conn)).await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

#[post("/teams/{id}/members")]
async fn add_member(
    id: Path<i64>,
    member: Json<MemberMessage>,
    user: CurrentUser,
    pool: Data<db::Pool>,
) -> server::Response {
    let member = Validator::new(member.into_inner()).validate()?;

    let conn = pool.get()?;

    let member =
        web::block(move || Team::add_member(*id, member, &user.external_user_id, &conn)).await?;

    http_created_json!(member);
}

#[delete("/teams/{id}/members/{player_id}")]
async fn remove_member(
    path: Path<(i64, i64)>,
    user: CurrentUser,
    pool: Data<db::Pool>,
) -> server::Response {
    let (id, player_id) = path.into_inner();

    let conn = pool.get()?;

    web::block(move || Team::remove_member(id, player_id, &user.external_user_id, &conn))
        .await?;

    Ok(HttpResponse::new(StatusCode::OK))
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(find_mine);
    cfg.service(find);
    cfg.service(create);
    cfg.service(update);
    cfg.service(delete);
    cfg.service(add_member);
    cfg.service(remove_member);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_rt::test]
    async fn teams_need_an_identity() {
        let mut app = test::init_service(
            App::new()
                .data(db::lazy_pool())
                .configure(register),
        )
        .await;

        let req = test::TestRequest::get().uri("/teams").to_request();
        let resp = test::call_service(&mut app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
