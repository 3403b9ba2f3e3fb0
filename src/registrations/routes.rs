use actix_web::web;
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put};

use crate::auth::CurrentUser;
use crate::db;
use crate::registrations::{
    AttendantRequestMessage, CommentMessage, MatchRegisterMessage, PaidForMessage,
    RegisterMessage, Registration,
};
use crate::server;
use crate::validator::Validator;

#[get("/registrations")]
async fn overview(pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let registrations = web::block(move || Registration::overview(&conn)).await?;

    http_ok_json!(registrations);
}

#[post("/registrations")]
async fn create(message: Json<RegisterMessage>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let registration =
        web::block(move || Registration::register(message.player_id, message.match_id, &conn))
            .await?;

    http_created_json!(registration);
}

#[post("/registrations/me")]
async fn register_self(
    message: Json<MatchRegisterMessage>,
    user: CurrentUser,
    pool: Data<db::Pool>,
) -> server::Response {
    let conn = pool.get()?;

    let registration = web::block(move || {
        Registration::register_external(&user.external_user_id, message.match_id, &conn)
    })
    .await?;

    http_created_json!(registration);
}

#[post("/registrations/attendant-requests")]
async fn attendant_request(
    request: Json<AttendantRequestMessage>,
    pool: Data<db::Pool>,
) -> server::Response {
    let request = Validator::new(request.into_inner()).validate()?;

    let conn = pool.get()?;

    let toggle = web::block(move || Registration::toggle_attendance(request, &conn)).await?;

    http_ok_json!(toggle);
}

#[delete("/registrations/{id}")]
async fn unregister(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let registration = web::block(move || Registration::unregister(*id, &conn)).await?;

    http_ok_json!(registration);
}

#[put("/registrations/{id}/paid")]
async fn mark_paid(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let registration = web::block(move || Registration::set_paid(*id, true, &conn)).await?;

    http_ok_json!(registration);
}

#[put("/registrations/{id}/unpaid")]
async fn mark_unpaid(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let registration = web::block(move || Registration::set_paid(*id, false, &conn)).await?;

    http_ok_json!(registration);
}

#[put("/registrations/{id}/paid-for")]
async fn paid_for(
    id: Path<i64>,
    message: Json<PaidForMessage>,
    pool: Data<db::Pool>,
) -> server::Response {
    let conn = pool.get()?;

    let registration =
        web::block(move || Registration::set_paid_for(*id, message.count, &conn)).await?;

    http_ok_json!(registration);
}

#[put("/registrations/{id}/comment")]
async fn comment(
    id: Path<i64>,
    message: Json<CommentMessage>,
    pool: Data<db::Pool>,
) -> server::Response {
    let message = Validator::new(message.into_inner()).validate()?;

    let conn = pool.get()?;

    let registration = web::block(move || Registration::set_comment(*id, message, &conn)).await?;

    http_ok_json!(registration);
}

#[get("/matches/{id}/registrations")]
async fn roster(id: Path<i64>, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let entries = web::block(move || Registration::roster(*id, &conn)).await?;

    http_ok_json!(entries);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(overview);
    cfg.service(create);
    cfg.service(register_self);
    cfg.service(attendant_request);
    cfg.service(unregister);
    cfg.service(mark_paid);
    cfg.service(mark_unpaid);
    cfg.service(paid_for);
    cfg.service(comment);
    cfg.service(roster);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    #[actix_rt::test]
    async fn self_registration_needs_an_identity() {
        let mut app = test::init_service(
            App::new()
                .data(db::lazy_pool())
                .configure(register),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/registrations/me")
            .set_json(&json!({ "match_id": 1 }))
            .to_request();
        let resp = test::call_service(&mut app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
