//! Views on the player linked to the caller

use actix_web::web;
use actix_web::web::Data;
use actix_web::get;

use crate::auth::CurrentUser;
use crate::db;
use crate::errors::ServiceError;
use crate::matches::{Match, View};
use crate::players::Player;
use crate::server;
use crate::wallets::Wallet;

fn linked_player(user: &CurrentUser, conn: &db::Conn) -> Result<Player, ServiceError> {
    match Player::find_by_external_id(&user.external_user_id, conn)? {
        Some(player) => Ok(player),
        None => {
            not_found!("no player profile linked to this user");
        }
    }
}

#[get("/me/profile")]
async fn profile(user: CurrentUser, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let player = web::block(move || linked_player(&user, &conn)).await?;

    http_ok_json!(player);
}

#[get("/me/upcoming-matches")]
async fn upcoming_matches(user: CurrentUser, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let matches = web::block(move || {
        let player = linked_player(&user, &conn)?;
        Match::find_view(View::Upcoming, Some(&player), &conn)
    })
    .await?;

    http_ok_json!(matches);
}

#[get("/me/wallet")]
async fn wallet(user: CurrentUser, pool: Data<db::Pool>) -> server::Response {
    let conn = pool.get()?;

    let details = web::block(move || {
        let player = linked_player(&user, &conn)?;
        Wallet::find_by_owner(player.id, &conn)
    })
    .await?;

    http_ok_json!(details);
}

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(profile);
    cfg.service(upcoming_matches);
    cfg.service(wallet);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    #[actix_rt::test]
    async fn profile_needs_an_identity() {
        let mut app = test::init_service(
            App::new()
                .data(db::lazy_pool())
                .configure(register),
        )
        .await;

        let req = test::TestRequest::get().uri("/me/profile").to_request();
        let resp = test::call_service(&mut app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
