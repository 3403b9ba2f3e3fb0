use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::normalize::TrailingSlash;
use actix_web::{get, middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use actix_web_opentelemetry::RequestTracing;

use crate::activities;
use crate::auth;
use crate::config::Config;
use crate::db;
use crate::errors::ServiceError;
use crate::matches;
use crate::me;
use crate::payments;
use crate::players;
use crate::registrations;
use crate::share_codes;
use crate::sport_centers;
use crate::stats;
use crate::teams;
use crate::users;
use crate::wallets;

pub type Response = Result<HttpResponse, ServiceError>;

/// maximum size of a json body
const PAYLOAD_LIMIT: usize = 262_144;

#[get("/health")]
async fn health(_: HttpRequest) -> &'static str {
    "ok"
}

fn cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .allowed_header(auth::USER_HEADER)
        .max_age(3600);

    origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

/// every route of the api, relative to the /api scope
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
    cfg.service(stats::route);
    activities::routes::register(cfg);
    players::routes::register(cfg);
    sport_centers::routes::register(cfg);
    matches::routes::register(cfg);
    registrations::routes::register(cfg);
    payments::routes::register(cfg);
    wallets::routes::register(cfg);
    teams::routes::register(cfg);
    share_codes::routes::register(cfg);
    users::routes::register(cfg);
    me::routes::register(cfg);
}

pub async fn launch(config: &Config, db_pool: db::Pool) -> std::io::Result<()> {
    let stats = web::Data::new(stats::Stats::new());
    let origins = config.allowed_origins();

    HttpServer::new(move || {
        App::new()
            .data(db_pool.clone())
            .app_data(stats.clone())
            .app_data(web::JsonConfig::default().limit(PAYLOAD_LIMIT))
            .wrap(cors(&origins))
            .wrap(sentry_actix::Sentry::new())
            .wrap(RequestTracing::new())
            .wrap(middleware::DefaultHeaders::new().header("X-Version", env!("CARGO_PKG_VERSION")))
            .wrap(middleware::Compress::default())
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::new(TrailingSlash::Trim))
            .wrap(stats::Middleware::new(stats.clone()))
            .service(web::scope("/api").configure(routes))
    })
    .shutdown_timeout(config.shutdown_timeout())
    .bind(format!("{}:{}", config.api_host(), config.api_port()))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_rt::test]
    async fn health_check() {
        let mut app = test::init_service(
            App::new()
                .data(db::lazy_pool())
                .app_data(web::Data::new(stats::Stats::new()))
                .service(web::scope("/api").configure(routes)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&mut app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn module_routes_are_mounted_under_api() {
        let mut app = test::init_service(
            App::new()
                .data(db::lazy_pool())
                .app_data(web::Data::new(stats::Stats::new()))
                .service(web::scope("/api").configure(routes)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/players")
            .set_json(&json!({ "first_name": "" }))
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/anonymous/reports/outstanding-payments")
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri("/api/matches/1/cost")
            .set_json(&json!({ "cost": -1.0 }))
            .to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn trailing_slashes_are_trimmed() {
        let mut app = test::init_service(
            App::new()
                .wrap(middleware::NormalizePath::new(TrailingSlash::Trim))
                .service(web::scope("/api").service(health)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health/").to_request();
        let resp = test::call_service(&mut app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
    }
}
