use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};

use actix_service::{Service, Transform};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::web::Data;
use actix_web::Error;
use actix_web::{get, web};
use futures::future::{ok, Ready};
use futures::Future;

use crate::db;
use crate::matches::Match;
use crate::server::Response;

/// request counters shared by every worker
#[derive(Debug, Default)]
pub struct Stats {
    pub requests: AtomicU32,
    pub errors: AtomicU32,
}

impl Stats {
    pub fn new() -> Stats {
        Stats::default()
    }

    fn record(&self, is_server_error: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);

        if is_server_error {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub requests: u32,
    pub errors: u32,
    pub upcoming_matches: i64,
    pub active_db_connections: u32,
    pub idle_db_connections: u32,
}

#[get("/stats")]
pub async fn route(stats: Data<Stats>, pool: Data<db::Pool>) -> Response {
    let state = pool.state();
    let conn = pool.get()?;

    let upcoming_matches = web::block(move || Match::upcoming_count(&conn)).await?;

    http_ok_json!(StatsResponse {
        requests: stats.requests.load(Ordering::Relaxed),
        errors: stats.errors.load(Ordering::Relaxed),
        upcoming_matches,
        active_db_connections: state.connections,
        idle_db_connections: state.idle_connections,
    });
}

pub struct Middleware {
    stats: Data<Stats>,
}

impl Middleware {
    pub fn new(stats: Data<Stats>) -> Middleware {
        Middleware { stats }
    }
}

impl<S, B> Transform<S> for Middleware
where
    S: Service<Request = ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
{
    type Request = ServiceRequest;
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestCountMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequestCountMiddleware {
            service,
            stats: self.stats.clone(),
        })
    }
}

pub struct RequestCountMiddleware<S> {
    service: S,
    stats: Data<Stats>,
}

impl<S, B> Service for RequestCountMiddleware<S>
where
    S: Service<Request = ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
{
    type Request = ServiceRequest;
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: ServiceRequest) -> Self::Future {
        let stats = self.stats.clone();
        let fut = self.service.call(request);

        Box::pin(async move {
            let res = fut.await;

            match &res {
                Ok(response) => stats.record(response.response().status().is_server_error()),
                Err(_) => stats.record(true),
            }

            res
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App, HttpResponse};

    #[test]
    fn server_errors_are_counted() {
        let stats = Stats::new();

        stats.record(false);
        stats.record(true);

        assert_eq!(stats.requests.load(Ordering::Relaxed), 2);
        assert_eq!(stats.errors.load(Ordering::Relaxed), 1);
    }

    #[actix_rt::test]
    async fn middleware_counts_requests() {
        let stats = Data::new(Stats::new());

        let mut app = test::init_service(
            App::new()
                .wrap(Middleware::new(stats.clone()))
                .route("/ok", web::get().to(|| async { HttpResponse::Ok().finish() }))
                .route(
                    "/broken",
                    web::get().to(|| async { HttpResponse::InternalServerError().finish() }),
                ),
        )
        .await;

        let req = test::TestRequest::get().uri("/ok").to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/broken").to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(stats.requests.load(Ordering::Relaxed), 2);
        assert_eq!(stats.errors.load(Ordering::Relaxed), 1);
    }
}
