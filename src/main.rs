//! Booking and payment tracking for casual sports groups.
#![warn(missing_debug_implementations, rust_2018_idioms)]

#[macro_use]
extern crate diesel;

#[macro_use]
extern crate diesel_migrations;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate log;

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate serde_json;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;

use anyhow::Error;
use dotenv::dotenv;

#[macro_use]
mod macros;

mod activities;
mod auth;
mod config;
mod db;
mod errors;
mod matches;
mod me;
mod payments;
mod players;
mod registrations;
mod schema;
mod server;
mod share_codes;
mod sport_centers;
mod stats;
mod teams;
mod users;
mod validator;
mod wallets;

#[actix_web::main]
async fn main() -> anyhow::Result<(), Error> {
    init().await?;

    Ok(())
}

async fn init() -> anyhow::Result<(), Error> {
    dotenv().ok();

    let config = config::Config::from_env()?;

    let (opentelemetry, _uninstall) = match config.opentelemetry_endpoint() {
        Some(endpoint) => {
            let (tracer, uninstall) = opentelemetry_jaeger::new_pipeline()
                .with_service_name("racket")
                .with_agent_endpoint(endpoint)
                .install()
                .map_err(|e| anyhow::anyhow!("unable to connect to opentelemetry agent: {}", e))?;

            (
                Some(tracing_opentelemetry::layer().with_tracer(tracer)),
                Some(uninstall),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(opentelemetry)
        .try_init()
        .map_err(|e| anyhow::anyhow!("unable to initialize the tracer: {}", e))?;

    let _sentry = config.sentry_dsn().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    debug!("running the database migrations");
    db::migrate(config.database_url())?;

    let pool = db::build_connection_pool(config.database_url(), config.database_pool_size())?;

    info!(
        "launching the webserver on {}:{}",
        config.api_host(),
        config.api_port()
    );
    server::launch(&config, pool).await?;

    Ok(())
}
