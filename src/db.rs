embed_migrations!("migrations/");

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, PooledConnection};
use diesel::PgConnection;

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type Conn = PooledConnection<ConnectionManager<PgConnection>>;

fn connect(database_url: &str) -> diesel::ConnectionResult<PgConnection> {
    PgConnection::establish(database_url)
}

pub fn migrate(database_url: &str) -> anyhow::Result<()> {
    let connection = connect(database_url)?;
    embedded_migrations::run_with_output(&connection, &mut std::io::stdout())?;

    Ok(())
}

pub fn build_connection_pool(database_url: &str, max_size: u32) -> anyhow::Result<Pool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool: Pool = r2d2::Pool::builder().max_size(max_size).build(manager)?;

    Ok(pool)
}

/// builds a pool that only connects once a connection is requested
#[cfg(test)]
pub fn lazy_pool() -> Pool {
    let manager = ConnectionManager::<PgConnection>::new("postgres://localhost/racket_test");
    r2d2::Pool::builder()
        .min_idle(Some(0))
        .build_unchecked(manager)
}

#[cfg(test)]
static MIGRATE: std::sync::Once = std::sync::Once::new();

/// A connection to the database in `TEST_DATABASE_URL` inside a transaction
/// that is never committed. Returns None when the variable is not set.
#[cfg(test)]
pub fn test_connection() -> Option<Conn> {
    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;

    MIGRATE.call_once(|| migrate(&database_url).expect("unable to run migrations"));

    let pool = build_connection_pool(&database_url, 1).expect("unable to build pool");
    let conn = pool.get().expect("unable to get connection");
    conn.begin_test_transaction()
        .expect("unable to start test transaction");

    Some(conn)
}
