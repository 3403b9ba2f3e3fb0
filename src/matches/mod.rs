pub mod cost;
mod models;
pub mod routes;

pub use models::*;
