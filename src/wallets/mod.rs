mod ledger;
mod models;
pub mod routes;

pub use ledger::*;
pub use models::*;
