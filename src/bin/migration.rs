//! Schema migration CLI (`up`, `down`, `status`, `fresh`, ...).
//!
//! Reads the connection string from `DATABASE_URL`.

use bookstore_api::migrator::Migrator;
use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
