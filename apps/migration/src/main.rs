//! Migration CLI tool.
//!
//! `cargo run -p migration -- up` applies pending migrations against
//! `DATABASE_URL`; see `--help` for the other subcommands.

use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt().with_env_filter("info").init();

    tracing::info!("Running Yatube migrations");
    cli::run_cli(migration::Migrator).await;
}
