//! Database migration runner for Tally.
//!
//! Reads `DATABASE_URL`. Usage:
//!   migrator up      - Create the wallet ledger schema
//!   migrator down    - Drop it again
//!   migrator status  - Show applied migrations
//!   migrator fresh   - Drop everything and re-run

use sea_orm_migration::prelude::*;
use tally_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    cli::run_cli(Migrator).await;
}
