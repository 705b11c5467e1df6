//! Demo data seeder for Tally.
//!
//! Seeds a treasury account and two users with `GOLD` wallets, and gives
//! Alice a welcome bonus. Safe to run repeatedly.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tally_core::ledger::{
    DEFAULT_ASSET_TYPE, IdempotencyKey, LedgerService, TransactionRequest, TransactionType,
};
use tally_db::PgLedgerStore;
use tally_db::entities::{users, wallets};
use tally_shared::types::{UserId, WalletId};
use tally_shared::{DatabaseConfig, LedgerConfig};

/// Idempotency key of Alice's welcome bonus.
const WELCOME_BONUS_KEY: &str = "seed-alice-welcome-bonus";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = tally_db::connect(&DatabaseConfig::with_url(database_url))
        .await
        .context("Failed to connect to database")?;
    let service = LedgerService::new(PgLedgerStore::new(db.clone()), &LedgerConfig::default());

    println!("Seeding accounts...");
    let treasury = seed_account(&db, &service, "System Treasury", "treasury@tally.dev").await?;
    let alice = seed_account(&db, &service, "Alice", "alice@tally.dev").await?;
    let bob = seed_account(&db, &service, "Bob", "bob@tally.dev").await?;
    println!("  treasury wallet: {treasury}");
    println!("  alice wallet:    {alice}");
    println!("  bob wallet:      {bob}");

    println!("Seeding welcome bonus...");
    let entry = service
        .process(
            &TransactionRequest::new(alice, 100, TransactionType::Bonus, "SEED_INIT_1")
                .with_description("Welcome Bonus")
                .with_idempotency_key(IdempotencyKey::parse(WELCOME_BONUS_KEY)?),
        )
        .await?;
    println!("  entry {} ({} GOLD)", entry.id, entry.amount);

    let balance = service.get_balance(alice).await?;
    println!("  alice balance: {}", balance.balance);

    println!("Seeding complete!");
    Ok(())
}

/// Finds or creates a user and their default wallet.
async fn seed_account(
    db: &DatabaseConnection,
    service: &LedgerService<PgLedgerStore>,
    name: &str,
    email: &str,
) -> anyhow::Result<WalletId> {
    let existing_user = users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(db)
        .await?;

    let user_id = if let Some(user) = existing_user {
        println!("  {email} already exists, skipping...");
        UserId::from_uuid(user.id)
    } else {
        service.create_user(name, email).await?.id
    };

    let existing_wallet = wallets::Entity::find()
        .filter(wallets::Column::UserId.eq(user_id.into_inner()))
        .filter(wallets::Column::AssetType.eq(DEFAULT_ASSET_TYPE))
        .one(db)
        .await?;

    match existing_wallet {
        Some(wallet) => Ok(WalletId::from_uuid(wallet.id)),
        None => Ok(service.create_wallet(user_id, DEFAULT_ASSET_TYPE).await?.id),
    }
}
