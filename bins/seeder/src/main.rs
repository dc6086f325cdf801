//! Development seeder for SimpleBank.
//!
//! Creates two USD accounts, then runs a batch of concurrent transfers in
//! alternating directions between them through the transfer coordinator.
//!
//! Usage: cargo run --bin seeder -- [TRANSFERS]
//!
//! `TRANSFERS` defaults to 10.

use std::sync::Arc;

use anyhow::Context;
use futures::future::join_all;
use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use simplebank_core::ledger::{CreateAccountInput, LedgerQueries};
use simplebank_core::transfer::{TransferCoordinator, TransferTxInput};
use simplebank_db::{SqlStore, connect, migrate};
use simplebank_shared::AppConfig;

const DEFAULT_TRANSFERS: usize = 10;
const OPENING_BALANCE: i64 = 10_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let transfers = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<usize>()
            .with_context(|| format!("Invalid transfer count: {arg}"))?,
        None => DEFAULT_TRANSFERS,
    };

    let db = connect(&config.database).await?;
    migrate(&db).await.context("Failed to run migrations")?;
    info!("Migrations applied");

    let store = Arc::new(SqlStore::new(db).with_timeout(config.transfer.timeout()));
    let mut rng = rand::rng();

    let mut accounts = Vec::with_capacity(2);
    for name in ["alice", "bob"] {
        let account = store
            .create_account(CreateAccountInput {
                owner: format!("{name}-{:04}", rng.random_range(0..10_000)),
                balance: OPENING_BALANCE,
                currency: "USD".to_string(),
            })
            .await?;
        info!(account_id = %account.id, owner = %account.owner, "Account created");
        accounts.push(account);
    }
    let (a, b) = (accounts[0].id, accounts[1].id);

    let coordinator = TransferCoordinator::from_config(Arc::clone(&store), &config.transfer);
    let tasks = (0..transfers).map(|i| {
        let coordinator = coordinator.clone();
        let amount = rng.random_range(1..=100);
        let input = if i % 2 == 0 {
            TransferTxInput::new(a, b, amount)
        } else {
            TransferTxInput::new(b, a, amount)
        };
        tokio::spawn(async move { coordinator.transfer(input).await })
    });

    let mut committed = 0usize;
    for outcome in join_all(tasks.collect::<Vec<_>>()).await {
        match outcome.context("Transfer task panicked")? {
            Ok(_) => committed += 1,
            Err(e) => warn!(error = %e, code = e.error_code(), "Transfer failed"),
        }
    }

    let a = store.get_account(a).await?;
    let b = store.get_account(b).await?;
    info!(
        committed,
        requested = transfers,
        from_balance = a.balance,
        to_balance = b.balance,
        total = a.balance + b.balance,
        "Seeding complete"
    );

    Ok(())
}
