use bankd::application::credit::CreditService;
use bankd::application::scheduler::PaymentScheduler;
use bankd::domain::ports::{
    AccountStoreRef, CreditStoreRef, NotifierRef, PaymentStoreRef, RateProviderRef, UnitOfWorkRef,
};
use bankd::infrastructure::in_memory::MemoryStore;
use bankd::infrastructure::notify::TracingNotifier;
use bankd::infrastructure::rates::StaticRateProvider;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<std::path::PathBuf>,

    /// Hours between payment sweeps.
    #[arg(long, default_value_t = 12)]
    sweep_interval_hours: u64,

    /// Annual reference rate (percent) served by the static rate provider.
    #[arg(long, default_value = "7.5")]
    key_rate: Decimal,

    /// Run a single payment sweep and exit instead of staying resident.
    #[arg(long)]
    once: bool,
}

struct Stores {
    accounts: AccountStoreRef,
    credits: CreditStoreRef,
    payments: PaymentStoreRef,
    uow: UnitOfWorkRef,
}

fn memory_stores() -> Stores {
    let store = Arc::new(MemoryStore::new());
    Stores {
        accounts: store.clone(),
        credits: store.clone(),
        payments: store.clone(),
        uow: store,
    }
}

#[cfg(feature = "storage-rocksdb")]
fn rocksdb_stores(path: &std::path::Path) -> Result<Stores> {
    let store = Arc::new(
        bankd::infrastructure::rocksdb::RocksDbStore::open(path).into_diagnostic()?,
    );
    Ok(Stores {
        accounts: store.clone(),
        credits: store.clone(),
        payments: store.clone(),
        uow: store,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    #[cfg(feature = "storage-rocksdb")]
    let stores = match &cli.db_path {
        Some(path) => rocksdb_stores(path)?,
        None => memory_stores(),
    };
    #[cfg(not(feature = "storage-rocksdb"))]
    let stores = memory_stores();

    let rates: RateProviderRef = Arc::new(StaticRateProvider::new(cli.key_rate));
    let notifier: NotifierRef = Arc::new(TracingNotifier);

    let credits = Arc::new(CreditService::new(
        stores.credits,
        stores.payments,
        stores.accounts,
        stores.uow,
        rates,
        notifier,
    ));

    if cli.once {
        credits.settle_due_installments().await.into_diagnostic()?;
        return Ok(());
    }

    let interval = Duration::from_secs(cli.sweep_interval_hours * 3600);
    let scheduler = PaymentScheduler::start(credits, interval);

    tokio::signal::ctrl_c().await.into_diagnostic()?;
    tracing::info!("shutdown signal received");
    scheduler.stop().await;

    Ok(())
}
