// Not every test binary uses every helper here.
#![allow(dead_code)]

use async_trait::async_trait;
use bankd::application::analytics::AnalyticsService;
use bankd::application::credit::CreditService;
use bankd::application::ledger::LedgerService;
use bankd::domain::account::{Account, AccountId, AccountKind, Balance, UserId};
use bankd::domain::credit::{build_schedule, Credit, CreditId, Installment};
use bankd::domain::ports::{AccountStore, Notifier, UnitOfWork};
use bankd::error::NotifyError;
use bankd::infrastructure::in_memory::MemoryStore;
use bankd::infrastructure::rates::StaticRateProvider;
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Notification sink that records what was dispatched, for asserting on the
/// fire-and-forget paths.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub async fn events(&self) -> Vec<String> {
        self.events.lock().await.clone()
    }

    /// Notifications are spawned off the critical path; poll until they land.
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        for _ in 0..100 {
            let events = self.events.lock().await.clone();
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn credit_approved(
        &self,
        _user_id: UserId,
        credit: &Credit,
    ) -> Result<(), NotifyError> {
        self.events
            .lock()
            .await
            .push(format!("approved:{}", credit.id));
        Ok(())
    }

    async fn payment_settled(
        &self,
        _user_id: UserId,
        credit_id: CreditId,
        _amount: Decimal,
    ) -> Result<(), NotifyError> {
        self.events.lock().await.push(format!("settled:{credit_id}"));
        Ok(())
    }

    async fn payment_overdue(
        &self,
        _user_id: UserId,
        credit_id: CreditId,
        _amount: Decimal,
    ) -> Result<(), NotifyError> {
        self.events.lock().await.push(format!("overdue:{credit_id}"));
        Ok(())
    }
}

pub struct TestBank {
    pub store: Arc<MemoryStore>,
    pub ledger: LedgerService,
    pub credits: Arc<CreditService>,
    pub analytics: AnalyticsService,
    pub notifications: Arc<RecordingNotifier>,
}

pub fn test_bank() -> TestBank {
    let store = Arc::new(MemoryStore::new());
    let notifications = Arc::new(RecordingNotifier::default());
    let ledger = LedgerService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    );
    let credits = Arc::new(CreditService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(StaticRateProvider::new(dec!(7.5))),
        notifications.clone(),
    ));
    let analytics = AnalyticsService::new(store.clone(), store.clone(), store.clone());
    TestBank {
        store,
        ledger,
        credits,
        analytics,
        notifications,
    }
}

/// Inserts an account with a preset balance and no ledger history.
pub async fn seeded_account(bank: &TestBank, user: UserId, balance: Decimal) -> Account {
    let mut account = Account::open(user, AccountKind::Debit);
    account.balance = Balance::new(balance);
    bank.store.insert(account.clone()).await.unwrap();
    account
}

/// Seeds an already-originated credit whose first installment is past due,
/// without disbursing anything. Returns the credit and its first installment.
pub async fn seeded_due_credit(
    bank: &TestBank,
    user: UserId,
    account_id: AccountId,
    principal: Decimal,
) -> (Credit, Installment) {
    let mut credit = Credit::originate(
        user,
        account_id,
        principal.try_into().unwrap(),
        12,
        dec!(12.5),
    );
    credit.start_date = Utc::now() - ChronoDuration::days(40);
    let schedule = build_schedule(&credit);
    let first = schedule[0].clone();

    let mut tx = bank.store.begin().await.unwrap();
    tx.insert_credit(credit.clone());
    tx.insert_installments(schedule);
    tx.commit().await.unwrap();

    (credit, first)
}
