use crate::domain::account::{Account, AccountId, Amount, UserId};
use crate::domain::card::{Card, CardId};
use crate::domain::credit::{
    Credit, CreditId, CreditStatus, Installment, InstallmentId, InstallmentStatus,
};
use crate::domain::entry::{EntryId, LedgerEntry};
use crate::error::{NotifyError, RateError, StoreError, TxError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

pub type AccountStoreRef = Arc<dyn AccountStore>;
pub type EntryStoreRef = Arc<dyn EntryStore>;
pub type CardStoreRef = Arc<dyn CardStore>;
pub type CreditStoreRef = Arc<dyn CreditStore>;
pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type UnitOfWorkRef = Arc<dyn UnitOfWork>;
pub type RateProviderRef = Arc<dyn RateProvider>;
pub type NotifierRef = Arc<dyn Notifier>;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn insert(&self, account: Account) -> Result<(), StoreError>;
    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError>;
    async fn list_by_owner(&self, user_id: UserId) -> Result<Vec<Account>, StoreError>;
}

#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn get(&self, id: EntryId) -> Result<Option<LedgerEntry>, StoreError>;
    /// Newest first. A zero limit falls back to the default page size.
    async fn list_by_owner(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>, StoreError>;
    async fn list_by_account(
        &self,
        account_id: AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>, StoreError>;
    async fn list_by_owner_between(
        &self,
        user_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, StoreError>;
}

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn insert(&self, card: Card) -> Result<(), StoreError>;
    async fn get(&self, id: CardId) -> Result<Option<Card>, StoreError>;
}

#[async_trait]
pub trait CreditStore: Send + Sync {
    async fn get(&self, id: CreditId) -> Result<Option<Credit>, StoreError>;
    async fn list_by_owner(&self, user_id: UserId) -> Result<Vec<Credit>, StoreError>;
    async fn update_status(&self, id: CreditId, status: CreditStatus) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// All installments of one credit, ordered by due date.
    async fn list_by_credit(&self, credit_id: CreditId) -> Result<Vec<Installment>, StoreError>;
    /// Pending installments whose due date is at or before `now`.
    async fn list_due_pending(&self, now: DateTime<Utc>) -> Result<Vec<Installment>, StoreError>;
    /// Moves a pending installment to `status`. Installments transition at
    /// most once: a terminal installment is left untouched and `false` is
    /// returned.
    async fn update_status(
        &self,
        id: InstallmentId,
        status: InstallmentStatus,
        paid_date: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError>;
}

/// Entry point for an atomic unit of work spanning accounts, ledger entries,
/// credits and installments.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}

/// One atomic unit of work. Mutations are staged and land together at
/// `commit`, or not at all; dropping an uncommitted unit discards it.
///
/// Commit re-validates the staged mutations against current state, which is
/// what serializes concurrent mutators of the same account: a debit that can
/// no longer be covered fails the whole unit with
/// [`TxError::InsufficientBalance`], and marking an installment paid fails
/// with [`TxError::InstallmentNotPending`] if another sweep settled it first.
#[async_trait]
pub trait StoreTx: Send {
    fn credit_balance(&mut self, account_id: AccountId, amount: Amount);
    fn debit_balance(&mut self, account_id: AccountId, amount: Amount);
    fn insert_entry(&mut self, entry: LedgerEntry);
    fn insert_credit(&mut self, credit: Credit);
    fn insert_installments(&mut self, installments: Vec<Installment>);
    fn mark_installment_paid(&mut self, id: InstallmentId, paid_date: DateTime<Utc>);
    async fn commit(self: Box<Self>) -> Result<(), TxError>;
}

/// Supplies the current annual reference rate, in percent.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn current_rate(&self) -> Result<Decimal, RateError>;
}

/// Best-effort outbound notifications. Callers dispatch these off the
/// critical path and log failures; no method here may affect an already
/// committed operation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn credit_approved(&self, user_id: UserId, credit: &Credit) -> Result<(), NotifyError>;
    async fn payment_settled(
        &self,
        user_id: UserId,
        credit_id: CreditId,
        amount: Decimal,
    ) -> Result<(), NotifyError>;
    async fn payment_overdue(
        &self,
        user_id: UserId,
        credit_id: CreditId,
        amount: Decimal,
    ) -> Result<(), NotifyError>;
}
