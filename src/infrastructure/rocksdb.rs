use crate::domain::account::{Account, AccountId, Amount, UserId};
use crate::domain::card::{Card, CardId};
use crate::domain::credit::{
    Credit, CreditId, CreditStatus, Installment, InstallmentId, InstallmentStatus,
};
use crate::domain::entry::{EntryId, LedgerEntry};
use crate::domain::ports::{
    AccountStore, CardStore, CreditStore, EntryStore, PaymentStore, StoreTx, UnitOfWork,
};
use crate::error::{StoreError, TxError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const CF_ACCOUNTS: &str = "accounts";
pub const CF_ENTRIES: &str = "entries";
pub const CF_CARDS: &str = "cards";
pub const CF_CREDITS: &str = "credits";
pub const CF_INSTALLMENTS: &str = "installments";

/// Persistent store over RocksDB, one column family per table, JSON values
/// keyed by the v7 uuid (so iteration order is chronological).
///
/// Unit-of-work commits serialize through `commit_lock` and land as a single
/// `WriteBatch`: the read-validate-write section runs under the lock, which
/// closes the lost-update window between concurrent balance mutators.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [
            CF_ACCOUNTS,
            CF_ENTRIES,
            CF_CARDS,
            CF_CREDITS,
            CF_INSTALLMENTS,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
        .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, cfs)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Unavailable(format!("column family {name} not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: Uuid) -> Result<Option<T>, StoreError> {
        let cf = self.cf(cf)?;
        let bytes = self
            .db
            .get_cf(cf, key.as_bytes())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        match bytes {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, cf: &str, key: Uuid, value: &T) -> Result<(), StoreError> {
        let cf = self.cf(cf)?;
        let bytes =
            serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.db
            .put_cf(cf, key.as_bytes(), bytes)
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>, StoreError> {
        let cf = self.cf(cf)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_, bytes) = item.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            out.push(
                serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?,
            );
        }
        Ok(out)
    }
}

#[async_trait]
impl AccountStore for RocksDbStore {
    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        self.put_json(CF_ACCOUNTS, account.id.0, &account)
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.get_json(CF_ACCOUNTS, id.0)
    }

    async fn list_by_owner(&self, user_id: UserId) -> Result<Vec<Account>, StoreError> {
        let accounts: Vec<Account> = self.scan(CF_ACCOUNTS)?;
        Ok(accounts
            .into_iter()
            .filter(|a| a.user_id == user_id)
            .collect())
    }
}

#[async_trait]
impl EntryStore for RocksDbStore {
    async fn get(&self, id: EntryId) -> Result<Option<LedgerEntry>, StoreError> {
        self.get_json(CF_ENTRIES, id.0)
    }

    async fn list_by_owner(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let entries: Vec<LedgerEntry> = self.scan(CF_ENTRIES)?;
        Ok(entries
            .into_iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let entries: Vec<LedgerEntry> = self.scan(CF_ENTRIES)?;
        Ok(entries
            .into_iter()
            .rev()
            .filter(|e| e.from_account == Some(account_id) || e.to_account == Some(account_id))
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn list_by_owner_between(
        &self,
        user_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let entries: Vec<LedgerEntry> = self.scan(CF_ENTRIES)?;
        Ok(entries
            .into_iter()
            .filter(|e| e.user_id == user_id && e.occurred_at >= from && e.occurred_at <= to)
            .collect())
    }
}

#[async_trait]
impl CardStore for RocksDbStore {
    async fn insert(&self, card: Card) -> Result<(), StoreError> {
        self.put_json(CF_CARDS, card.id.0, &card)
    }

    async fn get(&self, id: CardId) -> Result<Option<Card>, StoreError> {
        self.get_json(CF_CARDS, id.0)
    }
}

#[async_trait]
impl CreditStore for RocksDbStore {
    async fn get(&self, id: CreditId) -> Result<Option<Credit>, StoreError> {
        self.get_json(CF_CREDITS, id.0)
    }

    async fn list_by_owner(&self, user_id: UserId) -> Result<Vec<Credit>, StoreError> {
        let credits: Vec<Credit> = self.scan(CF_CREDITS)?;
        Ok(credits
            .into_iter()
            .filter(|c| c.user_id == user_id)
            .collect())
    }

    async fn update_status(&self, id: CreditId, status: CreditStatus) -> Result<(), StoreError> {
        let _guard = self.commit_lock.lock().await;
        if let Some(mut credit) = self.get_json::<Credit>(CF_CREDITS, id.0)? {
            credit.status = status;
            credit.updated_at = Utc::now();
            self.put_json(CF_CREDITS, id.0, &credit)?;
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for RocksDbStore {
    async fn list_by_credit(&self, credit_id: CreditId) -> Result<Vec<Installment>, StoreError> {
        let installments: Vec<Installment> = self.scan(CF_INSTALLMENTS)?;
        let mut installments: Vec<Installment> = installments
            .into_iter()
            .filter(|i| i.credit_id == credit_id)
            .collect();
        installments.sort_by_key(|i| i.due_date);
        Ok(installments)
    }

    async fn list_due_pending(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Installment>, StoreError> {
        let installments: Vec<Installment> = self.scan(CF_INSTALLMENTS)?;
        let mut due: Vec<Installment> = installments
            .into_iter()
            .filter(|i| i.status == InstallmentStatus::Pending && i.due_date <= now)
            .collect();
        due.sort_by_key(|i| i.due_date);
        Ok(due)
    }

    async fn update_status(
        &self,
        id: InstallmentId,
        status: InstallmentStatus,
        paid_date: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let _guard = self.commit_lock.lock().await;
        match self.get_json::<Installment>(CF_INSTALLMENTS, id.0)? {
            Some(mut installment) if installment.status == InstallmentStatus::Pending => {
                installment.status = status;
                installment.paid_date = paid_date;
                installment.updated_at = Utc::now();
                self.put_json(CF_INSTALLMENTS, id.0, &installment)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

enum StagedOp {
    CreditBalance { account_id: AccountId, amount: Decimal },
    DebitBalance { account_id: AccountId, amount: Decimal },
    InsertEntry(LedgerEntry),
    InsertCredit(Credit),
    InsertInstallments(Vec<Installment>),
    MarkInstallmentPaid {
        id: InstallmentId,
        paid_date: DateTime<Utc>,
    },
}

pub struct RocksTx {
    store: RocksDbStore,
    ops: Vec<StagedOp>,
}

#[async_trait]
impl UnitOfWork for RocksDbStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        Ok(Box::new(RocksTx {
            store: self.clone(),
            ops: Vec::new(),
        }))
    }
}

#[async_trait]
impl StoreTx for RocksTx {
    fn credit_balance(&mut self, account_id: AccountId, amount: Amount) {
        self.ops.push(StagedOp::CreditBalance {
            account_id,
            amount: amount.value(),
        });
    }

    fn debit_balance(&mut self, account_id: AccountId, amount: Amount) {
        self.ops.push(StagedOp::DebitBalance {
            account_id,
            amount: amount.value(),
        });
    }

    fn insert_entry(&mut self, entry: LedgerEntry) {
        self.ops.push(StagedOp::InsertEntry(entry));
    }

    fn insert_credit(&mut self, credit: Credit) {
        self.ops.push(StagedOp::InsertCredit(credit));
    }

    fn insert_installments(&mut self, installments: Vec<Installment>) {
        self.ops.push(StagedOp::InsertInstallments(installments));
    }

    fn mark_installment_paid(&mut self, id: InstallmentId, paid_date: DateTime<Utc>) {
        self.ops.push(StagedOp::MarkInstallmentPaid { id, paid_date });
    }

    async fn commit(self: Box<Self>) -> Result<(), TxError> {
        let RocksTx { store, ops } = *self;
        let _guard = store.commit_lock.lock().await;
        let now = Utc::now();

        // Working copies of every touched account and installment, validated
        // before anything is written.
        let mut accounts: HashMap<AccountId, Account> = HashMap::new();
        let mut settled: Vec<Installment> = Vec::new();

        for op in &ops {
            match op {
                StagedOp::CreditBalance { account_id, amount } => {
                    let account = load_account(&store, &mut accounts, *account_id)?;
                    account.balance.0 += *amount;
                    account.updated_at = now;
                }
                StagedOp::DebitBalance { account_id, amount } => {
                    let account = load_account(&store, &mut accounts, *account_id)?;
                    account.balance.0 -= *amount;
                    account.updated_at = now;
                    if account.balance.0 < Decimal::ZERO {
                        return Err(TxError::InsufficientBalance(account_id.0));
                    }
                }
                StagedOp::MarkInstallmentPaid { id, paid_date } => {
                    match store.get_json::<Installment>(CF_INSTALLMENTS, id.0)? {
                        Some(mut installment)
                            if installment.status == InstallmentStatus::Pending =>
                        {
                            installment.status = InstallmentStatus::Paid;
                            installment.paid_date = Some(*paid_date);
                            installment.updated_at = now;
                            settled.push(installment);
                        }
                        _ => return Err(TxError::InstallmentNotPending(id.0)),
                    }
                }
                StagedOp::InsertEntry(_)
                | StagedOp::InsertCredit(_)
                | StagedOp::InsertInstallments(_) => {}
            }
        }

        let mut batch = WriteBatch::default();
        for account in accounts.values() {
            stage_put(&store, &mut batch, CF_ACCOUNTS, account.id.0, account)?;
        }
        for installment in &settled {
            stage_put(&store, &mut batch, CF_INSTALLMENTS, installment.id.0, installment)?;
        }
        for op in &ops {
            match op {
                StagedOp::InsertEntry(entry) => {
                    stage_put(&store, &mut batch, CF_ENTRIES, entry.id.0, entry)?;
                }
                StagedOp::InsertCredit(credit) => {
                    stage_put(&store, &mut batch, CF_CREDITS, credit.id.0, credit)?;
                }
                StagedOp::InsertInstallments(installments) => {
                    for installment in installments {
                        stage_put(
                            &store,
                            &mut batch,
                            CF_INSTALLMENTS,
                            installment.id.0,
                            installment,
                        )?;
                    }
                }
                _ => {}
            }
        }

        store
            .db
            .write(batch)
            .map_err(|e| TxError::Store(StoreError::Unavailable(e.to_string())))?;
        Ok(())
    }
}

fn load_account<'a>(
    store: &RocksDbStore,
    accounts: &'a mut HashMap<AccountId, Account>,
    id: AccountId,
) -> Result<&'a mut Account, TxError> {
    match accounts.entry(id) {
        std::collections::hash_map::Entry::Occupied(entry) => Ok(entry.into_mut()),
        std::collections::hash_map::Entry::Vacant(entry) => {
            let account = store
                .get_json::<Account>(CF_ACCOUNTS, id.0)?
                .ok_or(TxError::AccountMissing(id.0))?;
            Ok(entry.insert(account))
        }
    }
}

fn stage_put<T: Serialize>(
    store: &RocksDbStore,
    batch: &mut WriteBatch,
    cf: &str,
    key: Uuid,
    value: &T,
) -> Result<(), TxError> {
    let cf = store.cf(cf)?;
    let bytes = serde_json::to_vec(value)
        .map_err(|e| TxError::Store(StoreError::Serialization(e.to_string())))?;
    batch.put_cf(cf, key.as_bytes(), bytes);
    Ok(())
}
