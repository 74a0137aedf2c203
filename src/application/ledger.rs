use crate::domain::account::{
    Account, AccountId, AccountKind, AccountSummary, Amount, Balance, BalanceProjection, UserId,
};
use crate::domain::card::{Card, CardId, CardSummary};
use crate::domain::entry::{EntryId, EntryKind, EntrySummary, LedgerEntry};
use crate::domain::ports::{AccountStoreRef, CardStoreRef, EntryStoreRef, UnitOfWorkRef};
use crate::error::{BankError, Result};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;

const DEFAULT_PAGE_SIZE: usize = 10;
/// Lookback window of the balance forecast, in days.
const FORECAST_LOOKBACK_DAYS: i64 = 30;

/// Validates and executes the balance-mutating ledger operations. Every
/// mutation commits the balance change and its audit entry as one atomic
/// unit of work.
pub struct LedgerService {
    accounts: AccountStoreRef,
    entries: EntryStoreRef,
    cards: CardStoreRef,
    uow: UnitOfWorkRef,
}

impl LedgerService {
    pub fn new(
        accounts: AccountStoreRef,
        entries: EntryStoreRef,
        cards: CardStoreRef,
        uow: UnitOfWorkRef,
    ) -> Self {
        Self {
            accounts,
            entries,
            cards,
            uow,
        }
    }

    pub async fn open_account(&self, user_id: UserId, kind: AccountKind) -> Result<AccountSummary> {
        let account = Account::open(user_id, kind);
        self.accounts.insert(account.clone()).await?;
        tracing::info!(account = %account.id, user = %user_id, "account opened");
        Ok(AccountSummary::from(&account))
    }

    pub async fn get_account(&self, id: AccountId, user_id: UserId) -> Result<AccountSummary> {
        let account = self.owned_account(id, user_id).await?;
        Ok(AccountSummary::from(&account))
    }

    pub async fn list_accounts(&self, user_id: UserId) -> Result<Vec<AccountSummary>> {
        let accounts = self.accounts.list_by_owner(user_id).await?;
        Ok(accounts.iter().map(AccountSummary::from).collect())
    }

    pub async fn deposit(&self, account_id: AccountId, amount: Decimal, user_id: UserId) -> Result<()> {
        let amount = Amount::new(amount)?;
        let account = self.owned_account(account_id, user_id).await?;

        let mut tx = self.uow.begin().await?;
        tx.credit_balance(account.id, amount);
        tx.insert_entry(LedgerEntry::deposit(user_id, account.id, amount));
        tx.commit().await?;
        Ok(())
    }

    pub async fn withdraw(&self, account_id: AccountId, amount: Decimal, user_id: UserId) -> Result<()> {
        let amount = Amount::new(amount)?;
        let account = self.owned_account(account_id, user_id).await?;
        account.ensure_covers(amount)?;

        let mut tx = self.uow.begin().await?;
        tx.debit_balance(account.id, amount);
        tx.insert_entry(LedgerEntry::withdraw(user_id, account.id, amount));
        tx.commit().await?;
        Ok(())
    }

    /// Moves funds between two accounts. Ownership is enforced on the source
    /// only; the destination merely has to exist. Both legs and the single
    /// audit entry commit together.
    pub async fn transfer(
        &self,
        from_id: AccountId,
        to_id: AccountId,
        amount: Decimal,
        user_id: UserId,
    ) -> Result<()> {
        let amount = Amount::new(amount)?;
        if from_id == to_id {
            return Err(BankError::SameAccount);
        }

        let from = self.owned_account(from_id, user_id).await?;
        let to = self
            .accounts
            .get(to_id)
            .await?
            .ok_or(BankError::AccountNotFound)?;
        from.ensure_covers(amount)?;

        let mut tx = self.uow.begin().await?;
        tx.debit_balance(from.id, amount);
        tx.credit_balance(to.id, amount);
        tx.insert_entry(LedgerEntry::transfer(
            user_id,
            from.id,
            to.id,
            amount,
            &from.number,
            &to.number,
        ));
        tx.commit().await?;
        Ok(())
    }

    /// Issues a card linked to an account owned by the caller.
    pub async fn issue_card(&self, account_id: AccountId, user_id: UserId) -> Result<CardSummary> {
        let account = self.owned_account(account_id, user_id).await?;
        let card = Card::issue(account.id, user_id);
        self.cards.insert(card.clone()).await?;
        tracing::info!(card = %card.id, account = %account.id, "card issued");
        Ok(CardSummary::from(&card))
    }

    /// Debits the account linked to a card. The card must be active and owned
    /// by the caller.
    pub async fn pay_with_card(
        &self,
        card_id: CardId,
        amount: Decimal,
        user_id: UserId,
    ) -> Result<()> {
        let amount = Amount::new(amount)?;
        let card = self
            .cards
            .get(card_id)
            .await?
            .ok_or(BankError::CardNotFound)?;
        if !card.is_owned_by(user_id) {
            return Err(BankError::AccessDenied);
        }
        if !card.active {
            return Err(BankError::CardInactive);
        }

        let account = self
            .accounts
            .get(card.account_id)
            .await?
            .ok_or(BankError::AccountNotFound)?;
        account.ensure_covers(amount)?;

        let mut tx = self.uow.begin().await?;
        tx.debit_balance(account.id, amount);
        tx.insert_entry(LedgerEntry::card_payment(user_id, account.id, amount));
        tx.commit().await?;
        Ok(())
    }

    /// Linear balance forecast: the prior 30 days of deposit inflow and
    /// withdrawal/payment outflow are averaged into one daily net delta which
    /// is extrapolated for `days` daily points. Out-of-range horizons fall
    /// back to 30 days.
    pub async fn predict_balance(
        &self,
        account_id: AccountId,
        user_id: UserId,
        days: i64,
    ) -> Result<Vec<BalanceProjection>> {
        let days = if days <= 0 || days > 365 { 30 } else { days };
        let account = self.owned_account(account_id, user_id).await?;

        let now = Utc::now();
        let entries = self
            .entries
            .list_by_owner_between(user_id, now - Duration::days(FORECAST_LOOKBACK_DAYS), now)
            .await?;

        let mut income = Decimal::ZERO;
        let mut expense = Decimal::ZERO;
        for entry in &entries {
            match entry.kind {
                EntryKind::Deposit => income += entry.amount.value(),
                EntryKind::Withdraw | EntryKind::Payment => expense += entry.amount.value(),
                EntryKind::Transfer | EntryKind::CreditDisbursement => {}
            }
        }
        let daily_delta = (income - expense) / Decimal::from(FORECAST_LOOKBACK_DAYS);

        let mut balance = account.balance;
        let mut projections = Vec::with_capacity(days as usize);
        for day in 0..days {
            balance += Balance::new(daily_delta);
            projections.push(BalanceProjection {
                date: now + Duration::days(day + 1),
                balance,
            });
        }
        Ok(projections)
    }

    pub async fn get_entry(&self, id: EntryId, user_id: UserId) -> Result<EntrySummary> {
        let entry = self
            .entries
            .get(id)
            .await?
            .ok_or(BankError::EntryNotFound)?;
        if entry.user_id != user_id {
            return Err(BankError::AccessDenied);
        }
        Ok(EntrySummary::from(&entry))
    }

    pub async fn list_entries_by_user(
        &self,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<EntrySummary>> {
        let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };
        let entries = self.entries.list_by_owner(user_id, limit, offset).await?;
        Ok(entries.iter().map(EntrySummary::from).collect())
    }

    pub async fn list_entries_by_account(
        &self,
        account_id: AccountId,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<EntrySummary>> {
        self.owned_account(account_id, user_id).await?;
        let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };
        let entries = self.entries.list_by_account(account_id, limit, offset).await?;
        Ok(entries.iter().map(EntrySummary::from).collect())
    }

    async fn owned_account(&self, id: AccountId, user_id: UserId) -> Result<Account> {
        let account = self
            .accounts
            .get(id)
            .await?
            .ok_or(BankError::AccountNotFound)?;
        if !account.is_owned_by(user_id) {
            return Err(BankError::AccessDenied);
        }
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::MemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn service() -> (LedgerService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = LedgerService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );
        (service, store)
    }

    #[tokio::test]
    async fn deposit_rejects_non_positive_amounts() {
        let (service, _) = service();
        let user = UserId::new();
        let account = service
            .open_account(user, AccountKind::Debit)
            .await
            .unwrap();

        let err = service.deposit(account.id, dec!(0), user).await.unwrap_err();
        assert!(matches!(err, BankError::InvalidAmount));
        let err = service.deposit(account.id, dec!(-5), user).await.unwrap_err();
        assert!(matches!(err, BankError::InvalidAmount));
    }

    #[tokio::test]
    async fn deposit_requires_ownership() {
        let (service, _) = service();
        let owner = UserId::new();
        let stranger = UserId::new();
        let account = service
            .open_account(owner, AccountKind::Debit)
            .await
            .unwrap();

        let err = service
            .deposit(account.id, dec!(10), stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::AccessDenied));
    }

    #[tokio::test]
    async fn transfer_to_same_account_is_rejected() {
        let (service, _) = service();
        let user = UserId::new();
        let account = service
            .open_account(user, AccountKind::Debit)
            .await
            .unwrap();

        let err = service
            .transfer(account.id, account.id, dec!(10), user)
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::SameAccount));
    }
}
