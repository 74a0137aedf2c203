use crate::domain::account::{Amount, UserId};
use crate::domain::credit::{
    build_schedule, Credit, CreditApplication, CreditId, CreditStatus, CreditSummary,
    Installment, InstallmentStatus, InstallmentSummary, DEFAULT_KEY_RATE, MAX_TERM_MONTHS,
    MIN_TERM_MONTHS, RATE_MARGIN,
};
use crate::domain::entry::LedgerEntry;
use crate::domain::ports::{
    AccountStoreRef, CreditStoreRef, NotifierRef, PaymentStoreRef, RateProviderRef, UnitOfWorkRef,
};
use crate::error::{BankError, Result, TxError};
use chrono::Utc;
use rust_decimal::Decimal;

/// Originates consumer credit and settles its repayment schedule.
///
/// Origination is one atomic unit of work: the credit record, the full
/// installment schedule, the disbursed balance and the disbursement entry
/// commit together or not at all.
pub struct CreditService {
    credits: CreditStoreRef,
    payments: PaymentStoreRef,
    accounts: AccountStoreRef,
    uow: UnitOfWorkRef,
    rates: RateProviderRef,
    notifier: NotifierRef,
}

impl CreditService {
    pub fn new(
        credits: CreditStoreRef,
        payments: PaymentStoreRef,
        accounts: AccountStoreRef,
        uow: UnitOfWorkRef,
        rates: RateProviderRef,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            credits,
            payments,
            accounts,
            uow,
            rates,
            notifier,
        }
    }

    pub async fn apply(
        &self,
        user_id: UserId,
        application: CreditApplication,
    ) -> Result<CreditSummary> {
        if application.amount <= Decimal::ZERO {
            return Err(BankError::InvalidCreditAmount);
        }
        if application.term_months < MIN_TERM_MONTHS || application.term_months > MAX_TERM_MONTHS {
            return Err(BankError::InvalidCreditTerm);
        }
        let amount = Amount::new(application.amount).map_err(|_| BankError::InvalidCreditAmount)?;

        let account = self
            .accounts
            .get(application.account_id)
            .await?
            .ok_or(BankError::AccountNotFound)?;
        if !account.is_owned_by(user_id) {
            return Err(BankError::AccessDenied);
        }

        // Origination never blocks on the rate provider being unreachable.
        let key_rate = match self.rates.current_rate().await {
            Ok(rate) => rate,
            Err(err) => {
                tracing::warn!(%err, fallback = %DEFAULT_KEY_RATE, "rate provider unavailable");
                DEFAULT_KEY_RATE
            }
        };
        let annual_rate = key_rate + RATE_MARGIN;

        let credit = Credit::originate(
            user_id,
            account.id,
            amount,
            application.term_months,
            annual_rate,
        );
        let schedule = build_schedule(&credit);

        let mut tx = self.uow.begin().await?;
        tx.insert_credit(credit.clone());
        tx.insert_installments(schedule);
        tx.credit_balance(account.id, amount);
        tx.insert_entry(LedgerEntry::credit_disbursement(user_id, account.id, amount));
        tx.commit().await?;

        tracing::info!(credit = %credit.id, account = %account.id, %amount, "credit approved");
        self.notify_approved(credit.clone());

        Ok(CreditSummary::from(&credit))
    }

    pub async fn get(&self, id: CreditId, user_id: UserId) -> Result<CreditSummary> {
        let credit = self.owned_credit(id, user_id).await?;
        Ok(CreditSummary::from(&credit))
    }

    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<CreditSummary>> {
        let credits = self.credits.list_by_owner(user_id).await?;
        Ok(credits.iter().map(CreditSummary::from).collect())
    }

    pub async fn schedule(
        &self,
        credit_id: CreditId,
        user_id: UserId,
    ) -> Result<Vec<InstallmentSummary>> {
        self.owned_credit(credit_id, user_id).await?;
        let installments = self.payments.list_by_credit(credit_id).await?;
        Ok(installments.iter().map(InstallmentSummary::from).collect())
    }

    /// One sweep: settle every pending installment that is due, isolating
    /// failures per installment so one bad record cannot stall the rest.
    pub async fn settle_due_installments(&self) -> Result<()> {
        let due = self.payments.list_due_pending(Utc::now()).await?;
        if due.is_empty() {
            return Ok(());
        }
        tracing::info!(count = due.len(), "settling due installments");

        for installment in due {
            if let Err(err) = self.settle_installment(&installment).await {
                tracing::warn!(
                    installment = %installment.id,
                    credit = %installment.credit_id,
                    %err,
                    "installment skipped for this sweep"
                );
            }
        }
        Ok(())
    }

    async fn settle_installment(&self, installment: &Installment) -> Result<()> {
        let credit = self
            .credits
            .get(installment.credit_id)
            .await?
            .ok_or(BankError::CreditNotFound)?;
        let account = self
            .accounts
            .get(credit.account_id)
            .await?
            .ok_or(BankError::AccountNotFound)?;
        let amount = Amount::new(installment.amount)?;

        if !account.balance.covers(amount) {
            return self.mark_overdue(&credit, installment).await;
        }

        let now = Utc::now();
        let mut tx = self.uow.begin().await?;
        tx.debit_balance(account.id, amount);
        tx.mark_installment_paid(installment.id, now);
        match tx.commit().await {
            Ok(()) => {
                tracing::info!(
                    installment = %installment.id,
                    credit = %credit.id,
                    amount = %installment.amount,
                    "installment settled"
                );
                self.notify_settled(credit.user_id, credit.id, installment.amount);
                Ok(())
            }
            // The balance moved under us between the read and the commit.
            Err(TxError::InsufficientBalance(_)) => self.mark_overdue(&credit, installment).await,
            // An overlapping sweep settled this installment first.
            Err(TxError::InstallmentNotPending(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn mark_overdue(&self, credit: &Credit, installment: &Installment) -> Result<()> {
        let transitioned = self
            .payments
            .update_status(installment.id, InstallmentStatus::Overdue, None)
            .await?;
        if !transitioned {
            return Ok(());
        }

        self.credits
            .update_status(credit.id, CreditStatus::Overdue)
            .await?;
        tracing::info!(
            installment = %installment.id,
            credit = %credit.id,
            "installment overdue, credit cascaded to overdue"
        );
        self.notify_overdue(credit.user_id, credit.id, installment.amount);
        Ok(())
    }

    fn notify_approved(&self, credit: Credit) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(err) = notifier.credit_approved(credit.user_id, &credit).await {
                tracing::warn!(credit = %credit.id, %err, "approval notification failed");
            }
        });
    }

    fn notify_settled(&self, user_id: UserId, credit_id: CreditId, amount: Decimal) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(err) = notifier.payment_settled(user_id, credit_id, amount).await {
                tracing::warn!(credit = %credit_id, %err, "settlement notification failed");
            }
        });
    }

    fn notify_overdue(&self, user_id: UserId, credit_id: CreditId, amount: Decimal) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(err) = notifier.payment_overdue(user_id, credit_id, amount).await {
                tracing::warn!(credit = %credit_id, %err, "overdue notification failed");
            }
        });
    }

    async fn owned_credit(&self, id: CreditId, user_id: UserId) -> Result<Credit> {
        let credit = self
            .credits
            .get(id)
            .await?
            .ok_or(BankError::CreditNotFound)?;
        if !credit.is_owned_by(user_id) {
            return Err(BankError::AccessDenied);
        }
        Ok(credit)
    }
}
