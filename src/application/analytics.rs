use crate::domain::account::UserId;
use crate::domain::analytics::{
    DailyFlow, DebtReport, ReportPeriod, SpendingCategory, SpendingReport,
    ESTIMATED_MONTHLY_INCOME,
};
use crate::domain::credit::{CreditStatus, InstallmentStatus};
use crate::domain::entry::EntryKind;
use crate::domain::ports::{CreditStoreRef, EntryStoreRef, PaymentStoreRef};
use crate::error::Result;
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Read-only reporting over the ledger and the credit book. Aggregates are
/// computed on demand from committed state; nothing here mutates.
pub struct AnalyticsService {
    entries: EntryStoreRef,
    credits: CreditStoreRef,
    payments: PaymentStoreRef,
}

impl AnalyticsService {
    pub fn new(entries: EntryStoreRef, credits: CreditStoreRef, payments: PaymentStoreRef) -> Self {
        Self {
            entries,
            credits,
            payments,
        }
    }

    /// Income/expense totals, category breakdown and per-day flows for the
    /// caller's entries within the period.
    pub async fn spending_report(
        &self,
        user_id: UserId,
        period: ReportPeriod,
    ) -> Result<SpendingReport> {
        let now = Utc::now();
        let entries = self
            .entries
            .list_by_owner_between(user_id, period.start(now), now)
            .await?;

        let mut total_income = Decimal::ZERO;
        let mut total_expense = Decimal::ZERO;
        let mut by_category: BTreeMap<SpendingCategory, Decimal> = BTreeMap::new();
        let mut days: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();

        for entry in &entries {
            let amount = entry.amount.value();
            let (category, inflow) = match entry.kind {
                EntryKind::Deposit | EntryKind::CreditDisbursement => {
                    (SpendingCategory::Income, true)
                }
                EntryKind::Withdraw => (SpendingCategory::Cash, false),
                EntryKind::Payment => (SpendingCategory::Shopping, false),
                // Ownership is enforced on the source account, so a transfer
                // is outflow from the acting user's perspective.
                EntryKind::Transfer => (SpendingCategory::Transfers, false),
            };

            let day = days.entry(entry.occurred_at.date_naive()).or_default();
            if inflow {
                total_income += amount;
                day.0 += amount;
            } else {
                total_expense += amount;
                day.1 += amount;
            }
            *by_category.entry(category).or_default() += amount;
        }

        let daily = days
            .into_iter()
            .map(|(date, (income, expense))| DailyFlow {
                date,
                income,
                expense,
            })
            .collect();

        Ok(SpendingReport {
            total_income,
            total_expense,
            by_category,
            daily,
        })
    }

    /// Debt load across the caller's open credits: every credit that is not
    /// pending, rejected or closed counts, with its pending installments.
    pub async fn debt_report(&self, user_id: UserId) -> Result<DebtReport> {
        let credits = self.credits.list_by_owner(user_id).await?;
        let now = Utc::now();

        let mut outstanding_debt = Decimal::ZERO;
        let mut due_this_month = Decimal::ZERO;
        let mut open_credits = 0;

        for credit in &credits {
            if matches!(
                credit.status,
                CreditStatus::Pending | CreditStatus::Rejected | CreditStatus::Closed
            ) {
                continue;
            }
            open_credits += 1;

            let installments = self.payments.list_by_credit(credit.id).await?;
            for installment in installments
                .iter()
                .filter(|i| i.status == InstallmentStatus::Pending)
            {
                outstanding_debt += installment.amount;
                if installment.due_date.year() == now.year()
                    && installment.due_date.month() == now.month()
                {
                    due_this_month += installment.amount;
                }
            }
        }

        let debt_to_income = if due_this_month > Decimal::ZERO {
            (due_this_month / ESTIMATED_MONTHLY_INCOME).round_dp(4)
        } else {
            Decimal::ZERO
        };

        Ok(DebtReport {
            outstanding_debt,
            due_this_month,
            debt_to_income,
            open_credits,
        })
    }
}
