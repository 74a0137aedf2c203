use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Income figure the debt-to-income ratio is computed against. The model has
/// no income declaration, so a fixed figure stands in for it.
pub const ESTIMATED_MONTHLY_INCOME: Decimal = dec!(100000);

/// Reporting window for ledger analytics, anchored at the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Week,
    #[default]
    Month,
    Year,
}

impl ReportPeriod {
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Week => now - Duration::days(7),
            Self::Month => now - Months::new(1),
            Self::Year => now - Months::new(12),
        }
    }
}

/// Spending category an entry is attributed to. A closed set keyed off the
/// entry kind, not the free-form description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpendingCategory {
    Income,
    Cash,
    Shopping,
    Transfers,
}

/// Income/expense totals for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyFlow {
    pub date: NaiveDate,
    pub income: Decimal,
    pub expense: Decimal,
}

/// Aggregated view of a user's ledger activity over a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingReport {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub by_category: BTreeMap<SpendingCategory, Decimal>,
    pub daily: Vec<DailyFlow>,
}

/// Debt-load figures across a user's open credits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtReport {
    /// Sum of all pending installment amounts.
    pub outstanding_debt: Decimal,
    /// Pending installment amounts due in the current calendar month.
    pub due_this_month: Decimal,
    pub debt_to_income: Decimal,
    pub open_credits: usize,
}
