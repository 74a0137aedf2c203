use crate::domain::account::{AccountId, Amount, UserId};
use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Fallback annual reference rate (percent) used when the rate provider is
/// unreachable. Origination must not block on that collaborator.
pub const DEFAULT_KEY_RATE: Decimal = dec!(7.5);
/// Margin added on top of the reference rate, in percentage points.
pub const RATE_MARGIN: Decimal = dec!(5.0);

pub const MIN_TERM_MONTHS: u32 = 3;
pub const MAX_TERM_MONTHS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreditId(pub Uuid);

impl CreditId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CreditId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CreditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallmentId(pub Uuid);

impl InstallmentId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for InstallmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstallmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Lifecycle of a credit. `Pending` and `Rejected` are reserved for a manual
/// underwriting flow; no current code path produces them, every application
/// is approved on the spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditStatus {
    Pending,
    Approved,
    Rejected,
    Active,
    Overdue,
    Closed,
}

/// A consumer credit. Monthly and total payment are derived once at
/// origination from principal, rate and term, and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    pub id: CreditId,
    pub user_id: UserId,
    pub account_id: AccountId,
    pub amount: Amount,
    pub term_months: u32,
    pub annual_rate: Decimal,
    pub monthly_payment: Decimal,
    pub total_payment: Decimal,
    pub status: CreditStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credit {
    /// Prices and approves a loan: annuity payment from the annual rate, end
    /// date at `start + term` months.
    pub fn originate(
        user_id: UserId,
        account_id: AccountId,
        amount: Amount,
        term_months: u32,
        annual_rate: Decimal,
    ) -> Self {
        let now = Utc::now();
        let monthly_payment = monthly_payment(amount.value(), annual_rate, term_months);
        let total_payment = (monthly_payment * Decimal::from(term_months)).round_dp(2);
        Self {
            id: CreditId::new(),
            user_id,
            account_id,
            amount,
            term_months,
            annual_rate,
            monthly_payment,
            total_payment,
            status: CreditStatus::Approved,
            start_date: now,
            end_date: now + Months::new(term_months),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// Incoming loan application.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreditApplication {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub term_months: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditSummary {
    pub id: CreditId,
    pub amount: Amount,
    pub term_months: u32,
    pub annual_rate: Decimal,
    pub monthly_payment: Decimal,
    pub total_payment: Decimal,
    pub status: CreditStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl From<&Credit> for CreditSummary {
    fn from(credit: &Credit) -> Self {
        Self {
            id: credit.id,
            amount: credit.amount,
            term_months: credit.term_months,
            annual_rate: credit.annual_rate,
            monthly_payment: credit.monthly_payment,
            total_payment: credit.total_payment,
            status: credit.status,
            start_date: credit.start_date,
            end_date: credit.end_date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
    Canceled,
}

/// One scheduled repayment. The full set for a credit is created at
/// origination, one per month of the term, and each installment moves at
/// most once from `Pending` to a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub credit_id: CreditId,
    pub due_date: DateTime<Utc>,
    pub amount: Decimal,
    pub principal: Decimal,
    pub interest: Decimal,
    pub remaining_debt: Decimal,
    pub status: InstallmentStatus,
    pub paid_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallmentSummary {
    pub due_date: DateTime<Utc>,
    pub amount: Decimal,
    pub principal: Decimal,
    pub interest: Decimal,
    pub remaining_debt: Decimal,
    pub status: InstallmentStatus,
    pub paid_date: Option<DateTime<Utc>>,
}

impl From<&Installment> for InstallmentSummary {
    fn from(installment: &Installment) -> Self {
        Self {
            due_date: installment.due_date,
            amount: installment.amount,
            principal: installment.principal,
            interest: installment.interest,
            remaining_debt: installment.remaining_debt,
            status: installment.status,
            paid_date: installment.paid_date,
        }
    }
}

fn monthly_rate(annual_rate: Decimal) -> Decimal {
    annual_rate / dec!(100) / dec!(12)
}

/// (1 + rate)^term by repeated multiplication; term is at most 60.
fn compound(rate: Decimal, term: u32) -> Decimal {
    let base = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    for _ in 0..term {
        factor *= base;
    }
    factor
}

/// Fixed monthly payment of the standard annuity:
/// `P * r * (1+r)^n / ((1+r)^n - 1)`, quantized to cents.
///
/// A rate that nets to zero or below (the configured key rate can be
/// negative) degenerates to straight-line repayment of the principal.
pub fn monthly_payment(principal: Decimal, annual_rate: Decimal, term_months: u32) -> Decimal {
    let rate = monthly_rate(annual_rate);
    if rate <= Decimal::ZERO {
        return (principal / Decimal::from(term_months)).round_dp(2);
    }
    let growth = compound(rate, term_months);
    (principal * rate * growth / (growth - Decimal::ONE)).round_dp(2)
}

/// Full amortization schedule for a priced credit.
///
/// Each installment's interest is charged on the debt outstanding before it;
/// the principal component is whatever remains of the fixed payment. The
/// final installment absorbs the rounding residue so the remaining debt ends
/// at exactly zero and the principal components sum to the original amount.
pub fn build_schedule(credit: &Credit) -> Vec<Installment> {
    let rate = monthly_rate(credit.annual_rate).max(Decimal::ZERO);
    let mut remaining = credit.amount.value();
    let now = Utc::now();
    let mut schedule = Vec::with_capacity(credit.term_months as usize);

    for month in 1..=credit.term_months {
        let interest = (remaining * rate).round_dp(2);
        let mut principal = credit.monthly_payment - interest;
        remaining -= principal;

        if month == credit.term_months {
            principal += remaining;
            remaining = Decimal::ZERO;
        }

        schedule.push(Installment {
            id: InstallmentId::new(),
            credit_id: credit.id,
            due_date: credit.start_date + Months::new(month),
            amount: credit.monthly_payment,
            principal,
            interest,
            remaining_debt: remaining,
            status: InstallmentStatus::Pending,
            paid_date: None,
            created_at: now,
            updated_at: now,
        });
    }

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn credit_for(principal: Decimal, term: u32, annual_rate: Decimal) -> Credit {
        Credit::originate(
            UserId::new(),
            AccountId::new(),
            principal.try_into().unwrap(),
            term,
            annual_rate,
        )
    }

    #[test]
    fn monthly_payment_matches_closed_form() {
        // Independent f64 rendition of the annuity formula.
        let rate: f64 = 12.5 / 100.0 / 12.0;
        let growth = (1.0 + rate).powi(12);
        let expected = 100_000.0 * rate * growth / (growth - 1.0);

        let payment = monthly_payment(dec!(100000), dec!(12.5), 12);
        let diff = (payment - Decimal::try_from(expected).unwrap()).abs();
        assert!(diff < dec!(0.01), "payment {payment} vs closed form {expected}");
    }

    #[test]
    fn non_positive_rate_prices_as_straight_line_repayment() {
        assert_eq!(monthly_payment(dec!(1200), dec!(0), 12), dec!(100));
        assert_eq!(monthly_payment(dec!(1200), dec!(-5.0), 12), dec!(100));

        let credit = credit_for(dec!(1200), 12, dec!(0));
        let schedule = build_schedule(&credit);
        assert!(schedule.iter().all(|i| i.interest == Decimal::ZERO));
        let principal_sum: Decimal = schedule.iter().map(|i| i.principal).sum();
        assert_eq!(principal_sum, dec!(1200));
        assert_eq!(schedule.last().unwrap().remaining_debt, Decimal::ZERO);
    }

    #[test]
    fn total_payment_is_monthly_times_term() {
        let credit = credit_for(dec!(100000), 12, dec!(12.5));
        assert_eq!(
            credit.total_payment,
            (credit.monthly_payment * dec!(12)).round_dp(2)
        );
    }

    #[test]
    fn origination_sets_approved_status_and_term_window() {
        let credit = credit_for(dec!(50000), 24, dec!(12.5));
        assert_eq!(credit.status, CreditStatus::Approved);
        assert_eq!(credit.end_date, credit.start_date + Months::new(24));
    }

    #[test]
    fn schedule_fully_amortizes_the_principal() {
        let credit = credit_for(dec!(100000), 12, dec!(12.5));
        let schedule = build_schedule(&credit);

        assert_eq!(schedule.len(), 12);
        let principal_sum: Decimal = schedule.iter().map(|i| i.principal).sum();
        assert_eq!(principal_sum, dec!(100000));
        assert_eq!(schedule.last().unwrap().remaining_debt, Decimal::ZERO);
    }

    #[test]
    fn schedule_due_dates_are_monthly_from_start() {
        let credit = credit_for(dec!(30000), 6, dec!(10.0));
        let schedule = build_schedule(&credit);

        for (i, installment) in schedule.iter().enumerate() {
            assert_eq!(
                installment.due_date,
                credit.start_date + Months::new(i as u32 + 1)
            );
            assert_eq!(installment.status, InstallmentStatus::Pending);
            assert_eq!(installment.amount, credit.monthly_payment);
        }
    }

    #[test]
    fn interest_declines_as_debt_amortizes() {
        let credit = credit_for(dec!(100000), 12, dec!(12.5));
        let schedule = build_schedule(&credit);

        for pair in schedule.windows(2) {
            assert!(pair[1].interest <= pair[0].interest);
            assert!(pair[1].remaining_debt <= pair[0].remaining_debt);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: for any priced loan, the principal components sum back
        /// to the exact principal and the debt ends at exactly zero.
        #[test]
        fn schedule_amortization_invariant(
            cents in 10_000i64..1_000_000_000i64,
            term in MIN_TERM_MONTHS..=MAX_TERM_MONTHS,
            rate_tenths in 10u32..400u32,
        ) {
            let principal = Decimal::new(cents, 2);
            let annual_rate = Decimal::new(rate_tenths as i64, 1);
            let credit = credit_for(principal, term, annual_rate);
            let schedule = build_schedule(&credit);

            prop_assert_eq!(schedule.len(), term as usize);
            let principal_sum: Decimal = schedule.iter().map(|i| i.principal).sum();
            prop_assert_eq!(principal_sum, principal);
            prop_assert_eq!(schedule.last().unwrap().remaining_debt, Decimal::ZERO);
        }
    }
}
