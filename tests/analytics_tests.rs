mod common;

use bankd::domain::account::UserId;
use bankd::domain::analytics::{ReportPeriod, SpendingCategory, ESTIMATED_MONTHLY_INCOME};
use bankd::domain::credit::CreditApplication;
use common::{seeded_account, test_bank};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn spending_report_splits_flows_by_category() {
    let bank = test_bank();
    let user = UserId::new();
    let receiver = UserId::new();
    let account = seeded_account(&bank, user, dec!(0)).await;
    let other = seeded_account(&bank, receiver, dec!(0)).await;
    let card = bank.ledger.issue_card(account.id, user).await.unwrap();

    bank.ledger.deposit(account.id, dec!(300), user).await.unwrap();
    bank.ledger.withdraw(account.id, dec!(100), user).await.unwrap();
    bank.ledger.pay_with_card(card.id, dec!(50), user).await.unwrap();
    bank.ledger.transfer(account.id, other.id, dec!(25), user).await.unwrap();

    let report = bank
        .analytics
        .spending_report(user, ReportPeriod::Month)
        .await
        .unwrap();

    assert_eq!(report.total_income, dec!(300));
    assert_eq!(report.total_expense, dec!(175));
    assert_eq!(report.by_category[&SpendingCategory::Income], dec!(300));
    assert_eq!(report.by_category[&SpendingCategory::Cash], dec!(100));
    assert_eq!(report.by_category[&SpendingCategory::Shopping], dec!(50));
    assert_eq!(report.by_category[&SpendingCategory::Transfers], dec!(25));

    // Daily buckets partition the totals, ordered by date.
    let daily_income: Decimal = report.daily.iter().map(|d| d.income).sum();
    let daily_expense: Decimal = report.daily.iter().map(|d| d.expense).sum();
    assert_eq!(daily_income, dec!(300));
    assert_eq!(daily_expense, dec!(175));
    for pair in report.daily.windows(2) {
        assert!(pair[0].date < pair[1].date);
    }
}

#[tokio::test]
async fn spending_report_counts_disbursements_as_income() {
    let bank = test_bank();
    let user = UserId::new();
    let account = seeded_account(&bank, user, dec!(0)).await;

    bank.credits
        .apply(
            user,
            CreditApplication {
                account_id: account.id,
                amount: dec!(10000),
                term_months: 12,
            },
        )
        .await
        .unwrap();

    let report = bank
        .analytics
        .spending_report(user, ReportPeriod::Week)
        .await
        .unwrap();
    assert_eq!(report.total_income, dec!(10000));
    assert_eq!(report.total_expense, Decimal::ZERO);
    assert_eq!(report.by_category[&SpendingCategory::Income], dec!(10000));
}

#[tokio::test]
async fn spending_report_ignores_other_users() {
    let bank = test_bank();
    let user = UserId::new();
    let neighbor = UserId::new();
    let account = seeded_account(&bank, user, dec!(0)).await;
    let neighbor_account = seeded_account(&bank, neighbor, dec!(0)).await;

    bank.ledger.deposit(account.id, dec!(300), user).await.unwrap();
    bank.ledger
        .deposit(neighbor_account.id, dec!(999), neighbor)
        .await
        .unwrap();

    let report = bank
        .analytics
        .spending_report(user, ReportPeriod::Month)
        .await
        .unwrap();
    assert_eq!(report.total_income, dec!(300));
}

#[tokio::test]
async fn debt_report_reflects_a_freshly_originated_credit() {
    let bank = test_bank();
    let user = UserId::new();
    let account = seeded_account(&bank, user, dec!(0)).await;

    let summary = bank
        .credits
        .apply(
            user,
            CreditApplication {
                account_id: account.id,
                amount: dec!(10000),
                term_months: 12,
            },
        )
        .await
        .unwrap();

    let report = bank.analytics.debt_report(user).await.unwrap();
    assert_eq!(report.open_credits, 1);
    // All twelve installments are still pending; none is due yet, so the
    // current month carries nothing.
    let schedule = bank.credits.schedule(summary.id, user).await.unwrap();
    let total: Decimal = schedule.iter().map(|i| i.amount).sum();
    assert_eq!(report.outstanding_debt, total);
    assert_eq!(report.due_this_month, Decimal::ZERO);
    assert_eq!(report.debt_to_income, Decimal::ZERO);

    // Sanity: the ratio denominator is the fixed income figure.
    assert!(ESTIMATED_MONTHLY_INCOME > Decimal::ZERO);
}
