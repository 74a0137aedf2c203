mod common;

use bankd::domain::account::{AccountId, AccountKind, Balance, UserId};
use bankd::domain::card::Card;
use bankd::domain::entry::EntryKind;
use bankd::domain::ports::{AccountStore, CardStore, UnitOfWork};
use bankd::error::{BankError, TxError};
use common::{seeded_account, test_bank};
use rust_decimal_macros::dec;

#[tokio::test]
async fn deposit_then_withdraw_round_trips_the_balance() {
    let bank = test_bank();
    let user = UserId::new();
    let account = bank.ledger.open_account(user, AccountKind::Debit).await.unwrap();

    bank.ledger.deposit(account.id, dec!(150), user).await.unwrap();
    bank.ledger.withdraw(account.id, dec!(150), user).await.unwrap();

    let stored = AccountStore::get(&*bank.store, account.id).await.unwrap().unwrap();
    assert_eq!(stored.balance, Balance::ZERO);

    let entries = bank.ledger.list_entries_by_user(user, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, EntryKind::Withdraw);
    assert_eq!(entries[1].kind, EntryKind::Deposit);
}

#[tokio::test]
async fn failed_withdrawal_writes_no_entry_and_keeps_the_balance() {
    let bank = test_bank();
    let user = UserId::new();
    let account = seeded_account(&bank, user, dec!(50)).await;

    let err = bank.ledger.withdraw(account.id, dec!(100), user).await.unwrap_err();
    assert!(matches!(err, BankError::InsufficientFunds));

    let stored = AccountStore::get(&*bank.store, account.id).await.unwrap().unwrap();
    assert_eq!(stored.balance, Balance::new(dec!(50)));
    let entries = bank.ledger.list_entries_by_user(user, 10, 0).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn transfer_moves_funds_with_a_single_audit_entry() {
    let bank = test_bank();
    let sender = UserId::new();
    let receiver = UserId::new();
    let from = seeded_account(&bank, sender, dec!(100)).await;
    let to = seeded_account(&bank, receiver, dec!(0)).await;

    bank.ledger.transfer(from.id, to.id, dec!(40), sender).await.unwrap();

    let from_after = AccountStore::get(&*bank.store, from.id).await.unwrap().unwrap();
    let to_after = AccountStore::get(&*bank.store, to.id).await.unwrap().unwrap();
    assert_eq!(from_after.balance, Balance::new(dec!(60)));
    assert_eq!(to_after.balance, Balance::new(dec!(40)));

    let entries = bank.ledger.list_entries_by_user(sender, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::Transfer);
    assert!(entries[0].description.contains(&from.number));
    assert!(entries[0].description.contains(&to.number));
}

#[tokio::test]
async fn commit_against_a_missing_destination_applies_nothing() {
    let bank = test_bank();
    let user = UserId::new();
    let source = seeded_account(&bank, user, dec!(100)).await;
    let amount = dec!(30).try_into().unwrap();

    let mut tx = bank.store.begin().await.unwrap();
    tx.debit_balance(source.id, amount);
    tx.credit_balance(AccountId::new(), amount);
    let err = tx.commit().await.unwrap_err();
    assert!(matches!(err, TxError::AccountMissing(_)));

    let stored = AccountStore::get(&*bank.store, source.id).await.unwrap().unwrap();
    assert_eq!(stored.balance, Balance::new(dec!(100)));
}

#[tokio::test]
async fn issued_card_is_linked_and_masked() {
    let bank = test_bank();
    let user = UserId::new();
    let stranger = UserId::new();
    let account = seeded_account(&bank, user, dec!(0)).await;

    let card = bank.ledger.issue_card(account.id, user).await.unwrap();
    assert_eq!(card.account_id, account.id);
    assert!(card.active);
    assert!(card.masked_number.starts_with("**** **** **** "));

    let err = bank.ledger.issue_card(account.id, stranger).await.unwrap_err();
    assert!(matches!(err, BankError::AccessDenied));
}

#[tokio::test]
async fn card_payment_debits_the_linked_account() {
    let bank = test_bank();
    let user = UserId::new();
    let account = seeded_account(&bank, user, dec!(200)).await;
    let card = bank.ledger.issue_card(account.id, user).await.unwrap();

    bank.ledger.pay_with_card(card.id, dec!(75.50), user).await.unwrap();

    let stored = AccountStore::get(&*bank.store, account.id).await.unwrap().unwrap();
    assert_eq!(stored.balance, Balance::new(dec!(124.50)));
    let entries = bank.ledger.list_entries_by_user(user, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::Payment);
}

#[tokio::test]
async fn inactive_card_cannot_pay() {
    let bank = test_bank();
    let user = UserId::new();
    let account = seeded_account(&bank, user, dec!(200)).await;
    let mut card = Card::issue(account.id, user);
    card.active = false;
    CardStore::insert(&*bank.store, card.clone()).await.unwrap();

    let err = bank.ledger.pay_with_card(card.id, dec!(10), user).await.unwrap_err();
    assert!(matches!(err, BankError::CardInactive));

    let stored = AccountStore::get(&*bank.store, account.id).await.unwrap().unwrap();
    assert_eq!(stored.balance, Balance::new(dec!(200)));
}

#[tokio::test]
async fn card_of_another_user_is_rejected() {
    let bank = test_bank();
    let owner = UserId::new();
    let stranger = UserId::new();
    let account = seeded_account(&bank, owner, dec!(200)).await;
    let card = bank.ledger.issue_card(account.id, owner).await.unwrap();

    let err = bank.ledger.pay_with_card(card.id, dec!(10), stranger).await.unwrap_err();
    assert!(matches!(err, BankError::AccessDenied));
}

#[tokio::test]
async fn over_balance_transfer_fails_and_moves_nothing() {
    let bank = test_bank();
    let sender = UserId::new();
    let receiver = UserId::new();
    let from = seeded_account(&bank, sender, dec!(50)).await;
    let to = seeded_account(&bank, receiver, dec!(20)).await;

    let err = bank.ledger.transfer(from.id, to.id, dec!(100), sender).await.unwrap_err();
    assert!(matches!(err, BankError::InsufficientFunds));

    let from_after = AccountStore::get(&*bank.store, from.id).await.unwrap().unwrap();
    let to_after = AccountStore::get(&*bank.store, to.id).await.unwrap().unwrap();
    assert_eq!(from_after.balance, Balance::new(dec!(50)));
    assert_eq!(to_after.balance, Balance::new(dec!(20)));
    let entries = bank.ledger.list_entries_by_user(sender, 10, 0).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn over_balance_card_payment_fails_and_debits_nothing() {
    let bank = test_bank();
    let user = UserId::new();
    let account = seeded_account(&bank, user, dec!(50)).await;
    let card = bank.ledger.issue_card(account.id, user).await.unwrap();

    let err = bank.ledger.pay_with_card(card.id, dec!(100), user).await.unwrap_err();
    assert!(matches!(err, BankError::InsufficientFunds));

    let stored = AccountStore::get(&*bank.store, account.id).await.unwrap().unwrap();
    assert_eq!(stored.balance, Balance::new(dec!(50)));
    let entries = bank.ledger.list_entries_by_user(user, 10, 0).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn forecast_without_activity_is_flat() {
    let bank = test_bank();
    let user = UserId::new();
    let account = seeded_account(&bank, user, dec!(500)).await;

    let projections = bank.ledger.predict_balance(account.id, user, 10).await.unwrap();

    assert_eq!(projections.len(), 10);
    for point in &projections {
        assert_eq!(point.balance, Balance::new(dec!(500)));
    }
}

#[tokio::test]
async fn forecast_clamps_out_of_range_horizons() {
    let bank = test_bank();
    let user = UserId::new();
    let account = seeded_account(&bank, user, dec!(500)).await;

    for days in [0, -3, 366] {
        let projections = bank.ledger.predict_balance(account.id, user, days).await.unwrap();
        assert_eq!(projections.len(), 30);
    }
}

#[tokio::test]
async fn forecast_extrapolates_the_net_daily_delta() {
    let bank = test_bank();
    let user = UserId::new();
    let account = seeded_account(&bank, user, dec!(0)).await;

    // 300 in, 150 out over the 30-day window: net +5 per day.
    bank.ledger.deposit(account.id, dec!(300), user).await.unwrap();
    bank.ledger.withdraw(account.id, dec!(150), user).await.unwrap();

    let projections = bank.ledger.predict_balance(account.id, user, 3).await.unwrap();
    assert_eq!(projections.len(), 3);
    assert_eq!(projections[0].balance, Balance::new(dec!(155)));
    assert_eq!(projections[1].balance, Balance::new(dec!(160)));
    assert_eq!(projections[2].balance, Balance::new(dec!(165)));
}

#[tokio::test]
async fn entry_listing_paginates_newest_first() {
    let bank = test_bank();
    let user = UserId::new();
    let account = seeded_account(&bank, user, dec!(0)).await;

    for amount in [dec!(1), dec!(2), dec!(3)] {
        bank.ledger.deposit(account.id, amount, user).await.unwrap();
    }

    let page = bank.ledger.list_entries_by_user(user, 2, 0).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].amount.value(), dec!(3));
    assert_eq!(page[1].amount.value(), dec!(2));

    let rest = bank.ledger.list_entries_by_user(user, 2, 2).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].amount.value(), dec!(1));

    // A zero limit falls back to the default page size.
    let all = bank.ledger.list_entries_by_user(user, 0, 0).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn entries_are_not_readable_across_users() {
    let bank = test_bank();
    let owner = UserId::new();
    let stranger = UserId::new();
    let account = seeded_account(&bank, owner, dec!(0)).await;

    bank.ledger.deposit(account.id, dec!(10), owner).await.unwrap();
    let entry = &bank.ledger.list_entries_by_user(owner, 1, 0).await.unwrap()[0];

    let err = bank.ledger.get_entry(entry.id, stranger).await.unwrap_err();
    assert!(matches!(err, BankError::AccessDenied));
    let err = bank
        .ledger
        .list_entries_by_account(account.id, stranger, 10, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, BankError::AccessDenied));
}
