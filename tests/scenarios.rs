//! Whole-session walkthroughs through the public API.

use std::sync::Arc;

use atm_sim::controller::Rules;
use atm_sim::store::{BalanceStore, MemoryStore};
use atm_sim::{Action, Amount, AtmState, Controller, Dispatch, Key, MenuChoice};

fn atm(balance: i64) -> (Controller, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_balance(Amount::from_rupees(balance)));
    (Controller::new(store.clone(), Rules::default()), store)
}

async fn keys(atm: &mut Controller, digits: &str) {
    for b in digits.bytes() {
        atm.press(Key::Digit(b - b'0')).await;
    }
}

async fn to_menu(atm: &mut Controller) {
    atm.press(Key::Insert).await;
    keys(atm, "1234").await;
    atm.press(Key::Enter).await;
}

#[tokio::test]
async fn correct_pin_opens_menu() {
    let (mut atm, _) = atm(5000);

    assert_eq!(
        atm.press(Key::Insert).await,
        Dispatch::Transition {
            from: AtmState::Idle,
            to: AtmState::PinEntry
        }
    );
    keys(&mut atm, "1234").await;
    atm.press(Key::Enter).await;

    assert_eq!(atm.state(), AtmState::Menu);
    assert_eq!(atm.pin_attempts(), 0);
    assert!(atm.session().pin().is_empty());
}

#[tokio::test]
async fn three_wrong_pins_lock_until_eject() {
    let (mut atm, _) = atm(5000);
    atm.press(Key::Insert).await;

    for attempt in 1..=3 {
        keys(&mut atm, "0000").await;
        atm.press(Key::Enter).await;
        assert_eq!(atm.pin_attempts(), if attempt < 3 { attempt } else { 0 });
    }
    assert_eq!(atm.state(), AtmState::Locked);

    // the keypad is dead while locked
    assert_eq!(atm.press(Key::Digit(1)).await, Dispatch::Ignored);
    assert_eq!(atm.press(Key::Enter).await, Dispatch::Ignored);

    atm.press(Key::Eject).await;
    assert_eq!(atm.state(), AtmState::Idle);
    assert_eq!(atm.pin_attempts(), 0);
}

#[tokio::test]
async fn withdrawal_debits_store() {
    let (mut atm, store) = atm(5000);
    to_menu(&mut atm).await;

    atm.dispatch(Action::Select(MenuChoice::Withdraw)).await;
    keys(&mut atm, "300").await;
    atm.press(Key::Enter).await;

    assert_eq!(atm.state(), AtmState::Complete);
    assert_eq!(atm.balance(), Amount::from_rupees(4700));
    assert_eq!(
        store.read_balance().await.unwrap(),
        Amount::from_rupees(4700)
    );
}

#[tokio::test]
async fn odd_withdrawal_stays_for_retry() {
    let (mut atm, store) = atm(5000);
    to_menu(&mut atm).await;

    atm.press(Key::Digit(1)).await;
    keys(&mut atm, "150").await;
    atm.press(Key::Enter).await;

    assert_eq!(atm.state(), AtmState::Withdraw);
    assert_eq!(atm.session().amount(), "150");
    assert_eq!(
        atm.screen(),
        "Invalid amount. Must be a multiple of ₹100.00. Try again or CANCEL."
    );
    assert_eq!(store.record().balance, Amount::from_rupees(5000));
}

#[tokio::test]
async fn deposit_over_cap_stays_for_retry() {
    let (mut atm, store) = atm(5000);
    to_menu(&mut atm).await;

    atm.press(Key::Digit(2)).await;
    keys(&mut atm, "60000").await;
    atm.press(Key::Enter).await;

    assert_eq!(atm.state(), AtmState::Deposit);
    assert_eq!(
        atm.screen(),
        "Maximum deposit limit is ₹50,000.00 per transaction. Try again or CANCEL."
    );
    assert_eq!(store.record().balance, Amount::from_rupees(5000));

    atm.press(Key::Clear).await;
    keys(&mut atm, "50000").await;
    atm.press(Key::Enter).await;
    assert_eq!(atm.state(), AtmState::Complete);
    assert_eq!(store.record().balance, Amount::from_rupees(55_000));
}

#[tokio::test]
async fn overdraft_returns_to_menu() {
    let (mut atm, store) = atm(5000);
    to_menu(&mut atm).await;

    atm.press(Key::Digit(1)).await;
    keys(&mut atm, "5100").await;
    atm.press(Key::Enter).await;

    assert_eq!(atm.state(), AtmState::Menu);
    assert_eq!(atm.screen(), "Insufficient funds. Returning to Menu.");
    assert_eq!(store.record().balance, Amount::from_rupees(5000));
}

#[tokio::test]
async fn pushed_balance_is_used_for_next_withdrawal() {
    let (mut atm, store) = atm(5000);
    to_menu(&mut atm).await;

    store.push_external(Amount::from_rupees(200));
    atm.press(Key::Digit(1)).await;
    keys(&mut atm, "300").await;
    atm.press(Key::Enter).await;

    assert_eq!(atm.state(), AtmState::Menu);
    assert_eq!(store.record().balance, Amount::from_rupees(200));
}

#[tokio::test]
async fn every_transition_is_logged_in_order() {
    let (mut atm, _) = atm(5000);
    to_menu(&mut atm).await;
    atm.press(Key::Digit(3)).await;
    atm.press(Key::Cancel).await;

    let path: Vec<_> = atm.log().iter().map(|r| (r.from, r.to)).collect();
    assert_eq!(
        path,
        vec![
            (AtmState::Idle, AtmState::PinEntry),
            (AtmState::PinEntry, AtmState::Menu),
            (AtmState::Menu, AtmState::BalanceCheck),
            (AtmState::BalanceCheck, AtmState::Idle),
        ]
    );
}
