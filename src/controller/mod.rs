//! Session controller.
//!
//! Drives the ATM automaton: takes keystrokes and button actions, keeps the
//! input buffers and PIN attempts, updates the screen text, records every
//! transition and writes the balance through the injected store.
//! One action is processed to completion, store write included, before the
//! next one is accepted.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::Amount;
use crate::model::{Action, AtmState, Key, MenuChoice, TransitionRecord};
use crate::speech::Utterance;
use crate::store::BalanceStore;

mod error;
pub use error::Rejection;

mod history;
pub use history::{LOG_CAPACITY, TransitionLog};

mod rules;
pub use rules::{DEPOSIT_LIMIT, MAX_AMOUNT_DIGITS, MAX_PIN_ATTEMPTS, NOTE_DENOMINATION, Rules};

mod session;
pub use session::{PIN_LENGTH, Session};

const GOODBYE: &str = "Thank you for banking with us. Card ejected.";
const PIN_ACCEPTED: &str =
    "PIN Accepted. Welcome to the main menu. Select Transaction (1, 2, or 3).";
const COMPLETE_SPEECH: &str = "Transaction successful. Please take your cash and card.";

/// What a single action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A transition was taken and logged (possibly to the same state).
    Transition { from: AtmState, to: AtmState },
    /// A digit was added to the PIN or amount buffer.
    Edited,
    /// Not valid in the current state; nothing changed.
    Ignored,
}

/// How a transition is narrated.
enum Narration {
    Silent,
    Screen,
    Text(String),
}

/// The ATM session controller.
pub struct Controller {
    session: Session,
    screen: String,
    log: TransitionLog,
    rules: Rules,
    store: Arc<dyn BalanceStore>,
    /// Latest balance pushed by the store; read on every use, never cached.
    balance: watch::Receiver<Amount>,
    feedback: Option<mpsc::UnboundedSender<Utterance>>,
}

/// Public API
impl Controller {
    pub fn new(store: Arc<dyn BalanceStore>, rules: Rules) -> Self {
        let balance = store.subscribe();
        Self {
            session: Session::default(),
            screen: AtmState::Idle.prompt().to_string(),
            log: TransitionLog::default(),
            rules,
            store,
            balance,
            feedback: None,
        }
    }

    /// Send spoken feedback to `feedback` (see [`crate::speech::spawn_worker`]).
    pub fn with_feedback(mut self, feedback: mpsc::UnboundedSender<Utterance>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn state(&self) -> AtmState {
        self.session.state()
    }

    pub fn screen(&self) -> &str {
        &self.screen
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn pin_attempts(&self) -> u32 {
        self.session.pin_attempts()
    }

    pub fn balance(&self) -> Amount {
        *self.balance.borrow()
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn log(&self) -> &TransitionLog {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        debug!("transition log cleared");
    }

    /// Raw keystroke entry point. Digits pick a transaction while a menu is shown.
    pub async fn press(&mut self, key: Key) -> Dispatch {
        let action = match key {
            Key::Digit(d) if self.state().is_menu() => match MenuChoice::from_digit(d) {
                Some(choice) => Action::Select(choice),
                None => return self.ignore(Action::Digit(d)),
            },
            Key::Digit(d) => Action::Digit(d),
            Key::Clear => Action::Clear,
            Key::Enter => Action::Enter,
            Key::Cancel => Action::Cancel,
            Key::Eject => Action::Eject,
            Key::Insert => Action::Insert,
        };
        self.dispatch(action).await
    }

    /// Action entry point.
    pub async fn dispatch(&mut self, action: Action) -> Dispatch {
        use AtmState::*;

        match (self.state(), action) {
            (Idle, Action::Insert) => self.transition(
                PinEntry,
                PinEntry.prompt(),
                "INSERT CARD",
                Narration::Screen,
            ),

            (PinEntry, Action::Digit(d)) if d <= 9 => {
                if self.session.push_pin_digit(d) {
                    Dispatch::Edited
                } else {
                    self.ignore(action)
                }
            }
            (Withdraw | Deposit, Action::Digit(d)) if d <= 9 => {
                if self.session.push_amount_digit(d, self.rules.max_amount_digits) {
                    Dispatch::Edited
                } else {
                    self.ignore(action)
                }
            }

            (PinEntry, Action::Clear) => {
                self.session.clear_pin();
                self.transition(
                    PinEntry,
                    "PIN cleared. Re-enter your PIN.",
                    "CLEAR",
                    Narration::Silent,
                )
            }
            (Withdraw, Action::Clear) => {
                self.session.clear_amount();
                self.transition(
                    Withdraw,
                    "Amount cleared. Re-enter withdrawal amount.",
                    "CLEAR",
                    Narration::Silent,
                )
            }
            (Deposit, Action::Clear) => {
                self.session.clear_amount();
                self.transition(
                    Deposit,
                    "Amount cleared. Re-enter deposit amount.",
                    "CLEAR",
                    Narration::Silent,
                )
            }

            (PinEntry, Action::Enter) => self.submit_pin(),
            (Withdraw, Action::Enter) => self.submit_withdrawal().await,
            (Deposit, Action::Enter) => self.submit_deposit().await,

            (Menu | BalanceCheck, Action::Select(choice)) => self.select(choice),

            (Withdraw | Deposit, Action::Cancel) => {
                self.transition(Menu, Menu.prompt(), "CANCEL", Narration::Screen)
            }
            (_, Action::Eject) if self.state() != Idle => self.end_session("EJECT"),
            (PinEntry | Menu | BalanceCheck | Complete | Locked, Action::Cancel) => {
                self.end_session("CANCEL / EJECT")
            }

            _ => self.ignore(action),
        }
    }
}

/// Private API
impl Controller {
    fn ignore(&self, action: Action) -> Dispatch {
        debug!(state = %self.state(), ?action, "action not valid in current state");
        Dispatch::Ignored
    }

    /// Take a transition: log it, move the session, update the screen and narrate.
    fn transition(
        &mut self,
        next: AtmState,
        message: impl Into<String>,
        action: impl Into<String>,
        narration: Narration,
    ) -> Dispatch {
        let from = self.state();
        let message = message.into();
        let action = action.into();

        info!(from = %from, to = %next, action = %action, "transition");
        self.log.record(TransitionRecord {
            from,
            action,
            to: next,
            timestamp: Utc::now(),
        });

        self.session.enter(next);

        let spoken = match narration {
            Narration::Silent => None,
            Narration::Screen if next == AtmState::Complete => Some(COMPLETE_SPEECH.to_string()),
            Narration::Screen => Some(message.clone()),
            Narration::Text(text) => Some(text),
        };
        if let Some(text) = spoken {
            self.narrate(text, next.voice());
        }

        self.screen = message;
        Dispatch::Transition { from, to: next }
    }

    fn narrate(&self, text: String, voice: &'static str) {
        if let Some(feedback) = &self.feedback {
            if feedback.send(Utterance { text, voice }).is_err() {
                debug!("speech worker is gone, feedback dropped");
            }
        }
    }

    /// Show a rejection on screen and move to `next`.
    fn reject(&mut self, next: AtmState, rejection: Rejection, narration: Narration) -> Dispatch {
        info!(state = %self.state(), reason = %rejection, "submission rejected");
        let label = rejection.action_label();
        self.transition(next, rejection.to_string(), label, narration)
    }

    fn end_session(&mut self, label: &str) -> Dispatch {
        self.transition(AtmState::Idle, GOODBYE, label, Narration::Screen)
    }

    /// ENTER in PIN entry:
    /// - Wrong length is refused without charging an attempt
    /// - A match opens the menu
    /// - A mismatch is charged; the last allowed one locks the card
    fn submit_pin(&mut self) -> Dispatch {
        if self.session.pin().len() != PIN_LENGTH {
            return self.reject(AtmState::PinEntry, Rejection::PinLength, Narration::Silent);
        }

        if self.session.pin() == self.rules.pin {
            self.session.reset_attempts();
            return self.transition(
                AtmState::Menu,
                PIN_ACCEPTED,
                "PIN MATCH (ENTER)",
                Narration::Text(format!("Welcome. {}", AtmState::Menu.prompt())),
            );
        }

        let attempts = self.session.record_failed_attempt();
        self.session.clear_pin();

        if attempts >= self.rules.max_pin_attempts {
            warn!(attempts, "card locked after repeated PIN mismatches");
            self.reject(
                AtmState::Locked,
                Rejection::PinLockout { attempts },
                Narration::Screen,
            )
        } else {
            self.reject(
                AtmState::PinEntry,
                Rejection::PinMismatch {
                    attempts,
                    remaining: self.rules.max_pin_attempts - attempts,
                },
                Narration::Screen,
            )
        }
    }

    fn select(&mut self, choice: MenuChoice) -> Dispatch {
        match choice {
            MenuChoice::Withdraw => self.transition(
                AtmState::Withdraw,
                AtmState::Withdraw.prompt(),
                choice.label(),
                Narration::Screen,
            ),
            MenuChoice::Deposit => self.transition(
                AtmState::Deposit,
                AtmState::Deposit.prompt(),
                choice.label(),
                Narration::Screen,
            ),
            MenuChoice::Balance => {
                let message = format!(
                    "Your current available balance is {}. Select another transaction or EJECT.",
                    self.balance()
                );
                self.transition(
                    AtmState::BalanceCheck,
                    message,
                    choice.label(),
                    Narration::Screen,
                )
            }
        }
    }

    /// ENTER in withdrawal:
    /// - Validate the amount (buffer kept on error)
    /// - Ensure the latest balance covers it
    /// - Store the debited balance; a store failure returns to the menu
    async fn submit_withdrawal(&mut self) -> Dispatch {
        let amount = match self.rules.validate_amount(self.session.amount()) {
            Ok(amount) => amount,
            Err(rejection) => return self.reject(AtmState::Withdraw, rejection, Narration::Silent),
        };

        let balance = self.balance();
        if amount > balance {
            return self.reject(
                AtmState::Menu,
                Rejection::InsufficientFunds {
                    available: balance,
                    requested: amount,
                },
                Narration::Screen,
            );
        }

        let Some(new_balance) = balance.checked_sub(amount) else {
            error!(amount = %amount, balance = %balance, "withdrawal out of range");
            return self.reject(AtmState::Menu, Rejection::System, Narration::Screen);
        };
        if let Err(e) = self.store.write_balance(new_balance).await {
            error!(amount = %amount, error = %e, "withdrawal could not be stored");
            return self.reject(AtmState::Menu, Rejection::System, Narration::Screen);
        }

        info!(amount = %amount, balance = %new_balance, "withdrawal applied");
        self.transition(
            AtmState::Complete,
            format!(
                "Withdrawal successful. {amount} dispensed. Your new balance is {new_balance}."
            ),
            "VALID AMOUNT (ENTER)",
            Narration::Screen,
        )
    }

    /// ENTER in deposit:
    /// - Validate the amount and the per-transaction cap (buffer kept on error)
    /// - Store the credited balance; a store failure returns to the menu
    async fn submit_deposit(&mut self) -> Dispatch {
        let amount = match self.rules.validate_deposit(self.session.amount()) {
            Ok(amount) => amount,
            Err(rejection) => return self.reject(AtmState::Deposit, rejection, Narration::Silent),
        };

        let balance = self.balance();
        let Some(new_balance) = balance.checked_add(amount) else {
            error!(amount = %amount, balance = %balance, "deposit overflows balance");
            return self.reject(AtmState::Menu, Rejection::System, Narration::Screen);
        };
        if let Err(e) = self.store.write_balance(new_balance).await {
            error!(amount = %amount, error = %e, "deposit could not be stored");
            return self.reject(AtmState::Menu, Rejection::System, Narration::Screen);
        }

        info!(amount = %amount, balance = %new_balance, "deposit applied");
        self.transition(
            AtmState::Complete,
            format!("Deposit successful. {amount} credited. Your new balance is {new_balance}."),
            "VALID AMOUNT (ENTER)",
            Narration::Screen,
        )
    }
}
