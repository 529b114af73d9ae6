//! Core domain types for the ATM session.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// State of the session automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AtmState {
    /// Waiting for a card.
    #[default]
    Idle,
    /// Card inserted, collecting the 4-digit PIN.
    PinEntry,
    /// Authenticated, waiting for a transaction choice.
    Menu,
    /// Collecting a withdrawal amount.
    Withdraw,
    /// A withdrawal or deposit went through.
    Complete,
    /// Collecting a deposit amount.
    Deposit,
    /// Balance shown; behaves like the menu.
    BalanceCheck,
    /// Too many wrong PINs. Only ejecting gets out.
    Locked,
}

impl AtmState {
    pub const ALL: [AtmState; 8] = [
        AtmState::Idle,
        AtmState::PinEntry,
        AtmState::Menu,
        AtmState::Withdraw,
        AtmState::Complete,
        AtmState::Deposit,
        AtmState::BalanceCheck,
        AtmState::Locked,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AtmState::Idle => "S0: IDLE",
            AtmState::PinEntry => "S1: PIN ENTRY",
            AtmState::Menu => "S3: MENU",
            AtmState::Withdraw => "S4: WITHDRAWAL",
            AtmState::Complete => "S5: COMPLETE",
            AtmState::Deposit => "S6: DEPOSIT",
            AtmState::BalanceCheck => "S7: BALANCE CHECK",
            AtmState::Locked => "S_err: BLOCKED",
        }
    }

    /// Screen text shown when the state is entered without a more specific message.
    pub fn prompt(self) -> &'static str {
        match self {
            AtmState::Idle => "Welcome! Press INSERT CARD to begin.",
            AtmState::PinEntry => "Please enter your 4-digit PIN and press ENTER.",
            AtmState::Menu => "Select Transaction: 1. Withdraw 2. Deposit 3. Check Balance",
            AtmState::Withdraw => "Enter withdrawal amount (multiples of ₹100) and press ENTER.",
            AtmState::Complete => "Transaction successful! Please take your cash and card.",
            AtmState::Deposit => "Enter deposit amount (multiples of ₹100) and press ENTER.",
            AtmState::BalanceCheck => "Balance displayed. Select another transaction or EJECT.",
            AtmState::Locked => "SECURITY LOCKOUT. Please contact your bank. Press EJECT.",
        }
    }

    /// Voice used when narrating a transition into this state.
    pub fn voice(self) -> &'static str {
        match self {
            AtmState::Idle => "Leda",
            AtmState::PinEntry => "Kore",
            AtmState::Menu | AtmState::BalanceCheck => "Puck",
            AtmState::Withdraw => "Charon",
            AtmState::Complete => "Zephyr",
            AtmState::Deposit => "Aoede",
            AtmState::Locked => "Fenrir",
        }
    }

    pub fn is_amount_entry(self) -> bool {
        matches!(self, AtmState::Withdraw | AtmState::Deposit)
    }

    /// States in which `1`/`2`/`3` pick a transaction.
    pub fn is_menu(self) -> bool {
        matches!(self, AtmState::Menu | AtmState::BalanceCheck)
    }
}

impl fmt::Display for AtmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Transaction picked from the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuChoice {
    Withdraw,
    Deposit,
    Balance,
}

impl MenuChoice {
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            1 => Some(MenuChoice::Withdraw),
            2 => Some(MenuChoice::Deposit),
            3 => Some(MenuChoice::Balance),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::Withdraw => "1. WITHDRAW",
            MenuChoice::Deposit => "2. DEPOSIT",
            MenuChoice::Balance => "3. CHECK BALANCE",
        }
    }
}

/// Input to the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Insert,
    /// A single decimal digit, `0..=9`.
    Digit(u8),
    Clear,
    Enter,
    Cancel,
    Eject,
    Select(MenuChoice),
}

/// Raw keystroke from the keypad or the slot buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Digit(u8),
    Clear,
    Enter,
    Cancel,
    Eject,
    Insert,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized key '{0}'")]
pub struct KeyParseError(pub String);

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "clear" | "clr" => Ok(Key::Clear),
            "enter" | "ent" => Ok(Key::Enter),
            "cancel" | "x" => Ok(Key::Cancel),
            "eject" => Ok(Key::Eject),
            "insert" => Ok(Key::Insert),
            d if d.len() == 1 && d.as_bytes()[0].is_ascii_digit() => {
                Ok(Key::Digit(d.as_bytes()[0] - b'0'))
            }
            _ => Err(KeyParseError(s.to_string())),
        }
    }
}

/// One entry of the transition log.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    pub from: AtmState,
    pub action: String,
    pub to: AtmState,
    pub timestamp: DateTime<Utc>,
}

/// Row of the static transition table, used to print the automaton.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub from: AtmState,
    pub action: &'static str,
    pub to: AtmState,
    pub description: &'static str,
}

const fn rule(
    from: AtmState,
    action: &'static str,
    to: AtmState,
    description: &'static str,
) -> TransitionRule {
    TransitionRule {
        from,
        action,
        to,
        description,
    }
}

pub const TRANSITION_TABLE: &[TransitionRule] = &[
    rule(AtmState::Idle, "INSERT CARD", AtmState::PinEntry, "Starts the session."),
    rule(AtmState::PinEntry, "PIN MATCH (ENTER)", AtmState::Menu, "Authentication successful."),
    rule(AtmState::PinEntry, "PIN MISMATCH (<3 attempts)", AtmState::PinEntry, "Retry PIN entry."),
    rule(
        AtmState::PinEntry,
        "PIN MISMATCH (3 attempts)",
        AtmState::Locked,
        "Maximum attempts exceeded (security lockout).",
    ),
    rule(AtmState::PinEntry, "CANCEL / EJECT", AtmState::Idle, "Cancels session."),
    rule(AtmState::Menu, "1. WITHDRAW", AtmState::Withdraw, "Enter amount for withdrawal."),
    rule(AtmState::Menu, "2. DEPOSIT", AtmState::Deposit, "Enter amount for deposit."),
    rule(AtmState::Menu, "3. CHECK BALANCE", AtmState::BalanceCheck, "Displays balance."),
    rule(AtmState::Menu, "EJECT / CANCEL", AtmState::Idle, "Ends session and ejects card."),
    rule(AtmState::Withdraw, "VALID AMOUNT (ENTER)", AtmState::Complete, "Funds dispensed."),
    rule(
        AtmState::Withdraw,
        "INSUFFICIENT FUNDS (ENTER)",
        AtmState::Menu,
        "Cannot withdraw, returns to menu.",
    ),
    rule(
        AtmState::Withdraw,
        "INVALID AMOUNT (ENTER)",
        AtmState::Withdraw,
        "Must be multiple of ₹100, retry input.",
    ),
    rule(
        AtmState::Withdraw,
        "SYSTEM ERROR",
        AtmState::Menu,
        "Store update failed, returns to menu.",
    ),
    rule(AtmState::Withdraw, "CANCEL", AtmState::Menu, "Returns to main menu."),
    rule(AtmState::Withdraw, "EJECT", AtmState::Idle, "Ends session and ejects card."),
    rule(AtmState::Deposit, "VALID AMOUNT (ENTER)", AtmState::Complete, "Deposit successful."),
    rule(
        AtmState::Deposit,
        "INVALID AMOUNT (ENTER)",
        AtmState::Deposit,
        "Must be multiple of ₹100, retry input.",
    ),
    rule(
        AtmState::Deposit,
        "AMOUNT EXCEEDS LIMIT",
        AtmState::Deposit,
        "Exceeds ₹50,000 limit, retry input.",
    ),
    rule(
        AtmState::Deposit,
        "SYSTEM ERROR",
        AtmState::Menu,
        "Store update failed, returns to menu.",
    ),
    rule(AtmState::Deposit, "CANCEL", AtmState::Menu, "Returns to main menu."),
    rule(AtmState::Deposit, "EJECT", AtmState::Idle, "Ends session and ejects card."),
    rule(AtmState::Complete, "EJECT / CANCEL", AtmState::Idle, "Session complete, card ejected."),
    rule(AtmState::BalanceCheck, "SELECT TRANSACTION", AtmState::Menu, "Same choices as the menu."),
    rule(
        AtmState::BalanceCheck,
        "EJECT / CANCEL",
        AtmState::Idle,
        "Balance checked, session ends.",
    ),
    rule(AtmState::Locked, "EJECT / CANCEL", AtmState::Idle, "Resets the locked machine."),
];
