//! Reasons a keypad submission is turned down.
//!
//! The `Display` text of every variant is exactly what the screen shows.

use thiserror::Error;

use crate::Amount;

/// A submission the controller refused. Never escapes the controller; it is
/// rendered on screen and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("PIN must be 4 digits. Press CLEAR and try again.")]
    PinLength,

    #[error("PIN Incorrect. You have {remaining} attempts remaining. Re-enter PIN.")]
    PinMismatch { attempts: u32, remaining: u32 },

    #[error("Maximum PIN attempts ({attempts}) exceeded. CARD BLOCKED. Press EJECT.")]
    PinLockout { attempts: u32 },

    #[error("Invalid amount. Enter a whole number of rupees. Try again or CANCEL.")]
    InvalidAmount,

    #[error("Invalid amount. Must be a multiple of {denomination}. Try again or CANCEL.")]
    NotMultiple { denomination: Amount },

    #[error("Maximum deposit limit is {limit} per transaction. Try again or CANCEL.")]
    DepositLimit { limit: Amount },

    #[error("Insufficient funds. Returning to Menu.")]
    InsufficientFunds { available: Amount, requested: Amount },

    #[error("Transaction failed due to system error. Please try again.")]
    System,
}

impl Rejection {
    /// Label recorded in the transition log.
    pub fn action_label(&self) -> String {
        match self {
            Rejection::PinLength => "KEYPAD (Invalid Length)".to_string(),
            Rejection::PinMismatch { attempts, .. } | Rejection::PinLockout { attempts } => {
                format!("PIN MISMATCH ({attempts} attempts)")
            }
            Rejection::InvalidAmount | Rejection::NotMultiple { .. } => {
                "INVALID AMOUNT (ENTER)".to_string()
            }
            Rejection::DepositLimit { .. } => "AMOUNT EXCEEDS LIMIT".to_string(),
            Rejection::InsufficientFunds { .. } => "INSUFFICIENT FUNDS (ENTER)".to_string(),
            Rejection::System => "SYSTEM ERROR".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_values() {
        assert_eq!(
            Rejection::PinMismatch {
                attempts: 1,
                remaining: 2
            }
            .to_string(),
            "PIN Incorrect. You have 2 attempts remaining. Re-enter PIN."
        );
        assert_eq!(
            Rejection::DepositLimit {
                limit: Amount::from_rupees(50_000)
            }
            .to_string(),
            "Maximum deposit limit is ₹50,000.00 per transaction. Try again or CANCEL."
        );
        assert_eq!(
            Rejection::NotMultiple {
                denomination: Amount::from_rupees(100)
            }
            .to_string(),
            "Invalid amount. Must be a multiple of ₹100.00. Try again or CANCEL."
        );
    }

    #[test]
    fn action_labels() {
        assert_eq!(
            Rejection::PinLockout { attempts: 3 }.action_label(),
            "PIN MISMATCH (3 attempts)"
        );
        assert_eq!(
            Rejection::InvalidAmount.action_label(),
            "INVALID AMOUNT (ENTER)"
        );
    }
}
