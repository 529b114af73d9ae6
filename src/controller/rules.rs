use crate::Amount;
use crate::controller::Rejection;
use crate::store::DEFAULT_PIN;

pub const MAX_PIN_ATTEMPTS: u32 = 3;
pub const NOTE_DENOMINATION: Amount = Amount::from_rupees(100);
pub const DEPOSIT_LIMIT: Amount = Amount::from_rupees(50_000);
pub const MAX_AMOUNT_DIGITS: usize = 9;

/// Business rules the controller enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rules {
    /// Secret PIN the card is checked against.
    pub pin: String,
    pub max_pin_attempts: u32,
    /// Every amount must be a multiple of this.
    pub denomination: Amount,
    /// Largest single deposit.
    pub deposit_limit: Amount,
    pub max_amount_digits: usize,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            pin: DEFAULT_PIN.to_string(),
            max_pin_attempts: MAX_PIN_ATTEMPTS,
            denomination: NOTE_DENOMINATION,
            deposit_limit: DEPOSIT_LIMIT,
            max_amount_digits: MAX_AMOUNT_DIGITS,
        }
    }
}

impl Rules {
    pub fn with_pin(pin: impl Into<String>) -> Self {
        Self {
            pin: pin.into(),
            ..Self::default()
        }
    }

    /// Positive and a whole number of notes.
    pub fn is_valid_amount(&self, amount: Amount) -> bool {
        amount.is_positive() && amount.is_multiple_of(self.denomination)
    }

    /// Parse and validate the keypad amount buffer.
    pub fn validate_amount(&self, digits: &str) -> Result<Amount, Rejection> {
        let amount = Amount::parse_rupees(digits).ok_or(Rejection::InvalidAmount)?;
        if !amount.is_positive() {
            return Err(Rejection::InvalidAmount);
        }
        if !self.is_valid_amount(amount) {
            return Err(Rejection::NotMultiple {
                denomination: self.denomination,
            });
        }
        Ok(amount)
    }

    /// [`Rules::validate_amount`] plus the per-transaction deposit cap.
    pub fn validate_deposit(&self, digits: &str) -> Result<Amount, Rejection> {
        let amount = self.validate_amount(digits)?;
        if amount > self.deposit_limit {
            return Err(Rejection::DepositLimit {
                limit: self.deposit_limit,
            });
        }
        Ok(amount)
    }
}
