use crate::model::AtmState;

/// Length of a complete PIN.
pub const PIN_LENGTH: usize = 4;

/// Mutable per-card session: current state, input buffers and PIN attempts.
///
/// The PIN buffer is only non-empty in `PinEntry`, the amount buffer only in
/// `Withdraw`/`Deposit`. [`Session::enter`] keeps that true.
#[derive(Debug, Default, Clone)]
pub struct Session {
    state: AtmState,
    pin: String,
    amount: String,
    pin_attempts: u32,
}

impl Session {
    pub fn state(&self) -> AtmState {
        self.state
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn pin_attempts(&self) -> u32 {
        self.pin_attempts
    }

    /// Append a PIN digit; ignored once the PIN is full.
    pub fn push_pin_digit(&mut self, digit: u8) -> bool {
        if self.pin.len() >= PIN_LENGTH {
            return false;
        }
        self.pin.push(char::from(b'0' + digit));
        true
    }

    /// Append an amount digit; ignored once `max_digits` is reached.
    pub fn push_amount_digit(&mut self, digit: u8, max_digits: usize) -> bool {
        if self.amount.len() >= max_digits {
            return false;
        }
        self.amount.push(char::from(b'0' + digit));
        true
    }

    pub fn clear_pin(&mut self) {
        self.pin.clear();
    }

    pub fn clear_amount(&mut self) {
        self.amount.clear();
    }

    /// Count a wrong PIN and return the new total.
    pub fn record_failed_attempt(&mut self) -> u32 {
        self.pin_attempts += 1;
        self.pin_attempts
    }

    pub fn reset_attempts(&mut self) {
        self.pin_attempts = 0;
    }

    /// Move to `next`, dropping buffers and counters that do not belong there.
    pub fn enter(&mut self, next: AtmState) {
        self.state = next;
        if next != AtmState::PinEntry {
            self.pin.clear();
        }
        if !next.is_amount_entry() {
            self.amount.clear();
        }
        if matches!(next, AtmState::Idle | AtmState::Locked) {
            self.pin_attempts = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_default() {
        let session = Session::default();
        assert_eq!(session.state(), AtmState::Idle);
        assert!(session.pin().is_empty());
        assert!(session.amount().is_empty());
        assert_eq!(session.pin_attempts(), 0);
    }

    #[test]
    fn pin_buffer_stops_at_four_digits() {
        let mut session = Session::default();
        session.enter(AtmState::PinEntry);
        for d in [1, 2, 3, 4] {
            assert!(session.push_pin_digit(d));
        }
        assert!(!session.push_pin_digit(5));
        assert_eq!(session.pin(), "1234");
    }

    #[test]
    fn amount_buffer_respects_cap() {
        let mut session = Session::default();
        session.enter(AtmState::Withdraw);
        assert!(session.push_amount_digit(3, 2));
        assert!(session.push_amount_digit(0, 2));
        assert!(!session.push_amount_digit(0, 2));
        assert_eq!(session.amount(), "30");
    }

    #[test]
    fn enter_drops_foreign_buffers() {
        let mut session = Session::default();
        session.enter(AtmState::PinEntry);
        session.push_pin_digit(9);
        session.enter(AtmState::Menu);
        assert!(session.pin().is_empty());

        session.enter(AtmState::Deposit);
        session.push_amount_digit(5, 9);
        session.enter(AtmState::Deposit);
        assert_eq!(session.amount(), "5");
        session.enter(AtmState::Complete);
        assert!(session.amount().is_empty());
    }

    #[test]
    fn attempts_reset_on_idle_and_locked() {
        let mut session = Session::default();
        session.enter(AtmState::PinEntry);
        session.record_failed_attempt();
        session.record_failed_attempt();
        session.enter(AtmState::PinEntry);
        assert_eq!(session.pin_attempts(), 2);
        session.enter(AtmState::Locked);
        assert_eq!(session.pin_attempts(), 0);

        session.enter(AtmState::PinEntry);
        session.record_failed_attempt();
        session.enter(AtmState::Idle);
        assert_eq!(session.pin_attempts(), 0);
    }
}
