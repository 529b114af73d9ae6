//! Line-oriented terminal front end: input parsing and screen rendering.

use std::fmt::Write as _;
use thiserror::Error;

use crate::controller::{Controller, TransitionLog};
use crate::model::{AtmState, Key, TRANSITION_TABLE};

pub const HELP: &str = "\
Keys:     insert, eject, cancel (x), clear (clr), enter (ent), digits (e.g. 1234)
Commands: log, clear-log, reset, dfa, help, quit
";

/// One token of terminal input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Key(Key),
    ShowLog,
    ClearLog,
    /// Put the balance back to the starting balance.
    ResetBalance,
    ShowTable,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown input '{0}', type 'help' for the list of keys")]
pub struct UnknownCommand(pub String);

/// Split a line into commands. A run of digits presses each digit in order.
pub fn parse_line(line: &str) -> Vec<Result<Command, UnknownCommand>> {
    let mut commands = Vec::new();
    for token in line.split_whitespace() {
        if token.bytes().all(|b| b.is_ascii_digit()) {
            commands.extend(token.bytes().map(|b| Ok(Command::Key(Key::Digit(b - b'0')))));
            continue;
        }
        let command = match token.to_ascii_lowercase().as_str() {
            "log" => Ok(Command::ShowLog),
            "clear-log" | "clearlog" => Ok(Command::ClearLog),
            "reset" => Ok(Command::ResetBalance),
            "dfa" => Ok(Command::ShowTable),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            _ => token
                .parse::<Key>()
                .map(Command::Key)
                .map_err(|_| UnknownCommand(token.to_string())),
        };
        commands.push(command);
    }
    commands
}

/// Screen text, the input being typed and the latest balance.
pub fn render_screen(atm: &Controller) -> String {
    let state = atm.state();
    let mut out = format!("[{}] {}\n", state.label(), atm.screen());
    match state {
        AtmState::PinEntry => {
            let _ = writeln!(out, "  PIN: {}", "*".repeat(atm.session().pin().len()));
        }
        s if s.is_amount_entry() => {
            let _ = writeln!(out, "  Amount: ₹{}", atm.session().amount());
        }
        _ => {}
    }
    let _ = write!(out, "  Balance: {}", atm.balance());
    out
}

/// Transition log, newest first.
pub fn render_log(log: &TransitionLog) -> String {
    if log.is_empty() {
        return "No transitions recorded.\n".to_string();
    }
    let mut out = String::new();
    for record in log.newest_first() {
        let _ = writeln!(
            out,
            "{}  {} --[{}]--> {}",
            record.timestamp.format("%H:%M:%S"),
            record.from,
            record.action,
            record.to
        );
    }
    out
}

/// The automaton as a table.
pub fn render_table() -> String {
    let mut out = String::new();
    for rule in TRANSITION_TABLE {
        let _ = writeln!(
            out,
            "{:<18} {:<28} {:<18} {}",
            rule.from.label(),
            rule.action,
            rule.to.label(),
            rule.description
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Amount;
    use crate::controller::Rules;
    use crate::model::Action;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn parse_keys_and_commands() {
        let parsed = parse_line("insert 12 ENT log reset dfa help q");
        assert_eq!(
            parsed,
            vec![
                Ok(Command::Key(Key::Insert)),
                Ok(Command::Key(Key::Digit(1))),
                Ok(Command::Key(Key::Digit(2))),
                Ok(Command::Key(Key::Enter)),
                Ok(Command::ShowLog),
                Ok(Command::ResetBalance),
                Ok(Command::ShowTable),
                Ok(Command::Help),
                Ok(Command::Quit),
            ]
        );
    }

    #[test]
    fn parse_reports_unknown_tokens() {
        let parsed = parse_line("x withdraw");
        assert_eq!(parsed[0], Ok(Command::Key(Key::Cancel)));
        assert_eq!(parsed[1], Err(UnknownCommand("withdraw".to_string())));
    }

    #[test]
    fn parse_blank_line() {
        assert!(parse_line("   ").is_empty());
    }

    #[tokio::test]
    async fn screen_masks_pin() {
        let store = Arc::new(MemoryStore::with_balance(Amount::from_rupees(5000)));
        let mut atm = Controller::new(store, Rules::default());
        atm.dispatch(Action::Insert).await;
        atm.press(Key::Digit(1)).await;
        atm.press(Key::Digit(2)).await;

        let screen = render_screen(&atm);
        assert!(screen.starts_with("[S1: PIN ENTRY] Please enter your 4-digit PIN"));
        assert!(screen.contains("PIN: **\n"));
        assert!(!screen.contains("12"));
        assert!(screen.ends_with("Balance: ₹5,000.00"));
    }

    #[tokio::test]
    async fn log_is_newest_first() {
        let store = Arc::new(MemoryStore::default());
        let mut atm = Controller::new(store, Rules::default());
        assert_eq!(render_log(atm.log()), "No transitions recorded.\n");

        atm.dispatch(Action::Insert).await;
        atm.dispatch(Action::Cancel).await;

        let log = render_log(atm.log());
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("S1: PIN ENTRY --[CANCEL / EJECT]--> S0: IDLE"));
        assert!(lines[1].ends_with("S0: IDLE --[INSERT CARD]--> S1: PIN ENTRY"));
    }

    #[test]
    fn table_lists_every_rule() {
        assert_eq!(render_table().lines().count(), TRANSITION_TABLE.len());
    }
}
