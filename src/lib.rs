pub mod amount;
pub mod config;
pub mod controller;
pub mod model;
pub mod speech;
pub mod store;
pub mod terminal;

pub use amount::Amount;
pub use controller::{Controller, Dispatch};
pub use model::{Action, AtmState, Key, MenuChoice, TransitionRecord};
