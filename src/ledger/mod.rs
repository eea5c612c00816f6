//! Ledger module containing the chart of accounts, journal entry lifecycle,
//! entry validation and per-account balance computation

pub mod account;
pub mod chart;
pub mod core;
pub mod engine;
pub mod journal;
pub mod validator;

pub use account::*;
pub use chart::*;
pub use core::*;
pub use engine::*;
pub use journal::*;
pub use validator::*;
