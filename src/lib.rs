//! # Bookkeeping Core
//!
//! Double-entry ledger and financial statement engine for multi-company
//! bookkeeping, with bank reconciliation.
//!
//! ## Features
//!
//! - **Chart of accounts**: hierarchical account codes held in an arena, with the
//!   debit/credit nature of every account type defined in one place
//! - **Journal entries**: DRAFT, CONFIRMED and VOID lifecycle, balance validation
//!   and append-only corrections through reversals
//! - **General ledger**: opening, running and closing balances per account and period
//! - **Financial reporting**: trial balance, balance sheet, income statement and
//!   cash flow, each checking its own accounting identity
//! - **Reconciliation**: one-to-one matching of bank statement lines with
//!   accounting movements
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use bookkeeping_core::{
//!     Account, AccountDirectory, AccountType, EntryValidator, JournalEntryBuilder,
//!     LedgerEngine, Period,
//! };
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! let mut directory = AccountDirectory::new();
//! for (code, account_type) in [
//!     ("1011", AccountType::Asset),
//!     ("7011", AccountType::Income),
//!     ("40111", AccountType::Liability),
//! ] {
//!     directory
//!         .add_account(Account::new(code.into(), code.into(), code.into(), account_type, None))
//!         .unwrap();
//! }
//!
//! let sale = JournalEntryBuilder::new("1", NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), "Sale")
//!     .debit("1011", BigDecimal::from(1180))
//!     .credit("7011", BigDecimal::from(1000))
//!     .credit("40111", BigDecimal::from(180))
//!     .confirmed();
//! EntryValidator::new(&directory).validate(&sale).unwrap();
//!
//! let march = Period::between(
//!     NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
//! );
//! let ledger = LedgerEngine::new(&directory)
//!     .account_ledger("1011", march, &[sale])
//!     .unwrap();
//! assert_eq!(ledger.closing_balance, BigDecimal::from(1180));
//! ```

pub mod config;
pub mod ledger;
pub mod reconciliation;
pub mod reports;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use ledger::*;
pub use reconciliation::*;
pub use reports::*;
pub use traits::*;
pub use types::*;
pub use utils::init_tracing;

// Re-export entry patterns for convenience
pub use ledger::journal::patterns;
