//! Bank reconciliation
//!
//! Pairs imported bank statement lines with accounting movements, one to
//! one. Each side is either PENDING or RECONCILED and both sides of a pair
//! change together through [`ReconciliationStore::link`] and
//! [`ReconciliationStore::unlink`], so no observer sees half a pair.
//!
//! [`ReconciliationStore::link`]: crate::traits::ReconciliationStore::link
//! [`ReconciliationStore::unlink`]: crate::traits::ReconciliationStore::unlink

pub mod cache;
pub mod matcher;

pub use cache::*;
pub use matcher::*;
