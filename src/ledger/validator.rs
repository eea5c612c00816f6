//! Journal entry validation
//!
//! Checks run in a fixed order and stop at the first failure. Validation only
//! reads the entry and the directory.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::ledger::chart::AccountDirectory;
use crate::traits::EntryPolicy;
use crate::types::*;
use crate::utils::validation::default_epsilon;

/// Column totals of an entry that passed validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryTotals {
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub movement_count: usize,
}

/// Gate between candidate entries and the confirmed ledger
pub struct EntryValidator<'a> {
    directory: &'a AccountDirectory,
    epsilon: BigDecimal,
    policies: &'a [Box<dyn EntryPolicy>],
}

impl<'a> EntryValidator<'a> {
    /// Create a validator with the default 0.01 tolerance and no extra policies
    pub fn new(directory: &'a AccountDirectory) -> Self {
        Self {
            directory,
            epsilon: default_epsilon(),
            policies: &[],
        }
    }

    pub fn with_epsilon(mut self, epsilon: BigDecimal) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Extra policies run after the double-entry checks pass
    pub fn with_policies(mut self, policies: &'a [Box<dyn EntryPolicy>]) -> Self {
        self.policies = policies;
        self
    }

    /// Validate a candidate entry
    pub fn validate(&self, entry: &JournalEntry) -> LedgerResult<EntryTotals> {
        let zero = BigDecimal::from(0);

        let found = entry.movements.iter().filter(|m| m.has_amount()).count();
        if found < 2 {
            return Err(LedgerError::InsufficientMovements { found });
        }

        for (index, movement) in entry.movements.iter().enumerate() {
            let is_debit = movement.debit > zero && movement.credit == zero;
            let is_credit = movement.credit > zero && movement.debit == zero;
            if !(is_debit || is_credit) {
                return Err(LedgerError::AmbiguousMovement {
                    index,
                    debit: movement.debit.clone(),
                    credit: movement.credit.clone(),
                });
            }
        }

        for (index, movement) in entry.movements.iter().enumerate() {
            if !self.directory.is_active(&movement.account_id) {
                return Err(LedgerError::UnknownAccount {
                    index,
                    account_id: movement.account_id.clone(),
                });
            }
        }

        let total_debit = entry.total_debit();
        let total_credit = entry.total_credit();
        let delta = (&total_debit - &total_credit).abs();
        if delta > self.epsilon {
            return Err(LedgerError::UnbalancedEntry {
                total_debit,
                total_credit,
                delta,
            });
        }

        for policy in self.policies {
            policy.check(entry)?;
        }

        tracing::debug!(
            entry_number = %entry.number,
            total_debit = %total_debit,
            total_credit = %total_credit,
            "entry passed validation"
        );

        Ok(EntryTotals {
            total_debit,
            total_credit,
            movement_count: entry.movements.len(),
        })
    }
}
