//! Statement aggregation: trial balance, balance sheet, income statement
//! and cash flow, built from per-account ledger balances.
//!
//! Every report checks its own identity and refuses to return a result that
//! does not add up.

pub mod cash_flow;
pub mod classification;
pub mod statements;
pub mod trial_balance;

pub use cash_flow::*;
pub use classification::*;
pub use statements::*;
pub use trial_balance::*;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::config::{default_net_income_label, EngineConfig};
use crate::ledger::chart::AccountDirectory;
use crate::ledger::engine::LedgerEngine;
use crate::types::*;
use crate::utils::validation::default_epsilon;

/// One account line of a grouped statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    /// `None` for synthetic rows such as the unclosed period result
    pub account_id: Option<String>,
    pub code: String,
    pub name: String,
    /// Balance on the account's natural side
    pub balance: BigDecimal,
}

/// Named group of statement rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementGroup {
    pub group_name: String,
    pub rows: Vec<StatementRow>,
    pub group_total: BigDecimal,
}

/// Collect labelled rows into groups, keeping the order in which labels first appear
pub fn group_rows(rows: Vec<(String, StatementRow)>) -> Vec<StatementGroup> {
    let mut groups: Vec<StatementGroup> = Vec::new();
    for (label, row) in rows {
        let index = match groups.iter().position(|g| g.group_name == label) {
            Some(index) => index,
            None => {
                groups.push(StatementGroup {
                    group_name: label,
                    rows: Vec::new(),
                    group_total: BigDecimal::from(0),
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        group.group_total += &row.balance;
        group.rows.push(row);
    }
    groups
}

/// Sum of group totals
pub fn total_of(groups: &[StatementGroup]) -> BigDecimal {
    groups.iter().map(|g| &g.group_total).sum()
}

/// Builds financial statements from one directory's ledger balances
pub struct StatementAggregator<'a> {
    engine: LedgerEngine<'a>,
    epsilon: BigDecimal,
    net_income_label: String,
}

impl<'a> StatementAggregator<'a> {
    pub fn new(directory: &'a AccountDirectory) -> Self {
        Self {
            engine: LedgerEngine::new(directory),
            epsilon: default_epsilon(),
            net_income_label: default_net_income_label(),
        }
    }

    /// Aggregator using the tolerance and labels of `config`
    pub fn with_config(directory: &'a AccountDirectory, config: &EngineConfig) -> Self {
        Self {
            engine: LedgerEngine::new(directory),
            epsilon: config.epsilon.clone(),
            net_income_label: config.net_income_label.clone(),
        }
    }

    pub fn engine(&self) -> LedgerEngine<'a> {
        self.engine
    }

    fn directory(&self) -> &'a AccountDirectory {
        self.engine.directory()
    }

    /// Fail when a confirmed movement points at an account missing from the directory
    pub fn check_orphans(&self, entries: &[JournalEntry]) -> LedgerResult<()> {
        let directory = self.directory();
        for entry in entries.iter().filter(|e| e.is_confirmed()) {
            if let Some(orphan) = entry
                .movements
                .iter()
                .find(|m| !directory.contains(&m.account_id))
            {
                tracing::warn!(
                    entry_number = %entry.number,
                    account_id = %orphan.account_id,
                    "confirmed movement references a missing account"
                );
                return Err(LedgerError::AccountNotFound(orphan.account_id.clone()));
            }
        }
        Ok(())
    }

    /// Ledger of every account of the given types, in code order.
    /// Inactive accounts are included only when they carry a balance or movement.
    fn ledgers(
        &self,
        types: &[AccountType],
        period: Period,
        entries: &[JournalEntry],
    ) -> LedgerResult<Vec<AccountLedger>> {
        let zero = BigDecimal::from(0);
        let mut ledgers = Vec::new();
        for account in self
            .directory()
            .iter()
            .filter(|a| types.contains(&a.account_type))
        {
            let ledger = self.engine.account_ledger(&account.id, period, entries)?;
            let carries_something = ledger.has_movements()
                || ledger.opening_balance != zero
                || ledger.closing_balance != zero;
            if account.active || carries_something {
                ledgers.push(ledger);
            }
        }
        Ok(ledgers)
    }

    fn exceeds_epsilon(&self, a: &BigDecimal, b: &BigDecimal) -> bool {
        (a - b).abs() > self.epsilon
    }

    /// Debit minus credit accumulated by the confirmed entries of `period`
    /// that each balance within the tolerance. Whole-book totals may drift
    /// by this much without signalling a bug.
    fn accepted_drift(&self, period: Period, entries: &[JournalEntry]) -> BigDecimal {
        entries
            .iter()
            .filter(|e| e.is_confirmed() && period.contains(e.date))
            .map(|e| e.total_debit() - e.total_credit())
            .filter(|delta| delta.abs() <= self.epsilon)
            .sum()
    }

    /// Whether a debit-side `difference` is more than rounding drift explains
    fn exceeds_drift(
        &self,
        difference: &BigDecimal,
        period: Period,
        entries: &[JournalEntry],
    ) -> bool {
        self.exceeds_epsilon(difference, &self.accepted_drift(period, entries))
    }
}

fn row_of(account: &Account, balance: BigDecimal) -> StatementRow {
    StatementRow {
        account_id: Some(account.id.clone()),
        code: account.code.clone(),
        name: account.name.clone(),
        balance,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_group_rows_keeps_first_seen_order() {
        let row = |code: &str, amount: i64| StatementRow {
            account_id: Some(code.to_string()),
            code: code.to_string(),
            name: code.to_string(),
            balance: BigDecimal::from(amount),
        };
        let groups = group_rows(vec![
            ("Current".to_string(), row("10", 5)),
            ("Fixed".to_string(), row("33", 7)),
            ("Current".to_string(), row("12", 3)),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group_name, "Current");
        assert_eq!(groups[0].group_total, BigDecimal::from(8));
        assert_eq!(total_of(&groups), BigDecimal::from(15));
    }

    #[test]
    fn test_orphan_movements_are_surfaced() {
        let directory = directory();
        let mut entries = entries();
        entries.push(entry("8", date(3, 30), &[("1011", 5, 0), ("9999", 0, 5)]));

        let err = StatementAggregator::new(&directory)
            .check_orphans(&entries)
            .unwrap_err();
        assert_eq!(err, LedgerError::AccountNotFound("9999".to_string()));
    }
}
