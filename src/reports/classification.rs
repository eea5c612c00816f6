//! Injectable classification rules for statement grouping

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::traits::{AccountClassifier, CashFlowClassifier, IncomeBandClassifier};
use crate::types::{Account, JournalEntry, Movement};

/// Income statement band of an income or expense account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomeBand {
    Sales,
    CostOfSales,
    Operating,
    Other,
}

/// Cash flow statement activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashFlowBucket {
    Operating,
    Investing,
    Financing,
}

impl CashFlowBucket {
    pub const ALL: [CashFlowBucket; 3] = [
        CashFlowBucket::Operating,
        CashFlowBucket::Investing,
        CashFlowBucket::Financing,
    ];
}

impl fmt::Display for CashFlowBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CashFlowBucket::Operating => "Operating activities",
            CashFlowBucket::Investing => "Investing activities",
            CashFlowBucket::Financing => "Financing activities",
        };
        f.write_str(label)
    }
}

/// A movement on a cash account, with the rest of its entry for context
#[derive(Debug, Clone)]
pub struct CashMovement<'a> {
    pub entry: &'a JournalEntry,
    pub movement: &'a Movement,
    pub account: &'a Account,
    /// Non-cash movements of the same entry with their accounts
    pub counterparts: Vec<(&'a Movement, &'a Account)>,
}

impl<'a> CashMovement<'a> {
    /// Inflow positive, outflow negative
    pub fn amount(&self) -> BigDecimal {
        self.movement.debit_minus_credit()
    }

    /// Counterpart account carrying the largest amount; the first one wins ties
    pub fn main_counterpart(&self) -> Option<&'a Account> {
        let mut best: Option<(&'a Movement, &'a Account)> = None;
        for &(movement, account) in &self.counterparts {
            if best.is_none_or(|(current, _)| movement.amount() > current.amount()) {
                best = Some((movement, account));
            }
        }
        best.map(|(_, account)| account)
    }
}

/// Code-prefix lookup table; the longest matching prefix wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixTable<T> {
    pub rules: Vec<PrefixRule<T>>,
    pub default: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixRule<T> {
    pub prefix: String,
    pub value: T,
}

impl<T> PrefixTable<T> {
    pub fn new(default: T) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    pub fn with(mut self, prefix: impl Into<String>, value: T) -> Self {
        self.rules.push(PrefixRule {
            prefix: prefix.into(),
            value,
        });
        self
    }

    pub fn lookup(&self, code: &str) -> &T {
        self.rules
            .iter()
            .filter(|rule| code.starts_with(rule.prefix.as_str()))
            .max_by_key(|rule| rule.prefix.len())
            .map(|rule| &rule.value)
            .unwrap_or(&self.default)
    }
}

impl AccountClassifier for PrefixTable<String> {
    fn group_label(&self, account: &Account) -> String {
        self.lookup(&account.code).clone()
    }
}

impl IncomeBandClassifier for PrefixTable<IncomeBand> {
    fn band(&self, account: &Account) -> IncomeBand {
        *self.lookup(&account.code)
    }
}

/// Classifies a cash movement by the code of its main counterpart account.
/// Transfers between cash accounts fall back to the default bucket.
impl CashFlowClassifier for PrefixTable<CashFlowBucket> {
    fn bucket(&self, movement: &CashMovement<'_>) -> CashFlowBucket {
        match movement.main_counterpart() {
            Some(account) => *self.lookup(&account.code),
            None => self.default,
        }
    }
}
