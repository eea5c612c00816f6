//! Cash flow classification

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::classification::{CashFlowBucket, CashMovement};
use super::StatementAggregator;
use crate::ledger::engine::chronological;
use crate::traits::CashFlowClassifier;
use crate::types::*;

/// One movement on a cash account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowItem {
    pub date: NaiveDate,
    pub entry_id: String,
    pub entry_number: String,
    pub movement_id: String,
    pub cash_account_code: String,
    /// Code of the counterpart carrying the largest amount, if any
    pub counterpart_code: Option<String>,
    pub description: String,
    /// Inflow positive, outflow negative
    pub amount: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSection {
    pub bucket: CashFlowBucket,
    pub items: Vec<CashFlowItem>,
    pub total: BigDecimal,
}

/// Cash movements of a period split by activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub period: Period,
    /// Codes of the accounts treated as cash
    pub cash_accounts: Vec<String>,
    pub opening_cash: BigDecimal,
    pub closing_cash: BigDecimal,
    pub operating: CashFlowSection,
    pub investing: CashFlowSection,
    pub financing: CashFlowSection,
    /// Sum of the three section totals
    pub net_change: BigDecimal,
}

impl CashFlowStatement {
    pub fn section(&self, bucket: CashFlowBucket) -> &CashFlowSection {
        match bucket {
            CashFlowBucket::Operating => &self.operating,
            CashFlowBucket::Investing => &self.investing,
            CashFlowBucket::Financing => &self.financing,
        }
    }
}

impl<'a> StatementAggregator<'a> {
    /// Classify every movement on the accounts selected by `is_cash`.
    ///
    /// The selected accounts must be ASSET accounts. Fails with
    /// `CashFlowImbalance` when `closing_cash != opening_cash + net_change`.
    pub fn cash_flow(
        &self,
        period: Period,
        entries: &[JournalEntry],
        is_cash: &dyn Fn(&Account) -> bool,
        classifier: &dyn CashFlowClassifier,
    ) -> LedgerResult<CashFlowStatement> {
        self.check_orphans(entries)?;
        let directory = self.directory();

        let cash_accounts: Vec<&Account> = directory.iter().filter(|a| is_cash(a)).collect();
        if cash_accounts.is_empty() {
            return Err(LedgerError::Config(
                "no account was selected as cash".to_string(),
            ));
        }
        if let Some(account) = cash_accounts
            .iter()
            .find(|a| a.account_type != AccountType::Asset)
        {
            return Err(LedgerError::Config(format!(
                "cash account {} must be an ASSET account, found {}",
                account.code, account.account_type
            )));
        }
        let cash_ids: HashSet<&str> = cash_accounts.iter().map(|a| a.id.as_str()).collect();

        let mut opening_cash = BigDecimal::from(0);
        let mut closing_cash = BigDecimal::from(0);
        for account in &cash_accounts {
            let ledger = self.engine.account_ledger(&account.id, period, entries)?;
            opening_cash += ledger.opening_balance;
            closing_cash += ledger.closing_balance;
        }

        let mut sections = CashFlowBucket::ALL.map(|bucket| CashFlowSection {
            bucket,
            items: Vec::new(),
            total: BigDecimal::from(0),
        });

        let in_period: Vec<&JournalEntry> = entries
            .iter()
            .filter(|e| e.is_confirmed() && period.contains(e.date))
            .collect();
        for entry in chronological(in_period) {
            let mut counterparts = Vec::new();
            for movement in &entry.movements {
                if !cash_ids.contains(movement.account_id.as_str()) {
                    counterparts.push((movement, directory.get_account(&movement.account_id)?));
                }
            }

            for movement in entry
                .movements
                .iter()
                .filter(|m| cash_ids.contains(m.account_id.as_str()))
            {
                let cash_movement = CashMovement {
                    entry,
                    movement,
                    account: directory.get_account(&movement.account_id)?,
                    counterparts: counterparts.clone(),
                };
                let bucket = classifier.bucket(&cash_movement);
                let item = CashFlowItem {
                    date: entry.date,
                    entry_id: entry.id.clone(),
                    entry_number: entry.number.clone(),
                    movement_id: movement.id.clone(),
                    cash_account_code: cash_movement.account.code.clone(),
                    counterpart_code: cash_movement.main_counterpart().map(|a| a.code.clone()),
                    description: movement
                        .description
                        .clone()
                        .unwrap_or_else(|| entry.description.clone()),
                    amount: cash_movement.amount(),
                };

                if let Some(section) = sections.iter_mut().find(|s| s.bucket == bucket) {
                    section.total += &item.amount;
                    section.items.push(item);
                }
            }
        }

        let net_change: BigDecimal = sections.iter().map(|s| &s.total).sum();
        let expected_closing = &opening_cash + &net_change;
        if self.exceeds_epsilon(&closing_cash, &expected_closing) {
            let difference = &closing_cash - &expected_closing;
            tracing::warn!(%opening_cash, %closing_cash, %net_change, %difference, "cash flow does not reconcile");
            return Err(LedgerError::CashFlowImbalance {
                opening_cash,
                closing_cash,
                bucket_total: net_change,
                difference,
            });
        }

        let [operating, investing, financing] = sections;
        tracing::debug!(%opening_cash, %closing_cash, %net_change, "cash flow generated");
        Ok(CashFlowStatement {
            period,
            cash_accounts: cash_accounts.iter().map(|a| a.code.clone()).collect(),
            opening_cash,
            closing_cash,
            operating,
            investing,
            financing,
            net_change,
        })
    }
}
