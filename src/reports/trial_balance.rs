//! Trial balance

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::StatementAggregator;
use crate::ledger::chart::resolve_nature;
use crate::types::*;

/// Account line of a trial balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account_id: String,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    /// Inactive accounts appear only when they moved in the period
    pub active: bool,
    pub opening_balance: BigDecimal,
    pub period_debit: BigDecimal,
    pub period_credit: BigDecimal,
    pub closing_balance: BigDecimal,
    /// Closing balance presented in the debit column
    pub debit_balance: BigDecimal,
    /// Closing balance presented in the credit column
    pub credit_balance: BigDecimal,
}

/// Movement totals per account over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub period: Period,
    pub rows: Vec<TrialBalanceRow>,
    /// Sum of the period debit column
    pub total_debit: BigDecimal,
    /// Sum of the period credit column
    pub total_credit: BigDecimal,
    pub total_debit_balance: BigDecimal,
    pub total_credit_balance: BigDecimal,
}

impl<'a> StatementAggregator<'a> {
    /// One row per account with movement in `period`.
    ///
    /// Fails with `TrialBalanceImbalance` when the debit and credit columns
    /// differ by more than the rounding accepted on each entry explains.
    pub fn trial_balance(
        &self,
        period: Period,
        entries: &[JournalEntry],
    ) -> LedgerResult<TrialBalance> {
        self.check_orphans(entries)?;

        let zero = BigDecimal::from(0);
        let mut rows = Vec::new();
        for ledger in self.ledgers(&AccountType::ALL, period, entries)? {
            if ledger.total_debit == zero && ledger.total_credit == zero {
                continue;
            }
            let (debit_balance, credit_balance) =
                resolve_nature(ledger.account.account_type).columns(&ledger.closing_balance);
            rows.push(TrialBalanceRow {
                account_id: ledger.account.id.clone(),
                code: ledger.account.code.clone(),
                name: ledger.account.name.clone(),
                account_type: ledger.account.account_type,
                active: ledger.account.active,
                opening_balance: ledger.opening_balance,
                period_debit: ledger.total_debit,
                period_credit: ledger.total_credit,
                closing_balance: ledger.closing_balance,
                debit_balance,
                credit_balance,
            });
        }

        let total_debit: BigDecimal = rows.iter().map(|r| &r.period_debit).sum();
        let total_credit: BigDecimal = rows.iter().map(|r| &r.period_credit).sum();
        let difference = &total_debit - &total_credit;
        if self.exceeds_drift(&difference, period, entries) {
            tracing::warn!(%total_debit, %total_credit, %difference, "trial balance does not balance");
            return Err(LedgerError::TrialBalanceImbalance {
                total_debit,
                total_credit,
                difference,
            });
        }

        tracing::debug!(rows = rows.len(), %total_debit, "trial balance generated");
        Ok(TrialBalance {
            period,
            total_debit_balance: rows.iter().map(|r| &r.debit_balance).sum(),
            total_credit_balance: rows.iter().map(|r| &r.credit_balance).sum(),
            rows,
            total_debit,
            total_credit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[test]
    fn test_rows_only_for_accounts_that_moved() {
        let directory = directory();
        let trial_balance = StatementAggregator::new(&directory)
            .trial_balance(march(), &entries())
            .unwrap();

        let codes: Vec<&str> = trial_balance.rows.iter().map(|r| r.code.as_str()).collect();
        // 501 only moved in January
        assert_eq!(
            codes,
            vec!["1011", "1041", "1212", "3361", "40111", "451", "631", "691", "7011", "759"]
        );
        assert_eq!(trial_balance.total_debit, BigDecimal::from(11100));
        assert_eq!(trial_balance.total_debit, trial_balance.total_credit);

        let bank = &trial_balance.rows[1];
        assert_eq!(bank.opening_balance, BigDecimal::from(10000));
        assert_eq!(bank.closing_balance, BigDecimal::from(10150));
        assert_eq!(bank.debit_balance, BigDecimal::from(10150));
    }

    #[test]
    fn test_whole_history_balances_columns() {
        let directory = directory();
        let trial_balance = StatementAggregator::new(&directory)
            .trial_balance(Period::all(), &entries())
            .unwrap();
        assert_eq!(
            trial_balance.total_debit_balance,
            trial_balance.total_credit_balance
        );
    }

    #[test]
    fn test_imbalance_is_reported_not_corrected() {
        let directory = directory();
        let mut entries = entries();
        // Bypasses the validator, as corrupted storage would
        entries.push(entry("9", date(3, 30), &[("1011", 100, 0), ("7011", 0, 90)]));

        let err = StatementAggregator::new(&directory)
            .trial_balance(march(), &entries)
            .unwrap_err();
        match err {
            LedgerError::TrialBalanceImbalance { difference, .. } => {
                assert_eq!(difference, BigDecimal::from(10))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rounding_accepted_per_entry_does_not_break_the_columns() {
        let directory = directory();
        let mut entries = entries();
        entries.extend(rounded_sales());

        let trial_balance = StatementAggregator::new(&directory)
            .trial_balance(march(), &entries)
            .unwrap();
        assert_eq!(
            &trial_balance.total_debit - &trial_balance.total_credit,
            "0.015".parse::<BigDecimal>().unwrap()
        );

        // Real corruption on top of the rounding is still refused
        entries.push(entry("9", date(3, 30), &[("1011", 100, 0), ("7011", 0, 90)]));
        assert!(matches!(
            StatementAggregator::new(&directory).trial_balance(march(), &entries),
            Err(LedgerError::TrialBalanceImbalance { .. })
        ));
    }

    #[test]
    fn test_deactivated_account_keeps_its_history() {
        let mut directory = directory();
        directory.deactivate("759").unwrap();
        let trial_balance = StatementAggregator::new(&directory)
            .trial_balance(march(), &entries())
            .unwrap();

        let other_income = trial_balance
            .rows
            .iter()
            .find(|r| r.code == "759")
            .unwrap();
        assert!(!other_income.active);
        assert_eq!(trial_balance.total_debit, trial_balance.total_credit);
    }
}
