//! Balance sheet and income statement

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{group_rows, row_of, total_of, StatementAggregator, StatementGroup, StatementRow};
use crate::traits::{AccountClassifier, IncomeBandClassifier};
use crate::types::*;

use super::classification::IncomeBand;

/// Position at the end of a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// `None` when computed over the whole history
    pub as_of: Option<NaiveDate>,
    pub assets: Vec<StatementGroup>,
    pub liabilities: Vec<StatementGroup>,
    /// Includes the unclosed period result as a synthetic row
    pub equity: Vec<StatementGroup>,
    pub total_assets: BigDecimal,
    pub total_liabilities: BigDecimal,
    pub total_equity: BigDecimal,
    /// Income minus expense not yet closed into equity
    pub current_result: BigDecimal,
}

impl BalanceSheet {
    pub fn total_liabilities_and_equity(&self) -> BigDecimal {
        &self.total_liabilities + &self.total_equity
    }
}

/// Income statement decomposed into configured bands.
///
/// Every figure is a signed contribution to the result: income adds, expense
/// subtracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeBands {
    pub sales: BigDecimal,
    pub cost_of_sales: BigDecimal,
    pub gross_profit: BigDecimal,
    pub operating: BigDecimal,
    pub operating_result: BigDecimal,
    pub other: BigDecimal,
    /// `operating_result + other`
    pub net_result: BigDecimal,
}

/// Result of a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub period: Period,
    pub income: Vec<StatementGroup>,
    pub expenses: Vec<StatementGroup>,
    pub total_income: BigDecimal,
    pub total_expense: BigDecimal,
    /// `total_income - total_expense`
    pub net_income: BigDecimal,
    pub bands: Option<IncomeBands>,
}

impl<'a> StatementAggregator<'a> {
    /// Balances of asset, liability and equity accounts at the end of `period`,
    /// grouped by `classifier`. Zero-balance accounts are left out.
    ///
    /// Income and expense are not closed into equity by the engine, so their
    /// cumulative result is shown as one extra equity row. Fails with
    /// `BalanceSheetImbalance` when assets differ from liabilities plus equity.
    pub fn balance_sheet(
        &self,
        period: Period,
        entries: &[JournalEntry],
        classifier: &dyn AccountClassifier,
    ) -> LedgerResult<BalanceSheet> {
        self.check_orphans(entries)?;
        let period = period.cumulative();
        let zero = BigDecimal::from(0);

        let mut assets = Vec::new();
        let mut liabilities = Vec::new();
        let mut equity = Vec::new();
        for ledger in self.ledgers(
            &[AccountType::Asset, AccountType::Liability, AccountType::Equity],
            period,
            entries,
        )? {
            if ledger.closing_balance == zero {
                continue;
            }
            let label = classifier.group_label(&ledger.account);
            let row = row_of(&ledger.account, ledger.closing_balance);
            match ledger.account.account_type {
                AccountType::Asset => assets.push((label, row)),
                AccountType::Liability => liabilities.push((label, row)),
                _ => equity.push((label, row)),
            }
        }

        let (total_income, total_expense) = self.result_totals(period, entries)?;
        let current_result = total_income - total_expense;
        if current_result != zero {
            equity.push((
                self.net_income_label.clone(),
                StatementRow {
                    account_id: None,
                    code: String::new(),
                    name: self.net_income_label.clone(),
                    balance: current_result.clone(),
                },
            ));
        }

        let assets = group_rows(assets);
        let liabilities = group_rows(liabilities);
        let equity = group_rows(equity);
        let sheet = BalanceSheet {
            as_of: period.end,
            total_assets: total_of(&assets),
            total_liabilities: total_of(&liabilities),
            total_equity: total_of(&equity),
            assets,
            liabilities,
            equity,
            current_result,
        };

        let total_liabilities_and_equity = sheet.total_liabilities_and_equity();
        let difference = &sheet.total_assets - &total_liabilities_and_equity;
        if self.exceeds_drift(&difference, period, entries) {
            tracing::warn!(
                total_assets = %sheet.total_assets,
                %total_liabilities_and_equity,
                %difference,
                "balance sheet does not balance"
            );
            return Err(LedgerError::BalanceSheetImbalance {
                total_assets: sheet.total_assets,
                total_liabilities_and_equity,
                difference,
            });
        }

        tracing::debug!(as_of = ?sheet.as_of, total_assets = %sheet.total_assets, "balance sheet generated");
        Ok(sheet)
    }

    /// Income and expense of `period`, grouped by `classifier`
    pub fn income_statement(
        &self,
        period: Period,
        entries: &[JournalEntry],
        classifier: &dyn AccountClassifier,
    ) -> LedgerResult<IncomeStatement> {
        self.check_orphans(entries)?;
        let zero = BigDecimal::from(0);

        let mut income = Vec::new();
        let mut expenses = Vec::new();
        for ledger in self.ledgers(&[AccountType::Income, AccountType::Expense], period, entries)? {
            let change = ledger.net_change();
            if change == zero && !ledger.has_movements() {
                continue;
            }
            let label = classifier.group_label(&ledger.account);
            let row = row_of(&ledger.account, change);
            match ledger.account.account_type {
                AccountType::Income => income.push((label, row)),
                _ => expenses.push((label, row)),
            }
        }

        let income = group_rows(income);
        let expenses = group_rows(expenses);
        let total_income = total_of(&income);
        let total_expense = total_of(&expenses);
        let net_income = &total_income - &total_expense;

        tracing::debug!(%total_income, %total_expense, %net_income, "income statement generated");
        Ok(IncomeStatement {
            period,
            income,
            expenses,
            total_income,
            total_expense,
            net_income,
            bands: None,
        })
    }

    /// Income statement with gross profit and operating result bands.
    ///
    /// Fails with `IncomeStatementImbalance` when the bands do not add up to
    /// the net income.
    pub fn income_statement_with_bands(
        &self,
        period: Period,
        entries: &[JournalEntry],
        classifier: &dyn AccountClassifier,
        bands: &dyn IncomeBandClassifier,
    ) -> LedgerResult<IncomeStatement> {
        let mut statement = self.income_statement(period, entries, classifier)?;

        let zero = BigDecimal::from(0);
        let mut sales = zero.clone();
        let mut cost_of_sales = zero.clone();
        let mut operating = zero.clone();
        let mut other = zero;
        let sides = [(&statement.income, 1), (&statement.expenses, -1)];
        for (groups, sign) in sides {
            for row in groups.iter().flat_map(|g| g.rows.iter()) {
                let Some(account_id) = &row.account_id else {
                    continue;
                };
                let account = self.directory().get_account(account_id)?;
                let contribution = &row.balance * BigDecimal::from(sign);
                match bands.band(account) {
                    IncomeBand::Sales => sales += contribution,
                    IncomeBand::CostOfSales => cost_of_sales += contribution,
                    IncomeBand::Operating => operating += contribution,
                    IncomeBand::Other => other += contribution,
                }
            }
        }

        let gross_profit = &sales + &cost_of_sales;
        let operating_result = &gross_profit + &operating;
        let net_result = &operating_result + &other;
        if self.exceeds_epsilon(&statement.net_income, &net_result) {
            let difference = &statement.net_income - &net_result;
            tracing::warn!(net_income = %statement.net_income, %net_result, %difference, "income bands do not add up");
            return Err(LedgerError::IncomeStatementImbalance {
                net_income: statement.net_income,
                band_total: net_result,
                difference,
            });
        }

        statement.bands = Some(IncomeBands {
            sales,
            cost_of_sales,
            gross_profit,
            operating,
            operating_result,
            other,
            net_result,
        });
        Ok(statement)
    }

    /// (income, expense) accumulated over `period`
    fn result_totals(
        &self,
        period: Period,
        entries: &[JournalEntry],
    ) -> LedgerResult<(BigDecimal, BigDecimal)> {
        let mut income = BigDecimal::from(0);
        let mut expense = BigDecimal::from(0);
        for ledger in self.ledgers(&[AccountType::Income, AccountType::Expense], period, entries)? {
            match ledger.account.account_type {
                AccountType::Income => income += ledger.closing_balance,
                _ => expense += ledger.closing_balance,
            }
        }
        Ok((income, expense))
    }
}
