//! Main ledger orchestrator that coordinates accounts, entries, reports and
//! bank reconciliation over one storage backend

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::ledger::chart::AccountDirectory;
use crate::ledger::engine::LedgerEngine;
use crate::ledger::journal::JournalManager;
use crate::ledger::AccountManager;
use crate::reconciliation::{ReconciliationLink, ReconciliationMatcher, ReconciliationSummary};
use crate::reports::*;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_positive_amount, within_epsilon};

/// Main ledger system that orchestrates all accounting operations
pub struct Ledger<S: LedgerStorage> {
    config: EngineConfig,
    account_manager: AccountManager<S>,
    journal_manager: JournalManager<S>,
    matcher: ReconciliationMatcher<S>,
}

impl<S: LedgerStorage> Ledger<S> {
    /// Create a new ledger with the given storage backend
    pub fn new(storage: S, config: EngineConfig) -> Self {
        Self::with_policies(storage, config, Vec::new())
    }

    /// Create a new ledger running extra entry policies on confirmation
    pub fn with_policies(
        storage: S,
        config: EngineConfig,
        policies: Vec<Box<dyn EntryPolicy>>,
    ) -> Self {
        Self {
            account_manager: AccountManager::new(storage.clone()),
            journal_manager: JournalManager::with_policies(
                storage.clone(),
                config.epsilon.clone(),
                policies,
            ),
            matcher: ReconciliationMatcher::from_config(storage, &config),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // Account operations
    /// Create a new account
    pub async fn create_account(
        &mut self,
        id: String,
        code: String,
        name: String,
        account_type: AccountType,
        parent_code: Option<String>,
    ) -> LedgerResult<Account> {
        self.account_manager
            .create_account(id, code, name, account_type, parent_code)
            .await
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        self.account_manager.get_account(account_id).await
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.account_manager.list_accounts().await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        account_type: AccountType,
    ) -> LedgerResult<Vec<Account>> {
        self.account_manager
            .list_accounts_by_type(account_type)
            .await
    }

    pub async fn rename_account(&mut self, account_id: &str, name: String) -> LedgerResult<Account> {
        self.account_manager.rename_account(account_id, name).await
    }

    pub async fn deactivate_account(&mut self, account_id: &str) -> LedgerResult<Account> {
        self.account_manager.deactivate_account(account_id).await
    }

    /// Snapshot of the chart of accounts
    pub async fn directory(&self) -> LedgerResult<AccountDirectory> {
        self.account_manager.load_directory().await
    }

    /// Setup a standard chart of accounts for small business
    pub async fn setup_standard_chart_of_accounts(
        &mut self,
    ) -> LedgerResult<HashMap<String, Account>> {
        crate::ledger::account::utils::create_standard_chart(&mut self.account_manager).await
    }

    // Journal operations
    /// Record an entry as DRAFT or CONFIRMED, validating CONFIRMED ones
    pub async fn record_entry(&mut self, entry: JournalEntry) -> LedgerResult<JournalEntry> {
        let directory = self.directory().await?;
        self.journal_manager.record_entry(&directory, entry).await
    }

    pub async fn save_draft(&mut self, entry: JournalEntry) -> LedgerResult<JournalEntry> {
        self.journal_manager.save_draft(entry).await
    }

    pub async fn update_draft(&mut self, entry: &JournalEntry) -> LedgerResult<()> {
        self.journal_manager.update_draft(entry).await
    }

    pub async fn confirm_entry(&mut self, entry_id: &str) -> LedgerResult<JournalEntry> {
        let directory = self.directory().await?;
        self.journal_manager.confirm_entry(&directory, entry_id).await
    }

    pub async fn void_entry(&mut self, entry_id: &str) -> LedgerResult<JournalEntry> {
        self.journal_manager.void_entry(entry_id).await
    }

    /// Cancel a CONFIRMED entry with a new entry swapping debit and credit
    pub async fn reverse_entry(
        &mut self,
        entry_id: &str,
        number: String,
        date: NaiveDate,
    ) -> LedgerResult<JournalEntry> {
        let directory = self.directory().await?;
        self.journal_manager
            .reverse_entry(&directory, entry_id, number, date)
            .await
    }

    pub async fn get_entry(&self, entry_id: &str) -> LedgerResult<Option<JournalEntry>> {
        self.journal_manager.get_entry(entry_id).await
    }

    pub async fn find_entry_by_number(&self, number: &str) -> LedgerResult<Option<JournalEntry>> {
        self.journal_manager.find_by_number(number).await
    }

    pub async fn list_entries(&self, status: Option<EntryStatus>) -> LedgerResult<Vec<JournalEntry>> {
        self.journal_manager.list_entries(status).await
    }

    pub async fn next_entry_number(&self) -> LedgerResult<String> {
        self.journal_manager.next_entry_number().await
    }

    // Ledger queries and reports
    /// General ledger of one account
    pub async fn account_ledger(&self, account_id: &str, period: Period) -> LedgerResult<AccountLedger> {
        let directory = self.directory().await?;
        let entries = self
            .journal_manager
            .list_confirmed(Some(account_id), period.cumulative())
            .await?;
        LedgerEngine::new(&directory).account_ledger(account_id, period, &entries)
    }

    /// Get an account's balance at the end of `period`
    pub async fn account_balance(&self, account_id: &str, period: Period) -> LedgerResult<BigDecimal> {
        Ok(self.account_ledger(account_id, period).await?.closing_balance)
    }

    pub async fn trial_balance(&self, period: Period) -> LedgerResult<TrialBalance> {
        let (directory, entries) = self.report_inputs(period).await?;
        self.aggregator(&directory).trial_balance(period, &entries)
    }

    pub async fn balance_sheet(
        &self,
        period: Period,
        classifier: &dyn AccountClassifier,
    ) -> LedgerResult<BalanceSheet> {
        let (directory, entries) = self.report_inputs(period).await?;
        self.aggregator(&directory)
            .balance_sheet(period, &entries, classifier)
    }

    pub async fn income_statement(
        &self,
        period: Period,
        classifier: &dyn AccountClassifier,
    ) -> LedgerResult<IncomeStatement> {
        let (directory, entries) = self.report_inputs(period).await?;
        self.aggregator(&directory)
            .income_statement(period, &entries, classifier)
    }

    pub async fn income_statement_with_bands(
        &self,
        period: Period,
        classifier: &dyn AccountClassifier,
        bands: &dyn IncomeBandClassifier,
    ) -> LedgerResult<IncomeStatement> {
        let (directory, entries) = self.report_inputs(period).await?;
        self.aggregator(&directory)
            .income_statement_with_bands(period, &entries, classifier, bands)
    }

    pub async fn cash_flow(
        &self,
        period: Period,
        is_cash: &dyn Fn(&Account) -> bool,
        classifier: &dyn CashFlowClassifier,
    ) -> LedgerResult<CashFlowStatement> {
        let (directory, entries) = self.report_inputs(period).await?;
        self.aggregator(&directory)
            .cash_flow(period, &entries, is_cash, classifier)
    }

    fn aggregator<'a>(&self, directory: &'a AccountDirectory) -> StatementAggregator<'a> {
        StatementAggregator::with_config(directory, &self.config)
    }

    /// Directory plus every confirmed entry up to the end of `period`
    async fn report_inputs(
        &self,
        period: Period,
    ) -> LedgerResult<(AccountDirectory, Vec<JournalEntry>)> {
        let directory = self.directory().await?;
        let entries = self
            .journal_manager
            .list_confirmed(None, period.cumulative())
            .await?;
        Ok((directory, entries))
    }

    // Bank reconciliation
    pub fn reconciliation(&self) -> &ReconciliationMatcher<S> {
        &self.matcher
    }

    /// Store an imported bank statement line against an existing ledger account
    pub async fn import_bank_movement(&self, movement: &BankMovement) -> LedgerResult<()> {
        validate_positive_amount(&movement.amount)?;
        self.directory().await?.get_account(&movement.account_id)?;
        self.matcher.store().save_bank_movement(movement).await?;
        tracing::info!(bank_movement_id = %movement.id, amount = %movement.amount, "bank movement imported");
        Ok(())
    }

    pub async fn match_movements(
        &self,
        bank_movement_id: &str,
        movement_id: &str,
    ) -> LedgerResult<ReconciliationLink> {
        self.matcher
            .match_movements(bank_movement_id, movement_id)
            .await
    }

    pub async fn revert_reconciliation(
        &self,
        bank_movement_id: &str,
        movement_id: &str,
    ) -> LedgerResult<()> {
        self.matcher.revert(bank_movement_id, movement_id).await
    }

    pub async fn reconciliation_summary(
        &self,
        bank_account_id: &str,
    ) -> LedgerResult<ReconciliationSummary> {
        self.matcher.summary(bank_account_id).await
    }

    /// Validate the integrity of the ledger up to the end of `period`.
    ///
    /// Problems are collected into the report instead of failing the call;
    /// only storage errors are returned as `Err`.
    pub async fn validate_integrity(&self, period: Period) -> LedgerResult<LedgerIntegrityReport> {
        let (directory, entries) = self.report_inputs(period).await?;
        let aggregator = self.aggregator(&directory);
        let mut report = LedgerIntegrityReport::new(period.end);

        if let Err(err) = aggregator.check_orphans(&entries) {
            report.issues.push(format!("Orphan movement: {}", err));
        }

        for entry in &entries {
            let total_debit = entry.total_debit();
            let total_credit = entry.total_credit();
            if !within_epsilon(&total_debit, &total_credit, &self.config.epsilon) {
                report.unbalanced_entries.push(entry.number.clone());
                report.issues.push(format!(
                    "Entry '{}' is not balanced: debits = {}, credits = {}",
                    entry.number, total_debit, total_credit
                ));
            }
        }

        match aggregator.trial_balance(period.cumulative(), &entries) {
            Ok(trial_balance) => {
                report.trial_balance_total_debit = Some(trial_balance.total_debit_balance);
                report.trial_balance_total_credit = Some(trial_balance.total_credit_balance);
            }
            Err(err) => report.issues.push(err.to_string()),
        }

        let by_type = |account: &Account| account.account_type.to_string();
        match aggregator.balance_sheet(period, &entries, &by_type) {
            Ok(sheet) => {
                report.balance_sheet_total_liabilities_equity =
                    Some(sheet.total_liabilities_and_equity());
                report.balance_sheet_total_assets = Some(sheet.total_assets);
            }
            Err(err) => report.issues.push(err.to_string()),
        }

        report.is_valid = report.issues.is_empty();
        if report.is_valid {
            tracing::debug!(as_of = ?report.as_of, "ledger integrity verified");
        } else {
            tracing::warn!(as_of = ?report.as_of, issues = report.issues.len(), "ledger integrity issues found");
        }
        Ok(report)
    }
}

/// Report on ledger integrity and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerIntegrityReport {
    pub as_of: Option<NaiveDate>,
    pub is_valid: bool,
    pub issues: Vec<String>,
    /// Numbers of confirmed entries whose debits and credits differ
    pub unbalanced_entries: Vec<String>,
    pub trial_balance_total_debit: Option<BigDecimal>,
    pub trial_balance_total_credit: Option<BigDecimal>,
    pub balance_sheet_total_assets: Option<BigDecimal>,
    pub balance_sheet_total_liabilities_equity: Option<BigDecimal>,
}

impl LedgerIntegrityReport {
    fn new(as_of: Option<NaiveDate>) -> Self {
        Self {
            as_of,
            is_valid: false,
            issues: Vec::new(),
            unbalanced_entries: Vec::new(),
            trial_balance_total_debit: None,
            trial_balance_total_credit: None,
            balance_sheet_total_assets: None,
            balance_sheet_total_liabilities_equity: None,
        }
    }
}
