//! Account management functionality

use std::collections::HashMap;

use crate::ledger::chart::AccountDirectory;
use crate::traits::*;
use crate::types::*;

/// Account manager for handling chart of accounts operations
pub struct AccountManager<S: AccountStore> {
    pub(crate) storage: S,
}

impl<S: AccountStore> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Load the whole chart of accounts into a directory
    pub async fn load_directory(&self) -> LedgerResult<AccountDirectory> {
        AccountDirectory::from_accounts(self.storage.list_accounts(None).await?)
    }

    /// Create a new account under an optional parent code
    pub async fn create_account(
        &mut self,
        id: String,
        code: String,
        name: String,
        account_type: AccountType,
        parent_code: Option<String>,
    ) -> LedgerResult<Account> {
        // The directory checks code uniqueness and settles the level
        let mut directory = self.load_directory().await?;
        let account = directory
            .add_account(Account::new(id, code, name, account_type, parent_code))?
            .clone();

        self.storage.save_account(&account).await?;
        tracing::info!(
            account_id = %account.id,
            code = %account.code,
            account_type = %account.account_type,
            level = account.level,
            "account created"
        );

        Ok(account)
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        self.storage.get_account(account_id).await
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(&self, account_id: &str) -> LedgerResult<Account> {
        self.storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(None).await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        account_type: AccountType,
    ) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(Some(account_type)).await
    }

    /// Rename an account. Code, type and parent are fixed once created.
    pub async fn rename_account(&mut self, account_id: &str, name: String) -> LedgerResult<Account> {
        crate::utils::validation::validate_account_name(&name)?;
        let mut account = self.get_account_required(account_id).await?;
        account.name = name;
        account.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_account(&account).await?;
        Ok(account)
    }

    /// Stop new postings to an account; its history stays in the ledger
    pub async fn deactivate_account(&mut self, account_id: &str) -> LedgerResult<Account> {
        let mut directory = self.load_directory().await?;
        let account = directory.deactivate(account_id)?;
        self.storage.update_account(&account).await?;
        tracing::info!(account_id, code = %account.code, "account deactivated");
        Ok(account)
    }
}

/// Utility functions for working with accounts
pub mod utils {
    use super::*;

    /// (key, code, name, type, parent code)
    const STANDARD_CHART: &[(&str, &str, &str, AccountType, Option<&str>)] = &[
        ("cash_and_equivalents", "10", "Cash and Cash Equivalents", AccountType::Asset, None),
        ("cash", "101", "Cash", AccountType::Asset, Some("10")),
        ("petty_cash", "1011", "Petty Cash", AccountType::Asset, Some("101")),
        ("bank", "104", "Bank Accounts", AccountType::Asset, Some("10")),
        ("checking_account", "1041", "Checking Account", AccountType::Asset, Some("104")),
        ("receivables", "12", "Trade Receivables", AccountType::Asset, None),
        ("equipment", "33", "Property, Plant and Equipment", AccountType::Asset, None),
        ("taxes_payable", "40", "Taxes Payable", AccountType::Liability, None),
        ("sales_tax_payable", "40111", "Sales Tax Payable", AccountType::Liability, Some("40")),
        ("accounts_payable", "42", "Trade Payables", AccountType::Liability, None),
        ("loans_payable", "45", "Loans Payable", AccountType::Liability, None),
        ("capital", "50", "Share Capital", AccountType::Equity, None),
        ("retained_earnings", "59", "Retained Earnings", AccountType::Equity, None),
        ("cost_of_sales", "69", "Cost of Sales", AccountType::Expense, None),
        ("services_expense", "63", "Services Provided by Third Parties", AccountType::Expense, None),
        ("sales", "70", "Sales", AccountType::Income, None),
        ("sales_revenue", "7011", "Sales of Goods", AccountType::Income, Some("70")),
        ("other_income", "75", "Other Operating Income", AccountType::Income, None),
    ];

    /// Create a standard hierarchical chart of accounts for a small business.
    /// Account ids equal their codes; the map is keyed by a readable name.
    pub async fn create_standard_chart<S: AccountStore>(
        account_manager: &mut AccountManager<S>,
    ) -> LedgerResult<HashMap<String, Account>> {
        let mut accounts = HashMap::new();

        for (key, code, name, account_type, parent) in STANDARD_CHART {
            let account = account_manager
                .create_account(
                    code.to_string(),
                    code.to_string(),
                    name.to_string(),
                    *account_type,
                    parent.map(str::to_string),
                )
                .await?;
            accounts.insert(key.to_string(), account);
        }

        Ok(accounts)
    }
}
