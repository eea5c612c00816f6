//! Account directory: the chart of accounts held as an arena keyed by id
//!
//! Parent links are account codes resolved by lookup, never pointers. The
//! directory is also the only place where the debit/credit sign convention
//! of each account type is defined, see [`resolve_nature`].

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::types::*;
use crate::utils::validation::{validate_account_code, validate_account_name};

/// Side on which an account's balance grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nature {
    pub increases_on_debit: bool,
}

impl Nature {
    /// Sign-adjusted effect of one movement: `debit - credit` for debit-natured
    /// accounts, `credit - debit` otherwise
    pub fn signed(&self, debit: &BigDecimal, credit: &BigDecimal) -> BigDecimal {
        if self.increases_on_debit {
            debit - credit
        } else {
            credit - debit
        }
    }

    /// Present a signed balance in the debit or credit column
    pub fn columns(&self, balance: &BigDecimal) -> (BigDecimal, BigDecimal) {
        let zero = BigDecimal::from(0);
        let on_natural_side = *balance >= zero;
        match (self.increases_on_debit, on_natural_side) {
            (true, true) => (balance.clone(), zero),
            (true, false) => (zero, balance.abs()),
            (false, true) => (zero, balance.clone()),
            (false, false) => (balance.abs(), zero),
        }
    }
}

/// ASSET and EXPENSE accounts increase on debit; LIABILITY, EQUITY and
/// INCOME accounts increase on credit.
pub fn resolve_nature(account_type: AccountType) -> Nature {
    let increases_on_debit = match account_type {
        AccountType::Asset | AccountType::Expense => true,
        AccountType::Liability | AccountType::Equity | AccountType::Income => false,
    };
    Nature { increases_on_debit }
}

/// In-memory chart of accounts for one company
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    accounts: HashMap<String, Account>,
    /// code -> id, kept ordered for listings
    by_code: BTreeMap<String, String>,
}

impl AccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from stored accounts, checking code uniqueness,
    /// parent resolution, level consistency and acyclicity
    pub fn from_accounts(accounts: Vec<Account>) -> LedgerResult<Self> {
        let mut directory = Self::new();
        for account in accounts {
            directory.insert_unchecked_hierarchy(account)?;
        }
        directory.verify_hierarchy()?;
        Ok(directory)
    }

    /// Add a new account, settling its level from the parent.
    pub fn add_account(&mut self, mut account: Account) -> LedgerResult<&Account> {
        validate_account_code(&account.code)?;
        validate_account_name(&account.name)?;

        account.level = match &account.parent_code {
            Some(parent_code) => {
                let parent = self.get_by_code(parent_code).ok_or_else(|| {
                    LedgerError::Validation(format!(
                        "Parent account '{}' does not exist",
                        parent_code
                    ))
                })?;
                parent.level + 1
            }
            None => 1,
        };

        let id = account.id.clone();
        self.insert_unchecked_hierarchy(account)?;
        self.get_account(&id)
    }

    fn insert_unchecked_hierarchy(&mut self, account: Account) -> LedgerResult<()> {
        if account.id.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Account ID cannot be empty".to_string(),
            ));
        }
        if self.accounts.contains_key(&account.id) {
            return Err(LedgerError::Validation(format!(
                "Account with ID '{}' already exists",
                account.id
            )));
        }
        if self.by_code.contains_key(&account.code) {
            return Err(LedgerError::Validation(format!(
                "Account code '{}' is already in use",
                account.code
            )));
        }
        self.by_code.insert(account.code.clone(), account.id.clone());
        self.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    fn verify_hierarchy(&self) -> LedgerResult<()> {
        for account in self.accounts.values() {
            let mut seen = HashSet::new();
            let mut depth = 1;
            let mut current = account;
            while let Some(parent_code) = &current.parent_code {
                if !seen.insert(current.code.as_str()) {
                    return Err(LedgerError::Validation(format!(
                        "Account hierarchy has a cycle through '{}'",
                        current.code
                    )));
                }
                current = self.get_by_code(parent_code).ok_or_else(|| {
                    LedgerError::Validation(format!(
                        "Account '{}' references missing parent '{}'",
                        account.code, parent_code
                    ))
                })?;
                depth += 1;
            }
            if account.level != depth {
                return Err(LedgerError::Validation(format!(
                    "Account '{}' has level {} but sits at depth {}",
                    account.code, account.level, depth
                )));
            }
        }
        Ok(())
    }

    /// Look an account up by id
    pub fn get_account(&self, account_id: &str) -> LedgerResult<&Account> {
        self.accounts
            .get(account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    pub fn get_by_code(&self, code: &str) -> Option<&Account> {
        self.by_code.get(code).and_then(|id| self.accounts.get(id))
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.accounts.contains_key(account_id)
    }

    /// Whether the account exists and accepts postings
    pub fn is_active(&self, account_id: &str) -> bool {
        self.accounts.get(account_id).is_some_and(|a| a.active)
    }

    /// Active accounts ordered by code, optionally of one type
    pub fn list_active(&self, type_filter: Option<AccountType>) -> Vec<&Account> {
        self.iter()
            .filter(|a| a.active && type_filter.is_none_or(|t| a.account_type == t))
            .collect()
    }

    /// Every account ordered by code
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.by_code.values().filter_map(|id| self.accounts.get(id))
    }

    /// Direct children of the account with `parent_code`
    pub fn children(&self, parent_code: &str) -> Vec<&Account> {
        self.iter()
            .filter(|a| a.parent_code.as_deref() == Some(parent_code))
            .collect()
    }

    /// Chain from the root down to the account
    pub fn path(&self, account_id: &str) -> LedgerResult<Vec<&Account>> {
        let mut current = self.get_account(account_id)?;
        let mut path = vec![current];
        while let Some(parent_code) = current.parent_code.as_deref() {
            if path.len() > self.accounts.len() {
                return Err(LedgerError::Validation(format!(
                    "Account hierarchy has a cycle through '{}'",
                    parent_code
                )));
            }
            current = self.get_by_code(parent_code).ok_or_else(|| {
                LedgerError::Validation(format!("Missing parent account '{}'", parent_code))
            })?;
            path.push(current);
        }
        path.reverse();
        Ok(path)
    }

    /// Sign convention of the account
    pub fn nature_of(&self, account_id: &str) -> LedgerResult<Nature> {
        Ok(resolve_nature(self.get_account(account_id)?.account_type))
    }

    /// Mark an account inactive; history is kept.
    pub fn deactivate(&mut self, account_id: &str) -> LedgerResult<Account> {
        let account = self
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        account.active = false;
        account.updated_at = chrono::Utc::now().naive_utc();
        Ok(account.clone())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
