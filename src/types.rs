//! Core types and data structures for the bookkeeping engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Assets - what the business owns (Cash, Banks, Receivables, Equipment, etc.)
    Asset,
    /// Liabilities - what the business owes (Loans, Accounts Payable, Taxes, etc.)
    Liability,
    /// Equity - owner's interest in the business (Capital, Retained Earnings, etc.)
    Equity,
    /// Income/Revenue - money earned by the business
    Income,
    /// Expenses - costs incurred by the business
    Expense,
}

impl AccountType {
    /// Every account type, in statement order
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Income,
        AccountType::Expense,
    ];

    /// Whether accounts of this type are reported on the balance sheet
    pub fn is_balance_sheet(&self) -> bool {
        matches!(
            self,
            AccountType::Asset | AccountType::Liability | AccountType::Equity
        )
    }

    /// Whether accounts of this type are reported on the income statement
    pub fn is_income_statement(&self) -> bool {
        !self.is_balance_sheet()
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountType::Asset => "ASSET",
            AccountType::Liability => "LIABILITY",
            AccountType::Equity => "EQUITY",
            AccountType::Income => "INCOME",
            AccountType::Expense => "EXPENSE",
        };
        f.write_str(label)
    }
}

/// A node of the chart of accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account
    pub id: String,
    /// Hierarchical code, unique within a company (e.g. `1011`)
    pub code: String,
    /// Human-readable account name
    pub name: String,
    /// Type of account (Asset, Liability, etc.)
    pub account_type: AccountType,
    /// Depth in the hierarchy, root accounts are level 1
    pub level: u32,
    /// Code of the parent account, resolved by lookup
    pub parent_code: Option<String>,
    /// Inactive accounts keep their history but accept no new postings
    pub active: bool,
    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// When the account was created
    pub created_at: NaiveDateTime,
    /// When the account was last updated
    pub updated_at: NaiveDateTime,
}

impl Account {
    /// Create a new active account. The level is settled by the account directory.
    pub fn new(
        id: String,
        code: String,
        name: String,
        account_type: AccountType,
        parent_code: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            code,
            name,
            account_type,
            level: 1,
            parent_code,
            active: true,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lifecycle of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Draft,
    Confirmed,
    Void,
}

impl EntryStatus {
    /// Whether an entry may move from `self` to `next`
    pub fn can_transition_to(&self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (EntryStatus::Draft, EntryStatus::Confirmed)
                | (EntryStatus::Draft, EntryStatus::Void)
                | (EntryStatus::Confirmed, EntryStatus::Void)
        )
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryStatus::Draft => "DRAFT",
            EntryStatus::Confirmed => "CONFIRMED",
            EntryStatus::Void => "VOID",
        };
        f.write_str(label)
    }
}

/// Reconciliation state of a bank or accounting movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationState {
    Pending,
    Reconciled,
}

/// One debit-or-credit line of a journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Unique identifier, referenced by bank reconciliation
    pub id: String,
    /// Account being affected
    pub account_id: String,
    /// Debit amount, zero when the movement is a credit
    pub debit: BigDecimal,
    /// Credit amount, zero when the movement is a debit
    pub credit: BigDecimal,
    /// Optional description for this specific line
    pub description: Option<String>,
    /// Set while the movement is paired with a bank movement
    #[serde(default)]
    pub reconciled: bool,
    /// Counterpart bank movement while reconciled
    #[serde(default)]
    pub linked_bank_movement_id: Option<String>,
}

impl Movement {
    /// Create a new movement with a fresh id
    pub fn new(
        account_id: String,
        debit: BigDecimal,
        credit: BigDecimal,
        description: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id,
            debit,
            credit,
            description,
            reconciled: false,
            linked_bank_movement_id: None,
        }
    }

    /// Create a debit movement
    pub fn debit(account_id: String, amount: BigDecimal, description: Option<String>) -> Self {
        Self::new(account_id, amount, BigDecimal::from(0), description)
    }

    /// Create a credit movement
    pub fn credit(account_id: String, amount: BigDecimal, description: Option<String>) -> Self {
        Self::new(account_id, BigDecimal::from(0), amount, description)
    }

    /// Whether either side carries a non-zero amount
    pub fn has_amount(&self) -> bool {
        self.debit != BigDecimal::from(0) || self.credit != BigDecimal::from(0)
    }

    /// The unsigned amount of the side that is set
    pub fn amount(&self) -> &BigDecimal {
        if self.debit > BigDecimal::from(0) {
            &self.debit
        } else {
            &self.credit
        }
    }

    /// `debit - credit`, positive when money flows into an asset account
    pub fn debit_minus_credit(&self) -> BigDecimal {
        &self.debit - &self.credit
    }

    pub fn reconciliation_state(&self) -> ReconciliationState {
        if self.reconciled {
            ReconciliationState::Reconciled
        } else {
            ReconciliationState::Pending
        }
    }
}

/// A dated, described set of balanced debit/credit movements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier for the entry
    pub id: String,
    /// Display number, unique per company
    pub number: String,
    /// Accounting date of the entry
    pub date: NaiveDate,
    /// Description of the entry
    pub description: String,
    /// Optional reference (invoice number, check number, etc.)
    pub reference: Option<String>,
    /// Lifecycle status, only CONFIRMED entries reach the ledger
    pub status: EntryStatus,
    /// Ordered movements of the entry
    pub movements: Vec<Movement>,
    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// When the entry was created
    pub created_at: NaiveDateTime,
    /// When the entry was last updated
    pub updated_at: NaiveDateTime,
}

impl JournalEntry {
    /// Create a new draft entry without movements
    pub fn new(
        id: String,
        number: String,
        date: NaiveDate,
        description: String,
        reference: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            number,
            date,
            description,
            reference,
            status: EntryStatus::Draft,
            movements: Vec::new(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a movement to the entry
    pub fn add_movement(&mut self, movement: Movement) {
        self.movements.push(movement);
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Sum of the debit column
    pub fn total_debit(&self) -> BigDecimal {
        self.movements.iter().map(|m| &m.debit).sum()
    }

    /// Sum of the credit column
    pub fn total_credit(&self) -> BigDecimal {
        self.movements.iter().map(|m| &m.credit).sum()
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == EntryStatus::Confirmed
    }

    /// Whether any movement posts to the given account
    pub fn touches(&self, account_id: &str) -> bool {
        self.movements.iter().any(|m| m.account_id == account_id)
    }

    pub fn movement(&self, movement_id: &str) -> Option<&Movement> {
        self.movements.iter().find(|m| m.id == movement_id)
    }
}

/// Direction of a bank statement line, seen from the bank account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankDirection {
    /// Deposit into the bank account
    CreditToAccount,
    /// Withdrawal from the bank account
    DebitFromAccount,
}

/// One line of an imported bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankMovement {
    pub id: String,
    pub date: NaiveDate,
    /// Unsigned amount, the direction carries the sign
    pub amount: BigDecimal,
    pub direction: BankDirection,
    /// Ledger account representing the bank account
    pub account_id: String,
    pub description: Option<String>,
    #[serde(default)]
    pub reconciled: bool,
    /// Counterpart accounting movement while reconciled
    #[serde(default)]
    pub linked_movement_id: Option<String>,
}

impl BankMovement {
    /// Create a new pending bank movement
    pub fn new(
        id: String,
        date: NaiveDate,
        amount: BigDecimal,
        direction: BankDirection,
        account_id: String,
        description: Option<String>,
    ) -> Self {
        Self {
            id,
            date,
            amount,
            direction,
            account_id,
            description,
            reconciled: false,
            linked_movement_id: None,
        }
    }

    /// Amount signed from the bank account's point of view (deposits positive)
    pub fn signed_amount(&self) -> BigDecimal {
        match self.direction {
            BankDirection::CreditToAccount => self.amount.clone(),
            BankDirection::DebitFromAccount => -self.amount.clone(),
        }
    }

    pub fn reconciliation_state(&self) -> ReconciliationState {
        if self.reconciled {
            ReconciliationState::Reconciled
        } else {
            ReconciliationState::Pending
        }
    }
}

/// Accounting movement together with the entry it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub entry_id: String,
    pub entry_number: String,
    pub entry_date: NaiveDate,
    pub entry_status: EntryStatus,
    pub movement: Movement,
}

/// Inclusive date range; an open bound means "since the beginning" / "until now"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Period {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Closed period `[start, end]`
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(Some(start), Some(end))
    }

    /// Everything up to and including `end`
    pub fn up_to(end: NaiveDate) -> Self {
        Self::new(None, Some(end))
    }

    /// The whole history
    pub fn all() -> Self {
        Self::default()
    }

    /// The period starting the day after this one ends and closing at `end`.
    /// Returns `None` when this period has no end.
    pub fn following(&self, end: Option<NaiveDate>) -> Option<Self> {
        let start = self.end?.succ_opt()?;
        Some(Self::new(Some(start), end))
    }

    /// Whether `date` falls inside the period
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }

    /// Whether `date` lies strictly before the period start
    pub fn precedes(&self, date: NaiveDate) -> bool {
        self.start.is_some_and(|start| date < start)
    }

    /// The same period with its start removed, covering the opening balance too
    pub fn cumulative(&self) -> Self {
        Self::new(None, self.end)
    }
}

/// One line of a general-ledger query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub date: NaiveDate,
    pub entry_id: String,
    pub entry_number: String,
    pub movement_id: String,
    /// Movement description, falling back to the entry description
    pub description: String,
    pub reference: Option<String>,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    /// Signed balance after this line, honoring the account nature
    pub running_balance: BigDecimal,
}

/// General-ledger query result for one account over one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountLedger {
    pub account: Account,
    pub period: Period,
    pub opening_balance: BigDecimal,
    pub movements: Vec<LedgerLine>,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub closing_balance: BigDecimal,
}

impl AccountLedger {
    /// Sign-adjusted change over the period
    pub fn net_change(&self) -> BigDecimal {
        &self.closing_balance - &self.opening_balance
    }

    pub fn has_movements(&self) -> bool {
        !self.movements.is_empty()
    }
}

/// Errors that can occur in the bookkeeping engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Entry needs at least two movements with an amount, found {found}")]
    InsufficientMovements { found: usize },
    #[error("Movement {index} must carry exactly one of debit/credit: debit = {debit}, credit = {credit}")]
    AmbiguousMovement {
        index: usize,
        debit: BigDecimal,
        credit: BigDecimal,
    },
    #[error("Movement {index} references unknown or inactive account '{account_id}'")]
    UnknownAccount { index: usize, account_id: String },
    #[error("Entry is not balanced: debits = {total_debit}, credits = {total_credit}, delta = {delta}")]
    UnbalancedEntry {
        total_debit: BigDecimal,
        total_credit: BigDecimal,
        delta: BigDecimal,
    },

    #[error("Entry '{entry_id}' is {status} and cannot be edited")]
    ImmutableEntry { entry_id: String, status: EntryStatus },
    #[error("Entry '{entry_id}' cannot move from {from} to {to}")]
    InvalidStatusTransition {
        entry_id: String,
        from: EntryStatus,
        to: EntryStatus,
    },
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Movement not found: {0}")]
    MovementNotFound(String),
    #[error("Bank movement not found: {0}")]
    BankMovementNotFound(String),

    #[error("Cannot link bank movement '{bank_movement_id}' with movement '{movement_id}': '{conflicting_id}' is already reconciled")]
    AlreadyReconciled {
        bank_movement_id: String,
        movement_id: String,
        conflicting_id: String,
    },
    #[error("Bank movement '{bank_movement_id}' and movement '{movement_id}' are not linked to each other")]
    NotReconciled {
        bank_movement_id: String,
        movement_id: String,
    },
    #[error("Amounts differ beyond {tolerance}: bank movement '{bank_movement_id}' = {bank_amount}, movement '{movement_id}' = {movement_amount}")]
    AmountMismatch {
        bank_movement_id: String,
        movement_id: String,
        bank_amount: BigDecimal,
        movement_amount: BigDecimal,
        tolerance: BigDecimal,
    },
    #[error("Movement '{movement_id}' cannot be reconciled: {reason}")]
    NotReconcilable { movement_id: String, reason: String },

    #[error("Trial balance does not balance: debits = {total_debit}, credits = {total_credit}, difference = {difference}")]
    TrialBalanceImbalance {
        total_debit: BigDecimal,
        total_credit: BigDecimal,
        difference: BigDecimal,
    },
    #[error("Balance sheet does not balance: assets = {total_assets}, liabilities + equity = {total_liabilities_and_equity}, difference = {difference}")]
    BalanceSheetImbalance {
        total_assets: BigDecimal,
        total_liabilities_and_equity: BigDecimal,
        difference: BigDecimal,
    },
    #[error("Income statement bands do not add up: net income = {net_income}, bands = {band_total}, difference = {difference}")]
    IncomeStatementImbalance {
        net_income: BigDecimal,
        band_total: BigDecimal,
        difference: BigDecimal,
    },
    #[error("Cash flow does not reconcile: opening = {opening_cash}, closing = {closing_cash}, buckets = {bucket_total}, difference = {difference}")]
    CashFlowImbalance {
        opening_cash: BigDecimal,
        closing_cash: BigDecimal,
        bucket_total: BigDecimal,
        difference: BigDecimal,
    },
}

impl LedgerError {
    /// Deterministic input errors the caller fixes by correcting the entry
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientMovements { .. }
                | LedgerError::AmbiguousMovement { .. }
                | LedgerError::UnknownAccount { .. }
                | LedgerError::UnbalancedEntry { .. }
                | LedgerError::Validation(_)
        )
    }

    /// Business-rule rejections raised by the reconciliation matcher
    pub fn is_reconciliation(&self) -> bool {
        matches!(
            self,
            LedgerError::AlreadyReconciled { .. }
                | LedgerError::NotReconciled { .. }
                | LedgerError::AmountMismatch { .. }
                | LedgerError::NotReconcilable { .. }
        )
    }

    /// Report invariants found broken during aggregation
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            LedgerError::TrialBalanceImbalance { .. }
                | LedgerError::BalanceSheetImbalance { .. }
                | LedgerError::IncomeStatementImbalance { .. }
                | LedgerError::CashFlowImbalance { .. }
        )
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
