//! Traits for storage abstraction and extensibility

use async_trait::async_trait;

use crate::reports::{CashFlowBucket, CashMovement, IncomeBand};
use crate::types::*;

/// Account read/write interface
///
/// This trait allows the engine to work with any storage backend
/// (document store, SQL, in-memory, etc.) by implementing these methods.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Save a new account. Ids and codes must be unused, checked under the
    /// same write as the insert.
    async fn save_account(&mut self, account: &Account) -> LedgerResult<()>;

    /// Get an account by ID
    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>>;

    /// List all accounts, optionally filtered by type
    async fn list_accounts(&self, account_type: Option<AccountType>) -> LedgerResult<Vec<Account>>;

    /// Update an existing account
    async fn update_account(&mut self, account: &Account) -> LedgerResult<()>;
}

/// Journal entry read/write interface
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Save a new entry.
    ///
    /// Entry numbers and movement ids must be unused, and no movement may
    /// carry reconciliation state.
    async fn save_entry(&mut self, entry: &JournalEntry) -> LedgerResult<()>;

    /// Get an entry by ID
    async fn get_entry(&self, entry_id: &str) -> LedgerResult<Option<JournalEntry>>;

    /// Get an entry by its display number
    async fn find_entry_by_number(&self, number: &str) -> LedgerResult<Option<JournalEntry>>;

    /// Replace a DRAFT entry. Implementations refuse to overwrite anything else.
    async fn update_draft(&mut self, entry: &JournalEntry) -> LedgerResult<()>;

    /// Move an entry from `expected` to `next` in one step.
    ///
    /// Fails with `InvalidStatusTransition` when the stored status is not
    /// `expected`, and with `NotReconcilable` when voiding an entry that still
    /// has reconciled movements.
    async fn transition_entry(
        &mut self,
        entry_id: &str,
        expected: EntryStatus,
        next: EntryStatus,
    ) -> LedgerResult<JournalEntry>;

    /// List entries, optionally filtered by status
    async fn list_entries(&self, status: Option<EntryStatus>) -> LedgerResult<Vec<JournalEntry>>;

    /// List CONFIRMED entries dated inside `period`, optionally only those
    /// touching `account_id`. Movements are embedded.
    async fn list_confirmed(
        &self,
        account_id: Option<&str>,
        period: Period,
    ) -> LedgerResult<Vec<JournalEntry>>;
}

/// Bank and accounting movement store with atomic paired updates
#[async_trait]
pub trait ReconciliationStore: Send + Sync {
    /// Save or replace an imported bank movement. Only PENDING lines without
    /// a link are accepted, and a reconciled line is never replaced.
    async fn save_bank_movement(&self, movement: &BankMovement) -> LedgerResult<()>;

    /// Get a bank movement by ID
    async fn get_bank_movement(&self, bank_movement_id: &str)
        -> LedgerResult<Option<BankMovement>>;

    /// List bank movements of one bank account
    async fn list_bank_movements(&self, account_id: &str) -> LedgerResult<Vec<BankMovement>>;

    /// Get an accounting movement together with its entry context
    async fn find_movement(&self, movement_id: &str) -> LedgerResult<Option<MovementRecord>>;

    /// Accounting movements of CONFIRMED entries posted to `account_id`
    async fn list_account_movements(&self, account_id: &str) -> LedgerResult<Vec<MovementRecord>>;

    /// Mark both sides reconciled and record the mutual link.
    ///
    /// Must be atomic and mutually exclusive per record: when either side is
    /// already reconciled the call fails with `AlreadyReconciled` and nothing
    /// changes.
    async fn link(&self, bank_movement_id: &str, movement_id: &str) -> LedgerResult<()>;

    /// Clear a mutual link, both sides or neither.
    ///
    /// Fails with `NotReconciled` when the two records are not linked to
    /// each other.
    async fn unlink(&self, bank_movement_id: &str, movement_id: &str) -> LedgerResult<()>;
}

/// Every storage concern the [`Ledger`](crate::ledger::Ledger) orchestrator needs
pub trait LedgerStorage: AccountStore + JournalStore + ReconciliationStore + Clone {}

impl<T> LedgerStorage for T where T: AccountStore + JournalStore + ReconciliationStore + Clone {}

/// Extra rule applied to an entry after the core double-entry checks
pub trait EntryPolicy: Send + Sync {
    /// Validate an entry about to be confirmed
    fn check(&self, entry: &JournalEntry) -> LedgerResult<()>;
}

/// Maps an account to the statement group it is reported under
pub trait AccountClassifier {
    fn group_label(&self, account: &Account) -> String;
}

impl<F> AccountClassifier for F
where
    F: Fn(&Account) -> String,
{
    fn group_label(&self, account: &Account) -> String {
        self(account)
    }
}

/// Assigns income and expense accounts to income statement bands
pub trait IncomeBandClassifier {
    fn band(&self, account: &Account) -> IncomeBand;
}

impl<F> IncomeBandClassifier for F
where
    F: Fn(&Account) -> IncomeBand,
{
    fn band(&self, account: &Account) -> IncomeBand {
        self(account)
    }
}

/// Assigns each movement on a cash account to a cash flow bucket
pub trait CashFlowClassifier {
    fn bucket(&self, movement: &CashMovement<'_>) -> CashFlowBucket;
}

impl<F> CashFlowClassifier for F
where
    F: Fn(&CashMovement<'_>) -> CashFlowBucket,
{
    fn bucket(&self, movement: &CashMovement<'_>) -> CashFlowBucket {
        self(movement)
    }
}
