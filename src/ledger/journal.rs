//! Journal entry lifecycle and persistence

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::ledger::chart::AccountDirectory;
use crate::ledger::validator::EntryValidator;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::default_epsilon;

/// Metadata key linking a reversal to the entry it cancels
pub const REVERSES_KEY: &str = "reverses";

/// Parameters for a cash sale with sales tax
pub struct SaleWithTaxParams {
    pub number: String,
    pub date: NaiveDate,
    pub description: String,
    pub cash_account_id: String,
    pub revenue_account_id: String,
    pub tax_payable_account_id: String,
    pub base_amount: BigDecimal,
    pub tax_amount: BigDecimal,
}

/// Journal manager for draft, confirm, void and reversal operations
pub struct JournalManager<S: JournalStore> {
    storage: S,
    epsilon: BigDecimal,
    policies: Vec<Box<dyn EntryPolicy>>,
}

impl<S: JournalStore> JournalManager<S> {
    /// Create a new journal manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            epsilon: default_epsilon(),
            policies: Vec::new(),
        }
    }

    /// Create a journal manager with a custom tolerance and extra policies
    pub fn with_policies(
        storage: S,
        epsilon: BigDecimal,
        policies: Vec<Box<dyn EntryPolicy>>,
    ) -> Self {
        Self {
            storage,
            epsilon,
            policies,
        }
    }

    fn validator<'a>(&'a self, directory: &'a AccountDirectory) -> EntryValidator<'a> {
        EntryValidator::new(directory)
            .with_epsilon(self.epsilon.clone())
            .with_policies(&self.policies)
    }

    /// Record an entry as DRAFT or CONFIRMED, according to its status.
    /// CONFIRMED entries go through the validator first.
    pub async fn record_entry(
        &mut self,
        directory: &AccountDirectory,
        mut entry: JournalEntry,
    ) -> LedgerResult<JournalEntry> {
        match entry.status {
            EntryStatus::Draft => {}
            EntryStatus::Confirmed => {
                if let Err(err) = self.validator(directory).validate(&entry) {
                    tracing::warn!(entry_number = %entry.number, error = %err, "entry rejected");
                    return Err(err);
                }
            }
            EntryStatus::Void => {
                return Err(LedgerError::Validation(format!(
                    "Entry '{}' cannot be recorded as VOID",
                    entry.number
                )));
            }
        }

        entry.updated_at = chrono::Utc::now().naive_utc();
        self.storage.save_entry(&entry).await?;

        tracing::info!(
            entry_id = %entry.id,
            entry_number = %entry.number,
            status = %entry.status,
            "entry recorded"
        );
        Ok(entry)
    }

    /// Store an entry as DRAFT without validating it
    pub async fn save_draft(&mut self, mut entry: JournalEntry) -> LedgerResult<JournalEntry> {
        entry.status = EntryStatus::Draft;
        entry.updated_at = chrono::Utc::now().naive_utc();
        self.storage.save_entry(&entry).await?;
        tracing::info!(entry_id = %entry.id, entry_number = %entry.number, "draft saved");
        Ok(entry)
    }

    /// Replace a DRAFT entry. CONFIRMED and VOID entries are immutable.
    pub async fn update_draft(&mut self, entry: &JournalEntry) -> LedgerResult<()> {
        let stored = self.get_entry_required(&entry.id).await?;
        if stored.status != EntryStatus::Draft {
            return Err(LedgerError::ImmutableEntry {
                entry_id: entry.id.clone(),
                status: stored.status,
            });
        }
        let mut draft = entry.clone();
        draft.status = EntryStatus::Draft;
        draft.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_draft(&draft).await
    }

    /// Validate a DRAFT entry and move it to CONFIRMED
    pub async fn confirm_entry(
        &mut self,
        directory: &AccountDirectory,
        entry_id: &str,
    ) -> LedgerResult<JournalEntry> {
        let entry = self.get_entry_required(entry_id).await?;
        if entry.status != EntryStatus::Draft {
            return Err(LedgerError::InvalidStatusTransition {
                entry_id: entry_id.to_string(),
                from: entry.status,
                to: EntryStatus::Confirmed,
            });
        }
        if let Err(err) = self.validator(directory).validate(&entry) {
            tracing::warn!(entry_number = %entry.number, error = %err, "confirmation rejected");
            return Err(err);
        }

        let confirmed = self
            .storage
            .transition_entry(entry_id, EntryStatus::Draft, EntryStatus::Confirmed)
            .await?;
        tracing::info!(entry_id, entry_number = %confirmed.number, "entry confirmed");
        Ok(confirmed)
    }

    /// Void an entry. Posted amounts are never edited in place.
    pub async fn void_entry(&mut self, entry_id: &str) -> LedgerResult<JournalEntry> {
        let entry = self.get_entry_required(entry_id).await?;
        let voided = self
            .storage
            .transition_entry(entry_id, entry.status, EntryStatus::Void)
            .await?;
        tracing::info!(entry_id, entry_number = %voided.number, "entry voided");
        Ok(voided)
    }

    /// Post a CONFIRMED entry cancelling `entry_id` with debit and credit
    /// swapped. The original entry stays CONFIRMED.
    pub async fn reverse_entry(
        &mut self,
        directory: &AccountDirectory,
        entry_id: &str,
        number: String,
        date: NaiveDate,
    ) -> LedgerResult<JournalEntry> {
        let original = self.get_entry_required(entry_id).await?;
        if original.status != EntryStatus::Confirmed {
            return Err(LedgerError::Validation(format!(
                "Only CONFIRMED entries can be reversed, entry '{}' is {}",
                original.number, original.status
            )));
        }
        if self
            .storage
            .list_entries(Some(EntryStatus::Confirmed))
            .await?
            .iter()
            .any(|e| e.metadata.get(REVERSES_KEY).map(String::as_str) == Some(entry_id))
        {
            return Err(LedgerError::Validation(format!(
                "Entry '{}' has already been reversed",
                original.number
            )));
        }

        let reversal = reversal_of(&original, number, date);
        self.record_entry(directory, reversal).await
    }

    /// Get an entry by ID
    pub async fn get_entry(&self, entry_id: &str) -> LedgerResult<Option<JournalEntry>> {
        self.storage.get_entry(entry_id).await
    }

    /// Look an entry up by its display number
    pub async fn find_by_number(&self, number: &str) -> LedgerResult<Option<JournalEntry>> {
        self.storage.find_entry_by_number(number).await
    }

    /// Get an entry by ID, returning an error if not found
    pub async fn get_entry_required(&self, entry_id: &str) -> LedgerResult<JournalEntry> {
        self.storage
            .get_entry(entry_id)
            .await?
            .ok_or_else(|| LedgerError::EntryNotFound(entry_id.to_string()))
    }

    /// List entries, optionally by status
    pub async fn list_entries(
        &self,
        status: Option<EntryStatus>,
    ) -> LedgerResult<Vec<JournalEntry>> {
        self.storage.list_entries(status).await
    }

    /// CONFIRMED entries within `period`, optionally touching one account
    pub async fn list_confirmed(
        &self,
        account_id: Option<&str>,
        period: Period,
    ) -> LedgerResult<Vec<JournalEntry>> {
        self.storage.list_confirmed(account_id, period).await
    }

    /// Next free numeric entry number
    pub async fn next_entry_number(&self) -> LedgerResult<String> {
        let highest = self
            .storage
            .list_entries(None)
            .await?
            .iter()
            .filter_map(|e| e.number.trim().parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Ok((highest + 1).to_string())
    }
}

/// Build the entry cancelling `original`
pub fn reversal_of(original: &JournalEntry, number: String, date: NaiveDate) -> JournalEntry {
    let mut reversal = JournalEntry::new(
        uuid::Uuid::new_v4().to_string(),
        number,
        date,
        format!("Reversal of entry {}: {}", original.number, original.description),
        original.reference.clone(),
    );
    for movement in &original.movements {
        reversal.add_movement(Movement::new(
            movement.account_id.clone(),
            movement.credit.clone(),
            movement.debit.clone(),
            movement.description.clone(),
        ));
    }
    reversal
        .metadata
        .insert(REVERSES_KEY.to_string(), original.id.clone());
    reversal.status = EntryStatus::Confirmed;
    reversal
}

/// Builder for journal entries
#[derive(Debug)]
pub struct JournalEntryBuilder {
    entry: JournalEntry,
}

impl JournalEntryBuilder {
    /// Create a new builder for a DRAFT entry with a fresh id
    pub fn new(number: impl Into<String>, date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            entry: JournalEntry::new(
                uuid::Uuid::new_v4().to_string(),
                number.into(),
                date,
                description.into(),
                None,
            ),
        }
    }

    /// Use a caller-provided id
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.entry.id = id.into();
        self
    }

    /// Set the reference for the entry
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.entry.reference = Some(reference.into());
        self
    }

    /// Add metadata to the entry
    pub fn metadata(mut self, key: String, value: String) -> Self {
        self.entry.metadata.insert(key, value);
        self
    }

    /// Add a debit movement
    pub fn debit(mut self, account_id: impl Into<String>, amount: BigDecimal) -> Self {
        self.entry
            .add_movement(Movement::debit(account_id.into(), amount, None));
        self
    }

    /// Add a credit movement
    pub fn credit(mut self, account_id: impl Into<String>, amount: BigDecimal) -> Self {
        self.entry
            .add_movement(Movement::credit(account_id.into(), amount, None));
        self
    }

    /// Add a custom movement
    pub fn movement(mut self, movement: Movement) -> Self {
        self.entry.add_movement(movement);
        self
    }

    /// Build a DRAFT entry
    pub fn draft(self) -> JournalEntry {
        self.entry
    }

    /// Build an entry marked CONFIRMED; it is validated when recorded
    pub fn confirmed(mut self) -> JournalEntry {
        self.entry.status = EntryStatus::Confirmed;
        self.entry
    }
}

/// Common entry patterns
pub mod patterns {
    use super::*;

    /// Sale collected in cash with sales tax: debit cash for the total,
    /// credit revenue for the base and tax payable for the tax
    pub fn sale_with_tax(params: SaleWithTaxParams) -> JournalEntry {
        let total = &params.base_amount + &params.tax_amount;
        JournalEntryBuilder::new(params.number, params.date, params.description)
            .debit(params.cash_account_id, total)
            .credit(params.revenue_account_id, params.base_amount)
            .credit(params.tax_payable_account_id, params.tax_amount)
            .confirmed()
    }

    /// Simple payment: debit expense, credit cash
    pub fn expense_payment(
        number: impl Into<String>,
        date: NaiveDate,
        description: impl Into<String>,
        expense_account_id: &str,
        cash_account_id: &str,
        amount: BigDecimal,
    ) -> JournalEntry {
        JournalEntryBuilder::new(number, date, description)
            .debit(expense_account_id, amount.clone())
            .credit(cash_account_id, amount)
            .confirmed()
    }

    /// Owner contribution: debit cash, credit equity
    pub fn owner_investment(
        number: impl Into<String>,
        date: NaiveDate,
        description: impl Into<String>,
        cash_account_id: &str,
        equity_account_id: &str,
        amount: BigDecimal,
    ) -> JournalEntry {
        JournalEntryBuilder::new(number, date, description)
            .debit(cash_account_id, amount.clone())
            .credit(equity_account_id, amount)
            .confirmed()
    }
}
