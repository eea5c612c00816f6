//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::ledger::engine::compare_entry_numbers;
use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    entries: HashMap<String, JournalEntry>,
    bank_movements: HashMap<String, BankMovement>,
    /// movement id -> owning entry id
    movement_index: HashMap<String, String>,
}

impl MemoryState {
    fn index_entry(&mut self, entry: &JournalEntry) {
        for movement in &entry.movements {
            self.movement_index
                .insert(movement.id.clone(), entry.id.clone());
        }
    }

    /// Movement ids are unique within an entry and across the store
    fn check_movement_ids(&self, entry: &JournalEntry) -> LedgerResult<()> {
        let mut seen = HashSet::new();
        for movement in &entry.movements {
            if !seen.insert(movement.id.as_str()) {
                return Err(LedgerError::Validation(format!(
                    "Movement id '{}' appears twice in entry '{}'",
                    movement.id, entry.number
                )));
            }
            if self
                .movement_index
                .get(&movement.id)
                .is_some_and(|owner| owner != &entry.id)
            {
                return Err(LedgerError::Validation(format!(
                    "Movement id '{}' already belongs to another entry",
                    movement.id
                )));
            }
        }
        Ok(())
    }

    fn check_code_free(&self, account: &Account) -> LedgerResult<()> {
        if self
            .accounts
            .values()
            .any(|a| a.id != account.id && a.code == account.code)
        {
            return Err(LedgerError::Validation(format!(
                "Account code '{}' already exists",
                account.code
            )));
        }
        Ok(())
    }

    fn unindex_entry(&mut self, entry_id: &str) {
        self.movement_index.retain(|_, owner| owner != entry_id);
    }

    fn movement_record(&self, movement_id: &str) -> Option<MovementRecord> {
        let entry = self.entries.get(self.movement_index.get(movement_id)?)?;
        let movement = entry.movement(movement_id)?;
        Some(record_of(entry, movement))
    }
}

/// Reconciliation state is only ever written by `link` and `unlink`
fn ensure_unlinked_movements(entry: &JournalEntry) -> LedgerResult<()> {
    match entry
        .movements
        .iter()
        .find(|m| m.reconciled || m.linked_bank_movement_id.is_some())
    {
        Some(movement) => Err(LedgerError::Validation(format!(
            "Movement '{}' of entry '{}' cannot be stored as reconciled",
            movement.id, entry.number
        ))),
        None => Ok(()),
    }
}

fn record_of(entry: &JournalEntry, movement: &Movement) -> MovementRecord {
    MovementRecord {
        entry_id: entry.id.clone(),
        entry_number: entry.number.clone(),
        entry_date: entry.date,
        entry_status: entry.status,
        movement: movement.clone(),
    }
}

/// In-memory storage implementation for testing and development
///
/// All records live behind one lock, so paired reconciliation updates are
/// applied under a single write guard.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        let mut state = self.write()?;
        *state = MemoryState::default();
        Ok(())
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| LedgerError::Storage(format!("memory store poisoned: {}", e)))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| LedgerError::Storage(format!("memory store poisoned: {}", e)))
    }
}

#[async_trait]
impl AccountStore for MemoryStorage {
    async fn save_account(&mut self, account: &Account) -> LedgerResult<()> {
        let mut state = self.write()?;
        if state.accounts.contains_key(&account.id) {
            return Err(LedgerError::Validation(format!(
                "Account with ID '{}' already exists",
                account.id
            )));
        }
        state.check_code_free(account)?;
        state.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        Ok(self.read()?.accounts.get(account_id).cloned())
    }

    async fn list_accounts(&self, account_type: Option<AccountType>) -> LedgerResult<Vec<Account>> {
        let state = self.read()?;
        let mut filtered: Vec<Account> = state
            .accounts
            .values()
            .filter(|account| account_type.is_none_or(|t| account.account_type == t))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(filtered)
    }

    async fn update_account(&mut self, account: &Account) -> LedgerResult<()> {
        let mut state = self.write()?;
        state.check_code_free(account)?;
        match state.accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(LedgerError::AccountNotFound(account.id.clone())),
        }
    }
}

#[async_trait]
impl JournalStore for MemoryStorage {
    async fn save_entry(&mut self, entry: &JournalEntry) -> LedgerResult<()> {
        let mut state = self.write()?;
        if state.entries.contains_key(&entry.id) {
            return Err(LedgerError::Validation(format!(
                "Entry with ID '{}' already exists",
                entry.id
            )));
        }
        if state.entries.values().any(|e| e.number == entry.number) {
            return Err(LedgerError::Validation(format!(
                "Entry number '{}' is already in use",
                entry.number
            )));
        }
        ensure_unlinked_movements(entry)?;
        state.check_movement_ids(entry)?;
        state.index_entry(entry);
        state.entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn get_entry(&self, entry_id: &str) -> LedgerResult<Option<JournalEntry>> {
        Ok(self.read()?.entries.get(entry_id).cloned())
    }

    async fn find_entry_by_number(&self, number: &str) -> LedgerResult<Option<JournalEntry>> {
        Ok(self
            .read()?
            .entries
            .values()
            .find(|e| e.number == number)
            .cloned())
    }

    async fn update_draft(&mut self, entry: &JournalEntry) -> LedgerResult<()> {
        let mut state = self.write()?;
        let stored_status = state
            .entries
            .get(&entry.id)
            .map(|e| e.status)
            .ok_or_else(|| LedgerError::EntryNotFound(entry.id.clone()))?;

        if stored_status != EntryStatus::Draft || entry.status != EntryStatus::Draft {
            return Err(LedgerError::ImmutableEntry {
                entry_id: entry.id.clone(),
                status: stored_status,
            });
        }
        if state
            .entries
            .values()
            .any(|e| e.id != entry.id && e.number == entry.number)
        {
            return Err(LedgerError::Validation(format!(
                "Entry number '{}' is already in use",
                entry.number
            )));
        }
        ensure_unlinked_movements(entry)?;
        state.check_movement_ids(entry)?;

        state.unindex_entry(&entry.id);
        state.index_entry(entry);
        state.entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn transition_entry(
        &mut self,
        entry_id: &str,
        expected: EntryStatus,
        next: EntryStatus,
    ) -> LedgerResult<JournalEntry> {
        let mut state = self.write()?;
        let entry = state
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| LedgerError::EntryNotFound(entry_id.to_string()))?;

        if entry.status != expected || !entry.status.can_transition_to(next) {
            return Err(LedgerError::InvalidStatusTransition {
                entry_id: entry_id.to_string(),
                from: entry.status,
                to: next,
            });
        }
        if next == EntryStatus::Void {
            if let Some(movement) = entry.movements.iter().find(|m| m.reconciled) {
                return Err(LedgerError::NotReconcilable {
                    movement_id: movement.id.clone(),
                    reason: format!(
                        "entry '{}' cannot be voided while the movement is reconciled",
                        entry.number
                    ),
                });
            }
        }

        entry.status = next;
        entry.updated_at = chrono::Utc::now().naive_utc();
        Ok(entry.clone())
    }

    async fn list_entries(&self, status: Option<EntryStatus>) -> LedgerResult<Vec<JournalEntry>> {
        let state = self.read()?;
        Ok(state
            .entries
            .values()
            .filter(|e| status.is_none_or(|s| e.status == s))
            .cloned()
            .collect())
    }

    async fn list_confirmed(
        &self,
        account_id: Option<&str>,
        period: Period,
    ) -> LedgerResult<Vec<JournalEntry>> {
        let state = self.read()?;
        Ok(state
            .entries
            .values()
            .filter(|e| e.is_confirmed() && period.contains(e.date))
            .filter(|e| account_id.is_none_or(|id| e.touches(id)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReconciliationStore for MemoryStorage {
    async fn save_bank_movement(&self, movement: &BankMovement) -> LedgerResult<()> {
        if movement.reconciled || movement.linked_movement_id.is_some() {
            return Err(LedgerError::Validation(format!(
                "Bank movement '{}' must be imported as pending",
                movement.id
            )));
        }
        let mut state = self.write()?;
        if state
            .bank_movements
            .get(&movement.id)
            .is_some_and(|existing| existing.reconciled)
        {
            return Err(LedgerError::Validation(format!(
                "Bank movement '{}' is reconciled and cannot be replaced",
                movement.id
            )));
        }
        state
            .bank_movements
            .insert(movement.id.clone(), movement.clone());
        Ok(())
    }

    async fn get_bank_movement(
        &self,
        bank_movement_id: &str,
    ) -> LedgerResult<Option<BankMovement>> {
        Ok(self.read()?.bank_movements.get(bank_movement_id).cloned())
    }

    async fn list_bank_movements(&self, account_id: &str) -> LedgerResult<Vec<BankMovement>> {
        let state = self.read()?;
        let mut movements: Vec<BankMovement> = state
            .bank_movements
            .values()
            .filter(|m| m.account_id == account_id)
            .cloned()
            .collect();
        movements.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(movements)
    }

    async fn find_movement(&self, movement_id: &str) -> LedgerResult<Option<MovementRecord>> {
        Ok(self.read()?.movement_record(movement_id))
    }

    async fn list_account_movements(&self, account_id: &str) -> LedgerResult<Vec<MovementRecord>> {
        let state = self.read()?;
        let mut records: Vec<MovementRecord> = state
            .entries
            .values()
            .filter(|e| e.is_confirmed())
            .flat_map(|e| {
                e.movements
                    .iter()
                    .filter(|m| m.account_id == account_id)
                    .map(move |m| record_of(e, m))
            })
            .collect();
        records.sort_by(|a, b| {
            a.entry_date
                .cmp(&b.entry_date)
                .then_with(|| compare_entry_numbers(&a.entry_number, &b.entry_number))
        });
        Ok(records)
    }

    async fn link(&self, bank_movement_id: &str, movement_id: &str) -> LedgerResult<()> {
        let mut guard = self.write()?;
        let state: &mut MemoryState = &mut guard;

        let entry_id = state
            .movement_index
            .get(movement_id)
            .cloned()
            .ok_or_else(|| LedgerError::MovementNotFound(movement_id.to_string()))?;
        let bank = state
            .bank_movements
            .get_mut(bank_movement_id)
            .ok_or_else(|| LedgerError::BankMovementNotFound(bank_movement_id.to_string()))?;
        let entry = state
            .entries
            .get_mut(&entry_id)
            .ok_or_else(|| LedgerError::MovementNotFound(movement_id.to_string()))?;

        if !entry.is_confirmed() {
            return Err(LedgerError::NotReconcilable {
                movement_id: movement_id.to_string(),
                reason: format!("entry '{}' is {}", entry.number, entry.status),
            });
        }
        let movement = entry
            .movements
            .iter_mut()
            .find(|m| m.id == movement_id)
            .ok_or_else(|| LedgerError::MovementNotFound(movement_id.to_string()))?;

        let conflicting = if bank.reconciled {
            Some(bank_movement_id)
        } else if movement.reconciled {
            Some(movement_id)
        } else {
            None
        };
        if let Some(conflicting_id) = conflicting {
            return Err(LedgerError::AlreadyReconciled {
                bank_movement_id: bank_movement_id.to_string(),
                movement_id: movement_id.to_string(),
                conflicting_id: conflicting_id.to_string(),
            });
        }

        bank.reconciled = true;
        bank.linked_movement_id = Some(movement_id.to_string());
        movement.reconciled = true;
        movement.linked_bank_movement_id = Some(bank_movement_id.to_string());
        Ok(())
    }

    async fn unlink(&self, bank_movement_id: &str, movement_id: &str) -> LedgerResult<()> {
        let mut guard = self.write()?;
        let state: &mut MemoryState = &mut guard;

        let entry_id = state
            .movement_index
            .get(movement_id)
            .cloned()
            .ok_or_else(|| LedgerError::MovementNotFound(movement_id.to_string()))?;
        let bank = state
            .bank_movements
            .get_mut(bank_movement_id)
            .ok_or_else(|| LedgerError::BankMovementNotFound(bank_movement_id.to_string()))?;
        let movement = state
            .entries
            .get_mut(&entry_id)
            .and_then(|e| e.movements.iter_mut().find(|m| m.id == movement_id))
            .ok_or_else(|| LedgerError::MovementNotFound(movement_id.to_string()))?;

        let linked = bank.reconciled
            && movement.reconciled
            && bank.linked_movement_id.as_deref() == Some(movement_id)
            && movement.linked_bank_movement_id.as_deref() == Some(bank_movement_id);
        if !linked {
            return Err(LedgerError::NotReconciled {
                bank_movement_id: bank_movement_id.to_string(),
                movement_id: movement_id.to_string(),
            });
        }

        bank.reconciled = false;
        bank.linked_movement_id = None;
        movement.reconciled = false;
        movement.linked_bank_movement_id = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn confirmed_entry(number: &str) -> JournalEntry {
        let mut entry = JournalEntry::new(
            format!("entry-{}", number),
            number.to_string(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "Deposit".to_string(),
            None,
        );
        entry.add_movement(Movement::debit("bank".to_string(), BigDecimal::from(100), None));
        entry.add_movement(Movement::credit("sales".to_string(), BigDecimal::from(100), None));
        entry.status = EntryStatus::Confirmed;
        entry
    }

    fn deposit(id: &str) -> BankMovement {
        BankMovement::new(
            id.to_string(),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            BigDecimal::from(100),
            BankDirection::CreditToAccount,
            "bank".to_string(),
            None,
        )
    }

    #[tokio::test]
    async fn test_entry_numbers_are_unique() {
        let mut storage = MemoryStorage::new();
        storage.save_entry(&confirmed_entry("1")).await.unwrap();

        let mut duplicate = confirmed_entry("1");
        duplicate.id = "other".to_string();
        assert!(storage.save_entry(&duplicate).await.is_err());
    }

    #[tokio::test]
    async fn test_confirmed_entries_are_not_overwritten() {
        let mut storage = MemoryStorage::new();
        let entry = confirmed_entry("1");
        storage.save_entry(&entry).await.unwrap();

        let mut edited = entry.clone();
        edited.status = EntryStatus::Draft;
        edited.movements[0].debit = BigDecimal::from(90);
        let err = storage.update_draft(&edited).await.unwrap_err();
        assert!(matches!(err, LedgerError::ImmutableEntry { .. }));
    }

    #[tokio::test]
    async fn test_link_and_unlink_pair() {
        let mut storage = MemoryStorage::new();
        let entry = confirmed_entry("1");
        let movement_id = entry.movements[0].id.clone();
        storage.save_entry(&entry).await.unwrap();
        storage.save_bank_movement(&deposit("b1")).await.unwrap();

        storage.link("b1", &movement_id).await.unwrap();
        let bank = storage.get_bank_movement("b1").await.unwrap().unwrap();
        let record = storage.find_movement(&movement_id).await.unwrap().unwrap();
        assert!(bank.reconciled);
        assert_eq!(bank.linked_movement_id.as_deref(), Some(movement_id.as_str()));
        assert_eq!(
            record.movement.linked_bank_movement_id.as_deref(),
            Some("b1")
        );

        // A reconciled entry cannot be voided
        let err = storage
            .transition_entry(&entry.id, EntryStatus::Confirmed, EntryStatus::Void)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotReconcilable { .. }));

        storage.unlink("b1", &movement_id).await.unwrap();
        let bank = storage.get_bank_movement("b1").await.unwrap().unwrap();
        let record = storage.find_movement(&movement_id).await.unwrap().unwrap();
        assert!(!bank.reconciled && bank.linked_movement_id.is_none());
        assert!(!record.movement.reconciled);
    }

    #[tokio::test]
    async fn test_link_leaves_nothing_behind_on_conflict() {
        let mut storage = MemoryStorage::new();
        let entry = confirmed_entry("1");
        let movement_id = entry.movements[0].id.clone();
        storage.save_entry(&entry).await.unwrap();
        storage.save_bank_movement(&deposit("b1")).await.unwrap();
        storage.save_bank_movement(&deposit("b2")).await.unwrap();

        storage.link("b1", &movement_id).await.unwrap();
        let err = storage.link("b2", &movement_id).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::AlreadyReconciled {
                bank_movement_id: "b2".to_string(),
                movement_id: movement_id.clone(),
                conflicting_id: movement_id.clone(),
            }
        );
        let b2 = storage.get_bank_movement("b2").await.unwrap().unwrap();
        assert!(!b2.reconciled);

        let err = storage.unlink("b2", &movement_id).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotReconciled { .. }));
    }

    #[tokio::test]
    async fn test_bank_movements_are_imported_pending() {
        let storage = MemoryStorage::new();
        let mut reconciled = deposit("b1");
        reconciled.reconciled = true;
        let mut linked = deposit("b1");
        linked.linked_movement_id = Some("ghost".to_string());

        for line in [reconciled, linked] {
            let err = storage.save_bank_movement(&line).await.unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)));
        }
        assert!(storage.get_bank_movement("b1").await.unwrap().is_none());

        storage.save_bank_movement(&deposit("b1")).await.unwrap();
        assert_eq!(
            storage.get_bank_movement("b1").await.unwrap().unwrap().reconciliation_state(),
            ReconciliationState::Pending
        );
    }

    #[tokio::test]
    async fn test_entries_cannot_arrive_reconciled() {
        let mut storage = MemoryStorage::new();
        let mut entry = confirmed_entry("1");
        entry.movements[0].reconciled = true;
        entry.movements[0].linked_bank_movement_id = Some("ghost".to_string());
        let err = storage.save_entry(&entry).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let mut draft = confirmed_entry("2");
        draft.status = EntryStatus::Draft;
        storage.save_entry(&draft).await.unwrap();
        draft.movements[1].linked_bank_movement_id = Some("ghost".to_string());
        let err = storage.update_draft(&draft).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_movement_ids_are_unique() {
        let mut storage = MemoryStorage::new();
        let first = confirmed_entry("1");
        storage.save_entry(&first).await.unwrap();

        let mut second = confirmed_entry("2");
        second.movements[0].id = first.movements[0].id.clone();
        assert!(matches!(
            storage.save_entry(&second).await,
            Err(LedgerError::Validation(_))
        ));

        let mut repeated = confirmed_entry("3");
        repeated.movements[1].id = repeated.movements[0].id.clone();
        assert!(matches!(
            storage.save_entry(&repeated).await,
            Err(LedgerError::Validation(_))
        ));

        let record = storage
            .find_movement(&first.movements[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.entry_id, first.id);
        assert!(storage.get_entry(&second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_account_codes_are_unique() {
        let mut storage = MemoryStorage::new();
        let bank = |id: &str| {
            Account::new(
                id.to_string(),
                "1041".to_string(),
                "Bank".to_string(),
                AccountType::Asset,
                None,
            )
        };
        storage.save_account(&bank("a")).await.unwrap();
        assert!(matches!(
            storage.save_account(&bank("b")).await,
            Err(LedgerError::Validation(_))
        ));

        let mut other = bank("c");
        other.code = "1011".to_string();
        storage.save_account(&other).await.unwrap();
        other.code = "1041".to_string();
        assert!(storage.update_account(&other).await.is_err());
        assert_eq!(storage.list_accounts(None).await.unwrap().len(), 2);
    }
}
