//! Client-side copy of one bank account's reconciliation state.
//!
//! Commands are applied to the local copy first and then sent to the store.
//! When the store rejects a command only the local copy is rolled back; the
//! store is never compensated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::matcher::ReconciliationMatcher;
use crate::traits::ReconciliationStore;
use crate::types::*;

/// A reconciliation mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationCommand {
    Match {
        bank_movement_id: String,
        movement_id: String,
    },
    Revert {
        bank_movement_id: String,
        movement_id: String,
    },
}

impl ReconciliationCommand {
    pub fn bank_movement_id(&self) -> &str {
        match self {
            Self::Match {
                bank_movement_id, ..
            }
            | Self::Revert {
                bank_movement_id, ..
            } => bank_movement_id,
        }
    }

    pub fn movement_id(&self) -> &str {
        match self {
            Self::Match { movement_id, .. } | Self::Revert { movement_id, .. } => movement_id,
        }
    }
}

/// Records as they were before a command touched them
#[derive(Debug)]
struct Snapshot {
    bank: Option<BankMovement>,
    movement: Option<MovementRecord>,
}

/// Local view of the bank lines and ledger movements of one bank account
#[derive(Debug, Clone)]
pub struct LocalReconciliationCache {
    bank_account_id: String,
    bank_movements: BTreeMap<String, BankMovement>,
    movements: BTreeMap<String, MovementRecord>,
}

impl LocalReconciliationCache {
    /// Load the current state of `bank_account_id` from the store
    pub async fn load<S: ReconciliationStore>(
        store: &S,
        bank_account_id: &str,
    ) -> LedgerResult<Self> {
        let mut cache = Self {
            bank_account_id: bank_account_id.to_string(),
            bank_movements: BTreeMap::new(),
            movements: BTreeMap::new(),
        };
        cache.refresh(store).await?;
        Ok(cache)
    }

    /// Replace the local copy with the store's state
    pub async fn refresh<S: ReconciliationStore>(&mut self, store: &S) -> LedgerResult<()> {
        self.bank_movements = store
            .list_bank_movements(&self.bank_account_id)
            .await?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();
        self.movements = store
            .list_account_movements(&self.bank_account_id)
            .await?
            .into_iter()
            .map(|r| (r.movement.id.clone(), r))
            .collect();
        Ok(())
    }

    pub fn bank_account_id(&self) -> &str {
        &self.bank_account_id
    }

    pub fn bank_movement(&self, bank_movement_id: &str) -> Option<&BankMovement> {
        self.bank_movements.get(bank_movement_id)
    }

    pub fn movement(&self, movement_id: &str) -> Option<&MovementRecord> {
        self.movements.get(movement_id)
    }

    pub fn pending_bank_movements(&self) -> impl Iterator<Item = &BankMovement> {
        self.bank_movements.values().filter(|m| !m.reconciled)
    }

    pub fn pending_movements(&self) -> impl Iterator<Item = &MovementRecord> {
        self.movements.values().filter(|r| !r.movement.reconciled)
    }

    /// Apply `command` locally, then through `matcher`.
    ///
    /// On rejection the local records are restored to what they were before
    /// the command and the store's error is returned.
    pub async fn execute<S: ReconciliationStore>(
        &mut self,
        matcher: &ReconciliationMatcher<S>,
        command: ReconciliationCommand,
    ) -> LedgerResult<()> {
        let snapshot = self.apply_local(&command);

        let outcome = match &command {
            ReconciliationCommand::Match {
                bank_movement_id,
                movement_id,
            } => matcher
                .match_movements(bank_movement_id, movement_id)
                .await
                .map(|_| ()),
            ReconciliationCommand::Revert {
                bank_movement_id,
                movement_id,
            } => matcher.revert(bank_movement_id, movement_id).await,
        };

        if let Err(error) = &outcome {
            tracing::warn!(?command, %error, "store rejected reconciliation, rolling back local copy");
            self.rollback(snapshot);
        }
        outcome
    }

    fn apply_local(&mut self, command: &ReconciliationCommand) -> Snapshot {
        let bank_movement_id = command.bank_movement_id();
        let movement_id = command.movement_id();
        let snapshot = Snapshot {
            bank: self.bank_movements.get(bank_movement_id).cloned(),
            movement: self.movements.get(movement_id).cloned(),
        };

        let linking = matches!(command, ReconciliationCommand::Match { .. });
        if let Some(bank) = self.bank_movements.get_mut(bank_movement_id) {
            bank.reconciled = linking;
            bank.linked_movement_id = linking.then(|| movement_id.to_string());
        }
        if let Some(record) = self.movements.get_mut(movement_id) {
            record.movement.reconciled = linking;
            record.movement.linked_bank_movement_id = linking.then(|| bank_movement_id.to_string());
        }
        snapshot
    }

    fn rollback(&mut self, snapshot: Snapshot) {
        if let Some(bank) = snapshot.bank {
            self.bank_movements.insert(bank.id.clone(), bank);
        }
        if let Some(record) = snapshot.movement {
            self.movements.insert(record.movement.id.clone(), record);
        }
    }
}
