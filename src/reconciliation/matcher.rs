//! Reconciliation matcher

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::traits::ReconciliationStore;
use crate::types::*;

/// A bank movement paired with an accounting movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationLink {
    pub bank_movement_id: String,
    pub movement_id: String,
}

/// Counts and signed amounts of one side of a bank account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideSummary {
    pub reconciled_count: usize,
    pub reconciled_amount: BigDecimal,
    pub pending_count: usize,
    pub pending_amount: BigDecimal,
}

impl Default for SideSummary {
    fn default() -> Self {
        Self {
            reconciled_count: 0,
            reconciled_amount: BigDecimal::from(0),
            pending_count: 0,
            pending_amount: BigDecimal::from(0),
        }
    }
}

impl SideSummary {
    fn add(&mut self, state: ReconciliationState, amount: BigDecimal) {
        match state {
            ReconciliationState::Reconciled => {
                self.reconciled_count += 1;
                self.reconciled_amount += amount;
            }
            ReconciliationState::Pending => {
                self.pending_count += 1;
                self.pending_amount += amount;
            }
        }
    }
}

/// Reconciliation status of one bank account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub bank_account_id: String,
    /// Statement lines, deposits positive
    pub bank: SideSummary,
    /// Movements of confirmed entries on the same account, debits positive
    pub accounting: SideSummary,
    /// Pending bank amount minus pending accounting amount
    pub unreconciled_difference: BigDecimal,
}

/// Matches and reverts bank/accounting pairs against a [`ReconciliationStore`]
#[derive(Debug, Clone)]
pub struct ReconciliationMatcher<S: ReconciliationStore> {
    store: S,
    tolerance: Option<BigDecimal>,
}

impl<S: ReconciliationStore> ReconciliationMatcher<S> {
    /// Matcher comparing amounts within `tolerance`; `None` skips the amount check
    pub fn new(store: S, tolerance: Option<BigDecimal>) -> Self {
        Self { store, tolerance }
    }

    pub fn from_config(store: S, config: &EngineConfig) -> Self {
        Self::new(store, config.reconciliation.amount_tolerance.clone())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tolerance(&self) -> Option<&BigDecimal> {
        self.tolerance.as_ref()
    }

    /// Link a bank movement with an accounting movement.
    ///
    /// Both must be PENDING, the accounting movement must belong to a
    /// CONFIRMED entry, and the signed amounts must agree within the
    /// tolerance. The store performs the paired update, so of two concurrent
    /// calls on the same record only one succeeds.
    pub async fn match_movements(
        &self,
        bank_movement_id: &str,
        movement_id: &str,
    ) -> LedgerResult<ReconciliationLink> {
        let bank = self
            .store
            .get_bank_movement(bank_movement_id)
            .await?
            .ok_or_else(|| LedgerError::BankMovementNotFound(bank_movement_id.to_string()))?;
        let record = self
            .store
            .find_movement(movement_id)
            .await?
            .ok_or_else(|| LedgerError::MovementNotFound(movement_id.to_string()))?;

        if record.entry_status != EntryStatus::Confirmed {
            return Err(LedgerError::NotReconcilable {
                movement_id: movement_id.to_string(),
                reason: format!("entry '{}' is {}", record.entry_number, record.entry_status),
            });
        }

        let conflicting = if bank.reconciled {
            Some(bank_movement_id)
        } else if record.movement.reconciled {
            Some(movement_id)
        } else {
            None
        };
        if let Some(conflicting_id) = conflicting {
            tracing::warn!(bank_movement_id, movement_id, conflicting_id, "already reconciled");
            return Err(LedgerError::AlreadyReconciled {
                bank_movement_id: bank_movement_id.to_string(),
                movement_id: movement_id.to_string(),
                conflicting_id: conflicting_id.to_string(),
            });
        }

        if let Some(tolerance) = &self.tolerance {
            let bank_amount = bank.signed_amount();
            let movement_amount = record.movement.debit_minus_credit();
            if (&bank_amount - &movement_amount).abs() > *tolerance {
                tracing::warn!(
                    bank_movement_id,
                    movement_id,
                    %bank_amount,
                    %movement_amount,
                    "reconciliation amounts differ"
                );
                return Err(LedgerError::AmountMismatch {
                    bank_movement_id: bank_movement_id.to_string(),
                    movement_id: movement_id.to_string(),
                    bank_amount,
                    movement_amount,
                    tolerance: tolerance.clone(),
                });
            }
        }

        self.store.link(bank_movement_id, movement_id).await?;
        tracing::info!(bank_movement_id, movement_id, entry_number = %record.entry_number, "movements reconciled");

        Ok(ReconciliationLink {
            bank_movement_id: bank_movement_id.to_string(),
            movement_id: movement_id.to_string(),
        })
    }

    /// Clear the link between two movements, returning both to PENDING
    pub async fn revert(&self, bank_movement_id: &str, movement_id: &str) -> LedgerResult<()> {
        self.store.unlink(bank_movement_id, movement_id).await?;
        tracing::info!(bank_movement_id, movement_id, "reconciliation reverted");
        Ok(())
    }

    /// Reconciled and pending totals on both sides of a bank account.
    ///
    /// The bank account's statement lines and its ledger account share
    /// `bank_account_id`.
    pub async fn summary(&self, bank_account_id: &str) -> LedgerResult<ReconciliationSummary> {
        let mut bank = SideSummary::default();
        for movement in self.store.list_bank_movements(bank_account_id).await? {
            bank.add(movement.reconciliation_state(), movement.signed_amount());
        }

        let mut accounting = SideSummary::default();
        for record in self.store.list_account_movements(bank_account_id).await? {
            accounting.add(
                record.movement.reconciliation_state(),
                record.movement.debit_minus_credit(),
            );
        }

        let unreconciled_difference = &bank.pending_amount - &accounting.pending_amount;
        tracing::debug!(
            bank_account_id,
            bank_pending = bank.pending_count,
            accounting_pending = accounting.pending_count,
            %unreconciled_difference,
            "reconciliation summary"
        );

        Ok(ReconciliationSummary {
            bank_account_id: bank_account_id.to_string(),
            bank,
            accounting,
            unreconciled_difference,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Store with one bank account, a confirmed deposit entry and statement lines

    use super::*;
    use crate::traits::JournalStore;
    use crate::utils::memory_storage::MemoryStorage;
    use chrono::NaiveDate;

    pub fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn movement(id: &str, account: &str, debit: i64, credit: i64) -> Movement {
        let mut movement = Movement::new(
            account.to_string(),
            BigDecimal::from(debit),
            BigDecimal::from(credit),
            None,
        );
        movement.id = id.to_string();
        movement
    }

    /// Movements `a1` (+1500) and `a2` (+1500) on bank account `1041`, `a3`
    /// (-200) in entry 2, and `d1` (+40) in draft entry 3. Bank lines `b1`
    /// (+1500), `b2` (+1500) and `b3` (-200).
    pub async fn store() -> MemoryStorage {
        let mut store = MemoryStorage::new();

        let mut deposits = JournalEntry::new(
            "e1".to_string(),
            "1".to_string(),
            date(4),
            "Customer deposits".to_string(),
            None,
        );
        deposits.add_movement(movement("a1", "1041", 1500, 0));
        deposits.add_movement(movement("a2", "1041", 1500, 0));
        deposits.add_movement(movement("r1", "1212", 0, 3000));
        deposits.status = EntryStatus::Confirmed;
        store.save_entry(&deposits).await.unwrap();

        let mut fee = JournalEntry::new(
            "e2".to_string(),
            "2".to_string(),
            date(6),
            "Supplier payment".to_string(),
            None,
        );
        fee.add_movement(movement("p1", "4212", 200, 0));
        fee.add_movement(movement("a3", "1041", 0, 200));
        fee.status = EntryStatus::Confirmed;
        store.save_entry(&fee).await.unwrap();

        let mut draft = JournalEntry::new(
            "e3".to_string(),
            "3".to_string(),
            date(7),
            "Draft interest".to_string(),
            None,
        );
        draft.add_movement(movement("d1", "1041", 40, 0));
        draft.add_movement(movement("i1", "7721", 0, 40));
        store.save_entry(&draft).await.unwrap();

        for (id, amount, direction) in [
            ("b1", 1500, BankDirection::CreditToAccount),
            ("b2", 1500, BankDirection::CreditToAccount),
            ("b3", 200, BankDirection::DebitFromAccount),
        ] {
            store
                .save_bank_movement(&BankMovement::new(
                    id.to_string(),
                    date(8),
                    BigDecimal::from(amount),
                    direction,
                    "1041".to_string(),
                    None,
                ))
                .await
                .unwrap();
        }
        store
    }

    pub fn matcher(store: MemoryStorage) -> ReconciliationMatcher<MemoryStorage> {
        ReconciliationMatcher::new(store, Some(BigDecimal::from(1) / BigDecimal::from(100)))
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn test_second_match_on_same_bank_movement_fails() {
        let matcher = matcher(store().await);

        let link = matcher.match_movements("b1", "a1").await.unwrap();
        assert_eq!(link.movement_id, "a1");

        let err = matcher.match_movements("b1", "a2").await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::AlreadyReconciled {
                bank_movement_id: "b1".to_string(),
                movement_id: "a2".to_string(),
                conflicting_id: "b1".to_string(),
            }
        );

        let err = matcher.match_movements("b2", "a1").await.unwrap_err();
        assert!(
            matches!(err, LedgerError::AlreadyReconciled { conflicting_id, .. } if conflicting_id == "a1")
        );
    }

    #[tokio::test]
    async fn test_match_then_revert_restores_pending() {
        let matcher = matcher(store().await);
        matcher.match_movements("b1", "a1").await.unwrap();

        let bank = matcher.store().get_bank_movement("b1").await.unwrap().unwrap();
        assert_eq!(bank.reconciliation_state(), ReconciliationState::Reconciled);
        assert_eq!(bank.linked_movement_id.as_deref(), Some("a1"));

        matcher.revert("b1", "a1").await.unwrap();
        let bank = matcher.store().get_bank_movement("b1").await.unwrap().unwrap();
        let record = matcher.store().find_movement("a1").await.unwrap().unwrap();
        assert_eq!(bank.reconciliation_state(), ReconciliationState::Pending);
        assert_eq!(bank.linked_movement_id, None);
        assert_eq!(record.movement.reconciliation_state(), ReconciliationState::Pending);
        assert_eq!(record.movement.linked_bank_movement_id, None);

        // The pair can be matched again afterwards
        matcher.match_movements("b1", "a2").await.unwrap();
    }

    #[tokio::test]
    async fn test_revert_requires_mutual_link() {
        let matcher = matcher(store().await);
        matcher.match_movements("b1", "a1").await.unwrap();

        let err = matcher.revert("b1", "a2").await.unwrap_err();
        assert!(matches!(err, LedgerError::NotReconciled { .. }));
        let err = matcher.revert("b2", "a2").await.unwrap_err();
        assert!(matches!(err, LedgerError::NotReconciled { .. }));

        // Nothing changed on the linked pair
        let bank = matcher.store().get_bank_movement("b1").await.unwrap().unwrap();
        assert!(bank.reconciled);
    }

    #[tokio::test]
    async fn test_amount_tolerance() {
        let store = store().await;

        let err = matcher(store.clone())
            .match_movements("b3", "a1")
            .await
            .unwrap_err();
        match err {
            LedgerError::AmountMismatch {
                bank_amount,
                movement_amount,
                ..
            } => {
                assert_eq!(bank_amount, BigDecimal::from(-200));
                assert_eq!(movement_amount, BigDecimal::from(1500));
            }
            other => panic!("unexpected error: {other}"),
        }

        // Withdrawal against a credit to the bank account agrees in sign
        matcher(store.clone()).match_movements("b3", "a3").await.unwrap();

        // Without a tolerance any amount is accepted
        ReconciliationMatcher::new(store, None)
            .match_movements("b2", "a2")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_and_unconfirmed_movements() {
        let matcher = matcher(store().await);

        assert!(matches!(
            matcher.match_movements("zz", "a1").await,
            Err(LedgerError::BankMovementNotFound(_))
        ));
        assert!(matches!(
            matcher.match_movements("b1", "zz").await,
            Err(LedgerError::MovementNotFound(_))
        ));
        assert!(matches!(
            matcher.match_movements("b1", "d1").await,
            Err(LedgerError::NotReconcilable { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_matches_on_one_bank_movement() {
        let store = store().await;
        let first = matcher(store.clone());
        let second = matcher(store.clone());

        let a = tokio::spawn(async move { first.match_movements("b1", "a1").await });
        let b = tokio::spawn(async move { second.match_movements("b1", "a2").await });
        let results = [a.await.unwrap(), b.await.unwrap()];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(LedgerError::AlreadyReconciled { .. })
        )));

        let reconciled = [
            store.find_movement("a1").await.unwrap().unwrap(),
            store.find_movement("a2").await.unwrap().unwrap(),
        ]
        .iter()
        .filter(|r| r.movement.reconciled)
        .count();
        assert_eq!(reconciled, 1);
    }

    #[tokio::test]
    async fn test_summary() {
        let matcher = matcher(store().await);
        matcher.match_movements("b1", "a1").await.unwrap();

        let summary = matcher.summary("1041").await.unwrap();
        assert_eq!(summary.bank.reconciled_count, 1);
        assert_eq!(summary.bank.reconciled_amount, BigDecimal::from(1500));
        assert_eq!(summary.bank.pending_count, 2);
        assert_eq!(summary.bank.pending_amount, BigDecimal::from(1300));
        // the draft movement d1 is not part of the books
        assert_eq!(summary.accounting.pending_count, 2);
        assert_eq!(summary.accounting.pending_amount, BigDecimal::from(1300));
        assert_eq!(summary.unreconciled_difference, BigDecimal::from(0));
    }
}
