//! Engine configuration
//!
//! Company, tolerances and labels are passed explicitly to every engine
//! component instead of being read from ambient state.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{LedgerError, LedgerResult};
use crate::utils::validation::default_epsilon;

/// Configuration for one company's books
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Company whose books are being computed
    pub company_id: String,
    /// Tolerance used by every balance comparison
    #[serde(default = "default_epsilon")]
    pub epsilon: BigDecimal,
    /// Bank reconciliation settings
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// Label of the synthetic equity row carrying the unclosed result
    #[serde(default = "default_net_income_label")]
    pub net_income_label: String,
}

/// Bank reconciliation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Maximum difference between matched amounts; `None` accepts any amount
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance: Option<BigDecimal>,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            amount_tolerance: default_amount_tolerance(),
        }
    }
}

fn default_amount_tolerance() -> Option<BigDecimal> {
    Some(default_epsilon())
}

pub(crate) fn default_net_income_label() -> String {
    "Current period result".to_string()
}

impl EngineConfig {
    /// Configuration with defaults for the given company
    pub fn new(company_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            epsilon: default_epsilon(),
            reconciliation: ReconciliationConfig::default(),
            net_income_label: default_net_income_label(),
        }
    }

    /// Load a configuration from a JSON document
    pub fn from_json_str(json: &str) -> LedgerResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the reconciliation amount tolerance
    pub fn with_amount_tolerance(mut self, tolerance: Option<BigDecimal>) -> Self {
        self.reconciliation.amount_tolerance = tolerance;
        self
    }

    /// Check the values are usable
    pub fn validate(&self) -> LedgerResult<()> {
        if self.company_id.trim().is_empty() {
            return Err(LedgerError::Config("company_id cannot be empty".to_string()));
        }
        if self.epsilon < BigDecimal::from(0) {
            return Err(LedgerError::Config(format!(
                "epsilon must not be negative, got {}",
                self.epsilon
            )));
        }
        if let Some(tolerance) = &self.reconciliation.amount_tolerance {
            if *tolerance < BigDecimal::from(0) {
                return Err(LedgerError::Config(format!(
                    "reconciliation.amount_tolerance must not be negative, got {}",
                    tolerance
                )));
            }
        }
        Ok(())
    }
}
