//! Validation utilities

use bigdecimal::BigDecimal;

use crate::traits::*;
use crate::types::*;

/// The default balance tolerance, 0.01
pub fn default_epsilon() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(100)
}

/// Whether `a` and `b` differ by at most `epsilon`
pub fn within_epsilon(a: &BigDecimal, b: &BigDecimal, epsilon: &BigDecimal) -> bool {
    (a - b).abs() <= *epsilon
}

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(LedgerError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that an account code is valid
pub fn validate_account_code(code: &str) -> LedgerResult<()> {
    if code.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account code cannot be empty".to_string(),
        ));
    }

    if code.len() > 50 {
        return Err(LedgerError::Validation(
            "Account code cannot exceed 50 characters".to_string(),
        ));
    }

    // Hierarchical codes are digits, letters and separators
    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '.' || c == '_')
    {
        return Err(LedgerError::Validation(format!(
            "Account code '{}' can only contain alphanumeric characters, dots, dashes, and underscores",
            code
        )));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account name cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(LedgerError::Validation(
            "Account name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that an entry description is valid
pub fn validate_entry_description(description: &str) -> LedgerResult<()> {
    if description.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Entry description cannot be empty".to_string(),
        ));
    }

    if description.len() > 500 {
        return Err(LedgerError::Validation(
            "Entry description cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Requires a usable description and number on every confirmed entry
pub struct DescriptionPolicy;

impl EntryPolicy for DescriptionPolicy {
    fn check(&self, entry: &JournalEntry) -> LedgerResult<()> {
        validate_entry_description(&entry.description)?;
        if entry.number.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Entry number cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rejects entries posting the same account twice on the same side
pub struct DuplicateLinePolicy;

impl EntryPolicy for DuplicateLinePolicy {
    fn check(&self, entry: &JournalEntry) -> LedgerResult<()> {
        let mut seen = std::collections::HashSet::new();
        for movement in &entry.movements {
            let is_debit = movement.debit > BigDecimal::from(0);
            if !seen.insert((movement.account_id.as_str(), is_debit)) {
                return Err(LedgerError::Validation(format!(
                    "Account '{}' appears multiple times on the same side of entry '{}'",
                    movement.account_id, entry.number
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    #[test]
    fn test_epsilon_comparison() {
        let eps = default_epsilon();
        assert_eq!(eps, BigDecimal::from_str("0.01").unwrap());
        assert!(within_epsilon(
            &BigDecimal::from_str("100.005").unwrap(),
            &BigDecimal::from(100),
            &eps
        ));
        assert!(within_epsilon(
            &BigDecimal::from_str("100.01").unwrap(),
            &BigDecimal::from(100),
            &eps
        ));
        assert!(!within_epsilon(
            &BigDecimal::from_str("100.02").unwrap(),
            &BigDecimal::from(100),
            &eps
        ));
    }

    #[test]
    fn test_account_code_rules() {
        assert!(validate_account_code("1011").is_ok());
        assert!(validate_account_code("10.1.1").is_ok());
        assert!(validate_account_code("").is_err());
        assert!(validate_account_code("10 11").is_err());
        assert!(validate_positive_amount(&BigDecimal::from(0)).is_err());
    }

    #[test]
    fn test_duplicate_line_policy() {
        let mut entry = JournalEntry::new(
            "e1".to_string(),
            "7".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "Split".to_string(),
            None,
        );
        entry.add_movement(Movement::debit("cash".to_string(), BigDecimal::from(5), None));
        entry.add_movement(Movement::debit("cash".to_string(), BigDecimal::from(5), None));
        entry.add_movement(Movement::credit("sales".to_string(), BigDecimal::from(10), None));

        assert!(DuplicateLinePolicy.check(&entry).is_err());
        assert!(DescriptionPolicy.check(&entry).is_ok());

        entry.description = "   ".to_string();
        assert!(DescriptionPolicy.check(&entry).is_err());
    }
}
