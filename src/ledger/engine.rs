//! Ledger engine: opening, running and closing balances of one account
//!
//! Balances are recomputed from the raw entries on every call. Only
//! CONFIRMED entries count, including for the opening balance.

use bigdecimal::BigDecimal;
use std::cmp::Ordering;

use crate::ledger::chart::{resolve_nature, AccountDirectory};
use crate::types::*;

/// Computes general-ledger views for accounts of one directory
#[derive(Debug, Clone, Copy)]
pub struct LedgerEngine<'a> {
    directory: &'a AccountDirectory,
}

impl<'a> LedgerEngine<'a> {
    pub fn new(directory: &'a AccountDirectory) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &'a AccountDirectory {
        self.directory
    }

    /// General ledger of `account_id` over `period`.
    ///
    /// Lines are ordered by entry date, then entry number, then entry id, then
    /// the movement's position inside its entry.
    pub fn account_ledger(
        &self,
        account_id: &str,
        period: Period,
        entries: &[JournalEntry],
    ) -> LedgerResult<AccountLedger> {
        let account = self.directory.get_account(account_id)?;
        let nature = resolve_nature(account.account_type);

        let opening_balance: BigDecimal = entries
            .iter()
            .filter(|e| e.is_confirmed() && period.precedes(e.date))
            .flat_map(|e| e.movements.iter())
            .filter(|m| m.account_id == account_id)
            .map(|m| nature.signed(&m.debit, &m.credit))
            .sum();

        let in_period: Vec<&JournalEntry> = entries
            .iter()
            .filter(|e| e.is_confirmed() && period.contains(e.date))
            .collect();

        let mut running_balance = opening_balance.clone();
        let mut total_debit = BigDecimal::from(0);
        let mut total_credit = BigDecimal::from(0);
        let mut lines = Vec::new();

        for entry in chronological(in_period) {
            for movement in entry.movements.iter().filter(|m| m.account_id == account_id) {
                running_balance += nature.signed(&movement.debit, &movement.credit);
                total_debit += &movement.debit;
                total_credit += &movement.credit;
                lines.push(LedgerLine {
                    date: entry.date,
                    entry_id: entry.id.clone(),
                    entry_number: entry.number.clone(),
                    movement_id: movement.id.clone(),
                    description: movement
                        .description
                        .clone()
                        .unwrap_or_else(|| entry.description.clone()),
                    reference: entry.reference.clone(),
                    debit: movement.debit.clone(),
                    credit: movement.credit.clone(),
                    running_balance: running_balance.clone(),
                });
            }
        }

        tracing::debug!(
            account_id,
            lines = lines.len(),
            opening = %opening_balance,
            closing = %running_balance,
            "computed account ledger"
        );

        Ok(AccountLedger {
            account: account.clone(),
            period,
            opening_balance,
            movements: lines,
            total_debit,
            total_credit,
            closing_balance: running_balance,
        })
    }

    /// Closing balance of `account_id` at the end of `period`
    pub fn closing_balance(
        &self,
        account_id: &str,
        period: Period,
        entries: &[JournalEntry],
    ) -> LedgerResult<BigDecimal> {
        Ok(self
            .account_ledger(account_id, period, entries)?
            .closing_balance)
    }
}

/// Sort entries by date, entry number and id
pub fn chronological<'e>(mut entries: Vec<&'e JournalEntry>) -> Vec<&'e JournalEntry> {
    entries.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| compare_entry_numbers(&a.number, &b.number))
            .then_with(|| a.id.cmp(&b.id))
    });
    entries
}

/// Natural ordering of entry numbers: digit runs compare numerically, so
/// `"AS-2"` sorts before `"AS-10"`.
pub fn compare_entry_numbers(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let l_trim = l_run.trim_start_matches('0');
                let r_trim = r_run.trim_start_matches('0');
                let ordering = l_trim
                    .len()
                    .cmp(&r_trim.len())
                    .then_with(|| l_trim.cmp(r_trim));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(&r);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        run.push(c);
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn amount(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    fn directory() -> AccountDirectory {
        let mut directory = AccountDirectory::new();
        for (code, account_type) in [
            ("1011", AccountType::Asset),
            ("7011", AccountType::Income),
            ("40111", AccountType::Liability),
        ] {
            directory
                .add_account(Account::new(
                    code.to_string(),
                    code.to_string(),
                    code.to_string(),
                    account_type,
                    None,
                ))
                .unwrap();
        }
        directory
    }

    fn entry(
        number: &str,
        on: NaiveDate,
        status: EntryStatus,
        movements: Vec<Movement>,
    ) -> JournalEntry {
        let mut entry = JournalEntry::new(
            format!("id-{}", number),
            number.to_string(),
            on,
            format!("Entry {}", number),
            None,
        );
        entry.movements = movements;
        entry.status = status;
        entry
    }

    fn sale(number: &str, on: NaiveDate, total: &str, base: &str, tax: &str) -> JournalEntry {
        entry(
            number,
            on,
            EntryStatus::Confirmed,
            vec![
                Movement::debit("1011".to_string(), amount(total), None),
                Movement::credit("7011".to_string(), amount(base), None),
                Movement::credit("40111".to_string(), amount(tax), None),
            ],
        )
    }

    fn march() -> Period {
        Period::between(date(2024, 3, 1), date(2024, 3, 31))
    }

    #[test]
    fn test_split_sale_in_march() {
        let directory = directory();
        let entries = vec![sale("1", date(2024, 3, 15), "1180", "1000", "180")];

        let ledger = LedgerEngine::new(&directory)
            .account_ledger("1011", march(), &entries)
            .unwrap();

        assert_eq!(ledger.opening_balance, amount("0"));
        assert_eq!(ledger.closing_balance, amount("1180.00"));
        assert_eq!(ledger.total_debit, amount("1180.00"));
        assert_eq!(ledger.total_credit, amount("0.00"));
        assert_eq!(ledger.movements.len(), 1);
        assert_eq!(ledger.movements[0].running_balance, amount("1180"));

        let tax = LedgerEngine::new(&directory)
            .account_ledger("40111", march(), &entries)
            .unwrap();
        assert_eq!(tax.closing_balance, amount("180"));
        assert_eq!(tax.total_credit, amount("180"));
    }

    #[test]
    fn test_drafts_and_voids_are_ignored_everywhere() {
        let directory = directory();
        let mut february_void = sale("1", date(2024, 2, 10), "50", "40", "10");
        february_void.status = EntryStatus::Void;
        let mut march_draft = sale("2", date(2024, 3, 10), "70", "60", "10");
        march_draft.status = EntryStatus::Draft;
        let entries = vec![
            february_void,
            march_draft,
            sale("3", date(2024, 3, 20), "118", "100", "18"),
        ];

        let ledger = LedgerEngine::new(&directory)
            .account_ledger("1011", march(), &entries)
            .unwrap();
        assert_eq!(ledger.opening_balance, amount("0"));
        assert_eq!(ledger.closing_balance, amount("118"));
        assert_eq!(ledger.movements.len(), 1);
    }

    #[test]
    fn test_orders_by_date_then_number() {
        let directory = directory();
        let entries = vec![
            sale("10", date(2024, 3, 5), "10", "10", "0.00"),
            sale("2", date(2024, 3, 5), "20", "20", "0.00"),
            sale("1", date(2024, 3, 9), "30", "30", "0.00"),
        ];
        let ledger = LedgerEngine::new(&directory)
            .account_ledger("1011", march(), &entries)
            .unwrap();

        let numbers: Vec<&str> = ledger
            .movements
            .iter()
            .map(|l| l.entry_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["2", "10", "1"]);
        let running: Vec<BigDecimal> = ledger
            .movements
            .iter()
            .map(|l| l.running_balance.clone())
            .collect();
        assert_eq!(running, vec![amount("20"), amount("30"), amount("60")]);
    }

    #[test]
    fn test_income_account_decreases_on_debit() {
        let directory = directory();
        let refund = entry(
            "2",
            date(2024, 3, 20),
            EntryStatus::Confirmed,
            vec![
                Movement::debit("7011".to_string(), amount("100"), None),
                Movement::credit("1011".to_string(), amount("100"), None),
            ],
        );
        let entries = vec![sale("1", date(2024, 3, 1), "1180", "1000", "180"), refund];

        let ledger = LedgerEngine::new(&directory)
            .account_ledger("7011", march(), &entries)
            .unwrap();
        assert_eq!(ledger.closing_balance, amount("900"));
        assert_eq!(ledger.total_debit, amount("100"));
        assert_eq!(ledger.total_credit, amount("1000"));
    }

    #[test]
    fn test_consecutive_periods_are_continuous() {
        let directory = directory();
        let entries = vec![
            sale("1", date(2024, 1, 10), "118", "100", "18"),
            sale("2", date(2024, 2, 29), "236", "200", "36"),
            sale("3", date(2024, 3, 1), "354", "300", "54"),
        ];
        let engine = LedgerEngine::new(&directory);

        let first = Period::between(date(2024, 2, 1), date(2024, 2, 29));
        let second = first.following(Some(date(2024, 3, 31))).unwrap();
        let first_ledger = engine.account_ledger("1011", first, &entries).unwrap();
        let second_ledger = engine.account_ledger("1011", second, &entries).unwrap();

        assert_eq!(first_ledger.opening_balance, amount("118"));
        assert_eq!(first_ledger.closing_balance, second_ledger.opening_balance);
        assert_eq!(
            second_ledger.closing_balance,
            &second_ledger.opening_balance + amount("354")
        );
    }

    #[test]
    fn test_recomputation_is_idempotent() {
        let directory = directory();
        let entries = vec![
            sale("1", date(2024, 3, 3), "118", "100", "18"),
            sale("2", date(2024, 3, 4), "59", "50", "9"),
        ];
        let engine = LedgerEngine::new(&directory);
        let first = engine.account_ledger("1011", march(), &entries).unwrap();
        let second = engine.account_ledger("1011", march(), &entries).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_account_and_empty_ledger() {
        let directory = directory();
        let engine = LedgerEngine::new(&directory);

        let err = engine.account_ledger("9999", march(), &[]).unwrap_err();
        assert_eq!(err, LedgerError::AccountNotFound("9999".to_string()));

        let ledger = engine.account_ledger("1011", march(), &[]).unwrap();
        assert!(!ledger.has_movements());
        assert_eq!(ledger.closing_balance, BigDecimal::from(0));
    }

    #[test]
    fn test_entry_number_ordering() {
        assert_eq!(compare_entry_numbers("2", "10"), Ordering::Less);
        assert_eq!(compare_entry_numbers("AS-0009", "AS-10"), Ordering::Less);
        assert_eq!(compare_entry_numbers("B-1", "A-2"), Ordering::Greater);
        assert_eq!(compare_entry_numbers("7", "7"), Ordering::Equal);
        assert_eq!(compare_entry_numbers("7", "7a"), Ordering::Less);
    }
}
