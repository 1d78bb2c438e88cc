// 📤 Split & Balance Extraction
//
// Turns (account, split, transaction) into flat rows. Nothing is filtered or
// aggregated here; that happens in the daily reshaper.
//
// The *_table functions are the top-level operations: they own the session
// for the whole walk-and-extract and release it on every exit path.

use crate::account_type::AccountType;
use crate::error::{LedgerError, Result};
use crate::ledger::{AccountNaming, Commodity, LedgerAccount, LedgerSession, SessionGuard, SplitView};
use crate::walker::{accounts_by_type, walk};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

// ============================================================================
// RECORDS
// ============================================================================

/// One split, denormalized. Duplicates are legal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    pub account: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
}

/// Balance of one account at the end of one day (a stock, not a flow)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub account: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub date: NaiveDate,
    pub balance: f64,
}

/// Account listing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account: String,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
}

/// Splits of one account, kept together for per-account dumps
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSplits {
    pub account: String,
    pub splits: Vec<SplitView>,
}

// ============================================================================
// DATE RANGE
// ============================================================================

/// Half-open range of calendar days: `start` included, `end` excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(LedgerError::InvalidDateRange { start, end });
        }
        Ok(DateRange { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.len() as i64).map(move |offset| start + Duration::days(offset))
    }
}

// ============================================================================
// EXTRACTORS
// ============================================================================

/// One record per split, accounts in the given order, splits in native order
pub fn extract_splits<A: LedgerAccount>(accounts: &[A], naming: AccountNaming) -> Result<Vec<SplitRecord>> {
    let mut records = Vec::new();

    for account in accounts {
        let label = account.label(naming);
        let account_type = account.account_type();

        for split in account.splits()? {
            records.push(SplitRecord {
                account: label.to_string(),
                account_type,
                date: split.date,
                description: split.description,
                amount: split.amount,
            });
        }
    }

    log::debug!("Extracted {} splits from {} accounts", records.len(), accounts.len());
    Ok(records)
}

/// One record per (account, day). Cost grows with accounts x days.
pub fn extract_balances<A: LedgerAccount>(
    accounts: &[A],
    range: DateRange,
    currency: &Commodity,
    naming: AccountNaming,
) -> Result<Vec<BalanceRecord>> {
    let mut records = Vec::with_capacity(accounts.len() * range.len());

    for account in accounts {
        let label = account.label(naming);
        let account_type = account.account_type();

        for date in range.days() {
            records.push(BalanceRecord {
                account: label.to_string(),
                account_type,
                date,
                balance: account.balance_as_of(date, currency)?,
            });
        }
    }

    log::debug!(
        "Extracted {} balances ({} accounts x {} days)",
        records.len(),
        accounts.len(),
        range.len()
    );
    Ok(records)
}

// ============================================================================
// SESSION-SCOPED OPERATIONS
// ============================================================================

/// Every split of every account in the book
pub fn splits_table<S: LedgerSession>(session: S, naming: AccountNaming) -> Result<Vec<SplitRecord>> {
    let guard = SessionGuard::new(session);

    let records = {
        let root = guard.session().root()?;
        let accounts = walk(&root)?;
        extract_splits(&accounts, naming)?
    };

    guard.release();
    Ok(records)
}

/// Daily balances of every account over `range`, in the currency named `currency_code`
pub fn balances_table<S: LedgerSession>(
    session: S,
    range: DateRange,
    currency_code: &str,
    naming: AccountNaming,
) -> Result<Vec<BalanceRecord>> {
    let guard = SessionGuard::new(session);

    let records = {
        let currency = guard.session().lookup_currency(currency_code)?;
        let root = guard.session().root()?;
        let accounts = walk(&root)?;
        extract_balances(&accounts, range, &currency, naming)?
    };

    guard.release();
    Ok(records)
}

/// Splits grouped per account, for accounts of one type
pub fn splits_by_account<S: LedgerSession>(
    session: S,
    account_type: AccountType,
    naming: AccountNaming,
) -> Result<Vec<AccountSplits>> {
    let guard = SessionGuard::new(session);

    let grouped = {
        let root = guard.session().root()?;
        let accounts = accounts_by_type(&root, account_type)?;
        accounts
            .iter()
            .map(|account| -> Result<AccountSplits> {
                Ok(AccountSplits {
                    account: account.label(naming).to_string(),
                    splits: account.splits()?,
                })
            })
            .collect::<Result<Vec<_>>>()?
    };

    guard.release();
    Ok(grouped)
}

/// Accounts in walk order, optionally only one type
pub fn account_list<S: LedgerSession>(session: S, account_type: Option<AccountType>) -> Result<Vec<AccountSummary>> {
    let guard = SessionGuard::new(session);

    let summaries = {
        let root = guard.session().root()?;
        let accounts = match account_type {
            Some(t) => accounts_by_type(&root, t)?,
            None => walk(&root)?,
        };
        accounts
            .iter()
            .map(|a| AccountSummary {
                account: a.full_name().to_string(),
                name: a.name().to_string(),
                account_type: a.account_type(),
            })
            .collect::<Vec<_>>()
    };

    guard.release();
    Ok(summaries)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBook, MemorySession};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sample_book() -> MemoryBook {
        let book = MemoryBook::new();
        let root = book.root();

        let assets = root.add_child("Assets", AccountType::Asset);
        let checking = assets.add_child("Checking", AccountType::Bank);
        checking
            .add_split(day(1), "Salary", 1000.0)
            .add_split(day(1), "Groceries", -10.0)
            .add_split(day(3), "Groceries", -10.0);

        let expenses = root.add_child("Expenses", AccountType::Expense);
        expenses.add_child("Empty", AccountType::Expense);
        let groceries = expenses.add_child("Groceries", AccountType::Expense);
        groceries
            .add_split(day(1), "Groceries", 10.0)
            .add_split(day(3), "Groceries", 10.0);

        let income = root.add_child("Income", AccountType::Income);
        income.add_split(day(1), "Salary", -1000.0);
        book
    }

    #[test]
    fn test_extract_one_record_per_split() {
        let book = sample_book();
        let accounts = walk(&book.root()).unwrap();
        let records = extract_splits(&accounts, AccountNaming::Name).unwrap();

        let expected: usize = accounts.iter().map(|a| a.splits().unwrap().len()).sum();
        assert_eq!(records.len(), expected);
        assert_eq!(records.len(), 6);

        // Empty account contributes nothing
        assert!(!records.iter().any(|r| r.account == "Empty"));

        // Walk order, then native split order
        assert_eq!(records[0].account, "Checking");
        assert_eq!(records[0].description, "Salary");
        assert_eq!(records[2].date, day(3));
        assert_eq!(records[3].account, "Groceries");
        assert_eq!(records[3].account_type, AccountType::Expense);
    }

    #[test]
    fn test_extract_keeps_duplicate_rows() {
        let book = MemoryBook::new();
        let food = book.root().add_child("Food", AccountType::Expense);
        food.add_split(day(2), "Coffee", 3.0).add_split(day(2), "Coffee", 3.0);

        let records = extract_splits(&walk(&book.root()).unwrap(), AccountNaming::Name).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], records[1]);
    }

    #[test]
    fn test_extract_full_names() {
        let book = sample_book();
        let records = splits_table(MemorySession::new(book), AccountNaming::FullName).unwrap();
        assert_eq!(records[0].account, "Assets:Checking");
        assert_eq!(records[3].account, "Expenses:Groceries");
    }

    #[test]
    fn test_splits_table_is_idempotent() {
        let book = sample_book();
        let first = splits_table(MemorySession::new(book.clone()), AccountNaming::Name).unwrap();
        let second = splits_table(MemorySession::new(book), AccountNaming::Name).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_splits_table_releases_once_on_success() {
        let session = MemorySession::new(sample_book());
        let probe = session.probe();

        splits_table(session, AccountNaming::Name).unwrap();

        assert_eq!(probe.ends(), 1);
        assert_eq!(probe.destroys(), 1);
    }

    #[test]
    fn test_splits_table_releases_once_on_error() {
        let book = sample_book();
        let broken = book.root().add_child("Broken", AccountType::Expense);
        broken.fail_with("split list unavailable");

        let session = MemorySession::new(book);
        let probe = session.probe();

        let err = splits_table(session, AccountNaming::Name).unwrap_err();

        assert!(err.to_string().contains("split list unavailable"));
        assert_eq!(probe.ends(), 1);
        assert_eq!(probe.destroys(), 1);
    }

    #[test]
    fn test_date_range_excludes_end() {
        let range = DateRange::new(day(1), day(3)).unwrap();
        let days: Vec<_> = range.days().collect();

        assert_eq!(days, vec![day(1), day(2)]);
        assert_eq!(range.len(), 2);
        assert!(DateRange::new(day(3), day(3)).unwrap().is_empty());
        assert!(matches!(
            DateRange::new(day(3), day(1)),
            Err(LedgerError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_balances_cover_accounts_times_days() {
        let book = sample_book();
        let n_accounts = walk(&book.root()).unwrap().len();
        let range = DateRange::new(day(1), day(3)).unwrap();

        let records = balances_table(MemorySession::new(book), range, "USD", AccountNaming::Name).unwrap();

        assert_eq!(records.len(), 2 * n_accounts);
        assert!(records.iter().all(|r| r.date != day(3)));

        let checking: Vec<f64> = records
            .iter()
            .filter(|r| r.account == "Checking")
            .map(|r| r.balance)
            .collect();
        assert_eq!(checking, vec![990.0, 990.0]);

        // Parent balance does not include children
        let expenses: Vec<f64> = records
            .iter()
            .filter(|r| r.account == "Expenses")
            .map(|r| r.balance)
            .collect();
        assert_eq!(expenses, vec![0.0, 0.0]);
    }

    #[test]
    fn test_balances_unknown_currency_releases_session() {
        let session = MemorySession::new(sample_book());
        let probe = session.probe();
        let range = DateRange::new(day(1), day(3)).unwrap();

        let err = balances_table(session, range, "XYZ", AccountNaming::Name).unwrap_err();

        assert!(matches!(err, LedgerError::UnknownCommodity { .. }));
        assert_eq!(probe.ends(), 1);
        assert_eq!(probe.destroys(), 1);
    }

    #[test]
    fn test_splits_by_account_only_requested_type() {
        let grouped = splits_by_account(
            MemorySession::new(sample_book()),
            AccountType::Expense,
            AccountNaming::Name,
        )
        .unwrap();

        let names: Vec<_> = grouped.iter().map(|g| g.account.as_str()).collect();
        assert_eq!(names, vec!["Expenses", "Empty", "Groceries"]);
        assert!(grouped[1].splits.is_empty());
        assert_eq!(grouped[2].splits.len(), 2);
    }

    #[test]
    fn test_account_list_filters_by_type() {
        let all = account_list(MemorySession::new(sample_book()), None).unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[1].account, "Assets:Checking");

        let income = account_list(MemorySession::new(sample_book()), Some(AccountType::Income)).unwrap();
        assert_eq!(income.len(), 1);
        assert_eq!(income[0].name, "Income");
    }
}
