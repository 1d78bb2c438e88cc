// 📅 Daily Reshaper
//
// Pivots split records into a table with one row per calendar day and one
// column per account. Same-day amounts for an account are summed. Every day
// between the first and the last record gets a row; absent cells are 0.0,
// so rolling and cumulative computations can rely on a dense grid.

use crate::account_type::AccountType;
use crate::error::{LedgerError, Result};
use crate::extract::SplitRecord;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Value types a `DailyTable` can hold
pub trait TableCell: Copy + Serialize {
    /// Human-readable form, two decimals
    fn text(&self) -> String;

    /// Machine-readable form, full precision
    fn field(&self) -> String;
}

impl TableCell for f64 {
    fn text(&self) -> String {
        format!("{:.2}", self)
    }

    fn field(&self) -> String {
        self.to_string()
    }
}

/// `None` marks a rolling window that is not yet full
impl TableCell for Option<f64> {
    fn text(&self) -> String {
        match self {
            Some(v) => v.text(),
            None => "NaN".to_string(),
        }
    }

    fn field(&self) -> String {
        self.map(|v| v.to_string()).unwrap_or_default()
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// Date-indexed, account-columned table. `values[row][col]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTable<T = f64> {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Vec<Vec<T>>,
}

impl<T: TableCell> DailyTable<T> {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, &[T])> {
        self.dates.iter().copied().zip(self.values.iter().map(|r| r.as_slice()))
    }

    pub fn value(&self, date: NaiveDate, account: &str) -> Option<T> {
        let row = self.dates.binary_search(&date).ok()?;
        let col = self.columns.iter().position(|c| c == account)?;
        Some(self.values[row][col])
    }

    pub fn column(&self, account: &str) -> Option<Vec<T>> {
        let col = self.columns.iter().position(|c| c == account)?;
        Some(self.values.iter().map(|row| row[col]).collect())
    }
}

impl DailyTable<f64> {
    /// Trailing mean over `window` days; the first `window - 1` rows are `None`
    pub fn rolling_mean(&self, window: usize) -> Result<DailyTable<Option<f64>>> {
        if window == 0 {
            return Err(LedgerError::InvalidWindow);
        }

        let values = (0..self.dates.len())
            .map(|row| {
                (0..self.columns.len())
                    .map(|col| {
                        if row + 1 < window {
                            return None;
                        }
                        let sum: f64 = self.values[row + 1 - window..=row]
                            .iter()
                            .map(|r| r[col])
                            .sum();
                        Some(sum / window as f64)
                    })
                    .collect()
            })
            .collect();

        Ok(DailyTable {
            dates: self.dates.clone(),
            columns: self.columns.clone(),
            values,
        })
    }

    /// Running total per column
    pub fn cumsum(&self) -> DailyTable<f64> {
        let mut running = vec![0.0; self.columns.len()];
        let values = self
            .values
            .iter()
            .map(|row| {
                for (total, v) in running.iter_mut().zip(row) {
                    *total += v;
                }
                running.clone()
            })
            .collect();

        DailyTable {
            dates: self.dates.clone(),
            columns: self.columns.clone(),
            values,
        }
    }
}

// ============================================================================
// RESHAPE
// ============================================================================

/// Daily totals per account for accounts of `account_type`
pub fn daily(records: &[SplitRecord], account_type: AccountType) -> DailyTable {
    let mut sums: BTreeMap<(NaiveDate, &str), f64> = BTreeMap::new();
    let mut columns: BTreeSet<&str> = BTreeSet::new();

    for record in records.iter().filter(|r| r.account_type == account_type) {
        *sums.entry((record.date, record.account.as_str())).or_insert(0.0) += record.amount;
        columns.insert(record.account.as_str());
    }

    // BTreeMap keys are ordered by date first
    let span = sums
        .keys()
        .next()
        .zip(sums.keys().next_back())
        .map(|((first, _), (last, _))| (*first, *last));

    let dates: Vec<NaiveDate> = match span {
        Some((first, last)) => {
            let n = (last - first).num_days();
            (0..=n).map(|offset| first + Duration::days(offset)).collect()
        }
        None => Vec::new(),
    };

    let values = dates
        .iter()
        .map(|date| {
            columns
                .iter()
                .map(|account| sums.get(&(*date, *account)).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    log::debug!(
        "Daily table for {}: {} days x {} accounts",
        account_type,
        dates.len(),
        columns.len()
    );

    DailyTable {
        dates,
        columns: columns.into_iter().map(String::from).collect(),
        values,
    }
}

// ============================================================================
// TESTS
// ============================================================================
