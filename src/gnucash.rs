// 🗄️ GnuCash SQLite backend
//
// Reads a book saved by GnuCash with the SQLite backend. Read-only: the file
// is opened without write or create flags and nothing is ever written.
//
// Tables used: books, accounts, transactions, splits, commodities, prices.

use crate::account_type::AccountType;
use crate::error::{LedgerError, Result};
use crate::ledger::{Commodity, LedgerAccount, LedgerSession, SplitView};
use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

// ============================================================================
// TIMESTAMPS
// ============================================================================

/// GnuCash stores UTC timestamps as "YYYY-MM-DD HH:MM:SS" (older files used
/// "YYYYMMDDHHMMSS"). Returns the local calendar day.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDate> {
    let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S"))
        .map_err(|_| LedgerError::InvalidTimestamp(raw.to_string()))?;

    Ok(Utc.from_utc_datetime(&parsed).with_timezone(&Local).date_naive())
}

fn ratio(num: i64, denom: i64) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

// ============================================================================
// SESSION
// ============================================================================

pub struct GncSession {
    path: PathBuf,
    conn: Option<Connection>,
}

impl GncSession {
    /// Open an existing book. Missing files and non-GnuCash files fail here,
    /// before there is anything to release.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| LedgerError::SessionOpen {
            path: path.display().to_string(),
            source,
        };

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(open_err)?;

        let books: i64 = conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .map_err(open_err)?;

        log::info!("Opened book {} ({} book record(s))", path.display(), books);
        Ok(GncSession {
            path,
            conn: Some(conn),
        })
    }

    /// Wrap a connection that already holds GnuCash tables
    pub fn from_connection(conn: Connection) -> Self {
        GncSession {
            path: PathBuf::from(":memory:"),
            conn: Some(conn),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(LedgerError::SessionClosed)
    }
}

impl LedgerSession for GncSession {
    type Account<'s> = GncAccount<'s>;

    fn root(&self) -> Result<GncAccount<'_>> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT a.guid, a.name, a.account_type, c.namespace, c.mnemonic
             FROM books b
             JOIN accounts a ON a.guid = b.root_account_guid
             LEFT JOIN commodities c ON c.guid = a.commodity_guid
             LIMIT 1",
            [],
            |row| AccountRow::from_row(row),
        )?
        .into_account(conn, None)
    }

    fn lookup_currency(&self, code: &str) -> Result<Commodity> {
        self.conn()?
            .query_row(
                "SELECT namespace, mnemonic FROM commodities
                 WHERE namespace = ?1 AND mnemonic = ?2",
                params![Commodity::CURRENCY_NAMESPACE, code],
                |row| {
                    Ok(Commodity {
                        namespace: row.get(0)?,
                        mnemonic: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| LedgerError::UnknownCommodity {
                namespace: Commodity::CURRENCY_NAMESPACE.to_string(),
                mnemonic: code.to_string(),
            })
    }

    fn end(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                log::warn!("Closing {} failed: {}", self.path.display(), e);
            }
        }
    }

    fn destroy(&mut self) {
        log::info!("Session on {} destroyed", self.path.display());
    }
}

// ============================================================================
// ACCOUNT
// ============================================================================

struct AccountRow {
    guid: String,
    name: String,
    account_type: String,
    namespace: Option<String>,
    mnemonic: Option<String>,
}

impl AccountRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(AccountRow {
            guid: row.get(0)?,
            name: row.get(1)?,
            account_type: row.get(2)?,
            namespace: row.get(3)?,
            mnemonic: row.get(4)?,
        })
    }

    fn into_account<'c>(self, conn: &'c Connection, parent: Option<&GncAccount<'c>>) -> Result<GncAccount<'c>> {
        let account_type = AccountType::from_storage_code(&self.account_type)?;

        let full_name = match parent {
            Some(p) if p.account_type != AccountType::Root => format!("{}:{}", p.full_name, self.name),
            Some(_) => self.name.clone(),
            None => String::new(),
        };

        Ok(GncAccount {
            conn,
            guid: self.guid,
            name: self.name,
            full_name,
            account_type,
            commodity: Commodity {
                namespace: self.namespace.unwrap_or_default(),
                mnemonic: self.mnemonic.unwrap_or_default(),
            },
        })
    }
}

/// Account handle borrowing the session's connection
#[derive(Debug, Clone)]
pub struct GncAccount<'c> {
    conn: &'c Connection,
    guid: String,
    name: String,
    full_name: String,
    account_type: AccountType,
    commodity: Commodity,
}

impl<'c> GncAccount<'c> {
    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn commodity(&self) -> &Commodity {
        &self.commodity
    }

    /// Latest direct quote on or before `date`, else reciprocal of the reverse quote
    fn rate(&self, currency: &Commodity, date: NaiveDate) -> Result<f64> {
        if let Some(rate) = self.quote(&self.commodity, currency, date)? {
            return Ok(rate);
        }
        if let Some(rate) = self.quote(currency, &self.commodity, date)? {
            if rate != 0.0 {
                return Ok(1.0 / rate);
            }
        }
        Err(LedgerError::MissingPrice {
            commodity: self.commodity.mnemonic.clone(),
            currency: currency.mnemonic.clone(),
            date,
        })
    }

    fn quote(&self, commodity: &Commodity, currency: &Commodity, date: NaiveDate) -> Result<Option<f64>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT p.date, p.value_num, p.value_denom
             FROM prices p
             JOIN commodities c ON c.guid = p.commodity_guid
             JOIN commodities cur ON cur.guid = p.currency_guid
             WHERE c.namespace = ?1 AND c.mnemonic = ?2
               AND cur.namespace = ?3 AND cur.mnemonic = ?4
             ORDER BY p.date DESC",
        )?;

        let quotes = stmt
            .query_map(
                params![commodity.namespace, commodity.mnemonic, currency.namespace, currency.mnemonic],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for (raw_date, num, denom) in quotes {
            if parse_timestamp(&raw_date)? <= date {
                return Ok(Some(ratio(num, denom)));
            }
        }
        Ok(None)
    }
}

impl<'c> LedgerAccount for GncAccount<'c> {
    fn name(&self) -> &str {
        &self.name
    }

    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn account_type(&self) -> AccountType {
        self.account_type
    }

    fn children(&self) -> Result<Vec<Self>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT a.guid, a.name, a.account_type, c.namespace, c.mnemonic
             FROM accounts a
             LEFT JOIN commodities c ON c.guid = a.commodity_guid
             WHERE a.parent_guid = ?1
             ORDER BY a.name, a.guid",
        )?;

        let rows = stmt
            .query_map([&self.guid], |row| AccountRow::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|row| row.into_account(self.conn, Some(self)))
            .collect()
    }

    /// Ordered the way GnuCash orders an account register: post date, num
    /// (numeric when it is a number), entry date
    fn splits(&self) -> Result<Vec<SplitView>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT t.post_date, t.description, s.quantity_num, s.quantity_denom
             FROM splits s
             JOIN transactions t ON t.guid = s.tx_guid
             WHERE s.account_guid = ?1
             ORDER BY t.post_date, CAST(t.num AS INTEGER), t.num, t.enter_date, s.guid",
        )?;

        let rows = stmt
            .query_map([&self.guid], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(post_date, description, num, denom)| {
                Ok(SplitView {
                    date: parse_timestamp(post_date.as_deref().unwrap_or_default())?,
                    description: description.unwrap_or_default(),
                    amount: ratio(num, denom),
                })
            })
            .collect()
    }

    fn balance_as_of(&self, date: NaiveDate, currency: &Commodity) -> Result<f64> {
        let balance: f64 = self
            .splits()?
            .iter()
            .filter(|s| s.date <= date)
            .map(|s| s.amount)
            .sum();

        if &self.commodity == currency || balance == 0.0 {
            return Ok(balance);
        }

        Ok(balance * self.rate(currency, date)?)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AccountNaming;
    use crate::walker::walk;

    const SCHEMA: &str = "
        CREATE TABLE books (guid TEXT PRIMARY KEY, root_account_guid TEXT, root_template_guid TEXT);
        CREATE TABLE commodities (guid TEXT PRIMARY KEY, namespace TEXT, mnemonic TEXT);
        CREATE TABLE accounts (guid TEXT PRIMARY KEY, name TEXT, account_type TEXT,
                               commodity_guid TEXT, parent_guid TEXT);
        CREATE TABLE transactions (guid TEXT PRIMARY KEY, currency_guid TEXT, num TEXT,
                                   post_date TEXT, enter_date TEXT, description TEXT);
        CREATE TABLE splits (guid TEXT PRIMARY KEY, tx_guid TEXT, account_guid TEXT,
                             value_num INTEGER, value_denom INTEGER,
                             quantity_num INTEGER, quantity_denom INTEGER);
        CREATE TABLE prices (guid TEXT PRIMARY KEY, commodity_guid TEXT, currency_guid TEXT,
                             date TEXT, value_num INTEGER, value_denom INTEGER);

        INSERT INTO commodities VALUES ('usd', 'CURRENCY', 'USD');
        INSERT INTO books VALUES ('book', 'root', 'tmpl');
        INSERT INTO accounts VALUES ('root', 'Root Account', 'ROOT', NULL, NULL);
        INSERT INTO accounts VALUES ('tmpl', 'Template Root', 'ROOT', NULL, NULL);
        INSERT INTO accounts VALUES ('exp', 'Expenses', 'EXPENSE', 'usd', 'root');
        INSERT INTO accounts VALUES ('food', 'Food', 'EXPENSE', 'usd', 'exp');
        INSERT INTO accounts VALUES ('chk', 'Checking', 'BANK', 'usd', 'root');

        INSERT INTO transactions VALUES ('t1', 'usd', '', '2024-01-01 10:59:00', '2024-01-01 12:00:00', 'Market');
        INSERT INTO transactions VALUES ('t2', 'usd', '', '20240103105900', '2024-01-03 12:00:00', NULL);
        INSERT INTO splits VALUES ('s1', 't1', 'food', 1250, 100, 1250, 100);
        INSERT INTO splits VALUES ('s2', 't1', 'chk', -1250, 100, -1250, 100);
        INSERT INTO splits VALUES ('s3', 't2', 'food', 300, 100, 300, 100);
        INSERT INTO splits VALUES ('s4', 't2', 'chk', -300, 100, -300, 100);
    ";

    fn test_session() -> GncSession {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        GncSession::from_connection(conn)
    }

    /// Local calendar day of 2024-01-d 10:59 UTC, the time GnuCash posts at
    fn day(d: u32) -> NaiveDate {
        let posted = NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(10, 59, 0)
            .unwrap();
        Utc.from_utc_datetime(&posted).with_timezone(&Local).date_naive()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-01-01 10:59:00").unwrap(), day(1));
        assert_eq!(parse_timestamp("20240103105900").unwrap(), day(3));
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(LedgerError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_parse_timestamp_late_utc_uses_local_day() {
        let posted = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        let expected = Utc.from_utc_datetime(&posted).with_timezone(&Local).date_naive();

        assert_eq!(parse_timestamp("2024-01-01 23:30:00").unwrap(), expected);
    }

    #[test]
    fn test_splits_order_num_numerically() {
        let session = test_session();
        session
            .conn()
            .unwrap()
            .execute_batch(
                "INSERT INTO transactions VALUES ('t9', 'usd', '9', '2024-01-05 10:59:00', '2024-01-05 12:00:00', 'Cheque 9');
                 INSERT INTO transactions VALUES ('t10', 'usd', '10', '2024-01-05 10:59:00', '2024-01-05 11:00:00', 'Cheque 10');
                 INSERT INTO splits VALUES ('s9', 't9', 'chk', -100, 100, -100, 100);
                 INSERT INTO splits VALUES ('s10', 't10', 'chk', -100, 100, -100, 100);",
            )
            .unwrap();

        let accounts = walk(&session.root().unwrap()).unwrap();
        let descriptions: Vec<_> = accounts[0]
            .splits()
            .unwrap()
            .into_iter()
            .map(|s| s.description)
            .collect();

        assert_eq!(descriptions, vec!["Market", "", "Cheque 9", "Cheque 10"]);
    }

    #[test]
    fn test_root_and_walk() {
        let session = test_session();
        let root = session.root().unwrap();
        assert_eq!(root.account_type(), AccountType::Root);

        let accounts = walk(&root).unwrap();
        let names: Vec<_> = accounts.iter().map(|a| a.full_name()).collect();

        // Template root is not part of the book tree
        assert_eq!(names, vec!["Checking", "Expenses", "Expenses:Food"]);
        assert_eq!(accounts[2].label(AccountNaming::Name), "Food");
    }

    #[test]
    fn test_splits_resolve_transaction() {
        let session = test_session();
        let accounts = walk(&session.root().unwrap()).unwrap();
        let food = &accounts[2];

        let splits = food.splits().unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].date, day(1));
        assert_eq!(splits[0].description, "Market");
        assert_eq!(splits[0].amount, 12.5);
        assert_eq!(splits[1].description, "");
        assert_eq!(splits[1].amount, 3.0);

        assert!(accounts[1].splits().unwrap().is_empty());
    }

    #[test]
    fn test_balance_as_of() {
        let session = test_session();
        let usd = session.lookup_currency("USD").unwrap();
        let accounts = walk(&session.root().unwrap()).unwrap();
        let checking = &accounts[0];

        assert_eq!(checking.balance_as_of(day(1), &usd).unwrap(), -12.5);
        assert_eq!(checking.balance_as_of(day(2), &usd).unwrap(), -12.5);
        assert_eq!(checking.balance_as_of(day(3), &usd).unwrap(), -15.5);
    }

    #[test]
    fn test_unknown_currency() {
        let session = test_session();
        assert!(matches!(
            session.lookup_currency("EUR"),
            Err(LedgerError::UnknownCommodity { .. })
        ));
    }

    #[test]
    fn test_unknown_account_type_is_error() {
        let session = test_session();
        session
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO accounts VALUES ('mm', 'Money Market', 'MONEYMRKT', 'usd', 'root')",
                [],
            )
            .unwrap();

        let err = walk(&session.root().unwrap()).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownAccountType(ref c) if c == "MONEYMRKT"));
    }

    #[test]
    fn test_ended_session_refuses_work() {
        let mut session = test_session();
        session.end();
        session.destroy();
        assert!(matches!(session.root(), Err(LedgerError::SessionClosed)));
    }

    #[test]
    fn test_open_missing_file() {
        let err = GncSession::open("/nonexistent/book.gnucash").err().unwrap();
        assert!(matches!(err, LedgerError::SessionOpen { .. }));
    }
}
