// 📒 Ledger capability interface
//
// The walker and extractors never touch a storage engine directly. They see
// an account as something that can list its children, its splits and its
// balance, and a session as something that hands out the root account and
// must be released when the work is done.

use crate::account_type::AccountType;
use crate::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// VALUES RETURNED BY ACCOUNTS
// ============================================================================

/// One split as seen from its account, already resolved against its transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitView {
    /// Transaction post date, local calendar day
    pub date: NaiveDate,
    pub description: String,
    /// Signed amount in the account's commodity
    pub amount: f64,
}

/// A currency or security, identified the way GnuCash does: namespace + mnemonic
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commodity {
    pub namespace: String,
    pub mnemonic: String,
}

impl Commodity {
    pub const CURRENCY_NAMESPACE: &'static str = "CURRENCY";

    pub fn currency(code: &str) -> Self {
        Commodity {
            namespace: Self::CURRENCY_NAMESPACE.to_string(),
            mnemonic: code.to_string(),
        }
    }
}

/// Which account label goes into flattened records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccountNaming {
    /// Leaf name only, e.g. "Groceries"
    #[default]
    Name,
    /// Colon-joined path below the root, e.g. "Expenses:Groceries"
    FullName,
}

// ============================================================================
// CAPABILITIES
// ============================================================================

pub trait LedgerAccount: Sized {
    fn name(&self) -> &str;

    fn full_name(&self) -> &str;

    fn account_type(&self) -> AccountType;

    /// Direct children in the store's native order
    fn children(&self) -> Result<Vec<Self>>;

    /// Splits posted to this account in the store's native order
    fn splits(&self) -> Result<Vec<SplitView>>;

    /// Balance at the end of `date` in `currency`, children excluded
    fn balance_as_of(&self, date: NaiveDate, currency: &Commodity) -> Result<f64>;

    fn label(&self, naming: AccountNaming) -> &str {
        match naming {
            AccountNaming::Name => self.name(),
            AccountNaming::FullName => self.full_name(),
        }
    }
}

/// An open handle on a book. `end` and `destroy` together release it.
pub trait LedgerSession {
    type Account<'s>: LedgerAccount
    where
        Self: 's;

    fn root(&self) -> Result<Self::Account<'_>>;

    /// Find a reporting currency by ISO code
    fn lookup_currency(&self, code: &str) -> Result<Commodity>;

    fn end(&mut self);

    fn destroy(&mut self);
}

// ============================================================================
// SESSION GUARD
// ============================================================================

/// Owns a session and releases it exactly once: on `release()` or on drop,
/// whichever comes first. Early returns through `?` therefore still release.
pub struct SessionGuard<S: LedgerSession> {
    session: S,
    released: bool,
}

impl<S: LedgerSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        SessionGuard {
            session,
            released: false,
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn release(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.session.end();
        self.session.destroy();
        log::debug!("Session released");
    }
}

impl<S: LedgerSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// TESTS
// ============================================================================
