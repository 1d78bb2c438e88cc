// 🏷️ Account Types - fixed label table
//
// GnuCash stores the type of every account as an upper-case code
// ("EXPENSE", "BANK", ...). Tables show the title-case label.

use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ACCOUNT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccountType {
    Asset,
    Bank,
    Cash,
    Checking,
    Credit,
    Equity,
    Expense,
    Income,
    Liability,
    Mutual,
    Payable,
    Receivable,
    Root,
    Stock,
    Trading,
}

/// (type, storage code, label) for every supported type
pub const ACCOUNT_TYPES: [(AccountType, &str, &str); 15] = [
    (AccountType::Asset, "ASSET", "Asset"),
    (AccountType::Bank, "BANK", "Bank"),
    (AccountType::Cash, "CASH", "Cash"),
    (AccountType::Checking, "CHECKING", "Checking"),
    (AccountType::Credit, "CREDIT", "Credit"),
    (AccountType::Equity, "EQUITY", "Equity"),
    (AccountType::Expense, "EXPENSE", "Expense"),
    (AccountType::Income, "INCOME", "Income"),
    (AccountType::Liability, "LIABILITY", "Liability"),
    (AccountType::Mutual, "MUTUAL", "Mutual"),
    (AccountType::Payable, "PAYABLE", "Payable"),
    (AccountType::Receivable, "RECEIVABLE", "Receivable"),
    (AccountType::Root, "ROOT", "Root"),
    (AccountType::Stock, "STOCK", "Stock"),
    (AccountType::Trading, "TRADING", "Trading"),
];

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        ACCOUNT_TYPES
            .iter()
            .find(|(t, _, _)| t == self)
            .map(|(_, _, label)| *label)
            .unwrap_or("Unknown")
    }

    pub fn storage_code(&self) -> &'static str {
        ACCOUNT_TYPES
            .iter()
            .find(|(t, _, _)| t == self)
            .map(|(_, code, _)| *code)
            .unwrap_or("NONE")
    }

    /// Parse the code GnuCash writes in `accounts.account_type`
    pub fn from_storage_code(code: &str) -> Result<Self> {
        ACCOUNT_TYPES
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(t, _, _)| *t)
            .ok_or_else(|| LedgerError::UnknownAccountType(code.to_string()))
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts labels ("Expense") and storage codes ("EXPENSE"), any case.
impl FromStr for AccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        Self::from_storage_code(&upper).map_err(|_| LedgerError::UnknownAccountType(s.to_string()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
