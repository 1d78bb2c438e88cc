// GnuCash Tables - Core Library
// Walks a book's account tree and flattens splits and balances into tables

pub mod account_type;
pub mod daily;
pub mod error;
pub mod extract;
pub mod gnucash;
pub mod ledger;
pub mod memory;
pub mod output;
pub mod walker;

// Re-export commonly used types
pub use account_type::{AccountType, ACCOUNT_TYPES};
pub use daily::{daily, DailyTable, TableCell};
pub use error::{LedgerError, Result};
pub use extract::{
    AccountSplits, AccountSummary, BalanceRecord, DateRange, SplitRecord,
    account_list, balances_table, extract_balances, extract_splits,
    splits_by_account, splits_table,
};
pub use gnucash::{GncAccount, GncSession};
pub use ledger::{
    AccountNaming, Commodity, LedgerAccount, LedgerSession, SessionGuard, SplitView,
};
pub use memory::{MemoryAccount, MemoryBook, MemorySession, ReleaseProbe};
pub use output::{
    OutputFormat, write_accounts, write_balances, write_daily, write_expense_dump,
    write_splits,
};
pub use walker::{accounts_by_type, walk};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
