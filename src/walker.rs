// 🌳 Account Tree Walker
//
// Flattens an account tree into pre-order: every account comes before its
// own descendants, siblings keep the store's child order. The root itself
// is never part of the result.

use crate::account_type::AccountType;
use crate::error::Result;
use crate::ledger::LedgerAccount;

/// All accounts below `root`, pre-order, root excluded
pub fn walk<A: LedgerAccount>(root: &A) -> Result<Vec<A>> {
    let mut accounts = Vec::new();

    // Children pushed reversed so the first child is popped first
    let mut stack: Vec<A> = root.children()?.into_iter().rev().collect();

    while let Some(account) = stack.pop() {
        stack.extend(account.children()?.into_iter().rev());
        accounts.push(account);
    }

    log::debug!("Walked {} accounts", accounts.len());
    Ok(accounts)
}

/// Accounts below `root` whose type is exactly `account_type`, in walk order
pub fn accounts_by_type<A: LedgerAccount>(root: &A, account_type: AccountType) -> Result<Vec<A>> {
    Ok(walk(root)?
        .into_iter()
        .filter(|a| a.account_type() == account_type)
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================
