// 🧪 In-memory book
//
// A ledger built in code. Same capabilities as the GnuCash backend, no file.
// Handy for callers that already hold their data and for exercising the
// walker, extractors and session guard without SQLite.

use crate::account_type::AccountType;
use crate::error::{LedgerError, Result};
use crate::ledger::{Commodity, LedgerAccount, LedgerSession, SplitView};
use chrono::NaiveDate;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Price of one unit of `commodity` in `currency` on `date`
#[derive(Debug, Clone, PartialEq)]
pub struct PriceEntry {
    pub commodity: Commodity,
    pub currency: Commodity,
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Default)]
struct PriceDb {
    currencies: RefCell<Vec<Commodity>>,
    prices: RefCell<Vec<PriceEntry>>,
}

impl PriceDb {
    /// Latest direct quote on or before `date`, else the reciprocal of the
    /// latest reverse quote
    fn rate(&self, from: &Commodity, to: &Commodity, date: NaiveDate) -> Option<f64> {
        let prices = self.prices.borrow();
        let latest = |c: &Commodity, cur: &Commodity| {
            prices
                .iter()
                .filter(|p| &p.commodity == c && &p.currency == cur && p.date <= date)
                .max_by_key(|p| p.date)
                .map(|p| p.value)
        };

        latest(from, to).or_else(|| latest(to, from).filter(|v| *v != 0.0).map(|v| 1.0 / v))
    }
}

// ============================================================================
// ACCOUNT
// ============================================================================

#[derive(Debug)]
struct AccountData {
    name: String,
    full_name: String,
    account_type: AccountType,
    commodity: Commodity,
    children: RefCell<Vec<MemoryAccount>>,
    splits: RefCell<Vec<SplitView>>,
    failure: RefCell<Option<String>>,
    prices: Rc<PriceDb>,
}

/// Shared handle on one account node
#[derive(Debug, Clone)]
pub struct MemoryAccount {
    data: Rc<AccountData>,
}

impl MemoryAccount {
    /// Add a child holding the same commodity as this account
    pub fn add_child(&self, name: &str, account_type: AccountType) -> MemoryAccount {
        self.add_child_in(name, account_type, self.data.commodity.clone())
    }

    pub fn add_child_in(
        &self,
        name: &str,
        account_type: AccountType,
        commodity: Commodity,
    ) -> MemoryAccount {
        let full_name = if self.data.account_type == AccountType::Root {
            name.to_string()
        } else {
            format!("{}:{}", self.data.full_name, name)
        };

        let child = MemoryAccount {
            data: Rc::new(AccountData {
                name: name.to_string(),
                full_name,
                account_type,
                commodity,
                children: RefCell::new(Vec::new()),
                splits: RefCell::new(Vec::new()),
                failure: RefCell::new(None),
                prices: Rc::clone(&self.data.prices),
            }),
        };

        self.data.children.borrow_mut().push(child.clone());
        child
    }

    pub fn add_split(&self, date: NaiveDate, description: &str, amount: f64) -> &Self {
        self.data.splits.borrow_mut().push(SplitView {
            date,
            description: description.to_string(),
            amount,
        });
        self
    }

    /// Make every later `splits()` / `balance_as_of()` call on this account fail
    pub fn fail_with(&self, message: &str) {
        *self.data.failure.borrow_mut() = Some(message.to_string());
    }

    pub fn commodity(&self) -> &Commodity {
        &self.data.commodity
    }

    fn check_failure(&self) -> Result<()> {
        match self.data.failure.borrow().as_ref() {
            Some(message) => Err(LedgerError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                message.clone(),
            ))),
            None => Ok(()),
        }
    }
}

impl LedgerAccount for MemoryAccount {
    fn name(&self) -> &str {
        &self.data.name
    }

    fn full_name(&self) -> &str {
        &self.data.full_name
    }

    fn account_type(&self) -> AccountType {
        self.data.account_type
    }

    fn children(&self) -> Result<Vec<Self>> {
        Ok(self.data.children.borrow().clone())
    }

    fn splits(&self) -> Result<Vec<SplitView>> {
        self.check_failure()?;
        Ok(self.data.splits.borrow().clone())
    }

    fn balance_as_of(&self, date: NaiveDate, currency: &Commodity) -> Result<f64> {
        self.check_failure()?;

        let balance: f64 = self
            .data
            .splits
            .borrow()
            .iter()
            .filter(|s| s.date <= date)
            .map(|s| s.amount)
            .sum();

        if &self.data.commodity == currency || balance == 0.0 {
            return Ok(balance);
        }

        let rate = self
            .data
            .prices
            .rate(&self.data.commodity, currency, date)
            .ok_or_else(|| LedgerError::MissingPrice {
                commodity: self.data.commodity.mnemonic.clone(),
                currency: currency.mnemonic.clone(),
                date,
            })?;

        Ok(balance * rate)
    }
}

// ============================================================================
// BOOK & SESSION
// ============================================================================

/// Root of an in-memory account tree plus its price list
#[derive(Debug, Clone)]
pub struct MemoryBook {
    root: MemoryAccount,
    prices: Rc<PriceDb>,
}

impl MemoryBook {
    /// Empty book whose root holds USD
    pub fn new() -> Self {
        Self::with_currency("USD")
    }

    pub fn with_currency(code: &str) -> Self {
        let prices = Rc::new(PriceDb::default());
        let currency = Commodity::currency(code);
        prices.currencies.borrow_mut().push(currency.clone());

        let root = MemoryAccount {
            data: Rc::new(AccountData {
                name: "Root Account".to_string(),
                full_name: String::new(),
                account_type: AccountType::Root,
                commodity: currency,
                children: RefCell::new(Vec::new()),
                splits: RefCell::new(Vec::new()),
                failure: RefCell::new(None),
                prices: Rc::clone(&prices),
            }),
        };

        MemoryBook { root, prices }
    }

    pub fn root(&self) -> MemoryAccount {
        self.root.clone()
    }

    pub fn add_currency(&self, code: &str) -> Commodity {
        let currency = Commodity::currency(code);
        let mut currencies = self.prices.currencies.borrow_mut();
        if !currencies.contains(&currency) {
            currencies.push(currency.clone());
        }
        currency
    }

    pub fn add_price(&self, commodity: &Commodity, currency: &Commodity, date: NaiveDate, value: f64) {
        self.prices.prices.borrow_mut().push(PriceEntry {
            commodity: commodity.clone(),
            currency: currency.clone(),
            date,
            value,
        });
    }
}

impl Default for MemoryBook {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts how often a session was ended and destroyed
#[derive(Debug, Clone, Default)]
pub struct ReleaseProbe {
    ends: Rc<Cell<usize>>,
    destroys: Rc<Cell<usize>>,
}

impl ReleaseProbe {
    pub fn ends(&self) -> usize {
        self.ends.get()
    }

    pub fn destroys(&self) -> usize {
        self.destroys.get()
    }
}

pub struct MemorySession {
    book: MemoryBook,
    probe: ReleaseProbe,
}

impl MemorySession {
    pub fn new(book: MemoryBook) -> Self {
        MemorySession {
            book,
            probe: ReleaseProbe::default(),
        }
    }

    pub fn probe(&self) -> ReleaseProbe {
        self.probe.clone()
    }
}

impl LedgerSession for MemorySession {
    type Account<'s> = MemoryAccount;

    fn root(&self) -> Result<MemoryAccount> {
        Ok(self.book.root())
    }

    fn lookup_currency(&self, code: &str) -> Result<Commodity> {
        self.book
            .prices
            .currencies
            .borrow()
            .iter()
            .find(|c| c.mnemonic == code)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownCommodity {
                namespace: Commodity::CURRENCY_NAMESPACE.to_string(),
                mnemonic: code.to_string(),
            })
    }

    fn end(&mut self) {
        self.probe.ends.set(self.probe.ends.get() + 1);
    }

    fn destroy(&mut self) {
        self.probe.destroys.set(self.probe.destroys.get() + 1);
    }
}

// ============================================================================
// TESTS
// ============================================================================
