use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use gnc_tables::{
    account_list, balances_table, daily, splits_by_account, splits_table, write_accounts,
    write_balances, write_daily, write_expense_dump, write_splits, AccountNaming, AccountType,
    DateRange, GncSession, OutputFormat,
};

/// Flatten GnuCash splits and balances into tables
#[derive(Parser, Debug)]
#[command(name = "gnc-tables")]
#[command(version, about, long_about = None)]
struct Args {
    /// Log extraction progress (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short = 'f', long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Every split of every account
    Splits {
        /// GnuCash file (SQLite backend)
        file: PathBuf,

        /// Use full account paths (Expenses:Groceries) instead of leaf names
        #[arg(long)]
        full_name: bool,
    },

    /// Expense accounts with one "date: description: amount" line per split
    Expenses {
        /// GnuCash file (SQLite backend)
        file: PathBuf,
    },

    /// Daily totals per account for one account type
    Daily {
        /// GnuCash file (SQLite backend)
        file: PathBuf,

        /// Account type to keep
        #[arg(short = 't', long = "type", default_value = "Expense")]
        account_type: AccountType,

        /// Trailing moving average over N days
        #[arg(long, value_name = "N", conflicts_with = "cumulative")]
        rolling: Option<usize>,

        /// Running totals instead of daily totals
        #[arg(long)]
        cumulative: bool,

        #[arg(long)]
        full_name: bool,
    },

    /// Balance of every account for each day in [start, end)
    Balances {
        /// GnuCash file (SQLite backend)
        file: PathBuf,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Day after the last one (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Reporting currency code
        #[arg(long, env = "GNC_TABLES_CURRENCY", default_value = "USD")]
        currency: String,

        #[arg(long)]
        full_name: bool,
    },

    /// Account tree in walk order
    Accounts {
        /// GnuCash file (SQLite backend)
        file: PathBuf,

        /// Only accounts of this type
        #[arg(short = 't', long = "type")]
        account_type: Option<AccountType>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Splits { file, full_name } => {
            let records = splits_table(open(&file)?, naming(full_name))
                .context("Failed to extract splits")?;
            write_splits(&mut out, &records, args.format)?;
        }
        Command::Expenses { file } => {
            let grouped = splits_by_account(open(&file)?, AccountType::Expense, AccountNaming::Name)
                .context("Failed to extract expense splits")?;
            write_expense_dump(&mut out, &grouped)?;
        }
        Command::Daily {
            file,
            account_type,
            rolling,
            cumulative,
            full_name,
        } => {
            let records = splits_table(open(&file)?, naming(full_name))
                .context("Failed to extract splits")?;
            let table = daily(&records, account_type);

            match rolling {
                Some(window) => write_daily(&mut out, &table.rolling_mean(window)?, args.format)?,
                None if cumulative => write_daily(&mut out, &table.cumsum(), args.format)?,
                None => write_daily(&mut out, &table, args.format)?,
            }
        }
        Command::Balances {
            file,
            start,
            end,
            currency,
            full_name,
        } => {
            let range = DateRange::new(start, end)?;
            let records = balances_table(open(&file)?, range, &currency, naming(full_name))
                .with_context(|| format!("Failed to extract balances in {}", currency))?;
            write_balances(&mut out, &records, args.format)?;
        }
        Command::Accounts { file, account_type } => {
            let accounts = account_list(open(&file)?, account_type)
                .context("Failed to list accounts")?;
            write_accounts(&mut out, &accounts, args.format)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn open(file: &Path) -> Result<GncSession> {
    GncSession::open(file).with_context(|| format!("Failed to open {}", file.display()))
}

fn naming(full_name: bool) -> AccountNaming {
    if full_name {
        AccountNaming::FullName
    } else {
        AccountNaming::Name
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}
