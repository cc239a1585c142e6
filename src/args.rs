//! These structs provide the CLI interface for the expenses CLI.

use crate::api::ExpenseFilter;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// expenses: A command-line client for tracking expenses.
///
/// The purpose of this program is to record your expenses against a remote expense API and to
/// report on what you have spent, in total and per category. Run `expenses init` with the URL
/// of your expense server, then `expenses signup` or `expenses login` to establish a session.
///
/// The session persists in the expenses home directory, so subsequent commands such as
/// `expenses add` act as the signed-in user until you run `expenses logout`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration file.
    ///
    /// This is the first command you should run. Decide what directory you want the app to keep
    /// its data in and pass it as --home (or EXPENSES_HOME); by default it will be $HOME/expenses.
    /// Pass the base URL of your expense server as --api-url.
    Init(InitArgs),
    /// Register a new account and start a session as the new user.
    Signup(AuthCommandArgs),
    /// Log in to an existing account and start a session.
    Login(AuthCommandArgs),
    /// Forget the persisted session.
    Logout,
    /// List expenses, optionally narrowed by category and/or a date range.
    List(FilterArgs),
    /// Record a new expense for the signed-in user.
    Add(AddArgs),
    /// Replace an existing expense.
    Update(UpdateArgs),
    /// Delete an expense by id.
    Delete(DeleteArgs),
    /// Show total spending and a per-category breakdown.
    Report(FilterArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate for instructions.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where expenses data and configuration is held. Defaults to ~/expenses
    #[arg(long, env = "EXPENSES_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The base URL of the expense API, e.g. http://192.168.1.20:8080
    #[arg(long)]
    api_url: String,
}

impl InitArgs {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

/// Args shared by `expenses signup` and `expenses login`.
#[derive(Debug, Parser, Clone)]
pub struct AuthCommandArgs {
    /// The account email address.
    email: String,

    /// The account password.
    password: String,
}

impl AuthCommandArgs {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// Optional narrowing criteria shared by `expenses list` and `expenses report`.
#[derive(Debug, Default, Parser, Clone)]
pub struct FilterArgs {
    /// Only include expenses in this category.
    #[arg(long)]
    category: Option<String>,

    /// Only include expenses on or after this date (YYYY-MM-DD).
    #[arg(long)]
    start_date: Option<String>,

    /// Only include expenses on or before this date (YYYY-MM-DD).
    #[arg(long)]
    end_date: Option<String>,
}

impl FilterArgs {
    pub fn new(
        category: Option<String>,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Self {
        Self {
            category,
            start_date,
            end_date,
        }
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn start_date(&self) -> Option<&str> {
        self.start_date.as_deref()
    }

    pub fn end_date(&self) -> Option<&str> {
        self.end_date.as_deref()
    }

    /// Convert to the gateway's filter type.
    pub fn to_filter(&self) -> ExpenseFilter {
        let mut filter = ExpenseFilter::default();
        if let Some(category) = &self.category {
            filter = filter.with_category(category);
        }
        if let Some(start_date) = &self.start_date {
            filter = filter.with_start_date(start_date);
        }
        if let Some(end_date) = &self.end_date {
            filter = filter.with_end_date(end_date);
        }
        filter
    }
}

#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The amount spent, e.g. 12.50
    amount: Decimal,

    /// What the expense was for.
    description: String,

    /// The date of the expense (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    date: Option<String>,

    /// The expense category, e.g. Food, Travel, Bills, Shopping, Entertainment, Other.
    #[arg(long, default_value = "Other")]
    category: String,
}

impl AddArgs {
    pub fn new(
        amount: Decimal,
        description: impl Into<String>,
        date: Option<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            description: description.into(),
            date,
            category: category.into(),
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The date argument, or today when it was not given.
    pub fn date(&self) -> String {
        self.date.clone().unwrap_or_else(today)
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

#[derive(Debug, Parser, Clone)]
pub struct UpdateArgs {
    /// The id of the expense to replace.
    id: String,

    /// The new amount.
    amount: Decimal,

    /// The new description.
    description: String,

    /// The new date (YYYY-MM-DD).
    #[arg(long)]
    date: String,

    /// The new category.
    #[arg(long)]
    category: String,
}

impl UpdateArgs {
    pub fn new(
        id: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>,
        date: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            description: description.into(),
            date: date.into(),
            category: category.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the expense to delete.
    id: String,
}

impl DeleteArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("expenses"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or EXPENSES_HOME instead of relying on the default \
                expenses home directory. If you continue using the program right now, you may \
                have problems!",
            );
            PathBuf::from("expenses")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_defaults() {
        let args =
            Args::try_parse_from(["expenses", "add", "12.50", "coffee"]).unwrap();
        match args.command() {
            Command::Add(add) => {
                assert_eq!(add.amount(), Decimal::from_str("12.50").unwrap());
                assert_eq!(add.description(), "coffee");
                assert_eq!(add.category(), "Other");
                // The default date is today, in YYYY-MM-DD form.
                assert_eq!(add.date().len(), 10);
            }
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_list_filters() {
        let args = Args::try_parse_from([
            "expenses",
            "list",
            "--category",
            "Food",
            "--start-date",
            "2024-01-01",
        ])
        .unwrap();
        match args.command() {
            Command::List(filter) => {
                assert_eq!(filter.category(), Some("Food"));
                assert_eq!(filter.start_date(), Some("2024-01-01"));
                assert_eq!(filter.end_date(), None);
            }
            other => panic!("expected List, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_bad_amount_fails() {
        assert!(Args::try_parse_from(["expenses", "add", "abc", "coffee"]).is_err());
    }
}
