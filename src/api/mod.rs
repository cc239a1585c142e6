//! The boundary to the remote expense API.
//!
//! Everything the rest of the crate knows about the server goes through the [`Gateway`] trait.
//! Transport failures, non-success statuses, and unusable payloads are all normalized into the
//! error channel so that callers only ever see a reason string.

mod http;
mod test_gateway;

pub use http::HttpGateway;
pub use test_gateway::TestGateway;

use crate::model::{AuthResponse, Expense, ExpenseDraft};
use crate::{Config, Result};
use serde::{Deserialize, Serialize};

/// The operations offered by the remote expense API.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    /// Register a new account. The response carries the server-assigned user id.
    async fn signup(&self, email: &str, password: &str) -> Result<AuthResponse>;

    /// Authenticate an existing account.
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse>;

    /// Create an expense. The server assigns the id and returns the stored record.
    async fn create_expense(&self, draft: &ExpenseDraft) -> Result<Expense>;

    /// Fetch expenses, optionally narrowed by `filter`.
    async fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>>;

    /// Replace the expense with the given id and return the stored record.
    async fn update_expense(&self, id: &str, draft: &ExpenseDraft) -> Result<Expense>;

    /// Delete the expense with the given id. Success carries no payload.
    async fn delete_expense(&self, id: &str) -> Result<()>;
}

/// Optional narrowing criteria for [`Gateway::list_expenses`]. Dates are `YYYY-MM-DD` strings
/// and are passed to the server as-is.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExpenseFilter {
    category: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

impl ExpenseFilter {
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    pub fn with_end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
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

    /// True when no criteria are set, i.e. a full fetch.
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.start_date.is_none() && self.end_date.is_none()
    }
}

/// Selects which `Gateway` implementation the binary runs against.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Talk to the real expense API over HTTP.
    #[default]
    Http,
    /// Use the in-memory gateway, no server required.
    Test,
}

serde_plain::derive_display_from_serialize!(Mode);
serde_plain::derive_fromstr_from_deserialize!(Mode);

impl Mode {
    /// When `EXPENSES_IN_TEST_MODE` is set and non-zero in length, returns `Mode::Test`,
    /// otherwise `Mode::Http`.
    pub fn from_env() -> Self {
        match std::env::var("EXPENSES_IN_TEST_MODE") {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// Creates the gateway for `mode`.
pub fn gateway(config: &Config, mode: Mode) -> Box<dyn Gateway> {
    match mode {
        Mode::Http => Box::new(HttpGateway::new(config.api_url())),
        Mode::Test => Box::new(TestGateway::default()),
    }
}
