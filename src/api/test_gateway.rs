//! Implements the `Gateway` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the
//! whole app, top-to-bottom, without a running expense server.

use crate::api::{ExpenseFilter, Gateway};
use crate::model::{AuthResponse, Expense, ExpenseDraft};
use crate::Result;
use anyhow::{bail, Context};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// An implementation of the `Gateway` trait that does not use the network. Clones share the same
/// underlying data, so a caller can keep a handle for assertions after handing a clone to the
/// state manager. `Default` seeds it with a demo account and some existing expenses.
///
/// Passwords are accepted but not checked; only the email needs to be registered.
#[derive(Clone)]
pub struct TestGateway {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    /// Registered accounts, email -> user id.
    users: HashMap<String, String>,
    expenses: Vec<Expense>,
    /// Operations forced to fail, operation name -> failure message.
    failures: HashMap<String, String>,
    /// Every call received, in order, as `"<operation> <detail>"`.
    calls: Vec<String>,
    next_expense_id: u64,
}

impl TestGateway {
    /// The account registered by `Default`.
    pub const DEMO_EMAIL: &'static str = "demo@example.com";
    pub const DEMO_USER_ID: &'static str = "u-demo";

    /// Create a `TestGateway` with no accounts and no expenses.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Register an account with a fixed user id.
    pub fn insert_user(&self, email: impl Into<String>, user_id: impl Into<String>) {
        self.lock().users.insert(email.into(), user_id.into());
    }

    /// Replace the stored expenses. Moves the id counter past any `e<n>` ids in the new data so
    /// that created expenses never reuse a seeded id.
    pub fn set_expenses(&self, expenses: Vec<Expense>) {
        let mut inner = self.lock();
        let max_id = expenses
            .iter()
            .filter_map(|expense| expense.id()?.strip_prefix('e')?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        inner.next_expense_id = inner.next_expense_id.max(max_id);
        inner.expenses = expenses;
    }

    /// A snapshot of the stored expenses.
    pub fn expenses(&self) -> Vec<Expense> {
        self.lock().expenses.clone()
    }

    /// Make every call to `operation` fail with `message`. Operation names match the `Gateway`
    /// method names, e.g. `"delete_expense"`.
    pub fn fail_with(&self, operation: impl Into<String>, message: impl Into<String>) {
        self.lock().failures.insert(operation.into(), message.into());
    }

    /// The calls received so far, e.g. `["login a@b.com", "list_expenses"]`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// How many calls to `operation` have been received.
    pub fn count_calls(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| {
                call.split_whitespace().next() == Some(operation)
            })
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panicking test; propagating the panic is fine here.
        self.inner.lock().unwrap()
    }
}

/// Records the call and returns an error if this operation is scripted to fail.
fn enter(inner: &mut Inner, call: String) -> Result<()> {
    let operation = call
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();
    inner.calls.push(call);
    if let Some(message) = inner.failures.get(&operation) {
        bail!("{message}");
    }
    Ok(())
}

impl Default for TestGateway {
    /// Seeds the gateway with the demo account and the expense data from this module.
    fn default() -> Self {
        let gateway = Self::new();
        gateway.insert_user(Self::DEMO_EMAIL, Self::DEMO_USER_ID);
        gateway.set_expenses(load_csv(SEED_EXPENSES).unwrap());
        gateway
    }
}

#[async_trait::async_trait]
impl Gateway for TestGateway {
    async fn signup(&self, email: &str, _password: &str) -> Result<AuthResponse> {
        let mut inner = self.lock();
        enter(&mut inner, format!("signup {email}"))?;
        if inner.users.contains_key(email) {
            bail!("Email already registered");
        }
        let user_id = uuid::Uuid::new_v4().to_string();
        inner.users.insert(email.to_string(), user_id.clone());
        Ok(AuthResponse::new(
            Some(uuid::Uuid::new_v4().to_string()),
            Some(user_id),
            None,
        ))
    }

    async fn login(&self, email: &str, _password: &str) -> Result<AuthResponse> {
        let mut inner = self.lock();
        enter(&mut inner, format!("login {email}"))?;
        let user_id = match inner.users.get(email) {
            Some(user_id) => user_id.clone(),
            None => bail!("Invalid email or password"),
        };
        Ok(AuthResponse::new(
            Some(uuid::Uuid::new_v4().to_string()),
            Some(user_id),
            None,
        ))
    }

    async fn create_expense(&self, draft: &ExpenseDraft) -> Result<Expense> {
        let mut inner = self.lock();
        enter(&mut inner, format!("create_expense {}", draft.description()))?;
        inner.next_expense_id += 1;
        let id = format!("e{}", inner.next_expense_id);
        let expense = draft.clone().into_expense(id);
        inner.expenses.push(expense.clone());
        Ok(expense)
    }

    async fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        let mut inner = self.lock();
        enter(&mut inner, "list_expenses".to_string())?;
        Ok(inner
            .expenses
            .iter()
            .filter(|expense| matches(expense, filter))
            .cloned()
            .collect())
    }

    async fn update_expense(&self, id: &str, draft: &ExpenseDraft) -> Result<Expense> {
        let mut inner = self.lock();
        enter(&mut inner, format!("update_expense {id}"))?;
        let slot = inner
            .expenses
            .iter_mut()
            .find(|expense| expense.id() == Some(id));
        match slot {
            Some(slot) => {
                *slot = draft.clone().into_expense(id);
                Ok(slot.clone())
            }
            None => bail!("Expense '{id}' not found"),
        }
    }

    async fn delete_expense(&self, id: &str) -> Result<()> {
        let mut inner = self.lock();
        enter(&mut inner, format!("delete_expense {id}"))?;
        let before = inner.expenses.len();
        inner.expenses.retain(|expense| expense.id() != Some(id));
        if inner.expenses.len() == before {
            bail!("Expense '{id}' not found");
        }
        Ok(())
    }
}

/// Applies list criteria the way the server does: exact category match, and inclusive date
/// bounds compared as strings, which is sufficient for `YYYY-MM-DD`.
fn matches(expense: &Expense, filter: &ExpenseFilter) -> bool {
    if let Some(category) = filter.category() {
        if expense.category() != category {
            return false;
        }
    }
    if let Some(start_date) = filter.start_date() {
        if expense.date() < start_date {
            return false;
        }
    }
    if let Some(end_date) = filter.end_date() {
        if expense.date() > end_date {
            return false;
        }
    }
    true
}

/// Loads expenses from a CSV-formatted string with an `id,amount,...` header row.
fn load_csv(csv_data: &str) -> Result<Vec<Expense>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut expenses = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let field = |ix: usize| record.get(ix).unwrap_or_default().to_string();
        let amount = Decimal::from_str(&field(1))
            .with_context(|| format!("Bad amount in seed row: '{}'", field(1)))?;
        expenses.push(Expense::new(
            Some(field(0)),
            amount,
            field(2),
            field(3),
            field(4),
            field(5),
        ));
    }
    Ok(expenses)
}

/// Seed expense data for the demo account.
const SEED_EXPENSES: &str = r##"id,amount,description,date,category,userId
e1,54.20,Weekly groceries,2024-03-01,Food,u-demo
e2,12.75,Lunch with colleagues,2024-03-02,Food,u-demo
e3,89.99,Electricity bill,2024-03-03,Bills,u-demo
e4,35.00,Train ticket,2024-03-05,Travel,u-demo
e5,15.49,Movie night,2024-03-08,Entertainment,u-demo
e6,120.00,Running shoes,2024-03-10,Shopping,u-demo
"##;
