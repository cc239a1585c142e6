//! The in-memory application state and the operations that mutate it.
//!
//! [`StateManager`] owns every piece of mutable state in the app: the authentication state, the
//! signed-in user id, the expense collection, the busy flag, and the last error message. Each
//! field lives in a `tokio::sync::watch` channel so that a front end can either take a snapshot
//! or subscribe for change notifications.

use crate::api::{ExpenseFilter, Gateway};
use crate::model::{AuthResponse, Expense, ExpenseDraft};
use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::watch;
use tracing::{debug, error};

/// Shown when signup or login is attempted with a blank email or password.
const EMPTY_CREDENTIALS: &str = "Email and password cannot be empty";

/// Where the user stands with the auth endpoints.
///
/// Starts at `Idle`. Signup and login move it to `Authenticated` or `Error`, from either of
/// which another attempt can move it again. [`StateManager::reset_auth_state`] returns it to
/// `Idle` without touching the user id.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Idle,
    Authenticated,
    Error,
}

serde_plain::derive_display_from_serialize!(AuthState);
serde_plain::derive_fromstr_from_deserialize!(AuthState);

/// What became of a state manager operation. The state effects are observable either way; this
/// lets a caller react without polling the fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The operation ran and the gateway reported success.
    Completed,
    /// The gateway reported failure; `error_message` holds the reason.
    Failed,
    /// Input was rejected locally before any gateway call; `error_message` holds the reason
    /// and the busy flag was never set.
    Rejected,
    /// The operation required an active session and there was none. No state was touched and
    /// the gateway was not called.
    Skipped,
}

serde_plain::derive_display_from_serialize!(Outcome);
serde_plain::derive_fromstr_from_deserialize!(Outcome);

/// Owns the application state and applies every mutation to it.
///
/// The gateway sits behind a `tokio::sync::Mutex` and each operation holds that lock for its
/// full duration, so concurrently started operations run one after another rather than
/// interleaving their writes to `is_loading`, `error_message`, and `expenses`.
pub struct StateManager {
    gateway: tokio::sync::Mutex<Box<dyn Gateway>>,
    auth_state: watch::Sender<AuthState>,
    user_id: watch::Sender<Option<String>>,
    expenses: watch::Sender<Vec<Expense>>,
    is_loading: watch::Sender<bool>,
    error_message: watch::Sender<Option<String>>,
}

impl StateManager {
    pub fn new(gateway: Box<dyn Gateway>) -> Self {
        Self::with_user(gateway, None)
    }

    /// Create a `StateManager` with a previously established session, e.g. one restored from
    /// disk between CLI invocations.
    pub fn with_user(gateway: Box<dyn Gateway>, user_id: Option<String>) -> Self {
        Self {
            gateway: tokio::sync::Mutex::new(gateway),
            auth_state: watch::Sender::new(AuthState::default()),
            user_id: watch::Sender::new(user_id),
            expenses: watch::Sender::new(Vec::new()),
            is_loading: watch::Sender::new(false),
            error_message: watch::Sender::new(None),
        }
    }

    // ------------------------------------------------------------------------------------------
    // Observable state
    // ------------------------------------------------------------------------------------------

    pub fn auth_state(&self) -> AuthState {
        *self.auth_state.borrow()
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id.borrow().clone()
    }

    /// A snapshot of the expense collection from the most recent successful fetch.
    pub fn expenses(&self) -> Vec<Expense> {
        self.expenses.borrow().clone()
    }

    /// True while an operation is in flight.
    pub fn is_loading(&self) -> bool {
        *self.is_loading.borrow()
    }

    /// The most recent failure reason. A later operation's failure overwrites an
    /// unacknowledged earlier one.
    pub fn error_message(&self) -> Option<String> {
        self.error_message.borrow().clone()
    }

    pub fn watch_auth_state(&self) -> watch::Receiver<AuthState> {
        self.auth_state.subscribe()
    }

    pub fn watch_user_id(&self) -> watch::Receiver<Option<String>> {
        self.user_id.subscribe()
    }

    pub fn watch_expenses(&self) -> watch::Receiver<Vec<Expense>> {
        self.expenses.subscribe()
    }

    pub fn watch_is_loading(&self) -> watch::Receiver<bool> {
        self.is_loading.subscribe()
    }

    pub fn watch_error_message(&self) -> watch::Receiver<Option<String>> {
        self.error_message.subscribe()
    }

    // ------------------------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------------------------

    /// Register a new account. Blank credentials are rejected locally; otherwise the outcome of
    /// the gateway call drives the auth state machine.
    pub async fn signup(&self, email: &str, password: &str) -> Outcome {
        if email.trim().is_empty() || password.trim().is_empty() {
            self.error_message
                .send_replace(Some(EMPTY_CREDENTIALS.to_string()));
            return Outcome::Rejected;
        }
        let gateway = self.gateway.lock().await;
        self.begin();
        let result = gateway.signup(email, password).await;
        let outcome = self.apply_auth(result, "Signup failed");
        self.finish();
        outcome
    }

    /// Authenticate an existing account. Same contract as [`StateManager::signup`].
    pub async fn login(&self, email: &str, password: &str) -> Outcome {
        if email.trim().is_empty() || password.trim().is_empty() {
            self.error_message
                .send_replace(Some(EMPTY_CREDENTIALS.to_string()));
            return Outcome::Rejected;
        }
        let gateway = self.gateway.lock().await;
        self.begin();
        let result = gateway.login(email, password).await;
        let outcome = self.apply_auth(result, "Login failed");
        self.finish();
        outcome
    }

    /// Fetch expenses matching `filter` and replace the collection wholesale. On failure the
    /// previous collection stays in place.
    pub async fn load_expenses(&self, filter: &ExpenseFilter) -> Outcome {
        let gateway = self.gateway.lock().await;
        self.begin();
        let outcome = self.refresh(&**gateway, filter).await;
        self.finish();
        outcome
    }

    /// Create an expense owned by the signed-in user, then refetch the collection without any
    /// filter. Returns [`Outcome::Skipped`], touching nothing, when no user id is set.
    pub async fn add_expense(
        &self,
        amount: Decimal,
        description: &str,
        date: &str,
        category: &str,
    ) -> Outcome {
        let Some(user_id) = self.user_id() else {
            return Outcome::Skipped;
        };
        let gateway = self.gateway.lock().await;
        self.begin();
        let draft = ExpenseDraft::new(amount, description, date, category, user_id);
        let outcome = match gateway.create_expense(&draft).await {
            Ok(created) => {
                debug!("Expense {:?} added successfully", created.id());
                self.refresh(&**gateway, &ExpenseFilter::default()).await;
                Outcome::Completed
            }
            Err(e) => {
                self.fail(e, "Failed to add expense");
                Outcome::Failed
            }
        };
        self.finish();
        outcome
    }

    /// Replace the expense with the given id, then refetch the collection without any filter.
    /// Same session guard as [`StateManager::add_expense`].
    pub async fn update_expense(
        &self,
        id: &str,
        amount: Decimal,
        description: &str,
        date: &str,
        category: &str,
    ) -> Outcome {
        let Some(user_id) = self.user_id() else {
            return Outcome::Skipped;
        };
        let gateway = self.gateway.lock().await;
        self.begin();
        let draft = ExpenseDraft::new(amount, description, date, category, user_id);
        let outcome = match gateway.update_expense(id, &draft).await {
            Ok(_) => {
                debug!("Expense {id} updated successfully");
                self.refresh(&**gateway, &ExpenseFilter::default()).await;
                Outcome::Completed
            }
            Err(e) => {
                self.fail(e, "Failed to update expense");
                Outcome::Failed
            }
        };
        self.finish();
        outcome
    }

    /// Delete the expense with the given id, then refetch the collection without any filter.
    /// No session guard; the id alone identifies the record.
    pub async fn delete_expense(&self, id: &str) -> Outcome {
        let gateway = self.gateway.lock().await;
        self.begin();
        let outcome = match gateway.delete_expense(id).await {
            Ok(()) => {
                debug!("Expense {id} deleted successfully");
                self.refresh(&**gateway, &ExpenseFilter::default()).await;
                Outcome::Completed
            }
            Err(e) => {
                self.fail(e, "Failed to delete expense");
                Outcome::Failed
            }
        };
        self.finish();
        outcome
    }

    /// Sum of all amounts in the current collection. Zero when it is empty.
    pub fn total_spending(&self) -> Decimal {
        self.expenses.borrow().iter().map(Expense::amount).sum()
    }

    /// Amounts in the current collection summed per category. Categories with no expenses are
    /// absent rather than present with zero.
    pub fn spending_by_category(&self) -> HashMap<String, Decimal> {
        let mut totals = HashMap::new();
        for expense in self.expenses.borrow().iter() {
            *totals
                .entry(expense.category().to_string())
                .or_insert(Decimal::ZERO) += expense.amount();
        }
        totals
    }

    /// Unset the error message. No other effect.
    pub fn clear_error(&self) {
        self.error_message.send_replace(None);
    }

    /// Return the auth state to `Idle`, e.g. after the front end has consumed a transition.
    /// Does not clear the user id.
    pub fn reset_auth_state(&self) {
        self.auth_state.send_replace(AuthState::Idle);
    }

    // ------------------------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------------------------

    fn begin(&self) {
        self.is_loading.send_replace(true);
        self.error_message.send_replace(None);
    }

    fn finish(&self) {
        self.is_loading.send_replace(false);
    }

    fn apply_auth(&self, result: Result<AuthResponse>, fallback: &str) -> Outcome {
        match result {
            Ok(response) => {
                self.user_id
                    .send_replace(response.user_id().map(str::to_string));
                self.auth_state.send_replace(AuthState::Authenticated);
                Outcome::Completed
            }
            Err(e) => {
                self.fail(e, fallback);
                self.auth_state.send_replace(AuthState::Error);
                Outcome::Failed
            }
        }
    }

    /// Replace the collection with a fetch for `filter`. On failure the previous collection is
    /// left untouched and the error message is set.
    async fn refresh(&self, gateway: &dyn Gateway, filter: &ExpenseFilter) -> Outcome {
        match gateway.list_expenses(filter).await {
            Ok(expenses) => {
                self.expenses.send_replace(expenses);
                Outcome::Completed
            }
            Err(e) => {
                self.fail(e, "Failed to load expenses");
                Outcome::Failed
            }
        }
    }

    fn fail(&self, error: Error, fallback: &str) {
        let mut message = error.to_string();
        if message.is_empty() {
            message = fallback.to_string();
        }
        error!("{message}");
        self.error_message.send_replace(Some(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestGateway;
    use crate::model::Expense;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn expense(id: &str, amount: &str, category: &str) -> Expense {
        Expense::new(
            Some(id.to_string()),
            dec(amount),
            format!("expense {id}"),
            "2024-01-01",
            category,
            "u1",
        )
    }

    /// A manager over an empty gateway, plus a handle to the gateway for assertions.
    fn manager() -> (TestGateway, StateManager) {
        let gateway = TestGateway::new();
        let manager = StateManager::new(Box::new(gateway.clone()));
        (gateway, manager)
    }

    #[test]
    fn test_total_spending_empty() {
        let (_, manager) = manager();
        assert_eq!(manager.total_spending(), Decimal::ZERO);
        assert!(manager.spending_by_category().is_empty());
    }

    #[tokio::test]
    async fn test_aggregates_match() {
        let (gateway, manager) = manager();
        gateway.set_expenses(vec![
            expense("e1", "10.00", "Food"),
            expense("e2", "2.50", "Food"),
            expense("e3", "7.25", "Travel"),
        ]);
        assert_eq!(
            manager.load_expenses(&ExpenseFilter::default()).await,
            Outcome::Completed
        );

        assert_eq!(manager.total_spending(), dec("19.75"));
        let by_category = manager.spending_by_category();
        assert_eq!(by_category.len(), 2);
        assert_eq!(by_category.get("Food"), Some(&dec("12.50")));
        assert_eq!(by_category.get("Travel"), Some(&dec("7.25")));
        // The per-category totals sum back to the overall total.
        let sum: Decimal = by_category.values().copied().sum();
        assert_eq!(sum, manager.total_spending());
    }

    #[tokio::test]
    async fn test_signup_blank_email_rejected() {
        let (gateway, manager) = manager();
        let outcome = manager.signup("", "x").await;
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(manager.auth_state(), AuthState::Idle);
        assert!(!manager.is_loading());
        assert!(!manager.error_message().unwrap().is_empty());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_signup_blank_password_rejected() {
        let (gateway, manager) = manager();
        let outcome = manager.signup("x", "").await;
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(manager.auth_state(), AuthState::Idle);
        assert!(!manager.is_loading());
        assert_eq!(
            manager.error_message().as_deref(),
            Some("Email and password cannot be empty")
        );
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_signup_success() {
        let (_, manager) = manager();
        let outcome = manager.signup("new@b.com", "pw").await;
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(manager.auth_state(), AuthState::Authenticated);
        assert!(manager.user_id().is_some());
        assert_eq!(manager.error_message(), None);
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn test_login_success() {
        let (gateway, manager) = manager();
        gateway.insert_user("a@b.com", "u1");
        let outcome = manager.login("a@b.com", "pw").await;
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(manager.auth_state(), AuthState::Authenticated);
        assert_eq!(manager.user_id().as_deref(), Some("u1"));
        assert_eq!(manager.error_message(), None);
    }

    #[tokio::test]
    async fn test_login_failure() {
        let (_, manager) = manager();
        let outcome = manager.login("nobody@b.com", "pw").await;
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(manager.auth_state(), AuthState::Error);
        assert_eq!(manager.user_id(), None);
        assert!(!manager.error_message().unwrap().is_empty());
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_expenses_and_does_not_refresh() {
        let (gateway, manager) = manager();
        gateway.set_expenses(vec![expense("e1", "5.00", "Food")]);
        manager.load_expenses(&ExpenseFilter::default()).await;
        assert_eq!(gateway.count_calls("list_expenses"), 1);

        gateway.fail_with("delete_expense", "delete exploded");
        let outcome = manager.delete_expense("e1").await;
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(manager.expenses().len(), 1);
        assert_eq!(manager.error_message().as_deref(), Some("delete exploded"));
        // No refetch after the failed delete.
        assert_eq!(gateway.count_calls("list_expenses"), 1);
    }

    #[tokio::test]
    async fn test_add_without_session_is_skipped() {
        let (gateway, manager) = manager();
        let outcome = manager
            .add_expense(dec("10.0"), "lunch", "2024-01-01", "Food")
            .await;
        assert_eq!(outcome, Outcome::Skipped);
        assert!(gateway.calls().is_empty());
        assert!(manager.expenses().is_empty());
        assert_eq!(manager.error_message(), None);
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn test_update_without_session_is_skipped() {
        let (gateway, manager) = manager();
        let outcome = manager
            .update_expense("e1", dec("10.0"), "lunch", "2024-01-01", "Food")
            .await;
        assert_eq!(outcome, Outcome::Skipped);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_login_then_add_end_to_end() {
        let (gateway, manager) = manager();
        gateway.insert_user("a@b.com", "u1");

        assert_eq!(manager.login("a@b.com", "pw").await, Outcome::Completed);
        let outcome = manager
            .add_expense(dec("12.5"), "coffee", "2024-03-01", "Food")
            .await;
        assert_eq!(outcome, Outcome::Completed);

        assert_eq!(manager.auth_state(), AuthState::Authenticated);
        let expenses = manager.expenses();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].description(), "coffee");
        assert_eq!(expenses[0].user_id(), "u1");
        assert!(expenses[0].id().is_some());
        assert_eq!(manager.total_spending(), dec("12.5"));
        let by_category = manager.spending_by_category();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category.get("Food"), Some(&dec("12.5")));
    }

    /// Records when each list call starts and ends, yielding to the runtime in between so that a
    /// second in-flight operation gets a chance to run mid-call if the manager lets it.
    struct YieldingGateway {
        events: std::sync::Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    #[async_trait::async_trait]
    impl Gateway for YieldingGateway {
        async fn signup(&self, _email: &str, _password: &str) -> crate::Result<AuthResponse> {
            anyhow::bail!("not used")
        }

        async fn login(&self, _email: &str, _password: &str) -> crate::Result<AuthResponse> {
            anyhow::bail!("not used")
        }

        async fn create_expense(&self, _draft: &ExpenseDraft) -> crate::Result<Expense> {
            anyhow::bail!("not used")
        }

        async fn list_expenses(&self, _filter: &ExpenseFilter) -> crate::Result<Vec<Expense>> {
            self.events.lock().unwrap().push("start");
            tokio::task::yield_now().await;
            self.events.lock().unwrap().push("end");
            Ok(Vec::new())
        }

        async fn update_expense(
            &self,
            _id: &str,
            _draft: &ExpenseDraft,
        ) -> crate::Result<Expense> {
            anyhow::bail!("not used")
        }

        async fn delete_expense(&self, _id: &str) -> crate::Result<()> {
            anyhow::bail!("not used")
        }
    }

    #[tokio::test]
    async fn test_concurrent_operations_serialize() {
        let events = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let manager = StateManager::new(Box::new(YieldingGateway {
            events: events.clone(),
        }));

        let filter = ExpenseFilter::default();
        let (first, second) = tokio::join!(
            manager.load_expenses(&filter),
            manager.load_expenses(&filter),
        );
        assert_eq!(first, Outcome::Completed);
        assert_eq!(second, Outcome::Completed);

        // One operation runs to completion before the other starts; the calls never overlap.
        assert_eq!(*events.lock().unwrap(), vec!["start", "end", "start", "end"]);
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn test_add_refreshes_without_filter() {
        let (gateway, manager) = manager();
        gateway.insert_user("a@b.com", "u1");
        gateway.set_expenses(vec![
            expense("e1", "5.00", "Food"),
            expense("e2", "9.00", "Bills"),
        ]);
        manager.login("a@b.com", "pw").await;

        // Narrow the collection to one category...
        manager
            .load_expenses(&ExpenseFilter::default().with_category("Food"))
            .await;
        assert_eq!(manager.expenses().len(), 1);

        // ...then add; the implicit refetch discards the filter.
        manager
            .add_expense(dec("3.00"), "ticket", "2024-01-02", "Travel")
            .await;
        assert_eq!(manager.expenses().len(), 3);
    }

    #[tokio::test]
    async fn test_update_refreshes_collection() {
        let (gateway, manager) = manager();
        gateway.insert_user("a@b.com", "u1");
        gateway.set_expenses(vec![expense("e1", "5.00", "Food")]);
        manager.login("a@b.com", "pw").await;
        manager.load_expenses(&ExpenseFilter::default()).await;

        let outcome = manager
            .update_expense("e1", dec("6.50"), "bigger lunch", "2024-01-01", "Food")
            .await;
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(manager.expenses()[0].amount(), dec("6.50"));
        assert_eq!(manager.expenses()[0].description(), "bigger lunch");
    }

    #[tokio::test]
    async fn test_delete_success_refreshes() {
        let (gateway, manager) = manager();
        gateway.set_expenses(vec![
            expense("e1", "5.00", "Food"),
            expense("e2", "9.00", "Bills"),
        ]);
        manager.load_expenses(&ExpenseFilter::default()).await;

        assert_eq!(manager.delete_expense("e1").await, Outcome::Completed);
        let expenses = manager.expenses();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].id(), Some("e2"));
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_collection() {
        let (gateway, manager) = manager();
        gateway.set_expenses(vec![expense("e1", "5.00", "Food")]);
        manager.load_expenses(&ExpenseFilter::default()).await;

        gateway.fail_with("list_expenses", "server down");
        let outcome = manager.load_expenses(&ExpenseFilter::default()).await;
        assert_eq!(outcome, Outcome::Failed);
        // Stale but valid.
        assert_eq!(manager.expenses().len(), 1);
        assert_eq!(manager.error_message().as_deref(), Some("server down"));
    }

    #[tokio::test]
    async fn test_reset_auth_state_keeps_user_id() {
        let (gateway, manager) = manager();
        gateway.insert_user("a@b.com", "u1");
        manager.login("a@b.com", "pw").await;
        assert_eq!(manager.auth_state(), AuthState::Authenticated);

        manager.reset_auth_state();
        assert_eq!(manager.auth_state(), AuthState::Idle);
        assert_eq!(manager.user_id().as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_clear_error() {
        let (_, manager) = manager();
        manager.login("nobody@b.com", "pw").await;
        assert!(manager.error_message().is_some());
        manager.clear_error();
        assert_eq!(manager.error_message(), None);
    }

    #[tokio::test]
    async fn test_error_slot_is_overwritten() {
        let (gateway, manager) = manager();
        manager.login("nobody@b.com", "pw").await;
        let first = manager.error_message().unwrap();

        gateway.fail_with("list_expenses", "different failure");
        manager.load_expenses(&ExpenseFilter::default()).await;
        let second = manager.error_message().unwrap();
        assert_ne!(first, second);
        assert_eq!(second, "different failure");
    }

    #[tokio::test]
    async fn test_watchers_are_notified() {
        let (gateway, manager) = manager();
        let mut expenses_rx = manager.watch_expenses();
        let mut loading_rx = manager.watch_is_loading();
        expenses_rx.borrow_and_update();
        loading_rx.borrow_and_update();

        gateway.set_expenses(vec![expense("e1", "5.00", "Food")]);
        manager.load_expenses(&ExpenseFilter::default()).await;

        assert!(expenses_rx.has_changed().unwrap());
        assert!(loading_rx.has_changed().unwrap());
        assert_eq!(expenses_rx.borrow_and_update().len(), 1);
        // The busy flag was set and cleared; the latest value is false.
        assert!(!*loading_rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_successful_operation_clears_previous_error() {
        let (gateway, manager) = manager();
        manager.login("nobody@b.com", "pw").await;
        assert!(manager.error_message().is_some());

        gateway.insert_user("a@b.com", "u1");
        manager.login("a@b.com", "pw").await;
        assert_eq!(manager.error_message(), None);
    }
}
