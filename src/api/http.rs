//! Implements the `Gateway` trait against the expense REST API using `reqwest`.

use crate::api::{ExpenseFilter, Gateway};
use crate::model::{AuthResponse, Expense, ExpenseDraft};
use crate::Result;
use anyhow::{bail, Context};
use serde_json::json;
use tracing::trace;
use url::Url;

/// Implements the `Gateway` trait over HTTP/JSON. Endpoint paths are joined onto the base URL
/// from the configuration, which always ends with a slash.
pub struct HttpGateway {
    base: Url,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base: &Url) -> Self {
        Self {
            base: base.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Invalid endpoint path '{path}'"))
    }

    /// Builds the `GET /expenses` URL with any filter criteria as query parameters.
    fn expenses_url(&self, filter: &ExpenseFilter) -> Result<Url> {
        let mut url = self.endpoint("expenses")?;
        // query_pairs_mut appends '?' even when no pair follows, so an empty filter must not
        // touch the query string at all.
        if !filter.is_empty() {
            let mut pairs = url.query_pairs_mut();
            if let Some(category) = filter.category() {
                pairs.append_pair("category", category);
            }
            if let Some(start_date) = filter.start_date() {
                pairs.append_pair("startDate", start_date);
            }
            if let Some(end_date) = filter.end_date() {
                pairs.append_pair("endDate", end_date);
            }
        }
        Ok(url)
    }

    async fn auth(&self, path: &str, email: &str, password: &str, what: &str) -> Result<AuthResponse> {
        let url = self.endpoint(path)?;
        trace!("POST {url}");
        let response = self
            .client
            .post(url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .with_context(|| format!("{what}: the request could not be sent"))?;
        let response = check_status(response, what).await?;
        response
            .json()
            .await
            .with_context(|| format!("{what}: the response payload could not be parsed"))
    }
}

#[async_trait::async_trait]
impl Gateway for HttpGateway {
    async fn signup(&self, email: &str, password: &str) -> Result<AuthResponse> {
        self.auth("auth/signup", email, password, "Signup").await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        self.auth("auth/login", email, password, "Login").await
    }

    async fn create_expense(&self, draft: &ExpenseDraft) -> Result<Expense> {
        let url = self.endpoint("expenses")?;
        trace!("POST {url}");
        let response = self
            .client
            .post(url)
            .json(draft)
            .send()
            .await
            .context("Create expense: the request could not be sent")?;
        let response = check_status(response, "Create expense").await?;
        response
            .json()
            .await
            .context("Create expense: the response payload could not be parsed")
    }

    async fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        let url = self.expenses_url(filter)?;
        trace!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("List expenses: the request could not be sent")?;
        let response = check_status(response, "List expenses").await?;
        response
            .json()
            .await
            .context("List expenses: the response payload could not be parsed")
    }

    async fn update_expense(&self, id: &str, draft: &ExpenseDraft) -> Result<Expense> {
        let url = self.endpoint(&format!("expenses/{id}"))?;
        trace!("PUT {url}");
        let response = self
            .client
            .put(url)
            .json(draft)
            .send()
            .await
            .context("Update expense: the request could not be sent")?;
        let response = check_status(response, "Update expense").await?;
        response
            .json()
            .await
            .context("Update expense: the response payload could not be parsed")
    }

    async fn delete_expense(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("expenses/{id}"))?;
        trace!("DELETE {url}");
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .context("Delete expense: the request could not be sent")?;
        let _ = check_status(response, "Delete expense").await?;
        Ok(())
    }
}

/// Turns a non-success HTTP status into an error carrying the server's reason when one is
/// available in the body.
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match server_message(&body) {
        Some(reason) => bail!("{what} failed: {reason}"),
        None => bail!("{what} failed with status {status}"),
    }
}

/// The server reports errors as `{"message": "..."}`. Returns `None` if the body is not shaped
/// that way.
fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
