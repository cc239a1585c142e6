use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The categories offered when entering an expense. This list is a convenience for front ends;
/// the server and the state manager accept any category string.
pub const CATEGORIES: &[&str] = &[
    "Food",
    "Travel",
    "Bills",
    "Shopping",
    "Entertainment",
    "Other",
];

/// A single recorded outlay, as stored by the expense API.
///
/// Wire names are camelCase to match the API's JSON. The `date` field is an opaque `YYYY-MM-DD`
/// string; no parsing or validation is done on it here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Assigned by the server on creation. `None` for an expense that has not been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    amount: Decimal,
    description: String,
    date: String,
    category: String,
    user_id: String,
}

impl Expense {
    pub fn new(
        id: Option<String>,
        amount: Decimal,
        description: impl Into<String>,
        date: impl Into<String>,
        category: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            amount,
            description: description.into(),
            date: date.into(),
            category: category.into(),
            user_id: user_id.into(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
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

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// The request body for creating or updating an expense. Identical to [`Expense`] except that
/// there is no `id`; the server chooses the id on creation and takes it from the URL on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    amount: Decimal,
    description: String,
    date: String,
    category: String,
    user_id: String,
}

impl ExpenseDraft {
    pub fn new(
        amount: Decimal,
        description: impl Into<String>,
        date: impl Into<String>,
        category: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            description: description.into(),
            date: date.into(),
            category: category.into(),
            user_id: user_id.into(),
        }
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

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Turn the draft into a persisted [`Expense`] carrying the server-assigned `id`.
    pub fn into_expense(self, id: impl Into<String>) -> Expense {
        Expense {
            id: Some(id.into()),
            amount: self.amount,
            description: self.description,
            date: self.date,
            category: self.category,
            user_id: self.user_id,
        }
    }
}
