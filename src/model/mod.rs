//! Types that represent the core data model, such as `Expense` and `AuthResponse`.
mod auth;
mod expense;

pub use auth::AuthResponse;
pub use expense::{Expense, ExpenseDraft, CATEGORIES};
