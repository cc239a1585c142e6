mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
mod state;
mod utils;

pub use api::{ExpenseFilter, Gateway, HttpGateway, Mode, TestGateway};
pub use config::{Config, Session};
pub use error::{Error, Result};
pub use state::{AuthState, Outcome, StateManager};
