//! Command handlers for the expenses CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod auth;
mod expense;
mod init;
mod report;

use crate::api::Mode;
use crate::{api, Config, Result, StateManager};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use auth::{login, logout, signup};
pub use expense::{add, delete, list, update};
pub use init::init;
pub use report::{report, SpendingReport};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to stdout and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        println!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Builds a `StateManager` over the gateway for `mode`, restoring any persisted session so the
/// manager acts as the previously signed-in user.
pub(crate) async fn manager(config: &Config, mode: Mode) -> Result<StateManager> {
    let session = config.load_session().await?;
    if let Some(session) = &session {
        debug!("Restored session for user '{}'", session.user_id());
    }
    let gateway = api::gateway(config, mode);
    Ok(StateManager::with_user(
        gateway,
        session.map(|s| s.user_id().to_string()),
    ))
}

/// The failure reason held by the state manager, or `fallback` when there is none.
pub(crate) fn failure_reason(manager: &StateManager, fallback: &str) -> String {
    let reason = manager
        .error_message()
        .unwrap_or_else(|| fallback.to_string());
    info!("Command failed: {reason}");
    reason
}
