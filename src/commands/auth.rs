use crate::api::Mode;
use crate::commands::{failure_reason, manager, Out};
use crate::{Config, Outcome, Result, Session, StateManager};
use anyhow::{bail, Context};

/// Handles the `expenses signup` command.
pub async fn signup(config: &Config, mode: Mode, email: &str, password: &str) -> Result<Out<Session>> {
    let manager = manager(config, mode).await?;
    let outcome = manager.signup(email, password).await;
    finish_auth(config, &manager, outcome, "Signed up").await
}

/// Handles the `expenses login` command.
pub async fn login(config: &Config, mode: Mode, email: &str, password: &str) -> Result<Out<Session>> {
    let manager = manager(config, mode).await?;
    let outcome = manager.login(email, password).await;
    finish_auth(config, &manager, outcome, "Logged in").await
}

/// Handles the `expenses logout` command.
pub async fn logout(config: &Config) -> Result<Out<()>> {
    config.clear_session().await?;
    Ok(Out::new_message("Logged out"))
}

/// On success, persists the session so later invocations act as this user.
async fn finish_auth(
    config: &Config,
    manager: &StateManager,
    outcome: Outcome,
    verb: &str,
) -> Result<Out<Session>> {
    match outcome {
        Outcome::Completed => {
            let user_id = manager
                .user_id()
                .context("The server did not return a user id")?;
            let session = Session::new(user_id.clone(), None);
            config.save_session(&session).await?;
            Ok(Out::new(format!("{verb} as user '{user_id}'"), session))
        }
        _ => bail!(failure_reason(manager, "Authentication failed")),
    }
}
