use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Handles the `expenses init` command.
pub async fn init(home: &Path, api_url: &str) -> Result<Out<()>> {
    let config = Config::create(home, api_url).await?;
    Ok(Out::new_message(format!(
        "Initialized expenses home at '{}' for API '{}'",
        config.root().display(),
        config.api_url()
    )))
}
