//! Token command implementation.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::web::auth;

/// Print the configured token, or the one in the data directory (creating it).
///
/// # Errors
///
/// Returns an error if the token file cannot be read or written.
pub fn execute(config: &Config) -> Result<()> {
    if let Some(token) = &config.auth.token {
        println!("{token}");
        return Ok(());
    }
    let data_dir = config.data_dir();
    let token = auth::ensure_token(&data_dir).with_context(|| {
        format!(
            "Failed to prepare token file {}",
            auth::token_path(&data_dir).display()
        )
    })?;
    println!("{token}");
    Ok(())
}
