//! Pre-flight checks before calling the model.
//!
//! Validates that a credential is available before starting operations
//! that would otherwise fail on the first request.

use crate::config::Settings;
use crate::error::{AbacusError, Result};
use crate::relay::Credential;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Solving from the terminal requires a credential up front.
    Solve,
    /// The web UI can take the key per request, so none is required at startup.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// Returns the resolved credential, if any, or an error describing what's missing.
pub fn check(
    operation: Operation,
    settings: &Settings,
    explicit_key: Option<&str>,
) -> Result<Option<Credential>> {
    let credential = settings.resolve_credential(explicit_key);
    match operation {
        Operation::Solve if credential.is_none() => Err(missing_key(settings)),
        _ => Ok(credential),
    }
}

fn missing_key(settings: &Settings) -> AbacusError {
    AbacusError::Request(format!(
        "No API key found. Set it with: export {}='gsk_...' (or pass --api-key)",
        settings.provider.api_key_env
    ))
}
