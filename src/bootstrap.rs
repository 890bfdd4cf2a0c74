//! Control plane client.
//!
//! The runner only needs the client to exist: constructing it checks the
//! address and credentials before any work starts.

use crate::error::RunError;
use ureq::http::Uri;

#[derive(Debug)]
pub struct ApiClient {
    address: Uri,
}

impl ApiClient {
    /// Validate `address` and `token`.
    pub fn new(address: &str, token: Option<&str>) -> Result<Self, RunError> {
        if token.map(str::trim).is_none_or(str::is_empty) {
            return Err(RunError::Bootstrap("TFE_TOKEN is not set".to_string()));
        }

        let address: Uri = address
            .trim()
            .parse()
            .map_err(|e| RunError::Bootstrap(format!("invalid API address '{address}': {e}")))?;
        match address.scheme_str() {
            Some("http" | "https") if address.host().is_some() => {}
            _ => {
                return Err(RunError::Bootstrap(format!(
                    "API address must be an http(s) URL, got '{address}'"
                )));
            }
        }

        Ok(Self { address })
    }

    pub fn address(&self) -> &Uri {
        &self.address
    }
}
