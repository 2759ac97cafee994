use crate::error::GuardianError;
use reqwest::Client;
use std::time::Duration;

// Nominatim and Overpass both reject anonymous clients.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for every outbound service, bounded by `timeout`.
pub fn build_client(timeout: Duration) -> Result<Client, GuardianError> {
    Ok(Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?)
}

/// Reads a successful response as JSON, or turns a non-2xx into [`GuardianError::Server`].
pub async fn json_or_error<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, GuardianError> {
    if !resp.status().is_success() {
        return Err(GuardianError::from_response(resp).await);
    }
    Ok(resp.json::<T>().await?)
}
