//! Client for the remote user directory (`/api/users`).
//!
//! Names are the only identity key and the server keeps last-write-wins
//! records. When a token is configured every request is sent with
//! `Authorization: Bearer <token>`; without one, lookups are effectively
//! public and a warning is logged when the client is built.

use crate::error::GuardianError;
use crate::models::{Coordinate, Profile};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Creates or replaces the record for `profile.name`.
    async fn register(&self, profile: &Profile) -> Result<(), GuardianError>;
    /// Overwrites the stored position of an existing user.
    async fn update_position(&self, name: &str, coord: Coordinate) -> Result<(), GuardianError>;
    /// `Ok(None)` when the name is not registered.
    async fn lookup(&self, name: &str) -> Result<Option<Coordinate>, GuardianError>;
}

#[derive(Serialize)]
struct PositionUpdate<'a> {
    name: &'a str,
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct DirectoryEntry {
    latitude: f64,
    longitude: f64,
    // Free-form so an unexpected role never hides the coordinates.
    #[serde(default)]
    role: Option<String>,
}

pub struct HttpDirectory {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpDirectory {
    /// `base_url` should be like `https://backend.example.com` (no `/api`).
    pub fn new(client: Client, base_url: &str, token: Option<String>) -> Result<Self, GuardianError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GuardianError::Validation(format!("directory url '{}': {}", base_url, e)))?;
        if token.is_none() {
            warn!("No directory token configured; anyone who knows a name can look up its position.");
        }
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn users_url(&self, name: Option<&str>) -> Result<Url, GuardianError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| GuardianError::Validation(format!("{} cannot be a base URL", self.base_url)))?;
            segments.pop_if_empty().extend(["api", "users"]);
            if let Some(name) = name {
                segments.push(name);
            }
        }
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send_expecting_success(&self, req: RequestBuilder) -> Result<(), GuardianError> {
        let resp = self.authorize(req).send().await?;
        if !resp.status().is_success() {
            return Err(GuardianError::from_response(resp).await);
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for HttpDirectory {
    async fn register(&self, profile: &Profile) -> Result<(), GuardianError> {
        let url = self.users_url(None)?;
        info!(name = %profile.name, role = %profile.role, "registering with directory");
        self.send_expecting_success(self.client.post(url).json(profile)).await
    }

    async fn update_position(&self, name: &str, coord: Coordinate) -> Result<(), GuardianError> {
        let url = self.users_url(None)?;
        let body = PositionUpdate {
            name,
            latitude: coord.lat,
            longitude: coord.lng,
        };
        debug!(name, "updating directory position");
        self.send_expecting_success(self.client.put(url).json(&body)).await
    }

    async fn lookup(&self, name: &str) -> Result<Option<Coordinate>, GuardianError> {
        let url = self.users_url(Some(name))?;
        let resp = self.authorize(self.client.get(url)).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        let outcome = lookup_outcome(status, &body);
        if let Ok(None) = outcome {
            debug!(name, status = status.as_u16(), "directory has no such user");
        }
        outcome
    }
}

/// Auth failures and server errors are errors; any other non-2xx means the
/// name is not registered.
fn lookup_outcome(status: StatusCode, body: &str) -> Result<Option<Coordinate>, GuardianError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN || status.is_server_error() {
        return Err(GuardianError::Server {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }
    if !status.is_success() {
        return Ok(None);
    }
    parse_entry(body)
}

fn parse_entry(body: &str) -> Result<Option<Coordinate>, GuardianError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let entry: Option<DirectoryEntry> = serde_json::from_str(body)?;
    Ok(entry.map(|e| {
        if let Some(role) = e.role {
            debug!(%role, "directory entry found");
        }
        Coordinate::new(e.latitude, e.longitude)
    }))
}
