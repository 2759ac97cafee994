use crate::api::json_or_error;
use crate::error::GuardianError;
use crate::models::{Coordinate, NominatimResponse};
use async_trait::async_trait;
use reqwest::Client;
use tracing::error;

pub const ADDRESS_MISSING: &str = "Address not available";
pub const DETAILS_UNAVAILABLE: &str = "Location details not available";

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// One lookup. `Ok(None)` means the service answered without a display name.
    async fn lookup(&self, coord: Coordinate) -> Result<Option<String>, GuardianError>;

    /// Like [`lookup`](ReverseGeocoder::lookup), but never fails: problems
    /// collapse into a placeholder string.
    async fn resolve(&self, coord: Coordinate) -> String {
        match self.lookup(coord).await {
            Ok(Some(name)) => name,
            Ok(None) => ADDRESS_MISSING.to_string(),
            Err(e) => {
                error!("Error fetching location details: {}", e);
                DETAILS_UNAVAILABLE.to_string()
            }
        }
    }
}

pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn request(&self, coord: Coordinate) -> reqwest::RequestBuilder {
        self.client.get(&self.base_url).query(&[
            ("format", "json".to_string()),
            ("lat", coord.lat.to_string()),
            ("lon", coord.lng.to_string()),
            ("zoom", "18".to_string()),
            ("addressdetails", "1".to_string()),
        ])
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn lookup(&self, coord: Coordinate) -> Result<Option<String>, GuardianError> {
        let resp = self.request(coord).send().await?;
        let body: NominatimResponse = json_or_error(resp).await?;
        Ok(body.display_name.filter(|name| !name.is_empty()))
    }
}
