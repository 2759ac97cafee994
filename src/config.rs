use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::{info, warn};

const CONFIG_PATH: &str = "config.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub location: LocationConfig,
    pub api: ApiConfig,
    pub ui: UiConfig,
    pub storage: StorageConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocationConfig {
    pub auto_detect: bool, // Use IP geolocation if true
    pub lookup_ip: String, // Empty means our own public address
    pub manual_lat: f64,   // Latitude used if auto_detect is false
    pub manual_lon: f64,   // Longitude used if auto_detect is false
    pub timeout_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub geocoder_url: String,
    pub overpass_url: String,
    pub router_url: String,
    pub directory_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_token: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UiConfig {
    pub default_map_style: String, // "street" or "satellite"
    pub tick_rate_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            location: LocationConfig {
                auto_detect: true,
                lookup_ip: String::new(),
                manual_lat: 28.6139,
                manual_lon: 77.2090,
                timeout_ms: 3000,
            },
            api: ApiConfig {
                geocoder_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
                overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
                router_url: "https://router.project-osrm.org/route/v1".to_string(),
                directory_url: "https://backend-gut6.onrender.com".to_string(),
                directory_token: None,
                request_timeout_secs: 10,
            },
            ui: UiConfig {
                default_map_style: "street".to_string(),
                tick_rate_ms: 250,
            },
            storage: StorageConfig {
                path: "guardian.db".to_string(),
            },
        }
    }
}

impl Config {
    /// Loads config.toml from the working directory.
    /// If it doesn't exist, creates a default one.
    pub fn load() -> Self {
        if let Ok(content) = fs::read_to_string(CONFIG_PATH) {
            match Self::parse(&content) {
                Ok(config) => return config,
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", CONFIG_PATH, e);
                    return Config::default();
                }
            }
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(CONFIG_PATH, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", CONFIG_PATH);
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location.timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }
}
