//! One-shot position acquisition.
//!
//! [`LocationProvider`] is the seam the rest of the app talks to. [`IpLocator`]
//! asks IpApi where our public address is, [`FixedLocator`] returns the
//! coordinate from `config.toml`, and [`TimedLocator`] puts a hard deadline on
//! either. Readings are never cached: every call is a fresh request.

use crate::config::LocationConfig;
use crate::error::{GuardianError, LocationError};
use crate::models::Coordinate;
use async_trait::async_trait;
use ipgeolocate::{Locator, Service};
use std::time::Duration;
use tracing::{error, info};

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinate, GuardianError>;
}

/// Resolves the user's approximate location via IP geolocation.
pub struct IpLocator {
    ip: String,
}

impl IpLocator {
    pub fn new(ip: impl Into<String>) -> Self {
        Self { ip: ip.into() }
    }
}

#[async_trait]
impl LocationProvider for IpLocator {
    async fn current_position(&self) -> Result<Coordinate, GuardianError> {
        let loc = Locator::get(&self.ip, Service::IpApi).await.map_err(|e| {
            error!("Error using geolocation service: {}", e);
            LocationError::Unavailable(e.to_string())
        })?;

        // IpApi reports decimal strings; a reading we can't parse is no reading.
        let lat = loc
            .latitude
            .parse::<f64>()
            .map_err(|_| LocationError::Unavailable(format!("bad latitude '{}'", loc.latitude)))?;
        let lng = loc
            .longitude
            .parse::<f64>()
            .map_err(|_| LocationError::Unavailable(format!("bad longitude '{}'", loc.longitude)))?;

        info!("Geolocation successful - ({}, {})", lat, lng);
        Ok(Coordinate::new(lat, lng))
    }
}

/// Always reports the same coordinate, with zero accuracy radius.
pub struct FixedLocator {
    coord: Coordinate,
}

impl FixedLocator {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            coord: Coordinate::new(lat, lng).with_accuracy(0.0),
        }
    }
}

#[async_trait]
impl LocationProvider for FixedLocator {
    async fn current_position(&self) -> Result<Coordinate, GuardianError> {
        Ok(self.coord)
    }
}

/// Fails with [`LocationError::Timeout`] if the inner provider is too slow.
pub struct TimedLocator<P> {
    inner: P,
    timeout: Duration,
}

impl<P: LocationProvider> TimedLocator<P> {
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<P: LocationProvider> LocationProvider for TimedLocator<P> {
    async fn current_position(&self) -> Result<Coordinate, GuardianError> {
        match tokio::time::timeout(self.timeout, self.inner.current_position()).await {
            Ok(result) => result,
            Err(_) => Err(LocationError::Timeout(self.timeout).into()),
        }
    }
}

/// Builds the provider described by the `[location]` config section.
pub fn from_config(config: &LocationConfig, timeout: Duration) -> Box<dyn LocationProvider> {
    if config.auto_detect {
        Box::new(TimedLocator::new(IpLocator::new(config.lookup_ip.clone()), timeout))
    } else {
        Box::new(TimedLocator::new(
            FixedLocator::new(config.manual_lat, config.manual_lon),
            timeout,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait]
    impl LocationProvider for Stalled {
        async fn current_position(&self) -> Result<Coordinate, GuardianError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Coordinate::new(0.0, 0.0))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_times_out() {
        let locator = TimedLocator::new(Stalled, Duration::from_millis(3000));
        let err = locator.current_position().await.unwrap_err();
        assert!(matches!(
            err,
            GuardianError::Location(LocationError::Timeout(d)) if d == Duration::from_millis(3000)
        ));
    }

    #[tokio::test]
    async fn fixed_locator_passes_through_timeout() {
        let locator = TimedLocator::new(FixedLocator::new(12.0, 77.0), Duration::from_millis(3000));
        let coord = locator.current_position().await.unwrap();
        assert_eq!(coord, Coordinate::new(12.0, 77.0).with_accuracy(0.0));
    }
}
