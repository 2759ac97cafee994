//! Runs [`Command`]s against the outside world.
//!
//! Each command is executed on its own tokio task and its result is posted
//! back as an [`Event`]. Nothing is cancelled: a superseded request still
//! finishes, and the [`App`](crate::app::App) discards its answer by token.

use crate::api::build_client;
use crate::app::Command;
use crate::config::Config;
use crate::directory::{HttpDirectory, UserDirectory};
use crate::error::GuardianError;
use crate::events::Event;
use crate::geocoder::{NominatimGeocoder, ReverseGeocoder};
use crate::location::{self, LocationProvider};
use crate::models::Profile;
use crate::police::{OverpassClient, PoiSource, StationFinder};
use crate::routing::{OsrmRouter, RouteProvider};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, warn};

#[derive(Clone)]
pub struct Services {
    locator: Arc<dyn LocationProvider>,
    geocoder: Arc<dyn ReverseGeocoder>,
    stations: Arc<StationFinder>,
    router: Arc<dyn RouteProvider>,
    directory: Arc<dyn UserDirectory>,
    tx: UnboundedSender<Event>,
}

impl Services {
    pub fn new(
        locator: Arc<dyn LocationProvider>,
        geocoder: Arc<dyn ReverseGeocoder>,
        poi: Arc<dyn PoiSource>,
        router: Arc<dyn RouteProvider>,
        directory: Arc<dyn UserDirectory>,
        tx: UnboundedSender<Event>,
    ) -> Self {
        Self {
            locator,
            geocoder,
            stations: Arc::new(StationFinder::new(poi)),
            router,
            directory,
            tx,
        }
    }

    pub fn from_config(config: &Config, tx: UnboundedSender<Event>) -> Result<Self, GuardianError> {
        let client = build_client(config.request_timeout())?;
        let api = &config.api;
        Ok(Self::new(
            Arc::from(location::from_config(&config.location, config.location_timeout())),
            Arc::new(NominatimGeocoder::new(client.clone(), api.geocoder_url.clone())),
            Arc::new(OverpassClient::new(client.clone(), api.overpass_url.clone())),
            Arc::new(OsrmRouter::new(client.clone(), &api.router_url)),
            Arc::new(HttpDirectory::new(client, &api.directory_url, api.directory_token.clone())?),
            tx,
        ))
    }

    /// Fire and forget: the result arrives later through the event channel.
    pub fn dispatch(&self, command: Command) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Some(event) = this.execute(command).await {
                if this.tx.send(event).is_err() {
                    warn!("Event channel closed, dropping service result");
                }
            }
        });
    }

    pub async fn execute(&self, command: Command) -> Option<Event> {
        match command {
            Command::Register { name, role } => {
                let result = async {
                    let at = self.locator.current_position().await?;
                    let profile = Profile {
                        name,
                        role,
                        latitude: at.lat,
                        longitude: at.lng,
                    };
                    self.directory.register(&profile).await?;
                    Ok::<_, GuardianError>(profile)
                }
                .await;
                Some(match result {
                    Ok(profile) => Event::Registered(profile),
                    Err(e) => Event::RegistrationFailed(e.to_string()),
                })
            }
            Command::AcquirePosition => Some(match self.locator.current_position().await {
                Ok(coord) => Event::PositionAcquired(coord),
                Err(e) => Event::PositionFailed(e.to_string()),
            }),
            Command::ResolveAddress { seq, at } => Some(Event::AddressResolved {
                seq,
                address: self.geocoder.resolve(at).await,
            }),
            Command::ResolveManual { seq, at } => Some(Event::ManualResolved {
                seq,
                coord: at,
                outcome: self.geocoder.lookup(at).await.map_err(|e| e.to_string()),
            }),
            Command::FindStations { generation, at } => Some(Event::StationsFound {
                generation,
                stations: self.stations.find_nearby(at).await,
            }),
            Command::Route {
                generation,
                target,
                from,
                to,
            } => match self.router.route(from, to).await {
                Ok(route) => Some(Event::RouteReady {
                    generation,
                    target,
                    route,
                }),
                Err(e) => {
                    error!(destination = ?target, "Routing failed: {}", e);
                    None
                }
            },
            Command::SyncDirectory { name, at } => {
                if let Err(e) = self.directory.update_position(&name, at).await {
                    error!("Error updating location: {}", e);
                }
                None
            }
            Command::LookupContact { seq, name } => {
                let outcome = self.directory.lookup(&name).await.map_err(|e| e.to_string());
                Some(Event::ContactLookup { seq, name, outcome })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LocationError;
    use crate::map::RouteTarget;
    use crate::models::{Coordinate, OverpassElement, OverpassTags, Role};
    use crate::routing::Route;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct FakeLocator(Option<Coordinate>);

    #[async_trait]
    impl LocationProvider for FakeLocator {
        async fn current_position(&self) -> Result<Coordinate, GuardianError> {
            self.0.ok_or_else(|| LocationError::PermissionDenied.into())
        }
    }

    #[derive(Default)]
    struct FakeGeocoder {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ReverseGeocoder for FakeGeocoder {
        async fn lookup(&self, coord: Coordinate) -> Result<Option<String>, GuardianError> {
            *self.calls.lock().unwrap() += 1;
            if coord.lat.abs() > 90.0 {
                return Err(GuardianError::Server {
                    status: 400,
                    body: "bad lat".into(),
                });
            }
            Ok(Some(format!("{:.2}, {:.2}", coord.lat, coord.lng)))
        }
    }

    struct OneStation;

    #[async_trait]
    impl PoiSource for OneStation {
        async fn police_within(&self, center: Coordinate, _radius_m: u32) -> Result<Vec<OverpassElement>, GuardianError> {
            Ok(vec![OverpassElement {
                lat: Some(center.lat + 0.01),
                lon: Some(center.lng),
                center: None,
                tags: OverpassTags {
                    name: Some("Local PS".into()),
                    addr_full: None,
                },
            }])
        }
    }

    struct StraightLine;

    #[async_trait]
    impl RouteProvider for StraightLine {
        async fn route(&self, from: Coordinate, to: Coordinate) -> Result<Route, GuardianError> {
            Ok(Route {
                path: vec![from, to],
                distance_m: from.distance_km(&to) * 1000.0,
                duration_s: 0.0,
            })
        }
    }

    #[derive(Default)]
    struct FakeDirectory {
        users: Mutex<HashMap<String, Coordinate>>,
        reject: bool,
    }

    #[async_trait]
    impl UserDirectory for FakeDirectory {
        async fn register(&self, profile: &Profile) -> Result<(), GuardianError> {
            if self.reject {
                return Err(GuardianError::Server {
                    status: 500,
                    body: String::new(),
                });
            }
            self.users
                .lock()
                .unwrap()
                .insert(profile.name.clone(), Coordinate::new(profile.latitude, profile.longitude));
            Ok(())
        }

        async fn update_position(&self, name: &str, coord: Coordinate) -> Result<(), GuardianError> {
            self.users.lock().unwrap().insert(name.to_string(), coord);
            Ok(())
        }

        async fn lookup(&self, name: &str) -> Result<Option<Coordinate>, GuardianError> {
            Ok(self.users.lock().unwrap().get(name).copied())
        }
    }

    struct Harness {
        services: Services,
        geocoder: Arc<FakeGeocoder>,
        directory: Arc<FakeDirectory>,
        rx: mpsc::UnboundedReceiver<Event>,
    }

    fn harness(position: Option<Coordinate>, directory: FakeDirectory) -> Harness {
        let (tx, rx) = mpsc::unbounded_channel();
        let geocoder = Arc::new(FakeGeocoder::default());
        let directory = Arc::new(directory);
        let services = Services::new(
            Arc::new(FakeLocator(position)),
            geocoder.clone(),
            Arc::new(OneStation),
            Arc::new(StraightLine),
            directory.clone(),
            tx,
        );
        Harness {
            services,
            geocoder,
            directory,
            rx,
        }
    }

    #[tokio::test]
    async fn register_captures_position_and_upserts() {
        let h = harness(Some(Coordinate::new(12.9, 77.6)), FakeDirectory::default());
        let event = h
            .services
            .execute(Command::Register {
                name: "asha".into(),
                role: Role::Daughter,
            })
            .await;
        assert!(matches!(event, Some(Event::Registered(p)) if p.latitude == 12.9 && p.role == Role::Daughter));
        assert_eq!(
            h.directory.users.lock().unwrap().get("asha"),
            Some(&Coordinate::new(12.9, 77.6))
        );
    }

    #[tokio::test]
    async fn register_reports_directory_failure() {
        let directory = FakeDirectory {
            reject: true,
            ..Default::default()
        };
        let h = harness(Some(Coordinate::new(12.9, 77.6)), directory);
        let event = h
            .services
            .execute(Command::Register {
                name: "asha".into(),
                role: Role::Parent,
            })
            .await;
        assert!(matches!(event, Some(Event::RegistrationFailed(_))));
    }

    #[tokio::test]
    async fn denied_position_becomes_failure_event() {
        let h = harness(None, FakeDirectory::default());
        let event = h.services.execute(Command::AcquirePosition).await;
        assert!(matches!(event, Some(Event::PositionFailed(reason)) if reason == "location permission denied"));
    }

    #[tokio::test]
    async fn manual_lookup_calls_geocoder_once() {
        let h = harness(None, FakeDirectory::default());
        let event = h
            .services
            .execute(Command::ResolveManual {
                seq: 4,
                at: Coordinate::new(12.5, 77.25),
            })
            .await;
        assert_eq!(*h.geocoder.calls.lock().unwrap(), 1);
        assert!(matches!(
            event,
            Some(Event::ManualResolved { seq: 4, outcome: Ok(Some(ref a)), .. }) if a == "12.50, 77.25"
        ));
    }

    #[tokio::test]
    async fn rejected_manual_coordinate_carries_error() {
        let h = harness(None, FakeDirectory::default());
        let event = h
            .services
            .execute(Command::ResolveManual {
                seq: 1,
                at: Coordinate::new(123.0, 0.0),
            })
            .await;
        assert!(matches!(event, Some(Event::ManualResolved { outcome: Err(_), .. })));
    }

    #[tokio::test]
    async fn directory_sync_is_silent() {
        let h = harness(None, FakeDirectory::default());
        let event = h
            .services
            .execute(Command::SyncDirectory {
                name: "asha".into(),
                at: Coordinate::new(1.0, 2.0),
            })
            .await;
        assert!(event.is_none());
        assert_eq!(h.directory.users.lock().unwrap().get("asha"), Some(&Coordinate::new(1.0, 2.0)));
    }

    #[tokio::test]
    async fn contact_lookup_reports_missing_name() {
        let h = harness(None, FakeDirectory::default());
        let event = h
            .services
            .execute(Command::LookupContact {
                seq: 2,
                name: "nobody".into(),
            })
            .await;
        assert!(matches!(event, Some(Event::ContactLookup { seq: 2, outcome: Ok(None), .. })));
    }

    #[tokio::test]
    async fn dispatch_posts_results_to_channel() {
        let mut h = harness(None, FakeDirectory::default());
        let at = Coordinate::new(12.0, 77.0);
        h.services.dispatch(Command::FindStations { generation: 7, at });
        h.services.dispatch(Command::Route {
            generation: 7,
            target: RouteTarget::Station,
            from: at,
            to: Coordinate::new(12.01, 77.0),
        });

        let mut saw_stations = false;
        let mut saw_route = false;
        for _ in 0..2 {
            match h.rx.recv().await {
                Some(Event::StationsFound { generation: 7, stations }) => {
                    assert_eq!(stations[0].name, "Local PS");
                    saw_stations = true;
                }
                Some(Event::RouteReady { generation: 7, route, .. }) => {
                    assert_eq!(route.path.len(), 2);
                    saw_route = true;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(saw_stations && saw_route);
    }
}
