//! The location page as an explicit state machine.
//!
//! ```text
//! Onboarding --Registered--> Acquiring --first coordinate--> Active
//! ```
//!
//! A stored profile skips straight to `Acquiring`. `App` does no network I/O:
//! each transition returns the [`Command`]s it wants run, and the results come
//! back later as [`Event`]s. Within one transition the order is fixed:
//! persist locally, then request address, directory sync and map work. Those
//! requests run concurrently and may finish in any order.
//!
//! Four counters guard against late answers: `location_seq` for addresses,
//! the map generation for stations and routes, `manual_seq` for manual entry
//! and `contact_seq` for contact searches. A result is applied only if it
//! carries the current value.

use crate::events::Event;
use crate::map::{MapStyle, MapView, RouteTarget};
use crate::models::{Coordinate, LocationDetails, PoliceStation, Profile, Role};
use crate::store::{self, LocalStore};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, error, info, warn};

pub const DETECTING: &str = "Detecting your location...";
pub const LOADING: &str = "Loading location...";
pub const MISSING_FIELDS: &str = "Please enter your name and select a role";
pub const SAVE_FAILED: &str = "Failed to save data. Please try again.";
pub const MANUAL_SET: &str = "Manual location set";
pub const INVALID_COORDINATES: &str = "Invalid coordinates entered";
pub const CONTACT_MISSING: &str = "Your daughter is not registered in the website";
pub const CONTACT_ERROR: &str = "Error searching for daughter";
pub const NO_LOCATION_YET: &str = "Location not available yet...";

/// Work the [`App`] asks the service layer to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Take one position reading, then register the profile with the directory.
    Register { name: String, role: Role },
    AcquirePosition,
    ResolveAddress { seq: u64, at: Coordinate },
    /// Reverse lookup that decides whether a manual coordinate is accepted.
    ResolveManual { seq: u64, at: Coordinate },
    FindStations { generation: u64, at: Coordinate },
    Route {
        generation: u64,
        target: RouteTarget,
        from: Coordinate,
        to: Coordinate,
    },
    SyncDirectory { name: String, at: Coordinate },
    LookupContact { seq: u64, name: String },
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Phase {
    Onboarding,
    Acquiring,
    Active,
}

/// Which text field receives keystrokes on the active page.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum Focus {
    #[default]
    None,
    Latitude,
    Longitude,
    ContactName,
}

#[derive(Debug, Default)]
pub struct OnboardingForm {
    pub name: String,
    pub role: Option<Role>,
    pub message: Option<String>,
    pub submitting: bool,
}

impl OnboardingForm {
    fn cycle_role(&mut self) {
        self.role = match self.role {
            None => Some(Role::Parent),
            Some(Role::Parent) => Some(Role::Daughter),
            Some(Role::Daughter) => None,
        };
    }
}

pub struct App {
    store: Box<dyn LocalStore>,
    pub phase: Phase,
    pub should_quit: bool,
    pub tick_count: usize,

    pub form: OnboardingForm,
    pub profile: Option<Profile>,

    pub location: Option<Coordinate>,
    pub details: LocationDetails,
    pub status: String,
    pub last_fix: Option<DateTime<Local>>,
    pub stations: Vec<PoliceStation>,
    pub map: MapView,

    pub contact: Option<Coordinate>,
    pub contact_status: String,

    pub focus: Focus,
    pub lat_input: String,
    pub lng_input: String,
    pub contact_input: String,
    pub fullscreen: bool,
    pub alert: Option<String>,

    location_seq: u64,
    manual_seq: u64,
    contact_seq: u64,
}

impl App {
    pub fn new(store: Box<dyn LocalStore>, style: MapStyle) -> Self {
        let profile = store::load_profile(store.as_ref());
        Self {
            store,
            phase: Phase::Onboarding,
            should_quit: false,
            tick_count: 0,
            form: OnboardingForm::default(),
            profile,
            location: None,
            details: LocationDetails::default(),
            status: DETECTING.to_string(),
            last_fix: None,
            stations: Vec::new(),
            map: MapView::new(style),
            contact: None,
            contact_status: String::new(),
            focus: Focus::None,
            lat_input: String::new(),
            lng_input: String::new(),
            contact_input: String::new(),
            fullscreen: false,
            alert: None,
            location_seq: 0,
            manual_seq: 0,
            contact_seq: 0,
        }
    }

    /// Enters the first phase. Returning users skip onboarding.
    pub fn start(&mut self) -> Vec<Command> {
        match &self.profile {
            Some(profile) => {
                info!(name = %profile.name, "profile found, skipping onboarding");
                self.begin_acquiring()
            }
            None => {
                self.phase = Phase::Onboarding;
                Vec::new()
            }
        }
    }

    pub fn is_parent(&self) -> bool {
        matches!(self.profile, Some(Profile { role: Role::Parent, .. }))
    }

    pub fn nearest_station(&self) -> Option<&PoliceStation> {
        self.stations.first()
    }

    pub fn on_tick(&mut self) {
        self.tick_count += 1;
    }

    pub fn update(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::Tick => {
                self.on_tick();
                Vec::new()
            }
            Event::Input(key) => self.handle_key(key),
            Event::Registered(profile) => self.on_registered(profile),
            Event::RegistrationFailed(reason) => {
                error!("Error submitting data: {}", reason);
                self.form.submitting = false;
                self.form.message = Some(SAVE_FAILED.to_string());
                Vec::new()
            }
            Event::PositionAcquired(coord) => {
                self.status = match coord.accuracy {
                    Some(acc) => format!("Location acquired (Accuracy: {}m)", acc.round()),
                    None => "Location acquired (Accuracy: approximate)".to_string(),
                };
                self.adopt_location(coord, None)
            }
            Event::PositionFailed(reason) => self.on_position_failed(reason),
            Event::AddressResolved { seq, address } => {
                if seq == self.location_seq {
                    self.details.full_address = address;
                } else {
                    debug!(seq, current = self.location_seq, "dropping stale address");
                }
                Vec::new()
            }
            Event::ManualResolved { seq, coord, outcome } => self.on_manual_resolved(seq, coord, outcome),
            Event::StationsFound { generation, stations } => self.on_stations(generation, stations),
            Event::RouteReady {
                generation,
                target,
                route,
            } => {
                self.map.apply_route(generation, target, route);
                Vec::new()
            }
            Event::ContactLookup { seq, name, outcome } => self.on_contact_lookup(seq, name, outcome),
        }
    }

    fn begin_acquiring(&mut self) -> Vec<Command> {
        self.phase = Phase::Acquiring;
        self.status = DETECTING.to_string();
        vec![Command::AcquirePosition]
    }

    fn on_registered(&mut self, profile: Profile) -> Vec<Command> {
        if let Err(e) = store::save_profile(self.store.as_mut(), &profile) {
            error!("Failed to persist profile: {}", e);
        }
        info!(name = %profile.name, role = %profile.role, "onboarding complete");
        self.form = OnboardingForm::default();
        self.profile = Some(profile);
        self.begin_acquiring()
    }

    fn on_position_failed(&mut self, reason: String) -> Vec<Command> {
        warn!("Failed to detect location: {}", reason);
        self.status = format!("Failed to detect location: {}", reason);
        match store::load_last_known(self.store.as_ref()) {
            Some(last) => {
                info!("Falling back to last known location");
                self.adopt_location(last, None)
            }
            None => Vec::new(),
        }
    }

    /// Makes `coord` the current position. `address` is given when it was
    /// already resolved (manual entry); otherwise a lookup is requested.
    fn adopt_location(&mut self, coord: Coordinate, address: Option<String>) -> Vec<Command> {
        if let Err(e) = store::save_last_known(self.store.as_mut(), &coord) {
            error!("Failed to persist last known location: {}", e);
        }

        self.phase = Phase::Active;
        self.location = Some(coord);
        self.last_fix = Some(Local::now());
        self.location_seq += 1;

        let mut commands = Vec::new();
        match address {
            Some(address) => self.details.full_address = address,
            None => commands.push(Command::ResolveAddress {
                seq: self.location_seq,
                at: coord,
            }),
        }
        if let Some(profile) = &self.profile {
            commands.push(Command::SyncDirectory {
                name: profile.name.clone(),
                at: coord,
            });
        }
        commands.extend(self.redraw_map());
        commands
    }

    /// Full teardown and redraw; asks for stations and the contact route anew.
    fn redraw_map(&mut self) -> Vec<Command> {
        let Some(user) = self.location else {
            return Vec::new();
        };
        let generation = self.map.rebuild(user, self.contact);
        let mut commands = vec![Command::FindStations { generation, at: user }];
        if let Some(contact) = self.contact {
            commands.push(Command::Route {
                generation,
                target: RouteTarget::Contact,
                from: user,
                to: contact,
            });
        }
        commands
    }

    fn on_stations(&mut self, generation: u64, stations: Vec<PoliceStation>) -> Vec<Command> {
        if generation != self.map.generation() {
            debug!(generation, current = self.map.generation(), "dropping stale stations");
            return Vec::new();
        }
        self.stations = stations;
        let (Some(user), Some(nearest)) = (self.location, self.stations.first()) else {
            return Vec::new();
        };
        self.map.add_station(generation, nearest);
        vec![Command::Route {
            generation,
            target: RouteTarget::Station,
            from: user,
            to: nearest.location,
        }]
    }

    fn on_manual_resolved(
        &mut self,
        seq: u64,
        coord: Coordinate,
        outcome: Result<Option<String>, String>,
    ) -> Vec<Command> {
        if seq != self.manual_seq {
            debug!(seq, current = self.manual_seq, "dropping stale manual lookup");
            return Vec::new();
        }
        match outcome {
            Ok(Some(address)) => {
                self.lat_input.clear();
                self.lng_input.clear();
                self.focus = Focus::None;
                self.status = MANUAL_SET.to_string();
                self.adopt_location(coord.with_accuracy(0.0), Some(address))
            }
            // The service knows nothing at that point; leave everything as is.
            Ok(None) => Vec::new(),
            Err(reason) => {
                error!("Invalid coordinates: {}", reason);
                self.status = INVALID_COORDINATES.to_string();
                Vec::new()
            }
        }
    }

    fn on_contact_lookup(
        &mut self,
        seq: u64,
        name: String,
        outcome: Result<Option<Coordinate>, String>,
    ) -> Vec<Command> {
        if seq != self.contact_seq {
            debug!(seq, current = self.contact_seq, "dropping stale contact lookup");
            return Vec::new();
        }
        let found = match outcome {
            Ok(Some(coord)) => {
                self.contact_status = format!("Found {}'s location", name);
                Some(coord)
            }
            Ok(None) => {
                self.contact_status = CONTACT_MISSING.to_string();
                None
            }
            Err(reason) => {
                error!("Error searching daughter: {}", reason);
                self.contact_status = CONTACT_ERROR.to_string();
                None
            }
        };
        if found == self.contact {
            return Vec::new();
        }
        self.contact = found;
        self.redraw_map()
    }

    /// Validates the manual fields. Anything that isn't two finite numbers is
    /// ignored without touching the status line.
    pub fn submit_manual(&mut self) -> Vec<Command> {
        let parse = |s: &str| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());
        let (Some(lat), Some(lng)) = (parse(&self.lat_input), parse(&self.lng_input)) else {
            debug!(lat = %self.lat_input, lng = %self.lng_input, "ignoring non-numeric manual entry");
            return Vec::new();
        };
        self.manual_seq += 1;
        vec![Command::ResolveManual {
            seq: self.manual_seq,
            at: Coordinate::new(lat, lng),
        }]
    }

    pub fn search_contact(&mut self) -> Vec<Command> {
        let name = self.contact_input.trim();
        if !self.is_parent() || name.is_empty() {
            return Vec::new();
        }
        self.contact_seq += 1;
        vec![Command::LookupContact {
            seq: self.contact_seq,
            name: name.to_string(),
        }]
    }

    /// Builds the SOS summary. Informational only: nothing is sent anywhere.
    pub fn emergency_message(&self) -> String {
        let Some(location) = self.location else {
            return NO_LOCATION_YET.to_string();
        };
        let mut msg = format!(
            "EMERGENCY ALERT!\nYour Location: {}\nCoordinates: {}, {}\n",
            self.details.full_address, location.lat, location.lng
        );
        match self.nearest_station() {
            Some(station) => msg.push_str(&format!(
                "Nearest Police: {}\nDistance: {} m",
                station.name,
                station.distance_m().round() as i64
            )),
            None => msg.push_str("No nearby police stations found"),
        }
        msg
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Vec::new();
        }

        match self.phase {
            Phase::Onboarding => self.handle_onboarding_key(key),
            Phase::Acquiring => {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                    KeyCode::Char('r') => return self.begin_acquiring(),
                    _ => {}
                }
                Vec::new()
            }
            Phase::Active => self.handle_active_key(key),
        }
    }

    fn handle_onboarding_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if self.form.submitting {
            return Vec::new();
        }
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Left | KeyCode::Right => self.form.cycle_role(),
            KeyCode::Backspace => {
                self.form.name.pop();
            }
            KeyCode::Char(c) => self.form.name.push(c),
            KeyCode::Enter => {
                let name = self.form.name.trim().to_string();
                let Some(role) = self.form.role.filter(|_| !name.is_empty()) else {
                    self.form.message = Some(MISSING_FIELDS.to_string());
                    return Vec::new();
                };
                self.form.submitting = true;
                self.form.message = None;
                return vec![Command::Register { name, role }];
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_active_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if self.alert.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.alert = None;
            }
            return Vec::new();
        }

        if self.focus != Focus::None {
            return self.handle_field_key(key);
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => {
                self.status = DETECTING.to_string();
                return vec![Command::AcquirePosition];
            }
            KeyCode::Char('m') => {
                self.map.set_style(self.map.style().toggled());
                return self.redraw_map();
            }
            KeyCode::Char('f') => self.fullscreen = !self.fullscreen,
            KeyCode::Char('l') | KeyCode::Tab => self.focus = Focus::Latitude,
            KeyCode::Char('c') if self.is_parent() => self.focus = Focus::ContactName,
            KeyCode::Char('e') | KeyCode::Char('!') if !self.is_parent() => {
                self.alert = Some(self.emergency_message());
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_field_key(&mut self, key: KeyEvent) -> Vec<Command> {
        match key.code {
            KeyCode::Esc => self.focus = Focus::None,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Latitude => Focus::Longitude,
                    Focus::Longitude if self.is_parent() => Focus::ContactName,
                    Focus::Longitude | Focus::ContactName | Focus::None => Focus::Latitude,
                };
            }
            KeyCode::Enter => {
                return match self.focus {
                    Focus::ContactName => self.search_contact(),
                    _ => self.submit_manual(),
                };
            }
            KeyCode::Backspace => {
                if let Some(field) = self.focused_field() {
                    field.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(field) = self.focused_field() {
                    field.push(c);
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn focused_field(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::Latitude => Some(&mut self.lat_input),
            Focus::Longitude => Some(&mut self.lng_input),
            Focus::ContactName => Some(&mut self.contact_input),
            Focus::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MarkerKind;
    use crate::routing::Route;
    use crate::store::MemoryStore;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn profile(role: Role) -> Profile {
        Profile {
            name: "asha".into(),
            role,
            latitude: 12.97,
            longitude: 77.59,
        }
    }

    fn store_with(profile: Option<Profile>, last_known: Option<Coordinate>) -> Box<dyn LocalStore> {
        let mut store = MemoryStore::default();
        if let Some(p) = profile {
            store::save_profile(&mut store, &p).unwrap();
        }
        if let Some(c) = last_known {
            store::save_last_known(&mut store, &c).unwrap();
        }
        Box::new(store)
    }

    fn station(name: &str, distance_km: f64) -> PoliceStation {
        PoliceStation {
            name: name.into(),
            address: "Address not available".into(),
            location: Coordinate::new(12.98, 77.60),
            distance_km,
        }
    }

    /// An app that already has a live coordinate.
    fn active_app(role: Role) -> App {
        let mut app = App::new(store_with(Some(profile(role)), None), MapStyle::Street);
        app.start();
        app.update(Event::PositionAcquired(Coordinate::new(12.97, 77.59).with_accuracy(12.4)));
        app
    }

    fn count<F: Fn(&Command) -> bool>(commands: &[Command], f: F) -> usize {
        commands.iter().filter(|c| f(c)).count()
    }

    #[test]
    fn new_user_starts_onboarding() {
        let mut app = App::new(store_with(None, None), MapStyle::Street);
        assert!(app.start().is_empty());
        assert_eq!(app.phase, Phase::Onboarding);
    }

    #[test]
    fn onboarding_requires_name_and_role() {
        let mut app = App::new(store_with(None, None), MapStyle::Street);
        app.start();
        type_text(&mut app, "asha");
        assert!(app.handle_key(key(KeyCode::Enter)).is_empty());
        assert_eq!(app.form.message.as_deref(), Some(MISSING_FIELDS));

        app.handle_key(key(KeyCode::Tab));
        let commands = app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            commands,
            vec![Command::Register {
                name: "asha".into(),
                role: Role::Parent
            }]
        );
    }

    #[test]
    fn registration_persists_and_starts_acquiring() {
        let mut app = App::new(store_with(None, None), MapStyle::Street);
        app.start();
        let commands = app.update(Event::Registered(profile(Role::Daughter)));
        assert_eq!(commands, vec![Command::AcquirePosition]);
        assert_eq!(app.phase, Phase::Acquiring);
        assert_eq!(store::load_profile(app.store.as_ref()), Some(profile(Role::Daughter)));
    }

    #[test]
    fn failed_registration_shows_retry_message() {
        let mut app = App::new(store_with(None, None), MapStyle::Street);
        app.start();
        app.form.submitting = true;
        app.update(Event::RegistrationFailed("connection refused".into()));
        assert!(!app.form.submitting);
        assert_eq!(app.form.message.as_deref(), Some(SAVE_FAILED));
        assert_eq!(app.phase, Phase::Onboarding);
    }

    #[test]
    fn stored_profile_skips_onboarding() {
        let mut app = App::new(store_with(Some(profile(Role::Parent)), None), MapStyle::Street);
        assert_eq!(app.start(), vec![Command::AcquirePosition]);
        assert_eq!(app.phase, Phase::Acquiring);
    }

    #[test]
    fn live_fix_persists_and_fans_out() {
        let mut app = App::new(store_with(Some(profile(Role::Daughter)), None), MapStyle::Street);
        app.start();
        let coord = Coordinate::new(12.97, 77.59).with_accuracy(12.4);
        let commands = app.update(Event::PositionAcquired(coord));

        assert_eq!(app.phase, Phase::Active);
        assert_eq!(app.status, "Location acquired (Accuracy: 12m)");
        assert_eq!(store::load_last_known(app.store.as_ref()), Some(coord));
        assert_eq!(count(&commands, |c| matches!(c, Command::ResolveAddress { .. })), 1);
        assert_eq!(count(&commands, |c| matches!(c, Command::SyncDirectory { name, .. } if name == "asha")), 1);
        assert_eq!(count(&commands, |c| matches!(c, Command::FindStations { .. })), 1);
    }

    #[test]
    fn failure_without_history_keeps_loading() {
        let mut app = App::new(store_with(Some(profile(Role::Daughter)), None), MapStyle::Street);
        app.start();
        let commands = app.update(Event::PositionFailed("timed out after 3000ms".into()));
        assert!(commands.is_empty());
        assert_eq!(app.phase, Phase::Acquiring);
        assert!(app.location.is_none());
        assert_eq!(app.status, "Failed to detect location: timed out after 3000ms");
    }

    #[test]
    fn failure_falls_back_to_last_known() {
        let last = Coordinate::new(19.07, 72.87);
        let mut app = App::new(store_with(Some(profile(Role::Daughter)), Some(last)), MapStyle::Street);
        app.start();
        let commands = app.update(Event::PositionFailed("location permission denied".into()));
        assert_eq!(app.location, Some(last));
        assert_eq!(app.phase, Phase::Active);
        assert!(commands.contains(&Command::ResolveAddress { seq: 1, at: last }));
    }

    #[test]
    fn stale_address_is_dropped() {
        let mut app = active_app(Role::Daughter);
        app.update(Event::PositionAcquired(Coordinate::new(13.0, 77.6)));
        app.update(Event::AddressResolved {
            seq: 1,
            address: "old".into(),
        });
        assert_eq!(app.details, LocationDetails::default());
        app.update(Event::AddressResolved {
            seq: 2,
            address: "new".into(),
        });
        assert_eq!(app.details.full_address, "new");
    }

    #[test]
    fn manual_entry_issues_one_lookup() {
        let mut app = active_app(Role::Daughter);
        app.lat_input = " 12.5 ".into();
        app.lng_input = "77.25".into();
        let commands = app.submit_manual();
        assert_eq!(
            commands,
            vec![Command::ResolveManual {
                seq: 1,
                at: Coordinate::new(12.5, 77.25)
            }]
        );
    }

    #[test]
    fn non_numeric_manual_entry_is_ignored() {
        let mut app = active_app(Role::Daughter);
        let before = (app.status.clone(), app.location);
        for (lat, lng) in [("abc", "77.2"), ("12.5", ""), ("NaN", "1"), ("1", "inf")] {
            app.lat_input = lat.into();
            app.lng_input = lng.into();
            assert!(app.submit_manual().is_empty(), "{lat} / {lng}");
        }
        assert_eq!((app.status.clone(), app.location), before);
    }

    #[test]
    fn accepted_manual_entry_replaces_location() {
        let mut app = active_app(Role::Daughter);
        app.lat_input = "12.5".into();
        app.lng_input = "77.25".into();
        app.submit_manual();
        let coord = Coordinate::new(12.5, 77.25);
        let commands = app.update(Event::ManualResolved {
            seq: 1,
            coord,
            outcome: Ok(Some("Indiranagar, Bengaluru".into())),
        });
        assert_eq!(app.location, Some(coord.with_accuracy(0.0)));
        assert_eq!(app.details.full_address, "Indiranagar, Bengaluru");
        assert_eq!(app.status, MANUAL_SET);
        assert!(app.lat_input.is_empty() && app.lng_input.is_empty());
        // Address is already known, so no second lookup.
        assert_eq!(count(&commands, |c| matches!(c, Command::ResolveAddress { .. })), 0);
        assert_eq!(count(&commands, |c| matches!(c, Command::SyncDirectory { .. })), 1);
    }

    #[test]
    fn failed_manual_lookup_reports_invalid() {
        let mut app = active_app(Role::Daughter);
        let before = app.location;
        app.lat_input = "95".into();
        app.lng_input = "10".into();
        app.submit_manual();
        app.update(Event::ManualResolved {
            seq: 1,
            coord: Coordinate::new(95.0, 10.0),
            outcome: Err("server returned 400: ".into()),
        });
        assert_eq!(app.status, INVALID_COORDINATES);
        assert_eq!(app.location, before);
    }

    #[test]
    fn superseded_manual_lookup_is_dropped() {
        let mut app = active_app(Role::Daughter);
        let before = app.location;
        app.lat_input = "12.5".into();
        app.lng_input = "77.25".into();
        app.submit_manual();
        app.lat_input = "12.6".into();
        app.lng_input = "77.35".into();
        assert!(matches!(app.submit_manual().as_slice(), [Command::ResolveManual { seq: 2, .. }]));

        let commands = app.update(Event::ManualResolved {
            seq: 1,
            coord: Coordinate::new(12.5, 77.25),
            outcome: Ok(Some("Indiranagar, Bengaluru".into())),
        });
        assert!(commands.is_empty());
        assert_eq!(app.location, before);
        assert_ne!(app.status, MANUAL_SET);

        let second = Coordinate::new(12.6, 77.35);
        app.update(Event::ManualResolved {
            seq: 2,
            coord: second,
            outcome: Ok(Some("Koramangala, Bengaluru".into())),
        });
        assert_eq!(app.location, Some(second.with_accuracy(0.0)));
        assert_eq!(app.details.full_address, "Koramangala, Bengaluru");
    }

    #[test]
    fn stations_feed_map_and_route() {
        let mut app = active_app(Role::Daughter);
        let generation = app.map.generation();
        let commands = app.update(Event::StationsFound {
            generation,
            stations: vec![station("Near", 0.8), station("Far", 3.0)],
        });
        assert_eq!(app.nearest_station().map(|s| s.name.as_str()), Some("Near"));
        assert!(app.map.markers().any(|(k, _, label)| k == MarkerKind::Station && label == "Near"));
        assert!(matches!(
            commands.as_slice(),
            [Command::Route { target: RouteTarget::Station, .. }]
        ));
    }

    #[test]
    fn stations_from_an_old_map_are_dropped() {
        let mut app = active_app(Role::Daughter);
        let old = app.map.generation();
        app.handle_key(key(KeyCode::Char('m')));
        assert_eq!(app.map.style(), MapStyle::Satellite);
        let commands = app.update(Event::StationsFound {
            generation: old,
            stations: vec![station("Near", 0.8)],
        });
        assert!(commands.is_empty());
        assert!(app.stations.is_empty());
    }

    #[test]
    fn route_applies_to_current_map() {
        let mut app = active_app(Role::Daughter);
        let route = Route {
            path: vec![Coordinate::new(12.97, 77.59), Coordinate::new(12.98, 77.60)],
            distance_m: 1400.0,
            duration_s: 180.0,
        };
        app.update(Event::RouteReady {
            generation: app.map.generation(),
            target: RouteTarget::Station,
            route,
        });
        assert_eq!(app.map.routes().count(), 1);
    }

    #[test]
    fn unknown_contact_draws_nothing() {
        let mut app = active_app(Role::Parent);
        app.handle_key(key(KeyCode::Char('c')));
        type_text(&mut app, "meera");
        let commands = app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            commands,
            vec![Command::LookupContact {
                seq: 1,
                name: "meera".into()
            }]
        );
        let commands = app.update(Event::ContactLookup {
            seq: 1,
            name: "meera".into(),
            outcome: Ok(None),
        });
        assert!(commands.is_empty());
        assert_eq!(app.contact_status, CONTACT_MISSING);
        assert!(app.contact.is_none());
        assert!(app.map.markers().all(|(k, _, _)| k != MarkerKind::Contact));
        assert_eq!(app.map.routes().count(), 0);
    }

    #[test]
    fn found_contact_redraws_with_route() {
        let mut app = active_app(Role::Parent);
        app.contact_input = "meera".into();
        app.search_contact();
        let contact = Coordinate::new(13.01, 77.62);
        let commands = app.update(Event::ContactLookup {
            seq: 1,
            name: "meera".into(),
            outcome: Ok(Some(contact)),
        });
        assert_eq!(app.contact_status, "Found meera's location");
        assert!(app.map.markers().any(|(k, at, _)| k == MarkerKind::Contact && at == contact));
        assert_eq!(
            count(&commands, |c| matches!(c, Command::Route { target: RouteTarget::Contact, to, .. } if *to == contact)),
            1
        );
    }

    #[test]
    fn superseded_contact_lookup_is_dropped() {
        let mut app = active_app(Role::Parent);
        app.contact_input = "meera".into();
        app.search_contact();
        app.contact_input = "riya".into();
        app.search_contact();
        let generation = app.map.generation();

        let commands = app.update(Event::ContactLookup {
            seq: 1,
            name: "meera".into(),
            outcome: Ok(Some(Coordinate::new(13.01, 77.62))),
        });
        assert!(commands.is_empty());
        assert!(app.contact.is_none());
        assert!(app.contact_status.is_empty());
        assert_eq!(app.map.generation(), generation);

        app.update(Event::ContactLookup {
            seq: 2,
            name: "riya".into(),
            outcome: Ok(None),
        });
        assert_eq!(app.contact_status, CONTACT_MISSING);
    }

    #[test]
    fn contact_search_is_parent_only() {
        let mut app = active_app(Role::Daughter);
        app.contact_input = "meera".into();
        assert!(app.search_contact().is_empty());
    }

    #[test]
    fn emergency_summary_lists_station() {
        let mut app = active_app(Role::Daughter);
        app.details.full_address = "MG Road, Bengaluru".into();
        let generation = app.map.generation();
        app.update(Event::StationsFound {
            generation,
            stations: vec![station("Cubbon Park PS", 1.2346)],
        });
        app.handle_key(key(KeyCode::Char('e')));
        assert_eq!(
            app.alert.as_deref(),
            Some(
                "EMERGENCY ALERT!\nYour Location: MG Road, Bengaluru\nCoordinates: 12.97, 77.59\n\
                 Nearest Police: Cubbon Park PS\nDistance: 1235 m"
            )
        );
        app.handle_key(key(KeyCode::Enter));
        assert!(app.alert.is_none());
    }

    #[test]
    fn emergency_without_station() {
        let app = active_app(Role::Daughter);
        assert!(app.emergency_message().ends_with("No nearby police stations found"));
    }

    #[test]
    fn emergency_before_location() {
        let app = App::new(store_with(None, None), MapStyle::Street);
        assert_eq!(app.emergency_message(), NO_LOCATION_YET);
    }

    #[test]
    fn parents_have_no_sos_key() {
        let mut app = active_app(Role::Parent);
        app.handle_key(key(KeyCode::Char('e')));
        assert!(app.alert.is_none());
    }

    #[test]
    fn refresh_requests_new_fix() {
        let mut app = active_app(Role::Daughter);
        assert_eq!(app.handle_key(key(KeyCode::Char('r'))), vec![Command::AcquirePosition]);
        assert_eq!(app.status, DETECTING);
    }
}
