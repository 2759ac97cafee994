//! Event types and the main event loop driver for the Guardian TUI.
//!
//! This module defines the [`Event`] enum (keyboard input, ticks, and the
//! results of background service calls) and the [`EventHandler`], which runs a
//! background task that polls crossterm for key events and emits periodic
//! [`Event::Tick`]s. Service tasks spawned by
//! [`Services`](crate::services::Services) post their results through
//! [`EventHandler::tx`].

use crate::map::RouteTarget;
use crate::models::{Coordinate, PoliceStation, Profile};
use crate::routing::Route;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::error;

/// Everything the [`App`](crate::app::App) reacts to.
///
/// Results of async work carry the sequence number or map generation that
/// was current when the work was requested, so late answers can be dropped.
#[derive(Debug)]
pub enum Event {
    /// Periodic tick used for UI refresh.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// Onboarding finished: the directory accepted the profile.
    Registered(Profile),
    /// Onboarding failed; payload is the reason.
    RegistrationFailed(String),
    /// A live position reading arrived.
    PositionAcquired(Coordinate),
    /// The live position request was denied, failed or timed out.
    PositionFailed(String),
    /// Address text for the coordinate of location sequence `seq`.
    AddressResolved { seq: u64, address: String },
    /// Outcome of the reverse lookup that validates a manual coordinate.
    ManualResolved {
        seq: u64,
        coord: Coordinate,
        outcome: Result<Option<String>, String>,
    },
    /// Police stations around the user, nearest first.
    StationsFound { generation: u64, stations: Vec<PoliceStation> },
    /// A routed path for one of the map's destinations.
    RouteReady {
        generation: u64,
        target: RouteTarget,
        route: Route,
    },
    /// Directory answer for a contact search.
    ContactLookup {
        seq: u64,
        name: String,
        outcome: Result<Option<Coordinate>, String>,
    },
}

/// Multiplexes terminal input and ticks into a single event stream.
///
/// Holds an unbounded channel: the sender ([`tx`](EventHandler::tx)) is cloned
/// into the service dispatcher, while the receiver is consumed by
/// [`next`](EventHandler::next) in the main loop.
pub struct EventHandler {
    /// Sender for posting events from background tasks.
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler and spawns the input/tick task.
    ///
    /// The task polls crossterm with a timeout of `tick_rate_ms`; key presses
    /// become [`Event::Input`] and each elapsed interval an [`Event::Tick`].
    /// If the terminal stops answering the task logs and exits, which ends
    /// the tick stream but leaves service results flowing.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));
                match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            event_tx.send(Event::Input(key)).ok();
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Terminal read failed: {}", e);
                            break;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        error!("Terminal poll failed: {}", e);
                        break;
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    if event_tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { tx, rx }
    }

    /// Receives the next event from the channel.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
