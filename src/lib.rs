pub mod api;
pub mod app;
pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod geo;
pub mod geocoder;
pub mod location;
pub mod logging;
pub mod map;
pub mod models;
pub mod police;
pub mod routing;
pub mod services;
pub mod store;
pub mod ui;
