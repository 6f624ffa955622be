pub mod cleaner;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod hass;
pub mod health;
pub mod hub;
pub mod model;
pub mod notify;
pub mod routes;
pub mod server;
pub mod trigger;
