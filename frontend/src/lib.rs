//! Client core for the Cursuri course calendar: a typed client for the
//! hosted backend, the session and profile store, the registration and
//! login workflow, and the course list and calendar stores.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use app::App;
pub use config::Config;
