mod auth;
pub mod backend;
pub mod client;
pub mod query;
mod rest;
pub mod types;

pub use backend::{AuthApi, TableApi};
pub use client::ApiClient;
pub use query::{Query, SelectResponse};
pub use types::*;
