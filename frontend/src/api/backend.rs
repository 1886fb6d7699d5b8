//! Trait seams over the hosted backend.
//!
//! The stores and the auth workflow only see these traits, so they can be
//! driven by [`ApiClient`](super::ApiClient) in production and by fakes or
//! mockall mocks in tests.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use super::query::{Query, SelectResponse};
use super::types::{ApiError, AuthEvent, AuthResponse, Session};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError>;

    async fn sign_out(&self) -> Result<(), ApiError>;

    /// Current session, refreshed first when it has expired.
    async fn get_session(&self) -> Result<Option<Session>, ApiError>;

    async fn reset_password_for_email(&self, email: &str) -> Result<(), ApiError>;

    /// Session-change notifications, one receiver per subscriber.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableApi: Send + Sync {
    async fn select(&self, table: &str, query: Query) -> Result<SelectResponse, ApiError>;

    async fn insert(&self, table: &str, row: Value) -> Result<(), ApiError>;
}
