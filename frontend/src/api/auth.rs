use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use super::{
    backend::AuthApi,
    client::ApiClient,
    types::{ApiError, AuthChangeEvent, AuthEvent, AuthResponse, Session},
};

impl ApiClient {
    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, ApiError> {
        let response = Self::execute(
            self.auth_request(Method::POST, "token")
                .query(&[("grant_type", grant_type)])
                .json(&body),
        )
        .await?;

        let value: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        let auth = AuthResponse::from_value(value)?;
        auth.session
            .map(|session| session.stamped(Utc::now()))
            .ok_or(ApiError::NoSession)
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ApiError> {
        let session = self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        self.store_session(Some(session.clone()), AuthChangeEvent::TokenRefreshed)
            .await;
        Ok(session)
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        tracing::debug!(email, "auth sign up");
        let response = Self::execute(
            self.auth_request(Method::POST, "signup")
                .json(&json!({ "email": email, "password": password })),
        )
        .await?;

        let value: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        let mut auth = AuthResponse::from_value(value)?;
        if let Some(session) = auth.session.take() {
            let session = session.stamped(Utc::now());
            self.store_session(Some(session.clone()), AuthChangeEvent::SignedIn)
                .await;
            auth.session = Some(session);
        }
        Ok(auth)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        tracing::debug!(email, "auth sign in");
        let session = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;
        self.store_session(Some(session.clone()), AuthChangeEvent::SignedIn)
            .await;
        Ok(AuthResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        let result = match self.current_session().await {
            Some(session) => Self::execute(
                self.auth_request(Method::POST, "logout")
                    .bearer_auth(&session.access_token),
            )
            .await
            .map(|_| ()),
            None => Ok(()),
        };
        if let Err(err) = &result {
            tracing::warn!(error = %err, "remote sign out failed; clearing local session anyway");
        }
        self.store_session(None, AuthChangeEvent::SignedOut).await;
        result
    }

    async fn get_session(&self) -> Result<Option<Session>, ApiError> {
        let Some(session) = self.current_session().await else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            self.store_session(None, AuthChangeEvent::SignedOut).await;
            return Ok(None);
        };
        match self.refresh_session(&refresh_token).await {
            Ok(session) => Ok(Some(session)),
            Err(err) if err.is_connection() => Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "session refresh rejected");
                self.store_session(None, AuthChangeEvent::SignedOut).await;
                Ok(None)
            }
        }
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), ApiError> {
        Self::execute(
            self.auth_request(Method::POST, "recover")
                .json(&json!({ "email": email })),
        )
        .await
        .map(|_| ())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.subscribe_events()
    }
}
