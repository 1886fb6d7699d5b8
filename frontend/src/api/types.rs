use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Seconds before `expires_at` at which a session is already treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Network(String),
    #[error("{message}")]
    Service {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },
    #[error("Failed to parse response: {0}")]
    Decode(String),
    #[error("No active session")]
    NoSession,
}

impl ApiError {
    pub fn service(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            code: code.map(str::to_string),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    /// Builds a service error from a non-success response body.
    ///
    /// The auth service and the table service disagree on field names
    /// (`msg` / `error_description` vs `message`), so every known spelling
    /// is tried before falling back to the raw body.
    pub fn from_body(status: u16, body: &str) -> Self {
        let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let pick = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str))
                .map(str::to_string)
        };

        let message = pick(&["msg", "message", "error_description", "error"]).unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status)
            } else {
                trimmed.to_string()
            }
        });
        let code = pick(&["error_code", "code"])
            .or_else(|| value.get("code").and_then(Value::as_i64).map(|c| c.to_string()));

        Self::Service {
            status,
            code,
            message,
            details: pick(&["details"]),
            hint: pick(&["hint"]),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Service { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// The backend could not be reached at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Table or relation does not exist under this name.
    pub fn is_missing_relation(&self) -> bool {
        if !matches!(self, Self::Service { .. }) {
            return false;
        }
        if matches!(self.code(), Some("42P01") | Some("PGRST205")) {
            return true;
        }
        let message = self.message();
        message.contains("does not exist")
            || message.contains("relation")
            || message.contains("table")
            || message.contains("schema cache")
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Service { .. })
            && (self.code() == Some("23505") || self.message().contains("duplicate"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

impl Session {
    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref().filter(|email| !email.is_empty())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => now.timestamp() >= at - EXPIRY_MARGIN_SECS,
            None => false,
        }
    }

    /// Fills `expires_at` from `expires_in` when the service only sent the latter.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| now.timestamp() + secs);
        }
        self
    }
}

/// Result of a sign-in or sign-up call.
///
/// Sign-up returns a bare user (no session) while email confirmation is pending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthResponse {
    pub user: Option<User>,
    pub session: Option<Session>,
}

impl AuthResponse {
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        let decode = |e: serde_json::Error| ApiError::Decode(e.to_string());

        if value.get("access_token").is_some() {
            let session: Session = serde_json::from_value(value).map_err(decode)?;
            return Ok(Self {
                user: Some(session.user.clone()),
                session: Some(session),
            });
        }
        if let Some(user) = value.get("user").filter(|u| !u.is_null()) {
            let user: User = serde_json::from_value(user.clone()).map_err(decode)?;
            return Ok(Self {
                user: Some(user),
                session: None,
            });
        }
        if value.get("id").is_some() {
            let user: User = serde_json::from_value(value).map_err(decode)?;
            return Ok(Self {
                user: Some(user),
                session: None,
            });
        }
        Ok(Self::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Session-change notification pushed by the backend client.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn new(event: AuthChangeEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn user_json() -> Value {
        json!({
            "id": "7d0c7f3e-2a35-4d8e-9a53-1f1ae5bd1f20",
            "email": "ana@student.ro",
            "created_at": "2024-05-01T10:00:00Z"
        })
    }

    #[test]
    fn from_body_reads_auth_service_shape() {
        let err = ApiError::from_body(
            400,
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        assert_eq!(err.code(), Some("invalid_credentials"));
        assert_eq!(err.message(), "Invalid login credentials");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn from_body_reads_legacy_auth_shape() {
        let err = ApiError::from_body(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.message(), "Invalid login credentials");
    }

    #[test]
    fn from_body_reads_table_service_shape() {
        let err = ApiError::from_body(
            404,
            r#"{"code":"42P01","message":"relation \"public.Student\" does not exist","details":null,"hint":null}"#,
        );
        assert_eq!(err.code(), Some("42P01"));
        assert!(err.is_missing_relation());
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn from_body_falls_back_to_raw_text() {
        let err = ApiError::from_body(502, "Bad Gateway");
        assert_eq!(err.message(), "Bad Gateway");
        let err = ApiError::from_body(500, "");
        assert_eq!(err.message(), "HTTP 500");
    }

    #[test]
    fn schema_cache_miss_counts_as_missing_relation() {
        let err = ApiError::service(
            404,
            Some("PGRST205"),
            "Could not find the table 'public.students' in the schema cache",
        );
        assert!(err.is_missing_relation());
        assert!(!ApiError::Network("timeout".into()).is_missing_relation());
    }

    #[test]
    fn unique_violation_detected_by_code() {
        let err = ApiError::service(409, Some("23505"), "conflict");
        assert!(err.is_unique_violation());
    }

    #[test]
    fn auth_response_from_session_body() {
        let body = json!({
            "access_token": "at",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "rt",
            "user": user_json()
        });
        let response = AuthResponse::from_value(body).unwrap();
        let session = response.session.expect("session");
        assert_eq!(session.email(), Some("ana@student.ro"));
        assert_eq!(response.user.unwrap().email.as_deref(), Some("ana@student.ro"));
    }

    #[test]
    fn auth_response_from_bare_user() {
        let response = AuthResponse::from_value(user_json()).unwrap();
        assert!(response.session.is_none());
        assert!(response.user.is_some());
    }

    #[test]
    fn session_expiry_uses_margin() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let session: Session = serde_json::from_value(json!({
            "access_token": "at",
            "expires_in": 3600,
            "user": user_json()
        }))
        .unwrap();
        let session = session.stamped(now);
        assert_eq!(session.expires_at, Some(now.timestamp() + 3600));
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + chrono::Duration::seconds(3595)));
    }
}
