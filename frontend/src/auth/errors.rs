//! Error taxonomy shown to the student, and the mapping from backend
//! failures onto it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::validation::ValidationError;
use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    Connection,
    Validation,
    DuplicateEmail,
    Auth,
    StudentCreation,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
    #[serde(default)]
    pub should_navigate_to_login: bool,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            should_navigate_to_login: false,
        }
    }

    pub fn connection() -> Self {
        Self::new(
            AuthErrorKind::Connection,
            "Nu se poate conecta la baza de date. Verificați conexiunea internet.",
        )
    }

    pub fn duplicate_email(message: impl Into<String>) -> Self {
        Self {
            kind: AuthErrorKind::DuplicateEmail,
            message: message.into(),
            should_navigate_to_login: true,
        }
    }

    pub fn student_creation() -> Self {
        Self::new(
            AuthErrorKind::StudentCreation,
            "Contul a fost creat, dar profilul de student nu a putut fi creat. Puteți încerca să vă autentificați și profilul va fi creat automat.",
        )
    }
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        Self::new(AuthErrorKind::Validation, err.to_string())
    }
}

const DUPLICATE_PHRASES: [&str; 4] = [
    "User already registered",
    "already been registered",
    "email address is already in use",
    "duplicate",
];

/// Failures that are not a backend verdict on the request itself.
fn transport_error(err: &ApiError) -> Option<AuthError> {
    match err {
        ApiError::Network(_) => Some(AuthError::connection()),
        ApiError::Decode(message) => Some(AuthError::new(AuthErrorKind::General, message.clone())),
        _ => None,
    }
}

pub fn classify_sign_in_error(err: &ApiError) -> AuthError {
    if let Some(mapped) = transport_error(err) {
        return mapped;
    }
    let message = err.message();
    let text = if message.contains("Invalid login credentials") {
        "Email sau parolă incorecte. Verificați datele și încercați din nou.".to_string()
    } else if message.contains("No API key found") {
        "Problemă cu configurarea aplicației. Contactați administratorul.".to_string()
    } else if message.contains("400") || message.contains("Bad Request") {
        "Problemă cu serverul. Încercați din nou mai târziu.".to_string()
    } else {
        message
    };
    AuthError::new(AuthErrorKind::Auth, text)
}

pub fn classify_sign_up_error(err: &ApiError) -> AuthError {
    if let Some(mapped) = transport_error(err) {
        return mapped;
    }
    let message = err.message();
    if err.code() == Some("user_already_exists")
        || DUPLICATE_PHRASES.iter().any(|phrase| message.contains(phrase))
    {
        return AuthError::duplicate_email(
            "Există deja un cont cu acest email. Încercați să vă autentificați sau folosiți un alt email.",
        );
    }
    if message.contains("No API key found") {
        return AuthError::new(
            AuthErrorKind::Auth,
            "Problemă cu configurarea aplicației. Contactați administratorul.",
        );
    }
    if message.contains("Invalid email") {
        return AuthError::new(
            AuthErrorKind::Validation,
            "Vă rugăm să introduceți un email valid.",
        );
    }
    if message.contains("Password") {
        return AuthError::new(
            AuthErrorKind::Validation,
            "Parola trebuie să aibă cel puțin 6 caractere.",
        );
    }
    if message.is_empty() {
        return AuthError::new(
            AuthErrorKind::Auth,
            "A apărut o eroare la crearea contului",
        );
    }
    AuthError::new(AuthErrorKind::Auth, message)
}
