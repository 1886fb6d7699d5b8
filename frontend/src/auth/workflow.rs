use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use super::{
    errors::{classify_sign_in_error, classify_sign_up_error, AuthError, AuthErrorKind},
    validation::{self, LoginCredentials, RegisterData},
};
use crate::{
    api::{AuthApi, User},
    models::Student,
    services::ProfileLoader,
    state::auth::SessionStore,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    #[default]
    Idle,
    Validating,
    Connecting,
    Authenticating,
    ProfileLoading,
    Succeeded,
    Failed,
}

/// Result handed back to the login and registration screens.
///
/// `success` with an `error` means the account exists but a later step
/// (profile creation) did not complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub user: Option<User>,
    pub student: Option<Student>,
    pub error: Option<AuthError>,
}

impl AuthOutcome {
    fn failed(error: AuthError) -> Self {
        Self {
            success: false,
            error: Some(error),
            ..Self::default()
        }
    }

    fn succeeded(user: User, student: Option<Student>) -> Self {
        Self {
            success: true,
            user: Some(user),
            student,
            error: None,
        }
    }
}

pub struct AuthWorkflow {
    auth: Arc<dyn AuthApi>,
    profiles: Arc<ProfileLoader>,
    session: Arc<SessionStore>,
    phase: watch::Sender<AttemptPhase>,
}

impl AuthWorkflow {
    pub fn new(
        auth: Arc<dyn AuthApi>,
        profiles: Arc<ProfileLoader>,
        session: Arc<SessionStore>,
    ) -> Self {
        let (phase, _) = watch::channel(AttemptPhase::Idle);
        Self {
            auth,
            profiles,
            session,
            phase,
        }
    }

    pub fn phase(&self) -> AttemptPhase {
        *self.phase.borrow()
    }

    pub fn watch_phase(&self) -> watch::Receiver<AttemptPhase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: AttemptPhase) {
        self.phase.send_replace(phase);
    }

    fn fail(&self, error: AuthError) -> AuthOutcome {
        tracing::warn!(kind = ?error.kind, message = %error.message, "auth attempt failed");
        self.enter(AttemptPhase::Failed);
        AuthOutcome::failed(error)
    }

    pub async fn login(&self, credentials: LoginCredentials) -> AuthOutcome {
        self.enter(AttemptPhase::Validating);
        if let Err(err) = validation::validate_login(&credentials) {
            return self.fail(err.into());
        }

        self.enter(AttemptPhase::Connecting);
        if !self.profiles.reachable().await {
            return self.fail(AuthError::connection());
        }

        self.enter(AttemptPhase::Authenticating);
        let response = match self
            .auth
            .sign_in_with_password(&credentials.email, &credentials.password)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "authentication error");
                return self.fail(classify_sign_in_error(&err));
            }
        };
        let Some(user) = response.user else {
            return self.fail(AuthError::new(
                AuthErrorKind::Auth,
                "Nu s-au putut încărca datele utilizatorului",
            ));
        };

        self.enter(AttemptPhase::ProfileLoading);
        if let Some(session) = response.session {
            self.session.set_session(session);
        }
        let student = self.session.ensure_profile(&credentials.email).await;
        match &student {
            Some(student) => tracing::info!(student_id = student.id, "student profile loaded"),
            None => tracing::warn!(email = %credentials.email, "student profile not found"),
        }

        self.enter(AttemptPhase::Succeeded);
        AuthOutcome::succeeded(user, student)
    }

    pub async fn register(&self, data: RegisterData) -> AuthOutcome {
        self.enter(AttemptPhase::Validating);
        let new_student = match validation::validate_registration(&data) {
            Ok(student) => student,
            Err(err) => return self.fail(err.into()),
        };

        self.enter(AttemptPhase::Connecting);
        if !self.profiles.reachable().await {
            return self.fail(AuthError::connection());
        }

        // Not atomic with the sign-up below; a concurrent registration that
        // slips past this check is caught by the backend's own duplicate error.
        if self.profiles.email_exists(&data.email).await {
            return self.fail(AuthError::duplicate_email(
                "Există deja un student înregistrat cu acest email. Încercați să vă autentificați sau folosiți un alt email.",
            ));
        }
        tracing::debug!(email = %data.email, "no existing student, creating account");

        self.enter(AttemptPhase::Authenticating);
        let response = match self.auth.sign_up(&data.email, &data.password).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "registration error");
                return self.fail(classify_sign_up_error(&err));
            }
        };
        let Some(user) = response.user else {
            return self.fail(AuthError::new(
                AuthErrorKind::Auth,
                "Nu s-a putut crea contul de autentificare",
            ));
        };

        self.enter(AttemptPhase::ProfileLoading);
        let Some(student) = self.profiles.create(new_student).await else {
            tracing::error!(email = %data.email, "could not create student profile");
            self.enter(AttemptPhase::Succeeded);
            return AuthOutcome {
                success: true,
                user: Some(user),
                student: None,
                error: Some(AuthError::student_creation()),
            };
        };
        if let Some(session) = response.session {
            self.session.set_session(session);
            self.session.set_student(&data.email, Some(student.clone()));
        }

        self.enter(AttemptPhase::Succeeded);
        AuthOutcome::succeeded(user, Some(student))
    }

    /// Never fails from the caller's point of view; the local state is
    /// cleared even when the backend call does not go through.
    pub async fn logout(&self) {
        if let Err(err) = self.auth.sign_out().await {
            tracing::error!(error = %err, "logout error");
        }
        self.session.clear();
        self.enter(AttemptPhase::Idle);
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        validation::validate_email(email)?;
        self.auth
            .reset_password_for_email(email)
            .await
            .map_err(|err| {
                if err.is_connection() {
                    AuthError::connection()
                } else {
                    AuthError::new(AuthErrorKind::Auth, err.message())
                }
            })?;
        tracing::info!(email, "password reset requested");
        Ok(())
    }
}
