use std::sync::Arc;

use tokio::{
    sync::{broadcast::error::RecvError, watch, Mutex},
    task::JoinHandle,
};

use crate::{
    api::{AuthApi, AuthChangeEvent, AuthEvent, Session, User},
    models::Student,
    services::ProfileLoader,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub session: Option<Session>,
    pub student: Option<Student>,
    pub loading: bool,
    /// Email whose profile has already been resolved for this sign-in.
    pub profile_loaded_for: Option<String>,
    /// Bumped whenever the profile is replaced or dropped, so a lookup that
    /// started earlier cannot write over it.
    epoch: u64,
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|session| &session.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    fn session_email(&self) -> Option<&str> {
        self.session.as_ref().and_then(Session::email)
    }

    fn drop_profile(&mut self) {
        self.student = None;
        self.profile_loaded_for = None;
        self.epoch += 1;
    }
}

/// Owns the current session and the student profile derived from it.
pub struct SessionStore {
    auth: Arc<dyn AuthApi>,
    profiles: Arc<ProfileLoader>,
    state: watch::Sender<AuthState>,
    profile_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(auth: Arc<dyn AuthApi>, profiles: Arc<ProfileLoader>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            auth,
            profiles,
            state,
            profile_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Reads the stored session once. Errors leave the store signed out.
    pub async fn init(&self) {
        self.state.send_modify(|state| state.loading = true);

        match self.auth.get_session().await {
            Ok(Some(session)) => {
                if let Some(email) = self.set_session(session) {
                    self.ensure_profile(&email).await;
                }
            }
            Ok(None) => {
                tracing::debug!("no stored session");
                self.sign_out_locally();
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to restore session");
                self.sign_out_locally();
            }
        }

        self.state.send_modify(|state| state.loading = false);
    }

    pub async fn handle_event(&self, event: AuthEvent) {
        tracing::debug!(event = ?event.event, "auth state change");
        if event.event == AuthChangeEvent::SignedOut {
            self.clear();
            return;
        }
        let Some(session) = event.session else {
            self.clear();
            return;
        };
        if let Some(email) = self.set_session(session) {
            self.ensure_profile(&email).await;
        }
    }

    /// Replaces the session. A profile that belongs to another email (or to
    /// a session without one) is dropped. Returns the session's email.
    pub fn set_session(&self, session: Session) -> Option<String> {
        let email = session.email().map(str::to_string);
        self.state.send_modify(|state| {
            if state.profile_loaded_for.is_some() && state.profile_loaded_for != email {
                state.drop_profile();
            }
            state.session = Some(session);
        });
        email
    }

    /// Loads the profile for `email` unless it was already loaded for the
    /// current sign-in. Concurrent callers wait for the first load.
    ///
    /// The result is kept only if the session still belongs to `email` and
    /// nothing replaced or cleared the profile while the lookup ran.
    pub async fn ensure_profile(&self, email: &str) -> Option<Student> {
        let _guard = self.profile_lock.lock().await;
        let epoch = {
            let state = self.state.borrow();
            if state.profile_loaded_for.as_deref() == Some(email) {
                return state.student.clone();
            }
            state.epoch
        };

        let student = self.profiles.load(email).await;
        let stored = self.state.send_if_modified(|state| {
            if state.epoch != epoch || state.session_email() != Some(email) {
                return false;
            }
            state.student = student.clone();
            state.profile_loaded_for = Some(email.to_string());
            true
        });
        if !stored {
            tracing::debug!(email, "session changed during profile lookup, result dropped");
        }
        student
    }

    /// Installs a profile resolved elsewhere, for the signed-in `email` only.
    /// Any lookup still running is superseded.
    pub fn set_student(&self, email: &str, student: Option<Student>) {
        self.state.send_if_modified(|state| {
            if state.session_email() != Some(email) {
                tracing::warn!(email, "profile does not match the current session, ignored");
                return false;
            }
            state.student = student;
            state.profile_loaded_for = Some(email.to_string());
            state.epoch += 1;
            true
        });
    }

    pub fn clear(&self) {
        self.state.send_modify(|state| {
            state.session = None;
            state.loading = false;
            state.drop_profile();
        });
    }

    fn sign_out_locally(&self) {
        self.state.send_modify(|state| {
            state.session = None;
            state.drop_profile();
        });
    }

    /// Follows backend session notifications until the returned handle is
    /// dropped.
    pub fn subscribe(self: &Arc<Self>) -> SessionSubscription {
        let mut events = self.auth.subscribe();
        let store = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => store.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "missed auth notifications, re-reading session");
                        store.init().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("auth notification stream closed");
        });
        SessionSubscription { handle }
    }
}

pub struct SessionSubscription {
    handle: JoinHandle<()>,
}

impl SessionSubscription {
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn unsubscribe(self) {
        self.handle.abort();
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
