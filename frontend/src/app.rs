//! Wires the backend client, the stores and the auth workflow together.

use std::sync::Arc;

use crate::{
    api::{ApiClient, ApiError, AuthApi, TableApi},
    auth::AuthWorkflow,
    config::Config,
    services::ProfileLoader,
    state::{CalendarStore, CourseListStore, MarkerPalette, SessionStore, SessionSubscription},
    utils::time,
};

pub struct App {
    config: Config,
    tables: Arc<dyn TableApi>,
    session: Arc<SessionStore>,
    auth: AuthWorkflow,
}

impl App {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let client = Arc::new(ApiClient::new(&config)?);
        Ok(Self::with_backend(config, client.clone(), client))
    }

    pub fn with_backend(config: Config, auth: Arc<dyn AuthApi>, tables: Arc<dyn TableApi>) -> Self {
        let profiles = Arc::new(ProfileLoader::with_strategies(
            tables.clone(),
            config.student_tables.clone(),
        ));
        let session = Arc::new(SessionStore::new(auth.clone(), profiles.clone()));
        let workflow = AuthWorkflow::new(auth, profiles, session.clone());
        Self {
            config,
            tables,
            session,
            auth: workflow,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn auth(&self) -> &AuthWorkflow {
        &self.auth
    }

    /// Subscribes to session changes, then restores the stored session.
    /// Dropping the returned handle stops following changes.
    pub async fn start(&self) -> SessionSubscription {
        let subscription = self.session.subscribe();
        self.session.init().await;
        subscription
    }

    /// Course list for the signed-in student's year, or every course when
    /// no profile is loaded.
    pub fn course_list(&self) -> CourseListStore {
        let year = self.session.snapshot().student.map(|student| student.year);
        CourseListStore::new(self.tables.clone(), self.config.courses_page_size, year)
    }

    pub fn calendar(&self, palette: MarkerPalette) -> CalendarStore {
        CalendarStore::new(self.tables.clone(), palette, time::today())
    }
}
