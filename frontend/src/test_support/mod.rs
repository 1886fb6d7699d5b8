//! In-memory stand-in for the hosted backend, used by store and workflow tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, Semaphore};
use uuid::Uuid;

use crate::api::{
    ApiError, AuthApi, AuthChangeEvent, AuthEvent, AuthResponse, Query, SelectResponse, Session,
    TableApi, User,
};

pub fn missing_relation(table: &str) -> ApiError {
    ApiError::service(
        404,
        Some("42P01"),
        format!("relation \"public.{}\" does not exist", table),
    )
}

pub fn session_for(email: &str) -> Session {
    Session {
        access_token: format!("token-{}", email),
        token_type: "bearer".into(),
        expires_in: Some(3600),
        expires_at: None,
        refresh_token: Some("refresh".into()),
        user: User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            created_at: None,
            email_confirmed_at: None,
        },
    }
}

pub struct FakeBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    missing: Mutex<HashSet<String>>,
    failures: Mutex<HashMap<String, ApiError>>,
    accounts: Mutex<HashMap<String, String>>,
    sign_up_error: Mutex<Option<ApiError>>,
    session_error: Mutex<Option<ApiError>>,
    session: Mutex<Option<Session>>,
    offline: AtomicBool,
    gate: Mutex<Option<Arc<Semaphore>>>,
    events: broadcast::Sender<AuthEvent>,
    select_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    sign_up_calls: AtomicUsize,
    sign_in_calls: AtomicUsize,
    reset_requests: Mutex<Vec<String>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            tables: Mutex::new(HashMap::new()),
            missing: Mutex::new(HashSet::new()),
            failures: Mutex::new(HashMap::new()),
            accounts: Mutex::new(HashMap::new()),
            sign_up_error: Mutex::new(None),
            session_error: Mutex::new(None),
            session: Mutex::new(None),
            offline: AtomicBool::new(false),
            gate: Mutex::new(None),
            events,
            select_calls: AtomicUsize::new(0),
            insert_calls: AtomicUsize::new(0),
            sign_up_calls: AtomicUsize::new(0),
            sign_in_calls: AtomicUsize::new(0),
            reset_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn drop_table(&self, table: &str) {
        self.missing.lock().unwrap().insert(table.to_string());
    }

    pub fn fail_table(&self, table: &str, error: ApiError) {
        self.failures
            .lock()
            .unwrap()
            .insert(table.to_string(), error);
    }

    pub fn add_account(&self, email: &str, password: &str) {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), password.to_string());
    }

    pub fn fail_sign_up(&self, error: ApiError) {
        *self.sign_up_error.lock().unwrap() = Some(error);
    }

    pub fn fail_get_session(&self, error: ApiError) {
        *self.session_error.lock().unwrap() = Some(error);
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = session;
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Holds every select until a permit is added to the returned semaphore.
    pub fn hold_selects(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        let _ = self.events.send(AuthEvent::new(event, session));
    }

    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn sign_up_calls(&self) -> usize {
        self.sign_up_calls.load(Ordering::SeqCst)
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.select_calls() + self.insert_calls() + self.sign_up_calls() + self.sign_in_calls()
    }

    pub fn reset_requests(&self) -> Vec<String> {
        self.reset_requests.lock().unwrap().clone()
    }

    fn check_online(&self) -> Result<(), ApiError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ApiError::Network("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

fn cell_matches(cell: Option<&Value>, expected: &str) -> bool {
    match cell {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}

#[async_trait]
impl TableApi for FakeBackend {
    async fn select(&self, table: &str, query: Query) -> Result<SelectResponse, ApiError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| ApiError::Network("gate closed".into()))?;
        }
        self.check_online()?;
        if let Some(err) = self.failures.lock().unwrap().get(table).cloned() {
            return Err(err);
        }
        if self.missing.lock().unwrap().contains(table) {
            return Err(missing_relation(table));
        }

        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| {
                query
                    .filters()
                    .iter()
                    .all(|f| cell_matches(row.get(&f.column), &f.value))
            })
            .collect();
        let total = rows.len() as u64;
        if let Some((from, to)) = query.row_range() {
            rows = rows
                .into_iter()
                .skip(from as usize)
                .take((to - from + 1) as usize)
                .collect();
        }
        if let Some(limit) = query.row_limit() {
            rows.truncate(limit as usize);
        }

        Ok(SelectResponse {
            rows,
            total: query.wants_count().then_some(total),
        })
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), ApiError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if let Some(err) = self.failures.lock().unwrap().get(table).cloned() {
            return Err(err);
        }
        if self.missing.lock().unwrap().contains(table) {
            return Err(missing_relation(table));
        }
        self.seed(table, vec![row]);
        Ok(())
    }
}

#[async_trait]
impl AuthApi for FakeBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if let Some(err) = self.sign_up_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(ApiError::service(
                422,
                Some("user_already_exists"),
                "User already registered",
            ));
        }
        accounts.insert(email.to_string(), password.to_string());
        Ok(AuthResponse {
            user: Some(session_for(email).user),
            session: None,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let known = self.accounts.lock().unwrap().get(email).cloned();
        if known.as_deref() != Some(password) {
            return Err(ApiError::service(
                400,
                Some("invalid_credentials"),
                "Invalid login credentials",
            ));
        }
        let session = session_for(email);
        self.set_session(Some(session.clone()));
        self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(AuthResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        self.set_session(None);
        self.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, ApiError> {
        if let Some(err) = self.session_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.session.lock().unwrap().clone())
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), ApiError> {
        self.check_online()?;
        self.reset_requests.lock().unwrap().push(email.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
