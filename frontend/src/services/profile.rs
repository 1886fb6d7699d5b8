//! Student profile lookup and creation.
//!
//! The profile table has been renamed between schema revisions, so every
//! operation walks an ordered list of [`LookupStrategy`] values and stops at
//! the first one that answers.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    api::{ApiError, Query, TableApi},
    models::{NewStudent, Student},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupStrategy {
    pub table: String,
    pub email_column: String,
}

impl LookupStrategy {
    pub fn new(table: impl Into<String>, email_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            email_column: email_column.into(),
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::new("Student", "Email"), Self::new("students", "email")]
    }

    fn lowercase_columns(&self) -> bool {
        !self.email_column.chars().any(char::is_uppercase)
    }

    /// Row to insert, with column names spelled the way this table expects.
    fn row_for(&self, student: &NewStudent) -> Result<Value, ApiError> {
        let row = serde_json::to_value(student).map_err(|e| ApiError::Decode(e.to_string()))?;
        if !self.lowercase_columns() {
            return Ok(row);
        }
        let lowered: Map<String, Value> = match row {
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| (key.to_lowercase(), value))
                .collect(),
            _ => Map::new(),
        };
        Ok(Value::Object(lowered))
    }
}

enum Lookup<T> {
    Found(T),
    Next,
    Stop,
}

pub struct ProfileLoader {
    tables: Arc<dyn TableApi>,
    strategies: Vec<LookupStrategy>,
}

impl ProfileLoader {
    pub fn new(tables: Arc<dyn TableApi>) -> Self {
        Self::with_strategies(tables, LookupStrategy::defaults())
    }

    pub fn with_strategies(tables: Arc<dyn TableApi>, strategies: Vec<LookupStrategy>) -> Self {
        let strategies = if strategies.is_empty() {
            LookupStrategy::defaults()
        } else {
            strategies
        };
        Self { tables, strategies }
    }

    pub fn strategies(&self) -> &[LookupStrategy] {
        &self.strategies
    }

    /// Cheap reachability check against the primary table. Only a transport failure
    /// counts as unreachable; a service error still proves the backend is up.
    pub async fn reachable(&self) -> bool {
        let strategy = &self.strategies[0];
        let query = Query::new().select(strategy.email_column.as_str()).limit(1);
        match self.tables.select(&strategy.table, query).await {
            Err(err) if err.is_connection() => {
                tracing::error!(error = %err, "backend unreachable");
                false
            }
            _ => true,
        }
    }

    async fn first_row(&self, strategy: &LookupStrategy, email: &str, columns: &str) -> Lookup<Value> {
        let query = Query::new()
            .select(columns)
            .eq(strategy.email_column.as_str(), email)
            .limit(1);
        match self.tables.select(&strategy.table, query).await {
            Ok(response) => match response.rows.into_iter().next() {
                Some(row) => Lookup::Found(row),
                None => {
                    tracing::debug!(table = %strategy.table, "no student row for email");
                    Lookup::Next
                }
            },
            Err(err) if err.is_missing_relation() => {
                tracing::debug!(
                    table = %strategy.table,
                    error = %err,
                    "student table not available, trying next lookup"
                );
                Lookup::Next
            }
            Err(err) => {
                tracing::warn!(
                    table = %strategy.table,
                    code = ?err.code(),
                    error = %err,
                    "could not fetch student profile"
                );
                Lookup::Stop
            }
        }
    }

    pub async fn load(&self, email: &str) -> Option<Student> {
        for strategy in &self.strategies {
            match self.first_row(strategy, email, "*").await {
                Lookup::Found(row) => {
                    return match serde_json::from_value::<Student>(row) {
                        Ok(student) => {
                            tracing::info!(
                                table = %strategy.table,
                                email_column = %strategy.email_column,
                                "student profile resolved"
                            );
                            Some(student)
                        }
                        Err(err) => {
                            tracing::warn!(table = %strategy.table, error = %err, "student row did not decode");
                            None
                        }
                    };
                }
                Lookup::Next => continue,
                Lookup::Stop => return None,
            }
        }
        None
    }

    /// Best effort: when no lookup can answer, the email is reported as free.
    pub async fn email_exists(&self, email: &str) -> bool {
        for strategy in &self.strategies {
            match self
                .first_row(strategy, email, strategy.email_column.as_str())
                .await
            {
                Lookup::Found(_) => return true,
                Lookup::Next => continue,
                Lookup::Stop => return false,
            }
        }
        false
    }

    /// Inserts the profile and returns it with a placeholder id, since the
    /// inserted row is not readable back under row-level security.
    pub async fn create(&self, student: NewStudent) -> Option<Student> {
        if self.email_exists(&student.email).await {
            tracing::warn!(email = %student.email, "student with email already exists");
            return None;
        }

        for strategy in &self.strategies {
            let row = match strategy.row_for(&student) {
                Ok(row) => row,
                Err(err) => {
                    tracing::error!(error = %err, "could not serialize student");
                    return None;
                }
            };
            match self.tables.insert(&strategy.table, row).await {
                Ok(()) => {
                    tracing::info!(table = %strategy.table, email = %student.email, "student profile created");
                    return Some(Student::placeholder(student));
                }
                Err(err) if err.is_missing_relation() => continue,
                Err(err) if err.is_unique_violation() => {
                    tracing::warn!(email = %student.email, "duplicate student email rejected on insert");
                    return None;
                }
                Err(err) => {
                    tracing::error!(
                        table = %strategy.table,
                        code = ?err.code(),
                        error = %err,
                        "student insert failed"
                    );
                    return None;
                }
            }
        }
        None
    }
}
