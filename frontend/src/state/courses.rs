use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    api::{ApiError, Query, TableApi},
    models::Course,
};

pub const COURSES_TABLE: &str = "Cursuri";

#[derive(Debug, Clone, PartialEq)]
pub struct CoursesState {
    pub courses: Vec<Course>,
    pub page: u64,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<String>,
    /// Enrollment year the list is restricted to; `None` lists every course.
    pub year: Option<i64>,
    generation: u64,
}

impl CoursesState {
    fn fresh(year: Option<i64>, generation: u64) -> Self {
        Self {
            courses: Vec::new(),
            page: 0,
            has_more: true,
            loading: false,
            error: None,
            year,
            generation,
        }
    }
}

/// Clears the loading flag if the fetch that set it goes away without
/// finishing, including when the `load_more` future is dropped.
struct InFlight<'a> {
    state: &'a watch::Sender<CoursesState>,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let generation = self.generation;
        self.state.send_if_modified(|state| {
            if state.generation == generation && state.loading {
                state.loading = false;
                true
            } else {
                false
            }
        });
    }
}

/// Course list loaded page by page, restricted to one enrollment year.
pub struct CourseListStore {
    tables: Arc<dyn TableApi>,
    page_size: u64,
    state: watch::Sender<CoursesState>,
}

impl CourseListStore {
    pub fn new(tables: Arc<dyn TableApi>, page_size: u64, year: Option<i64>) -> Self {
        let (state, _) = watch::channel(CoursesState::fresh(year, 0));
        Self {
            tables,
            page_size: page_size.max(1),
            state,
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn snapshot(&self) -> CoursesState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<CoursesState> {
        self.state.subscribe()
    }

    /// Fetches the next page. Returns `Ok(false)` without touching the
    /// network when a fetch is already running or the list is exhausted.
    pub async fn load_more(&self) -> Result<bool, ApiError> {
        let mut claimed = None;
        self.state.send_if_modified(|state| {
            if state.loading || !state.has_more {
                return false;
            }
            state.loading = true;
            state.error = None;
            claimed = Some((state.page, state.year, state.generation));
            true
        });
        let Some((page, year, generation)) = claimed else {
            return Ok(false);
        };
        let _in_flight = InFlight {
            state: &self.state,
            generation,
        };

        let from = page * self.page_size;
        let to = from + self.page_size - 1;
        let mut query = Query::new()
            .select("*")
            .order("id", true)
            .range(from, to)
            .count_exact();
        if let Some(year) = year {
            query = query.eq("An", year);
        }

        let response = match self.tables.select(COURSES_TABLE, query).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(page, error = %err, "failed to load courses");
                let message = err.message();
                self.state.send_if_modified(|state| {
                    if state.generation != generation {
                        return false;
                    }
                    state.error = Some(message);
                    state.loading = false;
                    true
                });
                return Err(err);
            }
        };

        let fetched = response.rows.len() as u64;
        let total = response.total;
        let courses: Vec<Course> = response
            .rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<Course>(row) {
                Ok(course) => Some(course),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping course row that did not decode");
                    None
                }
            })
            .filter(|course| year.is_none() || course.year == year)
            .collect();
        let has_more = match total {
            Some(total) => (page + 1) * self.page_size < total,
            None => fetched == self.page_size,
        };
        tracing::debug!(page, fetched, kept = courses.len(), ?total, has_more, "courses page loaded");

        self.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            state.courses.extend(courses);
            state.page = page + 1;
            state.has_more = has_more;
            state.loading = false;
            true
        });
        Ok(true)
    }

    /// Drops every loaded page and loads the first one again. A fetch still
    /// running for the old list is discarded when it lands.
    pub async fn refresh(&self) -> Result<bool, ApiError> {
        self.reset(None);
        self.load_more().await
    }

    pub async fn set_year(&self, year: Option<i64>) -> Result<bool, ApiError> {
        self.reset(Some(year));
        self.load_more().await
    }

    fn reset(&self, year: Option<Option<i64>>) {
        self.state.send_modify(|state| {
            let year = year.unwrap_or(state.year);
            *state = CoursesState::fresh(year, state.generation + 1);
        });
    }
}
