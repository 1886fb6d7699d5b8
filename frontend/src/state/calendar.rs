use std::{collections::BTreeMap, sync::Arc};

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::watch;

use super::courses::COURSES_TABLE;
use crate::{
    api::{ApiError, Query, TableApi},
    models::Course,
    utils::time::iso_date,
};

pub const SELECTED_DAY_COLOR: &str = "#2196f3";
const SELECTED_DOT_COLOR: &str = "white";
const DEFAULT_DOT_COLOR: &str = "blue";
const NAME_PALETTE: [&str; 8] = [
    "#FF5733", "#33FF57", "#3357FF", "#FF33A1", "#A133FF", "#33FFF5", "#FF8C00", "#8A2BE2",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dot {
    pub key: String,
    pub color: String,
    pub selected_dot_color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayMarking {
    pub dots: Vec<Dot>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_color: Option<String>,
}

/// Day (`YYYY-MM-DD`) to its markers, in date order.
pub type MarkedDates = BTreeMap<String, DayMarking>;

/// How a course's calendar dot gets its color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkerPalette {
    /// Fixed color per course type.
    #[default]
    ByType,
    /// Color picked from a fixed palette by hashing the course name.
    ByName,
}

impl MarkerPalette {
    fn dot(self, course: &Course, date: &str, index: usize) -> Dot {
        let (key, color) = match self {
            MarkerPalette::ByType => (
                format!("dot-{}-{}", date, index),
                type_color(course.course_type.as_deref()).to_string(),
            ),
            MarkerPalette::ByName => {
                let name = course.name.clone().unwrap_or_default();
                let color = name_color(&name).to_string();
                (name, color)
            }
        };
        Dot {
            key,
            color,
            selected_dot_color: SELECTED_DOT_COLOR.to_string(),
        }
    }
}

pub fn type_color(course_type: Option<&str>) -> &'static str {
    match course_type {
        Some("Curs") => "#B497BD",
        Some("Laborator") => "#FFD6BA",
        _ => DEFAULT_DOT_COLOR,
    }
}

/// ECMAScript ToInt32.
fn to_int32(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    const TWO_32: f64 = 4_294_967_296.0;
    let wrapped = value.trunc().rem_euclid(TWO_32);
    if wrapped >= TWO_32 / 2.0 {
        (wrapped - TWO_32) as i32
    } else {
        wrapped as i32
    }
}

/// `hash = code + ((hash << 5) - hash)` over UTF-16 code units, where the
/// shift wraps to 32 bits but the rest of the arithmetic does not.
fn name_hash(name: &str) -> f64 {
    name.encode_utf16().fold(0.0_f64, |hash, unit| {
        let shifted = to_int32(hash).wrapping_shl(5);
        f64::from(unit) + (f64::from(shifted) - hash)
    })
}

pub fn name_color(name: &str) -> &'static str {
    let index = name_hash(name).abs() % NAME_PALETTE.len() as f64;
    NAME_PALETTE[index as usize]
}

/// One pass over the courses; rows without a date are skipped but still
/// count toward the dot index.
pub fn build_marked_dates(courses: &[Course], palette: MarkerPalette) -> MarkedDates {
    let mut marked = MarkedDates::new();
    for (index, course) in courses.iter().enumerate() {
        let Some(date) = course.date.as_deref().filter(|d| !d.is_empty()) else {
            continue;
        };
        marked
            .entry(date.to_string())
            .or_default()
            .dots
            .push(palette.dot(course, date, index));
    }
    marked
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarState {
    pub marked_dates: MarkedDates,
    pub courses: Vec<Course>,
    pub selected_date: Option<String>,
    pub selected_courses: Vec<Course>,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
    pub today: NaiveDate,
}

/// Resets `loading` if a load is dropped before it finishes.
struct LoadGuard<'a>(&'a watch::Sender<CalendarState>);

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| std::mem::take(&mut state.loading));
    }
}

pub struct CalendarStore {
    tables: Arc<dyn TableApi>,
    palette: MarkerPalette,
    state: watch::Sender<CalendarState>,
}

impl CalendarStore {
    pub fn new(tables: Arc<dyn TableApi>, palette: MarkerPalette, today: NaiveDate) -> Self {
        let (state, _) = watch::channel(CalendarState {
            marked_dates: MarkedDates::new(),
            courses: Vec::new(),
            selected_date: None,
            selected_courses: Vec::new(),
            loading: false,
            loaded: false,
            error: None,
            today,
        });
        Self {
            tables,
            palette,
            state,
        }
    }

    pub fn snapshot(&self) -> CalendarState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<CalendarState> {
        self.state.subscribe()
    }

    /// Fetches every course once and rebuilds the markers. Returns
    /// `Ok(false)` if another load is already running.
    pub async fn load(&self) -> Result<bool, ApiError> {
        let claimed = self.state.send_if_modified(|state| {
            if state.loading {
                return false;
            }
            state.loading = true;
            state.error = None;
            true
        });
        if !claimed {
            return Ok(false);
        }
        let _guard = LoadGuard(&self.state);

        let query = Query::new().select("*").order("Data", true);
        let result = self.tables.select(COURSES_TABLE, query).await;
        let rows = match result {
            Ok(response) => response.rows,
            Err(err) => {
                tracing::error!(error = %err, "failed to load calendar courses");
                let message = err.message();
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(message);
                });
                return Err(err);
            }
        };

        let courses: Vec<Course> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<Course>(row) {
                Ok(course) => Some(course),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping course row that did not decode");
                    None
                }
            })
            .collect();
        let marked_dates = build_marked_dates(&courses, self.palette);
        tracing::debug!(courses = courses.len(), days = marked_dates.len(), "calendar loaded");

        self.state.send_modify(|state| {
            state.selected_courses = match &state.selected_date {
                Some(date) => filter_by_date(&courses, date),
                None => Vec::new(),
            };
            state.courses = courses;
            state.marked_dates = marked_dates;
            state.loading = false;
            state.loaded = true;
        });
        Ok(true)
    }

    /// Answered from the cached list; no request is made.
    pub fn courses_for(&self, date: &str) -> Vec<Course> {
        filter_by_date(&self.state.borrow().courses, date)
    }

    pub fn select_day(&self, date: &str) -> Vec<Course> {
        let mut selected = Vec::new();
        self.state.send_modify(|state| {
            selected = filter_by_date(&state.courses, date);
            state.selected_date = Some(date.to_string());
            state.selected_courses = selected.clone();
        });
        selected
    }

    pub fn select_today(&self) -> Vec<Course> {
        let today = iso_date(self.state.borrow().today);
        self.select_day(&today)
    }

    /// Marked dates with the selected day highlighted, added if it has no
    /// courses.
    pub fn marked_for_display(&self) -> MarkedDates {
        let state = self.state.borrow();
        let mut marked = state.marked_dates.clone();
        if let Some(date) = &state.selected_date {
            let day = marked.entry(date.clone()).or_default();
            day.selected = true;
            day.selected_color = Some(SELECTED_DAY_COLOR.to_string());
        }
        marked
    }
}

fn filter_by_date(courses: &[Course], date: &str) -> Vec<Course> {
    courses
        .iter()
        .filter(|course| course.occurs_on(date))
        .cloned()
        .collect()
}
