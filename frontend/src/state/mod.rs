pub mod auth;
pub mod calendar;
pub mod courses;

pub use auth::{AuthState, SessionStore, SessionSubscription};
pub use calendar::{CalendarState, CalendarStore, DayMarking, Dot, MarkedDates, MarkerPalette};
pub use courses::{CourseListStore, CoursesState, COURSES_TABLE};
