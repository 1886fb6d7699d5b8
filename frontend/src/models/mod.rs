pub mod course;
mod lenient;
pub mod student;

pub use course::Course;
pub use student::{NewStudent, Student, PLACEHOLDER_ID};
