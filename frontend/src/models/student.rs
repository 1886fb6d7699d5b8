use serde::{Deserialize, Serialize};

use super::lenient;

/// Id given to a profile whose inserted row could not be read back.
pub const PLACEHOLDER_ID: i64 = -1;

/// Student profile row.
///
/// The table has existed both as `Student` with capitalized columns and as
/// `students` with lower-case ones; both spellings deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    #[serde(deserialize_with = "lenient::int")]
    pub id: i64,
    #[serde(rename = "Nume", alias = "nume", default, deserialize_with = "lenient::text")]
    pub last_name: String,
    #[serde(rename = "Prenume", alias = "prenume", default, deserialize_with = "lenient::text")]
    pub first_name: String,
    #[serde(rename = "Grupa", alias = "grupa", default, deserialize_with = "lenient::text")]
    pub group: String,
    #[serde(rename = "An", alias = "an", deserialize_with = "lenient::int")]
    pub year: i64,
    #[serde(
        rename = "Specializare",
        alias = "specializare",
        default,
        deserialize_with = "lenient::text"
    )]
    pub specialization: String,
    #[serde(rename = "Email", alias = "email")]
    pub email: String,
}

impl Student {
    pub fn placeholder(data: NewStudent) -> Self {
        Self {
            id: PLACEHOLDER_ID,
            last_name: data.last_name,
            first_name: data.first_name,
            group: data.group,
            year: data.year,
            specialization: data.specialization,
            email: data.email,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == PLACEHOLDER_ID
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Fields written when a profile is created; the id is assigned by the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    #[serde(rename = "Nume")]
    pub last_name: String,
    #[serde(rename = "Prenume")]
    pub first_name: String,
    #[serde(rename = "Grupa")]
    pub group: String,
    #[serde(rename = "An")]
    pub year: i64,
    #[serde(rename = "Specializare")]
    pub specialization: String,
    #[serde(rename = "Email")]
    pub email: String,
}
