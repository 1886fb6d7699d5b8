use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient;

/// A row of the `Cursuri` table. Every column may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub id: Option<i64>,
    #[serde(rename = "Nume", default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(rename = "Nr_credite", default, deserialize_with = "lenient::opt_int")]
    pub credits: Option<i64>,
    #[serde(rename = "Profesor", default, deserialize_with = "lenient::opt_string")]
    pub professor: Option<String>,
    #[serde(rename = "Sala", default, deserialize_with = "lenient::opt_string")]
    pub room: Option<String>,
    #[serde(rename = "Tip_evaluare", default, deserialize_with = "lenient::opt_string")]
    pub evaluation_type: Option<String>,
    #[serde(rename = "Ora", default, deserialize_with = "lenient::opt_string")]
    pub time: Option<String>,
    #[serde(rename = "Data", default, deserialize_with = "lenient::opt_string")]
    pub date: Option<String>,
    #[serde(rename = "Tip_curs", default, deserialize_with = "lenient::opt_string")]
    pub course_type: Option<String>,
    #[serde(rename = "Semestru", default, deserialize_with = "lenient::opt_int")]
    pub semester: Option<i64>,
    #[serde(rename = "An", default, deserialize_with = "lenient::opt_int")]
    pub year: Option<i64>,
    /// Columns this client does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Course {
    pub fn occurs_on(&self, date: &str) -> bool {
        self.date.as_deref() == Some(date)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("N/A")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_full_row() {
        let course: Course = serde_json::from_value(json!({
            "id": 1,
            "Nume": "Baze de date",
            "Nr_credite": 5,
            "Profesor": "Ionescu",
            "Sala": "EC105",
            "Tip_evaluare": "Examen",
            "Ora": "10:00",
            "Data": "2024-05-01",
            "Tip_curs": "Curs",
            "Semestru": 2,
            "An": 3
        }))
        .unwrap();
        assert_eq!(course.id, Some(1));
        assert_eq!(course.credits, Some(5));
        assert_eq!(course.year, Some(3));
        assert!(course.occurs_on("2024-05-01"));
        assert!(course.extra.is_empty());
    }

    #[test]
    fn tolerates_missing_and_mistyped_columns() {
        let course: Course = serde_json::from_value(json!({
            "Nume": "Retele",
            "Sala": 204,
            "An": "2",
            "Nr_credite": null,
            "Observatii": "online"
        }))
        .unwrap();
        assert_eq!(course.id, None);
        assert_eq!(course.room.as_deref(), Some("204"));
        assert_eq!(course.year, Some(2));
        assert_eq!(course.credits, None);
        assert_eq!(course.date, None);
        assert_eq!(course.extra.get("Observatii"), Some(&json!("online")));
    }

    #[test]
    fn display_name_defaults() {
        assert_eq!(Course::default().display_name(), "N/A");
    }
}
