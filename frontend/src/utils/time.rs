use chrono::{DateTime, NaiveDate, Utc};

/// Calendar dates are compared as `YYYY-MM-DD` strings in UTC, the format
/// the course table stores.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn today() -> NaiveDate {
    today_at(Utc::now())
}

pub fn today_at(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn today_is_taken_in_utc() {
        let late = Utc.with_ymd_and_hms(2024, 5, 1, 23, 30, 0).unwrap();
        assert_eq!(iso_date(today_at(late)), "2024-05-01");
    }
}
