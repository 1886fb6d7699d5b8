//! Row queries for the hosted table service.
//!
//! A [`Query`] renders to the service's URL conventions: `select=` for the
//! column list, `<column>=eq.<value>` filters, `order=<column>.asc`, and
//! `offset`/`limit` for row ranges. Exact counts are requested through the
//! `Prefer` header and come back in `Content-Range`.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    columns: Option<String>,
    filters: Vec<Filter>,
    order: Option<(String, bool)>,
    range: Option<(u64, u64)>,
    limit: Option<u64>,
    count_exact: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.to_string(),
        });
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some((column.into(), ascending));
        self
    }

    /// Inclusive row range, zero based.
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.range = Some((from, to.max(from)));
        self
    }

    pub fn limit(mut self, rows: u64) -> Self {
        self.limit = Some(rows);
        self
    }

    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    pub fn columns(&self) -> &str {
        self.columns.as_deref().unwrap_or("*")
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn row_range(&self) -> Option<(u64, u64)> {
        self.range
    }

    pub fn row_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn wants_count(&self) -> bool {
        self.count_exact
    }

    pub fn prefer_header(&self) -> Option<&'static str> {
        self.count_exact.then_some("count=exact")
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.columns().to_string())];
        for filter in &self.filters {
            params.push((filter.column.clone(), format!("eq.{}", filter.value)));
        }
        if let Some((column, ascending)) = &self.order {
            let direction = if *ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", column, direction)));
        }
        match (self.range, self.limit) {
            (Some((from, to)), _) => {
                params.push(("offset".to_string(), from.to_string()));
                params.push(("limit".to_string(), (to - from + 1).to_string()));
            }
            (None, Some(limit)) => params.push(("limit".to_string(), limit.to_string())),
            (None, None) => {}
        }
        params
    }
}

/// Rows returned by a select plus the exact total when it was requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectResponse {
    pub rows: Vec<Value>,
    pub total: Option<u64>,
}

impl SelectResponse {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>, ApiError> {
        self.rows
            .iter()
            .map(|row| {
                serde_json::from_value(row.clone()).map_err(|e| ApiError::Decode(e.to_string()))
            })
            .collect()
    }
}

/// Parses the total out of a `Content-Range` header such as `0-4/12` or `*/0`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn renders_filters_order_and_range() {
        let params = Query::new()
            .select("*")
            .eq("An", 2)
            .order("id", true)
            .range(10, 14)
            .count_exact()
            .to_params();

        assert_eq!(param(&params, "select"), Some("*"));
        assert_eq!(param(&params, "An"), Some("eq.2"));
        assert_eq!(param(&params, "order"), Some("id.asc"));
        assert_eq!(param(&params, "offset"), Some("10"));
        assert_eq!(param(&params, "limit"), Some("5"));
    }

    #[test]
    fn limit_without_range() {
        let query = Query::new().select("Email").eq("Email", "a@b.com").limit(1);
        let params = query.to_params();
        assert_eq!(param(&params, "Email"), Some("eq.a@b.com"));
        assert_eq!(param(&params, "limit"), Some("1"));
        assert_eq!(param(&params, "offset"), None);
        assert_eq!(query.prefer_header(), None);
    }

    #[test]
    fn default_select_is_everything() {
        let query = Query::new().order("Data", false);
        assert_eq!(query.columns(), "*");
        assert_eq!(param(&query.to_params(), "order"), Some("Data.desc"));
    }

    #[test]
    fn content_range_total() {
        assert_eq!(parse_content_range("0-4/12"), Some(12));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-4/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }
}
