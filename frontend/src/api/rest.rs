use async_trait::async_trait;
use reqwest::{header::CONTENT_RANGE, Method};
use serde_json::Value;

use super::{
    backend::TableApi,
    client::ApiClient,
    query::{parse_content_range, Query, SelectResponse},
    types::ApiError,
};

#[async_trait]
impl TableApi for ApiClient {
    async fn select(&self, table: &str, query: Query) -> Result<SelectResponse, ApiError> {
        tracing::debug!(table, params = ?query.to_params(), "rest select");
        let mut request = self
            .rest_request(Method::GET, table)
            .await
            .query(&query.to_params());
        if let Some(prefer) = query.prefer_header() {
            request = request.header("Prefer", prefer);
        }

        let response = Self::execute(request).await?;
        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range);
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        Ok(SelectResponse { rows, total })
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), ApiError> {
        tracing::debug!(table, "rest insert");
        let request = self
            .rest_request(Method::POST, table)
            .await
            .header("Prefer", "return=minimal")
            .json(&row);
        Self::execute(request).await.map(|_| ())
    }
}
