use crate::error::{CmsClientError, CmsResult};
use reqwest::Response;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Every request is bounded so a backend that never settles cannot stall a scenario.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The shape of a query endpoint response: data on success, a list of structured errors
/// otherwise, and nothing stops a backend from sending both.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub errors: Vec<QueryError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryError {
    pub message: String,
}

/// A client for the CMS data layer: the content endpoint that serves file bodies out of the
/// database cache, and the query endpoint in front of it.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct CmsClient {
    client: reqwest::Client,
    content_url: String,
    query_url: String,
}

impl CmsClient {
    pub fn new(content_url: impl Into<String>, query_url: impl Into<String>) -> CmsResult<Self> {
        let content_url = content_url.into();
        let query_url = query_url.into();
        for (name, value) in [("content", &content_url), ("query", &query_url)] {
            url::Url::parse(value)
                .map_err(|e| CmsClientError::Config(format!("invalid {name} URL: {e}")))?;
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            content_url: content_url.trim_end_matches('/').to_string(),
            query_url,
        })
    }

    /// Fetch a file body from the content endpoint.
    ///
    /// `branch` selects which branch's content the CMS should serve, for backends that expose
    /// branch-scoped content.
    pub async fn fetch_content(&self, path: &str, branch: Option<&str>) -> CmsResult<String> {
        let mut request = self
            .client
            .get(format!("{}/{path}", self.content_url));
        if let Some(branch) = branch {
            request = request.query(&[("branch", branch)]);
        }

        let response = expect_success("fetch_content", request.send().await?).await?;
        Ok(response.text().await?)
    }

    /// Execute a structured query with variables against the query endpoint.
    ///
    /// A transport-level success that carries structured errors is surfaced as
    /// [CmsClientError::Query]; partial data does not hide a reported failure.
    pub async fn execute_query(&self, query: &str, variables: Value) -> CmsResult<Value> {
        let response = self
            .client
            .post(&self.query_url)
            .json(&json!({
                "query": query,
                "variables": variables,
            }))
            .send()
            .await?;

        let response = expect_success("execute_query", response).await?;
        let body: QueryResponse = response.json().await?;

        if !body.errors.is_empty() {
            let messages = body
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CmsClientError::Query { messages });
        }

        Ok(body.data)
    }
}

async fn expect_success(operation: &'static str, response: Response) -> CmsResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(CmsClientError::Status {
        operation,
        status: status.as_u16(),
        body: body.chars().take(256).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn query_errors_are_surfaced_not_swallowed() {
        let json = r#"{
            "data": { "document": null },
            "errors": [
                { "message": "document not found: probe/data.md" },
                { "message": "cache miss" }
            ]
        }"#;

        let body: QueryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(2, body.errors.len());
        assert_eq!("document not found: probe/data.md", body.errors[0].message);
    }

    #[test]
    fn data_only_response_has_no_errors() {
        let json = r#"{ "data": { "document": { "body": "hello" } } }"#;
        let body: QueryResponse = serde_json::from_str(json).unwrap();
        assert!(body.errors.is_empty());
        assert_eq!("hello", body.data["document"]["body"]);
    }

    #[test]
    fn invalid_urls_are_config_errors() {
        let err = CmsClient::new("not a url", "http://localhost:4001/query").unwrap_err();
        assert!(matches!(err, CmsClientError::Config(_)));
    }
}
