use crate::error::{GithubClientError, GithubResult};
use crate::types::{
    BranchInfo, CommitInfo, CommitListItem, DeleteContentResponse, GitRef, PutContentResponse,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde_json::json;
use std::time::Duration;

/// Media type asking the contents endpoint for the file body itself instead of its metadata.
const RAW_CONTENT: &str = "application/vnd.github.raw+json";

/// Every request is bounded so a backend that never settles cannot stall a scenario.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A client for the Git-hosting REST API, scoped to one repository.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    base_url: String,
    owner: String,
    repo: String,
}

impl GithubClient {
    /// Create a client for `owner/repo`.
    ///
    /// An empty token is allowed and means unauthenticated access, which is enough for reads
    /// against a public repository but not for any of the write operations.
    pub fn new(
        base_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: &str,
    ) -> GithubResult<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)
            .map_err(|e| GithubClientError::Config(format!("invalid REST API base URL: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("propagation-probe"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        if !token.is_empty() {
            let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| GithubClientError::Config(format!("invalid access token: {e}")))?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
        })
    }

    fn repo_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{tail}",
            self.base_url, self.owner, self.repo
        )
    }

    /// Read a file's body at a branch or commit. `reference` defaults to the repository's
    /// default branch when `None`.
    pub async fn get_content_raw(
        &self,
        path: &str,
        reference: Option<&str>,
    ) -> GithubResult<String> {
        let mut request = self
            .client
            .get(self.repo_url(&format!("contents/{path}")))
            .header(ACCEPT, RAW_CONTENT);
        if let Some(reference) = reference {
            request = request.query(&[("ref", reference)]);
        }

        let response = expect_success("get_content_raw", request.send().await?).await?;
        Ok(response.text().await?)
    }

    /// List the most recent commits reachable from `branch`.
    pub async fn list_commits(
        &self,
        branch: &str,
        per_page: u8,
    ) -> GithubResult<Vec<CommitListItem>> {
        let per_page = per_page.to_string();
        let response = self
            .client
            .get(self.repo_url("commits"))
            .query(&[("sha", branch), ("per_page", per_page.as_str())])
            .send()
            .await?;

        let response = expect_success("list_commits", response).await?;
        Ok(response.json().await?)
    }

    pub async fn list_branches(&self) -> GithubResult<Vec<BranchInfo>> {
        let response = self
            .client
            .get(self.repo_url("branches"))
            .query(&[("per_page", "100")])
            .send()
            .await?;

        let response = expect_success("list_branches", response).await?;
        Ok(response.json().await?)
    }

    /// Resolve `refs/heads/<branch>` to its current commit.
    pub async fn get_branch_ref(&self, branch: &str) -> GithubResult<GitRef> {
        let response = self
            .client
            .get(self.repo_url(&format!("git/ref/heads/{branch}")))
            .send()
            .await?;

        let response = expect_success("get_branch_ref", response).await?;
        Ok(response.json().await?)
    }

    /// Create `refs/heads/<branch>` pointing at `sha`.
    pub async fn create_branch_ref(&self, branch: &str, sha: &str) -> GithubResult<GitRef> {
        let response = self
            .client
            .post(self.repo_url("git/refs"))
            .json(&json!({
                "ref": format!("refs/heads/{branch}"),
                "sha": sha,
            }))
            .send()
            .await?;

        let response = expect_success("create_branch_ref", response).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_branch_ref(&self, branch: &str) -> GithubResult<()> {
        let response = self
            .client
            .delete(self.repo_url(&format!("git/refs/heads/{branch}")))
            .send()
            .await?;

        expect_success("delete_branch_ref", response).await?;
        Ok(())
    }

    /// Create or update a file on `branch` in a single commit.
    pub async fn put_content(
        &self,
        path: &str,
        message: &str,
        content: &str,
        branch: &str,
    ) -> GithubResult<PutContentResponse> {
        let response = self
            .client
            .put(self.repo_url(&format!("contents/{path}")))
            .json(&json!({
                "message": message,
                "content": BASE64.encode(content),
                "branch": branch,
            }))
            .send()
            .await?;

        let response = expect_success("put_content", response).await?;
        Ok(response.json().await?)
    }

    /// Delete a file from `branch`. `sha` is the blob sha from [GithubClient::get_content_meta]
    /// or from the create response.
    pub async fn delete_content(
        &self,
        path: &str,
        message: &str,
        sha: &str,
        branch: &str,
    ) -> GithubResult<CommitInfo> {
        let response = self
            .client
            .delete(self.repo_url(&format!("contents/{path}")))
            .json(&json!({
                "message": message,
                "sha": sha,
                "branch": branch,
            }))
            .send()
            .await?;

        let response = expect_success("delete_content", response).await?;
        let response: DeleteContentResponse = response.json().await?;
        Ok(response.commit)
    }
}

/// Convert a non-2xx response into [GithubClientError::Status], keeping enough of the body to
/// be diagnosable without drowning the report in HTML error pages.
async fn expect_success(operation: &'static str, response: Response) -> GithubResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.text().await {
        Ok(body) => truncate_body(&body),
        Err(_) => String::new(),
    };

    if status == StatusCode::NOT_FOUND {
        log::debug!("{operation}: resource not found");
    }

    Err(GithubClientError::Status {
        operation,
        status: status.as_u16(),
        body,
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 256;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i <= MAX)
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0);
        format!("{}…", &body[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn repository_urls_are_scoped_to_the_configured_repo() {
        let client =
            GithubClient::new("https://api.github.com/", "acme", "site", "token123").unwrap();

        assert_eq!(
            "https://api.github.com/repos/acme/site/git/ref/heads/probe-branch",
            client.repo_url("git/ref/heads/probe-branch")
        );
        assert_eq!(
            "https://api.github.com/repos/acme/site/contents/probe/data.md",
            client.repo_url("contents/probe/data.md")
        );
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let err = GithubClient::new("not a url", "acme", "site", "").unwrap_err();
        assert!(matches!(err, GithubClientError::Config(_)));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let truncated = truncate_body(&body);
        assert!(truncated.len() < 300);
        assert!(truncated.ends_with('…'));
    }
}
