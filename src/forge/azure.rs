//! forge::azure
//!
//! Azure DevOps forge implementation using the Git REST API.
//!
//! # Endpoints
//!
//! All requests go to the organization URL (`https://dev.azure.com/<org>`)
//! with `api-version` appended:
//!
//! - `GET _apis/git/repositories` - repositories across all projects
//! - `GET _apis/git/repositories/{id}/refs?filter=heads/` - branches, paged
//!   through the `x-ms-continuationtoken` header
//! - `POST _apis/git/repositories/{id}/pullrequests` - create
//!
//! # Authentication
//!
//! A personal access token is sent with HTTP basic auth and an empty user
//! name. The token never appears in logs or `Debug` output; log lines use
//! [`mask_token`].
//!
//! # Example
//!
//! ```ignore
//! use gitops_scaffold::forge::azure::AzureDevOpsForge;
//! use gitops_scaffold::forge::Forge;
//! use std::time::Duration;
//!
//! let forge = AzureDevOpsForge::new("https://dev.azure.com/contoso", pat, Duration::from_secs(30))?;
//! let repos = forge.list_repositories().await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::types::RefName;

use super::traits::{CreatePrRequest, Forge, ForgeError, PrStatus, PullRequest, Repository};

/// Default REST API version.
pub const DEFAULT_API_VERSION: &str = "6.0";

/// Default per-request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT_VALUE: &str = "gops-cli";

const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

/// Mask all but the last four characters of a token.
///
/// Tokens of four characters or fewer are masked entirely.
///
/// # Example
///
/// ```
/// use gitops_scaffold::forge::azure::mask_token;
///
/// assert_eq!(mask_token("abcdefgh"), "****efgh");
/// assert_eq!(mask_token("abc"), "***");
/// ```
pub fn mask_token(token: &str) -> String {
    let len = token.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    token
        .chars()
        .enumerate()
        .map(|(i, c)| if i >= len - 4 { c } else { '*' })
        .collect()
}

/// Azure DevOps forge.
pub struct AzureDevOpsForge {
    client: Client,
    /// Organization URL without trailing slash.
    org_url: String,
    token: String,
    api_version: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for AzureDevOpsForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDevOpsForge")
            .field("org_url", &self.org_url)
            .field("token", &mask_token(&self.token))
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl AzureDevOpsForge {
    /// Create a forge for an organization.
    ///
    /// # Errors
    ///
    /// - `AuthRequired` if `token` is empty
    /// - `NetworkError` if the HTTP client cannot be built
    pub fn new(
        org_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ForgeError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        info!(
            org_url,
            token = %mask_token(&token),
            "using Azure DevOps personal access token"
        );

        Ok(Self {
            client,
            org_url: org_url.trim_end_matches('/').to_string(),
            token,
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Override the REST API version.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn org_url(&self) -> &str {
        &self.org_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/_apis/git/{}", self.org_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth("", Some(&self.token))
            .query(&[("api-version", self.api_version.as_str())])
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ForgeError> {
        self.authorized(request).send().await.map_err(|e| {
            if e.is_timeout() {
                ForgeError::NetworkError(format!("request timed out: {e}"))
            } else {
                ForgeError::NetworkError(e.to_string())
            }
        })
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        // An invalid PAT yields a 203 sign-in page rather than a 401
        if status == StatusCode::NON_AUTHORITATIVE_INFORMATION {
            return Err(ForgeError::AuthFailed(
                "token was not accepted (sign-in page returned)".into(),
            ));
        }

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(self.error_from_response(response, status).await)
        }
    }

    async fn error_from_response(&self, response: Response, status: StatusCode) -> ForgeError {
        let message = match response.json::<AzureErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Azure DevOps server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl Forge for AzureDevOpsForge {
    fn name(&self) -> &'static str {
        "azure-devops"
    }

    async fn list_repositories(&self) -> Result<Vec<Repository>, ForgeError> {
        let url = self.api_url("repositories");
        debug!(%url, "listing repositories");

        let response = self.send(self.client.get(&url)).await?;
        let list: AzureList<AzureRepository> = self.handle_response(response).await?;
        info!(count = list.value.len(), "retrieved repositories");

        Ok(list.value.into_iter().map(Repository::from).collect())
    }

    async fn list_branches(&self, repository_id: &str) -> Result<Vec<String>, ForgeError> {
        let url = self.api_url(&format!("repositories/{}/refs", repository_id));
        let mut branches = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            debug!(%url, page = continuation.is_some(), "listing branches");
            let mut request = self.client.get(&url).query(&[("filter", "heads/")]);
            if let Some(token) = &continuation {
                request = request.query(&[("continuationToken", token.as_str())]);
            }

            let response = self.send(request).await?;
            continuation = response
                .headers()
                .get(CONTINUATION_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string);

            let page: AzureList<AzureRef> = self.handle_response(response).await?;
            branches.extend(page.value.into_iter().filter_map(|r| {
                let name = RefName::new(r.name).ok()?;
                name.strip_prefix(RefName::HEADS_PREFIX).map(str::to_string)
            }));

            if continuation.is_none() {
                break;
            }
        }

        Ok(branches)
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        let url = self.api_url(&format!(
            "repositories/{}/pullrequests",
            request.repository_id
        ));
        let body = AzureCreatePr {
            source_ref_name: request.source_ref().to_string(),
            target_ref_name: request.target_ref().to_string(),
            title: request.title.clone(),
            description: request.description.clone().unwrap_or_default(),
        };
        debug!(%url, source = %body.source_ref_name, target = %body.target_ref_name, "creating pull request");

        let response = self.send(self.client.post(&url).json(&body)).await?;
        let pr: AzurePullRequest = self.handle_response(response).await?;
        Ok(pr.into())
    }
}

// =============================================================================
// Azure DevOps API types
// =============================================================================

#[derive(Debug, Deserialize)]
struct AzureList<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureRepository {
    id: String,
    name: String,
    url: String,
    ssh_url: Option<String>,
    web_url: Option<String>,
    remote_url: Option<String>,
}

impl From<AzureRepository> for Repository {
    fn from(r: AzureRepository) -> Self {
        Repository {
            id: r.id,
            name: r.name,
            url: r.url,
            ssh_url: r.ssh_url,
            web_url: r.web_url,
            remote_url: r.remote_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AzureRef {
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AzureCreatePr {
    source_ref_name: String,
    target_ref_name: String,
    title: String,
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzurePullRequest {
    pull_request_id: u64,
    #[serde(default)]
    status: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    source_ref_name: String,
    #[serde(default)]
    target_ref_name: String,
    #[serde(default)]
    url: String,
    repository: Option<AzurePrRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzurePrRepository {
    web_url: Option<String>,
}

impl From<AzurePullRequest> for PullRequest {
    fn from(pr: AzurePullRequest) -> Self {
        let url = pr
            .repository
            .and_then(|r| r.web_url)
            .map(|web| format!("{}/pullrequest/{}", web.trim_end_matches('/'), pr.pull_request_id))
            .unwrap_or(pr.url);
        PullRequest {
            id: pr.pull_request_id,
            url,
            status: PrStatus::from_api(&pr.status),
            source_ref: pr.source_ref_name,
            target_ref: pr.target_ref_name,
            title: pr.title,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AzureErrorResponse {
    message: String,
}
