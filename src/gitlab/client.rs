//! HTTP client for the GitLab REST API (v4).

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};
use url::Url;

use super::error::{error_message, truncate_body, ApiError};

/// Header GitLab reads personal/project access tokens from.
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// Path suffix every GitLab API base URL must end with.
const API_SUFFIX: &str = "api/v4/";

/// Normalise a user-supplied GitLab URL into an API base URL.
///
/// `https://gitlab.example.com`, `https://gitlab.example.com/` and
/// `https://gitlab.example.com/api/v4` all become
/// `https://gitlab.example.com/api/v4/`.
pub fn normalize_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut base = raw.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    if !base.ends_with(&format!("/{}", API_SUFFIX)) {
        base.push_str(API_SUFFIX);
    }
    Url::parse(&base)
}

/// An authenticated GitLab API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct GitlabClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for GitlabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitlabClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl GitlabClient {
    /// Create a client with a default HTTP stack.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(user_agent())
            .build()
            .map_err(|source| ApiError::Transport {
                method: Method::GET,
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self::with_http_client(http, normalize_base_url(base_url)?, token))
    }

    /// Create a client around a preconfigured `reqwest::Client`.
    ///
    /// `base_url` is used as-is and must already end in `/api/v4/`.
    pub fn with_http_client(http: Client, base_url: Url, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            token: token.into(),
        }
    }

    /// The API base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET` a path relative to the base URL and decode the JSON answer.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.base_url.join(path)?;
        let body = self
            .execute(Method::GET, &url, self.request(Method::GET, &url))
            .await?;
        decode(Method::GET, &url, &body)
    }

    /// `PUT` a JSON body to a path, ignoring any response body.
    ///
    /// Depending on the GitLab version the answer is the updated object or a
    /// bare `true`, so only the status is checked.
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let url = self.base_url.join(path)?;
        let request = self.request(Method::PUT, &url).json(body);
        self.execute(Method::PUT, &url, request).await?;
        Ok(())
    }

    /// `DELETE` a path, ignoring any response body.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.base_url.join(path)?;
        self.execute(Method::DELETE, &url, self.request(Method::DELETE, &url))
            .await?;
        Ok(())
    }

    fn request(&self, method: Method, url: &Url) -> RequestBuilder {
        self.http
            .request(method, url.clone())
            .header(TOKEN_HEADER, &self.token)
    }

    async fn execute(
        &self,
        method: Method,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<String, ApiError> {
        debug!(method = %method, url = %url, "GitLab API request");

        let response = request.send().await.map_err(|source| ApiError::Transport {
            method: method.clone(),
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::Transport {
            method: method.clone(),
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            error!(method = %method, url = %url, status = %status, body = %truncate_body(&body), "GitLab API error");
            return Err(ApiError::Response {
                method,
                url: url.to_string(),
                status,
                message: error_message(&body),
            });
        }

        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(method: Method, url: &Url, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        method,
        url: url.to_string(),
        source,
    })
}

/// User agent sent with every request.
pub fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
