use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use std::future::Future;
use std::time::Duration;

use super::auth::Credential;
use super::error::FetchError;

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Status, headers and body of one HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Builder-style header insertion. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single GET against the API. Implementations do not retry.
pub trait Transport {
    fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> impl Future<Output = Result<RawResponse, FetchError>> + Send;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    credential: Credential,
}

impl ReqwestTransport {
    pub fn new(credential: Credential) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ghstats/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, credential })
    }
}

impl Transport for ReqwestTransport {
    fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> impl Future<Output = Result<RawResponse, FetchError>> + Send {
        let request = self
            .client
            .get(url)
            .bearer_auth(self.credential.token())
            .header(ACCEPT, ACCEPT_GITHUB_JSON)
            .header(API_VERSION_HEADER, API_VERSION)
            .query(params);

        async move {
            let resp = request
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = resp.status().as_u16();
            let headers = resp.headers().clone();
            let body = resp
                .text()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            Ok(RawResponse {
                status,
                headers,
                body,
            })
        }
    }
}
