//! REST client for the Helix backend.
//!
//! Endpoints (relative to the configured base, `/api` by default):
//! - `POST llm/outreach`: generate an outreach opener
//! - `POST candidate`: store a candidate
//! - `GET proxy?url=`: fetch a page through the backend proxy
//! - `POST message`: chat over HTTP instead of the socket
//! - `POST execute-task`: run a workspace step

pub mod error;
pub mod executor;
pub mod types;

pub use error::{RequestError, RequestResult};
pub use executor::HttpExecutor;
pub use types::{
    Acknowledgement, AgentChat, AgentReply, AgentWorkspace, Candidate, ExecuteTaskRequest,
    MessageRequest, OutreachRequest, OutreachResponse,
};

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ApiConfig;
use crate::workspace::ExecutionReport;

/// Async client for the REST endpoints.
#[derive(Clone, Debug)]
pub struct HelixApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HelixApi {
    /// Create a client for the configured base URL.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> RequestResult<Self> {
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/html;q=0.9"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| RequestError::HttpClient(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// The normalized base URL (always ends with `/`).
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Ask the backend for an AI-generated outreach opener.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response is malformed.
    pub async fn fetch_outreach_sequence(
        &self,
        role: &str,
        approach: &str,
    ) -> RequestResult<OutreachResponse> {
        self.post_json("llm/outreach", &OutreachRequest { role, approach })
            .await
    }

    /// Store a candidate.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response is malformed.
    pub async fn store_candidate(&self, candidate: &Candidate) -> RequestResult<Acknowledgement> {
        self.post_json("candidate", candidate).await
    }

    /// Fetch `target` through the backend proxy and return the raw HTML.
    ///
    /// # Errors
    /// Returns an error if the request fails or the server answers with an error status.
    pub async fn fetch_proxy_page(&self, target: &str) -> RequestResult<String> {
        let url = self.endpoint(&format!("proxy?url={}", urlencoding::encode(target)))?;
        tracing::debug!(%url, "GET proxy page");
        let response = self.client.get(url).send().await?;
        read_body(response).await
    }

    /// Send a chat message over HTTP and get the agent result directly.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response is malformed.
    pub async fn send_message(&self, message: &str) -> RequestResult<AgentReply> {
        self.post_json("message", &MessageRequest { message }).await
    }

    /// Run one workspace step on the backend.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response is malformed.
    pub async fn execute_task(&self, step_text: &str) -> RequestResult<ExecutionReport> {
        self.post_json("execute-task", &ExecuteTaskRequest { step_text })
            .await
    }

    fn endpoint(&self, path: &str) -> RequestResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> RequestResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "POST");
        let response = self.client.post(url).json(body).send().await?;
        let text = read_body(response).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

async fn read_body(response: reqwest::Response) -> RequestResult<String> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "Request rejected by server");
        return Err(RequestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}
