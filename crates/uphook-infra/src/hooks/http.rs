use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};

use uphook_core::{HookCodec, HookConfig, HookError, HookRequest, HookResponse, JsonCodec};

use super::HookHandler;

/// Sends hook requests as JSON POSTs to a single endpoint
pub struct HttpHook {
    endpoint: String,
    forward_headers: Vec<String>,
    size_limit: usize,
    http_client: Client,
    codec: JsonCodec,
}

impl HttpHook {
    pub fn new(
        endpoint: impl Into<String>,
        forward_headers: Vec<String>,
        connect_timeout: Duration,
        size_limit: usize,
    ) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .context("Failed to create HTTP client for hooks")?;

        Ok(Self {
            endpoint: endpoint.into(),
            forward_headers,
            size_limit,
            http_client,
            codec: JsonCodec,
        })
    }

    pub fn from_config(config: &HookConfig) -> anyhow::Result<Self> {
        let endpoint = config
            .http_endpoint
            .clone()
            .context("HOOKS_HTTP_ENDPOINT must be set")?;
        Self::new(
            endpoint,
            config.http_forward_headers.clone(),
            config.http_connect_timeout(),
            config.http_size_limit,
        )
    }

    /// Read at most `size_limit` bytes of the body. The flag is set when
    /// the body was longer and got cut off.
    async fn read_limited(&self, mut response: Response) -> Result<(Vec<u8>, bool), HookError> {
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| HookError::HandlerError(format!("failed to read response: {}", e)))?
        {
            let room = self.size_limit - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                return Ok((body, true));
            }
            body.extend_from_slice(&chunk);
        }
        Ok((body, false))
    }
}

/// Whether a `Content-Type` value names JSON, ignoring parameters and case
fn is_json_media_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|essence| essence.eq_ignore_ascii_case("application/json"))
}

fn classify_send_error(err: reqwest::Error) -> HookError {
    if err.is_connect() {
        HookError::Unreachable(err.to_string())
    } else {
        HookError::HandlerError(format!("failed to send request: {}", err))
    }
}

#[async_trait]
impl HookHandler for HttpHook {
    fn name(&self) -> &'static str {
        "http"
    }

    #[tracing::instrument(
        skip(self, request),
        fields(endpoint = %self.endpoint, hook_type = %request.hook_type())
    )]
    async fn invoke_hook(&self, request: &HookRequest) -> Result<HookResponse, HookError> {
        let body = self
            .codec
            .encode_request(request)
            .map_err(|e| HookError::Encode(e.to_string()))?;

        let mut builder = self
            .http_client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, self.codec.content_type());

        let client_headers = &request.event().http_request.headers;
        for name in &self.forward_headers {
            let values = client_headers
                .iter()
                .filter(|(key, _)| key.eq_ignore_ascii_case(name))
                .flat_map(|(_, values)| values);
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        let response = builder.body(body).send().await.map_err(classify_send_error)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let (body, truncated) = self.read_limited(response).await?;

        if !status.is_success() {
            return Err(HookError::HandlerError(format!(
                "unexpected response code from hook endpoint ({}): {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )));
        }

        if truncated {
            return Err(HookError::MalformedResponse(format!(
                "response body exceeds {} bytes",
                self.size_limit
            )));
        }

        if !is_json_media_type(&content_type) {
            return Err(HookError::MalformedResponse(format!(
                "unexpected response content type {:?}, expected {}",
                content_type,
                self.codec.content_type()
            )));
        }

        self.codec
            .decode_response(&body)
            .map_err(|e| HookError::MalformedResponse(e.to_string()))
    }
}
