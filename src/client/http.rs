use futures::StreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::UpstreamConfig;
use crate::error::{CompareError, Result};
use crate::models::AskRequest;
use crate::provider::{AnswerProvider, AnswerStream, StreamFuture};

/// Streams answers from the backend's `ask` endpoint over HTTP
pub struct HttpAnswerProvider {
    client: Client,
    config: UpstreamConfig,
}

impl HttpAnswerProvider {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        // Only the connect phase is bounded; an answer streams for as long as it needs.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| {
                CompareError::InternalError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.ask_path.trim_start_matches('/')
        )
    }
}

impl AnswerProvider for HttpAnswerProvider {
    fn stream_answer(&self, request: AskRequest) -> StreamFuture {
        let url = self.url();
        let client = self.client.clone();
        let headers = self.config.headers.clone();

        Box::pin(async move { Self::stream_answer_impl(url, request, client, headers).await })
    }

    fn name(&self) -> &str {
        "http"
    }
}

impl HttpAnswerProvider {
    async fn stream_answer_impl(
        url: String,
        request: AskRequest,
        client: Client,
        headers: HashMap<String, String>,
    ) -> Result<AnswerStream> {
        info!(model = %request.model, url = %url, "Sending ask request");

        let mut builder = client.post(&url).json(&request);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            CompareError::Upstream(format!("Request to {} failed: {}", url, e))
        })?;

        let status = response.status();
        debug!(model = %request.model, %status, "Backend responded");

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CompareError::Upstream(format!("{}: {}", status, error_body)));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| CompareError::Transport(e.to_string())));

        Ok(Box::pin(body))
    }
}
