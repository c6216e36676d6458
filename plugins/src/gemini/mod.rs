//! Generation backend speaking the Gemini `generateContent` REST API.

mod error;
mod wire;

use std::time::Duration;

use async_trait::async_trait;
use castforge_core::config::RemoteConfig;
use castforge_core::remote::{GenerateRequest, GenerateResponse, GenerationBackend, RemoteFailure};

pub use error::{GeminiHttpError, GeminiHttpErrorKind};
use error::preview_body;
use wire::{GenerateContentBody, GenerateContentReply};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiBackend {
    api_key: String,
    http: reqwest::Client,
    // Pre-built `{base}/{version}/models/` prefix
    models_url: String,
}

impl GeminiBackend {
    /// No overall request timeout is set here: every attempt is bounded by
    /// the retry policy of its operation.
    pub fn new(cfg: &RemoteConfig) -> anyhow::Result<Self> {
        if cfg.api_key.trim().is_empty() {
            anyhow::bail!("no API key configured; set CASTFORGE_API_KEY or remote.api_key");
        }
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .build()?;
        let normalized = cfg.base_url.trim_end_matches('/');
        Ok(Self {
            api_key: cfg.api_key.clone(),
            http,
            models_url: format!("{}/{}/models/", normalized, cfg.api_version.trim_matches('/')),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}{}:generateContent", self.models_url, model)
    }

    async fn call(&self, request: &GenerateRequest) -> Result<GenerateResponse, GeminiHttpError> {
        let url = self.endpoint(&request.model);
        let body = GenerateContentBody::from_request(request);
        tracing::debug!(
            target: "castforge.gemini",
            stage = "gemini.request.in",
            url = %url,
            operation = %request.operation,
            prompt_chars = request.prompt.chars().count(),
            web_search = request.web_search
        );

        let resp = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GeminiHttpError::from_reqwest(err, url.clone()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|err| GeminiHttpError::from_reqwest(err, url.clone()))?;
        if !status.is_success() {
            return Err(GeminiHttpError::status_error(
                status.as_u16(),
                url,
                preview_body(&text),
            ));
        }

        let reply: GenerateContentReply = serde_json::from_str(&text).map_err(|err| {
            GeminiHttpError::decode_error(
                status.as_u16(),
                url.clone(),
                format!("failed to decode response body: {} | body={}", err, preview_body(&text)),
            )
        })?;
        let response = reply
            .into_response()
            .map_err(|msg| GeminiHttpError::decode_error(status.as_u16(), url.clone(), msg))?;

        tracing::debug!(
            target: "castforge.gemini",
            stage = "gemini.request.out",
            status = %status,
            text_chars = response.text.as_ref().map(|t| t.chars().count()).unwrap_or(0),
            parts = response.parts.len(),
            sources = response.sources.len()
        );
        Ok(response)
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, RemoteFailure> {
        self.call(&request).await.map_err(|err| {
            tracing::warn!(
                target: "castforge.gemini",
                stage = "gemini.request.failed",
                kind = %err.kind(),
                status = ?err.status(),
                error = %err
            );
            err.into_failure()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castforge_core::remote::{Modality, OperationKind};
    use mockito::{Matcher, Server};

    fn config(url: String) -> RemoteConfig {
        RemoteConfig {
            base_url: url,
            api_key: "test-key".to_string(),
            ..RemoteConfig::default()
        }
    }

    #[test]
    fn missing_key_is_rejected() {
        let cfg = RemoteConfig::default();
        assert!(GeminiBackend::new(&RemoteConfig {
            api_key: "  ".into(),
            ..cfg
        })
        .is_err());
    }

    #[tokio::test]
    async fn text_reply_is_flattened() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/v1alpha/models/gemini-2.5-pro:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "tools": [{"googleSearch": {}}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"analysis"}]}}]}"#)
            .create_async()
            .await;

        let backend = GeminiBackend::new(&config(server.url())).unwrap();
        let req = GenerateRequest::text(OperationKind::Research, "gemini-2.5-pro", "topic")
            .with_web_search(true);
        let resp = backend.generate(req).await.unwrap();
        assert_eq!(resp.text.as_deref(), Some("analysis"));
    }

    #[tokio::test]
    async fn inline_audio_is_decoded() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/v1alpha/models/tts:generateContent")
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"audio/L16;codec=pcm;rate=24000","data":"AAAA"}}]}}]}"#,
            )
            .create_async()
            .await;

        let backend = GeminiBackend::new(&config(server.url())).unwrap();
        let req = GenerateRequest::text(OperationKind::SpeechSingle, "tts", "hi")
            .with_modality(Modality::Audio);
        let resp = backend.generate(req).await.unwrap();
        assert_eq!(resp.parts[0].data, vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn server_status_becomes_status_failure() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", Matcher::Any)
            .with_status(503)
            .with_body("model overloaded")
            .create_async()
            .await;

        let backend = GeminiBackend::new(&config(server.url())).unwrap();
        let req = GenerateRequest::text(OperationKind::ImageGen, "img", "court");
        match backend.generate(req).await {
            Err(RemoteFailure::Status { status, message }) => {
                assert_eq!(status, 503);
                assert!(message.contains("model overloaded"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_becomes_decode_failure() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let backend = GeminiBackend::new(&config(server.url())).unwrap();
        let req = GenerateRequest::text(OperationKind::ScriptGen, "m", "p");
        assert!(matches!(
            backend.generate(req).await,
            Err(RemoteFailure::Decode { .. })
        ));
    }
}
