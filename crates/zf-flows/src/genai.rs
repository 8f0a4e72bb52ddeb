//! # Generative Model Client
//!
//! A thin client for a `generateContent`-style JSON endpoint. Flows talk to
//! it through the [`TextModel`] trait, so they can be exercised against a
//! canned model in tests.
//!
//! ```text
//! flow ──► TextModel::generate(prompt) ──► POST {base}/models/{model}:generateContent?key=…
//!                                               │
//!                          candidates[0].content.parts[*].text  (joined)
//! ```
//!
//! One request per call: no retries, no streaming, no caching.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{GenAiSettings, GEMINI_API_KEY};
use crate::error::{FlowError, FlowResult};

/// A prompt for one model call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
    /// Ask the model for a JSON object.
    pub json: bool,
    pub temperature: Option<f32>,
}

impl Prompt {
    pub fn new(user: impl Into<String>) -> Self {
        Prompt {
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Something that turns a prompt into text.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> FlowResult<String>;
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Clone)]
pub struct GenAiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GenAiClient {
    /// Builds a client.
    ///
    /// ## Errors
    /// `MissingConfig("GEMINI_API_KEY")` without an API key.
    pub fn new(settings: &GenAiSettings) -> FlowResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(FlowError::MissingConfig(GEMINI_API_KEY))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(GenAiClient {
            http,
            api_key,
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextModel for GenAiClient {
    async fn generate(&self, prompt: &Prompt) -> FlowResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![RequestPart { text: &prompt.user }],
            }],
            system_instruction: prompt.system.as_deref().map(|text| Content {
                role: None,
                parts: vec![RequestPart { text }],
            }),
            generation_config: GenerationConfig {
                temperature: prompt.temperature,
                response_mime_type: prompt.json.then_some("application/json"),
            },
        };

        debug!(model = %self.model, json = prompt.json, "Calling model");

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            warn!(status = status.as_u16(), %message, "Model call failed");
            return Err(FlowError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(FlowError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Extracts the JSON object from model text that may wrap it in a code fence
/// or surround it with prose.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // Skip the info string ("json") on the fence line
        let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
        let body = body.trim_end();
        return body.strip_suffix("```").unwrap_or(body).trim();
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn settings(base_url: String) -> GenAiSettings {
        GenAiSettings {
            api_key: Some("test-key".to_string()),
            model: "gemini-test".to_string(),
            base_url,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_missing_api_key() {
        let mut settings = settings("http://localhost".to_string());
        settings.api_key = None;
        let err = GenAiClient::new(&settings).unwrap_err();
        assert!(matches!(err, FlowError::MissingConfig("GEMINI_API_KEY")));

        settings.api_key = Some("  ".to_string());
        assert!(GenAiClient::new(&settings).unwrap_err().is_config_error());
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("```\n{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(extract_json("Sure! {\"a\": 1} Hope that helps."), "{\"a\": 1}");
        assert_eq!(extract_json("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(extract_json("no json"), "no json");
    }

    #[tokio::test]
    async fn test_generate_joins_parts() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_body(Matcher::PartialJson(serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }],
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#,
            )
            .create_async()
            .await;

        let client = GenAiClient::new(&settings(server.url())).unwrap();
        let text = client.generate(&Prompt::new("hello").json()).await.unwrap();

        assert_eq!(text, "Hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let mut server = Server::new_async().await;
        let _empty = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let client = GenAiClient::new(&settings(server.url())).unwrap();
        let err = client.generate(&Prompt::new("hi")).await.unwrap_err();
        assert!(matches!(err, FlowError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_api_error_message() {
        let mut server = Server::new_async().await;
        let _quota = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error":{"code":429,"message":"Quota exceeded"}}"#)
            .create_async()
            .await;

        let client = GenAiClient::new(&settings(server.url())).unwrap();
        let err = client.generate(&Prompt::new("hi")).await.unwrap_err();

        match &err {
            FlowError::Api { status, message } => {
                assert_eq!(*status, 429);
                assert_eq!(message, "Quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_retryable());
    }
}
