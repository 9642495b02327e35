use anyhow::{Context, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client as OpenAIClient;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::{LlmProvider, LlmSettings, DEFAULT_GEMINI_BASE_URL, DEFAULT_OLLAMA_HOST};
use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

const LLM_TIMEOUT: Duration = Duration::from_secs(120);
const GEMINI_API_VERSION: &str = "v1beta";

/// Minimal client for the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(LLM_TIMEOUT)
            .build()
            .context("Failed to build Gemini HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn generate_content_url(&self, model: &str) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, GEMINI_API_VERSION, model
        )
    }

    pub async fn generate(&self, model: &str, prompt: &str, temperature: f32) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig { temperature },
        };

        let response = self
            .http
            .post(self.generate_content_url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API returned {}: {}", status, body);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to decode Gemini response")?;
        Ok(parsed.text())
    }
}

impl LLMParams {
    /// Build the client for the configured provider.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let llm_client = match settings.provider {
            LlmProvider::Gemini => {
                let api_key = settings
                    .api_key
                    .clone()
                    .context("Gemini requires an API key")?;
                LLMClient::Gemini(GeminiClient::new(api_key, settings.base_url.clone())?)
            }
            LlmProvider::OpenAI => {
                let api_key = settings
                    .api_key
                    .clone()
                    .context("OpenAI requires an API key")?;
                let mut config = OpenAIConfig::new().with_api_key(api_key);
                if let Some(base) = &settings.base_url {
                    config = config.with_api_base(base);
                }
                LLMClient::OpenAI(OpenAIClient::with_config(config))
            }
            LlmProvider::Ollama => {
                let host = settings
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string());
                info!(target: TARGET_LLM_REQUEST, "Connecting to Ollama at {}:{}", host, settings.ollama_port);
                LLMClient::Ollama(Ollama::new(host, settings.ollama_port))
            }
        };

        Ok(Self {
            llm_client,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }
}

/// Send one prompt to the configured model and return its trimmed text.
///
/// An empty completion is treated as a failure.
pub async fn generate_llm_response(prompt: &str, params: &LLMParams) -> Result<String> {
    debug!(target: TARGET_LLM_REQUEST, "Sending prompt to {} ({} chars)", params.model, prompt.len());

    let text = timeout(LLM_TIMEOUT, dispatch(prompt, params))
        .await
        .map_err(|_| anyhow::anyhow!("LLM request to {} timed out", params.model))??;

    let text = text.trim().to_string();
    if text.is_empty() {
        anyhow::bail!("{} returned an empty response", params.model);
    }

    debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", text);
    Ok(text)
}

async fn dispatch(prompt: &str, params: &LLMParams) -> Result<String> {
    match &params.llm_client {
        LLMClient::Gemini(client) => {
            client
                .generate(&params.model, prompt, params.temperature)
                .await
        }
        LLMClient::OpenAI(client) => {
            let request = CreateChatCompletionRequestArgs::default()
                .model(params.model.clone())
                .temperature(params.temperature)
                .messages([ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into()])
                .build()?;
            let response = client.chat().create(request).await?;
            Ok(response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .unwrap_or_default())
        }
        LLMClient::Ollama(ollama) => {
            let mut request = GenerationRequest::new(params.model.clone(), prompt.to_string());
            request.options = Some(GenerationOptions::default().temperature(params.temperature));
            let response = ollama
                .generate(request)
                .await
                .map_err(|e| anyhow::anyhow!("Ollama request failed: {}", e))?;
            Ok(response.response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gemini_params(server: &MockServer) -> LLMParams {
        LLMParams {
            llm_client: LLMClient::Gemini(
                GeminiClient::new("test-key", Some(server.uri())).unwrap(),
            ),
            model: "gemini-2.0-flash-lite".to_string(),
            temperature: 0.2,
        }
    }

    #[test]
    fn test_generate_content_url() {
        let client = GeminiClient::new("k", Some("https://api.example.com/".to_string())).unwrap();
        assert_eq!(
            client.generate_content_url("gemini-2.0-flash-lite"),
            "https://api.example.com/v1beta/models/gemini-2.0-flash-lite:generateContent"
        );
    }

    #[test]
    fn test_debug_does_not_leak_api_key() {
        let client = GeminiClient::new("super-secret", None).unwrap();
        assert!(!format!("{:?}", client).contains("super-secret"));
    }

    #[tokio::test]
    async fn test_gemini_response_parts_are_joined() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash-lite:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": " A new method. "}, {"text": "It matters.\n"}]}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = generate_llm_response("summarize", &gemini_params(&server))
            .await
            .unwrap();
        assert_eq!(text, "A new method. It matters.");
    }

    #[tokio::test]
    async fn test_gemini_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = generate_llm_response("summarize", &gemini_params(&server))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("429"));
        assert!(err.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_empty_completion_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        assert!(generate_llm_response("summarize", &gemini_params(&server))
            .await
            .is_err());
    }
}
