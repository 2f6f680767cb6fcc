use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{DetailLevel, GenerationConfig};
use crate::error::{DocstampError, GenerationError, Result};
use crate::core::languages::FileKind;
use super::generator::{clean_response, DocGenerator};
use super::prompts::PromptBuilder;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

type GenerationResult<T> = std::result::Result<T, GenerationError>;

/// Factory function to create the generator named in the config
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn DocGenerator>> {
    match config.provider.as_str() {
        "anthropic" => Ok(Box::new(AnthropicProvider::new(config)?)),
        "openai" => Ok(Box::new(OpenAiProvider::new(config)?)),
        other => Err(DocstampError::Config(format!(
            "Unsupported generation provider: {}",
            other
        ))),
    }
}

/// State shared by the HTTP providers
struct HttpBackend {
    config: GenerationConfig,
    api_key: String,
    client: reqwest::Client,
    prompts: PromptBuilder,
}

impl HttpBackend {
    fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                DocstampError::Config(format!(
                    "API key required for provider '{}'; set {} or pass --api-key",
                    config.provider,
                    config.api_key_env_var()
                ))
            })?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DocstampError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config: config.clone(),
            api_key,
            client,
            prompts: PromptBuilder::new()?,
        })
    }

    fn endpoint(&self, default_base: &str, path: &str) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(default_base);
        format!("{}{}", base.trim_end_matches('/'), path)
    }

    fn generate_prompt(&self, kind: FileKind, detail: DetailLevel, code: &str) -> GenerationResult<String> {
        self.prompts
            .generate_prompt(kind, detail, code)
            .map_err(|e| GenerationError::ServiceError(e.to_string()))
    }

    fn update_prompt(
        &self,
        kind: FileKind,
        detail: DetailLevel,
        existing: &str,
        code: &str,
    ) -> GenerationResult<String> {
        self.prompts
            .update_prompt(kind, detail, existing, code)
            .map_err(|e| GenerationError::ServiceError(e.to_string()))
    }
}

/// Map a transport failure onto the generation taxonomy
fn transport_error(error: reqwest::Error) -> GenerationError {
    if error.is_connect() || error.is_timeout() {
        GenerationError::ConnectionFailed(error.to_string())
    } else {
        GenerationError::ServiceError(error.to_string())
    }
}

/// Error for a non-success HTTP status, if any
fn status_error(status: StatusCode, body: &str) -> Option<GenerationError> {
    if status.is_success() {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Some(GenerationError::RateLimited(format!("{}: {}", status, body)))
    } else {
        Some(GenerationError::ServiceError(format!("{}: {}", status, body)))
    }
}

async fn read_json(response: reqwest::Response) -> GenerationResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, &body).unwrap_or(GenerationError::ServiceError(body)));
    }

    response
        .json()
        .await
        .map_err(|e| GenerationError::ServiceError(format!("Failed to parse response: {}", e)))
}

/// Concatenated text blocks of a Messages API response
fn anthropic_text(response: &Value) -> Option<String> {
    let text: String = response["content"]
        .as_array()?
        .iter()
        .filter(|block| block["type"] == "text")
        .filter_map(|block| block["text"].as_str())
        .collect();
    (!text.is_empty()).then_some(text)
}

fn openai_text(response: &Value) -> Option<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
}

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    backend: HttpBackend,
}

impl AnthropicProvider {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            backend: HttpBackend::new(config)?,
        })
    }

    async fn complete(&self, prompt: String) -> GenerationResult<String> {
        let config = &self.backend.config;
        let payload = json!({
            "model": config.model,
            "max_tokens": config.max_tokens.unwrap_or(4096),
            "temperature": config.temperature.unwrap_or(0.2),
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        debug!("Requesting documentation from Anthropic model {}", config.model);
        let response = self
            .backend
            .client
            .post(self.backend.endpoint(ANTHROPIC_BASE_URL, "/v1/messages"))
            .header("x-api-key", &self.backend.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let body = read_json(response).await?;
        let text = anthropic_text(&body)
            .ok_or_else(|| GenerationError::ServiceError("response contained no text".to_string()))?;
        clean_response(&text)
    }
}

#[async_trait]
impl DocGenerator for AnthropicProvider {
    async fn generate(&self, kind: FileKind, detail: DetailLevel, code: &str) -> GenerationResult<String> {
        let prompt = self.backend.generate_prompt(kind, detail, code)?;
        self.complete(prompt).await
    }

    async fn update(
        &self,
        kind: FileKind,
        detail: DetailLevel,
        existing: &str,
        code: &str,
    ) -> GenerationResult<String> {
        let prompt = self.backend.update_prompt(kind, detail, existing, code)?;
        self.complete(prompt).await
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }

    fn model_name(&self) -> &str {
        &self.backend.config.model
    }
}

/// OpenAI Chat Completions provider
pub struct OpenAiProvider {
    backend: HttpBackend,
}

impl OpenAiProvider {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            backend: HttpBackend::new(config)?,
        })
    }

    async fn complete(&self, prompt: String) -> GenerationResult<String> {
        let config = &self.backend.config;
        let payload = json!({
            "model": config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert software documentation assistant. Reply with documentation only."
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "max_tokens": config.max_tokens.unwrap_or(4096),
            "temperature": config.temperature.unwrap_or(0.2)
        });

        debug!("Requesting documentation from OpenAI model {}", config.model);
        let response = self
            .backend
            .client
            .post(self.backend.endpoint(OPENAI_BASE_URL, "/v1/chat/completions"))
            .bearer_auth(&self.backend.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let body = read_json(response).await?;
        let text = openai_text(&body)
            .ok_or_else(|| GenerationError::ServiceError("response contained no message".to_string()))?;
        clean_response(&text)
    }
}

#[async_trait]
impl DocGenerator for OpenAiProvider {
    async fn generate(&self, kind: FileKind, detail: DetailLevel, code: &str) -> GenerationResult<String> {
        let prompt = self.backend.generate_prompt(kind, detail, code)?;
        self.complete(prompt).await
    }

    async fn update(
        &self,
        kind: FileKind,
        detail: DetailLevel,
        existing: &str,
        code: &str,
    ) -> GenerationResult<String> {
        let prompt = self.backend.update_prompt(kind, detail, existing, code)?;
        self.complete(prompt).await
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        &self.backend.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, api_key: Option<&str>) -> GenerationConfig {
        GenerationConfig {
            provider: provider.to_string(),
            api_key: api_key.map(str::to_string),
            ..GenerationConfig::default()
        }
    }

    #[test]
    fn factory_selects_provider() {
        let anthropic = create_generator(&config("anthropic", Some("sk-ant"))).unwrap();
        assert_eq!(anthropic.provider_name(), "Anthropic");
        assert_eq!(anthropic.model_name(), "claude-3-5-sonnet-20241022");

        let openai = create_generator(&GenerationConfig {
            model: "gpt-4o".to_string(),
            ..config("openai", Some("sk-open"))
        })
        .unwrap();
        assert_eq!(openai.provider_name(), "OpenAI");
        assert_eq!(openai.model_name(), "gpt-4o");
    }

    #[test]
    fn missing_key_or_unknown_provider_is_a_config_error() {
        let err = create_generator(&config("anthropic", None)).err().unwrap();
        assert!(matches!(err, DocstampError::Config(ref msg) if msg.contains("ANTHROPIC_API_KEY")));

        let err = create_generator(&config("openai", Some("  "))).err().unwrap();
        assert!(matches!(err, DocstampError::Config(ref msg) if msg.contains("OPENAI_API_KEY")));

        let err = create_generator(&config("carrier-pigeon", Some("k"))).err().unwrap();
        assert!(matches!(err, DocstampError::Config(_)));
    }

    #[test]
    fn statuses_map_onto_generation_errors() {
        assert_eq!(status_error(StatusCode::OK, ""), None);
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            Some(GenerationError::RateLimited(msg)) if msg.contains("slow down")
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            Some(GenerationError::ServiceError(_))
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "bad key"),
            Some(GenerationError::ServiceError(_))
        ));
    }

    #[test]
    fn response_text_extraction() {
        let anthropic = json!({
            "content": [
                {"type": "text", "text": "Part one. "},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "Part two."}
            ]
        });
        assert_eq!(anthropic_text(&anthropic).as_deref(), Some("Part one. Part two."));
        assert_eq!(anthropic_text(&json!({"content": []})), None);

        let openai = json!({"choices": [{"message": {"role": "assistant", "content": "Doc."}}]});
        assert_eq!(openai_text(&openai).as_deref(), Some("Doc."));
        assert_eq!(openai_text(&json!({"choices": []})), None);
    }

    #[test]
    fn base_url_override() {
        let backend = HttpBackend::new(&GenerationConfig {
            base_url: Some("http://localhost:8080/".to_string()),
            ..config("anthropic", Some("k"))
        })
        .unwrap();
        assert_eq!(backend.endpoint(ANTHROPIC_BASE_URL, "/v1/messages"), "http://localhost:8080/v1/messages");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_per_item_failure() {
        let provider = AnthropicProvider::new(&GenerationConfig {
            base_url: Some("http://127.0.0.1:9".to_string()),
            ..config("anthropic", Some("k"))
        })
        .unwrap();
        let result = provider.generate(FileKind::SingleUnit, DetailLevel::Concise, "SELECT 1;").await;
        assert!(matches!(
            result,
            Err(GenerationError::ConnectionFailed(_)) | Err(GenerationError::ServiceError(_))
        ));
    }
}
