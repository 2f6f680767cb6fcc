use async_trait::async_trait;

use crate::config::DetailLevel;
use crate::error::GenerationError;
use crate::core::languages::FileKind;

/// Backend that writes documentation text for a code snippet
#[async_trait]
pub trait DocGenerator: Send + Sync {
    /// Write documentation for undocumented code
    async fn generate(
        &self,
        kind: FileKind,
        detail: DetailLevel,
        code: &str,
    ) -> std::result::Result<String, GenerationError>;

    /// Rewrite documentation that failed validation
    async fn update(
        &self,
        kind: FileKind,
        detail: DetailLevel,
        existing: &str,
        code: &str,
    ) -> std::result::Result<String, GenerationError>;

    /// Get the provider name (e.g., "Anthropic", "OpenAI")
    fn provider_name(&self) -> &str;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}

/// Trim a response and drop a Markdown fence wrapped around all of it
pub fn clean_response(text: &str) -> std::result::Result<String, GenerationError> {
    let trimmed = text.trim();
    let unfenced = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let body = rest.split_once('\n').map_or("", |(_, body)| body);
            body.trim_end().strip_suffix("```").unwrap_or(body)
        }
        None => trimmed,
    };

    let cleaned = unfenced.trim_matches('\n').trim_end();
    if cleaned.trim().is_empty() {
        return Err(GenerationError::ServiceError("empty documentation in response".to_string()));
    }
    Ok(cleaned.to_string())
}
