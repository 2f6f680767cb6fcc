use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{DocstampError, Result};

/// Output density requested from the documentation generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Essential information only
    Minimal,
    /// Key details with every required section
    #[default]
    Concise,
    /// Extended explanations and several examples
    Verbose,
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetailLevel::Minimal => "minimal",
            DetailLevel::Concise => "concise",
            DetailLevel::Verbose => "verbose",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Documentation generator settings
    pub generation: GenerationConfig,

    /// File processing settings
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Provider backend (anthropic, openai)
    pub provider: String,

    /// Model name (e.g., "claude-3-5-sonnet-20241022", "gpt-4o")
    pub model: String,

    /// API key; falls back to the provider's environment variable
    pub api_key: Option<String>,

    /// Base URL override for proxies or compatible endpoints
    pub base_url: Option<String>,

    /// Maximum tokens for generator responses
    pub max_tokens: Option<u32>,

    /// Temperature for generator responses (0.0 to 1.0)
    pub temperature: Option<f32>,

    /// Default detail level when the command line does not choose one
    pub detail_level: DetailLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Maximum file size to process (in bytes)
    pub max_file_size: usize,

    /// Honour .gitignore files while walking directories
    pub respect_gitignore: bool,

    /// Descend into hidden files and directories
    pub include_hidden: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: Some(4096),
            temperature: Some(0.2),
            detail_level: DetailLevel::Concise,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024, // 1MB
            respect_gitignore: true,
            include_hidden: false,
        }
    }
}

impl GenerationConfig {
    /// Environment variable holding the key for the configured provider
    pub fn api_key_env_var(&self) -> &'static str {
        match self.provider.as_str() {
            "openai" => "OPENAI_API_KEY",
            _ => "ANTHROPIC_API_KEY",
        }
    }

    /// Fill a missing API key from the environment
    pub fn resolve_api_key(&mut self) {
        self.resolve_api_key_with(|name| std::env::var(name).ok());
    }

    fn resolve_api_key_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.as_deref().map_or(true, |key| key.trim().is_empty()) {
            self.api_key = lookup(self.api_key_env_var()).filter(|key| !key.trim().is_empty());
        }
    }

    /// Masked key suitable for log output
    pub fn api_key_status(&self) -> String {
        match &self.api_key {
            Some(key) if key.chars().count() > 12 => {
                let chars: Vec<char> = key.chars().collect();
                let head: String = chars[..8].iter().collect();
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("configured ({}...{})", head, tail)
            }
            Some(_) => "configured".to_string(),
            None => "not configured".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| DocstampError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DocstampError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Err(DocstampError::Config(format!(
                        "Configuration file not found: {}",
                        p.as_ref().display()
                    )))
                }
            }
            None => {
                for candidate in CONFIG_CANDIDATES {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}

/// Config file names looked up in the working directory
pub const CONFIG_CANDIDATES: [&str; 3] = ["Docstamp.toml", "docstamp.toml", ".docstamp.toml"];
