use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::dataset::{DEFAULT_PREVIEW_ROWS, MAX_PREVIEW_ROWS};
use crate::export::layout::{A4_HEIGHT_PT, A4_WIDTH_PT, DEFAULT_MARGIN_PT};
use crate::types::GenerationParams;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub pipeline: PipelineConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    /// Idle sessions older than this are dropped; 0 keeps them forever
    pub session_ttl_secs: u64,
    pub session_sweep_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
            max_upload_bytes: 25 * 1024 * 1024,
            session_ttl_secs: 3600,
            session_sweep_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub hypothesis_model: String,
    pub paper_model: String,
    pub temperature: f32,
    pub hypothesis_max_tokens: u32,
    pub paper_max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            api_key: String::new(),
            base_url: None,
            hypothesis_model: "llama3-70b-8192".to_string(),
            paper_model: "llama3-8b-8192".to_string(),
            temperature: 0.7,
            hypothesis_max_tokens: 2000,
            paper_max_tokens: 3000,
            timeout_secs: 120,
        }
    }
}

impl LLMConfig {
    /// Parameters for the hypothesis stage
    pub fn hypothesis_params(&self) -> GenerationParams {
        GenerationParams {
            model: self.hypothesis_model.clone(),
            temperature: self.temperature,
            max_tokens: self.hypothesis_max_tokens,
        }
    }

    /// Parameters shared by paper generation and revisions
    pub fn paper_params(&self) -> GenerationParams {
        GenerationParams {
            model: self.paper_model.clone(),
            temperature: self.temperature,
            max_tokens: self.paper_max_tokens,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of leading records embedded in prompts
    pub preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH_PT,
            page_height: A4_HEIGHT_PT,
            margin: DEFAULT_MARGIN_PT,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let provider = env::var("LLM_PROVIDER").unwrap_or(defaults.llm.provider);
        let api_key = env::var("LLM_API_KEY")
            .or_else(|_| match provider.as_str() {
                "groq" => env::var("GROQ_API_KEY"),
                _ => env::var("OPENAI_API_KEY"),
            })
            .unwrap_or_default();

        Ok(Self {
            server: ServerConfig {
                port: parse_var("PORT", defaults.server.port)?,
                host: env::var("HOST").unwrap_or(defaults.server.host),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or(defaults.server.cors_allowed_origins),
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.server.max_upload_bytes)?,
                session_ttl_secs: parse_var("SESSION_TTL_SECS", defaults.server.session_ttl_secs)?,
                session_sweep_secs: parse_var("SESSION_SWEEP_SECS", defaults.server.session_sweep_secs)?
                    .max(1),
            },
            llm: LLMConfig {
                provider,
                api_key,
                base_url: env::var("LLM_BASE_URL").ok().filter(|s| !s.trim().is_empty()),
                hypothesis_model: env::var("HYPOTHESIS_MODEL")
                    .unwrap_or(defaults.llm.hypothesis_model),
                paper_model: env::var("PAPER_MODEL").unwrap_or(defaults.llm.paper_model),
                temperature: parse_var("LLM_TEMPERATURE", defaults.llm.temperature)?,
                hypothesis_max_tokens: parse_var(
                    "HYPOTHESIS_MAX_TOKENS",
                    defaults.llm.hypothesis_max_tokens,
                )?,
                paper_max_tokens: parse_var("PAPER_MAX_TOKENS", defaults.llm.paper_max_tokens)?,
                timeout_secs: parse_var("LLM_TIMEOUT_SECS", defaults.llm.timeout_secs)?,
            },
            pipeline: PipelineConfig {
                preview_rows: parse_var("PREVIEW_ROWS", defaults.pipeline.preview_rows)?
                    .clamp(1, MAX_PREVIEW_ROWS),
            },
            export: ExportConfig {
                page_width: parse_var("PAGE_WIDTH_PT", defaults.export.page_width)?,
                page_height: parse_var("PAGE_HEIGHT_PT", defaults.export.page_height)?,
                margin: parse_var("PAGE_MARGIN_PT", defaults.export.margin)?,
            },
            logging: LoggingConfig {
                log_dir: env::var("LOG_DIR").ok().filter(|s| !s.trim().is_empty()),
            },
        })
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
