use crate::services::providers::gemini::GEMINI_API_BASE;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default seconds between two status checks of a video operation.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 20;

/// Default ceiling on the cumulative wait for a video operation.
const DEFAULT_POLL_CEILING_SECS: u64 = 600;

/// Default cap on uploaded image size (16MB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct GenmediaConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub provider: ProviderConfig,
    pub models: ModelConfig,
    pub storage: StorageConfig,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Fallback credential used when a request carries no `X-API-Key`.
    pub api_key: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Model for prompt optimization, plans and image Q&A (e.g., gemini-2.0-flash)
    pub text_model: String,
    /// Model for long-running video generation (e.g., veo-2.0-generate-001)
    pub video_model: String,
    /// Model for preview stills (e.g., imagen-3.0-generate-002)
    pub image_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory generated videos and previews are written to.
    pub generated_dir: PathBuf,
    /// Directory uploaded images are kept in.
    pub upload_dir: PathBuf,
    /// Root that project-relative image paths are resolved against.
    pub project_root: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub ceiling_secs: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn ceiling(&self) -> Duration {
        Duration::from_secs(self.ceiling_secs)
    }
}

impl GenmediaConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let provider_kind = get_env("GENMEDIA_PROVIDER", Some("gemini"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let polling = PollingConfig {
            interval_secs: parse_env(
                "GENMEDIA_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
                is_prod,
            )?,
            ceiling_secs: parse_env(
                "GENMEDIA_POLL_CEILING_SECS",
                DEFAULT_POLL_CEILING_SECS,
                is_prod,
            )?,
        };
        if polling.interval_secs == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GENMEDIA_POLL_INTERVAL_SECS must be greater than zero"
            )));
        }

        Ok(GenmediaConfig {
            common: common_config,
            provider: ProviderConfig {
                kind: provider_kind,
                api_key: env::var("GOOGLE_API_KEY").ok().filter(|k| !k.is_empty()),
                api_base: get_env("GEMINI_API_BASE", Some(GEMINI_API_BASE), is_prod)?,
            },
            models: ModelConfig {
                text_model: get_env("GENMEDIA_TEXT_MODEL", Some("gemini-2.0-flash"), is_prod)?,
                video_model: get_env(
                    "GENMEDIA_VIDEO_MODEL",
                    Some("veo-2.0-generate-001"),
                    is_prod,
                )?,
                image_model: get_env(
                    "GENMEDIA_IMAGE_MODEL",
                    Some("imagen-3.0-generate-002"),
                    is_prod,
                )?,
            },
            storage: StorageConfig {
                generated_dir: get_env(
                    "STORAGE_GENERATED_DIR",
                    Some("storage/generated"),
                    is_prod,
                )?
                .into(),
                upload_dir: get_env("STORAGE_UPLOAD_DIR", Some("storage/uploads"), is_prod)?
                    .into(),
                project_root: get_env("PROJECT_ROOT", Some("."), is_prod)?.into(),
                max_upload_bytes: parse_env(
                    "STORAGE_MAX_UPLOAD_BYTES",
                    DEFAULT_MAX_UPLOAD_BYTES,
                    is_prod,
                )?,
            },
            polling,
        })
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "mock" => Ok(ProviderKind::Mock),
            _ => Err(format!("Invalid provider: {}", s)),
        }
    }
}

fn parse_env<T>(key: &str, default: T, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr + ToString,
{
    let raw = get_env(key, Some(&default.to_string()), is_prod)?;
    raw.parse().map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, raw))
    })
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod && default.is_none() {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
