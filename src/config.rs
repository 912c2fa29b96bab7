//! YAML configuration with embedded defaults and environment overrides.

use crate::generation::{GenerationSettings, RetryPolicy, DEFAULT_MODEL};
use crate::stream::{WireLog, DEFAULT_MAX_BUFFER_BYTES, WIRE_LOG_ENV};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const MODEL_ENV: &str = "GEMINI_MODEL";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EchoForgeConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Text model the session is generated with; recorded in session logs.
    #[serde(default = "default_model_name")]
    pub name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
        }
    }
}

fn default_model_name() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Episodes requested per sub-request; never more than the total.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Most recent episodes summarized in each follow-up prompt.
    #[serde(default = "default_max_recaps")]
    pub max_recaps: usize,
    #[serde(default = "default_max_frame_buffer_bytes")]
    pub max_frame_buffer_bytes: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_recaps: default_max_recaps(),
            max_frame_buffer_bytes: default_max_frame_buffer_bytes(),
        }
    }
}

fn default_batch_size() -> u32 {
    2
}

fn default_max_recaps() -> usize {
    6
}

fn default_max_frame_buffer_bytes() -> usize {
    DEFAULT_MAX_BUFFER_BYTES
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter_fraction")]
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_fraction: default_jitter_fraction(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    300
}

fn default_max_delay_ms() -> u64 {
    4_000
}

fn default_jitter_fraction() -> f64 {
    0.2
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AutosaveConfig {
    #[serde(default = "default_autosave_delay_ms")]
    pub delay_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_autosave_delay_ms(),
        }
    }
}

fn default_autosave_delay_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Trace every upstream SSE payload (clipped).
    #[serde(default)]
    pub log_wire_payloads: bool,
}

impl EchoForgeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file as YAML: {}", path.display()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// The embedded `echoforge.yaml`, with environment overrides applied.
    pub fn default_config() -> Result<Self> {
        const DEFAULT_CONFIG_YAML: &str = include_str!("../echoforge.yaml");

        let mut config: Self = serde_yaml::from_str(DEFAULT_CONFIG_YAML)
            .context("Failed to parse embedded echoforge.yaml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(model) = env_value(MODEL_ENV) {
            self.model.name = model;
        }
        if let Some(flag) = env_value(WIRE_LOG_ENV) {
            self.logging.log_wire_payloads = flag == "1" || flag.eq_ignore_ascii_case("true");
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.generation.batch_size == 0 {
            anyhow::bail!("generation.batch_size must be at least 1");
        }
        if self.generation.max_frame_buffer_bytes == 0 {
            anyhow::bail!("generation.max_frame_buffer_bytes must be positive");
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_fraction) {
            anyhow::bail!(
                "retry.jitter_fraction must be between 0 and 1, got {}",
                self.retry.jitter_fraction
            );
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            anyhow::bail!(
                "retry.max_delay_ms ({}) is below retry.base_delay_ms ({})",
                self.retry.max_delay_ms,
                self.retry.base_delay_ms
            );
        }
        Ok(())
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.model.name.clone(),
            batch_size: self.generation.batch_size,
            max_recaps: self.generation.max_recaps,
            max_frame_buffer_bytes: self.generation.max_frame_buffer_bytes,
            wire_log: WireLog::new(self.logging.log_wire_payloads),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
            self.retry.jitter_fraction,
        )
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave.delay_ms)
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
