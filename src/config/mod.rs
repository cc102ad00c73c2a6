//! Pipeline configuration.
//!
//! Everything tunable in one place, loadable from the environment (a
//! `.env` file is honored). Unset variables keep their defaults, so a
//! bare `SEARCHMARK_LLM_API_KEY` is enough to run.

use std::str::FromStr;
use std::time::Duration;

use crate::folder::ResolverConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::transport::{HttpTransportConfig, TransportError};

/// Aggregate configuration for one pipeline instance
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub orchestrator: OrchestratorConfig,
    pub resolver: ResolverConfig,
    pub transport: HttpTransportConfig,
}

impl PipelineConfig {
    /// Load from the environment.
    ///
    /// Recognized variables:
    /// - `SEARCHMARK_LLM_API_KEY` / `OPENAI_API_KEY` / `LLM_API_KEY`
    /// - `SEARCHMARK_LLM_BASE_URL`
    /// - `SEARCHMARK_MAX_ATTEMPTS`
    /// - `SEARCHMARK_ATTEMPT_TIMEOUT_SECS`
    /// - `SEARCHMARK_FUZZY_THRESHOLD`, `SEARCHMARK_FUZZY_MARGIN`
    pub fn from_env() -> Result<Self, TransportError> {
        dotenvy::dotenv().ok();

        let mut config = Self {
            transport: HttpTransportConfig::from_env()?,
            ..Default::default()
        };

        if let Some(attempts) = env_parse::<usize>("SEARCHMARK_MAX_ATTEMPTS") {
            config.orchestrator.max_attempts = attempts.max(1);
        }
        if let Some(secs) = env_parse::<u64>("SEARCHMARK_ATTEMPT_TIMEOUT_SECS") {
            config.orchestrator.attempt_timeout = Duration::from_secs(secs);
        }
        if let Some(threshold) = env_parse::<f64>("SEARCHMARK_FUZZY_THRESHOLD") {
            config.resolver.acceptance_threshold = threshold;
        }
        if let Some(margin) = env_parse::<f64>("SEARCHMARK_FUZZY_MARGIN") {
            config.resolver.ambiguity_margin = margin;
        }

        Ok(config)
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}
