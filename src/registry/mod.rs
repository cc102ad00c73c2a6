//! Model registry: the static table of available LLM backends.
//!
//! Loaded once at process start and shared read-only behind an `Arc`;
//! nothing here mutates after construction, so concurrent requests need
//! no locking. The router consumes [`ModelRegistry::models_for`] to walk
//! its escalation ladder.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::TaskKind;

/// Fatal configuration problems, detected at registry construction
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigurationError {
    /// No registered model is suitable for a task kind
    #[error("No model registered for task: {0}")]
    NoModelForTask(&'static str),

    /// Two descriptors share the same identifier
    #[error("Duplicate model identifier: {0}")]
    DuplicateModel(String),
}

/// Coarse ranking of a model's reasoning capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Mid,
    High,
}

/// A single available model and its routing-relevant properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    /// Provider-prefixed identifier, e.g. "openai/gpt-4o-mini"
    pub identifier: String,

    /// Cost in USD per million input tokens
    pub input_cost_per_mtok: f64,

    /// Cost in USD per million output tokens
    pub output_cost_per_mtok: f64,

    /// Quality tier used for escalation decisions
    pub tier: QualityTier,

    /// Task kinds this model is approved for
    pub tasks: Vec<TaskKind>,
}

impl ModelDescriptor {
    /// Whether this model is approved for the given task
    pub fn supports(&self, kind: TaskKind) -> bool {
        self.tasks.contains(&kind)
    }

    /// Blended per-token rate used for intra-tier ordering.
    /// Assumes the usual 80% input / 20% output split for these tasks.
    pub fn blended_cost_per_mtok(&self) -> f64 {
        self.input_cost_per_mtok * 0.8 + self.output_cost_per_mtok * 0.2
    }

    /// Estimate the cost of a single call in USD
    pub fn estimate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (input_tokens as f64 * self.input_cost_per_mtok
            + output_tokens as f64 * self.output_cost_per_mtok)
            / 1_000_000.0
    }
}

/// Static model table, validated at construction
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    /// Build a registry from descriptors.
    ///
    /// Fails if any identifier is duplicated or any task kind has no
    /// suitable model. Both are startup-time conditions, never per-request.
    pub fn new(models: Vec<ModelDescriptor>) -> Result<Self, ConfigurationError> {
        for (i, model) in models.iter().enumerate() {
            if models[..i].iter().any(|m| m.identifier == model.identifier) {
                return Err(ConfigurationError::DuplicateModel(model.identifier.clone()));
            }
        }

        for kind in [TaskKind::Summarize, TaskKind::ClassifyFolder] {
            if !models.iter().any(|m| m.supports(kind)) {
                return Err(ConfigurationError::NoModelForTask(kind.as_str()));
            }
        }

        Ok(Self { models })
    }

    /// Default model table spanning all three quality tiers
    pub fn builtin() -> Self {
        let both = vec![TaskKind::Summarize, TaskKind::ClassifyFolder];
        Self::new(vec![
            ModelDescriptor {
                identifier: "openai/gpt-4o-mini".to_string(),
                input_cost_per_mtok: 0.15,
                output_cost_per_mtok: 0.60,
                tier: QualityTier::Low,
                tasks: both.clone(),
            },
            ModelDescriptor {
                identifier: "anthropic/claude-haiku-4-5".to_string(),
                input_cost_per_mtok: 1.00,
                output_cost_per_mtok: 5.00,
                tier: QualityTier::Low,
                tasks: both.clone(),
            },
            ModelDescriptor {
                identifier: "openai/gpt-4o".to_string(),
                input_cost_per_mtok: 2.50,
                output_cost_per_mtok: 10.00,
                tier: QualityTier::Mid,
                tasks: both.clone(),
            },
            ModelDescriptor {
                identifier: "anthropic/claude-sonnet-4-5".to_string(),
                input_cost_per_mtok: 3.00,
                output_cost_per_mtok: 15.00,
                tier: QualityTier::Mid,
                tasks: both.clone(),
            },
            ModelDescriptor {
                identifier: "anthropic/claude-opus-4-1".to_string(),
                input_cost_per_mtok: 15.00,
                output_cost_per_mtok: 75.00,
                tier: QualityTier::High,
                tasks: both,
            },
        ])
        .expect("builtin registry is well-formed")
    }

    /// Models suitable for a task, ordered ascending by tier and then by
    /// blended cost within a tier
    pub fn models_for(&self, kind: TaskKind) -> Vec<&ModelDescriptor> {
        let mut suitable: Vec<&ModelDescriptor> =
            self.models.iter().filter(|m| m.supports(kind)).collect();
        suitable.sort_by(|a, b| {
            a.tier.cmp(&b.tier).then(
                a.blended_cost_per_mtok()
                    .partial_cmp(&b.blended_cost_per_mtok())
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });
        suitable
    }

    /// Look up a descriptor by identifier
    pub fn get(&self, identifier: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.identifier == identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str, tier: QualityTier, input: f64, output: f64) -> ModelDescriptor {
        ModelDescriptor {
            identifier: id.to_string(),
            input_cost_per_mtok: input,
            output_cost_per_mtok: output,
            tier,
            tasks: vec![TaskKind::Summarize, TaskKind::ClassifyFolder],
        }
    }

    #[test]
    fn test_models_for_ordering() {
        let registry = ModelRegistry::new(vec![
            descriptor("expensive-mid", QualityTier::Mid, 5.0, 20.0),
            descriptor("high", QualityTier::High, 10.0, 40.0),
            descriptor("cheap-mid", QualityTier::Mid, 1.0, 4.0),
            descriptor("low", QualityTier::Low, 0.1, 0.4),
        ])
        .unwrap();

        let ordered: Vec<&str> = registry
            .models_for(TaskKind::Summarize)
            .iter()
            .map(|m| m.identifier.as_str())
            .collect();
        assert_eq!(ordered, vec!["low", "cheap-mid", "expensive-mid", "high"]);
    }

    #[test]
    fn test_suitability_filter() {
        let mut summarize_only = descriptor("summarizer", QualityTier::Low, 0.1, 0.4);
        summarize_only.tasks = vec![TaskKind::Summarize];
        let registry = ModelRegistry::new(vec![
            summarize_only,
            descriptor("generalist", QualityTier::Mid, 1.0, 4.0),
        ])
        .unwrap();

        let classify = registry.models_for(TaskKind::ClassifyFolder);
        assert_eq!(classify.len(), 1);
        assert_eq!(classify[0].identifier, "generalist");
    }

    #[test]
    fn test_missing_task_is_configuration_error() {
        let mut summarize_only = descriptor("summarizer", QualityTier::Low, 0.1, 0.4);
        summarize_only.tasks = vec![TaskKind::Summarize];

        let err = ModelRegistry::new(vec![summarize_only]).unwrap_err();
        assert_eq!(err, ConfigurationError::NoModelForTask("classify_folder"));
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let err = ModelRegistry::new(vec![
            descriptor("same", QualityTier::Low, 0.1, 0.4),
            descriptor("same", QualityTier::Mid, 1.0, 4.0),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateModel("same".to_string()));
    }

    #[test]
    fn test_builtin_registry_covers_both_tasks() {
        let registry = ModelRegistry::builtin();
        assert!(!registry.models_for(TaskKind::Summarize).is_empty());
        assert!(!registry.models_for(TaskKind::ClassifyFolder).is_empty());
    }

    #[test]
    fn test_cost_estimate() {
        let model = descriptor("m", QualityTier::Low, 2.0, 10.0);
        // 1M input + 100k output = $2.00 + $1.00
        let cost = model.estimate_cost(1_000_000, 100_000);
        assert!((cost - 3.0).abs() < 1e-9);
    }
}
