//! Provider router: picks which model serves each attempt.
//!
//! The router is a stateless function of the static registry plus the
//! request-local failure history the orchestrator carries. Policy:
//!
//! - Attempt 0 uses the cheapest Mid-or-higher model suitable for the task.
//! - After a structured-output defect the same model is retried exactly
//!   once (transient generation noise), then the ladder escalates to the
//!   next quality tier.
//! - After a transport failure the router rotates to a different model in
//!   the same or a lower tier, since a provider outage is not a quality problem.
//!
//! Once the attempt budget is spent, or no model remains that honors the
//! rotation rules, the router signals [`RouterError::LadderExhausted`].

use std::sync::Arc;

use thiserror::Error;

use crate::registry::{ModelDescriptor, ModelRegistry, QualityTier};
use crate::schema::TaskKind;

/// Default maximum number of attempts per request
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Coarse failure categories the routing policy reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Timeout, rate limit, or provider error reported by the transport
    Transport,
    /// Malformed/incomplete structured output, including an unresolvable
    /// folder reference
    StructuredOutput,
}

/// One failed attempt, as the orchestrator records it for routing
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    /// Identifier of the model that served the failed attempt
    pub model: String,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RouterError {
    /// No further model to offer: budget spent or rotation impossible
    #[error("Model ladder exhausted after {attempts} attempts")]
    LadderExhausted { attempts: usize },
}

/// Stateless model selector over a shared registry
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<ModelRegistry>,
    max_attempts: usize,
}

impl Router {
    pub fn new(registry: Arc<ModelRegistry>, max_attempts: usize) -> Self {
        Self {
            registry,
            max_attempts,
        }
    }

    /// Select the model for `attempt_index`, given every prior failure of
    /// this request in order.
    pub fn select_model(
        &self,
        kind: TaskKind,
        attempt_index: usize,
        previous_failures: &[AttemptFailure],
    ) -> Result<ModelDescriptor, RouterError> {
        if attempt_index >= self.max_attempts {
            return Err(RouterError::LadderExhausted {
                attempts: attempt_index,
            });
        }

        let ladder = self.registry.models_for(kind);

        if attempt_index == 0 || previous_failures.is_empty() {
            return Ok(Self::first_choice(&ladder).clone());
        }

        let last = &previous_failures[previous_failures.len() - 1];
        let current = ladder
            .iter()
            .position(|m| m.identifier == last.model)
            // Model vanished from the table mid-request; restart the ladder.
            .unwrap_or(0);

        let selected = match last.kind {
            FailureKind::StructuredOutput => {
                let repeated = previous_failures.len() >= 2
                    && previous_failures[previous_failures.len() - 2].model == last.model;
                if repeated {
                    Self::escalate(&ladder, current)
                } else {
                    // One noise retry on the same model
                    Some(ladder[current])
                }
            }
            FailureKind::Transport => Self::rotate(&ladder, current),
        };

        match selected {
            Some(model) => {
                tracing::debug!(
                    "[Router] attempt {} for {} -> {}",
                    attempt_index,
                    kind.as_str(),
                    model.identifier
                );
                Ok(model.clone())
            }
            None => Err(RouterError::LadderExhausted {
                attempts: attempt_index,
            }),
        }
    }

    /// Cheapest Mid-or-higher model, falling back to the cheapest overall
    /// when the table only carries Low-tier models for this task.
    fn first_choice<'a>(ladder: &[&'a ModelDescriptor]) -> &'a ModelDescriptor {
        ladder
            .iter()
            .find(|m| m.tier >= QualityTier::Mid)
            .copied()
            .unwrap_or(ladder[0])
    }

    /// Cheapest model in the next tier up; if the current tier is already
    /// the top, a different model within the same tier.
    fn escalate<'a>(ladder: &[&'a ModelDescriptor], current: usize) -> Option<&'a ModelDescriptor> {
        let tier = ladder[current].tier;
        ladder
            .iter()
            .find(|m| m.tier > tier)
            .or_else(|| {
                ladder
                    .iter()
                    .find(|m| m.tier == tier && m.identifier != ladder[current].identifier)
            })
            .copied()
    }

    /// Next model in the same-or-lower tier sub-ladder, never the one that
    /// just failed.
    fn rotate<'a>(ladder: &[&'a ModelDescriptor], current: usize) -> Option<&'a ModelDescriptor> {
        let tier = ladder[current].tier;
        let sub: Vec<&'a ModelDescriptor> = ladder
            .iter()
            .filter(|m| m.tier <= tier)
            .copied()
            .collect();
        let pos = sub
            .iter()
            .position(|m| m.identifier == ladder[current].identifier)?;

        if sub.len() > 1 {
            return Some(sub[(pos + 1) % sub.len()]);
        }

        // Nothing else at or below this tier; a higher-tier model still
        // beats re-hitting a failing provider.
        ladder
            .iter()
            .find(|m| m.identifier != ladder[current].identifier)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<ModelRegistry> {
        let both = vec![TaskKind::Summarize, TaskKind::ClassifyFolder];
        Arc::new(
            ModelRegistry::new(vec![
                ModelDescriptor {
                    identifier: "low-a".to_string(),
                    input_cost_per_mtok: 0.1,
                    output_cost_per_mtok: 0.4,
                    tier: QualityTier::Low,
                    tasks: both.clone(),
                },
                ModelDescriptor {
                    identifier: "mid-cheap".to_string(),
                    input_cost_per_mtok: 1.0,
                    output_cost_per_mtok: 4.0,
                    tier: QualityTier::Mid,
                    tasks: both.clone(),
                },
                ModelDescriptor {
                    identifier: "mid-pricey".to_string(),
                    input_cost_per_mtok: 3.0,
                    output_cost_per_mtok: 12.0,
                    tier: QualityTier::Mid,
                    tasks: both.clone(),
                },
                ModelDescriptor {
                    identifier: "high".to_string(),
                    input_cost_per_mtok: 10.0,
                    output_cost_per_mtok: 40.0,
                    tier: QualityTier::High,
                    tasks: both,
                },
            ])
            .unwrap(),
        )
    }

    fn failure(model: &str, kind: FailureKind) -> AttemptFailure {
        AttemptFailure {
            model: model.to_string(),
            kind,
        }
    }

    #[test]
    fn test_first_attempt_uses_cheapest_mid_tier() {
        let router = Router::new(registry(), 3);
        let model = router
            .select_model(TaskKind::Summarize, 0, &[])
            .unwrap();
        assert_eq!(model.identifier, "mid-cheap");
    }

    #[test]
    fn test_validation_defect_retries_same_model_once() {
        let router = Router::new(registry(), 3);
        let failures = vec![failure("mid-cheap", FailureKind::StructuredOutput)];
        let model = router
            .select_model(TaskKind::Summarize, 1, &failures)
            .unwrap();
        assert_eq!(model.identifier, "mid-cheap");
    }

    #[test]
    fn test_repeated_validation_defect_escalates_tier() {
        let router = Router::new(registry(), 3);
        let failures = vec![
            failure("mid-cheap", FailureKind::StructuredOutput),
            failure("mid-cheap", FailureKind::StructuredOutput),
        ];
        let model = router
            .select_model(TaskKind::Summarize, 2, &failures)
            .unwrap();
        assert_eq!(model.identifier, "high");
    }

    #[test]
    fn test_transport_failure_never_repeats_model() {
        let router = Router::new(registry(), 3);
        let failures = vec![failure("mid-cheap", FailureKind::Transport)];
        let model = router
            .select_model(TaskKind::Summarize, 1, &failures)
            .unwrap();
        assert_ne!(model.identifier, "mid-cheap");
        // Rotation stays at or below the failing tier
        assert!(model.tier <= QualityTier::Mid);
    }

    #[test]
    fn test_transport_then_validation_sequence() {
        let router = Router::new(registry(), 4);
        // Truncated JSON on attempt 0 -> retry same model
        let mut failures = vec![failure("mid-cheap", FailureKind::StructuredOutput)];
        let second = router
            .select_model(TaskKind::ClassifyFolder, 1, &failures)
            .unwrap();
        assert_eq!(second.identifier, "mid-cheap");

        // Missing field on attempt 1 -> escalate past the noisy model
        failures.push(failure("mid-cheap", FailureKind::StructuredOutput));
        let third = router
            .select_model(TaskKind::ClassifyFolder, 2, &failures)
            .unwrap();
        assert_eq!(third.tier, QualityTier::High);
    }

    #[test]
    fn test_budget_exhaustion() {
        let router = Router::new(registry(), 3);
        let err = router
            .select_model(TaskKind::Summarize, 3, &[])
            .unwrap_err();
        assert_eq!(err, RouterError::LadderExhausted { attempts: 3 });
    }

    #[test]
    fn test_escalation_at_top_tier_moves_sideways_or_exhausts() {
        let router = Router::new(registry(), 5);
        let failures = vec![
            failure("high", FailureKind::StructuredOutput),
            failure("high", FailureKind::StructuredOutput),
        ];
        // No tier above High and no sibling in High: nothing left to offer
        let err = router
            .select_model(TaskKind::Summarize, 2, &failures)
            .unwrap_err();
        assert!(matches!(err, RouterError::LadderExhausted { .. }));
    }
}
