//! Inference orchestrator: the per-request state machine.
//!
//! One orchestrator run handles one task request end to end:
//!
//! ```text
//! Pending -> AwaitingModel -> Validating -> (Resolving) -> Succeeded
//!                ^                                |
//!                '----------- Retrying <---------'
//!                                 |
//!                              Failed
//! ```
//!
//! The run owns the attempt budget, the per-attempt timeout, the attempt
//! log, and cost accounting. Attempt state (index plus failure history) is
//! request-local and flows through each transition; nothing is shared
//! between concurrent runs except the read-only registry. The async entry
//! points are the submit-and-await hook an external concurrency limiter
//! wraps; the external model call is the only suspension point.

pub mod pipeline;

pub use pipeline::{ClassifiedBookmark, Pipeline, PipelineError};

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::folder::{FolderResolver, FolderTree, ResolutionFailure, ResolverConfig};
use crate::prompts::{self, PageContent};
use crate::registry::{ModelDescriptor, ModelRegistry};
use crate::router::{AttemptFailure, FailureKind, Router, RouterError, DEFAULT_MAX_ATTEMPTS};
use crate::schema::{FolderDecision, Summary, TaskKind};
use crate::telemetry::{TelemetrySink, TracingSink};
use crate::transport::{InvokeRequest, LlmTransport, RawResponse, TokenUsage, TransportError};
use crate::validator::{self, ValidationDefect};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Attempt budget per request
    pub max_attempts: usize,

    /// Hard bound on one provider call; a timeout consumes an attempt
    pub attempt_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: Duration::from_secs(60),
        }
    }
}

/// What one attempt ended as
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Success,
    Transport(String),
    Validation(ValidationDefect),
    Resolution(ResolutionFailure),
}

impl AttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Transport(_) => "transport_error",
            Self::Validation(_) => "validation_defect",
            Self::Resolution(_) => "resolution_failure",
        }
    }

    /// Routing category, None for successes
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success => None,
            Self::Transport(_) => Some(FailureKind::Transport),
            Self::Validation(_) | Self::Resolution(_) => Some(FailureKind::StructuredOutput),
        }
    }
}

/// Diagnostic record of a single attempt
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// Identifier of the model that served the attempt
    pub model: String,
    /// Raw model output, absent when the transport failed
    pub raw_output: Option<String>,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
    pub estimated_cost_usd: f64,
}

/// Terminal failure taxonomy. The variant mirrors the LAST attempt's
/// failure category, so callers can tell a flaky provider from a model
/// that cannot produce the schema.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TerminalFailure {
    #[error("Provider attempts exhausted after {attempts} attempts")]
    ProviderExhausted { attempts: usize },

    #[error("Validation attempts exhausted after {attempts} attempts")]
    ValidationExhausted { attempts: usize },

    #[error("Model ladder exhausted, no further model to offer")]
    LadderExhausted,
}

/// Full diagnostics of one orchestrator run, success or failure
#[derive(Debug, Clone)]
pub struct RequestReport {
    pub request_id: Uuid,
    pub task: TaskKind,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub attempts: Vec<AttemptRecord>,
    /// Estimated spend across ALL attempts, failed ones included
    pub total_cost_usd: f64,
}

impl RequestReport {
    fn new(
        request_id: Uuid,
        task: TaskKind,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        let total_cost_usd = attempts.iter().map(|a| a.estimated_cost_usd).sum();
        Self {
            request_id,
            task,
            started_at,
            elapsed_ms: elapsed.as_millis() as u64,
            attempts,
            total_cost_usd,
        }
    }
}

/// Terminal error crossing the API boundary: the taxonomy plus the full
/// attempt log, so failed requests are still billable and debuggable.
#[derive(Debug, Clone, Error)]
#[error("{failure}")]
pub struct RequestFailure {
    pub failure: TerminalFailure,
    pub report: RequestReport,
}

/// Successful summarize run
#[derive(Debug, Clone)]
pub struct SummarizeOutcome {
    pub summary: Summary,
    pub report: RequestReport,
}

/// Successful classify run, resolved against the caller's tree
#[derive(Debug, Clone)]
pub struct ClassifyOutcome {
    /// Identifier of the resolved folder node
    pub folder_id: String,
    /// Root-to-node display path of the resolved node
    pub folder_path: String,
    pub decision: FolderDecision,
    pub report: RequestReport,
}

/// Schema-level attempt defects, from validation or resolution
enum AttemptDefect {
    Validation(ValidationDefect),
    Resolution {
        reference: String,
        failure: ResolutionFailure,
    },
}

/// Per-request coordinator of router, validator, and resolver
pub struct InferenceOrchestrator {
    registry: Arc<ModelRegistry>,
    transport: Arc<dyn LlmTransport>,
    telemetry: Arc<dyn TelemetrySink>,
    resolver: FolderResolver,
    config: OrchestratorConfig,
}

impl InferenceOrchestrator {
    pub fn new(registry: Arc<ModelRegistry>, transport: Arc<dyn LlmTransport>) -> Self {
        Self {
            registry,
            transport,
            telemetry: Arc::new(TracingSink),
            resolver: FolderResolver::default(),
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_resolver(mut self, config: ResolverConfig) -> Self {
        self.resolver = FolderResolver::new(config);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Produce a structured summary for a page.
    pub async fn summarize(&self, page: &PageContent) -> Result<SummarizeOutcome, RequestFailure> {
        let (summary, report) = self
            .run_attempts(
                TaskKind::Summarize,
                |model, _note| InvokeRequest {
                    model: model.identifier.clone(),
                    system_prompt: prompts::SUMMARIZE_SYSTEM_PROMPT.to_string(),
                    user_prompt: prompts::build_summarize_prompt(page),
                    max_tokens: prompts::SUMMARIZE_MAX_TOKENS,
                },
                |raw| validator::validate_summary(raw).map_err(AttemptDefect::Validation),
            )
            .await?;

        Ok(SummarizeOutcome { summary, report })
    }

    /// Recommend a folder for a page and resolve it against `tree`.
    ///
    /// `summary` is the analysis of an earlier summarize pass, when one
    /// ran. With `allow_new_folder`, the model may additionally propose a
    /// new child-folder name; the recommended parent is still resolved
    /// against the tree and nothing is created.
    pub async fn classify(
        &self,
        page: &PageContent,
        summary: Option<&Summary>,
        tree: &FolderTree,
        allow_new_folder: bool,
    ) -> Result<ClassifyOutcome, RequestFailure> {
        let system_prompt = if allow_new_folder {
            prompts::CLASSIFY_NEW_FOLDER_SYSTEM_PROMPT
        } else {
            prompts::CLASSIFY_SYSTEM_PROMPT
        };
        let resolver = &self.resolver;

        let (resolved, report) = self
            .run_attempts(
                TaskKind::ClassifyFolder,
                |model, note| InvokeRequest {
                    model: model.identifier.clone(),
                    system_prompt: system_prompt.to_string(),
                    user_prompt: prompts::build_classify_prompt(page, summary, tree, note),
                    max_tokens: prompts::CLASSIFY_MAX_TOKENS,
                },
                |raw| {
                    let decision =
                        validator::validate_folder_decision(raw).map_err(AttemptDefect::Validation)?;
                    match resolver.resolve(&decision.recommended_folder, tree) {
                        Ok(node) => {
                            let folder_path = tree
                                .path(&node.id)
                                .unwrap_or(node.name.as_str())
                                .to_string();
                            Ok((node.id.clone(), folder_path, decision))
                        }
                        Err(failure) => Err(AttemptDefect::Resolution {
                            reference: decision.recommended_folder.clone(),
                            failure,
                        }),
                    }
                },
            )
            .await?;

        let (folder_id, folder_path, decision) = resolved;
        Ok(ClassifyOutcome {
            folder_id,
            folder_path,
            decision,
            report,
        })
    }

    /// The retry loop shared by both tasks.
    ///
    /// `build` constructs the invocation for a chosen model (with an
    /// optional corrective note from a failed resolution); `interpret`
    /// turns raw text into the task's value or a classified defect.
    async fn run_attempts<T, B, I>(
        &self,
        kind: TaskKind,
        build: B,
        interpret: I,
    ) -> Result<(T, RequestReport), RequestFailure>
    where
        B: Fn(&ModelDescriptor, Option<&str>) -> InvokeRequest + Send + Sync,
        I: Fn(&str) -> Result<T, AttemptDefect> + Send + Sync,
        T: Send,
    {
        let request_id = Uuid::new_v4();
        let started_at = Utc::now();
        let run_start = Instant::now();
        let router = Router::new(self.registry.clone(), self.config.max_attempts);

        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut failures: Vec<AttemptFailure> = Vec::new();
        let mut retry_note: Option<String> = None;
        let mut value: Option<T> = None;
        let mut ladder_exhausted = false;

        for attempt_index in 0..self.config.max_attempts {
            let model = match router.select_model(kind, attempt_index, &failures) {
                Ok(model) => model,
                Err(RouterError::LadderExhausted { .. }) => {
                    ladder_exhausted = true;
                    break;
                }
            };

            tracing::info!(
                "[Orchestrator] {} attempt {}/{} using {}",
                kind.as_str(),
                attempt_index + 1,
                self.config.max_attempts,
                model.identifier
            );

            let request = build(&model, retry_note.as_deref());
            let attempt_start = Instant::now();

            let response = match tokio::time::timeout(
                self.config.attempt_timeout,
                self.transport.invoke(&request, self.config.attempt_timeout),
            )
            .await
            {
                Ok(result) => result,
                // The in-flight call is abandoned; dropping the future is
                // our best-effort cancellation signal.
                Err(_) => Err(TransportError::Timeout(self.config.attempt_timeout)),
            };
            let elapsed_ms = attempt_start.elapsed().as_millis() as u64;

            let raw = match response {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(
                        "[Orchestrator] transport failure on {}: {}",
                        model.identifier,
                        err
                    );
                    attempts.push(AttemptRecord {
                        model: model.identifier.clone(),
                        raw_output: None,
                        outcome: AttemptOutcome::Transport(err.to_string()),
                        elapsed_ms,
                        estimated_cost_usd: 0.0,
                    });
                    failures.push(AttemptFailure {
                        model: model.identifier.clone(),
                        kind: FailureKind::Transport,
                    });
                    continue;
                }
            };

            let cost = estimate_cost(&model, &request, &raw);

            match interpret(&raw.text) {
                Ok(output) => {
                    attempts.push(AttemptRecord {
                        model: model.identifier.clone(),
                        raw_output: Some(raw.text),
                        outcome: AttemptOutcome::Success,
                        elapsed_ms,
                        estimated_cost_usd: cost,
                    });
                    value = Some(output);
                    break;
                }
                Err(AttemptDefect::Validation(defect)) => {
                    tracing::warn!(
                        "[Orchestrator] validation defect from {}: {}",
                        model.identifier,
                        defect
                    );
                    attempts.push(AttemptRecord {
                        model: model.identifier.clone(),
                        raw_output: Some(raw.text),
                        outcome: AttemptOutcome::Validation(defect),
                        elapsed_ms,
                        estimated_cost_usd: cost,
                    });
                    failures.push(AttemptFailure {
                        model: model.identifier.clone(),
                        kind: FailureKind::StructuredOutput,
                    });
                }
                Err(AttemptDefect::Resolution { reference, failure }) => {
                    tracing::warn!(
                        "[Orchestrator] unresolvable folder \"{}\" from {}: {}",
                        reference,
                        model.identifier,
                        failure
                    );
                    attempts.push(AttemptRecord {
                        model: model.identifier.clone(),
                        raw_output: Some(raw.text),
                        outcome: AttemptOutcome::Resolution(failure),
                        elapsed_ms,
                        estimated_cost_usd: cost,
                    });
                    failures.push(AttemptFailure {
                        model: model.identifier.clone(),
                        kind: FailureKind::StructuredOutput,
                    });
                    retry_note = Some(prompts::build_retry_note(&reference));
                }
            }
        }

        let report = RequestReport::new(request_id, kind, started_at, run_start.elapsed(), attempts);
        self.telemetry.record(&report);

        match value {
            Some(output) => Ok((output, report)),
            None => {
                let failure = if ladder_exhausted {
                    TerminalFailure::LadderExhausted
                } else {
                    match report
                        .attempts
                        .last()
                        .and_then(|a| a.outcome.failure_kind())
                    {
                        Some(FailureKind::Transport) => TerminalFailure::ProviderExhausted {
                            attempts: report.attempts.len(),
                        },
                        _ => TerminalFailure::ValidationExhausted {
                            attempts: report.attempts.len(),
                        },
                    }
                };
                tracing::warn!(
                    "[Orchestrator] request {} failed terminally: {}",
                    report.request_id,
                    failure
                );
                Err(RequestFailure { failure, report })
            }
        }
    }
}

/// Attempt cost from provider usage, or a chars/4 heuristic when the
/// transport reported none.
fn estimate_cost(model: &ModelDescriptor, request: &InvokeRequest, response: &RawResponse) -> f64 {
    let usage = response.usage.unwrap_or_else(|| TokenUsage {
        input_tokens: ((request.system_prompt.len() + request.user_prompt.len()) / 4) as u32,
        output_tokens: (response.text.len() / 4) as u32,
    });
    model.estimate_cost(usage.input_tokens, usage.output_tokens)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::folder::Folder;
    use crate::registry::QualityTier;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport scripted with canned step outcomes, recording requests
    pub(crate) struct MockTransport {
        script: Mutex<VecDeque<MockStep>>,
        requests: Mutex<Vec<InvokeRequest>>,
    }

    pub(crate) enum MockStep {
        Reply(Result<RawResponse, TransportError>),
        Hang,
    }

    impl MockTransport {
        pub(crate) fn new(script: Vec<MockStep>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn requests(&self) -> Vec<InvokeRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    pub(crate) fn ok(text: &str) -> MockStep {
        MockStep::Reply(Ok(RawResponse {
            text: text.to_string(),
            usage: Some(TokenUsage {
                input_tokens: 1000,
                output_tokens: 100,
            }),
        }))
    }

    fn transport_err() -> MockStep {
        MockStep::Reply(Err(TransportError::Provider {
            status: 500,
            message: "upstream unavailable".to_string(),
        }))
    }

    #[async_trait::async_trait]
    impl LlmTransport for MockTransport {
        async fn invoke(
            &self,
            request: &InvokeRequest,
            _timeout: Duration,
        ) -> Result<RawResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            let step = self.script.lock().unwrap().pop_front();
            match step {
                Some(MockStep::Reply(reply)) => reply,
                Some(MockStep::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(TransportError::EmptyResponse)
                }
                None => Err(TransportError::EmptyResponse),
            }
        }
    }

    pub(crate) fn registry() -> Arc<ModelRegistry> {
        let both = vec![TaskKind::Summarize, TaskKind::ClassifyFolder];
        Arc::new(
            ModelRegistry::new(vec![
                ModelDescriptor {
                    identifier: "low".to_string(),
                    input_cost_per_mtok: 0.1,
                    output_cost_per_mtok: 0.4,
                    tier: QualityTier::Low,
                    tasks: both.clone(),
                },
                ModelDescriptor {
                    identifier: "mid".to_string(),
                    input_cost_per_mtok: 1.0,
                    output_cost_per_mtok: 4.0,
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

    fn orchestrator(transport: Arc<MockTransport>) -> InferenceOrchestrator {
        InferenceOrchestrator::new(registry(), transport)
            .with_telemetry(Arc::new(crate::telemetry::NullSink))
    }

    fn page() -> PageContent {
        PageContent::new("https://www.rust-lang.org", "Rust is a systems language.")
    }

    fn tree() -> FolderTree {
        let folders = vec![
            Folder::new("work", "Work").with_children(vec![Folder::new("proj", "Projects")
                .with_children(vec![
                    Folder::new("alpha", "Alpha"),
                    Folder::new("beta", "Beta"),
                ])]),
            Folder::new("news", "News"),
        ];
        FolderTree::from_folders(&folders).unwrap()
    }

    pub(crate) const SUMMARY_JSON: &str =
        r#"{"title": "Rust", "summary": "A systems language.", "keywords": ["rust"]}"#;

    pub(crate) fn decision_json(folder: &str) -> String {
        format!(
            r#"{{"recommendedFolder": "{}", "reasoning": "fits the topic", "confidence": 0.9}}"#,
            folder
        )
    }

    #[tokio::test]
    async fn test_summarize_first_attempt_success() {
        let transport = MockTransport::new(vec![ok(SUMMARY_JSON)]);
        let outcome = orchestrator(transport.clone())
            .summarize(&page())
            .await
            .unwrap();

        assert_eq!(outcome.summary.title, "Rust");
        assert_eq!(outcome.report.attempts.len(), 1);
        assert!(matches!(
            outcome.report.attempts[0].outcome,
            AttemptOutcome::Success
        ));
        assert!(outcome.report.total_cost_usd > 0.0);
        // First attempt routes to the cheapest Mid-or-higher model
        assert_eq!(transport.requests()[0].model, "mid");
    }

    #[tokio::test]
    async fn test_malformed_output_retries_same_model() {
        let transport = MockTransport::new(vec![ok("definitely not json"), ok(SUMMARY_JSON)]);
        let outcome = orchestrator(transport.clone())
            .summarize(&page())
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].model, requests[1].model);
        assert!(matches!(
            outcome.report.attempts[0].outcome,
            AttemptOutcome::Validation(ValidationDefect::MalformedSyntax)
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_rotates_model() {
        let transport = MockTransport::new(vec![transport_err(), ok(SUMMARY_JSON)]);
        let outcome = orchestrator(transport.clone())
            .summarize(&page())
            .await
            .unwrap();

        let requests = transport.requests();
        assert_ne!(requests[0].model, requests[1].model);
        // Transport failures are recorded but cost nothing
        assert_eq!(outcome.report.attempts[0].estimated_cost_usd, 0.0);
        assert!(outcome.report.attempts[1].estimated_cost_usd > 0.0);
    }

    #[tokio::test]
    async fn test_all_transport_failures_is_provider_exhausted() {
        let transport =
            MockTransport::new(vec![transport_err(), transport_err(), transport_err()]);
        let failure = orchestrator(transport)
            .summarize(&page())
            .await
            .unwrap_err();

        assert_eq!(
            failure.failure,
            TerminalFailure::ProviderExhausted { attempts: 3 }
        );
        assert_eq!(failure.report.attempts.len(), 3);
    }

    #[tokio::test]
    async fn test_terminal_kind_matches_last_failure() {
        // Transport error first, then two validation defects: the request
        // dies as ValidationExhausted, not ProviderExhausted.
        let transport = MockTransport::new(vec![
            transport_err(),
            ok("garbage"),
            ok(r#"{"title": "Rust"}"#),
        ]);
        let failure = orchestrator(transport)
            .summarize(&page())
            .await
            .unwrap_err();

        assert_eq!(
            failure.failure,
            TerminalFailure::ValidationExhausted { attempts: 3 }
        );
    }

    #[tokio::test]
    async fn test_classify_resolves_folder() {
        let transport = MockTransport::new(vec![ok(&decision_json("Work/Projects/Alpha"))]);
        let outcome = orchestrator(transport)
            .classify(&page(), None, &tree(), false)
            .await
            .unwrap();

        assert_eq!(outcome.folder_id, "alpha");
        assert_eq!(outcome.folder_path, "Work/Projects/Alpha");
        assert_eq!(outcome.decision.confidence, Some(0.9));
    }

    #[tokio::test]
    async fn test_unresolvable_reference_retries_with_corrective_note() {
        let transport = MockTransport::new(vec![
            ok(&decision_json("Finance")),
            ok(&decision_json("Work/Projects/Alpha")),
        ]);
        let outcome = orchestrator(transport.clone())
            .classify(&page(), None, &tree(), false)
            .await
            .unwrap();

        assert_eq!(outcome.folder_id, "alpha");
        let requests = transport.requests();
        // A resolution failure is generation noise: same model, new note
        assert_eq!(requests[0].model, requests[1].model);
        assert!(!requests[0].user_prompt.contains("did not match"));
        assert!(requests[1].user_prompt.contains("\"Finance\" did not match"));
        assert!(matches!(
            outcome.report.attempts[0].outcome,
            AttemptOutcome::Resolution(ResolutionFailure::NoPlausibleNode)
        ));
    }

    #[tokio::test]
    async fn test_persistent_hallucination_exhausts_validation() {
        let transport = MockTransport::new(vec![
            ok(&decision_json("Finance")),
            ok(&decision_json("Finance")),
            ok(&decision_json("Finance")),
        ]);
        let failure = orchestrator(transport)
            .classify(&page(), None, &tree(), false)
            .await
            .unwrap_err();

        assert_eq!(
            failure.failure,
            TerminalFailure::ValidationExhausted { attempts: 3 }
        );
        assert!(failure
            .report
            .attempts
            .iter()
            .all(|a| matches!(a.outcome, AttemptOutcome::Resolution(_))));
    }

    #[tokio::test]
    async fn test_attempt_budget_is_never_exceeded() {
        let transport = MockTransport::new(vec![
            ok("junk"),
            ok("junk"),
            ok("junk"),
            ok("junk"),
            ok(SUMMARY_JSON),
        ]);
        let failure = orchestrator(transport.clone())
            .with_config(OrchestratorConfig {
                max_attempts: 2,
                ..Default::default()
            })
            .summarize(&page())
            .await
            .unwrap_err();

        assert_eq!(failure.report.attempts.len(), 2);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_transport_failure() {
        let transport = MockTransport::new(vec![MockStep::Hang, ok(SUMMARY_JSON)]);
        let outcome = orchestrator(transport.clone())
            .with_config(OrchestratorConfig {
                max_attempts: 3,
                attempt_timeout: Duration::from_millis(100),
            })
            .summarize(&page())
            .await
            .unwrap();

        assert!(matches!(
            outcome.report.attempts[0].outcome,
            AttemptOutcome::Transport(_)
        ));
        // Timed-out model is rotated away from
        let requests = transport.requests();
        assert_ne!(requests[0].model, requests[1].model);
    }

    #[tokio::test]
    async fn test_single_model_transport_failure_exhausts_ladder() {
        let registry = Arc::new(
            ModelRegistry::new(vec![ModelDescriptor {
                identifier: "only".to_string(),
                input_cost_per_mtok: 1.0,
                output_cost_per_mtok: 4.0,
                tier: QualityTier::Mid,
                tasks: vec![TaskKind::Summarize, TaskKind::ClassifyFolder],
            }])
            .unwrap(),
        );
        let transport = MockTransport::new(vec![transport_err()]);
        let failure = InferenceOrchestrator::new(registry, transport)
            .with_telemetry(Arc::new(crate::telemetry::NullSink))
            .summarize(&page())
            .await
            .unwrap_err();

        assert_eq!(failure.failure, TerminalFailure::LadderExhausted);
        assert_eq!(failure.report.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_cost_sums_failed_and_successful_attempts() {
        let transport = MockTransport::new(vec![ok("junk"), ok(SUMMARY_JSON)]);
        let outcome = orchestrator(transport)
            .summarize(&page())
            .await
            .unwrap();

        let per_attempt: f64 = outcome
            .report
            .attempts
            .iter()
            .map(|a| a.estimated_cost_usd)
            .sum();
        assert!((outcome.report.total_cost_usd - per_attempt).abs() < 1e-12);
        assert_eq!(outcome.report.attempts.len(), 2);
        assert!(outcome.report.attempts[0].estimated_cost_usd > 0.0);
    }
}
