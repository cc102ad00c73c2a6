//! Model comparison harness.
//!
//! Runs the same bookmark case through the full pipeline once per model,
//! collecting timing, cost, and outcome per model. Useful for picking
//! registry tiers: the cheapest model that still lands bookmarks in the
//! expected folder wins its tier.
//!
//! Each run pins the candidate model by building a single-entry registry,
//! so the router has exactly one rung to offer.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::folder::Folder;
use crate::orchestrator::Pipeline;
use crate::prompts::PageContent;
use crate::registry::ModelRegistry;
use crate::schema::Summary;
use crate::transport::LlmTransport;

/// One bookmark scenario to test models against
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Name/identifier for this test case
    pub name: String,

    /// URL of the page under test
    pub url: String,

    /// Already-fetched page text
    pub page_text: String,

    /// Folder structure to classify against
    #[serde(default)]
    pub folders: Vec<Folder>,

    /// Expected folder path, for scoring
    #[serde(default)]
    pub expected_folder: Option<String>,

    /// What this case verifies
    #[serde(default)]
    pub description: Option<String>,
}

/// Result of running a single case against a single model
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub case_name: String,
    pub model: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_folder_name: Option<String>,
    /// Whether `folder_path` equals the case's expected folder
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches_expected: Option<bool>,
    pub summarize_time_ms: u64,
    pub classify_time_ms: u64,
    pub total_time_ms: u64,
    pub estimated_cost_usd: f64,
}

/// Results from comparing several models on one case
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub case_name: String,
    pub models_compared: Vec<String>,
    pub results: Vec<TestResult>,
}

/// Comparison runner over a shared registry and transport
pub struct ComparisonHarness {
    registry: Arc<ModelRegistry>,
    transport: Arc<dyn LlmTransport>,
    config: PipelineConfig,
}

impl ComparisonHarness {
    pub fn new(registry: Arc<ModelRegistry>, transport: Arc<dyn LlmTransport>) -> Self {
        Self {
            registry,
            transport,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one case against one model identifier.
    pub async fn run_case(&self, case: &TestCase, model: &str) -> TestResult {
        let start = Instant::now();

        let pipeline = match self.pinned_pipeline(model) {
            Ok(pipeline) => pipeline,
            Err(message) => return TestResult::failed(case, model, message, start),
        };

        let page = PageContent::new(case.url.clone(), case.page_text.clone());
        match pipeline.classify_folder(&page, &case.folders, false).await {
            Ok(bookmark) => {
                let matches_expected = case
                    .expected_folder
                    .as_deref()
                    .map(|expected| expected == bookmark.folder_path);
                TestResult {
                    case_name: case.name.clone(),
                    model: model.to_string(),
                    success: true,
                    error: None,
                    summarize_time_ms: bookmark.summarize_report.elapsed_ms,
                    classify_time_ms: bookmark.classify_report.elapsed_ms,
                    estimated_cost_usd: bookmark.total_cost_usd(),
                    summary: Some(bookmark.summary),
                    folder_path: Some(bookmark.folder_path),
                    new_folder_name: bookmark.new_folder_name,
                    matches_expected,
                    total_time_ms: start.elapsed().as_millis() as u64,
                }
            }
            Err(err) => TestResult::failed(case, model, err.to_string(), start),
        }
    }

    /// Run one case across several models, sequentially; comparisons
    /// should not contend with themselves for rate limit.
    pub async fn compare(&self, case: &TestCase, models: &[String]) -> ComparisonResult {
        let mut results = Vec::with_capacity(models.len());
        for model in models {
            tracing::info!("[Harness] running case \"{}\" on {}", case.name, model);
            results.push(self.run_case(case, model).await);
        }

        ComparisonResult {
            case_name: case.name.clone(),
            models_compared: models.to_vec(),
            results,
        }
    }

    /// Single-model registry so the router cannot escalate away from the
    /// model under test.
    fn pinned_pipeline(&self, model: &str) -> Result<Pipeline, String> {
        let descriptor = self
            .registry
            .get(model)
            .ok_or_else(|| format!("Unknown model: {}", model))?
            .clone();
        let pinned = ModelRegistry::new(vec![descriptor])
            .map_err(|e| format!("Model {} not usable alone: {}", model, e))?;
        Ok(Pipeline::with_config(
            Arc::new(pinned),
            self.transport.clone(),
            self.config.clone(),
        ))
    }
}

impl TestResult {
    fn failed(case: &TestCase, model: &str, error: String, start: Instant) -> Self {
        Self {
            case_name: case.name.clone(),
            model: model.to_string(),
            success: false,
            error: Some(error),
            summary: None,
            folder_path: None,
            new_folder_name: None,
            matches_expected: case.expected_folder.as_ref().map(|_| false),
            summarize_time_ms: 0,
            classify_time_ms: 0,
            total_time_ms: start.elapsed().as_millis() as u64,
            estimated_cost_usd: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::tests::{decision_json, ok, registry, MockTransport, SUMMARY_JSON};

    fn case() -> TestCase {
        TestCase {
            name: "rust-homepage".to_string(),
            url: "https://www.rust-lang.org".to_string(),
            page_text: "Rust is a systems programming language.".to_string(),
            folders: vec![
                Folder::new("tech", "Tech").with_children(vec![Folder::new("rust", "Rust")]),
            ],
            expected_folder: Some("Tech/Rust".to_string()),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_run_case_scores_expected_folder() {
        let transport =
            MockTransport::new(vec![ok(SUMMARY_JSON), ok(&decision_json("Tech/Rust"))]);
        let harness = ComparisonHarness::new(registry(), transport);

        let result = harness.run_case(&case(), "mid").await;
        assert!(result.success);
        assert_eq!(result.folder_path.as_deref(), Some("Tech/Rust"));
        assert_eq!(result.matches_expected, Some(true));
        assert!(result.estimated_cost_usd > 0.0);
    }

    #[tokio::test]
    async fn test_unknown_model_fails_cleanly() {
        let transport = MockTransport::new(vec![]);
        let harness = ComparisonHarness::new(registry(), transport);

        let result = harness.run_case(&case(), "no-such-model").await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("Unknown model"));
        assert_eq!(result.matches_expected, Some(false));
    }

    #[tokio::test]
    async fn test_compare_runs_every_model() {
        let transport = MockTransport::new(vec![
            ok(SUMMARY_JSON),
            ok(&decision_json("Tech/Rust")),
            ok(SUMMARY_JSON),
            ok(&decision_json("Tech")),
        ]);
        let harness = ComparisonHarness::new(registry(), transport);

        let comparison = harness
            .compare(&case(), &["low".to_string(), "mid".to_string()])
            .await;
        assert_eq!(comparison.results.len(), 2);
        assert_eq!(comparison.results[0].matches_expected, Some(true));
        assert_eq!(comparison.results[1].matches_expected, Some(false));
    }

    #[test]
    fn test_case_deserializes_from_simple_json() {
        let raw = r#"{
            "name": "t",
            "url": "https://example.com",
            "pageText": "text",
            "folders": [{"id": "1", "name": "Tech", "children": []}],
            "expectedFolder": "Tech"
        }"#;
        let case: TestCase = serde_json::from_str(raw).unwrap();
        assert_eq!(case.folders.len(), 1);
        assert_eq!(case.expected_folder.as_deref(), Some("Tech"));
    }
}
