//! High-level API for the bookmark analysis pipeline.
//!
//! Wires registry, transport, and orchestrator together and exposes the
//! two logical operations as plain async calls. HTTP framing of these
//! operations is a collaborator concern; this is the function-call
//! surface it wraps.

use std::sync::Arc;

use thiserror::Error;

use super::{
    ClassifyOutcome, InferenceOrchestrator, RequestFailure, RequestReport, SummarizeOutcome,
};
use crate::config::PipelineConfig;
use crate::folder::{Folder, FolderTree, TreeError};
use crate::prompts::PageContent;
use crate::registry::ModelRegistry;
use crate::schema::Summary;
use crate::telemetry::TelemetrySink;
use crate::transport::{HttpTransport, LlmTransport, TransportError};

/// Errors surfaced by the pipeline facade
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The supplied folder structure is not a valid tree
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// A request failed terminally after exhausting its attempts
    #[error(transparent)]
    Request(#[from] RequestFailure),

    /// Transport setup failed (missing credentials, bad client config)
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Combined result of analyzing and filing one bookmark
#[derive(Debug, Clone)]
pub struct ClassifiedBookmark {
    pub summary: Summary,
    /// Identifier of the resolved folder node
    pub folder_id: String,
    /// Display path of the resolved folder
    pub folder_path: String,
    pub reasoning: String,
    /// Set when the model proposed creating a new child folder under
    /// `folder_path`; nothing has been created
    pub new_folder_name: Option<String>,
    pub confidence: Option<f32>,
    pub summarize_report: RequestReport,
    pub classify_report: RequestReport,
}

impl ClassifiedBookmark {
    /// Estimated spend across both pipeline stages
    pub fn total_cost_usd(&self) -> f64 {
        self.summarize_report.total_cost_usd + self.classify_report.total_cost_usd
    }
}

/// Main entry point: the two-stage bookmark analysis pipeline
pub struct Pipeline {
    orchestrator: InferenceOrchestrator,
}

impl Pipeline {
    /// Build a pipeline over an explicit registry and transport.
    pub fn new(registry: Arc<ModelRegistry>, transport: Arc<dyn LlmTransport>) -> Self {
        Self {
            orchestrator: InferenceOrchestrator::new(registry, transport),
        }
    }

    /// Build from the environment: builtin model table, HTTP transport,
    /// and `SEARCHMARK_*` tuning variables.
    pub fn from_env() -> Result<Self, PipelineError> {
        let config = PipelineConfig::from_env()?;
        let registry = Arc::new(ModelRegistry::builtin());
        let transport = Arc::new(HttpTransport::new(config.transport.clone())?);
        Ok(Self::with_config(registry, transport, config))
    }

    pub fn with_config(
        registry: Arc<ModelRegistry>,
        transport: Arc<dyn LlmTransport>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            orchestrator: InferenceOrchestrator::new(registry, transport)
                .with_config(config.orchestrator)
                .with_resolver(config.resolver),
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.orchestrator = self.orchestrator.with_telemetry(telemetry);
        self
    }

    /// Produce a structured title/summary/keywords for a page.
    pub async fn summarize(&self, page: &PageContent) -> Result<SummarizeOutcome, PipelineError> {
        Ok(self.orchestrator.summarize(page).await?)
    }

    /// Analyze a page and recommend a folder from the user's hierarchy.
    ///
    /// Runs the summarize stage first and feeds its analysis into
    /// classification, the way the recommendation reads best. With
    /// `allow_new_folder`, the model may propose a new child folder under
    /// the recommended parent.
    pub async fn classify_folder(
        &self,
        page: &PageContent,
        folders: &[Folder],
        allow_new_folder: bool,
    ) -> Result<ClassifiedBookmark, PipelineError> {
        let tree = FolderTree::from_folders(folders)?;

        tracing::info!("[Pipeline] analyzing {} for classification", page.url);
        let summarized = self.orchestrator.summarize(page).await?;

        tracing::info!(
            "[Pipeline] classifying \"{}\" against {} folders",
            summarized.summary.title,
            tree.len()
        );
        let classified = self
            .orchestrator
            .classify(page, Some(&summarized.summary), &tree, allow_new_folder)
            .await?;

        Ok(ClassifiedBookmark {
            summary: summarized.summary,
            folder_id: classified.folder_id,
            folder_path: classified.folder_path,
            reasoning: classified.decision.reasoning,
            new_folder_name: classified.decision.new_folder_name,
            confidence: classified.decision.confidence,
            summarize_report: summarized.report,
            classify_report: classified.report,
        })
    }

    /// Classification only, against a pre-built tree and optional prior
    /// analysis. Useful when the caller already holds a summary.
    pub async fn classify_only(
        &self,
        page: &PageContent,
        summary: Option<&Summary>,
        tree: &FolderTree,
        allow_new_folder: bool,
    ) -> Result<ClassifyOutcome, PipelineError> {
        Ok(self
            .orchestrator
            .classify(page, summary, tree, allow_new_folder)
            .await?)
    }
}
