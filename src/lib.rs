//! SearchMark core: LLM-backed bookmark analysis.
//!
//! Given a bookmarked page, this crate produces a structured
//! title/summary and recommends the best-fitting folder out of the
//! user's folder hierarchy, with a justification. Both tasks delegate to
//! an LLM backend; the interesting work is everything around that call:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        PIPELINE                            │
//! │   summarize(page)          classify_folder(page, folders)  │
//! └───────────────┬────────────────────────────────────────────┘
//!                 │ one orchestrator run per request
//!                 ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │                 INFERENCE ORCHESTRATOR                     │
//! │  attempt budget · per-attempt timeout · cost accounting    │
//! └──┬──────────────────┬──────────────────┬───────────────────┘
//!    │ picks model      │ checks schema    │ maps folder
//!    ▼                  ▼                  ▼
//! ┌────────┐      ┌───────────┐      ┌───────────┐
//! │ ROUTER │      │ VALIDATOR │      │ RESOLVER  │
//! │ tiered │      │ JSON      │      │ id/path/  │
//! │ ladder │      │ recovery  │      │ fuzzy     │
//! └───┬────┘      └───────────┘      └───────────┘
//!     │ reads
//!     ▼
//! ┌──────────┐         external call via ┌───────────┐
//! │ REGISTRY │ ───────────────────────▶  │ TRANSPORT │
//! └──────────┘                           └───────────┘
//! ```
//!
//! Fetching page content, persisting bookmarks, and HTTP framing are
//! collaborator concerns; this crate exposes plain async function
//! contracts.
//!
//! ```no_run
//! use searchmark::{Folder, PageContent, Pipeline};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::from_env()?;
//!
//! let folders = vec![
//!     Folder::new("1", "Tech"),
//!     Folder::new("2", "News"),
//! ];
//! let page = PageContent::new("https://www.rust-lang.org", "already-fetched page text");
//!
//! let bookmark = pipeline.classify_folder(&page, &folders, false).await?;
//! println!("{} -> {} ({})", page.url, bookmark.folder_path, bookmark.reasoning);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod folder;
pub mod harness;
pub mod orchestrator;
pub mod prompts;
pub mod registry;
pub mod router;
pub mod schema;
pub mod telemetry;
pub mod transport;
pub mod validator;

pub use config::PipelineConfig;
pub use folder::{
    Folder, FolderNode, FolderResolver, FolderTree, ResolutionFailure, ResolverConfig, TreeError,
};
pub use orchestrator::{
    AttemptOutcome, AttemptRecord, ClassifiedBookmark, ClassifyOutcome, InferenceOrchestrator,
    OrchestratorConfig, Pipeline, PipelineError, RequestFailure, RequestReport, SummarizeOutcome,
    TerminalFailure,
};
pub use prompts::PageContent;
pub use registry::{ConfigurationError, ModelDescriptor, ModelRegistry, QualityTier};
pub use router::{Router, RouterError};
pub use schema::{FolderDecision, StructuredOutput, Summary, TaskKind};
pub use telemetry::{init_tracing, NullSink, TelemetrySink, TracingSink};
pub use transport::{
    HttpTransport, HttpTransportConfig, InvokeRequest, LlmTransport, RawResponse, TokenUsage,
    TransportError,
};
pub use validator::{validate, ValidationDefect};
