//! Style Check - visual-regression runs against a remote comparison service.
//!
//! This crate provides:
//! - Input validation for a run (website plus design reference and/or selectors)
//! - An orchestrator that drives the run lifecycle and narrates its progress
//! - A read-only projection of the service's verdict for display
//! - Report export through a pluggable viewer
//!
//! # Example
//!
//! ```rust,no_run
//! use style_check::{HttpComparisonClient, Orchestrator, ResultsView, RunInput, RunOutcome};
//! use style_check::config::ServiceSettings;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpComparisonClient::new(&ServiceSettings::from_env())?;
//! let orchestrator = Orchestrator::new(client);
//!
//! let input = RunInput::new("https://example.com").selectors(".btn");
//! if let RunOutcome::Succeeded(result) = orchestrator.run(input).await {
//!     print!("{}", ResultsView::from(&*result));
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod model;
pub mod orchestrator;
pub mod presenter;
pub mod report;
pub mod validate;

pub use client::{ComparisonService, HttpComparisonClient, ServiceError, ServiceResult};
pub use model::{ComparisonResult, Difference, PropertyDelta, RunInput, RunTestRequest};
pub use orchestrator::{
    ExportError, ExportOutcome, Orchestrator, RunOutcome, RunState, RunnerView,
};
pub use presenter::{DifferenceView, ResultsView};
pub use report::{DownloadViewer, ReportLocation, ReportViewer, SystemOpener, ViewerError};
pub use validate::{ValidationError, validate};
