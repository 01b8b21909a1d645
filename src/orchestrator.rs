//! Run lifecycle and report export.
//!
//! The [`Orchestrator`] owns the only mutable state in the crate: a single
//! [`RunnerView`] held in a `tokio::sync::watch` channel. Readers take snapshots
//! with [`Orchestrator::view`] or follow changes with [`Orchestrator::subscribe`];
//! the view only changes through the transition functions below.
//!
//! ```text
//! Idle ──run──▶ validate ──reject──▶ Invalid(reason)
//!                  │
//!                accept
//!                  ▼
//!     Running("Starting test...") ──response──▶ Running("Processing results...") ──▶ Succeeded
//!                  │
//!                error
//!                  ▼
//!               Failed
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::client::{ComparisonService, ServiceError};
use crate::model::{ComparisonResult, RunInput};
use crate::report::{ReportLocation, ReportViewer, ViewerError};
use crate::validate::{ValidationError, validate};

pub const STATUS_STARTING: &str = "Starting test...";
pub const STATUS_PROCESSING: &str = "Processing results...";
pub const STATUS_COMPLETED: &str = "Test completed!";
pub const STATUS_FAILED: &str = "Test failed.";

pub const RUN_FAILED_MESSAGE: &str = "An error occurred while running the test.";

/// Where the current run attempt stands
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RunState {
    #[default]
    Idle,
    /// Rejected before any request was made
    Invalid(ValidationError),
    /// Request in flight; carries the current progress message
    Running(String),
    Succeeded(Arc<ComparisonResult>),
    Failed(String),
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running(_))
    }
}

/// Everything an operator surface needs to draw the runner
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunnerView {
    pub state: RunState,
    /// Status line
    pub status: Option<String>,
    /// Error line; at most one message at a time
    pub error: Option<String>,
    /// Latest result; survives a validation rejection, cleared when a run starts
    pub result: Option<Arc<ComparisonResult>>,
    /// An export is in flight
    pub exporting: bool,
}

impl RunnerView {
    /// The run trigger is disabled while a run is in flight
    pub fn can_run(&self) -> bool {
        !self.state.is_running()
    }

    /// The export trigger is shown once a result exists
    pub fn can_export(&self) -> bool {
        self.result.is_some() && !self.exporting
    }
}

/// What happened to a run trigger
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// A run was already in flight; nothing was done
    Ignored,
    Rejected(ValidationError),
    Succeeded(Arc<ComparisonResult>),
    Failed(String),
}

/// What happened to an export trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// An export was already in flight; nothing was done
    Ignored,
    Delivered(ReportLocation),
}

/// Export failures. `Display` is the message shown to the operator.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No results available for PDF.")]
    NoResult,

    #[error("Failed to generate PDF.")]
    ExportFailed(#[source] ServiceError),

    #[error("Failed to generate PDF.")]
    ViewerFailed(#[source] ViewerError),
}

/// Drives runs and exports against a [`ComparisonService`].
pub struct Orchestrator<S> {
    service: S,
    view: watch::Sender<RunnerView>,
}

enum Start {
    Busy,
    Rejected(ValidationError),
    Accepted,
}

impl<S: ComparisonService> Orchestrator<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            view: watch::Sender::new(RunnerView::default()),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Snapshot of the current view
    pub fn view(&self) -> RunnerView {
        self.view.borrow().clone()
    }

    /// Follow view changes
    pub fn subscribe(&self) -> watch::Receiver<RunnerView> {
        self.view.subscribe()
    }

    /// Run one full validate, submit, map cycle.
    ///
    /// Ignored while another run is in flight.
    pub async fn run(&self, input: RunInput) -> RunOutcome {
        match self.begin_run(&input) {
            Start::Busy => {
                warn!("run already in progress, trigger ignored");
                return RunOutcome::Ignored;
            }
            Start::Rejected(reason) => {
                info!(%reason, "run rejected");
                return RunOutcome::Rejected(reason);
            }
            Start::Accepted => {}
        }

        let guard = Abandon::new(&self.view, "run", mark_run_failed);
        let request = input.to_request();
        info!(
            website = %request.website_url,
            figma = request.figma_url.as_deref().unwrap_or("-"),
            selectors = request.selectors.as_deref().unwrap_or("-"),
            "run started"
        );

        let response = self.service.run_test(&request).await;
        guard.disarm();

        match response {
            Ok(result) => {
                self.set_progress(STATUS_PROCESSING);
                let result = Arc::new(result);
                info!(
                    matched = result.matched.len(),
                    differences = result.differences.len(),
                    "run completed"
                );
                self.finish_success(result.clone());
                RunOutcome::Succeeded(result)
            }
            Err(e) => {
                error!(error = %e, "error running test");
                self.finish_failure();
                RunOutcome::Failed(RUN_FAILED_MESSAGE.to_string())
            }
        }
    }

    /// Store the current differences and hand the report to `viewer`.
    pub async fn export_report(
        &self,
        viewer: &dyn ReportViewer,
    ) -> Result<ExportOutcome, ExportError> {
        let result = match self.begin_export() {
            Ok(Some(result)) => result,
            Ok(None) => {
                warn!("export already in progress, trigger ignored");
                return Ok(ExportOutcome::Ignored);
            }
            Err(e) => return Err(e),
        };
        let guard = Abandon::new(&self.view, "export", clear_exporting);

        if let Err(e) = self.service.store_differences(&result.differences).await {
            guard.disarm();
            error!(error = %e, "error storing differences");
            return Err(self.finish_export_error(ExportError::ExportFailed(e)));
        }

        let shown = viewer.show(&self.service.report_url()).await;
        guard.disarm();

        match shown {
            Ok(location) => {
                info!(%location, "report exported");
                self.view.send_modify(clear_exporting);
                Ok(ExportOutcome::Delivered(location))
            }
            Err(e) => {
                error!(error = %e, "error presenting report");
                Err(self.finish_export_error(ExportError::ViewerFailed(e)))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    fn begin_run(&self, input: &RunInput) -> Start {
        let mut start = Start::Busy;
        self.view.send_if_modified(|view| {
            if view.state.is_running() {
                return false;
            }
            view.error = None;
            match validate(input) {
                Err(reason) => {
                    view.state = RunState::Invalid(reason);
                    view.error = Some(reason.to_string());
                    start = Start::Rejected(reason);
                }
                Ok(()) => {
                    view.state = RunState::Running(STATUS_STARTING.to_string());
                    view.status = Some(STATUS_STARTING.to_string());
                    view.result = None;
                    start = Start::Accepted;
                }
            }
            true
        });
        start
    }

    fn set_progress(&self, message: &str) {
        self.view.send_modify(|view| {
            view.state = RunState::Running(message.to_string());
            view.status = Some(message.to_string());
        });
    }

    fn finish_success(&self, result: Arc<ComparisonResult>) {
        self.view.send_modify(|view| {
            view.state = RunState::Succeeded(result.clone());
            view.status = Some(STATUS_COMPLETED.to_string());
            view.result = Some(result);
        });
    }

    fn finish_failure(&self) {
        self.view.send_modify(mark_run_failed);
    }

    /// `Ok(None)` when busy, the result to export otherwise
    fn begin_export(&self) -> Result<Option<Arc<ComparisonResult>>, ExportError> {
        let mut outcome = Ok(None);
        self.view.send_if_modified(|view| {
            if view.exporting {
                return false;
            }
            view.error = None;
            match view.result.as_ref().filter(|r| !r.is_empty()) {
                Some(result) => {
                    view.exporting = true;
                    outcome = Ok(Some(result.clone()));
                }
                None => {
                    view.error = Some(ExportError::NoResult.to_string());
                    outcome = Err(ExportError::NoResult);
                }
            }
            true
        });
        outcome
    }

    fn finish_export_error(&self, err: ExportError) -> ExportError {
        self.view.send_modify(|view| {
            view.exporting = false;
            view.error = Some(err.to_string());
        });
        err
    }
}

/// Puts the view back into a usable state when a run or export future is
/// dropped before it finishes, e.g. by a caller-side timeout.
struct Abandon<'a> {
    view: &'a watch::Sender<RunnerView>,
    action: &'static str,
    reset: fn(&mut RunnerView),
    armed: bool,
}

impl<'a> Abandon<'a> {
    fn new(
        view: &'a watch::Sender<RunnerView>,
        action: &'static str,
        reset: fn(&mut RunnerView),
    ) -> Self {
        Self {
            view,
            action,
            reset,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Abandon<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(action = self.action, "abandoned before completion");
            self.view.send_modify(self.reset);
        }
    }
}

fn mark_run_failed(view: &mut RunnerView) {
    view.state = RunState::Failed(RUN_FAILED_MESSAGE.to_string());
    view.status = Some(STATUS_FAILED.to_string());
    view.error = Some(RUN_FAILED_MESSAGE.to_string());
}

fn clear_exporting(view: &mut RunnerView) {
    view.exporting = false;
}
