//! Handing the generated report to the operator's environment.
//!
//! The orchestrator never reads the report itself; it passes the report URL to a
//! [`ReportViewer`], which either opens it with the desktop's URL handler or
//! downloads it to a local directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Errors while presenting a report
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to launch URL handler: {0}")]
    Launch(std::io::Error),

    #[error("failed to fetch report: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("report endpoint returned {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a report ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLocation {
    /// Handed to an external application
    Opened(String),
    /// Written to disk
    Saved(PathBuf),
}

impl std::fmt::Display for ReportLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportLocation::Opened(url) => write!(f, "opened {}", url),
            ReportLocation::Saved(path) => write!(f, "saved to {}", path.display()),
        }
    }
}

/// Something that can present the report found at a URL
#[async_trait]
pub trait ReportViewer: Send + Sync {
    async fn show(&self, url: &str) -> Result<ReportLocation, ViewerError>;
}

/// Opens the report with the platform's default URL handler
#[derive(Debug, Default, Clone)]
pub struct SystemOpener;

impl SystemOpener {
    fn command(url: &str) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        } else if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }
}

#[async_trait]
impl ReportViewer for SystemOpener {
    async fn show(&self, url: &str) -> Result<ReportLocation, ViewerError> {
        // Fire and forget, like opening a new browser tab
        Self::command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(ViewerError::Launch)?;
        info!(%url, "opened report");
        Ok(ReportLocation::Opened(url.to_string()))
    }
}

/// Downloads the report into a directory
#[derive(Debug, Clone)]
pub struct DownloadViewer {
    http: reqwest::Client,
    dir: PathBuf,
}

impl DownloadViewer {
    pub fn new(http: reqwest::Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            dir: dir.into(),
        }
    }

    fn target_stem() -> String {
        format!("report_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f"))
    }
}

/// Write `bytes` to `<dir>/<stem>.pdf`, adding `_1`, `_2`, ... instead of
/// overwriting an existing report.
async fn write_new_file(dir: &Path, stem: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let mut attempt = 0u32;
    loop {
        let name = match attempt {
            0 => format!("{}.pdf", stem),
            n => format!("{}_{}.pdf", stem, n),
        };
        let path = dir.join(name);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(bytes).await?;
                file.flush().await?;
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

#[async_trait]
impl ReportViewer for DownloadViewer {
    async fn show(&self, url: &str) -> Result<ReportLocation, ViewerError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ViewerError::Status(response.status()));
        }
        let bytes = response.bytes().await?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = write_new_file(&self.dir, &Self::target_stem(), &bytes).await?;

        info!(path = %path.display(), size = bytes.len(), "downloaded report");
        Ok(ReportLocation::Saved(path))
    }
}
