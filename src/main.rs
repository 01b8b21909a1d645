use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::path::PathBuf;

use tracing::warn;

use style_check::config;
use style_check::{
    ComparisonService, DownloadViewer, ExportOutcome, HttpComparisonClient, Orchestrator,
    ReportViewer, ResultsView, RunInput, RunOutcome, SystemOpener,
};

/// Style Check - visual-regression runs against a comparison service
#[derive(Parser, Debug)]
#[command(
    name = "style-check",
    about = "Compare a website against a design reference or selectors and export the results",
    after_help = "ENVIRONMENT VARIABLES:\n\
        STYLE_CHECK_API_URL           Comparison service base URL\n\
        STYLE_CHECK_CONNECT_TIMEOUT   Connection timeout (seconds)\n\
        STYLE_CHECK_REQUEST_TIMEOUT   Request timeout (seconds)\n\
        STYLE_CHECK_REPORT_DIR        Directory for downloaded reports\n\
        RUST_LOG                      Log filter (default: info)"
)]
struct Args {
    /// Comparison service base URL (overrides STYLE_CHECK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one comparison and print the results
    Run {
        /// Website to check
        #[arg(short, long, default_value = "")]
        website: String,

        /// Design reference URL
        #[arg(short, long)]
        figma: Option<String>,

        /// Selectors to check (passed to the service as-is)
        #[arg(short, long)]
        selectors: Option<String>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,

        /// Export the report after a successful run
        #[arg(long, value_enum)]
        pdf: Option<PdfMode>,

        /// Directory for downloaded reports (overrides STYLE_CHECK_REPORT_DIR)
        #[arg(long)]
        pdf_dir: Option<PathBuf>,
    },

    /// Check that the comparison service is reachable
    Ping,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum PdfMode {
    /// Open the report with the system URL handler
    Open,
    /// Save the report into --pdf-dir
    Download,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = config::get();
    let mut settings = cfg.service.clone();
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    let client = HttpComparisonClient::new(&settings)?;

    match args.command {
        Commands::Ping => {
            if client.ping().await? {
                println!("Service at {} is alive", client.base_url());
            } else {
                return Err(format!("Service at {} is not responding", client.base_url()).into());
            }
        }

        Commands::Run {
            website,
            figma,
            selectors,
            json,
            pdf,
            pdf_dir,
        } => {
            let orchestrator = Orchestrator::new(client);

            // Narrate status changes as they happen
            let mut updates = orchestrator.subscribe();
            let narrator = tokio::spawn(async move {
                let mut last: Option<String> = None;
                while updates.changed().await.is_ok() {
                    let status = updates.borrow_and_update().status.clone();
                    if let Some(line) = status.as_ref().filter(|s| Some(*s) != last.as_ref()) {
                        eprintln!("{}", line);
                        last = status;
                    }
                }
            });

            let input = RunInput {
                website_url: website,
                design_reference_url: figma,
                selectors,
            };
            let outcome = orchestrator.run(input).await;

            let result = match outcome {
                RunOutcome::Succeeded(result) => result,
                RunOutcome::Rejected(reason) => return Err(reason.to_string().into()),
                RunOutcome::Failed(message) => return Err(message.into()),
                RunOutcome::Ignored => return Err("a run is already in progress".into()),
            };

            let view = ResultsView::from(&*result);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", view);
                if let Some(secs) = result.execution_time {
                    println!("Completed in {:.2}s", secs);
                }
            }

            if let Some(mode) = pdf {
                let viewer: Box<dyn ReportViewer> = match mode {
                    PdfMode::Open => Box::new(SystemOpener),
                    PdfMode::Download => {
                        let http = reqwest::Client::builder()
                            .connect_timeout(settings.connect_timeout())
                            .timeout(settings.request_timeout())
                            .build()?;
                        let dir = pdf_dir.unwrap_or_else(|| PathBuf::from(&cfg.report.dir));
                        Box::new(DownloadViewer::new(http, dir))
                    }
                };
                match orchestrator.export_report(viewer.as_ref()).await? {
                    ExportOutcome::Delivered(location) => println!("Report {}", location),
                    ExportOutcome::Ignored => {}
                }
            }

            drop(orchestrator);
            if let Err(e) = narrator.await {
                warn!(error = %e, "status narrator stopped abnormally");
            }
        }
    }

    Ok(())
}
