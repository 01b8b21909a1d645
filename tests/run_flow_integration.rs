//! End-to-end tests of the run and export flow against a mock comparison service

use std::time::Duration;

use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;

use style_check::config::ServiceSettings;
use style_check::orchestrator::{STATUS_COMPLETED, STATUS_FAILED};
use style_check::{
    ComparisonService, DownloadViewer, ExportError, ExportOutcome, HttpComparisonClient,
    Orchestrator, ReportLocation, ResultsView, RunInput, RunOutcome, RunState, ServiceError,
};

fn client_for(server: &MockServer) -> HttpComparisonClient {
    let settings = ServiceSettings {
        api_url: server.url("/api"),
        connect_timeout: 5,
        request_timeout: 5,
    };
    HttpComparisonClient::new(&settings).expect("Failed to build client")
}

fn download_viewer(dir: &std::path::Path) -> DownloadViewer {
    DownloadViewer::new(reqwest::Client::new(), dir)
}

#[tokio::test]
async fn test_selectors_run_end_to_end() {
    let server = MockServer::start_async().await;
    let run_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test").json_body(json!({
                "figma_url": null,
                "website_url": "https://example.com",
                "selectors": ".btn",
            }));
            then.status(200)
                .json_body(json!({"matched": ["btn"], "differences": []}));
        })
        .await;

    let orch = Orchestrator::new(client_for(&server));
    let outcome = orch
        .run(RunInput::new("https://example.com").selectors(".btn"))
        .await;

    run_mock.assert_async().await;
    assert!(matches!(outcome, RunOutcome::Succeeded(_)));

    let view = orch.view();
    assert!(matches!(view.state, RunState::Succeeded(_)));
    assert_eq!(view.status.as_deref(), Some(STATUS_COMPLETED));
    assert_eq!(view.error, None);
    assert!(view.can_export());

    let result = view.result.expect("result should be held");
    let rendered = ResultsView::from(&*result);
    assert_eq!(rendered.matched.map(<[String]>::len), Some(1));
    assert!(rendered.differences.is_none());
}

#[tokio::test]
async fn test_blank_design_reference_sent_as_null() {
    let server = MockServer::start_async().await;
    let run_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test").json_body(json!({
                "figma_url": "https://www.figma.com/file/abc/Example",
                "website_url": "https://example.com",
                "selectors": null,
            }));
            then.status(200).json_body(json!({
                "status": "success",
                "differences": [{
                    "element": "Button",
                    "issue": "color mismatch",
                    "details": [{"property": "color", "expected": "#000", "actual": "#fff"}],
                }],
                "execution_time": 3.5,
            }));
        })
        .await;

    let orch = Orchestrator::new(client_for(&server));
    let input = RunInput::new("https://example.com")
        .design_reference("https://www.figma.com/file/abc/Example")
        .selectors("  ");
    let RunOutcome::Succeeded(result) = orch.run(input).await else {
        panic!("run should succeed");
    };

    run_mock.assert_async().await;
    assert!(result.matched.is_empty());
    assert_eq!(result.execution_time, Some(3.5));
    assert_eq!(
        ResultsView::from(&*result).to_string(),
        "Comparison Results:\n❌ Differences\n  Button: color mismatch\n    - color: expected #000, got #fff\n"
    );
}

#[tokio::test]
async fn test_invalid_input_issues_no_request() {
    let server = MockServer::start_async().await;
    let run_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test");
            then.status(200).json_body(json!({}));
        })
        .await;

    let orch = Orchestrator::new(client_for(&server));
    let outcome = orch.run(RunInput::new("   ").selectors(".btn")).await;

    assert_eq!(
        outcome,
        RunOutcome::Rejected(style_check::ValidationError::MissingWebsite)
    );
    assert_eq!(orch.view().error.as_deref(), Some("Website URL is required!"));
    run_mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_server_error_fails_run() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test");
            then.status(500)
                .json_body(json!({"status": "error", "message": "browser crashed"}));
        })
        .await;

    let orch = Orchestrator::new(client_for(&server));
    let outcome = orch
        .run(RunInput::new("https://example.com").selectors("body"))
        .await;

    assert_eq!(
        outcome,
        RunOutcome::Failed("An error occurred while running the test.".to_string())
    );
    let view = orch.view();
    assert_eq!(view.status.as_deref(), Some(STATUS_FAILED));
    assert_eq!(
        view.error.as_deref(),
        Some("An error occurred while running the test.")
    );
    assert!(view.result.is_none());
}

#[tokio::test]
async fn test_server_error_message_extracted() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test");
            then.status(500)
                .json_body(json!({"status": "error", "message": "browser crashed"}));
        })
        .await;

    let client = client_for(&server);
    let request = RunInput::new("https://example.com").selectors("body").to_request();
    match client.run_test(&request).await {
        Err(ServiceError::Status { status, message }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "browser crashed");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_payload_fails_run() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test");
            then.status(200).body("<html>not json</html>");
        })
        .await;

    let orch = Orchestrator::new(client_for(&server));
    let outcome = orch
        .run(RunInput::new("https://example.com").selectors("body"))
        .await;

    assert!(matches!(outcome, RunOutcome::Failed(_)));
    assert!(matches!(orch.view().state, RunState::Failed(_)));
}

#[tokio::test]
async fn test_second_trigger_while_running_is_ignored() {
    let server = MockServer::start_async().await;
    let run_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body(json!({"matched": ["Header"]}));
        })
        .await;

    let orch = Orchestrator::new(client_for(&server));
    let input = RunInput::new("https://example.com").selectors("header");

    let (first, second) = tokio::join!(orch.run(input.clone()), orch.run(input.clone()));

    assert!(matches!(first, RunOutcome::Succeeded(_)));
    assert_eq!(second, RunOutcome::Ignored);
    run_mock.assert_hits_async(1).await;

    // Once finished, the trigger works again
    let third = orch.run(input).await;
    assert!(matches!(third, RunOutcome::Succeeded(_)));
    run_mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_timed_out_run_can_be_retried() {
    let server = MockServer::start_async().await;
    let run_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(json!({"matched": ["Header"]}));
        })
        .await;

    let orch = Orchestrator::new(client_for(&server));
    let input = RunInput::new("https://example.com").selectors("header");

    let timed_out = tokio::time::timeout(Duration::from_millis(50), orch.run(input.clone())).await;
    assert!(timed_out.is_err());

    let view = orch.view();
    assert!(matches!(view.state, RunState::Failed(_)));
    assert_eq!(view.status.as_deref(), Some(STATUS_FAILED));
    assert!(view.can_run());

    let rerun = orch.run(input).await;
    assert!(matches!(rerun, RunOutcome::Succeeded(_)));
    assert!(matches!(orch.view().state, RunState::Succeeded(_)));
    run_mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_timed_out_export_releases_busy_flag() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test");
            then.status(200).json_body(json!({"matched": ["Header"]}));
        })
        .await;
    let store_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/store-differences");
            then.status(200).delay(Duration::from_millis(500));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/generate-pdf");
            then.status(200).body("%PDF-1.4");
        })
        .await;

    let orch = Orchestrator::new(client_for(&server));
    orch.run(RunInput::new("https://example.com").selectors("header"))
        .await;

    let dir = tempfile::tempdir().unwrap();
    let viewer = download_viewer(dir.path());
    let timed_out =
        tokio::time::timeout(Duration::from_millis(50), orch.export_report(&viewer)).await;
    assert!(timed_out.is_err());
    assert!(!orch.view().exporting);

    let outcome = orch.export_report(&viewer).await.expect("export should succeed");
    assert!(matches!(outcome, ExportOutcome::Delivered(_)));
    store_mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_second_export_while_exporting_is_ignored() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test");
            then.status(200).json_body(json!({
                "differences": [{"element": "Button", "issue": "color mismatch"}],
            }));
        })
        .await;
    let store_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/store-differences");
            then.status(200).delay(Duration::from_millis(300));
        })
        .await;
    let pdf_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/generate-pdf");
            then.status(200).body("%PDF-1.4");
        })
        .await;

    let orch = Orchestrator::new(client_for(&server));
    orch.run(RunInput::new("https://example.com").selectors("button"))
        .await;

    let dir = tempfile::tempdir().unwrap();
    let viewer = download_viewer(dir.path());
    let (first, second) = tokio::join!(orch.export_report(&viewer), orch.export_report(&viewer));

    let outcomes = [first.expect("export should succeed"), second.expect("export should succeed")];
    let ignored = outcomes
        .iter()
        .filter(|o| matches!(o, ExportOutcome::Ignored))
        .count();
    let delivered = outcomes
        .iter()
        .filter(|o| matches!(o, ExportOutcome::Delivered(ReportLocation::Saved(_))))
        .count();
    assert_eq!((delivered, ignored), (1, 1));

    store_mock.assert_hits_async(1).await;
    pdf_mock.assert_hits_async(1).await;
    assert!(!orch.view().exporting);
}

#[tokio::test]
async fn test_export_with_empty_result_makes_no_call() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test");
            then.status(200).json_body(json!({"matched": [], "differences": []}));
        })
        .await;
    let store_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/store-differences");
            then.status(200);
        })
        .await;

    let orch = Orchestrator::new(client_for(&server));
    orch.run(RunInput::new("https://example.com").selectors("body"))
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = orch
        .export_report(&download_viewer(dir.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::NoResult));
    assert_eq!(
        orch.view().error.as_deref(),
        Some("No results available for PDF.")
    );
    store_mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_export_store_failure_never_generates() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test");
            then.status(200).json_body(json!({
                "differences": [{"element": "Button", "issue": "color mismatch"}],
            }));
        })
        .await;
    let store_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/store-differences");
            then.status(503);
        })
        .await;
    let pdf_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/generate-pdf");
            then.status(200).body("%PDF-1.4");
        })
        .await;

    let orch = Orchestrator::new(client_for(&server));
    orch.run(RunInput::new("https://example.com").selectors("button"))
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = orch
        .export_report(&download_viewer(dir.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::ExportFailed(_)));
    store_mock.assert_hits_async(1).await;
    pdf_mock.assert_hits_async(0).await;

    let view = orch.view();
    assert_eq!(view.error.as_deref(), Some("Failed to generate PDF."));
    assert!(matches!(view.state, RunState::Succeeded(_)));
    assert!(view.can_export());
}

#[tokio::test]
async fn test_export_stores_differences_then_downloads() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/run-test");
            then.status(200).json_body(json!({
                "matched": ["Header"],
                "differences": [{
                    "element": "Button",
                    "issue": "color mismatch",
                    "details": [{"property": "color", "expected": "#000", "actual": "#fff"}],
                }],
            }));
        })
        .await;
    let store_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/store-differences")
                .json_body(json!({
                    "differences": [{
                        "element": "Button",
                        "issue": "color mismatch",
                        "details": [{"property": "color", "expected": "#000", "actual": "#fff"}],
                    }],
                }));
            then.status(200)
                .json_body(json!({"message": "Comparison results stored"}));
        })
        .await;
    let pdf_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/generate-pdf");
            then.status(200)
                .header("content-type", "application/pdf")
                .body("%PDF-1.4 report");
        })
        .await;

    let orch = Orchestrator::new(client_for(&server));
    orch.run(RunInput::new("https://example.com").selectors("button"))
        .await;

    let dir = tempfile::tempdir().unwrap();
    let outcome = orch
        .export_report(&download_viewer(dir.path()))
        .await
        .expect("export should succeed");

    store_mock.assert_hits_async(1).await;
    pdf_mock.assert_hits_async(1).await;

    let ExportOutcome::Delivered(ReportLocation::Saved(path)) = outcome else {
        panic!("expected a saved report, got {:?}", outcome);
    };
    assert!(path.starts_with(dir.path()));
    assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 report");

    let view = orch.view();
    assert_eq!(view.error, None);
    assert!(!view.exporting);
}

#[tokio::test]
async fn test_ping() {
    let server = MockServer::start_async().await;
    let ping_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/ping");
            then.status(200).json_body(json!({"status": "ok"}));
        })
        .await;

    let client = client_for(&server);
    assert!(client.ping().await.unwrap());
    ping_mock.assert_async().await;
}
