//! Integration tests for the tracker against local HTTP servers

use std::time::Duration;

use seoscore::{Error, ScoreSource, SeoTracker, TrackerConfig, TrackerStatus};
use tiny_http::{Header, Response, Server};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>Test Page</title>
<meta name="description" content="A test page">
<meta name="viewport" content="width=device-width">
<link rel="stylesheet" href="/style.css">
<script src="/missing.js"></script>
</head>
<body>
<nav><a href="/">Home</a></nav>
<main>
<h1>Hello from Test Server</h1>
<img src="/style.css" alt="" width="1024" height="768">
</main>
</body>
</html>"#;

const PAGESPEED_RESPONSE: &str = r#"{
  "lighthouseResult": {
    "categories": {
      "performance": {"score": 0.91},
      "accessibility": {"score": 0.88},
      "best-practices": {"score": 0.96},
      "seo": {"score": 1.0}
    },
    "audits": {
      "largest-contentful-paint": {"numericValue": 1830.2},
      "max-potential-fid": {"numericValue": 64},
      "cumulative-layout-shift": {"numericValue": 0.004},
      "first-contentful-paint": {"numericValue": 910.7}
    }
  }
}"#;

/// Start a server on an ephemeral port. `pagespeed_status` is what the fake
/// audit endpoint answers with.
fn start_test_server(pagespeed_status: u16) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();

    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let path = request.url().split('?').next().unwrap_or("").to_string();
            let response = match path.as_str() {
                "/" => Response::from_string(PAGE).with_header(
                    "Content-Type: text/html; charset=utf-8"
                        .parse::<Header>()
                        .unwrap(),
                ),
                "/style.css" => Response::from_string("body{color:blue}"),
                "/runPagespeed" if pagespeed_status == 200 => Response::from_string(PAGESPEED_RESPONSE),
                "/runPagespeed" => Response::from_string("{}").with_status_code(pagespeed_status),
                _ => Response::from_string("Not Found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });

    format!("http://{}", addr)
}

const SLOW_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>Slow Page</title>
<link rel="stylesheet" href="/slow.css">
<script src="/missing.js"></script>
</head>
<body><main><h1>Waiting</h1></main></body>
</html>"#;

/// Serves `SLOW_PAGE`, answering each request on its own thread so that
/// `/slow.css` (three seconds) does not hold up the rest.
fn start_slow_server() -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();

    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            std::thread::spawn(move || {
                let response = match request.url() {
                    "/" => Response::from_string(SLOW_PAGE),
                    "/slow.css" => {
                        std::thread::sleep(Duration::from_secs(3));
                        Response::from_string("body{}")
                    }
                    _ => Response::from_string("Not Found").with_status_code(404),
                };
                let _ = request.respond(response);
            });
        }
    });

    format!("http://{}", addr)
}

fn config(base: &str) -> TrackerConfig {
    TrackerConfig {
        url: format!("{}/", base),
        api_endpoint: format!("{}/runPagespeed", base),
        sample_window_ms: 500,
        timeout_ms: 5000,
        auto_refresh: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn local_analysis_without_api_key() {
    let base = start_test_server(200);
    let tracker = SeoTracker::new(config(&base)).expect("tracker");

    let report = tracker.refresh().await.expect("refresh");
    assert_eq!(report.source, ScoreSource::Local);

    let s = report.scores;
    // title, description, viewport
    assert_eq!(s.seo(), 55);
    // empty alt: 0 + main + nav + h1
    assert_eq!(s.accessibility(), 60);
    // one 1024x768 image
    assert_eq!(s.performance(), 95);
    // plain http (-30) and /missing.js failing to load (-10)
    assert_eq!(s.best_practices(), 60);
    assert_eq!(s.overall(), 68);

    assert!(report.vitals.is_empty());
    assert_eq!(tracker.status(), TrackerStatus::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_loads_count_on_the_multi_thread_runtime() {
    let base = start_test_server(200);
    let tracker = SeoTracker::new(config(&base)).expect("tracker");

    let report = tracker.refresh().await.expect("refresh");
    assert_eq!(report.scores.best_practices(), 60);
}

#[tokio::test]
async fn slow_resource_does_not_hide_failed_loads() {
    let base = start_slow_server();
    let tracker = SeoTracker::new(TrackerConfig {
        sample_window_ms: 1000,
        ..config(&base)
    })
    .expect("tracker");

    let report = tracker.refresh().await.expect("refresh");
    // plain http (-30) and /missing.js (-10); /slow.css is still loading
    assert_eq!(report.scores.best_practices(), 60);
}

#[tokio::test]
async fn probing_can_be_disabled() {
    let base = start_test_server(200);
    let tracker = SeoTracker::new(TrackerConfig {
        probe_resources: false,
        ..config(&base)
    })
    .expect("tracker");

    let report = tracker.refresh().await.expect("refresh");
    assert_eq!(report.scores.best_practices(), 70);
}

#[tokio::test]
async fn remote_audit_is_preferred_when_key_configured() {
    let base = start_test_server(200);
    let tracker = SeoTracker::new(TrackerConfig {
        api_key: Some("test-key".into()),
        ..config(&base)
    })
    .expect("tracker");

    let report = tracker.refresh().await.expect("refresh");
    assert_eq!(report.source, ScoreSource::Remote);
    assert_eq!(report.scores.performance(), 91);
    assert_eq!(report.scores.accessibility(), 88);
    assert_eq!(report.scores.best_practices(), 96);
    assert_eq!(report.scores.seo(), 100);
    assert_eq!(report.scores.overall(), 94);
    assert_eq!(report.vitals.first_contentful_paint, 910.7);
    assert_eq!(report.vitals.first_input_delay, 64.0);
}

#[tokio::test]
async fn remote_failure_falls_back_to_local_analysis() {
    let base = start_test_server(500);
    let tracker = SeoTracker::new(TrackerConfig {
        api_key: Some("test-key".into()),
        probe_resources: false,
        ..config(&base)
    })
    .expect("tracker");

    let report = tracker.refresh().await.expect("refresh");
    assert_eq!(report.source, ScoreSource::Local);
    assert_eq!(report.scores.seo(), 55);
    assert_eq!(tracker.status(), TrackerStatus::Ready);
}

#[tokio::test]
async fn unreachable_page_marks_tracker_failed() {
    let base = start_test_server(200);
    let tracker = SeoTracker::new(TrackerConfig {
        url: format!("{}/gone", base),
        ..config(&base)
    })
    .expect("tracker");

    let res = tracker.refresh().await;
    assert!(matches!(res, Err(Error::LoadError(_))));
    assert!(matches!(tracker.status(), TrackerStatus::Failed(_)));
    assert!(tracker.latest().is_none());
}

#[tokio::test]
async fn report_serializes_with_overall_score() {
    let base = start_test_server(200);
    let tracker = SeoTracker::new(TrackerConfig {
        api_key: Some("test-key".into()),
        ..config(&base)
    })
    .expect("tracker");

    let report = tracker.refresh().await.expect("refresh");
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["source"], "remote");
    assert_eq!(json["scores"]["overall"], 94);
    assert_eq!(json["scores"]["bestPractices"], 96);
    assert_eq!(json["vitals"]["largestContentfulPaint"], 1830.2);
}
