#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use telemeter_agent::app_state::AgentState;
use telemeter_agent::config;
use telemeter_agent::router::{bind_listener, build_router, CONTENT_TYPE};
use telemeter_core::LabelSet;

mod log_capture;

fn get_metrics() -> Request<Body> {
    Request::builder().uri("/metrics").body(Body::empty()).unwrap()
}

#[tokio::test]
async fn serves_rendered_registry() {
    let (_guard, logs) = log_capture::install();
    let cfg = config::load_from_str("version: 1\nmetrics:\n  enabled: true\n").unwrap();
    let state = AgentState::new(cfg);
    assert!(logs.contents().contains("enabled prometheus metrics reporter"));

    let registry = state.metrics().expect("metrics enabled");
    let labels = LabelSet::from_pairs([("http_url", "/test/sum"), ("http_method", "GET")]).unwrap();
    for _ in 0..5 {
        registry.increment("requests_total", &labels);
    }

    let resp = build_router(state).oneshot(get_metrics()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], CONTENT_TYPE);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text
        .lines()
        .any(|l| l == "requests_total_value{http_method=\"GET\",http_url=\"/test/sum\",} 5"));
}

#[tokio::test]
async fn disabled_metrics_answer_404() {
    let state = AgentState::new(config::load_from_str("version: 1\n").unwrap());
    let resp = build_router(state).oneshot(get_metrics()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn binding_listener_logs_readiness() {
    let (_guard, logs) = log_capture::install();
    let listener = bind_listener("127.0.0.1:0").await.unwrap();
    assert!(logs
        .lines()
        .iter()
        .any(|l| l.contains("started Prometheus HTTP listener 127.0.0.1:0")));

    let taken = listener.local_addr().unwrap().to_string();
    let before = logs.lines().len();
    let err = bind_listener(&taken).await.unwrap_err();
    assert_eq!(err.code().as_str(), "TRANSPORT");
    assert_eq!(logs.lines().len(), before);
}
