#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use telemeter_agent::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
metrics:
  enabled: true
  prot: 9797 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG_INVALID");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert!(!cfg.metrics.enabled);
    assert!(!cfg.tracing.enabled);
    assert_eq!(cfg.metrics.bind_address(), "0.0.0.0:9797");
    assert_eq!(cfg.metrics.percentiles, vec![0.5, 0.75, 0.98, 0.99, 0.999]);
    assert!(cfg.tracing.jaeger.reporter_port.is_none());
}

#[test]
fn overridden_config() {
    let ok = r#"
version: 1
metrics:
  enabled: true
  host: 127.0.0.1
  port: 10097
  percentiles: [0.5, 0.99]
  percentile_tolerance: 0.01
  window_secs: 60
  window_buckets: 6
tracing:
  enabled: true
  jaeger:
    reporter_hostname: collector
    reporter_port: 6831
    sampler_type: probabilistic
    sampler_param: 0.1
    reporter_flush_interval_ms: "500"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.metrics.bind_address(), "127.0.0.1:10097");

    let summary = cfg.metrics.summary_config();
    assert_eq!(summary.percentiles.len(), 2);
    assert_eq!(summary.window.as_secs(), 60);
    assert_eq!(summary.window_buckets, 6);
    assert_eq!(summary.reservoir_capacity(), summary.max_samples);

    let j = &cfg.tracing.jaeger;
    assert_eq!(j.reporter_port.as_deref(), Some("6831"));
    assert_eq!(j.sampler_param.as_deref(), Some("0.1"));
    assert_eq!(j.reporter_flush_interval_ms.as_deref(), Some("500"));
}

#[test]
fn jaeger_numbers_are_not_validated_at_load() {
    let raw = r#"
version: 1
tracing:
  enabled: true
  jaeger:
    reporter_port: not-a-port
"#;
    let cfg = config::load_from_str(raw).expect("load must succeed");
    assert_eq!(cfg.tracing.jaeger.reporter_port.as_deref(), Some("not-a-port"));
}

#[test]
fn rejects_bad_metrics_ranges() {
    let cases = [
        "version: 2\n",
        "version: 1\nmetrics:\n  percentiles: []\n",
        "version: 1\nmetrics:\n  percentiles: [0.5, 1.5]\n",
        "version: 1\nmetrics:\n  percentile_tolerance: 0\n",
        "version: 1\nmetrics:\n  window_secs: 0\n",
        "version: 1\nmetrics:\n  window_buckets: 0\n",
        "version: 1\nmetrics:\n  max_samples: 10\n",
    ];
    for c in cases {
        let err = config::load_from_str(c).expect_err(c);
        assert_eq!(err.code().as_str(), "CONFIG_INVALID", "{c}");
    }
}
