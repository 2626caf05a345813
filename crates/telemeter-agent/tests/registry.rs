#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Barrier};
use std::thread;

use telemeter_agent::metrics::{AggregatorState, MetricKind, MetricsRegistry, PrometheusTextExporter};
use telemeter_core::LabelSet;

fn labels(pairs: &[(&str, &str)]) -> LabelSet {
    LabelSet::from_pairs(pairs.iter().copied()).unwrap()
}

fn metric_lines(body: &str) -> Vec<&str> {
    body.lines().filter(|l| !l.starts_with('#')).collect()
}

#[test]
fn five_requests_render_one_counter_line() {
    let r = MetricsRegistry::new();
    let l = labels(&[("path", "/sum"), ("method", "GET")]);
    for _ in 0..5 {
        r.record("requests_total", &l, MetricKind::Counter, 1.0);
    }
    let body = r.render_prometheus();
    assert!(
        metric_lines(&body).contains(&"requests_total_value{method=\"GET\",path=\"/sum\",} 5"),
        "{body}"
    );
    assert!(body.contains("# TYPE requests_total counter"));
}

#[test]
fn label_order_does_not_change_output() {
    let a = MetricsRegistry::new();
    let b = MetricsRegistry::new();
    let pairs = [
        ("src_module", "_anon/.:0.0.0"),
        ("http_method", "GET"),
        ("src_position", "01_http_svc_test.bal:21:5"),
        ("protocol", "http"),
    ];
    let mut reversed = pairs;
    reversed.reverse();

    a.increment("requests_total", &labels(&pairs));
    b.increment("requests_total", &labels(&reversed));
    a.observe("response_time_seconds", &labels(&pairs), 0.25);
    b.observe("response_time_seconds", &labels(&reversed), 0.25);

    assert_eq!(a.render_prometheus(), b.render_prometheus());
    assert_eq!(a.render_prometheus(), a.render_prometheus());
}

#[test]
fn counter_and_gauge_properties() {
    let r = MetricsRegistry::new();
    let l = labels(&[("listener_name", "http")]);
    let mut expected_counter = 0.0;
    let mut expected_gauge = 0.0;
    for i in 0..200 {
        let v = f64::from(i % 7);
        r.record("requests_total", &l, MetricKind::Counter, v);
        expected_counter += v;

        let delta = if i % 3 == 0 { -1.0 } else { 1.0 };
        r.record("inprogress_requests", &l, MetricKind::Gauge, delta);
        expected_gauge += delta;
    }

    let snap = r.snapshot();
    assert_eq!(snap.len(), 2);
    for s in snap {
        match (s.id.name(), s.state) {
            ("requests_total", AggregatorState::Counter(v)) => assert_eq!(v, expected_counter),
            ("inprogress_requests", AggregatorState::Gauge(v)) => assert_eq!(v, expected_gauge),
            other => panic!("unexpected series {other:?}"),
        }
    }
}

#[test]
fn summary_lines_and_monotone_quantiles() {
    let r = MetricsRegistry::new();
    let l = labels(&[("http_method", "GET")]);
    let mut sum = 0.0;
    for i in 1..=1000u32 {
        let v = f64::from(i) / 1000.0;
        r.observe("response_time_seconds", &l, v);
        sum += v;
    }

    let snap = r.snapshot();
    let AggregatorState::Summary(s) = &snap[0].state else {
        panic!("expected summary");
    };
    assert_eq!(s.count, 1000);
    assert_eq!(s.sum, sum);
    let qs: Vec<f64> = s.quantiles.iter().map(|(_, v)| *v).collect();
    assert!(qs.windows(2).all(|w| w[0] <= w[1]), "{qs:?}");

    let body = PrometheusTextExporter::render(&snap);
    let lines = metric_lines(&body);
    let prefix = "response_time_seconds";
    assert!(lines.contains(&"response_time_seconds_count{http_method=\"GET\",} 1000"));
    assert!(lines.contains(&"response_time_seconds_value{http_method=\"GET\",} 1"));
    assert!(lines.iter().any(|l| l.starts_with("response_time_seconds_sum{http_method=\"GET\",} ")));
    for p in ["0.5", "0.75", "0.98", "0.99", "0.999"] {
        let key = format!("{prefix}{{http_method=\"GET\",quantile=\"{p}\",}} ");
        assert!(lines.iter().any(|l| l.starts_with(&key)), "missing {key}\n{body}");
    }
    assert!(body.contains("# TYPE response_time_seconds summary"));
}

#[test]
fn help_text_is_rendered_once_per_family() {
    let r = MetricsRegistry::new();
    r.describe("requests_total", "Total number of requests");
    r.increment("requests_total", &labels(&[("a", "1")]));
    r.increment("requests_total", &labels(&[("a", "2")]));
    let body = r.render_prometheus();
    assert_eq!(body.matches("# HELP requests_total Total number of requests").count(), 1);
    assert_eq!(body.matches("# TYPE requests_total counter").count(), 1);
    assert_eq!(metric_lines(&body).len(), 2);
}

#[test]
fn empty_labels_and_escaping() {
    let r = MetricsRegistry::new();
    r.increment("up", &LabelSet::new());
    r.increment("odd", &labels(&[("q", "say \"hi\"\n")]));
    let body = r.render_prometheus();
    let lines = metric_lines(&body);
    assert!(lines.contains(&"up_value{} 1"));
    assert!(lines.contains(&"odd_value{q=\"say \\\"hi\\\"\\n\",} 1"));
}

#[test]
fn concurrent_first_use_creates_one_series() {
    const THREADS: usize = 16;
    const PER_THREAD: usize = 1000;

    let r = Arc::new(MetricsRegistry::new());
    let barrier = Arc::new(Barrier::new(THREADS));
    let l = labels(&[("method", "GET"), ("path", "/sum")]);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let r = Arc::clone(&r);
            let barrier = Arc::clone(&barrier);
            let l = l.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    r.increment("requests_total", &l);
                    r.observe("response_time_seconds", &l, 0.001);
                    r.add_gauge("inprogress_requests", &l, 1.0);
                    r.add_gauge("inprogress_requests", &l, -1.0);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(r.len(), 3);
    let total = (THREADS * PER_THREAD) as f64;
    for s in r.snapshot() {
        match s.state {
            AggregatorState::Counter(v) => assert_eq!(v, total),
            AggregatorState::Gauge(v) => assert_eq!(v, 0.0),
            AggregatorState::Summary(snap) => assert_eq!(snap.count, THREADS as u64 * PER_THREAD as u64),
        }
    }
}

#[test]
fn scrape_while_writing_sees_monotone_counter() {
    let r = Arc::new(MetricsRegistry::new());
    let l = labels(&[("k", "v")]);
    let writer = {
        let r = Arc::clone(&r);
        let l = l.clone();
        thread::spawn(move || {
            for _ in 0..20_000 {
                r.increment("c", &l);
            }
        })
    };

    let mut last = 0.0;
    for _ in 0..200 {
        for s in r.snapshot() {
            if let AggregatorState::Counter(v) = s.state {
                assert!(v >= last, "counter went backwards: {last} -> {v}");
                last = v;
            }
        }
    }
    writer.join().unwrap();
    assert_eq!(r.snapshot()[0].state, AggregatorState::Counter(20_000.0));
}
