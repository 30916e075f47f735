#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use promkit_exporter::config::{self, MetricConfig};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
workload:
  interval_msec: 100 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn deny_unknown_metric_field() {
    let bad = r#"
version: 1
metrics:
  - kind: counter
    name: jobs_total
    help: "Jobs"
    bukets: [1, 2]
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.exporter.listen, "0.0.0.0:8080");
    assert_eq!(cfg.workload.interval_ms, 2000);

    let names: Vec<&str> = cfg.metrics.iter().map(MetricConfig::name).collect();
    assert_eq!(
        names,
        [
            "demo_request_total",
            "demo_temperature_celsius",
            "demo_request_duration_seconds",
            "demo_request_duration_summary_seconds",
        ]
    );
}

#[test]
fn full_config_round_trips_into_opts() {
    let ok = r#"
version: 1
exporter:
  listen: "127.0.0.1:9100"
workload:
  interval_ms: 50
  gauge_min: -5
  gauge_max: 5
  observe_max: 2.5
metrics:
  - kind: histogram
    name: rpc_seconds
    help: "RPC latency"
    buckets: [0.1, 0.5, 1]
  - kind: summary
    name: rpc_summary_seconds
    help: "RPC latency"
    objectives:
      - { quantile: 0.5, error: 0.05 }
    max_age_ms: 60000
    age_buckets: 3
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.exporter.listen_addr().unwrap().port(), 9100);
    assert_eq!(cfg.workload.gauge_min, -5.0);

    assert_eq!(cfg.metrics[0].histogram_opts().buckets, vec![0.1, 0.5, 1.0]);
    let s = cfg.metrics[1].summary_opts();
    assert_eq!(s.objectives.len(), 1);
    assert_eq!(s.max_age_ms, 60_000);
    assert_eq!(s.age_buckets, 3);
    assert_eq!(s.buf_cap, 500);
}

#[test]
fn rejects_bad_values() {
    let cases = [
        "version: 2\n",
        "version: 1\nmetrics: []\n",
        "version: 1\nexporter:\n  listen: \"nope\"\n",
        "version: 1\nworkload:\n  interval_ms: 1\n",
        "version: 1\nworkload:\n  gauge_min: 10\n  gauge_max: 10\n",
        "version: 1\nmetrics:\n  - { kind: counter, name: \"1bad\", help: \"\" }\n",
        "version: 1\nmetrics:\n  - { kind: histogram, name: h, help: \"\", buckets: [2, 1] }\n",
        "version: 1\nmetrics:\n  - kind: summary\n    name: s\n    help: \"\"\n    objectives: [{ quantile: 1.5, error: 0.01 }]\n",
        "version: 1\nmetrics:\n  - { kind: timer, name: t, help: \"\" }\n",
        "version: 1\nmetrics:\n  - { kind: summary, name: s, help: \"\", max_age_ms: 1, age_buckets: 1000001 }\n",
    ];
    for yaml in cases {
        assert!(config::load_from_str(yaml).is_err(), "accepted: {yaml}");
    }
}

#[test]
fn missing_file_is_config_error() {
    let err = config::load_from_file("/definitely/not/here/promkit.yaml").expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}
