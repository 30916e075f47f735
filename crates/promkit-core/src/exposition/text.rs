use std::fmt::{self, Write};

use bytes::Bytes;

use crate::snapshot::{MetricSnapshot, SnapshotValue};

/// `Content-Type` for the text format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Encode snapshots in the order given (`Registry::collect` sorts by name).
pub fn encode(snapshots: &[MetricSnapshot]) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = encode_to(&mut out, snapshots);
    out
}

/// Encode into a shared buffer for a transport body.
pub fn encode_bytes(snapshots: &[MetricSnapshot]) -> Bytes {
    Bytes::from(encode(snapshots))
}

pub fn encode_to<W: Write>(out: &mut W, snapshots: &[MetricSnapshot]) -> fmt::Result {
    for s in snapshots {
        write_metric(out, s)?;
    }
    Ok(())
}

fn write_metric<W: Write>(out: &mut W, s: &MetricSnapshot) -> fmt::Result {
    let name = s.name.as_str();
    if s.help.is_empty() {
        writeln!(out, "# HELP {name}")?;
    } else {
        writeln!(out, "# HELP {name} {}", escape_help(&s.help))?;
    }
    writeln!(out, "# TYPE {name} {}", s.kind())?;

    match &s.value {
        SnapshotValue::Counter(v) | SnapshotValue::Gauge(v) => {
            writeln!(out, "{name} {}", Float(*v))?;
        }
        SnapshotValue::Histogram(h) => {
            for b in &h.buckets {
                writeln!(
                    out,
                    "{name}_bucket{{le=\"{}\"}} {}",
                    Float(b.upper_bound),
                    b.cumulative_count
                )?;
            }
            writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {}", h.count)?;
            writeln!(out, "{name}_sum {}", Float(h.sum))?;
            writeln!(out, "{name}_count {}", h.count)?;
        }
        SnapshotValue::Summary(sm) => {
            for q in &sm.quantiles {
                writeln!(
                    out,
                    "{name}{{quantile=\"{}\"}} {}",
                    Float(q.quantile),
                    Float(q.value)
                )?;
            }
            writeln!(out, "{name}_sum {}", Float(sm.sum))?;
            writeln!(out, "{name}_count {}", sm.count)?;
        }
    }
    Ok(())
}

/// Help text must stay on one line.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Shortest round-trippable decimal, with `NaN`/`+Inf`/`-Inf` tokens.
/// Magnitudes outside `[1e-5, 1e21)` switch to exponent notation.
struct Float(f64);

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.is_nan() {
            f.write_str("NaN")
        } else if v == f64::INFINITY {
            f.write_str("+Inf")
        } else if v == f64::NEG_INFINITY {
            f.write_str("-Inf")
        } else if v != 0.0 && !(1e-5..1e21).contains(&v.abs()) {
            write!(f, "{v:e}")
        } else {
            write!(f, "{v}")
        }
    }
}

pub fn format_float(v: f64) -> String {
    Float(v).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Bucket, HistogramSnapshot, QuantileValue, SummarySnapshot};

    fn snap(name: &str, help: &str, value: SnapshotValue) -> MetricSnapshot {
        MetricSnapshot {
            name: name.into(),
            help: help.into(),
            value,
        }
    }

    #[test]
    fn float_tokens() {
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(format_float(f64::INFINITY), "+Inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_float(1.0), "1");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(0.005), "0.005");
    }

    #[test]
    fn extreme_magnitudes_use_exponent() {
        assert_eq!(format_float(1.7976931348623157e308), "1.7976931348623157e308");
        assert_eq!(format_float(5e-324), "5e-324");
        assert_eq!(format_float(-2.5e-7), "-2.5e-7");
        assert_eq!(format_float(1e21), "1e21");
        assert_eq!(format_float(1e20), "100000000000000000000");
        assert_eq!(format_float(0.00001), "0.00001");
        assert_eq!(format_float(0.0), "0");
    }

    #[test]
    fn floats_round_trip() {
        for v in [0.1, 1.0 / 3.0, 123456.789, 5e-324, 1.7976931348623157e308] {
            let s = format_float(v);
            assert_eq!(s.parse::<f64>().ok(), Some(v), "{s}");
        }
    }

    #[test]
    fn counter_and_gauge_lines() {
        let out = encode(&[
            snap("a_total", "Total a", SnapshotValue::Counter(3.0)),
            snap("b", "", SnapshotValue::Gauge(f64::NAN)),
        ]);
        assert_eq!(
            out,
            "# HELP a_total Total a\n# TYPE a_total counter\na_total 3\n\
             # HELP b\n# TYPE b gauge\nb NaN\n"
        );
    }

    #[test]
    fn histogram_lines() {
        let h = HistogramSnapshot {
            buckets: vec![
                Bucket { upper_bound: 0.1, cumulative_count: 1 },
                Bucket { upper_bound: 0.5, cumulative_count: 2 },
                Bucket { upper_bound: 1.0, cumulative_count: 2 },
            ],
            sum: 2.35,
            count: 3,
        };
        let out = encode(&[snap("lat", "Latency", SnapshotValue::Histogram(h))]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "# HELP lat Latency",
                "# TYPE lat histogram",
                "lat_bucket{le=\"0.1\"} 1",
                "lat_bucket{le=\"0.5\"} 2",
                "lat_bucket{le=\"1\"} 2",
                "lat_bucket{le=\"+Inf\"} 3",
                "lat_sum 2.35",
                "lat_count 3",
            ]
        );
    }

    #[test]
    fn summary_lines() {
        let sm = SummarySnapshot {
            quantiles: vec![
                QuantileValue { quantile: 0.5, value: 0.25 },
                QuantileValue { quantile: 0.99, value: f64::NAN },
            ],
            sum: 7.5,
            count: 12,
        };
        let out = encode(&[snap("dur", "Durations", SnapshotValue::Summary(sm))]);
        assert!(out.contains("dur{quantile=\"0.5\"} 0.25\n"));
        assert!(out.contains("dur{quantile=\"0.99\"} NaN\n"));
        assert!(out.ends_with("dur_sum 7.5\ndur_count 12\n"));
    }

    #[test]
    fn help_is_escaped() {
        let out = encode(&[snap("x", "line one\nback\\slash", SnapshotValue::Gauge(1.0))]);
        assert!(out.starts_with("# HELP x line one\\nback\\\\slash\n"));
    }

    #[test]
    fn bytes_match_string() {
        let s = [snap("x", "h", SnapshotValue::Counter(1.0))];
        assert_eq!(encode_bytes(&s), Bytes::from(encode(&s)));
    }
}
