//! Metric sink boundary.
//!
//! Records are forwarded one at a time, in arrival order, from the watch
//! task's callbacks. A failed write is the sink's problem to report; it
//! never terminates the watch session.

use std::io::Write;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use crate::mapper::{FieldValue, MetricRecord};

/// Sink consumes flat metric records.
///
/// This collector always passes an empty tag set.
pub trait Sink: Send + Sync {
    /// Returns the sink's name for logging.
    fn name(&self) -> &str;

    /// Write one record.
    fn write(
        &self,
        name: &str,
        fields: &[(&'static str, FieldValue)],
        tags: &[(String, String)],
    ) -> Result<()>;
}

/// Sink rendering records as InfluxDB line protocol, one line per record.
pub struct LineSink<W: Write + Send> {
    out: Mutex<W>,
}

impl LineSink<std::io::Stdout> {
    /// Line sink writing to stdout.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }
}

impl<W: Write + Send> Sink for LineSink<W> {
    fn name(&self) -> &str {
        "line"
    }

    fn write(
        &self,
        name: &str,
        fields: &[(&'static str, FieldValue)],
        tags: &[(String, String)],
    ) -> Result<()> {
        let mut line = String::with_capacity(128);
        line.push_str(name);

        for (key, value) in tags {
            line.push(',');
            line.push_str(key);
            line.push('=');
            line.push_str(value);
        }

        for (i, (key, value)) in fields.iter().enumerate() {
            line.push(if i == 0 { ' ' } else { ',' });
            line.push_str(key);
            line.push('=');
            match value {
                FieldValue::Integer(v) => {
                    line.push_str(&v.to_string());
                    line.push('i');
                }
                FieldValue::Float(v) => line.push_str(&v.to_string()),
                FieldValue::Text(v) => {
                    line.push('"');
                    for c in v.chars() {
                        if c == '"' || c == '\\' {
                            line.push('\\');
                        }
                        line.push(c);
                    }
                    line.push('"');
                }
            }
        }
        line.push('\n');

        let mut out = self.out.lock();
        out.write_all(line.as_bytes())
            .with_context(|| format!("writing record {name}"))?;
        out.flush().context("flushing sink output")?;

        Ok(())
    }
}

/// One record as seen by a sink, with the name owned.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenRecord {
    pub name: String,
    pub fields: Vec<(&'static str, FieldValue)>,
}

impl WrittenRecord {
    /// Looks up a field value by key.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

impl From<MetricRecord> for WrittenRecord {
    fn from(record: MetricRecord) -> Self {
        Self {
            name: record.name.to_string(),
            fields: record.fields,
        }
    }
}

/// Sink collecting records in memory, in write order. Used as the test
/// double for ordering and flag-gating checks.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<WrittenRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all records written so far, in write order.
    pub fn records(&self) -> Vec<WrittenRecord> {
        self.records.lock().clone()
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn write(
        &self,
        name: &str,
        fields: &[(&'static str, FieldValue)],
        _tags: &[(String, String)],
    ) -> Result<()> {
        self.records.lock().push(WrittenRecord {
            name: name.to_string(),
            fields: fields.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_sink_renders_line_protocol() {
        let sink = LineSink::new(Vec::new());
        sink.write(
            "gpsd_satcount",
            &[
                ("device", FieldValue::Text("GPS1".to_string())),
                ("report_time", FieldValue::Text(String::new())),
                ("visible", FieldValue::Integer(8)),
                ("used", FieldValue::Integer(3)),
            ],
            &[],
        )
        .expect("write succeeds");

        let out = sink.out.lock().clone();
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "gpsd_satcount device=\"GPS1\",report_time=\"\",visible=8i,used=3i\n",
        );
    }

    #[test]
    fn test_line_sink_renders_tags_and_floats() {
        let sink = LineSink::new(Vec::new());
        sink.write(
            "gpsd_tpv",
            &[("lat", FieldValue::Float(52.1))],
            &[("host".to_string(), "roof".to_string())],
        )
        .expect("write succeeds");

        let out = sink.out.lock().clone();
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "gpsd_tpv,host=roof lat=52.1\n",
        );
    }

    #[test]
    fn test_line_sink_escapes_string_values() {
        let sink = LineSink::new(Vec::new());
        sink.write(
            "gpsd_att",
            &[("magst", FieldValue::Text("a\"b\\c".to_string()))],
            &[],
        )
        .expect("write succeeds");

        let out = sink.out.lock().clone();
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "gpsd_att magst=\"a\\\"b\\\\c\"\n",
        );
    }

    #[test]
    fn test_memory_sink_preserves_order() {
        let sink = MemorySink::new();
        sink.write("gpsd_tpv", &[("mode", FieldValue::Integer(2))], &[])
            .expect("write");
        sink.write("gpsd_tpv", &[("mode", FieldValue::Integer(3))], &[])
            .expect("write");

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields[0].1, FieldValue::Integer(2));
        assert_eq!(records[1].fields[0].1, FieldValue::Integer(3));
    }
}
