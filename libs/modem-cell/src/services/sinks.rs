// =====================================================================================
// METRIC SINKS
// =====================================================================================

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use tracing::info;

use crate::error::SinkError;
use crate::models::ValueRecord;
use crate::services::dispatcher::MetricSink;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, SinkError> {
    mutex
        .lock()
        .map_err(|_| SinkError::Unavailable("writer lock poisoned".to_string()))
}

/// collectd exec plugin protocol: one `PUTVAL` line per record.
pub struct PutvalSink<W: Write + Send> {
    writer: Mutex<W>,
    host: String,
    interval_secs: u64,
}

impl PutvalSink<io::Stdout> {
    pub fn stdout(host: impl Into<String>, interval_secs: u64) -> Self {
        Self::new(io::stdout(), host, interval_secs)
    }
}

impl<W: Write + Send> PutvalSink<W> {
    pub fn new(writer: W, host: impl Into<String>, interval_secs: u64) -> Self {
        Self {
            writer: Mutex::new(writer),
            host: host.into(),
            interval_secs,
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn format_line(&self, record: &ValueRecord) -> String {
        let values: Vec<String> = record
            .values
            .iter()
            .map(|value| {
                if record.kind.is_integral() {
                    format!("{}", value.round() as i64)
                } else {
                    format!("{}", value)
                }
            })
            .collect();

        format!(
            "PUTVAL \"{}/{}-{}/{}-{}\" interval={} N:{}",
            identifier_part(&self.host),
            identifier_part(&record.plugin),
            identifier_part(&record.plugin_instance),
            record.kind,
            identifier_part(&record.type_instance),
            self.interval_secs,
            values.join(":")
        )
    }
}

// `/` separates identifier parts and `"` ends the quoted identifier
fn identifier_part(raw: &str) -> String {
    raw.replace(['/', '"'], "_")
}

impl<W: Write + Send> MetricSink for PutvalSink<W> {
    fn name(&self) -> &str {
        "putval"
    }

    fn dispatch(&self, record: &ValueRecord) -> Result<(), SinkError> {
        let line = self.format_line(record);
        let mut writer = lock(&self.writer)?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

/// One JSON object per record per line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> MetricSink for JsonLinesSink<W> {
    fn name(&self) -> &str {
        "json"
    }

    fn dispatch(&self, record: &ValueRecord) -> Result<(), SinkError> {
        let line = serde_json::to_string(record)?;
        let mut writer = lock(&self.writer)?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

pub struct LogSink;

impl MetricSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn dispatch(&self, record: &ValueRecord) -> Result<(), SinkError> {
        info!(
            plugin = %record.plugin,
            instance = %record.plugin_instance,
            kind = %record.kind,
            metric = %record.type_instance,
            values = ?record.values,
            "value"
        );
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ValueRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ValueRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn find(&self, instance: &str, metric: &str) -> Option<ValueRecord> {
        self.records()
            .into_iter()
            .find(|r| r.plugin_instance == instance && r.type_instance == metric)
    }

    pub fn for_instance(&self, instance: &str) -> Vec<ValueRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.plugin_instance == instance)
            .collect()
    }
}

impl MetricSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn dispatch(&self, record: &ValueRecord) -> Result<(), SinkError> {
        lock(&self.records)?.push(record.clone());
        Ok(())
    }
}
