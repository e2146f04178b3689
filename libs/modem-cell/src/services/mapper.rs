// =====================================================================================
// FIELD MAPPER / TRANSFORM PIPELINE
// =====================================================================================

use tracing::{debug, warn};

use crate::error::ModemError;
use crate::models::{
    EmitPolicy, FieldValue, MergedStatRecord, MetricMappingEntry, OutputSample, PreparedValue,
};

/// Reads signal readings such as `-95dBm` or `>=5dB` as plain numbers.
pub fn cleanup_units(measure: &str) -> Result<f64, ModemError> {
    let cleaned = measure.replace("dBm", "").replace("dB", "").replace(">=", "");
    parse_number(&cleaned).ok_or_else(|| {
        ModemError::Parse(format!("cannot read '{}' as a signal measure", measure))
    })
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

pub struct FieldMapper {
    table: &'static [MetricMappingEntry],
    policy: EmitPolicy,
}

impl FieldMapper {
    pub fn new(table: &'static [MetricMappingEntry], policy: EmitPolicy) -> Self {
        Self { table, policy }
    }

    pub fn policy(&self) -> EmitPolicy {
        self.policy
    }

    /// Resolves one entry against the record. `Ok(None)` means the device
    /// did not report the field (absent or empty text).
    pub fn resolve(
        entry: &MetricMappingEntry,
        record: &MergedStatRecord,
    ) -> Result<Option<f64>, ModemError> {
        let text = match record.get(entry.source_field) {
            None | Some(FieldValue::Text(None)) => return Ok(None),
            Some(FieldValue::Integer(value)) => match entry.transform {
                None => return Ok(Some(*value as f64)),
                Some(transform) => return transform.apply(&value.to_string()).map(Some),
            },
            Some(FieldValue::Text(Some(text))) => text,
        };

        if text.trim().is_empty() {
            return Ok(None);
        }

        match entry.transform {
            Some(transform) => transform.apply(text).map(Some),
            None => parse_number(text).map(Some).ok_or_else(|| {
                ModemError::Parse(format!(
                    "{} is not numeric: '{}'",
                    entry.source_field, text
                ))
            }),
        }
    }

    /// Produces one sample per entry whose value resolved and passes the
    /// emit policy. A failing entry is logged and skipped on its own.
    pub fn map(&self, record: &MergedStatRecord, instance_name: &str) -> Vec<OutputSample> {
        let mut samples = Vec::with_capacity(self.table.len());

        for entry in self.table {
            match Self::resolve(entry, record) {
                Ok(Some(value)) if self.policy.admits(value) => samples.push(OutputSample {
                    metric_name: entry.metric_name.to_string(),
                    kind: entry.kind,
                    instance_name: instance_name.to_string(),
                    value,
                }),
                Ok(Some(_)) => {
                    debug!("{}: dropping zero reading for {}", instance_name, entry.metric_name);
                }
                Ok(None) => {
                    debug!(
                        "{}: no value for {} ({})",
                        instance_name, entry.metric_name, entry.source_field
                    );
                }
                Err(e) => {
                    warn!("{}: skipping {}: {}", instance_name, entry.metric_name, e);
                }
            }
        }

        samples
    }

    /// Every entry with its resolved value, filtered or not. Used by the
    /// diagnostic probe.
    pub fn prepare(&self, record: &MergedStatRecord) -> Vec<PreparedValue> {
        self.table
            .iter()
            .map(|entry| {
                let (value, error) = match Self::resolve(entry, record) {
                    Ok(value) => (value, None),
                    Err(e) => (None, Some(e.to_string())),
                };
                PreparedValue {
                    metric_name: entry.metric_name.to_string(),
                    kind: entry.kind,
                    source_field: entry.source_field.to_string(),
                    value,
                    would_emit: value.is_some_and(|v| self.policy.admits(v)),
                    error,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricKind, RawFieldRecord, VALUE_MAPPING};
    use assert_matches::assert_matches;

    fn record(pairs: &[(&str, Option<&str>)]) -> MergedStatRecord {
        let raw: RawFieldRecord = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect();
        let mut record = MergedStatRecord::new();
        record.merge(raw);
        record
    }

    fn entry(metric_name: &str) -> &'static MetricMappingEntry {
        VALUE_MAPPING
            .iter()
            .find(|e| e.metric_name == metric_name)
            .unwrap()
    }

    #[test]
    fn test_cleanup_units() {
        assert_eq!(cleanup_units("-95dBm").unwrap(), -95.0);
        assert_eq!(cleanup_units(">=5dB").unwrap(), 5.0);
        assert_eq!(cleanup_units("-11.5dB").unwrap(), -11.5);
        assert_eq!(cleanup_units(" 12 ").unwrap(), 12.0);
    }

    #[test]
    fn test_cleanup_units_rejects_garbage() {
        assert_matches!(cleanup_units("unknown"), Err(ModemError::Parse(_)));
        assert_matches!(cleanup_units("dBm"), Err(ModemError::Parse(_)));
        assert_matches!(cleanup_units("NaN"), Err(ModemError::Parse(_)));
    }

    #[test]
    fn test_resolve_absent_and_empty() {
        let stats = record(&[("rssi", None), ("band", Some(""))]);

        assert_eq!(FieldMapper::resolve(entry("rssi"), &stats).unwrap(), None);
        assert_eq!(FieldMapper::resolve(entry("band"), &stats).unwrap(), None);
        assert_eq!(FieldMapper::resolve(entry("snr"), &stats).unwrap(), None);
    }

    #[test]
    fn test_resolve_integer_field() {
        let mut stats = MergedStatRecord::new();
        stats.insert("_total_total", FieldValue::Integer(12000));

        assert_eq!(
            FieldMapper::resolve(entry("total_bytes"), &stats).unwrap(),
            Some(12000.0)
        );
    }

    #[test]
    fn test_zero_readings_dropped_by_default() {
        let stats = record(&[
            ("CurrentConnectTime", Some("0")),
            ("band", Some("3")),
            ("rssi", Some("")),
        ]);
        let mapper = FieldMapper::new(VALUE_MAPPING, EmitPolicy::DropZero);

        let samples = mapper.map(&stats, "spark");

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].metric_name, "band");
        assert_eq!(samples[0].kind, MetricKind::Gauge);
        assert_eq!(samples[0].value, 3.0);
    }

    #[test]
    fn test_zero_readings_kept_when_asked() {
        let stats = record(&[("CurrentConnectTime", Some("0"))]);
        let mapper = FieldMapper::new(VALUE_MAPPING, EmitPolicy::KeepZero);

        let samples = mapper.map(&stats, "spark");

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].metric_name, "uptime_connection");
        assert_eq!(samples[0].value, 0.0);
    }

    #[test]
    fn test_bad_entry_does_not_block_others() {
        let stats = record(&[
            ("rssi", Some("n/a")),
            ("rsrp", Some("-101dBm")),
            ("lteulfreq", Some("17600")),
        ]);
        let mapper = FieldMapper::new(VALUE_MAPPING, EmitPolicy::DropZero);

        let names: Vec<String> = mapper
            .map(&stats, "spark")
            .into_iter()
            .map(|s| s.metric_name)
            .collect();

        assert_eq!(names, vec!["rsrp", "ul_freq"]);
    }

    #[test]
    fn test_prepare_reports_every_entry() {
        let stats = record(&[("rssi", Some("garbage")), ("band", Some("0"))]);
        let mapper = FieldMapper::new(VALUE_MAPPING, EmitPolicy::DropZero);

        let prepared = mapper.prepare(&stats);
        assert_eq!(prepared.len(), VALUE_MAPPING.len());

        let rssi = prepared.iter().find(|p| p.metric_name == "rssi").unwrap();
        assert!(rssi.error.is_some());
        assert!(!rssi.would_emit);

        let band = prepared.iter().find(|p| p.metric_name == "band").unwrap();
        assert_eq!(band.value, Some(0.0));
        assert!(!band.would_emit);
    }
}
