// =====================================================================================
// MODEM CELL MODELS
// =====================================================================================

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModemError;
use crate::services::mapper::cleanup_units;

/// Plugin name every value record is filed under.
pub const PLUGIN_NAME: &str = "4gmodem";

// =====================================================================================
// STATIC TABLES
// =====================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointSpec {
    pub name: &'static str,
    pub path: &'static str,
}

/// Status pages scraped on every cycle, in fetch order. Fields from later
/// pages win on key collisions.
pub const DEVICE_ENDPOINTS: &[EndpointSpec] = &[
    EndpointSpec {
        name: "traffic",
        path: "/api/monitoring/traffic-statistics",
    },
    EndpointSpec {
        name: "monthly",
        path: "/api/monitoring/month_statistics",
    },
    EndpointSpec {
        name: "signal",
        path: "/api/device/signal",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedStat {
    pub name: &'static str,
    pub left: &'static str,
    pub right: &'static str,
}

pub const DERIVED_STATS: &[DerivedStat] = &[
    DerivedStat {
        name: "_current_total",
        left: "CurrentDownload",
        right: "CurrentUpload",
    },
    DerivedStat {
        name: "_total_total",
        left: "TotalDownload",
        right: "TotalUpload",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
    Derive,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Derive => "derive",
        }
    }

    /// Counter and derive data sources only take integers.
    pub fn is_integral(&self) -> bool {
        !matches!(self, MetricKind::Gauge)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTransform {
    /// Strips `dBm`, `dB` and `>=` before reading a float.
    CleanupUnits,
}

impl ValueTransform {
    pub fn apply(&self, raw: &str) -> Result<f64, ModemError> {
        match self {
            ValueTransform::CleanupUnits => cleanup_units(raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricMappingEntry {
    pub source_field: &'static str,
    pub metric_name: &'static str,
    pub kind: MetricKind,
    pub transform: Option<ValueTransform>,
}

impl MetricMappingEntry {
    const fn plain(metric_name: &'static str, source_field: &'static str, kind: MetricKind) -> Self {
        Self {
            source_field,
            metric_name,
            kind,
            transform: None,
        }
    }

    const fn signal(metric_name: &'static str, source_field: &'static str) -> Self {
        Self {
            source_field,
            metric_name,
            kind: MetricKind::Gauge,
            transform: Some(ValueTransform::CleanupUnits),
        }
    }
}

pub const VALUE_MAPPING: &[MetricMappingEntry] = &[
    // Traffic readings from main stats
    MetricMappingEntry::plain("uptime_connection", "CurrentConnectTime", MetricKind::Gauge),
    MetricMappingEntry::plain("total_bytes", "_total_total", MetricKind::Derive),
    MetricMappingEntry::plain("rx_bytes", "TotalDownload", MetricKind::Derive),
    MetricMappingEntry::plain("tx_bytes", "TotalUpload", MetricKind::Derive),
    // Monthly stats
    MetricMappingEntry::plain("month_rx", "CurrentMonthDownload", MetricKind::Gauge),
    MetricMappingEntry::plain("month_tx", "CurrentMonthUpload", MetricKind::Gauge),
    // Signal
    MetricMappingEntry::signal("snr", "sinr"),
    MetricMappingEntry::signal("rssi", "rssi"),
    MetricMappingEntry::signal("rsrp", "rsrp"),
    MetricMappingEntry::plain("band", "band", MetricKind::Gauge),
    MetricMappingEntry::plain("ul_freq", "lteulfreq", MetricKind::Gauge),
];

// =====================================================================================
// PER-CYCLE RECORDS
// =====================================================================================

/// Top-level `tag -> text` pairs of one endpoint response.
pub type RawFieldRecord = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(Option<String>),
    Integer(i64),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => text.as_deref(),
            FieldValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            FieldValue::Text(Some(text)) => text.trim().parse().ok(),
            FieldValue::Text(None) => None,
        }
    }
}

/// Everything one device reported during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MergedStatRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl MergedStatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    /// Last writer wins on key collisions.
    pub fn merge(&mut self, raw: RawFieldRecord) {
        for (tag, text) in raw {
            self.fields.insert(tag, FieldValue::Text(text));
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

/// Whether a resolved reading of exactly zero is worth reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitPolicy {
    /// Zero readings are treated like missing ones and never emitted.
    #[default]
    DropZero,
    KeepZero,
}

impl EmitPolicy {
    pub fn from_keep_zero(keep_zero: bool) -> Self {
        if keep_zero {
            EmitPolicy::KeepZero
        } else {
            EmitPolicy::DropZero
        }
    }

    pub fn admits(&self, value: f64) -> bool {
        match self {
            EmitPolicy::DropZero => value != 0.0,
            EmitPolicy::KeepZero => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSample {
    pub metric_name: String,
    pub kind: MetricKind,
    pub instance_name: String,
    pub value: f64,
}

/// What a sink receives: collectd's `type/type_instance` naming scoped by
/// plugin and plugin instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueRecord {
    pub plugin: String,
    pub plugin_instance: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub type_instance: String,
    pub values: Vec<f64>,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub instances_ok: usize,
    pub instances_failed: usize,
    pub samples_emitted: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedValue {
    pub metric_name: String,
    pub kind: MetricKind,
    pub source_field: String,
    pub value: Option<f64>,
    pub would_emit: bool,
    pub error: Option<String>,
}

/// Result of a diagnostic fetch: the merged record plus every mapping
/// entry's resolved value, including the ones that would be filtered out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub root_url: String,
    pub plugin: String,
    pub record: MergedStatRecord,
    pub prepared: Vec<PreparedValue>,
}
