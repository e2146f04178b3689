// =====================================================================================
// MODEM CELL - LTE ROUTER METRIC COLLECTION
// =====================================================================================
//
// Scrapes the XML status pages of Huawei B315s-style LTE modems and turns them
// into collectd value records:
// - Cookie session against the device web UI
// - Traffic, monthly and signal endpoints merged into one record per modem
// - Derived totals and unit cleanup for signal readings
// - Per-modem failure isolation within every read cycle
//
// =====================================================================================

pub mod error;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use error::{ModemError, SinkError};
pub use models::{
    CycleReport, DerivedStat, EmitPolicy, EndpointSpec, FieldValue, MergedStatRecord, MetricKind,
    MetricMappingEntry, OutputSample, PreparedValue, ProbeReport, RawFieldRecord, ValueRecord,
    ValueTransform, DERIVED_STATS, DEVICE_ENDPOINTS, PLUGIN_NAME, VALUE_MAPPING,
};

pub use services::{
    DeviceSession, Dispatcher, EndpointAggregator, FieldMapper, JsonLinesSink, LogSink,
    MemorySink, MetricSink, ModemCollectorService, PutvalSink,
};
