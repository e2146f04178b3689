// =====================================================================================
// DISPATCHER ADAPTER
// =====================================================================================

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use crate::error::SinkError;
use crate::models::{OutputSample, ValueRecord, PLUGIN_NAME};

/// The monitoring system's side of the boundary. Implementations transport
/// the record; the collector only builds and submits it.
pub trait MetricSink: Send + Sync {
    fn name(&self) -> &str;

    fn dispatch(&self, record: &ValueRecord) -> Result<(), SinkError>;
}

#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn MetricSink>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self { sink }
    }

    pub fn to_record(sample: &OutputSample) -> ValueRecord {
        ValueRecord {
            plugin: PLUGIN_NAME.to_string(),
            plugin_instance: sample.instance_name.clone(),
            kind: sample.kind,
            type_instance: sample.metric_name.clone(),
            values: vec![sample.value],
            time: Utc::now(),
        }
    }

    /// Hands one sample to the sink. Returns whether the sink accepted it;
    /// a sink failure is logged and goes no further.
    pub fn emit(&self, sample: &OutputSample) -> bool {
        let record = Self::to_record(sample);

        match self.sink.dispatch(&record) {
            Ok(()) => {
                debug!(
                    "Dispatched value for {}/{}: {:?}",
                    record.plugin_instance, record.type_instance, record.values
                );
                true
            }
            Err(e) => {
                error!(
                    "Sink {} rejected {}/{}: {}",
                    self.sink.name(),
                    record.plugin_instance,
                    record.type_instance,
                    e
                );
                false
            }
        }
    }
}
