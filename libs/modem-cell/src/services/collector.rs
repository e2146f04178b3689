// =====================================================================================
// MODEM COLLECTOR SERVICE - PER-INSTANCE READ CYCLE
// =====================================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, error, info, instrument, warn};

use shared_config::{AppConfig, ModemInstanceConfig};

use crate::error::ModemError;
use crate::models::{
    CycleReport, DerivedStat, EmitPolicy, EndpointSpec, MergedStatRecord, MetricMappingEntry,
    ProbeReport, DERIVED_STATS, DEVICE_ENDPOINTS, PLUGIN_NAME, VALUE_MAPPING,
};
use crate::services::aggregator::EndpointAggregator;
use crate::services::derived::derive;
use crate::services::dispatcher::{Dispatcher, MetricSink};
use crate::services::mapper::FieldMapper;
use crate::services::session::DeviceSession;

pub struct ModemCollectorService {
    instances: Vec<ModemInstanceConfig>,
    aggregator: EndpointAggregator,
    derived_stats: &'static [DerivedStat],
    mapper: FieldMapper,
    dispatcher: Dispatcher,
    fetch_timeout: Duration,
}

impl ModemCollectorService {
    pub fn new(config: &AppConfig, sink: Arc<dyn MetricSink>) -> Self {
        Self::with_tables(config, sink, DEVICE_ENDPOINTS, DERIVED_STATS, VALUE_MAPPING)
    }

    /// Same pipeline over different tables, e.g. for another modem model.
    pub fn with_tables(
        config: &AppConfig,
        sink: Arc<dyn MetricSink>,
        endpoints: &'static [EndpointSpec],
        derived_stats: &'static [DerivedStat],
        mapping: &'static [MetricMappingEntry],
    ) -> Self {
        Self {
            instances: config.instances.clone(),
            aggregator: EndpointAggregator::new(endpoints),
            derived_stats,
            mapper: FieldMapper::new(mapping, EmitPolicy::from_keep_zero(config.keep_zero_readings)),
            dispatcher: Dispatcher::new(sink),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }

    pub fn instances(&self) -> &[ModemInstanceConfig] {
        &self.instances
    }

    /// One read cycle over every configured modem. Instances run
    /// concurrently and fail independently; nothing here is fatal.
    #[instrument(skip(self), fields(instances = self.instances.len()))]
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let results = join_all(
            self.instances
                .iter()
                .map(|instance| self.collect_instance(instance)),
        )
        .await;

        let mut report = CycleReport::default();
        for (instance, result) in self.instances.iter().zip(results) {
            match result {
                Ok(emitted) => {
                    report.instances_ok += 1;
                    report.samples_emitted += emitted;
                }
                Err(e) => {
                    report.instances_failed += 1;
                    error!("Read cycle for {} failed: {}", instance.name, e);
                }
            }
        }

        info!(
            "Read cycle finished in {}ms: {} ok, {} failed, {} values dispatched",
            started.elapsed().as_millis(),
            report.instances_ok,
            report.instances_failed,
            report.samples_emitted
        );

        report
    }

    /// Runs the whole pipeline for one modem and returns how many values
    /// the sink accepted.
    #[instrument(skip(self, instance), fields(instance = %instance.name))]
    pub async fn collect_instance(&self, instance: &ModemInstanceConfig) -> Result<usize, ModemError> {
        let root = instance.root_url();
        debug!("Fetching data from {} for name {}", root, instance.name);

        let record = self.collect_record(&root, &instance.name).await?;
        let samples = self.mapper.map(&record, &instance.name);

        let mut emitted = 0;
        for sample in &samples {
            if self.dispatcher.emit(sample) {
                emitted += 1;
            }
        }

        debug!("{} of {} values dispatched", emitted, samples.len());
        Ok(emitted)
    }

    /// Fetch-and-print support: one pass against `root_url` without
    /// dispatching anything.
    pub async fn probe(&self, root_url: &str) -> Result<ProbeReport, ModemError> {
        let record = self.collect_record(root_url, root_url).await?;
        let prepared = self.mapper.prepare(&record);

        Ok(ProbeReport {
            root_url: root_url.to_string(),
            plugin: PLUGIN_NAME.to_string(),
            record,
            prepared,
        })
    }

    async fn collect_record(&self, root_url: &str, instance_name: &str) -> Result<MergedStatRecord, ModemError> {
        let session = DeviceSession::open(root_url, self.fetch_timeout).await?;
        let mut record = self.aggregator.aggregate(&session, instance_name).await;

        if record.is_empty() {
            warn!("{}: no endpoint returned any fields", instance_name);
        }

        if let Err(e) = derive(&mut record, self.derived_stats) {
            warn!("{}: no derived stats this cycle: {}", instance_name, e);
        }

        Ok(record)
    }
}
