pub mod aggregator;
pub mod collector;
pub mod derived;
pub mod dispatcher;
pub mod mapper;
pub mod session;
pub mod sinks;
pub mod xml;

pub use aggregator::EndpointAggregator;
pub use collector::ModemCollectorService;
pub use dispatcher::{Dispatcher, MetricSink};
pub use mapper::FieldMapper;
pub use session::DeviceSession;
pub use sinks::{JsonLinesSink, LogSink, MemorySink, PutvalSink};
