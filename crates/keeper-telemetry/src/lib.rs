//! Structured logging, Prometheus counters and diagnostic sinks.
//!
//! Provides observability for the ledger:
//! - Structured logging with tracing (JSON in production)
//! - Prometheus counters for fills, placements, cancels and gateway errors
//! - `EventSink`: the injected diagnostic sink the ledger reports to

pub mod error;
pub mod logging;
pub mod metrics;
pub mod sink;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
pub use sink::{EventSink, LedgerEvent, RecordingSink, TracingSink};
