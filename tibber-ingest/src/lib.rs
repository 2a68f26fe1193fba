pub mod config;
pub mod instrumentation;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod point;
pub mod scheduler;
pub mod sinks;
pub mod transform;

pub use pipeline::{Collector, Cycle, CycleError};
pub use point::{FieldValue, Point};
pub use scheduler::{Scheduler, SchedulerState};
