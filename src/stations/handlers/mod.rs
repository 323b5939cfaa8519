mod alerts;
mod metrics;
mod stations;
mod telemetry;

pub use alerts::*;
pub use metrics::*;
pub use stations::*;
pub use telemetry::*;
