//! Run history of inputs and headline outputs, and tornado ranking of the
//! inputs by their correlation with a chosen output.

pub mod log;
pub mod tornado;

pub use log::{SensitivityLog, SensitivityLogEntry, Snapshot};
pub use tornado::{analyze, Direction, TornadoAnalysis, TornadoReport, TornadoRow, MIN_LOG_ENTRIES};
