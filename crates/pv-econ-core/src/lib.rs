pub mod error;
pub mod time_value;
pub mod types;

pub mod params;

pub mod investment;

pub mod generation;

pub mod cashflow;

pub mod net_cashflow;

pub mod discounting;

pub mod payback;

pub mod pipeline;

#[cfg(feature = "stakeholder")]
pub mod stakeholder;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

pub use error::PvEconError;
pub use params::ProjectParameters;
pub use pipeline::{evaluate_project, ProjectEvaluation, ResultsDocument, Stage};
pub use types::*;

/// Standard result type for all pv-econ operations
pub type PvEconResult<T> = Result<T, PvEconError>;
