use clap::Args;
use serde_json::{json, Value};

use pv_econ_core::sensitivity::analyze;
use pv_econ_core::Availability;

use crate::input;

/// Arguments for tornado sensitivity ranking
#[derive(Args)]
pub struct TornadoArgs {
    /// Sensitivity log written by `evaluate`
    #[arg(long, default_value = "sensitivity_log.yaml")]
    pub log_file: String,

    /// Output to rank inputs against (e.g. output.static_npv, dynamic_irr)
    #[arg(long, default_value = "output.static_npv")]
    pub metric: String,
}

pub fn run_tornado(args: TornadoArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let log = input::file::read_log(&args.log_file)?;
    let output = analyze(&log, &args.metric)?;
    let analysis = &output.result;

    let mut result = json!({
        "metric": analysis.metric,
        "sample_size": analysis.sample_size,
    });
    match &analysis.ranking {
        Availability::Available { value } => {
            result["status"] = json!("available");
            result["rows"] = serde_json::to_value(&value.rows)?;
        }
        Availability::Unavailable { reason } => {
            result["status"] = json!("unavailable");
            result["reason"] = json!(reason);
        }
    }

    Ok(json!({
        "result": result,
        "methodology": output.methodology,
        "warnings": output.warnings,
    }))
}
