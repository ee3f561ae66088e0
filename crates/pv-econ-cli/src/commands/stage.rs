use clap::Args;
use serde_json::{json, Value};

use pv_econ_core::{ProjectParameters, ResultsDocument, Stage};

use crate::input;

/// Arguments for re-running a single stage
#[derive(Args)]
pub struct StageArgs {
    /// Stage to run: investment, cashflow, net_cashflow, discounting, payback
    #[arg(long)]
    pub stage: Stage,

    /// Parameters document (YAML or JSON); JSON on stdin if omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Derived-results document to update in place (created if missing)
    #[arg(long)]
    pub results: String,
}

pub fn run_stage(args: StageArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params: ProjectParameters = input::read_input(args.input.as_deref())?;
    params.validate()?;

    let mut doc: ResultsDocument = input::file::read_document_or_default(&args.results)?;
    let warnings = doc.run_stage(args.stage, &params)?;
    input::file::write_document(&args.results, &doc)?;

    let present: Vec<&str> = Stage::ALL
        .iter()
        .filter(|s| doc.has(**s))
        .map(|s| s.as_str())
        .collect();

    Ok(json!({
        "result": {
            "stage": args.stage.as_str(),
            "results": args.results,
            "stages_present": present.join(", "),
        },
        "warnings": warnings,
    }))
}
