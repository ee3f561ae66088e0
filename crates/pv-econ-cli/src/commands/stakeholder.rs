use clap::Args;
use serde_json::{json, Value};

use pv_econ_core::stakeholder::{all_ledgers, ledger_for, StakeholderLedger};
use pv_econ_core::{ComputationOutput, ProjectParameters, ResultsDocument};

use crate::commands::evaluate::{metric_json, payback_json};
use crate::input;

/// Arguments for stakeholder ledgers
#[derive(Args)]
pub struct StakeholderArgs {
    /// Parameters document (YAML or JSON); JSON on stdin if omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Derived-results document holding at least the investment and cashflow stages
    #[arg(long)]
    pub results: String,

    /// Only this stakeholder (default: all configured stakeholders)
    #[arg(long)]
    pub name: Option<String>,

    /// Write the full ledger document(s) here
    #[arg(long)]
    pub ledger_out: Option<String>,
}

fn ledger_summary(out: &ComputationOutput<StakeholderLedger>) -> Result<Value, Box<dyn std::error::Error>> {
    let ledger = &out.result;
    let ind = &ledger.indicators;
    let (payback_year, break_even_year) = payback_json(&ind.payback);
    Ok(json!({
        "name": ledger.name,
        "initial_contribution": ledger.initial_contribution.total.to_string(),
        "loan_principal": ledger.loan_principal.to_string(),
        "payback_year": payback_year,
        "break_even_year": break_even_year,
        "total_profit": ind.total_profit.round_dp(2).to_string(),
        "npv": ind.npv.round_dp(2).to_string(),
        "irr": metric_json(&ind.irr),
        "years": serde_json::to_value(&ledger.years)?,
    }))
}

pub fn run_stakeholder(args: StakeholderArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params: ProjectParameters = input::read_input(args.input.as_deref())?;
    params.validate()?;
    let doc: ResultsDocument = input::file::read_document_or_default(&args.results)?;

    let ledgers = match args.name {
        Some(ref name) => vec![ledger_for(&params, name, &doc)?],
        None => {
            if params.stakeholders.is_empty() {
                return Err("no stakeholders configured in the parameters document".into());
            }
            all_ledgers(&params, &doc)?
        }
    };

    if let Some(ref path) = args.ledger_out {
        let full: Vec<&StakeholderLedger> = ledgers.iter().map(|l| &l.result).collect();
        input::file::write_document(path, &full)?;
    }

    let warnings: Vec<String> = ledgers
        .iter()
        .flat_map(|l| {
            l.warnings
                .iter()
                .map(move |w| format!("{}: {}", l.result.name, w))
        })
        .collect();

    let result = if ledgers.len() == 1 {
        ledger_summary(&ledgers[0])?
    } else {
        let summaries = ledgers
            .iter()
            .map(ledger_summary)
            .collect::<Result<Vec<_>, _>>()?;
        json!({ "stakeholders": summaries })
    };

    Ok(json!({
        "result": result,
        "methodology": ledgers.first().map(|l| l.methodology.clone()).unwrap_or_default(),
        "warnings": warnings,
    }))
}
