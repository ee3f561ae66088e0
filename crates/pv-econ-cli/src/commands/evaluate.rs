use clap::Args;
use serde_json::{json, Value};

use pv_econ_core::payback::Payback;
use pv_econ_core::sensitivity::SensitivityLogEntry;
use pv_econ_core::{evaluate_project, Metric, ProjectParameters};

use crate::input;

/// Arguments for a full project evaluation
#[derive(Args)]
pub struct EvaluateArgs {
    /// Parameters document (YAML or JSON); JSON on stdin if omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Write the derived-results document here
    #[arg(long)]
    pub results_out: Option<String>,

    /// Sensitivity log to append this run to
    #[arg(long, default_value = "sensitivity_log.yaml")]
    pub log_file: String,

    /// Do not append to the sensitivity log
    #[arg(long)]
    pub no_log: bool,
}

pub(crate) fn metric_json(metric: &Metric) -> Value {
    match metric.value() {
        Some(v) => json!(v.to_string()),
        None => Value::Null,
    }
}

pub(crate) fn payback_json(payback: &Payback) -> (Value, Value) {
    match payback {
        Payback::Reached {
            year,
            break_even_year,
        } => (json!(year.round_dp(2).to_string()), json!(break_even_year)),
        Payback::NotWithinHorizon => (Value::Null, Value::Null),
    }
}

pub fn run_evaluate(args: EvaluateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params: ProjectParameters = input::read_input(args.input.as_deref())?;
    let output = evaluate_project(&params)?;
    let eval = &output.result;
    let fr = &eval.financial_result;

    if let Some(ref path) = args.results_out {
        input::file::write_document(path, &eval.to_document())?;
    }

    if !args.no_log {
        let mut log = input::file::read_log(&args.log_file)?;
        log.push(SensitivityLogEntry::capture(&params, fr)?);
        input::file::write_document(&args.log_file, &log)?;
        tracing::info!(entries = log.len(), path = %args.log_file, "run logged");
    }

    let (payback_year, break_even_year) = payback_json(&fr.payback);
    let (dynamic_payback_year, dynamic_break_even_year) = payback_json(&fr.dynamic_payback);

    Ok(json!({
        "result": {
            "project": eval.project.name,
            "initial_investment": eval.investment.total.to_string(),
            "total_income": eval.cashflow.total_income.to_string(),
            "total_expense": eval.cashflow.total_expense.to_string(),
            "total_net_cashflow": eval.net_cashflow.total_net_cashflow.to_string(),
            "real_rate": fr.real_rate.to_string(),
            "static_npv": fr.static_npv.round_dp(2).to_string(),
            "static_irr": metric_json(&fr.static_irr),
            "dynamic_npv": fr.dynamic_npv.round_dp(2).to_string(),
            "dynamic_irr": metric_json(&fr.dynamic_irr),
            "discounted_series_irr": metric_json(&fr.discounted_series_irr),
            "payback_year": payback_year,
            "break_even_year": break_even_year,
            "dynamic_payback_year": dynamic_payback_year,
            "dynamic_break_even_year": dynamic_break_even_year,
            "annual": serde_json::to_value(eval.annual_records())?,
        },
        "methodology": output.methodology,
        "assumptions": output.assumptions,
        "warnings": output.warnings,
        "metadata": serde_json::to_value(&output.metadata)?,
    }))
}
