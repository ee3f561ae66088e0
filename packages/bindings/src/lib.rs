use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use pv_econ_core::params::{LoanTerms, ProjectParameters};
use pv_econ_core::payback::FinancialResult;
use pv_econ_core::pipeline::{ResultsDocument, Stage};
use pv_econ_core::sensitivity::{self, SensitivityLog, SensitivityLogEntry};
use pv_econ_core::stakeholder;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse<T: DeserializeOwned>(json: &str) -> NapiResult<T> {
    serde_json::from_str(json).map_err(to_napi_error)
}

fn render<T: Serialize>(value: &T) -> NapiResult<String> {
    serde_json::to_string(value).map_err(to_napi_error)
}

/// An empty string stands for a document with no stages yet.
fn parse_document(document_json: &str) -> NapiResult<ResultsDocument> {
    if document_json.trim().is_empty() {
        Ok(ResultsDocument::default())
    } else {
        parse(document_json)
    }
}

// ---------------------------------------------------------------------------
// Project evaluation
// ---------------------------------------------------------------------------

#[napi]
pub fn evaluate_project(params_json: String) -> NapiResult<String> {
    let params: ProjectParameters = parse(&params_json)?;
    let output = pv_econ_core::evaluate_project(&params).map_err(to_napi_error)?;
    render(&output)
}

/// Run one stage against a results document and return the updated document.
#[napi]
pub fn run_stage(params_json: String, document_json: String, stage: String) -> NapiResult<String> {
    let params: ProjectParameters = parse(&params_json)?;
    params.validate().map_err(to_napi_error)?;
    let stage: Stage = stage.parse().map_err(to_napi_error)?;
    let mut doc = parse_document(&document_json)?;
    doc.run_stage(stage, &params).map_err(to_napi_error)?;
    render(&doc)
}

// ---------------------------------------------------------------------------
// Stakeholders
// ---------------------------------------------------------------------------

/// Ledger of one stakeholder, or of all of them when `name` is omitted.
#[napi]
pub fn stakeholder_ledger(
    params_json: String,
    document_json: String,
    name: Option<String>,
) -> NapiResult<String> {
    let params: ProjectParameters = parse(&params_json)?;
    params.validate().map_err(to_napi_error)?;
    let doc = parse_document(&document_json)?;
    match name {
        Some(name) => {
            let output = stakeholder::ledger_for(&params, &name, &doc).map_err(to_napi_error)?;
            render(&output)
        }
        None => {
            let outputs = stakeholder::all_ledgers(&params, &doc).map_err(to_napi_error)?;
            render(&outputs)
        }
    }
}

#[napi]
pub fn loan_schedule(terms_json: String) -> NapiResult<String> {
    let terms: LoanTerms = parse(&terms_json)?;
    terms.validate().map_err(to_napi_error)?;
    let output = stakeholder::build_loan_schedule(&terms).map_err(to_napi_error)?;
    render(&output)
}

// ---------------------------------------------------------------------------
// Sensitivity
// ---------------------------------------------------------------------------

/// Snapshot the inputs and headline outputs of one run as a log entry.
#[napi]
pub fn capture_log_entry(params_json: String, financial_result_json: String) -> NapiResult<String> {
    let params: ProjectParameters = parse(&params_json)?;
    let result: FinancialResult = parse(&financial_result_json)?;
    let entry = SensitivityLogEntry::capture(&params, &result).map_err(to_napi_error)?;
    render(&entry)
}

#[napi]
pub fn tornado_analysis(log_json: String, metric: String) -> NapiResult<String> {
    let log: SensitivityLog = parse(&log_json)?;
    let output = sensitivity::analyze(&log, &metric).map_err(to_napi_error)?;
    render(&output)
}
