use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::cashflow::{project_cashflows, CashflowSchedule};
use crate::discounting::{discount_cashflows, DiscountedCashflowSchedule};
use crate::error::PvEconError;
use crate::investment::{calculate_investment, InvestmentBreakdown};
use crate::net_cashflow::{net_cashflows, NetCashflowSchedule};
use crate::params::{ProjectInfo, ProjectParameters};
use crate::payback::{payback_analysis, FinancialResult};
use crate::types::{with_metadata, ComputationOutput, Energy, Money};
use crate::PvEconResult;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Evaluation stages in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Investment,
    Cashflow,
    NetCashflow,
    Discounting,
    Payback,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Investment,
        Stage::Cashflow,
        Stage::NetCashflow,
        Stage::Discounting,
        Stage::Payback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Investment => "investment",
            Stage::Cashflow => "cashflow",
            Stage::NetCashflow => "net_cashflow",
            Stage::Discounting => "discounting",
            Stage::Payback => "payback",
        }
    }

    /// Stages whose results this one reads.
    pub fn requires(&self) -> &'static [Stage] {
        match self {
            Stage::Investment => &[],
            Stage::Cashflow => &[Stage::Investment],
            Stage::NetCashflow => &[Stage::Investment, Stage::Cashflow],
            Stage::Discounting => &[Stage::NetCashflow],
            Stage::Payback => &[Stage::NetCashflow, Stage::Discounting],
        }
    }

    fn downstream(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL.into_iter().filter(move |s| s > self)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = PvEconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| {
                PvEconError::invalid(
                    "stage",
                    format!(
                        "unknown stage '{s}', expected one of: {}",
                        Stage::ALL.map(|st| st.as_str()).join(", ")
                    ),
                )
            })
    }
}

// ---------------------------------------------------------------------------
// Derived-results document
// ---------------------------------------------------------------------------

/// Persisted stage results. Any slot may be empty when the document was
/// produced by a partial run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment: Option<InvestmentBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cashflow: Option<CashflowSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_cashflow: Option<NetCashflowSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounted_cashflow: Option<DiscountedCashflowSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_result: Option<FinancialResult>,
}

fn require<'a, T>(slot: &'a Option<T>, stage: Stage, requires: Stage) -> PvEconResult<&'a T> {
    slot.as_ref().ok_or_else(|| PvEconError::MissingDependency {
        stage: stage.to_string(),
        requires: requires.to_string(),
    })
}

impl ResultsDocument {
    pub fn has(&self, stage: Stage) -> bool {
        match stage {
            Stage::Investment => self.investment.is_some(),
            Stage::Cashflow => self.cashflow.is_some(),
            Stage::NetCashflow => self.net_cashflow.is_some(),
            Stage::Discounting => self.discounted_cashflow.is_some(),
            Stage::Payback => self.financial_result.is_some(),
        }
    }

    fn clear(&mut self, stage: Stage) {
        match stage {
            Stage::Investment => self.investment = None,
            Stage::Cashflow => self.cashflow = None,
            Stage::NetCashflow => self.net_cashflow = None,
            Stage::Discounting => self.discounted_cashflow = None,
            Stage::Payback => self.financial_result = None,
        }
    }

    /// Recompute one stage from `params` and the upstream slots.
    ///
    /// On success the stage's slot is replaced, every downstream slot is
    /// cleared, and the stage warnings are returned. On failure the document
    /// is left untouched.
    pub fn run_stage(&mut self, stage: Stage, params: &ProjectParameters) -> PvEconResult<Vec<String>> {
        let span = tracing::debug_span!("stage", name = stage.as_str());
        let _guard = span.enter();

        let warnings = match stage {
            Stage::Investment => {
                let out = calculate_investment(&params.solar, &params.construction)?;
                self.investment = Some(out.result);
                out.warnings
            }
            Stage::Cashflow => {
                let investment = require(&self.investment, stage, Stage::Investment)?;
                let out = project_cashflows(&params.solar, &params.financial, investment)?;
                self.cashflow = Some(out.result);
                out.warnings
            }
            Stage::NetCashflow => {
                let investment = require(&self.investment, stage, Stage::Investment)?;
                let cashflow = require(&self.cashflow, stage, Stage::Cashflow)?;
                let out = net_cashflows(cashflow, investment.total)?;
                self.net_cashflow = Some(out.result);
                out.warnings
            }
            Stage::Discounting => {
                let net = require(&self.net_cashflow, stage, Stage::NetCashflow)?;
                let out = discount_cashflows(net, &params.financial)?;
                self.discounted_cashflow = Some(out.result);
                out.warnings
            }
            Stage::Payback => {
                let net = require(&self.net_cashflow, stage, Stage::NetCashflow)?;
                let discounted = require(&self.discounted_cashflow, stage, Stage::Discounting)?;
                let out = payback_analysis(net, discounted)?;
                self.financial_result = Some(out.result);
                out.warnings
            }
        };

        for downstream in stage.downstream() {
            if self.has(downstream) {
                tracing::debug!(cleared = downstream.as_str(), "downstream result invalidated");
            }
            self.clear(downstream);
        }
        Ok(warnings)
    }
}

// ---------------------------------------------------------------------------
// Full evaluation
// ---------------------------------------------------------------------------

/// One row of the combined per-year table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualRecord {
    pub year: u32,
    pub generation: Energy,
    pub total_income: Money,
    pub total_expense: Money,
    pub net_cashflow: Money,
    pub cumulative: Money,
    pub present_value: Money,
    pub cumulative_present_value: Money,
}

/// Every stage result of a complete run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEvaluation {
    pub project: ProjectInfo,
    pub investment: InvestmentBreakdown,
    pub cashflow: CashflowSchedule,
    pub net_cashflow: NetCashflowSchedule,
    pub discounted_cashflow: DiscountedCashflowSchedule,
    pub financial_result: FinancialResult,
}

impl ProjectEvaluation {
    fn from_document(project: ProjectInfo, doc: ResultsDocument) -> PvEconResult<Self> {
        let missing = |requires: Stage| PvEconError::MissingDependency {
            stage: "evaluation".into(),
            requires: requires.to_string(),
        };
        Ok(ProjectEvaluation {
            project,
            investment: doc.investment.ok_or_else(|| missing(Stage::Investment))?,
            cashflow: doc.cashflow.ok_or_else(|| missing(Stage::Cashflow))?,
            net_cashflow: doc.net_cashflow.ok_or_else(|| missing(Stage::NetCashflow))?,
            discounted_cashflow: doc
                .discounted_cashflow
                .ok_or_else(|| missing(Stage::Discounting))?,
            financial_result: doc.financial_result.ok_or_else(|| missing(Stage::Payback))?,
        })
    }

    pub fn to_document(&self) -> ResultsDocument {
        ResultsDocument {
            investment: Some(self.investment.clone()),
            cashflow: Some(self.cashflow.clone()),
            net_cashflow: Some(self.net_cashflow.clone()),
            discounted_cashflow: Some(self.discounted_cashflow.clone()),
            financial_result: Some(self.financial_result.clone()),
        }
    }

    /// Per-year generation, income, expense and cash-flow columns side by side.
    pub fn annual_records(&self) -> Vec<AnnualRecord> {
        self.cashflow
            .income
            .iter()
            .zip(&self.cashflow.expense)
            .zip(&self.net_cashflow.rows)
            .zip(&self.discounted_cashflow.rows)
            .map(|(((inc, exp), net), disc)| AnnualRecord {
                year: inc.year,
                generation: inc.generation,
                total_income: inc.total_income,
                total_expense: exp.total_expense,
                net_cashflow: net.net_cashflow,
                cumulative: net.cumulative,
                present_value: disc.present_value,
                cumulative_present_value: disc.cumulative_present_value,
            })
            .collect()
    }
}

/// Validate the parameters and run every stage in order.
pub fn evaluate_project(params: &ProjectParameters) -> PvEconResult<ComputationOutput<ProjectEvaluation>> {
    let start = Instant::now();
    params.validate()?;

    let mut doc = ResultsDocument::default();
    let mut warnings: Vec<String> = Vec::new();
    for stage in Stage::ALL {
        warnings.extend(doc.run_stage(stage, params)?);
    }

    let output = ProjectEvaluation::from_document(params.project.clone(), doc)?;

    tracing::info!(
        project = %output.project.name,
        static_npv = %output.financial_result.static_npv,
        payback = ?output.financial_result.payback.year(),
        "project evaluated"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "PV Project Economics: investment, yield, cash flow, discounting, payback",
        &serde_json::json!({
            "lifetime_years": params.financial.lifetime_years,
            "discount_rate_pct": params.financial.discount_rate_pct.to_string(),
            "inflation_rate_pct": params.financial.inflation_rate_pct.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_round_trips_through_str() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("generation".parse::<Stage>().is_err());
    }

    #[test]
    fn test_requirements_point_upstream() {
        for stage in Stage::ALL {
            assert!(stage.requires().iter().all(|r| r < &stage));
        }
    }

    #[test]
    fn test_downstream_order() {
        let d: Vec<Stage> = Stage::NetCashflow.downstream().collect();
        assert_eq!(d, vec![Stage::Discounting, Stage::Payback]);
        assert_eq!(Stage::Payback.downstream().count(), 0);
    }

    #[test]
    fn test_empty_document_deserializes() {
        let doc: ResultsDocument = serde_json::from_str("{}").unwrap();
        assert!(Stage::ALL.iter().all(|s| !doc.has(*s)));
    }
}
