use pretty_assertions::assert_eq;
use pv_econ_core::params::{LoanTerms, RepaymentMethod};
use pv_econ_core::payback::Payback;
use pv_econ_core::stakeholder::{all_ledgers, build_loan_schedule, ledger_for};
use pv_econ_core::time_value::{irr, npv};
use pv_econ_core::{evaluate_project, PvEconError, ProjectParameters, ResultsDocument, Stage};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn params() -> ProjectParameters {
    serde_json::from_value(serde_json::json!({
        "project": { "name": "shared rooftop" },
        "solar": {
            "annual_irradiation": 1200, "panel_area": 500,
            "conversion_efficiency": 0.20, "performance_ratio": 0.85,
            "annual_degradation_pct": 1
        },
        "construction": {
            "panel_price_per_m2": 150, "inverter_price": 20000,
            "installation_cost_per_m2": 30, "design_cost": 10000,
            "decision_cost": 5000, "other_initial_cost": 25000
        },
        "financial": {
            "lifetime_years": 20, "sell_ratio_pct": 40, "sell_price": 0.4,
            "use_price": 0.6, "subsidy": 0.05, "maintenance_cost_per_m2": 5,
            "tax_rate_pct": 10, "depreciation_rate_pct": 5,
            "discount_rate_pct": 6, "inflation_rate_pct": 2
        },
        "rental": { "unit_price": 2, "area": 500, "lease_years": 20 },
        "stakeholders": [
            {
                "name": "enterprise",
                "investment_ratios": {
                    "panels": 1, "inverter": 1, "installation": 1,
                    "design": 1, "decision": 1, "other": 1
                },
                "income_ratios": { "sale_income": 1, "self_use_income": 1 },
                "expense_ratios": { "maintenance": 1, "tax": 1, "depreciation": 1 },
                "rent_role": "payer",
                "loan": {
                    "principal": 100000, "annual_rate_pct": 5,
                    "term_years": 10, "method": "equal_principal"
                }
            },
            {
                "name": "owner",
                "rent_role": "recipient"
            }
        ]
    }))
    .unwrap()
}

fn document(p: &ProjectParameters) -> ResultsDocument {
    evaluate_project(p).unwrap().result.to_document()
}

fn close(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < dec!(0.01)
}

#[test]
fn test_enterprise_year_zero_is_loan_minus_contribution() {
    let p = params();
    let ledger = ledger_for(&p, "enterprise", &document(&p)).unwrap().result;
    assert_eq!(ledger.initial_contribution.total, dec!(150000));
    assert_eq!(ledger.loan_principal, dec!(100000));
    assert_eq!(ledger.years[0].year, 0);
    assert_eq!(ledger.years[0].net_cashflow, dec!(-50000));
}

#[test]
fn test_enterprise_merges_rent_and_loan() {
    let p = params();
    let ledger = ledger_for(&p, "enterprise", &document(&p)).unwrap().result;
    assert_eq!(ledger.years.len(), 21);
    let y1 = &ledger.years[1];
    assert_eq!(y1.rent_paid, dec!(1000));
    assert_eq!(y1.rent_received, Decimal::ZERO);
    assert_eq!(y1.loan_payment, dec!(15000));
    assert!(close(y1.net_cashflow, dec!(1264.60)));
    // Loan repaid after year 10
    assert_eq!(ledger.years[11].loan_payment, Decimal::ZERO);
}

#[test]
fn test_enterprise_indicators() {
    let p = params();
    let ledger = ledger_for(&p, "enterprise", &document(&p)).unwrap().result;
    let ind = &ledger.indicators;
    match ind.payback {
        Payback::Reached {
            year,
            break_even_year,
        } => {
            assert!((year - dec!(11.9801)).abs() < dec!(0.001), "payback {year}");
            assert_eq!(break_even_year, 12);
        }
        Payback::NotWithinHorizon => panic!("enterprise should pay back"),
    }
    assert!(close(ind.total_profit, dec!(98969.45)));
    assert_eq!(ind.total_profit, ledger.years.last().unwrap().cumulative);
    assert!(close(ind.npv, dec!(18393.35)));
    assert!(ind.irr.is_available());
}

#[test]
fn test_enterprise_irr_searched_like_project_irr() {
    let p = params();
    let ledger = ledger_for(&p, "enterprise", &document(&p)).unwrap().result;
    let flows: Vec<Decimal> = ledger.years.iter().map(|y| y.net_cashflow).collect();
    let rate = *ledger.indicators.irr.value().unwrap();
    assert_eq!(rate, irr(&flows, dec!(0.10)).unwrap());
    assert!(npv(rate, &flows).unwrap().abs() < dec!(1));
}

#[test]
fn test_rent_recipient_without_investment() {
    let p = params();
    let ledger = ledger_for(&p, "owner", &document(&p)).unwrap().result;
    assert_eq!(ledger.initial_contribution.total, Decimal::ZERO);
    assert_eq!(ledger.years[0].net_cashflow, Decimal::ZERO);
    assert!(ledger.years[1..].iter().all(|y| y.net_cashflow == dec!(1000)));
    assert_eq!(ledger.indicators.total_profit, dec!(20000));
    // Never negative, so there is nothing to recover
    assert_eq!(ledger.indicators.payback, Payback::NotWithinHorizon);
    assert!(!ledger.indicators.irr.is_available());
}

#[test]
fn test_rent_is_zero_sum_between_payer_and_recipient() {
    let p = params();
    let doc = document(&p);
    let ledgers = all_ledgers(&p, &doc).unwrap();
    assert_eq!(ledgers.len(), 2);
    let paid: Decimal = ledgers[0].result.years.iter().map(|y| y.rent_paid).sum();
    let received: Decimal = ledgers[1].result.years.iter().map(|y| y.rent_received).sum();
    assert_eq!(paid, received);
}

#[test]
fn test_ledger_requires_shared_results() {
    let p = params();
    let mut doc = ResultsDocument::default();
    doc.run_stage(Stage::Investment, &p).unwrap();
    let err = ledger_for(&p, "enterprise", &doc).unwrap_err();
    match err {
        PvEconError::MissingDependency { stage, requires } => {
            assert_eq!(stage, "stakeholder");
            assert_eq!(requires, "cashflow");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_unknown_stakeholder() {
    let p = params();
    assert!(matches!(
        ledger_for(&p, "bank", &document(&p)),
        Err(PvEconError::InvalidParameter { .. })
    ));
}

#[test]
fn test_rent_role_without_rental_terms_warns() {
    let mut p = params();
    p.rental = None;
    let out = ledger_for(&p, "owner", &document(&p)).unwrap();
    assert!(out.warnings.iter().any(|w| w.contains("no rental terms")));
    assert!(out.result.rent.is_none());
}

#[test]
fn test_loan_longer_than_lifetime_extends_ledger() {
    let mut p = params();
    p.stakeholders[0].loan = Some(LoanTerms {
        principal: dec!(100000),
        annual_rate_pct: dec!(4),
        term_years: 25,
        method: RepaymentMethod::EqualInstallment,
    });
    let ledger = ledger_for(&p, "enterprise", &document(&p)).unwrap().result;
    assert_eq!(ledger.years.last().unwrap().year, 25);
    assert_eq!(ledger.years[22].income, Decimal::ZERO);
    assert!(ledger.years[22].loan_payment > Decimal::ZERO);
}

#[test]
fn test_equal_installment_payments_constant() {
    let schedule = build_loan_schedule(&LoanTerms {
        principal: dec!(250000),
        annual_rate_pct: dec!(4.9),
        term_years: 15,
        method: RepaymentMethod::EqualInstallment,
    })
    .unwrap()
    .result;
    let first = schedule.periods[0].payment;
    assert!(schedule.periods.iter().all(|p| p.payment == first));
    assert!(schedule.periods.windows(2).all(|w| w[1].interest < w[0].interest));
}

#[test]
fn test_equal_principal_principal_sums_exactly() {
    let schedule = build_loan_schedule(&LoanTerms {
        principal: dec!(100000),
        annual_rate_pct: dec!(5),
        term_years: 3,
        method: RepaymentMethod::EqualPrincipal,
    })
    .unwrap()
    .result;
    assert_eq!(schedule.total_principal, dec!(100000));
    assert_eq!(schedule.periods[2].closing_balance, Decimal::ZERO);
}
