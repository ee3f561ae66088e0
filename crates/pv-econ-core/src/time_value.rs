use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::PvEconError;
use crate::types::{Money, Rate};
use crate::PvEconResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const MAX_BISECTION_ITERATIONS: u32 = 200;
const RATE_FLOOR: Decimal = dec!(-0.99);
const RATE_CAP: Decimal = dec!(10);

/// Starting point for IRR searches over project and stakeholder series.
pub(crate) const IRR_GUESS: Rate = dec!(0.10);

/// Bracket edges scanned when Newton-Raphson fails to converge.
const BRACKET_GRID: [Decimal; 12] = [
    dec!(-0.99),
    dec!(-0.9),
    dec!(-0.5),
    dec!(-0.2),
    dec!(0),
    dec!(0.1),
    dec!(0.2),
    dec!(0.5),
    dec!(1),
    dec!(2),
    dec!(5),
    dec!(10),
];

/// Net Present Value of a series of cash flows. The first flow is at t = 0.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> PvEconResult<Money> {
    if rate <= dec!(-1) {
        return Err(PvEconError::InvalidParameter {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    // None once (1 + r)^t leaves the Decimal range
    let mut discount = Some(Decimal::ONE);

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.and_then(|d| d.checked_mul(one_plus_r));
        }
        let pv = match discount {
            Some(d) if d.is_zero() => None,
            Some(d) => cf.checked_div(d),
            None => discount_beyond_range(*cf, one_plus_r, t as u64),
        };
        result += pv.ok_or_else(|| PvEconError::DivideByZero {
            context: format!("NPV discounted flow at period {t}"),
        })?;
    }

    Ok(result)
}

/// `cf / (1 + r)^t` for a growth factor too large to represent, computed as
/// `cf * (1 / (1 + r))^t`, which only shrinks towards zero.
pub(crate) fn discount_beyond_range(cf: Money, one_plus_r: Decimal, t: u64) -> Option<Money> {
    if one_plus_r <= Decimal::ONE {
        return None;
    }
    let shrink = Decimal::ONE.checked_div(one_plus_r)?.checked_powi(t as i64)?;
    cf.checked_mul(shrink)
}

/// NPV and its derivative with respect to the rate, or `None` when the
/// decimal range is exhausted at this rate.
fn npv_and_derivative(rate: Rate, cash_flows: &[Money]) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r)?;
        }
        if discount.is_zero() {
            return None;
        }
        npv_val = npv_val.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let t_dec = Decimal::from(t as i64);
            let denom = discount.checked_mul(one_plus_r)?;
            if denom.is_zero() {
                return None;
            }
            dnpv = dnpv.checked_sub(t_dec.checked_mul(*cf)?.checked_div(denom)?)?;
        }
    }

    Some((npv_val, dnpv))
}

fn has_sign_change(cash_flows: &[Money]) -> bool {
    let has_negative = cash_flows.iter().any(|cf| cf.is_sign_negative() && !cf.is_zero());
    let has_positive = cash_flows.iter().any(|cf| cf > &Decimal::ZERO);
    has_negative && has_positive
}

fn newton_raphson(cash_flows: &[Money], guess: Rate) -> Option<Rate> {
    let mut rate = guess;

    for _ in 0..MAX_IRR_ITERATIONS {
        let (npv_val, dnpv) = npv_and_derivative(rate, cash_flows)?;

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Some(rate);
        }
        if dnpv.is_zero() {
            return None;
        }

        rate -= npv_val.checked_div(dnpv)?;

        // Guard against divergence
        if rate < RATE_FLOOR {
            rate = RATE_FLOOR;
        } else if rate > RATE_CAP {
            rate = RATE_CAP;
        }
    }

    None
}

fn bisection(cash_flows: &[Money]) -> Option<Rate> {
    let value_at = |r: Rate| npv_and_derivative(r, cash_flows).map(|(v, _)| v);

    for pair in BRACKET_GRID.windows(2) {
        let (mut lo, mut hi) = (pair[0], pair[1]);
        let (Some(mut f_lo), Some(f_hi)) = (value_at(lo), value_at(hi)) else {
            continue;
        };
        if f_lo.is_zero() {
            return Some(lo);
        }
        if f_hi.is_zero() {
            return Some(hi);
        }
        if f_lo.is_sign_negative() == f_hi.is_sign_negative() {
            continue;
        }

        for _ in 0..MAX_BISECTION_ITERATIONS {
            let mid = (lo + hi) / dec!(2);
            let f_mid = value_at(mid)?;
            if f_mid.abs() < CONVERGENCE_THRESHOLD || (hi - lo).abs() < dec!(0.0000000001) {
                return Some(mid);
            }
            if f_mid.is_sign_negative() == f_lo.is_sign_negative() {
                lo = mid;
                f_lo = f_mid;
            } else {
                hi = mid;
            }
        }
        return Some((lo + hi) / dec!(2));
    }

    None
}

/// Internal Rate of Return. Newton-Raphson from `guess`, falling back to a
/// bracketed bisection over [-99%, 1000%].
pub fn irr(cash_flows: &[Money], guess: Rate) -> PvEconResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(PvEconError::ComputationUnconverged {
            function: "IRR".into(),
            reason: "IRR requires at least 2 cash flows".into(),
        });
    }
    if !has_sign_change(cash_flows) {
        return Err(PvEconError::ComputationUnconverged {
            function: "IRR".into(),
            reason: "cash flow series has no sign change".into(),
        });
    }

    if let Some(rate) = newton_raphson(cash_flows, guess) {
        return Ok(rate);
    }
    tracing::debug!("IRR Newton-Raphson did not converge; bisecting");

    bisection(cash_flows).ok_or_else(|| PvEconError::ComputationUnconverged {
        function: "IRR".into(),
        reason: format!(
            "no root found after {MAX_IRR_ITERATIONS} Newton and {MAX_BISECTION_ITERATIONS} bisection iterations"
        ),
    })
}

/// Payment (PMT)
pub fn pmt(rate: Rate, nper: u32, present_value: Money, future_value: Money) -> PvEconResult<Money> {
    if nper == 0 {
        return Err(PvEconError::InvalidParameter {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Err(PvEconError::DivideByZero {
            context: "PMT annuity factor at zero rate".into(),
        });
    }

    // -(pv·F + fv)·r / (F − 1) with F = (1 + r)^n, divided through by F so
    // a long horizon shrinks v = 1/F towards zero instead of overflowing F
    let one_plus_r = Decimal::ONE + rate;
    let degenerate = || PvEconError::DivideByZero {
        context: format!("PMT annuity factor at rate {rate} over {nper} periods"),
    };
    let v = Decimal::ONE
        .checked_div(one_plus_r)
        .and_then(|inv| inv.checked_powi(nper as i64))
        .ok_or_else(degenerate)?;
    let annuity_factor = Decimal::ONE - v;

    if annuity_factor.is_zero() {
        return Err(degenerate());
    }

    future_value
        .checked_mul(v)
        .and_then(|fv| present_value.checked_add(fv))
        .and_then(|x| x.checked_mul(rate))
        .and_then(|x| x.checked_div(annuity_factor))
        .map(|x| -x)
        .ok_or_else(degenerate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        // IRR should be ~9.7%
        assert!((result - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_irr_no_sign_change() {
        let cfs = vec![dec!(100), dec!(200), dec!(300)];
        let err = irr(&cfs, dec!(0.10)).unwrap_err();
        assert!(matches!(err, PvEconError::ComputationUnconverged { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_irr_all_negative() {
        let cfs = vec![dec!(-100), dec!(-5), dec!(-5)];
        assert!(irr(&cfs, dec!(0.10)).is_err());
    }

    #[test]
    fn test_irr_bad_guess_still_converges() {
        // Root near 44%; start far away so the bisection path may be needed
        let cfs = vec![dec!(-100), dec!(0), dec!(0), dec!(300)];
        let result = irr(&cfs, dec!(9.5)).unwrap();
        assert!((result - dec!(0.4422)).abs() < dec!(0.001), "got {result}");
    }

    #[test]
    fn test_irr_roundtrips_through_npv() {
        let cfs = vec![dec!(-132735), dec!(16991), dec!(16722), dec!(16455), dec!(16190)];
        let rate = irr(&cfs, dec!(0.10)).unwrap();
        assert!(rate < Decimal::ZERO);
        let v = npv(rate, &cfs).unwrap();
        assert!(v.abs() < dec!(0.001), "npv at irr = {v}");
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_pmt_annuity() {
        // 100,000 over 10 years at 4%: 12,329.09
        let p = pmt(dec!(0.04), 10, dec!(-100000), Decimal::ZERO).unwrap();
        assert!((p - dec!(12329.09)).abs() < dec!(0.01), "got {p}");
    }

    #[test]
    fn test_pmt_long_horizon_tends_to_interest_only() {
        // (1 + r)^n is far outside the Decimal range here
        let p = pmt(dec!(1), 100, dec!(-1000), Decimal::ZERO).unwrap();
        assert!((p - dec!(1000)).abs() < dec!(0.000001), "got {p}");
    }

    #[test]
    fn test_npv_long_horizon_at_high_rate() {
        let cfs = vec![dec!(1000); 120];
        let result = npv(dec!(1), &cfs).unwrap();
        // Geometric sum 1000 * (1 + 1/2 + 1/4 + ...) < 2000
        assert!((result - dec!(2000)).abs() < dec!(0.000001), "got {result}");
    }

    #[test]
    fn test_pmt_zero_rate_is_degenerate() {
        let err = pmt(Decimal::ZERO, 10, dec!(-1000), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, PvEconError::DivideByZero { .. }));
    }
}
