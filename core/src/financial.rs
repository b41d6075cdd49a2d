//! Financial outcome math: incremental margin, ROI, payback.
//!
//! All inputs must share one currency; the caller converts catalog USD
//! amounts into the control value's local currency before evaluating.
//! The margin percentage (`maco`) arrives as a percent, e.g. 35
//! means 35%.
//!
//! Negative uplift flows through the arithmetic unclamped: the margin and
//! ROI go negative, and payback becomes the explicit does-not-pay-back
//! sentinel instead of a negative month count.

use crate::error::{EngineError, EngineResult};
use serde::ser::Serializer;
use serde::Serialize;

/// Months to recover the investment, or never.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payback {
    Months(f64),
    DoesNotPayBack,
}

impl Serialize for Payback {
    // Wire format: a number, or the string "does_not_pay_back".
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Payback::Months(m) => serializer.serialize_f64(*m),
            Payback::DoesNotPayBack => serializer.serialize_str("does_not_pay_back"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialOutcome {
    /// Incremental margin over the full evaluation horizon.
    pub incremental_annual_margin: f64,
    pub monthly_margin: f64,
    /// (annual margin - investment) / investment.
    pub roi: f64,
    pub payback: Payback,
}

/// Evaluate the P&L of applying a lever combination.
///
/// `uplift` is the fractional volume lift, `control_value` the baseline
/// annual monetary volume, `maco_pct` the margin percentage, `investment`
/// the total capital plus fees in the control value's currency.
pub fn evaluate(
    uplift: f64,
    control_value: f64,
    maco_pct: f64,
    investment: f64,
    horizon_months: u32,
) -> EngineResult<FinancialOutcome> {
    if investment <= 0.0 {
        return Err(EngineError::ZeroInvestment);
    }

    let incremental_annual_margin = control_value * uplift * (maco_pct / 100.0);
    let monthly_margin = incremental_annual_margin / f64::from(horizon_months);
    let roi = (incremental_annual_margin - investment) / investment;
    let payback = if monthly_margin > 0.0 {
        Payback::Months(investment / monthly_margin)
    } else {
        Payback::DoesNotPayBack
    };

    Ok(FinancialOutcome {
        incremental_annual_margin,
        monthly_margin,
        roi,
        payback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_uplift_produces_consistent_signs() {
        let out = evaluate(0.10, 1000.0, 35.0, 20.0, 12).unwrap();
        assert!((out.incremental_annual_margin - 35.0).abs() < 1e-9);
        assert!(out.roi > 0.0);
        match out.payback {
            Payback::Months(m) => assert!(m > 0.0),
            Payback::DoesNotPayBack => panic!("expected finite payback"),
        }
    }

    #[test]
    fn negative_uplift_yields_losses_and_no_payback() {
        let out = evaluate(-0.05, 1000.0, 35.0, 100.0, 12).unwrap();
        assert!((out.incremental_annual_margin - (-17.5)).abs() < 1e-9);
        assert!(out.roi < 0.0);
        assert_eq!(out.payback, Payback::DoesNotPayBack);
    }

    #[test]
    fn zero_investment_is_rejected() {
        assert!(matches!(
            evaluate(0.10, 1000.0, 35.0, 0.0, 12),
            Err(EngineError::ZeroInvestment)
        ));
    }

    #[test]
    fn higher_investment_lowers_roi() {
        let cheap = evaluate(0.10, 1000.0, 35.0, 10.0, 12).unwrap();
        let costly = evaluate(0.10, 1000.0, 35.0, 30.0, 12).unwrap();
        assert!(cheap.roi > costly.roi);
    }

    #[test]
    fn payback_serializes_as_number_or_sentinel() {
        let finite = serde_json::to_value(Payback::Months(6.5)).unwrap();
        assert_eq!(finite, serde_json::json!(6.5));
        let never = serde_json::to_value(Payback::DoesNotPayBack).unwrap();
        assert_eq!(never, serde_json::json!("does_not_pay_back"));
    }
}
