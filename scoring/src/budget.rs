//! Government-vs-market budget deviation analysis.
//!
//! Deviation is flagged in both directions: over-budgeting predicts graft,
//! under-budgeting predicts compromised quality.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::math;
use crate::types::{Result, RiskLevel, ScoreError};

/// |deviation| above which a budget is medium risk.
pub const MEDIUM_DEVIATION_PCT: f64 = 10.0;
/// |deviation| above which a budget is high risk.
pub const HIGH_DEVIATION_PCT: f64 = 25.0;

/// One line of a proposed budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct BudgetLineItem {
    pub quantity: f64,
    /// Market reference price per unit
    pub market_rate: f64,
    /// Price per unit in the government proposal
    pub proposed_rate: f64,
}

/// Outcome of a budget analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct BudgetAnalysis {
    /// Sum of quantity x proposed rate
    pub govt_total: f64,
    /// Sum of quantity x market rate
    pub ai_estimate: f64,
    /// Signed deviation of the proposal from the market estimate, 2 decimals
    pub deviation_pct: f64,
    pub risk_level: RiskLevel,
    /// Indices of lines whose unit price alone deviates beyond the high band
    pub flagged_items: Vec<usize>,
    pub explanation: String,
}

fn validate(index: usize, item: &BudgetLineItem) -> Result<()> {
    for (name, value) in [
        ("quantity", item.quantity),
        ("market_rate", item.market_rate),
        ("proposed_rate", item.proposed_rate),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ScoreError::InvalidInput(format!(
                "line {}: {} must be a non-negative number, got {}",
                index, name, value
            )));
        }
    }
    Ok(())
}

fn line_deviates(item: &BudgetLineItem) -> bool {
    if item.market_rate == 0.0 {
        return item.proposed_rate > 0.0;
    }
    let pct = (item.proposed_rate - item.market_rate) / item.market_rate * 100.0;
    pct.abs() > HIGH_DEVIATION_PCT
}

/// Compare a proposed budget against market rates.
pub fn analyze_budget(items: &[BudgetLineItem]) -> Result<BudgetAnalysis> {
    if items.is_empty() {
        return Err(ScoreError::InvalidInput(
            "budget has no line items".to_string(),
        ));
    }

    let mut govt_total = 0.0;
    let mut ai_estimate = 0.0;
    let mut flagged_items = Vec::new();

    for (index, item) in items.iter().enumerate() {
        validate(index, item)?;
        govt_total += item.quantity * item.proposed_rate;
        ai_estimate += item.quantity * item.market_rate;
        if item.quantity > 0.0 && line_deviates(item) {
            flagged_items.push(index);
        }
    }

    if ai_estimate == 0.0 {
        return Err(ScoreError::InvalidInput(
            "market estimate is zero; deviation is undefined".to_string(),
        ));
    }

    let deviation_pct = math::round_to((govt_total - ai_estimate) / ai_estimate * 100.0, 2);
    let risk_level =
        RiskLevel::from_thresholds(deviation_pct.abs(), MEDIUM_DEVIATION_PCT, HIGH_DEVIATION_PCT);

    let direction = if deviation_pct >= 0.0 { "above" } else { "below" };
    let mut explanation = format!(
        "Proposal {:.2} is {:.2}% {} the market estimate {:.2} ({} risk)",
        govt_total,
        deviation_pct.abs(),
        direction,
        ai_estimate,
        risk_level
    );
    if !flagged_items.is_empty() {
        explanation.push_str(&format!(
            "; {} line item(s) priced more than {}% off market",
            flagged_items.len(),
            HIGH_DEVIATION_PCT
        ));
    }

    debug!(
        govt_total,
        ai_estimate,
        deviation_pct,
        risk = %risk_level,
        "Analyzed budget"
    );

    Ok(BudgetAnalysis {
        govt_total,
        ai_estimate,
        deviation_pct,
        risk_level,
        flagged_items,
        explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: f64, market_rate: f64, proposed_rate: f64) -> BudgetLineItem {
        BudgetLineItem {
            quantity,
            market_rate,
            proposed_rate,
        }
    }

    #[test]
    fn test_overpriced_road_contract() {
        let items = vec![item(100.0, 50.0, 80.0), item(10.0, 200.0, 200.0)];
        let analysis = analyze_budget(&items).unwrap();

        assert_eq!(analysis.ai_estimate, 7000.0);
        assert_eq!(analysis.govt_total, 10000.0);
        assert_eq!(analysis.deviation_pct, 42.86);
        assert_eq!(analysis.risk_level, RiskLevel::High);
        assert_eq!(analysis.flagged_items, vec![0]);
        assert!(analysis.explanation.contains("above"));
    }

    #[test]
    fn test_bands() {
        let medium = analyze_budget(&[item(1.0, 100.0, 115.0)]).unwrap();
        assert_eq!(medium.risk_level, RiskLevel::Medium);

        let low = analyze_budget(&[item(1.0, 100.0, 110.0)]).unwrap();
        assert_eq!(low.risk_level, RiskLevel::Low);

        let under = analyze_budget(&[item(1.0, 100.0, 60.0)]).unwrap();
        assert_eq!(under.deviation_pct, -40.0);
        assert_eq!(under.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_swapping_rates_flips_sign() {
        let items = vec![item(3.0, 100.0, 130.0), item(2.0, 40.0, 45.0)];
        let swapped: Vec<_> = items
            .iter()
            .map(|i| item(i.quantity, i.proposed_rate, i.market_rate))
            .collect();

        let forward = analyze_budget(&items).unwrap();
        let backward = analyze_budget(&swapped).unwrap();

        assert!(forward.deviation_pct > 0.0);
        assert!(backward.deviation_pct < 0.0);
        assert_eq!(forward.govt_total, backward.ai_estimate);
        assert_eq!(forward.ai_estimate, backward.govt_total);
    }

    #[test]
    fn test_matching_budget_is_exactly_zero() {
        let analysis = analyze_budget(&[item(5.0, 20.0, 20.0)]).unwrap();
        assert_eq!(analysis.deviation_pct, 0.0);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(analyze_budget(&[]).is_err());
        assert!(analyze_budget(&[item(-1.0, 10.0, 10.0)]).is_err());
        assert!(analyze_budget(&[item(1.0, f64::NAN, 10.0)]).is_err());
        assert!(matches!(
            analyze_budget(&[item(1.0, 0.0, 10.0)]),
            Err(ScoreError::InvalidInput(_))
        ));
    }
}
