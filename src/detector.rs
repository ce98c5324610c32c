use crate::models::{OptionContract, OptionSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contract whose traded volume outruns its open interest.
///
/// The threshold in force at detection time travels with the event so
/// historical records stay interpretable if the configuration changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NakedPositionEvent {
    pub symbol: String,
    pub side: OptionSide,
    pub strike: f64,
    pub expiration: String,
    pub volume: u64,
    pub open_interest: u64,
    pub ratio: f64,
    pub threshold: f64,
    pub detected_at: DateTime<Utc>,
}

/// Classify one contract's volume against its open interest.
///
/// Zero open interest or zero volume makes the ratio meaningless, so those
/// contracts are skipped rather than flagged. Emits whenever
/// volume > open_interest * threshold; a contract that stays above the
/// threshold is re-detected on every cycle.
///
/// Hand-off only: the caller owns persistence.
pub fn check_contract(contract: &OptionContract, threshold: f64) -> Option<NakedPositionEvent> {
    if contract.open_interest == 0 || contract.volume == 0 {
        return None;
    }

    let volume = contract.volume as f64;
    let open_interest = contract.open_interest as f64;

    if volume <= open_interest * threshold {
        return None;
    }

    Some(NakedPositionEvent {
        symbol: contract.symbol.clone(),
        side: contract.side,
        strike: contract.strike,
        expiration: contract.expiration.clone(),
        volume: contract.volume,
        open_interest: contract.open_interest,
        ratio: volume / open_interest,
        threshold,
        detected_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(volume: u64, open_interest: u64) -> OptionContract {
        OptionContract {
            symbol: "SPY".to_string(),
            side: OptionSide::Call,
            strike: 645.0,
            expiration: "2026-08-06".to_string(),
            bid: 1.20,
            ask: 1.30,
            last: 1.25,
            mark: 1.25,
            volume,
            open_interest,
            delta: Some(0.45),
            gamma: None,
            theta: None,
            vega: None,
            implied_volatility: Some(0.18),
            days_to_expiration: 0,
            in_the_money: false,
        }
    }

    #[test]
    fn test_zero_open_interest_never_emits() {
        assert!(check_contract(&contract(5000, 0), 1.5).is_none());
    }

    #[test]
    fn test_zero_volume_never_emits() {
        assert!(check_contract(&contract(0, 100), 1.5).is_none());
    }

    #[test]
    fn test_above_threshold_emits_with_ratio() {
        // volume=200, OI=100, threshold 1.5 -> ratio 2.0
        let event = check_contract(&contract(200, 100), 1.5).unwrap();
        assert_eq!(event.ratio, 2.0);
        assert_eq!(event.threshold, 1.5);
        assert_eq!(event.volume, 200);
        assert_eq!(event.open_interest, 100);
    }

    #[test]
    fn test_below_threshold_does_not_emit() {
        // volume=140, OI=100, threshold 1.5 -> ratio 1.4
        assert!(check_contract(&contract(140, 100), 1.5).is_none());
    }

    #[test]
    fn test_exactly_at_threshold_does_not_emit() {
        // volume must exceed OI * threshold, equality is not anomalous
        assert!(check_contract(&contract(150, 100), 1.5).is_none());
    }
}
