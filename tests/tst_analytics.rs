use zdte_analyzer::atm::{self, AtmConfig};
use zdte_analyzer::spreads::{self, SpreadConfig};
use zdte_analyzer::{check_contract, max_pain, OptionChain, OptionContract, OptionSide};

fn contract(
    side: OptionSide,
    strike: f64,
    bid: f64,
    ask: f64,
    volume: u64,
    open_interest: u64,
    delta: Option<f64>,
) -> OptionContract {
    OptionContract {
        symbol: "SPY".to_string(),
        side,
        strike,
        expiration: "2026-08-06".to_string(),
        bid,
        ask,
        last: (bid + ask) / 2.0,
        mark: (bid + ask) / 2.0,
        volume,
        open_interest,
        delta,
        gamma: None,
        theta: None,
        vega: None,
        implied_volatility: Some(0.20),
        days_to_expiration: 0,
        in_the_money: false,
    }
}

/// The worked scenario from the product notes: calls at [640, 645, 650]
/// with OI [100, 50, 30], puts at the same strikes with OI [40, 60, 90],
/// spot 645.
fn scenario_chain() -> OptionChain {
    OptionChain {
        symbol: "SPY".to_string(),
        underlying_price: 645.0,
        contracts: vec![
            contract(OptionSide::Call, 640.0, 5.40, 5.60, 120, 100, Some(0.75)),
            contract(OptionSide::Call, 645.0, 2.10, 2.20, 300, 50, Some(0.50)),
            contract(OptionSide::Call, 650.0, 1.20, 1.30, 80, 30, Some(0.30)),
            contract(OptionSide::Put, 640.0, 0.90, 1.00, 60, 40, Some(-0.25)),
            contract(OptionSide::Put, 645.0, 2.00, 2.10, 40, 60, Some(-0.50)),
            contract(OptionSide::Put, 650.0, 5.10, 5.30, 20, 90, Some(-0.72)),
        ],
        fetched_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_pain_scenario_is_645() {
        let chain = scenario_chain();
        assert_eq!(max_pain::compute(&chain.calls(), &chain.puts()), Some(645.0));
    }

    #[test]
    fn test_max_pain_beats_every_other_strike() {
        let chain = scenario_chain();
        let calls = chain.calls();
        let puts = chain.puts();

        let chosen = max_pain::compute(&calls, &puts).unwrap();
        let chosen_pain = max_pain::pain_at(chosen, &calls, &puts);

        for strike in [640.0, 645.0, 650.0] {
            assert!(
                chosen_pain <= max_pain::pain_at(strike, &calls, &puts),
                "strike {} has lower pain than chosen {}",
                strike,
                chosen
            );
        }
    }

    #[test]
    fn test_detector_over_scenario_chain() {
        let chain = scenario_chain();
        // 645 call: volume 300 vs OI 50 -> ratio 6.0, well past 1.5
        let events: Vec<_> = chain
            .contracts
            .iter()
            .filter_map(|c| check_contract(c, 1.5))
            .collect();

        assert!(events.iter().any(|e| e.strike == 645.0 && e.side == OptionSide::Call));
        for event in &events {
            assert!(event.volume as f64 > event.open_interest as f64 * event.threshold);
            assert!(event.open_interest > 0 && event.volume > 0);
        }
    }

    #[test]
    fn test_spread_scenario_economics() {
        // short 650 call bid 1.20, long 655 call ask 0.60
        let calls = [
            contract(OptionSide::Call, 650.0, 1.20, 1.30, 10, 10, Some(0.30)),
            contract(OptionSide::Call, 655.0, 0.50, 0.60, 10, 10, Some(0.15)),
        ];
        let refs: Vec<&OptionContract> = calls.iter().collect();

        let candidates = spreads::enumerate(&refs, OptionSide::Call, 645.0, &SpreadConfig::default());
        assert_eq!(candidates.len(), 1);

        let c = &candidates[0];
        assert!((c.credit - 0.60).abs() < 1e-9);
        assert_eq!(c.width, 5.0);
        assert!((c.max_profit - 60.0).abs() < 1e-9);
        assert!((c.max_loss - 440.0).abs() < 1e-9);
        assert!((c.risk_reward - 0.13636363636).abs() < 1e-6);
        assert!((c.break_even - 650.60).abs() < 1e-9);
    }

    #[test]
    fn test_spread_bounds_hold_over_dense_chain() {
        // every 2.5 points from 600 to 700, generous bids so credit passes
        let mut calls = Vec::new();
        let mut strike = 600.0;
        while strike <= 700.0 {
            let bid = (700.0 - strike) / 20.0;
            calls.push(contract(OptionSide::Call, strike, bid, bid + 0.05, 10, 10, Some(0.3)));
            strike += 2.5;
        }
        let refs: Vec<&OptionContract> = calls.iter().collect();

        let candidates = spreads::enumerate(&refs, OptionSide::Call, 650.0, &SpreadConfig::default());
        assert!(!candidates.is_empty());

        for c in &candidates {
            assert!(c.width >= 5.0 && c.width <= 50.0);
            assert!(c.credit >= 0.50);
            assert!(c.short_leg.strike < c.long_leg.strike);
        }
        for pair in candidates.windows(2) {
            assert!(pair[0].risk_reward >= pair[1].risk_reward);
        }
    }

    #[test]
    fn test_atm_selection_bounds() {
        let chain = scenario_chain();
        let selection =
            atm::select(&chain.calls(), &chain.puts(), chain.underlying_price, &AtmConfig::default());

        assert!(selection.calls.len() <= 3);
        assert!(selection.puts.len() <= 3);

        for candidate in selection.calls.iter().chain(selection.puts.iter()) {
            let distance_pct =
                (candidate.contract.strike - chain.underlying_price).abs() / chain.underlying_price;
            assert!(distance_pct <= 0.02);
        }
    }

    #[test]
    fn test_atm_sorted_by_distance() {
        let chain = scenario_chain();
        let selection =
            atm::select(&chain.calls(), &chain.puts(), chain.underlying_price, &AtmConfig::default());

        for pair in selection.calls.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        for pair in selection.puts.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }
}
