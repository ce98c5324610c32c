use crate::config;
use crate::models::{OptionContract, OptionSide};
use serde::{Deserialize, Serialize};

/// Selection band and cap for at-the-money picks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtmConfig {
    /// Max |strike - spot| / spot to qualify
    pub threshold: f64,
    /// Contracts kept per side
    pub top_n: usize,
}

impl Default for AtmConfig {
    fn default() -> Self {
        Self {
            threshold: config::ATM_THRESHOLD,
            top_n: config::ATM_TOP_N,
        }
    }
}

impl AtmConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            threshold: std::env::var("ZDTE_ATM_THRESHOLD")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| *v > 0.0)
                .unwrap_or(defaults.threshold),
            top_n: defaults.top_n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowSignal {
    Bullish,
    Bearish,
    Neutral,
}

/// A contract close enough to spot to count as at-the-money, with the
/// order-flow read attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtmCandidate {
    pub contract: OptionContract,
    /// |strike - spot| in underlying points
    pub distance: f64,
    pub unusual_volume: bool,
    pub signal: FlowSignal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtmSelection {
    pub calls: Vec<AtmCandidate>,
    pub puts: Vec<AtmCandidate>,
}

/// Pick the nearest in-range strikes per side.
///
/// A contract qualifies when |strike - spot| / spot <= 2%; each side is
/// sorted ascending by absolute distance and truncated to the top 3.
pub fn select(
    calls: &[&OptionContract],
    puts: &[&OptionContract],
    spot: f64,
    config: &AtmConfig,
) -> AtmSelection {
    AtmSelection {
        calls: select_side(calls, spot, config),
        puts: select_side(puts, spot, config),
    }
}

fn select_side(contracts: &[&OptionContract], spot: f64, config: &AtmConfig) -> Vec<AtmCandidate> {
    if spot <= 0.0 {
        return Vec::new();
    }

    let mut candidates: Vec<AtmCandidate> = contracts
        .iter()
        .filter(|c| (c.strike - spot).abs() / spot <= config.threshold)
        .map(|c| {
            let (unusual_volume, signal) = classify_flow(c);
            AtmCandidate {
                contract: (*c).clone(),
                distance: (c.strike - spot).abs(),
                unusual_volume,
                signal,
            }
        })
        .collect();

    candidates.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
    candidates.truncate(config.top_n);
    candidates
}

/// Coarse order-flow read on a single contract.
///
/// Volume above half of open interest counts as unusual; a directional
/// signal is only assigned when the bid sits within 10% of the ask on top
/// of that (a tight market suggests aggressive one-sided buying).
/// This is a proxy, not a validated signal; the 0.5 and 0.9 cutoffs are
/// kept for parity with historical output.
fn classify_flow(contract: &OptionContract) -> (bool, FlowSignal) {
    let unusual_volume = contract.open_interest > 0
        && contract.volume as f64 / contract.open_interest as f64 > config::UNUSUAL_VOLUME_RATIO;

    let tight_spread = contract.ask > 0.0 && contract.bid >= contract.ask * config::TIGHT_SPREAD_RATIO;

    let signal = if unusual_volume && tight_spread {
        match contract.side {
            OptionSide::Call => FlowSignal::Bullish,
            OptionSide::Put => FlowSignal::Bearish,
        }
    } else {
        FlowSignal::Neutral
    };

    (unusual_volume, signal)
}
