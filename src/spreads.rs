use crate::config;
use crate::models::{OptionContract, OptionSide};
use serde::{Deserialize, Serialize};

/// Bounds for spread enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadConfig {
    /// Minimum strike distance between legs (dollars)
    pub min_width: f64,
    /// Maximum strike distance between legs (dollars)
    pub max_width: f64,
    /// Minimum net credit to keep a pair (dollars)
    pub min_credit: f64,
}

impl Default for SpreadConfig {
    fn default() -> Self {
        Self {
            min_width: config::MIN_SPREAD_WIDTH,
            max_width: config::MAX_SPREAD_WIDTH,
            min_credit: config::MIN_CREDIT,
        }
    }
}

impl SpreadConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_width: env_f64("ZDTE_MIN_WIDTH").unwrap_or(defaults.min_width),
            max_width: env_f64("ZDTE_MAX_WIDTH").unwrap_or(defaults.max_width),
            min_credit: env_f64("ZDTE_MIN_CREDIT").unwrap_or(defaults.min_credit),
        }
    }
}

fn env_f64(var: &str) -> Option<f64> {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| *v >= 0.0)
}

/// One leg of a vertical spread, snapshotted from the source contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadLeg {
    pub strike: f64,
    pub bid: f64,
    pub ask: f64,
    pub delta: Option<f64>,
}

impl SpreadLeg {
    fn from_contract(contract: &OptionContract) -> Self {
        Self {
            strike: contract.strike,
            bid: contract.bid,
            ask: contract.ask,
            delta: contract.delta,
        }
    }
}

/// A two-leg vertical credit spread with its full economics.
///
/// Per-contract dollar figures use the standard 100 multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadCandidate {
    pub symbol: String,
    pub side: OptionSide,
    pub expiration: String,
    pub short_leg: SpreadLeg,
    pub long_leg: SpreadLeg,
    pub width: f64,
    pub credit: f64,
    pub max_profit: f64,
    pub max_loss: f64,
    pub break_even: f64,
    pub risk_reward: f64,
    /// Percent chance the short leg expires worthless, from its delta
    pub probability_of_profit: Option<f64>,
    pub underlying_price: f64,
}

/// Enumerate vertical credit spreads for one side of a chain.
///
/// Contracts are filtered to the requested side and sorted ascending by
/// strike, then every strike pair is examined. Calls sell the lower strike
/// and buy the higher; puts invert the convention. Pairs outside the width
/// bounds or below the minimum credit are discarded. Output is sorted
/// descending by risk/reward and is deterministic for identical input.
pub fn enumerate(
    contracts: &[&OptionContract],
    side: OptionSide,
    spot: f64,
    config: &SpreadConfig,
) -> Vec<SpreadCandidate> {
    let mut legs: Vec<&OptionContract> = contracts
        .iter()
        .filter(|c| c.side == side)
        .copied()
        .collect();
    legs.sort_by(|a, b| a.strike.partial_cmp(&b.strike).unwrap());

    let mut candidates = Vec::new();

    for i in 0..legs.len() {
        for j in (i + 1)..legs.len() {
            let lower = legs[i];
            let higher = legs[j];

            let width = higher.strike - lower.strike;
            if width < config.min_width || width > config.max_width {
                continue;
            }

            // Calls: sell the lower strike, buy the higher.
            // Puts: sell the higher strike, buy the lower.
            let (short, long) = match side {
                OptionSide::Call => (lower, higher),
                OptionSide::Put => (higher, lower),
            };

            let credit = short.bid - long.ask;
            if credit < config.min_credit {
                continue;
            }

            candidates.push(build_candidate(short, long, width, credit, side, spot));
        }
    }

    candidates.sort_by(|a, b| b.risk_reward.partial_cmp(&a.risk_reward).unwrap());
    candidates
}

fn build_candidate(
    short: &OptionContract,
    long: &OptionContract,
    width: f64,
    credit: f64,
    side: OptionSide,
    spot: f64,
) -> SpreadCandidate {
    let max_profit = credit * 100.0;
    let max_loss = (width - credit) * 100.0;

    let risk_reward = if max_loss > 0.0 {
        max_profit / max_loss
    } else {
        0.0
    };

    let break_even = match side {
        OptionSide::Call => short.strike + credit,
        OptionSide::Put => short.strike - credit,
    };

    let probability_of_profit = short.delta.map(|d| (1.0 - d.abs()) * 100.0);

    SpreadCandidate {
        symbol: short.symbol.clone(),
        side,
        expiration: short.expiration.clone(),
        short_leg: SpreadLeg::from_contract(short),
        long_leg: SpreadLeg::from_contract(long),
        width,
        credit,
        max_profit,
        max_loss,
        break_even,
        risk_reward,
        probability_of_profit,
        underlying_price: spot,
    }
}
