use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// -----------------------------------------------
// WIRE FORMAT
// -----------------------------------------------
// The upstream chain endpoint returns contracts nested two levels deep:
// expiration key ("2026-08-06:0") -> strike key ("645.0") -> contract list.
// These structs exist only at the fetch boundary; everything downstream
// works on the flat model below.

/// Raw response from the broker's option chain endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ChainResponse {
    pub symbol: String,

    #[serde(rename = "underlyingPrice")]
    pub underlying_price: Option<f64>,

    #[serde(rename = "numberOfContracts")]
    pub number_of_contracts: Option<u64>,

    #[serde(rename = "callExpDateMap", default)]
    pub call_exp_date_map: BTreeMap<String, BTreeMap<String, Vec<WireContract>>>,

    #[serde(rename = "putExpDateMap", default)]
    pub put_exp_date_map: BTreeMap<String, BTreeMap<String, Vec<WireContract>>>,
}

/// A single contract entry as the API ships it
#[derive(Debug, Clone, Deserialize)]
pub struct WireContract {
    #[serde(rename = "putCall")]
    pub put_call: Option<String>,

    #[serde(rename = "strikePrice")]
    pub strike_price: Option<f64>,

    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub mark: Option<f64>,

    #[serde(rename = "totalVolume")]
    pub total_volume: Option<u64>,

    #[serde(rename = "openInterest")]
    pub open_interest: Option<u64>,

    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,

    // Quoted as a percentage by the API, e.g. 18.45
    pub volatility: Option<f64>,

    #[serde(rename = "daysToExpiration")]
    pub days_to_expiration: Option<i64>,

    #[serde(rename = "inTheMoney")]
    pub in_the_money: Option<bool>,
}

// -----------------------------------------------
// FLAT MODEL
// -----------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionSide {
    Call,
    Put,
}

impl std::fmt::Display for OptionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionSide::Call => write!(f, "CALL"),
            OptionSide::Put => write!(f, "PUT"),
        }
    }
}

/// Immutable snapshot of one contract at one poll instant.
///
/// A later cycle produces a fresh snapshot with the same logical key
/// (symbol + side + strike + expiration) and a new timestamp; snapshots
/// are never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContract {
    pub symbol: String,
    pub side: OptionSide,
    pub strike: f64,
    pub expiration: String,

    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub mark: f64,

    pub volume: u64,
    pub open_interest: u64,

    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,

    /// Implied volatility as a fraction (0.18 = 18%)
    pub implied_volatility: Option<f64>,

    pub days_to_expiration: i64,
    pub in_the_money: bool,
}

/// All contracts for one symbol at one instant plus the underlying spot.
/// Owned transiently by the collector during a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChain {
    pub symbol: String,
    pub underlying_price: f64,
    pub contracts: Vec<OptionContract>,
    pub fetched_at: DateTime<Utc>,
}

impl OptionChain {
    pub fn calls(&self) -> Vec<&OptionContract> {
        self.contracts
            .iter()
            .filter(|c| c.side == OptionSide::Call)
            .collect()
    }

    pub fn puts(&self) -> Vec<&OptionContract> {
        self.contracts
            .iter()
            .filter(|c| c.side == OptionSide::Put)
            .collect()
    }

    pub fn contract_count(&self) -> usize {
        self.contracts.len()
    }
}

// Some feeds report absent greeks as a -999 sentinel rather than null
fn clean_metric(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > -999.0)
}

// Expiration keys look like "2026-08-06:0"; keep the date part
fn expiration_from_key(key: &str) -> String {
    key.split(':').next().unwrap_or(key).to_string()
}

fn flatten_side(
    symbol: &str,
    side: OptionSide,
    map: &BTreeMap<String, BTreeMap<String, Vec<WireContract>>>,
    out: &mut Vec<OptionContract>,
) {
    for (exp_key, strikes) in map {
        let expiration = expiration_from_key(exp_key);
        for entries in strikes.values() {
            for wire in entries {
                let Some(strike) = wire.strike_price else {
                    continue;
                };
                out.push(OptionContract {
                    symbol: symbol.to_string(),
                    side,
                    strike,
                    expiration: expiration.clone(),
                    bid: wire.bid.unwrap_or(0.0),
                    ask: wire.ask.unwrap_or(0.0),
                    last: wire.last.unwrap_or(0.0),
                    mark: wire.mark.unwrap_or(0.0),
                    volume: wire.total_volume.unwrap_or(0),
                    open_interest: wire.open_interest.unwrap_or(0),
                    delta: clean_metric(wire.delta),
                    gamma: clean_metric(wire.gamma),
                    theta: clean_metric(wire.theta),
                    vega: clean_metric(wire.vega),
                    implied_volatility: clean_metric(wire.volatility).map(|v| v / 100.0),
                    days_to_expiration: wire.days_to_expiration.unwrap_or(0),
                    in_the_money: wire.in_the_money.unwrap_or(false),
                });
            }
        }
    }
}

impl ChainResponse {
    /// Flatten the nested wire maps into the typed chain model.
    ///
    /// An empty response (no contracts on a non-trading day) flattens to a
    /// valid empty chain, not an error.
    pub fn flatten(&self, fetched_at: DateTime<Utc>) -> OptionChain {
        let mut contracts = Vec::new();
        flatten_side(
            &self.symbol,
            OptionSide::Call,
            &self.call_exp_date_map,
            &mut contracts,
        );
        flatten_side(
            &self.symbol,
            OptionSide::Put,
            &self.put_exp_date_map,
            &mut contracts,
        );

        OptionChain {
            symbol: self.symbol.clone(),
            underlying_price: self.underlying_price.unwrap_or(0.0),
            contracts,
            fetched_at,
        }
    }
}
