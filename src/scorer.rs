use crate::atm::AtmCandidate;
use crate::spreads::SpreadCandidate;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Either kind of opportunity the analyzers produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Candidate {
    Spread(SpreadCandidate),
    Atm(AtmCandidate),
}

impl Candidate {
    pub fn symbol(&self) -> &str {
        match self {
            Candidate::Spread(s) => &s.symbol,
            Candidate::Atm(a) => &a.contract.symbol,
        }
    }
}

/// What the external ranking service receives per candidate.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRequest {
    pub candidate: Candidate,
    pub underlying_price: f64,
    pub context: String,
}

/// What it must answer with.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreResponse {
    pub score: f64,
    pub confidence: f64,
    pub rationale: String,
    pub model: String,
}

/// External ranking collaborator. Retry, fallback, and ensemble behavior
/// all live behind this boundary, not in the pipeline.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse>;
}

/// A candidate with its external verdict attached.
///
/// `failed` marks a scoring-service failure; score and confidence are 0 in
/// that case but the flag is what distinguishes "the service was down" from
/// "the service genuinely rated this 0".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    pub confidence: f64,
    pub rationale: String,
    pub model: String,
    pub failed: bool,
    pub scored_at: DateTime<Utc>,
}

/// Score candidates one at a time.
///
/// A failure for one candidate substitutes a flagged placeholder and moves
/// on; the batch never aborts.
pub async fn score_candidates(
    scorer: &dyn Scorer,
    candidates: Vec<Candidate>,
    underlying_price: f64,
    context: &str,
) -> Vec<ScoredCandidate> {
    let mut scored = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let request = ScoreRequest {
            candidate,
            underlying_price,
            context: context.to_string(),
        };

        let result = scorer.score(&request).await;
        let candidate = request.candidate;

        match result {
            Ok(response) => scored.push(ScoredCandidate {
                candidate,
                score: response.score.clamp(0.0, 100.0),
                confidence: response.confidence.clamp(0.0, 100.0),
                rationale: response.rationale,
                model: response.model,
                failed: false,
                scored_at: Utc::now(),
            }),
            Err(e) => {
                warn!(symbol = candidate.symbol(), error = %e, "scoring failed, recording placeholder");
                scored.push(ScoredCandidate {
                    candidate,
                    score: 0.0,
                    confidence: 0.0,
                    rationale: format!("scoring failed: {}", e),
                    model: String::new(),
                    failed: true,
                    scored_at: Utc::now(),
                });
            }
        }
    }

    scored
}

// -----------------------------------------------
// RANKING SERVICE CLIENT
// -----------------------------------------------

/// Thin client for the hosted ranking service: one POST per candidate,
/// no retry or fallback of its own.
pub struct HttpScorer {
    client: reqwest::Client,
    url: String,
}

impl HttpScorer {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(crate::config::HTTP_TIMEOUT)
                .build()?,
            url: url.into(),
        })
    }

    /// Build from ZDTE_SCORER_URL when set; None means scoring is
    /// unconfigured and every candidate gets a failed placeholder.
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var("ZDTE_SCORER_URL") {
            Ok(url) if !url.trim().is_empty() => Ok(Some(Self::new(url)?)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Scorer for HttpScorer {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse> {
        let res = self.client.post(&self.url).json(request).send().await?;

        let status = res.status();
        if !status.is_success() {
            anyhow::bail!("ranking service returned {}", status);
        }

        Ok(res.json::<ScoreResponse>().await?)
    }
}

/// Placeholder used when no ranking service is configured.
pub struct UnconfiguredScorer;

#[async_trait]
impl Scorer for UnconfiguredScorer {
    async fn score(&self, _request: &ScoreRequest) -> Result<ScoreResponse> {
        anyhow::bail!("no ranking service configured (set ZDTE_SCORER_URL)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OptionContract, OptionSide};
    use crate::spreads::SpreadLeg;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn spread_candidate(symbol: &str) -> Candidate {
        Candidate::Spread(SpreadCandidate {
            symbol: symbol.to_string(),
            side: OptionSide::Call,
            expiration: "2026-08-06".to_string(),
            short_leg: SpreadLeg {
                strike: 650.0,
                bid: 1.20,
                ask: 1.30,
                delta: Some(0.30),
            },
            long_leg: SpreadLeg {
                strike: 655.0,
                bid: 0.50,
                ask: 0.60,
                delta: Some(0.15),
            },
            width: 5.0,
            credit: 0.60,
            max_profit: 60.0,
            max_loss: 440.0,
            break_even: 650.60,
            risk_reward: 60.0 / 440.0,
            probability_of_profit: Some(70.0),
            underlying_price: 645.0,
        })
    }

    fn atm_candidate(symbol: &str) -> Candidate {
        Candidate::Atm(crate::atm::AtmCandidate {
            contract: OptionContract {
                symbol: symbol.to_string(),
                side: OptionSide::Put,
                strike: 644.0,
                expiration: "2026-08-06".to_string(),
                bid: 1.0,
                ask: 1.05,
                last: 1.02,
                mark: 1.02,
                volume: 60,
                open_interest: 100,
                delta: Some(-0.48),
                gamma: None,
                theta: None,
                vega: None,
                implied_volatility: None,
                days_to_expiration: 0,
                in_the_money: false,
            },
            distance: 1.0,
            unusual_volume: true,
            signal: crate::atm::FlowSignal::Bearish,
        })
    }

    /// Fails every other call.
    struct FlakyScorer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Scorer for FlakyScorer {
        async fn score(&self, _request: &ScoreRequest) -> Result<ScoreResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                Ok(ScoreResponse {
                    score: 72.0,
                    confidence: 80.0,
                    rationale: "reasonable credit for the risk".to_string(),
                    model: "rank-v2".to_string(),
                })
            } else {
                anyhow::bail!("upstream 503")
            }
        }
    }

    #[tokio::test]
    async fn test_failure_substitutes_flagged_placeholder() {
        let scorer = FlakyScorer {
            calls: AtomicUsize::new(0),
        };
        let candidates = vec![
            spread_candidate("SPY"),
            atm_candidate("SPY"),
            spread_candidate("QQQ"),
        ];

        let scored = score_candidates(&scorer, candidates, 645.0, "0DTE session").await;
        assert_eq!(scored.len(), 3);

        assert!(!scored[0].failed);
        assert_eq!(scored[0].score, 72.0);
        assert_eq!(scored[0].model, "rank-v2");

        assert!(scored[1].failed);
        assert_eq!(scored[1].score, 0.0);
        assert_eq!(scored[1].confidence, 0.0);

        // the batch continued past the failure
        assert!(!scored[2].failed);
    }

    struct OutOfRangeScorer;

    #[async_trait]
    impl Scorer for OutOfRangeScorer {
        async fn score(&self, _request: &ScoreRequest) -> Result<ScoreResponse> {
            Ok(ScoreResponse {
                score: 140.0,
                confidence: -5.0,
                rationale: String::new(),
                model: "rank-v2".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_scores_clamped_to_range() {
        let scored = score_candidates(&OutOfRangeScorer, vec![spread_candidate("SPY")], 645.0, "").await;
        assert_eq!(scored[0].score, 100.0);
        assert_eq!(scored[0].confidence, 0.0);
        assert!(!scored[0].failed);
    }
}
