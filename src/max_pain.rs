use crate::models::OptionContract;

/// Strike at which option writers' aggregate payout is minimized.
///
/// For each candidate settlement strike S, sum the intrinsic value written
/// against sellers: calls struck below S pay (S - K) * OI * 100, puts struck
/// above S pay (K - S) * OI * 100. The candidate with the smallest total
/// wins; ties go to the first strike in ascending order.
///
/// Quadratic in the distinct-strike count, which stays in the tens for a
/// single 0DTE chain.
pub fn compute(calls: &[&OptionContract], puts: &[&OptionContract]) -> Option<f64> {
    let mut strikes: Vec<f64> = calls
        .iter()
        .chain(puts.iter())
        .map(|c| c.strike)
        .collect();
    strikes.sort_by(|a, b| a.partial_cmp(b).unwrap());
    strikes.dedup();

    if strikes.is_empty() {
        return None;
    }

    let mut best_strike = strikes[0];
    let mut best_pain = f64::MAX;

    for &candidate in &strikes {
        let pain = pain_at(candidate, calls, puts);
        if pain < best_pain {
            best_pain = pain;
            best_strike = candidate;
        }
    }

    Some(best_strike)
}

/// Total writer payout if the underlying settles exactly at `settlement`.
pub fn pain_at(settlement: f64, calls: &[&OptionContract], puts: &[&OptionContract]) -> f64 {
    let mut total = 0.0;

    for call in calls {
        if call.strike < settlement {
            total += call.open_interest as f64 * (settlement - call.strike) * 100.0;
        }
    }

    for put in puts {
        if put.strike > settlement {
            total += put.open_interest as f64 * (put.strike - settlement) * 100.0;
        }
    }

    total
}
