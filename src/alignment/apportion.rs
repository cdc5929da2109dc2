use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::error::ApportionmentError;

/// Splits `total` codes into one positive segment length per weight.
///
/// Largest-remainder apportionment with a floor of one code per word: each
/// word starts at `max(1, floor(share))`, the leftover (or excess) is handed
/// out one unit at a time in order of fractional remainder, and the last word
/// absorbs whatever residue is left. The result always sums to `total` and
/// never contains a zero.
pub fn apportion(total: usize, weights: &[usize]) -> Result<Vec<usize>, ApportionmentError> {
    if total == 0 {
        return Err(ApportionmentError::NoCodes);
    }
    if weights.is_empty() {
        return Err(ApportionmentError::NoWeights);
    }
    let weight_sum: u64 = weights.iter().map(|&weight| weight as u64).sum();
    if weight_sum == 0 {
        return Err(ApportionmentError::ZeroWeightSum {
            words: weights.len(),
        });
    }
    if weights.len() > total {
        return Err(ApportionmentError::Infeasible {
            words: weights.len(),
            codes: total,
        });
    }

    let shares = ideal_shares(total, weights, weight_sum);
    let mut counts: Vec<i64> = shares
        .iter()
        .map(|share| (share.floor() as i64).max(1))
        .collect();

    let delta = total as i64 - counts.iter().sum::<i64>();
    if delta != 0 {
        let cycle = rank_by_remainder(&shares, delta > 0);
        debug!(total, words = weights.len(), delta, "redistributing codes");
        redistribute(&mut counts, cycle, delta);
    }

    absorb_residue(&mut counts, total)?;
    finalize(counts, total)
}

fn ideal_shares(total: usize, weights: &[usize], weight_sum: u64) -> Vec<f64> {
    weights
        .iter()
        .map(|&weight| (weight as u64 * total as u64) as f64 / weight_sum as f64)
        .collect()
}

/// Word indices ordered by fractional remainder. Ties keep index order.
fn rank_by_remainder(shares: &[f64], descending: bool) -> Vec<usize> {
    let remainders: Vec<f64> = shares.iter().map(|share| share - share.floor()).collect();
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| {
        let ordering = remainders[a]
            .partial_cmp(&remainders[b])
            .unwrap_or(Ordering::Equal);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    order
}

/// Walks `cycle` round-robin moving one unit per visit toward `delta`.
/// Indices that would drop to zero leave the cycle.
fn redistribute(counts: &mut [i64], mut cycle: Vec<usize>, delta: i64) {
    let step = delta.signum();
    let mut remaining = delta.unsigned_abs();
    let mut pointer = 0usize;

    while remaining > 0 && !cycle.is_empty() {
        let slot = pointer % cycle.len();
        let idx = cycle[slot];
        let proposed = counts[idx] + step;
        if proposed <= 0 {
            cycle.remove(slot);
            continue;
        }
        counts[idx] = proposed;
        remaining -= 1;
        pointer += 1;
    }
}

fn absorb_residue(counts: &mut [i64], total: usize) -> Result<(), ApportionmentError> {
    let residue = total as i64 - counts.iter().sum::<i64>();
    if residue == 0 {
        return Ok(());
    }

    let last = counts.len() - 1;
    warn!(residue, index = last, "last word absorbs distribution residue");
    counts[last] += residue;
    if counts[last] <= 0 {
        return Err(ApportionmentError::NonPositiveSegment {
            index: last,
            count: counts[last],
        });
    }
    Ok(())
}

fn finalize(counts: Vec<i64>, total: usize) -> Result<Vec<usize>, ApportionmentError> {
    if let Some(index) = counts.iter().position(|&count| count <= 0) {
        return Err(ApportionmentError::NonPositiveSegment {
            index,
            count: counts[index],
        });
    }
    let lengths: Vec<usize> = counts.into_iter().map(|count| count as usize).collect();
    let actual: usize = lengths.iter().sum();
    if actual != total {
        return Err(ApportionmentError::SumMismatch {
            expected: total,
            actual,
        });
    }
    Ok(lengths)
}
