use crate::analyzers::types::RankedStation;
use crate::error::{PipelineError, Result};
use crate::station::StationKey;

/// Rejects a leaderboard size below one before any work is done.
pub fn ensure_top_n(top_n: usize) -> Result<()> {
    if top_n == 0 {
        return Err(PipelineError::InvalidParameter(
            "top_n must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Numbers already-ordered `(key, count)` pairs from 1.
pub fn rank(ordered: impl IntoIterator<Item = (StationKey, u64)>) -> Vec<RankedStation> {
    ordered
        .into_iter()
        .enumerate()
        .map(|(idx, (station, count))| RankedStation {
            rank: idx + 1,
            station,
            count,
        })
        .collect()
}

/// Cosine similarity of two equal-length vectors; 0.0 when either is all zero.
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
