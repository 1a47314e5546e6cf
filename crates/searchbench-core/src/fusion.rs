//! Client-side reciprocal rank fusion for backends without a native
//! hybrid query.
//!
//! RRF score of a document: sum over rankers of `1 / (k + rank)` with
//! ranks 1-indexed. Only ranks matter; the engines' own scores are
//! incomparable across rankers and are ignored. Documents are
//! deduplicated by id, never by hit object identity, so the same
//! document surfacing in both lists fuses into one entry.

use std::collections::HashMap;

use crate::document::{DocId, SearchHit};

/// Standard k from the RRF literature (Cormack, Clarke and Buettcher,
/// SIGIR 2009). Larger k flattens the weighting across ranks.
pub const RRF_K: u32 = 60;

/// How many candidates to pull from each ranker per requested result,
/// so the fused top of the list has enough overlap to be meaningful.
pub const OVERFETCH_FACTOR: usize = 10;

/// Fuse ranked hit lists into a single list of at most `limit` hits,
/// ordered by descending RRF score with ids breaking ties. The payload
/// of a fused hit comes from the first list that ranked it.
pub fn reciprocal_rank_fusion(lists: &[&[SearchHit]], k: u32, limit: usize) -> Vec<SearchHit> {
    let mut scores: HashMap<DocId, f32> = HashMap::new();
    let mut payloads: HashMap<DocId, &SearchHit> = HashMap::new();

    for list in lists {
        for (rank, hit) in list.iter().enumerate() {
            let contribution = 1.0 / (k as f32 + (rank + 1) as f32);
            *scores.entry(hit.id).or_insert(0.0) += contribution;
            payloads.entry(hit.id).or_insert(hit);
        }
    }

    let mut fused: Vec<SearchHit> = scores
        .into_iter()
        .map(|(id, score)| SearchHit {
            id,
            score,
            payload: payloads[&id].payload.clone(),
        })
        .collect();
    fused.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    fused.truncate(limit);
    fused
}
