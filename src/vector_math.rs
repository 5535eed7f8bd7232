use std::cmp::Ordering;

use crate::core::errors::RetrievalError;

/// Cosine similarity between a query vector and a candidate vector.
///
/// Mismatched lengths indicate a corrupted or incompatible embeddings dump
/// and fail loudly. A zero-norm operand scores 0.0; the result is clamped
/// to [-1, 1] to absorb float drift.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, RetrievalError> {
    if query.len() != candidate.len() {
        return Err(RetrievalError::DimensionMismatch {
            query: query.len(),
            chunk: candidate.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut query_norm = 0.0f32;
    let mut candidate_norm = 0.0f32;
    for (a, b) in query.iter().zip(candidate.iter()) {
        dot += a * b;
        query_norm += a * a;
        candidate_norm += b * b;
    }

    let denom = query_norm.sqrt() * candidate_norm.sqrt();
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok((dot / denom).clamp(-1.0, 1.0))
}

/// Scores every candidate against the query and returns `(index, score)`
/// pairs sorted by descending similarity. The sort is stable, so equal
/// scores keep their original order.
pub fn rank_descending_by_cosine<'a, I>(
    query: &[f32],
    candidates: I,
) -> Result<Vec<(usize, f32)>, RetrievalError>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut scores = Vec::new();
    for (idx, candidate) in candidates.into_iter().enumerate() {
        let score = cosine_similarity(query, candidate)?;
        scores.push((idx, score));
    }

    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        let score = cosine_similarity(&vec, &vec).expect("cosine should work");
        assert!(approx_eq(score, 1.0));
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = vec![0.3, -0.7, 0.2];
        let b = vec![0.9, 0.1, -0.4];
        let left = cosine_similarity(&a, &b).unwrap();
        let right = cosine_similarity(&b, &a).unwrap();
        assert!(approx_eq(left, right));
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_vectors() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).expect("cosine should work");
        assert!(approx_eq(score, 0.0));
    }

    #[test]
    fn cosine_rejects_mismatched_lengths() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch { query: 2, chunk: 3 }
        ));
    }

    #[test]
    fn zero_norm_scores_zero() {
        let score = cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        assert!(approx_eq(score, 0.0));
    }

    #[test]
    fn ranking_returns_highest_similarity_first() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.8, 0.2], vec![0.1, 0.9], vec![0.9, 0.0]];
        let ranked =
            rank_descending_by_cosine(&query, candidates.iter().map(|c| c.as_slice()))
                .expect("ranking should work");

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, 2);
        assert_eq!(ranked[2].0, 1);
    }

    #[test]
    fn ranking_keeps_insertion_order_on_ties() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![2.0, 0.0], vec![1.0, 0.0], vec![0.5, 0.0]];
        let ranked =
            rank_descending_by_cosine(&query, candidates.iter().map(|c| c.as_slice())).unwrap();

        // All three are perfectly aligned with the query; order is preserved.
        let order: Vec<usize> = ranked.iter().map(|(idx, _)| *idx).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
