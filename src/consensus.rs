use crate::embedding::cosine_similarity;

/// How much the candidate at `target_idx` agrees with the rest of the pool:
/// the mean cosine similarity against every other usable embedding.
///
/// Self-comparison is excluded by index, so two candidates with identical
/// answers still count each other as peers. Fewer than two embeddings, an
/// empty target, or no usable peer all yield 0.0.
pub fn consensus_score(target_idx: usize, pool: &[Vec<f32>]) -> f32 {
    if pool.len() < 2 {
        return 0.0;
    }
    let target = match pool.get(target_idx) {
        Some(t) if !t.is_empty() => t,
        _ => return 0.0,
    };

    let similarities: Vec<f32> = pool
        .iter()
        .enumerate()
        .filter(|(i, emb)| *i != target_idx && !emb.is_empty())
        .map(|(_, emb)| cosine_similarity(target, emb))
        .collect();

    if similarities.is_empty() {
        return 0.0;
    }
    similarities.iter().sum::<f32>() / similarities.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_embedding_scores_zero() {
        assert_eq!(consensus_score(0, &[vec![1.0, 0.0]]), 0.0);
    }

    #[test]
    fn identical_pair_scores_one() {
        let pool = vec![vec![0.5, 0.5], vec![0.5, 0.5]];
        assert!((consensus_score(0, &pool) - 1.0).abs() < 1e-6);
        assert!((consensus_score(1, &pool) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_target_scores_zero() {
        let pool = vec![Vec::new(), vec![1.0, 0.0]];
        assert_eq!(consensus_score(0, &pool), 0.0);
    }

    #[test]
    fn empty_peers_are_skipped() {
        let pool = vec![vec![1.0, 0.0], Vec::new(), vec![1.0, 0.0]];
        assert!((consensus_score(0, &pool) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disagreeing_peer_lowers_the_mean() {
        let pool = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let score = consensus_score(0, &pool);
        assert!((score - 0.5).abs() < 1e-6);
    }
}
