use domain::FaqEntry;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPosition {
    pub position: usize,
    pub score: f32,
}

pub struct SearchEngine;

impl SearchEngine {
    /// Cosine similarity clamped to [-1, 1]. Zero-norm or non-finite input scores 0.0.
    /// Negative zero is folded into 0.0 so tied scores compare equal when ranking.
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        let score = dot_product / (norm_a * norm_b);
        if score.is_finite() {
            score.clamp(-1.0, 1.0) + 0.0
        } else {
            0.0
        }
    }

    /// Score every entry and return the best `top_k`, highest first.
    /// The sort is stable, so equal scores keep insertion order.
    pub fn rank(query_embedding: &[f32], entries: &[FaqEntry], top_k: usize) -> Vec<ScoredPosition> {
        let mut similarities: Vec<ScoredPosition> = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| ScoredPosition {
                position,
                score: Self::cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        similarities.sort_by(|a, b| b.score.total_cmp(&a.score));
        similarities.truncate(top_k);
        similarities
    }
}
