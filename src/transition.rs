use std::collections::BTreeSet;

use log::debug;

use crate::config::OrderingConfig;
use crate::flow::flow_score;
use crate::head;

/// Dense table of "page `i` is immediately followed by page `j`" scores.
///
/// Indices refer to the non-empty page list. Scores are asymmetric, lie in
/// `[0, 1]` and are undefined on the diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    n: usize,
    scores: Vec<f32>,
}

impl TransitionMatrix {
    /// An all-zero matrix over `n` pages.
    pub fn zeros(n: usize) -> Self {
        TransitionMatrix {
            n,
            scores: vec![0.0; n * n],
        }
    }

    /// Blends pairwise similarity with the flow heuristics:
    /// `semantic_weight * similarity[i][j] + flow_weight * flow(text_i, text_j)`.
    ///
    /// Negative cosine similarity is treated as no similarity; a missing
    /// similarity entry counts as zero.
    pub fn build(texts: &[&str], similarity: &[Vec<f32>], config: &OrderingConfig) -> Self {
        let n = texts.len();
        let mut matrix = TransitionMatrix::zeros(n);
        let windows: Vec<&str> = texts
            .iter()
            .map(|text| head(text, config.flow_window_chars))
            .collect();

        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let semantic = similarity
                    .get(i)
                    .and_then(|row| row.get(j))
                    .copied()
                    .filter(|s| s.is_finite())
                    .unwrap_or(0.0)
                    .clamp(0.0, 1.0);
                let flow = flow_score(windows[i], windows[j]);
                let combined = config.semantic_weight * semantic + config.flow_weight * flow;
                matrix.set(i, j, combined.clamp(0.0, 1.0));
            }
        }

        debug!("Built {}x{} transition matrix", n, n);
        matrix
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn set(&mut self, i: usize, j: usize, score: f32) {
        if i < self.n && j < self.n && i != j {
            self.scores[i * self.n + j] = score;
        }
    }

    /// The recorded score for `i -> j`, or `None` on the diagonal or out of range.
    pub fn get(&self, i: usize, j: usize) -> Option<f32> {
        if i >= self.n || j >= self.n || i == j {
            return None;
        }
        Some(self.scores[i * self.n + j]).filter(|s| s.is_finite())
    }

    /// `get` with absent entries read as zero.
    pub fn score(&self, i: usize, j: usize) -> f32 {
        self.get(i, j).unwrap_or(0.0)
    }

    pub fn outgoing_total(&self, i: usize) -> f32 {
        (0..self.n).map(|j| self.score(i, j)).sum()
    }

    /// The page most likely to open the document: highest total outgoing score.
    /// Ties go to the lowest index.
    pub fn best_start(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for i in 0..self.n {
            let total = self.outgoing_total(i);
            match best {
                Some((_, best_total)) if total <= best_total => {}
                _ => best = Some((i, total)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Walks from `start`, always stepping to the unvisited page with the
    /// highest score from the current page.
    ///
    /// When no unvisited page has a recorded score, or when `min_score` is
    /// given and the best step does not exceed it, the remaining pages are
    /// appended in ascending order. The result always visits every index once.
    pub fn greedy_path(&self, start: usize, min_score: Option<f32>) -> Vec<usize> {
        if self.n == 0 {
            return Vec::new();
        }
        let start = if start < self.n { start } else { 0 };

        let mut path = Vec::with_capacity(self.n);
        path.push(start);
        let mut remaining: BTreeSet<usize> = (0..self.n).filter(|&i| i != start).collect();

        while let Some(&current) = path.last() {
            if remaining.is_empty() {
                break;
            }

            let mut best: Option<(usize, f32)> = None;
            for &candidate in &remaining {
                if let Some(score) = self.get(current, candidate) {
                    match best {
                        Some((_, best_score)) if score <= best_score => {}
                        _ => best = Some((candidate, score)),
                    }
                }
            }

            match best {
                Some((next, score)) if min_score.map_or(true, |floor| score > floor) => {
                    path.push(next);
                    remaining.remove(&next);
                }
                _ => {
                    debug!(
                        "No confident transition from {} ({} pages left), appending in original order",
                        current,
                        remaining.len()
                    );
                    path.extend(remaining.iter().copied());
                    remaining.clear();
                }
            }
        }

        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_permutation;

    fn chain_matrix() -> TransitionMatrix {
        // 2 -> 0 -> 1 is the strong chain.
        let mut m = TransitionMatrix::zeros(3);
        m.set(2, 0, 0.9);
        m.set(0, 1, 0.8);
        m.set(2, 1, 0.2);
        m.set(0, 2, 0.1);
        m.set(1, 0, 0.1);
        m.set(1, 2, 0.1);
        m
    }

    #[test]
    fn diagonal_is_undefined() {
        let m = chain_matrix();
        assert_eq!(m.get(1, 1), None);
        assert_eq!(m.score(1, 1), 0.0);
        assert_eq!(m.get(5, 0), None);
    }

    #[test]
    fn start_is_highest_outgoing_total() {
        assert_eq!(chain_matrix().best_start(), Some(2));
        assert_eq!(TransitionMatrix::zeros(4).best_start(), Some(0));
        assert_eq!(TransitionMatrix::zeros(0).best_start(), None);
    }

    #[test]
    fn greedy_follows_strongest_edges() {
        let m = chain_matrix();
        assert_eq!(m.greedy_path(2, None), vec![2, 0, 1]);
    }

    #[test]
    fn threshold_stops_walk_and_fills_ascending() {
        let m = chain_matrix();
        // 2 -> 0 clears the floor, 0 -> 1 does not; 1 is appended anyway.
        assert_eq!(m.greedy_path(2, Some(0.85)), vec![2, 0, 1]);
        assert_eq!(m.greedy_path(1, Some(0.3)), vec![1, 0, 2]);
    }

    #[test]
    fn all_zero_matrix_still_covers_every_page() {
        let m = TransitionMatrix::zeros(5);
        let path = m.greedy_path(3, None);
        assert!(is_permutation(&path, 5));
        assert_eq!(path[0], 3);
        let bounded = m.greedy_path(3, Some(0.3));
        assert_eq!(bounded, vec![3, 0, 1, 2, 4]);
    }

    #[test]
    fn build_blends_similarity_and_flow() {
        let texts = ["ARTICLE I\nDefinitions", "ARTICLE II\nThe Loan"];
        let similarity = vec![vec![1.0, 0.5], vec![0.5, 1.0]];
        let m = TransitionMatrix::build(&texts, &similarity, &OrderingConfig::default());
        // 0.6 * 0.5 + 0.4 * 0.7
        assert!((m.score(0, 1) - 0.58).abs() < 1e-5);
        // 0.6 * 0.5 + 0.4 * 0.3
        assert!((m.score(1, 0) - 0.42).abs() < 1e-5);
        assert_eq!(m.get(0, 0), None);
    }

    #[test]
    fn negative_or_missing_similarity_counts_as_zero() {
        let texts = ["alpha text", "beta text", "gamma text"];
        let similarity = vec![vec![1.0, -0.8]];
        let m = TransitionMatrix::build(&texts, &similarity, &OrderingConfig::default());
        assert!((m.score(0, 1) - 0.12).abs() < 1e-5);
        assert!((m.score(2, 1) - 0.12).abs() < 1e-5);
    }
}
