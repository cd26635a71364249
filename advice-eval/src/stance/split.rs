//! Stratified train/test split

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Indices of the training and held-out rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices per class so each label keeps its share in both sets.
///
/// Each class sends `round(count * test_size)` rows to the test set, at
/// least one when the class has two or more members and never all of them.
pub fn train_test_split_stratified(labels: &[String], test_size: f64, seed: u64) -> Split {
    let mut by_class: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for (i, label) in labels.iter().enumerate() {
        by_class.entry(label.as_str()).or_default().push(i);
    }
    by_class.sort_keys();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for (_, mut indices) in by_class {
        indices.shuffle(&mut rng);
        let count = indices.len();
        let mut n_test = (count as f64 * test_size).round() as usize;
        if count >= 2 {
            n_test = n_test.clamp(1, count - 1);
        } else {
            n_test = 0;
        }
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Split { train, test }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(spec: &[(&str, usize)]) -> Vec<String> {
        spec.iter()
            .flat_map(|(l, n)| std::iter::repeat(l.to_string()).take(*n))
            .collect()
    }

    #[test]
    fn test_split_is_disjoint_and_complete() {
        let y = labels(&[("support", 10), ("oppose", 5), ("neutral", 1)]);
        let split = train_test_split_stratified(&y, 0.2, 42);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..y.len()).collect::<Vec<_>>());
        assert_eq!(split.test.len(), 2 + 1);
    }

    #[test]
    fn test_split_is_deterministic() {
        let y = labels(&[("a", 7), ("b", 7)]);
        assert_eq!(
            train_test_split_stratified(&y, 0.2, 7),
            train_test_split_stratified(&y, 0.2, 7)
        );
    }
}
