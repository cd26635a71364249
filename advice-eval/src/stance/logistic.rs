//! Multinomial logistic regression

use super::StanceError;

/// Softmax regression fitted by full-batch gradient descent with an L2
/// penalty. Features are standardized with statistics from the training set.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Inverse regularization strength
    pub c: f64,
    pub tolerance: f64,
    classes: Vec<String>,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1000)
    }
}

fn softmax_in_place(z: &mut [f64]) {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for v in z.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in z.iter_mut() {
        *v /= sum;
    }
}

impl LogisticRegression {
    pub fn new(max_iter: usize) -> Self {
        Self {
            max_iter,
            learning_rate: 0.1,
            c: 1.0,
            tolerance: 1e-6,
            classes: Vec::new(),
            weights: Vec::new(),
            bias: Vec::new(),
            mean: Vec::new(),
            scale: Vec::new(),
        }
    }

    /// Sorted class labels seen during `fit`
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn fit(&mut self, x: &[Vec<f64>], y: &[String]) -> Result<(), StanceError> {
        if x.len() != y.len() {
            return Err(StanceError::InvalidParams(format!(
                "{} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        let mut classes: Vec<String> = y.to_vec();
        classes.sort();
        classes.dedup();
        if classes.len() < 2 {
            return Err(StanceError::TooFewClasses(classes.len()));
        }

        let n = x.len();
        let d = x[0].len();
        let k = classes.len();

        self.mean = (0..d).map(|j| x.iter().map(|r| r[j]).sum::<f64>() / n as f64).collect();
        self.scale = (0..d)
            .map(|j| {
                let var = x.iter().map(|r| (r[j] - self.mean[j]).powi(2)).sum::<f64>() / n as f64;
                let sd = var.sqrt();
                if sd > f64::EPSILON { sd } else { 1.0 }
            })
            .collect();

        let xs: Vec<Vec<f64>> = x.iter().map(|r| self.standardize(r)).collect();
        let targets: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or(0))
            .collect();

        self.classes = classes;
        self.weights = vec![vec![0.0; d]; k];
        self.bias = vec![0.0; k];

        for iter in 0..self.max_iter {
            let mut grad_w = vec![vec![0.0; d]; k];
            let mut grad_b = vec![0.0; k];

            for (row, &t) in xs.iter().zip(&targets) {
                let mut p = self.logits(row);
                softmax_in_place(&mut p);
                p[t] -= 1.0;
                for c in 0..k {
                    grad_b[c] += p[c];
                    for (g, v) in grad_w[c].iter_mut().zip(row) {
                        *g += p[c] * v;
                    }
                }
            }

            let mut norm = 0.0;
            let nf = n as f64;
            for c in 0..k {
                for j in 0..d {
                    let g = grad_w[c][j] / nf + self.weights[c][j] / (self.c * nf);
                    self.weights[c][j] -= self.learning_rate * g;
                    norm += g * g;
                }
                let g = grad_b[c] / nf;
                self.bias[c] -= self.learning_rate * g;
                norm += g * g;
            }

            if norm.sqrt() < self.tolerance {
                tracing::debug!("logistic regression converged after {} iterations", iter + 1);
                break;
            }
        }
        Ok(())
    }

    fn standardize(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    fn logits(&self, standardized: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| w.iter().zip(standardized).map(|(a, x)| a * x).sum::<f64>() + b)
            .collect()
    }

    /// Class probabilities per row, ordered like `classes()`
    pub fn predict_proba(&self, x: &[Vec<f64>]) -> Vec<Vec<f64>> {
        x.iter()
            .map(|row| {
                let mut z = self.logits(&self.standardize(row));
                softmax_in_place(&mut z);
                z
            })
            .collect()
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<String> {
        self.predict_proba(x)
            .into_iter()
            .map(|p| {
                let best = p
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                self.classes[best].clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<String>) {
        let x = vec![
            vec![0.0, 0.1],
            vec![0.2, 0.0],
            vec![0.1, 0.3],
            vec![5.0, 5.1],
            vec![5.2, 4.9],
            vec![4.8, 5.0],
            vec![10.0, 0.0],
            vec![10.2, 0.3],
            vec![9.9, 0.1],
        ];
        let y = ["neutral", "neutral", "neutral", "support", "support", "support", "oppose", "oppose", "oppose"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        (x, y)
    }

    #[test]
    fn test_fits_separable_data() {
        let (x, y) = separable();
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.classes(), &["neutral", "oppose", "support"]);
        assert_eq!(model.predict(&x), y);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(50);
        model.fit(&x, &y).unwrap();
        for p in model.predict_proba(&x) {
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_class_is_rejected() {
        let x = vec![vec![1.0], vec![2.0]];
        let y = vec!["a".to_string(), "a".to_string()];
        let err = LogisticRegression::default().fit(&x, &y).unwrap_err();
        assert!(matches!(err, StanceError::TooFewClasses(1)));
    }
}
