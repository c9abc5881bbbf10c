use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use vx_core::config::TrainingConfig;

use crate::error::ModelError;

/// Gradient-descent hyperparameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainParams {
    pub epochs: usize,
    pub learning_rate: f64,
    /// L2 penalty on weights (bias is not penalised).
    pub l2: f64,
}

impl From<&TrainingConfig> for TrainParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            epochs: config.epochs,
            learning_rate: config.learning_rate,
            l2: config.l2,
        }
    }
}

/// Multinomial logistic regression.
///
/// `weights[c]` holds the coefficients of class `c`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl SoftmaxRegression {
    /// Full-batch gradient descent on cross-entropy plus L2.
    ///
    /// Per-sample gradients are accumulated in parallel with rayon.
    ///
    /// # Errors
    /// Fails on an empty set, ragged rows, a label outside `0..n_classes`,
    /// or if training diverges to non-finite weights.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        params: TrainParams,
    ) -> Result<Self, ModelError> {
        let dim = x.first().ok_or(ModelError::EmptyTrainingSet)?.len();
        if n_classes == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if y.len() != x.len() {
            return Err(ModelError::ShapeMismatch {
                expected: x.len(),
                got: y.len(),
            });
        }
        if let Some(row) = x.iter().find(|r| r.len() != dim) {
            return Err(ModelError::ShapeMismatch {
                expected: dim,
                got: row.len(),
            });
        }
        if let Some(&label) = y.iter().find(|&&c| c >= n_classes) {
            return Err(ModelError::LabelMismatch {
                labels: label + 1,
                classes: n_classes,
            });
        }

        let mut model = Self {
            weights: vec![vec![0.0; dim]; n_classes],
            bias: vec![0.0; n_classes],
        };
        let n = x.len() as f64;

        for _ in 0..params.epochs {
            let zero = || (vec![vec![0.0; dim]; n_classes], vec![0.0; n_classes]);
            let (grad_w, grad_b) = x
                .par_iter()
                .zip(y.par_iter())
                .fold(zero, |(mut gw, mut gb), (row, &label)| {
                    let probs = model.probabilities(row);
                    for (c, p) in probs.iter().enumerate() {
                        let err = p - if c == label { 1.0 } else { 0.0 };
                        gb[c] += err;
                        for (g, v) in gw[c].iter_mut().zip(row) {
                            *g += err * v;
                        }
                    }
                    (gw, gb)
                })
                .reduce(zero, |(mut aw, mut ab), (bw, bb)| {
                    for (a_row, b_row) in aw.iter_mut().zip(&bw) {
                        for (a, b) in a_row.iter_mut().zip(b_row) {
                            *a += b;
                        }
                    }
                    for (a, b) in ab.iter_mut().zip(&bb) {
                        *a += b;
                    }
                    (aw, ab)
                });

            for c in 0..n_classes {
                for (w, g) in model.weights[c].iter_mut().zip(&grad_w[c]) {
                    *w -= params.learning_rate * (g / n + params.l2 * *w);
                }
                model.bias[c] -= params.learning_rate * grad_b[c] / n;
            }
        }

        if model
            .weights
            .iter()
            .flatten()
            .chain(&model.bias)
            .any(|v| !v.is_finite())
        {
            return Err(ModelError::NonFinite("classifier weights"));
        }
        Ok(model)
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.bias.len()
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    /// Class probabilities for one standardised row.
    ///
    /// # Errors
    /// Fails on a width mismatch or non-finite output.
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        if row.len() != self.dim() {
            return Err(ModelError::ShapeMismatch {
                expected: self.dim(),
                got: row.len(),
            });
        }
        let probs = self.probabilities(row);
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(ModelError::NonFinite("class probability"));
        }
        Ok(probs)
    }

    /// Index of the most probable class.
    ///
    /// # Errors
    /// Same as [`Self::predict_proba`].
    pub fn predict(&self, row: &[f64]) -> Result<usize, ModelError> {
        let probs = self.predict_proba(row)?;
        Ok(argmax(&probs))
    }

    fn probabilities(&self, row: &[f64]) -> Vec<f64> {
        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| b + w.iter().zip(row).map(|(a, x)| a * x).sum::<f64>())
            .collect();
        softmax(&logits)
    }
}

/// Numerically stable softmax.
fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

pub(crate) fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(i, _)| i)
}
