use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Per-feature standardisation to zero mean and unit variance.
///
/// Constant features keep a scale of 1 so they map to 0 instead of NaN.
///
/// # Example
/// ```
/// use vx_emotion::scaler::StandardScaler;
/// let scaler = StandardScaler::fit(&[vec![1.0, 5.0], vec![3.0, 5.0]]).unwrap();
/// assert_eq!(scaler.transform(&[2.0, 5.0]).unwrap(), vec![0.0, 0.0]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on the rows of `x`.
    ///
    /// # Errors
    /// Fails on an empty set, ragged rows or non-finite values.
    pub fn fit(x: &[Vec<f64>]) -> Result<Self, ModelError> {
        let first = x.first().ok_or(ModelError::EmptyTrainingSet)?;
        let dim = first.len();
        let n = x.len() as f64;

        let mut mean = vec![0.0; dim];
        for row in x {
            check_row(row, dim)?;
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0; dim];
        for row in x {
            for ((s, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2);
            }
        }
        let scale = var
            .into_iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std > 1e-12 { std } else { 1.0 }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Standardise one row.
    ///
    /// # Errors
    /// Fails on a width mismatch or non-finite input.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_row(row, self.dim())?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }
}

fn check_row(row: &[f64], dim: usize) -> Result<(), ModelError> {
    if row.len() != dim {
        return Err(ModelError::ShapeMismatch {
            expected: dim,
            got: row.len(),
        });
    }
    if row.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::NonFinite("feature value"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardises_columns() {
        let x = vec![vec![0.0, 10.0], vec![2.0, 20.0], vec![4.0, 30.0]];
        let scaler = StandardScaler::fit(&x).expect("fit");
        let z = scaler.transform(&[4.0, 10.0]).expect("transform");
        let std0 = (8.0f64 / 3.0).sqrt();
        assert!((z[0] - 2.0 / std0).abs() < 1e-12);
        assert!((z[1] + 10.0 / (200.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_rows() {
        assert!(matches!(
            StandardScaler::fit(&[]),
            Err(ModelError::EmptyTrainingSet)
        ));
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0]]).expect("fit");
        assert!(matches!(
            scaler.transform(&[1.0]),
            Err(ModelError::ShapeMismatch { expected: 2, got: 1 })
        ));
        assert!(matches!(
            scaler.transform(&[1.0, f64::NAN]),
            Err(ModelError::NonFinite(_))
        ));
    }
}
