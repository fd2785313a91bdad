//! Linear regression consumed by the regression priority policy.
//!
//! The policy only depends on the [`RegressionService`] trait; [`OrdinaryLeastSquares`] is
//! the default implementation, solving the normal equations with `nalgebra`.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegressionError {
    #[error("insufficient samples: {samples} provided, {required} required")]
    InsufficientSamples { samples: usize, required: usize },

    #[error("design matrix has {rows} rows of width {expected}, but a row of width {found} or {targets} targets")]
    DimensionMismatch {
        rows: usize,
        expected: usize,
        found: usize,
        targets: usize,
    },

    #[error("normal equations are singular")]
    Singular,
}

/// A fitted linear model.
pub trait FittedModel {
    /// Coefficient of the `index`th design column.
    fn coefficient(&self, index: usize) -> Option<f64>;

    /// Coefficient of determination over the training samples.
    fn r_squared(&self) -> f64;

    /// Prediction for one design row, `None` if the row width does not match.
    fn predict(&self, row: &[f64]) -> Option<f64>;
}

/// Fits a linear model `targets ~ design`.
pub trait RegressionService {
    type Model: FittedModel;

    fn fit(&self, design: &[Vec<f64>], targets: &[f64]) -> Result<Self::Model, RegressionError>;
}

/// Coefficients and fit quality of a least-squares regression.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
}

impl FittedModel for LinearFit {
    fn coefficient(&self, index: usize) -> Option<f64> {
        self.coefficients.get(index).copied()
    }

    fn r_squared(&self) -> f64 {
        self.r_squared
    }

    fn predict(&self, row: &[f64]) -> Option<f64> {
        (row.len() == self.coefficients.len()).then(|| {
            row.iter()
                .zip(&self.coefficients)
                .map(|(x, beta)| x * beta)
                .sum()
        })
    }
}

/// Ordinary least squares via `(XᵀX)⁻¹ Xᵀy`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdinaryLeastSquares;

impl RegressionService for OrdinaryLeastSquares {
    type Model = LinearFit;

    fn fit(&self, design: &[Vec<f64>], targets: &[f64]) -> Result<LinearFit, RegressionError> {
        let rows = design.len();
        let width = design.first().map(Vec::len).unwrap_or_default();

        if let Some(row) = design.iter().find(|row| row.len() != width) {
            return Err(RegressionError::DimensionMismatch {
                rows,
                expected: width,
                found: row.len(),
                targets: targets.len(),
            });
        }
        if rows != targets.len() || width == 0 {
            return Err(RegressionError::DimensionMismatch {
                rows,
                expected: width,
                found: width,
                targets: targets.len(),
            });
        }
        if rows <= width {
            return Err(RegressionError::InsufficientSamples {
                samples: rows,
                required: width + 1,
            });
        }

        let flat: Vec<f64> = design.iter().flatten().copied().collect();
        let x = DMatrix::from_row_slice(rows, width, &flat);
        let y = DVector::from_column_slice(targets);

        let xt = x.transpose();
        let gram = &xt * &x;
        let inverse = gram.try_inverse().ok_or(RegressionError::Singular)?;
        let beta = inverse * (&xt * &y);

        if beta.iter().any(|value| !value.is_finite()) {
            return Err(RegressionError::Singular);
        }

        let fitted = &x * &beta;
        let mean = y.mean();
        let total: f64 = y.iter().map(|value| (value - mean).powi(2)).sum();
        let residual = (&y - &fitted).norm_squared();

        // Constant targets: a perfect fit explains everything, anything else nothing
        let r_squared = if total <= f64::EPSILON {
            if residual <= 1e-9 { 1.0 } else { 0.0 }
        } else {
            1.0 - residual / total
        };

        Ok(LinearFit {
            coefficients: beta.iter().copied().collect(),
            r_squared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ols_recovers_exact_line() {
        // y = 1 + 2x
        let design: Vec<Vec<f64>> = (0..5).map(|x| vec![1.0, x as f64]).collect();
        let targets: Vec<f64> = (0..5).map(|x| 1.0 + 2.0 * x as f64).collect();

        let fit = OrdinaryLeastSquares.fit(&design, &targets).unwrap();

        assert!((fit.coefficient(0).unwrap() - 1.0).abs() < 1e-9);
        assert!((fit.coefficient(1).unwrap() - 2.0).abs() < 1e-9);
        assert!((fit.r_squared() - 1.0).abs() < 1e-9);
        assert!((fit.predict(&[1.0, 10.0]).unwrap() - 21.0).abs() < 1e-9);
        assert_eq!(fit.predict(&[1.0]), None);
        assert_eq!(fit.coefficient(2), None);
    }

    #[test]
    fn test_ols_noisy_fit_has_partial_r_squared() {
        let design: Vec<Vec<f64>> = (0..6).map(|x| vec![1.0, x as f64]).collect();
        let targets = [0.0, 2.0, 1.0, 4.0, 3.0, 5.0];

        let fit = OrdinaryLeastSquares.fit(&design, &targets).unwrap();

        assert!(fit.r_squared() > 0.5 && fit.r_squared() < 1.0);
    }

    #[test]
    fn test_ols_rejects_too_few_samples() {
        let design = vec![vec![1.0, 0.0], vec![1.0, 1.0]];

        assert_eq!(
            OrdinaryLeastSquares.fit(&design, &[0.0, 1.0]),
            Err(RegressionError::InsufficientSamples {
                samples: 2,
                required: 3
            })
        );
    }

    #[test]
    fn test_ols_rejects_mismatched_dimensions() {
        let ragged = vec![vec![1.0, 0.0], vec![1.0], vec![1.0, 2.0]];
        assert!(matches!(
            OrdinaryLeastSquares.fit(&ragged, &[0.0, 1.0, 2.0]),
            Err(RegressionError::DimensionMismatch { .. })
        ));

        let design = vec![vec![1.0, 0.0], vec![1.0, 1.0], vec![1.0, 2.0]];
        assert!(matches!(
            OrdinaryLeastSquares.fit(&design, &[0.0, 1.0]),
            Err(RegressionError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_ols_rejects_collinear_design() {
        // Second column is a copy of the intercept
        let design: Vec<Vec<f64>> = (0..4).map(|_| vec![1.0, 1.0]).collect();

        assert_eq!(
            OrdinaryLeastSquares.fit(&design, &[1.0, 2.0, 3.0, 4.0]),
            Err(RegressionError::Singular)
        );
    }
}
