use serde::{Deserialize, Serialize};

use crate::coords::Point2;
use crate::error::{Error, Result};

/// Linear height model for one terrain class: the expected cell height is
/// `coeffs · [1, x, y]` with Gaussian noise of the given variance. The
/// mixture weight is the class prior estimated upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionModel {
    /// Bias, x and y slope coefficients.
    pub coeffs: [f64; 3],
    /// Regression noise variance.
    pub variance: f64,
    /// Mixture weight of this class.
    pub weight: f64,
}

impl RegressionModel {
    pub fn new(coeffs: [f64; 3], variance: f64, weight: f64) -> Result<Self> {
        if variance <= 0.0 {
            return Err(Error::BadArgument {
                name: "variance",
                value: variance,
                reason: "regression noise variance must be strictly positive",
            });
        }
        Ok(Self { coeffs, variance, weight })
    }

    /// Predicted height at a planar point.
    pub fn predict(&self, p: Point2) -> f64 {
        self.coeffs[0] + self.coeffs[1] * p.x + self.coeffs[2] * p.y
    }
}

/// The full per-class appearance model: K regression planes with mixture
/// weights. K is the label domain size of the graphical model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixtureModel {
    models: Vec<RegressionModel>,
}

impl MixtureModel {
    pub fn new(models: Vec<RegressionModel>) -> Self {
        Self { models }
    }

    /// Assemble from the three parallel collections the estimation stage
    /// produces: one coefficient vector, one noise variance and one weight
    /// per class.
    pub fn from_parts(
        coeffs: Vec<[f64; 3]>,
        variances: Vec<f64>,
        weights: Vec<f64>,
    ) -> Result<Self> {
        if coeffs.len() != variances.len() || coeffs.len() != weights.len() {
            return Err(Error::BadArgument {
                name: "variances/weights",
                value: variances.len() as f64,
                reason: "per-class collections must have equal length",
            });
        }
        let mut models = Vec::with_capacity(coeffs.len());
        for ((c, v), w) in coeffs.into_iter().zip(variances).zip(weights) {
            models.push(RegressionModel::new(c, v, w)?);
        }
        Ok(Self { models })
    }

    /// Number of terrain classes K.
    pub fn num_classes(&self) -> usize {
        self.models.len()
    }

    pub fn models(&self) -> &[RegressionModel] {
        &self.models
    }
}
