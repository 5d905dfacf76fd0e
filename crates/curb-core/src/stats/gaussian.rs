use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Univariate Gaussian parametrised by mean and variance.
/// A non-positive variance is rejected at construction and mutation time,
/// never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    mean: f64,
    variance: f64,
}

impl Gaussian {
    pub fn new(mean: f64, variance: f64) -> Result<Self> {
        if variance <= 0.0 {
            return Err(Error::BadArgument {
                name: "variance",
                value: variance,
                reason: "variance must be strictly positive",
            });
        }
        Ok(Self { mean, variance })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn set_mean(&mut self, mean: f64) {
        self.mean = mean;
    }

    pub fn set_variance(&mut self, variance: f64) -> Result<()> {
        if variance <= 0.0 {
            return Err(Error::BadArgument {
                name: "variance",
                value: variance,
                reason: "variance must be strictly positive",
            });
        }
        self.variance = variance;
        Ok(())
    }

    /// Probability density at `value`.
    pub fn pdf(&self, value: f64) -> f64 {
        self.logpdf(value).exp()
    }

    /// Log-density at `value`.
    pub fn logpdf(&self, value: f64) -> f64 {
        let d = value - self.mean;
        -0.5 * (2.0 * std::f64::consts::PI * self.variance).ln() - d * d / (2.0 * self.variance)
    }

    /// Cumulative density at `value`, via the Abramowitz-Stegun 7.1.26 erf
    /// approximation (absolute error < 1.5e-7).
    pub fn cdf(&self, value: f64) -> f64 {
        let z = (value - self.mean) / (2.0 * self.variance).sqrt();
        0.5 * (1.0 + erf(z))
    }

    /// Squared Mahalanobis distance from `value` to the mean.
    pub fn mahalanobis_distance(&self, value: f64) -> f64 {
        let d = value - self.mean;
        d * d / self.variance
    }
}

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    sign * (1.0 - poly * (-x * x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn standard_normal_pdf_at_zero() {
        let g = Gaussian::new(0.0, 1.0).unwrap();
        assert_relative_eq!(g.pdf(0.0), 0.3989422804014327, epsilon = 1e-12);
    }

    #[test]
    fn pdf_scales_with_variance() {
        let g = Gaussian::new(1.0, 4.0).unwrap();
        // N(1, 4) at 1 is 1 / (2 * sqrt(2 pi))
        assert_relative_eq!(g.pdf(1.0), 0.19947114020071635, epsilon = 1e-12);
    }

    #[test]
    fn cdf_is_half_at_the_mean() {
        let g = Gaussian::new(3.0, 2.0).unwrap();
        assert_relative_eq!(g.cdf(3.0), 0.5, epsilon = 1e-7);
        assert_relative_eq!(g.cdf(f64::INFINITY), 1.0, epsilon = 1e-7);
    }

    #[test]
    fn non_positive_variance_is_rejected_eagerly() {
        assert!(matches!(
            Gaussian::new(0.0, 0.0),
            Err(Error::BadArgument { name: "variance", .. })
        ));
        let mut g = Gaussian::new(0.0, 1.0).unwrap();
        assert!(g.set_variance(-1.0).is_err());
        assert_eq!(g.variance(), 1.0);
    }
}
