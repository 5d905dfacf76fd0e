use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Univariate Student-t distribution with location, scale and degrees of
/// freedom. Used by the estimation stage as a heavy-tailed alternative to
/// the Gaussian height model; kept here with the rest of the distribution
/// zoo. Non-positive scale or degrees are rejected eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Student {
    degrees: f64,
    location: f64,
    scale: f64,
}

impl Student {
    pub fn new(degrees: f64, location: f64, scale: f64) -> Result<Self> {
        if degrees <= 0.0 {
            return Err(Error::BadArgument {
                name: "degrees",
                value: degrees,
                reason: "degrees of freedom must be strictly positive",
            });
        }
        if scale <= 0.0 {
            return Err(Error::BadArgument {
                name: "scale",
                value: scale,
                reason: "scale must be strictly positive",
            });
        }
        Ok(Self { degrees, location, scale })
    }

    pub fn degrees(&self) -> f64 {
        self.degrees
    }

    pub fn location(&self) -> f64 {
        self.location
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_location(&mut self, location: f64) {
        self.location = location;
    }

    pub fn set_scale(&mut self, scale: f64) -> Result<()> {
        if scale <= 0.0 {
            return Err(Error::BadArgument {
                name: "scale",
                value: scale,
                reason: "scale must be strictly positive",
            });
        }
        self.scale = scale;
        Ok(())
    }

    pub fn set_degrees(&mut self, degrees: f64) -> Result<()> {
        if degrees <= 0.0 {
            return Err(Error::BadArgument {
                name: "degrees",
                value: degrees,
                reason: "degrees of freedom must be strictly positive",
            });
        }
        self.degrees = degrees;
        Ok(())
    }

    /// Log of the normalisation constant.
    fn log_normalizer(&self) -> f64 {
        ln_gamma(0.5 * (self.degrees + 1.0))
            - ln_gamma(0.5 * self.degrees)
            - 0.5 * (self.degrees * std::f64::consts::PI * self.scale).ln()
    }

    pub fn pdf(&self, value: f64) -> f64 {
        self.logpdf(value).exp()
    }

    pub fn logpdf(&self, value: f64) -> f64 {
        self.log_normalizer()
            - 0.5 * (self.degrees + 1.0)
                * (1.0 + self.mahalanobis_distance(value) / self.degrees).ln()
    }

    /// Squared Mahalanobis distance from `value` to the location.
    pub fn mahalanobis_distance(&self, value: f64) -> f64 {
        let d = value - self.location;
        d * d / self.scale
    }

    /// Mean; undefined (NaN) for degrees <= 1.
    pub fn mean(&self) -> f64 {
        if self.degrees > 1.0 {
            self.location
        } else {
            f64::NAN
        }
    }

    pub fn median(&self) -> f64 {
        self.location
    }

    pub fn mode(&self) -> f64 {
        self.location
    }

    /// Variance; infinite for 1 < degrees <= 2, undefined (NaN) below.
    pub fn variance(&self) -> f64 {
        if self.degrees > 2.0 {
            self.degrees / (self.degrees - 2.0) * self.scale
        } else if self.degrees > 1.0 {
            f64::INFINITY
        } else {
            f64::NAN
        }
    }
}

/// Lanczos approximation of ln(Gamma(x)), g = 7, n = 9.
fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];
    if x < 0.5 {
        // Reflection formula.
        let pi = std::f64::consts::PI;
        (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut acc = COEFFS[0];
        for (i, &c) in COEFFS.iter().enumerate().skip(1) {
            acc += c / (x + i as f64);
        }
        let t = x + 7.5;
        0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn one_degree_matches_standard_cauchy() {
        let s = Student::new(1.0, 0.0, 1.0).unwrap();
        assert_relative_eq!(s.pdf(0.0), 1.0 / std::f64::consts::PI, epsilon = 1e-12);
        assert_relative_eq!(s.pdf(1.0), 1.0 / (2.0 * std::f64::consts::PI), epsilon = 1e-12);
    }

    #[test]
    fn large_degrees_approach_the_gaussian() {
        let s = Student::new(1e6, 0.0, 1.0).unwrap();
        assert_relative_eq!(s.pdf(0.0), 0.3989422804014327, epsilon = 1e-5);
    }

    #[test]
    fn moments_follow_the_degrees() {
        let s = Student::new(5.0, 2.0, 1.5).unwrap();
        assert_eq!(s.mean(), 2.0);
        assert_eq!(s.median(), 2.0);
        assert_eq!(s.mode(), 2.0);
        assert_relative_eq!(s.variance(), 5.0 / 3.0 * 1.5, epsilon = 1e-12);
        assert!(Student::new(1.0, 0.0, 1.0).unwrap().mean().is_nan());
        assert!(Student::new(1.5, 0.0, 1.0).unwrap().variance().is_infinite());
    }

    #[test]
    fn non_positive_parameters_are_rejected() {
        assert!(matches!(
            Student::new(0.0, 0.0, 1.0),
            Err(Error::BadArgument { name: "degrees", .. })
        ));
        assert!(matches!(
            Student::new(1.0, 0.0, -2.0),
            Err(Error::BadArgument { name: "scale", .. })
        ));
        let mut s = Student::new(1.0, 0.0, 1.0).unwrap();
        assert!(s.set_scale(0.0).is_err());
        assert!(s.set_degrees(-1.0).is_err());
        assert_eq!(s.scale(), 1.0);
        assert_eq!(s.degrees(), 1.0);
    }
}
