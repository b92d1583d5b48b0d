/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Generalized extreme-value and generalized Pareto distribution primitives.
//
// Created on: 14 Mar 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Extreme-value distributions
//!
//! Log-density, cdf, and quantile functions for the GEV and GPD families.
//! Support violations (non-positive scale, observations outside the implied
//! support, non-finite parameters) yield `f64::NEG_INFINITY` from the
//! log-densities rather than errors, so optimizers and samplers can probe
//! arbitrary parameter vectors.

/// Below this magnitude the shape parameter is treated as zero, switching to
/// the Gumbel (GEV) or exponential (GPD) limit forms.
pub const SHAPE_LIMIT_TOLERANCE: f64 = 1.0e-10;

/// GEV log-density at `x`.
#[must_use]
pub fn gev_logpdf(x: f64, location: f64, scale: f64, shape: f64) -> f64 {
    if !(scale > 0.0 && x.is_finite() && location.is_finite() && scale.is_finite()
        && shape.is_finite())
    {
        return f64::NEG_INFINITY;
    }

    let z = (x - location) / scale;
    if shape.abs() < SHAPE_LIMIT_TOLERANCE {
        return -scale.ln() - z - (-z).exp();
    }

    let t = shape.mul_add(z, 1.0);
    if t <= 0.0 {
        return f64::NEG_INFINITY;
    }
    -scale.ln() - (1.0 + 1.0 / shape) * t.ln() - t.powf(-1.0 / shape)
}

/// GEV cumulative distribution function at `x`.
#[must_use]
pub fn gev_cdf(x: f64, location: f64, scale: f64, shape: f64) -> f64 {
    let z = (x - location) / scale;
    if shape.abs() < SHAPE_LIMIT_TOLERANCE {
        return (-(-z).exp()).exp();
    }

    let t = shape.mul_add(z, 1.0);
    if t <= 0.0 {
        return if shape > 0.0 { 0.0 } else { 1.0 };
    }
    (-t.powf(-1.0 / shape)).exp()
}

/// GEV quantile at probability `p`; the caller validates `p` in `(0, 1)`.
#[must_use]
pub fn gev_quantile(p: f64, location: f64, scale: f64, shape: f64) -> f64 {
    let log_p = -p.ln();
    if shape.abs() < SHAPE_LIMIT_TOLERANCE {
        return scale.mul_add(-log_p.ln(), location);
    }
    scale.mul_add((log_p.powf(-shape) - 1.0) / shape, location)
}

/// GPD log-density at exceedance `x` (shifted to start at zero).
#[must_use]
pub fn gpd_logpdf(x: f64, scale: f64, shape: f64) -> f64 {
    if !(scale > 0.0 && x.is_finite() && scale.is_finite() && shape.is_finite()) || x < 0.0 {
        return f64::NEG_INFINITY;
    }

    if shape.abs() < SHAPE_LIMIT_TOLERANCE {
        return -scale.ln() - x / scale;
    }

    let t = shape.mul_add(x / scale, 1.0);
    if t <= 0.0 {
        return f64::NEG_INFINITY;
    }
    -scale.ln() - (1.0 + 1.0 / shape) * t.ln()
}

/// GPD cumulative distribution function at exceedance `x`.
#[must_use]
pub fn gpd_cdf(x: f64, scale: f64, shape: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if shape.abs() < SHAPE_LIMIT_TOLERANCE {
        return 1.0 - (-x / scale).exp();
    }
    let t = shape.mul_add(x / scale, 1.0);
    if t <= 0.0 {
        // Above the upper endpoint for negative shape.
        return 1.0;
    }
    1.0 - t.powf(-1.0 / shape)
}

/// GPD quantile at probability `p`; the caller validates `p` in `(0, 1)`.
#[must_use]
pub fn gpd_quantile(p: f64, scale: f64, shape: f64) -> f64 {
    if shape.abs() < SHAPE_LIMIT_TOLERANCE {
        return -scale * (1.0 - p).ln();
    }
    scale * ((1.0 - p).powf(-shape) - 1.0) / shape
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gev_logpdf_rejects_non_positive_scale() {
        assert!(!gev_logpdf(1.0, 0.0, 0.0, 0.1).is_finite());
        assert!(!gev_logpdf(1.0, 0.0, -1.0, 0.1).is_finite());
    }

    #[test]
    fn gev_logpdf_rejects_points_outside_support() {
        // shape > 0: lower endpoint at location - scale/shape.
        assert!(!gev_logpdf(-20.0, 0.0, 1.0, 0.2).is_finite());
        // shape < 0: upper endpoint at location - scale/shape.
        assert!(!gev_logpdf(20.0, 0.0, 1.0, -0.2).is_finite());
    }

    #[test]
    fn gev_is_continuous_through_zero_shape() {
        let near_zero = gev_logpdf(1.3, 0.5, 2.0, 1.0e-12);
        let gumbel = gev_logpdf(1.3, 0.5, 2.0, 0.0);
        assert_relative_eq!(near_zero, gumbel, epsilon = 1.0e-9);

        let q_near = gev_quantile(0.9, 0.5, 2.0, 1.0e-12);
        let q_gumbel = gev_quantile(0.9, 0.5, 2.0, 0.0);
        assert_relative_eq!(q_near, q_gumbel, epsilon = 1.0e-7);
    }

    #[test]
    fn gev_quantile_inverts_cdf() {
        for &shape in &[-0.3, 0.0, 0.4] {
            for &p in &[0.05, 0.5, 0.99] {
                let q = gev_quantile(p, 1.0, 0.7, shape);
                assert_relative_eq!(gev_cdf(q, 1.0, 0.7, shape), p, epsilon = 1.0e-10);
            }
        }
    }

    #[test]
    fn gpd_quantile_inverts_cdf() {
        for &shape in &[-0.3, 0.0, 0.4] {
            for &p in &[0.05, 0.5, 0.99] {
                let q = gpd_quantile(p, 0.7, shape);
                assert_relative_eq!(gpd_cdf(q, 0.7, shape), p, epsilon = 1.0e-10);
            }
        }
    }

    #[test]
    fn gpd_logpdf_rejects_negative_exceedances() {
        assert!(!gpd_logpdf(-0.1, 1.0, 0.1).is_finite());
    }

    #[test]
    fn gpd_negative_shape_bounds_support() {
        // Upper endpoint is -scale/shape = 5 for scale 1, shape -0.2.
        assert!(gpd_logpdf(4.9, 1.0, -0.2).is_finite());
        assert!(!gpd_logpdf(5.1, 1.0, -0.2).is_finite());
    }

    #[test]
    fn exponential_limit_matches_closed_form() {
        let x = 1.7;
        let scale = 2.5;
        assert_relative_eq!(
            gpd_logpdf(x, scale, 0.0),
            -scale.ln() - x / scale,
            epsilon = 1.0e-12
        );
    }
}
