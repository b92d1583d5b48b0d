/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Probability-weighted-moment estimation with bootstrap uncertainty.
//
// Created on: 21 Mar 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Probability-weighted moments
//!
//! Closed-form stationary estimators: the Hosking inversion for the GEV and
//! the Hosking–Wallis inversion for the GPD, both driven by the first three
//! sample probability-weighted moments. No optimizer is involved, so the fit
//! is fast and deterministic; uncertainty comes from a nonparametric
//! bootstrap over the response series.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::function::gamma::gamma;

use crate::fit::{ConfidenceInterval, FitError, validate_confidence_level, validate_probability};
use crate::models::evd::SHAPE_LIMIT_TOLERANCE;
use crate::models::{EvaModel, LinkedParams, ModelFamily};
use crate::utils::{percentile, usize_to_f64};

const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

/// Bootstrap controls for interval estimation.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapOptions {
    /// Number of successful resample refits to collect.
    pub iterations: usize,
    /// Seed for the resampling generator.
    pub seed: u64,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            iterations: 500,
            seed: 42,
        }
    }
}

/// A model fitted by probability-weighted moments.
#[derive(Debug, Clone)]
pub struct PwmEva {
    model: EvaModel,
    theta: Vec<f64>,
}

/// Fit a stationary model by probability-weighted moments.
///
/// # Errors
///
/// Returns `FitError::NonStationaryModel` when any parameter carries
/// covariates, and `FitError::NonConvergence` if the moment inversion yields
/// an unusable (non-finite or non-positive-scale) estimate.
pub fn fit_pwm(model: &EvaModel) -> Result<PwmEva, FitError> {
    if !model.is_stationary() {
        return Err(FitError::NonStationaryModel);
    }
    let theta = invert_moments(model.family(), model.data().values())?;
    Ok(PwmEva {
        model: model.clone(),
        theta,
    })
}

impl PwmEva {
    pub(crate) const fn from_parts(model: EvaModel, theta: Vec<f64>) -> Self {
        Self { model, theta }
    }

    #[must_use]
    pub const fn model(&self) -> &EvaModel {
        &self.model
    }

    /// The point estimate on the flat-vector layout.
    #[must_use]
    pub fn theta(&self) -> &[f64] {
        &self.theta
    }

    #[must_use]
    pub fn loglikelihood(&self) -> f64 {
        self.model.loglikelihood(&self.theta)
    }

    /// Fitted distribution per quantile row (a single row: PWM fits are
    /// stationary by construction).
    #[must_use]
    pub fn linked_distributions(&self) -> Vec<LinkedParams> {
        self.model.linked_rows(&self.theta)
    }

    /// Quantile of the fitted distribution at `p`.
    ///
    /// # Errors
    ///
    /// Returns `FitError::InvalidProbability` unless `p` lies in `(0, 1)`.
    pub fn quantile(&self, p: f64) -> Result<Vec<f64>, FitError> {
        validate_probability(p)?;
        let family = self.model.family();
        Ok(self
            .linked_distributions()
            .iter()
            .map(|params| params.quantile(p, family))
            .collect())
    }

    /// Percentile bootstrap intervals per flat-vector coefficient.
    ///
    /// # Errors
    ///
    /// Returns `FitError` if the level or bootstrap options are invalid, or
    /// too many resample refits fail.
    pub fn confidence_intervals(
        &self,
        level: f64,
        options: BootstrapOptions,
    ) -> Result<Vec<ConfidenceInterval>, FitError> {
        validate_confidence_level(level)?;
        let thetas = self.bootstrap_thetas(options)?;
        let lower_p = 0.5 * (1.0 - level);
        let upper_p = 1.0 - lower_p;

        Ok((0..self.theta.len())
            .map(|coefficient| {
                let mut draws: Vec<f64> = thetas.iter().map(|theta| theta[coefficient]).collect();
                draws.sort_by(f64::total_cmp);
                ConfidenceInterval {
                    lower: percentile(&draws, lower_p),
                    upper: percentile(&draws, upper_p),
                }
            })
            .collect())
    }

    /// Refitted parameter vectors over bootstrap resamples of the response.
    ///
    /// Resamples whose moment inversion fails are redrawn, up to a failure
    /// budget of one fifth of the requested iterations.
    pub(crate) fn bootstrap_thetas(
        &self,
        options: BootstrapOptions,
    ) -> Result<Vec<Vec<f64>>, FitError> {
        if options.iterations == 0 {
            return Err(FitError::InvalidBootstrapIterations);
        }
        let data = self.model.data().values();
        let n = data.len();
        let failure_budget = (options.iterations / 5).max(1);
        let mut rng = StdRng::seed_from_u64(options.seed);
        let mut thetas = Vec::with_capacity(options.iterations);
        let mut failures = 0;

        while thetas.len() < options.iterations {
            let resample: Vec<f64> = (0..n).map(|_| data[rng.random_range(0..n)]).collect();
            match invert_moments(self.model.family(), &resample) {
                Ok(theta) => thetas.push(theta),
                Err(_) => {
                    failures += 1;
                    if failures > failure_budget {
                        return Err(FitError::TooManyBootstrapFailures(failures));
                    }
                }
            }
        }
        Ok(thetas)
    }
}

/// First three sample probability-weighted moments `b0, b1, b2`.
fn sample_pwms(data: &[f64]) -> [f64; 3] {
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = usize_to_f64(sorted.len());

    let mut moments = [0.0; 3];
    for (rank, &x) in sorted.iter().enumerate() {
        let i = usize_to_f64(rank + 1);
        let mut weight = 1.0;
        moments[0] += x;
        for (r, moment) in moments.iter_mut().enumerate().skip(1) {
            let j = usize_to_f64(r);
            weight *= (i - j) / (n - j);
            *moment += weight * x;
        }
    }
    for moment in &mut moments {
        *moment /= n;
    }
    moments
}

fn invert_moments(family: ModelFamily, data: &[f64]) -> Result<Vec<f64>, FitError> {
    let [b0, b1, b2] = sample_pwms(data);
    let estimate = match family {
        ModelFamily::BlockMaxima => invert_gev(b0, b1, b2),
        ModelFamily::ThresholdExceedance => invert_gpd(b0, b1),
    };
    if estimate.iter().all(|value| value.is_finite()) {
        Ok(estimate)
    } else {
        Err(FitError::NonConvergence)
    }
}

/// Hosking (1985) GEV inversion, returned as `[location, ln scale, shape]`.
fn invert_gev(b0: f64, b1: f64, b2: f64) -> Vec<f64> {
    let c = (2.0f64.mul_add(b1, -b0)) / (3.0f64.mul_add(b2, -b0))
        - std::f64::consts::LN_2 / 3.0f64.ln();
    let k = 2.9554f64.mul_add(c * c, 7.8590 * c);

    if k.abs() < SHAPE_LIMIT_TOLERANCE {
        let scale = (2.0f64.mul_add(b1, -b0)) / std::f64::consts::LN_2;
        let location = EULER_MASCHERONI.mul_add(-scale, b0);
        return vec![location, scale.ln(), 0.0];
    }

    let scale = (2.0f64.mul_add(b1, -b0)) * k / (gamma(1.0 + k) * (1.0 - (-k).exp2()));
    let location = b0 + scale * (gamma(1.0 + k) - 1.0) / k;
    vec![location, scale.ln(), -k]
}

/// Hosking–Wallis (1987) GPD inversion, returned as `[ln scale, shape]`.
fn invert_gpd(b0: f64, b1: f64) -> Vec<f64> {
    let denominator = 2.0f64.mul_add(b1, -b0);
    let k = b0 / denominator - 2.0;
    let scale = 2.0 * b0 * (b0 - b1) / denominator;
    vec![scale.ln(), -k]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Variable;
    use crate::models::Covariates;
    use crate::preprocess::standardize_covariate;
    use approx::assert_relative_eq;

    fn stationary_gev(values: Vec<f64>) -> EvaModel {
        EvaModel::block_maxima(Variable::new("maxima", values), Covariates::default())
            .expect("model should build")
    }

    #[test]
    fn sample_pwms_match_hand_computation() {
        // Sorted data 1, 2, 3, 4: b1 = sum x_(i) (i-1)/(n-1) / n, b2 analogous.
        let [b0, b1, b2] = sample_pwms(&[4.0, 1.0, 3.0, 2.0]);
        assert_relative_eq!(b0, 2.5);
        assert_relative_eq!(b1, (2.0 / 3.0 + 2.0 * 3.0 / 3.0 + 4.0) / 4.0, epsilon = 1.0e-12);
        assert_relative_eq!(b2, (3.0 * 2.0 / 6.0 + 4.0) / 4.0, epsilon = 1.0e-12);
    }

    #[test]
    fn gumbel_branch_engages_for_tiny_shape() {
        // Exact Gumbel(0, 1) PWMs: b0 = gamma, b1 = (gamma + ln 2) / 2.
        let b0 = EULER_MASCHERONI;
        let b1 = 0.5 * (EULER_MASCHERONI + std::f64::consts::LN_2);
        // b2 chosen so the shape polynomial lands at zero.
        let b2 = (b0 + (2.0f64.mul_add(b1, -b0)) * 3.0f64.ln() / std::f64::consts::LN_2) / 3.0;
        let theta = invert_gev(b0, b1, b2);
        assert_relative_eq!(theta[0], 0.0, epsilon = 1.0e-6);
        assert_relative_eq!(theta[1], 0.0, epsilon = 1.0e-6);
        assert_relative_eq!(theta[2], 0.0);
    }

    #[test]
    fn gpd_inversion_recovers_exponential_moments() {
        // Exponential(scale = 2): b0 = sigma = 2, b1 = E[X F(X)] = 3 sigma / 4.
        let theta = invert_gpd(2.0, 1.5);
        assert_relative_eq!(theta[0], 2.0f64.ln(), epsilon = 1.0e-12);
        assert_relative_eq!(theta[1], 0.0, epsilon = 1.0e-12);
    }

    #[test]
    fn gpd_inversion_recovers_uniform_moments() {
        // GPD with shape -1 is uniform on [0, sigma]: b0 = sigma / 2,
        // b1 = sigma / 3.
        let theta = invert_gpd(1.5, 1.0);
        assert_relative_eq!(theta[0], 3.0f64.ln(), epsilon = 1.0e-12);
        assert_relative_eq!(theta[1], -1.0, epsilon = 1.0e-12);
    }

    #[test]
    fn nonstationary_models_are_rejected() {
        let covariate = standardize_covariate(Variable::new("year", vec![1.0, 2.0, 3.0]))
            .expect("covariate should standardize");
        let model = EvaModel::block_maxima(
            Variable::new("maxima", vec![1.0, 2.0, 3.0]),
            Covariates {
                log_scale: vec![covariate],
                ..Covariates::default()
            },
        )
        .expect("model should build");
        assert!(matches!(fit_pwm(&model), Err(FitError::NonStationaryModel)));
    }

    #[test]
    fn bootstrap_is_deterministic_under_a_fixed_seed() {
        let model = stationary_gev(vec![
            3.2, 4.1, 2.8, 3.9, 4.4, 3.1, 3.6, 4.0, 2.9, 3.7, 4.2, 3.3, 3.8, 4.5, 3.0,
        ]);
        let fit = fit_pwm(&model).expect("fit should succeed");
        let options = BootstrapOptions {
            iterations: 50,
            seed: 7,
        };
        let first = fit.bootstrap_thetas(options).expect("bootstrap should run");
        let second = fit.bootstrap_thetas(options).expect("bootstrap should run");
        assert_eq!(first, second);
        assert_eq!(first.len(), 50);
    }

    #[test]
    fn zero_bootstrap_iterations_are_rejected() {
        let model = stationary_gev(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let fit = fit_pwm(&model).expect("fit should succeed");
        let result = fit.bootstrap_thetas(BootstrapOptions {
            iterations: 0,
            seed: 1,
        });
        assert!(matches!(result, Err(FitError::InvalidBootstrapIterations)));
    }

    #[test]
    fn intervals_bracket_the_point_estimate() {
        let model = stationary_gev(vec![
            2.1, 2.7, 3.4, 2.9, 3.8, 2.5, 3.1, 2.8, 3.6, 2.4, 3.0, 3.3, 2.6, 3.9, 2.2, 3.2,
            2.95, 3.45, 2.35, 3.05,
        ]);
        let fit = fit_pwm(&model).expect("fit should succeed");
        let intervals = fit
            .confidence_intervals(0.95, BootstrapOptions::default())
            .expect("intervals should compute");
        assert_eq!(intervals.len(), 3);
        for interval in intervals {
            assert!(interval.lower < interval.upper);
        }
    }
}
