/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Back-transform of fitted coefficients from standardized to raw covariates.
//
// Created on: 21 Mar 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Coefficient back-transform
//!
//! Fitting happens on standardized covariates for numerical stability; the
//! back-transform rewrites a fitted result so its coefficients apply to the
//! raw covariate values instead. The linear predictor is left untouched:
//! with `raw = standardized * scale + offset`, every slope is divided by its
//! covariate's scale and the intercept absorbs the offsets, so the linked
//! distributions (and the likelihood) are identical before and after.

use crate::fit::bayesian::{BayesianEva, Chain};
use crate::fit::mle::MaximumLikelihoodEva;
use crate::fit::pwm::PwmEva;
use crate::fit::FittedEva;
use crate::input::{ExplanatoryVariable, Variable};
use crate::models::{Covariates, EvaModel};
use crate::preprocess::reconstruct;

/// Rewrite one flat parameter vector onto the raw covariate scale.
#[must_use]
pub fn back_transform_theta(model: &EvaModel, theta: &[f64]) -> Vec<f64> {
    let mut transformed = theta.to_vec();
    for (parameter, slice) in model.parameter_index().parameters() {
        let covariates = model.covariate_list(parameter);
        let mut intercept = theta[slice.start];
        for (offset_index, covariate) in covariates.iter().enumerate() {
            let position = slice.start + 1 + offset_index;
            let slope = theta[position];
            intercept -= slope * covariate.offset() / covariate.scale();
            transformed[position] = slope / covariate.scale();
        }
        transformed[slice.start] = intercept;
    }
    transformed
}

/// A fitted result with coefficients and covariates on the raw scale.
#[must_use]
pub fn back_transform(fit: &FittedEva) -> FittedEva {
    match fit {
        FittedEva::MaximumLikelihood(fit) => {
            FittedEva::MaximumLikelihood(back_transform_mle(fit))
        }
        FittedEva::Pwm(fit) => FittedEva::Pwm(back_transform_pwm(fit)),
        FittedEva::Bayesian(fit) => FittedEva::Bayesian(back_transform_bayesian(fit)),
    }
}

#[must_use]
pub fn back_transform_mle(fit: &MaximumLikelihoodEva) -> MaximumLikelihoodEva {
    let theta = back_transform_theta(fit.model(), fit.theta());
    MaximumLikelihoodEva::from_parts(raw_scale_model(fit.model()), theta)
}

#[must_use]
pub fn back_transform_pwm(fit: &PwmEva) -> PwmEva {
    // PWM fits are stationary, so the vector is unchanged; the model swap
    // keeps the contract uniform across strategies.
    let theta = back_transform_theta(fit.model(), fit.theta());
    PwmEva::from_parts(raw_scale_model(fit.model()), theta)
}

/// Every retained draw is transformed, so posterior summaries (intervals,
/// means, quantiles) computed afterwards are already on the raw scale.
#[must_use]
pub fn back_transform_bayesian(fit: &BayesianEva) -> BayesianEva {
    let draws = fit
        .chain()
        .draws()
        .iter()
        .map(|draw| back_transform_theta(fit.model(), draw))
        .collect();
    BayesianEva::from_parts(raw_scale_model(fit.model()), Chain::from_draws(draws))
}

/// The same model with every covariate rebuilt on its raw values and an
/// identity transform record.
fn raw_scale_model(model: &EvaModel) -> EvaModel {
    let covariates = model.covariates();
    let rebuilt = Covariates {
        location: raw_covariates(&covariates.location),
        log_scale: raw_covariates(&covariates.log_scale),
        shape: raw_covariates(&covariates.shape),
    };
    model.replace_covariates(rebuilt)
}

fn raw_covariates(covariates: &[ExplanatoryVariable]) -> Vec<ExplanatoryVariable> {
    covariates
        .iter()
        .map(|covariate| {
            if covariate.is_identity() {
                covariate.clone()
            } else {
                ExplanatoryVariable::from_parts(
                    Variable::new(covariate.name(), reconstruct(covariate)),
                    1.0,
                    0.0,
                )
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{fit_mle, fit_pwm};
    use crate::preprocess::standardize_covariate;
    use approx::assert_relative_eq;

    fn nonstationary_model() -> EvaModel {
        let years: Vec<f64> = (0..40).map(f64::from).collect();
        let maxima: Vec<f64> = years
            .iter()
            .enumerate()
            .map(|(i, &year)| {
                let wiggle = f64::from(i32::try_from(i % 7).unwrap_or(0)) * 0.13;
                0.05f64.mul_add(year, 10.0) + wiggle
            })
            .collect();
        let trend = standardize_covariate(Variable::new("year", years))
            .expect("covariate should standardize");
        EvaModel::block_maxima(
            Variable::new("maxima", maxima),
            Covariates {
                location: vec![trend],
                ..Covariates::default()
            },
        )
        .expect("model should build")
    }

    #[test]
    fn transformed_theta_reproduces_the_linear_predictor() {
        let model = nonstationary_model();
        let theta = vec![10.0, 0.8, -0.5, 0.05];
        let transformed = back_transform_theta(&model, &theta);
        let raw_model = raw_scale_model(&model);

        for row in 0..model.n_observations() {
            let original = model.linked_parameters(&theta, row);
            let rewritten = raw_model.linked_parameters(&transformed, row);
            assert_relative_eq!(original.location, rewritten.location, epsilon = 1.0e-9);
            assert_relative_eq!(original.scale, rewritten.scale, epsilon = 1.0e-9);
            assert_relative_eq!(original.shape, rewritten.shape, epsilon = 1.0e-9);
        }
    }

    #[test]
    fn likelihood_is_invariant_under_the_back_transform() {
        let model = nonstationary_model();
        let fit = fit_mle(&model).expect("fit should converge");
        let transformed = back_transform_mle(&fit);
        assert_relative_eq!(
            fit.loglikelihood(),
            transformed.loglikelihood(),
            epsilon = 1.0e-6
        );
        assert!(transformed
            .model()
            .covariates()
            .location
            .iter()
            .all(ExplanatoryVariable::is_identity));
    }

    #[test]
    fn stationary_vectors_pass_through_unchanged() {
        let model = EvaModel::block_maxima(
            Variable::new("maxima", vec![3.1, 3.4, 2.9, 3.8, 3.2, 3.6, 3.0, 3.5]),
            Covariates::default(),
        )
        .expect("model should build");
        let fit = fit_pwm(&model).expect("fit should succeed");
        let transformed = back_transform_pwm(&fit);
        assert_eq!(fit.theta(), transformed.theta());
    }

    #[test]
    fn slopes_are_rescaled_by_the_covariate_scale() {
        let model = nonstationary_model();
        let scale = model.covariates().location[0].scale();
        let offset = model.covariates().location[0].offset();
        let theta = vec![5.0, 2.0, 0.0, 0.0];
        let transformed = back_transform_theta(&model, &theta);
        assert_relative_eq!(transformed[1], 2.0 / scale, epsilon = 1.0e-12);
        assert_relative_eq!(
            transformed[0],
            5.0 - 2.0 * offset / scale,
            epsilon = 1.0e-12
        );
        // Untouched parameters keep their values.
        assert_relative_eq!(transformed[2], 0.0);
        assert_relative_eq!(transformed[3], 0.0);
    }
}
