/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Return-level estimation with strategy-matched uncertainty intervals.
//
// Created on: 21 Mar 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Return levels
//!
//! The `T`-observation return level is the quantile exceeded once every `T`
//! blocks on average. Block-maxima fits evaluate the GEV quantile at
//! `1 - 1/T`; threshold-exceedance fits rescale the return period by the
//! observation frequency and the empirical exceedance rate, then shift the
//! GPD quantile back above the threshold. Interval estimation follows the
//! fitting strategy: delta-method Wald intervals for maximum likelihood,
//! posterior percentiles for Bayesian fits, bootstrap percentiles for
//! probability-weighted moments.

use thiserror::Error;

use crate::fit::{
    BootstrapOptions, ConfidenceInterval, FitError, FittedEva, validate_confidence_level,
    validate_probability, wald_interval,
};
use crate::models::{EvaModel, ModelFamily};
use crate::utils::{percentile, usize_to_f64};

/// Errors raised by return-level estimation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReturnLevelError {
    #[error("return period ({t}) must be a finite value greater than one")]
    InvalidReturnPeriod { t: f64 },
    #[error("{operation} requires a {expected} fit")]
    FamilyMismatch {
        operation: &'static str,
        expected: &'static str,
    },
    #[error(
        "threshold context is invalid: the total observation count must cover \
         the exceedances and the block size must be positive"
    )]
    InvalidThresholdContext,
    #[error(transparent)]
    Fit(#[from] FitError),
}

/// Observation context for threshold-exceedance return levels.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdContext {
    /// Threshold the exceedances were shifted by.
    pub threshold: f64,
    /// Total number of observations in the original series, exceedances and
    /// non-exceedances alike.
    pub nobservation: usize,
    /// Observations per block (365 for daily data and annual return periods).
    pub nobsperblock: usize,
}

impl ThresholdContext {
    fn validate(self, n_exceedances: usize) -> Result<(), ReturnLevelError> {
        if !self.threshold.is_finite()
            || self.nobsperblock == 0
            || self.nobservation < n_exceedances
            || n_exceedances == 0
        {
            return Err(ReturnLevelError::InvalidThresholdContext);
        }
        Ok(())
    }

    /// Empirical exceedance rate `zeta`.
    fn exceedance_rate(self, n_exceedances: usize) -> f64 {
        usize_to_f64(n_exceedances) / usize_to_f64(self.nobservation)
    }
}

/// Return-level estimates, one per quantile row of the underlying model.
#[derive(Debug, Clone)]
pub struct ReturnLevel {
    pub return_period: f64,
    pub estimates: Vec<f64>,
}

/// Block-maxima return level: the GEV quantile at `1 - 1/T`.
///
/// # Errors
///
/// Returns `ReturnLevelError` if the fit is not a block-maxima model or the
/// return period is not a finite value above one.
pub fn return_level(fit: &FittedEva, return_period: f64) -> Result<ReturnLevel, ReturnLevelError> {
    require_family(fit.model(), ModelFamily::BlockMaxima, "return_level")?;
    let probability = block_maxima_probability(return_period)?;
    Ok(ReturnLevel {
        return_period,
        estimates: point_estimates(fit, probability, 0.0)?,
    })
}

/// Threshold-exceedance return level: the threshold plus the GPD quantile at
/// `1 - 1 / (T * nobsperblock * zeta)`.
///
/// # Errors
///
/// Returns `ReturnLevelError` if the fit is not a threshold-exceedance
/// model, the context is inconsistent, or the effective exceedance
/// probability leaves `(0, 1)`.
pub fn threshold_return_level(
    fit: &FittedEva,
    context: ThresholdContext,
    return_period: f64,
) -> Result<ReturnLevel, ReturnLevelError> {
    require_family(
        fit.model(),
        ModelFamily::ThresholdExceedance,
        "threshold_return_level",
    )?;
    let probability = threshold_probability(fit.model(), context, return_period)?;
    Ok(ReturnLevel {
        return_period,
        estimates: point_estimates(fit, probability, context.threshold)?,
    })
}

/// Interval estimates matching [`return_level`], one per quantile row.
///
/// # Errors
///
/// Returns `ReturnLevelError` on the same conditions as [`return_level`],
/// plus any failure of the strategy's uncertainty machinery (a singular
/// information matrix, an exhausted bootstrap budget).
pub fn return_level_intervals(
    fit: &FittedEva,
    return_period: f64,
    level: f64,
) -> Result<Vec<ConfidenceInterval>, ReturnLevelError> {
    require_family(fit.model(), ModelFamily::BlockMaxima, "return_level")?;
    let probability = block_maxima_probability(return_period)?;
    intervals(fit, probability, 0.0, level)
}

/// Interval estimates matching [`threshold_return_level`].
///
/// # Errors
///
/// Returns `ReturnLevelError` on the same conditions as
/// [`threshold_return_level`] plus uncertainty-machinery failures.
pub fn threshold_return_level_intervals(
    fit: &FittedEva,
    context: ThresholdContext,
    return_period: f64,
    level: f64,
) -> Result<Vec<ConfidenceInterval>, ReturnLevelError> {
    require_family(
        fit.model(),
        ModelFamily::ThresholdExceedance,
        "threshold_return_level",
    )?;
    let probability = threshold_probability(fit.model(), context, return_period)?;
    intervals(fit, probability, context.threshold, level)
}

fn require_family(
    model: &EvaModel,
    expected: ModelFamily,
    operation: &'static str,
) -> Result<(), ReturnLevelError> {
    if model.family() == expected {
        Ok(())
    } else {
        Err(ReturnLevelError::FamilyMismatch {
            operation,
            expected: expected.label(),
        })
    }
}

fn block_maxima_probability(return_period: f64) -> Result<f64, ReturnLevelError> {
    if !(return_period.is_finite() && return_period > 1.0) {
        return Err(ReturnLevelError::InvalidReturnPeriod { t: return_period });
    }
    Ok(1.0 - 1.0 / return_period)
}

fn threshold_probability(
    model: &EvaModel,
    context: ThresholdContext,
    return_period: f64,
) -> Result<f64, ReturnLevelError> {
    if !(return_period.is_finite() && return_period > 0.0) {
        return Err(ReturnLevelError::InvalidReturnPeriod { t: return_period });
    }
    context.validate(model.n_observations())?;
    let zeta = context.exceedance_rate(model.n_observations());
    let probability =
        1.0 - 1.0 / (return_period * usize_to_f64(context.nobsperblock) * zeta);
    validate_probability(probability).map_err(ReturnLevelError::from)?;
    Ok(probability)
}

/// Return levels per quantile row for one parameter vector.
fn levels_for_theta(model: &EvaModel, theta: &[f64], probability: f64, shift: f64) -> Vec<f64> {
    model
        .linked_rows(theta)
        .iter()
        .map(|params| shift + params.quantile(probability, model.family()))
        .collect()
}

fn point_estimates(
    fit: &FittedEva,
    probability: f64,
    shift: f64,
) -> Result<Vec<f64>, ReturnLevelError> {
    match fit {
        FittedEva::MaximumLikelihood(fit) => {
            Ok(levels_for_theta(fit.model(), fit.theta(), probability, shift))
        }
        FittedEva::Pwm(fit) => Ok(levels_for_theta(fit.model(), fit.theta(), probability, shift)),
        FittedEva::Bayesian(fit) => {
            // Posterior mean of the per-draw return levels.
            let draws = fit.chain().draws();
            if draws.is_empty() {
                return Err(ReturnLevelError::Fit(FitError::EmptyChain));
            }
            let model = fit.model();
            let mut totals = vec![0.0; model.quantile_row_count()];
            for draw in draws {
                let levels = levels_for_theta(model, draw, probability, shift);
                for (total, level) in totals.iter_mut().zip(levels) {
                    *total += level;
                }
            }
            let denominator = usize_to_f64(draws.len());
            Ok(totals.into_iter().map(|total| total / denominator).collect())
        }
    }
}

fn intervals(
    fit: &FittedEva,
    probability: f64,
    shift: f64,
    level: f64,
) -> Result<Vec<ConfidenceInterval>, ReturnLevelError> {
    validate_confidence_level(level).map_err(ReturnLevelError::from)?;
    match fit {
        FittedEva::MaximumLikelihood(fit) => {
            let covariance = fit.parameter_covariance()?;
            let model = fit.model();
            let theta = fit.theta();
            let estimates = levels_for_theta(model, theta, probability, shift);
            let gradients = return_level_gradients(model, theta, probability, shift);

            Ok(estimates
                .iter()
                .zip(&gradients)
                .map(|(&estimate, gradient)| {
                    let mut variance = 0.0;
                    for (i, &gi) in gradient.iter().enumerate() {
                        for (j, &gj) in gradient.iter().enumerate() {
                            variance = gi.mul_add(covariance[(i, j)] * gj, variance);
                        }
                    }
                    wald_interval(estimate, variance, level)
                })
                .collect())
        }
        FittedEva::Pwm(fit) => {
            let thetas = fit.bootstrap_thetas(BootstrapOptions::default())?;
            let model = fit.model();
            percentile_intervals(
                thetas
                    .iter()
                    .map(|theta| levels_for_theta(model, theta, probability, shift))
                    .collect(),
                model.quantile_row_count(),
                level,
            )
        }
        FittedEva::Bayesian(fit) => {
            let model = fit.model();
            percentile_intervals(
                fit.chain()
                    .draws()
                    .iter()
                    .map(|draw| levels_for_theta(model, draw, probability, shift))
                    .collect(),
                model.quantile_row_count(),
                level,
            )
        }
    }
}

/// Central-difference gradient of the return level per quantile row.
fn return_level_gradients(
    model: &EvaModel,
    theta: &[f64],
    probability: f64,
    shift: f64,
) -> Vec<Vec<f64>> {
    let rows = model.quantile_row_count();
    let mut gradients = vec![vec![0.0; theta.len()]; rows];
    for coefficient in 0..theta.len() {
        let h = 1.0e-5 * theta[coefficient].abs().max(1.0);
        let mut forward = theta.to_vec();
        forward[coefficient] += h;
        let mut backward = theta.to_vec();
        backward[coefficient] -= h;
        let up = levels_for_theta(model, &forward, probability, shift);
        let down = levels_for_theta(model, &backward, probability, shift);
        for row in 0..rows {
            gradients[row][coefficient] = (up[row] - down[row]) / (2.0 * h);
        }
    }
    gradients
}

/// Equal-tailed percentile intervals over per-draw return levels.
fn percentile_intervals(
    per_draw: Vec<Vec<f64>>,
    rows: usize,
    level: f64,
) -> Result<Vec<ConfidenceInterval>, ReturnLevelError> {
    if per_draw.is_empty() {
        return Err(ReturnLevelError::Fit(FitError::EmptyChain));
    }
    let lower_p = 0.5 * (1.0 - level);
    let upper_p = 1.0 - lower_p;
    Ok((0..rows)
        .map(|row| {
            let mut draws: Vec<f64> = per_draw.iter().map(|levels| levels[row]).collect();
            draws.sort_by(f64::total_cmp);
            ConfidenceInterval {
                lower: percentile(&draws, lower_p),
                upper: percentile(&draws, upper_p),
            }
        })
        .collect())
}
