/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Fit summaries: coefficient tables, information criteria, rendering.
//
// Created on: 21 Mar 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Fit summaries
//!
//! Strategy-specific summaries flattened into one table shape: a labeled
//! estimate, uncertainty, and interval per flat-vector coefficient, plus
//! log-likelihood and information criteria for the fit as a whole.

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use crate::fit::{
    BayesianEva, BootstrapOptions, ConfidenceInterval, FitError, MaximumLikelihoodEva, PwmEva,
    validate_confidence_level,
};
use crate::returnlevel::ReturnLevel;
use crate::utils::{sample_std, usize_to_f64};

/// One coefficient of a fitted model.
#[derive(Debug, Clone)]
pub struct ParameterSummary {
    pub label: String,
    pub estimate: f64,
    pub standard_error: f64,
    pub interval: ConfidenceInterval,
}

/// A whole-fit summary, uniform across fitting strategies.
#[derive(Debug, Clone)]
pub struct FitSummary {
    pub strategy: &'static str,
    pub family: &'static str,
    pub n_observations: usize,
    pub loglikelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub level: f64,
    pub parameters: Vec<ParameterSummary>,
}

/// Summarize a maximum-likelihood fit with Wald intervals.
///
/// # Errors
///
/// Returns `FitError` if the level is invalid or the observed-information
/// matrix is singular.
pub fn summarize_mle(fit: &MaximumLikelihoodEva, level: f64) -> Result<FitSummary, FitError> {
    validate_confidence_level(level)?;
    let covariance = fit.parameter_covariance()?;
    let intervals = fit.confidence_intervals(level)?;
    let labels = fit.model().coefficient_labels();

    let parameters = labels
        .into_iter()
        .zip(fit.theta().iter().copied())
        .zip(intervals)
        .enumerate()
        .map(|(index, ((label, estimate), interval))| ParameterSummary {
            label,
            estimate,
            standard_error: covariance[(index, index)].max(0.0).sqrt(),
            interval,
        })
        .collect();

    Ok(assemble(
        "maximum likelihood",
        fit.model().family().label(),
        fit.model().n_observations(),
        fit.loglikelihood(),
        level,
        parameters,
    ))
}

/// Summarize a probability-weighted-moment fit with bootstrap uncertainty.
///
/// # Errors
///
/// Returns `FitError` if the level or bootstrap options are invalid, or too
/// many resample refits fail.
pub fn summarize_pwm(
    fit: &PwmEva,
    level: f64,
    options: BootstrapOptions,
) -> Result<FitSummary, FitError> {
    validate_confidence_level(level)?;
    let intervals = fit.confidence_intervals(level, options)?;
    let thetas = fit.bootstrap_thetas(options)?;
    let labels = fit.model().coefficient_labels();

    let parameters = labels
        .into_iter()
        .zip(fit.theta().iter().copied())
        .zip(intervals)
        .enumerate()
        .map(|(index, ((label, estimate), interval))| {
            let draws: Vec<f64> = thetas.iter().map(|theta| theta[index]).collect();
            ParameterSummary {
                label,
                estimate,
                standard_error: sample_std(&draws),
                interval,
            }
        })
        .collect();

    Ok(assemble(
        "probability-weighted moments",
        fit.model().family().label(),
        fit.model().n_observations(),
        fit.loglikelihood(),
        level,
        parameters,
    ))
}

/// Summarize a Bayesian fit: posterior-mode estimates, posterior standard
/// deviations, and highest-posterior-density intervals.
///
/// # Errors
///
/// Returns `FitError` if the level is invalid or the chain is too short.
pub fn summarize_bayesian(fit: &BayesianEva, level: f64) -> Result<FitSummary, FitError> {
    validate_confidence_level(level)?;
    let intervals = fit.credible_intervals(level)?;
    let mode = fit.posterior_mode().to_vec();
    let labels = fit.model().coefficient_labels();

    let parameters = labels
        .into_iter()
        .zip(mode.iter().copied())
        .zip(intervals)
        .enumerate()
        .map(|(index, ((label, estimate), interval))| ParameterSummary {
            label,
            estimate,
            standard_error: sample_std(&fit.chain().coefficient_draws(index)),
            interval,
        })
        .collect();

    Ok(assemble(
        "Bayesian MCMC",
        fit.model().family().label(),
        fit.model().n_observations(),
        fit.model().loglikelihood(&mode),
        level,
        parameters,
    ))
}

fn assemble(
    strategy: &'static str,
    family: &'static str,
    n_observations: usize,
    loglikelihood: f64,
    level: f64,
    parameters: Vec<ParameterSummary>,
) -> FitSummary {
    let k = usize_to_f64(parameters.len());
    let n = usize_to_f64(n_observations);
    FitSummary {
        strategy,
        family,
        n_observations,
        loglikelihood,
        aic: 2.0f64.mul_add(k, -2.0 * loglikelihood),
        bic: n.ln().mul_add(k, -2.0 * loglikelihood),
        level,
        parameters,
    }
}

/// Render a coefficient table for terminal display.
#[must_use]
pub fn render_fit_table(summary: &FitSummary) -> Table {
    let mut table = make_table(&["parameter", "estimate", "std. error", "lower", "upper"]);
    for parameter in &summary.parameters {
        table.add_row(vec![
            Cell::new(&parameter.label),
            Cell::new(format!("{:.6}", parameter.estimate)),
            Cell::new(format!("{:.6}", parameter.standard_error)),
            Cell::new(format!("{:.6}", parameter.interval.lower)),
            Cell::new(format!("{:.6}", parameter.interval.upper)),
        ]);
    }
    table
}

/// Render return-level estimates, optionally with matching intervals.
#[must_use]
pub fn render_return_level_table(
    level: &ReturnLevel,
    intervals: Option<&[ConfidenceInterval]>,
) -> Table {
    let mut table = make_table(&["row", "return period", "level", "lower", "upper"]);
    for (row, &estimate) in level.estimates.iter().enumerate() {
        let interval = intervals.and_then(|intervals| intervals.get(row));
        table.add_row(vec![
            Cell::new(row.to_string()),
            Cell::new(format!("{:.1}", level.return_period)),
            Cell::new(format!("{estimate:.6}")),
            Cell::new(interval.map_or_else(String::new, |i| format!("{:.6}", i.lower))),
            Cell::new(interval.map_or_else(String::new, |i| format!("{:.6}", i.upper))),
        ]);
    }
    table
}

fn make_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(*h)).collect::<Vec<_>>());
    table
}
