//! # Fitting strategies
//!
//! Three independent estimators over the shared flat parameter vector:
//! maximum likelihood ([`mle`]), probability-weighted moments ([`pwm`]), and
//! flat-prior random-walk Metropolis sampling ([`bayesian`]). Fitted results
//! share the [`FittedEva`] tagged variant so downstream consumers (return
//! levels, summaries) stay agnostic to the producing strategy.

use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::input::InputError;
use crate::models::EvaModel;

pub mod bayesian;
pub mod diagnostics;
pub mod mle;
pub mod pwm;
pub mod transform;

pub use bayesian::{
    BayesianEva, Chain, McmcOptions, MultiChainOptions, ProposalTuning, fit_bayesian,
    fit_bayesian_multi_chain, fit_bayesian_with_options, fit_bayesian_with_tuning,
};
pub use diagnostics::{ChainDiagnostics, diagnose_chains};
pub use mle::{MaximumLikelihoodEva, MleOptions, fit_mle, fit_mle_with_options};
pub use pwm::{BootstrapOptions, PwmEva, fit_pwm};
pub use transform::{back_transform, back_transform_bayesian, back_transform_mle, back_transform_pwm};

/// Default confidence/credible level used throughout the crate.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Errors returned by fitting, uncertainty estimation, and chain queries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error(transparent)]
    InvalidInput(#[from] InputError),
    #[error("probability weighted moments require a stationary model")]
    NonStationaryModel,
    #[error("iteration count ({niter}) must exceed warmup ({warmup})")]
    InvalidIterationBudget { niter: usize, warmup: usize },
    #[error("probability ({p}) must lie strictly inside (0, 1)")]
    InvalidProbability { p: f64 },
    #[error("confidence level ({level}) must lie strictly inside (0, 1)")]
    InvalidConfidenceLevel { level: f64 },
    #[error("invalid optimizer options")]
    InvalidOptimizerOptions,
    #[error("invalid proposal tuning configuration")]
    InvalidProposalTuning,
    #[error("optimizer did not converge within its iteration budget")]
    NonConvergence,
    #[error("observed-information matrix is not invertible")]
    SingularInformation,
    #[error("posterior chain holds no draws")]
    EmptyChain,
    #[error("multi-chain sampling requires at least {min} chains; found {found}")]
    InvalidChainCount { min: usize, found: usize },
    #[error("multi-chain seed stride must be positive")]
    InvalidSeedStride,
    #[error("each chain must retain at least {minimum} draws; found {found}")]
    InsufficientChainDraws { minimum: usize, found: usize },
    #[error("bootstrap iteration count must be positive")]
    InvalidBootstrapIterations,
    #[error("too many bootstrap refits failed ({0})")]
    TooManyBootstrapFailures(usize),
}

/// A two-sided interval estimate; `lower < upper` for any valid fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// A fitted extreme-value model, tagged by its estimation strategy.
#[derive(Debug, Clone)]
pub enum FittedEva {
    MaximumLikelihood(MaximumLikelihoodEva),
    Pwm(PwmEva),
    Bayesian(BayesianEva),
}

impl FittedEva {
    #[must_use]
    pub fn model(&self) -> &EvaModel {
        match self {
            Self::MaximumLikelihood(fit) => fit.model(),
            Self::Pwm(fit) => fit.model(),
            Self::Bayesian(fit) => fit.model(),
        }
    }

    #[must_use]
    pub const fn strategy_label(&self) -> &'static str {
        match self {
            Self::MaximumLikelihood(_) => "maximum likelihood",
            Self::Pwm(_) => "probability-weighted moments",
            Self::Bayesian(_) => "Bayesian MCMC",
        }
    }
}

impl From<MaximumLikelihoodEva> for FittedEva {
    fn from(fit: MaximumLikelihoodEva) -> Self {
        Self::MaximumLikelihood(fit)
    }
}

impl From<PwmEva> for FittedEva {
    fn from(fit: PwmEva) -> Self {
        Self::Pwm(fit)
    }
}

impl From<BayesianEva> for FittedEva {
    fn from(fit: BayesianEva) -> Self {
        Self::Bayesian(fit)
    }
}

pub(crate) fn validate_probability(p: f64) -> Result<(), FitError> {
    if !(p.is_finite() && p > 0.0 && p < 1.0) {
        return Err(FitError::InvalidProbability { p });
    }
    Ok(())
}

pub(crate) fn validate_confidence_level(level: f64) -> Result<(), FitError> {
    if !(level.is_finite() && level > 0.0 && level < 1.0) {
        return Err(FitError::InvalidConfidenceLevel { level });
    }
    Ok(())
}

pub(crate) fn normal_quantile(p: f64) -> f64 {
    Normal::new(0.0, 1.0).map_or(f64::NAN, |normal| normal.inverse_cdf(p))
}

/// Wald interval `estimate ± z * se` at the given confidence level.
#[must_use]
pub(crate) fn wald_interval(estimate: f64, variance: f64, level: f64) -> ConfidenceInterval {
    let z = normal_quantile(0.5f64.mul_add(level, 0.5));
    let half_width = z * variance.max(0.0).sqrt();
    ConfidenceInterval {
        lower: estimate - half_width,
        upper: estimate + half_width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn probability_validation_rejects_boundaries() {
        assert!(validate_probability(0.5).is_ok());
        for p in [-1.0, 0.0, 1.0, 1.5, f64::NAN] {
            assert!(matches!(
                validate_probability(p),
                Err(FitError::InvalidProbability { .. })
            ));
        }
    }

    #[test]
    fn confidence_level_validation_rejects_out_of_range_values() {
        assert!(validate_confidence_level(0.95).is_ok());
        for level in [1.95, -1.95, 0.0, 1.0] {
            assert!(matches!(
                validate_confidence_level(level),
                Err(FitError::InvalidConfidenceLevel { .. })
            ));
        }
    }

    #[test]
    fn wald_interval_is_symmetric_and_ordered() {
        let interval = wald_interval(3.0, 4.0, 0.95);
        assert!(interval.lower < interval.upper);
        assert_relative_eq!(
            interval.upper - 3.0,
            3.0 - interval.lower,
            epsilon = 1.0e-12
        );
        // z(0.975) * 2 on either side.
        assert_relative_eq!(interval.upper - interval.lower, 2.0 * 1.959_964 * 2.0, epsilon = 1.0e-4);
    }
}
