#![forbid(unsafe_code)]

//! # `extreme_value_models`
//!
//! Extreme-value inference for block maxima (GEV) and threshold exceedances
//! (GPD): maximum-likelihood, probability-weighted-moment, and Bayesian
//! fitting over a shared flat parameter vector, with optional linear
//! covariates on every distribution parameter and return-level estimation
//! with strategy-matched uncertainty intervals.
//!
//! The crate was initially developed for sea-level and rainfall extremes,
//! but the API is intentionally domain-agnostic and can be reused in other
//! settings.

pub mod fit;
pub mod input;
pub mod models;
pub mod preprocess;
pub mod returnlevel;
pub mod summary;
pub mod utils;

pub use input::{ExplanatoryVariable, InputError, Variable};
pub use models::{
    Covariates, DistributionParameter, EvaModel, LinkedParams, ModelFamily, ParameterIndex,
    ParameterSlice,
};
pub use preprocess::{reconstruct, standardize_covariate};

pub use fit::{
    BayesianEva, BootstrapOptions, Chain, ChainDiagnostics, ConfidenceInterval,
    DEFAULT_CONFIDENCE_LEVEL, FitError, FittedEva, MaximumLikelihoodEva, McmcOptions, MleOptions,
    MultiChainOptions, ProposalTuning, PwmEva, back_transform, back_transform_bayesian,
    back_transform_mle, back_transform_pwm, diagnose_chains, fit_bayesian,
    fit_bayesian_multi_chain, fit_bayesian_with_options, fit_bayesian_with_tuning, fit_mle,
    fit_mle_with_options, fit_pwm,
};

pub use returnlevel::{
    ReturnLevel, ReturnLevelError, ThresholdContext, return_level, return_level_intervals,
    threshold_return_level, threshold_return_level_intervals,
};

pub use summary::{
    FitSummary, ParameterSummary, render_fit_table, render_return_level_table,
    summarize_bayesian, summarize_mle, summarize_pwm,
};
