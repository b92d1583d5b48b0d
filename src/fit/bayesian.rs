/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Flat-prior Bayesian estimation via random-walk Metropolis sampling.
//
// Created on: 21 Mar 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Bayesian fitter
//!
//! Random-walk Metropolis over the flat parameter vector under an improper
//! flat prior, so the log-posterior is the log-likelihood. The chain starts
//! at the best available point estimate (maximum likelihood, falling back to
//! probability-weighted moments and then to moment seeds), adapts its
//! proposal scale during warmup only, and retains every post-warmup draw
//! whether accepted or not.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use faer::Mat;

use crate::fit::mle::initial_values;
use crate::fit::{
    ConfidenceInterval, FitError, fit_mle, fit_pwm, validate_confidence_level,
    validate_probability,
};
use crate::models::{EvaModel, LinkedParams};
use crate::utils::{sample_mean, usize_to_f64};

/// Sampler iteration controls.
#[derive(Debug, Clone, Copy)]
pub struct McmcOptions {
    /// Total iterations, warmup included.
    pub niter: usize,
    /// Leading iterations dropped before inference.
    pub warmup: usize,
    pub seed: u64,
    /// Whether the proposal scale adapts during warmup.
    pub adapt_during_warmup: bool,
}

impl Default for McmcOptions {
    fn default() -> Self {
        Self {
            niter: 5_000,
            warmup: 2_000,
            seed: 42,
            adapt_during_warmup: true,
        }
    }
}

impl McmcOptions {
    /// # Errors
    ///
    /// Returns `FitError::InvalidIterationBudget` unless `niter > warmup`.
    pub const fn validate(self) -> Result<(), FitError> {
        if self.niter == 0 || self.niter <= self.warmup {
            return Err(FitError::InvalidIterationBudget {
                niter: self.niter,
                warmup: self.warmup,
            });
        }
        Ok(())
    }
}

/// Proposal-scale adaptation controls, applied during warmup only.
#[derive(Debug, Clone, Copy)]
pub struct ProposalTuning {
    pub initial_scale: f64,
    /// Floor below which the scale never shrinks.
    pub min_scale: f64,
    /// Iterations per acceptance-rate review window.
    pub adaptation_interval: usize,
    /// Acceptance rate below which the scale shrinks.
    pub target_low: f64,
    /// Acceptance rate above which the scale grows.
    pub target_high: f64,
    pub shrink_factor: f64,
    pub grow_factor: f64,
}

impl Default for ProposalTuning {
    fn default() -> Self {
        Self {
            initial_scale: 0.1,
            min_scale: 1.0e-4,
            adaptation_interval: 50,
            target_low: 0.2,
            target_high: 0.35,
            shrink_factor: 0.9,
            grow_factor: 1.1,
        }
    }
}

impl ProposalTuning {
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.initial_scale > 0.0
            && self.min_scale > 0.0
            && self.min_scale <= self.initial_scale
            && self.adaptation_interval > 0
            && self.target_low > 0.0
            && self.target_low < self.target_high
            && self.target_high < 1.0
            && self.shrink_factor > 0.0
            && self.shrink_factor < 1.0
            && self.grow_factor > 1.0
    }
}

/// Multi-chain controls; chains differ only by seed.
#[derive(Debug, Clone, Copy)]
pub struct MultiChainOptions {
    pub chains: usize,
    /// Seed offset between consecutive chains.
    pub seed_stride: u64,
}

impl Default for MultiChainOptions {
    fn default() -> Self {
        Self {
            chains: 4,
            seed_stride: 10_000,
        }
    }
}

impl MultiChainOptions {
    /// # Errors
    ///
    /// Returns `FitError` unless at least two chains with a positive seed
    /// stride are requested.
    pub const fn validate(self) -> Result<(), FitError> {
        if self.chains < 2 {
            return Err(FitError::InvalidChainCount {
                min: 2,
                found: self.chains,
            });
        }
        if self.seed_stride == 0 {
            return Err(FitError::InvalidSeedStride);
        }
        Ok(())
    }
}

/// Post-warmup draws of one sampler run, in iteration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    draws: Vec<Vec<f64>>,
}

impl Chain {
    pub(crate) const fn from_draws(draws: Vec<Vec<f64>>) -> Self {
        Self { draws }
    }

    #[must_use]
    pub fn draws(&self) -> &[Vec<f64>] {
        &self.draws
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Draws of a single flat-vector coefficient, in iteration order.
    #[must_use]
    pub fn coefficient_draws(&self, coefficient: usize) -> Vec<f64> {
        self.draws.iter().map(|draw| draw[coefficient]).collect()
    }
}

/// A model fitted by flat-prior random-walk Metropolis sampling.
#[derive(Debug, Clone)]
pub struct BayesianEva {
    model: EvaModel,
    chain: Chain,
}

/// Fit with default iteration and tuning controls.
///
/// # Errors
///
/// Returns `FitError` if sampling cannot start or the retained chain is
/// empty.
pub fn fit_bayesian(model: &EvaModel) -> Result<BayesianEva, FitError> {
    fit_bayesian_with_tuning(model, McmcOptions::default(), ProposalTuning::default())
}

/// Fit with explicit iteration controls and default tuning.
///
/// # Errors
///
/// Returns `FitError` if the options are invalid or sampling fails.
pub fn fit_bayesian_with_options(
    model: &EvaModel,
    options: McmcOptions,
) -> Result<BayesianEva, FitError> {
    fit_bayesian_with_tuning(model, options, ProposalTuning::default())
}

/// Fit with explicit iteration and proposal-tuning controls.
///
/// # Errors
///
/// Returns `FitError` if any control is invalid or sampling fails.
pub fn fit_bayesian_with_tuning(
    model: &EvaModel,
    options: McmcOptions,
    tuning: ProposalTuning,
) -> Result<BayesianEva, FitError> {
    options.validate()?;
    if !tuning.is_valid() {
        return Err(FitError::InvalidProposalTuning);
    }
    let start = starting_point(model);
    let chain = run_chain(model, &start, options, tuning);
    if chain.is_empty() {
        return Err(FitError::EmptyChain);
    }
    Ok(BayesianEva {
        model: model.clone(),
        chain,
    })
}

/// Run several independent chains in parallel, differing only by seed.
/// Returned chains are ordered by seed; feed them to the convergence
/// diagnostics before pooling.
///
/// # Errors
///
/// Returns `FitError` if any control is invalid.
pub fn fit_bayesian_multi_chain(
    model: &EvaModel,
    options: McmcOptions,
    tuning: ProposalTuning,
    multi: MultiChainOptions,
) -> Result<Vec<Chain>, FitError> {
    options.validate()?;
    if !tuning.is_valid() {
        return Err(FitError::InvalidProposalTuning);
    }
    multi.validate()?;

    let start = starting_point(model);
    let chains = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..multi.chains)
            .map(|index| {
                let start = &start;
                let stride = u64::try_from(index).unwrap_or(u64::MAX);
                let chain_options = McmcOptions {
                    seed: options.seed.wrapping_add(multi.seed_stride.wrapping_mul(stride)),
                    ..options
                };
                scope.spawn(move || run_chain(model, start, chain_options, tuning))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(Chain { draws: Vec::new() }))
            .collect::<Vec<_>>()
    });

    if chains.iter().any(Chain::is_empty) {
        return Err(FitError::EmptyChain);
    }
    Ok(chains)
}

impl BayesianEva {
    pub(crate) const fn from_parts(model: EvaModel, chain: Chain) -> Self {
        Self { model, chain }
    }

    #[must_use]
    pub const fn model(&self) -> &EvaModel {
        &self.model
    }

    #[must_use]
    pub const fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Assemble a fitted model from chains sampled elsewhere (pooling
    /// multi-chain output, typically).
    ///
    /// # Errors
    ///
    /// Returns `FitError::EmptyChain` if no draws are supplied.
    pub fn from_chains(model: &EvaModel, chains: &[Chain]) -> Result<Self, FitError> {
        let draws: Vec<Vec<f64>> = chains
            .iter()
            .flat_map(|chain| chain.draws().iter().cloned())
            .collect();
        if draws.is_empty() {
            return Err(FitError::EmptyChain);
        }
        Ok(Self {
            model: model.clone(),
            chain: Chain { draws },
        })
    }

    /// Posterior mode over the retained draws: the draw with the highest
    /// log-posterior (log-likelihood, under the flat prior).
    #[must_use]
    pub fn posterior_mode(&self) -> &[f64] {
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (index, draw) in self.chain.draws.iter().enumerate() {
            let value = self.model.loglikelihood(draw);
            if value > best_value {
                best_value = value;
                best = index;
            }
        }
        &self.chain.draws[best]
    }

    /// Coefficient-wise posterior mean.
    #[must_use]
    pub fn posterior_mean(&self) -> Vec<f64> {
        (0..self.model.parameter_index().total_len())
            .map(|coefficient| sample_mean(&self.chain.coefficient_draws(coefficient)))
            .collect()
    }

    /// Linked distributions per draw; each inner vector holds one entry per
    /// quantile row. Calling again restarts the walk over the chain.
    pub fn linked_distributions(&self) -> impl Iterator<Item = Vec<LinkedParams>> + '_ {
        self.chain
            .draws
            .iter()
            .map(|draw| self.model.linked_rows(draw))
    }

    /// Quantile at `p` per draw and quantile row, as a draws-by-rows matrix.
    ///
    /// # Errors
    ///
    /// Returns `FitError::InvalidProbability` unless `p` lies in `(0, 1)`.
    pub fn quantile(&self, p: f64) -> Result<Mat<f64>, FitError> {
        validate_probability(p)?;
        let family = self.model.family();
        let rows = self.model.quantile_row_count();
        let per_draw: Vec<Vec<f64>> = self
            .linked_distributions()
            .map(|linked| {
                linked
                    .iter()
                    .map(|params| params.quantile(p, family))
                    .collect()
            })
            .collect();
        Ok(Mat::from_fn(per_draw.len(), rows, |draw, row| {
            per_draw[draw][row]
        }))
    }

    /// Highest-posterior-density interval per flat-vector coefficient.
    ///
    /// # Errors
    ///
    /// Returns `FitError` if the level is invalid or too few draws remain to
    /// bound an interval.
    pub fn credible_intervals(&self, level: f64) -> Result<Vec<ConfidenceInterval>, FitError> {
        validate_confidence_level(level)?;
        (0..self.model.parameter_index().total_len())
            .map(|coefficient| {
                let mut draws = self.chain.coefficient_draws(coefficient);
                draws.sort_by(f64::total_cmp);
                hpd_interval(&draws, level)
            })
            .collect()
    }

    /// Sample covariance of the retained draws.
    ///
    /// # Errors
    ///
    /// Returns `FitError::InsufficientChainDraws` with fewer than two draws.
    pub fn parameter_covariance(&self) -> Result<Mat<f64>, FitError> {
        let n = self.chain.len();
        if n < 2 {
            return Err(FitError::InsufficientChainDraws {
                minimum: 2,
                found: n,
            });
        }
        let mean = self.posterior_mean();
        let denominator = usize_to_f64(n - 1);
        let dim = mean.len();
        Ok(Mat::from_fn(dim, dim, |i, j| {
            self.chain
                .draws
                .iter()
                .map(|draw| (draw[i] - mean[i]) * (draw[j] - mean[j]))
                .sum::<f64>()
                / denominator
        }))
    }
}

/// Best available starting point: maximum likelihood, then
/// probability-weighted moments, then moment seeds.
fn starting_point(model: &EvaModel) -> Vec<f64> {
    if let Ok(fit) = fit_mle(model) {
        return fit.theta().to_vec();
    }
    if let Ok(fit) = fit_pwm(model) {
        return fit.theta().to_vec();
    }
    initial_values(model)
}

fn run_chain(
    model: &EvaModel,
    start: &[f64],
    options: McmcOptions,
    tuning: ProposalTuning,
) -> Chain {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut current = start.to_vec();
    let mut current_logpost = model.loglikelihood(&current);
    let mut scale = tuning.initial_scale;
    let mut accepted_in_window = 0usize;
    let mut draws = Vec::with_capacity(options.niter.saturating_sub(options.warmup));

    for iteration in 0..options.niter {
        let proposal: Vec<f64> = current
            .iter()
            .map(|&value| scale.mul_add(sample_standard_normal(&mut rng), value))
            .collect();
        let proposal_logpost = model.loglikelihood(&proposal);

        if should_accept(proposal_logpost - current_logpost, &mut rng) {
            current = proposal;
            current_logpost = proposal_logpost;
            accepted_in_window += 1;
        }

        let warming_up = iteration < options.warmup;
        if warming_up
            && options.adapt_during_warmup
            && (iteration + 1) % tuning.adaptation_interval == 0
        {
            let rate =
                usize_to_f64(accepted_in_window) / usize_to_f64(tuning.adaptation_interval);
            if rate < tuning.target_low {
                scale = (scale * tuning.shrink_factor).max(tuning.min_scale);
            } else if rate > tuning.target_high {
                scale *= tuning.grow_factor;
            }
            accepted_in_window = 0;
        }

        if !warming_up {
            draws.push(current.clone());
        }
    }

    Chain { draws }
}

/// Metropolis acceptance on the log scale. Certain accepts skip the uniform
/// draw so a `+inf - (-inf)` ratio cannot poison the comparison.
fn should_accept(log_ratio: f64, rng: &mut StdRng) -> bool {
    if log_ratio >= 0.0 {
        return true;
    }
    rng.random::<f64>().ln() < log_ratio
}

/// Standard normal draw via the Box–Muller transform.
fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Narrowest interval covering `level` of the sorted draws.
fn hpd_interval(sorted_draws: &[f64], level: f64) -> Result<ConfidenceInterval, FitError> {
    let n = sorted_draws.len();
    if n < 2 {
        return Err(FitError::InsufficientChainDraws {
            minimum: 2,
            found: n,
        });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let window = ((level * usize_to_f64(n)).ceil() as usize).clamp(2, n);

    let mut best = ConfidenceInterval {
        lower: sorted_draws[0],
        upper: sorted_draws[n - 1],
    };
    let mut best_width = best.upper - best.lower;
    for start in 0..=(n - window) {
        let lower = sorted_draws[start];
        let upper = sorted_draws[start + window - 1];
        if upper - lower < best_width {
            best_width = upper - lower;
            best = ConfidenceInterval { lower, upper };
        }
    }
    Ok(best)
}
