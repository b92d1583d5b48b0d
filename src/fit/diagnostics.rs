/////////////////////////////////////////////////////////////////////////////////////////////\
//
// MCMC convergence diagnostics: split R-hat and effective sample size.
//
// Created on: 21 Mar 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Chain diagnostics
//!
//! Split-chain potential scale reduction (R-hat) and autocorrelation-based
//! effective sample size per flat-vector coefficient. Values of R-hat near
//! one and a healthy effective sample size are the usual go/no-go check
//! before pooling chains for inference.

use crate::fit::bayesian::Chain;
use crate::fit::FitError;
use crate::utils::{sample_mean, usize_to_f64};

/// Per-coefficient convergence summary over a set of chains.
#[derive(Debug, Clone)]
pub struct ChainDiagnostics {
    /// Split potential scale reduction per coefficient.
    pub rhat: Vec<f64>,
    /// Pooled effective sample size per coefficient.
    pub effective_sample_size: Vec<f64>,
}

impl ChainDiagnostics {
    /// Whether every coefficient passes the conventional `R-hat < threshold`
    /// check.
    #[must_use]
    pub fn converged(&self, threshold: f64) -> bool {
        self.rhat.iter().all(|&value| value < threshold)
    }
}

/// Diagnose a set of equal-length chains.
///
/// # Errors
///
/// Returns `FitError::InvalidChainCount` with fewer than two chains and
/// `FitError::InsufficientChainDraws` when any chain holds fewer than four
/// draws (the split halves need at least two draws each).
pub fn diagnose_chains(chains: &[Chain]) -> Result<ChainDiagnostics, FitError> {
    if chains.len() < 2 {
        return Err(FitError::InvalidChainCount {
            min: 2,
            found: chains.len(),
        });
    }
    for chain in chains {
        if chain.len() < 4 {
            return Err(FitError::InsufficientChainDraws {
                minimum: 4,
                found: chain.len(),
            });
        }
    }

    let dim = chains[0].draws()[0].len();
    let mut rhat = Vec::with_capacity(dim);
    let mut ess = Vec::with_capacity(dim);
    for coefficient in 0..dim {
        let sequences: Vec<Vec<f64>> = chains
            .iter()
            .map(|chain| chain.coefficient_draws(coefficient))
            .collect();
        rhat.push(split_rhat(&sequences));
        ess.push(
            sequences
                .iter()
                .map(|sequence| effective_sample_size(sequence))
                .sum(),
        );
    }

    Ok(ChainDiagnostics {
        rhat,
        effective_sample_size: ess,
    })
}

/// Split potential scale reduction: each sequence is halved and the halves
/// are compared as separate chains. Returns `f64::NAN` when no sequences are
/// given or any sequence is too short for its halves to carry a variance.
#[must_use]
pub fn split_rhat(sequences: &[Vec<f64>]) -> f64 {
    if sequences.is_empty() || sequences.iter().any(|sequence| sequence.len() < 4) {
        return f64::NAN;
    }
    let halves: Vec<&[f64]> = sequences
        .iter()
        .flat_map(|sequence| {
            let mid = sequence.len() / 2;
            [&sequence[..mid], &sequence[mid..mid * 2]]
        })
        .collect();

    let m = usize_to_f64(halves.len());
    let n = usize_to_f64(halves[0].len());
    let means: Vec<f64> = halves.iter().map(|half| sample_mean(half)).collect();
    let grand_mean = sample_mean(&means);

    let between = n / (m - 1.0)
        * means
            .iter()
            .map(|&mean| (mean - grand_mean).powi(2))
            .sum::<f64>();
    let within = halves
        .iter()
        .zip(&means)
        .map(|(half, &mean)| {
            half.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
        })
        .sum::<f64>()
        / m;

    if within <= 0.0 {
        return f64::INFINITY;
    }
    let pooled = ((n - 1.0) / n).mul_add(within, between / n);
    (pooled / within).sqrt()
}

/// Sample autocorrelation at one lag.
#[must_use]
pub fn autocorrelation(sequence: &[f64], lag: usize) -> f64 {
    let n = sequence.len();
    if lag >= n {
        return 0.0;
    }
    let mean = sample_mean(sequence);
    let variance: f64 = sequence.iter().map(|&x| (x - mean).powi(2)).sum();
    if variance <= 0.0 {
        return 0.0;
    }
    let covariance: f64 = sequence
        .iter()
        .zip(&sequence[lag..])
        .map(|(&early, &late)| (early - mean) * (late - mean))
        .sum();
    covariance / variance
}

/// Effective sample size from the initial positive autocorrelation sequence:
/// lags accumulate until the paired sum of consecutive autocorrelations
/// turns negative.
#[must_use]
pub fn effective_sample_size(sequence: &[f64]) -> f64 {
    let n = sequence.len();
    if n < 2 {
        return usize_to_f64(n);
    }

    let mut correlation_sum = 0.0;
    let mut lag = 1;
    while lag + 1 < n {
        let pair = autocorrelation(sequence, lag) + autocorrelation(sequence, lag + 1);
        if pair <= 0.0 {
            break;
        }
        correlation_sum += pair;
        lag += 2;
    }

    usize_to_f64(n) / 2.0f64.mul_add(correlation_sum, 1.0)
}
