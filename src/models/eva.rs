/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Extreme-value model definition: response, covariate structure, likelihood.
//
// Created on: 21 Mar 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Extreme-value models
//!
//! [`EvaModel`] couples a response series with per-parameter covariate lists
//! and the flat-vector [`ParameterIndex`]. Block-maxima models link a GEV
//! distribution, threshold-exceedance models a GPD; the log-scale link
//! `scale = exp(eta)` enforces positivity for every parameter vector an
//! optimizer or sampler may probe.

use crate::input::{ExplanatoryVariable, InputError, Variable};
use crate::models::evd::{gev_logpdf, gev_quantile, gpd_logpdf, gpd_quantile};
use crate::models::parameters::{DistributionParameter, ParameterIndex, ParameterSlice};

/// Distribution family implied by the sampling scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Maxima over fixed-length blocks, modeled by the GEV distribution.
    BlockMaxima,
    /// Exceedances above a threshold (shifted to zero), modeled by the GPD.
    ThresholdExceedance,
}

impl ModelFamily {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BlockMaxima => "block maxima (GEV)",
            Self::ThresholdExceedance => "threshold exceedance (GPD)",
        }
    }
}

/// Per-parameter covariate lists; empty lists mean a stationary parameter.
#[derive(Debug, Clone, Default)]
pub struct Covariates {
    pub location: Vec<ExplanatoryVariable>,
    pub log_scale: Vec<ExplanatoryVariable>,
    pub shape: Vec<ExplanatoryVariable>,
}

impl Covariates {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.location.is_empty() && self.log_scale.is_empty() && self.shape.is_empty()
    }
}

/// Distribution parameters linked at one covariate row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkedParams {
    /// Location; fixed at zero for threshold-exceedance models.
    pub location: f64,
    /// Scale, always positive via the log link.
    pub scale: f64,
    pub shape: f64,
}

impl LinkedParams {
    /// Quantile of the linked distribution at probability `p` (validated by
    /// the caller).
    #[must_use]
    pub fn quantile(&self, p: f64, family: ModelFamily) -> f64 {
        match family {
            ModelFamily::BlockMaxima => gev_quantile(p, self.location, self.scale, self.shape),
            ModelFamily::ThresholdExceedance => gpd_quantile(p, self.scale, self.shape),
        }
    }
}

/// An extreme-value model: response data, covariate structure, and the flat
/// parameter-vector layout. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct EvaModel {
    family: ModelFamily,
    data: Variable,
    covariates: Covariates,
    index: ParameterIndex,
}

impl EvaModel {
    /// Build a block-maxima (GEV) model.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if the response is empty or non-finite, or any
    /// covariate length differs from the response length.
    pub fn block_maxima(data: Variable, covariates: Covariates) -> Result<Self, InputError> {
        validate(&data, &covariates)?;
        let index = ParameterIndex::new(
            Some(covariates.location.len()),
            covariates.log_scale.len(),
            covariates.shape.len(),
        );
        Ok(Self {
            family: ModelFamily::BlockMaxima,
            data,
            covariates,
            index,
        })
    }

    /// Build a threshold-exceedance (GPD) model over exceedances shifted to
    /// start at zero.
    ///
    /// # Errors
    ///
    /// Returns `InputError` if validation fails or location covariates are
    /// supplied (the GPD has no location parameter).
    pub fn threshold_exceedance(
        exceedances: Variable,
        covariates: Covariates,
    ) -> Result<Self, InputError> {
        if !covariates.location.is_empty() {
            return Err(InputError::LocationCovariatesUnsupported);
        }
        validate(&exceedances, &covariates)?;
        let index =
            ParameterIndex::new(None, covariates.log_scale.len(), covariates.shape.len());
        Ok(Self {
            family: ModelFamily::ThresholdExceedance,
            data: exceedances,
            covariates,
            index,
        })
    }

    #[must_use]
    pub const fn family(&self) -> ModelFamily {
        self.family
    }

    #[must_use]
    pub const fn data(&self) -> &Variable {
        &self.data
    }

    #[must_use]
    pub const fn covariates(&self) -> &Covariates {
        &self.covariates
    }

    #[must_use]
    pub const fn parameter_index(&self) -> &ParameterIndex {
        &self.index
    }

    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.data.len()
    }

    /// Whether every distribution parameter is covariate-free.
    #[must_use]
    pub fn is_stationary(&self) -> bool {
        self.covariates.is_empty()
    }

    /// Number of distinct quantile rows: one for stationary models, one per
    /// observation otherwise.
    #[must_use]
    pub fn quantile_row_count(&self) -> usize {
        if self.is_stationary() {
            1
        } else {
            self.n_observations()
        }
    }

    /// Link the flat vector to distribution parameters at one covariate row.
    #[must_use]
    pub fn linked_parameters(&self, theta: &[f64], row: usize) -> LinkedParams {
        debug_assert_eq!(theta.len(), self.index.total_len());
        let location = self
            .index
            .slice(DistributionParameter::Location)
            .map_or(0.0, |slice| {
                linear_term(theta, slice, &self.covariates.location, row)
            });
        let log_scale = self
            .index
            .slice(DistributionParameter::LogScale)
            .map_or(0.0, |slice| {
                linear_term(theta, slice, &self.covariates.log_scale, row)
            });
        let shape = self
            .index
            .slice(DistributionParameter::Shape)
            .map_or(0.0, |slice| {
                linear_term(theta, slice, &self.covariates.shape, row)
            });

        LinkedParams {
            location,
            scale: log_scale.exp(),
            shape,
        }
    }

    /// Linked distributions for every quantile row under one parameter vector.
    #[must_use]
    pub fn linked_rows(&self, theta: &[f64]) -> Vec<LinkedParams> {
        (0..self.quantile_row_count())
            .map(|row| self.linked_parameters(theta, row))
            .collect()
    }

    /// Log-likelihood of the data under the flat parameter vector.
    ///
    /// Returns `f64::NEG_INFINITY` whenever any observation falls outside the
    /// support implied by its linked parameters; this guides optimizers and
    /// samplers and is never an error.
    #[must_use]
    pub fn loglikelihood(&self, theta: &[f64]) -> f64 {
        let mut total = 0.0;
        for (row, &x) in self.data.values().iter().enumerate() {
            let params = self.linked_parameters(theta, row);
            let contribution = match self.family {
                ModelFamily::BlockMaxima => {
                    gev_logpdf(x, params.location, params.scale, params.shape)
                }
                ModelFamily::ThresholdExceedance => gpd_logpdf(x, params.scale, params.shape),
            };
            if !contribution.is_finite() {
                return f64::NEG_INFINITY;
            }
            total += contribution;
        }
        total
    }

    /// Human-readable label per flat-vector coefficient, in layout order.
    #[must_use]
    pub fn coefficient_labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.index.total_len());
        for (parameter, _) in self.index.parameters() {
            labels.push(parameter.label().to_owned());
            for covariate in self.covariate_list(parameter) {
                labels.push(format!("{}: {}", parameter.label(), covariate.name()));
            }
        }
        labels
    }

    #[must_use]
    pub(crate) fn covariate_list(
        &self,
        parameter: DistributionParameter,
    ) -> &[ExplanatoryVariable] {
        match parameter {
            DistributionParameter::Location => &self.covariates.location,
            DistributionParameter::LogScale => &self.covariates.log_scale,
            DistributionParameter::Shape => &self.covariates.shape,
        }
    }

    /// Rebuild the model with replacement covariates of identical shape.
    /// Used by the back-transform to swap standardized covariates for raw
    /// ones without touching the layout.
    #[must_use]
    pub(crate) fn replace_covariates(&self, covariates: Covariates) -> Self {
        debug_assert_eq!(covariates.location.len(), self.covariates.location.len());
        debug_assert_eq!(covariates.log_scale.len(), self.covariates.log_scale.len());
        debug_assert_eq!(covariates.shape.len(), self.covariates.shape.len());
        Self {
            family: self.family,
            data: self.data.clone(),
            covariates,
            index: self.index.clone(),
        }
    }
}

fn linear_term(
    theta: &[f64],
    slice: ParameterSlice,
    covariates: &[ExplanatoryVariable],
    row: usize,
) -> f64 {
    let mut value = theta[slice.start];
    for (offset, covariate) in covariates.iter().enumerate() {
        let coefficient = theta[slice.start + 1 + offset];
        let x = covariate.values().get(row).copied().unwrap_or(0.0);
        value = coefficient.mul_add(x, value);
    }
    value
}

fn validate(data: &Variable, covariates: &Covariates) -> Result<(), InputError> {
    if data.is_empty() {
        return Err(InputError::EmptyResponse);
    }
    if data.values().iter().any(|value| !value.is_finite()) {
        return Err(InputError::NonFiniteResponse);
    }

    let expected = data.len();
    for covariate in covariates
        .location
        .iter()
        .chain(&covariates.log_scale)
        .chain(&covariates.shape)
    {
        if covariate.len() != expected {
            return Err(InputError::CovariateLengthMismatch {
                name: covariate.name().to_owned(),
                len: covariate.len(),
                expected,
            });
        }
    }
    Ok(())
}
