//! # Covariate preprocessing
//!
//! Standardizes covariates to zero mean and unit standard deviation and
//! records the exact inverse transform. Round-tripping through
//! [`reconstruct`] recovers the raw values to floating-point precision.

use crate::input::{ExplanatoryVariable, InputError, Variable};
use crate::utils::{sample_mean, sample_std};

const STANDARDIZED_TOLERANCE: f64 = 1.0e-10;

/// Standardize a raw covariate: `standardized = (raw - mean) / sd`.
///
/// A covariate already at zero mean and unit standard deviation is kept as-is
/// with an identity transform record. A constant covariate has no usable
/// scale and is rejected.
///
/// # Errors
///
/// Returns `InputError::DegenerateCovariate` if all values are identical and
/// `InputError::NonFiniteCovariate` if any value is not finite.
pub fn standardize_covariate(variable: Variable) -> Result<ExplanatoryVariable, InputError> {
    if variable.values().iter().any(|value| !value.is_finite()) {
        return Err(InputError::NonFiniteCovariate {
            name: variable.name().to_owned(),
        });
    }

    let offset = sample_mean(variable.values());
    let scale = sample_std(variable.values());

    if scale == 0.0 {
        return Err(InputError::DegenerateCovariate {
            name: variable.name().to_owned(),
        });
    }

    if offset.abs() < STANDARDIZED_TOLERANCE && (scale - 1.0).abs() < STANDARDIZED_TOLERANCE {
        return Ok(ExplanatoryVariable::from_parts(variable, 1.0, 0.0));
    }

    let standardized = variable
        .values()
        .iter()
        .map(|value| (value - offset) / scale)
        .collect();
    let name = variable.name().to_owned();
    Ok(ExplanatoryVariable::from_parts(
        Variable::new(name, standardized),
        scale,
        offset,
    ))
}

/// Exact inverse of [`standardize_covariate`]: `raw = standardized * scale + offset`.
#[must_use]
pub fn reconstruct(covariate: &ExplanatoryVariable) -> Vec<f64> {
    covariate
        .values()
        .iter()
        .map(|value| value.mul_add(covariate.scale(), covariate.offset()))
        .collect()
}
