//! # Model inputs
//!
//! Named data series and standardized covariates consumed by the
//! extreme-value models.
//!
//! # Examples
//!
//! ```
//! use extreme_value_models::Variable;
//!
//! let response = Variable::new("sea level", vec![3.9, 4.1, 4.3]);
//! assert_eq!(response.len(), 3);
//! ```

use thiserror::Error;

/// Errors returned when validating model inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("response must contain at least one observation")]
    EmptyResponse,
    #[error("response contains non-finite values")]
    NonFiniteResponse,
    #[error("covariate `{name}` length ({len}) must match response length ({expected})")]
    CovariateLengthMismatch {
        name: String,
        len: usize,
        expected: usize,
    },
    #[error("covariate `{name}` contains non-finite values")]
    NonFiniteCovariate { name: String },
    #[error("covariate `{name}` is constant and cannot be standardized")]
    DegenerateCovariate { name: String },
    #[error("threshold-exceedance models do not take location covariates")]
    LocationCovariatesUnsupported,
}

/// A named numeric series; immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    values: Vec<f64>,
}

impl Variable {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A covariate held on its standardized scale together with the linear
/// record needed to undo the standardization.
///
/// Invariant: `scale != 0`, so `raw = standardized * scale + offset` is
/// always invertible.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplanatoryVariable {
    variable: Variable,
    scale: f64,
    offset: f64,
}

impl ExplanatoryVariable {
    /// Assemble from already-standardized values and their transform record.
    ///
    /// Callers normally go through [`crate::preprocess::standardize_covariate`];
    /// this constructor exists for rebuilding raw-scale covariates after a
    /// back-transform.
    #[must_use]
    pub fn from_parts(variable: Variable, scale: f64, offset: f64) -> Self {
        debug_assert!(scale != 0.0, "standardization scale must be non-zero");
        Self {
            variable,
            scale,
            offset,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.variable.name()
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        self.variable.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variable.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variable.is_empty()
    }

    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Whether the stored values are already on the raw scale.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }
}
