//! Model definitions: distribution primitives, parameter layout, and the
//! extreme-value model container.

pub mod eva;
pub mod evd;
pub mod parameters;

pub use eva::{Covariates, EvaModel, LinkedParams, ModelFamily};
pub use parameters::{DistributionParameter, ParameterIndex, ParameterSlice};
