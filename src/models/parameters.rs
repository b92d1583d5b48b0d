//! # Parameter-vector layout
//!
//! Maps each distribution parameter to a contiguous slice of the flat
//! parameter vector shared by every fitting strategy. The index is built
//! once per model and never mutated afterwards.

/// A distribution parameter of the GEV/GPD families, in fixed layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionParameter {
    Location,
    LogScale,
    Shape,
}

impl DistributionParameter {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::LogScale => "log-scale",
            Self::Shape => "shape",
        }
    }
}

/// A contiguous slice `[start, start + len)` of the flat parameter vector.
///
/// `len` is always `1 + n_covariates`: the intercept followed by one
/// coefficient per covariate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSlice {
    pub start: usize,
    pub len: usize,
}

impl ParameterSlice {
    #[must_use]
    pub const fn end(self) -> usize {
        self.start + self.len
    }
}

/// Immutable flat-vector layout over the model's distribution parameters.
///
/// Layout order is fixed: location (GEV only), log-scale, shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterIndex {
    location: Option<ParameterSlice>,
    log_scale: ParameterSlice,
    shape: ParameterSlice,
    total_len: usize,
}

impl ParameterIndex {
    /// Build the index from per-parameter covariate counts.
    ///
    /// `location_covariates` is `None` for families without a location
    /// parameter (GPD).
    #[must_use]
    pub(crate) fn new(
        location_covariates: Option<usize>,
        log_scale_covariates: usize,
        shape_covariates: usize,
    ) -> Self {
        let mut cursor = 0;
        let location = location_covariates.map(|n_covariates| {
            let slice = ParameterSlice {
                start: cursor,
                len: 1 + n_covariates,
            };
            cursor = slice.end();
            slice
        });
        let log_scale = ParameterSlice {
            start: cursor,
            len: 1 + log_scale_covariates,
        };
        cursor = log_scale.end();
        let shape = ParameterSlice {
            start: cursor,
            len: 1 + shape_covariates,
        };
        cursor = shape.end();

        Self {
            location,
            log_scale,
            shape,
            total_len: cursor,
        }
    }

    /// Slice for one distribution parameter; `None` if the family lacks it.
    #[must_use]
    pub const fn slice(&self, parameter: DistributionParameter) -> Option<ParameterSlice> {
        match parameter {
            DistributionParameter::Location => self.location,
            DistributionParameter::LogScale => Some(self.log_scale),
            DistributionParameter::Shape => Some(self.shape),
        }
    }

    /// Total length of the flat parameter vector.
    #[must_use]
    pub const fn total_len(&self) -> usize {
        self.total_len
    }

    /// Parameters present in this layout, in flat-vector order.
    #[must_use]
    pub fn parameters(&self) -> Vec<(DistributionParameter, ParameterSlice)> {
        let mut parameters = Vec::with_capacity(3);
        if let Some(slice) = self.location {
            parameters.push((DistributionParameter::Location, slice));
        }
        parameters.push((DistributionParameter::LogScale, self.log_scale));
        parameters.push((DistributionParameter::Shape, self.shape));
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gev_layout_is_location_logscale_shape() {
        let index = ParameterIndex::new(Some(2), 1, 0);
        assert_eq!(index.total_len(), 6);

        let location = index
            .slice(DistributionParameter::Location)
            .expect("GEV has a location slice");
        assert_eq!((location.start, location.len), (0, 3));

        let log_scale = index
            .slice(DistributionParameter::LogScale)
            .expect("log-scale slice always exists");
        assert_eq!((log_scale.start, log_scale.len), (3, 2));

        let shape = index
            .slice(DistributionParameter::Shape)
            .expect("shape slice always exists");
        assert_eq!((shape.start, shape.len), (5, 1));
    }

    #[test]
    fn gpd_layout_has_no_location_slice() {
        let index = ParameterIndex::new(None, 1, 1);
        assert_eq!(index.total_len(), 4);
        assert!(index.slice(DistributionParameter::Location).is_none());
        assert_eq!(index.parameters().len(), 2);
    }

    #[test]
    fn total_len_is_sum_of_slices() {
        let index = ParameterIndex::new(Some(1), 2, 3);
        let sum: usize = index.parameters().iter().map(|(_, slice)| slice.len).sum();
        assert_eq!(sum, index.total_len());
    }
}
