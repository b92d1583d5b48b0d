/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Shared linear algebra and statistics utilities for the fitting strategies.
//
// Created on: 14 Mar 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Utilities
//!
//! Shared helpers for solving linear systems, summary statistics, and
//! interpolated percentiles over sorted draws.

use faer::Mat;
use faer::prelude::Solve;
use num_traits::ToPrimitive;

use crate::fit::FitError;

#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}

/// # Errors
///
/// Returns `FitError::SingularInformation` if the solve produces non-finite values.
pub fn solve_linear_system(a: &Mat<f64>, b: &Mat<f64>) -> Result<Mat<f64>, FitError> {
    let rhs = b.clone();
    let lu = a.full_piv_lu();
    let solution = lu.solve(rhs);
    if !matrix_is_finite(&solution) {
        return Err(FitError::SingularInformation);
    }
    Ok(solution)
}

/// Invert an observed-information matrix by solving against the identity.
///
/// # Errors
///
/// Returns `FitError::SingularInformation` if the information matrix is not invertible.
pub fn covariance_from_information(information: &Mat<f64>) -> Result<Mat<f64>, FitError> {
    let identity = Mat::<f64>::identity(information.nrows(), information.ncols());
    solve_linear_system(information, &identity)
}

#[must_use]
pub fn matrix_is_finite(matrix: &Mat<f64>) -> bool {
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            if !matrix[(i, j)].is_finite() {
                return false;
            }
        }
    }
    true
}

#[must_use]
pub fn sample_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / usize_to_f64(values.len())
}

/// Unbiased sample standard deviation; zero for fewer than two values.
#[must_use]
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = sample_mean(values);
    let sum_sq = values
        .iter()
        .map(|value| {
            let centered = value - mean;
            centered * centered
        })
        .sum::<f64>();
    (sum_sq / usize_to_f64(values.len() - 1)).sqrt()
}

/// Linearly interpolated percentile over an ascending-sorted slice.
#[must_use]
pub fn percentile(sorted_values: &[f64], probability: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }

    let clamped = probability.clamp(0.0, 1.0);
    let last = sorted_values.len() - 1;
    let position = clamped * usize_to_f64(last);
    let lower = position.floor().to_usize().unwrap_or(0);
    let upper = position.ceil().to_usize().unwrap_or(last);

    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = position - usize_to_f64(lower);
        (1.0 - weight).mul_add(sorted_values[lower], weight * sorted_values[upper])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn solve_linear_system_rejects_non_finite_solution() {
        let a = Mat::from_fn(2, 2, |i, j| if i == j { 1.0 } else { 0.0 });
        let b = Mat::from_fn(2, 1, |i, _| if i == 0 { f64::NAN } else { 1.0 });
        let err = solve_linear_system(&a, &b).expect_err("non-finite rhs should fail");
        assert!(matches!(err, FitError::SingularInformation));
    }

    #[test]
    fn covariance_from_information_inverts_diagonal() {
        let information = Mat::from_fn(2, 2, |i, j| if i == j { 4.0 } else { 0.0 });
        let covariance =
            covariance_from_information(&information).expect("diagonal matrix is invertible");
        assert_relative_eq!(covariance[(0, 0)], 0.25);
        assert_relative_eq!(covariance[(1, 1)], 0.25);
        assert_relative_eq!(covariance[(0, 1)], 0.0);
    }

    #[test]
    fn covariance_from_information_rejects_singular_matrix() {
        let information = Mat::from_fn(2, 2, |_, _| 1.0);
        assert!(covariance_from_information(&information).is_err());
    }

    #[test]
    fn sample_std_matches_hand_computation() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(sample_mean(&values), 2.5);
        assert_relative_eq!(sample_std(&values), (5.0f64 / 3.0).sqrt());
    }

    #[test]
    fn percentile_interpolates_between_order_statistics() {
        let sorted = [0.0, 1.0, 2.0, 3.0];
        assert_relative_eq!(percentile(&sorted, 0.5), 1.5);
        assert_relative_eq!(percentile(&sorted, 0.0), 0.0);
        assert_relative_eq!(percentile(&sorted, 1.0), 3.0);
    }

    #[test]
    fn matrix_is_finite_detects_nan() {
        let matrix = Mat::from_fn(2, 1, |i, _| if i == 0 { 1.0 } else { f64::NAN });
        assert!(!matrix_is_finite(&matrix));
    }
}
