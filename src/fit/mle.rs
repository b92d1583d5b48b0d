/////////////////////////////////////////////////////////////////////////////////////////////\
//
// Maximum-likelihood fitting via a derivative-free simplex search.
//
// Created on: 21 Mar 2026     Author: Tobias Kragholm
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Maximum-likelihood fitter
//!
//! Maximizes the model log-likelihood over the flat parameter vector with a
//! Nelder–Mead simplex. The log-scale link already enforces scale positivity,
//! so the search is unconstrained; support violations simply cost
//! `+infinity`. The observed-information covariance comes from inverting a
//! central-difference Hessian at the optimum.

use faer::Mat;

use crate::fit::{
    ConfidenceInterval, FitError, validate_confidence_level, validate_probability, wald_interval,
};
use crate::models::{DistributionParameter, EvaModel, LinkedParams, ModelFamily};
use crate::utils::{covariance_from_information, sample_mean, sample_std};

const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

/// Simplex search controls.
#[derive(Debug, Clone, Copy)]
pub struct MleOptions {
    /// Maximum simplex iterations before reporting non-convergence.
    pub max_iterations: usize,
    /// Contraction tolerance on the objective spread across the simplex.
    pub tolerance: f64,
}

impl Default for MleOptions {
    fn default() -> Self {
        Self {
            max_iterations: 5_000,
            tolerance: 1.0e-8,
        }
    }
}

impl MleOptions {
    /// # Errors
    ///
    /// Returns `FitError::InvalidOptimizerOptions` if any control is invalid.
    pub fn validate(self) -> Result<(), FitError> {
        if self.max_iterations == 0 || !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(FitError::InvalidOptimizerOptions);
        }
        Ok(())
    }
}

/// A model fitted by maximum likelihood: the model plus the point estimate.
#[derive(Debug, Clone)]
pub struct MaximumLikelihoodEva {
    model: EvaModel,
    theta: Vec<f64>,
}

/// Fit by maximum likelihood with default optimizer controls.
///
/// # Errors
///
/// Returns `FitError::NonConvergence` if the simplex does not contract within
/// its iteration budget.
pub fn fit_mle(model: &EvaModel) -> Result<MaximumLikelihoodEva, FitError> {
    fit_mle_with_options(model, MleOptions::default())
}

/// Fit by maximum likelihood with explicit optimizer controls.
///
/// # Errors
///
/// Returns `FitError` if the options are invalid or the optimizer fails to
/// converge.
pub fn fit_mle_with_options(
    model: &EvaModel,
    options: MleOptions,
) -> Result<MaximumLikelihoodEva, FitError> {
    options.validate()?;
    let initial = initial_values(model);
    let theta = nelder_mead(|theta| -model.loglikelihood(theta), &initial, options)?;
    if !model.loglikelihood(&theta).is_finite() {
        return Err(FitError::NonConvergence);
    }
    Ok(MaximumLikelihoodEva {
        model: model.clone(),
        theta,
    })
}

impl MaximumLikelihoodEva {
    pub(crate) const fn from_parts(model: EvaModel, theta: Vec<f64>) -> Self {
        Self { model, theta }
    }

    #[must_use]
    pub const fn model(&self) -> &EvaModel {
        &self.model
    }

    /// The point estimate on the flat-vector layout.
    #[must_use]
    pub fn theta(&self) -> &[f64] {
        &self.theta
    }

    #[must_use]
    pub fn loglikelihood(&self) -> f64 {
        self.model.loglikelihood(&self.theta)
    }

    /// Fitted distribution per quantile row.
    #[must_use]
    pub fn linked_distributions(&self) -> Vec<LinkedParams> {
        self.model.linked_rows(&self.theta)
    }

    /// Quantile of the fitted distribution at `p`, one value per quantile row.
    ///
    /// # Errors
    ///
    /// Returns `FitError::InvalidProbability` unless `p` lies in `(0, 1)`.
    pub fn quantile(&self, p: f64) -> Result<Vec<f64>, FitError> {
        validate_probability(p)?;
        let family = self.model.family();
        Ok(self
            .linked_distributions()
            .iter()
            .map(|params| params.quantile(p, family))
            .collect())
    }

    /// Observed-information covariance: inverse of the negative numerical
    /// Hessian of the log-likelihood at the point estimate.
    ///
    /// # Errors
    ///
    /// Returns `FitError::SingularInformation` if the Hessian cannot be
    /// inverted (an unidentified or collinear model).
    pub fn parameter_covariance(&self) -> Result<Mat<f64>, FitError> {
        let information = negative_hessian(|theta| self.model.loglikelihood(theta), &self.theta);
        covariance_from_information(&information)
    }

    /// Wald confidence intervals per flat-vector coefficient.
    ///
    /// # Errors
    ///
    /// Returns `FitError` if the level is invalid or the information matrix
    /// is singular.
    pub fn confidence_intervals(&self, level: f64) -> Result<Vec<ConfidenceInterval>, FitError> {
        validate_confidence_level(level)?;
        let covariance = self.parameter_covariance()?;
        Ok(self
            .theta
            .iter()
            .enumerate()
            .map(|(i, &estimate)| wald_interval(estimate, covariance[(i, i)], level))
            .collect())
    }
}

/// Moment-based stationary starting vector: Gumbel moment estimates for GEV
/// intercepts, exponential for GPD, zeros on covariate slopes and shape.
#[must_use]
pub(crate) fn initial_values(model: &EvaModel) -> Vec<f64> {
    let mut theta = vec![0.0; model.parameter_index().total_len()];
    let data = model.data().values();

    match model.family() {
        ModelFamily::BlockMaxima => {
            let sd = sample_std(data).max(f64::MIN_POSITIVE);
            let scale0 = sd * 6.0f64.sqrt() / std::f64::consts::PI;
            let location0 = EULER_MASCHERONI.mul_add(-scale0, sample_mean(data));
            if let Some(slice) = model
                .parameter_index()
                .slice(DistributionParameter::Location)
            {
                theta[slice.start] = location0;
            }
            if let Some(slice) = model
                .parameter_index()
                .slice(DistributionParameter::LogScale)
            {
                theta[slice.start] = scale0.max(f64::MIN_POSITIVE).ln();
            }
        }
        ModelFamily::ThresholdExceedance => {
            let scale0 = sample_mean(data).max(f64::MIN_POSITIVE);
            if let Some(slice) = model
                .parameter_index()
                .slice(DistributionParameter::LogScale)
            {
                theta[slice.start] = scale0.ln();
            }
        }
    }
    theta
}

/// Nelder–Mead minimization with the standard reflection/expansion/
/// contraction/shrink moves.
///
/// # Errors
///
/// Returns `FitError::NonConvergence` if the simplex has not contracted to
/// the tolerance within the iteration budget.
fn nelder_mead(
    cost: impl Fn(&[f64]) -> f64,
    start: &[f64],
    options: MleOptions,
) -> Result<Vec<f64>, FitError> {
    let dim = start.len();
    let mut vertices = initial_simplex(start);
    let mut costs: Vec<f64> = vertices.iter().map(|vertex| cost(vertex)).collect();

    for _ in 0..options.max_iterations {
        sort_simplex(&mut vertices, &mut costs);

        if converged(&vertices, &costs, options.tolerance) {
            return Ok(vertices[0].clone());
        }

        let centroid = best_face_centroid(&vertices);
        let worst = vertices[dim].clone();
        let reflected = affine_step(&centroid, &worst, 1.0);
        let reflected_cost = cost(&reflected);

        if reflected_cost < costs[0] {
            let expanded = affine_step(&centroid, &worst, 2.0);
            let expanded_cost = cost(&expanded);
            if expanded_cost < reflected_cost {
                vertices[dim] = expanded;
                costs[dim] = expanded_cost;
            } else {
                vertices[dim] = reflected;
                costs[dim] = reflected_cost;
            }
        } else if reflected_cost < costs[dim - 1] {
            vertices[dim] = reflected;
            costs[dim] = reflected_cost;
        } else {
            let (contracted, contracted_cost) = if reflected_cost < costs[dim] {
                let outside = affine_step(&centroid, &worst, 0.5);
                let outside_cost = cost(&outside);
                (outside, outside_cost)
            } else {
                let inside = affine_step(&centroid, &worst, -0.5);
                let inside_cost = cost(&inside);
                (inside, inside_cost)
            };

            if contracted_cost < costs[dim].min(reflected_cost) {
                vertices[dim] = contracted;
                costs[dim] = contracted_cost;
            } else {
                shrink_toward_best(&mut vertices);
                for (vertex, vertex_cost) in vertices.iter().zip(costs.iter_mut()).skip(1) {
                    *vertex_cost = cost(vertex);
                }
            }
        }
    }

    Err(FitError::NonConvergence)
}

fn initial_simplex(start: &[f64]) -> Vec<Vec<f64>> {
    let dim = start.len();
    let mut vertices = Vec::with_capacity(dim + 1);
    vertices.push(start.to_vec());
    for i in 0..dim {
        let mut vertex = start.to_vec();
        vertex[i] = if vertex[i] == 0.0 {
            2.5e-4
        } else {
            vertex[i] * 1.05
        };
        vertices.push(vertex);
    }
    vertices
}

fn sort_simplex(vertices: &mut [Vec<f64>], costs: &mut [f64]) {
    let mut order: Vec<usize> = (0..costs.len()).collect();
    order.sort_by(|&a, &b| costs[a].total_cmp(&costs[b]));
    let sorted_vertices: Vec<Vec<f64>> = order.iter().map(|&i| vertices[i].clone()).collect();
    let sorted_costs: Vec<f64> = order.iter().map(|&i| costs[i]).collect();
    vertices.clone_from_slice(&sorted_vertices);
    costs.copy_from_slice(&sorted_costs);
}

fn converged(vertices: &[Vec<f64>], costs: &[f64], tolerance: f64) -> bool {
    let last = costs.len() - 1;
    if !costs[0].is_finite() || !costs[last].is_finite() {
        return false;
    }
    let cost_spread = (costs[last] - costs[0]).abs();
    let coordinate_spread = vertices[0]
        .iter()
        .enumerate()
        .map(|(i, &best)| {
            vertices
                .iter()
                .map(|vertex| (vertex[i] - best).abs())
                .fold(0.0, f64::max)
        })
        .fold(0.0, f64::max);
    cost_spread < tolerance && coordinate_spread < tolerance.sqrt()
}

fn best_face_centroid(vertices: &[Vec<f64>]) -> Vec<f64> {
    let dim = vertices.len() - 1;
    let mut centroid = vec![0.0; dim];
    for vertex in vertices.iter().take(dim) {
        for (sum, &value) in centroid.iter_mut().zip(vertex) {
            *sum += value;
        }
    }
    let denominator = crate::utils::usize_to_f64(dim);
    for sum in &mut centroid {
        *sum /= denominator;
    }
    centroid
}

fn affine_step(centroid: &[f64], worst: &[f64], coefficient: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(worst)
        .map(|(&c, &w)| coefficient.mul_add(c - w, c))
        .collect()
}

fn shrink_toward_best(vertices: &mut [Vec<f64>]) {
    let best = vertices[0].clone();
    for vertex in vertices.iter_mut().skip(1) {
        for (value, &anchor) in vertex.iter_mut().zip(&best) {
            *value = 0.5 * (*value + anchor);
        }
    }
}

/// Central-difference negative Hessian of `objective` at `theta`.
fn negative_hessian(objective: impl Fn(&[f64]) -> f64, theta: &[f64]) -> Mat<f64> {
    let dim = theta.len();
    let steps: Vec<f64> = theta
        .iter()
        .map(|&value| 1.0e-4 * value.abs().max(1.0))
        .collect();

    let eval = |offsets: &[(usize, f64)]| {
        let mut point = theta.to_vec();
        for &(index, delta) in offsets {
            point[index] += delta;
        }
        objective(&point)
    };

    let center = objective(theta);
    Mat::from_fn(dim, dim, |i, j| {
        if i == j {
            let h = steps[i];
            let forward = eval(&[(i, h)]);
            let backward = eval(&[(i, -h)]);
            -((forward - 2.0 * center + backward) / (h * h))
        } else {
            let (hi, hj) = (steps[i], steps[j]);
            let pp = eval(&[(i, hi), (j, hj)]);
            let pm = eval(&[(i, hi), (j, -hj)]);
            let mp = eval(&[(i, -hi), (j, hj)]);
            let mm = eval(&[(i, -hi), (j, -hj)]);
            -((pp - pm - mp + mm) / (4.0 * hi * hj))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Variable;
    use crate::models::Covariates;
    use approx::assert_relative_eq;

    fn quadratic(theta: &[f64]) -> f64 {
        let a = theta[0] - 3.0;
        let b = theta[1] + 1.0;
        2.0f64.mul_add(b * b, a * a)
    }

    #[test]
    fn nelder_mead_minimizes_a_quadratic_bowl() {
        let minimum = nelder_mead(quadratic, &[0.0, 0.0], MleOptions::default())
            .expect("quadratic should converge");
        assert_relative_eq!(minimum[0], 3.0, epsilon = 1.0e-3);
        assert_relative_eq!(minimum[1], -1.0, epsilon = 1.0e-3);
    }

    #[test]
    fn nelder_mead_reports_budget_exhaustion() {
        let options = MleOptions {
            max_iterations: 2,
            tolerance: 1.0e-12,
        };
        let result = nelder_mead(quadratic, &[100.0, -250.0], options);
        assert!(matches!(result, Err(FitError::NonConvergence)));
    }

    #[test]
    fn negative_hessian_of_quadratic_is_constant() {
        // For f = (x-3)^2 + 2(y+1)^2 the negative Hessian of -f is diag(2, 4).
        let hessian = negative_hessian(|theta| -quadratic(theta), &[3.0, -1.0]);
        assert_relative_eq!(hessian[(0, 0)], 2.0, epsilon = 1.0e-4);
        assert_relative_eq!(hessian[(1, 1)], 4.0, epsilon = 1.0e-4);
        assert_relative_eq!(hessian[(0, 1)], 0.0, epsilon = 1.0e-4);
    }

    #[test]
    fn initial_values_put_moments_on_intercepts() {
        let model = EvaModel::block_maxima(
            Variable::new("maxima", vec![2.0, 3.0, 4.0, 5.0]),
            Covariates::default(),
        )
        .expect("model should build");
        let theta = initial_values(&model);
        assert_eq!(theta.len(), 3);
        assert!(theta[0].is_finite());
        assert!(theta[1].is_finite());
        assert_relative_eq!(theta[2], 0.0);
        // The starting point must have finite likelihood.
        assert!(model.loglikelihood(&theta).is_finite());
    }

    #[test]
    fn quantile_rejects_invalid_probability() {
        let model = EvaModel::block_maxima(
            Variable::new("maxima", vec![1.0, 2.0, 3.0, 2.5, 1.5]),
            Covariates::default(),
        )
        .expect("model should build");
        let fit = MaximumLikelihoodEva {
            theta: initial_values(&model),
            model,
        };
        assert!(matches!(
            fit.quantile(-1.0),
            Err(FitError::InvalidProbability { .. })
        ));
    }
}
