use extreme_value_models::models::evd::gpd_quantile;
use extreme_value_models::{
    Covariates, EvaModel, FitError, FittedEva, McmcOptions, ReturnLevelError, ThresholdContext,
    Variable, fit_bayesian_with_options, fit_mle, fit_pwm, standardize_covariate,
    threshold_return_level, threshold_return_level_intervals,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn gpd_sample(n: usize, scale: f64, shape: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let u: f64 = rng.random_range(f64::MIN_POSITIVE..1.0);
            gpd_quantile(u, scale, shape)
        })
        .collect()
}

fn exceedance_model(values: Vec<f64>) -> EvaModel {
    EvaModel::threshold_exceedance(Variable::new("exceedances", values), Covariates::default())
        .expect("model should build")
}

#[test]
fn mle_round_trips_simulated_parameters() {
    let model = exceedance_model(gpd_sample(5_000, 2.0, 0.2, 31));
    let fit = fit_mle(&model).expect("fit should converge");
    let theta = fit.theta();
    assert!((theta[0].exp() - 2.0).abs() < 0.2, "scale = {}", theta[0].exp());
    assert!((theta[1] - 0.2).abs() < 0.05, "shape = {}", theta[1]);
}

#[test]
fn pwm_tracks_the_generating_parameters_on_large_samples() {
    let model = exceedance_model(gpd_sample(10_000, 2.0, 0.1, 37));
    let fit = fit_pwm(&model).expect("fit should succeed");
    let theta = fit.theta();
    assert!(
        (theta[0].exp() - 2.0).abs() / 2.0 < 0.05,
        "scale = {}",
        theta[0].exp()
    );
    assert!((theta[1] - 0.1).abs() < 0.05, "shape = {}", theta[1]);
}

#[test]
fn exponential_data_yields_a_shape_near_zero() {
    let model = exceedance_model(gpd_sample(10_000, 1.5, 0.0, 41));
    let fit = fit_pwm(&model).expect("fit should succeed");
    assert!(fit.theta()[1].abs() < 0.05, "shape = {}", fit.theta()[1]);
}

#[test]
fn bayesian_credible_intervals_cover_the_generating_parameters() {
    let model = exceedance_model(gpd_sample(400, 2.0, 0.1, 43));
    let fit = fit_bayesian_with_options(
        &model,
        McmcOptions {
            niter: 6_000,
            warmup: 2_000,
            seed: 81,
            adapt_during_warmup: true,
        },
    )
    .expect("fit should run");
    let intervals = fit.credible_intervals(0.95).expect("intervals compute");
    let truth = [2.0f64.ln(), 0.1];
    for (interval, value) in intervals.iter().zip(truth) {
        assert!(
            interval.lower <= value && value <= interval.upper,
            "interval [{}, {}] misses {value}",
            interval.lower,
            interval.upper
        );
    }
}

#[test]
fn return_level_translates_exactly_with_the_threshold() {
    let model = exceedance_model(gpd_sample(500, 1.0, 0.05, 47));
    let fit: FittedEva = fit_mle(&model).expect("fit should converge").into();
    let base = ThresholdContext {
        threshold: 30.0,
        nobservation: 20_000,
        nobsperblock: 365,
    };
    let shifted = ThresholdContext {
        threshold: 33.5,
        ..base
    };

    let at_base = threshold_return_level(&fit, base, 100.0).expect("level should compute");
    let at_shifted = threshold_return_level(&fit, shifted, 100.0).expect("level should compute");
    assert!((at_shifted.estimates[0] - at_base.estimates[0] - 3.5).abs() < 1.0e-9);
}

#[test]
fn longer_periods_give_higher_threshold_levels() {
    let model = exceedance_model(gpd_sample(500, 1.0, 0.1, 53));
    let fit: FittedEva = fit_mle(&model).expect("fit should converge").into();
    let context = ThresholdContext {
        threshold: 25.0,
        nobservation: 20_000,
        nobsperblock: 365,
    };
    let decade = threshold_return_level(&fit, context, 10.0).expect("level should compute");
    let century = threshold_return_level(&fit, context, 100.0).expect("level should compute");
    assert!(century.estimates[0] > decade.estimates[0]);
    assert!(decade.estimates[0] > context.threshold);
}

#[test]
fn interval_strategies_all_bracket_the_point_estimate() {
    let exceedances = gpd_sample(800, 1.2, 0.1, 59);
    let context = ThresholdContext {
        threshold: 40.0,
        nobservation: 30_000,
        nobsperblock: 365,
    };

    let model = exceedance_model(exceedances);
    let fits: Vec<FittedEva> = vec![
        fit_mle(&model).expect("mle should converge").into(),
        fit_pwm(&model).expect("pwm should succeed").into(),
        fit_bayesian_with_options(
            &model,
            McmcOptions {
                niter: 3_000,
                warmup: 1_000,
                seed: 91,
                adapt_during_warmup: true,
            },
        )
        .expect("bayesian should run")
        .into(),
    ];

    for fit in &fits {
        let estimate = threshold_return_level(fit, context, 100.0)
            .expect("level should compute")
            .estimates[0];
        let intervals = threshold_return_level_intervals(fit, context, 100.0, 0.95)
            .expect("intervals should compute");
        assert!(
            intervals[0].lower <= estimate && estimate <= intervals[0].upper,
            "{}: [{}, {}] misses {estimate}",
            fit.strategy_label(),
            intervals[0].lower,
            intervals[0].upper
        );
    }
}

#[test]
fn invalid_return_inputs_are_rejected() {
    let model = exceedance_model(gpd_sample(200, 1.0, 0.0, 61));
    let fit: FittedEva = fit_pwm(&model).expect("fit should succeed").into();
    let context = ThresholdContext {
        threshold: 10.0,
        nobservation: 5_000,
        nobsperblock: 365,
    };

    assert!(matches!(
        threshold_return_level(&fit, context, -1.0),
        Err(ReturnLevelError::InvalidReturnPeriod { .. })
    ));
    assert!(matches!(
        threshold_return_level_intervals(&fit, context, 100.0, 1.95),
        Err(ReturnLevelError::Fit(FitError::InvalidConfidenceLevel { .. }))
    ));

    let broken = ThresholdContext {
        threshold: f64::NAN,
        ..context
    };
    assert!(matches!(
        threshold_return_level(&fit, broken, 100.0),
        Err(ReturnLevelError::InvalidThresholdContext)
    ));
}

#[test]
fn location_covariates_are_rejected_at_model_construction() {
    let trend = standardize_covariate(Variable::new("year", (0..50).map(f64::from).collect()))
        .expect("covariate should standardize");
    let result = EvaModel::threshold_exceedance(
        Variable::new("exceedances", gpd_sample(50, 1.0, 0.0, 67)),
        Covariates {
            location: vec![trend],
            ..Covariates::default()
        },
    );
    assert!(result.is_err());
}

#[test]
fn scale_covariate_model_links_one_distribution_per_row() {
    let n = 300;
    let covariate_values: Vec<f64> = (0..n).map(|i| f64::from(i) / 100.0).collect();
    let mut rng = StdRng::seed_from_u64(71);
    let exceedances: Vec<f64> = covariate_values
        .iter()
        .map(|&x| {
            let scale = (0.4 * x).exp();
            let u: f64 = rng.random_range(f64::MIN_POSITIVE..1.0);
            gpd_quantile(u, scale, 0.0)
        })
        .collect();

    let covariate = standardize_covariate(Variable::new("x", covariate_values))
        .expect("covariate should standardize");
    let model = EvaModel::threshold_exceedance(
        Variable::new("exceedances", exceedances),
        Covariates {
            log_scale: vec![covariate],
            ..Covariates::default()
        },
    )
    .expect("model should build");

    let fit = fit_mle(&model).expect("fit should converge");
    assert_eq!(fit.linked_distributions().len(), 300);
    // The fitted slope should carry the simulated sign.
    assert!(fit.theta()[1] > 0.0);
}
