use lime_segment::spectral;
use lime_segment::{
    BaselineConfig, ExplainConfig, ExplainError, Leftist, LimeSegment, Method, Neves, Series,
    ThresholdClassifier,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sine of period 10 with a level step of 3 at index 50.
fn step_at_fifty(seed: u64) -> Series {
    let mut rng = StdRng::seed_from_u64(seed);
    let values = (0..100)
        .map(|t| {
            let wave = (std::f64::consts::TAU * t as f64 / 10.0).sin();
            let step = if t >= 50 { 3.0 } else { 0.0 };
            wave + step + rng.gen_range(-0.05..0.05)
        })
        .collect();
    Series::univariate(values)
}

/// Sine of period 10 in three regimes: quiet until 30, raised until 50, then
/// a large level and amplitude step. Only the last regime crosses 4.5.
fn stepped_sine(seed: u64) -> Series {
    let mut rng = StdRng::seed_from_u64(seed);
    let values = (0..100)
        .map(|t| {
            let wave = (std::f64::consts::TAU * t as f64 / 10.0).sin();
            let level = match t {
                0..=29 => 0.5 * wave,
                30..=49 => 1.0 + wave,
                _ => 3.0 + 2.0 * wave,
            };
            level + rng.gen_range(-0.05..0.05)
        })
        .collect();
    Series::univariate(values)
}

fn quiet_pool(count: usize) -> Vec<Series> {
    let mut rng = StdRng::seed_from_u64(99);
    (0..count)
        .map(|_| {
            let phase = rng.gen_range(0.0..std::f64::consts::TAU);
            Series::univariate(
                (0..100)
                    .map(|t| 0.5 * (std::f64::consts::TAU * t as f64 / 10.0 + phase).sin())
                    .collect(),
            )
        })
        .collect()
}

#[test]
fn limesegment_attributes_the_step() {
    let example = stepped_sine(17);
    let model = ThresholdClassifier::new(4.5);
    let config = ExplainConfig {
        window_size: Some(20),
        change_points: 2,
        random_seed: Some(2024),
        ..Default::default()
    };

    let explanation = LimeSegment::new(config).explain(&example, &model).unwrap();

    assert_eq!(explanation.method, Method::LimeSegment);
    assert_eq!(explanation.coefficients.len(), explanation.segment_count());
    let step = explanation
        .boundaries
        .change_points()
        .iter()
        .copied()
        .find(|&cp| cp.abs_diff(50) <= 10);
    assert!(
        step.is_some(),
        "no boundary near the step: {:?}",
        explanation.boundaries.starts()
    );

    let top = explanation.most_important().unwrap();
    assert!(top.start >= 40, "most important feature {top:?} lies before the step");
    assert!(top.coefficient > 0.0);
}

#[test]
fn limesegment_attributes_a_single_level_step() {
    let model = ThresholdClassifier::new(2.5);
    for seed in 0..5 {
        let example = step_at_fifty(seed);
        let config = ExplainConfig {
            window_size: Some(20),
            change_points: 2,
            random_seed: Some(2024),
            ..Default::default()
        };
        let explanation = LimeSegment::new(config).explain(&example, &model).unwrap();
        let starts = explanation.boundaries.starts().to_vec();
        assert!(
            explanation
                .boundaries
                .change_points()
                .iter()
                .any(|&cp| cp.abs_diff(50) <= 10),
            "seed {seed}: no boundary near the step: {starts:?}"
        );

        // The second boundary may split the raised regime, so the top feature
        // is any segment reaching past the step, not necessarily the one
        // that starts at it.
        let top = explanation.most_important().unwrap();
        assert!(top.end > 50, "seed {seed}: top feature {top:?} ends before the step");
        assert!(top.coefficient > 0.0, "seed {seed}: {top:?}");
        for feature in explanation.features().iter().filter(|f| f.end <= 50) {
            assert!(
                feature.coefficient.abs() < top.coefficient.abs(),
                "seed {seed}: pre-step feature {feature:?} outranks {top:?}"
            );
        }
    }
}

#[test]
fn limesegment_is_reproducible_with_a_seed() {
    let example = stepped_sine(3);
    let model = ThresholdClassifier::new(4.5);
    let config = ExplainConfig {
        window_size: Some(20),
        change_points: 2,
        sample_count: 30,
        random_seed: Some(8),
        ..Default::default()
    };
    let a = LimeSegment::new(config.clone()).explain(&example, &model).unwrap();
    let b = LimeSegment::new(config).explain(&example, &model).unwrap();
    assert_eq!(a, b);
}

#[test]
fn constant_input_is_degenerate() {
    let flat = Series::univariate(vec![1.5; 100]);
    assert!(matches!(spectral::extract(&flat, 10), Err(ExplainError::Degenerate(_))));

    let err = LimeSegment::new(ExplainConfig::default())
        .explain(&flat, &ThresholdClassifier::new(0.0))
        .unwrap_err();
    assert!(matches!(err, ExplainError::Degenerate(_)), "{err}");
}

#[test]
fn baselines_cover_uniform_segments() {
    // Quiet sine with a burst confined to the sixth tenth of the series.
    let mut example = quiet_pool(1).remove(0).values().to_vec();
    example[52..58].iter_mut().for_each(|v| *v += 6.0);
    let example = Series::univariate(example);
    let pool = quiet_pool(8);
    let model = ThresholdClassifier::new(4.5);
    let config = BaselineConfig {
        random_seed: Some(1),
        ..Default::default()
    };

    for explanation in [
        Leftist::new(config.clone(), &pool).explain(&example, &model).unwrap(),
        Neves::new(config.clone(), &pool).explain(&example, &model).unwrap(),
    ] {
        assert_eq!(explanation.segment_count(), 10);
        assert_eq!(explanation.coefficients.len(), 10);
        let top = explanation.most_important().unwrap();
        assert_eq!(top.segment, 5, "{}: top feature {top:?}", explanation.method);
        assert_eq!((top.start, top.end), (50, 60));
        assert!(top.coefficient > 0.0);
    }
}

#[test]
fn explanation_serializes_to_json() {
    let example = stepped_sine(11);
    let config = ExplainConfig {
        window_size: Some(20),
        change_points: 2,
        sample_count: 20,
        random_seed: Some(0),
        ..Default::default()
    };
    let explanation = LimeSegment::new(config)
        .explain(&example, &ThresholdClassifier::new(4.5))
        .unwrap();
    let json = serde_json::to_value(&explanation).unwrap();
    assert_eq!(json["method"], "limesegment");
    assert_eq!(json["attribution"], "segment");
    assert_eq!(
        json["coefficients"].as_array().map(Vec::len),
        Some(explanation.segment_count())
    );
}
