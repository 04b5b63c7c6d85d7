use std::collections::HashMap;

use ndarray::{Array1, Array2, ArrayViewMut1};

use super::config::{AlternateValue, InjectionConfig};
use super::injector::{Injector, Passthrough};
use super::wrapper::{inject, Forward};
use crate::constants::{ENV_ALTERNATE, ENV_CORRUPTION_PROBABILITY, ENV_NAN_FRACTION, ENV_SEED};
use crate::logic::error::ConfigError;

fn ramp(rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |(r, c)| (r * cols + c) as f32 * 0.25 - 3.0)
}

fn bits(a: &Array2<f32>) -> Vec<u32> {
    a.iter().map(|v| v.to_bits()).collect()
}

fn lookup(vars: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
    let map: HashMap<&'static str, String> = vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
    move |key| map.get(key).cloned()
}

struct TinyModel {
    scale: f32,
}

impl Forward<Array2<f32>> for TinyModel {
    type Output = Array2<f32>;

    fn forward(&self, input: Array2<f32>) -> Array2<f32> {
        input.mapv(|v| v * self.scale)
    }
}

// ============================================================================
// CONFIG
// ============================================================================

#[test]
fn test_config_rejects_out_of_range() {
    match InjectionConfig::new(1.5, 0.5) {
        Err(ConfigError::OutOfRange { name, value }) => {
            assert_eq!(name, "corruption_probability");
            assert_eq!(value, 1.5);
        }
        other => panic!("Expected OutOfRange, got {:?}", other),
    }
    assert!(matches!(
        InjectionConfig::new(0.5, -0.01),
        Err(ConfigError::OutOfRange { name: "nan_fraction", .. })
    ));
    assert!(InjectionConfig::new(f64::NAN, 1.0).is_err());
    assert!(InjectionConfig::new(0.0, 0.0).is_ok());
    assert!(InjectionConfig::new(1.0, 1.0).is_ok());
}

#[test]
fn test_config_deserialization_validates() {
    let config: InjectionConfig = serde_json::from_str(r#"{"corruption_probability": 0.05}"#).unwrap();
    assert_eq!(config.corruption_probability(), 0.05);
    assert_eq!(config.nan_fraction(), 1.0);
    assert_eq!(config.alternate(), AlternateValue::PositiveInfinity);
    assert_eq!(config.seed(), None);

    let pinned: InjectionConfig = serde_json::from_str(
        r#"{"corruption_probability": 0.2, "nan_fraction": 0.5, "alternate": "negative_infinity", "seed": 9}"#,
    )
    .unwrap();
    assert_eq!(pinned.alternate(), AlternateValue::NegativeInfinity);
    assert_eq!(pinned.seed(), Some(9));

    assert!(serde_json::from_str::<InjectionConfig>(r#"{"corruption_probability": 2.0}"#).is_err());
}

#[test]
fn test_env_contract_round_trip() {
    let config = InjectionConfig::new(0.25, 0.75)
        .unwrap()
        .with_alternate(AlternateValue::Extreme)
        .with_seed(42);

    let exported = config.to_env();
    let vars: Vec<(&'static str, &str)> = exported.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let restored = InjectionConfig::from_lookup(lookup(&vars)).unwrap();

    assert_eq!(restored, Some(config));
}

#[test]
fn test_env_contract_errors() {
    assert_eq!(InjectionConfig::from_lookup(lookup(&[])).unwrap(), None);

    assert!(matches!(
        InjectionConfig::from_lookup(lookup(&[(ENV_CORRUPTION_PROBABILITY, "lots")])),
        Err(ConfigError::InvalidEnv { key, .. }) if key == ENV_CORRUPTION_PROBABILITY
    ));
    assert!(matches!(
        InjectionConfig::from_lookup(lookup(&[(ENV_CORRUPTION_PROBABILITY, "0.1"), (ENV_NAN_FRACTION, "3")])),
        Err(ConfigError::OutOfRange { .. })
    ));
    assert!(matches!(
        InjectionConfig::from_lookup(lookup(&[(ENV_CORRUPTION_PROBABILITY, "0.1"), (ENV_ALTERNATE, "zero")])),
        Err(ConfigError::UnknownAlternate(_))
    ));
    assert!(matches!(
        InjectionConfig::from_lookup(lookup(&[(ENV_CORRUPTION_PROBABILITY, "0.1"), (ENV_SEED, "-1")])),
        Err(ConfigError::InvalidEnv { .. })
    ));
}

// ============================================================================
// WRAPPER
// ============================================================================

#[test]
fn test_zero_probability_is_bit_identical() {
    let plain = |x: Array2<f32>| x.mapv(|v| v / 3.0);
    let wrapped = inject(InjectionConfig::disabled().with_seed(1), plain);

    for _ in 0..3 {
        let input = ramp(16, 16);
        assert_eq!(bits(&wrapped.forward(input.clone())), bits(&plain(input)));
    }

    let stats = wrapped.stats();
    assert_eq!(stats.invocations, 3);
    assert_eq!(stats.elements_seen, 0);
    assert_eq!(stats.elements_corrupted, 0);
}

#[test]
fn test_fixed_seed_is_deterministic() {
    let config = InjectionConfig::new(0.3, 0.5).unwrap().with_seed(1234);
    let first = inject(config, |x: Array2<f32>| x);
    let second = inject(config, |x: Array2<f32>| x);

    for _ in 0..4 {
        assert_eq!(bits(&first.forward(ramp(20, 20))), bits(&second.forward(ramp(20, 20))));
    }
    assert_eq!(first.stats(), second.stats());
}

#[test]
fn test_different_seeds_differ() {
    let a = inject(InjectionConfig::new(0.5, 1.0).unwrap().with_seed(1), |x: Array2<f32>| x);
    let b = inject(InjectionConfig::new(0.5, 1.0).unwrap().with_seed(2), |x: Array2<f32>| x);
    assert_ne!(bits(&a.forward(ramp(32, 32))), bits(&b.forward(ramp(32, 32))));
}

#[test]
fn test_corruption_happens_before_forward() {
    let config = InjectionConfig::new(1.0, 1.0).unwrap().with_seed(5);
    let wrapped = inject(config, |x: Array2<f32>| x.iter().filter(|v| v.is_nan()).count());

    assert_eq!(wrapped.forward(ramp(4, 8)), 32);
}

#[test]
fn test_full_corruption_alternate_values() {
    let config = InjectionConfig::new(1.0, 0.0)
        .unwrap()
        .with_alternate(AlternateValue::NegativeInfinity)
        .with_seed(3);
    let wrapped = inject(config, |x: Array2<f32>| x);

    let out = wrapped.forward(ramp(5, 5));
    assert!(out.iter().all(|v| *v == f32::NEG_INFINITY));
    assert_eq!(wrapped.stats().alternate_written, 25);
    assert_eq!(wrapped.stats().nan_written, 0);
}

#[test]
fn test_mixed_infinity_splits_signs() {
    let config = InjectionConfig::new(1.0, 0.0)
        .unwrap()
        .with_alternate(AlternateValue::MixedInfinity)
        .with_seed(17);
    let wrapped = inject(config, |x: Array1<f64>| x);

    let out = wrapped.forward(Array1::zeros(10_000));
    let positive = out.iter().filter(|v| **v == f64::INFINITY).count();
    let negative = out.iter().filter(|v| **v == f64::NEG_INFINITY).count();

    assert_eq!(positive + negative, 10_000);
    assert!((4_000..6_000).contains(&positive), "positive={}", positive);
    assert!((4_000..6_000).contains(&negative), "negative={}", negative);
    assert_eq!(wrapped.stats().alternate_written, 10_000);
}

#[test]
fn test_mixed_infinity_names() {
    for raw in ["mixed_infinity", "mixed", "±inf", " MIXED "] {
        assert_eq!(raw.parse::<AlternateValue>().unwrap(), AlternateValue::MixedInfinity);
    }
    assert_eq!(AlternateValue::MixedInfinity.to_string(), "mixed_infinity");
    assert_eq!(
        serde_json::from_str::<AlternateValue>(r#""mixed_infinity""#).unwrap(),
        AlternateValue::MixedInfinity
    );
}

#[test]
fn test_corruption_rate_and_split() {
    let config = InjectionConfig::new(0.5, 0.5).unwrap().with_seed(99);
    let wrapped = inject(config, |x: Array1<f32>| x);

    let out = wrapped.forward(Array1::zeros(20_000));
    let nan = out.iter().filter(|v| v.is_nan()).count();
    let inf = out.iter().filter(|v| v.is_infinite()).count();
    let untouched = out.iter().filter(|v| **v == 0.0).count();

    assert!((9_000..11_000).contains(&(nan + inf)), "corrupted = {}", nan + inf);
    assert!((4_000..6_000).contains(&nan), "nan = {}", nan);
    assert_eq!(nan + inf + untouched, 20_000);

    let stats = wrapped.stats();
    assert_eq!(stats.elements_seen, 20_000);
    assert_eq!(stats.elements_corrupted as usize, nan + inf);
    assert_eq!(stats.nan_written as usize, nan);
}

#[test]
fn test_model_struct_wrapped() {
    let model = TinyModel { scale: 2.0 };
    let wrapped = inject(InjectionConfig::new(0.25, 1.0).unwrap().with_seed(11), model);

    let out = wrapped.forward(ramp(10, 10));
    assert_eq!(out.dim(), (10, 10));
    assert!(out.iter().any(|v| v.is_nan()));
    assert_eq!(wrapped.inner().scale, 2.0);
}

#[test]
fn test_non_tensor_arguments_pass_through() {
    let config = InjectionConfig::new(1.0, 1.0).unwrap().with_seed(8);
    let wrapped = inject(config, |(x, steps, label): (Array1<f64>, Passthrough<usize>, Passthrough<String>)| {
        (x.iter().all(|v| v.is_nan()), steps.0, label.0)
    });

    let input = (Array1::from(vec![1.0, 2.0, 3.0]), Passthrough(7), Passthrough("gan".to_string()));
    let (all_nan, steps, label) = wrapped.forward(input);
    assert!(all_nan);
    assert_eq!(steps, 7);
    assert_eq!(label, "gan");
}

#[test]
fn test_views_are_corrupted_in_place() {
    let mut injector = Injector::new(InjectionConfig::new(1.0, 1.0).unwrap().with_seed(2));
    let mut data = vec![1.0f32, 2.0, 3.0, 4.0];

    {
        let mut view = ArrayViewMut1::from(&mut data[..]);
        injector.inject(&mut view);
    }

    assert!(data.iter().all(|v| v.is_nan()));
}

#[test]
fn test_containers_and_empty_tensors() {
    let mut injector = Injector::new(InjectionConfig::new(1.0, 1.0).unwrap().with_seed(4));
    let mut batch = vec![Array1::<f32>::zeros(3), Array1::<f32>::zeros(0)];
    let mut missing: Option<Array1<f32>> = None;

    injector.inject(&mut batch);
    injector.inject(&mut missing);

    assert!(batch[0].iter().all(|v| v.is_nan()));
    assert_eq!(injector.stats().elements_seen, 3);
    assert_eq!(injector.stats().invocations, 2);
}

#[test]
fn test_explicit_seed_overrides_process_seed() {
    let injector = Injector::new(InjectionConfig::new(0.1, 1.0).unwrap().with_seed(77));
    assert_eq!(injector.seed(), 77);
}
