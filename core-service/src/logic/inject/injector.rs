//! Element-level corruption.
//!
//! Elements are visited in iteration order. Each gets a draw deciding
//! corruption (`u < corruption_probability`); a corrupted element then gets a
//! second, independent draw deciding NaN (`c < nan_fraction`) or the
//! alternate value. Mixed infinities take a third draw for the sign.

use ndarray::{ArrayBase, DataMut, Dimension};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::config::{AlternateValue, InjectionConfig};
use crate::constants;

static PROCESS_SEED: Lazy<u64> = Lazy::new(|| match constants::get_seed() {
    Some(seed) => {
        log::info!("Injection process seed {} (from {})", seed, constants::ENV_SEED);
        seed
    }
    None => {
        let seed = rand::random();
        log::info!("Injection process seed {} (generated)", seed);
        seed
    }
});

/// Seed used by every injector whose config does not pin one
pub fn process_seed() -> u64 {
    *PROCESS_SEED
}

/// Floating-point element types that can carry an anomaly
pub trait AnomalyFloat: Copy {
    fn nan() -> Self;
    fn infinity(negative: bool) -> Self;
    fn max_finite() -> Self;
}

impl AnomalyFloat for f32 {
    fn nan() -> Self {
        f32::NAN
    }

    fn infinity(negative: bool) -> Self {
        if negative { f32::NEG_INFINITY } else { f32::INFINITY }
    }

    fn max_finite() -> Self {
        f32::MAX
    }
}

impl AnomalyFloat for f64 {
    fn nan() -> Self {
        f64::NAN
    }

    fn infinity(negative: bool) -> Self {
        if negative { f64::NEG_INFINITY } else { f64::INFINITY }
    }

    fn max_finite() -> Self {
        f64::MAX
    }
}

/// Counters since the injector was built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InjectionStats {
    pub invocations: u64,
    pub elements_seen: u64,
    pub elements_corrupted: u64,
    pub nan_written: u64,
    pub alternate_written: u64,
}

pub struct Injector {
    config: InjectionConfig,
    seed: u64,
    rng: StdRng,
    stats: InjectionStats,
}

impl Injector {
    pub fn new(config: InjectionConfig) -> Self {
        let seed = config.seed().unwrap_or_else(process_seed);
        Self {
            config,
            seed,
            rng: StdRng::seed_from_u64(seed),
            stats: InjectionStats::default(),
        }
    }

    pub fn config(&self) -> &InjectionConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stats(&self) -> InjectionStats {
        self.stats
    }

    /// Corrupt every eligible tensor reachable from `input`.
    pub fn inject<C: Corruptible + ?Sized>(&mut self, input: &mut C) {
        self.stats.invocations += 1;
        if !self.config.is_enabled() {
            return;
        }
        input.corrupt_with(self);
    }

    /// Corrupt a run of elements, visited in iteration order.
    pub fn corrupt<'a, T, I>(&mut self, elements: I)
    where
        T: AnomalyFloat + 'a,
        I: IntoIterator<Item = &'a mut T>,
    {
        let probability = self.config.corruption_probability();
        if probability <= 0.0 {
            return;
        }

        let nan_fraction = self.config.nan_fraction();
        // None: sign drawn per element
        let fixed = match self.config.alternate() {
            AlternateValue::PositiveInfinity => Some(T::infinity(false)),
            AlternateValue::NegativeInfinity => Some(T::infinity(true)),
            AlternateValue::Extreme => Some(T::max_finite()),
            AlternateValue::MixedInfinity => None,
        };

        for element in elements {
            self.stats.elements_seen += 1;
            if self.rng.gen::<f64>() >= probability {
                continue;
            }

            self.stats.elements_corrupted += 1;
            if self.rng.gen::<f64>() < nan_fraction {
                *element = T::nan();
                self.stats.nan_written += 1;
            } else {
                *element = match fixed {
                    Some(value) => value,
                    None => T::infinity(self.rng.gen::<bool>()),
                };
                self.stats.alternate_written += 1;
            }
        }
    }
}

/// Inputs the injector can reach into.
///
/// Implemented for ndarray arrays with mutable storage and for the usual
/// containers of them. Non-tensor arguments go through [`Passthrough`].
pub trait Corruptible {
    fn corrupt_with(&mut self, injector: &mut Injector);
}

impl<A, S, D> Corruptible for ArrayBase<S, D>
where
    A: AnomalyFloat,
    S: DataMut<Elem = A>,
    D: Dimension,
{
    fn corrupt_with(&mut self, injector: &mut Injector) {
        if self.is_empty() {
            return;
        }
        injector.corrupt(self.iter_mut());
    }
}

impl<T: Corruptible> Corruptible for [T] {
    fn corrupt_with(&mut self, injector: &mut Injector) {
        for item in self.iter_mut() {
            item.corrupt_with(injector);
        }
    }
}

impl<T: Corruptible> Corruptible for Vec<T> {
    fn corrupt_with(&mut self, injector: &mut Injector) {
        self.as_mut_slice().corrupt_with(injector);
    }
}

impl<T: Corruptible> Corruptible for Option<T> {
    fn corrupt_with(&mut self, injector: &mut Injector) {
        if let Some(inner) = self {
            inner.corrupt_with(injector);
        }
    }
}

impl<T: Corruptible + ?Sized> Corruptible for &mut T {
    fn corrupt_with(&mut self, injector: &mut Injector) {
        (**self).corrupt_with(injector);
    }
}

/// Argument that is never corrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Passthrough<T>(pub T);

impl<T> Corruptible for Passthrough<T> {
    fn corrupt_with(&mut self, _injector: &mut Injector) {}
}

macro_rules! passthrough_scalars {
    ($($ty:ty),*) => {
        $(impl Corruptible for $ty {
            fn corrupt_with(&mut self, _injector: &mut Injector) {}
        })*
    };
}

passthrough_scalars!((), bool, usize, u32, i64);

macro_rules! corruptible_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Corruptible),+> Corruptible for ($($name,)+) {
            fn corrupt_with(&mut self, injector: &mut Injector) {
                $(self.$idx.corrupt_with(injector);)+
            }
        }
    };
}

corruptible_tuple!(A: 0);
corruptible_tuple!(A: 0, B: 1);
corruptible_tuple!(A: 0, B: 1, C: 2);
corruptible_tuple!(A: 0, B: 1, C: 2, E: 3);
