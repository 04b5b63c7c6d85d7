//! Injection Wrapper
//!
//! Proxy around a forward computation. The proxy implements [`Forward`] with
//! the same input and output types as the wrapped model, so it can stand in
//! for it anywhere. Corruption happens before the inner call runs.

use parking_lot::Mutex;

use super::config::InjectionConfig;
use super::injector::{Corruptible, InjectionStats, Injector};

/// A model's forward computation
pub trait Forward<I> {
    type Output;

    fn forward(&self, input: I) -> Self::Output;
}

impl<I, O, F> Forward<I> for F
where
    F: Fn(I) -> O,
{
    type Output = O;

    fn forward(&self, input: I) -> O {
        self(input)
    }
}

/// `inner` with corruption applied to its inputs on every call
pub struct Injected<M> {
    inner: M,
    injector: Mutex<Injector>,
}

impl<M> Injected<M> {
    pub fn new(inner: M, config: InjectionConfig) -> Self {
        let injector = Injector::new(config);
        if config.is_enabled() {
            log::info!(
                "Injection enabled: p={} nan_fraction={} alternate={} seed={}",
                config.corruption_probability(),
                config.nan_fraction(),
                config.alternate(),
                injector.seed()
            );
        } else {
            log::debug!("Injection wrapper installed with corruption disabled");
        }

        Self { inner, injector: Mutex::new(injector) }
    }

    pub fn stats(&self) -> InjectionStats {
        self.injector.lock().stats()
    }

    pub fn config(&self) -> InjectionConfig {
        *self.injector.lock().config()
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<I, M> Forward<I> for Injected<M>
where
    I: Corruptible,
    M: Forward<I>,
{
    type Output = M::Output;

    fn forward(&self, mut input: I) -> M::Output {
        self.injector.lock().inject(&mut input);
        self.inner.forward(input)
    }
}

/// Wrap `inner` once at setup time.
pub fn inject<M>(config: InjectionConfig, inner: M) -> Injected<M> {
    Injected::new(inner, config)
}
