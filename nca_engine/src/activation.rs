/// Engine v1 — Activation Functions
///
/// Pure elementwise real→real maps applied after convolution.
/// The engine clips afterwards, so outputs outside [0, 1] are fine.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// An injectable, side-effect-free cell transform.
pub trait Activation: Send + Sync {
    fn apply(&self, x: f64) -> f64;
}

impl<A: Activation + ?Sized> Activation for Box<A> {
    fn apply(&self, x: f64) -> f64 {
        (**self).apply(x)
    }
}

impl<A: Activation + ?Sized> Activation for Arc<A> {
    fn apply(&self, x: f64) -> f64 {
        (**self).apply(x)
    }
}

/// `f(x) = x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Activation for Identity {
    fn apply(&self, x: f64) -> f64 {
        x
    }
}

/// `f(x) = sin(|x / 2|)` — the moho growth rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinAbsHalf;

impl Activation for SinAbsHalf {
    fn apply(&self, x: f64) -> f64 {
        (x / 2.0).abs().sin()
    }
}

/// Logistic sigmoid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl Activation for Sigmoid {
    fn apply(&self, x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tanh;

impl Activation for Tanh {
    fn apply(&self, x: f64) -> f64 {
        x.tanh()
    }
}

/// Bell curve peaking at 1 when `x == mean`.
#[derive(Debug, Clone, Copy)]
pub struct Gaussian {
    pub mean: f64,
    pub std: f64,
}

impl Activation for Gaussian {
    fn apply(&self, x: f64) -> f64 {
        let d = x - self.mean;
        (-(d * d) / (2.0 * self.std * self.std)).exp()
    }
}

/// Ignores its input.
#[derive(Debug, Clone, Copy)]
pub struct Constant(pub f64);

impl Activation for Constant {
    fn apply(&self, _x: f64) -> f64 {
        self.0
    }
}

/// Adapter for any thread-safe closure.
pub struct FnActivation<F>(pub F);

impl<F> Activation for FnActivation<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn apply(&self, x: f64) -> f64 {
        (self.0)(x)
    }
}

impl<F> fmt::Debug for FnActivation<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnActivation(..)")
    }
}

/// Named activation, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivationSpec {
    Identity,
    SinAbsHalf,
    Sigmoid,
    Tanh,
    Gaussian { mean: f64, std: f64 },
    Constant { value: f64 },
}

impl Default for ActivationSpec {
    fn default() -> Self {
        ActivationSpec::SinAbsHalf
    }
}

impl ActivationSpec {
    /// Instantiate the described activation.
    pub fn build(&self) -> Box<dyn Activation> {
        match *self {
            ActivationSpec::Identity => Box::new(Identity),
            ActivationSpec::SinAbsHalf => Box::new(SinAbsHalf),
            ActivationSpec::Sigmoid => Box::new(Sigmoid),
            ActivationSpec::Tanh => Box::new(Tanh),
            ActivationSpec::Gaussian { mean, std } => Box::new(Gaussian { mean, std }),
            ActivationSpec::Constant { value } => Box::new(Constant(value)),
        }
    }
}
