//! Hyperparameters and stochastic operators for single gene attributes.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{NeatError, Result};

/// A continuous attribute such as a bias or a weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatAttr {
    /// Mean of the initialisation distribution.
    pub init_mean: f32,
    /// Standard deviation of the initialisation distribution; 0 pins the value to the mean.
    pub init_std: f32,
    /// Standard deviation of the perturbation noise.
    pub mutate_power: f32,
    /// Probability of perturbing the value.
    pub mutate_rate: f32,
    /// Probability of drawing a fresh value instead.
    pub replace_rate: f32,
    pub lower_bound: f32,
    pub upper_bound: f32,
}

impl FloatAttr {
    /// NEAT-python style defaults: N(0, 1) init, clamped to [-5, 5].
    #[must_use]
    pub fn standard() -> Self {
        Self {
            init_mean: 0.0,
            init_std: 1.0,
            mutate_power: 0.15,
            mutate_rate: 0.2,
            replace_rate: 0.015,
            lower_bound: -5.0,
            upper_bound: 5.0,
        }
    }

    /// Clamp `value` into the configured bounds.
    #[inline]
    #[must_use]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.lower_bound, self.upper_bound)
    }

    /// Draw a value from the initialisation distribution.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let z: f32 = rng.sample(StandardNormal);
        self.clamp(self.init_mean + z * self.init_std)
    }

    /// Perturb, replace or keep `value`, decided by a single uniform draw.
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, value: f32) -> f32 {
        let r: f32 = rng.random();
        let next = if r < self.mutate_rate {
            let z: f32 = rng.sample(StandardNormal);
            value + z * self.mutate_power
        } else if r < self.mutate_rate + self.replace_rate {
            self.sample(rng)
        } else {
            value
        };
        self.clamp(next)
    }

    /// Reject bounds and rates that would make sampling or mutation meaningless.
    pub fn validate(&self, name: &str) -> Result<()> {
        let fields = [
            self.init_mean,
            self.init_std,
            self.mutate_power,
            self.mutate_rate,
            self.replace_rate,
            self.lower_bound,
            self.upper_bound,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(NeatError::InvalidConfig(format!(
                "{name}: all parameters must be finite"
            )));
        }
        if self.lower_bound > self.upper_bound {
            return Err(NeatError::InvalidConfig(format!(
                "{name}: lower_bound {} exceeds upper_bound {}",
                self.lower_bound, self.upper_bound
            )));
        }
        if self.init_std < 0.0 || self.mutate_power < 0.0 {
            return Err(NeatError::InvalidConfig(format!(
                "{name}: init_std and mutate_power must be non-negative"
            )));
        }
        check_probability(name, "mutate_rate", self.mutate_rate)?;
        check_probability(name, "replace_rate", self.replace_rate)?;
        if self.mutate_rate + self.replace_rate > 1.0 {
            return Err(NeatError::InvalidConfig(format!(
                "{name}: mutate_rate + replace_rate exceeds 1"
            )));
        }
        Ok(())
    }
}

impl Default for FloatAttr {
    fn default() -> Self {
        Self::standard()
    }
}

/// A discrete attribute drawn from a fixed set of options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceAttr<T> {
    pub options: Vec<T>,
    /// Probability of replacing the value with a uniformly chosen option.
    pub replace_rate: f32,
    /// Value used for identity genes.
    pub default: T,
}

impl<T: Copy + PartialEq> ChoiceAttr<T> {
    /// A single-option attribute that never changes.
    #[must_use]
    pub fn fixed(value: T) -> Self {
        Self {
            options: vec![value],
            replace_rate: 0.0,
            default: value,
        }
    }

    /// Pick an option uniformly; falls back to the default when there are none.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        if self.options.is_empty() {
            return self.default;
        }
        self.options[rng.random_range(0..self.options.len())]
    }

    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, value: T) -> T {
        let r: f32 = rng.random();
        if r < self.replace_rate {
            self.sample(rng)
        } else {
            value
        }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.options.is_empty() {
            return Err(NeatError::InvalidConfig(format!(
                "{name}: options must not be empty"
            )));
        }
        if !self.options.contains(&self.default) {
            return Err(NeatError::InvalidConfig(format!(
                "{name}: default is not one of the options"
            )));
        }
        check_probability(name, "replace_rate", self.replace_rate)
    }
}

pub(crate) fn check_probability(scope: &str, field: &str, p: f32) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(NeatError::InvalidConfig(format!(
            "{scope}: {field} must be within [0, 1], got {p}"
        )))
    }
}
