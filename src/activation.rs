//! Activation and aggregation function tables.
//!
//! Node genes never store functions, only the integer id of an entry in one
//! of these tables. Ids are the position in [`Activation::ALL`] /
//! [`Aggregation::ALL`] and must stay stable once genomes are persisted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NeatError;

/// Output multiplier of the scaled sigmoid and tanh variants.
const SCALE: f32 = 3.0;

/// Slope of [`Activation::LeakyReLU`] for negative inputs.
const LEAKY_SLOPE: f32 = 0.005;

/// Smallest magnitude fed to `inv` and `log`.
const EPSILON: f32 = 1e-7;

/// Unary activation functions available to node genes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// f(x) = x
    #[default]
    Identity,
    /// f(x) = 1 / (1 + e^(-x))
    Sigmoid,
    /// Sigmoid scaled to (0, 3).
    ScaledSigmoid,
    /// f(x) = tanh(x)
    Tanh,
    /// Tanh scaled to (-3, 3).
    ScaledTanh,
    /// f(x) = sin(x)
    #[serde(rename = "sin")]
    Sine,
    /// f(x) = max(0, x)
    #[serde(rename = "relu")]
    ReLU,
    /// `f(x) = x` if `x > 0` else `0.005x`
    #[serde(rename = "lelu")]
    LeakyReLU,
    /// f(x) = 1 / x, with |x| floored at 1e-7
    Inv,
    /// f(x) = ln(x), with x floored at 1e-7
    Log,
    /// f(x) = e^x
    Exp,
    /// f(x) = |x|
    Abs,
}

impl Activation {
    /// Every activation, indexed by id.
    pub const ALL: [Self; 12] = [
        Self::Identity,
        Self::Sigmoid,
        Self::ScaledSigmoid,
        Self::Tanh,
        Self::ScaledTanh,
        Self::Sine,
        Self::ReLU,
        Self::LeakyReLU,
        Self::Inv,
        Self::Log,
        Self::Exp,
        Self::Abs,
    ];

    /// Stable id stored in a node row.
    #[inline]
    #[must_use]
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Resolve an id read back from a table column.
    #[must_use]
    pub fn from_id(id: f32) -> Option<Self> {
        if !id.is_finite() || id < 0.0 || id.fract() != 0.0 {
            return None;
        }
        Self::ALL.get(id as usize).copied()
    }

    /// Name used in configuration files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Sigmoid => "sigmoid",
            Self::ScaledSigmoid => "scaled_sigmoid",
            Self::Tanh => "tanh",
            Self::ScaledTanh => "scaled_tanh",
            Self::Sine => "sin",
            Self::ReLU => "relu",
            Self::LeakyReLU => "lelu",
            Self::Inv => "inv",
            Self::Log => "log",
            Self::Exp => "exp",
            Self::Abs => "abs",
        }
    }

    /// Apply this activation function to an input value.
    ///
    /// NaN propagates unchanged.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f32) -> f32 {
        if x.is_nan() {
            return f32::NAN;
        }

        match self {
            Self::Identity => x,
            Self::Sigmoid => sigmoid(x),
            Self::ScaledSigmoid => sigmoid(x) * SCALE,
            Self::Tanh => x.tanh(),
            Self::ScaledTanh => x.tanh() * SCALE,
            Self::Sine => {
                if x.is_infinite() {
                    return 0.0;
                }
                x.sin()
            }
            Self::ReLU => x.max(0.0),
            Self::LeakyReLU => {
                if x > 0.0 {
                    x
                } else {
                    LEAKY_SLOPE * x
                }
            }
            Self::Inv => {
                let z = if x > 0.0 {
                    x.max(EPSILON)
                } else {
                    x.min(-EPSILON)
                };
                1.0 / z
            }
            Self::Log => x.max(EPSILON).ln(),
            Self::Exp => x.exp(),
            Self::Abs => x.abs(),
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    // exp overflows past ±88 in f32
    let clamped = x.clamp(-88.0, 88.0);
    1.0 / (1.0 + (-clamped).exp())
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = NeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| NeatError::UnknownFunction(s.to_owned()))
    }
}

/// Reducing functions that combine a node's incoming values.
///
/// NaN entries are skipped. An empty or all-NaN input aggregates to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Sum,
    Product,
    Max,
    Min,
    /// The input with the largest magnitude, sign preserved.
    #[serde(rename = "maxabs")]
    MaxAbs,
    Mean,
}

impl Aggregation {
    /// Every aggregation, indexed by id.
    pub const ALL: [Self; 6] = [
        Self::Sum,
        Self::Product,
        Self::Max,
        Self::Min,
        Self::MaxAbs,
        Self::Mean,
    ];

    #[inline]
    #[must_use]
    pub fn id(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub fn from_id(id: f32) -> Option<Self> {
        if !id.is_finite() || id < 0.0 || id.fract() != 0.0 {
            return None;
        }
        Self::ALL.get(id as usize).copied()
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Product => "product",
            Self::Max => "max",
            Self::Min => "min",
            Self::MaxAbs => "maxabs",
            Self::Mean => "mean",
        }
    }

    /// Reduce `inputs` to a single value.
    #[must_use]
    pub fn apply(self, inputs: &[f32]) -> f32 {
        let mut valid = inputs.iter().copied().filter(|v| !v.is_nan()).peekable();
        if valid.peek().is_none() {
            return 0.0;
        }

        match self {
            Self::Sum => valid.sum(),
            Self::Product => valid.product(),
            Self::Max => valid.fold(f32::NEG_INFINITY, f32::max),
            Self::Min => valid.fold(f32::INFINITY, f32::min),
            Self::MaxAbs => valid.fold(0.0, |best, v| if v.abs() > best.abs() { v } else { best }),
            Self::Mean => {
                let (sum, count) = valid.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                sum / count as f32
            }
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregation {
    type Err = NeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| NeatError::UnknownFunction(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_match_table_position() {
        for (i, act) in Activation::ALL.iter().enumerate() {
            assert_eq!(act.id() as usize, i);
            assert_eq!(Activation::from_id(i as f32), Some(*act));
        }
        for (i, agg) in Aggregation::ALL.iter().enumerate() {
            assert_eq!(agg.id() as usize, i);
            assert_eq!(Aggregation::from_id(i as f32), Some(*agg));
        }
        assert_eq!(Activation::from_id(f32::NAN), None);
        assert_eq!(Activation::from_id(1.5), None);
        assert_eq!(Aggregation::from_id(99.0), None);
    }

    #[test]
    fn test_sigmoid_variants() {
        assert!((Activation::Sigmoid.apply(0.0) - 0.5).abs() < 1e-6);
        assert!((Activation::ScaledSigmoid.apply(0.0) - 1.5).abs() < 1e-6);
        assert!(Activation::Sigmoid.apply(1000.0) <= 1.0);
        assert!(Activation::Sigmoid.apply(-1000.0) >= 0.0);
    }

    #[test]
    fn test_tanh_variants() {
        assert!(Activation::Tanh.apply(0.0).abs() < 1e-6);
        assert!(Activation::ScaledTanh.apply(10.0) > 2.99);
    }

    #[test]
    fn test_relu_family() {
        assert!((Activation::ReLU.apply(-0.5)).abs() < 1e-6);
        assert!((Activation::LeakyReLU.apply(-1.0) + 0.005).abs() < 1e-6);
        assert!((Activation::LeakyReLU.apply(2.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_inv_and_log_are_finite_at_zero() {
        assert!(Activation::Inv.apply(0.0).is_finite());
        assert!(Activation::Log.apply(0.0).is_finite());
        assert!(Activation::Log.apply(-3.0).is_finite());
        assert!((Activation::Inv.apply(2.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_nan_propagates() {
        for act in Activation::ALL {
            assert!(act.apply(f32::NAN).is_nan(), "{act} should propagate NaN");
        }
    }

    #[test]
    fn test_aggregations() {
        let xs = [1.0, -4.0, f32::NAN, 2.0];
        assert!((Aggregation::Sum.apply(&xs) - -1.0).abs() < 1e-6);
        assert!((Aggregation::Product.apply(&xs) - -8.0).abs() < 1e-6);
        assert!((Aggregation::Max.apply(&xs) - 2.0).abs() < 1e-6);
        assert!((Aggregation::Min.apply(&xs) - -4.0).abs() < 1e-6);
        assert!((Aggregation::MaxAbs.apply(&xs) - -4.0).abs() < 1e-6);
        assert!((Aggregation::Mean.apply(&xs) - (-1.0 / 3.0)).abs() < 1e-6);
    }

    #[test]
    fn test_empty_aggregation_is_zero() {
        for agg in Aggregation::ALL {
            assert_eq!(agg.apply(&[]), 0.0);
            assert_eq!(agg.apply(&[f32::NAN]), 0.0);
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("lelu".parse::<Activation>(), Ok(Activation::LeakyReLU));
        assert_eq!("maxabs".parse::<Aggregation>(), Ok(Aggregation::MaxAbs));
        assert!(matches!(
            "softmax".parse::<Activation>(),
            Err(NeatError::UnknownFunction(_))
        ));
    }
}
