//! The default node gene, matching NEAT-python semantics.

use ndarray::ArrayView1;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activation::{Activation, Aggregation};
use crate::attribute::{ChoiceAttr, FloatAttr};
use crate::error::Result;
use crate::gene::{Gene, NodeGene, NODE_FIXED_ATTRS};

const BIAS: usize = 0;
const RESPONSE: usize = 1;
const AGGREGATION: usize = 2;
const ACTIVATION: usize = 3;

/// Node gene with `bias`, `response`, `aggregation` and `activation` columns.
///
/// Evaluates `activation(bias + response * aggregation(inputs))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultNodeGene {
    pub bias: FloatAttr,
    pub response: FloatAttr,
    pub aggregation: ChoiceAttr<Aggregation>,
    pub activation: ChoiceAttr<Activation>,
}

impl Default for DefaultNodeGene {
    fn default() -> Self {
        Self {
            bias: FloatAttr::standard(),
            response: FloatAttr {
                init_mean: 1.0,
                init_std: 0.0,
                ..FloatAttr::standard()
            },
            aggregation: ChoiceAttr {
                options: vec![Aggregation::Sum],
                replace_rate: 0.1,
                default: Aggregation::Sum,
            },
            activation: ChoiceAttr {
                options: vec![Activation::Sigmoid],
                replace_rate: 0.1,
                default: Activation::Sigmoid,
            },
        }
    }
}

impl DefaultNodeGene {
    fn aggregation_of(&self, attrs: &[f32]) -> Aggregation {
        Aggregation::from_id(attrs[AGGREGATION]).unwrap_or(self.aggregation.default)
    }

    fn activation_of(attrs: &[f32]) -> Activation {
        Activation::from_id(attrs[ACTIVATION]).unwrap_or_default()
    }
}

impl Gene for DefaultNodeGene {
    fn fixed_attrs(&self) -> &'static [&'static str] {
        NODE_FIXED_ATTRS
    }

    fn custom_attrs(&self) -> &'static [&'static str] {
        &["bias", "response", "aggregation", "activation"]
    }

    fn validate(&self) -> Result<()> {
        self.bias.validate("bias")?;
        self.response.validate("response")?;
        self.aggregation.validate("aggregation")?;
        self.activation.validate("activation")
    }

    fn new_random_attrs<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        vec![
            self.bias.sample(rng),
            self.response.sample(rng),
            self.aggregation.sample(rng).id() as f32,
            self.activation.sample(rng).id() as f32,
        ]
    }

    fn new_identity_attrs(&self) -> Vec<f32> {
        vec![
            0.0,
            1.0,
            self.aggregation.default.id() as f32,
            Activation::Identity.id() as f32,
        ]
    }

    fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, attrs: &[f32]) -> Vec<f32> {
        let aggregation = self.aggregation.mutate(rng, self.aggregation_of(attrs));
        let activation = self.activation.mutate(rng, Self::activation_of(attrs));
        vec![
            self.bias.mutate(rng, attrs[BIAS]),
            self.response.mutate(rng, attrs[RESPONSE]),
            aggregation.id() as f32,
            activation.id() as f32,
        ]
    }

    fn distance(&self, attrs1: &[f32], attrs2: &[f32]) -> f32 {
        let bias = (attrs1[BIAS] - attrs2[BIAS]).abs();
        let response = (attrs1[RESPONSE] - attrs2[RESPONSE]).abs();
        let aggregation = f32::from(u8::from(attrs1[AGGREGATION] != attrs2[AGGREGATION]));
        let activation = f32::from(u8::from(attrs1[ACTIVATION] != attrs2[ACTIVATION]));
        bias + response + aggregation + activation
    }

    fn repr(&self, row: ArrayView1<'_, f32>, precision: usize) -> String {
        let attrs: Vec<f32> = row.iter().skip(NODE_FIXED_ATTRS.len()).copied().collect();
        format!(
            "node(key: {}, bias: {:.p$}, response: {:.p$}, aggregation: {}, activation: {})",
            row[0],
            attrs[BIAS],
            attrs[RESPONSE],
            self.aggregation_of(&attrs),
            Self::activation_of(&attrs),
            p = precision,
        )
    }
}

impl NodeGene for DefaultNodeGene {
    fn forward(&self, attrs: &[f32], inputs: &[f32], is_output_node: bool) -> f32 {
        let z = self.aggregation_of(attrs).apply(inputs);
        let z = attrs[BIAS] + attrs[RESPONSE] * z;
        if is_output_node {
            z
        } else {
            Self::activation_of(attrs).apply(z)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_identity_attrs_pass_through() {
        let gene = DefaultNodeGene::default();
        let attrs = gene.new_identity_attrs();
        for x in [-3.0, 0.0, 0.25, 4.0] {
            assert!((gene.forward(&attrs, &[x], false) - x).abs() < 1e-6);
        }
    }

    #[test]
    fn test_random_attrs_respect_options() {
        let gene = DefaultNodeGene {
            activation: ChoiceAttr {
                options: vec![Activation::Tanh, Activation::ReLU],
                replace_rate: 0.1,
                default: Activation::Tanh,
            },
            ..DefaultNodeGene::default()
        };
        let mut rng = test_rng();
        for _ in 0..50 {
            let attrs = gene.new_random_attrs(&mut rng);
            assert_eq!(attrs.len(), gene.custom_attrs().len());
            assert!((attrs[RESPONSE] - 1.0).abs() < 1e-6);
            let act = Activation::from_id(attrs[ACTIVATION]).unwrap();
            assert!(gene.activation.options.contains(&act));
        }
    }

    #[test]
    fn test_mutation_respects_bounds() {
        let gene = DefaultNodeGene {
            bias: FloatAttr {
                mutate_rate: 1.0,
                replace_rate: 0.0,
                mutate_power: 10.0,
                ..FloatAttr::standard()
            },
            ..DefaultNodeGene::default()
        };
        let mut rng = test_rng();
        let mut attrs = gene.new_random_attrs(&mut rng);
        for _ in 0..1_000 {
            attrs = gene.mutate(&mut rng, &attrs);
            assert!((-5.0..=5.0).contains(&attrs[BIAS]));
            assert!((-5.0..=5.0).contains(&attrs[RESPONSE]));
        }
    }

    #[test]
    fn test_forward_output_node_skips_activation() {
        let gene = DefaultNodeGene::default();
        let attrs = vec![0.5, 2.0, Aggregation::Sum.id() as f32, Activation::Sigmoid.id() as f32];

        let raw = gene.forward(&attrs, &[1.0, 0.5], true);
        assert!((raw - 3.5).abs() < 1e-6);

        let activated = gene.forward(&attrs, &[1.0, 0.5], false);
        assert!((activated - Activation::Sigmoid.apply(3.5)).abs() < 1e-6);
    }

    #[test]
    fn test_distance() {
        let gene = DefaultNodeGene::default();
        let a = vec![0.0, 1.0, 0.0, 1.0];
        let b = vec![0.5, 0.5, 0.0, 3.0];
        assert!((gene.distance(&a, &b) - 2.0).abs() < 1e-6);
        assert_eq!(gene.distance(&a, &a), 0.0);
    }

    #[test]
    fn test_repr() {
        let gene = DefaultNodeGene::default();
        let row = ndarray::arr1(&[4.0_f32, 0.25, 1.0, 0.0, 1.0]);
        assert_eq!(
            gene.repr(row.view(), 2),
            "node(key: 4, bias: 0.25, response: 1.00, aggregation: sum, activation: sigmoid)"
        );
    }
}
