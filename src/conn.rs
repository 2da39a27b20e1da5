//! The default connection gene: a single evolvable weight.

use ndarray::ArrayView1;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::attribute::FloatAttr;
use crate::error::Result;
use crate::gene::{ConnGene, Gene, CONN_FIXED_ATTRS};

const WEIGHT: usize = 0;

/// Connection gene that scales the travelling value by `weight`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultConnGene {
    pub weight: FloatAttr,
}

impl Default for DefaultConnGene {
    fn default() -> Self {
        Self {
            weight: FloatAttr::standard(),
        }
    }
}

impl Gene for DefaultConnGene {
    fn fixed_attrs(&self) -> &'static [&'static str] {
        CONN_FIXED_ATTRS
    }

    fn custom_attrs(&self) -> &'static [&'static str] {
        &["weight"]
    }

    fn validate(&self) -> Result<()> {
        self.weight.validate("weight")
    }

    fn new_random_attrs<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        vec![self.weight.sample(rng)]
    }

    fn new_identity_attrs(&self) -> Vec<f32> {
        vec![1.0]
    }

    fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, attrs: &[f32]) -> Vec<f32> {
        vec![self.weight.mutate(rng, attrs[WEIGHT])]
    }

    fn distance(&self, attrs1: &[f32], attrs2: &[f32]) -> f32 {
        (attrs1[WEIGHT] - attrs2[WEIGHT]).abs()
    }

    fn repr(&self, row: ArrayView1<'_, f32>, precision: usize) -> String {
        format!(
            "conn(in: {}, out: {}, weight: {:.p$})",
            row[0],
            row[1],
            row[CONN_FIXED_ATTRS.len() + WEIGHT],
            p = precision,
        )
    }
}

impl ConnGene for DefaultConnGene {
    #[inline]
    fn forward(&self, attrs: &[f32], input: f32) -> f32 {
        input * attrs[WEIGHT]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_identity_weight() {
        let gene = DefaultConnGene::default();
        let attrs = gene.new_identity_attrs();
        assert_eq!(gene.forward(&attrs, 0.7), 0.7);
    }

    #[test]
    fn test_weight_bounds_under_mutation() {
        let gene = DefaultConnGene {
            weight: FloatAttr {
                lower_bound: -1.0,
                upper_bound: 1.0,
                mutate_rate: 0.9,
                replace_rate: 0.1,
                mutate_power: 5.0,
                ..FloatAttr::standard()
            },
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut attrs = gene.new_random_attrs(&mut rng);
        for _ in 0..2_000 {
            attrs = gene.mutate(&mut rng, &attrs);
            assert!((-1.0..=1.0).contains(&attrs[WEIGHT]));
        }
    }

    #[test]
    fn test_distance_and_repr() {
        let gene = DefaultConnGene::default();
        assert!((gene.distance(&[0.5], &[-0.25]) - 0.75).abs() < 1e-6);

        let row = ndarray::arr1(&[0.0_f32, 3.0, -0.5]);
        assert_eq!(gene.repr(row.view(), 1), "conn(in: 0, out: 3, weight: -0.5)");
    }
}
