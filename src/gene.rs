//! Gene model capability traits.
//!
//! A gene is one row of a genome table: a fixed-attribute prefix that
//! identifies it (node key, or connection endpoints) followed by the custom
//! attributes that evolve. Concrete gene kinds describe their layout and the
//! operators acting on the custom suffix:
//! - [`NodeGene`]: fixed prefix `[index]`
//! - [`ConnGene`]: fixed prefix `[input_index, output_index]`
//!
//! Operators take and return custom attributes only; the fixed prefix is
//! managed by the table utilities in [`crate::table`].

use std::fmt::Debug;

use ndarray::ArrayView1;
use rand::Rng;

use crate::error::Result;
use crate::hashing::hash_row;

/// Fixed attributes of every node gene.
pub const NODE_FIXED_ATTRS: &[&str] = &["index"];

/// Fixed attributes of every connection gene.
pub const CONN_FIXED_ATTRS: &[&str] = &["input_index", "output_index"];

/// Operators shared by node and connection genes.
pub trait Gene: Clone + Debug + Send + Sync {
    /// Identity-defining columns, in table order.
    fn fixed_attrs(&self) -> &'static [&'static str];

    /// Evolvable columns, in table order.
    fn custom_attrs(&self) -> &'static [&'static str];

    /// Check the gene's hyperparameters.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Row width of this gene kind.
    fn length(&self) -> usize {
        self.fixed_attrs().len() + self.custom_attrs().len()
    }

    /// Custom attributes for a freshly initialised gene.
    fn new_random_attrs<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32>;

    /// Custom attributes that leave the network function unchanged.
    fn new_identity_attrs(&self) -> Vec<f32>;

    /// Per-attribute stochastic update, bounds applied.
    fn mutate<R: Rng + ?Sized>(&self, rng: &mut R, attrs: &[f32]) -> Vec<f32>;

    /// Independent fair coin per attribute between the two parents.
    fn crossover<R: Rng + ?Sized>(&self, rng: &mut R, attrs1: &[f32], attrs2: &[f32]) -> Vec<f32> {
        attrs1
            .iter()
            .zip(attrs2)
            .map(|(&a, &b)| if rng.random_bool(0.5) { a } else { b })
            .collect()
    }

    /// Compatibility distance between two homologous genes.
    fn distance(&self, attrs1: &[f32], attrs2: &[f32]) -> f32;

    /// One-line rendering of a full row (fixed prefix included).
    fn repr(&self, row: ArrayView1<'_, f32>, precision: usize) -> String;

    /// Deterministic hash of a full row.
    fn hash(&self, row: ArrayView1<'_, f32>) -> u32 {
        hash_row(row)
    }
}

/// A gene stored in the node table.
pub trait NodeGene: Gene {
    /// Combine the values arriving over incoming connections.
    ///
    /// Output nodes skip the activation; the genome applies its own output
    /// transform instead.
    fn forward(&self, attrs: &[f32], inputs: &[f32], is_output_node: bool) -> f32;
}

/// A gene stored in the connection table.
pub trait ConnGene: Gene {
    /// Transform the value travelling over this connection.
    fn forward(&self, attrs: &[f32], input: f32) -> f32;
}
