//! # Tensor NEAT
//!
//! A NeuroEvolution of Augmenting Topologies (NEAT) core that stores every
//! genome as two fixed-capacity `f32` tables instead of a pointer graph.
//!
//! ## Features
//!
//! - **Tensor Genomes**: node and connection tables of fixed shape, NaN rows as
//!   free slots, so every genome of a population has the same memory layout
//! - **Pluggable Genes**: the [`Gene`], [`NodeGene`] and [`ConnGene`] traits
//!   describe row layout and per-gene operators; [`DefaultNodeGene`] and
//!   [`DefaultConnGene`] follow NEAT-python semantics
//! - **Homology by Key**: crossover and distance match genes by their fixed
//!   attributes (node key, connection endpoints), no innovation counter needed
//! - **Explicit Randomness**: every stochastic operator takes a generator and
//!   splits it into independent ChaCha streams, so runs are reproducible
//! - **Genotype Trait**: [`Genome`] implements `symbios_genetics::Genotype`
//!
//! ## Quick Start
//!
//! ```rust
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use tensor_neat::{DefaultConnGene, DefaultNodeGene, NeatConfig, Population};
//!
//! let config = NeatConfig::minimal(2, 1);
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let mut population = Population::new(
//!     &config,
//!     DefaultNodeGene::default(),
//!     DefaultConnGene::default(),
//!     &mut rng,
//! )
//! .unwrap();
//!
//! let ids: Vec<_> = population.ids().collect();
//! let child = population.crossover(ids[0], ids[1], &mut rng).unwrap();
//! let child_id = population.insert(child).unwrap();
//! population.mutate(child_id, &mut rng).unwrap();
//!
//! let mut network = population.transform(child_id).unwrap();
//! let output = network.forward(&[0.5, -0.5]).unwrap();
//! assert_eq!(output.len(), 1);
//! ```
//!
//! ## Architecture
//!
//! ### Table Layout
//!
//! | table | shape | fixed columns | custom columns (defaults) |
//! |-------|-------|---------------|---------------------------|
//! | nodes | `[max_nodes, 5]` | key | bias, response, aggregation id, activation id |
//! | conns | `[max_conns, 3]` | input key, output key | weight |
//!
//! Index-valued results (unflattened adjacency, topological order) use the
//! integer sentinel [`I_INF`]; key lookups return `Option`.
//!
//! ### Operators
//!
//! - [`graph`]: Kahn ordering with lowest-index tie-break, reachability cycle check
//! - [`crossover`]: one-sided crossover, the fitter parent decides the structure
//! - [`mutation`]: add/delete node and connection, then per-row value mutation
//! - [`distance`]: disjoint count plus weighted attribute distance
//! - [`network`]: feed-forward compilation and evaluation

pub mod activation;
pub mod attribute;
pub mod config;
pub mod conn;
pub mod crossover;
pub mod distance;
pub mod error;
pub mod gene;
pub mod genome;
pub mod graph;
pub mod hashing;
pub mod mutation;
pub mod network;
pub mod node;
pub mod population;
pub mod random;
pub mod table;

// Re-exports for convenience
pub use activation::{Activation, Aggregation};
pub use attribute::{ChoiceAttr, FloatAttr};
pub use config::NeatConfig;
pub use conn::DefaultConnGene;
pub use distance::DistanceConfig;
pub use error::{NeatError, Result, TableKind};
pub use gene::{ConnGene, Gene, NodeGene};
pub use genome::{Genome, GenomeSchema};
pub use mutation::MutationConfig;
pub use network::Network;
pub use node::DefaultNodeGene;
pub use population::{GenomeId, Population};
pub use random::split_rng;
pub use table::I_INF;

/// Genome built from the default gene models.
pub type DefaultGenome = Genome<DefaultNodeGene, DefaultConnGene>;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;
    use symbios_genetics::Genotype;

    fn schema(inputs: usize, outputs: usize) -> Arc<GenomeSchema<DefaultNodeGene, DefaultConnGene>> {
        Arc::new(
            GenomeSchema::new(
                &NeatConfig::minimal(inputs, outputs),
                DefaultNodeGene::default(),
                DefaultConnGene::default(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_genotype_trait_implementation() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut genome = DefaultGenome::fully_connected(schema(2, 1), &mut rng).unwrap();

        genome.mutate(&mut rng, 1.0);

        let mut genome2 = genome.clone();
        genome2.mutate(&mut rng, 1.0);

        let child = Genotype::crossover(&genome, &genome2, &mut rng);
        assert!(child.validate().is_ok());
        assert_eq!(child.nodes.dim(), genome.nodes.dim());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(123);
        let mut genome = DefaultGenome::fully_connected(schema(3, 2), &mut rng).unwrap();
        mutation::mutate_add_node(&mut genome, &mut rng).unwrap();

        let json = serde_json::to_string(&genome).expect("Serialization failed");
        let restored: DefaultGenome = serde_json::from_str(&json).expect("Deserialization failed");

        assert_eq!(restored.num_nodes(), genome.num_nodes());
        assert_eq!(restored.num_conns(), genome.num_conns());
        assert_eq!(restored.fingerprint(), genome.fingerprint());
        assert_eq!(restored.schema.input_keys, genome.schema.input_keys);
    }

    #[test]
    fn test_default_gene_row_widths() {
        let genome = DefaultGenome::empty(schema(2, 1));
        assert_eq!(genome.nodes.ncols(), 5);
        assert_eq!(genome.conns.ncols(), 3);
    }
}
