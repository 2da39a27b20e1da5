//! Population storage and operator dispatch.
//!
//! The population owns the genomes and the shared [`GenomeSchema`]; every
//! operator it exposes forwards to the genome-level implementation. Selection,
//! speciation and fitness evaluation are left to the caller (for example a
//! `symbios_genetics` algorithm driving [`Genome`] through its `Genotype`
//! impl).

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, info};

use crate::config::NeatConfig;
use crate::error::{NeatError, Result};
use crate::gene::{ConnGene, Gene, NodeGene};
use crate::genome::{Genome, GenomeSchema};
use crate::mutation;
use crate::network::Network;
use crate::random::split_rng;

new_key_type! {
    /// Stable handle to a genome stored in a [`Population`].
    pub struct GenomeId;
}

/// A set of genomes sharing one schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "N: NodeGene + Deserialize<'de>, C: ConnGene + Deserialize<'de>"))]
pub struct Population<N, C> {
    schema: Arc<GenomeSchema<N, C>>,
    genomes: SlotMap<GenomeId, Genome<N, C>>,
}

impl<N: NodeGene, C: ConnGene> Population<N, C> {
    /// Create `config.size` fully connected genomes, one split generator each.
    pub fn new<R: Rng + ?Sized>(
        config: &NeatConfig,
        node_gene: N,
        conn_gene: C,
        rng: &mut R,
    ) -> Result<Self> {
        let schema = Arc::new(GenomeSchema::new(config, node_gene, conn_gene)?);
        let mut genomes = SlotMap::with_capacity_and_key(config.size);
        for mut child in split_rng(rng, config.size) {
            genomes.insert(Genome::fully_connected(Arc::clone(&schema), &mut child)?);
        }
        info!(
            size = config.size,
            inputs = config.num_inputs,
            outputs = config.num_outputs,
            "initialised population"
        );
        Ok(Self { schema, genomes })
    }

    /// A population with no genomes yet.
    #[must_use]
    pub fn empty(schema: Arc<GenomeSchema<N, C>>) -> Self {
        Self {
            schema,
            genomes: SlotMap::with_key(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<GenomeSchema<N, C>> {
        &self.schema
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = GenomeId> + '_ {
        self.genomes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GenomeId, &Genome<N, C>)> {
        self.genomes.iter()
    }

    #[must_use]
    pub fn get(&self, id: GenomeId) -> Option<&Genome<N, C>> {
        self.genomes.get(id)
    }

    pub fn get_mut(&mut self, id: GenomeId) -> Option<&mut Genome<N, C>> {
        self.genomes.get_mut(id)
    }

    /// Store a genome whose tables follow this population's layout.
    pub fn insert(&mut self, genome: Genome<N, C>) -> Result<GenomeId> {
        self.check_layout(&genome)?;
        Ok(self.genomes.insert(genome))
    }

    fn check_layout(&self, genome: &Genome<N, C>) -> Result<()> {
        if Arc::ptr_eq(&self.schema, &genome.schema) {
            return Ok(());
        }
        let schema = &self.schema;
        let expected = [
            (schema.max_nodes, schema.node_gene.length()),
            (schema.max_conns, schema.conn_gene.length()),
        ];
        let found = [genome.nodes.dim(), genome.conns.dim()];
        if found != expected {
            return Err(NeatError::SchemaMismatch(format!(
                "tables {found:?}, expected {expected:?}"
            )));
        }
        if genome.schema.input_keys != schema.input_keys
            || genome.schema.output_keys != schema.output_keys
        {
            return Err(NeatError::SchemaMismatch(
                "reserved input/output keys differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn remove(&mut self, id: GenomeId) -> Option<Genome<N, C>> {
        self.genomes.remove(id)
    }

    fn lookup(&self, id: GenomeId) -> Result<&Genome<N, C>> {
        self.genomes.get(id).ok_or(NeatError::GenomeNotFound)
    }

    /// Offspring of `winner` (the fitter parent) and `loser`.
    ///
    /// The child is returned, not inserted.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        winner: GenomeId,
        loser: GenomeId,
        rng: &mut R,
    ) -> Result<Genome<N, C>> {
        let child = self.lookup(winner)?.crossover_with(self.lookup(loser)?, rng);
        debug!(?winner, ?loser, "crossover");
        Ok(child)
    }

    /// Mutate a stored genome in place at full rate.
    pub fn mutate<R: Rng + ?Sized>(&mut self, id: GenomeId, rng: &mut R) -> Result<()> {
        let genome = self.genomes.get_mut(id).ok_or(NeatError::GenomeNotFound)?;
        mutation::mutate(genome, rng, 1.0)
    }

    pub fn distance(&self, a: GenomeId, b: GenomeId) -> Result<f32> {
        Ok(self.lookup(a)?.distance(self.lookup(b)?))
    }

    /// Compile a stored genome into a feed-forward network.
    pub fn transform(&self, id: GenomeId) -> Result<Network<N, C>> {
        self.lookup(id)?.transform()
    }
}
