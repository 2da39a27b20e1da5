//! Genome container over the fixed-capacity node and connection tables.
//!
//! A [`Genome`] owns its two tables and shares a [`GenomeSchema`] with every
//! other genome of the population. The schema carries the static metadata the
//! tables do not: reserved input/output keys, capacities, the gene models and
//! the operator configuration.
//!
//! Reserved keys are laid out as `0..num_inputs` for inputs followed by
//! `num_inputs..num_inputs + num_outputs` for outputs; hidden nodes take keys
//! after those.

use std::fmt;
use std::sync::Arc;

use ndarray::{arr1, Array2};
use rand::Rng;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use symbios_genetics::Genotype;
use tracing::warn;

use crate::activation::Activation;
use crate::config::NeatConfig;
use crate::crossover::{crossover, find_homolog};
use crate::distance::{genome_distance, DistanceConfig};
use crate::error::{NeatError, Result, TableKind};
use crate::gene::{ConnGene, Gene, NodeGene};
use crate::graph::{check_cycles, has_cycle, topological_sort};
use crate::hashing::hash_words;
use crate::mutation::{self, MutationConfig};
use crate::network::Network;
use crate::table::{
    add_row, adjacency, delete_row, empty_table, is_occupied, key_to_index, max_key,
    occupied_count, occupied_slots, renumber_keys, unflatten_conns, validate_table,
};

/// Static metadata shared by every genome of a population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeSchema<N, C> {
    pub input_keys: Vec<usize>,
    pub output_keys: Vec<usize>,
    pub max_nodes: usize,
    pub max_conns: usize,
    pub node_gene: N,
    pub conn_gene: C,
    pub mutation: MutationConfig,
    pub distance: DistanceConfig,
    pub output_transform: Option<Activation>,
}

impl<N: NodeGene, C: ConnGene> GenomeSchema<N, C> {
    /// Build a schema from a validated configuration and the two gene models.
    pub fn new(config: &NeatConfig, node_gene: N, conn_gene: C) -> Result<Self> {
        config.validate()?;
        node_gene.validate()?;
        conn_gene.validate()?;

        let outputs_start = config.num_inputs;
        Ok(Self {
            input_keys: (0..outputs_start).collect(),
            output_keys: (outputs_start..outputs_start + config.num_outputs).collect(),
            max_nodes: config.max_nodes,
            max_conns: config.max_conns,
            node_gene,
            conn_gene,
            mutation: config.mutation,
            distance: config.distance,
            output_transform: config.output_transform,
        })
    }

    #[inline]
    #[must_use]
    pub fn is_input(&self, key: usize) -> bool {
        self.input_keys.contains(&key)
    }

    #[inline]
    #[must_use]
    pub fn is_output(&self, key: usize) -> bool {
        self.output_keys.contains(&key)
    }

    /// Inputs and outputs are reserved; everything else is hidden.
    #[inline]
    #[must_use]
    pub fn is_reserved(&self, key: usize) -> bool {
        self.is_input(key) || self.is_output(key)
    }
}

/// One candidate network: a node table and a connection table.
///
/// Row `i` of `nodes` is `[key, custom attrs..]`; row `i` of `conns` is
/// `[input_key, output_key, custom attrs..]`. Unoccupied rows are all-NaN.
///
/// Deserialization goes through [`Genome::from_tables`], so a stored genome
/// with the wrong table shape or a partially populated row is rejected.
#[derive(Debug, Clone, Serialize)]
pub struct Genome<N, C> {
    #[serde(with = "crate::table::nan_as_null")]
    pub nodes: Array2<f32>,
    #[serde(with = "crate::table::nan_as_null")]
    pub conns: Array2<f32>,
    pub schema: Arc<GenomeSchema<N, C>>,
}

/// Unchecked wire form of [`Genome`].
#[derive(Deserialize)]
struct GenomeRepr<N, C> {
    #[serde(with = "crate::table::nan_as_null")]
    nodes: Array2<f32>,
    #[serde(with = "crate::table::nan_as_null")]
    conns: Array2<f32>,
    schema: Arc<GenomeSchema<N, C>>,
}

impl<'de, N, C> Deserialize<'de> for Genome<N, C>
where
    N: NodeGene + Deserialize<'de>,
    C: ConnGene + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = GenomeRepr::<N, C>::deserialize(deserializer)?;
        Self::from_tables(repr.schema, repr.nodes, repr.conns).map_err(D::Error::custom)
    }
}

impl<N: NodeGene, C: ConnGene> Genome<N, C> {
    /// A genome with every slot unoccupied.
    #[must_use]
    pub fn empty(schema: Arc<GenomeSchema<N, C>>) -> Self {
        Self {
            nodes: empty_table(schema.max_nodes, schema.node_gene.length()),
            conns: empty_table(schema.max_conns, schema.conn_gene.length()),
            schema,
        }
    }

    /// Input and output nodes with random attributes, no connections.
    pub fn minimal<R: Rng + ?Sized>(schema: Arc<GenomeSchema<N, C>>, rng: &mut R) -> Result<Self> {
        let mut genome = Self::empty(schema);
        let schema = Arc::clone(&genome.schema);
        for &key in schema.input_keys.iter().chain(&schema.output_keys) {
            let attrs = schema.node_gene.new_random_attrs(rng);
            genome.add_node(key, &attrs)?;
        }
        Ok(genome)
    }

    /// Minimal genome plus a connection from every input to every output.
    pub fn fully_connected<R: Rng + ?Sized>(
        schema: Arc<GenomeSchema<N, C>>,
        rng: &mut R,
    ) -> Result<Self> {
        let mut genome = Self::minimal(schema, rng)?;
        let schema = Arc::clone(&genome.schema);
        for &input in &schema.input_keys {
            for &output in &schema.output_keys {
                let attrs = schema.conn_gene.new_random_attrs(rng);
                genome.add_conn(input, output, &attrs)?;
            }
        }
        Ok(genome)
    }

    /// Wrap existing tables, checking their shape and row invariants.
    pub fn from_tables(
        schema: Arc<GenomeSchema<N, C>>,
        nodes: Array2<f32>,
        conns: Array2<f32>,
    ) -> Result<Self> {
        for (table, rows, width) in [
            (&nodes, schema.max_nodes, schema.node_gene.length()),
            (&conns, schema.max_conns, schema.conn_gene.length()),
        ] {
            if table.ncols() != width {
                return Err(NeatError::RowWidth {
                    expected: width,
                    found: table.ncols(),
                });
            }
            if table.nrows() != rows {
                return Err(NeatError::InvalidConfig(format!(
                    "table has {} rows, schema capacity is {rows}",
                    table.nrows()
                )));
            }
        }
        let genome = Self {
            nodes,
            conns,
            schema,
        };
        genome.validate()?;
        Ok(genome)
    }

    /// Check row invariants and the presence of every reserved node.
    pub fn validate(&self) -> Result<()> {
        validate_table(&self.nodes, TableKind::Nodes)?;
        validate_table(&self.conns, TableKind::Conns)?;
        for &key in self.schema.input_keys.iter().chain(&self.schema.output_keys) {
            if self.node_slot(key).is_none() {
                return Err(NeatError::MissingNode(key));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn num_nodes(&self) -> usize {
        occupied_count(&self.nodes)
    }

    #[must_use]
    pub fn num_conns(&self) -> usize {
        occupied_count(&self.conns)
    }

    /// Row of the node with `key`.
    #[must_use]
    pub fn node_slot(&self, key: usize) -> Option<usize> {
        key_to_index(key as f32, self.nodes.column(0))
    }

    /// Row of the connection `input_key -> output_key`.
    #[must_use]
    pub fn conn_slot(&self, input_key: usize, output_key: usize) -> Option<usize> {
        find_homolog(
            arr1(&[input_key as f32, output_key as f32]).view(),
            &self.conns,
        )
    }

    /// Key of the node stored at `slot`, if occupied.
    #[must_use]
    pub fn node_key(&self, slot: usize) -> Option<usize> {
        let key = self.nodes[[slot, 0]];
        (!key.is_nan()).then_some(key as usize)
    }

    /// Keys of every occupied non-reserved node, in row order.
    #[must_use]
    pub fn hidden_keys(&self) -> Vec<usize> {
        occupied_slots(&self.nodes)
            .filter_map(|slot| self.node_key(slot))
            .filter(|key| !self.schema.is_reserved(*key))
            .collect()
    }

    /// One past the largest key in use, never colliding with a reserved key.
    #[must_use]
    pub fn next_node_key(&self) -> usize {
        let reserved = self
            .schema
            .input_keys
            .iter()
            .chain(&self.schema.output_keys)
            .max()
            .copied();
        let used = max_key(&self.nodes).map(|k| k as usize);
        reserved.max(used).map_or(0, |k| k + 1)
    }

    /// Insert a node into the first free slot.
    pub fn add_node(&mut self, key: usize, attrs: &[f32]) -> Result<usize> {
        add_row(&mut self.nodes, TableKind::Nodes, &[key as f32], attrs)
    }

    /// Insert a connection between two present nodes into the first free slot.
    pub fn add_conn(&mut self, input_key: usize, output_key: usize, attrs: &[f32]) -> Result<usize> {
        for key in [input_key, output_key] {
            if self.node_slot(key).is_none() {
                return Err(NeatError::MissingNode(key));
            }
        }
        add_row(
            &mut self.conns,
            TableKind::Conns,
            &[input_key as f32, output_key as f32],
            attrs,
        )
    }

    /// Remove the node at `slot` together with every connection touching it.
    pub fn delete_node(&mut self, slot: usize) {
        let key = self.nodes[[slot, 0]];
        if key.is_nan() {
            return;
        }
        delete_row(&mut self.nodes, slot);

        let attached: Vec<usize> = occupied_slots(&self.conns)
            .filter(|&c| self.conns[[c, 0]] == key || self.conns[[c, 1]] == key)
            .collect();
        for c in attached {
            delete_row(&mut self.conns, c);
        }
    }

    pub fn delete_conn(&mut self, slot: usize) {
        delete_row(&mut self.conns, slot);
    }

    /// Connection-row grid over node rows; see [`unflatten_conns`].
    #[must_use]
    pub fn unflatten(&self) -> Array2<usize> {
        unflatten_conns(&self.nodes, &self.conns)
    }

    #[must_use]
    pub fn adjacency(&self) -> Array2<bool> {
        adjacency(&self.nodes, &self.conns)
    }

    /// Node rows in evaluation order, padded with [`crate::I_INF`].
    #[must_use]
    pub fn topological_order(&self) -> Vec<usize> {
        topological_sort(&self.nodes, &self.adjacency())
    }

    #[must_use]
    pub fn has_cycle(&self) -> bool {
        has_cycle(&self.nodes, &self.adjacency())
    }

    /// Whether adding `input_key -> output_key` would close a cycle.
    pub fn would_create_cycle(&self, input_key: usize, output_key: usize) -> Result<bool> {
        let from = self.node_slot(input_key).ok_or(NeatError::MissingNode(input_key))?;
        let to = self.node_slot(output_key).ok_or(NeatError::MissingNode(output_key))?;
        check_cycles(&self.nodes, &self.adjacency(), from, to)
    }

    /// Compact hidden node keys; see [`renumber_keys`].
    pub fn renumber(&mut self) {
        renumber_keys(
            &mut self.nodes,
            &mut self.conns,
            &self.schema.input_keys,
            &self.schema.output_keys,
        );
    }

    /// Combined hash of every occupied row, nodes first.
    #[must_use]
    pub fn fingerprint(&self) -> u32 {
        let node_gene = &self.schema.node_gene;
        let conn_gene = &self.schema.conn_gene;
        let nodes = self
            .nodes
            .rows()
            .into_iter()
            .filter(|r| is_occupied(*r))
            .map(|r| node_gene.hash(r));
        let conns = self
            .conns
            .rows()
            .into_iter()
            .filter(|r| is_occupied(*r))
            .map(|r| conn_gene.hash(r));
        hash_words(nodes.chain(conns))
    }

    /// Compatibility distance to `other`.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        genome_distance(
            &self.schema.node_gene,
            &self.schema.conn_gene,
            &self.schema.distance,
            (&self.nodes, &self.conns),
            (&other.nodes, &other.conns),
        )
    }

    /// Offspring of `self` (the fitter parent) and `other`.
    #[must_use]
    pub fn crossover_with<R: Rng + ?Sized>(&self, other: &Self, rng: &mut R) -> Self {
        let (nodes, conns) = crossover(
            &self.schema.node_gene,
            &self.schema.conn_gene,
            rng,
            (&self.nodes, &self.conns),
            (&other.nodes, &other.conns),
        );
        Self {
            nodes,
            conns,
            schema: Arc::clone(&self.schema),
        }
    }

    /// Compile into a feed-forward network.
    pub fn transform(&self) -> Result<Network<N, C>> {
        Network::try_new(self)
    }
}

impl<N: NodeGene, C: ConnGene> fmt::Display for Genome<N, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Genome(nodes: {}, conns: {})", self.num_nodes(), self.num_conns())?;
        for row in self.nodes.rows().into_iter().filter(|r| is_occupied(*r)) {
            writeln!(f, "  {}", self.schema.node_gene.repr(row, 2))?;
        }
        for row in self.conns.rows().into_iter().filter(|r| is_occupied(*r)) {
            writeln!(f, "  {}", self.schema.conn_gene.repr(row, 2))?;
        }
        Ok(())
    }
}

impl<N, C> Genotype for Genome<N, C>
where
    N: NodeGene + Serialize + DeserializeOwned,
    C: ConnGene + Serialize + DeserializeOwned,
{
    fn mutate<R: Rng>(&mut self, rng: &mut R, rate: f32) {
        if let Err(err) = mutation::mutate(self, rng, rate) {
            warn!(%err, "mutation aborted");
        }
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        self.crossover_with(other, rng)
    }
}
