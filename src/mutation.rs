//! Structural and value mutation of a genome.
//!
//! A call to [`mutate`] runs, each with its own split generator:
//! 1. add-node: split a random connection through a new identity node
//! 2. delete-node: remove a random hidden node and its connections
//! 3. add-conn: connect a random non-output source to a random non-input target
//! 4. delete-conn: remove a random connection
//! 5. value mutation of every occupied row, one generator per row
//!
//! Structural steps that cannot be applied (full table, duplicate edge,
//! cycle, nothing to pick from) are skipped and logged at `debug` level.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::attribute::check_probability;
use crate::error::Result;
use crate::gene::{ConnGene, Gene, NodeGene};
use crate::genome::Genome;
use crate::random::split_rng;
use crate::table::{extract_attrs, occupied_slots, set_attrs};

/// Per-call probabilities of the structural mutations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationConfig {
    pub node_add: f32,
    pub node_delete: f32,
    pub conn_add: f32,
    pub conn_delete: f32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            node_add: 0.2,
            node_delete: 0.0,
            conn_add: 0.2,
            conn_delete: 0.0,
        }
    }
}

impl MutationConfig {
    pub fn validate(&self) -> Result<()> {
        check_probability("mutation", "node_add", self.node_add)?;
        check_probability("mutation", "node_delete", self.node_delete)?;
        check_probability("mutation", "conn_add", self.conn_add)?;
        check_probability("mutation", "conn_delete", self.conn_delete)
    }

    /// Probabilities multiplied by `rate`, clamped to [0, 1].
    #[must_use]
    pub fn scaled(&self, rate: f32) -> Self {
        let scale = |p: f32| (p * rate).clamp(0.0, 1.0);
        Self {
            node_add: scale(self.node_add),
            node_delete: scale(self.node_delete),
            conn_add: scale(self.conn_add),
            conn_delete: scale(self.conn_delete),
        }
    }
}

/// Mutate `genome` in place; `rate` scales the structural probabilities.
pub fn mutate<N, C, R>(genome: &mut Genome<N, C>, rng: &mut R, rate: f32) -> Result<()>
where
    N: NodeGene,
    C: ConnGene,
    R: Rng + ?Sized,
{
    let config = genome.schema.mutation.scaled(rate);
    let mut rngs = split_rng(rng, 5);

    if rngs[0].random::<f32>() < config.node_add {
        mutate_add_node(genome, &mut rngs[0])?;
    }
    if rngs[1].random::<f32>() < config.node_delete {
        mutate_delete_node(genome, &mut rngs[1]);
    }
    if rngs[2].random::<f32>() < config.conn_add {
        mutate_add_conn(genome, &mut rngs[2])?;
    }
    if rngs[3].random::<f32>() < config.conn_delete {
        mutate_delete_conn(genome, &mut rngs[3]);
    }
    mutate_values(genome, &mut rngs[4])
}

/// Split a random connection `a -> b` into `a -> new -> b`.
///
/// The new node gets identity attributes and key `max_key + 1`; `a -> new`
/// gets identity connection attributes and `new -> b` keeps the old ones, so
/// the network computes the same function right after the split.
pub fn mutate_add_node<N, C, R>(genome: &mut Genome<N, C>, rng: &mut R) -> Result<bool>
where
    N: NodeGene,
    C: ConnGene,
    R: Rng + ?Sized,
{
    let schema = Arc::clone(&genome.schema);
    if genome.num_nodes() >= schema.max_nodes {
        debug!(capacity = schema.max_nodes, "add-node skipped: node table full");
        return Ok(false);
    }
    // one connection is removed and two are added
    if genome.num_conns() + 1 > schema.max_conns {
        debug!(capacity = schema.max_conns, "add-node skipped: connection table full");
        return Ok(false);
    }
    let Some(slot) = pick(rng, occupied_slots(&genome.conns).collect()) else {
        trace!("add-node skipped: no connection to split");
        return Ok(false);
    };

    let input_key = genome.conns[[slot, 0]] as usize;
    let output_key = genome.conns[[slot, 1]] as usize;
    let old_attrs = extract_attrs(&schema.conn_gene, genome.conns.row(slot));
    let new_key = genome.next_node_key();

    genome.delete_conn(slot);
    genome.add_node(new_key, &schema.node_gene.new_identity_attrs())?;
    genome.add_conn(input_key, new_key, &schema.conn_gene.new_identity_attrs())?;
    genome.add_conn(new_key, output_key, &old_attrs)?;

    trace!(input_key, output_key, new_key, "split connection");
    Ok(true)
}

/// Remove a random hidden node and every connection attached to it.
pub fn mutate_delete_node<N, C, R>(genome: &mut Genome<N, C>, rng: &mut R) -> bool
where
    N: NodeGene,
    C: ConnGene,
    R: Rng + ?Sized,
{
    let hidden: Vec<usize> = occupied_slots(&genome.nodes)
        .filter(|&slot| {
            genome
                .node_key(slot)
                .is_some_and(|key| !genome.schema.is_reserved(key))
        })
        .collect();
    let Some(slot) = pick(rng, hidden) else {
        trace!("delete-node skipped: no hidden node");
        return false;
    };
    genome.delete_node(slot);
    true
}

/// Add a connection from a random non-output node to a random non-input node.
pub fn mutate_add_conn<N, C, R>(genome: &mut Genome<N, C>, rng: &mut R) -> Result<bool>
where
    N: NodeGene,
    C: ConnGene,
    R: Rng + ?Sized,
{
    let schema = Arc::clone(&genome.schema);
    let keys: Vec<usize> = occupied_slots(&genome.nodes)
        .filter_map(|slot| genome.node_key(slot))
        .collect();
    let sources = keys.iter().copied().filter(|k| !schema.is_output(*k)).collect();
    let targets = keys.iter().copied().filter(|k| !schema.is_input(*k)).collect();

    let (Some(input_key), Some(output_key)) = (pick(rng, sources), pick(rng, targets)) else {
        trace!("add-conn skipped: no candidate endpoints");
        return Ok(false);
    };

    if genome.conn_slot(input_key, output_key).is_some() {
        trace!(input_key, output_key, "add-conn skipped: connection exists");
        return Ok(false);
    }
    if genome.num_conns() >= schema.max_conns {
        debug!(capacity = schema.max_conns, "add-conn skipped: connection table full");
        return Ok(false);
    }
    if genome.would_create_cycle(input_key, output_key)? {
        trace!(input_key, output_key, "add-conn skipped: would create a cycle");
        return Ok(false);
    }

    let attrs = schema.conn_gene.new_random_attrs(rng);
    genome.add_conn(input_key, output_key, &attrs)?;
    Ok(true)
}

/// Remove a random connection.
pub fn mutate_delete_conn<N, C, R>(genome: &mut Genome<N, C>, rng: &mut R) -> bool
where
    N: NodeGene,
    C: ConnGene,
    R: Rng + ?Sized,
{
    let Some(slot) = pick(rng, occupied_slots(&genome.conns).collect()) else {
        trace!("delete-conn skipped: no connection");
        return false;
    };
    genome.delete_conn(slot);
    true
}

/// Apply the gene models' value mutation to every occupied row.
pub fn mutate_values<N, C, R>(genome: &mut Genome<N, C>, rng: &mut R) -> Result<()>
where
    N: NodeGene,
    C: ConnGene,
    R: Rng + ?Sized,
{
    let schema = Arc::clone(&genome.schema);
    let mut node_rngs = split_rng(rng, genome.nodes.nrows());
    let mut conn_rngs = split_rng(rng, genome.conns.nrows());

    for slot in occupied_slots(&genome.nodes).collect::<Vec<_>>() {
        let attrs = extract_attrs(&schema.node_gene, genome.nodes.row(slot));
        let mutated = schema.node_gene.mutate(&mut node_rngs[slot], &attrs);
        set_attrs(&schema.node_gene, genome.nodes.row_mut(slot), &mutated)?;
    }
    for slot in occupied_slots(&genome.conns).collect::<Vec<_>>() {
        let attrs = extract_attrs(&schema.conn_gene, genome.conns.row(slot));
        let mutated = schema.conn_gene.mutate(&mut conn_rngs[slot], &attrs);
        set_attrs(&schema.conn_gene, genome.conns.row_mut(slot), &mutated)?;
    }
    Ok(())
}

fn pick<R: Rng + ?Sized>(rng: &mut R, candidates: Vec<usize>) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.random_range(0..candidates.len())])
}
