//! Error types shared by every operator in the crate.
//!
//! Lookups that may legitimately miss (homolog search, key resolution) return
//! `Option` instead; the variants here are either rejected inputs or broken
//! table invariants.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which of the two genome tables an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    /// The node table.
    Nodes,
    /// The connection table.
    Conns,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Nodes => f.write_str("node"),
            TableKind::Conns => f.write_str("connection"),
        }
    }
}

/// Errors raised by table operations, graph algorithms and genome transforms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NeatError {
    /// A row was added to a table with no unoccupied slot left.
    #[error("{table} table is full: all {capacity} slots are occupied")]
    CapacityExceeded { table: TableKind, capacity: usize },

    /// A row is partially NaN. Never produced by the crate's own operators.
    #[error("{table} row {slot} is partially populated")]
    MalformedRow { table: TableKind, slot: usize },

    /// Fixed plus custom attributes do not match the table width.
    #[error("row width mismatch: table has {expected} columns, got {found} values")]
    RowWidth { expected: usize, found: usize },

    /// The reachability fixpoint of the cycle check did not settle.
    #[error("reachability did not stabilize within {nodes} iterations")]
    NonTerminatingReachability { nodes: usize },

    /// Feed-forward evaluation requires an acyclic graph.
    #[error("genome contains cycles; feedforward evaluation requires an acyclic graph")]
    CyclicGenome,

    /// A reserved input or output key is missing from the node table.
    #[error("node with key {0} is not present in the genome")]
    MissingNode(usize),

    /// `forward` was called with the wrong number of inputs.
    #[error("expected {expected} inputs, got {found}")]
    InputLength { expected: usize, found: usize },

    /// The output buffer passed to `forward_into` has the wrong length.
    #[error("output buffer holds {found} values, network has {expected} outputs")]
    OutputLength { expected: usize, found: usize },

    /// A row index does not address a slot of the table.
    #[error("slot {slot} is out of range for a table of {capacity} rows")]
    SlotOutOfRange { slot: usize, capacity: usize },

    /// A genome was built from a schema with a different layout.
    #[error("genome does not match the population schema: {0}")]
    SchemaMismatch(String),

    /// A hyperparameter failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An activation or aggregation name is not in the function table.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// A population lookup used an id that is no longer present.
    #[error("genome not found in population")]
    GenomeNotFound,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, NeatError>;
