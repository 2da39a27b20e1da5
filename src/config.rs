//! Structural hyperparameters of a population.
//!
//! Per-attribute hyperparameters live on the gene models
//! ([`crate::DefaultNodeGene`], [`crate::DefaultConnGene`]); this struct holds
//! everything that shapes the genome tables and the population-level
//! operators.

use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::distance::DistanceConfig;
use crate::error::{NeatError, Result};
use crate::mutation::MutationConfig;

/// Configuration for genome layout, mutation and speciation distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeatConfig {
    /// Number of genomes created by [`crate::Population::new`].
    pub size: usize,
    /// Number of input nodes; they take keys `0..num_inputs`.
    pub num_inputs: usize,
    /// Number of output nodes; they take the keys right after the inputs.
    pub num_outputs: usize,
    /// Row capacity of the node table.
    pub max_nodes: usize,
    /// Row capacity of the connection table.
    pub max_conns: usize,
    #[serde(default)]
    pub mutation: MutationConfig,
    #[serde(default)]
    pub distance: DistanceConfig,
    /// Applied to the raw output node values after a forward pass.
    #[serde(default)]
    pub output_transform: Option<Activation>,
}

impl Default for NeatConfig {
    fn default() -> Self {
        Self {
            size: 150,
            num_inputs: 2,
            num_outputs: 1,
            max_nodes: 50,
            max_conns: 100,
            mutation: MutationConfig::default(),
            distance: DistanceConfig::default(),
            output_transform: None,
        }
    }
}

impl NeatConfig {
    /// A small configuration sized for the given interface, useful for tests.
    #[must_use]
    pub fn minimal(num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            size: 10,
            num_inputs,
            num_outputs,
            max_nodes: num_inputs + num_outputs + 16,
            max_conns: num_inputs * num_outputs + 32,
            ..Default::default()
        }
    }

    /// Reserved node count: inputs plus outputs.
    #[must_use]
    pub const fn reserved_nodes(&self) -> usize {
        self.num_inputs + self.num_outputs
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_inputs == 0 || self.num_outputs == 0 {
            return Err(NeatError::InvalidConfig(
                "num_inputs and num_outputs must be positive".into(),
            ));
        }
        if self.max_nodes < self.reserved_nodes() {
            return Err(NeatError::InvalidConfig(format!(
                "max_nodes {} cannot hold {} input and output nodes",
                self.max_nodes,
                self.reserved_nodes()
            )));
        }
        if self.max_conns < self.num_inputs * self.num_outputs {
            return Err(NeatError::InvalidConfig(format!(
                "max_conns {} cannot hold a fully connected genome ({} connections)",
                self.max_conns,
                self.num_inputs * self.num_outputs
            )));
        }
        self.mutation.validate()?;
        self.distance.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(NeatConfig::default().validate().is_ok());
        assert!(NeatConfig::minimal(3, 2).validate().is_ok());
    }

    #[test]
    fn test_rejects_undersized_tables() {
        let config = NeatConfig {
            max_nodes: 2,
            ..NeatConfig::minimal(2, 1)
        };
        assert!(matches!(config.validate(), Err(NeatError::InvalidConfig(_))));

        let config = NeatConfig {
            max_conns: 5,
            ..NeatConfig::minimal(3, 2)
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_interface() {
        assert!(NeatConfig::minimal(0, 1).validate().is_err());
        assert!(NeatConfig::minimal(1, 0).validate().is_err());
    }

    #[test]
    fn test_rejects_bad_probability() {
        let mut config = NeatConfig::default();
        config.mutation.conn_add = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = NeatConfig {
            output_transform: Some(Activation::Tanh),
            ..NeatConfig::minimal(4, 2)
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: NeatConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_nested_sections_default() {
        let json = r#"{"size": 5, "num_inputs": 2, "num_outputs": 1, "max_nodes": 8, "max_conns": 8}"#;
        let config: NeatConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.mutation, MutationConfig::default());
        assert_eq!(config.distance, DistanceConfig::default());
        assert_eq!(config.output_transform, None);
    }
}
