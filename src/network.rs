//! Feed-forward evaluation of a genome.
//!
//! [`Network`] is the compiled form of a [`Genome`]: the topological order of
//! its occupied nodes plus, for each node, the list of incoming connections in
//! Compressed Sparse Row layout. Compilation fails with
//! [`NeatError::CyclicGenome`] when some occupied node cannot be ordered.
//!
//! ## Evaluation
//!
//! Input nodes take the input values verbatim. Every other node, in order,
//! gathers `conn_gene.forward(weight attrs, value[source])` over its incoming
//! connections and passes them to `node_gene.forward`, with output nodes
//! flagged so they skip their activation. The optional output transform is
//! applied last.

use tracing::debug;

use crate::activation::Activation;
use crate::error::{NeatError, Result};
use crate::gene::{ConnGene, NodeGene};
use crate::genome::Genome;
use crate::graph::{ordered_len, topological_sort};
use crate::table::{adjacency, extract_attrs, occupied_count, unflatten_conns, I_INF};

/// A compiled, evaluation-ready genome.
#[derive(Debug, Clone)]
pub struct Network<N, C> {
    node_gene: N,
    conn_gene: C,
    /// Node rows in evaluation order, inputs excluded.
    eval_order: Vec<usize>,
    /// Custom attributes per node row; empty for unoccupied rows.
    node_attrs: Vec<Vec<f32>>,
    // For node row i, incoming edges are at [csr_offsets[i]..csr_offsets[i + 1]).
    csr_sources: Vec<usize>,
    csr_attrs: Vec<Vec<f32>>,
    csr_offsets: Vec<usize>,
    input_rows: Vec<usize>,
    output_rows: Vec<usize>,
    is_output: Vec<bool>,
    output_transform: Option<Activation>,
    values: Vec<f32>,
    scratch: Vec<f32>,
}

impl<N: NodeGene, C: ConnGene> Network<N, C> {
    /// Compile `genome`.
    ///
    /// # Errors
    ///
    /// [`NeatError::CyclicGenome`] if the occupied nodes are not a DAG, and
    /// [`NeatError::MissingNode`] if a reserved node is absent.
    pub fn try_new(genome: &Genome<N, C>) -> Result<Self> {
        let schema = &genome.schema;
        let n = genome.nodes.nrows();

        let order = topological_sort(&genome.nodes, &adjacency(&genome.nodes, &genome.conns));
        let ordered = ordered_len(&order);
        if ordered < occupied_count(&genome.nodes) {
            debug!(ordered, "rejected cyclic genome");
            return Err(NeatError::CyclicGenome);
        }

        let resolve = |keys: &[usize]| -> Result<Vec<usize>> {
            keys.iter()
                .map(|&key| genome.node_slot(key).ok_or(NeatError::MissingNode(key)))
                .collect()
        };
        let input_rows = resolve(&schema.input_keys)?;
        let output_rows = resolve(&schema.output_keys)?;

        let mut is_output = vec![false; n];
        for &row in &output_rows {
            is_output[row] = true;
        }

        let node_attrs = genome
            .nodes
            .rows()
            .into_iter()
            .map(|row| {
                if row[0].is_nan() {
                    Vec::new()
                } else {
                    extract_attrs(&schema.node_gene, row)
                }
            })
            .collect();

        let grid = unflatten_conns(&genome.nodes, &genome.conns);
        let mut csr_offsets = Vec::with_capacity(n + 1);
        let mut csr_sources = Vec::new();
        let mut csr_attrs = Vec::new();
        csr_offsets.push(0);
        for target in 0..n {
            for source in 0..n {
                let conn = grid[[source, target]];
                if conn != I_INF {
                    csr_sources.push(source);
                    csr_attrs.push(extract_attrs(&schema.conn_gene, genome.conns.row(conn)));
                }
            }
            csr_offsets.push(csr_sources.len());
        }

        let eval_order = order[..ordered]
            .iter()
            .copied()
            .filter(|row| !input_rows.contains(row))
            .collect();

        Ok(Self {
            node_gene: schema.node_gene.clone(),
            conn_gene: schema.conn_gene.clone(),
            eval_order,
            node_attrs,
            csr_sources,
            csr_attrs,
            csr_offsets,
            input_rows,
            output_rows,
            is_output,
            output_transform: schema.output_transform,
            values: vec![0.0; n],
            scratch: Vec::new(),
        })
    }

    /// Evaluate the network, writing one value per output into `outputs`.
    pub fn forward_into(&mut self, inputs: &[f32], outputs: &mut [f32]) -> Result<()> {
        if inputs.len() != self.input_rows.len() {
            return Err(NeatError::InputLength {
                expected: self.input_rows.len(),
                found: inputs.len(),
            });
        }
        if outputs.len() != self.output_rows.len() {
            return Err(NeatError::OutputLength {
                expected: self.output_rows.len(),
                found: outputs.len(),
            });
        }

        self.values.fill(0.0);
        for (&row, &x) in self.input_rows.iter().zip(inputs) {
            self.values[row] = x;
        }

        for &node in &self.eval_order {
            self.scratch.clear();
            for edge in self.csr_offsets[node]..self.csr_offsets[node + 1] {
                let source = self.values[self.csr_sources[edge]];
                self.scratch.push(self.conn_gene.forward(&self.csr_attrs[edge], source));
            }
            self.values[node] =
                self.node_gene
                    .forward(&self.node_attrs[node], &self.scratch, self.is_output[node]);
        }

        for (out, &row) in outputs.iter_mut().zip(&self.output_rows) {
            let raw = self.values[row];
            *out = self.output_transform.map_or(raw, |f| f.apply(raw));
        }
        Ok(())
    }

    /// Evaluate the network and return the output values.
    pub fn forward(&mut self, inputs: &[f32]) -> Result<Vec<f32>> {
        let mut outputs = vec![0.0; self.output_rows.len()];
        self.forward_into(inputs, &mut outputs)?;
        Ok(outputs)
    }

    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.input_rows.len()
    }

    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.output_rows.len()
    }

    /// Node rows evaluated by [`forward`](Self::forward), in order.
    #[must_use]
    pub fn eval_order(&self) -> &[usize] {
        &self.eval_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Aggregation;
    use crate::config::NeatConfig;
    use crate::conn::DefaultConnGene;
    use crate::gene::Gene;
    use crate::genome::GenomeSchema;
    use crate::node::DefaultNodeGene;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    type TestGenome = Genome<DefaultNodeGene, DefaultConnGene>;

    fn schema(config: &NeatConfig) -> Arc<GenomeSchema<DefaultNodeGene, DefaultConnGene>> {
        Arc::new(
            GenomeSchema::new(config, DefaultNodeGene::default(), DefaultConnGene::default())
                .unwrap(),
        )
    }

    /// attrs for bias, response 1, sum aggregation and the given activation
    fn node_attrs(bias: f32, activation: Activation) -> Vec<f32> {
        vec![bias, 1.0, Aggregation::Sum.id() as f32, activation.id() as f32]
    }

    fn hand_built(config: &NeatConfig) -> TestGenome {
        // 0, 1 inputs; 2 output; 3 hidden relu
        let mut genome = TestGenome::empty(schema(config));
        genome.add_node(0, &node_attrs(0.0, Activation::Identity)).unwrap();
        genome.add_node(1, &node_attrs(0.0, Activation::Identity)).unwrap();
        genome.add_node(2, &node_attrs(0.5, Activation::Sigmoid)).unwrap();
        genome.add_node(3, &node_attrs(-1.0, Activation::ReLU)).unwrap();
        genome.add_conn(0, 3, &[2.0]).unwrap();
        genome.add_conn(3, 2, &[1.5]).unwrap();
        genome.add_conn(1, 2, &[-1.0]).unwrap();
        genome
    }

    #[test]
    fn test_forward_hand_computed() {
        let genome = hand_built(&NeatConfig::minimal(2, 1));
        let mut net = genome.transform().unwrap();

        // hidden = relu(-1 + 2 * 1.0) = 1; output = 0.5 + 1.5 * 1 - 1 * 3 = -1
        let out = net.forward(&[1.0, 3.0]).unwrap();
        assert!((out[0] + 1.0).abs() < 1e-6);

        // hidden = relu(-1 + 0) = 0; output = 0.5 - 2
        let out = net.forward(&[0.0, 2.0]).unwrap();
        assert!((out[0] + 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_output_transform() {
        let config = NeatConfig {
            output_transform: Some(Activation::Sigmoid),
            ..NeatConfig::minimal(2, 1)
        };
        let mut net = hand_built(&config).transform().unwrap();
        let out = net.forward(&[1.0, 3.0]).unwrap();
        assert!((out[0] - Activation::Sigmoid.apply(-1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_inputs_are_not_evaluated() {
        let net = hand_built(&NeatConfig::minimal(2, 1)).transform().unwrap();
        assert_eq!(net.eval_order(), &[3, 2]);
        assert_eq!(net.num_inputs(), 2);
        assert_eq!(net.num_outputs(), 1);
    }

    #[test]
    fn test_rejects_cycles() {
        let mut genome = hand_built(&NeatConfig::minimal(2, 1));
        genome.add_conn(2, 3, &[1.0]).unwrap();
        assert!(matches!(genome.transform(), Err(NeatError::CyclicGenome)));
    }

    #[test]
    fn test_rejects_missing_output() {
        let mut genome = hand_built(&NeatConfig::minimal(2, 1));
        let slot = genome.node_slot(2).unwrap();
        genome.delete_node(slot);
        assert!(matches!(genome.transform(), Err(NeatError::MissingNode(2))));
    }

    #[test]
    fn test_input_length_checked() {
        let mut net = hand_built(&NeatConfig::minimal(2, 1)).transform().unwrap();
        assert_eq!(
            net.forward(&[1.0]),
            Err(NeatError::InputLength {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_output_buffer_length_checked() {
        let mut net = hand_built(&NeatConfig::minimal(2, 1)).transform().unwrap();
        let mut outputs = [0.0; 2];
        assert_eq!(
            net.forward_into(&[1.0, 1.0], &mut outputs),
            Err(NeatError::OutputLength {
                expected: 1,
                found: 2
            })
        );
        assert_eq!(
            net.forward_into(&[1.0, 1.0], &mut []),
            Err(NeatError::OutputLength {
                expected: 1,
                found: 0
            })
        );
    }

    #[test]
    fn test_unconnected_output_is_bias() {
        let config = NeatConfig::minimal(2, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let genome = TestGenome::minimal(schema(&config), &mut rng).unwrap();
        let slot = genome.node_slot(2).unwrap();
        let bias = genome.nodes[[slot, 1]];

        let mut net = genome.transform().unwrap();
        let out = net.forward(&[4.0, -4.0]).unwrap();
        assert!((out[0] - bias).abs() < 1e-6);
        assert_eq!(genome.schema.node_gene.custom_attrs().len(), 4);
    }
}
