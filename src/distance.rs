//! Compatibility distance between genomes, used for speciation.
//!
//! For each table the distance is
//! `(non_homologous * disjoint + Σ gene.distance(homologous pairs) * weight) / max(count1, count2)`,
//! where genes are homologous when their fixed attributes match. The genome
//! distance is the node distance plus the connection distance.

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::crossover::find_homolog;
use crate::error::{NeatError, Result};
use crate::gene::{ConnGene, Gene, NodeGene};
use crate::table::{extract_attrs, occupied_count, occupied_slots};

/// Coefficients of the compatibility distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceConfig {
    /// Cost of each gene without a homolog.
    pub compatibility_disjoint: f32,
    /// Scale of the summed attribute distance of homologous genes.
    pub compatibility_weight: f32,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            compatibility_disjoint: 1.0,
            compatibility_weight: 0.4,
        }
    }
}

impl DistanceConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("compatibility_disjoint", self.compatibility_disjoint),
            ("compatibility_weight", self.compatibility_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(NeatError::InvalidConfig(format!(
                    "distance: {field} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Distance contribution of one gene table.
#[must_use]
pub fn table_distance<G: Gene>(
    gene: &G,
    config: &DistanceConfig,
    table1: &Array2<f32>,
    table2: &Array2<f32>,
) -> f32 {
    let count1 = occupied_count(table1);
    let count2 = occupied_count(table2);
    let max_count = count1.max(count2);
    if max_count == 0 {
        return 0.0;
    }

    let fixed = gene.fixed_attrs().len();
    let mut homologous = 0usize;
    let mut attr_distance = 0.0f32;

    for slot in occupied_slots(table1) {
        let row = table1.row(slot);
        if let Some(other) = find_homolog(row.slice(s![..fixed]), table2) {
            homologous += 1;
            attr_distance += gene.distance(
                &extract_attrs(gene, row),
                &extract_attrs(gene, table2.row(other)),
            );
        }
    }

    let non_homologous = (count1 + count2).saturating_sub(2 * homologous);
    (non_homologous as f32 * config.compatibility_disjoint
        + attr_distance * config.compatibility_weight)
        / max_count as f32
}

/// Node distance plus connection distance.
#[must_use]
pub fn genome_distance<N: NodeGene, C: ConnGene>(
    node_gene: &N,
    conn_gene: &C,
    config: &DistanceConfig,
    (nodes1, conns1): (&Array2<f32>, &Array2<f32>),
    (nodes2, conns2): (&Array2<f32>, &Array2<f32>),
) -> f32 {
    table_distance(node_gene, config, nodes1, nodes2)
        + table_distance(conn_gene, config, conns1, conns2)
}
