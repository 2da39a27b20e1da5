//! Whole-genome crossover with homology lookup.
//!
//! The offspring is built by walking the fitter parent's rows. Each occupied
//! row looks for a homolog in the other parent, i.e. a row with identical
//! fixed attributes (node key, or connection endpoints):
//! - no homolog: the row is inherited unchanged (disjoint and excess genes
//!   always come from the fitter parent)
//! - homolog found: the custom attributes come from [`Gene::crossover`]
//!
//! Genes present only in the weaker parent never reach the offspring, and row
//! `i` of the offspring is row `i` of the fitter parent. Each row draws from
//! its own split generator, so the result does not depend on processing order.

use ndarray::{s, Array2, ArrayView1};
use rand::Rng;

use crate::gene::{ConnGene, Gene, NodeGene};
use crate::random::{split_pair, split_rng};
use crate::table::{extract_attrs, is_occupied};

/// First row of `table` whose fixed prefix equals `key`.
///
/// NaN never compares equal, so unoccupied rows are never homologs.
#[must_use]
pub fn find_homolog(key: ArrayView1<'_, f32>, table: &Array2<f32>) -> Option<usize> {
    let width = key.len();
    table
        .rows()
        .into_iter()
        .position(|row| row.slice(s![..width]).iter().zip(key.iter()).all(|(a, b)| a == b))
}

/// Cross one table of the fitter parent with the matching table of the other.
#[must_use]
pub fn crossover_table<G: Gene, R: Rng + ?Sized>(
    gene: &G,
    rng: &mut R,
    winner: &Array2<f32>,
    loser: &Array2<f32>,
) -> Array2<f32> {
    debug_assert_eq!(winner.ncols(), loser.ncols(), "parents must share a layout");

    let fixed = gene.fixed_attrs().len();
    let mut child = winner.clone();
    let row_rngs = split_rng(rng, winner.nrows());

    for ((row, mut row_rng), mut out) in winner
        .rows()
        .into_iter()
        .zip(row_rngs)
        .zip(child.rows_mut())
    {
        if !is_occupied(row) {
            continue;
        }
        let Some(homolog) = find_homolog(row.slice(s![..fixed]), loser) else {
            continue;
        };

        let attrs = gene.crossover(
            &mut row_rng,
            &extract_attrs(gene, row),
            &extract_attrs(gene, loser.row(homolog)),
        );
        for (dst, src) in out.slice_mut(s![fixed..]).iter_mut().zip(&attrs) {
            *dst = *src;
        }
    }

    child
}

/// Cross two genomes given as raw tables; `nodes1`/`conns1` is the fitter parent.
#[must_use]
pub fn crossover<N, C, R>(
    node_gene: &N,
    conn_gene: &C,
    rng: &mut R,
    (nodes1, conns1): (&Array2<f32>, &Array2<f32>),
    (nodes2, conns2): (&Array2<f32>, &Array2<f32>),
) -> (Array2<f32>, Array2<f32>)
where
    N: NodeGene,
    C: ConnGene,
    R: Rng + ?Sized,
{
    let (mut node_rng, mut conn_rng) = split_pair(rng);
    let nodes = crossover_table(node_gene, &mut node_rng, nodes1, nodes2);
    let conns = crossover_table(conn_gene, &mut conn_rng, conns1, conns2);
    (nodes, conns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::DefaultConnGene;
    use crate::error::TableKind;
    use crate::node::DefaultNodeGene;
    use crate::table::{add_row, empty_table};
    use ndarray::arr1;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bits(t: &Array2<f32>) -> Vec<u32> {
        t.iter().map(|v| v.to_bits()).collect()
    }

    fn conns_of(edges: &[(f32, f32, f32)]) -> Array2<f32> {
        let mut conns = empty_table(6, 3);
        for &(i, o, w) in edges {
            add_row(&mut conns, TableKind::Conns, &[i, o], &[w]).unwrap();
        }
        conns
    }

    #[test]
    fn test_find_homolog() {
        let conns = conns_of(&[(0.0, 2.0, 0.1), (1.0, 2.0, 0.2)]);
        assert_eq!(find_homolog(arr1(&[1.0_f32, 2.0]).view(), &conns), Some(1));
        assert_eq!(find_homolog(arr1(&[2.0_f32, 1.0]).view(), &conns), None);
        assert_eq!(find_homolog(arr1(&[f32::NAN, f32::NAN]).view(), &conns), None);
    }

    #[test]
    fn test_no_homologs_copies_winner() {
        let gene = DefaultConnGene::default();
        let winner = conns_of(&[(0.0, 2.0, 0.1), (1.0, 2.0, 0.2)]);
        let loser = conns_of(&[(0.0, 3.0, 9.0), (3.0, 2.0, 9.0), (1.0, 3.0, 9.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let child = crossover_table(&gene, &mut rng, &winner, &loser);
        assert_eq!(bits(&child), bits(&winner));
    }

    #[test]
    fn test_homologs_mix_attributes() {
        let gene = DefaultConnGene::default();
        let winner = conns_of(&[(0.0, 2.0, 1.0), (1.0, 2.0, 1.0), (0.0, 3.0, 1.0)]);
        // homologs listed in a different row order
        let loser = conns_of(&[(1.0, 2.0, -1.0), (0.0, 2.0, -1.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let mut seen = [false, false];
        for _ in 0..32 {
            let child = crossover_table(&gene, &mut rng, &winner, &loser);
            // keys and slots follow the winner
            let keys = |t: &Array2<f32>| bits(&t.slice(s![.., ..2]).to_owned());
            assert_eq!(keys(&child), keys(&winner));
            for slot in 0..2 {
                let w = child[[slot, 2]];
                assert!(w == 1.0 || w == -1.0);
                seen[usize::from(w > 0.0)] = true;
            }
            // disjoint gene untouched
            assert_eq!(child[[2, 2]], 1.0);
        }
        assert!(seen[0] && seen[1]);
    }

    #[test]
    fn test_loser_only_genes_dropped() {
        let gene = DefaultConnGene::default();
        let winner = conns_of(&[(0.0, 2.0, 1.0)]);
        let loser = conns_of(&[(0.0, 2.0, 1.0), (1.0, 2.0, 5.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let child = crossover_table(&gene, &mut rng, &winner, &loser);
        let occupied = child.rows().into_iter().filter(|r| is_occupied(*r)).count();
        assert_eq!(occupied, 1);
        assert_eq!(child.dim(), winner.dim());
    }

    #[test]
    fn test_genome_crossover_deterministic() {
        let node_gene = DefaultNodeGene::default();
        let conn_gene = DefaultConnGene::default();

        let mut nodes1 = empty_table(4, 5);
        let mut nodes2 = empty_table(4, 5);
        for key in 0..3 {
            add_row(&mut nodes1, TableKind::Nodes, &[key as f32], &[0.1, 1.0, 0.0, 1.0]).unwrap();
            add_row(&mut nodes2, TableKind::Nodes, &[key as f32], &[0.9, 2.0, 0.0, 3.0]).unwrap();
        }
        let conns1 = conns_of(&[(0.0, 2.0, 0.5), (1.0, 2.0, 0.5)]);
        let conns2 = conns_of(&[(0.0, 2.0, -0.5)]);

        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            crossover(
                &node_gene,
                &conn_gene,
                &mut rng,
                (&nodes1, &conns1),
                (&nodes2, &conns2),
            )
        };
        let (n1, c1) = run(11);
        let (n2, c2) = run(11);
        assert_eq!(bits(&n1), bits(&n2));
        assert_eq!(bits(&c1), bits(&c2));
        let keys = |t: &Array2<f32>| t.column(0).iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(keys(&n1), keys(&nodes1));
    }
}
