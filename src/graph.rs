//! Graph algorithms over the dense adjacency of a genome.
//!
//! Both algorithms work on node *rows* (slot indices), not keys, and take the
//! boolean `[N, N]` adjacency built by [`crate::table::adjacency`], where cell
//! `(i, j)` means an edge from row `i` to row `j`.
//!
//! ## Determinism
//!
//! Kahn's algorithm always picks the lowest-index node with in-degree zero, so
//! identical inputs give identical orders regardless of how the tables were
//! built.

use ndarray::Array2;

use crate::error::{NeatError, Result};
use crate::table::{is_occupied, I_INF};

/// In-degree bookkeeping for Kahn's algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Degree {
    /// Unoccupied slot; never selected.
    Absent,
    /// Already emitted; never selected again.
    Visited,
    Pending(usize),
}

/// Topological order of the occupied nodes.
///
/// Returns a vector of length `N` holding node rows in evaluation order,
/// padded with [`I_INF`] after the last node that could be ordered. A graph
/// with a cycle stalls early, leaving more padding than there are absent rows.
///
/// # Panics
///
/// If `adjacency` is not `[N, N]` for a node table of `N` rows.
#[must_use]
pub fn topological_sort(nodes: &Array2<f32>, adjacency: &Array2<bool>) -> Vec<usize> {
    let n = nodes.nrows();
    debug_assert_eq!(adjacency.dim(), (n, n), "adjacency must be [N, N]");

    let mut in_degree: Vec<Degree> = nodes
        .rows()
        .into_iter()
        .enumerate()
        .map(|(idx, row)| {
            if is_occupied(row) {
                Degree::Pending(adjacency.column(idx).iter().filter(|e| **e).count())
            } else {
                Degree::Absent
            }
        })
        .collect();

    let mut order = vec![I_INF; n];
    let mut len = 0;

    while let Some(u) = in_degree.iter().position(|d| *d == Degree::Pending(0)) {
        order[len] = u;
        len += 1;
        in_degree[u] = Degree::Visited;

        for (v, edge) in adjacency.row(u).iter().enumerate() {
            if !*edge {
                continue;
            }
            if let Degree::Pending(d) = &mut in_degree[v] {
                *d = d.saturating_sub(1);
            }
        }
    }

    order
}

/// Number of valid (non-sentinel) entries in an order from [`topological_sort`].
#[must_use]
pub fn ordered_len(order: &[usize]) -> usize {
    order.iter().take_while(|idx| **idx != I_INF).count()
}

/// Whether the occupied nodes contain a cycle.
#[must_use]
pub fn has_cycle(nodes: &Array2<f32>, adjacency: &Array2<bool>) -> bool {
    let occupied = nodes.rows().into_iter().filter(|r| is_occupied(*r)).count();
    ordered_len(&topological_sort(nodes, adjacency)) < occupied
}

/// Whether adding the edge `from_idx -> to_idx` would close a cycle.
///
/// The edge is added tentatively (the caller's adjacency is left untouched)
/// and the set of rows reachable from `to_idx` is grown one hop per iteration
/// until it stops changing or contains `from_idx`. The set can grow at most
/// `N - 1` times, so failing to settle within `N` iterations means the
/// adjacency is corrupt and is reported as
/// [`NeatError::NonTerminatingReachability`]. An index outside the table
/// gives [`NeatError::SlotOutOfRange`].
pub fn check_cycles(
    nodes: &Array2<f32>,
    adjacency: &Array2<bool>,
    from_idx: usize,
    to_idx: usize,
) -> Result<bool> {
    let n = nodes.nrows();
    if let Some(found) = [adjacency.nrows(), adjacency.ncols()].into_iter().find(|&d| d != n) {
        return Err(NeatError::RowWidth { expected: n, found });
    }
    if let Some(&slot) = [from_idx, to_idx].iter().find(|&&idx| idx >= n) {
        return Err(NeatError::SlotOutOfRange { slot, capacity: n });
    }

    let edge = |i: usize, j: usize| adjacency[[i, j]] || (i == from_idx && j == to_idx);

    let mut visited = vec![false; n];
    visited[to_idx] = true;

    for _ in 0..=n {
        if visited[from_idx] {
            return Ok(true);
        }

        let mut next = visited.clone();
        for (i, _) in visited.iter().enumerate().filter(|(_, v)| **v) {
            for (j, reached) in next.iter_mut().enumerate() {
                if !*reached && edge(i, j) {
                    *reached = true;
                }
            }
        }

        if next == visited {
            return Ok(false);
        }
        visited = next;
    }

    Err(NeatError::NonTerminatingReachability { nodes: n })
}
