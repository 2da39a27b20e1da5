//! Fixed-capacity genome tables.
//!
//! A genome is two dense `f32` tables allocated once with a hard row capacity:
//! - nodes: `[max_nodes, node_gene.length()]`, column 0 is the node key
//! - conns: `[max_conns, conn_gene.length()]`, columns 0 and 1 are the
//!   endpoint keys
//!
//! A row whose key column is NaN is an unoccupied slot; occupied rows are fully
//! populated. Integer results (row indices, adjacency cells, orderings) use
//! [`I_INF`] where the float tables would use NaN.
//!
//! Every function here is pure apart from its explicit `&mut` table argument.

use std::collections::{HashMap, HashSet};

use ndarray::{s, Array2, ArrayView1, ArrayViewMut1};

use crate::error::{NeatError, Result, TableKind};
use crate::gene::Gene;

/// Integer sentinel for "absent" in index-valued arrays.
pub const I_INF: usize = usize::MAX;

/// Allocate a table with every slot unoccupied.
#[must_use]
pub fn empty_table(capacity: usize, width: usize) -> Array2<f32> {
    Array2::from_elem((capacity, width), f32::NAN)
}

/// Whether a row holds a gene.
#[inline]
#[must_use]
pub fn is_occupied(row: ArrayView1<'_, f32>) -> bool {
    row.first().is_some_and(|key| !key.is_nan())
}

/// Number of occupied rows.
#[must_use]
pub fn occupied_count(table: &Array2<f32>) -> usize {
    table.column(0).iter().filter(|key| !key.is_nan()).count()
}

/// Row indices of every occupied slot, in table order.
pub fn occupied_slots(table: &Array2<f32>) -> impl Iterator<Item = usize> + '_ {
    table
        .column(0)
        .into_iter()
        .enumerate()
        .filter(|(_, key)| !key.is_nan())
        .map(|(slot, _)| slot)
}

/// First unoccupied slot, if any.
#[must_use]
pub fn first_free_slot(table: &Array2<f32>) -> Option<usize> {
    table.column(0).iter().position(|key| key.is_nan())
}

/// Check that no row is partially populated.
pub fn validate_table(table: &Array2<f32>, kind: TableKind) -> Result<()> {
    for (slot, row) in table.rows().into_iter().enumerate() {
        let nan = row.iter().filter(|v| v.is_nan()).count();
        if nan != 0 && nan != row.len() {
            return Err(NeatError::MalformedRow { table: kind, slot });
        }
    }
    Ok(())
}

/// Row of the first key equal to `key`.
///
/// Keys are expected to be unique, so the first match is the only match; this
/// cannot be used to detect duplicates. NaN never matches.
#[must_use]
pub fn key_to_index(key: f32, keys: ArrayView1<'_, f32>) -> Option<usize> {
    keys.iter().position(|k| *k == key)
}

/// Map every occupied connection onto an `[N, N]` grid of connection rows.
///
/// Cell `(i, j)` holds the row of the connection from node row `i` to node row
/// `j`, or [`I_INF`]. Connections whose endpoints are not present are dropped.
#[must_use]
pub fn unflatten_conns(nodes: &Array2<f32>, conns: &Array2<f32>) -> Array2<usize> {
    let n = nodes.nrows();
    let keys = nodes.column(0);
    let mut grid = Array2::from_elem((n, n), I_INF);

    for (row, conn) in conns.rows().into_iter().enumerate() {
        if !is_occupied(conn) {
            continue;
        }
        if let (Some(i), Some(o)) = (key_to_index(conn[0], keys), key_to_index(conn[1], keys)) {
            grid[[i, o]] = row;
        }
    }
    grid
}

/// Boolean adjacency over node rows.
#[must_use]
pub fn adjacency(nodes: &Array2<f32>, conns: &Array2<f32>) -> Array2<bool> {
    unflatten_conns(nodes, conns).mapv(|row| row != I_INF)
}

/// Custom attributes of a row: everything after the fixed prefix.
#[must_use]
pub fn extract_attrs<G: Gene>(gene: &G, row: ArrayView1<'_, f32>) -> Vec<f32> {
    row.slice(s![gene.fixed_attrs().len()..]).to_vec()
}

/// Overwrite the custom attributes of a row, leaving the fixed prefix alone.
pub fn set_attrs<G: Gene>(gene: &G, mut row: ArrayViewMut1<'_, f32>, attrs: &[f32]) -> Result<()> {
    let fixed = gene.fixed_attrs().len();
    let expected = row.len().saturating_sub(fixed);
    if attrs.len() != expected {
        return Err(NeatError::RowWidth {
            expected: row.len(),
            found: fixed + attrs.len(),
        });
    }
    for (dst, src) in row.slice_mut(s![fixed..]).iter_mut().zip(attrs) {
        *dst = *src;
    }
    Ok(())
}

/// Write `fixed ++ custom` into the first free slot and return that slot.
///
/// Callers are expected to check `occupied_count(table) < capacity` first;
/// a full table reports [`NeatError::CapacityExceeded`].
pub fn add_row(
    table: &mut Array2<f32>,
    kind: TableKind,
    fixed: &[f32],
    custom: &[f32],
) -> Result<usize> {
    let width = table.ncols();
    if fixed.len() + custom.len() != width {
        return Err(NeatError::RowWidth {
            expected: width,
            found: fixed.len() + custom.len(),
        });
    }
    let slot = first_free_slot(table).ok_or(NeatError::CapacityExceeded {
        table: kind,
        capacity: table.nrows(),
    })?;

    for (dst, src) in table.row_mut(slot).iter_mut().zip(fixed.iter().chain(custom)) {
        *dst = *src;
    }
    Ok(slot)
}

/// Tombstone a row, freeing its slot.
pub fn delete_row(table: &mut Array2<f32>, slot: usize) {
    table.row_mut(slot).fill(f32::NAN);
}

/// Largest occupied key, if any row is occupied.
#[must_use]
pub fn max_key(nodes: &Array2<f32>) -> Option<f32> {
    nodes
        .column(0)
        .iter()
        .copied()
        .filter(|k| !k.is_nan())
        .reduce(f32::max)
}

/// Make hidden node keys dense and contiguous.
///
/// Hidden keys (occupied, not reserved) are reassigned in row order starting
/// right after the largest reserved key; every connection endpoint follows its
/// node. Reserved keys are never touched. Running this twice is a no-op the
/// second time.
pub fn renumber_keys(
    nodes: &mut Array2<f32>,
    conns: &mut Array2<f32>,
    input_keys: &[usize],
    output_keys: &[usize],
) {
    let reserved: HashSet<usize> = input_keys.iter().chain(output_keys).copied().collect();
    let mut next_key = reserved.iter().max().map_or(0, |k| k + 1);

    let mut old_to_new: HashMap<usize, usize> = HashMap::new();
    for key in nodes.column(0).iter() {
        if key.is_nan() {
            continue;
        }
        let key = *key as usize;
        if reserved.contains(&key) {
            continue;
        }
        old_to_new.insert(key, next_key);
        next_key += 1;
    }

    let remap = |v: &mut f32| {
        if v.is_nan() {
            return;
        }
        if let Some(&new) = old_to_new.get(&(*v as usize)) {
            *v = new as f32;
        }
    };

    nodes.column_mut(0).iter_mut().for_each(remap);
    conns.column_mut(0).iter_mut().for_each(remap);
    conns.column_mut(1).iter_mut().for_each(remap);
}

/// Serde adapter for tables: unoccupied cells are written as `null`, so
/// genomes survive formats without a NaN literal such as JSON.
pub mod nan_as_null {
    use ndarray::Array2;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Repr {
        rows: usize,
        cols: usize,
        data: Vec<Option<f32>>,
    }

    pub fn serialize<S: Serializer>(table: &Array2<f32>, serializer: S) -> Result<S::Ok, S::Error> {
        Repr {
            rows: table.nrows(),
            cols: table.ncols(),
            data: table.iter().map(|v| (!v.is_nan()).then_some(*v)).collect(),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Array2<f32>, D::Error> {
        let repr = Repr::deserialize(deserializer)?;
        let data = repr.data.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect();
        Array2::from_shape_vec((repr.rows, repr.cols), data).map_err(D::Error::custom)
    }
}
