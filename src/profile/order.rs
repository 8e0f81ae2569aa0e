//! Management of the per-profile column order.
//!
//! The column order defines the position of every value in every row of a
//! profile.  It is only ever extended at the tail by imports and shrunk by
//! sample removal.

use std::collections::HashSet;

use super::ImportMode;
use crate::store::Txn;

/// Column orders in effect during one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstablishedOrder {
    /// Order stored before the import; empty in full-load mode.
    pub previous: Vec<u32>,
    /// Order of the samples in the data file.
    pub incoming: Vec<u32>,
    /// Order stored by the import.
    pub stored: Vec<u32>,
}

/// Append the samples of `incoming` not yet in `previous` to `previous`.
pub fn extend(previous: &[u32], incoming: &[u32]) -> Vec<u32> {
    let known = previous.iter().copied().collect::<HashSet<_>>();
    let mut result = previous.to_vec();
    result.extend(incoming.iter().copied().filter(|id| !known.contains(id)));
    result
}

/// Settle and store the column order of `profile_id` for an import of `incoming`.
pub fn establish(
    txn: &Txn<'_>,
    profile_id: u32,
    incoming: &[u32],
    mode: ImportMode,
) -> Result<EstablishedOrder, anyhow::Error> {
    let (previous, stored) = match mode {
        ImportMode::Full => (Vec::new(), incoming.to_vec()),
        ImportMode::Incremental => {
            let previous = txn.sample_order(profile_id)?;
            let stored = extend(&previous, incoming);
            (previous, stored)
        }
    };
    tracing::debug!(
        "column order of profile {}: {} previous, {} incoming, {} stored samples",
        profile_id,
        previous.len(),
        incoming.len(),
        stored.len()
    );
    txn.put_sample_order(profile_id, &stored)?;
    Ok(EstablishedOrder {
        previous,
        incoming: incoming.to_vec(),
        stored,
    })
}

/// Positions of `samples` in `order`, ascending.
pub fn removed_positions(order: &[u32], samples: &HashSet<u32>) -> Vec<usize> {
    order
        .iter()
        .enumerate()
        .filter(|(_, id)| samples.contains(*id))
        .map(|(pos, _)| pos)
        .collect()
}

/// Copy of `values` without the entries at the ascending `positions`.
pub fn splice<T: Clone>(values: &[T], positions: &[usize]) -> Vec<T> {
    let mut positions = positions.iter().peekable();
    values
        .iter()
        .enumerate()
        .filter(|(pos, _)| {
            if positions.peek() == Some(&pos) {
                positions.next();
                false
            } else {
                true
            }
        })
        .map(|(_, value)| value.clone())
        .collect()
}

/// Remove the ascending `positions` from the stored column order of `profile_id`.
///
/// The order record is deleted when no sample remains.  Returns the new order.
pub fn splice_out(
    txn: &Txn<'_>,
    profile_id: u32,
    order: &[u32],
    positions: &[usize],
) -> Result<Vec<u32>, anyhow::Error> {
    let remaining = splice(order, positions);
    if remaining.is_empty() {
        txn.delete_sample_order(profile_id)?;
    } else {
        txn.put_sample_order(profile_id, &remaining)?;
    }
    Ok(remaining)
}
