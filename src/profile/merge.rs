//! Merging of incoming rows with the rows stored before an import.

use std::collections::{BTreeMap, HashMap};

use super::{order::EstablishedOrder, ImportMode};

/// Projects incoming rows onto the stored column order.
///
/// In incremental mode, the stored rows are indexed by sample id so that old
/// and new values can be combined even though the two column orders differ.
#[derive(Debug, Clone)]
pub struct RowMerger {
    mode: ImportMode,
    /// Column order of the data file.
    incoming: Vec<u32>,
    /// Column order stored by the import.
    stored: Vec<u32>,
    /// Previously stored values by entity id and sample id; entries are taken on merge.
    previous: BTreeMap<u32, HashMap<u32, String>>,
}

impl RowMerger {
    /// Create merger for the orders of one import; no previous rows are known yet.
    pub fn new(mode: ImportMode, order: &EstablishedOrder) -> Self {
        Self {
            mode,
            incoming: order.incoming.clone(),
            stored: order.stored.clone(),
            previous: BTreeMap::new(),
        }
    }

    /// Register the rows stored under the column order `previous_order`.
    ///
    /// Fails if a row does not match the length of the column order.
    pub fn load_previous(
        &mut self,
        previous_order: &[u32],
        rows: BTreeMap<u32, Vec<String>>,
    ) -> Result<(), anyhow::Error> {
        for (entity_id, values) in rows {
            if values.len() != previous_order.len() {
                anyhow::bail!(
                    "stored row of entity {} has {} values but the column order has {} samples",
                    entity_id,
                    values.len(),
                    previous_order.len()
                );
            }
            self.previous.insert(
                entity_id,
                previous_order.iter().copied().zip(values).collect(),
            );
        }
        Ok(())
    }

    /// Number of previously stored rows not yet merged.
    pub fn untouched_len(&self) -> usize {
        self.previous.len()
    }

    /// Final values of entity `entity_id` given its `values` aligned to the incoming order.
    pub fn merge_row(&mut self, entity_id: u32, values: Vec<String>) -> Vec<String> {
        match self.mode {
            ImportMode::Full => values,
            ImportMode::Incremental => {
                let mut old = self.previous.remove(&entity_id).unwrap_or_default();
                let new = self
                    .incoming
                    .iter()
                    .copied()
                    .zip(values)
                    .collect::<HashMap<_, _>>();
                self.stored
                    .iter()
                    .map(|sample_id| {
                        let old_value = old.remove(sample_id);
                        new.get(sample_id)
                            .cloned()
                            .or(old_value)
                            .unwrap_or_default()
                    })
                    .collect()
            }
        }
    }

    /// Rows stored before the import that no line touched, expanded to the stored order.
    ///
    /// Old values stay at their samples; appended samples get empty values.
    pub fn take_untouched(&mut self) -> Vec<(u32, Vec<String>)> {
        let stored = &self.stored;
        std::mem::take(&mut self.previous)
            .into_iter()
            .map(|(entity_id, mut old)| {
                let values = stored
                    .iter()
                    .map(|sample_id| old.remove(sample_id).unwrap_or_default())
                    .collect();
                (entity_id, values)
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::RowMerger;
    use crate::profile::{
        order::{extend, EstablishedOrder},
        ImportMode,
    };

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn incremental(previous: &[u32], incoming: &[u32]) -> EstablishedOrder {
        EstablishedOrder {
            previous: previous.to_vec(),
            incoming: incoming.to_vec(),
            stored: extend(previous, incoming),
        }
    }

    #[test]
    fn merge_incremental_row() -> Result<(), anyhow::Error> {
        let order = incremental(&[1, 2], &[2, 3]);
        let mut merger = RowMerger::new(ImportMode::Incremental, &order);
        merger.load_previous(&order.previous, BTreeMap::from([(10, strings(&["A", "B"]))]))?;

        assert_eq!(
            merger.merge_row(10, strings(&["C", "D"])),
            strings(&["A", "C", "D"])
        );
        assert_eq!(merger.untouched_len(), 0);
        Ok(())
    }

    #[test]
    fn merge_new_entity_in_incremental_mode() -> Result<(), anyhow::Error> {
        let order = incremental(&[1, 2], &[3, 1]);
        let mut merger = RowMerger::new(ImportMode::Incremental, &order);
        merger.load_previous(&order.previous, BTreeMap::new())?;

        assert_eq!(
            merger.merge_row(20, strings(&["x", "y"])),
            strings(&["y", "", "x"])
        );
        Ok(())
    }

    #[test]
    fn full_mode_returns_incoming_row() {
        let order = EstablishedOrder {
            previous: vec![],
            incoming: vec![4, 5],
            stored: vec![4, 5],
        };
        let mut merger = RowMerger::new(ImportMode::Full, &order);
        assert_eq!(merger.merge_row(1, strings(&["1", "2"])), strings(&["1", "2"]));
        assert!(merger.take_untouched().is_empty());
    }

    #[test]
    fn untouched_rows_are_expanded() -> Result<(), anyhow::Error> {
        let order = incremental(&[1, 2], &[2, 3]);
        let mut merger = RowMerger::new(ImportMode::Incremental, &order);
        merger.load_previous(
            &order.previous,
            BTreeMap::from([
                (10, strings(&["A", "B"])),
                (11, strings(&["E", "F"])),
            ]),
        )?;
        merger.merge_row(10, strings(&["C", "D"]));

        assert_eq!(
            merger.take_untouched(),
            vec![(11, strings(&["E", "F", ""]))]
        );
        assert_eq!(merger.untouched_len(), 0);
        Ok(())
    }

    #[test]
    fn misaligned_previous_row_is_an_error() {
        let order = incremental(&[1, 2], &[3]);
        let mut merger = RowMerger::new(ImportMode::Incremental, &order);
        let res = merger.load_previous(&order.previous, BTreeMap::from([(10, strings(&["A"]))]));
        assert!(res.is_err());
    }
}
