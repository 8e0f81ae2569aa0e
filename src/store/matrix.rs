//! Matrix accessors: column orders, value rows, sample links, and CNA events.

use std::collections::{BTreeMap, HashSet};

use super::{
    keys,
    model::{CnaEvent, SampleProfile},
    Txn, CF_ALTERATIONS, CF_CNA_EVENTS, CF_SAMPLE_ORDER, CF_SAMPLE_PROFILE,
};

impl<'a> Txn<'a> {
    /// The stored column order of a profile, empty if none is stored.
    pub fn sample_order(&self, profile_id: u32) -> Result<Vec<u32>, anyhow::Error> {
        Ok(self
            .get_json(CF_SAMPLE_ORDER, &keys::profile(profile_id))?
            .unwrap_or_default())
    }

    /// Replace the stored column order of a profile.
    pub fn put_sample_order(&self, profile_id: u32, order: &[u32]) -> Result<(), anyhow::Error> {
        self.put_json(CF_SAMPLE_ORDER, &keys::profile(profile_id), &order)
    }

    /// Remove the stored column order of a profile.
    pub fn delete_sample_order(&self, profile_id: u32) -> Result<(), anyhow::Error> {
        self.delete(CF_SAMPLE_ORDER, &keys::profile(profile_id))
    }

    /// All stored rows of a profile by entity id.
    pub fn rows(&self, profile_id: u32) -> Result<BTreeMap<u32, Vec<String>>, anyhow::Error> {
        let mut result = BTreeMap::new();
        for (key, value) in self.scan_prefix(CF_ALTERATIONS, &keys::profile(profile_id))? {
            let entity_id = keys::second_u32(&key)
                .ok_or_else(|| anyhow::anyhow!("malformed row key {:?}", &key))?;
            result.insert(entity_id, serde_json::from_slice(&value)?);
        }
        Ok(result)
    }

    /// Write the row of one entity, replacing any previous row.
    pub fn put_row(
        &self,
        profile_id: u32,
        entity_id: u32,
        values: &[String],
    ) -> Result<(), anyhow::Error> {
        self.put_json(CF_ALTERATIONS, &keys::row(profile_id, entity_id), &values)
    }

    /// Delete all rows of a profile, returning the number of deleted rows.
    pub fn delete_rows(&self, profile_id: u32) -> Result<usize, anyhow::Error> {
        self.delete_prefix(CF_ALTERATIONS, &keys::profile(profile_id))
    }

    /// Link a sample to a profile, replacing an existing link.
    pub fn link_sample_profile(&self, link: &SampleProfile) -> Result<(), anyhow::Error> {
        self.put_json(
            CF_SAMPLE_PROFILE,
            &keys::sample_profile(link.profile_id, link.sample_id),
            link,
        )
    }

    /// The link between a sample and a profile, if any.
    pub fn sample_profile(
        &self,
        profile_id: u32,
        sample_id: u32,
    ) -> Result<Option<SampleProfile>, anyhow::Error> {
        self.get_json(
            CF_SAMPLE_PROFILE,
            &keys::sample_profile(profile_id, sample_id),
        )
    }

    /// Remove the link between a sample and a profile.
    pub fn unlink_sample_profile(&self, profile_id: u32, sample_id: u32) -> Result<(), anyhow::Error> {
        self.delete(
            CF_SAMPLE_PROFILE,
            &keys::sample_profile(profile_id, sample_id),
        )
    }

    /// Insert or replace a CNA event.
    pub fn put_cna_event(&self, event: &CnaEvent) -> Result<(), anyhow::Error> {
        self.put_json(
            CF_CNA_EVENTS,
            &keys::cna_event(event.profile_id, event.sample_id, event.entrez_gene_id),
            event,
        )
    }

    /// Delete the CNA event of one sample and gene, if any.
    pub fn delete_cna_event(
        &self,
        profile_id: u32,
        sample_id: u32,
        entrez_gene_id: i64,
    ) -> Result<(), anyhow::Error> {
        self.delete(
            CF_CNA_EVENTS,
            &keys::cna_event(profile_id, sample_id, entrez_gene_id),
        )
    }

    /// All CNA events of a profile, ordered by sample and gene.
    pub fn cna_events(&self, profile_id: u32) -> Result<Vec<CnaEvent>, anyhow::Error> {
        Ok(self
            .scan_prefix(CF_CNA_EVENTS, &keys::profile(profile_id))?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice::<CnaEvent>(&value))
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Delete the CNA events of a profile, restricted to `samples` if given.
    ///
    /// Returns the number of deleted events.
    pub fn delete_cna_events(
        &self,
        profile_id: u32,
        samples: Option<&HashSet<u32>>,
    ) -> Result<usize, anyhow::Error> {
        match samples {
            None => self.delete_prefix(CF_CNA_EVENTS, &keys::profile(profile_id)),
            Some(samples) => {
                let mut count = 0;
                for sample_id in samples {
                    count += self.delete_prefix(
                        CF_CNA_EVENTS,
                        &keys::sample_profile(profile_id, *sample_id),
                    )?;
                }
                Ok(count)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::{BTreeMap, HashSet};

    use crate::store::{
        model::{CnaEvent, SampleProfile},
        Store,
    };

    fn event(sample_id: u32, entrez_gene_id: i64, alteration: i16) -> CnaEvent {
        CnaEvent {
            sample_id,
            profile_id: 1,
            entrez_gene_id,
            alteration,
            driver: None,
        }
    }

    #[test]
    fn rows_are_scoped_by_profile() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(tmp_dir.join("db"))?;

        store.in_transaction(|txn| {
            txn.put_sample_order(1, &[3, 1])?;
            txn.put_row(1, 20, &["a".into(), "b".into()])?;
            txn.put_row(1, 10, &["c".into(), "d".into()])?;
            txn.put_row(2, 10, &["x".into()])?;

            assert_eq!(txn.sample_order(1)?, vec![3, 1]);
            assert_eq!(txn.sample_order(2)?, Vec::<u32>::new());
            let rows = txn.rows(1)?;
            assert_eq!(rows.keys().copied().collect::<Vec<_>>(), vec![10, 20]);
            assert_eq!(
                txn.rows(2)?,
                BTreeMap::from([(10, vec!["x".to_string()])])
            );

            assert_eq!(txn.delete_rows(1)?, 2);
            assert!(txn.rows(1)?.is_empty());
            assert_eq!(txn.rows(2)?.len(), 1);
            Ok(())
        })
    }

    #[test]
    fn cna_events_upsert_and_delete_by_sample() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(tmp_dir.join("db"))?;

        store.in_transaction(|txn| {
            txn.put_cna_event(&event(1, 207, 2))?;
            txn.put_cna_event(&event(1, 207, -2))?;
            txn.put_cna_event(&event(2, 207, 2))?;
            txn.put_cna_event(&event(3, 672, -2))?;
            assert_eq!(
                txn.cna_events(1)?,
                vec![event(1, 207, -2), event(2, 207, 2), event(3, 672, -2)]
            );

            let samples = HashSet::from([1, 3]);
            assert_eq!(txn.delete_cna_events(1, Some(&samples))?, 2);
            assert_eq!(txn.cna_events(1)?, vec![event(2, 207, 2)]);
            txn.delete_cna_event(1, 2, 672)?;
            assert_eq!(txn.cna_events(1)?, vec![event(2, 207, 2)]);
            txn.delete_cna_event(1, 2, 207)?;
            assert!(txn.cna_events(1)?.is_empty());
            txn.put_cna_event(&event(2, 207, 2))?;
            assert_eq!(txn.delete_cna_events(1, None)?, 1);
            Ok(())
        })
    }

    #[test]
    fn sample_profile_links() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(tmp_dir.join("db"))?;

        store.in_transaction(|txn| {
            let link = SampleProfile {
                sample_id: 4,
                profile_id: 1,
                gene_panel: Some("IMPACT410".into()),
            };
            txn.link_sample_profile(&link)?;
            assert_eq!(txn.sample_profile(1, 4)?, Some(link));
            txn.unlink_sample_profile(1, 4)?;
            assert_eq!(txn.sample_profile(1, 4)?, None);
            Ok(())
        })
    }
}
