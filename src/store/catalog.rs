//! Catalog accessors: studies, samples, profiles, and genetic entities.

use std::collections::BTreeSet;

use super::{
    keys,
    model::{
        AlterationType, Entity, EntityKind, Gene, Profile, Sample, Study, GENE_TYPE_PHOSPHOPROTEIN,
    },
    Txn, CF_ENTITIES, CF_GENERIC_ENTITIES, CF_GENES, CF_GENESETS, CF_GENE_ALIASES,
    CF_GENE_SYMBOLS, CF_PROFILES, CF_SAMPLES, CF_STUDIES,
};

/// Sequence of study ids.
const SEQ_STUDY: &str = "study";
/// Sequence of sample ids.
const SEQ_SAMPLE: &str = "sample";
/// Sequence of profile ids.
const SEQ_PROFILE: &str = "profile";
/// Sequence of entity ids, shared by all entity kinds.
const SEQ_ENTITY: &str = "entity";
/// Sequence of synthetic gene ids, used negated as pseudo-Entrez ids.
const SEQ_SYNTHETIC_GENE: &str = "synthetic_gene";

/// Offset of the pseudo-Entrez ids of synthetic genes.
const SYNTHETIC_ENTREZ_OFFSET: i64 = 1_000_000_000;

impl<'a> Txn<'a> {
    /// Lookup study by stable id.
    pub fn study(&self, stable_id: &str) -> Result<Option<Study>, anyhow::Error> {
        self.get_json(CF_STUDIES, stable_id.as_bytes())
    }

    /// Return the study with the given stable id, creating it if necessary.
    pub fn add_study(&self, stable_id: &str) -> Result<Study, anyhow::Error> {
        if let Some(study) = self.study(stable_id)? {
            return Ok(study);
        }
        let study = Study {
            internal_id: self.next_id(SEQ_STUDY)?,
            stable_id: stable_id.to_string(),
        };
        self.put_json(CF_STUDIES, stable_id.as_bytes(), &study)?;
        Ok(study)
    }

    /// Lookup sample by study and stable id.
    pub fn sample(&self, study_id: u32, stable_id: &str) -> Result<Option<Sample>, anyhow::Error> {
        self.get_json(CF_SAMPLES, &keys::sample(study_id, stable_id))
    }

    /// Return the sample, creating it if necessary.
    pub fn add_sample(&self, study_id: u32, stable_id: &str) -> Result<Sample, anyhow::Error> {
        if let Some(sample) = self.sample(study_id, stable_id)? {
            return Ok(sample);
        }
        let sample = Sample {
            internal_id: self.next_id(SEQ_SAMPLE)?,
            stable_id: stable_id.to_string(),
            study_id,
        };
        self.put_json(CF_SAMPLES, &keys::sample(study_id, stable_id), &sample)?;
        Ok(sample)
    }

    /// All samples of a study.
    pub fn samples(&self, study_id: u32) -> Result<Vec<Sample>, anyhow::Error> {
        Ok(self
            .scan_prefix(CF_SAMPLES, &study_id.to_be_bytes())?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice::<Sample>(&value))
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Delete the sample record; links and events are handled by the caller.
    pub fn delete_sample(&self, sample: &Sample) -> Result<(), anyhow::Error> {
        self.delete(CF_SAMPLES, &keys::sample(sample.study_id, &sample.stable_id))
    }

    /// Lookup profile by stable id.
    pub fn profile(&self, stable_id: &str) -> Result<Option<Profile>, anyhow::Error> {
        self.get_json(CF_PROFILES, stable_id.as_bytes())
    }

    /// Return the profile, creating it if necessary.
    ///
    /// An existing profile is returned unchanged.
    pub fn add_profile(
        &self,
        study_id: u32,
        stable_id: &str,
        alteration_type: AlterationType,
        show_profile_in_analysis_tab: bool,
    ) -> Result<Profile, anyhow::Error> {
        if let Some(profile) = self.profile(stable_id)? {
            return Ok(profile);
        }
        let profile = Profile {
            internal_id: self.next_id(SEQ_PROFILE)?,
            stable_id: stable_id.to_string(),
            study_id,
            alteration_type,
            show_profile_in_analysis_tab,
        };
        self.put_json(CF_PROFILES, stable_id.as_bytes(), &profile)?;
        Ok(profile)
    }

    /// All profiles of a study, ordered by internal id.
    pub fn profiles_for_study(&self, study_id: u32) -> Result<Vec<Profile>, anyhow::Error> {
        let mut result = self
            .scan_prefix(CF_PROFILES, &[])?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice::<Profile>(&value))
            .collect::<Result<Vec<_>, _>>()?;
        result.retain(|profile| profile.study_id == study_id);
        result.sort_by_key(|profile| profile.internal_id);
        Ok(result)
    }

    /// Lookup entity by internal id.
    pub fn entity(&self, entity_id: u32) -> Result<Option<Entity>, anyhow::Error> {
        self.get_json(CF_ENTITIES, &keys::entity(entity_id))
    }

    fn new_entity(&self, kind: EntityKind, name: &str) -> Result<Entity, anyhow::Error> {
        let entity = Entity {
            entity_id: self.next_id(SEQ_ENTITY)?,
            kind,
            name: name.to_string(),
        };
        self.put_json(CF_ENTITIES, &keys::entity(entity.entity_id), &entity)?;
        Ok(entity)
    }

    /// Return the gene with the given Entrez id, creating it and its index entries if necessary.
    pub fn add_gene(
        &self,
        entrez_gene_id: i64,
        hugo_symbol: &str,
        gene_type: &str,
        aliases: &[String],
    ) -> Result<Gene, anyhow::Error> {
        if let Some(gene) = self.gene_by_entrez(entrez_gene_id)? {
            return Ok(gene);
        }
        let mut gene = Gene {
            entity_id: 0,
            entrez_gene_id,
            hugo_symbol: hugo_symbol.to_string(),
            gene_type: gene_type.to_string(),
            aliases: aliases.to_vec(),
        };
        gene.entity_id = self.new_entity(gene.entity_kind(), hugo_symbol)?.entity_id;
        self.put_json(CF_GENES, &keys::gene(entrez_gene_id), &gene)?;
        self.put_raw(
            CF_GENE_SYMBOLS,
            &keys::symbol_entry(hugo_symbol, entrez_gene_id),
            &[],
        )?;
        for alias in aliases {
            self.put_raw(
                CF_GENE_ALIASES,
                &keys::symbol_entry(alias, entrez_gene_id),
                &[],
            )?;
        }
        Ok(gene)
    }

    /// Return the synthetic phosphoprotein gene for `gene` and `residue`, creating it if necessary.
    ///
    /// The flag tells whether the gene was created.
    pub fn add_phosphoprotein(
        &self,
        gene: &Gene,
        residue: &str,
    ) -> Result<(Gene, bool), anyhow::Error> {
        let symbol = format!("{}_{}", gene.hugo_symbol, residue);
        if let Some(existing) = self.genes_by_hugo_symbol(&symbol)?.into_iter().next() {
            return Ok((existing, false));
        }
        let entrez_gene_id = -(SYNTHETIC_ENTREZ_OFFSET + i64::from(self.next_id(SEQ_SYNTHETIC_GENE)?));
        let aliases = vec![
            "rppa-phospho".to_string(),
            "phosphoprotein".to_string(),
            format!("phospho{}", gene.hugo_symbol),
        ];
        let gene = self.add_gene(entrez_gene_id, &symbol, GENE_TYPE_PHOSPHOPROTEIN, &aliases)?;
        Ok((gene, true))
    }

    /// Lookup gene by Entrez id.
    pub fn gene_by_entrez(&self, entrez_gene_id: i64) -> Result<Option<Gene>, anyhow::Error> {
        self.get_json(CF_GENES, &keys::gene(entrez_gene_id))
    }

    /// Resolve the index entries of `symbol` in `cf_name` to genes.
    fn genes_by_index(&self, cf_name: &str, symbol: &str) -> Result<Vec<Gene>, anyhow::Error> {
        let entrez_ids = self
            .scan_prefix(cf_name, &keys::symbol_prefix(symbol))?
            .into_iter()
            .filter_map(|(key, _)| keys::entrez_of_symbol_entry(&key))
            .collect::<BTreeSet<_>>();
        let mut result = Vec::with_capacity(entrez_ids.len());
        for entrez_gene_id in entrez_ids {
            match self.gene_by_entrez(entrez_gene_id)? {
                Some(gene) => result.push(gene),
                None => anyhow::bail!(
                    "dangling {} entry {:?} -> {}",
                    cf_name,
                    symbol,
                    entrez_gene_id
                ),
            }
        }
        Ok(result)
    }

    /// Genes whose HUGO symbol equals `symbol`, ignoring case.
    pub fn genes_by_hugo_symbol(&self, symbol: &str) -> Result<Vec<Gene>, anyhow::Error> {
        self.genes_by_index(CF_GENE_SYMBOLS, symbol)
    }

    /// Genes carrying `alias`, ignoring case.
    pub fn genes_for_alias(&self, alias: &str) -> Result<Vec<Gene>, anyhow::Error> {
        self.genes_by_index(CF_GENE_ALIASES, alias)
    }

    /// Genes for `symbol`: the HUGO matches, or the alias matches if there are none.
    pub fn genes_by_symbol(&self, symbol: &str) -> Result<Vec<Gene>, anyhow::Error> {
        let genes = self.genes_by_hugo_symbol(symbol)?;
        if genes.is_empty() {
            self.genes_for_alias(symbol)
        } else {
            Ok(genes)
        }
    }

    /// The single gene for `symbol`, by HUGO symbol first and alias second.
    pub fn non_ambiguous_gene(&self, symbol: &str) -> Result<Option<Gene>, anyhow::Error> {
        let mut genes = self.genes_by_hugo_symbol(symbol)?;
        if genes.len() == 1 {
            return Ok(genes.pop());
        }
        if genes.is_empty() {
            let mut genes = self.genes_for_alias(symbol)?;
            if genes.len() == 1 {
                return Ok(genes.pop());
            }
        }
        Ok(None)
    }

    /// Return the gene set entity, creating it if necessary.
    pub fn add_geneset(&self, external_id: &str) -> Result<Entity, anyhow::Error> {
        if let Some(entity) = self.geneset(external_id)? {
            return Ok(entity);
        }
        let entity = self.new_entity(EntityKind::Geneset, external_id)?;
        self.put_json(CF_GENESETS, external_id.as_bytes(), &entity)?;
        Ok(entity)
    }

    /// Lookup gene set entity by external id.
    pub fn geneset(&self, external_id: &str) -> Result<Option<Entity>, anyhow::Error> {
        self.get_json(CF_GENESETS, external_id.as_bytes())
    }

    /// Return the generic assay entity, creating it if necessary.
    pub fn add_generic_entity(&self, stable_id: &str) -> Result<Entity, anyhow::Error> {
        if let Some(entity) = self.generic_entity(stable_id)? {
            return Ok(entity);
        }
        let entity = self.new_entity(EntityKind::GenericAssay, stable_id)?;
        self.put_json(CF_GENERIC_ENTITIES, stable_id.as_bytes(), &entity)?;
        Ok(entity)
    }

    /// Lookup generic assay entity by stable id.
    pub fn generic_entity(&self, stable_id: &str) -> Result<Option<Entity>, anyhow::Error> {
        self.get_json(CF_GENERIC_ENTITIES, stable_id.as_bytes())
    }
}

#[cfg(test)]
mod test {
    use crate::store::{model::AlterationType, Store};

    fn genes(txn: &crate::store::Txn<'_>) -> Result<(), anyhow::Error> {
        txn.add_gene(207, "AKT1", "protein-coding", &["PKB".into(), "RAC".into()])?;
        txn.add_gene(672, "BRCA1", "protein-coding", &["AMBIG".into()])?;
        txn.add_gene(675, "BRCA2", "protein-coding", &["AMBIG".into()])?;
        Ok(())
    }

    #[test]
    fn studies_samples_profiles_are_idempotent() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(tmp_dir.join("db"))?;

        store.in_transaction(|txn| {
            let study = txn.add_study("study_es_0")?;
            assert_eq!(txn.add_study("study_es_0")?, study);
            let s1 = txn.add_sample(study.internal_id, "S1")?;
            let s2 = txn.add_sample(study.internal_id, "S2")?;
            assert_eq!(txn.add_sample(study.internal_id, "S1")?, s1);
            assert_eq!(txn.samples(study.internal_id)?, vec![s1, s2]);

            let other = txn.add_study("other")?;
            txn.add_sample(other.internal_id, "S1")?;
            txn.add_profile(other.internal_id, "other_mrna", AlterationType::MrnaExpression, false)?;
            let profile = txn.add_profile(
                study.internal_id,
                "study_es_0_gistic",
                AlterationType::CopyNumberAlteration,
                true,
            )?;
            assert_eq!(txn.profiles_for_study(study.internal_id)?, vec![profile]);
            Ok(())
        })
    }

    #[test]
    fn gene_lookups() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(tmp_dir.join("db"))?;

        store.in_transaction(|txn| {
            genes(txn)?;

            let names = |genes: Vec<crate::store::model::Gene>| {
                genes.into_iter().map(|g| g.hugo_symbol).collect::<Vec<_>>()
            };
            assert_eq!(names(txn.genes_by_symbol("akt1")?), vec!["AKT1"]);
            assert_eq!(names(txn.genes_by_symbol("PKB")?), vec!["AKT1"]);
            assert_eq!(names(txn.genes_by_symbol("AMBIG")?), vec!["BRCA1", "BRCA2"]);
            assert_eq!(names(txn.genes_by_symbol("AKT")?), Vec::<String>::new());
            assert_eq!(names(txn.genes_for_alias("AKT1")?), Vec::<String>::new());

            assert_eq!(
                txn.non_ambiguous_gene("RAC")?.map(|g| g.entrez_gene_id),
                Some(207)
            );
            assert_eq!(txn.non_ambiguous_gene("AMBIG")?, None);
            Ok(())
        })
    }

    #[test]
    fn phosphoprotein_is_created_once() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(tmp_dir.join("db"))?;

        store.in_transaction(|txn| {
            genes(txn)?;
            let akt1 = txn
                .gene_by_entrez(207)?
                .ok_or_else(|| anyhow::anyhow!("AKT1 missing"))?;
            let (phospho, created) = txn.add_phosphoprotein(&akt1, "pS473")?;
            assert!(created);
            assert_eq!(phospho.hugo_symbol, "AKT1_pS473");
            assert_eq!(phospho.gene_type, "phosphoprotein");
            assert!(phospho.entrez_gene_id < 0);
            assert_eq!(
                phospho.aliases,
                vec!["rppa-phospho", "phosphoprotein", "phosphoAKT1"]
            );
            assert_eq!(txn.add_phosphoprotein(&akt1, "pS473")?, (phospho.clone(), false));

            let entity = txn
                .entity(phospho.entity_id)?
                .ok_or_else(|| anyhow::anyhow!("entity missing"))?;
            assert_eq!(entity.kind, crate::store::model::EntityKind::Phosphoprotein);
            Ok(())
        })
    }

    #[test]
    fn genesets_and_generic_entities() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(tmp_dir.join("db"))?;

        store.in_transaction(|txn| {
            let geneset = txn.add_geneset("HINATA_NFKB_MATRIX")?;
            assert_eq!(txn.geneset("HINATA_NFKB_MATRIX")?, Some(geneset.clone()));
            let generic = txn.add_generic_entity("17-AAG")?;
            assert_ne!(generic.entity_id, geneset.entity_id);
            assert_eq!(txn.generic_entity("17-AAG")?, Some(generic));
            assert_eq!(txn.generic_entity("unknown")?, None);
            Ok(())
        })
    }
}
