//! Resolution of the identifier columns of a data line to genetic entities.

use std::collections::HashSet;

use regex::Regex;

use super::{header::ProfileKind, Warnings};
use crate::store::{
    model::{Entity, Gene},
    Txn,
};

lazy_static::lazy_static! {
    /// Phosphorylation sites encoded in an antibody array id, e.g., `pS473` or `pT308_S473`.
    static ref PHOSPHO_RESIDUE: Regex =
        Regex::new(r"(p[STY][0-9]+(?:_[STY][0-9]+)*)").expect("invalid regex in source code");
}

/// What a data line is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSet {
    /// Micro RNA line, stored once per micro RNA gene.
    ///
    /// Non micro RNA genes that matched as well are listed in `ignored`.
    MicroRna {
        symbol: Option<String>,
        genes: Vec<Gene>,
        ignored: Vec<Gene>,
    },
    /// Exactly one gene.
    Single(Gene),
    /// All genes targeted by one antibody.
    Antibody(Vec<Gene>),
    /// A gene set or generic assay entity.
    Entity(Entity),
}

/// Resolves data lines of one import; each antibody array id is accepted once.
pub struct EntityResolver<'t, 'a> {
    txn: &'t Txn<'a>,
    kind: ProfileKind,
    array_ids: HashSet<String>,
}

/// Field `index` of `fields`, trimmed, or `None` if missing or empty.
fn field(fields: &[&str], index: Option<usize>) -> Option<String> {
    index
        .and_then(|index| fields.get(index))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(String::from)
}

impl<'t, 'a> EntityResolver<'t, 'a> {
    pub fn new(txn: &'t Txn<'a>, kind: ProfileKind) -> Self {
        Self {
            txn,
            kind,
            array_ids: HashSet::new(),
        }
    }

    /// Resolve the identifier columns of one line.
    ///
    /// Returns `None` if the line is to be skipped; the reason is recorded in `warnings`.
    pub fn resolve(
        &mut self,
        fields: &[&str],
        warnings: &mut Warnings,
    ) -> Result<Option<ResolvedSet>, anyhow::Error> {
        match self.kind {
            ProfileKind::Gene {
                hugo_symbol,
                entrez_gene_id,
                ..
            } => {
                let symbol = field(fields, hugo_symbol);
                let entrez = field(fields, entrez_gene_id);
                self.resolve_gene(symbol, entrez, warnings)
            }
            ProfileKind::Rppa { composite_ref } => {
                let composite_ref = field(fields, Some(composite_ref));
                self.resolve_antibody(composite_ref, warnings)
            }
            ProfileKind::GenesetScore { geneset_id } => {
                let geneset_id = field(fields, Some(geneset_id)).unwrap_or_default();
                match self.txn.geneset(&geneset_id)? {
                    Some(entity) => Ok(Some(ResolvedSet::Entity(entity))),
                    None => {
                        warnings.push(format!(
                            "Geneset {} not found in DB. Record will be skipped.",
                            geneset_id
                        ));
                        Ok(None)
                    }
                }
            }
            ProfileKind::GenericAssay { entity_stable_id } => {
                let stable_id = field(fields, Some(entity_stable_id)).unwrap_or_default();
                match self.txn.generic_entity(&stable_id)? {
                    Some(entity) => Ok(Some(ResolvedSet::Entity(entity))),
                    None => {
                        warnings.push(format!(
                            "Generic Assay entity {} not found in DB. Record will be skipped.",
                            stable_id
                        ));
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Checks shared by gene and antibody lines; `false` means skip.
    fn check_symbol(symbol: &str, warnings: &mut Warnings) -> bool {
        if symbol.contains("///") {
            warnings.push(format!(
                "Ignoring gene symbol: {} It is separated by ///. This indicates that the line \
                 contains information regarding multiple genes, and we cannot currently handle this",
                symbol
            ));
            false
        } else if symbol.contains("---") {
            warnings.push(format!(
                "Ignoring gene symbol: {} It is specified as ---. This indicates that the line \
                 contains information regarding an unknown gene, and we cannot currently handle this",
                symbol
            ));
            false
        } else {
            true
        }
    }

    fn resolve_gene(
        &self,
        symbol: Option<String>,
        entrez: Option<String>,
        warnings: &mut Warnings,
    ) -> Result<Option<ResolvedSet>, anyhow::Error> {
        let entrez_gene_id = match entrez.as_deref().map(str::parse::<i64>) {
            Some(Err(_)) => {
                warnings.push(format!(
                    "Ignoring line with invalid Entrez_Id {}",
                    entrez.as_deref().unwrap_or_default()
                ));
                return Ok(None);
            }
            Some(Ok(entrez_gene_id)) => Some(entrez_gene_id),
            None => None,
        };
        if symbol.is_none() && entrez_gene_id.is_none() {
            warnings.push("Ignoring line with no Hugo_Symbol and no Entrez_Id");
            return Ok(None);
        }
        if let Some(symbol) = &symbol {
            if !Self::check_symbol(symbol, warnings) {
                return Ok(None);
            }
        }

        // Entrez id first, symbol (first of several separated by `|`) second.
        let mut genes = Vec::new();
        if let Some(entrez_gene_id) = entrez_gene_id {
            genes.extend(self.txn.gene_by_entrez(entrez_gene_id)?);
        }
        if genes.is_empty() {
            if let Some(symbol) = &symbol {
                let first = match symbol.find('|') {
                    Some(ix) if ix > 0 => &symbol[..ix],
                    _ => symbol.as_str(),
                };
                genes = self.txn.genes_by_symbol(first)?;
            }
        }

        self.classify(genes, symbol, entrez_gene_id, false, warnings)
    }

    fn resolve_antibody(
        &mut self,
        composite_ref: Option<String>,
        warnings: &mut Warnings,
    ) -> Result<Option<ResolvedSet>, anyhow::Error> {
        let composite_ref = match composite_ref {
            Some(composite_ref) => composite_ref,
            None => {
                warnings.push("Ignoring line with no Composite.Element.REF value");
                return Ok(None);
            }
        };
        if !Self::check_symbol(&composite_ref, warnings) {
            return Ok(None);
        }

        let mut parts = composite_ref.split('|').collect::<Vec<_>>();
        while parts.last().map(|part| part.is_empty()).unwrap_or(false) {
            parts.pop();
        }
        if parts.len() < 2 {
            warnings.push(format!(
                "Could not parse Composite.Element.Ref value {}. Record will be skipped.",
                composite_ref
            ));
            return Ok(None);
        }
        let array_id = parts[1];
        if !self.array_ids.insert(array_id.to_string()) {
            warnings.push(format!(
                "Id {} in [{}] found to be duplicated. Record will be skipped.",
                array_id, composite_ref
            ));
            return Ok(None);
        }

        let mut genes = Vec::new();
        let mut not_found = Vec::new();
        for symbol in parts[0].split(' ').filter(|symbol| !symbol.is_empty()) {
            if symbol.eq_ignore_ascii_case("NA") {
                warnings.push(format!(
                    "Gene {} will be interpreted as 'Not Available' in this case. Record will be \
                     skipped for this gene.",
                    symbol
                ));
            } else if let Some(gene) = self.txn.non_ambiguous_gene(symbol)? {
                genes.push(gene);
            } else {
                not_found.push(symbol);
            }
        }
        if !genes.is_empty() {
            for symbol in not_found {
                warnings.push(format!(
                    "Gene {} not found in DB. Record will be skipped for this gene.",
                    symbol
                ));
            }
            if let Some(residue) = PHOSPHO_RESIDUE.captures(array_id).map(|c| c[1].to_string()) {
                genes = self.phosphoproteins(&genes, &residue, warnings)?;
            }
        }

        self.classify(genes, Some(composite_ref), None, true, warnings)
    }

    /// Map `genes` to their phosphoprotein counterparts for `residue`.
    fn phosphoproteins(
        &self,
        genes: &[Gene],
        residue: &str,
        warnings: &mut Warnings,
    ) -> Result<Vec<Gene>, anyhow::Error> {
        let mut result = Vec::with_capacity(genes.len());
        for gene in genes {
            let (phospho, created) = self.txn.add_phosphoprotein(gene, residue)?;
            if created {
                warnings.push(format!(
                    "Phosphoprotein {} not yet known in DB. Adding it to the gene catalog with 3 \
                     aliases.",
                    &phospho.hugo_symbol
                ));
            }
            result.push(phospho);
        }
        Ok(result)
    }

    /// Apply the micro RNA and ambiguity rules to the genes found for a line.
    fn classify(
        &self,
        genes: Vec<Gene>,
        symbol: Option<String>,
        entrez_gene_id: Option<i64>,
        antibody: bool,
        warnings: &mut Warnings,
    ) -> Result<Option<ResolvedSet>, anyhow::Error> {
        if genes.is_empty() {
            warnings.push(format!(
                "Gene with Entrez_Id {} and gene symbol {} not found. Record will be skipped for \
                 this gene.",
                entrez_gene_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "null".into()),
                symbol.as_deref().unwrap_or("null")
            ));
            return Ok(None);
        }

        let alias_genes = match &symbol {
            Some(symbol) => self.txn.genes_for_alias(symbol)?,
            None => Vec::new(),
        };
        let mut seen = HashSet::new();
        let (mirna, ignored): (Vec<Gene>, Vec<Gene>) = genes
            .iter()
            .chain(alias_genes.iter())
            .filter(|gene| seen.insert(gene.entrez_gene_id))
            .cloned()
            .partition(Gene::is_mirna);

        if !mirna.is_empty() {
            Ok(Some(ResolvedSet::MicroRna {
                symbol,
                genes: mirna,
                ignored,
            }))
        } else if genes.len() == 1 {
            Ok(genes.into_iter().next().map(ResolvedSet::Single))
        } else if antibody {
            Ok(Some(ResolvedSet::Antibody(genes)))
        } else {
            warnings.push(format!(
                "Gene symbol {} found to be ambiguous. Record will be skipped for this gene.",
                symbol.as_deref().unwrap_or_default()
            ));
            Ok(None)
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{EntityResolver, ResolvedSet};
    use crate::profile::{header::ProfileKind, test::seeded_store, Warnings};

    const GENE: ProfileKind = ProfileKind::Gene {
        hugo_symbol: Some(0),
        entrez_gene_id: Some(1),
        discrete_cna: false,
    };
    const RPPA: ProfileKind = ProfileKind::Rppa { composite_ref: 0 };

    /// Resolve `lines` in order and render the outcome of each as symbols.
    fn resolve_all(kind: ProfileKind, lines: &[&[&str]]) -> Result<(Vec<String>, Warnings), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = seeded_store(&tmp_dir)?;
        store.in_transaction(|txn| {
            let mut resolver = EntityResolver::new(txn, kind);
            let mut warnings = Warnings::default();
            let mut result = Vec::new();
            for fields in lines {
                let rendered = match resolver.resolve(fields, &mut warnings)? {
                    None => "skip".to_string(),
                    Some(ResolvedSet::Single(gene)) => gene.hugo_symbol,
                    Some(ResolvedSet::Antibody(genes)) => format!(
                        "antibody:{}",
                        genes.iter().map(|g| g.hugo_symbol.as_str()).collect::<Vec<_>>().join(",")
                    ),
                    Some(ResolvedSet::MicroRna { genes, ignored, .. }) => format!(
                        "mirna:{}/ignored:{}",
                        genes.iter().map(|g| g.hugo_symbol.as_str()).collect::<Vec<_>>().join(","),
                        ignored.iter().map(|g| g.hugo_symbol.as_str()).collect::<Vec<_>>().join(",")
                    ),
                    Some(ResolvedSet::Entity(entity)) => format!("entity:{}", entity.name),
                };
                result.push(rendered);
            }
            Ok((result, warnings))
        })
    }

    #[test]
    fn gene_lines() -> Result<(), anyhow::Error> {
        let (resolved, warnings) = resolve_all(
            GENE,
            &[
                &["TP53", "7157"],
                &["WRONG", "207"],
                &["KRAS", ""],
                &["", "1956"],
                &["AKT2|AKT3", ""],
                &["PKB", ""],
                &["AMBIG", ""],
                &["", "abc"],
                &["", ""],
                &["AKT1///AKT2", ""],
                &["---", ""],
                &["UNKNOWN", "999999"],
            ],
        )?;
        assert_eq!(
            resolved,
            vec![
                "TP53", "AKT1", "KRAS", "EGFR", "AKT2", "AKT1", "skip", "skip", "skip", "skip",
                "skip", "skip"
            ]
        );
        assert!(warnings.contains("Gene symbol AMBIG found to be ambiguous"));
        assert!(warnings.contains("Ignoring line with invalid Entrez_Id abc"));
        assert!(warnings.contains("Ignoring line with no Hugo_Symbol and no Entrez_Id"));
        assert!(warnings.contains("It is separated by ///"));
        assert!(warnings.contains("It is specified as ---"));
        assert!(warnings.contains("Gene with Entrez_Id 999999 and gene symbol UNKNOWN not found"));
        Ok(())
    }

    #[test]
    fn mirna_alias_matches_all_mirna_genes() -> Result<(), anyhow::Error> {
        let (resolved, _) = resolve_all(GENE, &[&["hsa-mir-100", ""]])?;
        assert_eq!(
            resolved,
            vec!["mirna:MIR-100/100*,MIR-100/100/ignored:MIR100HG"]
        );
        Ok(())
    }

    #[test]
    fn antibody_lines() -> Result<(), anyhow::Error> {
        let (resolved, warnings) = resolve_all(
            RPPA,
            &[
                &["AKT1 AKT2 AKT3|akt_pS473"],
                &["AKT1|akt_pS473"],
                &["TP53|p53"],
                &["NA EGFR|egfr"],
                &["AMBIG|brca"],
                &["KRAS"],
                &[""],
            ],
        )?;
        assert_eq!(
            resolved,
            vec![
                "antibody:AKT1_pS473,AKT2_pS473,AKT3_pS473",
                "skip",
                "TP53",
                "EGFR",
                "skip",
                "skip",
                "skip"
            ]
        );
        assert!(warnings.contains("Id akt_pS473 in [AKT1|akt_pS473] found to be duplicated"));
        assert!(warnings.contains("Gene NA will be interpreted as 'Not Available'"));
        assert!(warnings.contains("Phosphoprotein AKT1_pS473 not yet known in DB"));
        assert!(warnings.contains("Could not parse Composite.Element.Ref value KRAS"));
        assert!(warnings.contains("Ignoring line with no Composite.Element.REF value"));
        Ok(())
    }

    #[test]
    fn phosphoprotein_is_reused_by_later_lines() -> Result<(), anyhow::Error> {
        let (resolved, warnings) = resolve_all(
            RPPA,
            &[&["AKT1|akt_pS473"], &["AKT1|akt_pS473_v2"]],
        )?;
        assert_eq!(resolved, vec!["AKT1_pS473", "AKT1_pS473"]);
        assert_eq!(
            warnings
                .messages()
                .iter()
                .filter(|m| m.starts_with("Phosphoprotein"))
                .count(),
            1
        );
        Ok(())
    }
}
