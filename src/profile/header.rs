//! Parsing of the header line of a profile data file.

use crate::{
    err::ImportError,
    store::model::{AlterationType, Profile},
};

/// Column holding HUGO symbols.
pub const COL_HUGO_SYMBOL: &str = "Hugo_Symbol";
/// Column holding Entrez gene ids.
pub const COL_ENTREZ_GENE_ID: &str = "Entrez_Gene_Id";
/// Column holding antibody composite references, e.g., `AKT1 AKT2|akt_ps473`.
pub const COL_COMPOSITE_REF: &str = "Composite.Element.Ref";
/// Column holding gene set ids.
pub const COL_GENESET_ID: &str = "geneset_id";
/// Column holding generic assay entity stable ids.
pub const COL_ENTITY_STABLE_ID: &str = "ENTITY_STABLE_ID";

/// Names of columns that never hold sample values.
const FEATURE_COLUMNS: &[&str] = &[
    "Gene Symbol",
    COL_HUGO_SYMBOL,
    COL_ENTREZ_GENE_ID,
    "Locus ID",
    "Cytoband",
    COL_COMPOSITE_REF,
    COL_GENESET_ID,
    COL_ENTITY_STABLE_ID,
];

/// The kind of a profile data file, with the indices of its identifier columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// Rows keyed by gene symbol and/or Entrez id.
    Gene {
        hugo_symbol: Option<usize>,
        entrez_gene_id: Option<usize>,
        /// Discrete CNA data shown in analysis; stored rows yield CNA events.
        discrete_cna: bool,
    },
    /// Protein levels keyed by antibody composite references.
    Rppa { composite_ref: usize },
    /// Gene set scores keyed by gene set id.
    GenesetScore { geneset_id: usize },
    /// Generic assay data keyed by entity stable id.
    GenericAssay { entity_stable_id: usize },
}

impl ProfileKind {
    /// Whether stored rows yield CNA events.
    pub fn is_discrete_cna(&self) -> bool {
        matches!(
            self,
            ProfileKind::Gene {
                discrete_cna: true,
                ..
            }
        )
    }
}

/// Index of the first column named `name`, ignoring case.
fn column_index(columns: &[String], name: &str) -> Option<usize> {
    columns
        .iter()
        .position(|column| column.eq_ignore_ascii_case(name))
}

/// Index of the required column `name` of a `kind` file.
fn required_column(columns: &[String], name: &str, kind: &str) -> Result<usize, ImportError> {
    column_index(columns, name).ok_or_else(|| ImportError::MissingFeatureColumn {
        kind: kind.to_string(),
        column: name.to_string(),
    })
}

/// Parsed header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataHeader {
    /// All column names.
    pub columns: Vec<String>,
    /// Kind of the data and its identifier columns.
    pub kind: ProfileKind,
    /// Index of the first sample column; all later columns are samples as well.
    pub sample_start: usize,
}

impl DataHeader {
    /// Parse the header `line` of a data file for `profile`.
    ///
    /// `extra_features` names additional non-sample columns, e.g., generic entity properties.
    pub fn parse(
        line: &str,
        profile: &Profile,
        extra_features: &[String],
    ) -> Result<Self, ImportError> {
        let mut columns = line
            .trim_end_matches(['\r', '\n'])
            .split('\t')
            .map(String::from)
            .collect::<Vec<_>>();
        while columns.len() > 1 && columns.last().map(|c| c.is_empty()).unwrap_or(false) {
            columns.pop();
        }
        let first = columns.first().map(String::as_str).unwrap_or_default();

        let kind = match profile.alteration_type {
            AlterationType::ProteinLevel if first.eq_ignore_ascii_case(COL_COMPOSITE_REF) => {
                ProfileKind::Rppa { composite_ref: 0 }
            }
            AlterationType::GenesetScore => ProfileKind::GenesetScore {
                geneset_id: required_column(&columns, COL_GENESET_ID, "gene set score")?,
            },
            AlterationType::GenericAssay => ProfileKind::GenericAssay {
                entity_stable_id: required_column(&columns, COL_ENTITY_STABLE_ID, "generic assay")?,
            },
            alteration_type => {
                let hugo_symbol = column_index(&columns, COL_HUGO_SYMBOL);
                let entrez_gene_id = column_index(&columns, COL_ENTREZ_GENE_ID);
                if hugo_symbol.is_none() && entrez_gene_id.is_none() {
                    return Err(ImportError::MissingGeneColumns);
                }
                ProfileKind::Gene {
                    hugo_symbol,
                    entrez_gene_id,
                    discrete_cna: alteration_type == AlterationType::CopyNumberAlteration
                        && profile.show_profile_in_analysis_tab,
                }
            }
        };

        let sample_start = Self::sample_start(&columns, extra_features)?;
        Ok(Self {
            columns,
            kind,
            sample_start,
        })
    }

    /// First column after all recognized feature columns that is not a feature column itself.
    fn sample_start(columns: &[String], extra_features: &[String]) -> Result<usize, ImportError> {
        let is_feature = |column: &str| {
            FEATURE_COLUMNS
                .iter()
                .copied()
                .chain(extra_features.iter().map(String::as_str))
                .any(|name| name.eq_ignore_ascii_case(column))
        };
        let last_feature = [
            COL_HUGO_SYMBOL,
            COL_ENTREZ_GENE_ID,
            COL_COMPOSITE_REF,
            COL_GENESET_ID,
            COL_ENTITY_STABLE_ID,
        ]
        .iter()
        .filter_map(|name| column_index(columns, name))
        .max();

        columns
            .iter()
            .enumerate()
            .find(|(i, column)| last_feature.map(|l| *i > l).unwrap_or(true) && !is_feature(column))
            .map(|(i, _)| i)
            .ok_or(ImportError::NoSampleColumn)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Names of the sample columns.
    pub fn sample_columns(&self) -> &[String] {
        &self.columns[self.sample_start..]
    }
}
