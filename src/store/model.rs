//! Records persisted in the store.

use serde::{Deserialize, Serialize};

/// A cancer study that owns samples and profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Study {
    /// Internal study id.
    pub internal_id: u32,
    /// Stable study id, e.g., `study_es_0`.
    pub stable_id: String,
}

/// A sample belonging to a study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Internal sample id, the element type of a column order.
    pub internal_id: u32,
    /// Stable sample id, e.g., `TCGA-A1-A0SB-01`.
    pub stable_id: String,
    /// Internal id of the owning study.
    pub study_id: u32,
}

/// Kind of measurements held by a profile.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlterationType {
    /// Copy number alteration, discrete or continuous.
    CopyNumberAlteration,
    /// mRNA expression.
    MrnaExpression,
    /// Methylation levels.
    Methylation,
    /// Protein levels, e.g., RPPA.
    ProteinLevel,
    /// Gene set scores, e.g., GSVA.
    GenesetScore,
    /// Generic assay measurements.
    GenericAssay,
}

/// A genomic profile, i.e., one dataset of one study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Internal profile id.
    pub internal_id: u32,
    /// Stable profile id, e.g., `study_es_0_gistic`.
    pub stable_id: String,
    /// Internal id of the owning study.
    pub study_id: u32,
    /// Kind of the measurements.
    pub alteration_type: AlterationType,
    /// Whether the profile participates in the analysis tab.
    pub show_profile_in_analysis_tab: bool,
}

/// Kind of a genetic entity, i.e., of a row key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Gene,
    Geneset,
    GenericAssay,
    Phosphoprotein,
}

/// A genetic entity that can be the key of a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Internal entity id.
    pub entity_id: u32,
    /// Kind of the entity.
    pub kind: EntityKind,
    /// Display name; HUGO symbol, gene set id, or generic assay stable id.
    pub name: String,
}

/// Gene type of micro RNA genes.
pub const GENE_TYPE_MIRNA: &str = "miRNA";
/// Gene type of synthetic phosphoprotein genes.
pub const GENE_TYPE_PHOSPHOPROTEIN: &str = "phosphoprotein";

/// A gene of the gene catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gene {
    /// Internal entity id of the gene.
    pub entity_id: u32,
    /// Entrez gene id; negative for synthetic genes.
    pub entrez_gene_id: i64,
    /// HUGO gene symbol.
    pub hugo_symbol: String,
    /// Gene type, e.g., `protein-coding` or `miRNA`.
    pub gene_type: String,
    /// Aliases of the gene.
    pub aliases: Vec<String>,
}

impl Gene {
    /// Whether the gene is a micro RNA.
    pub fn is_mirna(&self) -> bool {
        self.gene_type == GENE_TYPE_MIRNA
    }

    /// The entity kind of the gene.
    pub fn entity_kind(&self) -> EntityKind {
        if self.gene_type == GENE_TYPE_PHOSPHOPROTEIN {
            EntityKind::Phosphoprotein
        } else {
            EntityKind::Gene
        }
    }
}

/// Link between a sample and a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleProfile {
    pub sample_id: u32,
    pub profile_id: u32,
    /// Gene panel the sample was profiled with, if any.
    pub gene_panel: Option<String>,
}

/// Driver filter metadata attached to a CNA event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverAnnotation {
    pub driver_filter: String,
    pub driver_filter_annotation: String,
    pub driver_tiers_filter: String,
    pub driver_tiers_filter_annotation: String,
}

/// A derived copy number event (amplification or homozygous deletion).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnaEvent {
    pub sample_id: u32,
    pub profile_id: u32,
    pub entrez_gene_id: i64,
    /// Alteration code, `2` or `-2`.
    pub alteration: i16,
    /// Driver annotation, if one was given for the sample and gene.
    pub driver: Option<DriverAnnotation>,
}
