//! Derivation of CNA events and their driver annotations.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use itertools::Itertools;

use super::{stable_id, Warnings};
use crate::{
    common::io::{open_read_maybe_gz, tsv_reader},
    err::ImportError,
    store::model::{CnaEvent, DriverAnnotation},
};

/// Value of an amplification.
pub const AMPLIFICATION: &str = "2";
/// Value of a homozygous deletion.
pub const HOMOZYGOUS_DELETION: &str = "-2";
/// Value of a partial deletion, counted as homozygous deletion.
pub const PARTIAL_DELETION: &str = "-1.5";

/// Normalize a CNA value for event derivation.
pub fn normalize(value: &str) -> &str {
    if value == PARTIAL_DELETION {
        HOMOZYGOUS_DELETION
    } else {
        value
    }
}

/// Alteration code of the event derived from `value`, if any.
pub fn event_code(value: &str) -> Option<i16> {
    match normalize(value) {
        AMPLIFICATION => Some(2),
        HOMOZYGOUS_DELETION => Some(-2),
        _ => None,
    }
}

/// Columns of the driver annotation file, lower case.
const ANNOTATION_COLUMNS: [&str; 6] = [
    "sample_id",
    "entrez_gene_id",
    "cbp_driver",
    "cbp_driver_annotation",
    "cbp_driver_tiers",
    "cbp_driver_tiers_annotation",
];

/// Driver annotations read from a side file, keyed by sample id and Entrez id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverAnnotations {
    /// Entries in file order.
    entries: IndexMap<(String, i64), DriverAnnotation>,
}

impl DriverAnnotations {
    /// Read annotations from the tab-separated file at `path`.
    ///
    /// Missing columns, short rows, invalid Entrez ids, and duplicate
    /// sample/gene pairs are fatal.
    pub fn read(path: &str) -> Result<Self, anyhow::Error> {
        let fail = |reason: String| ImportError::DriverAnnotations {
            path: path.to_string(),
            reason,
        };

        let reader = open_read_maybe_gz(path)
            .map_err(|e| anyhow::anyhow!("could not open file {} for reading: {}", path, e))?;
        let mut reader = tsv_reader(reader, true);
        let header = reader
            .headers()?
            .iter()
            .map(|name| name.trim().to_lowercase())
            .collect::<Vec<_>>();
        let mut indices = [0usize; 6];
        for (index, column) in indices.iter_mut().zip(ANNOTATION_COLUMNS) {
            *index = header
                .iter()
                .position(|name| name == column)
                .ok_or_else(|| fail(format!("column {} is not found", column)))?;
        }

        let mut entries = IndexMap::new();
        for record in reader.records() {
            let record = record?;
            if record.len() < ANNOTATION_COLUMNS.len() {
                return Err(fail(format!(
                    "mis-formatted row: {}",
                    record.iter().join(", ")
                ))
                .into());
            }
            let [sample_id, entrez_gene_id, driver_filter, driver_filter_annotation, driver_tiers_filter, driver_tiers_filter_annotation] =
                indices.map(|index| record.get(index).unwrap_or_default().to_string());
            let entrez_gene_id = entrez_gene_id.trim().parse::<i64>().map_err(|e| {
                fail(format!("invalid Entrez_Gene_Id {:?}: {}", &entrez_gene_id, e))
            })?;
            let key = (sample_id.trim().to_string(), entrez_gene_id);
            if entries.contains_key(&key) {
                return Err(fail(format!(
                    "there is more than one row with SAMPLE_ID={} and Entrez_Gene_Id={}",
                    &sample_id, entrez_gene_id
                ))
                .into());
            }
            entries.insert(
                key,
                DriverAnnotation {
                    driver_filter,
                    driver_filter_annotation,
                    driver_tiers_filter,
                    driver_tiers_filter_annotation,
                },
            );
        }
        tracing::debug!("read {} driver annotations from {}", entries.len(), path);

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bind the annotations to the internal ids of the `samples` (internal id, stable id) of an import.
    ///
    /// Sample ids of the file are normalized like data file headers.  Entries are
    /// applied in file order; a later entry for the same internal sample and gene
    /// replaces an earlier one, which is then reported as unused.
    pub fn bind(self, samples: &[(u32, String)]) -> BoundAnnotations {
        let internal = samples
            .iter()
            .map(|(id, stable)| (stable.as_str(), *id))
            .collect::<HashMap<_, _>>();
        let mut result = BoundAnnotations::default();
        for ((stable, entrez_gene_id), annotation) in self.entries {
            match internal.get(stable_id::sample_id(&stable).as_str()) {
                Some(sample_id) => {
                    let previous = result
                        .bound
                        .insert((*sample_id, entrez_gene_id), (stable.clone(), annotation));
                    if let Some((previous_stable, _)) = previous {
                        tracing::debug!(
                            "driver annotation for {} and {} replaces the one for {}",
                            &stable,
                            entrez_gene_id,
                            &previous_stable
                        );
                        result.dropped.push((previous_stable, entrez_gene_id));
                    }
                }
                None => result.dropped.push((stable, entrez_gene_id)),
            }
        }
        result
    }
}

/// Driver annotations bound to the samples of one import.
#[derive(Debug, Clone, Default)]
pub struct BoundAnnotations {
    /// Annotation and stable sample id by internal sample id and Entrez id.
    bound: HashMap<(u32, i64), (String, DriverAnnotation)>,
    /// Keys whose sample is not part of the import or that a later entry replaced.
    dropped: Vec<(String, i64)>,
    /// Keys attached to at least one event.
    used: HashSet<(u32, i64)>,
}

impl BoundAnnotations {
    /// Annotation for a sample and gene, marking it as used.
    fn take(&mut self, sample_id: u32, entrez_gene_id: i64) -> Option<DriverAnnotation> {
        let key = (sample_id, entrez_gene_id);
        let (_, annotation) = self.bound.get(&key)?;
        self.used.insert(key);
        Some(annotation.clone())
    }

    /// Record a warning listing all annotations that were never attached to an event.
    pub fn report_unused(&self, warnings: &mut Warnings) {
        let mut unused = self.dropped.clone();
        unused.extend(
            self.bound
                .iter()
                .filter(|(key, _)| !self.used.contains(*key))
                .map(|((_, entrez_gene_id), (stable, _))| (stable.clone(), *entrez_gene_id)),
        );
        if !unused.is_empty() {
            unused.sort();
            warnings.push(format!(
                "Following driver annotation sample-entrezId pairs never used in the data file: {}",
                unused
                    .iter()
                    .map(|(stable, entrez_gene_id)| format!("{}={}", stable, entrez_gene_id))
                    .join(", ")
            ));
        }
    }
}

/// Derives the CNA events of the rows stored for one profile.
#[derive(Debug, Clone)]
pub struct CnaEventDeriver {
    profile_id: u32,
    annotations: BoundAnnotations,
}

impl CnaEventDeriver {
    pub fn new(profile_id: u32, annotations: BoundAnnotations) -> Self {
        Self {
            profile_id,
            annotations,
        }
    }

    /// Events for the gene `entrez_gene_id` with `values` aligned to `samples`.
    pub fn derive(
        &mut self,
        entrez_gene_id: i64,
        samples: &[u32],
        values: &[String],
    ) -> Vec<CnaEvent> {
        samples
            .iter()
            .zip(values)
            .filter_map(|(sample_id, value)| {
                event_code(value).map(|alteration| CnaEvent {
                    sample_id: *sample_id,
                    profile_id: self.profile_id,
                    entrez_gene_id,
                    alteration,
                    driver: self.annotations.take(*sample_id, entrez_gene_id),
                })
            })
            .collect()
    }

    /// See `BoundAnnotations::report_unused`.
    pub fn report_unused(&self, warnings: &mut Warnings) {
        self.annotations.report_unused(warnings);
    }
}
