//! Code for the `profile import` subcommand.

use std::{collections::HashSet, io::BufRead, time::Instant};

use clap::Parser;
use itertools::Itertools;
use thousands::Separable;

use super::{
    cna::{CnaEventDeriver, DriverAnnotations},
    header::DataHeader,
    merge::RowMerger,
    order,
    resolve::{EntityResolver, ResolvedSet},
    stable_id, ImportMode, Warnings,
};
use crate::{
    common::{self, io::open_read_maybe_gz, split_csv_arg},
    err::ImportError,
    store::{
        model::{Gene, Profile, SampleProfile},
        Store, Txn,
    },
};

/// Number of lines between two progress messages.
const PROGRESS_INTERVAL: usize = 10_000;

/// Command line arguments for `profile import` sub command.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Import a tab-separated profile data file", long_about = None)]
pub struct Args {
    /// Path to the RocksDB store.
    #[arg(long, required = true)]
    pub path_db: String,
    /// Stable id of the genetic profile to import into.
    #[arg(long, required = true)]
    pub profile: String,
    /// Path to the data file, may be gzip-compressed.
    #[arg(long, required = true)]
    pub path_data: String,
    /// Merge into the stored data instead of replacing it.
    #[arg(long, default_value_t = false)]
    pub overwrite_existing: bool,
    /// Path to the driver annotation file for discrete CNA data.
    #[arg(long)]
    pub path_driver_annotations: Option<String>,
    /// Gene panel the samples were profiled with.
    #[arg(long)]
    pub gene_panel: Option<String>,
    /// Comma-separated names of generic entity property columns.
    #[arg(long)]
    pub generic_entity_properties: Option<String>,
}

/// Outcome of one import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Number of rows stored from the data lines.
    pub records_stored: usize,
    /// Number of data lines that stored nothing.
    pub entries_skipped: usize,
    /// Rows stored in addition to the first one for antibodies targeting several genes.
    pub extra_records: usize,
    /// Previously stored rows that were only expanded to the new column order.
    pub rows_expanded: usize,
    /// Number of sample columns imported.
    pub samples: usize,
    /// Number of dropped normal sample columns.
    pub normal_samples_dropped: usize,
    /// Number of CNA events written.
    pub cna_events: usize,
    /// Row-level warnings.
    pub warnings: Warnings,
}

/// Whether a line is a comment or blank.
fn is_comment_or_blank(line: &str) -> bool {
    line.starts_with('#') || line.trim().is_empty()
}

/// Sample columns of a data file matched against the study.
#[derive(Debug, Default)]
struct SampleColumns {
    /// Per sample column, whether it is kept; normal samples are dropped.
    keep: Vec<bool>,
    /// Internal and stable ids of the kept samples in file order.
    samples: Vec<(u32, String)>,
}

/// Match the sample columns of `header` with the samples of the study of `profile`.
fn resolve_samples(
    txn: &Txn<'_>,
    profile: &Profile,
    header: &DataHeader,
    path: &str,
) -> Result<SampleColumns, anyhow::Error> {
    let mut result = SampleColumns::default();
    let mut seen = HashSet::new();
    for column in header.sample_columns() {
        let column = column.trim();
        match txn.sample(profile.study_id, &stable_id::sample_id(column))? {
            Some(sample) => {
                if !seen.insert(sample.internal_id) {
                    return Err(ImportError::DuplicateSample {
                        sample_id: column.to_string(),
                        path: path.to_string(),
                    }
                    .into());
                }
                result.keep.push(true);
                result.samples.push((sample.internal_id, sample.stable_id));
            }
            None if stable_id::is_normal(column) => {
                tracing::debug!("dropping column of normal sample {}", column);
                result.keep.push(false);
            }
            None => {
                return Err(ImportError::UnknownSample {
                    sample_id: column.to_string(),
                    path: path.to_string(),
                }
                .into())
            }
        }
    }
    Ok(result)
}

/// Storage state of one import run.
struct RowWriter<'t, 'a> {
    txn: &'t Txn<'a>,
    profile_id: u32,
    /// Internal ids of the incoming samples in file order.
    incoming: Vec<u32>,
    merger: RowMerger,
    /// Entities stored so far; each entity is stored at most once per file.
    imported: HashSet<u32>,
    /// Set for discrete CNA profiles only.
    deriver: Option<CnaEventDeriver>,
}

impl<'t, 'a> RowWriter<'t, 'a> {
    /// Store `values` under `entity_id` unless already stored from this file.
    fn store_row<F>(
        &mut self,
        entity_id: u32,
        values: Vec<String>,
        duplicate_message: F,
        report: &mut ImportReport,
    ) -> Result<bool, anyhow::Error>
    where
        F: FnOnce() -> String,
    {
        if !self.imported.insert(entity_id) {
            report.warnings.push(duplicate_message());
            return Ok(false);
        }
        let values = self.merger.merge_row(entity_id, values);
        self.txn.put_row(self.profile_id, entity_id, &values)?;
        report.records_stored += 1;
        Ok(true)
    }

    fn store_gene(
        &mut self,
        gene: &Gene,
        values: Vec<String>,
        report: &mut ImportReport,
    ) -> Result<bool, anyhow::Error> {
        self.store_row(
            gene.entity_id,
            values,
            || {
                format!(
                    "Gene {} ({}) found to be duplicated in your file. Duplicated row will be \
                     ignored!",
                    &gene.hugo_symbol, gene.entrez_gene_id
                )
            },
            report,
        )
    }

    /// Store the values of one line under the resolved entities.
    fn store(
        &mut self,
        resolved: ResolvedSet,
        values: Vec<String>,
        report: &mut ImportReport,
    ) -> Result<bool, anyhow::Error> {
        match resolved {
            ResolvedSet::Single(gene) => {
                let stored = self.store_gene(&gene, values.clone(), report)?;
                if let (true, Some(deriver)) = (stored, self.deriver.as_mut()) {
                    // Events of the incoming samples follow the incoming values; events of
                    // other samples stay with the values kept for them.
                    for sample_id in &self.incoming {
                        self.txn
                            .delete_cna_event(self.profile_id, *sample_id, gene.entrez_gene_id)?;
                    }
                    for event in deriver.derive(gene.entrez_gene_id, &self.incoming, &values) {
                        self.txn.put_cna_event(&event)?;
                        report.cna_events += 1;
                    }
                }
                Ok(stored)
            }
            ResolvedSet::MicroRna {
                symbol,
                genes,
                ignored,
            } => {
                let symbol = symbol.unwrap_or_default();
                if !ignored.is_empty() {
                    report.warnings.push(format!(
                        "Gene symbol {} is ambiguous (a mixture of microRNA and other types). Only \
                         the microRNA rows are stored, ignoring {}.",
                        &symbol,
                        ignored
                            .iter()
                            .map(|gene| gene.hugo_symbol.as_str())
                            .join(", ")
                    ));
                }
                let mut stored = false;
                for gene in &genes {
                    stored |= self.store_gene(gene, values.clone(), report)?;
                }
                if !stored {
                    report
                        .warnings
                        .push(format!("Could not store microRNA data for {}", &symbol));
                }
                Ok(stored)
            }
            ResolvedSet::Antibody(genes) => {
                let mut count = 0;
                for gene in &genes {
                    if self.store_gene(gene, values.clone(), report)? {
                        count += 1;
                    }
                }
                if count == 0 {
                    report.warnings.push(format!(
                        "Could not store RPPA data for antibody targeting {}",
                        genes
                            .iter()
                            .map(|gene| gene.hugo_symbol.as_str())
                            .join(" ")
                    ));
                } else {
                    report.extra_records += count - 1;
                }
                Ok(count > 0)
            }
            ResolvedSet::Entity(entity) => self.store_row(
                entity.entity_id,
                values,
                || {
                    format!(
                        "Data for genetic entity {} [{}] already imported from file. Record will \
                         be skipped.",
                        &entity.name, entity.kind
                    )
                },
                report,
            ),
        }
    }
}

/// Import the data file of `args` into its profile within `txn`.
///
/// Any error leaves the transaction to be rolled back by the caller.
pub fn import_profile_data(txn: &Txn<'_>, args: &Args) -> Result<ImportReport, anyhow::Error> {
    let profile = txn
        .profile(&args.profile)?
        .ok_or_else(|| ImportError::UnknownProfile(args.profile.clone()))?;
    let profile_id = profile.internal_id;
    let mode = ImportMode::from_overwrite_existing(args.overwrite_existing);
    tracing::info!(
        "importing {} into {} ({}) in {} mode",
        &args.path_data,
        &profile.stable_id,
        &profile.alteration_type,
        mode
    );

    let reader = open_read_maybe_gz(&args.path_data)
        .map_err(|e| anyhow::anyhow!("could not open file {} for reading: {}", &args.path_data, e))?;
    let mut lines = reader.lines();
    let header_line = loop {
        match lines.next() {
            Some(line) => {
                let line = line?;
                if !is_comment_or_blank(&line) {
                    break line;
                }
            }
            None => return Err(ImportError::EmptyFile(args.path_data.clone()).into()),
        }
    };
    let extra_features = args
        .generic_entity_properties
        .as_deref()
        .map(split_csv_arg)
        .unwrap_or_default();
    let header = DataHeader::parse(&header_line, &profile, &extra_features)?;
    tracing::debug!("header = {:?}", &header);

    let mut report = ImportReport::default();
    let annotations = match (&args.path_driver_annotations, header.kind.is_discrete_cna()) {
        (Some(path), true) => Some(DriverAnnotations::read(path)?),
        (Some(path), false) => {
            report.warnings.push(format!(
                "Driver annotations in {} ignored, {} does not hold discrete CNA data",
                path, &profile.stable_id
            ));
            None
        }
        (None, true) => Some(DriverAnnotations::default()),
        (None, false) => None,
    };

    let columns = resolve_samples(txn, &profile, &header, &args.path_data)?;
    report.samples = columns.samples.len();
    report.normal_samples_dropped = columns.keep.iter().filter(|keep| !**keep).count();
    for (sample_id, _) in &columns.samples {
        if mode == ImportMode::Incremental
            || txn.sample_profile(profile_id, *sample_id)?.is_none()
        {
            txn.link_sample_profile(&SampleProfile {
                sample_id: *sample_id,
                profile_id,
                gene_panel: args.gene_panel.clone(),
            })?;
        }
    }

    let incoming = columns
        .samples
        .iter()
        .map(|(sample_id, _)| *sample_id)
        .collect::<Vec<_>>();
    match mode {
        ImportMode::Full => {
            let rows = txn.delete_rows(profile_id)?;
            let events = txn.delete_cna_events(profile_id, None)?;
            tracing::debug!("removed {} rows and {} CNA events", rows, events);
        }
        ImportMode::Incremental => (),
    }

    let established = order::establish(txn, profile_id, &incoming, mode)?;
    let mut merger = RowMerger::new(mode, &established);
    if mode == ImportMode::Incremental {
        merger.load_previous(&established.previous, txn.rows(profile_id)?)?;
        tracing::debug!("{} rows stored before import", merger.untouched_len());
    }

    let mut writer = RowWriter {
        txn,
        profile_id,
        incoming,
        merger,
        imported: HashSet::new(),
        deriver: annotations
            .map(|annotations| CnaEventDeriver::new(profile_id, annotations.bind(&columns.samples))),
    };
    let mut resolver = EntityResolver::new(txn, header.kind);

    let mut line_count = 0;
    for line in lines {
        let line = line?;
        line_count += 1;
        if line_count % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "processed {} lines, stored {} records",
                line_count.separate_with_commas(),
                report.records_stored.separate_with_commas()
            );
        }
        if is_comment_or_blank(&line) {
            continue;
        }

        let mut fields = line.trim_end_matches('\r').split('\t').collect::<Vec<_>>();
        if fields.len() > header.len() && fields[header.len()..].iter().all(|f| f.is_empty()) {
            fields.truncate(header.len());
        }
        if fields.len() != header.len() {
            report.warnings.push(format!(
                "Ignoring line with {} fields ({}) than specified in the headers({}): {}",
                if fields.len() > header.len() { "more" } else { "less" },
                fields.len(),
                header.len(),
                fields.first().copied().unwrap_or_default()
            ));
            report.entries_skipped += 1;
            continue;
        }

        let values = fields[header.sample_start..]
            .iter()
            .zip(&columns.keep)
            .filter(|(_, keep)| **keep)
            .map(|(value, _)| value.trim().to_string())
            .collect::<Vec<_>>();
        let stored = match resolver.resolve(&fields, &mut report.warnings)? {
            Some(resolved) => writer.store(resolved, values, &mut report)?,
            None => false,
        };
        if !stored {
            report.entries_skipped += 1;
        }
    }

    for (entity_id, values) in writer.merger.take_untouched() {
        txn.put_row(profile_id, entity_id, &values)?;
        report.rows_expanded += 1;
    }
    if let Some(deriver) = &writer.deriver {
        deriver.report_unused(&mut report.warnings);
    }
    if report.records_stored == 0 {
        return Err(ImportError::NothingStored(args.path_data.clone()).into());
    }

    Ok(report)
}

/// Main entry point for `profile import` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    common::trace_rss_now();

    tracing::info!("Opening RocksDB...");
    let store = Store::open(&args.path_db)?;
    tracing::info!("... done opening RocksDB");

    tracing::info!("Importing profile data ...");
    let report = store.in_transaction(|txn| import_profile_data(txn, args))?;
    tracing::info!(
        "... stored {} records for {} samples, skipped {} entries",
        report.records_stored.separate_with_commas(),
        report.samples.separate_with_commas(),
        report.entries_skipped.separate_with_commas()
    );
    if report.extra_records > 0 {
        tracing::info!(
            "{} extra records stored for antibodies targeting several genes",
            report.extra_records.separate_with_commas()
        );
    }
    if report.rows_expanded > 0 {
        tracing::info!(
            "{} rows not in file expanded to the new column order",
            report.rows_expanded.separate_with_commas()
        );
    }
    if report.cna_events > 0 {
        tracing::info!("{} CNA events stored", report.cna_events.separate_with_commas());
    }
    if !report.warnings.is_empty() {
        tracing::info!("{} warnings:", report.warnings.len());
        for message in report.warnings.messages() {
            tracing::info!("- {}", message);
        }
    }
    tracing::info!(
        "All of `profile import` completed in {:?}",
        before_anything.elapsed()
    );

    common::trace_rss_now();

    Ok(())
}

#[cfg(test)]
pub mod test {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;

    use super::{import_profile_data, ImportReport};
    use crate::{
        err::ImportError,
        profile::{
            cna::event_code,
            export::{load_matrix, ProfileMatrix},
            test::seeded_store,
        },
        store::{Store, Txn},
    };

    /// Arguments for importing the fixture `name` into `profile`.
    pub fn args(path_db: &str, profile: &str, name: &str) -> super::Args {
        super::Args {
            path_db: path_db.to_string(),
            profile: profile.to_string(),
            path_data: format!("tests/profile/{}", name),
            ..Default::default()
        }
    }

    fn import(store: &Store, args: &super::Args) -> Result<ImportReport, anyhow::Error> {
        store.in_transaction(|txn| import_profile_data(txn, args))
    }

    fn matrix(store: &Store, profile: &str) -> Result<ProfileMatrix, anyhow::Error> {
        store.in_transaction(|txn| {
            let profile = txn
                .profile(profile)?
                .ok_or_else(|| anyhow::anyhow!("no profile {}", profile))?;
            load_matrix(txn, &profile)
        })
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    /// CNA events of `profile` as (sample stable id, Entrez id, alteration, driver filter).
    fn events(
        txn: &Txn<'_>,
        profile: &str,
    ) -> Result<BTreeSet<(String, i64, i16, Option<String>)>, anyhow::Error> {
        let profile = txn
            .profile(profile)?
            .ok_or_else(|| anyhow::anyhow!("no profile {}", profile))?;
        let samples = txn.samples(profile.study_id)?;
        let mut result = BTreeSet::new();
        for event in txn.cna_events(profile.internal_id)? {
            let sample = samples
                .iter()
                .find(|sample| sample.internal_id == event.sample_id)
                .ok_or_else(|| anyhow::anyhow!("unknown sample {}", event.sample_id))?;
            result.insert((
                sample.stable_id.clone(),
                event.entrez_gene_id,
                event.alteration,
                event.driver.map(|driver| driver.driver_filter),
            ));
        }
        Ok(result)
    }

    fn event(
        sample: &str,
        entrez_gene_id: i64,
        alteration: i16,
        driver: Option<&str>,
    ) -> (String, i64, i16, Option<String>) {
        (
            sample.to_string(),
            entrez_gene_id,
            alteration,
            driver.map(String::from),
        )
    }

    /// Check that each amplification or deletion value of `profile` has exactly one event.
    fn assert_events_follow_values(txn: &Txn<'_>, profile: &str) -> Result<(), anyhow::Error> {
        let profile = txn
            .profile(profile)?
            .ok_or_else(|| anyhow::anyhow!("no profile {}", profile))?;
        let matrix = load_matrix(txn, &profile)?;
        let mut expected = BTreeSet::new();
        for (entity, values) in &matrix.rows {
            let gene = txn
                .genes_by_hugo_symbol(&entity.name)?
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("no gene {}", &entity.name))?;
            for (sample, value) in matrix.samples.iter().zip(values) {
                if let Some(alteration) = event_code(value) {
                    expected.insert((sample.clone(), gene.entrez_gene_id, alteration));
                }
            }
        }
        let actual = events(txn, &profile.stable_id)?
            .into_iter()
            .map(|(sample, entrez_gene_id, alteration, _)| (sample, entrez_gene_id, alteration))
            .collect::<BTreeSet<_>>();
        assert_eq!(actual, expected);
        Ok(())
    }

    #[test]
    fn full_import_of_discrete_cna() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = seeded_store(&tmp_dir)?;
        let path_db = tmp_dir.join("db").to_string_lossy().to_string();

        let mut args = args(&path_db, "study_es_0_gistic", "cna_full.txt");
        args.path_driver_annotations = Some("tests/profile/driver_annotations.tsv".into());
        args.gene_panel = Some("TESTPANEL".into());
        let report = import(&store, &args)?;

        assert_eq!(report.records_stored, 4);
        assert_eq!(report.entries_skipped, 4);
        assert_eq!(report.samples, 2);
        assert_eq!(report.normal_samples_dropped, 1);
        assert_eq!(report.cna_events, 3);
        assert!(report.warnings.contains("less fields (4) than specified in the headers(5)"));
        assert!(report.warnings.contains("more fields (6) than specified in the headers(5)"));
        assert!(report
            .warnings
            .contains("Gene AKT1 (207) found to be duplicated in your file"));
        assert!(report
            .warnings
            .contains("Gene with Entrez_Id 9999999 and gene symbol NA not found"));
        assert!(report.warnings.contains("never used in the data file: TCGA-XX-0000-01=207"));

        let matrix = matrix(&store, "study_es_0_gistic")?;
        assert_eq!(matrix.samples, strings(&["TCGA-A1-A0SB-01", "TCGA-A1-A0SD-01"]));
        assert_eq!(matrix.rows.len(), 4);
        // The first line of a duplicated gene wins; partial deletions are stored verbatim.
        assert_eq!(matrix.row("AKT1"), Some(strings(&["2", "-1.5"]).as_slice()));
        assert_eq!(matrix.row("AKT2"), Some(strings(&["0", "-2"]).as_slice()));
        assert_eq!(matrix.row("TP53"), Some(strings(&["-1", "1"]).as_slice()));
        assert_eq!(matrix.row("EGFR"), Some(strings(&["1", "1"]).as_slice()));

        store.in_transaction(|txn| {
            assert_eq!(
                events(txn, "study_es_0_gistic")?,
                BTreeSet::from([
                    event("TCGA-A1-A0SB-01", 207, 2, Some("Putative_Driver")),
                    event("TCGA-A1-A0SD-01", 207, -2, None),
                    event("TCGA-A1-A0SD-01", 208, -2, Some("Putative_Passenger")),
                ])
            );
            assert_events_follow_values(txn, "study_es_0_gistic")?;

            let profile = txn
                .profile("study_es_0_gistic")?
                .ok_or_else(|| anyhow::anyhow!("no profile"))?;
            let sample = txn
                .sample(profile.study_id, "TCGA-A1-A0SB-01")?
                .ok_or_else(|| anyhow::anyhow!("no sample"))?;
            let link = txn.sample_profile(profile.internal_id, sample.internal_id)?;
            assert_eq!(
                link.and_then(|link| link.gene_panel),
                Some("TESTPANEL".to_string())
            );
            Ok(())
        })?;

        Ok(())
    }

    #[test]
    fn incremental_import_merges_rows() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = seeded_store(&tmp_dir)?;
        let path_db = tmp_dir.join("db").to_string_lossy().to_string();

        let mut args_full = args(&path_db, "study_es_0_gistic", "cna_full.txt");
        args_full.path_driver_annotations = Some("tests/profile/driver_annotations.tsv".into());
        import(&store, &args_full)?;
        let before = matrix(&store, "study_es_0_gistic")?;

        let mut args = args(&path_db, "study_es_0_gistic", "cna_incremental.txt");
        args.overwrite_existing = true;
        let report = import(&store, &args)?;
        assert_eq!(report.records_stored, 2);
        assert_eq!(report.rows_expanded, 3);
        assert_eq!(report.cna_events, 2);

        let after = matrix(&store, "study_es_0_gistic")?;
        assert_eq!(&after.samples[..before.samples.len()], before.samples.as_slice());
        assert_eq!(
            after.samples,
            strings(&["TCGA-A1-A0SB-01", "TCGA-A1-A0SD-01", "TCGA-A1-A0SE-01"])
        );
        assert!(after
            .rows
            .iter()
            .all(|(_, values)| values.len() == after.samples.len()));
        assert_eq!(after.row("AKT1"), Some(strings(&["2", "0", "2"]).as_slice()));
        assert_eq!(after.row("AKT2"), Some(strings(&["0", "-2", ""]).as_slice()));
        assert_eq!(after.row("TP53"), Some(strings(&["-1", "1", ""]).as_slice()));
        assert_eq!(after.row("EGFR"), Some(strings(&["1", "1", ""]).as_slice()));
        assert_eq!(after.row("KRAS"), Some(strings(&["", "-2", "0"]).as_slice()));

        // Genes missing from the file keep their events, including driver annotations.
        store.in_transaction(|txn| {
            assert_eq!(
                events(txn, "study_es_0_gistic")?,
                BTreeSet::from([
                    event("TCGA-A1-A0SB-01", 207, 2, Some("Putative_Driver")),
                    event("TCGA-A1-A0SD-01", 208, -2, Some("Putative_Passenger")),
                    event("TCGA-A1-A0SD-01", 3845, -2, None),
                    event("TCGA-A1-A0SE-01", 207, 2, None),
                ])
            );
            assert_events_follow_values(txn, "study_es_0_gistic")
        })?;

        Ok(())
    }

    #[test]
    fn incremental_import_stores_duplicated_gene_once() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = seeded_store(&tmp_dir)?;
        let path_db = tmp_dir.join("db").to_string_lossy().to_string();

        import(&store, &args(&path_db, "study_es_0_gistic", "cna_full.txt"))?;

        let mut args = args(&path_db, "study_es_0_gistic", "cna_incremental_duplicate.txt");
        args.overwrite_existing = true;
        let report = import(&store, &args)?;
        assert_eq!(report.records_stored, 1);
        assert_eq!(report.entries_skipped, 1);
        assert_eq!(report.rows_expanded, 3);
        assert!(report
            .warnings
            .contains("Gene AKT1 (207) found to be duplicated in your file"));

        let matrix = matrix(&store, "study_es_0_gistic")?;
        assert_eq!(
            matrix.samples,
            strings(&["TCGA-A1-A0SB-01", "TCGA-A1-A0SD-01", "TCGA-A1-A0SE-01"])
        );
        assert_eq!(matrix.row("AKT1"), Some(strings(&["2", "0", "2"]).as_slice()));
        assert_eq!(matrix.row("AKT2"), Some(strings(&["0", "-2", ""]).as_slice()));

        store.in_transaction(|txn| {
            assert_eq!(
                events(txn, "study_es_0_gistic")?,
                BTreeSet::from([
                    event("TCGA-A1-A0SB-01", 207, 2, None),
                    event("TCGA-A1-A0SD-01", 208, -2, None),
                    event("TCGA-A1-A0SE-01", 207, 2, None),
                ])
            );
            assert_events_follow_values(txn, "study_es_0_gistic")
        })?;

        Ok(())
    }

    #[test]
    fn full_import_replaces_previous_data() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = seeded_store(&tmp_dir)?;
        let path_db = tmp_dir.join("db").to_string_lossy().to_string();

        import(&store, &args(&path_db, "study_es_0_gistic", "cna_full.txt"))?;
        import(&store, &args(&path_db, "study_es_0_gistic", "cna_incremental.txt"))?;

        let matrix = matrix(&store, "study_es_0_gistic")?;
        assert_eq!(
            matrix.samples,
            strings(&["TCGA-A1-A0SD-01", "TCGA-A1-A0SE-01"])
        );
        assert_eq!(matrix.rows.len(), 2);
        assert_eq!(matrix.row("AKT1"), Some(strings(&["0", "2"]).as_slice()));
        assert_eq!(matrix.row("KRAS"), Some(strings(&["-2", "0"]).as_slice()));
        Ok(())
    }

    #[test]
    fn microrna_lines_are_stored_for_every_microrna() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = seeded_store(&tmp_dir)?;
        let path_db = tmp_dir.join("db").to_string_lossy().to_string();

        let report = import(&store, &args(&path_db, "study_es_0_mrna", "mrna.txt"))?;
        assert_eq!(report.records_stored, 3);
        assert_eq!(report.entries_skipped, 4);
        assert_eq!(report.cna_events, 0);
        assert!(report
            .warnings
            .contains("Gene symbol hsa-mir-100 is ambiguous (a mixture of microRNA and other types)"));
        assert!(report.warnings.contains("Gene symbol AMBIG found to be ambiguous"));
        assert!(report.warnings.contains("Could not store microRNA data for MIR-100/100"));
        assert!(report.warnings.contains("It is separated by ///"));

        let matrix = matrix(&store, "study_es_0_mrna")?;
        insta::assert_debug_snapshot!(
            matrix
                .rows
                .iter()
                .map(|(entity, values)| format!("{}={}", entity.name, values.join(",")))
                .collect::<Vec<_>>(),
            @r###"
        [
            "TP53=3,4",
            "MIR-100/100=1.5,2.5",
            "MIR-100/100*=1.5,2.5",
        ]
        "###
        );
        assert_eq!(matrix.row("MIR100HG"), None);
        Ok(())
    }

    #[test]
    fn rppa_antibodies() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = seeded_store(&tmp_dir)?;
        let path_db = tmp_dir.join("db").to_string_lossy().to_string();

        let report = import(&store, &args(&path_db, "study_es_0_rppa", "rppa.txt"))?;
        assert_eq!(report.records_stored, 5);
        assert_eq!(report.extra_records, 2);
        assert_eq!(report.entries_skipped, 1);
        assert!(report
            .warnings
            .contains("Id p53 in [TP53|p53] found to be duplicated"));

        let matrix = matrix(&store, "study_es_0_rppa")?;
        assert_eq!(matrix.row("AKT1_pS473"), Some(strings(&["0.1", "0.2"]).as_slice()));
        assert_eq!(matrix.row("AKT3_pS473"), Some(strings(&["0.1", "0.2"]).as_slice()));
        assert_eq!(matrix.row("TP53"), Some(strings(&["0.3", "0.4"]).as_slice()));
        assert_eq!(matrix.row("EGFR"), Some(strings(&["0.5", "0.6"]).as_slice()));
        Ok(())
    }

    #[test]
    fn generic_assay_and_geneset_entities() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = seeded_store(&tmp_dir)?;
        let path_db = tmp_dir.join("db").to_string_lossy().to_string();

        let mut args_assay = args(&path_db, "study_es_0_treatment_ic50", "generic_assay.txt");
        args_assay.generic_entity_properties = Some("NAME,DESCRIPTION".into());
        let report = import(&store, &args_assay)?;
        assert_eq!(report.records_stored, 2);
        assert!(report
            .warnings
            .contains("Generic Assay entity UNKNOWN not found in DB"));
        let matrix_assay = matrix(&store, "study_es_0_treatment_ic50")?;
        assert_eq!(matrix_assay.row("17-AAG"), Some(strings(&["0.3", ">8"]).as_slice()));

        let report = import(&store, &args(&path_db, "study_es_0_gsva_scores", "gsva.txt"))?;
        assert_eq!(report.records_stored, 2);
        assert!(report.warnings.contains(
            "Data for genetic entity KEGG_PATHWAYS_IN_CANCER [GENESET] already imported from file"
        ));
        let matrix_gsva = matrix(&store, "study_es_0_gsva_scores")?;
        assert_eq!(
            matrix_gsva.row("KEGG_PATHWAYS_IN_CANCER"),
            Some(strings(&["0.1", "0.3"]).as_slice())
        );
        Ok(())
    }

    #[rstest::rstest]
    #[case("study_es_0_nope", "cna_full.txt", ImportError::UnknownProfile("study_es_0_nope".into()))]
    #[case("study_es_0_gistic", "empty.txt", ImportError::EmptyFile("tests/profile/empty.txt".into()))]
    #[case(
        "study_es_0_gistic",
        "unknown_sample.txt",
        ImportError::UnknownSample {
            sample_id: "TCGA-ZZ-ZZZZ-01".into(),
            path: "tests/profile/unknown_sample.txt".into(),
        }
    )]
    #[case(
        "study_es_0_gistic",
        "duplicate_sample.txt",
        ImportError::DuplicateSample {
            sample_id: "TCGA-A1-A0SB-01A".into(),
            path: "tests/profile/duplicate_sample.txt".into(),
        }
    )]
    #[case("study_es_0_mrna", "gsva.txt", ImportError::MissingGeneColumns)]
    #[case(
        "study_es_0_gsva_scores",
        "mrna.txt",
        ImportError::MissingFeatureColumn {
            kind: "gene set score".into(),
            column: "geneset_id".into(),
        }
    )]
    #[case(
        "study_es_0_gistic",
        "nothing_stored.txt",
        ImportError::NothingStored("tests/profile/nothing_stored.txt".into())
    )]
    fn fatal_errors(
        #[case] profile: &str,
        #[case] name: &str,
        #[case] expected: ImportError,
    ) -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = seeded_store(&tmp_dir)?;
        let path_db = tmp_dir.join("db").to_string_lossy().to_string();

        let err = import(&store, &args(&path_db, profile, name)).expect_err("must fail");
        assert_eq!(err.downcast_ref::<ImportError>(), Some(&expected));
        Ok(())
    }

    #[test]
    fn failed_import_leaves_no_trace() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = seeded_store(&tmp_dir)?;
        let path_db = tmp_dir.join("db").to_string_lossy().to_string();

        import(&store, &args(&path_db, "study_es_0_gistic", "cna_full.txt"))?;
        let before = matrix(&store, "study_es_0_gistic")?;

        let err = import(&store, &args(&path_db, "study_es_0_gistic", "nothing_stored.txt"))
            .expect_err("must fail");
        assert_eq!(
            err.downcast_ref::<ImportError>(),
            Some(&ImportError::NothingStored(
                "tests/profile/nothing_stored.txt".into()
            ))
        );

        assert_eq!(matrix(&store, "study_es_0_gistic")?, before);
        store.in_transaction(|txn| {
            assert_eq!(events(txn, "study_es_0_gistic")?.len(), 3);
            let profile = txn
                .profile("study_es_0_gistic")?
                .ok_or_else(|| anyhow::anyhow!("no profile"))?;
            let sample = txn
                .sample(profile.study_id, "TCGA-A1-A0SE-01")?
                .ok_or_else(|| anyhow::anyhow!("no sample"))?;
            assert_eq!(
                txn.sample_profile(profile.internal_id, sample.internal_id)?,
                None
            );
            Ok(())
        })?;
        Ok(())
    }
}
