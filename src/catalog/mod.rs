//! Code for the `catalog load` subcommand.

use std::time::Instant;

use clap::Parser;
use thousands::Separable;

use crate::{
    common::{
        self,
        io::{open_read_maybe_gz, tsv_reader},
    },
    store::{Store, Txn},
};

/// Command line arguments for `catalog load` sub command.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Load studies, samples, profiles, and entities", long_about = None)]
pub struct Args {
    /// Path to the RocksDB store.
    #[arg(long, required = true)]
    pub path_db: String,
    /// Path to TSV file with `study_id` and `sample_id` columns.
    #[arg(long)]
    pub path_samples: Option<String>,
    /// Path to TSV file with profile definitions.
    #[arg(long)]
    pub path_profiles: Option<String>,
    /// Path to TSV file with the gene catalog.
    #[arg(long)]
    pub path_genes: Option<String>,
    /// Path to TSV file with gene set external ids.
    #[arg(long)]
    pub path_genesets: Option<String>,
    /// Path to TSV file with generic assay entity stable ids.
    #[arg(long)]
    pub path_generic_entities: Option<String>,
}

/// Records of the catalog files.
pub mod records {
    use serde::Deserialize;
    use serde_with::{formats::CommaSeparator, StringWithSeparator};

    use crate::store::model::AlterationType;

    /// One line of the samples file.
    #[derive(Debug, Clone, Deserialize)]
    pub struct SampleRecord {
        pub study_id: String,
        pub sample_id: String,
    }

    /// One line of the profiles file.
    #[derive(Debug, Clone, Deserialize)]
    pub struct ProfileRecord {
        pub study_id: String,
        pub stable_id: String,
        pub alteration_type: AlterationType,
        pub show_profile_in_analysis_tab: bool,
    }

    /// One line of the genes file.
    #[serde_with::serde_as]
    #[derive(Debug, Clone, Deserialize)]
    pub struct GeneRecord {
        pub entrez_gene_id: i64,
        pub hugo_gene_symbol: String,
        #[serde(rename = "type")]
        pub gene_type: String,
        #[serde_as(as = "StringWithSeparator::<CommaSeparator, String>")]
        pub aliases: Vec<String>,
    }

    /// One line of the gene sets file.
    #[derive(Debug, Clone, Deserialize)]
    pub struct GenesetRecord {
        pub external_id: String,
    }

    /// One line of the generic assay entities file.
    #[derive(Debug, Clone, Deserialize)]
    pub struct GenericEntityRecord {
        pub stable_id: String,
    }
}

/// Deserialize all records of the TSV file at `path`.
fn read_records<T: serde::de::DeserializeOwned>(path: &str) -> Result<Vec<T>, anyhow::Error> {
    let reader = open_read_maybe_gz(path)
        .map_err(|e| anyhow::anyhow!("could not open file {} for reading: {}", path, e))?;
    tsv_reader(reader, true)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| anyhow::anyhow!("problem parsing {}: {}", path, e))
}

/// Load all given catalog files within `txn`.
pub fn load_catalog(txn: &Txn<'_>, args: &Args) -> Result<(), anyhow::Error> {
    if let Some(path) = &args.path_samples {
        tracing::info!("  loading samples from {}", path);
        let records = read_records::<records::SampleRecord>(path)?;
        for record in &records {
            let study = txn.add_study(&record.study_id)?;
            txn.add_sample(study.internal_id, &record.sample_id)?;
        }
        tracing::info!("  ... read {} samples", records.len().separate_with_commas());
    }
    if let Some(path) = &args.path_profiles {
        tracing::info!("  loading profiles from {}", path);
        let records = read_records::<records::ProfileRecord>(path)?;
        for record in &records {
            let study = txn.add_study(&record.study_id)?;
            let profile = txn.add_profile(
                study.internal_id,
                &record.stable_id,
                record.alteration_type,
                record.show_profile_in_analysis_tab,
            )?;
            if profile.alteration_type != record.alteration_type {
                tracing::warn!(
                    "profile {} already exists as {}, keeping it",
                    &profile.stable_id,
                    profile.alteration_type
                );
            }
        }
        tracing::info!("  ... read {} profiles", records.len().separate_with_commas());
    }
    if let Some(path) = &args.path_genes {
        tracing::info!("  loading genes from {}", path);
        let records = read_records::<records::GeneRecord>(path)?;
        for record in &records {
            txn.add_gene(
                record.entrez_gene_id,
                &record.hugo_gene_symbol,
                &record.gene_type,
                &record.aliases,
            )?;
        }
        tracing::info!("  ... read {} genes", records.len().separate_with_commas());
    }
    if let Some(path) = &args.path_genesets {
        tracing::info!("  loading gene sets from {}", path);
        let records = read_records::<records::GenesetRecord>(path)?;
        for record in &records {
            txn.add_geneset(&record.external_id)?;
        }
        tracing::info!("  ... read {} gene sets", records.len().separate_with_commas());
    }
    if let Some(path) = &args.path_generic_entities {
        tracing::info!("  loading generic assay entities from {}", path);
        let records = read_records::<records::GenericEntityRecord>(path)?;
        for record in &records {
            txn.add_generic_entity(&record.stable_id)?;
        }
        tracing::info!(
            "  ... read {} generic assay entities",
            records.len().separate_with_commas()
        );
    }
    Ok(())
}

/// Main entry point for `catalog load` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    common::trace_rss_now();

    tracing::info!("Opening RocksDB...");
    let store = Store::open(&args.path_db)?;
    tracing::info!("... done opening RocksDB");

    tracing::info!("Loading catalog ...");
    store.in_transaction(|txn| load_catalog(txn, args))?;
    tracing::info!(
        "All of `catalog load` completed in {:?}",
        before_anything.elapsed()
    );

    common::trace_rss_now();

    Ok(())
}
