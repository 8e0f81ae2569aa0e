//! Code for the `profile export` subcommand.

use std::{collections::HashMap, time::Instant};

use clap::Parser;
use thousands::Separable;

use crate::{
    common::{self, io::open_write_maybe_gz},
    err::ImportError,
    store::{
        model::{Entity, Profile},
        Store, Txn,
    },
};

/// Command line arguments for `profile export` sub command.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Export a profile as tab-separated matrix", long_about = None)]
pub struct Args {
    /// Path to the RocksDB store.
    #[arg(long, required = true)]
    pub path_db: String,
    /// Stable id of the genetic profile.
    #[arg(long, required = true)]
    pub profile: String,
    /// Path to the output TSV file, gzip-compressed if ending in `.gz`.
    #[arg(long, required = true)]
    pub path_out: String,
}

/// The stored data of one profile with sample stable ids and entities resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileMatrix {
    /// Stable ids of the samples in column order.
    pub samples: Vec<String>,
    /// Rows by ascending entity id.
    pub rows: Vec<(Entity, Vec<String>)>,
}

impl ProfileMatrix {
    /// Values of the first row whose entity is called `name`.
    pub fn row(&self, name: &str) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|(entity, _)| entity.name == name)
            .map(|(_, values)| values.as_slice())
    }
}

/// Load the matrix of `profile`.
///
/// Fails if a row does not have one value per sample of the column order.
pub fn load_matrix(txn: &Txn<'_>, profile: &Profile) -> Result<ProfileMatrix, anyhow::Error> {
    let order = txn.sample_order(profile.internal_id)?;
    let stable_ids = txn
        .samples(profile.study_id)?
        .into_iter()
        .map(|sample| (sample.internal_id, sample.stable_id))
        .collect::<HashMap<_, _>>();
    let samples = order
        .iter()
        .map(|sample_id| {
            stable_ids.get(sample_id).cloned().ok_or_else(|| {
                anyhow::anyhow!(
                    "sample {} in column order of {} is not part of the study",
                    sample_id,
                    &profile.stable_id
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    for (entity_id, values) in txn.rows(profile.internal_id)? {
        if values.len() != order.len() {
            anyhow::bail!(
                "row of entity {} in {} has {} values but the column order has {} samples",
                entity_id,
                &profile.stable_id,
                values.len(),
                order.len()
            );
        }
        let entity = txn
            .entity(entity_id)?
            .ok_or_else(|| anyhow::anyhow!("unknown entity {} in {}", entity_id, &profile.stable_id))?;
        rows.push((entity, values));
    }

    Ok(ProfileMatrix { samples, rows })
}

/// Write `matrix` as tab-separated file to `path_out`.
fn write_matrix(matrix: &ProfileMatrix, path_out: &str) -> Result<(), anyhow::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .has_headers(false)
        .from_writer(
            open_write_maybe_gz(path_out)
                .map_err(|e| anyhow::anyhow!("Cannot open {:?} for writing: {:?}", path_out, e))?,
        );

    let mut header = vec![
        "ENTITY_ID".to_string(),
        "ENTITY_KIND".to_string(),
        "ENTITY_NAME".to_string(),
    ];
    header.extend(matrix.samples.iter().cloned());
    writer.write_record(&header)?;

    for (entity, values) in &matrix.rows {
        let mut record = vec![
            entity.entity_id.to_string(),
            entity.kind.to_string(),
            entity.name.clone(),
        ];
        record.extend(values.iter().cloned());
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(())
}

/// Main entry point for `profile export` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    tracing::info!("Opening RocksDB...");
    let store = Store::open(&args.path_db)?;
    tracing::info!("... done opening RocksDB");

    let matrix = store.in_transaction(|txn| {
        let profile = txn
            .profile(&args.profile)?
            .ok_or_else(|| ImportError::UnknownProfile(args.profile.clone()))?;
        load_matrix(txn, &profile)
    })?;
    tracing::info!(
        "Writing {} rows over {} samples to {}",
        matrix.rows.len().separate_with_commas(),
        matrix.samples.len().separate_with_commas(),
        &args.path_out
    );
    write_matrix(&matrix, &args.path_out)?;
    tracing::info!(
        "All of `profile export` completed in {:?}",
        before_anything.elapsed()
    );

    Ok(())
}
