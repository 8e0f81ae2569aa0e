//! Code for the `profile remove-samples` subcommand.

use std::{collections::HashSet, time::Instant};

use clap::Parser;
use thousands::Separable;

use super::order;
use crate::{
    common::{self, split_csv_arg},
    err::ImportError,
    store::{model::Profile, Store, Txn},
};

/// Command line arguments for `profile remove-samples` sub command.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Remove samples from all profiles of studies", long_about = None)]
pub struct Args {
    /// Path to the RocksDB store.
    #[arg(long, required = true)]
    pub path_db: String,
    /// Comma-separated stable ids of the studies.
    #[arg(long, required = true)]
    pub study_ids: String,
    /// Comma-separated stable ids of the samples.
    #[arg(long, required = true)]
    pub sample_ids: String,
}

/// Outcome of one removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    /// Number of sample records deleted.
    pub samples_removed: usize,
    /// Number of profiles whose column order was shrunk.
    pub profiles_pruned: usize,
    /// Number of profiles holding none of the samples.
    pub profiles_skipped: usize,
    /// Number of rows written back after pruning.
    pub rows_rewritten: usize,
    /// Number of CNA events deleted.
    pub cna_events_removed: usize,
}

/// Remove `positions` from every row and from the column order `order` of `profile`.
fn prune_profile(
    txn: &Txn<'_>,
    profile: &Profile,
    order: &[u32],
    positions: &[usize],
    report: &mut RemovalReport,
) -> Result<(), anyhow::Error> {
    let rows = txn.rows(profile.internal_id)?;
    if let Some((entity_id, values)) = rows.iter().find(|(_, values)| values.len() != order.len()) {
        anyhow::bail!(
            "row of entity {} in {} has {} values but the column order has {} samples",
            entity_id,
            &profile.stable_id,
            values.len(),
            order.len()
        );
    }

    let deleted = txn.delete_rows(profile.internal_id)?;
    let remaining = order::splice_out(txn, profile.internal_id, order, positions)?;
    if remaining.is_empty() {
        tracing::debug!(
            "no samples left in {}, dropped {} rows",
            &profile.stable_id,
            deleted
        );
    } else {
        for (entity_id, values) in rows {
            txn.put_row(
                profile.internal_id,
                entity_id,
                &order::splice(&values, positions),
            )?;
            report.rows_rewritten += 1;
        }
    }
    report.profiles_pruned += 1;

    Ok(())
}

/// Remove the samples `sample_ids` from the studies `study_ids` within `txn`.
///
/// Every profile of the studies is pruned consistently; unknown studies are
/// fatal while samples missing from a study are ignored for that study.
pub fn remove_samples(
    txn: &Txn<'_>,
    study_ids: &[String],
    sample_ids: &[String],
) -> Result<RemovalReport, anyhow::Error> {
    if study_ids.is_empty() || sample_ids.is_empty() {
        anyhow::bail!("at least one study id and one sample id are required");
    }
    let studies = study_ids
        .iter()
        .map(|study_id| {
            txn.study(study_id)?
                .ok_or_else(|| anyhow::Error::from(ImportError::UnknownStudy(study_id.clone())))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut report = RemovalReport::default();
    for study in &studies {
        let mut samples = Vec::new();
        for sample_id in sample_ids {
            match txn.sample(study.internal_id, sample_id)? {
                Some(sample) => samples.push(sample),
                None => tracing::info!(
                    "sample {} not found in study {}, nothing to remove",
                    sample_id,
                    &study.stable_id
                ),
            }
        }
        if samples.is_empty() {
            continue;
        }
        let internal_ids = samples
            .iter()
            .map(|sample| sample.internal_id)
            .collect::<HashSet<_>>();

        // Collect the positions of all profiles before touching any of them.
        let profiles = txn.profiles_for_study(study.internal_id)?;
        let mut affected = Vec::new();
        for profile in &profiles {
            let order = txn.sample_order(profile.internal_id)?;
            let positions = order::removed_positions(&order, &internal_ids);
            if positions.is_empty() {
                tracing::debug!("profile {} holds none of the samples", &profile.stable_id);
                report.profiles_skipped += 1;
            } else {
                affected.push((profile, order, positions));
            }
        }
        for (profile, order, positions) in affected {
            tracing::info!(
                "removing {} of {} samples from {}",
                positions.len(),
                order.len(),
                &profile.stable_id
            );
            prune_profile(txn, profile, &order, &positions, &mut report)?;
        }

        for profile in &profiles {
            for sample in &samples {
                txn.unlink_sample_profile(profile.internal_id, sample.internal_id)?;
            }
            report.cna_events_removed +=
                txn.delete_cna_events(profile.internal_id, Some(&internal_ids))?;
        }
        for sample in &samples {
            txn.delete_sample(sample)?;
            report.samples_removed += 1;
        }
    }

    Ok(report)
}

/// Main entry point for `profile remove-samples` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    common::trace_rss_now();

    tracing::info!("Opening RocksDB...");
    let store = Store::open(&args.path_db)?;
    tracing::info!("... done opening RocksDB");

    let study_ids = split_csv_arg(&args.study_ids);
    let sample_ids = split_csv_arg(&args.sample_ids);
    let report = store.in_transaction(|txn| remove_samples(txn, &study_ids, &sample_ids))?;
    tracing::info!(
        "... removed {} samples, pruned {} profiles ({} rows rewritten, {} skipped), removed {} \
         CNA events",
        report.samples_removed.separate_with_commas(),
        report.profiles_pruned.separate_with_commas(),
        report.rows_rewritten.separate_with_commas(),
        report.profiles_skipped.separate_with_commas(),
        report.cna_events_removed.separate_with_commas()
    );
    tracing::info!(
        "All of `profile remove-samples` completed in {:?}",
        before_anything.elapsed()
    );

    common::trace_rss_now();

    Ok(())
}
