//! Persistence of catalog and profile matrices in a RocksDB transaction database.

use std::{path::Path, sync::Arc};

use byteorder::{BigEndian, ByteOrder};
use rocksdb::{BoundColumnFamily, Direction, IteratorMode, MultiThreaded, TransactionDB};
use serde::{de::DeserializeOwned, Serialize};

use crate::common;

pub mod catalog;
pub mod keys;
pub mod matrix;
pub mod model;

/// The database type used for the store.
pub type DbImpl = TransactionDB<MultiThreaded>;

/// Column family with meta information and id sequences.
pub const CF_META: &str = "meta";
/// Studies by stable id.
pub const CF_STUDIES: &str = "studies";
/// Samples by study and stable id.
pub const CF_SAMPLES: &str = "samples";
/// Profiles by stable id.
pub const CF_PROFILES: &str = "profiles";
/// Entities by internal id.
pub const CF_ENTITIES: &str = "entities";
/// Genes by Entrez id.
pub const CF_GENES: &str = "genes";
/// Index from upper-case HUGO symbol to Entrez id.
pub const CF_GENE_SYMBOLS: &str = "gene_symbols";
/// Index from upper-case alias to Entrez id.
pub const CF_GENE_ALIASES: &str = "gene_aliases";
/// Gene set entities by external id.
pub const CF_GENESETS: &str = "genesets";
/// Generic assay entities by stable id.
pub const CF_GENERIC_ENTITIES: &str = "generic_entities";
/// Column order by profile.
pub const CF_SAMPLE_ORDER: &str = "sample_order";
/// Value rows by profile and entity.
pub const CF_ALTERATIONS: &str = "alterations";
/// Sample/profile links by profile and sample.
pub const CF_SAMPLE_PROFILE: &str = "sample_profile";
/// CNA events by profile, sample, and Entrez id.
pub const CF_CNA_EVENTS: &str = "cna_events";

/// All column families of the store.
pub const CF_NAMES: &[&str] = &[
    CF_META,
    CF_STUDIES,
    CF_SAMPLES,
    CF_PROFILES,
    CF_ENTITIES,
    CF_GENES,
    CF_GENE_SYMBOLS,
    CF_GENE_ALIASES,
    CF_GENESETS,
    CF_GENERIC_ENTITIES,
    CF_SAMPLE_ORDER,
    CF_ALTERATIONS,
    CF_SAMPLE_PROFILE,
    CF_CNA_EVENTS,
];

/// Key/value pairs as returned from a prefix scan.
pub type KeyValues = Vec<(Box<[u8]>, Box<[u8]>)>;

/// Handle to the store database.
pub struct Store {
    db: DbImpl,
}

impl Store {
    /// Open the store at `path`, creating the database and column families as needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        tracing::debug!("opening RocksDB at {:?}", path.as_ref());
        let mut options = rocksdb::Options::default();
        options.create_if_missing(true);
        options.create_missing_column_families(true);
        let tx_options = rocksdb::TransactionDBOptions::default();
        let cf_descriptors = CF_NAMES
            .iter()
            .map(|name| rocksdb::ColumnFamilyDescriptor::new(*name, options.clone()))
            .collect::<Vec<_>>();
        let db = DbImpl::open_cf_descriptors(&options, &tx_options, path.as_ref(), cf_descriptors)
            .map_err(|e| anyhow::anyhow!("could not open RocksDB at {:?}: {}", path.as_ref(), e))?;

        let cf_meta = db
            .cf_handle(CF_META)
            .ok_or_else(|| anyhow::anyhow!("missing column family {}", CF_META))?;
        db.put_cf(&cf_meta, "worker-version", common::worker_version())?;
        db.put_cf(&cf_meta, "db-name", "profile-matrix")?;

        Ok(Self { db })
    }

    /// Run `f` in one transaction that is committed if `f` succeeds and rolled back otherwise.
    pub fn in_transaction<T, F>(&self, f: F) -> Result<T, anyhow::Error>
    where
        F: FnOnce(&Txn<'_>) -> Result<T, anyhow::Error>,
    {
        let txn = Txn {
            db: &self.db,
            inner: self.db.transaction(),
        };
        match f(&txn) {
            Ok(value) => {
                txn.inner
                    .commit()
                    .map_err(|e| anyhow::anyhow!("problem committing transaction: {}", e))?;
                Ok(value)
            }
            Err(err) => {
                tracing::debug!("rolling back transaction: {}", err);
                if let Err(e) = txn.inner.rollback() {
                    tracing::error!("problem rolling back transaction: {}", e);
                }
                Err(err)
            }
        }
    }
}

/// One open transaction on the store.
///
/// Reads observe the writes made earlier in the same transaction.
pub struct Txn<'a> {
    db: &'a DbImpl,
    inner: rocksdb::Transaction<'a, DbImpl>,
}

impl<'a> Txn<'a> {
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'a>>, anyhow::Error> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| anyhow::anyhow!("missing column family {}", name))
    }

    /// Read raw value.
    fn get_raw(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>, anyhow::Error> {
        let cf = self.cf(cf_name)?;
        self.inner
            .get_cf(&cf, key)
            .map_err(|e| anyhow::anyhow!("problem reading from {}: {}", cf_name, e))
    }

    /// Write raw value.
    fn put_raw(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<(), anyhow::Error> {
        let cf = self.cf(cf_name)?;
        self.inner
            .put_cf(&cf, key, value)
            .map_err(|e| anyhow::anyhow!("problem writing to {}: {}", cf_name, e))
    }

    /// Read and decode JSON value.
    fn get_json<T: DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>, anyhow::Error> {
        self.get_raw(cf_name, key)?
            .map(|buffer| {
                serde_json::from_slice(&buffer)
                    .map_err(|e| anyhow::anyhow!("problem decoding value from {}: {}", cf_name, e))
            })
            .transpose()
    }

    /// Encode and write JSON value.
    fn put_json<T: Serialize>(
        &self,
        cf_name: &str,
        key: &[u8],
        value: &T,
    ) -> Result<(), anyhow::Error> {
        let buffer = serde_json::to_vec(value)?;
        self.put_raw(cf_name, key, &buffer)
    }

    fn delete(&self, cf_name: &str, key: &[u8]) -> Result<(), anyhow::Error> {
        let cf = self.cf(cf_name)?;
        self.inner
            .delete_cf(&cf, key)
            .map_err(|e| anyhow::anyhow!("problem deleting from {}: {}", cf_name, e))
    }

    /// Collect all key/value pairs whose key starts with `prefix`.
    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<KeyValues, anyhow::Error> {
        let cf = self.cf(cf_name)?;
        let mut result = Vec::new();
        for item in self
            .inner
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) =
                item.map_err(|e| anyhow::anyhow!("problem iterating {}: {}", cf_name, e))?;
            if !key.starts_with(prefix) {
                break;
            }
            result.push((key, value));
        }
        Ok(result)
    }

    /// Delete all keys starting with `prefix`, returning the number of deleted keys.
    fn delete_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<usize, anyhow::Error> {
        let keys = self.scan_prefix(cf_name, prefix)?;
        for (key, _) in &keys {
            self.delete(cf_name, key)?;
        }
        Ok(keys.len())
    }

    /// Return the next value of the named `u32` sequence, starting at 1.
    pub fn next_id(&self, sequence: &str) -> Result<u32, anyhow::Error> {
        let key = format!("seq:{}", sequence);
        let current = self
            .get_raw(CF_META, key.as_bytes())?
            .map(|buffer| {
                if buffer.len() == 4 {
                    Ok(BigEndian::read_u32(&buffer))
                } else {
                    Err(anyhow::anyhow!("corrupt sequence {}", sequence))
                }
            })
            .transpose()?
            .unwrap_or(0);
        let next = current
            .checked_add(1)
            .ok_or_else(|| anyhow::anyhow!("sequence {} exhausted", sequence))?;
        self.put_raw(CF_META, key.as_bytes(), &next.to_be_bytes())?;
        Ok(next)
    }
}
