//! Encoding of RocksDB keys.
//!
//! Integers are written big-endian so that the lexicographic key order equals
//! the numeric order and all keys of one profile form a contiguous prefix.

use byteorder::{BigEndian, ByteOrder};

/// Separator between string and integer key parts.
const SEP: u8 = 0;

/// Key of a whole profile, also the prefix of all per-profile records.
pub fn profile(profile_id: u32) -> Vec<u8> {
    profile_id.to_be_bytes().to_vec()
}

/// Key of a value row `(profile, entity)`.
pub fn row(profile_id: u32, entity_id: u32) -> Vec<u8> {
    let mut result = Vec::with_capacity(8);
    result.extend_from_slice(&profile_id.to_be_bytes());
    result.extend_from_slice(&entity_id.to_be_bytes());
    result
}

/// Key of a sample/profile link `(profile, sample)`.
pub fn sample_profile(profile_id: u32, sample_id: u32) -> Vec<u8> {
    row(profile_id, sample_id)
}

/// Key of a CNA event `(profile, sample, entrez gene id)`.
pub fn cna_event(profile_id: u32, sample_id: u32, entrez_gene_id: i64) -> Vec<u8> {
    let mut result = Vec::with_capacity(16);
    result.extend_from_slice(&profile_id.to_be_bytes());
    result.extend_from_slice(&sample_id.to_be_bytes());
    result.extend_from_slice(&entrez_gene_id.to_be_bytes());
    result
}

/// Key of a sample `(study, stable sample id)`.
pub fn sample(study_id: u32, stable_id: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(4 + stable_id.len());
    result.extend_from_slice(&study_id.to_be_bytes());
    result.extend_from_slice(stable_id.as_bytes());
    result
}

/// Key of an entity by its internal id.
pub fn entity(entity_id: u32) -> Vec<u8> {
    entity_id.to_be_bytes().to_vec()
}

/// Key of a gene by its Entrez id.
pub fn gene(entrez_gene_id: i64) -> Vec<u8> {
    entrez_gene_id.to_be_bytes().to_vec()
}

/// Prefix of all index entries for a (case-insensitive) symbol or alias.
pub fn symbol_prefix(symbol: &str) -> Vec<u8> {
    let mut result = symbol.to_uppercase().into_bytes();
    result.push(SEP);
    result
}

/// Index entry linking a symbol or alias to a gene.
pub fn symbol_entry(symbol: &str, entrez_gene_id: i64) -> Vec<u8> {
    let mut result = symbol_prefix(symbol);
    result.extend_from_slice(&entrez_gene_id.to_be_bytes());
    result
}

/// Extract the Entrez id from an index entry created by `symbol_entry`.
pub fn entrez_of_symbol_entry(key: &[u8]) -> Option<i64> {
    if key.len() < 9 || key[key.len() - 9] != SEP {
        return None;
    }
    Some(BigEndian::read_i64(&key[key.len() - 8..]))
}

/// Extract the second `u32` of a two-part integer key, e.g., the entity id of a row key.
pub fn second_u32(key: &[u8]) -> Option<u32> {
    (key.len() >= 8).then(|| BigEndian::read_u32(&key[4..8]))
}
