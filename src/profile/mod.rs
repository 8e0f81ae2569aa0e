//! Import, pruning, and export of positionally aligned profile matrices.

pub mod cna;
pub mod export;
pub mod header;
pub mod import;
pub mod merge;
pub mod order;
pub mod remove;
pub mod resolve;
pub mod stable_id;

/// How an import treats the data already stored for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ImportMode {
    /// Replace everything stored for the profile.
    Full,
    /// Merge into the stored rows, appending new samples to the column order.
    Incremental,
}

impl ImportMode {
    /// Mode for the `--overwrite-existing` flag.
    pub fn from_overwrite_existing(overwrite_existing: bool) -> Self {
        if overwrite_existing {
            ImportMode::Incremental
        } else {
            ImportMode::Full
        }
    }
}

/// Row-level warnings collected during one run.
///
/// Every message is also emitted through `tracing`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warnings {
    messages: Vec<String>,
}

impl Warnings {
    /// Record a warning.
    pub fn push<S: Into<String>>(&mut self, message: S) {
        let message = message.into();
        tracing::warn!("{}", &message);
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Whether any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.iter().any(|message| message.contains(needle))
    }
}
