/// Fatal conditions that abort a whole import or removal run.
///
/// Any of these surfaces as a single terminating failure; the surrounding
/// transaction is rolled back so no partial effect becomes visible.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("unknown genetic profile: {0}")]
    UnknownProfile(String),
    #[error("unknown cancer study: {0}")]
    UnknownStudy(String),
    #[error("file {0} is empty, expected a header line")]
    EmptyFile(String),
    #[error("the following column should be present for {kind} data: {column}")]
    MissingFeatureColumn { kind: String, column: String },
    #[error("at least one of the following columns should be present: Hugo_Symbol or Entrez_Gene_Id")]
    MissingGeneColumns,
    #[error("could not find a sample column in the file")]
    NoSampleColumn,
    #[error("unknown sample id {sample_id:?} found in tab-delimited file: {path}")]
    UnknownSample { sample_id: String, path: String },
    #[error("sample {sample_id:?} appears more than once in the header of {path}")]
    DuplicateSample { sample_id: String, path: String },
    #[error("no records were stored from {0}, something has gone wrong")]
    NothingStored(String),
    #[error("problem with driver annotation file {path}: {reason}")]
    DriverAnnotations { path: String, reason: String },
}
