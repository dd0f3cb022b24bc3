use thiserror::Error;

/// Typed failures callers may want to match on. Everything else surfaces as
/// an `anyhow::Error` with file/row context attached at the call site.
#[derive(Debug, Error)]
pub enum EngulfmentError {
    /// A scanned spectrum file has no entry in the catalog lookup table.
    /// Every spectrum must map to exactly one catalog row, so this is never
    /// coerced to a sentinel index.
    #[error("filename '{0}' not found in the catalog lookup table")]
    UnmatchedFilename(String),

    /// The persisted container lacks one of its required fields.
    #[error("container is missing required field '{0}'")]
    MissingField(&'static str),

    /// An element from the solar composition table has no atomic weight.
    /// Weight is required to normalise photosphere fractions, so the join
    /// fails fast instead of filling in a guess.
    #[error("element '{0}' has no atomic weight in the reference tables")]
    MissingWeight(String),
}
