use thiserror::Error;

/// An error raised while lowering a parsed query into the low-level algebra.
#[derive(Debug, Error)]
pub enum LoweringError {
    /// The input query text does not parse. This is the parser's verdict,
    /// passed through unchanged.
    #[error(transparent)]
    MalformedQuery(#[from] spargebra::SparqlSyntaxError),
    /// The parsed query uses a construct the lowering has no mapping for.
    /// Content is never dropped silently.
    #[error("unsupported query shape: {0}")]
    UnsupportedShape(String),
}
