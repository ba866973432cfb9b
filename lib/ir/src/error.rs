use thiserror::Error;
use unsparql_algebra::LoweringError;

/// An error raised while turning a lowered algebra tree back into SPARQL
/// text.
///
/// Structural anomalies are never swallowed: an unsafe path fusion and a
/// broken rendering invariant both abort the render instead of producing
/// plausible-but-wrong text.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Parsing or lowering the input failed before rendering began.
    #[error(transparent)]
    Lowering(#[from] LoweringError),
    /// Path reconstruction found a fusion candidate it cannot prove safe,
    /// e.g. a user variable colliding with the reserved bridge spelling.
    #[error("unsafe path fusion: {0}")]
    FusionSafetyViolation(String),
    /// An internal brace or precedence invariant broke. This signals a bug
    /// in the renderer, not bad input.
    #[error("render invariant violated: {0}")]
    RenderInvariantViolation(String),
}
