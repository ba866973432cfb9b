#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]

pub mod algebra {
    pub use unsparql_algebra::*;
}

pub mod ir {
    pub use unsparql_ir::*;
}

pub mod model {
    pub use unsparql_model::*;
}

pub mod shrink {
    pub use unsparql_shrink::*;
}

pub use unsparql_algebra::{AlgebraNode, LoweringError};
pub use unsparql_ir::{RenderConfig, RenderError};
pub use unsparql_shrink::{ShrinkConfig, ShrinkError};

use spargebra::Query;

/// Parses a SPARQL query, lowers it into path-free algebra and renders it
/// back into text with paths reconstructed.
///
/// The result is a fixed point: rendering it again yields the same text.
pub fn render_query(query: &str, config: &RenderConfig) -> Result<String, RenderError> {
    let algebra = unsparql_algebra::parse_and_lower(query)?;
    render_algebra(&algebra, config)
}

/// Like [render_query], starting from an already parsed query.
pub fn render_parsed(query: &Query, config: &RenderConfig) -> Result<String, RenderError> {
    let algebra = unsparql_algebra::lower_query(query)?;
    render_algebra(&algebra, config)
}

/// Renders a lowered algebra tree as SPARQL text.
///
/// This is the path for callers that already hold algebra, e.g. after
/// rewriting it. Desugaring artifacts the reconstruction cannot prove safe
/// to fold are reported as errors rather than rendered wrong.
pub fn render_algebra(
    algebra: &AlgebraNode,
    config: &RenderConfig,
) -> Result<String, RenderError> {
    let mut select = unsparql_ir::convert(algebra)?;
    let raw = config.debug_ir.then(|| select.clone());
    unsparql_ir::transform::reconstruct(&mut select)?;
    unsparql_ir::render_traced(&select, raw.as_ref(), config)
}

/// Minimizes a query while `oracle` keeps accepting the candidate text.
pub fn shrink_query<F>(
    query: &str,
    oracle: F,
    config: &ShrinkConfig,
) -> Result<String, ShrinkError>
where
    F: FnMut(&str) -> bool,
{
    unsparql_shrink::shrink(query, oracle, config)
}
