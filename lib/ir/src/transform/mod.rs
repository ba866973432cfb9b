//! Bottom-up rewriting that folds desugared path structure back into
//! property path expressions.
//!
//! Every pass proves its rewrite safe through the [VarUsage] occurrence map
//! before erasing a synthetic variable; an occurrence it cannot account for
//! aborts the render instead of silently changing the query's meaning.

mod alternation;
mod nps;
mod paths;
mod usage;

use crate::{IrBgp, IrNode, IrSelect, RenderError};
pub(crate) use usage::VarUsage;

const MAX_PASSES: usize = 32;

/// Runs path reconstruction over a whole query to a fixed point.
pub fn reconstruct(select: &mut IrSelect) -> Result<(), RenderError> {
    for _ in 0..MAX_PASSES {
        let usage = VarUsage::of_select(select);
        if !transform_bgp(&mut select.where_clause, &usage)? {
            return Ok(());
        }
    }
    Err(RenderError::RenderInvariantViolation(
        "path reconstruction did not reach a fixed point".to_owned(),
    ))
}

/// Runs path reconstruction over a standalone group, used for the pattern
/// of an `EXISTS` expression.
pub fn reconstruct_bgp(bgp: &mut IrBgp) -> Result<(), RenderError> {
    for _ in 0..MAX_PASSES {
        let usage = VarUsage::of_bgp(bgp);
        if !transform_bgp(bgp, &usage)? {
            return Ok(());
        }
    }
    Err(RenderError::RenderInvariantViolation(
        "path reconstruction did not reach a fixed point".to_owned(),
    ))
}

/// Transforms one group: children first, then the local rules until they
/// stop firing. Returns whether anything changed.
fn transform_bgp(bgp: &mut IrBgp, usage: &VarUsage) -> Result<bool, RenderError> {
    let mut changed = false;
    for line in &mut bgp.lines {
        changed |= transform_children(line, usage)?;
    }
    loop {
        let step = nps::fuse_negated_sets(bgp, usage)?
            || paths::wrap_inverse_statements(bgp)
            || alternation::fuse_unions(bgp)
            || paths::fuse_arbitrary_length(bgp)
            || paths::fuse_sequences(bgp, usage)?;
        if !step {
            break;
        }
        changed = true;
    }
    Ok(changed)
}

fn transform_children(line: &mut IrNode, usage: &VarUsage) -> Result<bool, RenderError> {
    match line {
        IrNode::Graph { inner, .. }
        | IrNode::Service { inner, .. }
        | IrNode::Optional { inner, .. }
        | IrNode::Minus { inner }
        | IrNode::ArbitraryLengthPath { inner, .. } => transform_bgp(inner, usage),
        IrNode::Union { branches, .. } => {
            let mut changed = false;
            for branch in branches {
                changed |= transform_bgp(branch, usage)?;
            }
            Ok(changed)
        }
        IrNode::SubSelect(select) => transform_bgp(&mut select.where_clause, usage),
        IrNode::StatementPattern { .. }
        | IrNode::PathTriple { .. }
        | IrNode::ZeroLengthPath { .. }
        | IrNode::Filter { .. }
        | IrNode::Bind { .. }
        | IrNode::Values { .. } => Ok(false),
    }
}
