use super::VarUsage;
use crate::{IrBgp, IrNode, RenderError};
use unsparql_model::{
    PathExpr, PathQuantifier, PatternTerm, PredicatePattern, VarOrigin,
};

/// Rewinds direction-marked statement patterns into `^iri` path triples.
pub(super) fn wrap_inverse_statements(bgp: &mut IrBgp) -> bool {
    for line in &mut bgp.lines {
        let IrNode::StatementPattern {
            subject,
            predicate: PredicatePattern::NamedNode(predicate),
            object,
            inverted: true,
        } = line
        else {
            continue;
        };
        // The lowered pattern stores its endpoints swapped; the path triple
        // restores the written order.
        *line = IrNode::PathTriple {
            subject: object.clone(),
            path: PathExpr::inverse(PathExpr::Predicate(predicate.clone())),
            object: subject.clone(),
        };
        return true;
    }
    false
}

/// Fuses an arbitrary-length operator whose body collapsed to a single path
/// step between the operator's own endpoints into `path*` / `path+`.
pub(super) fn fuse_arbitrary_length(bgp: &mut IrBgp) -> bool {
    for line in &mut bgp.lines {
        let IrNode::ArbitraryLengthPath {
            subject,
            inner,
            object,
            min_length,
        } = line
        else {
            continue;
        };
        let quantifier = match min_length {
            0 => PathQuantifier::ZeroOrMore,
            1 => PathQuantifier::OneOrMore,
            _ => continue,
        };
        let [step] = inner.lines.as_slice() else {
            continue;
        };
        let Some((from, path, to)) = step.as_path_step() else {
            continue;
        };
        if from != subject || to != object {
            continue;
        }
        *line = IrNode::PathTriple {
            subject: subject.clone(),
            path: PathExpr::quantified(path, quantifier),
            object: object.clone(),
        };
        return true;
    }
    false
}

/// Fuses two path steps meeting in a bridge variable into a sequence.
///
/// A bridge is erasable only when the occurrence map shows exactly its two
/// step positions and nothing else. A user-origin occurrence under the
/// reserved name, or any expression reference, is a capture hazard and
/// aborts the render. A count that is still too high is left for a later
/// pass: the extra occurrences may sit in a union that has not folded yet.
pub(super) fn fuse_sequences(
    bgp: &mut IrBgp,
    usage: &VarUsage,
) -> Result<bool, RenderError> {
    for i in 0..bgp.lines.len() {
        let Some((from, first, bridge)) = bgp.lines[i]
            .as_path_step()
            .map(|(from, path, to)| (from.clone(), path, to.clone()))
        else {
            continue;
        };
        let PatternTerm::Variable(bridge_var) = &bridge else {
            continue;
        };
        let is_bridge = bridge_var.is_path_bridge();
        let reserved_user =
            bridge_var.origin() == VarOrigin::User && bridge_var.has_reserved_name();
        if !is_bridge && !reserved_user {
            continue;
        }
        if is_bridge {
            let counts = usage.counts(bridge_var.name());
            if counts.user_tracked > 0 {
                return Err(RenderError::FusionSafetyViolation(format!(
                    "user variable ?{} collides with a generated path bridge",
                    bridge_var.name()
                )));
            }
            if counts.expr > 0 {
                return Err(RenderError::FusionSafetyViolation(format!(
                    "generated path bridge ?{} is referenced in an expression",
                    bridge_var.name()
                )));
            }
            if counts.tracked != 2 {
                continue;
            }
        }
        let Some((j, second, to)) = bgp.lines.iter().enumerate().find_map(|(j, line)| {
            if j == i {
                return None;
            }
            let (step_from, path, step_to) = line.as_path_step()?;
            (*step_from == bridge).then(|| (j, path, step_to.clone()))
        }) else {
            continue;
        };
        if reserved_user {
            // A name-based reconstruction would have fused this chain and
            // changed the query's meaning.
            return Err(RenderError::FusionSafetyViolation(format!(
                "user variable ?{} occupies a path-bridge position under the reserved name prefix",
                bridge_var.name()
            )));
        }
        bgp.lines[i] = IrNode::PathTriple {
            subject: from,
            path: PathExpr::seq(first, second),
            object: to,
        };
        bgp.lines.remove(j);
        return Ok(true);
    }
    Ok(false)
}
