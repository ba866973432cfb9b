use super::VarUsage;
use crate::{IrBgp, IrNode, RenderError};
use oxrdf::NamedNode;
use spargebra::algebra::Expression;
use unsparql_model::{NegatedMember, PathExpr, PredicatePattern};

/// Fuses a wildcard-predicate pattern plus its exclusion filter back into a
/// negated property set.
///
/// The placeholder predicate must occur exactly once in a tracked position
/// and have all its expression occurrences inside the matched filter;
/// anything else means the reserved name escaped its expansion and the
/// render aborts.
pub(super) fn fuse_negated_sets(
    bgp: &mut IrBgp,
    usage: &VarUsage,
) -> Result<bool, RenderError> {
    for i in 0..bgp.lines.len() {
        let IrNode::StatementPattern {
            subject,
            predicate: PredicatePattern::Variable(placeholder),
            object,
            inverted,
        } = &bgp.lines[i]
        else {
            continue;
        };
        if !placeholder.is_path_predicate() {
            continue;
        }
        let counts = usage.counts(placeholder.name());
        if counts.user_tracked > 0 {
            return Err(RenderError::FusionSafetyViolation(format!(
                "user variable ?{} collides with a generated negation placeholder",
                placeholder.name()
            )));
        }
        if counts.tracked != 1 {
            return Err(RenderError::FusionSafetyViolation(format!(
                "generated negation placeholder ?{} appears in more than one pattern",
                placeholder.name()
            )));
        }
        let filter = bgp.lines.iter().enumerate().find_map(|(j, line)| {
            let IrNode::Filter { condition } = line else {
                return None;
            };
            let mut excluded = Vec::new();
            collect_exclusions(condition, placeholder.name(), &mut excluded)
                .then_some((j, excluded))
        });
        let members: Vec<NamedNode> = match &filter {
            Some((_, excluded)) => {
                if counts.expr != excluded.len() as u32 {
                    return Err(RenderError::FusionSafetyViolation(format!(
                        "generated negation placeholder ?{} is referenced outside its exclusion filter",
                        placeholder.name()
                    )));
                }
                excluded.clone()
            }
            // An empty negated set excludes nothing and lowers to the bare
            // wildcard pattern, with no filter at all.
            None if counts.expr == 0 => Vec::new(),
            None => {
                return Err(RenderError::FusionSafetyViolation(format!(
                    "generated negation placeholder ?{} has no matching exclusion filter",
                    placeholder.name()
                )));
            }
        };
        let (subject, object, wrap): (_, _, fn(NamedNode) -> NegatedMember) = if *inverted
        {
            (object.clone(), subject.clone(), NegatedMember::Backward)
        } else {
            (subject.clone(), object.clone(), NegatedMember::Forward)
        };
        bgp.lines[i] = IrNode::PathTriple {
            subject,
            path: PathExpr::NegatedSet(members.into_iter().map(wrap).collect()),
            object,
        };
        if let Some((j, _)) = filter {
            bgp.lines.remove(j);
        }
        return Ok(true);
    }
    Ok(false)
}

/// Decomposes `?p != <a> && ?p != <b> && ...` (spelled as negated
/// equalities) into the excluded IRIs. Any other conjunct shape rejects the
/// whole condition.
fn collect_exclusions(
    condition: &Expression,
    placeholder: &str,
    out: &mut Vec<NamedNode>,
) -> bool {
    match condition {
        Expression::And(left, right) => {
            collect_exclusions(left, placeholder, out)
                && collect_exclusions(right, placeholder, out)
        }
        Expression::Not(inner) => {
            let Expression::Equal(left, right) = inner.as_ref() else {
                return false;
            };
            let (Expression::Variable(var), Expression::NamedNode(iri)) =
                (left.as_ref(), right.as_ref())
            else {
                return false;
            };
            if var.as_str() != placeholder {
                return false;
            }
            out.push(iri.clone());
            true
        }
        _ => false,
    }
}
