use crate::{IrBgp, IrNode};
use unsparql_model::{NegatedMember, PathExpr, PathQuantifier};

/// Folds lowering-generated unions back into path expressions.
///
/// Only unions without a scope marker are candidates; a user-written
/// `UNION` keeps its branches untouched. Three shapes fold, tried in order:
/// a zero-length branch next to its path branch (`path?`), the canonical
/// forward/backward split of a mixed negated set, and a run of single-step
/// branches over the same endpoints (`a|b|...`).
pub(super) fn fuse_unions(bgp: &mut IrBgp) -> bool {
    for line in &mut bgp.lines {
        let IrNode::Union {
            branches,
            new_scope: false,
        } = line
        else {
            continue;
        };
        if fuse_zero_or_one(branches) || merge_negated_sets(branches) {
            if let [only] = branches.as_mut_slice() {
                if let [single] = only.lines.as_mut_slice() {
                    *line = single.clone();
                }
            }
            return true;
        }
        if let Some(folded) = fold_alternative(branches) {
            *line = folded;
            return true;
        }
    }
    false
}

/// `path?` lowers to `union(zero-length, path)`; the flattened branch list
/// keeps the two next to each other.
fn fuse_zero_or_one(branches: &mut Vec<IrBgp>) -> bool {
    for k in 0..branches.len().saturating_sub(1) {
        let [IrNode::ZeroLengthPath { subject, object }] = branches[k].lines.as_slice()
        else {
            continue;
        };
        let [step] = branches[k + 1].lines.as_slice() else {
            continue;
        };
        let Some((from, path, to)) = step.as_path_step() else {
            continue;
        };
        if from != subject || to != object {
            continue;
        }
        let fused = IrNode::PathTriple {
            subject: subject.clone(),
            path: PathExpr::quantified(path, PathQuantifier::ZeroOrOne),
            object: object.clone(),
        };
        branches[k] = IrBgp::new(vec![fused]);
        branches.remove(k + 1);
        return true;
    }
    false
}

/// A mixed negated set `!(a|^b)` lowers to the alternative of a
/// forward-only set and a backward-only set over the same endpoints. Only
/// that exact split merges back; two forward sets stay an alternative, which
/// means something else.
fn merge_negated_sets(branches: &mut Vec<IrBgp>) -> bool {
    for k in 0..branches.len().saturating_sub(1) {
        let [IrNode::PathTriple {
            subject: left_subject,
            path: PathExpr::NegatedSet(forward),
            object: left_object,
        }] = branches[k].lines.as_slice()
        else {
            continue;
        };
        let [IrNode::PathTriple {
            subject: right_subject,
            path: PathExpr::NegatedSet(backward),
            object: right_object,
        }] = branches[k + 1].lines.as_slice()
        else {
            continue;
        };
        if left_subject != right_subject || left_object != right_object {
            continue;
        }
        if !forward.iter().all(|m| matches!(m, NegatedMember::Forward(_)))
            || !backward.iter().all(|m| matches!(m, NegatedMember::Backward(_)))
        {
            continue;
        }
        let merged = IrNode::PathTriple {
            subject: left_subject.clone(),
            path: PathExpr::NegatedSet(
                forward.iter().cloned().chain(backward.iter().cloned()).collect(),
            ),
            object: left_object.clone(),
        };
        branches[k] = IrBgp::new(vec![merged]);
        branches.remove(k + 1);
        return true;
    }
    false
}

/// Folds the branch list into a left-associated alternative when every
/// branch is a single step over the same endpoints.
fn fold_alternative(branches: &[IrBgp]) -> Option<IrNode> {
    let mut iter = branches.iter();
    let [first] = iter.next()?.lines.as_slice() else {
        return None;
    };
    let (from, mut acc, to) = first.as_path_step()?;
    for branch in iter {
        let [step] = branch.lines.as_slice() else {
            return None;
        };
        let (step_from, path, step_to) = step.as_path_step()?;
        if step_from != from || step_to != to {
            return None;
        }
        acc = PathExpr::alt(acc, path);
    }
    Some(IrNode::PathTriple {
        subject: from.clone(),
        path: acc,
        object: to.clone(),
    })
}
