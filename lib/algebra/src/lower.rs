use crate::{AlgebraNode, LoweringError, StatementPatternNode};
use spargebra::Query;
use spargebra::algebra::{GraphPattern, PropertyPathExpression};
use unsparql_model::{
    ANON_PATH_INVERSE_PREFIX, ANON_PATH_PREFIX, Expression, PatternTerm, PredicatePattern,
    TrackedVar, VarOrigin, Variable,
};

/// Mints bridge and predicate variables while desugaring property paths.
///
/// The allocator is threaded explicitly through the lowering so variable
/// numbering is deterministic per call and no global state exists.
#[derive(Debug, Default)]
pub struct BridgeVarAllocator {
    counter: u32,
}

impl BridgeVarAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&mut self, prefix: &str, origin: VarOrigin) -> TrackedVar {
        let name = format!("{prefix}{}", self.counter);
        self.counter += 1;
        TrackedVar::synthetic(Variable::new_unchecked(name), origin)
    }

    /// A bridge variable connecting two desugared path fragments.
    pub fn fresh_bridge(&mut self, inverse: bool) -> TrackedVar {
        let prefix = if inverse {
            ANON_PATH_INVERSE_PREFIX
        } else {
            ANON_PATH_PREFIX
        };
        self.fresh(prefix, VarOrigin::PathBridge)
    }

    /// The predicate placeholder of a negated-property-set expansion.
    pub fn fresh_predicate(&mut self) -> TrackedVar {
        let name = format!("{ANON_PATH_PREFIX}pred_{}", self.counter);
        self.counter += 1;
        TrackedVar::synthetic(Variable::new_unchecked(name), VarOrigin::PathPredicate)
    }
}

/// Parses SPARQL text and lowers it into the low-level algebra.
pub fn parse_and_lower(query: &str) -> Result<AlgebraNode, LoweringError> {
    let query = Query::parse(query, None)?;
    lower_query(&query)
}

/// Lowers a parsed query into the low-level algebra, desugaring property
/// paths the way the original parser stack does: sequences become joins over
/// fresh bridge variables, alternatives become non-scope-changing unions,
/// negated sets become filtered wildcard patterns, quantifiers become
/// [AlgebraNode::ArbitraryLengthPath] or a zero-length union.
pub fn lower_query(query: &Query) -> Result<AlgebraNode, LoweringError> {
    match query {
        Query::Select {
            dataset, pattern, ..
        } => {
            if dataset.is_some() {
                return Err(LoweringError::UnsupportedShape(
                    "dataset clauses (FROM / FROM NAMED)".to_owned(),
                ));
            }
            let mut alloc = BridgeVarAllocator::new();
            lower_pattern(pattern, &mut alloc)
        }
        Query::Construct { .. } => Err(LoweringError::UnsupportedShape(
            "CONSTRUCT queries".to_owned(),
        )),
        Query::Describe { .. } => Err(LoweringError::UnsupportedShape(
            "DESCRIBE queries".to_owned(),
        )),
        Query::Ask { .. } => {
            Err(LoweringError::UnsupportedShape("ASK queries".to_owned()))
        }
    }
}

pub fn lower_pattern(
    pattern: &GraphPattern,
    alloc: &mut BridgeVarAllocator,
) -> Result<AlgebraNode, LoweringError> {
    Ok(match pattern {
        GraphPattern::Bgp { patterns } => {
            let mut node: Option<AlgebraNode> = None;
            for triple in patterns {
                let sp = AlgebraNode::StatementPattern(StatementPatternNode {
                    subject: PatternTerm::from_term_pattern(triple.subject.clone()),
                    predicate: PredicatePattern::from_named_node_pattern(
                        triple.predicate.clone(),
                    ),
                    object: PatternTerm::from_term_pattern(triple.object.clone()),
                    inverted: false,
                });
                node = Some(match node {
                    Some(left) => AlgebraNode::join(left, sp),
                    None => sp,
                });
            }
            node.unwrap_or(AlgebraNode::Singleton)
        }
        GraphPattern::Path {
            subject,
            path,
            object,
        } => {
            let subject = PatternTerm::from_term_pattern(subject.clone());
            let object = PatternTerm::from_term_pattern(object.clone());
            lower_path(&subject, path, &object, alloc, false)?
        }
        GraphPattern::Join { left, right } => AlgebraNode::join(
            lower_pattern(left, alloc)?,
            lower_pattern(right, alloc)?,
        ),
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => AlgebraNode::LeftJoin {
            left: Box::new(lower_pattern(left, alloc)?),
            right: Box::new(lower_pattern(right, alloc)?),
            condition: expression.clone(),
        },
        GraphPattern::Filter { expr, inner } => AlgebraNode::Filter {
            inner: Box::new(lower_pattern(inner, alloc)?),
            condition: expr.clone(),
        },
        // A spargebra union can only come from user-written `UNION`; every
        // union the lowering itself synthesizes is built below with
        // `new_scope: false`.
        GraphPattern::Union { left, right } => AlgebraNode::Union {
            left: Box::new(lower_pattern(left, alloc)?),
            right: Box::new(lower_pattern(right, alloc)?),
            new_scope: true,
        },
        GraphPattern::Graph { name, inner } => AlgebraNode::Graph {
            name: PredicatePattern::from_named_node_pattern(name.clone()),
            inner: Box::new(lower_pattern(inner, alloc)?),
        },
        GraphPattern::Extend {
            inner,
            variable,
            expression,
        } => AlgebraNode::Extend {
            inner: Box::new(lower_pattern(inner, alloc)?),
            variable: TrackedVar::user(variable.clone()),
            expression: expression.clone(),
        },
        GraphPattern::Minus { left, right } => AlgebraNode::Minus {
            left: Box::new(lower_pattern(left, alloc)?),
            right: Box::new(lower_pattern(right, alloc)?),
        },
        GraphPattern::Values {
            variables,
            bindings,
        } => AlgebraNode::Values {
            variables: variables.iter().cloned().map(TrackedVar::user).collect(),
            rows: bindings.clone(),
        },
        GraphPattern::OrderBy { inner, expression } => AlgebraNode::OrderBy {
            inner: Box::new(lower_pattern(inner, alloc)?),
            expressions: expression.clone(),
        },
        GraphPattern::Project { inner, variables } => AlgebraNode::Projection {
            inner: Box::new(lower_pattern(inner, alloc)?),
            variables: variables.iter().cloned().map(TrackedVar::user).collect(),
        },
        GraphPattern::Distinct { inner } => AlgebraNode::Distinct {
            inner: Box::new(lower_pattern(inner, alloc)?),
        },
        GraphPattern::Reduced { inner } => AlgebraNode::Reduced {
            inner: Box::new(lower_pattern(inner, alloc)?),
        },
        GraphPattern::Slice {
            inner,
            start,
            length,
        } => AlgebraNode::Slice {
            inner: Box::new(lower_pattern(inner, alloc)?),
            start: *start,
            length: *length,
        },
        GraphPattern::Group {
            inner,
            variables,
            aggregates,
        } => AlgebraNode::Group {
            inner: Box::new(lower_pattern(inner, alloc)?),
            variables: variables.iter().cloned().map(TrackedVar::user).collect(),
            aggregates: aggregates
                .iter()
                .map(|(var, agg)| (TrackedVar::user(var.clone()), agg.clone()))
                .collect(),
        },
        GraphPattern::Service {
            name,
            inner,
            silent,
        } => AlgebraNode::Service {
            name: PredicatePattern::from_named_node_pattern(name.clone()),
            inner: Box::new(lower_pattern(inner, alloc)?),
            silent: *silent,
        },
    })
}

fn lower_path(
    subject: &PatternTerm,
    path: &PropertyPathExpression,
    object: &PatternTerm,
    alloc: &mut BridgeVarAllocator,
    in_reverse: bool,
) -> Result<AlgebraNode, LoweringError> {
    Ok(match path {
        PropertyPathExpression::NamedNode(predicate) => {
            AlgebraNode::StatementPattern(StatementPatternNode {
                subject: subject.clone(),
                predicate: PredicatePattern::NamedNode(predicate.clone()),
                object: object.clone(),
                inverted: false,
            })
        }
        PropertyPathExpression::Reverse(inner) => match inner.as_ref() {
            // An inverse atom keeps a direction marker so reconstruction can
            // restore the `^iri` spelling instead of a swapped triple.
            PropertyPathExpression::NamedNode(predicate) => {
                AlgebraNode::StatementPattern(StatementPatternNode {
                    subject: object.clone(),
                    predicate: PredicatePattern::NamedNode(predicate.clone()),
                    object: subject.clone(),
                    inverted: true,
                })
            }
            // Swapping the endpoints and toggling the flag makes a double
            // reverse cancel out.
            other => lower_path(object, other, subject, alloc, !in_reverse)?,
        },
        PropertyPathExpression::Sequence(left, right) => {
            let bridge = PatternTerm::bridge(alloc.fresh_bridge(in_reverse));
            AlgebraNode::join(
                lower_path(subject, left, &bridge, alloc, in_reverse)?,
                lower_path(&bridge, right, object, alloc, in_reverse)?,
            )
        }
        PropertyPathExpression::Alternative(left, right) => AlgebraNode::Union {
            left: Box::new(lower_path(subject, left, object, alloc, in_reverse)?),
            right: Box::new(lower_path(subject, right, object, alloc, in_reverse)?),
            new_scope: false,
        },
        PropertyPathExpression::ZeroOrMore(inner) => AlgebraNode::ArbitraryLengthPath {
            subject: subject.clone(),
            inner: Box::new(lower_path(subject, inner, object, alloc, in_reverse)?),
            object: object.clone(),
            min_length: 0,
        },
        PropertyPathExpression::OneOrMore(inner) => AlgebraNode::ArbitraryLengthPath {
            subject: subject.clone(),
            inner: Box::new(lower_path(subject, inner, object, alloc, in_reverse)?),
            object: object.clone(),
            min_length: 1,
        },
        PropertyPathExpression::ZeroOrOne(inner) => AlgebraNode::Union {
            left: Box::new(AlgebraNode::ZeroLengthPath {
                subject: subject.clone(),
                object: object.clone(),
            }),
            right: Box::new(lower_path(subject, inner, object, alloc, in_reverse)?),
            new_scope: false,
        },
        PropertyPathExpression::NegatedPropertySet(members) => {
            lower_negated_set(subject, members, object, alloc, in_reverse)
        }
    })
}

/// `!(...)` becomes a wildcard-predicate pattern filtered against every
/// excluded IRI, with the predicate placeholder recorded as
/// lowering-generated. A set reached through `^` keeps the direction marker
/// so reconstruction restores backward members instead of swapped endpoints.
fn lower_negated_set(
    subject: &PatternTerm,
    members: &[spargebra::term::NamedNode],
    object: &PatternTerm,
    alloc: &mut BridgeVarAllocator,
    in_reverse: bool,
) -> AlgebraNode {
    let predicate = alloc.fresh_predicate();
    let pattern = AlgebraNode::StatementPattern(StatementPatternNode {
        subject: subject.clone(),
        predicate: PredicatePattern::Variable(predicate.clone()),
        object: object.clone(),
        inverted: in_reverse,
    });
    let condition = members
        .iter()
        .map(|iri| {
            Expression::Not(Box::new(Expression::Equal(
                Box::new(Expression::Variable(predicate.variable().clone())),
                Box::new(Expression::NamedNode(iri.clone())),
            )))
        })
        .reduce(|left, right| Expression::And(Box::new(left), Box::new(right)));
    match condition {
        Some(condition) => AlgebraNode::Filter {
            inner: Box::new(pattern),
            condition,
        },
        // `!()` excludes nothing; the bare wildcard pattern is equivalent.
        None => pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(query: &str) -> AlgebraNode {
        parse_and_lower(query).unwrap()
    }

    fn count_unions(node: &AlgebraNode, new_scope: bool) -> usize {
        let mut count = 0;
        let mut stack = vec![node];
        while let Some(node) = stack.pop() {
            match node {
                AlgebraNode::Union {
                    left,
                    right,
                    new_scope: flag,
                } => {
                    if *flag == new_scope {
                        count += 1;
                    }
                    stack.push(left);
                    stack.push(right);
                }
                AlgebraNode::Join(left, right)
                | AlgebraNode::LeftJoin { left, right, .. }
                | AlgebraNode::Minus { left, right } => {
                    stack.push(left);
                    stack.push(right);
                }
                AlgebraNode::Filter { inner, .. }
                | AlgebraNode::Graph { inner, .. }
                | AlgebraNode::Service { inner, .. }
                | AlgebraNode::Extend { inner, .. }
                | AlgebraNode::ArbitraryLengthPath { inner, .. }
                | AlgebraNode::Projection { inner, .. }
                | AlgebraNode::Distinct { inner }
                | AlgebraNode::Reduced { inner }
                | AlgebraNode::Slice { inner, .. }
                | AlgebraNode::OrderBy { inner, .. }
                | AlgebraNode::Group { inner, .. } => stack.push(inner),
                AlgebraNode::Singleton
                | AlgebraNode::StatementPattern(_)
                | AlgebraNode::Values { .. }
                | AlgebraNode::ZeroLengthPath { .. } => {}
            }
        }
        count
    }

    #[test]
    fn path_alternative_lowers_to_non_scope_union() {
        let node = lower(
            "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a|ex:b ?o }",
        );
        assert_eq!(count_unions(&node, false), 1);
        assert_eq!(count_unions(&node, true), 0);
    }

    #[test]
    fn explicit_union_lowers_to_scope_union() {
        let node = lower(
            "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { { ?s a ?o } UNION { ?s ex:p ?o } }",
        );
        assert_eq!(count_unions(&node, true), 1);
        assert_eq!(count_unions(&node, false), 0);
    }

    #[test]
    fn alt_paths_inside_explicit_union_keep_their_flags() {
        let node = lower(
            "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { { ?s ex:a|ex:b ?o } UNION { ?s ex:c|ex:d ?o } }",
        );
        assert_eq!(count_unions(&node, true), 1);
        assert_eq!(count_unions(&node, false), 2);
    }

    #[test]
    fn sequence_lowers_to_join_over_bridge() {
        let node = lower(
            "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ex:a/ex:b ?o }",
        );
        let AlgebraNode::Projection { inner, .. } = node else {
            panic!("expected projection at the root");
        };
        let AlgebraNode::Join(left, right) = *inner else {
            panic!("expected a join of the two steps");
        };
        let AlgebraNode::StatementPattern(first) = *left else {
            panic!("expected a statement pattern");
        };
        let AlgebraNode::StatementPattern(second) = *right else {
            panic!("expected a statement pattern");
        };
        let bridge = first.object.as_variable().expect("bridge variable");
        assert!(bridge.is_path_bridge());
        assert_eq!(Some(bridge), second.subject.as_variable());
    }

    #[test]
    fn inverse_atom_records_direction_marker() {
        let node = lower(
            "PREFIX ex: <http://example.org/> SELECT ?s ?o WHERE { ?s ^ex:p ?o }",
        );
        let AlgebraNode::Projection { inner, .. } = node else {
            panic!("expected projection at the root");
        };
        let AlgebraNode::StatementPattern(sp) = *inner else {
            panic!("expected a statement pattern");
        };
        assert!(sp.inverted);
        assert_eq!(sp.subject.as_variable().unwrap().name(), "o");
        assert_eq!(sp.object.as_variable().unwrap().name(), "s");
    }

    #[test]
    fn datasets_are_rejected_loudly() {
        let err = parse_and_lower(
            "SELECT ?s FROM <http://example.org/g> WHERE { ?s ?p ?o }",
        )
        .unwrap_err();
        assert!(matches!(err, LoweringError::UnsupportedShape(_)));
    }
}
