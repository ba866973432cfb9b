use spargebra::Query;
use spargebra::algebra::{Expression, GraphPattern};
use spargebra::term::TriplePattern;

/// Enumerates every single-site structural simplification of a query, from
/// the outside in. Each candidate changes exactly one node; the greedy loop
/// in the driver keeps the first one the oracle still accepts.
pub(crate) fn candidates(query: &Query, prefer_left: bool) -> Vec<Query> {
    let mut out = Vec::new();
    match query {
        Query::Select {
            dataset,
            pattern,
            base_iri,
        } => {
            if dataset.is_some() {
                out.push(Query::Select {
                    dataset: None,
                    pattern: pattern.clone(),
                    base_iri: base_iri.clone(),
                });
            }
            for candidate in pattern_candidates(pattern, prefer_left) {
                out.push(Query::Select {
                    dataset: dataset.clone(),
                    pattern: candidate,
                    base_iri: base_iri.clone(),
                });
            }
        }
        Query::Construct {
            template,
            dataset,
            pattern,
            base_iri,
        } => {
            if dataset.is_some() {
                out.push(Query::Construct {
                    template: template.clone(),
                    dataset: None,
                    pattern: pattern.clone(),
                    base_iri: base_iri.clone(),
                });
            }
            for shrunk in drop_each(template) {
                out.push(Query::Construct {
                    template: shrunk,
                    dataset: dataset.clone(),
                    pattern: pattern.clone(),
                    base_iri: base_iri.clone(),
                });
            }
            for candidate in pattern_candidates(pattern, prefer_left) {
                out.push(Query::Construct {
                    template: template.clone(),
                    dataset: dataset.clone(),
                    pattern: candidate,
                    base_iri: base_iri.clone(),
                });
            }
        }
        Query::Describe {
            dataset,
            pattern,
            base_iri,
        } => {
            if dataset.is_some() {
                out.push(Query::Describe {
                    dataset: None,
                    pattern: pattern.clone(),
                    base_iri: base_iri.clone(),
                });
            }
            for candidate in pattern_candidates(pattern, prefer_left) {
                out.push(Query::Describe {
                    dataset: dataset.clone(),
                    pattern: candidate,
                    base_iri: base_iri.clone(),
                });
            }
        }
        Query::Ask {
            dataset,
            pattern,
            base_iri,
        } => {
            if dataset.is_some() {
                out.push(Query::Ask {
                    dataset: None,
                    pattern: pattern.clone(),
                    base_iri: base_iri.clone(),
                });
            }
            for candidate in pattern_candidates(pattern, prefer_left) {
                out.push(Query::Ask {
                    dataset: dataset.clone(),
                    pattern: candidate,
                    base_iri: base_iri.clone(),
                });
            }
        }
    }
    out
}

fn drop_each(triples: &[TriplePattern]) -> Vec<Vec<TriplePattern>> {
    (0..triples.len())
        .map(|i| {
            let mut shrunk = triples.to_vec();
            shrunk.remove(i);
            shrunk
        })
        .collect()
}

/// Candidates for one pattern: simplifications of this node first, then
/// each child's candidates re-wrapped in place.
fn pattern_candidates(pattern: &GraphPattern, prefer_left: bool) -> Vec<GraphPattern> {
    let mut out = Vec::new();
    local_candidates(pattern, prefer_left, &mut out);
    child_candidates(pattern, prefer_left, &mut out);
    out
}

fn local_candidates(
    pattern: &GraphPattern,
    prefer_left: bool,
    out: &mut Vec<GraphPattern>,
) {
    match pattern {
        GraphPattern::Bgp { patterns } if !patterns.is_empty() => {
            for shrunk in drop_each(patterns) {
                out.push(GraphPattern::Bgp { patterns: shrunk });
            }
        }
        GraphPattern::Bgp { .. } | GraphPattern::Path { .. } => {}
        GraphPattern::Join { left, right } => {
            let (first, second) = ordered(left, right, prefer_left);
            out.push(first.clone());
            out.push(second.clone());
        }
        GraphPattern::LeftJoin { left, right, .. } => {
            out.push(left.as_ref().clone());
            // Dropping optionality often keeps a failure reproducible with
            // one construct less.
            out.push(GraphPattern::Join {
                left: left.clone(),
                right: right.clone(),
            });
        }
        GraphPattern::Filter { expr, inner } => {
            out.push(inner.as_ref().clone());
            if let Expression::Exists(pattern) = expr {
                out.push(GraphPattern::Join {
                    left: inner.clone(),
                    right: pattern.clone(),
                });
            }
        }
        GraphPattern::Union { left, right } => {
            let (first, second) = ordered(left, right, prefer_left);
            out.push(first.clone());
            out.push(second.clone());
        }
        GraphPattern::Graph { inner, .. }
        | GraphPattern::Service { inner, .. }
        | GraphPattern::Extend { inner, .. }
        | GraphPattern::OrderBy { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. }
        | GraphPattern::Group { inner, .. } => out.push(inner.as_ref().clone()),
        GraphPattern::Minus { left, .. } => out.push(left.as_ref().clone()),
        GraphPattern::Values {
            variables,
            bindings,
        } => {
            if bindings.len() > 1 {
                let mid = bindings.len() / 2;
                out.push(GraphPattern::Values {
                    variables: variables.clone(),
                    bindings: bindings[..mid].to_vec(),
                });
                out.push(GraphPattern::Values {
                    variables: variables.clone(),
                    bindings: bindings[mid..].to_vec(),
                });
            }
            out.push(GraphPattern::Bgp {
                patterns: Vec::new(),
            });
        }
        GraphPattern::Project { inner, .. } => {
            // Dropping the projection re-serializes as a `SELECT *`.
            out.push(inner.as_ref().clone());
        }
    }
}

fn ordered<'a>(
    left: &'a GraphPattern,
    right: &'a GraphPattern,
    prefer_left: bool,
) -> (&'a GraphPattern, &'a GraphPattern) {
    if prefer_left { (left, right) } else { (right, left) }
}

fn child_candidates(
    pattern: &GraphPattern,
    prefer_left: bool,
    out: &mut Vec<GraphPattern>,
) {
    match pattern {
        GraphPattern::Bgp { .. } | GraphPattern::Path { .. } | GraphPattern::Values { .. } => {}
        GraphPattern::Join { left, right } => {
            for candidate in pattern_candidates(left, prefer_left) {
                out.push(GraphPattern::Join {
                    left: Box::new(candidate),
                    right: right.clone(),
                });
            }
            for candidate in pattern_candidates(right, prefer_left) {
                out.push(GraphPattern::Join {
                    left: left.clone(),
                    right: Box::new(candidate),
                });
            }
        }
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => {
            for candidate in pattern_candidates(left, prefer_left) {
                out.push(GraphPattern::LeftJoin {
                    left: Box::new(candidate),
                    right: right.clone(),
                    expression: expression.clone(),
                });
            }
            for candidate in pattern_candidates(right, prefer_left) {
                out.push(GraphPattern::LeftJoin {
                    left: left.clone(),
                    right: Box::new(candidate),
                    expression: expression.clone(),
                });
            }
        }
        GraphPattern::Filter { expr, inner } => {
            for candidate in pattern_candidates(inner, prefer_left) {
                out.push(GraphPattern::Filter {
                    expr: expr.clone(),
                    inner: Box::new(candidate),
                });
            }
        }
        GraphPattern::Union { left, right } => {
            for candidate in pattern_candidates(left, prefer_left) {
                out.push(GraphPattern::Union {
                    left: Box::new(candidate),
                    right: right.clone(),
                });
            }
            for candidate in pattern_candidates(right, prefer_left) {
                out.push(GraphPattern::Union {
                    left: left.clone(),
                    right: Box::new(candidate),
                });
            }
        }
        GraphPattern::Graph { name, inner } => {
            for candidate in pattern_candidates(inner, prefer_left) {
                out.push(GraphPattern::Graph {
                    name: name.clone(),
                    inner: Box::new(candidate),
                });
            }
        }
        GraphPattern::Service {
            name,
            inner,
            silent,
        } => {
            for candidate in pattern_candidates(inner, prefer_left) {
                out.push(GraphPattern::Service {
                    name: name.clone(),
                    inner: Box::new(candidate),
                    silent: *silent,
                });
            }
        }
        GraphPattern::Extend {
            inner,
            variable,
            expression,
        } => {
            for candidate in pattern_candidates(inner, prefer_left) {
                out.push(GraphPattern::Extend {
                    inner: Box::new(candidate),
                    variable: variable.clone(),
                    expression: expression.clone(),
                });
            }
        }
        GraphPattern::Minus { left, right } => {
            for candidate in pattern_candidates(left, prefer_left) {
                out.push(GraphPattern::Minus {
                    left: Box::new(candidate),
                    right: right.clone(),
                });
            }
            for candidate in pattern_candidates(right, prefer_left) {
                out.push(GraphPattern::Minus {
                    left: left.clone(),
                    right: Box::new(candidate),
                });
            }
        }
        GraphPattern::OrderBy { inner, expression } => {
            for candidate in pattern_candidates(inner, prefer_left) {
                out.push(GraphPattern::OrderBy {
                    inner: Box::new(candidate),
                    expression: expression.clone(),
                });
            }
        }
        GraphPattern::Project { inner, variables } => {
            for candidate in pattern_candidates(inner, prefer_left) {
                out.push(GraphPattern::Project {
                    inner: Box::new(candidate),
                    variables: variables.clone(),
                });
            }
        }
        GraphPattern::Distinct { inner } => {
            for candidate in pattern_candidates(inner, prefer_left) {
                out.push(GraphPattern::Distinct {
                    inner: Box::new(candidate),
                });
            }
        }
        GraphPattern::Reduced { inner } => {
            for candidate in pattern_candidates(inner, prefer_left) {
                out.push(GraphPattern::Reduced {
                    inner: Box::new(candidate),
                });
            }
        }
        GraphPattern::Slice {
            inner,
            start,
            length,
        } => {
            for candidate in pattern_candidates(inner, prefer_left) {
                out.push(GraphPattern::Slice {
                    inner: Box::new(candidate),
                    start: *start,
                    length: *length,
                });
            }
        }
        GraphPattern::Group {
            inner,
            variables,
            aggregates,
        } => {
            for candidate in pattern_candidates(inner, prefer_left) {
                out.push(GraphPattern::Group {
                    inner: Box::new(candidate),
                    variables: variables.clone(),
                    aggregates: aggregates.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> Query {
        Query::parse(query, None).unwrap()
    }

    #[test]
    fn branch_preference_orders_union_candidates() {
        let query = parse(
            "SELECT * WHERE { { ?s <http://example.org/a> ?o } UNION { ?s <http://example.org/b> ?o } }",
        );
        let left_first = candidates(&query, true)[0].to_string();
        assert!(
            left_first.contains("<http://example.org/a>")
                && !left_first.contains("<http://example.org/b>"),
            "prefer_left should try the left branch first, got: {left_first}"
        );
        let right_first = candidates(&query, false)[0].to_string();
        assert!(
            right_first.contains("<http://example.org/b>")
                && !right_first.contains("<http://example.org/a>"),
            "prefer_left = false should try the right branch first, got: {right_first}"
        );
    }

    #[test]
    fn subselects_offer_a_projection_free_candidate() {
        let query =
            parse("SELECT * WHERE { { SELECT ?s WHERE { ?s <http://example.org/a> ?o } } }");
        let flattened = candidates(&query, true)
            .iter()
            .any(|candidate| !candidate.to_string().contains("SELECT ?s"));
        assert!(flattened, "expected a candidate without the inner projection");
    }
}
