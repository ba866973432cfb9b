use crate::{
    IrBgp, IrNode, IrOrderSpec, IrProjectionItem, IrSelect, IrSelectExpr, RenderError,
};
use spargebra::algebra::{Expression, OrderExpression};
use unsparql_algebra::{AlgebraNode, StatementPatternNode};
use unsparql_model::TrackedVar;

/// Converts a lowered algebra tree into the surface-shaped IR.
///
/// The conversion is one-to-one and lossless: every algebra node becomes
/// exactly one IR construct, joins flatten into group lines, and the
/// query-modifier wrappers around the root peel off into [IrSelect] fields.
/// Path reconstruction happens afterwards, in the transform passes.
pub fn convert(root: &AlgebraNode) -> Result<IrSelect, RenderError> {
    convert_select(root)
}

/// Peels the modifier wrappers in the order the parser stacks them:
/// Slice, Distinct/Reduced, Projection, OrderBy, the Extend chain holding
/// `SELECT (expr AS ?var)` assignments, the HAVING filter, Group.
fn convert_select(node: &AlgebraNode) -> Result<IrSelect, RenderError> {
    let mut select = IrSelect::default();
    let mut node = node;

    if let AlgebraNode::Slice {
        inner,
        start,
        length,
    } = node
    {
        if *start > 0 {
            select.offset = Some(*start);
        }
        select.limit = *length;
        node = inner;
    }

    match node {
        AlgebraNode::Distinct { inner } => {
            select.distinct = true;
            node = inner;
        }
        AlgebraNode::Reduced { inner } => {
            select.reduced = true;
            node = inner;
        }
        _ => {}
    }

    let mut projected: Vec<TrackedVar> = Vec::new();
    if let AlgebraNode::Projection { inner, variables } = node {
        projected = variables.clone();
        node = inner;
    }

    if let AlgebraNode::OrderBy { inner, expressions } = node {
        select.order_by = expressions.iter().map(convert_order).collect();
        node = inner;
    }

    // Assignments on an Extend chain directly above the grouping operator
    // came from the SELECT clause of an aggregation query and have no BIND
    // surface form, so they are hoisted into the projection. Every other
    // Extend stays in the group body as a BIND line: hoisting would reorder
    // the chain whenever projection order differs from written BIND order.
    let mut assignments: Vec<(TrackedVar, Expression)> = Vec::new();
    if extends_cover_group(node) {
        while let AlgebraNode::Extend {
            inner,
            variable,
            expression,
        } = node
        {
            if !projected.iter().any(|v| v.same_name(variable)) {
                break;
            }
            assignments.push((variable.clone(), expression.clone()));
            node = inner;
        }
    }

    if let AlgebraNode::Filter { inner, condition } = node {
        if matches!(inner.as_ref(), AlgebraNode::Group { .. }) {
            select.having.push(condition.clone());
            node = inner;
        }
    }

    if let AlgebraNode::Group {
        inner,
        variables,
        aggregates,
    } = node
    {
        select.group_by = variables.clone();
        select.aggregates = aggregates.clone();
        node = inner;
    }

    select.where_clause = convert_bgp(node)?;

    for variable in projected {
        let expression = assignments
            .iter()
            .find(|(var, _)| var.same_name(&variable))
            .map(|(_, expr)| select_expr(&select, expr));
        select.projection.push(IrProjectionItem {
            expression,
            variable,
        });
    }
    Ok(select)
}

/// Whether `node` is an Extend chain, optionally over a HAVING filter,
/// bottoming out at the grouping operator.
fn extends_cover_group(mut node: &AlgebraNode) -> bool {
    let mut seen_extend = false;
    while let AlgebraNode::Extend { inner, .. } = node {
        seen_extend = true;
        node = inner;
    }
    if let AlgebraNode::Filter { inner, .. } = node {
        node = inner;
    }
    seen_extend && matches!(node, AlgebraNode::Group { .. })
}

/// A `SELECT` assignment that merely forwards an aggregate binding renders
/// as the aggregate itself.
fn select_expr(select: &IrSelect, expression: &Expression) -> IrSelectExpr {
    if let Expression::Variable(var) = expression {
        if let Some(agg) = select.aggregate_for(var.as_str()) {
            return IrSelectExpr::Aggregate(agg.clone());
        }
    }
    IrSelectExpr::Expr(expression.clone())
}

fn convert_order(expression: &OrderExpression) -> IrOrderSpec {
    match expression {
        OrderExpression::Asc(expr) => IrOrderSpec {
            expression: expr.clone(),
            ascending: true,
        },
        OrderExpression::Desc(expr) => IrOrderSpec {
            expression: expr.clone(),
            ascending: false,
        },
    }
}

/// Converts a pattern-position algebra node into a group, flattening joins
/// into consecutive lines.
pub(crate) fn convert_bgp(node: &AlgebraNode) -> Result<IrBgp, RenderError> {
    let mut lines = Vec::new();
    convert_into(node, &mut lines)?;
    Ok(IrBgp::new(lines))
}

fn convert_into(node: &AlgebraNode, lines: &mut Vec<IrNode>) -> Result<(), RenderError> {
    match node {
        AlgebraNode::Singleton => {}
        AlgebraNode::StatementPattern(sp) => lines.push(statement_line(sp)),
        AlgebraNode::Join(left, right) => {
            convert_into(left, lines)?;
            convert_into(right, lines)?;
        }
        AlgebraNode::LeftJoin {
            left,
            right,
            condition,
        } => {
            convert_into(left, lines)?;
            lines.push(IrNode::Optional {
                inner: convert_bgp(right)?,
                condition: condition.clone(),
            });
        }
        AlgebraNode::Filter { inner, condition } => {
            convert_into(inner, lines)?;
            lines.push(IrNode::Filter {
                condition: condition.clone(),
            });
        }
        AlgebraNode::Union {
            left,
            right,
            new_scope,
        } => {
            let mut branches = Vec::new();
            collect_union_branches(left, *new_scope, &mut branches)?;
            branches.push(convert_bgp(right)?);
            lines.push(IrNode::Union {
                branches,
                new_scope: *new_scope,
            });
        }
        AlgebraNode::Minus { left, right } => {
            convert_into(left, lines)?;
            lines.push(IrNode::Minus {
                inner: convert_bgp(right)?,
            });
        }
        AlgebraNode::Graph { name, inner } => lines.push(IrNode::Graph {
            name: name.clone(),
            inner: convert_bgp(inner)?,
        }),
        AlgebraNode::Service {
            name,
            inner,
            silent,
        } => lines.push(IrNode::Service {
            name: name.clone(),
            inner: convert_bgp(inner)?,
            silent: *silent,
        }),
        AlgebraNode::Extend {
            inner,
            variable,
            expression,
        } => {
            convert_into(inner, lines)?;
            lines.push(IrNode::Bind {
                expression: expression.clone(),
                variable: variable.clone(),
            });
        }
        AlgebraNode::Values { variables, rows } => lines.push(IrNode::Values {
            variables: variables.clone(),
            rows: rows.clone(),
        }),
        AlgebraNode::ZeroLengthPath { subject, object } => {
            lines.push(IrNode::ZeroLengthPath {
                subject: subject.clone(),
                object: object.clone(),
            });
        }
        AlgebraNode::ArbitraryLengthPath {
            subject,
            inner,
            object,
            min_length,
        } => lines.push(IrNode::ArbitraryLengthPath {
            subject: subject.clone(),
            inner: convert_bgp(inner)?,
            object: object.clone(),
            min_length: *min_length,
        }),
        AlgebraNode::Projection { .. }
        | AlgebraNode::Distinct { .. }
        | AlgebraNode::Reduced { .. }
        | AlgebraNode::Slice { .. }
        | AlgebraNode::OrderBy { .. }
        | AlgebraNode::Group { .. } => {
            lines.push(IrNode::SubSelect(Box::new(convert_select(node)?)));
        }
    }
    Ok(())
}

/// Collects union branches, flattening left-nested unions with the same
/// scope flag. The parser left-nests `a UNION b UNION c`, so this restores
/// the branch list in written order; a union with the opposite flag belongs
/// to a different construct and stays a nested line inside its branch.
fn collect_union_branches(
    node: &AlgebraNode,
    new_scope: bool,
    branches: &mut Vec<IrBgp>,
) -> Result<(), RenderError> {
    if let AlgebraNode::Union {
        left,
        right,
        new_scope: flag,
    } = node
    {
        if *flag == new_scope {
            collect_union_branches(left, new_scope, branches)?;
            branches.push(convert_bgp(right)?);
            return Ok(());
        }
    }
    branches.push(convert_bgp(node)?);
    Ok(())
}

fn statement_line(sp: &StatementPatternNode) -> IrNode {
    IrNode::StatementPattern {
        subject: sp.subject.clone(),
        predicate: sp.predicate.clone(),
        object: sp.object.clone(),
        inverted: sp.inverted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unsparql_algebra::parse_and_lower;

    fn convert_query(query: &str) -> IrSelect {
        convert(&parse_and_lower(query).unwrap()).unwrap()
    }

    #[test]
    fn joins_flatten_into_group_lines() {
        let select = convert_query(
            "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:a ?x . ?x ex:b ?y . ?y ex:c ?o }",
        );
        assert_eq!(select.where_clause.lines.len(), 3);
        assert!(select
            .where_clause
            .lines
            .iter()
            .all(|line| matches!(line, IrNode::StatementPattern { .. })));
    }

    #[test]
    fn left_nested_unions_flatten_into_branches() {
        let select = convert_query(
            "PREFIX ex: <http://example.org/> SELECT ?s WHERE { { ?s ex:a ?o } UNION { ?s ex:b ?o } UNION { ?s ex:c ?o } }",
        );
        let [IrNode::Union { branches, new_scope }] = select.where_clause.lines.as_slice()
        else {
            panic!("expected a single union line");
        };
        assert!(new_scope);
        assert_eq!(branches.len(), 3);
    }

    #[test]
    fn modifiers_peel_into_select_fields() {
        let select = convert_query(
            "PREFIX ex: <http://example.org/> SELECT DISTINCT ?s WHERE { ?s ex:p ?o } ORDER BY ?s LIMIT 10 OFFSET 5",
        );
        assert!(select.distinct);
        assert_eq!(select.limit, Some(10));
        assert_eq!(select.offset, Some(5));
        assert_eq!(select.order_by.len(), 1);
        assert!(select.order_by[0].ascending);
        assert_eq!(select.projection.len(), 1);
    }

    #[test]
    fn aggregate_assignment_becomes_projection_aggregate() {
        let select = convert_query(
            "PREFIX ex: <http://example.org/> SELECT ?s (COUNT(?o) AS ?n) WHERE { ?s ex:p ?o } GROUP BY ?s",
        );
        assert_eq!(select.group_by.len(), 1);
        assert_eq!(select.aggregates.len(), 1);
        let item = select
            .projection
            .iter()
            .find(|item| item.variable.name() == "n")
            .expect("projected aggregate");
        assert!(matches!(
            item.expression,
            Some(IrSelectExpr::Aggregate(_))
        ));
    }

    #[test]
    fn user_binds_stay_in_the_group_body() {
        // Projection order (?b ?a) disagrees with BIND order (?a then ?b);
        // hoisting into the SELECT clause would invert the Extend chain.
        let select = convert_query(
            "PREFIX ex: <http://example.org/> SELECT ?b ?a WHERE { ?s ex:p ?o BIND(1 AS ?a) BIND(2 AS ?b) }",
        );
        assert!(select
            .projection
            .iter()
            .all(|item| item.expression.is_none()));
        let binds = select
            .where_clause
            .lines
            .iter()
            .filter(|line| matches!(line, IrNode::Bind { .. }))
            .count();
        assert_eq!(binds, 2);
    }

    #[test]
    fn nested_projection_becomes_subselect() {
        let select = convert_query(
            "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:p ?o . { SELECT ?o WHERE { ?o ex:q ?z } } }",
        );
        assert!(select
            .where_clause
            .lines
            .iter()
            .any(|line| matches!(line, IrNode::SubSelect(_))));
    }

    #[test]
    fn having_filter_peels_above_group() {
        let select = convert_query(
            "PREFIX ex: <http://example.org/> SELECT ?s (SUM(?v) AS ?total) WHERE { ?s ex:p ?v } GROUP BY ?s HAVING(SUM(?v) > 10)",
        );
        assert_eq!(select.having.len(), 1);
        assert!(select
            .where_clause
            .lines
            .iter()
            .all(|line| matches!(line, IrNode::StatementPattern { .. })));
    }
}
