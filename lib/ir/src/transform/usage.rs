use crate::{IrBgp, IrNode, IrSelect, IrSelectExpr};
use spargebra::algebra::{AggregateExpression, Expression, GraphPattern, OrderExpression};
use spargebra::term::{NamedNodePattern, TermPattern, TriplePattern};
use std::collections::HashMap;
use unsparql_model::{PatternTerm, PredicatePattern, TrackedVar, VarOrigin};

/// Occurrence counts for one variable name.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct VarCounts {
    /// Occurrences in tracked positions: pattern endpoints, predicates,
    /// VALUES columns, BIND targets, projections, grouping keys.
    pub tracked: u32,
    /// The subset of tracked occurrences carrying [VarOrigin::User].
    pub user_tracked: u32,
    /// Occurrences inside expressions, including everything reachable
    /// through an `EXISTS` pattern.
    pub expr: u32,
}

/// Per-name occurrence counts over a whole query.
///
/// Fusion reads this map to prove a synthetic variable is erasable: a bridge
/// must occur in exactly its two path steps and nowhere else, a negation
/// placeholder in its pattern and its filter and nowhere else. Any
/// user-origin occurrence under a reserved name is a collision.
#[derive(Debug, Default)]
pub(crate) struct VarUsage {
    counts: HashMap<String, VarCounts>,
}

impl VarUsage {
    pub(crate) fn of_select(select: &IrSelect) -> Self {
        let mut usage = Self::default();
        usage.visit_select(select);
        usage
    }

    pub(crate) fn of_bgp(bgp: &IrBgp) -> Self {
        let mut usage = Self::default();
        usage.visit_bgp(bgp);
        usage
    }

    pub(crate) fn counts(&self, name: &str) -> VarCounts {
        self.counts.get(name).copied().unwrap_or_default()
    }

    fn tracked(&mut self, var: &TrackedVar) {
        let entry = self.counts.entry(var.name().to_owned()).or_default();
        entry.tracked += 1;
        if var.origin() == VarOrigin::User {
            entry.user_tracked += 1;
        }
    }

    fn expr_var(&mut self, name: &str) {
        self.counts.entry(name.to_owned()).or_default().expr += 1;
    }

    fn visit_select(&mut self, select: &IrSelect) {
        for item in &select.projection {
            self.tracked(&item.variable);
            match &item.expression {
                Some(IrSelectExpr::Expr(expr)) => self.visit_expression(expr),
                Some(IrSelectExpr::Aggregate(agg)) => self.visit_aggregate(agg),
                None => {}
            }
        }
        self.visit_bgp(&select.where_clause);
        for var in &select.group_by {
            self.tracked(var);
        }
        for condition in &select.having {
            self.visit_expression(condition);
        }
        for spec in &select.order_by {
            self.visit_expression(&spec.expression);
        }
        for (var, agg) in &select.aggregates {
            self.tracked(var);
            self.visit_aggregate(agg);
        }
    }

    fn visit_bgp(&mut self, bgp: &IrBgp) {
        for line in &bgp.lines {
            self.visit_line(line);
        }
    }

    fn visit_line(&mut self, line: &IrNode) {
        match line {
            IrNode::StatementPattern {
                subject,
                predicate,
                object,
                ..
            } => {
                self.visit_pattern_term(subject);
                if let PredicatePattern::Variable(v) = predicate {
                    self.tracked(v);
                }
                self.visit_pattern_term(object);
            }
            IrNode::PathTriple {
                subject, object, ..
            }
            | IrNode::ZeroLengthPath { subject, object } => {
                self.visit_pattern_term(subject);
                self.visit_pattern_term(object);
            }
            IrNode::ArbitraryLengthPath {
                subject,
                inner,
                object,
                ..
            } => {
                self.visit_pattern_term(subject);
                self.visit_bgp(inner);
                self.visit_pattern_term(object);
            }
            IrNode::Graph { name, inner } | IrNode::Service { name, inner, .. } => {
                if let PredicatePattern::Variable(v) = name {
                    self.tracked(v);
                }
                self.visit_bgp(inner);
            }
            IrNode::Optional { inner, condition } => {
                self.visit_bgp(inner);
                if let Some(condition) = condition {
                    self.visit_expression(condition);
                }
            }
            IrNode::Minus { inner } => self.visit_bgp(inner),
            IrNode::Union { branches, .. } => {
                for branch in branches {
                    self.visit_bgp(branch);
                }
            }
            IrNode::Filter { condition } => self.visit_expression(condition),
            IrNode::Bind {
                expression,
                variable,
            } => {
                self.visit_expression(expression);
                self.tracked(variable);
            }
            IrNode::Values { variables, .. } => {
                for var in variables {
                    self.tracked(var);
                }
            }
            IrNode::SubSelect(select) => self.visit_select(select),
        }
    }

    fn visit_pattern_term(&mut self, term: &PatternTerm) {
        if let PatternTerm::Variable(v) = term {
            self.tracked(v);
        }
    }

    fn visit_aggregate(&mut self, agg: &AggregateExpression) {
        match agg {
            AggregateExpression::CountSolutions { .. } => {}
            AggregateExpression::FunctionCall { expr, .. } => self.visit_expression(expr),
        }
    }

    fn visit_expression(&mut self, expr: &Expression) {
        match expr {
            Expression::NamedNode(_) | Expression::Literal(_) => {}
            Expression::Variable(v) => self.expr_var(v.as_str()),
            Expression::Bound(v) => self.expr_var(v.as_str()),
            Expression::Or(a, b)
            | Expression::And(a, b)
            | Expression::Equal(a, b)
            | Expression::SameTerm(a, b)
            | Expression::Greater(a, b)
            | Expression::GreaterOrEqual(a, b)
            | Expression::Less(a, b)
            | Expression::LessOrEqual(a, b)
            | Expression::Add(a, b)
            | Expression::Subtract(a, b)
            | Expression::Multiply(a, b)
            | Expression::Divide(a, b) => {
                self.visit_expression(a);
                self.visit_expression(b);
            }
            Expression::In(needle, haystack) => {
                self.visit_expression(needle);
                for expr in haystack {
                    self.visit_expression(expr);
                }
            }
            Expression::UnaryPlus(inner)
            | Expression::UnaryMinus(inner)
            | Expression::Not(inner) => self.visit_expression(inner),
            Expression::Exists(pattern) => self.visit_graph_pattern(pattern),
            Expression::If(cond, then, otherwise) => {
                self.visit_expression(cond);
                self.visit_expression(then);
                self.visit_expression(otherwise);
            }
            Expression::Coalesce(args) => {
                for expr in args {
                    self.visit_expression(expr);
                }
            }
            Expression::FunctionCall(_, args) => {
                for expr in args {
                    self.visit_expression(expr);
                }
            }
        }
    }

    /// Variables inside an `EXISTS` pattern count as expression occurrences:
    /// they can capture a synthetic name just as well as a plain variable
    /// reference.
    fn visit_graph_pattern(&mut self, pattern: &GraphPattern) {
        match pattern {
            GraphPattern::Bgp { patterns } => {
                for triple in patterns {
                    self.visit_triple_pattern(triple);
                }
            }
            GraphPattern::Path {
                subject, object, ..
            } => {
                self.visit_term_pattern(subject);
                self.visit_term_pattern(object);
            }
            GraphPattern::Join { left, right }
            | GraphPattern::Union { left, right }
            | GraphPattern::Minus { left, right } => {
                self.visit_graph_pattern(left);
                self.visit_graph_pattern(right);
            }
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => {
                self.visit_graph_pattern(left);
                self.visit_graph_pattern(right);
                if let Some(expression) = expression {
                    self.visit_expression(expression);
                }
            }
            GraphPattern::Filter { expr, inner } => {
                self.visit_expression(expr);
                self.visit_graph_pattern(inner);
            }
            GraphPattern::Graph { name, inner }
            | GraphPattern::Service { name, inner, .. } => {
                if let NamedNodePattern::Variable(v) = name {
                    self.expr_var(v.as_str());
                }
                self.visit_graph_pattern(inner);
            }
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => {
                self.visit_graph_pattern(inner);
                self.expr_var(variable.as_str());
                self.visit_expression(expression);
            }
            GraphPattern::Values { variables, .. } => {
                for v in variables {
                    self.expr_var(v.as_str());
                }
            }
            GraphPattern::OrderBy { inner, expression } => {
                self.visit_graph_pattern(inner);
                for order in expression {
                    let (OrderExpression::Asc(expr) | OrderExpression::Desc(expr)) = order;
                    self.visit_expression(expr);
                }
            }
            GraphPattern::Project { inner, variables } => {
                self.visit_graph_pattern(inner);
                for v in variables {
                    self.expr_var(v.as_str());
                }
            }
            GraphPattern::Distinct { inner }
            | GraphPattern::Reduced { inner }
            | GraphPattern::Slice { inner, .. } => self.visit_graph_pattern(inner),
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => {
                self.visit_graph_pattern(inner);
                for v in variables {
                    self.expr_var(v.as_str());
                }
                for (v, agg) in aggregates {
                    self.expr_var(v.as_str());
                    self.visit_aggregate(agg);
                }
            }
        }
    }

    fn visit_triple_pattern(&mut self, triple: &TriplePattern) {
        self.visit_term_pattern(&triple.subject);
        if let NamedNodePattern::Variable(v) = &triple.predicate {
            self.expr_var(v.as_str());
        }
        self.visit_term_pattern(&triple.object);
    }

    fn visit_term_pattern(&mut self, term: &TermPattern) {
        if let TermPattern::Variable(v) = term {
            self.expr_var(v.as_str());
        }
    }
}
