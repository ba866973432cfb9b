use spargebra::algebra::{AggregateExpression, Expression};
use spargebra::term::GroundTerm;
use std::fmt::Write;
use unsparql_model::{PathExpr, PatternTerm, PredicatePattern, TrackedVar};

/// A group graph pattern: an ordered sequence of lines.
///
/// The BGP is the only IR node that emits braces. Containers (OPTIONAL,
/// MINUS, GRAPH, SERVICE, UNION branches, EXISTS) always hold a BGP and
/// delegate brace printing to it, so braces are never duplicated or dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrBgp {
    pub lines: Vec<IrNode>,
}

impl IrBgp {
    pub fn new(lines: Vec<IrNode>) -> Self {
        Self { lines }
    }
}

/// A surface-shaped IR node, mirroring the SPARQL constructs the renderer
/// can print. Built fresh per render call and discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum IrNode {
    StatementPattern {
        subject: PatternTerm,
        predicate: PredicatePattern,
        object: PatternTerm,
        /// Direction marker carried over from the lowered algebra; set only
        /// on desugared `^iri` steps.
        inverted: bool,
    },
    PathTriple {
        subject: PatternTerm,
        path: PathExpr,
        object: PatternTerm,
    },
    /// The empty-match branch of a desugared `path?`; must be fused away
    /// before rendering.
    ZeroLengthPath {
        subject: PatternTerm,
        object: PatternTerm,
    },
    /// A desugared `path*`/`path+`; must be fused away before rendering.
    ArbitraryLengthPath {
        subject: PatternTerm,
        inner: IrBgp,
        object: PatternTerm,
        min_length: u32,
    },
    Graph {
        name: PredicatePattern,
        inner: IrBgp,
    },
    Service {
        name: PredicatePattern,
        inner: IrBgp,
        silent: bool,
    },
    Optional {
        inner: IrBgp,
        condition: Option<Expression>,
    },
    Minus {
        inner: IrBgp,
    },
    Union {
        branches: Vec<IrBgp>,
        /// `true` when the union stems from user-written `UNION`; only
        /// `false` unions are path-fusion candidates.
        new_scope: bool,
    },
    Filter {
        condition: Expression,
    },
    Bind {
        expression: Expression,
        variable: TrackedVar,
    },
    Values {
        variables: Vec<TrackedVar>,
        rows: Vec<Vec<Option<GroundTerm>>>,
    },
    SubSelect(Box<IrSelect>),
}

/// One `SELECT` projection entry: a plain variable or `(expr AS ?var)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IrProjectionItem {
    pub expression: Option<IrSelectExpr>,
    pub variable: TrackedVar,
}

/// The expression side of a projection entry.
#[derive(Debug, Clone, PartialEq)]
pub enum IrSelectExpr {
    Expr(Expression),
    Aggregate(AggregateExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrOrderSpec {
    pub expression: Expression,
    pub ascending: bool,
}

/// A `SELECT` query or subquery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrSelect {
    pub distinct: bool,
    pub reduced: bool,
    /// Empty means `SELECT *`.
    pub projection: Vec<IrProjectionItem>,
    pub where_clause: IrBgp,
    pub group_by: Vec<TrackedVar>,
    pub having: Vec<Expression>,
    pub order_by: Vec<IrOrderSpec>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Aggregate bindings from the algebra `Group`, keyed by their target
    /// variable. Projection items and HAVING conditions referring to these
    /// variables render the aggregate inline.
    pub aggregates: Vec<(TrackedVar, AggregateExpression)>,
}

impl IrSelect {
    pub fn aggregate_for(&self, name: &str) -> Option<&AggregateExpression> {
        self.aggregates
            .iter()
            .find(|(var, _)| var.name() == name)
            .map(|(_, agg)| agg)
    }

    /// Human-readable tree dump for `debug_ir` diagnostics.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, depth: usize) {
        write_indent(out, depth);
        let _ = write!(out, "Select");
        if self.distinct {
            out.push_str(" DISTINCT");
        }
        if self.reduced {
            out.push_str(" REDUCED");
        }
        if self.projection.is_empty() {
            out.push_str(" *");
        } else {
            for item in &self.projection {
                let _ = write!(out, " {}", item.variable);
            }
        }
        out.push('\n');
        dump_bgp(&self.where_clause, out, depth + 1);
    }
}

fn write_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn dump_bgp(bgp: &IrBgp, out: &mut String, depth: usize) {
    write_indent(out, depth);
    out.push_str("Bgp\n");
    for line in &bgp.lines {
        dump_node(line, out, depth + 1);
    }
}

fn dump_node(node: &IrNode, out: &mut String, depth: usize) {
    write_indent(out, depth);
    match node {
        IrNode::StatementPattern {
            subject,
            predicate,
            object,
            inverted,
        } => {
            let marker = if *inverted { " [inverted]" } else { "" };
            let predicate = match predicate {
                PredicatePattern::NamedNode(n) => n.to_string(),
                PredicatePattern::Variable(v) => v.to_string(),
            };
            let _ = writeln!(out, "StatementPattern {subject} {predicate} {object}{marker}");
        }
        IrNode::PathTriple {
            subject,
            path,
            object,
        } => {
            let _ = writeln!(out, "PathTriple {subject} {path:?} {object}");
        }
        IrNode::ZeroLengthPath { subject, object } => {
            let _ = writeln!(out, "ZeroLengthPath {subject} {object}");
        }
        IrNode::ArbitraryLengthPath {
            subject,
            inner,
            object,
            min_length,
        } => {
            let _ = writeln!(
                out,
                "ArbitraryLengthPath {subject} {object} min={min_length}"
            );
            dump_bgp(inner, out, depth + 1);
        }
        IrNode::Graph { name, inner } => {
            let name = match name {
                PredicatePattern::NamedNode(n) => n.to_string(),
                PredicatePattern::Variable(v) => v.to_string(),
            };
            let _ = writeln!(out, "Graph {name}");
            dump_bgp(inner, out, depth + 1);
        }
        IrNode::Service { name, inner, silent } => {
            let name = match name {
                PredicatePattern::NamedNode(n) => n.to_string(),
                PredicatePattern::Variable(v) => v.to_string(),
            };
            let silent = if *silent { " SILENT" } else { "" };
            let _ = writeln!(out, "Service{silent} {name}");
            dump_bgp(inner, out, depth + 1);
        }
        IrNode::Optional { inner, condition } => {
            let condition = if condition.is_some() {
                " [condition]"
            } else {
                ""
            };
            let _ = writeln!(out, "Optional{condition}");
            dump_bgp(inner, out, depth + 1);
        }
        IrNode::Minus { inner } => {
            let _ = writeln!(out, "Minus");
            dump_bgp(inner, out, depth + 1);
        }
        IrNode::Union { branches, new_scope } => {
            let _ = writeln!(out, "Union new_scope={new_scope}");
            for branch in branches {
                dump_bgp(branch, out, depth + 1);
            }
        }
        IrNode::Filter { condition } => {
            let _ = writeln!(out, "Filter {condition}");
        }
        IrNode::Bind {
            expression,
            variable,
        } => {
            let _ = writeln!(out, "Bind {expression} AS {variable}");
        }
        IrNode::Values { variables, rows } => {
            let _ = writeln!(out, "Values [{}] rows={}", variables.len(), rows.len());
        }
        IrNode::SubSelect(select) => {
            out.push_str("SubSelect\n");
            select.dump_into(out, depth + 1);
        }
    }
}

impl IrNode {
    /// Views a triple-like line as a directed path step
    /// `(from, path, to)`, normalizing inverted statement patterns back to
    /// their surface direction.
    pub fn as_path_step(&self) -> Option<(&PatternTerm, PathExpr, &PatternTerm)> {
        match self {
            IrNode::StatementPattern {
                subject,
                predicate: PredicatePattern::NamedNode(p),
                object,
                inverted,
            } => {
                if *inverted {
                    Some((object, PathExpr::inverse(PathExpr::Predicate(p.clone())), subject))
                } else {
                    Some((subject, PathExpr::Predicate(p.clone()), object))
                }
            }
            IrNode::PathTriple {
                subject,
                path,
                object,
            } => Some((subject, path.clone(), object)),
            _ => None,
        }
    }
}
