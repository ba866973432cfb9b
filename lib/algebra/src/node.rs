use spargebra::algebra::{AggregateExpression, Expression, OrderExpression};
use spargebra::term::GroundTerm;
use unsparql_model::{PatternTerm, PredicatePattern, TrackedVar};

/// A statement pattern in the lowered algebra.
///
/// `inverted` is the direction marker the lowering records when it desugars
/// an `^iri` path step: the stored subject/object are the swapped endpoints,
/// and the marker lets path reconstruction restore the surface direction. A
/// pattern the user wrote is never marked, however its endpoints are spelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementPatternNode {
    pub subject: PatternTerm,
    pub predicate: PredicatePattern,
    pub object: PatternTerm,
    pub inverted: bool,
}

/// The lowered query algebra this crate hands to the renderer pipeline.
///
/// This is the external-parser contract: a closed set of operator kinds,
/// each carrying its children by value, with scope-change flags (`new_scope`)
/// distinguishing user-written grouping from structure the lowering
/// synthesized while desugaring property paths. The tree is immutable once
/// built; the renderer never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgebraNode {
    /// The empty solution (an empty group pattern).
    Singleton,
    StatementPattern(StatementPatternNode),
    Join(Box<AlgebraNode>, Box<AlgebraNode>),
    LeftJoin {
        left: Box<AlgebraNode>,
        right: Box<AlgebraNode>,
        condition: Option<Expression>,
    },
    Filter {
        inner: Box<AlgebraNode>,
        condition: Expression,
    },
    Union {
        left: Box<AlgebraNode>,
        right: Box<AlgebraNode>,
        /// `true` for a user-written `UNION`, `false` for a union the
        /// lowering synthesized from a path alternative, a mixed negated
        /// set or a zero-or-one quantifier.
        new_scope: bool,
    },
    Minus {
        left: Box<AlgebraNode>,
        right: Box<AlgebraNode>,
    },
    Graph {
        name: PredicatePattern,
        inner: Box<AlgebraNode>,
    },
    Service {
        name: PredicatePattern,
        inner: Box<AlgebraNode>,
        silent: bool,
    },
    /// `BIND(expression AS ?variable)` or a `SELECT (expr AS ?v)` assignment.
    Extend {
        inner: Box<AlgebraNode>,
        variable: TrackedVar,
        expression: Expression,
    },
    /// `VALUES`; a `None` cell is `UNDEF`.
    Values {
        variables: Vec<TrackedVar>,
        rows: Vec<Vec<Option<GroundTerm>>>,
    },
    /// The empty-match branch of a desugared `path?`.
    ZeroLengthPath {
        subject: PatternTerm,
        object: PatternTerm,
    },
    /// A desugared `path*` (`min_length == 0`) or `path+` (`min_length == 1`).
    /// `inner` is the lowering of the quantified path between `subject` and
    /// `object`.
    ArbitraryLengthPath {
        subject: PatternTerm,
        inner: Box<AlgebraNode>,
        object: PatternTerm,
        min_length: u32,
    },
    Projection {
        inner: Box<AlgebraNode>,
        variables: Vec<TrackedVar>,
    },
    Distinct {
        inner: Box<AlgebraNode>,
    },
    Reduced {
        inner: Box<AlgebraNode>,
    },
    Slice {
        inner: Box<AlgebraNode>,
        start: usize,
        length: Option<usize>,
    },
    OrderBy {
        inner: Box<AlgebraNode>,
        expressions: Vec<OrderExpression>,
    },
    Group {
        inner: Box<AlgebraNode>,
        variables: Vec<TrackedVar>,
        aggregates: Vec<(TrackedVar, AggregateExpression)>,
    },
}

impl AlgebraNode {
    pub fn join(left: AlgebraNode, right: AlgebraNode) -> Self {
        AlgebraNode::Join(Box::new(left), Box::new(right))
    }
}
