use crate::{PrefixMap, write_named_node, write_predicate_iri};
use oxrdf::NamedNode;

/// Rendering options for property paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStyle {
    /// Render a single-member negated set as `!ex:p` / `!^ex:p` instead of
    /// `!(ex:p)` / `!(^ex:p)`.
    pub compact_single_nps: bool,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            compact_single_nps: true,
        }
    }
}

/// A quantifier suffix on a path element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathQuantifier {
    ZeroOrMore,
    OneOrMore,
    ZeroOrOne,
}

impl PathQuantifier {
    pub fn as_str(self) -> &'static str {
        match self {
            PathQuantifier::ZeroOrMore => "*",
            PathQuantifier::OneOrMore => "+",
            PathQuantifier::ZeroOrOne => "?",
        }
    }
}

/// A member of a negated property set: always a plain predicate, optionally
/// reversed. Composed paths are not representable here, which keeps the
/// NPS shape invariant structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NegatedMember {
    Forward(NamedNode),
    Backward(NamedNode),
}

/// A SPARQL 1.1 property path expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathExpr {
    /// A plain predicate IRI.
    Predicate(NamedNode),
    /// `^path`
    Inverse(Box<PathExpr>),
    /// `left / right`
    Sequence(Box<PathExpr>, Box<PathExpr>),
    /// `left | right`
    Alternative(Box<PathExpr>, Box<PathExpr>),
    /// `!(...)`
    NegatedSet(Vec<NegatedMember>),
    /// `path*`, `path+` or `path?`
    Quantified(Box<PathExpr>, PathQuantifier),
    /// `(path)`, kept only where the grammar forces explicit grouping.
    Group(Box<PathExpr>),
}

/// Binding strength of path operators, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathPrecedence {
    Alternative,
    Sequence,
    Unary,
    Quantified,
    Atom,
}

impl PathExpr {
    pub fn seq(left: PathExpr, right: PathExpr) -> Self {
        PathExpr::Sequence(Box::new(left), Box::new(right))
    }

    pub fn alt(left: PathExpr, right: PathExpr) -> Self {
        PathExpr::Alternative(Box::new(left), Box::new(right))
    }

    pub fn inverse(inner: PathExpr) -> Self {
        PathExpr::Inverse(Box::new(inner))
    }

    pub fn quantified(inner: PathExpr, quantifier: PathQuantifier) -> Self {
        PathExpr::Quantified(Box::new(inner), quantifier)
    }

    pub fn precedence(&self) -> PathPrecedence {
        match self {
            PathExpr::Alternative(_, _) => PathPrecedence::Alternative,
            PathExpr::Sequence(_, _) => PathPrecedence::Sequence,
            PathExpr::Inverse(_) | PathExpr::NegatedSet(_) => PathPrecedence::Unary,
            PathExpr::Quantified(_, _) => PathPrecedence::Quantified,
            PathExpr::Predicate(_) | PathExpr::Group(_) => PathPrecedence::Atom,
        }
    }

    /// Serializes the path, parenthesizing a child exactly when its binding
    /// strength is below what its syntactic slot requires.
    pub fn write_sparql(&self, out: &mut String, prefixes: &PrefixMap, style: PathStyle) {
        match self {
            PathExpr::Predicate(iri) => write_predicate_iri(out, iri.as_ref(), prefixes),
            PathExpr::Inverse(inner) => {
                out.push('^');
                write_child(out, inner, PathPrecedence::Quantified, prefixes, style);
            }
            PathExpr::Sequence(left, right) => {
                write_child(out, left, PathPrecedence::Sequence, prefixes, style);
                out.push('/');
                write_child(out, right, PathPrecedence::Sequence, prefixes, style);
            }
            PathExpr::Alternative(left, right) => {
                write_child(out, left, PathPrecedence::Alternative, prefixes, style);
                out.push('|');
                write_child(out, right, PathPrecedence::Alternative, prefixes, style);
            }
            PathExpr::NegatedSet(members) => {
                write_negated_set(out, members, prefixes, style);
            }
            PathExpr::Quantified(inner, quantifier) => {
                write_child(out, inner, PathPrecedence::Atom, prefixes, style);
                out.push_str(quantifier.as_str());
            }
            PathExpr::Group(inner) => {
                out.push('(');
                inner.write_sparql(out, prefixes, style);
                out.push(')');
            }
        }
    }

    pub fn to_sparql(&self, prefixes: &PrefixMap, style: PathStyle) -> String {
        let mut out = String::new();
        self.write_sparql(&mut out, prefixes, style);
        out
    }
}

fn write_child(
    out: &mut String,
    child: &PathExpr,
    required: PathPrecedence,
    prefixes: &PrefixMap,
    style: PathStyle,
) {
    if child.precedence() < required {
        out.push('(');
        child.write_sparql(out, prefixes, style);
        out.push(')');
    } else {
        child.write_sparql(out, prefixes, style);
    }
}

fn write_negated_set(
    out: &mut String,
    members: &[NegatedMember],
    prefixes: &PrefixMap,
    style: PathStyle,
) {
    out.push('!');
    let compact = style.compact_single_nps && members.len() == 1;
    if !compact {
        out.push('(');
    }
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            out.push('|');
        }
        match member {
            NegatedMember::Forward(n) => write_named_node(out, n.as_ref(), prefixes),
            NegatedMember::Backward(n) => {
                out.push('^');
                write_named_node(out, n.as_ref(), prefixes);
            }
        }
    }
    if !compact {
        out.push(')');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> PrefixMap {
        let mut map = PrefixMap::new();
        map.insert("ex", "http://example.org/");
        map
    }

    fn p(local: &str) -> PathExpr {
        PathExpr::Predicate(NamedNode::new(format!("http://example.org/{local}")).unwrap())
    }

    fn render(path: &PathExpr) -> String {
        path.to_sparql(&prefixes(), PathStyle::default())
    }

    #[test]
    fn sequence_binds_tighter_than_alternative() {
        let path = PathExpr::alt(p("a"), PathExpr::seq(p("b"), p("c")));
        assert_eq!(render(&path), "ex:a|ex:b/ex:c");
    }

    #[test]
    fn alternative_under_sequence_needs_parens() {
        let path = PathExpr::seq(PathExpr::alt(p("a"), p("b")), p("c"));
        assert_eq!(render(&path), "(ex:a|ex:b)/ex:c");
    }

    #[test]
    fn inverse_of_sequence_needs_parens() {
        let path = PathExpr::inverse(PathExpr::seq(p("a"), p("b")));
        assert_eq!(render(&path), "^(ex:a/ex:b)");
    }

    #[test]
    fn quantified_inverse_needs_parens() {
        let path = PathExpr::quantified(
            PathExpr::inverse(p("a")),
            PathQuantifier::ZeroOrMore,
        );
        assert_eq!(render(&path), "(^ex:a)*");
    }

    #[test]
    fn quantifier_over_atom_is_bare() {
        let path = PathExpr::quantified(p("a"), PathQuantifier::OneOrMore);
        assert_eq!(render(&path), "ex:a+");
    }

    #[test]
    fn single_member_nps_renders_compact() {
        let path = PathExpr::NegatedSet(vec![NegatedMember::Backward(
            NamedNode::new("http://example.org/p").unwrap(),
        )]);
        assert_eq!(render(&path), "!^ex:p");
        assert_eq!(
            path.to_sparql(
                &prefixes(),
                PathStyle {
                    compact_single_nps: false
                }
            ),
            "!(^ex:p)"
        );
    }

    #[test]
    fn mixed_nps_renders_in_member_order() {
        let path = PathExpr::NegatedSet(vec![
            NegatedMember::Forward(NamedNode::new("http://example.org/pA").unwrap()),
            NegatedMember::Backward(NamedNode::new("http://example.org/pB").unwrap()),
        ]);
        assert_eq!(render(&path), "!(ex:pA|^ex:pB)");
    }

    #[test]
    fn group_renders_parens_and_ranks_as_atom() {
        let path = PathExpr::quantified(
            PathExpr::Group(Box::new(PathExpr::seq(p("a"), p("b")))),
            PathQuantifier::ZeroOrOne,
        );
        assert_eq!(render(&path), "(ex:a/ex:b)?");
    }
}
