use crate::{PrefixMap, TrackedVar, VarOrigin};
use oxrdf::vocab::xsd;
use oxrdf::{BlankNode, Literal, NamedNode, NamedNodeRef};
use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern};
use std::fmt;
use std::fmt::Write;

/// A subject or object position in a pattern: a tracked variable or a
/// constant term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternTerm {
    Variable(TrackedVar),
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Literal(Literal),
}

impl PatternTerm {
    pub fn from_term_pattern(pattern: TermPattern) -> Self {
        match pattern {
            TermPattern::Variable(v) => PatternTerm::Variable(TrackedVar::user(v)),
            TermPattern::NamedNode(n) => PatternTerm::NamedNode(n),
            TermPattern::BlankNode(b) => PatternTerm::BlankNode(b),
            TermPattern::Literal(l) => PatternTerm::Literal(l),
        }
    }

    pub fn bridge(var: TrackedVar) -> Self {
        PatternTerm::Variable(var)
    }

    pub fn as_variable(&self) -> Option<&TrackedVar> {
        match self {
            PatternTerm::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this position holds a lowering-generated bridge variable.
    pub fn is_path_bridge(&self) -> bool {
        self.as_variable().is_some_and(TrackedVar::is_path_bridge)
    }

    pub fn write_sparql(&self, out: &mut String, prefixes: &PrefixMap) {
        match self {
            PatternTerm::Variable(v) => {
                let _ = write!(out, "{v}");
            }
            PatternTerm::NamedNode(n) => write_named_node(out, n.as_ref(), prefixes),
            PatternTerm::BlankNode(b) => {
                let _ = write!(out, "{b}");
            }
            PatternTerm::Literal(l) => write_literal(out, l, prefixes),
        }
    }
}

impl fmt::Display for PatternTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternTerm::Variable(v) => write!(f, "{v}"),
            PatternTerm::NamedNode(n) => write!(f, "{n}"),
            PatternTerm::BlankNode(b) => write!(f, "{b}"),
            PatternTerm::Literal(l) => write!(f, "{l}"),
        }
    }
}

/// A predicate position: a constant IRI or a tracked variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredicatePattern {
    NamedNode(NamedNode),
    Variable(TrackedVar),
}

impl PredicatePattern {
    pub fn from_named_node_pattern(pattern: NamedNodePattern) -> Self {
        match pattern {
            NamedNodePattern::NamedNode(n) => PredicatePattern::NamedNode(n),
            NamedNodePattern::Variable(v) => {
                PredicatePattern::Variable(TrackedVar::user(v))
            }
        }
    }

    pub fn as_named_node(&self) -> Option<&NamedNode> {
        match self {
            PredicatePattern::NamedNode(n) => Some(n),
            PredicatePattern::Variable(_) => None,
        }
    }

    pub fn as_variable(&self) -> Option<&TrackedVar> {
        match self {
            PredicatePattern::Variable(v) => Some(v),
            PredicatePattern::NamedNode(_) => None,
        }
    }

    /// Whether this predicate is a lowering-generated placeholder from a
    /// negated-property-set expansion.
    pub fn is_path_predicate(&self) -> bool {
        self.as_variable()
            .is_some_and(|v| v.origin() == VarOrigin::PathPredicate)
    }

    pub fn write_sparql(&self, out: &mut String, prefixes: &PrefixMap) {
        match self {
            PredicatePattern::NamedNode(n) => write_named_node(out, n.as_ref(), prefixes),
            PredicatePattern::Variable(v) => {
                let _ = write!(out, "{v}");
            }
        }
    }
}

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Writes an IRI in `prefix:local` form when the prefix map allows it,
/// falling back to the `<...>` form. `rdf:type` uses the `a` keyword only in
/// predicate position, so this helper never emits it.
pub fn write_named_node(out: &mut String, iri: NamedNodeRef<'_>, prefixes: &PrefixMap) {
    match prefixes.compact(iri) {
        Some((prefix, local)) => {
            let _ = write!(out, "{prefix}:{local}");
        }
        None => {
            let _ = write!(out, "{iri}");
        }
    }
}

/// Writes a predicate IRI, using the `a` keyword for `rdf:type`.
pub fn write_predicate_iri(out: &mut String, iri: NamedNodeRef<'_>, prefixes: &PrefixMap) {
    if iri.as_str() == RDF_TYPE {
        out.push('a');
    } else {
        write_named_node(out, iri, prefixes);
    }
}

pub fn write_literal(out: &mut String, literal: &Literal, prefixes: &PrefixMap) {
    out.push('"');
    for c in literal.value().chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    if let Some(language) = literal.language() {
        let _ = write!(out, "@{language}");
    } else if literal.datatype() != xsd::STRING {
        out.push_str("^^");
        write_named_node(out, literal.datatype(), prefixes);
    }
}

pub fn write_ground_term(out: &mut String, term: &GroundTerm, prefixes: &PrefixMap) {
    match term {
        GroundTerm::NamedNode(n) => write_named_node(out, n.as_ref(), prefixes),
        GroundTerm::Literal(l) => write_literal(out, l, prefixes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_prefixes() -> PrefixMap {
        let mut prefixes = PrefixMap::new();
        prefixes.insert("ex", "http://example.org/");
        prefixes
    }

    #[test]
    fn compacts_named_nodes() {
        let mut out = String::new();
        let iri = NamedNode::new("http://example.org/pA").unwrap();
        write_named_node(&mut out, iri.as_ref(), &example_prefixes());
        assert_eq!(out, "ex:pA");
    }

    #[test]
    fn plain_string_literal_has_no_datatype_suffix() {
        let mut out = String::new();
        write_literal(&mut out, &Literal::new_simple_literal("abc"), &example_prefixes());
        assert_eq!(out, "\"abc\"");
    }

    #[test]
    fn language_literal_keeps_tag() {
        let mut out = String::new();
        let literal = Literal::new_language_tagged_literal("chat", "fr").unwrap();
        write_literal(&mut out, &literal, &example_prefixes());
        assert_eq!(out, "\"chat\"@fr");
    }
}
