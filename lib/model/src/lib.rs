mod path;
mod prefix;
mod term;
mod var;

pub use path::*;
pub use prefix::*;
pub use term::*;
pub use var::*;

// Re-export some oxrdf types.
pub use oxiri::Iri;
pub use oxrdf::{
    BlankNode, IriParseError, Literal, NamedNode, NamedNodeRef, Term, Variable,
    VariableNameParseError,
};
// Re-export the spargebra types that cross crate boundaries.
pub use spargebra::SparqlSyntaxError;
pub use spargebra::algebra::Expression;
pub use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};
