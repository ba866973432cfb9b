use oxrdf::Variable;
use std::fmt;

/// Name prefix under which the lowering mints forward-oriented bridge
/// variables. The prefix is a rendering-safety device, not an identification
/// mechanism: classification always goes through [VarOrigin].
pub const ANON_PATH_PREFIX: &str = "_anon_path_";

/// Name prefix for bridge variables minted while desugaring inverse steps.
pub const ANON_PATH_INVERSE_PREFIX: &str = "_anon_path_inverse_";

/// Records where a variable came from.
///
/// Path reconstruction may only erase variables the lowering itself invented.
/// A user variable that happens to share the reserved `_anon_path_` spelling
/// keeps the `User` origin and must never be treated as a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarOrigin {
    /// Written by the user.
    User,
    /// Invented to stitch two desugared path fragments together.
    PathBridge,
    /// Invented as the predicate of a negated-property-set expansion.
    PathPredicate,
}

/// A SPARQL variable together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackedVar {
    variable: Variable,
    origin: VarOrigin,
}

impl TrackedVar {
    pub fn user(variable: Variable) -> Self {
        Self {
            variable,
            origin: VarOrigin::User,
        }
    }

    pub fn synthetic(variable: Variable, origin: VarOrigin) -> Self {
        Self { variable, origin }
    }

    pub fn name(&self) -> &str {
        self.variable.as_str()
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn origin(&self) -> VarOrigin {
        self.origin
    }

    pub fn is_path_bridge(&self) -> bool {
        self.origin == VarOrigin::PathBridge
    }

    pub fn is_path_predicate(&self) -> bool {
        self.origin == VarOrigin::PathPredicate
    }

    /// Whether the name alone *looks* like a lowering-generated variable.
    /// Only useful for detecting collisions with user-chosen names.
    pub fn has_reserved_name(&self) -> bool {
        self.name().starts_with(ANON_PATH_PREFIX)
    }

    pub fn same_name(&self, other: &TrackedVar) -> bool {
        self.name() == other.name()
    }
}

impl fmt::Display for TrackedVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variable)
    }
}
