//! Delta-debugging minimizer for SPARQL queries.
//!
//! Given a query and an oracle deciding whether a candidate still exhibits
//! the behavior of interest, [shrink] produces a smaller query the oracle
//! still accepts. Reduction runs in two phases: greedy structural rewrites
//! on the parsed algebra (dropping union branches, optionality, modifiers,
//! whole patterns), then textual ddmin over coarse tokens to sweep up what
//! the structural rules cannot reach.
//!
//! Candidates that no longer parse never reach the oracle, and the total
//! number of oracle checks is capped by [ShrinkConfig::max_checks]; when
//! the budget runs out the best candidate found so far is returned.

mod ddmin;
mod greedy;
mod lexer;

use spargebra::Query;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShrinkError {
    /// The input query does not parse; there is nothing to shrink.
    #[error(transparent)]
    MalformedQuery(#[from] spargebra::SparqlSyntaxError),
    /// The oracle rejects the input itself, so no shrunken query could be
    /// trusted either.
    #[error("the oracle rejects the initial query")]
    UninterestingInput,
}

#[derive(Debug, Clone, Copy)]
pub struct ShrinkConfig {
    /// Upper bound on oracle invocations across both phases.
    pub max_checks: usize,
    /// Upper bound on accepted greedy rewrites.
    pub max_greedy_iterations: usize,
    /// Which UNION branch to try keeping first.
    pub prefer_left_branch: bool,
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            max_checks: 2000,
            max_greedy_iterations: 256,
            prefer_left_branch: true,
        }
    }
}

/// Shrinks `query` while `oracle` keeps accepting the candidate text.
///
/// The oracle should be monotone in spirit: accepting a candidate means the
/// behavior of interest is still present. A flaky oracle will not break the
/// shrinker, but the result is only as meaningful as its answers.
pub fn shrink<F>(
    query: &str,
    mut oracle: F,
    config: &ShrinkConfig,
) -> Result<String, ShrinkError>
where
    F: FnMut(&str) -> bool,
{
    let mut current = Query::parse(query, None)?;
    let mut current_text = current.to_string();
    let mut checks = 1usize;
    if !oracle(&current_text) {
        return Err(ShrinkError::UninterestingInput);
    }

    'greedy: for _ in 0..config.max_greedy_iterations {
        for candidate in greedy::candidates(&current, config.prefer_left_branch) {
            if checks >= config.max_checks {
                break 'greedy;
            }
            let text = candidate.to_string();
            if Query::parse(&text, None).is_err() {
                continue;
            }
            checks += 1;
            if oracle(&text) {
                current = candidate;
                current_text = text;
                continue 'greedy;
            }
        }
        // No candidate accepted: structurally 1-minimal.
        break;
    }

    let tokens = lexer::tokenize(&current_text);
    let mut check = |candidate: &str| {
        if checks >= config.max_checks {
            return false;
        }
        if Query::parse(candidate, None).is_err() {
            return false;
        }
        checks += 1;
        oracle(candidate)
    };
    let minimized = ddmin::ddmin(tokens.clone(), &mut check);
    if minimized == tokens {
        Ok(current_text)
    } else {
        Ok(lexer::join(&minimized))
    }
}
