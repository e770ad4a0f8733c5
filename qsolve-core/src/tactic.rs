//! Goals and tactic results.
//!
//! A goal is a set of assertions to be decided or transformed; tactics map a
//! goal to subgoals or a verdict. The quantifier engine exposes its three
//! variants through this interface.

use crate::ast::{TermId, TermManager};

/// A satisfiability goal.
#[derive(Debug, Clone)]
pub struct Goal {
    /// Asserted formulas, interpreted conjunctively.
    pub assertions: Vec<TermId>,
}

impl Goal {
    /// Goal with a single assertion.
    #[must_use]
    pub fn new(formula: TermId) -> Self {
        Self {
            assertions: vec![formula],
        }
    }

    /// Goal from a list of assertions.
    #[must_use]
    pub fn from_assertions(assertions: Vec<TermId>) -> Self {
        Self { assertions }
    }

    /// The conjunction of the goal's assertions.
    pub fn formula(&self, tm: &mut TermManager) -> TermId {
        tm.mk_and(self.assertions.clone())
    }
}

/// Outcome of applying a tactic.
#[derive(Debug, Clone)]
pub enum TacticResult {
    /// The tactic transformed the goal.
    Success {
        /// Resulting subgoals.
        subgoals: Vec<Goal>,
    },
    /// The goal was shown satisfiable.
    Proved,
    /// The goal was shown unsatisfiable.
    Unsat,
    /// The tactic could not decide; the payload explains why.
    Failed(String),
}
