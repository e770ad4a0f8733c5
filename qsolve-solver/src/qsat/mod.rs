//! Quantifier satisfiability and elimination.
//!
//! The engine decides closed formulas with arbitrary quantifier alternation
//! over the ground kernel's theories, and in elimination mode returns an
//! equivalent quantifier-free formula.
//!
//! ## Structure
//!
//! - [`level`]: the two-sided quantifier level algebra
//! - [`predabs`]: atom/proxy abstraction shared by both kernels
//! - [`mbp`]: model-based projection plugins
//! - [`solver`]: the alternating search loop and projection driver
//!
//! Three variants mirror the classic tactic triple: [`Qsat::qsat`]
//! (decision), [`Qsat::qe2`] (flat elimination) and [`Qsat::qe_rec`]
//! (structure-preserving elimination).

pub mod level;
pub mod mbp;
pub mod predabs;
pub mod solver;

pub use level::MaxLevel;
pub use mbp::{ArithProjector, BvProjector, MbpDriver, ProjectionPlugin};
pub use predabs::{FilterModelConverter, PredAbs};
pub use solver::{Qsat, SatOutcome};

use qsolve_core::ast::TermManager;
use qsolve_core::model::Model;
use qsolve_core::tactic::{Goal, TacticResult};
use qsolve_core::SolverConfig;

/// Goal-level wrapper around the engine.
#[derive(Debug)]
pub struct QsatTactic {
    engine: Qsat,
    qelim: bool,
    model: Option<Model>,
}

impl QsatTactic {
    /// Decision tactic.
    #[must_use]
    pub fn qsat(config: SolverConfig) -> Self {
        Self {
            engine: Qsat::qsat(config),
            qelim: false,
            model: None,
        }
    }

    /// Flat elimination tactic.
    #[must_use]
    pub fn qe2(config: SolverConfig) -> Self {
        Self {
            engine: Qsat::qe2(config),
            qelim: true,
            model: None,
        }
    }

    /// Recursive elimination tactic.
    #[must_use]
    pub fn qe_rec(config: SolverConfig) -> Self {
        Self {
            engine: Qsat::qe_rec(config),
            qelim: true,
            model: None,
        }
    }

    /// The underlying engine (statistics, cancellation).
    #[must_use]
    pub fn engine(&self) -> &Qsat {
        &self.engine
    }

    /// Witness model of the last satisfiable decision run, proxy-free.
    #[must_use]
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// Apply the tactic to a goal.
    pub fn apply(&mut self, tm: &mut TermManager, goal: &Goal) -> TacticResult {
        let fml = goal.formula(tm);
        self.model = None;
        if self.qelim {
            match self.engine.eliminate(tm, fml) {
                Ok(ans) => TacticResult::Success {
                    subgoals: vec![Goal::new(ans)],
                },
                Err(e) => TacticResult::Failed(e.to_string()),
            }
        } else {
            match self.engine.check(tm, fml) {
                Ok(SatOutcome::Sat(model)) => {
                    self.model = Some(model);
                    TacticResult::Proved
                }
                Ok(SatOutcome::Unsat) => TacticResult::Unsat,
                Err(e) => TacticResult::Failed(e.to_string()),
            }
        }
    }
}
