//! Propositional core.
//!
//! A small DPLL solver with chronological backtracking, used below the theory
//! layer. Assumptions are asserted ahead of the search and are never undone
//! by backtracking, so an unsatisfiable answer under assumptions pinpoints
//! the assumption set. Every variable receives a value in a satisfying
//! assignment, including variables no clause constrains.

use smallvec::SmallVec;

/// Propositional variable index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(u32);

impl Var {
    /// Raw index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Literal: a variable with a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lit(u32);

impl Lit {
    /// Positive literal of `v`.
    #[must_use]
    pub fn pos(v: Var) -> Self {
        Lit(v.0 << 1)
    }

    /// Negative literal of `v`.
    #[must_use]
    pub fn neg(v: Var) -> Self {
        Lit((v.0 << 1) | 1)
    }

    /// The literal's variable.
    #[must_use]
    pub fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    /// Whether the literal is negated.
    #[must_use]
    pub fn sign(self) -> bool {
        self.0 & 1 == 1
    }

    /// The complementary literal.
    #[must_use]
    pub fn negate(self) -> Self {
        Lit(self.0 ^ 1)
    }
}

impl std::ops::Not for Lit {
    type Output = Lit;
    fn not(self) -> Lit {
        self.negate()
    }
}

/// Result of a propositional search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    /// A satisfying total assignment was found.
    Sat,
    /// The clause set is unsatisfiable under the given assumptions.
    Unsat,
}

type Clause = SmallVec<[Lit; 4]>;

/// DPLL solver over a growing clause set.
#[derive(Debug, Default)]
pub struct SatSolver {
    num_vars: u32,
    clauses: Vec<Clause>,
    has_empty_clause: bool,
    assignment: Vec<Option<bool>>,
}

impl SatSolver {
    /// Empty solver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh variable.
    pub fn new_var(&mut self) -> Var {
        let v = Var(self.num_vars);
        self.num_vars += 1;
        v
    }

    /// Number of allocated variables.
    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.num_vars as usize
    }

    /// Add a clause. Tautologies are dropped, duplicate literals removed.
    pub fn add_clause(&mut self, lits: impl IntoIterator<Item = Lit>) {
        let mut clause: Clause = SmallVec::new();
        for l in lits {
            if clause.contains(&!l) {
                return; // tautology
            }
            if !clause.contains(&l) {
                clause.push(l);
            }
        }
        if clause.is_empty() {
            self.has_empty_clause = true;
        }
        self.clauses.push(clause);
    }

    /// Number of clauses.
    #[must_use]
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    fn value(&self, l: Lit) -> Option<bool> {
        self.assignment[l.var().index()].map(|b| b != l.sign())
    }

    /// Unit propagation to fixpoint; false on conflict.
    fn propagate(&mut self, trail: &mut Vec<Var>) -> bool {
        loop {
            let mut changed = false;
            for ci in 0..self.clauses.len() {
                let mut unassigned: Option<Lit> = None;
                let mut satisfied = false;
                let mut num_unassigned = 0;
                for &l in &self.clauses[ci] {
                    match self.value(l) {
                        Some(true) => {
                            satisfied = true;
                            break;
                        }
                        Some(false) => {}
                        None => {
                            num_unassigned += 1;
                            unassigned = Some(l);
                        }
                    }
                }
                if satisfied {
                    continue;
                }
                match num_unassigned {
                    0 => return false,
                    1 => {
                        let l = unassigned.expect("unit literal");
                        self.assignment[l.var().index()] = Some(!l.sign());
                        trail.push(l.var());
                        changed = true;
                    }
                    _ => {}
                }
            }
            if !changed {
                return true;
            }
        }
    }

    /// Search for a total satisfying assignment with the given assumptions
    /// fixed. The assignment is queryable through
    /// [`SatSolver::model_value`] after `Sat`.
    pub fn solve(&mut self, assumptions: &[Lit]) -> SatResult {
        if self.has_empty_clause {
            return SatResult::Unsat;
        }
        self.assignment = vec![None; self.num_vars as usize];
        let mut trail: Vec<Var> = Vec::new();

        for &l in assumptions {
            match self.value(l) {
                Some(false) => return SatResult::Unsat,
                Some(true) => {}
                None => {
                    self.assignment[l.var().index()] = Some(!l.sign());
                    trail.push(l.var());
                }
            }
        }
        if !self.propagate(&mut trail) {
            return SatResult::Unsat;
        }

        // (trail length before the decision, decided literal, already flipped)
        let mut decisions: Vec<(usize, Lit, bool)> = Vec::new();
        loop {
            let next = (0..self.num_vars as usize).find(|&i| self.assignment[i].is_none());
            match next {
                None => return SatResult::Sat,
                Some(i) => {
                    let lit = Lit::pos(Var(i as u32));
                    decisions.push((trail.len(), lit, false));
                    self.assignment[i] = Some(true);
                    trail.push(lit.var());
                }
            }
            while !self.propagate(&mut trail) {
                // Conflict: flip the most recent unflipped decision.
                loop {
                    match decisions.pop() {
                        None => return SatResult::Unsat,
                        Some((mark, lit, flipped)) => {
                            while trail.len() > mark {
                                let v = trail.pop().expect("trail underflow");
                                self.assignment[v.index()] = None;
                            }
                            if !flipped {
                                let nl = !lit;
                                decisions.push((mark, nl, true));
                                self.assignment[nl.var().index()] = Some(!nl.sign());
                                trail.push(nl.var());
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Value of a variable in the last satisfying assignment.
    #[must_use]
    pub fn model_value(&self, v: Var) -> bool {
        self.assignment
            .get(v.index())
            .copied()
            .flatten()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_sat_and_unsat() {
        let mut s = SatSolver::new();
        let a = s.new_var();
        let b = s.new_var();
        s.add_clause([Lit::pos(a), Lit::pos(b)]);
        s.add_clause([Lit::neg(a)]);
        assert_eq!(s.solve(&[]), SatResult::Sat);
        assert!(!s.model_value(a));
        assert!(s.model_value(b));
        s.add_clause([Lit::neg(b)]);
        assert_eq!(s.solve(&[]), SatResult::Unsat);
    }

    #[test]
    fn assumptions_constrain_the_search() {
        let mut s = SatSolver::new();
        let a = s.new_var();
        let b = s.new_var();
        s.add_clause([Lit::neg(a), Lit::pos(b)]);
        assert_eq!(s.solve(&[Lit::pos(a), Lit::neg(b)]), SatResult::Unsat);
        assert_eq!(s.solve(&[Lit::pos(a)]), SatResult::Sat);
        assert!(s.model_value(b));
    }

    #[test]
    fn every_variable_is_assigned() {
        let mut s = SatSolver::new();
        let a = s.new_var();
        let _unconstrained = s.new_var();
        s.add_clause([Lit::pos(a)]);
        assert_eq!(s.solve(&[]), SatResult::Sat);
        // Unconstrained variables still carry a value.
        assert_eq!(s.num_vars(), 2);
    }
}
