//! Clausification.
//!
//! Tseitin encoding of the boolean structure of asserted formulas. Theory
//! atoms and boolean constants become propositional variables through an atom
//! table; the kernel reads that table back to hand literals to the theory
//! layer and to build models.

use crate::sat::{Lit, SatSolver, Var};
use qsolve_core::ast::{TermId, TermKind, TermManager};
use rustc_hash::FxHashMap;

/// Tseitin converter with a definition cache shared across assertions.
#[derive(Debug, Default)]
pub struct Cnf {
    cache: FxHashMap<TermId, Lit>,
    /// Theory atoms, in introduction order, with their variables.
    atoms: Vec<(TermId, Var)>,
    /// Boolean uninterpreted constants with their variables.
    bool_consts: Vec<(TermId, Var)>,
    true_lit: Option<Lit>,
}

impl Cnf {
    /// Empty converter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Theory atoms introduced so far.
    #[must_use]
    pub fn atoms(&self) -> &[(TermId, Var)] {
        &self.atoms
    }

    /// Boolean constants introduced so far.
    #[must_use]
    pub fn bool_consts(&self) -> &[(TermId, Var)] {
        &self.bool_consts
    }

    /// Drop all state.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.atoms.clear();
        self.bool_consts.clear();
        self.true_lit = None;
    }

    fn constant_true(&mut self, sat: &mut SatSolver) -> Lit {
        if let Some(l) = self.true_lit {
            return l;
        }
        let l = Lit::pos(sat.new_var());
        sat.add_clause([l]);
        self.true_lit = Some(l);
        l
    }

    /// Encode a boolean term, adding definitional clauses, and return the
    /// literal standing for it.
    pub fn lit(&mut self, tm: &TermManager, t: TermId, sat: &mut SatSolver) -> Lit {
        if let Some(&l) = self.cache.get(&t) {
            return l;
        }
        debug_assert!(tm.is_bool(t), "clausifying a non-boolean term");
        let l = match tm.kind(t).clone() {
            TermKind::True => self.constant_true(sat),
            TermKind::False => !self.constant_true(sat),
            TermKind::Var { .. } => {
                let v = sat.new_var();
                self.bool_consts.push((t, v));
                Lit::pos(v)
            }
            TermKind::Not(a) => !self.lit(tm, a, sat),
            TermKind::And(args) => {
                let ls: Vec<Lit> = args.iter().map(|&a| self.lit(tm, a, sat)).collect();
                let p = Lit::pos(sat.new_var());
                for &l in &ls {
                    sat.add_clause([!p, l]);
                }
                let mut long: Vec<Lit> = ls.iter().map(|&l| !l).collect();
                long.push(p);
                sat.add_clause(long);
                p
            }
            TermKind::Or(args) => {
                let ls: Vec<Lit> = args.iter().map(|&a| self.lit(tm, a, sat)).collect();
                let p = Lit::pos(sat.new_var());
                for &l in &ls {
                    sat.add_clause([p, !l]);
                }
                let mut long = ls;
                long.push(!p);
                sat.add_clause(long);
                p
            }
            TermKind::Implies(a, b) => {
                let la = self.lit(tm, a, sat);
                let lb = self.lit(tm, b, sat);
                let p = Lit::pos(sat.new_var());
                sat.add_clause([!p, !la, lb]);
                sat.add_clause([p, la]);
                sat.add_clause([p, !lb]);
                p
            }
            TermKind::Ite(c, a, b) if tm.is_bool(a) => {
                let lc = self.lit(tm, c, sat);
                let la = self.lit(tm, a, sat);
                let lb = self.lit(tm, b, sat);
                let p = Lit::pos(sat.new_var());
                sat.add_clause([!p, !lc, la]);
                sat.add_clause([!p, lc, lb]);
                sat.add_clause([p, !lc, !la]);
                sat.add_clause([p, lc, !lb]);
                p
            }
            TermKind::Eq(a, b) if tm.is_bool(a) => {
                let la = self.lit(tm, a, sat);
                let lb = self.lit(tm, b, sat);
                let p = Lit::pos(sat.new_var());
                sat.add_clause([!p, !la, lb]);
                sat.add_clause([!p, la, !lb]);
                sat.add_clause([p, la, lb]);
                sat.add_clause([p, !la, !lb]);
                p
            }
            TermKind::Distinct(args) if args.len() == 2 && tm.is_bool(args[0]) => {
                // distinct over two booleans is xor
                let la = self.lit(tm, args[0], sat);
                let lb = self.lit(tm, args[1], sat);
                let p = Lit::pos(sat.new_var());
                sat.add_clause([!p, la, lb]);
                sat.add_clause([!p, !la, !lb]);
                sat.add_clause([p, !la, lb]);
                sat.add_clause([p, la, !lb]);
                p
            }
            TermKind::Distinct(args) if !args.is_empty() && tm.is_bool(args[0]) => {
                // More than two pairwise-distinct booleans cannot exist.
                !self.constant_true(sat)
            }
            _ => {
                // Theory atom.
                let v = sat.new_var();
                self.atoms.push((t, v));
                Lit::pos(v)
            }
        };
        self.cache.insert(t, l);
        l
    }
}
