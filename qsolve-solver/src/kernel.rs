//! Ground SMT kernel.
//!
//! An incremental, assumption-based solver over the propositional core and
//! the theory layer. Assertions are permanent and monotone; scoping is done
//! entirely through check-time assumptions, which is all the quantifier
//! engine needs. Models are total: every boolean constant, every theory
//! variable and every atom receives a value, whether or not the boolean
//! skeleton made it relevant.

use crate::cnf::Cnf;
use crate::sat::{Lit, SatResult, SatSolver};
use crate::theory::{self, atom_theory, TheoryKind};
use qsolve_core::ast::{traversal, TermId, TermManager};
use qsolve_core::model::Model;
use qsolve_core::sort::SortKind;
use qsolve_core::statistics::Statistics;
use qsolve_core::SolverConfig;
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of a kernel check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelResult {
    /// Satisfiable; a model is available.
    Sat,
    /// Unsatisfiable; an unsat core over the assumptions is available.
    Unsat,
    /// Gave up; `last_failure` explains why.
    Unknown,
}

/// Incremental ground solver with assumption-based checks.
#[derive(Debug)]
pub struct Kernel {
    config: SolverConfig,
    sat: SatSolver,
    cnf: Cnf,
    cancel: Arc<AtomicBool>,
    model: Model,
    unsat_core: Vec<TermId>,
    last_failure: String,
    stats: Statistics,
    int_vars: Vec<TermId>,
    bv_vars: Vec<TermId>,
    uf_vars: Vec<TermId>,
    tracked: FxHashSet<TermId>,
}

enum LoopOutcome {
    Sat(Model),
    Unsat,
    Unknown(String),
}

impl Kernel {
    /// Kernel with the given resource configuration.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            sat: SatSolver::new(),
            cnf: Cnf::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            model: Model::new(),
            unsat_core: Vec::new(),
            last_failure: "ok".to_string(),
            stats: Statistics::new(),
            int_vars: Vec::new(),
            bv_vars: Vec::new(),
            uf_vars: Vec::new(),
            tracked: FxHashSet::default(),
        }
    }

    /// Permanently assert a quantifier-free formula.
    pub fn assert_expr(&mut self, tm: &mut TermManager, fml: TermId) {
        self.track_vars(tm, fml);
        let l = self.cnf.lit(tm, fml, &mut self.sat);
        self.sat.add_clause([l]);
        self.stats.update("assertions", 1);
    }

    fn track_vars(&mut self, tm: &TermManager, fml: TermId) {
        for v in traversal::collect_free_consts(tm, fml) {
            if !self.tracked.insert(v) {
                continue;
            }
            match tm.sorts.kind(tm.sort_of(v)) {
                SortKind::Int => self.int_vars.push(v),
                SortKind::BitVec(_) => self.bv_vars.push(v),
                SortKind::Uninterpreted(_) => self.uf_vars.push(v),
                SortKind::Bool => {}
            }
        }
    }

    /// Check satisfiability of the assertions under `assumptions`.
    pub fn check(&mut self, tm: &mut TermManager, assumptions: &[TermId]) -> KernelResult {
        self.stats.update("checks", 1);
        let mut asms: Vec<TermId> = Vec::new();
        for &a in assumptions {
            if !asms.contains(&a) {
                asms.push(a);
            }
        }
        let asm_lits: Vec<Lit> = asms
            .iter()
            .map(|&a| {
                self.track_vars(tm, a);
                self.cnf.lit(tm, a, &mut self.sat)
            })
            .collect();
        match self.solve_loop(tm, &asm_lits) {
            LoopOutcome::Sat(model) => {
                self.model = model;
                self.last_failure = "ok".to_string();
                KernelResult::Sat
            }
            LoopOutcome::Unsat => {
                self.unsat_core = self.minimize_core(tm, &asms);
                self.last_failure = "ok".to_string();
                KernelResult::Unsat
            }
            LoopOutcome::Unknown(reason) => {
                self.last_failure = reason;
                KernelResult::Unknown
            }
        }
    }

    /// The model of the last satisfiable check.
    #[must_use]
    pub fn get_model(&self) -> &Model {
        &self.model
    }

    /// Unsat core of the last unsatisfiable check: a minimized subset of the
    /// assumptions passed to it.
    #[must_use]
    pub fn unsat_core(&self) -> &[TermId] {
        &self.unsat_core
    }

    /// Diagnostic for the last `Unknown` ("ok" otherwise).
    #[must_use]
    pub fn last_failure(&self) -> &str {
        &self.last_failure
    }

    /// Raise or clear the cancellation flag.
    pub fn set_cancel(&self, f: bool) {
        self.cancel.store(f, Ordering::Relaxed);
    }

    /// Share the kernel's cancellation flag.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Drop all assertions and per-check state; configuration survives.
    pub fn reset(&mut self) {
        self.sat = SatSolver::new();
        self.cnf.reset();
        self.model = Model::new();
        self.unsat_core.clear();
        self.last_failure = "ok".to_string();
        self.int_vars.clear();
        self.bv_vars.clear();
        self.uf_vars.clear();
        self.tracked.clear();
    }

    /// Merge this kernel's counters into `out`, prefixing each key.
    pub fn collect_statistics(&self, prefix: &str, out: &mut Statistics) {
        for (k, v) in self.stats.iter() {
            out.update(&format!("{prefix}.{k}"), v);
        }
    }

    fn solve_loop(&mut self, tm: &mut TermManager, asm_lits: &[Lit]) -> LoopOutcome {
        for _round in 0..self.config.max_theory_rounds {
            if self.cancel.load(Ordering::Relaxed) {
                return LoopOutcome::Unknown("canceled".to_string());
            }
            if self.sat.solve(asm_lits) == SatResult::Unsat {
                return LoopOutcome::Unsat;
            }
            self.stats.update("sat_rounds", 1);

            let mut arith: Vec<(TermId, bool)> = Vec::new();
            let mut bv: Vec<(TermId, bool)> = Vec::new();
            let mut euf: Vec<(TermId, bool)> = Vec::new();
            let mut foreign: Option<TermId> = None;
            for &(atom, var) in self.cnf.atoms() {
                let value = self.sat.model_value(var);
                match atom_theory(tm, atom) {
                    Some(TheoryKind::Arith) => arith.push((atom, value)),
                    Some(TheoryKind::Bv) => bv.push((atom, value)),
                    Some(TheoryKind::Euf) => euf.push((atom, value)),
                    None => foreign = Some(atom),
                }
            }
            if let Some(atom) = foreign {
                return LoopOutcome::Unknown(format!(
                    "atom outside the supported theories: {:?}",
                    tm.kind(atom)
                ));
            }

            let mut euf_reps = None;
            if !euf.is_empty() {
                match theory::euf::check(tm, &euf) {
                    theory::euf::EufOutcome::Unsat => {
                        self.block(tm, &euf);
                        continue;
                    }
                    theory::euf::EufOutcome::Sat(reps) => euf_reps = Some(reps),
                }
            }
            let arith_assign = if arith.is_empty() {
                None
            } else {
                match theory::lia::check(tm, &arith, self.config.max_branch_nodes) {
                    theory::lia::LiaOutcome::Unsat => {
                        self.block(tm, &arith);
                        continue;
                    }
                    theory::lia::LiaOutcome::Unknown(reason) => {
                        return LoopOutcome::Unknown(reason);
                    }
                    theory::lia::LiaOutcome::Sat(assign) => Some(assign),
                }
            };
            let bv_assign = if bv.is_empty() {
                None
            } else {
                match theory::bv::check(tm, &bv, self.config.bv_enum_limit) {
                    theory::bv::BvOutcome::Unsat => {
                        self.block(tm, &bv);
                        continue;
                    }
                    theory::bv::BvOutcome::Unknown(reason) => {
                        return LoopOutcome::Unknown(reason);
                    }
                    theory::bv::BvOutcome::Sat(assign) => Some(assign),
                }
            };
            return LoopOutcome::Sat(self.build_model(tm, arith_assign, bv_assign, euf_reps));
        }
        LoopOutcome::Unknown("theory interaction round limit reached".to_string())
    }

    /// Block the current polarity of a theory's literal set.
    fn block(&mut self, tm: &TermManager, lits: &[(TermId, bool)]) {
        debug_assert!(!lits.is_empty());
        self.stats.update("theory_conflicts", 1);
        let clause: Vec<Lit> = lits
            .iter()
            .map(|&(atom, value)| {
                let l = self.cnf.lit(tm, atom, &mut self.sat);
                if value {
                    !l
                } else {
                    l
                }
            })
            .collect();
        self.sat.add_clause(clause);
    }

    #[allow(clippy::type_complexity)]
    fn build_model(
        &mut self,
        tm: &mut TermManager,
        arith: Option<rustc_hash::FxHashMap<TermId, num_bigint::BigInt>>,
        bv: Option<rustc_hash::FxHashMap<TermId, (u64, u32)>>,
        euf: Option<rustc_hash::FxHashMap<TermId, TermId>>,
    ) -> Model {
        let mut model = Model::new();
        // Uninterpreted-sort constants map to their class representative.
        if let Some(reps) = euf {
            let mut pairs: Vec<(TermId, TermId)> = reps.into_iter().collect();
            pairs.sort_unstable();
            for (t, rep) in pairs {
                model.set(t, rep);
            }
        }
        for &v in &self.uf_vars {
            if model.get(v).is_none() {
                model.set(v, v);
            }
        }
        // Theory samples for integer and bit-vector constants.
        if let Some(assign) = arith {
            let mut pairs: Vec<(TermId, num_bigint::BigInt)> = assign.into_iter().collect();
            pairs.sort_unstable_by_key(|(t, _)| *t);
            for (t, val) in pairs {
                let v = tm.mk_int(val);
                model.set(t, v);
            }
        }
        for &v in &self.int_vars {
            if model.get(v).is_none() {
                let zero = tm.mk_int(0);
                model.set(v, zero);
            }
        }
        if let Some(assign) = bv {
            let mut pairs: Vec<(TermId, (u64, u32))> = assign.into_iter().collect();
            pairs.sort_unstable_by_key(|(t, _)| *t);
            for (t, (val, width)) in pairs {
                let v = tm.mk_bv(val, width);
                model.set(t, v);
            }
        }
        for &v in &self.bv_vars {
            if model.get(v).is_none() {
                if let SortKind::BitVec(w) = tm.sorts.kind(tm.sort_of(v)) {
                    let w = *w;
                    let zero = tm.mk_bv(0, w);
                    model.set(v, zero);
                }
            }
        }
        // Boolean constants straight from the propositional assignment.
        for &(t, var) in self.cnf.bool_consts() {
            let value = self.sat.model_value(var);
            let v = tm.mk_bool(value);
            model.set(t, v);
        }
        // Atom-level values make the model total on every asserted atom.
        for &(atom, var) in self.cnf.atoms() {
            let value = self.sat.model_value(var);
            let v = tm.mk_bool(value);
            model.set(atom, v);
        }
        model
    }

    /// Deletion-based core minimization: drop an assumption, re-check, keep
    /// the drop while the rest stays unsatisfiable.
    fn minimize_core(&mut self, tm: &mut TermManager, asms: &[TermId]) -> Vec<TermId> {
        let mut core: Vec<TermId> = asms.to_vec();
        let mut i = 0;
        while i < core.len() {
            if self.cancel.load(Ordering::Relaxed) {
                break;
            }
            let trial_lits: Vec<Lit> = core
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &a)| self.cnf.lit(tm, a, &mut self.sat))
                .collect();
            match self.solve_loop(tm, &trial_lits) {
                LoopOutcome::Unsat => {
                    core.remove(i);
                }
                _ => i += 1,
            }
        }
        core
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel() -> Kernel {
        Kernel::new(SolverConfig::default())
    }

    #[test]
    fn assumption_core_is_minimal_subset() {
        let mut tm = TermManager::new();
        let mut k = kernel();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let zero = tm.mk_int(0);
        let five = tm.mk_int(5);
        let p = tm.mk_var("p", tm.sorts.bool_sort);
        let gt = tm.mk_gt(x, five);
        let lt = tm.mk_lt(x, zero);
        let def = tm.mk_eq(p, gt);
        k.assert_expr(&mut tm, def);
        let np = tm.mk_not(p);
        // p (x > 5) together with x < 0 is inconsistent; ¬p alone is not.
        let ltp = tm.mk_var("q", tm.sorts.bool_sort);
        let def2 = tm.mk_eq(ltp, lt);
        k.assert_expr(&mut tm, def2);
        assert_eq!(k.check(&mut tm, &[p, ltp]), KernelResult::Unsat);
        let core = k.unsat_core().to_vec();
        assert_eq!(core.len(), 2);
        assert!(core.contains(&p) && core.contains(&ltp));
        assert_eq!(k.check(&mut tm, &[np, ltp]), KernelResult::Sat);
    }

    #[test]
    fn models_are_total_over_proxies() {
        let mut tm = TermManager::new();
        let mut k = kernel();
        let p = tm.mk_var("p", tm.sorts.bool_sort);
        let q = tm.mk_var("q", tm.sorts.bool_sort);
        let or = tm.mk_or(vec![p, q]);
        k.assert_expr(&mut tm, or);
        assert_eq!(k.check(&mut tm, &[]), KernelResult::Sat);
        let model = k.get_model().clone();
        // Both proxies are valued even though one suffices.
        assert!(model.eval_bool(&mut tm, p).is_some());
        assert!(model.eval_bool(&mut tm, q).is_some());
    }

    #[test]
    fn theory_conflict_is_refuted() {
        let mut tm = TermManager::new();
        let mut k = kernel();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let one = tm.mk_int(1);
        let three = tm.mk_int(3);
        let lo = tm.mk_ge(x, one);
        let hi = tm.mk_le(x, three);
        let d1 = tm.mk_eq(x, one);
        let two = tm.mk_int(2);
        let d2 = tm.mk_eq(x, two);
        let d3 = tm.mk_eq(x, three);
        let nd1 = tm.mk_not(d1);
        let nd2 = tm.mk_not(d2);
        let nd3 = tm.mk_not(d3);
        let all = tm.mk_and(vec![lo, hi, nd1, nd2, nd3]);
        k.assert_expr(&mut tm, all);
        assert_eq!(k.check(&mut tm, &[]), KernelResult::Unsat);
    }
}
