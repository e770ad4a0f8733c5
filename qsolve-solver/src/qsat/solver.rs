//! Alternating-level search.
//!
//! Two kernels play a game over the prenex structure of the input: the
//! existential kernel holds the matrix, the universal kernel its negation,
//! and both share every proxy definition. Even levels belong to the
//! existential player, odd levels to the universal one. A satisfiable check
//! descends; an unsatisfiable one either finishes the game, retries the
//! opponent, or learns a projected lemma and backjumps.

use crate::kernel::{Kernel, KernelResult};
use crate::qsat::level::MaxLevel;
use crate::qsat::mbp::MbpDriver;
use crate::qsat::predabs::PredAbs;
use qsolve_core::ast::{traversal, TermId, TermKind, TermManager};
use qsolve_core::error::{QsolveError, Result};
use qsolve_core::model::Model;
use qsolve_core::quant::{extract_bound_vars, prenex};
use qsolve_core::rewrite::push_not;
use qsolve_core::statistics::Statistics;
use qsolve_core::SolverConfig;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of a decision-mode run.
#[derive(Debug, Clone)]
pub enum SatOutcome {
    /// Satisfiable, with the outer existential witness (proxy symbols
    /// already stripped).
    Sat(Model),
    /// Unsatisfiable.
    Unsat,
}

/// Quantifier satisfiability and elimination engine.
#[derive(Debug)]
pub struct Qsat {
    config: SolverConfig,
    qelim: bool,
    force_elim: bool,
    mbp: MbpDriver,
    fa: Kernel,
    ex: Kernel,
    pred_abs: PredAbs,
    answer: Vec<TermId>,
    /// Permanent assumption proxies (elimination mode); never popped.
    asms: Vec<TermId>,
    vars: Vec<Vec<TermId>>,
    level: usize,
    model: Option<Model>,
    cancel: Arc<AtomicBool>,
    avars: Vec<TermId>,
    free_vars: Vec<TermId>,
    num_rounds: u64,
}

impl Qsat {
    fn with_mode(qelim: bool, force_elim: bool, config: SolverConfig) -> Self {
        Self {
            fa: Kernel::new(config.clone()),
            ex: Kernel::new(config.clone()),
            config,
            qelim,
            force_elim,
            mbp: MbpDriver::new(),
            pred_abs: PredAbs::new(),
            answer: Vec::new(),
            asms: Vec::new(),
            vars: Vec::new(),
            level: 0,
            model: None,
            cancel: Arc::new(AtomicBool::new(false)),
            avars: Vec::new(),
            free_vars: Vec::new(),
            num_rounds: 0,
        }
    }

    /// Decision variant: decide satisfiability of a quantified formula.
    #[must_use]
    pub fn qsat(config: SolverConfig) -> Self {
        Self::with_mode(false, true, config)
    }

    /// Flat elimination variant: prenex the whole input and eliminate.
    #[must_use]
    pub fn qe2(config: SolverConfig) -> Self {
        Self::with_mode(true, true, config)
    }

    /// Recursive elimination variant: eliminate quantifier by quantifier,
    /// preserving the input's structure.
    #[must_use]
    pub fn qe_rec(config: SolverConfig) -> Self {
        Self::with_mode(true, false, config)
    }

    /// Rounds played by the search loop in the last run.
    #[must_use]
    pub fn num_rounds(&self) -> u64 {
        self.num_rounds
    }

    /// The invented-symbol filter, for composing model converters.
    #[must_use]
    pub fn fmc(&self) -> &crate::qsat::predabs::FilterModelConverter {
        self.pred_abs.fmc()
    }

    /// Raise or clear cancellation; forwarded to both kernels.
    pub fn set_cancel(&self, f: bool) {
        self.cancel.store(f, Ordering::Relaxed);
        self.ex.set_cancel(f);
        self.fa.set_cancel(f);
    }

    /// Merge engine, abstraction and kernel counters.
    pub fn collect_statistics(&self, out: &mut Statistics) {
        out.update("qsat.num_rounds", self.num_rounds);
        self.pred_abs.collect_statistics(out);
        self.ex.collect_statistics("ex", out);
        self.fa.collect_statistics("fa", out);
    }

    /// Decide satisfiability of `fml` (decision variant only).
    pub fn check(&mut self, tm: &mut TermManager, fml: TermId) -> Result<SatOutcome> {
        debug_assert!(!self.qelim, "check is for the decision variant");
        self.decline_proofs()?;
        self.reset_session();
        let matrix = self.hoist(tm, fml)?;
        self.assert_game(tm, matrix);
        if self.check_sat(tm)? {
            let mut model = if self.config.produce_models {
                self.model.clone().unwrap_or_default()
            } else {
                Model::default()
            };
            self.pred_abs.fmc().apply(&mut model);
            Ok(SatOutcome::Sat(model))
        } else {
            Ok(SatOutcome::Unsat)
        }
    }

    /// Compute a quantifier-free equivalent of `fml` (elimination variants).
    pub fn eliminate(&mut self, tm: &mut TermManager, fml: TermId) -> Result<TermId> {
        debug_assert!(self.qelim, "eliminate is for the elimination variants");
        self.decline_proofs()?;
        if !self.force_elim {
            return self.elim_rec(tm, fml);
        }
        self.reset_session();
        let neg = push_not(tm, fml);
        let matrix = self.hoist(tm, neg)?;
        self.assert_game(tm, matrix);
        if self.check_sat(tm)? {
            // Unreachable for the elimination game; echo the input.
            Ok(fml)
        } else {
            Ok(tm.mk_and(self.answer.clone()))
        }
    }

    fn reset_session(&mut self) {
        self.level = 0;
        self.answer.clear();
        self.asms.clear();
        self.pred_abs.reset();
        self.vars.clear();
        self.model = None;
        self.ex.reset();
        self.fa.reset();
        self.avars.clear();
        self.free_vars.clear();
        self.num_rounds = 0;
        self.set_cancel(false);
    }

    fn is_exists(level: usize) -> bool {
        level % 2 == 0
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(QsolveError::Canceled);
        }
        Ok(())
    }

    fn decline_proofs(&self) -> Result<()> {
        if self.config.produce_proofs {
            return Err(QsolveError::Unsupported(
                "proof production is not supported".to_string(),
            ));
        }
        Ok(())
    }

    /// Lay the prenex blocks out as alternating variable blocks: free
    /// constants at block 0 (existential), empty blocks inserted where the
    /// leading polarity does not match the slot parity. In decision mode a
    /// leading existential block merges with the free variables.
    fn hoist(&mut self, tm: &mut TermManager, fml: TermId) -> Result<TermId> {
        let free = traversal::collect_free_consts(tm, fml);
        self.vars.push(free);
        let pf = prenex(tm, fml)?;
        let mut blocks = pf.blocks.into_iter().peekable();
        if !self.qelim && blocks.peek().is_some_and(|b| !b.is_forall) {
            let b = blocks.next().expect("peeked");
            self.vars[0].extend(b.vars);
        }
        for b in blocks {
            loop {
                let slot_is_forall = self.vars.len() % 2 == 1;
                if slot_is_forall == b.is_forall {
                    self.vars.push(b.vars);
                    break;
                }
                self.vars.push(Vec::new());
            }
        }
        tracing::debug!(
            blocks = self.vars.len(),
            "hoisted prefix into alternation blocks"
        );
        self.initialize_levels();
        Ok(pf.matrix)
    }

    fn initialize_levels(&mut self) {
        for (i, block) in self.vars.iter().enumerate() {
            let idx = u32::try_from(i).expect("level overflow");
            let lvl = if Self::is_exists(i) {
                MaxLevel::exists(idx)
            } else {
                MaxLevel::forall(idx)
            };
            for &v in block {
                self.pred_abs.set_expr_level(v, lvl);
            }
        }
    }

    /// Abstract the matrix and seed both kernels: definitions to both, the
    /// skeleton positively to the existential kernel, negatively to the
    /// universal one.
    fn assert_game(&mut self, tm: &mut TermManager, matrix: TermId) {
        let mut lvl = MaxLevel::unset();
        let mut defs = Vec::new();
        self.pred_abs.abstract_atoms(tm, matrix, &mut lvl, &mut defs);
        let abs = self.pred_abs.mk_abstract(tm, matrix);
        let defs_conj = tm.mk_and(defs);
        self.ex.assert_expr(tm, defs_conj);
        self.fa.assert_expr(tm, defs_conj);
        self.ex.assert_expr(tm, abs);
        let nabs = tm.mk_not(abs);
        self.fa.assert_expr(tm, nabs);
    }

    /// Play the alternating game to completion. `Ok(true)` means the input
    /// of the decision variant is satisfiable.
    fn check_sat(&mut self, tm: &mut TermManager) -> Result<bool> {
        loop {
            self.check_cancel()?;
            self.num_rounds += 1;
            if self.config.max_rounds > 0 && self.num_rounds > self.config.max_rounds {
                return Err(QsolveError::Unknown("round limit reached".to_string()));
            }
            let mut asms: Vec<TermId> = self.asms.clone();
            self.pred_abs
                .get_assumptions(tm, self.model.as_ref(), &mut asms);
            let use_ex = Self::is_exists(self.level);
            let res = if use_ex {
                self.ex.check(tm, &asms)
            } else {
                self.fa.check(tm, &asms)
            };
            tracing::debug!(level = self.level, ?res, "kernel answered");
            match res {
                KernelResult::Sat => {
                    let mdl = if use_ex {
                        self.ex.get_model().clone()
                    } else {
                        self.fa.get_model().clone()
                    };
                    self.model = Some(mdl);
                    self.push();
                }
                KernelResult::Unsat => match self.level {
                    0 => return Ok(false),
                    1 => {
                        if !self.qelim {
                            return Ok(true);
                        }
                        if self.model.is_some() {
                            self.project_qe(tm)?;
                        } else {
                            self.pop(1);
                        }
                    }
                    _ => {
                        if self.model.is_some() {
                            self.project(tm)?;
                        } else {
                            self.pop(1);
                        }
                    }
                },
                KernelResult::Unknown => {
                    let mut s = self.ex.last_failure().to_string();
                    if s == "ok" {
                        s = self.fa.last_failure().to_string();
                    }
                    return Err(QsolveError::Unknown(s));
                }
            }
        }
    }

    fn push(&mut self) {
        self.level += 1;
        self.pred_abs.push();
    }

    fn pop(&mut self, n: usize) {
        debug_assert!(n <= self.level);
        self.model = None;
        self.pred_abs.pop(n);
        self.level -= n;
    }

    /// Concretized unsat core of the kernel playing at `level`.
    fn get_core(&mut self, tm: &mut TermManager, level: usize) -> Vec<TermId> {
        let mut core = if Self::is_exists(level) {
            self.ex.unsat_core().to_vec()
        } else {
            self.fa.unsat_core().to_vec()
        };
        self.pred_abs.pred_to_lit(tm, &mut core);
        core
    }

    fn get_vars(&mut self, level: usize) {
        self.avars.clear();
        for block in self.vars.iter().skip(level) {
            self.avars.extend(block.iter().copied());
        }
    }

    /// Register a permanently-true assumption: a fresh proxy equated with
    /// the formula, asserted to the existential kernel (the level-0 player).
    fn add_assumption(&mut self, tm: &mut TermManager, fml: TermId) {
        let b = self.pred_abs.fresh_bool(tm, "b");
        self.asms.push(b);
        let eq = tm.mk_eq(b, fml);
        self.ex.assert_expr(tm, eq);
        self.pred_abs.add_pred(b, fml);
        self.pred_abs.set_expr_level(b, MaxLevel::unset());
    }

    /// Level-1 projection in elimination mode: the projected negated core
    /// becomes part of the answer and a permanent assumption.
    fn project_qe(&mut self, tm: &mut TermManager) -> Result<()> {
        debug_assert_eq!(self.level, 1);
        let mut core = self.get_core(tm, self.level);
        self.get_vars(self.level);
        let model = self.model.clone().expect("model present");
        self.mbp
            .apply(tm, self.force_elim, &self.avars, &model, &mut core)?;
        let conj = tm.mk_and(core);
        let fml = push_not(tm, conj);
        tracing::debug!(?fml, "learned answer clause");
        self.add_assumption(tm, fml);
        self.answer.push(fml);
        self.free_vars.extend(self.avars.iter().copied());
        self.pop(1);
        Ok(())
    }

    /// Projection at level >= 2: learn the negated projected core, assert
    /// its definitions to both kernels, and backjump as far as the lemma's
    /// level allows.
    fn project(&mut self, tm: &mut TermManager) -> Result<()> {
        debug_assert!(self.level >= 2);
        let mut core = self.get_core(tm, self.level);
        let model = self.model.clone().expect("model present");
        self.get_vars(self.level - 1);
        self.mbp
            .apply(tm, self.force_elim, &self.avars, &model, &mut core)?;
        self.free_vars.extend(self.avars.iter().copied());
        let conj = tm.mk_and(core);
        let fml = push_not(tm, conj);

        let mut level = MaxLevel::unset();
        let mut defs = Vec::new();
        self.pred_abs.abstract_atoms(tm, fml, &mut level, &mut defs);
        let defs_conj = tm.mk_and(defs);
        self.ex.assert_expr(tm, defs_conj);
        self.fa.assert_expr(tm, defs_conj);

        let num_scopes = match level.max() {
            None => 2 * (self.level / 2),
            Some(_) if self.qelim && !self.force_elim => 2,
            Some(m) => {
                let m = m as usize;
                debug_assert!(m + 2 <= self.level);
                self.level - m
            }
        };
        tracing::debug!(backjump = num_scopes, ?fml, "projected lemma");
        self.pop(num_scopes);
        if self.level == 0 && self.qelim {
            self.add_assumption(tm, fml);
        } else {
            let abs = self.pred_abs.mk_abstract(tm, fml);
            if Self::is_exists(self.level) {
                self.ex.assert_expr(tm, abs);
            } else {
                self.fa.assert_expr(tm, abs);
            }
        }
        Ok(())
    }

    /// Single-alternation elimination of `exists vars. fml`, reusing the
    /// game with exactly two blocks.
    fn elim(&mut self, tm: &mut TermManager, vars: &[TermId], fml: TermId) -> Result<TermId> {
        self.reset_session();
        self.vars.push(Vec::new());
        self.vars.push(vars.to_vec());
        self.initialize_levels();
        let neg = push_not(tm, fml);
        self.assert_game(tm, neg);
        if self.check_sat(tm)? {
            // Unreachable for the elimination game; echo the input.
            return Ok(fml);
        }
        let mut ans = tm.mk_and(self.answer.clone());
        let mut residual: Vec<TermId> = Vec::new();
        for &v in &self.free_vars {
            if !residual.contains(&v) && traversal::occurs(tm, ans, v) {
                residual.push(v);
            }
        }
        ans = tm.mk_exists_consts(&residual, ans);
        Ok(ans)
    }

    /// Recursive elimination: rebuild the input bottom-up, replacing every
    /// quantifier node by the elimination of its block over the already
    /// rewritten body. Universal blocks go through double negation.
    fn elim_rec(&mut self, tm: &mut TermManager, fml: TermId) -> Result<TermId> {
        let mut visited: FxHashMap<TermId, TermId> = FxHashMap::default();
        let mut used: FxHashSet<TermId> =
            traversal::collect_free_consts(tm, fml).into_iter().collect();
        let mut todo: Vec<TermId> = vec![fml];
        while let Some(&e) = todo.last() {
            self.check_cancel()?;
            if visited.contains_key(&e) {
                todo.pop();
                continue;
            }
            let quantifier = match tm.kind(e) {
                TermKind::Quantifier { is_forall, .. } => Some(*is_forall),
                _ => None,
            };
            if let Some(is_forall) = quantifier {
                let (qvars, body) = extract_bound_vars(tm, e, &mut used);
                let mut t = self.elim_rec(tm, body)?;
                if is_forall {
                    t = push_not(tm, t);
                }
                t = self.elim(tm, &qvars, t)?;
                if is_forall {
                    t = push_not(tm, t);
                }
                visited.insert(e, t);
                todo.pop();
                continue;
            }
            let kids = tm.children(e);
            let mut new_kids = Vec::with_capacity(kids.len());
            let mut all_done = true;
            let mut changed = false;
            for &c in &kids {
                match visited.get(&c) {
                    Some(&r) => {
                        new_kids.push(r);
                        changed |= r != c;
                    }
                    None => {
                        todo.push(c);
                        all_done = false;
                    }
                }
            }
            if all_done {
                let r = if changed {
                    tm.rebuild(e, &new_kids)
                } else {
                    e
                };
                visited.insert(e, r);
                todo.pop();
            }
        }
        Ok(visited[&fml])
    }
}
