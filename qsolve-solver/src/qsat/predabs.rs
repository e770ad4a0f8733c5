//! Predicate abstraction.
//!
//! Maintains the bidirectional map between theory atoms and fresh boolean
//! proxies, annotated with quantifier levels, so both kernels reason over a
//! shared propositional skeleton. Proxies survive push/pop; only the chosen
//! assumption literals are scoped. Every invented symbol is recorded in a
//! filter so user-visible models can be stripped of them.

use crate::qsat::level::MaxLevel;
use qsolve_core::ast::{TermId, TermKind, TermManager};
use qsolve_core::model::Model;
use qsolve_core::statistics::Statistics;
use rustc_hash::{FxHashMap, FxHashSet};

/// Strips invented proxy symbols from models before they reach the caller.
#[derive(Debug, Clone, Default)]
pub struct FilterModelConverter {
    hidden: FxHashSet<TermId>,
}

impl FilterModelConverter {
    /// Record an invented symbol.
    pub fn insert(&mut self, sym: TermId) {
        self.hidden.insert(sym);
    }

    /// Whether the symbol was invented by the engine.
    #[must_use]
    pub fn is_hidden(&self, sym: TermId) -> bool {
        self.hidden.contains(&sym)
    }

    /// Remove every invented symbol from the model.
    pub fn apply(&self, model: &mut Model) {
        let keys: Vec<TermId> = model.keys().collect();
        for k in keys {
            if self.hidden.contains(&k) {
                model.remove(k);
            }
        }
    }
}

/// Which proxy map to concretize through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcreteMap {
    /// Proxy to its defining atom.
    PredToLit,
    /// Proxy to the assumption formula it stands for.
    PredToAsm,
}

/// Predicate abstraction state shared by both kernels.
#[derive(Debug, Default)]
pub struct PredAbs {
    pred2lit: FxHashMap<TermId, TermId>,
    lit2pred: FxHashMap<TermId, TermId>,
    asm2pred: FxHashMap<TermId, TermId>,
    pred2asm: FxHashMap<TermId, TermId>,
    elevel: FxHashMap<TermId, MaxLevel>,
    flevel: FxHashMap<String, MaxLevel>,
    /// `preds[k]` holds the proxies that must be flipped when playing
    /// against level `k`.
    preds: Vec<Vec<TermId>>,
    asms: Vec<TermId>,
    asms_lim: Vec<usize>,
    fmc: FilterModelConverter,
}

impl PredAbs {
    /// Empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The invented-symbol filter.
    #[must_use]
    pub fn fmc(&self) -> &FilterModelConverter {
        &self.fmc
    }

    /// Drop every map and the assumption stack. Function-symbol levels are
    /// caller-owned seeds and survive, as does the symbol filter.
    pub fn reset(&mut self) {
        self.pred2lit.clear();
        self.lit2pred.clear();
        self.asm2pred.clear();
        self.pred2asm.clear();
        self.elevel.clear();
        self.preds.clear();
        self.asms.clear();
        self.asms_lim.clear();
    }

    /// Number of registered proxies.
    #[must_use]
    pub fn num_predicates(&self) -> usize {
        self.pred2lit.len()
    }

    /// The scoped assumption stack.
    #[must_use]
    pub fn asms(&self) -> &[TermId] {
        &self.asms
    }

    /// Level annotation of an expression, unset when never computed.
    #[must_use]
    pub fn expr_level(&self, e: TermId) -> MaxLevel {
        self.elevel.get(&e).copied().unwrap_or_default()
    }

    /// Stamp an expression (typically a block variable) with its level.
    pub fn set_expr_level(&mut self, v: TermId, lvl: MaxLevel) {
        self.elevel.insert(v, lvl);
    }

    /// Seed the level of a function symbol.
    pub fn set_decl_level(&mut self, fun: &str, lvl: MaxLevel) {
        self.flevel.insert(fun.to_string(), lvl);
    }

    /// Defining atom of a proxy.
    #[must_use]
    pub fn definition(&self, p: TermId) -> Option<TermId> {
        self.pred2lit.get(&p).copied()
    }

    /// Proxy of an atom.
    #[must_use]
    pub fn proxy(&self, atom: TermId) -> Option<TermId> {
        self.lit2pred.get(&atom).copied()
    }

    /// Register a proxy for an atom (both directions).
    pub fn add_pred(&mut self, p: TermId, lit: TermId) {
        self.pred2lit.insert(p, lit);
        self.lit2pred.entry(lit).or_insert(p);
    }

    /// Register an assumption proxy (both directions).
    pub fn add_asm(&mut self, p: TermId, assum: TermId) {
        debug_assert!(!self.asm2pred.contains_key(&assum), "assumption registered twice");
        self.asm2pred.insert(assum, p);
        self.pred2asm.insert(p, assum);
    }

    /// Open an assumption scope.
    pub fn push(&mut self) {
        self.asms_lim.push(self.asms.len());
    }

    /// Close `n` assumption scopes, reverting the chosen literals. The proxy
    /// rows are untouched; learned structure persists.
    pub fn pop(&mut self, n: usize) {
        debug_assert!(n <= self.asms_lim.len());
        let l = self.asms_lim.len() - n;
        self.asms.truncate(self.asms_lim[l]);
        self.asms_lim.truncate(l);
    }

    /// File a proxy under the row of its level (unset levels go to row 0).
    pub fn insert(&mut self, p: TermId, lvl: MaxLevel) {
        let row = lvl.max().unwrap_or(0) as usize;
        while self.preds.len() <= row {
            self.preds.push(Vec::new());
        }
        self.preds[row].push(p);
    }

    /// Whether the atom's head symbol is already valid strictly below `l`,
    /// making a row entry unnecessary.
    #[must_use]
    pub fn is_predicate(&self, tm: &TermManager, a: TermId, l: Option<u32>) -> bool {
        let Some(name) = tm.head_symbol(a) else {
            return false;
        };
        let Some(fl) = self.flevel.get(name) else {
            return false;
        };
        let flm = fl.max().map_or(u64::from(u32::MAX), u64::from);
        let lm = l.map_or(u64::from(u32::MAX), u64::from);
        flm < lm
    }

    /// Mint a fresh boolean constant and record it in the model filter.
    pub fn fresh_bool(&mut self, tm: &mut TermManager, prefix: &str) -> TermId {
        let r = tm.mk_fresh_const(prefix, tm.sorts.bool_sort);
        self.fmc.insert(r);
        r
    }

    /// Level of an expression, computed bottom-up over the DAG and memoized
    /// for every visited subterm.
    pub fn compute_level(&mut self, tm: &TermManager, e: TermId) -> MaxLevel {
        let mut todo = vec![e];
        while let Some(&a) = todo.last() {
            if self.elevel.contains_key(&a) {
                todo.pop();
                continue;
            }
            let mut lvl = MaxLevel::unset();
            if let Some(name) = tm.head_symbol(a) {
                if let Some(&fl) = self.flevel.get(name) {
                    lvl.merge(fl);
                }
            }
            let mut has_new = false;
            for c in tm.children(a) {
                match self.elevel.get(&c) {
                    Some(&l) => lvl.merge(l),
                    None => {
                        todo.push(c);
                        has_new = true;
                    }
                }
            }
            if !has_new {
                self.elevel.insert(a, lvl);
                todo.pop();
            }
        }
        self.elevel[&e]
    }

    /// Replace every maximal theory atom of the quantifier-free `fml` with a
    /// proxy, emitting a defining equivalence per new proxy into `defs` and
    /// merging the joint level into `level`. Boolean uninterpreted constants
    /// become their own proxies.
    pub fn abstract_atoms(
        &mut self,
        tm: &mut TermManager,
        fml: TermId,
        level: &mut MaxLevel,
        defs: &mut Vec<TermId>,
    ) {
        let mut mark = FxHashSet::default();
        let mut todo = vec![fml];
        while let Some(a) = todo.pop() {
            if !mark.insert(a) {
                continue;
            }
            if let Some(&p) = self.lit2pred.get(&a) {
                level.merge(self.expr_level(p));
                continue;
            }
            if tm.is_uninterp_const(a) && tm.is_bool(a) {
                let l = self.expr_level(a);
                level.merge(l);
                if !self.pred2lit.contains_key(&a) {
                    self.add_pred(a, a);
                    self.insert(a, l);
                }
                continue;
            }
            for c in tm.children(a) {
                if !mark.contains(&c) {
                    todo.push(c);
                }
            }
            if !is_boolop(tm, a) && tm.is_bool(a) {
                let r = self.fresh_bool(tm, "p");
                let l = self.compute_level(tm, a);
                self.add_pred(r, a);
                self.elevel.insert(r, l);
                let eq = tm.mk_eq(r, a);
                defs.push(eq);
                if !self.is_predicate(tm, a, l.max()) {
                    self.insert(r, l);
                }
                level.merge(l);
            }
        }
    }

    /// Structural rewrite replacing every mapped atom by its proxy. Shares
    /// unchanged subterms.
    pub fn mk_abstract(&self, tm: &mut TermManager, fml: TermId) -> TermId {
        let mut fmls = vec![fml];
        rewrite_with(tm, &mut fmls, &self.lit2pred);
        fmls[0]
    }

    /// Inverse rewrite under the selected proxy map.
    pub fn mk_concrete(&self, tm: &mut TermManager, fmls: &mut [TermId], which: ConcreteMap) {
        let map = match which {
            ConcreteMap::PredToLit => &self.pred2lit,
            ConcreteMap::PredToAsm => &self.pred2asm,
        };
        rewrite_with(tm, fmls, map);
    }

    /// Concretize a core through `pred2lit`.
    pub fn pred_to_lit(&self, tm: &mut TermManager, fmls: &mut [TermId]) {
        self.mk_concrete(tm, fmls, ConcreteMap::PredToLit);
    }

    /// Concretize a single formula through `pred2asm` and conjoin.
    pub fn pred_to_asm(&self, tm: &mut TermManager, fml: TermId) -> TermId {
        let mut fmls = vec![fml];
        self.mk_concrete(tm, &mut fmls, ConcreteMap::PredToAsm);
        fmls[0]
    }

    /// Wrap an arbitrary formula as a single proxy literal usable as a
    /// kernel assumption at level `lvl`. Reuses an existing (possibly
    /// negated) mapping; otherwise mints a proxy, registers a default
    /// valuation in the current model, abstracts the formula's atoms and
    /// emits the defining equivalence into `defs`.
    pub fn mk_assumption_literal(
        &mut self,
        tm: &mut TermManager,
        a: TermId,
        mdl: Option<&mut Model>,
        lvl: MaxLevel,
        defs: &mut Vec<TermId>,
    ) -> TermId {
        let a = self.pred_to_asm(tm, a);
        let neg_inner = match tm.kind(a) {
            TermKind::Not(c) => Some(*c),
            _ => None,
        };
        if let Some(&b) = self.asm2pred.get(&a) {
            return b;
        }
        if let Some(c) = neg_inner {
            if let Some(&b) = self.asm2pred.get(&c) {
                return tm.mk_not(b);
            }
        }
        if self.pred2asm.contains_key(&a) {
            return a;
        }
        if let Some(c) = neg_inner {
            if self.pred2asm.contains_key(&c) {
                return a;
            }
        }
        let p = self.fresh_bool(tm, "def");
        let (stripped, negated) = match neg_inner {
            Some(c) => (c, true),
            None => (a, false),
        };
        let q = if negated {
            if let Some(m) = mdl {
                let f = tm.mk_false();
                m.set(p, f);
            }
            tm.mk_not(p)
        } else {
            if let Some(m) = mdl {
                let t = tm.mk_true();
                m.set(p, t);
            }
            p
        };
        self.elevel.insert(p, lvl);
        self.insert(p, lvl);
        let mut lvl2 = MaxLevel::unset();
        self.abstract_atoms(tm, stripped, &mut lvl2, defs);
        let abstracted = self.mk_abstract(tm, stripped);
        let eq = tm.mk_eq(p, abstracted);
        defs.push(eq);
        self.add_asm(p, stripped);
        q
    }

    /// Build the assumption vector for the next kernel call.
    ///
    /// With a model, the top row `preds[L-1]` is materialized at the model's
    /// valuation onto the scoped stack, and proxies from deeper rows of the
    /// matching parity travel along when their level straddles the current
    /// scope: a proxy at `(fa, ex)` is included for row `i` exactly when
    /// `(fa = i and (ex unset or ex < L)) or (ex = i and (fa unset or fa < L))`.
    /// Without a model, the accumulated stack is returned verbatim.
    pub fn get_assumptions(
        &mut self,
        tm: &mut TermManager,
        mdl: Option<&Model>,
        asms: &mut Vec<TermId>,
    ) {
        let level = self.asms_lim.len().min(self.preds.len());
        if level == 0 {
            return;
        }
        let Some(mdl) = mdl else {
            asms.extend(self.asms.iter().copied());
            return;
        };
        for j in 0..self.preds[level - 1].len() {
            let p = self.preds[level - 1][j];
            let val = mdl.eval_bool(tm, p).unwrap_or(false);
            let lit = if val { p } else { tm.mk_not(p) };
            self.asms.push(lit);
        }
        asms.extend(self.asms.iter().copied());

        let mut i = level + 1;
        while i < self.preds.len() {
            for j in 0..self.preds[i].len() {
                let p = self.preds[i][j];
                let lvl = self.expr_level(p);
                let row = u32::try_from(i).expect("level overflow");
                let fits = |side: Option<u32>| side.map_or(true, |s| (s as usize) < level);
                let usable = (lvl.fa == Some(row) && fits(lvl.ex))
                    || (lvl.ex == Some(row) && fits(lvl.fa));
                if usable {
                    let val = mdl.eval_bool(tm, p).unwrap_or(false);
                    asms.push(if val { p } else { tm.mk_not(p) });
                }
            }
            i += 2;
        }
    }

    /// Merge abstraction counters into `out`.
    pub fn collect_statistics(&self, out: &mut Statistics) {
        out.update("qsat.num_predicates", self.pred2lit.len() as u64);
    }
}

/// Boolean connectives stay structural during abstraction; equality and
/// distinct count as connectives only over boolean arguments.
fn is_boolop(tm: &TermManager, t: TermId) -> bool {
    match tm.kind(t) {
        TermKind::True
        | TermKind::False
        | TermKind::Not(_)
        | TermKind::And(_)
        | TermKind::Or(_)
        | TermKind::Implies(..) => true,
        TermKind::Ite(..) => tm.is_bool(t),
        TermKind::Eq(a, _) => tm.is_bool(*a),
        TermKind::Distinct(args) => args.first().is_some_and(|&a| tm.is_bool(a)),
        _ => false,
    }
}

/// Cache-driven structural rewrite of quantifier-free formulas under a map.
fn rewrite_with(tm: &mut TermManager, fmls: &mut [TermId], map: &FxHashMap<TermId, TermId>) {
    let mut cache: FxHashMap<TermId, TermId> = FxHashMap::default();
    let mut todo: Vec<TermId> = fmls.to_vec();
    while let Some(&t) = todo.last() {
        if cache.contains_key(&t) {
            todo.pop();
            continue;
        }
        if let Some(&p) = map.get(&t) {
            cache.insert(t, p);
            todo.pop();
            continue;
        }
        let kids = tm.children(t);
        let mut new_kids = Vec::with_capacity(kids.len());
        let mut all_done = true;
        let mut changed = false;
        for &c in &kids {
            match map.get(&c).or_else(|| cache.get(&c)) {
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
            let r = if changed { tm.rebuild(t, &new_kids) } else { t };
            cache.insert(t, r);
            todo.pop();
        }
    }
    for f in fmls.iter_mut() {
        *f = cache[f];
    }
}
