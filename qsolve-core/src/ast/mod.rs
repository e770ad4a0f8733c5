//! Hash-consed term DAG.
//!
//! Terms are interned by a [`TermManager`]; equal terms always share the same
//! [`TermId`], so equality on identifiers is structural equality and DAG
//! traversals can use identifier-keyed caches. Constructors perform light
//! normalization (flattening of `and`/`or`, double-negation collapse,
//! folding of constant operands) but no deep simplification.

pub mod traversal;

use crate::sort::{SortId, SortStore};
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Interned term identifier. Copyable, cheap, and structurally unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

impl TermId {
    /// Raw index into the term table.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Argument vector; most applications are small.
pub type Args = SmallVec<[TermId; 4]>;

/// The shape of a term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// Boolean constant `true`.
    True,
    /// Boolean constant `false`.
    False,
    /// Uninterpreted constant (a free or skolemized variable).
    Var {
        /// Display name; unique names are produced by fresh-constant minting.
        name: String,
        /// Sort of the constant.
        sort: SortId,
    },
    /// Negation.
    Not(TermId),
    /// N-ary conjunction.
    And(Args),
    /// N-ary disjunction.
    Or(Args),
    /// Implication.
    Implies(TermId, TermId),
    /// If-then-else.
    Ite(TermId, TermId, TermId),
    /// Equality (boolean equality doubles as iff).
    Eq(TermId, TermId),
    /// Pairwise disequality.
    Distinct(Args),
    /// Integer literal.
    IntConst(BigInt),
    /// N-ary integer addition.
    Add(Args),
    /// N-ary integer multiplication.
    Mul(Args),
    /// Integer negation.
    Neg(TermId),
    /// Integer subtraction.
    Sub(TermId, TermId),
    /// Less-or-equal over integers.
    Le(TermId, TermId),
    /// Strictly-less over integers.
    Lt(TermId, TermId),
    /// Greater-or-equal over integers.
    Ge(TermId, TermId),
    /// Strictly-greater over integers.
    Gt(TermId, TermId),
    /// Divisibility atom: `modulus` divides `arg`.
    Divides {
        /// The (positive) modulus.
        modulus: BigInt,
        /// The divided term.
        arg: TermId,
    },
    /// Bit-vector literal, value masked to `width` bits.
    BvConst {
        /// Literal value.
        value: u64,
        /// Width in bits (1..=64).
        width: u32,
    },
    /// Two's-complement negation.
    BvNeg(TermId),
    /// N-ary wrapping addition.
    BvAdd(Args),
    /// Wrapping subtraction.
    BvSub(TermId, TermId),
    /// Unsigned less-or-equal.
    BvUle(TermId, TermId),
    /// Unsigned strictly-less.
    BvUlt(TermId, TermId),
    /// Uninterpreted function application.
    App {
        /// Function symbol name.
        fun: String,
        /// Arguments.
        args: Args,
    },
    /// Quantifier; `vars` are `Var` terms bound by name in `body`.
    Quantifier {
        /// Universal if true, existential otherwise.
        is_forall: bool,
        /// Bound constants.
        vars: Args,
        /// Body formula.
        body: TermId,
    },
}

/// An interned term: its kind plus its sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    /// Structure of the term.
    pub kind: TermKind,
    /// Sort of the term.
    pub sort: SortId,
}

/// Owner of the term DAG. All construction and inspection goes through it.
#[derive(Debug)]
pub struct TermManager {
    terms: Vec<Term>,
    interned: FxHashMap<Term, TermId>,
    fresh_counter: u64,
    /// Sort table.
    pub sorts: SortStore,
}

impl Default for TermManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TermManager {
    /// Create an empty manager with the builtin sorts interned.
    #[must_use]
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
            interned: FxHashMap::default(),
            fresh_counter: 0,
            sorts: SortStore::new(),
        }
    }

    fn intern(&mut self, kind: TermKind, sort: SortId) -> TermId {
        let term = Term { kind, sort };
        if let Some(&id) = self.interned.get(&term) {
            return id;
        }
        let id = TermId(u32::try_from(self.terms.len()).expect("term table overflow"));
        self.terms.push(term.clone());
        self.interned.insert(term, id);
        id
    }

    /// Number of interned terms.
    #[must_use]
    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Look up a term; `None` only for identifiers from another manager.
    #[must_use]
    pub fn get(&self, t: TermId) -> Option<&Term> {
        self.terms.get(t.index())
    }

    /// Look up a term, panicking on a foreign identifier.
    #[must_use]
    pub fn term(&self, t: TermId) -> &Term {
        &self.terms[t.index()]
    }

    /// Kind of a term.
    #[must_use]
    pub fn kind(&self, t: TermId) -> &TermKind {
        &self.term(t).kind
    }

    /// Sort of a term.
    #[must_use]
    pub fn sort_of(&self, t: TermId) -> SortId {
        self.term(t).sort
    }

    /// Whether the term has boolean sort.
    #[must_use]
    pub fn is_bool(&self, t: TermId) -> bool {
        self.sort_of(t) == self.sorts.bool_sort
    }

    /// Whether the term is an uninterpreted constant.
    #[must_use]
    pub fn is_uninterp_const(&self, t: TermId) -> bool {
        matches!(self.kind(t), TermKind::Var { .. })
    }

    /// Name of an uninterpreted constant or application head.
    #[must_use]
    pub fn head_symbol(&self, t: TermId) -> Option<&str> {
        match self.kind(t) {
            TermKind::App { fun, .. } => Some(fun),
            _ => None,
        }
    }

    // ----- leaf constructors -------------------------------------------------

    /// The `true` literal.
    pub fn mk_true(&mut self) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern(TermKind::True, s)
    }

    /// The `false` literal.
    pub fn mk_false(&mut self) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern(TermKind::False, s)
    }

    /// A boolean literal.
    pub fn mk_bool(&mut self, b: bool) -> TermId {
        if b {
            self.mk_true()
        } else {
            self.mk_false()
        }
    }

    /// An uninterpreted constant. Same name and sort yield the same term.
    pub fn mk_var(&mut self, name: &str, sort: SortId) -> TermId {
        self.intern(
            TermKind::Var {
                name: name.to_string(),
                sort,
            },
            sort,
        )
    }

    /// A fresh uninterpreted constant whose name cannot collide with user
    /// names (`prefix!N` convention).
    pub fn mk_fresh_const(&mut self, prefix: &str, sort: SortId) -> TermId {
        let n = self.fresh_counter;
        self.fresh_counter += 1;
        let name = format!("{prefix}!{n}");
        self.mk_var(&name, sort)
    }

    /// An integer literal.
    pub fn mk_int(&mut self, n: impl Into<BigInt>) -> TermId {
        let s = self.sorts.int_sort;
        self.intern(TermKind::IntConst(n.into()), s)
    }

    /// A bit-vector literal; the value is masked to `width` bits.
    pub fn mk_bv(&mut self, value: u64, width: u32) -> TermId {
        let masked = value & mask_of(width);
        let s = self.sorts.mk_bitvec(width);
        self.intern(
            TermKind::BvConst {
                value: masked,
                width,
            },
            s,
        )
    }

    // ----- boolean structure -------------------------------------------------

    /// Negation with double-negation collapse and constant folding.
    pub fn mk_not(&mut self, t: TermId) -> TermId {
        match self.kind(t) {
            TermKind::True => self.mk_false(),
            TermKind::False => self.mk_true(),
            TermKind::Not(inner) => *inner,
            _ => {
                let s = self.sorts.bool_sort;
                self.intern(TermKind::Not(t), s)
            }
        }
    }

    /// Conjunction. Flattens nested conjunctions, drops `true`, short-circuits
    /// on `false`, removes duplicates.
    pub fn mk_and(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let mut out: Args = SmallVec::new();
        for a in args {
            match self.kind(a) {
                TermKind::True => {}
                TermKind::False => return self.mk_false(),
                TermKind::And(inner) => {
                    for &i in inner.clone().iter() {
                        if !out.contains(&i) {
                            out.push(i);
                        }
                    }
                }
                _ => {
                    if !out.contains(&a) {
                        out.push(a);
                    }
                }
            }
        }
        match out.len() {
            0 => self.mk_true(),
            1 => out[0],
            _ => {
                let s = self.sorts.bool_sort;
                self.intern(TermKind::And(out), s)
            }
        }
    }

    /// Disjunction, dual to [`TermManager::mk_and`].
    pub fn mk_or(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let mut out: Args = SmallVec::new();
        for a in args {
            match self.kind(a) {
                TermKind::False => {}
                TermKind::True => return self.mk_true(),
                TermKind::Or(inner) => {
                    for &i in inner.clone().iter() {
                        if !out.contains(&i) {
                            out.push(i);
                        }
                    }
                }
                _ => {
                    if !out.contains(&a) {
                        out.push(a);
                    }
                }
            }
        }
        match out.len() {
            0 => self.mk_false(),
            1 => out[0],
            _ => {
                let s = self.sorts.bool_sort;
                self.intern(TermKind::Or(out), s)
            }
        }
    }

    /// Implication with constant folding on the antecedent.
    pub fn mk_implies(&mut self, a: TermId, b: TermId) -> TermId {
        match self.kind(a) {
            TermKind::True => return b,
            TermKind::False => return self.mk_true(),
            _ => {}
        }
        if matches!(self.kind(b), TermKind::True) {
            return self.mk_true();
        }
        let s = self.sorts.bool_sort;
        self.intern(TermKind::Implies(a, b), s)
    }

    /// If-then-else; the branches must share a sort.
    pub fn mk_ite(&mut self, c: TermId, t: TermId, e: TermId) -> TermId {
        debug_assert_eq!(self.sort_of(t), self.sort_of(e));
        match self.kind(c) {
            TermKind::True => return t,
            TermKind::False => return e,
            _ => {}
        }
        if t == e {
            return t;
        }
        let s = self.sort_of(t);
        self.intern(TermKind::Ite(c, t, e), s)
    }

    /// Equality, argument-order normalized. Boolean equality is iff.
    pub fn mk_eq(&mut self, a: TermId, b: TermId) -> TermId {
        if a == b {
            return self.mk_true();
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        let s = self.sorts.bool_sort;
        self.intern(TermKind::Eq(a, b), s)
    }

    /// Pairwise disequality.
    pub fn mk_distinct(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let mut out: Args = args.into_iter().collect();
        out.sort_unstable();
        match out.len() {
            0 | 1 => self.mk_true(),
            2 => {
                if out[0] == out[1] {
                    self.mk_false()
                } else {
                    let s = self.sorts.bool_sort;
                    self.intern(TermKind::Distinct(out), s)
                }
            }
            _ => {
                let s = self.sorts.bool_sort;
                self.intern(TermKind::Distinct(out), s)
            }
        }
    }

    // ----- integer arithmetic ------------------------------------------------

    /// Integer addition. Flattens and folds constant operands.
    pub fn mk_add(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let mut out: Args = SmallVec::new();
        let mut konst = BigInt::zero();
        for a in args {
            match self.kind(a) {
                TermKind::IntConst(k) => konst += k,
                TermKind::Add(inner) => {
                    for &i in inner.clone().iter() {
                        match self.kind(i) {
                            TermKind::IntConst(k) => konst += k,
                            _ => out.push(i),
                        }
                    }
                }
                _ => out.push(a),
            }
        }
        if !konst.is_zero() || out.is_empty() {
            let k = self.mk_int(konst);
            out.push(k);
        }
        match out.len() {
            1 => out[0],
            _ => {
                let s = self.sorts.int_sort;
                self.intern(TermKind::Add(out), s)
            }
        }
    }

    /// Integer multiplication with constant folding (`0`, `1` absorbed).
    pub fn mk_mul(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let mut out: Args = SmallVec::new();
        let mut konst = BigInt::one();
        for a in args {
            match self.kind(a) {
                TermKind::IntConst(k) => konst *= k,
                _ => out.push(a),
            }
        }
        if konst.is_zero() {
            return self.mk_int(0);
        }
        if out.is_empty() {
            return self.mk_int(konst);
        }
        if !konst.is_one() {
            let k = self.mk_int(konst);
            out.insert(0, k);
        }
        match out.len() {
            1 => out[0],
            _ => {
                let s = self.sorts.int_sort;
                self.intern(TermKind::Mul(out), s)
            }
        }
    }

    /// Integer negation.
    pub fn mk_neg(&mut self, t: TermId) -> TermId {
        match self.kind(t) {
            TermKind::IntConst(k) => {
                let k = -k.clone();
                self.mk_int(k)
            }
            TermKind::Neg(inner) => *inner,
            _ => {
                let s = self.sorts.int_sort;
                self.intern(TermKind::Neg(t), s)
            }
        }
    }

    /// Integer subtraction.
    pub fn mk_sub(&mut self, a: TermId, b: TermId) -> TermId {
        let s = self.sorts.int_sort;
        self.intern(TermKind::Sub(a, b), s)
    }

    /// `a <= b` over integers, folded when both sides are literals.
    pub fn mk_le(&mut self, a: TermId, b: TermId) -> TermId {
        if let Some(ord) = self.const_cmp(a, b) {
            return self.mk_bool(ord != std::cmp::Ordering::Greater);
        }
        let s = self.sorts.bool_sort;
        self.intern(TermKind::Le(a, b), s)
    }

    /// `a < b` over integers.
    pub fn mk_lt(&mut self, a: TermId, b: TermId) -> TermId {
        if let Some(ord) = self.const_cmp(a, b) {
            return self.mk_bool(ord == std::cmp::Ordering::Less);
        }
        let s = self.sorts.bool_sort;
        self.intern(TermKind::Lt(a, b), s)
    }

    /// `a >= b` over integers.
    pub fn mk_ge(&mut self, a: TermId, b: TermId) -> TermId {
        if let Some(ord) = self.const_cmp(a, b) {
            return self.mk_bool(ord != std::cmp::Ordering::Less);
        }
        let s = self.sorts.bool_sort;
        self.intern(TermKind::Ge(a, b), s)
    }

    /// `a > b` over integers.
    pub fn mk_gt(&mut self, a: TermId, b: TermId) -> TermId {
        if let Some(ord) = self.const_cmp(a, b) {
            return self.mk_bool(ord == std::cmp::Ordering::Greater);
        }
        let s = self.sorts.bool_sort;
        self.intern(TermKind::Gt(a, b), s)
    }

    fn const_cmp(&self, a: TermId, b: TermId) -> Option<std::cmp::Ordering> {
        match (self.kind(a), self.kind(b)) {
            (TermKind::IntConst(x), TermKind::IntConst(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }

    /// Divisibility atom `modulus | arg`. Modulus 1 folds to `true`; constant
    /// arguments fold.
    pub fn mk_divides(&mut self, modulus: impl Into<BigInt>, arg: TermId) -> TermId {
        let m: BigInt = modulus.into();
        debug_assert!(m.is_positive(), "divisibility modulus must be positive");
        if m.is_one() {
            return self.mk_true();
        }
        if let TermKind::IntConst(k) = self.kind(arg) {
            let rem = k % &m;
            return self.mk_bool(rem.is_zero());
        }
        let s = self.sorts.bool_sort;
        self.intern(TermKind::Divides { modulus: m, arg }, s)
    }

    // ----- bit-vectors -------------------------------------------------------

    /// Two's-complement negation.
    pub fn mk_bvneg(&mut self, t: TermId) -> TermId {
        let sort = self.sort_of(t);
        if let TermKind::BvConst { value, width } = self.kind(t) {
            let (v, w) = (*value, *width);
            return self.mk_bv(v.wrapping_neg(), w);
        }
        self.intern(TermKind::BvNeg(t), sort)
    }

    /// Wrapping addition; all arguments must share a width.
    pub fn mk_bvadd(&mut self, args: impl IntoIterator<Item = TermId>) -> TermId {
        let out: Args = args.into_iter().collect();
        debug_assert!(!out.is_empty());
        let sort = self.sort_of(out[0]);
        if out.len() == 1 {
            return out[0];
        }
        self.intern(TermKind::BvAdd(out), sort)
    }

    /// Wrapping subtraction.
    pub fn mk_bvsub(&mut self, a: TermId, b: TermId) -> TermId {
        let sort = self.sort_of(a);
        self.intern(TermKind::BvSub(a, b), sort)
    }

    /// Unsigned less-or-equal.
    pub fn mk_bvule(&mut self, a: TermId, b: TermId) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern(TermKind::BvUle(a, b), s)
    }

    /// Unsigned strictly-less.
    pub fn mk_bvult(&mut self, a: TermId, b: TermId) -> TermId {
        let s = self.sorts.bool_sort;
        self.intern(TermKind::BvUlt(a, b), s)
    }

    // ----- applications and quantifiers --------------------------------------

    /// Uninterpreted function application.
    pub fn mk_app(
        &mut self,
        fun: &str,
        args: impl IntoIterator<Item = TermId>,
        sort: SortId,
    ) -> TermId {
        let args: Args = args.into_iter().collect();
        self.intern(
            TermKind::App {
                fun: fun.to_string(),
                args,
            },
            sort,
        )
    }

    /// Quantifier over `Var` terms. Empty blocks collapse; adjacent blocks of
    /// the same polarity merge.
    pub fn mk_quantifier(
        &mut self,
        is_forall: bool,
        vars: impl IntoIterator<Item = TermId>,
        body: TermId,
    ) -> TermId {
        let mut vars: Args = vars.into_iter().collect();
        debug_assert!(vars.iter().all(|&v| self.is_uninterp_const(v)));
        if vars.is_empty() {
            return body;
        }
        let body = match self.kind(body) {
            TermKind::Quantifier {
                is_forall: inner_fa,
                vars: inner_vars,
                body: inner_body,
            } if *inner_fa == is_forall => {
                let (iv, ib) = (inner_vars.clone(), *inner_body);
                for v in iv {
                    if !vars.contains(&v) {
                        vars.push(v);
                    }
                }
                ib
            }
            _ => body,
        };
        let s = self.sorts.bool_sort;
        self.intern(
            TermKind::Quantifier {
                is_forall,
                vars,
                body,
            },
            s,
        )
    }

    /// Universal quantifier from name/sort pairs; occurrences of
    /// `mk_var(name, sort)` in the body become bound.
    pub fn mk_forall<'a>(
        &mut self,
        bounds: impl IntoIterator<Item = (&'a str, SortId)>,
        body: TermId,
    ) -> TermId {
        let vars: Vec<TermId> = bounds
            .into_iter()
            .map(|(n, s)| self.mk_var(n, s))
            .collect();
        self.mk_quantifier(true, vars, body)
    }

    /// Existential quantifier from name/sort pairs.
    pub fn mk_exists<'a>(
        &mut self,
        bounds: impl IntoIterator<Item = (&'a str, SortId)>,
        body: TermId,
    ) -> TermId {
        let vars: Vec<TermId> = bounds
            .into_iter()
            .map(|(n, s)| self.mk_var(n, s))
            .collect();
        self.mk_quantifier(false, vars, body)
    }

    /// Existentially close `body` over the given constants.
    pub fn mk_exists_consts(&mut self, vars: &[TermId], body: TermId) -> TermId {
        self.mk_quantifier(false, vars.to_vec(), body)
    }

    /// Universally close `body` over the given constants.
    pub fn mk_forall_consts(&mut self, vars: &[TermId], body: TermId) -> TermId {
        self.mk_quantifier(true, vars.to_vec(), body)
    }

    // ----- generic structure -------------------------------------------------

    /// Immediate children of a term, in a fixed order. For quantifiers this is
    /// the bound constants followed by the body.
    #[must_use]
    pub fn children(&self, t: TermId) -> Args {
        match self.kind(t) {
            TermKind::True
            | TermKind::False
            | TermKind::Var { .. }
            | TermKind::IntConst(_)
            | TermKind::BvConst { .. } => SmallVec::new(),
            TermKind::Not(a) | TermKind::Neg(a) | TermKind::BvNeg(a) => {
                let mut v = SmallVec::new();
                v.push(*a);
                v
            }
            TermKind::Divides { arg, .. } => {
                let mut v = SmallVec::new();
                v.push(*arg);
                v
            }
            TermKind::And(args)
            | TermKind::Or(args)
            | TermKind::Distinct(args)
            | TermKind::Add(args)
            | TermKind::Mul(args)
            | TermKind::BvAdd(args)
            | TermKind::App { args, .. } => args.clone(),
            TermKind::Implies(a, b)
            | TermKind::Eq(a, b)
            | TermKind::Sub(a, b)
            | TermKind::Le(a, b)
            | TermKind::Lt(a, b)
            | TermKind::Ge(a, b)
            | TermKind::Gt(a, b)
            | TermKind::BvSub(a, b)
            | TermKind::BvUle(a, b)
            | TermKind::BvUlt(a, b) => {
                let mut v = SmallVec::new();
                v.push(*a);
                v.push(*b);
                v
            }
            TermKind::Ite(c, t2, e) => {
                let mut v = SmallVec::new();
                v.push(*c);
                v.push(*t2);
                v.push(*e);
                v
            }
            TermKind::Quantifier { vars, body, .. } => {
                let mut v = vars.clone();
                v.push(*body);
                v
            }
        }
    }

    /// Rebuild a term with replaced children (same order as
    /// [`TermManager::children`]). Quantifiers are not rebuilt here; callers
    /// handle binders explicitly.
    pub fn rebuild(&mut self, t: TermId, new_children: &[TermId]) -> TermId {
        match self.kind(t).clone() {
            TermKind::True
            | TermKind::False
            | TermKind::Var { .. }
            | TermKind::IntConst(_)
            | TermKind::BvConst { .. } => t,
            TermKind::Not(_) => self.mk_not(new_children[0]),
            TermKind::Neg(_) => self.mk_neg(new_children[0]),
            TermKind::BvNeg(_) => self.mk_bvneg(new_children[0]),
            TermKind::Divides { modulus, .. } => self.mk_divides(modulus, new_children[0]),
            TermKind::And(_) => self.mk_and(new_children.iter().copied()),
            TermKind::Or(_) => self.mk_or(new_children.iter().copied()),
            TermKind::Distinct(_) => self.mk_distinct(new_children.iter().copied()),
            TermKind::Add(_) => self.mk_add(new_children.iter().copied()),
            TermKind::Mul(_) => self.mk_mul(new_children.iter().copied()),
            TermKind::BvAdd(_) => self.mk_bvadd(new_children.iter().copied()),
            TermKind::App { fun, .. } => {
                let sort = self.sort_of(t);
                self.mk_app(&fun, new_children.iter().copied(), sort)
            }
            TermKind::Implies(..) => self.mk_implies(new_children[0], new_children[1]),
            TermKind::Eq(..) => self.mk_eq(new_children[0], new_children[1]),
            TermKind::Sub(..) => self.mk_sub(new_children[0], new_children[1]),
            TermKind::Le(..) => self.mk_le(new_children[0], new_children[1]),
            TermKind::Lt(..) => self.mk_lt(new_children[0], new_children[1]),
            TermKind::Ge(..) => self.mk_ge(new_children[0], new_children[1]),
            TermKind::Gt(..) => self.mk_gt(new_children[0], new_children[1]),
            TermKind::BvSub(..) => self.mk_bvsub(new_children[0], new_children[1]),
            TermKind::BvUle(..) => self.mk_bvule(new_children[0], new_children[1]),
            TermKind::BvUlt(..) => self.mk_bvult(new_children[0], new_children[1]),
            TermKind::Ite(..) => self.mk_ite(new_children[0], new_children[1], new_children[2]),
            TermKind::Quantifier { .. } => {
                unreachable!("quantifiers are rebuilt by binder-aware callers")
            }
        }
    }

    /// Replace every occurrence of a map key by its image. Bound occurrences
    /// shadow the map; the rewrite shares unchanged subterms.
    pub fn substitute(&mut self, root: TermId, map: &FxHashMap<TermId, TermId>) -> TermId {
        if map.is_empty() {
            return root;
        }
        let mut cache: FxHashMap<TermId, TermId> = FxHashMap::default();
        let mut todo: Vec<TermId> = vec![root];
        while let Some(&t) = todo.last() {
            if cache.contains_key(&t) {
                todo.pop();
                continue;
            }
            if let Some(&r) = map.get(&t) {
                cache.insert(t, r);
                todo.pop();
                continue;
            }
            if let TermKind::Quantifier {
                is_forall,
                vars,
                body,
            } = self.kind(t)
            {
                let (fa, vs, b) = (*is_forall, vars.clone(), *body);
                let reduced: FxHashMap<TermId, TermId> = map
                    .iter()
                    .filter(|(k, _)| !vs.contains(k))
                    .map(|(&k, &v)| (k, v))
                    .collect();
                let nb = self.substitute(b, &reduced);
                let r = if nb == b {
                    t
                } else {
                    self.mk_quantifier(fa, vs, nb)
                };
                cache.insert(t, r);
                todo.pop();
                continue;
            }
            let kids = self.children(t);
            let mut new_kids: Args = SmallVec::new();
            let mut all_done = true;
            let mut changed = false;
            for &c in &kids {
                if let Some(&r) = cache.get(&c) {
                    new_kids.push(r);
                    changed |= r != c;
                } else if let Some(&r) = map.get(&c) {
                    new_kids.push(r);
                    changed |= r != c;
                } else {
                    todo.push(c);
                    all_done = false;
                }
            }
            if all_done {
                let r = if changed {
                    self.rebuild(t, &new_kids)
                } else {
                    t
                };
                cache.insert(t, r);
                todo.pop();
            }
        }
        cache[&root]
    }
}

/// All-ones mask for a bit-vector width (width 64 saturates).
#[must_use]
pub fn mask_of(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_consing_shares_terms() {
        let mut tm = TermManager::new();
        let x = tm.mk_var("x", tm.sorts.int_sort);
        let y = tm.mk_var("y", tm.sorts.int_sort);
        let a = tm.mk_add(vec![x, y]);
        let b = tm.mk_add(vec![x, y]);
        assert_eq!(a, b);
        assert_eq!(tm.mk_var("x", tm.sorts.int_sort), x);
    }

    #[test]
    fn double_negation_collapses() {
        let mut tm = TermManager::new();
        let p = tm.mk_var("p", tm.sorts.bool_sort);
        let np = tm.mk_not(p);
        assert_eq!(tm.mk_not(np), p);
    }

    #[test]
    fn and_flattens_and_folds() {
        let mut tm = TermManager::new();
        let p = tm.mk_var("p", tm.sorts.bool_sort);
        let q = tm.mk_var("q", tm.sorts.bool_sort);
        let t = tm.mk_true();
        let pq = tm.mk_and(vec![p, q]);
        let all = tm.mk_and(vec![pq, t, p]);
        assert_eq!(all, pq);
        let f = tm.mk_false();
        assert_eq!(tm.mk_and(vec![p, f]), f);
        assert_eq!(tm.mk_and(Vec::new()), tm.mk_true());
    }

    #[test]
    fn substitution_respects_shadowing() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let zero = tm.mk_int(0);
        let one = tm.mk_int(1);
        let ge = tm.mk_ge(x, zero);
        let q = tm.mk_forall([("x", int)], ge);
        let outer = tm.mk_eq(x, one);
        let both = tm.mk_and(vec![q, outer]);
        let mut map = FxHashMap::default();
        map.insert(x, zero);
        let r = tm.substitute(both, &map);
        // The bound occurrence stays, the free one is replaced.
        let expect_outer = tm.mk_eq(zero, one);
        let expect = tm.mk_and(vec![q, expect_outer]);
        assert_eq!(r, expect);
    }

    #[test]
    fn fresh_consts_are_distinct() {
        let mut tm = TermManager::new();
        let a = tm.mk_fresh_const("p", tm.sorts.bool_sort);
        let b = tm.mk_fresh_const("p", tm.sorts.bool_sort);
        assert_ne!(a, b);
    }
}
