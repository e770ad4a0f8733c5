//! Models and model evaluation.
//!
//! A [`Model`] maps constants (and, for uninterpreted functions, whole
//! application terms) to value terms. Evaluation is a worklist pass over the
//! DAG that computes boolean, integer and bit-vector operations on value
//! terms; it returns `None` when an unassigned constant is reached.

use crate::ast::{mask_of, TermId, TermKind, TermManager};
use num_bigint::BigInt;
use num_traits::Zero;
use rustc_hash::FxHashMap;

/// A (partial) first-order model.
#[derive(Debug, Clone, Default)]
pub struct Model {
    values: FxHashMap<TermId, TermId>,
}

impl Model {
    /// Empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a value term to a constant or application.
    pub fn set(&mut self, key: TermId, value: TermId) {
        self.values.insert(key, value);
    }

    /// Direct lookup without evaluation.
    #[must_use]
    pub fn get(&self, key: TermId) -> Option<TermId> {
        self.values.get(&key).copied()
    }

    /// Remove an assignment (used to strip invented symbols).
    pub fn remove(&mut self, key: TermId) {
        self.values.remove(&key);
    }

    /// Number of assignments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the model has no assignments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over assignments.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, TermId)> + '_ {
        self.values.iter().map(|(&k, &v)| (k, v))
    }

    /// Keys currently assigned.
    pub fn keys(&self) -> impl Iterator<Item = TermId> + '_ {
        self.values.keys().copied()
    }

    /// Evaluate `t` to a value term.
    pub fn eval(&self, tm: &mut TermManager, t: TermId) -> Option<TermId> {
        let mut cache: FxHashMap<TermId, Option<TermId>> = FxHashMap::default();
        let mut todo = vec![t];
        while let Some(&cur) = todo.last() {
            if cache.contains_key(&cur) {
                todo.pop();
                continue;
            }
            if let Some(v) = self.get(cur) {
                cache.insert(cur, Some(v));
                todo.pop();
                continue;
            }
            match tm.kind(cur) {
                TermKind::True
                | TermKind::False
                | TermKind::IntConst(_)
                | TermKind::BvConst { .. } => {
                    cache.insert(cur, Some(cur));
                    todo.pop();
                }
                TermKind::Var { .. } | TermKind::App { .. } | TermKind::Quantifier { .. } => {
                    // Unassigned constant, opaque application, or a binder:
                    // nothing to compute.
                    cache.insert(cur, None);
                    todo.pop();
                }
                _ => {
                    let kids = tm.children(cur);
                    let pending: Vec<TermId> = kids
                        .iter()
                        .copied()
                        .filter(|c| !cache.contains_key(c))
                        .collect();
                    if !pending.is_empty() {
                        todo.extend(pending);
                        continue;
                    }
                    let vals: Vec<Option<TermId>> =
                        kids.iter().map(|c| cache[c]).collect();
                    let r = self.combine(tm, cur, &vals);
                    cache.insert(cur, r);
                    todo.pop();
                }
            }
        }
        cache[&t]
    }

    /// Evaluate to a boolean.
    pub fn eval_bool(&self, tm: &mut TermManager, t: TermId) -> Option<bool> {
        let v = self.eval(tm, t)?;
        match tm.kind(v) {
            TermKind::True => Some(true),
            TermKind::False => Some(false),
            _ => None,
        }
    }

    /// Evaluate to an integer.
    pub fn eval_int(&self, tm: &mut TermManager, t: TermId) -> Option<BigInt> {
        let v = self.eval(tm, t)?;
        match tm.kind(v) {
            TermKind::IntConst(k) => Some(k.clone()),
            _ => None,
        }
    }

    fn combine(&self, tm: &mut TermManager, t: TermId, vals: &[Option<TermId>]) -> Option<TermId> {
        let as_int = |tm: &TermManager, v: &Option<TermId>| -> Option<BigInt> {
            match v.map(|id| tm.kind(id).clone()) {
                Some(TermKind::IntConst(k)) => Some(k),
                _ => None,
            }
        };
        let as_bv = |tm: &TermManager, v: &Option<TermId>| -> Option<(u64, u32)> {
            match v.map(|id| tm.kind(id).clone()) {
                Some(TermKind::BvConst { value, width }) => Some((value, width)),
                _ => None,
            }
        };
        let as_bool = |tm: &TermManager, v: &Option<TermId>| -> Option<bool> {
            match v.map(|id| tm.kind(id).clone()) {
                Some(TermKind::True) => Some(true),
                Some(TermKind::False) => Some(false),
                _ => None,
            }
        };
        match tm.kind(t).clone() {
            TermKind::Not(_) => {
                let b = as_bool(tm, &vals[0])?;
                Some(tm.mk_bool(!b))
            }
            TermKind::And(_) => {
                let mut unknown = false;
                for v in vals {
                    match as_bool(tm, v) {
                        Some(false) => return Some(tm.mk_false()),
                        Some(true) => {}
                        None => unknown = true,
                    }
                }
                if unknown {
                    None
                } else {
                    Some(tm.mk_true())
                }
            }
            TermKind::Or(_) => {
                let mut unknown = false;
                for v in vals {
                    match as_bool(tm, v) {
                        Some(true) => return Some(tm.mk_true()),
                        Some(false) => {}
                        None => unknown = true,
                    }
                }
                if unknown {
                    None
                } else {
                    Some(tm.mk_false())
                }
            }
            TermKind::Implies(..) => match (as_bool(tm, &vals[0]), as_bool(tm, &vals[1])) {
                (Some(false), _) | (_, Some(true)) => Some(tm.mk_true()),
                (Some(true), Some(false)) => Some(tm.mk_false()),
                _ => None,
            },
            TermKind::Ite(..) => match as_bool(tm, &vals[0]) {
                Some(true) => vals[1],
                Some(false) => vals[2],
                None => None,
            },
            TermKind::Eq(..) => {
                let (a, b) = (vals[0]?, vals[1]?);
                Some(tm.mk_bool(a == b))
            }
            TermKind::Distinct(_) => {
                let mut seen = Vec::with_capacity(vals.len());
                for v in vals {
                    let id = (*v)?;
                    if seen.contains(&id) {
                        return Some(tm.mk_false());
                    }
                    seen.push(id);
                }
                Some(tm.mk_true())
            }
            TermKind::Add(_) => {
                let mut sum = BigInt::zero();
                for v in vals {
                    sum += as_int(tm, v)?;
                }
                Some(tm.mk_int(sum))
            }
            TermKind::Mul(_) => {
                let mut prod = BigInt::from(1);
                for v in vals {
                    prod *= as_int(tm, v)?;
                }
                Some(tm.mk_int(prod))
            }
            TermKind::Neg(_) => {
                let k = as_int(tm, &vals[0])?;
                Some(tm.mk_int(-k))
            }
            TermKind::Sub(..) => {
                let (a, b) = (as_int(tm, &vals[0])?, as_int(tm, &vals[1])?);
                Some(tm.mk_int(a - b))
            }
            TermKind::Le(..) => {
                let (a, b) = (as_int(tm, &vals[0])?, as_int(tm, &vals[1])?);
                Some(tm.mk_bool(a <= b))
            }
            TermKind::Lt(..) => {
                let (a, b) = (as_int(tm, &vals[0])?, as_int(tm, &vals[1])?);
                Some(tm.mk_bool(a < b))
            }
            TermKind::Ge(..) => {
                let (a, b) = (as_int(tm, &vals[0])?, as_int(tm, &vals[1])?);
                Some(tm.mk_bool(a >= b))
            }
            TermKind::Gt(..) => {
                let (a, b) = (as_int(tm, &vals[0])?, as_int(tm, &vals[1])?);
                Some(tm.mk_bool(a > b))
            }
            TermKind::Divides { modulus, .. } => {
                let k = as_int(tm, &vals[0])?;
                let rem = k % &modulus;
                Some(tm.mk_bool(rem.is_zero()))
            }
            TermKind::BvNeg(_) => {
                let (v, w) = as_bv(tm, &vals[0])?;
                Some(tm.mk_bv(v.wrapping_neg() & mask_of(w), w))
            }
            TermKind::BvAdd(_) => {
                let mut acc: Option<(u64, u32)> = None;
                for v in vals {
                    let (x, w) = as_bv(tm, v)?;
                    acc = Some(match acc {
                        None => (x, w),
                        Some((a, aw)) => {
                            debug_assert_eq!(aw, w);
                            (a.wrapping_add(x) & mask_of(w), w)
                        }
                    });
                }
                let (v, w) = acc?;
                Some(tm.mk_bv(v, w))
            }
            TermKind::BvSub(..) => {
                let ((a, w), (b, _)) = (as_bv(tm, &vals[0])?, as_bv(tm, &vals[1])?);
                Some(tm.mk_bv(a.wrapping_sub(b) & mask_of(w), w))
            }
            TermKind::BvUle(..) => {
                let ((a, _), (b, _)) = (as_bv(tm, &vals[0])?, as_bv(tm, &vals[1])?);
                Some(tm.mk_bool(a <= b))
            }
            TermKind::BvUlt(..) => {
                let ((a, _), (b, _)) = (as_bv(tm, &vals[0])?, as_bv(tm, &vals[1])?);
                Some(tm.mk_bool(a < b))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_arithmetic_atoms() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let y = tm.mk_var("y", int);
        let one = tm.mk_int(1);
        let x1 = tm.mk_add(vec![x, one]);
        let atom = tm.mk_eq(y, x1);
        let mut mdl = Model::new();
        let three = tm.mk_int(3);
        let four = tm.mk_int(4);
        mdl.set(x, three);
        mdl.set(y, four);
        assert_eq!(mdl.eval_bool(&mut tm, atom), Some(true));
        let div = tm.mk_divides(2, x);
        assert_eq!(mdl.eval_bool(&mut tm, div), Some(false));
    }

    #[test]
    fn short_circuits_through_unassigned() {
        let mut tm = TermManager::new();
        let p = tm.mk_var("p", tm.sorts.bool_sort);
        let q = tm.mk_var("q", tm.sorts.bool_sort);
        let conj = tm.mk_and(vec![p, q]);
        let mut mdl = Model::new();
        let f = tm.mk_false();
        mdl.set(p, f);
        // q is unassigned but the conjunction is already false.
        assert_eq!(mdl.eval_bool(&mut tm, conj), Some(false));
    }

    #[test]
    fn evaluates_bitvector_negation() {
        let mut tm = TermManager::new();
        let bv8 = tm.sorts.mk_bitvec(8);
        let x = tm.mk_var("x", bv8);
        let nx = tm.mk_bvneg(x);
        let mut mdl = Model::new();
        let one = tm.mk_bv(1, 8);
        mdl.set(x, one);
        let v = mdl.eval(&mut tm, nx).unwrap();
        let expect = tm.mk_bv(255, 8);
        assert_eq!(v, expect);
    }
}
