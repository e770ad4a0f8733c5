//! Negation pushing.
//!
//! [`push_not`] computes the negation of a formula with the negation pushed
//! through boolean connectives and quantifiers, so learned lemmas and negated
//! matrices never stack `not` nodes.

use crate::ast::{TermId, TermKind, TermManager};
use rustc_hash::FxHashMap;

/// Negate `t`, pushing the negation through `not`/`and`/`or`/`implies`,
/// boolean `ite` and quantifiers. Theory atoms are wrapped with a single
/// `not`; a formula that is already a negation loses it.
pub fn push_not(tm: &mut TermManager, t: TermId) -> TermId {
    let mut cache = FxHashMap::default();
    push_not_rec(tm, t, &mut cache)
}

fn push_not_rec(tm: &mut TermManager, t: TermId, cache: &mut FxHashMap<TermId, TermId>) -> TermId {
    if let Some(&r) = cache.get(&t) {
        return r;
    }
    let r = match tm.kind(t).clone() {
        TermKind::True => tm.mk_false(),
        TermKind::False => tm.mk_true(),
        TermKind::Not(a) => a,
        TermKind::And(args) => {
            let negs: Vec<TermId> = args.iter().map(|&a| push_not_rec(tm, a, cache)).collect();
            tm.mk_or(negs)
        }
        TermKind::Or(args) => {
            let negs: Vec<TermId> = args.iter().map(|&a| push_not_rec(tm, a, cache)).collect();
            tm.mk_and(negs)
        }
        TermKind::Implies(a, b) => {
            let nb = push_not_rec(tm, b, cache);
            tm.mk_and(vec![a, nb])
        }
        TermKind::Ite(c, a, b) if tm.is_bool(a) => {
            let na = push_not_rec(tm, a, cache);
            let nb = push_not_rec(tm, b, cache);
            tm.mk_ite(c, na, nb)
        }
        TermKind::Quantifier {
            is_forall,
            vars,
            body,
        } => {
            let nb = push_not_rec(tm, body, cache);
            tm.mk_quantifier(!is_forall, vars, nb)
        }
        _ => tm.mk_not(t),
    };
    cache.insert(t, r);
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_pushes_through_connectives() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let zero = tm.mk_int(0);
        let a = tm.mk_le(x, zero);
        let b = tm.mk_ge(x, zero);
        let conj = tm.mk_and(vec![a, b]);
        let neg = push_not(&mut tm, conj);
        let na = tm.mk_not(a);
        let nb = tm.mk_not(b);
        let expect = tm.mk_or(vec![na, nb]);
        assert_eq!(neg, expect);
        // Negating twice restores the original conjunction.
        assert_eq!(push_not(&mut tm, neg), conj);
    }

    #[test]
    fn quantifier_parity_flips() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let zero = tm.mk_int(0);
        let body = tm.mk_ge(x, zero);
        let q = tm.mk_forall([("x", int)], body);
        let neg = push_not(&mut tm, q);
        match tm.kind(neg) {
            TermKind::Quantifier { is_forall, .. } => assert!(!is_forall),
            other => panic!("expected quantifier, got {other:?}"),
        }
    }
}
