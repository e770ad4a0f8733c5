//! Worklist traversals over the term DAG.
//!
//! Shared subterms are visited once; no traversal here recurses structurally
//! on the DAG (binder boundaries use bounded recursion, everything else is an
//! explicit stack).

use crate::ast::{TermId, TermKind, TermManager};
use rustc_hash::FxHashSet;

/// Collect the free uninterpreted constants of `t`, in first-encounter order.
/// Constants bound by an enclosing quantifier are skipped.
#[must_use]
pub fn collect_free_consts(tm: &TermManager, t: TermId) -> Vec<TermId> {
    let mut out = Vec::new();
    let mut seen = FxHashSet::default();
    let mut bound = Vec::new();
    free_consts_rec(tm, t, &mut bound, &mut out, &mut seen);
    out
}

fn free_consts_rec(
    tm: &TermManager,
    root: TermId,
    bound: &mut Vec<TermId>,
    out: &mut Vec<TermId>,
    seen: &mut FxHashSet<TermId>,
) {
    // One visited set per binder frame; caches are only valid for a fixed
    // bound-variable context.
    let mut visited = FxHashSet::default();
    let mut todo = vec![root];
    while let Some(t) = todo.pop() {
        if !visited.insert(t) {
            continue;
        }
        match tm.kind(t) {
            TermKind::Var { .. } => {
                if !bound.contains(&t) && seen.insert(t) {
                    out.push(t);
                }
            }
            TermKind::Quantifier { vars, body, .. } => {
                let n = bound.len();
                bound.extend(vars.iter().copied());
                free_consts_rec(tm, *body, bound, out, seen);
                bound.truncate(n);
            }
            _ => todo.extend(tm.children(t)),
        }
    }
}

/// Whether the constant `var` occurs free in `t`.
#[must_use]
pub fn occurs(tm: &TermManager, t: TermId, var: TermId) -> bool {
    let mut visited = FxHashSet::default();
    let mut todo = vec![t];
    while let Some(cur) = todo.pop() {
        if !visited.insert(cur) {
            continue;
        }
        if cur == var {
            return true;
        }
        if let TermKind::Quantifier { vars, body, .. } = tm.kind(cur) {
            if !vars.contains(&var) {
                todo.push(*body);
            }
            continue;
        }
        todo.extend(tm.children(cur));
    }
    false
}

/// Whether `t` contains a quantifier node.
#[must_use]
pub fn has_quantifier(tm: &TermManager, t: TermId) -> bool {
    let mut visited = FxHashSet::default();
    let mut todo = vec![t];
    while let Some(cur) = todo.pop() {
        if !visited.insert(cur) {
            continue;
        }
        if matches!(tm.kind(cur), TermKind::Quantifier { .. }) {
            return true;
        }
        todo.extend(tm.children(cur));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_consts_skip_bound_occurrences() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let y = tm.mk_var("y", int);
        let le = tm.mk_le(x, y);
        let q = tm.mk_exists([("y", int)], le);
        let free = collect_free_consts(&tm, q);
        assert_eq!(free, vec![x]);
        assert!(occurs(&tm, q, x));
        assert!(!occurs(&tm, q, y));
    }

    #[test]
    fn quantifier_detection() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let zero = tm.mk_int(0);
        let atom = tm.mk_ge(x, zero);
        assert!(!has_quantifier(&tm, atom));
        let q = tm.mk_forall([("x", int)], atom);
        assert!(has_quantifier(&tm, q));
    }
}
