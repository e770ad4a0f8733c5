//! Fixed-width bit-vectors.
//!
//! Conjunctions of bit-vector literals are decided by forced-equality
//! propagation followed by bounded enumeration of the remaining assignment
//! space. Widths up to 64 bits are supported; an assignment space larger
//! than the configured limit yields `Unknown`.

use qsolve_core::ast::{mask_of, TermId, TermKind, TermManager};
use qsolve_core::sort::SortKind;
use rustc_hash::{FxHashMap, FxHashSet};

/// Verdict of a bit-vector feasibility check.
#[derive(Debug, Clone)]
pub enum BvOutcome {
    /// Feasible; values are `(value, width)` pairs.
    Sat(FxHashMap<TermId, (u64, u32)>),
    /// Exactly refuted.
    Unsat,
    /// Out of fragment or past the enumeration limit.
    Unknown(String),
}

/// Decide a conjunction of bit-vector literals.
pub fn check(tm: &TermManager, lits: &[(TermId, bool)], enum_limit: u64) -> BvOutcome {
    // Collect the opaque bit-vector constants mentioned by the atoms.
    let mut vars: Vec<(TermId, u32)> = Vec::new();
    let mut seen = FxHashSet::default();
    let mut todo: Vec<TermId> = lits.iter().map(|&(a, _)| a).collect();
    while let Some(t) = todo.pop() {
        if !seen.insert(t) {
            continue;
        }
        match tm.kind(t) {
            TermKind::Var { .. } | TermKind::App { .. } => {
                if let SortKind::BitVec(w) = tm.sorts.kind(tm.sort_of(t)) {
                    vars.push((t, *w));
                }
            }
            _ => todo.extend(tm.children(t)),
        }
    }
    vars.sort_unstable();

    let mut assign: FxHashMap<TermId, (u64, u32)> = FxHashMap::default();

    // Propagate equalities whose right-hand side is already determined.
    loop {
        let mut changed = false;
        for &(atom, positive) in lits {
            if !positive {
                continue;
            }
            if let TermKind::Eq(a, b) = tm.kind(atom) {
                for (lhs, rhs) in [(*a, *b), (*b, *a)] {
                    if !assign.contains_key(&lhs)
                        && matches!(tm.kind(lhs), TermKind::Var { .. } | TermKind::App { .. })
                    {
                        if let (Some(v), SortKind::BitVec(w)) = (
                            eval_bv(tm, rhs, &assign),
                            tm.sorts.kind(tm.sort_of(lhs)).clone(),
                        ) {
                            assign.insert(lhs, (v, w));
                            changed = true;
                        }
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    let free: Vec<(TermId, u32)> = vars
        .iter()
        .copied()
        .filter(|(v, _)| !assign.contains_key(v))
        .collect();
    let mut space: u64 = 1;
    for &(_, w) in &free {
        if w >= 63 {
            return BvOutcome::Unknown("bit-vector enumeration space too large".to_string());
        }
        match space.checked_mul(1u64 << w) {
            Some(s) if s <= enum_limit => space = s,
            _ => return BvOutcome::Unknown("bit-vector enumeration space too large".to_string()),
        }
    }

    let mut counters = vec![0u64; free.len()];
    loop {
        for (i, &(v, w)) in free.iter().enumerate() {
            assign.insert(v, (counters[i], w));
        }
        match verify(tm, lits, &assign) {
            Some(true) => return BvOutcome::Sat(assign),
            Some(false) => {}
            None => return BvOutcome::Unknown("unsupported bit-vector operation".to_string()),
        }
        // Odometer step.
        let mut i = 0;
        loop {
            if i == free.len() {
                return BvOutcome::Unsat;
            }
            counters[i] += 1;
            if counters[i] < (1u64 << free[i].1) {
                break;
            }
            counters[i] = 0;
            i += 1;
        }
    }
}

fn verify(
    tm: &TermManager,
    lits: &[(TermId, bool)],
    assign: &FxHashMap<TermId, (u64, u32)>,
) -> Option<bool> {
    for &(atom, positive) in lits {
        let holds = match tm.kind(atom) {
            TermKind::Eq(a, b) => eval_bv(tm, *a, assign)? == eval_bv(tm, *b, assign)?,
            TermKind::BvUle(a, b) => eval_bv(tm, *a, assign)? <= eval_bv(tm, *b, assign)?,
            TermKind::BvUlt(a, b) => eval_bv(tm, *a, assign)? < eval_bv(tm, *b, assign)?,
            TermKind::Distinct(args) => {
                let mut vals = Vec::with_capacity(args.len());
                for &a in args.iter() {
                    vals.push(eval_bv(tm, a, assign)?);
                }
                let mut ok = true;
                'outer: for i in 0..vals.len() {
                    for j in i + 1..vals.len() {
                        if vals[i] == vals[j] {
                            ok = false;
                            break 'outer;
                        }
                    }
                }
                ok
            }
            _ => return None,
        };
        if holds != positive {
            return Some(false);
        }
    }
    Some(true)
}

fn eval_bv(tm: &TermManager, t: TermId, assign: &FxHashMap<TermId, (u64, u32)>) -> Option<u64> {
    match tm.kind(t) {
        TermKind::BvConst { value, .. } => Some(*value),
        TermKind::Var { .. } | TermKind::App { .. } => assign.get(&t).map(|&(v, _)| v),
        TermKind::BvNeg(a) => {
            let w = width_of(tm, t)?;
            Some(eval_bv(tm, *a, assign)?.wrapping_neg() & mask_of(w))
        }
        TermKind::BvAdd(args) => {
            let w = width_of(tm, t)?;
            let mut acc: u64 = 0;
            for &a in args.iter() {
                acc = acc.wrapping_add(eval_bv(tm, a, assign)?);
            }
            Some(acc & mask_of(w))
        }
        TermKind::BvSub(a, b) => {
            let w = width_of(tm, t)?;
            Some(eval_bv(tm, *a, assign)?.wrapping_sub(eval_bv(tm, *b, assign)?) & mask_of(w))
        }
        _ => None,
    }
}

fn width_of(tm: &TermManager, t: TermId) -> Option<u32> {
    tm.sorts.bv_width(tm.sort_of(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_equation_propagates() {
        let mut tm = TermManager::new();
        let bv8 = tm.sorts.mk_bitvec(8);
        let x = tm.mk_var("x", bv8);
        let y = tm.mk_var("y", bv8);
        let three = tm.mk_bv(3, 8);
        let eq_x = tm.mk_eq(x, three);
        let nx = tm.mk_bvneg(x);
        let eq_y = tm.mk_eq(y, nx);
        match check(&tm, &[(eq_x, true), (eq_y, true)], 1 << 20) {
            BvOutcome::Sat(assign) => {
                assert_eq!(assign[&x].0, 3);
                assert_eq!(assign[&y].0, 253);
            }
            other => panic!("expected sat, got {other:?}"),
        }
    }

    #[test]
    fn conflicting_equations_are_unsat() {
        let mut tm = TermManager::new();
        let bv8 = tm.sorts.mk_bitvec(8);
        let x = tm.mk_var("x", bv8);
        let one = tm.mk_bv(1, 8);
        let two = tm.mk_bv(2, 8);
        let e1 = tm.mk_eq(x, one);
        let e2 = tm.mk_eq(x, two);
        let out = check(&tm, &[(e1, true), (e2, true)], 1 << 20);
        assert!(matches!(out, BvOutcome::Unsat), "got {out:?}");
    }

    #[test]
    fn enumeration_covers_small_spaces() {
        // x + x = 1 has no solution over 4-bit vectors (left side is even).
        let mut tm = TermManager::new();
        let bv4 = tm.sorts.mk_bitvec(4);
        let x = tm.mk_var("x", bv4);
        let one = tm.mk_bv(1, 4);
        let xx = tm.mk_bvadd(vec![x, x]);
        let eq = tm.mk_eq(xx, one);
        let out = check(&tm, &[(eq, true)], 1 << 20);
        assert!(matches!(out, BvOutcome::Unsat), "got {out:?}");
    }
}
