//! Equality and uninterpreted functions.
//!
//! Congruence closure over the term DAG with a map-based union-find.
//! Boolean predicate atoms are merged with the `true`/`false` constants so
//! congruence propagates through predicate applications.

use qsolve_core::ast::{TermId, TermKind, TermManager};
use rustc_hash::{FxHashMap, FxHashSet};

/// Verdict of a congruence-closure check.
#[derive(Debug, Clone)]
pub enum EufOutcome {
    /// Consistent; maps every relevant term to its class representative.
    Sat(FxHashMap<TermId, TermId>),
    /// A disequality (or predicate polarity) is violated.
    Unsat,
}

#[derive(Debug, Default)]
struct UnionFind {
    parent: FxHashMap<TermId, TermId>,
}

impl UnionFind {
    fn find(&mut self, t: TermId) -> TermId {
        let mut root = t;
        while let Some(&p) = self.parent.get(&root) {
            if p == root {
                break;
            }
            root = p;
        }
        // Path compression.
        let mut cur = t;
        while let Some(&p) = self.parent.get(&cur) {
            if p == cur {
                break;
            }
            self.parent.insert(cur, root);
            cur = p;
        }
        root
    }

    fn union(&mut self, a: TermId, b: TermId) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        // Deterministic orientation: smaller id becomes the representative.
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent.insert(hi, lo);
        true
    }
}

/// Decide a conjunction of equality/predicate literals.
pub fn check(tm: &mut TermManager, lits: &[(TermId, bool)]) -> EufOutcome {
    let true_term = tm.mk_true();
    let false_term = tm.mk_false();

    // Collect the relevant nodes: atom arguments and their subterms.
    let mut nodes: Vec<TermId> = Vec::new();
    let mut seen = FxHashSet::default();
    let mut todo: Vec<TermId> = Vec::new();
    for &(atom, _) in lits {
        match tm.kind(atom) {
            TermKind::Eq(a, b) => {
                todo.push(*a);
                todo.push(*b);
            }
            TermKind::Distinct(args) => todo.extend(args.iter().copied()),
            TermKind::App { .. } => todo.push(atom),
            _ => {}
        }
    }
    while let Some(t) = todo.pop() {
        if !seen.insert(t) {
            continue;
        }
        nodes.push(t);
        if let TermKind::App { args, .. } = tm.kind(t) {
            todo.extend(args.iter().copied());
        }
    }
    nodes.sort_unstable();

    let mut uf = UnionFind::default();
    let mut merges: Vec<(TermId, TermId)> = Vec::new();
    let mut diseqs: Vec<(TermId, TermId)> = Vec::new();
    for &(atom, positive) in lits {
        match tm.kind(atom).clone() {
            TermKind::Eq(a, b) => {
                if positive {
                    merges.push((a, b));
                } else {
                    diseqs.push((a, b));
                }
            }
            TermKind::Distinct(args) => {
                if positive {
                    for i in 0..args.len() {
                        for j in i + 1..args.len() {
                            diseqs.push((args[i], args[j]));
                        }
                    }
                } else if args.len() == 2 {
                    merges.push((args[0], args[1]));
                } else {
                    // A negated n-ary distinct is a disjunction; the kernel
                    // never sends one here.
                    debug_assert!(false, "negated n-ary distinct in euf");
                }
            }
            TermKind::App { .. } => {
                merges.push((atom, if positive { true_term } else { false_term }));
            }
            _ => {}
        }
    }
    for (a, b) in merges {
        uf.union(a, b);
    }

    // Congruence to fixpoint.
    let apps: Vec<TermId> = nodes
        .iter()
        .copied()
        .filter(|&t| matches!(tm.kind(t), TermKind::App { .. }))
        .collect();
    loop {
        let mut changed = false;
        for i in 0..apps.len() {
            for j in i + 1..apps.len() {
                let (a, b) = (apps[i], apps[j]);
                if uf.find(a) == uf.find(b) {
                    continue;
                }
                let congruent = {
                    let (TermKind::App { fun: fa, args: aa }, TermKind::App { fun: fb, args: ab }) =
                        (tm.kind(a).clone(), tm.kind(b).clone())
                    else {
                        unreachable!()
                    };
                    fa == fb
                        && aa.len() == ab.len()
                        && aa
                            .iter()
                            .zip(ab.iter())
                            .all(|(&x, &y)| uf.find(x) == uf.find(y))
                };
                if congruent {
                    uf.union(a, b);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    if uf.find(true_term) == uf.find(false_term) {
        return EufOutcome::Unsat;
    }
    for (a, b) in diseqs {
        if uf.find(a) == uf.find(b) {
            return EufOutcome::Unsat;
        }
    }

    let mut reps = FxHashMap::default();
    for t in nodes {
        let r = uf.find(t);
        reps.insert(t, r);
    }
    EufOutcome::Sat(reps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn congruence_propagates_through_applications() {
        let mut tm = TermManager::new();
        let u = tm.sorts.mk_uninterpreted("U");
        let x = tm.mk_var("x", u);
        let y = tm.mk_var("y", u);
        let fx = tm.mk_app("f", vec![x], u);
        let fy = tm.mk_app("f", vec![y], u);
        let exy = tm.mk_eq(x, y);
        let efxfy = tm.mk_eq(fx, fy);
        // x = y and f(x) != f(y) is inconsistent.
        let out = check(&mut tm, &[(exy, true), (efxfy, false)]);
        assert!(matches!(out, EufOutcome::Unsat));
        // x = y alone is fine and puts f(x), f(y) in one class.
        match check(&mut tm, &[(exy, true)]) {
            EufOutcome::Sat(reps) => assert_eq!(reps[&fx], reps[&fy]),
            EufOutcome::Unsat => panic!("expected sat"),
        }
    }

    #[test]
    fn predicate_polarity_conflicts() {
        let mut tm = TermManager::new();
        let u = tm.sorts.mk_uninterpreted("U");
        let bool_sort = tm.sorts.bool_sort;
        let x = tm.mk_var("x", u);
        let y = tm.mk_var("y", u);
        let px = tm.mk_app("p", vec![x], bool_sort);
        let py = tm.mk_app("p", vec![y], bool_sort);
        let exy = tm.mk_eq(x, y);
        let out = check(&mut tm, &[(exy, true), (px, true), (py, false)]);
        assert!(matches!(out, EufOutcome::Unsat));
    }
}
