//! Property-based tests for terms, negation pushing and prenexing.

use proptest::prelude::*;
use qsolve_core::ast::{traversal, TermId, TermManager};
use qsolve_core::quant::prenex;
use qsolve_core::rewrite::push_not;

/// A compact description of a boolean skeleton over four atoms.
#[derive(Debug, Clone)]
enum Skel {
    Atom(u8),
    Not(Box<Skel>),
    And(Vec<Skel>),
    Or(Vec<Skel>),
}

fn skel_strategy() -> impl Strategy<Value = Skel> {
    let leaf = (0u8..4).prop_map(Skel::Atom);
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(|s| Skel::Not(Box::new(s))),
            prop::collection::vec(inner.clone(), 1..3).prop_map(Skel::And),
            prop::collection::vec(inner, 1..3).prop_map(Skel::Or),
        ]
    })
}

fn build(tm: &mut TermManager, skel: &Skel, atoms: &[TermId]) -> TermId {
    match skel {
        Skel::Atom(i) => atoms[*i as usize % atoms.len()],
        Skel::Not(s) => {
            let inner = build(tm, s, atoms);
            tm.mk_not(inner)
        }
        Skel::And(ss) => {
            let parts: Vec<TermId> = ss.iter().map(|s| build(tm, s, atoms)).collect();
            tm.mk_and(parts)
        }
        Skel::Or(ss) => {
            let parts: Vec<TermId> = ss.iter().map(|s| build(tm, s, atoms)).collect();
            tm.mk_or(parts)
        }
    }
}

fn mk_atoms(tm: &mut TermManager) -> Vec<TermId> {
    let int = tm.sorts.int_sort;
    let x = tm.mk_var("x", int);
    let y = tm.mk_var("y", int);
    let zero = tm.mk_int(0);
    let three = tm.mk_int(3);
    vec![
        tm.mk_le(x, y),
        tm.mk_ge(x, zero),
        tm.mk_eq(y, three),
        tm.mk_lt(y, zero),
    ]
}

proptest! {
    /// Building the same skeleton twice yields the same identifier.
    #[test]
    fn hash_consing_is_stable(skel in skel_strategy()) {
        let mut tm = TermManager::new();
        let atoms = mk_atoms(&mut tm);
        let a = build(&mut tm, &skel, &atoms);
        let b = build(&mut tm, &skel, &atoms);
        prop_assert_eq!(a, b);
    }

    /// Negation pushing is an involution on and/or/not skeletons.
    #[test]
    fn push_not_is_involutive(skel in skel_strategy()) {
        let mut tm = TermManager::new();
        let atoms = mk_atoms(&mut tm);
        let f = build(&mut tm, &skel, &atoms);
        let n = push_not(&mut tm, f);
        let nn = push_not(&mut tm, n);
        prop_assert_eq!(nn, f);
    }

    /// Prenexing a quantified skeleton produces alternating, non-empty
    /// blocks and a quantifier-free matrix.
    #[test]
    fn prenex_alternates(skel in skel_strategy(), wrap_forall in proptest::bool::ANY) {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let atoms = mk_atoms(&mut tm);
        let body = build(&mut tm, &skel, &atoms);
        let inner = tm.mk_exists([("y", int)], body);
        let fml = if wrap_forall {
            tm.mk_forall([("x", int)], inner)
        } else {
            tm.mk_exists([("x", int)], inner)
        };
        let pf = prenex(&mut tm, fml).unwrap();
        prop_assert!(!traversal::has_quantifier(&tm, pf.matrix));
        for b in &pf.blocks {
            prop_assert!(!b.vars.is_empty());
        }
        for w in pf.blocks.windows(2) {
            prop_assert_ne!(w[0].is_forall, w[1].is_forall);
        }
    }
}

#[test]
fn prenex_counts_bound_variables() {
    let mut tm = TermManager::new();
    let int = tm.sorts.int_sort;
    let x = tm.mk_var("x", int);
    let y = tm.mk_var("y", int);
    let z = tm.mk_var("z", int);
    let xy = tm.mk_le(x, y);
    let yz = tm.mk_le(y, z);
    let conj = tm.mk_and(vec![xy, yz]);
    let ez = tm.mk_exists([("z", int)], conj);
    let fy = tm.mk_forall([("y", int)], ez);
    let ex = tm.mk_exists([("x", int)], fy);
    let pf = prenex(&mut tm, ex).unwrap();
    let total: usize = pf.blocks.iter().map(|b| b.vars.len()).sum();
    assert_eq!(total, 3);
    assert_eq!(pf.blocks.len(), 3);
    assert!(!pf.blocks[0].is_forall);
    assert!(pf.blocks[1].is_forall);
    assert!(!pf.blocks[2].is_forall);
}
