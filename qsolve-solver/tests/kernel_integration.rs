//! Ground kernel integration tests.
//!
//! These exercise the assumption-based check cycle across the SAT core and
//! the theory layer: arithmetic infeasibility, divisibility reasoning,
//! bit-vector evaluation, congruence closure, cores and model totality.

use qsolve_core::ast::TermManager;
use qsolve_core::SolverConfig;
use qsolve_solver::{Kernel, KernelResult};

fn kernel() -> Kernel {
    Kernel::new(SolverConfig::default())
}

/// GCD-based infeasibility: 2x + 2y = 7 has no integer solution, whatever
/// the bounds say.
#[test]
fn lia_gcd_infeasibility() {
    let mut tm = TermManager::new();
    let mut k = kernel();
    let int = tm.sorts.int_sort;
    let x = tm.mk_var("x", int);
    let y = tm.mk_var("y", int);
    let two = tm.mk_int(2);
    let seven = tm.mk_int(7);
    let tx = tm.mk_mul(vec![two, x]);
    let ty = tm.mk_mul(vec![two, y]);
    let sum = tm.mk_add(vec![tx, ty]);
    let eq = tm.mk_eq(sum, seven);
    k.assert_expr(&mut tm, eq);
    assert_eq!(k.check(&mut tm, &[]), KernelResult::Unsat);
}

/// The same constraint with an even right-hand side is satisfiable and the
/// model must verify against the assertion.
#[test]
fn lia_gcd_satisfiable_with_model() {
    let mut tm = TermManager::new();
    let mut k = kernel();
    let int = tm.sorts.int_sort;
    let x = tm.mk_var("x", int);
    let y = tm.mk_var("y", int);
    let two = tm.mk_int(2);
    let six = tm.mk_int(6);
    let tx = tm.mk_mul(vec![two, x]);
    let ty = tm.mk_mul(vec![two, y]);
    let sum = tm.mk_add(vec![tx, ty]);
    let eq = tm.mk_eq(sum, six);
    k.assert_expr(&mut tm, eq);
    assert_eq!(k.check(&mut tm, &[]), KernelResult::Sat);
    let model = k.get_model().clone();
    assert_eq!(model.eval_bool(&mut tm, eq), Some(true));
}

/// Divisibility atoms interact with parity: an even x cannot be odd.
#[test]
fn lia_divisibility_conflict() {
    let mut tm = TermManager::new();
    let mut k = kernel();
    let int = tm.sorts.int_sort;
    let x = tm.mk_var("x", int);
    let y = tm.mk_var("y", int);
    let two = tm.mk_int(2);
    let one = tm.mk_int(1);
    let ty = tm.mk_mul(vec![two, y]);
    let odd = tm.mk_add(vec![ty, one]);
    let eq = tm.mk_eq(x, odd);
    let even = tm.mk_divides(2, x);
    k.assert_expr(&mut tm, eq);
    k.assert_expr(&mut tm, even);
    assert_eq!(k.check(&mut tm, &[]), KernelResult::Unsat);
}

/// The unsat core is a subset of the assumptions and each member matters.
#[test]
fn unsat_core_is_a_relevant_subset() {
    let mut tm = TermManager::new();
    let mut k = kernel();
    let int = tm.sorts.int_sort;
    let bool_sort = tm.sorts.bool_sort;
    let x = tm.mk_var("x", int);
    let zero = tm.mk_int(0);
    let ten = tm.mk_int(10);
    let p = tm.mk_var("p", bool_sort);
    let q = tm.mk_var("q", bool_sort);
    let r = tm.mk_var("r", bool_sort);
    let lo = tm.mk_ge(x, ten);
    let hi = tm.mk_lt(x, zero);
    let minus_hundred = tm.mk_int(-100);
    let free = tm.mk_ge(x, minus_hundred);
    let def_p = tm.mk_eq(p, lo);
    let def_q = tm.mk_eq(q, hi);
    let def_r = tm.mk_eq(r, free);
    k.assert_expr(&mut tm, def_p);
    k.assert_expr(&mut tm, def_q);
    k.assert_expr(&mut tm, def_r);
    // r is irrelevant to the conflict between p and q.
    assert_eq!(k.check(&mut tm, &[p, q, r]), KernelResult::Unsat);
    let core = k.unsat_core().to_vec();
    assert!(core.contains(&p));
    assert!(core.contains(&q));
    assert!(!core.contains(&r), "core should not mention r: {core:?}");
}

/// Bit-vector negation over eight bits.
#[test]
fn bv_negation_roundtrip() {
    let mut tm = TermManager::new();
    let mut k = kernel();
    let bv8 = tm.sorts.mk_bitvec(8);
    let x = tm.mk_var("x", bv8);
    let y = tm.mk_var("y", bv8);
    let three = tm.mk_bv(3, 8);
    let nx = tm.mk_bvneg(x);
    let ex = tm.mk_eq(x, three);
    let ey = tm.mk_eq(y, nx);
    k.assert_expr(&mut tm, ex);
    k.assert_expr(&mut tm, ey);
    assert_eq!(k.check(&mut tm, &[]), KernelResult::Sat);
    let model = k.get_model().clone();
    let got = model.eval(&mut tm, y).unwrap();
    let expect = tm.mk_bv(253, 8);
    assert_eq!(got, expect);
}

/// Congruence closure: f(x) = a, x = y, f(y) != a is inconsistent.
#[test]
fn euf_congruence_conflict() {
    let mut tm = TermManager::new();
    let mut k = kernel();
    let u = tm.sorts.mk_uninterpreted("U");
    let x = tm.mk_var("x", u);
    let y = tm.mk_var("y", u);
    let a = tm.mk_var("a", u);
    let fx = tm.mk_app("f", vec![x], u);
    let fy = tm.mk_app("f", vec![y], u);
    let e1 = tm.mk_eq(fx, a);
    let e2 = tm.mk_eq(x, y);
    let e3 = tm.mk_eq(fy, a);
    let ne3 = tm.mk_not(e3);
    let all = tm.mk_and(vec![e1, e2, ne3]);
    k.assert_expr(&mut tm, all);
    assert_eq!(k.check(&mut tm, &[]), KernelResult::Unsat);
}

/// Boolean structure alone: unit propagation through the skeleton.
#[test]
fn propositional_chain() {
    let mut tm = TermManager::new();
    let mut k = kernel();
    let bool_sort = tm.sorts.bool_sort;
    let p = tm.mk_var("p", bool_sort);
    let q = tm.mk_var("q", bool_sort);
    let r = tm.mk_var("r", bool_sort);
    let pq = tm.mk_implies(p, q);
    let qr = tm.mk_implies(q, r);
    k.assert_expr(&mut tm, pq);
    k.assert_expr(&mut tm, qr);
    let nr = tm.mk_not(r);
    assert_eq!(k.check(&mut tm, &[p, nr]), KernelResult::Unsat);
    assert_eq!(k.check(&mut tm, &[p]), KernelResult::Sat);
    let model = k.get_model().clone();
    assert_eq!(model.eval_bool(&mut tm, r), Some(true));
}

/// Checks are repeatable: the same query gives the same answer after an
/// intervening unsat check.
#[test]
fn checks_are_repeatable() {
    let mut tm = TermManager::new();
    let mut k = kernel();
    let int = tm.sorts.int_sort;
    let x = tm.mk_var("x", int);
    let zero = tm.mk_int(0);
    let pos = tm.mk_gt(x, zero);
    let neg = tm.mk_lt(x, zero);
    let both = tm.mk_and(vec![pos, neg]);
    let p = tm.mk_var("p", tm.sorts.bool_sort);
    let def = tm.mk_eq(p, both);
    k.assert_expr(&mut tm, def);
    assert_eq!(k.check(&mut tm, &[p]), KernelResult::Unsat);
    let np = tm.mk_not(p);
    assert_eq!(k.check(&mut tm, &[np]), KernelResult::Sat);
    assert_eq!(k.check(&mut tm, &[p]), KernelResult::Unsat);
}
