//! Arithmetic projection.
//!
//! Integer variables are eliminated from a core one at a time:
//! disequalities and negated divisibilities are first strengthened at the
//! model; an equality with the variable is solved by coefficient scaling,
//! leaving a divisibility side constraint; otherwise the variable is
//! replaced by its greatest lower bound in the model shifted by an offset
//! reduced modulo the lcm of the involved moduli. Atoms the linear parser
//! cannot read fall through to the driver's value-substitution sweep.

use crate::qsat::mbp::ProjectionPlugin;
use crate::theory::lia::{self, LiaCon, LinExpr};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use qsolve_core::ast::{TermId, TermKind, TermManager};
use qsolve_core::error::{QsolveError, Result};
use qsolve_core::model::Model;
use qsolve_core::sort::SortKind;
use rustc_hash::FxHashMap;

/// Loos-Weispfenning/Cooper style projection for linear integer arithmetic.
#[derive(Debug, Default)]
pub struct ArithProjector;

impl ProjectionPlugin for ArithProjector {
    fn handles(&self, tm: &TermManager, var: TermId) -> bool {
        matches!(tm.sorts.kind(tm.sort_of(var)), SortKind::Int)
    }

    fn project(
        &self,
        tm: &mut TermManager,
        force: bool,
        vars: &[TermId],
        model: &Model,
        core: &mut Vec<TermId>,
    ) -> Result<()> {
        // Parse what we can; the rest passes through untouched.
        let mut lits: Vec<Lit> = Vec::new();
        let mut passthrough: Vec<TermId> = Vec::new();
        for &c in core.iter() {
            let (atom, positive) = match tm.kind(c) {
                TermKind::Not(a) => (*a, false),
                _ => (c, true),
            };
            match lia::parse_literal(tm, atom, positive) {
                Ok(cs) => {
                    for con in cs {
                        lits.push(strengthen(tm, model, con)?);
                    }
                }
                Err(_) => passthrough.push(c),
            }
        }

        for &x in vars {
            if passthrough
                .iter()
                .any(|&c| qsolve_core::ast::traversal::occurs(tm, c, x))
            {
                // A foreign atom mentions x; only a model value can remove
                // it, and only the driver may decide to give up.
                if force {
                    let Some(val) = model.eval_int(tm, x) else {
                        return Err(QsolveError::Unknown(
                            "projection variable has no model value".to_string(),
                        ));
                    };
                    let vt = tm.mk_int(val.clone());
                    let mut map = FxHashMap::default();
                    map.insert(x, vt);
                    for c in passthrough.iter_mut() {
                        *c = tm.substitute(*c, &map);
                    }
                    for lit in lits.iter_mut() {
                        lit.substitute_value(x, &val);
                    }
                }
                continue;
            }
            eliminate(tm, model, x, &mut lits)?;
        }

        let mut out = passthrough;
        for lit in &lits {
            let atom = lit.to_atom(tm);
            if !matches!(tm.kind(atom), TermKind::True) {
                out.push(atom);
            }
        }
        *core = out;
        Ok(())
    }
}

/// A conjunct during projection: `e <= 0`, `e = 0` or `m | e`.
#[derive(Debug, Clone)]
enum Lit {
    Le(LinExpr),
    Eq(LinExpr),
    Div(BigInt, LinExpr),
}

impl Lit {
    fn expr(&self) -> &LinExpr {
        match self {
            Lit::Le(e) | Lit::Eq(e) | Lit::Div(_, e) => e,
        }
    }

    fn expr_mut(&mut self) -> &mut LinExpr {
        match self {
            Lit::Le(e) | Lit::Eq(e) | Lit::Div(_, e) => e,
        }
    }

    fn substitute_value(&mut self, x: TermId, val: &BigInt) {
        let e = self.expr_mut();
        let c = e.remove(x);
        if !c.is_zero() {
            e.konst += c * val;
        }
    }

    fn to_atom(&self, tm: &mut TermManager) -> TermId {
        match self {
            Lit::Le(e) => lia::le_atom(tm, e),
            Lit::Eq(e) => lia::eq_atom(tm, e),
            Lit::Div(m, e) => lia::modeq_atom(tm, m, e),
        }
    }
}

/// Replace a disjunctive constraint by the branch the model chose.
fn strengthen(tm: &mut TermManager, model: &Model, con: LiaCon) -> Result<Lit> {
    match con {
        LiaCon::Le(e) => Ok(Lit::Le(e)),
        LiaCon::Eq(e) => Ok(Lit::Eq(e)),
        LiaCon::ModEq(m, e) => Ok(Lit::Div(m, e)),
        LiaCon::Neq(e) => {
            let v = eval_lin(tm, model, &e).ok_or_else(no_value)?;
            debug_assert!(!v.is_zero(), "disequality must hold in the model");
            let mut le = if v.is_negative() { e } else { e.negated() };
            le.konst += BigInt::one();
            Ok(Lit::Le(le))
        }
        LiaCon::NotModEq(m, e) => {
            let v = eval_lin(tm, model, &e).ok_or_else(no_value)?;
            let r = v.mod_floor(&m);
            debug_assert!(!r.is_zero(), "negated divisibility must hold in the model");
            let mut shifted = e;
            shifted.konst -= r;
            Ok(Lit::Div(m, shifted))
        }
    }
}

fn no_value() -> QsolveError {
    QsolveError::Unknown("projection variable has no model value".to_string())
}

fn eval_lin(tm: &mut TermManager, model: &Model, e: &LinExpr) -> Option<BigInt> {
    let mut acc = e.konst.clone();
    for (v, c) in &e.terms {
        acc += c * model.eval_int(tm, *v)?;
    }
    Some(acc)
}

/// Eliminate `x` from the parsed literal set.
fn eliminate(tm: &mut TermManager, model: &Model, x: TermId, lits: &mut Vec<Lit>) -> Result<()> {
    let (with_x, mut rest): (Vec<Lit>, Vec<Lit>) = lits
        .drain(..)
        .partition(|l| !l.expr().coeff(x).is_zero());
    if with_x.is_empty() {
        *lits = rest;
        return Ok(());
    }

    // An equality with x eliminates it exactly: solve a*x = -t, scale the
    // other occurrences to the same coefficient and keep `a | t`.
    let eq_idx = with_x
        .iter()
        .enumerate()
        .filter(|(_, l)| matches!(l, Lit::Eq(_)))
        .min_by_key(|(_, l)| l.expr().coeff(x).abs())
        .map(|(i, _)| i);
    if let Some(i) = eq_idx {
        let mut with_x = with_x;
        let eq = with_x.remove(i);
        let Lit::Eq(mut e) = eq else { unreachable!() };
        let mut a = e.remove(x);
        if a.is_negative() {
            a = -a;
            e.scale(&BigInt::from(-1));
        }
        // a*x + e = 0, hence a*x = -e
        let t = e.negated();
        if !a.is_one() {
            rest.push(Lit::Div(a.clone(), t.clone()));
        }
        for mut l in with_x {
            let b = l.expr_mut().remove(x);
            match &mut l {
                Lit::Le(e2) | Lit::Eq(e2) => {
                    e2.scale(&a);
                    e2.add_scaled(&t, &b);
                }
                Lit::Div(m, e2) => {
                    *m *= &a;
                    e2.scale(&a);
                    e2.add_scaled(&t, &b);
                }
            }
            rest.push(l);
        }
        *lits = rest;
        return Ok(());
    }

    // Bounds case: scale every occurrence to the coefficient L = lcm, write
    // z = L*x, and substitute the model's greatest lower bound plus a
    // modulus-reduced offset (or just the residue when unbounded below).
    let mut big_l = BigInt::one();
    for l in &with_x {
        big_l = big_l.lcm(&l.expr().coeff(x).abs());
    }
    let mut lowers: Vec<LinExpr> = Vec::new(); // z >= t
    let mut uppers: Vec<LinExpr> = Vec::new(); // z <= u
    let mut divs: Vec<(BigInt, LinExpr)> = Vec::new(); // m | z + w
    for mut l in with_x {
        let c = l.expr_mut().remove(x);
        let f = &big_l / c.abs();
        match l {
            Lit::Le(mut e) => {
                e.scale(&f);
                if c.is_positive() {
                    // L*x + e <= 0  =>  z <= -e
                    uppers.push(e.negated());
                } else {
                    // -L*x + e <= 0  =>  e <= z
                    lowers.push(e);
                }
            }
            Lit::Div(m, mut e) => {
                let signed = if c.is_positive() { f.clone() } else { -&f };
                e.scale(&signed);
                divs.push((m * &f, e));
            }
            Lit::Eq(_) => unreachable!("equalities are handled above"),
        }
    }

    let xv = model.eval_int(tm, x).ok_or_else(no_value)?;
    let zv = &big_l * &xv;
    let mut m_div = big_l.clone();
    for (m, _) in &divs {
        m_div = m_div.lcm(m);
    }

    if lowers.is_empty() {
        // Unbounded below: only the residues constrain the witness.
        let rho = zv.mod_floor(&m_div);
        for (m, w) in divs {
            let mut e = w;
            e.konst += &rho;
            rest.push(Lit::Div(m, e));
        }
    } else {
        let mut best: Option<(BigInt, LinExpr)> = None;
        for t in &lowers {
            let tv = eval_lin(tm, model, t).ok_or_else(no_value)?;
            match &best {
                Some((bv, _)) if *bv >= tv => {}
                _ => best = Some((tv, t.clone())),
            }
        }
        let (tv, tstar) = best.expect("nonempty lowers");
        let delta = &zv - &tv;
        debug_assert!(!delta.is_negative(), "model violates a lower bound");
        let dhat = delta.mod_floor(&m_div);
        // Witness W = t* + dhat.
        let mut witness = tstar;
        witness.konst += &dhat;
        for t in lowers {
            // t <= W
            rest.push(Lit::Le(t.sub(&witness)));
        }
        for u in uppers {
            // W <= u
            rest.push(Lit::Le(witness.sub(&u)));
        }
        for (m, w) in divs {
            let mut e = w;
            e.add_scaled(&witness, &BigInt::one());
            rest.push(Lit::Div(m, e));
        }
        if !big_l.is_one() {
            rest.push(Lit::Div(big_l, witness));
        }
    }
    *lits = rest;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with(tm: &mut TermManager, pairs: &[(TermId, i64)]) -> Model {
        let mut m = Model::new();
        for &(v, k) in pairs {
            let t = tm.mk_int(k);
            m.set(v, t);
        }
        m
    }

    #[test]
    fn equality_projection_leaves_divisibility() {
        // Projecting y out of { 2y = x } under x=2, y=1 yields 2 | x.
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let y = tm.mk_var("y", int);
        let two = tm.mk_int(2);
        let ty = tm.mk_mul(vec![two, y]);
        let eq = tm.mk_eq(ty, x);
        let model = model_with(&mut tm, &[(x, 2), (y, 1)]);
        let mut core = vec![eq];
        ArithProjector
            .project(&mut tm, true, &[y], &model, &mut core)
            .unwrap();
        assert_eq!(core.len(), 1);
        match tm.kind(core[0]) {
            TermKind::Divides { modulus, arg } => {
                assert_eq!(modulus, &BigInt::from(2));
                assert!(qsolve_core::ast::traversal::occurs(&tm, *arg, x));
            }
            other => panic!("expected divisibility, got {other:?}"),
        }
        assert_eq!(model.eval_bool(&mut tm, core[0]), Some(true));
    }

    #[test]
    fn bound_projection_substitutes_the_glb() {
        // Projecting y out of { y > 0, x >= y } under y=1, x=1 gives x >= 1.
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let y = tm.mk_var("y", int);
        let zero = tm.mk_int(0);
        let gt = tm.mk_gt(y, zero);
        let ge = tm.mk_ge(x, y);
        let model = model_with(&mut tm, &[(x, 1), (y, 1)]);
        let mut core = vec![gt, ge];
        ArithProjector
            .project(&mut tm, true, &[y], &model, &mut core)
            .unwrap();
        assert!(!core
            .iter()
            .any(|&c| qsolve_core::ast::traversal::occurs(&tm, c, y)));
        for &c in &core {
            assert_eq!(model.eval_bool(&mut tm, c), Some(true));
        }
        // x >= 1 must be among the results.
        let one = tm.mk_int(1);
        let expect = tm.mk_le(one, x);
        assert!(core.contains(&expect), "core: {core:?}");
    }

    #[test]
    fn unbounded_side_drops_to_residues() {
        // Projecting y out of { y <= x - 1 } leaves nothing.
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let y = tm.mk_var("y", int);
        let one = tm.mk_int(1);
        let xm1 = tm.mk_sub(x, one);
        let le = tm.mk_le(y, xm1);
        let model = model_with(&mut tm, &[(x, 0), (y, -1)]);
        let mut core = vec![le];
        ArithProjector
            .project(&mut tm, true, &[y], &model, &mut core)
            .unwrap();
        assert!(core.is_empty(), "core: {core:?}");
    }

    #[test]
    fn strengthened_disequality_projects() {
        // Projecting y from { y != x } under y=5, x=1 gives x <= y-1 -> x <= 4
        // after substituting the glb... there is no lower bound, so the
        // residue case applies and the core empties.
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let y = tm.mk_var("y", int);
        let eq = tm.mk_eq(y, x);
        let ne = tm.mk_not(eq);
        let model = model_with(&mut tm, &[(x, 1), (y, 5)]);
        let mut core = vec![ne];
        ArithProjector
            .project(&mut tm, true, &[y], &model, &mut core)
            .unwrap();
        assert!(!core
            .iter()
            .any(|&c| qsolve_core::ast::traversal::occurs(&tm, c, y)));
        for &c in &core {
            assert_eq!(model.eval_bool(&mut tm, c), Some(true));
        }
    }
}
