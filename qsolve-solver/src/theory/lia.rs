//! Linear integer arithmetic.
//!
//! Decides conjunctions of linear constraints over the integers:
//! inequalities, equalities, disequalities and divisibility constraints.
//! The pipeline is disequality case-splitting, unit-pivot equality
//! elimination with GCD tests, Fourier-Motzkin elimination over the
//! rationals, and an integer sample search that walks the elimination stages
//! backwards with a divisibility-aware candidate window. A `Sat` answer
//! always carries an assignment verified against every constraint; `Unsat`
//! comes only from exact derivations (GCD, constant contradictions,
//! exhausted case splits).

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::Ratio;
use num_traits::{One, Signed, Zero};
use qsolve_core::ast::{TermId, TermKind, TermManager};
use qsolve_core::sort::SortKind;
use rustc_hash::{FxHashMap, FxHashSet};

/// Verdict of an arithmetic feasibility check.
#[derive(Debug, Clone)]
pub enum LiaOutcome {
    /// Feasible, with a verified integer assignment for every variable
    /// occurring in the constraints.
    Sat(FxHashMap<TermId, BigInt>),
    /// Exactly refuted.
    Unsat,
    /// Out of fragment or out of budget.
    Unknown(String),
}

/// Largest modulus expanded when case-splitting a negated divisibility.
const MAX_SPLIT_MODULUS: u32 = 64;
/// Fourier-Motzkin constraint cap.
const MAX_FM_CONSTRAINTS: usize = 2_000;
/// Cap on the per-variable candidate window during sampling.
const MAX_WINDOW: i64 = 512;

// ----- linear expressions ----------------------------------------------------

/// Sum of coefficient-scaled variables plus a constant. Terms are kept
/// sorted by variable so equal expressions compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LinExpr {
    pub(crate) terms: Vec<(TermId, BigInt)>,
    pub(crate) konst: BigInt,
}

impl LinExpr {
    pub(crate) fn from_const(k: BigInt) -> Self {
        Self {
            terms: Vec::new(),
            konst: k,
        }
    }

    pub(crate) fn from_var(x: TermId) -> Self {
        Self {
            terms: vec![(x, BigInt::one())],
            konst: BigInt::zero(),
        }
    }

    pub(crate) fn is_const(&self) -> bool {
        self.terms.is_empty()
    }

    pub(crate) fn coeff(&self, x: TermId) -> BigInt {
        self.terms
            .iter()
            .find(|(v, _)| *v == x)
            .map_or_else(BigInt::zero, |(_, c)| c.clone())
    }

    pub(crate) fn add_term(&mut self, x: TermId, c: &BigInt) {
        if c.is_zero() {
            return;
        }
        match self.terms.binary_search_by(|(v, _)| v.cmp(&x)) {
            Ok(i) => {
                self.terms[i].1 += c;
                if self.terms[i].1.is_zero() {
                    self.terms.remove(i);
                }
            }
            Err(i) => self.terms.insert(i, (x, c.clone())),
        }
    }

    /// Remove `x`, returning its coefficient.
    pub(crate) fn remove(&mut self, x: TermId) -> BigInt {
        match self.terms.binary_search_by(|(v, _)| v.cmp(&x)) {
            Ok(i) => self.terms.remove(i).1,
            Err(_) => BigInt::zero(),
        }
    }

    /// `self += factor * other`.
    pub(crate) fn add_scaled(&mut self, other: &LinExpr, factor: &BigInt) {
        if factor.is_zero() {
            return;
        }
        for (v, c) in &other.terms {
            let scaled = c * factor;
            self.add_term(*v, &scaled);
        }
        self.konst += &other.konst * factor;
    }

    pub(crate) fn scale(&mut self, factor: &BigInt) {
        debug_assert!(!factor.is_zero());
        for (_, c) in &mut self.terms {
            *c *= factor;
        }
        self.konst *= factor;
    }

    pub(crate) fn negated(&self) -> LinExpr {
        let mut e = self.clone();
        e.scale(&BigInt::from(-1));
        e
    }

    pub(crate) fn sub(&self, other: &LinExpr) -> LinExpr {
        let mut e = self.clone();
        e.add_scaled(other, &BigInt::from(-1));
        e
    }

    pub(crate) fn vars(&self) -> impl Iterator<Item = TermId> + '_ {
        self.terms.iter().map(|(v, _)| *v)
    }

    pub(crate) fn gcd_coeffs(&self) -> BigInt {
        let mut g = BigInt::zero();
        for (_, c) in &self.terms {
            g = g.gcd(c);
        }
        g
    }

    /// Evaluate under a total assignment of the expression's variables.
    pub(crate) fn eval(&self, assign: &FxHashMap<TermId, BigInt>) -> Option<BigInt> {
        let mut acc = self.konst.clone();
        for (v, c) in &self.terms {
            acc += c * assign.get(v)?;
        }
        Some(acc)
    }
}

/// Translate an integer term into a linear expression; `None` outside the
/// linear fragment. Uninterpreted integer applications are treated as opaque
/// variables.
pub(crate) fn linearize(tm: &TermManager, t: TermId) -> Option<LinExpr> {
    match tm.kind(t) {
        TermKind::IntConst(k) => Some(LinExpr::from_const(k.clone())),
        TermKind::Var { .. } | TermKind::App { .. }
            if matches!(tm.sorts.kind(tm.sort_of(t)), SortKind::Int) =>
        {
            Some(LinExpr::from_var(t))
        }
        TermKind::Add(args) => {
            let mut acc = LinExpr::default();
            for &a in args.iter() {
                let e = linearize(tm, a)?;
                acc.add_scaled(&e, &BigInt::one());
            }
            Some(acc)
        }
        TermKind::Sub(a, b) => {
            let la = linearize(tm, *a)?;
            let lb = linearize(tm, *b)?;
            Some(la.sub(&lb))
        }
        TermKind::Neg(a) => Some(linearize(tm, *a)?.negated()),
        TermKind::Mul(args) => {
            let mut konst = BigInt::one();
            let mut expr: Option<LinExpr> = None;
            for &a in args.iter() {
                match tm.kind(a) {
                    TermKind::IntConst(k) => konst *= k,
                    _ => {
                        let e = linearize(tm, a)?;
                        if e.is_const() {
                            konst *= e.konst;
                        } else if expr.is_some() {
                            return None; // non-linear
                        } else {
                            expr = Some(e);
                        }
                    }
                }
            }
            Some(match expr {
                None => LinExpr::from_const(konst),
                Some(mut e) => {
                    if konst.is_zero() {
                        LinExpr::default()
                    } else {
                        e.scale(&konst);
                        e
                    }
                }
            })
        }
        _ => None,
    }
}

// ----- constraints -----------------------------------------------------------

/// A parsed arithmetic constraint.
#[derive(Debug, Clone)]
pub(crate) enum LiaCon {
    /// `e <= 0`.
    Le(LinExpr),
    /// `e = 0`.
    Eq(LinExpr),
    /// `e != 0`.
    Neq(LinExpr),
    /// `m | e`.
    ModEq(BigInt, LinExpr),
    /// `m` does not divide `e`.
    NotModEq(BigInt, LinExpr),
}

impl LiaCon {
    fn holds(&self, assign: &FxHashMap<TermId, BigInt>) -> Option<bool> {
        match self {
            LiaCon::Le(e) => Some(!e.eval(assign)?.is_positive()),
            LiaCon::Eq(e) => Some(e.eval(assign)?.is_zero()),
            LiaCon::Neq(e) => Some(!e.eval(assign)?.is_zero()),
            LiaCon::ModEq(m, e) => Some(e.eval(assign)?.mod_floor(m).is_zero()),
            LiaCon::NotModEq(m, e) => Some(!e.eval(assign)?.mod_floor(m).is_zero()),
        }
    }
}

/// Parse one theory literal into constraints; `Err` carries the reason the
/// literal is outside the fragment.
pub(crate) fn parse_literal(
    tm: &TermManager,
    atom: TermId,
    positive: bool,
) -> Result<Vec<LiaCon>, String> {
    let lin = |t: TermId| -> Result<LinExpr, String> {
        linearize(tm, t).ok_or_else(|| "non-linear arithmetic term".to_string())
    };
    let one = BigInt::one;
    match tm.kind(atom).clone() {
        TermKind::Le(a, b) => {
            let (la, lb) = (lin(a)?, lin(b)?);
            Ok(vec![if positive {
                LiaCon::Le(la.sub(&lb))
            } else {
                let mut e = lb.sub(&la);
                e.konst += one();
                LiaCon::Le(e)
            }])
        }
        TermKind::Lt(a, b) => {
            let (la, lb) = (lin(a)?, lin(b)?);
            Ok(vec![if positive {
                let mut e = la.sub(&lb);
                e.konst += one();
                LiaCon::Le(e)
            } else {
                LiaCon::Le(lb.sub(&la))
            }])
        }
        TermKind::Ge(a, b) => parse_literal_le(tm, b, a, positive),
        TermKind::Gt(a, b) => {
            let (la, lb) = (lin(a)?, lin(b)?);
            Ok(vec![if positive {
                let mut e = lb.sub(&la);
                e.konst += one();
                LiaCon::Le(e)
            } else {
                LiaCon::Le(la.sub(&lb))
            }])
        }
        TermKind::Eq(a, b) => {
            let e = lin(a)?.sub(&lin(b)?);
            Ok(vec![if positive { LiaCon::Eq(e) } else { LiaCon::Neq(e) }])
        }
        TermKind::Divides { modulus, arg } => {
            let e = lin(arg)?;
            Ok(vec![if positive {
                LiaCon::ModEq(modulus, e)
            } else {
                LiaCon::NotModEq(modulus, e)
            }])
        }
        TermKind::Distinct(args) => {
            if positive {
                let exprs: Vec<LinExpr> = args
                    .iter()
                    .map(|&a| lin(a))
                    .collect::<Result<_, _>>()?;
                let mut out = Vec::new();
                for i in 0..exprs.len() {
                    for j in i + 1..exprs.len() {
                        out.push(LiaCon::Neq(exprs[i].sub(&exprs[j])));
                    }
                }
                Ok(out)
            } else if args.len() == 2 {
                let e = lin(args[0])?.sub(&lin(args[1])?);
                Ok(vec![LiaCon::Eq(e)])
            } else {
                Err("negated distinct over more than two terms".to_string())
            }
        }
        other => Err(format!("not an arithmetic atom: {other:?}")),
    }
}

fn parse_literal_le(
    tm: &TermManager,
    a: TermId,
    b: TermId,
    positive: bool,
) -> Result<Vec<LiaCon>, String> {
    let la = linearize(tm, a).ok_or("non-linear arithmetic term")?;
    let lb = linearize(tm, b).ok_or("non-linear arithmetic term")?;
    Ok(vec![if positive {
        LiaCon::Le(la.sub(&lb))
    } else {
        let mut e = lb.sub(&la);
        e.konst += BigInt::one();
        LiaCon::Le(e)
    }])
}

// ----- decision procedure ----------------------------------------------------

/// Decide a conjunction of arithmetic literals.
pub fn check(tm: &TermManager, lits: &[(TermId, bool)], max_nodes: u64) -> LiaOutcome {
    let mut cons = Vec::new();
    for &(atom, positive) in lits {
        match parse_literal(tm, atom, positive) {
            Ok(cs) => cons.extend(cs),
            Err(reason) => return LiaOutcome::Unknown(reason),
        }
    }
    let mut stack = vec![cons];
    let mut unknown: Option<String> = None;
    let mut expansions: u32 = 0;
    while let Some(cs) = stack.pop() {
        match split_first(&cs) {
            Ok(Some(branches)) => {
                expansions += 1;
                if expansions > 4_096 {
                    unknown = Some("case-split explosion".to_string());
                    continue;
                }
                stack.extend(branches);
                continue;
            }
            Ok(None) => {}
            Err(reason) => {
                unknown = Some(reason);
                continue;
            }
        }
        match solve_conj(&cs, max_nodes) {
            ConjOutcome::Sat(assign) => return LiaOutcome::Sat(assign),
            ConjOutcome::Unsat => {}
            ConjOutcome::Unknown(reason) => unknown = Some(reason),
        }
    }
    match unknown {
        Some(reason) => LiaOutcome::Unknown(reason),
        None => LiaOutcome::Unsat,
    }
}

/// Expand the first disjunctive constraint into branches.
fn split_first(cs: &[LiaCon]) -> Result<Option<Vec<Vec<LiaCon>>>, String> {
    for (i, c) in cs.iter().enumerate() {
        match c {
            LiaCon::Neq(e) => {
                let mut lt = Vec::with_capacity(cs.len());
                let mut gt = Vec::with_capacity(cs.len());
                lt.extend_from_slice(&cs[..i]);
                gt.extend_from_slice(&cs[..i]);
                lt.extend_from_slice(&cs[i + 1..]);
                gt.extend_from_slice(&cs[i + 1..]);
                // e <= -1
                let mut le = e.clone();
                le.konst += BigInt::one();
                lt.push(LiaCon::Le(le));
                // e >= 1
                let mut ge = e.negated();
                ge.konst += BigInt::one();
                gt.push(LiaCon::Le(ge));
                return Ok(Some(vec![lt, gt]));
            }
            LiaCon::NotModEq(m, e) => {
                if *m > BigInt::from(MAX_SPLIT_MODULUS) {
                    return Err("negated divisibility with large modulus".to_string());
                }
                let mut branches = Vec::new();
                let mut r = BigInt::one();
                while r < *m {
                    let mut branch: Vec<LiaCon> = Vec::with_capacity(cs.len());
                    branch.extend_from_slice(&cs[..i]);
                    branch.extend_from_slice(&cs[i + 1..]);
                    // e ≡ r (mod m), encoded as m | (e - r)
                    let mut shifted = e.clone();
                    shifted.konst -= &r;
                    branch.push(LiaCon::ModEq(m.clone(), shifted));
                    branches.push(branch);
                    r += BigInt::one();
                }
                return Ok(Some(branches));
            }
            _ => {}
        }
    }
    Ok(None)
}

enum ConjOutcome {
    Sat(FxHashMap<TermId, BigInt>),
    Unsat,
    Unknown(String),
}

/// Decide a conjunction of `Le`/`Eq`/`ModEq` constraints.
fn solve_conj(cs: &[LiaCon], max_nodes: u64) -> ConjOutcome {
    let mut les: Vec<LinExpr> = Vec::new();
    let mut eqs: Vec<LinExpr> = Vec::new();
    let mut modeqs: Vec<(BigInt, LinExpr)> = Vec::new();
    for c in cs {
        match c {
            LiaCon::Le(e) => les.push(e.clone()),
            LiaCon::Eq(e) => eqs.push(e.clone()),
            LiaCon::ModEq(m, e) => modeqs.push((m.clone(), e.clone())),
            LiaCon::Neq(_) | LiaCon::NotModEq(_, _) => {
                unreachable!("disequalities are split before solving")
            }
        }
    }

    // Equality elimination with unit pivots.
    let mut subs: Vec<(TermId, LinExpr)> = Vec::new();
    while !eqs.is_empty() {
        let mut progress = false;
        let mut i = 0;
        while i < eqs.len() {
            if eqs[i].is_const() {
                if eqs[i].konst.is_zero() {
                    eqs.remove(i);
                    progress = true;
                    continue;
                }
                return ConjOutcome::Unsat;
            }
            let g = eqs[i].gcd_coeffs();
            if !g.is_one() {
                if !eqs[i].konst.mod_floor(&g).is_zero() {
                    return ConjOutcome::Unsat;
                }
                let e = &mut eqs[i];
                for (_, c) in &mut e.terms {
                    *c /= &g;
                }
                e.konst /= &g;
            }
            i += 1;
        }
        let pivot = eqs.iter().enumerate().find_map(|(i, e)| {
            e.terms
                .iter()
                .find(|(_, c)| c.abs().is_one())
                .map(|(v, c)| (i, *v, c.clone()))
        });
        let Some((i, x, c)) = pivot else {
            if progress {
                continue;
            }
            return ConjOutcome::Unknown("equality without unit coefficient".to_string());
        };
        let mut e = eqs.remove(i);
        e.remove(x);
        // c*x + rest = 0  =>  x = -rest (c=1) or x = rest (c=-1)
        let expr = if c.is_one() { e.negated() } else { e };
        substitute_var(x, &expr, &mut les, &mut eqs, &mut modeqs);
        subs.push((x, expr));
    }

    // Constant and single-variable divisibility checks.
    let mut i = 0;
    while i < modeqs.len() {
        let (m, e) = &modeqs[i];
        if e.is_const() {
            if !e.konst.mod_floor(m).is_zero() {
                return ConjOutcome::Unsat;
            }
            modeqs.remove(i);
            continue;
        }
        if e.terms.len() == 1 {
            let g = e.terms[0].1.gcd(m);
            if !e.konst.mod_floor(&g).is_zero() {
                return ConjOutcome::Unsat;
            }
        }
        i += 1;
    }
    // Pairwise compatibility: two divisibility constraints whose linear
    // parts agree must also agree modulo the gcd of their moduli.
    for i in 0..modeqs.len() {
        for j in i + 1..modeqs.len() {
            let diff = modeqs[i].1.sub(&modeqs[j].1);
            if diff.is_const() {
                let g = modeqs[i].0.gcd(&modeqs[j].0);
                if !diff.konst.mod_floor(&g).is_zero() {
                    return ConjOutcome::Unsat;
                }
            }
        }
    }

    // Constant inequalities.
    les.retain(|e| !e.is_const() || e.konst.is_positive());
    if let Some(e) = les.iter().find(|e| e.is_const()) {
        debug_assert!(e.konst.is_positive());
        return ConjOutcome::Unsat;
    }

    // Fourier-Motzkin stages.
    let mut stage_vars: Vec<TermId> = {
        let mut set: FxHashSet<TermId> = FxHashSet::default();
        for e in &les {
            set.extend(e.vars());
        }
        let mut v: Vec<TermId> = set.into_iter().collect();
        v.sort_unstable();
        v
    };
    let mut stages: Vec<(TermId, Vec<LinExpr>)> = Vec::new();
    let mut current = les.clone();
    for &x in &stage_vars {
        let (with_x, without_x): (Vec<LinExpr>, Vec<LinExpr>) =
            current.into_iter().partition(|e| !e.coeff(x).is_zero());
        let mut next = without_x;
        for u in with_x.iter().filter(|e| e.coeff(x).is_positive()) {
            for l in with_x.iter().filter(|e| e.coeff(x).is_negative()) {
                let cu = u.coeff(x);
                let cl = l.coeff(x);
                // (-cl)*u + cu*l cancels x; both multipliers are positive.
                let mut r = LinExpr::default();
                r.add_scaled(u, &-&cl);
                r.add_scaled(l, &cu);
                if r.is_const() {
                    if r.konst.is_positive() {
                        return ConjOutcome::Unsat;
                    }
                } else {
                    next.push(r);
                }
            }
        }
        if next.len() > MAX_FM_CONSTRAINTS {
            return ConjOutcome::Unknown("inequality blow-up during elimination".to_string());
        }
        stages.push((x, with_x));
        current = next;
    }
    debug_assert!(current.iter().all(|e| e.is_const()));
    if current.iter().any(|e| e.konst.is_positive()) {
        return ConjOutcome::Unsat;
    }

    // Variables only mentioned by divisibility constraints still need values.
    {
        let mut extra: Vec<TermId> = Vec::new();
        for (_, e) in &modeqs {
            for v in e.vars() {
                if !stage_vars.contains(&v) && !extra.contains(&v) {
                    extra.push(v);
                }
            }
        }
        extra.sort_unstable();
        for x in extra {
            stages.push((x, Vec::new()));
            stage_vars.push(x);
        }
    }

    // Integer sample search, walking the stages backwards.
    let mut assign: FxHashMap<TermId, BigInt> = FxHashMap::default();
    let mut budget = max_nodes;
    if !sample(&stages, stages.len(), &modeqs, &mut assign, &mut budget) {
        return ConjOutcome::Unknown("no integer sample within budget".to_string());
    }

    // Variables that survive only inside elimination substitutions are
    // unconstrained at this point; pin them to zero so every expression
    // evaluates.
    let pivots: FxHashSet<TermId> = subs.iter().map(|(x, _)| *x).collect();
    for c in cs {
        let e = match c {
            LiaCon::Le(e) | LiaCon::Eq(e) | LiaCon::Neq(e) => e,
            LiaCon::ModEq(_, e) | LiaCon::NotModEq(_, e) => e,
        };
        for v in e.vars() {
            if !assign.contains_key(&v) && !pivots.contains(&v) {
                assign.insert(v, BigInt::zero());
            }
        }
    }

    // Back-substitute eliminated variables, then verify everything.
    for (x, expr) in subs.iter().rev() {
        match expr.eval(&assign) {
            Some(v) => {
                assign.insert(*x, v);
            }
            None => return ConjOutcome::Unknown("incomplete back-substitution".to_string()),
        }
    }
    for c in cs {
        if c.holds(&assign) != Some(true) {
            return ConjOutcome::Unknown("sample failed verification".to_string());
        }
    }
    ConjOutcome::Sat(assign)
}

fn substitute_var(
    x: TermId,
    expr: &LinExpr,
    les: &mut [LinExpr],
    eqs: &mut [LinExpr],
    modeqs: &mut [(BigInt, LinExpr)],
) {
    let subst = |e: &mut LinExpr| {
        let c = e.remove(x);
        if !c.is_zero() {
            e.add_scaled(expr, &c);
        }
    };
    les.iter_mut().for_each(subst);
    eqs.iter_mut().for_each(subst);
    modeqs.iter_mut().for_each(|(_, e)| subst(e));
}

/// Assign the stage at `depth - 1`; earlier stages reference only variables
/// from later stages, so assignments flow backwards.
fn sample(
    stages: &[(TermId, Vec<LinExpr>)],
    depth: usize,
    modeqs: &[(BigInt, LinExpr)],
    assign: &mut FxHashMap<TermId, BigInt>,
    budget: &mut u64,
) -> bool {
    if depth == 0 {
        return modeqs
            .iter()
            .all(|(m, e)| matches!(e.eval(assign), Some(v) if v.mod_floor(m).is_zero()));
    }
    let (x, bounds) = &stages[depth - 1];

    // Numeric bounds for x given the already-assigned later variables.
    let mut lb: Option<BigInt> = None;
    let mut ub: Option<BigInt> = None;
    for e in bounds {
        let c = e.coeff(*x);
        debug_assert!(!c.is_zero());
        let mut rest = e.clone();
        rest.remove(*x);
        let Some(rv) = rest.eval(assign) else {
            return false;
        };
        // c*x + rv <= 0
        let bound = Ratio::new(-rv, c.clone());
        if c.is_positive() {
            let b = bound.floor().to_integer();
            ub = Some(match ub {
                None => b,
                Some(u) => u.min(b),
            });
        } else {
            let b = bound.ceil().to_integer();
            lb = Some(match lb {
                None => b,
                Some(l) => l.max(b),
            });
        }
    }
    if let (Some(l), Some(u)) = (&lb, &ub) {
        if l > u {
            return false;
        }
    }

    // Candidate window sized by the divisibility moduli that involve x.
    let mut period = BigInt::one();
    for (m, e) in modeqs {
        if !e.coeff(*x).is_zero() {
            period = period.lcm(m);
        }
    }
    let window = (period.clone() * 2i32)
        .min(BigInt::from(MAX_WINDOW))
        .max(BigInt::from(4));
    let start = match (&lb, &ub) {
        (Some(l), _) => l.clone(),
        (None, Some(u)) => u - &window + 1,
        (None, None) => -(window.clone() / BigInt::from(2)),
    };

    let mut cand = start;
    let mut steps = BigInt::zero();
    while steps < window {
        if *budget == 0 {
            return false;
        }
        *budget -= 1;
        let in_range = lb.as_ref().map_or(true, |l| &cand >= l)
            && ub.as_ref().map_or(true, |u| &cand <= u);
        if in_range {
            assign.insert(*x, cand.clone());
            let local_ok = modeqs.iter().all(|(m, e)| {
                if e.coeff(*x).is_zero() {
                    return true;
                }
                match e.eval(assign) {
                    Some(v) => v.mod_floor(m).is_zero(),
                    None => true, // involves an earlier stage; checked later
                }
            });
            if local_ok && sample(stages, depth - 1, modeqs, assign, budget) {
                return true;
            }
            assign.remove(x);
        }
        cand += BigInt::one();
        steps += BigInt::one();
    }
    false
}

// ----- rebuilding terms ------------------------------------------------------

/// Rebuild `e <= 0` as a term, normalized to `sum <= k` with coefficients
/// divided by their GCD (a sound integer tightening).
pub(crate) fn le_atom(tm: &mut TermManager, e: &LinExpr) -> TermId {
    let mut e = e.clone();
    let g = e.gcd_coeffs();
    if !g.is_zero() && !g.is_one() {
        for (_, c) in &mut e.terms {
            *c /= &g;
        }
        // g*T + k <= 0 is exactly T + ceil(k/g) <= 0 over the integers.
        e.konst = e.konst.div_ceil(&g);
    }
    if e.is_const() {
        return tm.mk_bool(!e.konst.is_positive());
    }
    // Negative-coefficient terms move to the right-hand side; the constant
    // joins whichever side keeps the atom smallest.
    let pos: Vec<(TermId, BigInt)> = e
        .terms
        .iter()
        .filter(|(_, c)| c.is_positive())
        .cloned()
        .collect();
    let neg: Vec<(TermId, BigInt)> = e
        .terms
        .iter()
        .filter(|(_, c)| c.is_negative())
        .map(|(v, c)| (*v, -c))
        .collect();
    let side = |tm: &mut TermManager, terms: &[(TermId, BigInt)]| -> Vec<TermId> {
        terms
            .iter()
            .map(|(v, c)| {
                if c.is_one() {
                    *v
                } else {
                    let k = tm.mk_int(c.clone());
                    tm.mk_mul(vec![k, *v])
                }
            })
            .collect()
    };
    if pos.is_empty() {
        let lhs = tm.mk_int(e.konst.clone());
        let parts = side(tm, &neg);
        let rhs = tm.mk_add(parts);
        return tm.mk_le(lhs, rhs);
    }
    let mut lhs_parts = side(tm, &pos);
    let mut rhs_parts = side(tm, &neg);
    if rhs_parts.is_empty() {
        let k = tm.mk_int(-e.konst.clone());
        rhs_parts.push(k);
    } else if !e.konst.is_zero() {
        let k = tm.mk_int(e.konst.clone());
        lhs_parts.push(k);
    }
    let lhs = tm.mk_add(lhs_parts);
    let rhs = tm.mk_add(rhs_parts);
    tm.mk_le(lhs, rhs)
}

/// Rebuild `m | e` as a divisibility atom.
pub(crate) fn modeq_atom(tm: &mut TermManager, m: &BigInt, e: &LinExpr) -> TermId {
    if e.is_const() {
        return tm.mk_bool(e.konst.mod_floor(m).is_zero());
    }
    let mut shifted = e.clone();
    shifted.konst = shifted.konst.mod_floor(m);
    let arg = full_term(tm, &shifted);
    tm.mk_divides(m.clone(), arg)
}

/// Rebuild `e = 0` as an equality.
pub(crate) fn eq_atom(tm: &mut TermManager, e: &LinExpr) -> TermId {
    if e.is_const() {
        return tm.mk_bool(e.konst.is_zero());
    }
    let lhs = sum_term(tm, e);
    let rhs = tm.mk_int(-e.konst.clone());
    tm.mk_eq(lhs, rhs)
}

/// The variable part of `e` as a term (the constant is left to the caller).
fn sum_term(tm: &mut TermManager, e: &LinExpr) -> TermId {
    let mut parts = Vec::with_capacity(e.terms.len());
    for (v, c) in &e.terms {
        if c.is_one() {
            parts.push(*v);
        } else {
            let k = tm.mk_int(c.clone());
            parts.push(tm.mk_mul(vec![k, *v]));
        }
    }
    tm.mk_add(parts)
}

/// The whole of `e`, constant included, as a term.
pub(crate) fn full_term(tm: &mut TermManager, e: &LinExpr) -> TermId {
    let mut parts = Vec::with_capacity(e.terms.len() + 1);
    for (v, c) in &e.terms {
        if c.is_one() {
            parts.push(*v);
        } else {
            let k = tm.mk_int(c.clone());
            parts.push(tm.mk_mul(vec![k, *v]));
        }
    }
    if !e.konst.is_zero() || parts.is_empty() {
        let k = tm.mk_int(e.konst.clone());
        parts.push(k);
    }
    tm.mk_add(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_var(tm: &mut TermManager, name: &str) -> TermId {
        let s = tm.sorts.int_sort;
        tm.mk_var(name, s)
    }

    #[test]
    fn gcd_infeasibility() {
        // 2x + 2y = 7 has no integer solution.
        let mut tm = TermManager::new();
        let x = int_var(&mut tm, "x");
        let y = int_var(&mut tm, "y");
        let two = tm.mk_int(2);
        let seven = tm.mk_int(7);
        let tx = tm.mk_mul(vec![two, x]);
        let ty = tm.mk_mul(vec![two, y]);
        let sum = tm.mk_add(vec![tx, ty]);
        let eq = tm.mk_eq(sum, seven);
        let out = check(&tm, &[(eq, true)], 10_000);
        assert!(matches!(out, LiaOutcome::Unsat), "got {out:?}");
    }

    #[test]
    fn bounds_and_sample() {
        let mut tm = TermManager::new();
        let x = int_var(&mut tm, "x");
        let three = tm.mk_int(3);
        let ten = tm.mk_int(10);
        let lo = tm.mk_ge(x, three);
        let hi = tm.mk_lt(x, ten);
        match check(&tm, &[(lo, true), (hi, true)], 10_000) {
            LiaOutcome::Sat(assign) => {
                let v = &assign[&x];
                assert!(*v >= BigInt::from(3) && *v < BigInt::from(10));
            }
            other => panic!("expected sat, got {other:?}"),
        }
    }

    #[test]
    fn parity_conflict_is_unsat() {
        // 2 | x and x = 2y + 1 cannot both hold.
        let mut tm = TermManager::new();
        let x = int_var(&mut tm, "x");
        let y = int_var(&mut tm, "y");
        let two = tm.mk_int(2);
        let one = tm.mk_int(1);
        let ty = tm.mk_mul(vec![two, y]);
        let odd = tm.mk_add(vec![ty, one]);
        let eq = tm.mk_eq(x, odd);
        let div = tm.mk_divides(2, x);
        let out = check(&tm, &[(eq, true), (div, true)], 10_000);
        assert!(matches!(out, LiaOutcome::Unsat), "got {out:?}");
    }

    #[test]
    fn negated_divisibility_splits() {
        let mut tm = TermManager::new();
        let x = int_var(&mut tm, "x");
        let div = tm.mk_divides(2, x);
        match check(&tm, &[(div, false)], 10_000) {
            LiaOutcome::Sat(assign) => {
                assert!(assign[&x].mod_floor(&BigInt::from(2)).is_one());
            }
            other => panic!("expected sat, got {other:?}"),
        }
    }

    #[test]
    fn strict_bounds_squeeze_to_unsat() {
        // 0 < x < 1 over the integers.
        let mut tm = TermManager::new();
        let x = int_var(&mut tm, "x");
        let zero = tm.mk_int(0);
        let one = tm.mk_int(1);
        let lo = tm.mk_gt(x, zero);
        let hi = tm.mk_lt(x, one);
        let out = check(&tm, &[(lo, true), (hi, true)], 10_000);
        assert!(matches!(out, LiaOutcome::Unsat), "got {out:?}");
    }

    #[test]
    fn equality_only_system_gets_a_sample() {
        let mut tm = TermManager::new();
        let x = int_var(&mut tm, "x");
        let y = int_var(&mut tm, "y");
        let three = tm.mk_int(3);
        let sum = tm.mk_add(vec![x, y]);
        let eq = tm.mk_eq(sum, three);
        match check(&tm, &[(eq, true)], 10_000) {
            LiaOutcome::Sat(assign) => {
                assert_eq!(&assign[&x] + &assign[&y], BigInt::from(3));
            }
            other => panic!("expected sat, got {other:?}"),
        }
    }

    #[test]
    fn incompatible_residues_are_unsat() {
        // 2 | x and 2 | x + 1 cannot both hold.
        let mut tm = TermManager::new();
        let x = int_var(&mut tm, "x");
        let one = tm.mk_int(1);
        let xp1 = tm.mk_add(vec![x, one]);
        let d1 = tm.mk_divides(2, x);
        let d2 = tm.mk_divides(2, xp1);
        let out = check(&tm, &[(d1, true), (d2, true)], 10_000);
        assert!(matches!(out, LiaOutcome::Unsat), "got {out:?}");
    }

    #[test]
    fn disequality_split_finds_a_model() {
        let mut tm = TermManager::new();
        let x = int_var(&mut tm, "x");
        let zero = tm.mk_int(0);
        let eq = tm.mk_eq(x, zero);
        match check(&tm, &[(eq, false)], 10_000) {
            LiaOutcome::Sat(assign) => assert!(!assign[&x].is_zero()),
            other => panic!("expected sat, got {other:?}"),
        }
    }
}
