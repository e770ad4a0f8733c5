//! Property-based tests for predicate abstraction.

use proptest::prelude::*;
use qsolve_core::ast::{TermId, TermKind, TermManager};
use qsolve_core::model::Model;
use qsolve_solver::qsat::{MaxLevel, PredAbs};

/// Build a small pool of atoms over variables stamped with the given block
/// levels, abstract them all, and return the proxies.
fn abstracted_pool(
    tm: &mut TermManager,
    pa: &mut PredAbs,
    levels: &[MaxLevel],
) -> Vec<TermId> {
    let int = tm.sorts.int_sort;
    let mut proxies = Vec::new();
    for (i, &lvl) in levels.iter().enumerate() {
        let v = tm.mk_var(&format!("v{i}"), int);
        pa.set_expr_level(v, lvl);
        let bound = tm.mk_int(i as i64);
        let atom = tm.mk_ge(v, bound);
        let mut joint = MaxLevel::unset();
        let mut defs = Vec::new();
        pa.abstract_atoms(tm, atom, &mut joint, &mut defs);
        proxies.push(pa.proxy(atom).expect("atom got a proxy"));
    }
    proxies
}

proptest! {
    /// Every assumption literal agrees with the model it was derived from.
    #[test]
    fn assumptions_are_model_consistent(
        values in prop::collection::vec(proptest::bool::ANY, 4),
        depth in 1usize..4,
    ) {
        let mut tm = TermManager::new();
        let mut pa = PredAbs::new();
        let levels = [
            MaxLevel::exists(0),
            MaxLevel::forall(1),
            MaxLevel::exists(2),
            MaxLevel::forall(3),
        ];
        let proxies = abstracted_pool(&mut tm, &mut pa, &levels);
        let mut model = Model::new();
        for (&p, &b) in proxies.iter().zip(values.iter()) {
            let v = tm.mk_bool(b);
            model.set(p, v);
        }
        for _ in 0..depth {
            pa.push();
        }
        let mut asms = Vec::new();
        pa.get_assumptions(&mut tm, Some(&model), &mut asms);
        for &lit in &asms {
            let negated = match tm.kind(lit) {
                TermKind::Not(p) => Some(*p),
                _ => None,
            };
            match negated {
                Some(p) => {
                    prop_assert_eq!(model.eval_bool(&mut tm, p), Some(false));
                }
                None => {
                    prop_assert_eq!(model.eval_bool(&mut tm, lit), Some(true));
                }
            }
        }
    }

    /// Balanced push/pop sequences restore the assumption stack and leave
    /// the proxy registrations untouched.
    #[test]
    fn push_pop_balance(
        values in prop::collection::vec(proptest::bool::ANY, 4),
        rounds in 1usize..4,
    ) {
        let mut tm = TermManager::new();
        let mut pa = PredAbs::new();
        let levels = [
            MaxLevel::exists(0),
            MaxLevel::forall(1),
            MaxLevel::exists(2),
            MaxLevel::forall(3),
        ];
        let proxies = abstracted_pool(&mut tm, &mut pa, &levels);
        let mut model = Model::new();
        for (&p, &b) in proxies.iter().zip(values.iter()) {
            let v = tm.mk_bool(b);
            model.set(p, v);
        }
        let preds_before = pa.num_predicates();
        prop_assert_eq!(pa.asms().len(), 0);
        for _ in 0..rounds {
            pa.push();
            let mut asms = Vec::new();
            pa.get_assumptions(&mut tm, Some(&model), &mut asms);
        }
        pa.pop(rounds);
        prop_assert_eq!(pa.asms().len(), 0);
        prop_assert_eq!(pa.num_predicates(), preds_before);
        for (i, &p) in proxies.iter().enumerate() {
            let int = tm.sorts.int_sort;
            let v = tm.mk_var(&format!("v{i}"), int);
            let bound = tm.mk_int(i as i64);
            let atom = tm.mk_ge(v, bound);
            prop_assert_eq!(pa.proxy(atom), Some(p));
        }
    }
}
