//! Bit-vector projection.
//!
//! A variable defined by an equality whose other side does not mention it is
//! substituted away exactly; anything else is pinned to its model value,
//! which is always a valid projection on a finite domain.

use crate::qsat::mbp::ProjectionPlugin;
use qsolve_core::ast::{traversal, TermId, TermKind, TermManager};
use qsolve_core::error::{QsolveError, Result};
use qsolve_core::model::Model;
use qsolve_core::sort::SortKind;
use rustc_hash::FxHashMap;

/// Equality-solving projection with model-value fallback.
#[derive(Debug, Default)]
pub struct BvProjector;

impl ProjectionPlugin for BvProjector {
    fn handles(&self, tm: &TermManager, var: TermId) -> bool {
        matches!(tm.sorts.kind(tm.sort_of(var)), SortKind::BitVec(_))
    }

    fn project(
        &self,
        tm: &mut TermManager,
        force: bool,
        vars: &[TermId],
        model: &Model,
        core: &mut Vec<TermId>,
    ) -> Result<()> {
        for &x in vars {
            if !core.iter().any(|&c| traversal::occurs(tm, c, x)) {
                continue;
            }
            let solution = core.iter().enumerate().find_map(|(i, &c)| {
                let TermKind::Eq(a, b) = tm.kind(c) else {
                    return None;
                };
                let (a, b) = (*a, *b);
                if a == x && !traversal::occurs(tm, b, x) {
                    Some((i, b))
                } else if b == x && !traversal::occurs(tm, a, x) {
                    Some((i, a))
                } else {
                    None
                }
            });
            let replacement = match solution {
                Some((i, t)) => {
                    core.remove(i);
                    t
                }
                None => match model.eval(tm, x) {
                    Some(v) if matches!(tm.kind(v), TermKind::BvConst { .. }) => v,
                    _ => {
                        if force {
                            return Err(QsolveError::Unknown(
                                "bit-vector variable has no model value".to_string(),
                            ));
                        }
                        continue;
                    }
                },
            };
            let mut map = FxHashMap::default();
            map.insert(x, replacement);
            for c in core.iter_mut() {
                *c = tm.substitute(*c, &map);
            }
            core.retain(|&c| !matches!(tm.kind(c), TermKind::True));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solved_equality_disappears() {
        // Projecting y out of { y = -x } leaves nothing at all.
        let mut tm = TermManager::new();
        let bv8 = tm.sorts.mk_bitvec(8);
        let x = tm.mk_var("x", bv8);
        let y = tm.mk_var("y", bv8);
        let nx = tm.mk_bvneg(x);
        let eq = tm.mk_eq(y, nx);
        let model = Model::new();
        let mut core = vec![eq];
        BvProjector
            .project(&mut tm, true, &[y], &model, &mut core)
            .unwrap();
        assert!(core.is_empty(), "core: {core:?}");
    }

    #[test]
    fn fallback_pins_the_model_value() {
        let mut tm = TermManager::new();
        let bv8 = tm.sorts.mk_bitvec(8);
        let x = tm.mk_var("x", bv8);
        let y = tm.mk_var("y", bv8);
        let ny = tm.mk_bvneg(y);
        let eq = tm.mk_eq(x, ny);
        let mut model = Model::new();
        let five = tm.mk_bv(5, 8);
        model.set(y, five);
        let mut core = vec![eq];
        BvProjector
            .project(&mut tm, true, &[y], &model, &mut core)
            .unwrap();
        assert!(!core.iter().any(|&c| traversal::occurs(&tm, c, y)));
        let expect_rhs = tm.mk_bv(251, 8);
        let expect = tm.mk_eq(x, expect_rhs);
        assert_eq!(core, vec![expect]);
    }
}
