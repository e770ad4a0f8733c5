//! Model-based projection.
//!
//! Given a model and a set of variables, projection rewrites a core (a
//! conjunction of literals true in the model) into a quantifier-free
//! formula that still holds in the model, implies the existential closure of
//! the core over those variables, and - under `force` - no longer mentions
//! them. Theory-specific rules live in per-sort plugins; whatever a plugin
//! leaves behind falls back to substituting the variable's model value.

pub mod arith;
pub mod bv;

use qsolve_core::ast::{traversal, TermId, TermKind, TermManager};
use qsolve_core::error::{QsolveError, Result};
use qsolve_core::model::Model;
use rustc_hash::FxHashMap;

pub use arith::ArithProjector;
pub use bv::BvProjector;

/// A per-theory projection rule set.
pub trait ProjectionPlugin: std::fmt::Debug {
    /// Whether this plugin projects variables of the given sort.
    fn handles(&self, tm: &TermManager, var: TermId) -> bool;

    /// Rewrite `core` in place so the handled variables disappear (or, when
    /// `force` is false, are only left in residual pass-through atoms).
    fn project(
        &self,
        tm: &mut TermManager,
        force: bool,
        vars: &[TermId],
        model: &Model,
        core: &mut Vec<TermId>,
    ) -> Result<()>;
}

/// Dispatches projection across the registered plugins, then sweeps any
/// leftover variable by substituting its model value.
#[derive(Debug)]
pub struct MbpDriver {
    plugins: Vec<Box<dyn ProjectionPlugin>>,
}

impl Default for MbpDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MbpDriver {
    /// Driver with the bit-vector and arithmetic rule sets.
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: vec![Box::new(BvProjector), Box::new(ArithProjector)],
        }
    }

    /// Project `vars` out of `core` under `model`.
    pub fn apply(
        &self,
        tm: &mut TermManager,
        force: bool,
        vars: &[TermId],
        model: &Model,
        core: &mut Vec<TermId>,
    ) -> Result<()> {
        for plugin in &self.plugins {
            let mine: Vec<TermId> = vars
                .iter()
                .copied()
                .filter(|&v| plugin.handles(tm, v))
                .collect();
            if !mine.is_empty() {
                plugin.project(tm, force, &mine, model, core)?;
            }
        }
        // Anything still mentioned (booleans, plugin leftovers) is pinned to
        // its model value; under `force` a missing value is an error rather
        // than a silently surviving variable.
        let mut map: FxHashMap<TermId, TermId> = FxHashMap::default();
        for &v in vars {
            if !core.iter().any(|&c| traversal::occurs(tm, c, v)) {
                continue;
            }
            if !force {
                continue; // residual occurrences are allowed
            }
            match model.eval(tm, v) {
                Some(val) if val != v => {
                    map.insert(v, val);
                }
                _ => {
                    return Err(QsolveError::Unknown(format!(
                        "projection cannot eliminate {:?}",
                        tm.kind(v)
                    )));
                }
            }
        }
        if !map.is_empty() {
            for c in core.iter_mut() {
                *c = tm.substitute(*c, &map);
            }
        }
        core.retain(|&c| !matches!(tm.kind(c), TermKind::True));
        debug_assert!(
            core.iter()
                .all(|&c| model.eval_bool(tm, c).unwrap_or(true)),
            "projected core must hold in the model"
        );
        Ok(())
    }
}
