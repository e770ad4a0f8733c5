//! Prenex machinery.
//!
//! [`prenex`] hoists every quantifier of a closed formula to the front,
//! opening each block's bound constants (renaming only on clashes) and
//! returning the alternation blocks together with the quantifier-free matrix.
//! The engine's hoister adapter lays the blocks out as its level structure.

use crate::ast::{traversal, TermId, TermKind, TermManager};
use crate::error::{QsolveError, Result};
use crate::rewrite::push_not;
use rustc_hash::{FxHashMap, FxHashSet};

/// A maximal block of equally-quantified variables.
#[derive(Debug, Clone)]
pub struct QuantBlock {
    /// Universal if true.
    pub is_forall: bool,
    /// The block's variables, opened as free constants.
    pub vars: Vec<TermId>,
}

/// Result of prenex normalization.
#[derive(Debug, Clone)]
pub struct PrenexForm {
    /// Alternation blocks, outermost first. Adjacent blocks have opposite
    /// polarity and no block is empty.
    pub blocks: Vec<QuantBlock>,
    /// The quantifier-free matrix over free and block constants.
    pub matrix: TermId,
}

/// Open a quantifier: its bound constants become free in the returned body.
/// A constant already in `used` (free elsewhere, or bound by an enclosing
/// block) is replaced by a fresh constant named after it; otherwise the
/// original constant is kept so witnesses and answers stay readable.
/// Non-quantifier inputs come back unchanged with an empty block.
pub fn extract_bound_vars(
    tm: &mut TermManager,
    q: TermId,
    used: &mut FxHashSet<TermId>,
) -> (Vec<TermId>, TermId) {
    let TermKind::Quantifier { vars, body, .. } = tm.kind(q).clone() else {
        return (Vec::new(), q);
    };
    let mut map = FxHashMap::default();
    let mut opened = Vec::with_capacity(vars.len());
    for &v in &vars {
        let c = if used.insert(v) {
            v
        } else {
            let TermKind::Var { name, sort } = tm.kind(v).clone() else {
                unreachable!("bound variables are uninterpreted constants");
            };
            let c = tm.mk_fresh_const(&name, sort);
            used.insert(c);
            map.insert(v, c);
            c
        };
        opened.push(c);
    }
    let inst = if map.is_empty() {
        body
    } else {
        tm.substitute(body, &map)
    };
    (opened, inst)
}

/// Prenex-normalize `f`. Quantifiers may appear under `not`, `and`, `or` and
/// `implies`; a quantifier nested under any other connective is rejected.
pub fn prenex(tm: &mut TermManager, f: TermId) -> Result<PrenexForm> {
    let mut used: FxHashSet<TermId> = traversal::collect_free_consts(tm, f).into_iter().collect();
    let (blocks, matrix) = walk(tm, f, false, &mut used)?;
    let mut merged: Vec<QuantBlock> = Vec::new();
    for b in blocks {
        if b.vars.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.is_forall == b.is_forall => last.vars.extend(b.vars),
            _ => merged.push(b),
        }
    }
    tracing::debug!(blocks = merged.len(), "prenexed quantifier prefix");
    Ok(PrenexForm {
        blocks: merged,
        matrix,
    })
}

fn walk(
    tm: &mut TermManager,
    t: TermId,
    negated: bool,
    used: &mut FxHashSet<TermId>,
) -> Result<(Vec<QuantBlock>, TermId)> {
    if !traversal::has_quantifier(tm, t) {
        let matrix = if negated { push_not(tm, t) } else { t };
        return Ok((Vec::new(), matrix));
    }
    match tm.kind(t).clone() {
        TermKind::Not(a) => walk(tm, a, !negated, used),
        TermKind::Quantifier { is_forall, .. } => {
            let (vars, body) = extract_bound_vars(tm, t, used);
            let (mut blocks, matrix) = walk(tm, body, negated, used)?;
            blocks.insert(
                0,
                QuantBlock {
                    is_forall: is_forall != negated,
                    vars,
                },
            );
            Ok((blocks, matrix))
        }
        TermKind::And(args) | TermKind::Or(args) => {
            let was_and = matches!(tm.kind(t), TermKind::And(_));
            let mut blocks = Vec::new();
            let mut parts = Vec::with_capacity(args.len());
            for &a in args.iter() {
                let (bs, m) = walk(tm, a, negated, used)?;
                blocks.extend(bs);
                parts.push(m);
            }
            let matrix = if was_and != negated {
                tm.mk_and(parts)
            } else {
                tm.mk_or(parts)
            };
            Ok((blocks, matrix))
        }
        TermKind::Implies(a, b) => {
            let na = tm.mk_not(a);
            let or = tm.mk_or(vec![na, b]);
            walk(tm, or, negated, used)
        }
        other => Err(QsolveError::Unsupported(format!(
            "quantifier nested under {other:?} cannot be prenexed"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternation_blocks_come_out_in_order() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let y = tm.mk_var("y", int);
        let one = tm.mk_int(1);
        let x1 = tm.mk_add(vec![x, one]);
        let eq = tm.mk_eq(y, x1);
        let ex = tm.mk_exists([("y", int)], eq);
        let fa = tm.mk_forall([("x", int)], ex);
        let pf = prenex(&mut tm, fa).unwrap();
        assert_eq!(pf.blocks.len(), 2);
        assert!(pf.blocks[0].is_forall);
        assert!(!pf.blocks[1].is_forall);
        assert!(!traversal::has_quantifier(&tm, pf.matrix));
    }

    #[test]
    fn negation_flips_block_polarity() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let zero = tm.mk_int(0);
        let body = tm.mk_ge(x, zero);
        let ex = tm.mk_exists([("x", int)], body);
        let neg = tm.mk_not(ex);
        let pf = prenex(&mut tm, neg).unwrap();
        assert_eq!(pf.blocks.len(), 1);
        assert!(pf.blocks[0].is_forall);
    }

    #[test]
    fn conjoined_prefixes_concatenate() {
        let mut tm = TermManager::new();
        let int = tm.sorts.int_sort;
        let x = tm.mk_var("x", int);
        let y = tm.mk_var("y", int);
        let zero = tm.mk_int(0);
        let gx = tm.mk_ge(x, zero);
        let gy = tm.mk_ge(y, zero);
        let qx = tm.mk_forall([("x", int)], gx);
        let qy = tm.mk_forall([("y", int)], gy);
        let conj = tm.mk_and(vec![qx, qy]);
        let pf = prenex(&mut tm, conj).unwrap();
        assert_eq!(pf.blocks.len(), 1);
        assert_eq!(pf.blocks[0].vars.len(), 2);
    }
}
