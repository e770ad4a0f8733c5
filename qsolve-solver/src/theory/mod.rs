//! Theory layer.
//!
//! Each module decides conjunctions of theory literals handed over by the
//! kernel after a propositionally satisfying assignment. Satisfiable answers
//! always carry a concrete assignment; unsatisfiable answers come only from
//! exact reasoning, everything else is `Unknown`.

pub mod bv;
pub mod euf;
pub mod lia;

use qsolve_core::ast::{TermId, TermKind, TermManager};
use qsolve_core::sort::SortKind;

/// Which theory owns an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TheoryKind {
    /// Linear integer arithmetic.
    Arith,
    /// Fixed-width bit-vectors.
    Bv,
    /// Equality over uninterpreted sorts and functions.
    Euf,
}

/// Classify an atom by its head and argument sorts.
#[must_use]
pub fn atom_theory(tm: &TermManager, atom: TermId) -> Option<TheoryKind> {
    match tm.kind(atom) {
        TermKind::Le(..)
        | TermKind::Lt(..)
        | TermKind::Ge(..)
        | TermKind::Gt(..)
        | TermKind::Divides { .. } => Some(TheoryKind::Arith),
        TermKind::BvUle(..) | TermKind::BvUlt(..) => Some(TheoryKind::Bv),
        TermKind::Eq(a, _) => arg_theory(tm, *a),
        TermKind::Distinct(args) => args.first().and_then(|&a| arg_theory(tm, a)),
        TermKind::App { .. } => Some(TheoryKind::Euf),
        _ => None,
    }
}

fn arg_theory(tm: &TermManager, arg: TermId) -> Option<TheoryKind> {
    match tm.sorts.kind(tm.sort_of(arg)) {
        SortKind::Int => Some(TheoryKind::Arith),
        SortKind::BitVec(_) => Some(TheoryKind::Bv),
        SortKind::Uninterpreted(_) => Some(TheoryKind::Euf),
        SortKind::Bool => None,
    }
}
