//! qsolve-solver - Ground kernel and quantifier engine
//!
//! Two layers live here:
//! - A ground SMT [`Kernel`]: SAT core plus theory modules for linear
//!   integer arithmetic, fixed-width bit-vectors and uninterpreted
//!   functions, with assumption-based checks, models and unsat cores.
//! - The [`qsat`] engine: predicate abstraction, the alternating-level
//!   search game between two kernels, and model-based projection.
//!
//! # Example
//!
//! ```
//! use qsolve_core::ast::TermManager;
//! use qsolve_core::SolverConfig;
//! use qsolve_solver::qsat::{Qsat, SatOutcome};
//!
//! let mut tm = TermManager::new();
//! let int = tm.sorts.int_sort;
//! let x = tm.mk_var("x", int);
//! let y = tm.mk_var("y", int);
//! let one = tm.mk_int(1);
//! let x1 = tm.mk_add(vec![x, one]);
//! let eq = tm.mk_eq(y, x1);
//! let ex = tm.mk_exists([("y", int)], eq);
//! let fml = tm.mk_forall([("x", int)], ex);
//!
//! let mut engine = Qsat::qsat(SolverConfig::default());
//! let outcome = engine.check(&mut tm, fml).unwrap();
//! assert!(matches!(outcome, SatOutcome::Sat(_)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cnf;
pub mod kernel;
pub mod qsat;
pub mod sat;
pub mod theory;

pub use kernel::{Kernel, KernelResult};
pub use qsat::{Qsat, QsatTactic, SatOutcome};
