//! qsolve-core - Terms, Sorts and Models for the qsolve engine
//!
//! This crate provides the foundational types for the quantifier
//! satisfiability engine:
//! - Hash-consed terms with cheap [`TermId`] references
//! - Sort table for type checking
//! - Models with a worklist evaluator
//! - Negation pushing and prenex normalization
//!
//! # Examples
//!
//! ## Creating terms
//!
//! ```
//! use qsolve_core::ast::TermManager;
//!
//! let mut tm = TermManager::new();
//!
//! // Boolean terms
//! let p = tm.mk_var("p", tm.sorts.bool_sort);
//! let q = tm.mk_var("q", tm.sorts.bool_sort);
//! let and_pq = tm.mk_and(vec![p, q]);
//!
//! // Integer terms
//! let x = tm.mk_var("x", tm.sorts.int_sort);
//! let five = tm.mk_int(5);
//! let ge = tm.mk_ge(x, five);
//! ```
//!
//! ## Prenex normalization
//!
//! ```
//! use qsolve_core::ast::TermManager;
//! use qsolve_core::quant::prenex;
//!
//! let mut tm = TermManager::new();
//! let int = tm.sorts.int_sort;
//! let x = tm.mk_var("x", int);
//! let zero = tm.mk_int(0);
//! let body = tm.mk_ge(x, zero);
//! let fml = tm.mk_forall([("x", int)], body);
//! let pf = prenex(&mut tm, fml).unwrap();
//! assert_eq!(pf.blocks.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ast;
pub mod config;
pub mod error;
pub mod model;
pub mod quant;
pub mod rewrite;
pub mod sort;
pub mod statistics;
pub mod tactic;

pub use ast::{Term, TermId, TermKind, TermManager};
pub use config::SolverConfig;
pub use error::{QsolveError, Result};
pub use model::Model;
pub use quant::{extract_bound_vars, prenex, PrenexForm, QuantBlock};
pub use rewrite::push_not;
pub use sort::{SortId, SortKind, SortStore};
pub use statistics::Statistics;
pub use tactic::{Goal, TacticResult};
