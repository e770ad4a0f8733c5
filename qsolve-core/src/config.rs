//! Resource configuration.

/// Knobs bounding the kernel and the quantifier engine. The defaults are
/// generous; every limit turns an exhaustive search into an `unknown` answer
/// rather than a wrong one.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Produce models on satisfiable checks.
    pub produce_models: bool,
    /// Request proof production. The engine has no proof mode and declines
    /// such sessions up front.
    pub produce_proofs: bool,
    /// Maximum SAT/theory interaction rounds per kernel check.
    pub max_theory_rounds: u32,
    /// Node budget for the integer sample search in the arithmetic theory.
    pub max_branch_nodes: u64,
    /// Largest bit-vector assignment space enumerated exhaustively.
    pub bv_enum_limit: u64,
    /// Maximum rounds of the alternating search loop (0 = unbounded).
    pub max_rounds: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            produce_models: true,
            produce_proofs: false,
            max_theory_rounds: 10_000,
            max_branch_nodes: 50_000,
            bv_enum_limit: 1 << 20,
            max_rounds: 0,
        }
    }
}
