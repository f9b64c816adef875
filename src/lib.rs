// Domain layer: expressions, model container and the solver contract
pub mod domain;

// Application layer: JSON problem compiler, solve orchestration, agent tools
pub mod application;

// LP text writer and reader
pub mod lp_format;

// Solver adapters: concrete implementations of SolverService
pub mod solver;

// Infrastructure layer: stdio tool server and logging
pub mod infrastructure;

// Re-export commonly used types
pub use domain::{
    BuildError, ConstraintType, Model, OptimizationType, ProblemType, Solution, SolutionStatus,
    SolverBackend, SolverConfig, SolverError, SolverService, VariableType,
};

pub use application::{
    OptimizationProblem, OptimizationTool, ProblemSpec, SolveFailure, SolveOrchestrator,
    SolveResult, ToolOutput,
};

pub use infrastructure::{start_server, LoggingConfig, ServerConfig};

pub use solver::{ClarabelSolver, HighsSolver, SolverFactory};

#[cfg(feature = "coin_cbc")]
pub use solver::CoinCbcSolver;
