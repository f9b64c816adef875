// Application layer: problem compiler, orchestration and tool operations

pub mod constraints;
pub mod expression_builder;
pub mod objective;
pub mod orchestrator;
pub mod problem;
pub mod registry;
pub mod spec;
pub mod tool_service;

pub use orchestrator::{normalize, SolveFailure, SolveOrchestrator, SolveResult};
pub use problem::{BuildState, Capabilities, OptimizationProblem, NO_MODEL_MESSAGE};
pub use registry::VariableRegistry;
pub use spec::ProblemSpec;
pub use tool_service::{OptimizationTool, SolverInfo, ToolOutput, ValidationReport};
