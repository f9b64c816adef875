// Agent-facing tool operations on top of the orchestrator

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::orchestrator::{SolveFailure, SolveOrchestrator, SolveResult};
use super::problem::OptimizationProblem;
use super::spec::ProblemSpec;
use crate::domain::{SolverBackend, SolverConfig};
use crate::solver::SolverFactory;

/// What `solve` hands back: the result object or the error message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Solved(SolveResult),
    Message(String),
}

impl From<Result<SolveResult, SolveFailure>> for ToolOutput {
    fn from(result: Result<SolveResult, SolveFailure>) -> Self {
        match result {
            Ok(solved) => ToolOutput::Solved(solved),
            Err(failure) => ToolOutput::Message(failure.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub num_variables: u32,
    pub num_constraints: u32,
    pub num_quadratic_constraints: u32,
    pub num_integer_vars: u32,
    pub estimated_difficulty: f64,
}

impl ValidationReport {
    fn invalid(error: String) -> Self {
        Self {
            is_valid: false,
            errors: vec![error],
            warnings: Vec::new(),
            num_variables: 0,
            num_constraints: 0,
            num_quadratic_constraints: 0,
            num_integer_vars: 0,
            estimated_difficulty: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverInfo {
    pub name: String,
    pub version: String,
    pub supports_mip: bool,
    pub supports_quadratic: bool,
    pub capabilities: Vec<String>,
}

fn solver_info(backend: SolverBackend) -> SolverInfo {
    let (version, capabilities): (&str, &[&str]) = match backend {
        SolverBackend::Highs | SolverBackend::Auto => (
            "1.7+",
            &[
                "Linear Programming",
                "Mixed-Integer Programming",
                "Semi-continuous Variables",
                "Primal/Dual Simplex",
                "Interior Point Method",
                "Presolve",
            ],
        ),
        SolverBackend::Clarabel => (
            "0.10+",
            &[
                "Linear Programming",
                "Convex Quadratic Programming",
                "Convex Quadratically Constrained Programming",
                "Mixed-Integer Convex QP/QCP (branch and bound)",
                "Interior Point Method",
            ],
        ),
        SolverBackend::CoinCbc => (
            "2.10+",
            &[
                "Mixed-Integer Programming",
                "Branch and Bound",
                "Cutting Planes",
                "Primal/Dual Simplex",
            ],
        ),
    };
    SolverInfo {
        name: backend.to_string(),
        version: version.to_string(),
        supports_mip: true,
        supports_quadratic: matches!(backend, SolverBackend::Clarabel),
        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
    }
}

/// Tool-call arguments carry the problem under `problem`
fn problem_argument(arguments: &Value) -> Result<Value, String> {
    arguments
        .get("problem")
        .cloned()
        .ok_or_else(|| "Error: Missing required argument 'problem'.".to_string())
}

/// Optimization tools as exposed to an agent
#[derive(Debug, Clone, Default)]
pub struct OptimizationTool {
    orchestrator: Arc<SolveOrchestrator>,
}

impl OptimizationTool {
    pub const TOOLS: [&'static str; 4] = ["solve", "validate", "export_lp", "list_solvers"];

    pub fn new(config: SolverConfig) -> Self {
        Self {
            orchestrator: Arc::new(SolveOrchestrator::new(config)),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        self.orchestrator.config()
    }

    /// Build and solve; the solve runs on the blocking pool
    pub async fn solve(&self, problem: Value) -> ToolOutput {
        let orchestrator = Arc::clone(&self.orchestrator);
        match tokio::task::spawn_blocking(move || orchestrator.solve_json(problem)).await {
            Ok(result) => result.into(),
            Err(e) => {
                warn!(error = %e, "solve task did not complete");
                ToolOutput::Message(format!("Error: Solver failed. {}", e))
            }
        }
    }

    /// Dispatch and build without solving
    pub async fn validate(&self, problem: Value) -> ValidationReport {
        let spec = match ProblemSpec::from_json(problem) {
            Ok(spec) => spec,
            Err(e) => return ValidationReport::invalid(e.to_string()),
        };
        let mut problem = match OptimizationProblem::from_spec(spec) {
            Ok(problem) => problem,
            Err(e) => return ValidationReport::invalid(e.to_string()),
        };
        let model = match problem.build() {
            Ok(model) => model,
            Err(e) => return ValidationReport::invalid(e.to_string()),
        };

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        match SolverFactory::create_solver(model, self.config()) {
            Ok(solver) => {
                if let Err(e) = solver.validate(model) {
                    errors.push(e.to_string());
                }
                if model.is_mixed_integer() && !solver.supports_mip() {
                    errors.push(format!(
                        "{} cannot handle integer, binary or semi-continuous variables",
                        solver.name()
                    ));
                }
                if model.is_quadratic() && !solver.supports_quadratic() {
                    errors.push(format!(
                        "{} cannot handle quadratic objectives or constraints",
                        solver.name()
                    ));
                }
            }
            Err(e) => errors.push(e.to_string()),
        }

        if model.num_constraints() + model.num_quadratic_constraints() == 0 {
            warnings.push("Problem has no constraints (may be unbounded)".to_string());
        }
        let num_integer = model.num_integer_variables();
        if num_integer > 100 {
            warnings.push(format!(
                "Problem has {} integer variables, may be slow to solve",
                num_integer
            ));
        }

        let estimated_difficulty = if model.is_mixed_integer() {
            (num_integer as f64 / 1000.0).min(1.0)
        } else {
            (model.num_variables() as f64 / 10000.0).min(0.5)
        };

        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            num_variables: model.num_variables() as u32,
            num_constraints: model.num_constraints() as u32,
            num_quadratic_constraints: model.num_quadratic_constraints() as u32,
            num_integer_vars: num_integer as u32,
            estimated_difficulty,
        }
    }

    /// LP text of the built model, or why there is none
    pub async fn export_lp(&self, problem: Value) -> String {
        let mut problem = match ProblemSpec::from_json(problem).and_then(OptimizationProblem::from_spec) {
            Ok(problem) => problem,
            Err(e) => return SolveFailure::Build(e).to_string(),
        };
        // a failed build leaves no model; the export reports that itself
        let _ = problem.build();
        match problem.problem_as_lp() {
            Ok(text) => text,
            Err(e) => format!("Error: Could not export model. {}", e),
        }
    }

    pub fn list_solvers(&self) -> Vec<SolverInfo> {
        SolverFactory::available().into_iter().map(solver_info).collect()
    }

    /// Run a tool by name
    pub async fn call(&self, tool: &str, arguments: &Value) -> Result<Value, String> {
        debug!(tool, "tool call");
        let output = match tool {
            "solve" => serde_json::to_value(self.solve(problem_argument(arguments)?).await),
            "validate" => serde_json::to_value(self.validate(problem_argument(arguments)?).await),
            "export_lp" => serde_json::to_value(self.export_lp(problem_argument(arguments)?).await),
            "list_solvers" => serde_json::to_value(self.list_solvers()),
            other => return Err(format!("Error: Unknown tool '{}'.", other)),
        };
        output.map_err(|e| format!("Error: Could not encode tool output. {}", e))
    }
}
