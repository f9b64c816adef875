// Solve orchestrator: dispatch, build, solve and normalize one request

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::problem::OptimizationProblem;
use super::spec::ProblemSpec;
use crate::domain::{
    BuildError, ConstraintType, Model, Solution, SolutionStatus, SolveOutcome, SolverConfig,
    SolverError, SolverStatistics,
};
use crate::solver::SolverFactory;

/// Normalized result of a successful solve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveResult {
    pub status: i32,
    pub objective_value: f64,
    /// Values keyed by display name
    pub solution: BTreeMap<String, f64>,
}

/// Why a request produced no usable solution.
///
/// `Display` gives the human-readable message returned to callers.
#[derive(Debug, Clone, Error)]
pub enum SolveFailure {
    #[error("Error: Model creation failed. {0}")]
    Build(#[from] BuildError),

    #[error(
        "Error: Optimization failed with status {} ({}). Please check the problem definition.",
        .status.code(),
        .status
    )]
    Optimization { status: SolutionStatus },

    #[error("Error: Solver failed. {0}")]
    Solver(#[from] SolverError),
}

impl SolveFailure {
    /// Status code for solver-side failures, `None` when nothing was solved
    pub fn status_code(&self) -> Option<i32> {
        match self {
            SolveFailure::Optimization { status } => Some(status.code()),
            _ => None,
        }
    }
}

/// A model without variables has nothing to hand to a backend
fn solve_empty(model: &Model) -> Solution {
    let satisfied = |value: f64, kind: ConstraintType, rhs: f64| match kind {
        ConstraintType::LessThanOrEqual => value <= rhs,
        ConstraintType::GreaterThanOrEqual => value >= rhs,
        ConstraintType::Equal => value == rhs,
    };
    let feasible = model
        .linear_constraints()
        .iter()
        .all(|c| satisfied(c.expr.constant, c.constraint_type, c.rhs))
        && model
            .quadratic_constraints()
            .iter()
            .all(|c| satisfied(c.expr.linear.constant, c.constraint_type, c.rhs));

    let solution = if feasible {
        Solution::with_point(SolutionStatus::Optimal, model, Vec::new())
    } else {
        Solution::new(SolutionStatus::Infeasible, "Constant constraints are violated")
    };
    solution.with_statistics(SolverStatistics::for_model(model))
}

/// Map a backend solution onto the caller-facing result
pub fn normalize(model: &Model, solution: &Solution) -> Result<SolveResult, SolveFailure> {
    match solution.status.outcome() {
        SolveOutcome::Optimal | SolveOutcome::TimeLimitReached => {}
        _ => {
            return Err(SolveFailure::Optimization {
                status: solution.status,
            })
        }
    }

    let objective_value = match solution.objective_value {
        Some(value) if solution.has_point() || model.num_variables() == 0 => value,
        // time limit without an incumbent
        _ => {
            return Err(SolveFailure::Optimization {
                status: solution.status,
            })
        }
    };

    let values = model
        .variables()
        .iter()
        .zip(&solution.variable_values)
        .map(|(var, &value)| (var.name.clone(), value))
        .collect();

    Ok(SolveResult {
        status: solution.status.code(),
        objective_value,
        solution: values,
    })
}

/// Runs requests end to end with one solver configuration
#[derive(Debug, Clone, Default)]
pub struct SolveOrchestrator {
    config: SolverConfig,
}

impl SolveOrchestrator {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve a built model with the configured backend
    pub fn solve_model(&self, model: &Model) -> Result<Solution, SolverError> {
        if model.num_variables() == 0 {
            debug!(model = model.name(), "empty model answered without a backend");
            return Ok(solve_empty(model));
        }

        let solver = SolverFactory::create_solver(model, &self.config)?;
        debug!(model = model.name(), solver = solver.name(), "invoking solver");
        solver.validate(model)?;
        let solution = solver.solve(model, &self.config)?;
        debug!(
            model = model.name(),
            status = %solution.status,
            solve_time_ms = solution.statistics.solve_time_ms,
            integer_vars = solution.statistics.num_integer_vars,
            "solver finished"
        );
        Ok(solution)
    }

    /// Build (if needed) and solve a dispatched problem
    pub fn solve_problem(
        &self,
        problem: &mut OptimizationProblem,
    ) -> Result<SolveResult, SolveFailure> {
        let model = problem.build()?;
        let solution = self.solve_model(model)?;
        normalize(model, &solution)
    }

    /// Dispatch on `problem.type`, build, solve and normalize
    pub fn solve(&self, spec: ProblemSpec) -> Result<SolveResult, SolveFailure> {
        let start = Instant::now();
        let mut problem = OptimizationProblem::from_spec(spec)?;
        info!(
            problem = problem.name(),
            problem_type = %problem.problem_type(),
            "solving"
        );

        let result = self.solve_problem(&mut problem);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(r) => info!(problem = problem.name(), status = r.status, elapsed_ms, "solved"),
            Err(e) => info!(problem = problem.name(), error = %e, elapsed_ms, "solve failed"),
        }
        result
    }

    /// [`solve`](Self::solve) on raw JSON
    pub fn solve_json(&self, value: serde_json::Value) -> Result<SolveResult, SolveFailure> {
        self.solve(ProblemSpec::from_json(value)?)
    }
}
