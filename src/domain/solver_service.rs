// Domain service interface for solving built models
// Defines the contract that any external solver adapter must follow

use super::models::{Model, Solution, SolverConfig};

/// Error types for the solver service
#[derive(Debug, Clone, thiserror::Error)]
pub enum SolverError {
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),

    #[error("Solver execution failed: {0}")]
    ExecutionFailed(String),

    #[error("{solver} does not support {feature}")]
    Unsupported { solver: String, feature: String },

    #[error("Non-convex {0}: the quadratic part is not positive semidefinite")]
    NonConvex(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Domain service interface for optimization solvers
///
/// Adapters translate a built [`Model`] into their native API, run it and
/// report the terminal status with the variable values in column order.
pub trait SolverService: Send + Sync {
    /// Solve a built model
    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<Solution>;

    /// Validate a model without solving it
    fn validate(&self, model: &Model) -> Result<()> {
        let mut errors = Vec::new();

        for (i, var) in model.variables().iter().enumerate() {
            if var.lower_bound.is_nan() || var.upper_bound.is_nan() {
                errors.push(format!("Variable {} '{}' has a NaN bound", i, var.name));
            } else if var.lower_bound > var.upper_bound {
                errors.push(format!(
                    "Variable {} '{}' has lower bound ({}) > upper bound ({})",
                    i, var.name, var.lower_bound, var.upper_bound
                ));
            }
        }

        for constraint in model.linear_constraints() {
            if constraint.rhs.is_nan() || constraint.expr.terms.iter().any(|(_, c)| c.is_nan()) {
                errors.push(format!("Constraint '{}' has a NaN coefficient", constraint.name));
            }
        }

        for constraint in model.quadratic_constraints() {
            let expr = &constraint.expr;
            if expr.quadratic.iter().any(|t| t.coefficient.is_nan())
                || expr.linear.terms.iter().any(|(_, c)| c.is_nan())
                || expr.linear.constant.is_nan()
            {
                errors.push(format!(
                    "Quadratic constraint '{}' has a NaN coefficient",
                    constraint.name
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SolverError::InvalidProblem(errors.join("; ")))
        }
    }

    /// Get the name of this solver backend
    fn name(&self) -> &str;

    /// Check if this solver supports mixed-integer programming
    fn supports_mip(&self) -> bool;

    /// Check if this solver accepts quadratic objectives and constraints
    fn supports_quadratic(&self) -> bool;
}
