// HiGHS Solver Adapter
// Implements the SolverService interface for HiGHS (LP and MILP)
// Translates a built model into a HiGHS row problem

use crate::domain::{
    models::{Model, Solution, SolverConfig, SolverStatistics},
    solver_service::{Result, SolverError, SolverService},
    value_objects::{ConstraintType, OptimizationType, SolutionStatus, VariableType},
    LinearExpr, VarId,
};
use highs::{Col, HighsModelStatus, RowProblem, Sense};
use std::time::Instant;
use tracing::debug;

/// Primal feasibility tolerance, matching the HiGHS default
const FEASIBILITY_TOL: f64 = 1e-6;

pub struct HighsSolver;

impl HighsSolver {
    pub fn new() -> Self {
        Self
    }

    fn unsupported(feature: impl Into<String>) -> SolverError {
        SolverError::Unsupported {
            solver: "HiGHS".to_string(),
            feature: feature.into(),
        }
    }

    fn add_row(pb: &mut RowProblem, cols: &[Col], expr: &LinearExpr, kind: ConstraintType, rhs: f64) {
        let terms: Vec<(Col, f64)> = expr
            .coefficients()
            .into_iter()
            .filter(|&(_, coef)| coef != 0.0)
            .map(|(var, coef)| (cols[var.index()], coef))
            .collect();
        let bound = rhs - expr.constant;

        match kind {
            ConstraintType::LessThanOrEqual => {
                pb.add_row(..=bound, &terms);
            }
            ConstraintType::Equal => {
                pb.add_row(bound..=bound, &terms);
            }
            ConstraintType::GreaterThanOrEqual => {
                pb.add_row(bound.., &terms);
            }
        }
    }

    /// One column per model variable; semi-continuous variables get an
    /// extra binary switch column and two linking rows.
    fn add_columns(pb: &mut RowProblem, model: &Model) -> Result<Vec<Col>> {
        let objective = model.objective().expr.linear.coefficients();
        let mut cols = Vec::with_capacity(model.num_variables());
        let mut switches = Vec::new();

        for (i, var) in model.variables().iter().enumerate() {
            let coef = objective.get(&VarId(i)).copied().unwrap_or(0.0);
            let (lower, upper) = var.effective_bounds();

            let col = match var.variable_type {
                VariableType::Integer | VariableType::Binary => {
                    pb.add_integer_column(coef, lower..=upper)
                }
                VariableType::Continuous | VariableType::Semidefinite => {
                    pb.add_column(coef, lower..=upper)
                }
                VariableType::Semicontinuous => {
                    if upper.is_infinite() {
                        return Err(Self::unsupported(format!(
                            "semi-continuous variable '{}' without a finite upper bound",
                            var.name
                        )));
                    }
                    switches.push((i, lower, upper));
                    pb.add_column(coef, lower.min(0.0)..=upper.max(0.0))
                }
            };
            cols.push(col);
        }

        // x - ub*z <= 0 and x - lb*z >= 0 with z binary
        for (i, lower, upper) in switches {
            let z = pb.add_integer_column(0.0, 0.0..=1.0);
            pb.add_row(..=0.0, &[(cols[i], 1.0), (z, -upper)]);
            pb.add_row(0.0.., &[(cols[i], 1.0), (z, -lower)]);
        }

        Ok(cols)
    }

    /// HiGHS fills the column values with zeros when it stopped before
    /// finding any feasible point, so a time-limited result is only a point
    /// if it actually satisfies the model.
    fn incumbent(status: SolutionStatus, model: &Model, values: Vec<f64>) -> Solution {
        if status == SolutionStatus::TimeLimit && !model.is_feasible_point(&values, FEASIBILITY_TOL) {
            return Solution::new(status, "Time limit reached before a feasible point was found");
        }
        Solution::with_point(status, model, values)
    }
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for HighsSolver {
    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<Solution> {
        self.validate(model)?;

        if model.objective().expr.has_quadratic() {
            return Err(Self::unsupported("quadratic objectives"));
        }
        if let Some(c) = model
            .quadratic_constraints()
            .iter()
            .find(|c| c.expr.has_quadratic())
        {
            return Err(Self::unsupported(format!("quadratic constraint '{}'", c.name)));
        }

        let start_time = Instant::now();

        let mut pb = RowProblem::default();
        let cols = Self::add_columns(&mut pb, model)?;

        for constraint in model.linear_constraints() {
            Self::add_row(
                &mut pb,
                &cols,
                &constraint.expr,
                constraint.constraint_type,
                constraint.rhs,
            );
        }
        // quadratic constraints without a quadratic part are plain rows
        for constraint in model.quadratic_constraints() {
            Self::add_row(
                &mut pb,
                &cols,
                &constraint.expr.linear,
                constraint.constraint_type,
                constraint.rhs,
            );
        }

        let sense = if model.objective().optimization_type == OptimizationType::Maximize {
            Sense::Maximise
        } else {
            Sense::Minimise
        };

        let mut highs_model = pb.optimise(sense);
        if !config.verbose {
            highs_model.make_quiet();
        }
        if let Some(limit) = config.time_limit {
            highs_model.set_option("time_limit", limit);
        }
        if let Some(gap) = config.gap_tolerance {
            highs_model.set_option("mip_rel_gap", gap);
        }

        let solved = highs_model
            .try_solve()
            .map_err(|status| SolverError::ExecutionFailed(format!("HiGHS returned {:?}", status)))?;

        let mut statistics = SolverStatistics::for_model(model);
        statistics.solve_time_ms = start_time.elapsed().as_secs_f64() * 1000.0;

        let status = match solved.status() {
            HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => SolutionStatus::Optimal,
            HighsModelStatus::Infeasible => SolutionStatus::Infeasible,
            HighsModelStatus::Unbounded => SolutionStatus::Unbounded,
            HighsModelStatus::UnboundedOrInfeasible => SolutionStatus::InfeasibleOrUnbounded,
            HighsModelStatus::ReachedTimeLimit => SolutionStatus::TimeLimit,
            HighsModelStatus::ReachedIterationLimit => SolutionStatus::IterationLimit,
            other => {
                debug!(status = ?other, "HiGHS finished without a definitive status");
                SolutionStatus::Unknown
            }
        };

        let solution = match status {
            SolutionStatus::Optimal | SolutionStatus::TimeLimit => {
                // switch columns come last
                let mut values = solved.get_solution().columns().to_vec();
                values.truncate(model.num_variables());
                Self::incumbent(status, model, values)
            }
            SolutionStatus::Infeasible => Solution::new(
                status,
                "Problem is infeasible: no solution satisfies all constraints",
            ),
            SolutionStatus::Unbounded | SolutionStatus::InfeasibleOrUnbounded => Solution::new(
                status,
                "Problem is unbounded: objective can be improved infinitely",
            ),
            _ => Solution::new(status, format!("HiGHS stopped with status {}", status)),
        };

        Ok(solution.with_statistics(statistics))
    }

    fn name(&self) -> &str {
        "HiGHS"
    }

    fn supports_mip(&self) -> bool {
        true
    }

    fn supports_quadratic(&self) -> bool {
        false
    }
}
