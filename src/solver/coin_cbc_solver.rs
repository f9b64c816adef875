// COIN-OR CBC Solver Adapter
// Implements the SolverService interface for CBC through good_lp (LP and MILP)

use crate::domain::{
    models::{Model, Solution, SolverConfig, SolverStatistics},
    solver_service::{Result, SolverError, SolverService},
    value_objects::{ConstraintType, OptimizationType, SolutionStatus, VariableType},
    LinearExpr,
};
use good_lp::{
    solvers::coin_cbc, variable, variables, Expression, ResolutionError,
    Solution as GoodLpSolutionTrait, SolverModel, Variable as GoodLpVariable,
};
use std::time::Instant;

pub struct CoinCbcSolver;

impl CoinCbcSolver {
    pub fn new() -> Self {
        Self
    }

    fn unsupported(feature: impl Into<String>) -> SolverError {
        SolverError::Unsupported {
            solver: "COIN-OR CBC".to_string(),
            feature: feature.into(),
        }
    }

    fn expression(expr: &LinearExpr, vars: &[GoodLpVariable]) -> Expression {
        let mut out: Expression = expr.constant.into();
        for (var, coeff) in expr.coefficients() {
            if coeff != 0.0 {
                out += coeff * vars[var.index()];
            }
        }
        out
    }
}

impl Default for CoinCbcSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for CoinCbcSolver {
    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<Solution> {
        self.validate(model)?;

        if model.is_quadratic() {
            return Err(Self::unsupported("quadratic objectives or constraints"));
        }

        let start_time = Instant::now();

        let mut vars = variables!();
        let mut lp_variables: Vec<GoodLpVariable> = Vec::with_capacity(model.num_variables());
        for var_def in model.variables() {
            let (lower, upper) = var_def.effective_bounds();
            let var = match var_def.variable_type {
                VariableType::Binary | VariableType::Integer => {
                    vars.add(variable().integer().min(lower).max(upper))
                }
                VariableType::Continuous | VariableType::Semidefinite => {
                    vars.add(variable().min(lower).max(upper))
                }
                VariableType::Semicontinuous => {
                    return Err(Self::unsupported(format!(
                        "semi-continuous variable '{}'",
                        var_def.name
                    )))
                }
            };
            lp_variables.push(var);
        }

        let objective = Self::expression(&model.objective().expr.linear, &lp_variables);
        let mut lp_model = match model.objective().optimization_type {
            OptimizationType::Maximize => vars.maximise(objective),
            OptimizationType::Minimize => vars.minimise(objective),
        }
        .using(coin_cbc::coin_cbc);

        if !config.verbose {
            lp_model.set_parameter("log", "0");
        }
        if let Some(limit) = config.time_limit {
            lp_model.set_parameter("sec", &limit.to_string());
        }
        if let Some(gap) = config.gap_tolerance {
            lp_model.set_parameter("ratioGap", &gap.to_string());
        }

        let rows = model
            .linear_constraints()
            .iter()
            .map(|c| (&c.expr, c.constraint_type, c.rhs))
            .chain(
                model
                    .quadratic_constraints()
                    .iter()
                    .map(|c| (&c.expr.linear, c.constraint_type, c.rhs)),
            );
        for (expr, kind, rhs) in rows {
            let lhs = Self::expression(expr, &lp_variables);
            lp_model = match kind {
                ConstraintType::LessThanOrEqual => lp_model.with(lhs.leq(rhs)),
                ConstraintType::Equal => lp_model.with(lhs.eq(rhs)),
                ConstraintType::GreaterThanOrEqual => lp_model.with(lhs.geq(rhs)),
            };
        }

        let solution_result = lp_model.solve();

        let mut statistics = SolverStatistics::for_model(model);
        statistics.solve_time_ms = start_time.elapsed().as_secs_f64() * 1000.0;

        let solution = match solution_result {
            Ok(sol) => {
                let values = lp_variables.iter().map(|&v| sol.value(v)).collect();
                Solution::with_point(SolutionStatus::Optimal, model, values)
            }
            Err(ResolutionError::Infeasible) => Solution::new(
                SolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            ),
            Err(ResolutionError::Unbounded) => Solution::new(
                SolutionStatus::Unbounded,
                "Problem is unbounded: objective can be improved infinitely",
            ),
            Err(e) => return Err(SolverError::ExecutionFailed(format!("{:?}", e))),
        };

        Ok(solution.with_statistics(statistics))
    }

    fn name(&self) -> &str {
        "COIN-OR CBC"
    }

    fn supports_mip(&self) -> bool {
        true
    }

    fn supports_quadratic(&self) -> bool {
        false
    }
}
