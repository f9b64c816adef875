// Clarabel Solver Adapter
// Implements the SolverService interface for Clarabel (convex QP and QCP)
// Quadratic constraints become rotated second-order cones; integer and
// semi-continuous columns go through branch and bound on the relaxations

use crate::domain::{
    models::{Model, Solution, SolverConfig, SolverStatistics},
    solver_service::{Result, SolverError, SolverService},
    value_objects::{ConstraintType, OptimizationType, SolutionStatus},
    LinearExpr, QuadraticConstraint,
};
use crate::solver::branch_and_bound;
use crate::solver::linalg::SymmetricBlock;
use clarabel::algebra::CscMatrix;
use clarabel::solver::implementations::default::DefaultSettingsBuilder;
use clarabel::solver::SupportedConeT::{self, NonnegativeConeT, SecondOrderConeT, ZeroConeT};
use clarabel::solver::{DefaultSolver, IPSolver, SolverStatus};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

/// Constraint matrix built row by row with its cone list
struct ConicRows {
    columns: Vec<Vec<(usize, f64)>>,
    b: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
}

impl ConicRows {
    fn new(n_cols: usize) -> Self {
        Self {
            columns: vec![Vec::new(); n_cols],
            b: Vec::new(),
            cones: Vec::new(),
        }
    }

    fn push_row(&mut self, row: &BTreeMap<usize, f64>, b: f64) {
        let index = self.b.len();
        for (&col, &value) in row {
            if value != 0.0 {
                self.columns[col].push((index, value));
            }
        }
        self.b.push(b);
    }

    /// Append a cone, merging runs of zero and nonnegative rows
    fn push_cone(&mut self, cone: SupportedConeT<f64>) {
        match (self.cones.last_mut(), cone) {
            (Some(ZeroConeT(a)), ZeroConeT(b)) => *a += b,
            (Some(NonnegativeConeT(a)), NonnegativeConeT(b)) => *a += b,
            (_, cone) => self.cones.push(cone),
        }
    }

    fn nonnegative(&mut self, row: &BTreeMap<usize, f64>, b: f64) {
        self.push_row(row, b);
        self.push_cone(NonnegativeConeT(1));
    }

    fn zero(&mut self, row: &BTreeMap<usize, f64>, b: f64) {
        self.push_row(row, b);
        self.push_cone(ZeroConeT(1));
    }

    /// `expr (kind) rhs` as `s = b - Ax` in the matching cone
    fn linear(&mut self, expr: &LinearExpr, kind: ConstraintType, rhs: f64) {
        let row: BTreeMap<usize, f64> = expr
            .coefficients()
            .into_iter()
            .map(|(v, c)| (v.index(), c))
            .collect();
        let rhs = rhs - expr.constant;
        match kind {
            ConstraintType::LessThanOrEqual => self.nonnegative(&row, rhs),
            ConstraintType::GreaterThanOrEqual => self.nonnegative(&negated(&row), -rhs),
            ConstraintType::Equal => self.zero(&row, rhs),
        }
    }

    fn matrix(&self) -> CscMatrix<f64> {
        csc(self.b.len(), &self.columns)
    }
}

fn negated(row: &BTreeMap<usize, f64>) -> BTreeMap<usize, f64> {
    row.iter().map(|(&k, &v)| (k, -v)).collect()
}

/// Columns must hold their entries in increasing row order
fn csc(n_rows: usize, columns: &[Vec<(usize, f64)>]) -> CscMatrix<f64> {
    let mut colptr = Vec::with_capacity(columns.len() + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for column in columns {
        for &(row, value) in column {
            rowval.push(row);
            nzval.push(value);
        }
        colptr.push(rowval.len());
    }
    CscMatrix::new(n_rows, columns.len(), colptr, rowval, nzval)
}

/// Outcome of one continuous solve
pub(crate) struct Relaxation {
    pub status: SolutionStatus,
    /// Primal iterate; only meaningful when `status` is optimal
    pub x: Vec<f64>,
}

/// Solve the continuous model with every column held to `bounds`
pub(crate) fn relax(model: &Model, bounds: &[(f64, f64)], config: &SolverConfig) -> Result<Relaxation> {
    let n = model.num_variables();
    let (p, q) = ClarabelSolver::objective(model)?;

    let mut rows = ConicRows::new(n);
    for (i, &(lower, upper)) in bounds.iter().enumerate() {
        let unit = BTreeMap::from([(i, 1.0)]);
        if lower == upper {
            rows.zero(&unit, lower);
            continue;
        }
        if lower.is_finite() {
            rows.nonnegative(&negated(&unit), -lower);
        }
        if upper.is_finite() {
            rows.nonnegative(&unit, upper);
        }
    }
    for constraint in model.linear_constraints() {
        rows.linear(&constraint.expr, constraint.constraint_type, constraint.rhs);
    }
    for constraint in model.quadratic_constraints() {
        ClarabelSolver::quadratic(&mut rows, constraint)?;
    }

    let mut builder = DefaultSettingsBuilder::<f64>::default();
    builder.verbose(config.verbose);
    if let Some(limit) = config.time_limit {
        builder.time_limit(limit);
    }
    let settings = builder
        .build()
        .map_err(|e| SolverError::ExecutionFailed(format!("invalid Clarabel settings: {}", e)))?;

    let a = rows.matrix();
    let mut solver = DefaultSolver::new(&p, &q, &a, &rows.b, &rows.cones, settings);
    solver.solve();

    let status = match solver.solution.status {
        SolverStatus::Solved | SolverStatus::AlmostSolved => SolutionStatus::Optimal,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            SolutionStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            SolutionStatus::Unbounded
        }
        SolverStatus::MaxTime => SolutionStatus::TimeLimit,
        SolverStatus::MaxIterations => SolutionStatus::IterationLimit,
        SolverStatus::NumericalError | SolverStatus::InsufficientProgress => {
            SolutionStatus::Numeric
        }
        other => {
            debug!(status = ?other, "Clarabel finished without a definitive status");
            SolutionStatus::Unknown
        }
    };

    Ok(Relaxation {
        status,
        x: solver.solution.x.clone(),
    })
}

pub struct ClarabelSolver;

impl ClarabelSolver {
    pub fn new() -> Self {
        Self
    }

    /// Upper triangle of `P` and `q` for `1/2 x'Px + q'x`, sign-flipped when
    /// maximizing
    fn objective(model: &Model) -> Result<(CscMatrix<f64>, Vec<f64>)> {
        let n = model.num_variables();
        let objective = model.objective();
        let sign = match objective.optimization_type {
            OptimizationType::Minimize => 1.0,
            OptimizationType::Maximize => -1.0,
        };

        let quadratic = objective.expr.quadratic_coefficients();
        let mut block = SymmetricBlock::from_terms(&quadratic);
        if sign < 0.0 {
            block.negate();
        }
        if block.psd_factor().is_none() {
            return Err(SolverError::NonConvex("objective".to_string()));
        }

        let mut columns: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (&(a, b), &coef) in &quadratic {
            let (i, j) = (a.index(), b.index());
            let value = if i == j { 2.0 * coef } else { coef };
            // keys are ordered pairs, so i <= j lands in the upper triangle
            columns[j].push((i, sign * value));
        }
        for column in &mut columns {
            column.sort_by_key(|&(row, _)| row);
        }
        let p = csc(n, &columns);

        let mut q = vec![0.0; n];
        for (v, c) in objective.expr.linear.coefficients() {
            q[v.index()] = sign * c;
        }
        Ok((p, q))
    }

    /// `x'Sx + a'x + c <= 0` with `S = F'F` as the rotated cone
    /// `(t + 1, 2Fx, t - 1)` in SOC for `t = -(a'x + c)`
    fn quadratic(rows: &mut ConicRows, constraint: &QuadraticConstraint) -> Result<()> {
        let expr = &constraint.expr;
        let quadratic = expr.quadratic_coefficients();
        let mut block = SymmetricBlock::from_terms(&quadratic);

        if block.is_zero() {
            rows.linear(&expr.linear, constraint.constraint_type, constraint.rhs);
            return Ok(());
        }

        let mut a: BTreeMap<usize, f64> = expr
            .linear
            .coefficients()
            .into_iter()
            .map(|(v, c)| (v.index(), c))
            .collect();
        let mut c = expr.linear.constant - constraint.rhs;

        match constraint.constraint_type {
            ConstraintType::LessThanOrEqual => {}
            ConstraintType::GreaterThanOrEqual => {
                block.negate();
                a = negated(&a);
                c = -c;
            }
            ConstraintType::Equal => {
                return Err(SolverError::NonConvex(format!(
                    "equality constraint '{}'",
                    constraint.name
                )))
            }
        }

        let factor = block
            .psd_factor()
            .ok_or_else(|| SolverError::NonConvex(format!("constraint '{}'", constraint.name)))?;

        rows.push_row(&a, 1.0 - c);
        for f in &factor {
            let row: BTreeMap<usize, f64> = block
                .columns
                .iter()
                .zip(f)
                .map(|(&col, &v)| (col, -2.0 * v))
                .collect();
            rows.push_row(&row, 0.0);
        }
        rows.push_row(&a, -c - 1.0);
        rows.push_cone(SecondOrderConeT(factor.len() + 2));
        Ok(())
    }

    /// Only a converged iterate is a point; at the time limit `x` is still
    /// interior and need not satisfy the constraints
    fn solution_for(status: SolutionStatus, model: &Model, x: &[f64]) -> Solution {
        match status {
            SolutionStatus::Optimal => Solution::with_point(status, model, x.to_vec()),
            SolutionStatus::TimeLimit => {
                Solution::new(status, "Clarabel hit the time limit before converging")
            }
            _ => Solution::new(status, format!("Clarabel stopped with status {}", status)),
        }
    }
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for ClarabelSolver {
    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<Solution> {
        self.validate(model)?;

        let start_time = Instant::now();
        let solution = if model.is_mixed_integer() {
            branch_and_bound::solve(model, config)?
        } else {
            let bounds: Vec<(f64, f64)> = model
                .variables()
                .iter()
                .map(|v| v.effective_bounds())
                .collect();
            let relaxation = relax(model, &bounds, config)?;
            Self::solution_for(relaxation.status, model, &relaxation.x)
        };

        let mut statistics = SolverStatistics::for_model(model);
        statistics.solve_time_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        Ok(solution.with_statistics(statistics))
    }

    fn name(&self) -> &str {
        "Clarabel"
    }

    fn supports_mip(&self) -> bool {
        true
    }

    fn supports_quadratic(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LinearConstraint, QuadExpr, VariableDef};

    const TOL: f64 = 1e-5;

    fn two_vars(name: &str) -> (Model, crate::domain::VarId, crate::domain::VarId) {
        let mut model = Model::new(name);
        let x = model.add_variable(VariableDef::continuous("x"));
        let y = model.add_variable(VariableDef::continuous("y"));
        (model, x, y)
    }

    #[test]
    fn qp_splits_the_budget() {
        // min x^2 + y^2 s.t. x + y >= 1
        let (mut model, x, y) = two_vars("qp");
        let mut lhs = LinearExpr::new();
        lhs.add_term(x, 1.0);
        lhs.add_term(y, 1.0);
        model.add_constraint(LinearConstraint {
            name: "sum".into(),
            expr: lhs,
            constraint_type: ConstraintType::GreaterThanOrEqual,
            rhs: 1.0,
        });
        let mut obj = QuadExpr::new();
        obj.add_quad_term(x, x, 1.0);
        obj.add_quad_term(y, y, 1.0);
        model.set_objective(obj, OptimizationType::Minimize);
        model.update();

        let solution = ClarabelSolver::new().solve(&model, &SolverConfig::default()).unwrap();
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.variable_values[0] - 0.5).abs() < TOL);
        assert!((solution.variable_values[1] - 0.5).abs() < TOL);
        assert!((solution.objective_value.unwrap() - 0.5).abs() < TOL);
    }

    #[test]
    fn qcp_reaches_the_circle() {
        // max x + y s.t. x^2 + y^2 <= 2
        let (mut model, x, y) = two_vars("qcp");
        let mut q = QuadExpr::new();
        q.add_quad_term(x, x, 1.0);
        q.add_quad_term(y, y, 1.0);
        q.linear.add_constant(-2.0);
        model.add_quadratic_constraint(QuadraticConstraint {
            name: "disk".into(),
            expr: q,
            constraint_type: ConstraintType::LessThanOrEqual,
            rhs: 0.0,
        });
        let mut obj = LinearExpr::new();
        obj.add_term(x, 1.0);
        obj.add_term(y, 1.0);
        model.set_objective(QuadExpr::from_linear(obj), OptimizationType::Maximize);
        model.update();

        let solution = ClarabelSolver::new().solve(&model, &SolverConfig::default()).unwrap();
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.variable_values[0] - 1.0).abs() < TOL);
        assert!((solution.variable_values[1] - 1.0).abs() < TOL);
        assert!((solution.objective_value.unwrap() - 2.0).abs() < TOL);
    }

    #[test]
    fn non_convex_objective_is_refused() {
        // max x^2 is not concave
        let (mut model, x, _) = two_vars("nonconvex");
        let mut obj = QuadExpr::new();
        obj.add_quad_term(x, x, 1.0);
        model.set_objective(obj, OptimizationType::Maximize);
        model.update();

        let err = ClarabelSolver::new().solve(&model, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolverError::NonConvex(ref what) if what == "objective"));
    }

    #[test]
    fn quadratic_equality_is_refused() {
        let (mut model, x, _) = two_vars("sphere");
        let mut q = QuadExpr::new();
        q.add_quad_term(x, x, 1.0);
        model.add_quadratic_constraint(QuadraticConstraint {
            name: "shell".into(),
            expr: q,
            constraint_type: ConstraintType::Equal,
            rhs: 1.0,
        });
        model.update();

        let err = ClarabelSolver::new().solve(&model, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolverError::NonConvex(_)));
    }

    #[test]
    fn infeasible_bounds_and_rows() {
        // x <= 1 by bound, x >= 2 by row
        let mut model = Model::new("infeasible");
        let x = model.add_variable(VariableDef::continuous("x").with_bounds(0.0, 1.0));
        let mut lhs = LinearExpr::new();
        lhs.add_term(x, 1.0);
        model.add_constraint(LinearConstraint {
            name: "lo".into(),
            expr: lhs,
            constraint_type: ConstraintType::GreaterThanOrEqual,
            rhs: 2.0,
        });
        let mut obj = QuadExpr::new();
        obj.add_quad_term(x, x, 1.0);
        model.set_objective(obj, OptimizationType::Minimize);
        model.update();

        let solution = ClarabelSolver::new().solve(&model, &SolverConfig::default()).unwrap();
        assert_eq!(solution.status, SolutionStatus::Infeasible);
    }

    #[test]
    fn time_limit_iterates_are_not_points() {
        let (mut model, x, _) = two_vars("timed");
        let mut obj = QuadExpr::new();
        obj.add_quad_term(x, x, 1.0);
        model.set_objective(obj, OptimizationType::Minimize);
        model.update();

        let timed = ClarabelSolver::solution_for(SolutionStatus::TimeLimit, &model, &[0.3, 0.2]);
        assert_eq!(timed.status, SolutionStatus::TimeLimit);
        assert!(!timed.has_point());
        assert!(timed.objective_value.is_none());

        let done = ClarabelSolver::solution_for(SolutionStatus::Optimal, &model, &[0.0, 0.0]);
        assert!(done.has_point());
    }

    #[test]
    fn cones_merge_runs() {
        let mut rows = ConicRows::new(1);
        let unit = BTreeMap::from([(0, 1.0)]);
        rows.nonnegative(&unit, 1.0);
        rows.nonnegative(&unit, 2.0);
        rows.zero(&unit, 0.0);
        rows.push_cone(SecondOrderConeT(3));
        rows.nonnegative(&unit, 3.0);
        assert_eq!(rows.cones.len(), 4);
        assert!(matches!(rows.cones[0], NonnegativeConeT(2)));
    }
}
