use super::expression::{LinearExpr, QuadExpr, VarId};
use super::value_objects::{
    ConstraintType, OptimizationType, SolutionStatus, SolverBackend, VariableType,
};

/// Decision variable as held by the model container
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub variable_type: VariableType,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Display name; the solution mapping is keyed by it
    pub name: String,
}

impl VariableDef {
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Continuous,
            lower_bound: 0.0,
            upper_bound: f64::INFINITY,
            name: name.into(),
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Integer,
            ..Self::continuous(name)
        }
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Binary,
            lower_bound: 0.0,
            upper_bound: 1.0,
            name: name.into(),
        }
    }

    /// Variable of the given type with that type's default bounds
    pub fn of_type(name: impl Into<String>, variable_type: VariableType) -> Self {
        match variable_type {
            VariableType::Binary => Self::binary(name),
            other => Self {
                variable_type: other,
                ..Self::continuous(name)
            },
        }
    }

    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub fn is_integer(&self) -> bool {
        self.variable_type.is_integer()
    }

    /// Bounds a continuous relaxation has to respect.
    ///
    /// A scalar semidefinite variable is a 1x1 PSD block, so it cannot go
    /// below zero.
    pub fn effective_bounds(&self) -> (f64, f64) {
        match self.variable_type {
            VariableType::Semidefinite => (self.lower_bound.max(0.0), self.upper_bound),
            VariableType::Binary => (self.lower_bound.max(0.0), self.upper_bound.min(1.0)),
            _ => (self.lower_bound, self.upper_bound),
        }
    }
}

/// `expr (<=|=|>=) rhs` with a linear left-hand side
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub expr: LinearExpr,
    pub constraint_type: ConstraintType,
    pub rhs: f64,
}

/// `expr (<=|=|>=) rhs` with a quadratic left-hand side
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticConstraint {
    pub name: String,
    pub expr: QuadExpr,
    pub constraint_type: ConstraintType,
    pub rhs: f64,
}

/// Objective function to minimize or maximize
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub optimization_type: OptimizationType,
    pub expr: QuadExpr,
}

impl Default for Objective {
    fn default() -> Self {
        Self {
            optimization_type: OptimizationType::Minimize,
            expr: QuadExpr::new(),
        }
    }
}

/// Model container owning variables, constraints and the objective.
///
/// Additions are staged and become visible once [`Model::update`] commits
/// them, so each build step lands as one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    name: String,
    variables: Vec<VariableDef>,
    linear_constraints: Vec<LinearConstraint>,
    quadratic_constraints: Vec<QuadraticConstraint>,
    objective: Objective,
    pending_variables: Vec<VariableDef>,
    pending_linear: Vec<LinearConstraint>,
    pending_quadratic: Vec<QuadraticConstraint>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage a variable; the handle is valid for expressions right away.
    pub fn add_variable(&mut self, variable: VariableDef) -> VarId {
        let id = VarId(self.variables.len() + self.pending_variables.len());
        self.pending_variables.push(variable);
        id
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.pending_linear.push(constraint);
    }

    pub fn add_quadratic_constraint(&mut self, constraint: QuadraticConstraint) {
        self.pending_quadratic.push(constraint);
    }

    /// Replace the objective. There is only ever one.
    pub fn set_objective(&mut self, expr: QuadExpr, optimization_type: OptimizationType) {
        self.objective = Objective {
            optimization_type,
            expr,
        };
    }

    /// Commit every staged addition
    pub fn update(&mut self) {
        self.variables.append(&mut self.pending_variables);
        self.linear_constraints.append(&mut self.pending_linear);
        self.quadratic_constraints.append(&mut self.pending_quadratic);
    }

    pub fn has_pending_changes(&self) -> bool {
        !(self.pending_variables.is_empty()
            && self.pending_linear.is_empty()
            && self.pending_quadratic.is_empty())
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> Option<&VariableDef> {
        self.variables.get(id.index())
    }

    pub fn linear_constraints(&self) -> &[LinearConstraint] {
        &self.linear_constraints
    }

    pub fn quadratic_constraints(&self) -> &[QuadraticConstraint] {
        &self.quadratic_constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.linear_constraints.len()
    }

    pub fn num_quadratic_constraints(&self) -> usize {
        self.quadratic_constraints.len()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.is_integer()).count()
    }

    pub fn num_binary_variables(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.variable_type == VariableType::Binary)
            .count()
    }

    pub fn is_mixed_integer(&self) -> bool {
        self.variables
            .iter()
            .any(|v| !v.variable_type.is_continuous())
    }

    /// Whether the objective or any constraint has a quadratic part
    pub fn is_quadratic(&self) -> bool {
        self.objective.expr.has_quadratic()
            || self
                .quadratic_constraints
                .iter()
                .any(|c| c.expr.has_quadratic())
    }

    /// Whether `values` satisfies bounds, integrality and every constraint
    /// to within `tol`
    pub fn is_feasible_point(&self, values: &[f64], tol: f64) -> bool {
        if values.len() != self.num_variables() {
            return false;
        }
        let holds = |lhs: f64, kind: ConstraintType, rhs: f64| match kind {
            ConstraintType::LessThanOrEqual => lhs <= rhs + tol,
            ConstraintType::GreaterThanOrEqual => lhs >= rhs - tol,
            ConstraintType::Equal => (lhs - rhs).abs() <= tol,
        };

        let columns_hold = self.variables.iter().zip(values).all(|(var, &value)| {
            let (lower, upper) = var.effective_bounds();
            let within = value >= lower - tol && value <= upper + tol;
            match var.variable_type {
                VariableType::Semicontinuous => value.abs() <= tol || within,
                VariableType::Integer | VariableType::Binary => {
                    within && (value - value.round()).abs() <= tol
                }
                _ => within,
            }
        });

        columns_hold
            && self.linear_constraints.iter().all(|c| {
                holds(c.expr.evaluate(values), c.constraint_type, c.rhs)
            })
            && self.quadratic_constraints.iter().all(|c| {
                holds(c.expr.evaluate(values), c.constraint_type, c.rhs)
            })
    }
}

/// Configuration for the solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    /// Seconds before the solver stops with its best point so far
    pub time_limit: Option<f64>,
    /// Relative MIP gap
    pub gap_tolerance: Option<f64>,
    /// Let the solver print its own log
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackend::Auto,
            time_limit: None,
            gap_tolerance: None,
            verbose: false,
        }
    }
}

/// Statistics about the solve process
#[derive(Debug, Clone, Default)]
pub struct SolverStatistics {
    pub solve_time_ms: f64,
    pub num_variables: u32,
    pub num_constraints: u32,
    pub num_quadratic_constraints: u32,
    pub num_integer_vars: u32,
    pub num_binary_vars: u32,
}

impl SolverStatistics {
    pub fn for_model(model: &Model) -> Self {
        Self {
            solve_time_ms: 0.0,
            num_variables: model.num_variables() as u32,
            num_constraints: model.num_constraints() as u32,
            num_quadratic_constraints: model.num_quadratic_constraints() as u32,
            num_integer_vars: model.num_integer_variables() as u32,
            num_binary_vars: model.num_binary_variables() as u32,
        }
    }
}

/// Solution of a model, as reported by a backend
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolutionStatus,
    pub objective_value: Option<f64>,
    /// One value per model variable, in column order; empty without a point
    pub variable_values: Vec<f64>,
    pub message: String,
    pub statistics: SolverStatistics,
}

impl Solution {
    pub fn new(status: SolutionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            objective_value: None,
            variable_values: Vec::new(),
            message: message.into(),
            statistics: SolverStatistics::default(),
        }
    }

    /// Solution carrying a point, evaluated against the model objective
    pub fn with_point(status: SolutionStatus, model: &Model, values: Vec<f64>) -> Self {
        let objective = model.objective().expr.evaluate(&values);
        Self {
            status,
            objective_value: Some(objective),
            variable_values: values,
            message: format!("{} for '{}'", status, model.name()),
            statistics: SolverStatistics::default(),
        }
    }

    pub fn with_statistics(mut self, statistics: SolverStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    pub fn has_point(&self) -> bool {
        !self.variable_values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn additions_are_invisible_until_update() {
        let mut model = Model::new("m");
        let x = model.add_variable(VariableDef::continuous("x"));
        let y = model.add_variable(VariableDef::binary("y"));
        assert_eq!((x.index(), y.index()), (0, 1));
        assert_eq!(model.num_variables(), 0);
        assert!(model.has_pending_changes());

        model.update();
        assert_eq!(model.num_variables(), 2);
        assert_eq!(model.num_binary_variables(), 1);
        assert!(!model.has_pending_changes());

        let z = model.add_variable(VariableDef::integer("z"));
        assert_eq!(z.index(), 2);
    }

    #[test]
    fn objective_is_replaced_not_accumulated() {
        let mut model = Model::new("m");
        let x = model.add_variable(VariableDef::continuous("x"));
        model.update();

        let mut first = LinearExpr::new();
        first.add_term(x, 1.0);
        model.set_objective(QuadExpr::from_linear(first), OptimizationType::Minimize);

        let mut second = QuadExpr::new();
        second.add_quad_term(x, x, 2.0);
        model.set_objective(second.clone(), OptimizationType::Maximize);

        assert_eq!(model.objective().expr, second);
        assert_eq!(model.objective().optimization_type, OptimizationType::Maximize);
        assert!(model.is_quadratic());
    }

    #[test]
    fn feasible_point_checks_rows_and_columns() {
        let mut model = Model::new("m");
        let x = model.add_variable(VariableDef::integer("x").with_bounds(0.0, 5.0));
        let s = model.add_variable(
            VariableDef::of_type("s", VariableType::Semicontinuous).with_bounds(2.0, 4.0),
        );
        let mut lhs = LinearExpr::new();
        lhs.add_term(x, 1.0);
        lhs.add_term(s, 1.0);
        model.add_constraint(LinearConstraint {
            name: "floor".into(),
            expr: lhs,
            constraint_type: ConstraintType::GreaterThanOrEqual,
            rhs: 1.0,
        });
        model.update();

        assert!(model.is_feasible_point(&[1.0, 0.0], 1e-9));
        assert!(model.is_feasible_point(&[0.0, 3.0], 1e-9));
        // all zeros violates the row
        assert!(!model.is_feasible_point(&[0.0, 0.0], 1e-9));
        // fractional integer, semicontinuous gap, wrong length
        assert!(!model.is_feasible_point(&[1.5, 0.0], 1e-9));
        assert!(!model.is_feasible_point(&[1.0, 1.0], 1e-9));
        assert!(!model.is_feasible_point(&[1.0], 1e-9));
    }

    #[test]
    fn semidefinite_scalar_is_non_negative() {
        let var = VariableDef::of_type("s", VariableType::Semidefinite).with_bounds(-3.0, 4.0);
        assert_eq!(var.effective_bounds(), (0.0, 4.0));
        assert!(var.variable_type.is_continuous());
    }
}
