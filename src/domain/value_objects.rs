// Domain value objects representing core optimization concepts

use std::fmt;

/// Type of decision variable in the optimization problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    /// Continuous real number (x ∈ ℝ)
    Continuous,
    /// Integer number (x ∈ ℤ)
    Integer,
    /// Binary variable (x ∈ {0, 1})
    Binary,
    /// Either zero or within [lb, ub]
    Semicontinuous,
    /// Scalar positive semidefinite block (a 1x1 PSD matrix, so x ≥ 0)
    Semidefinite,
}

impl VariableType {
    /// Resolve the `type` field of a variable declaration.
    ///
    /// Omitted or unrecognised types fall back to continuous.
    pub fn from_spec(value: Option<&str>) -> Self {
        match value {
            Some("integer") => VariableType::Integer,
            Some("binary") => VariableType::Binary,
            Some("semicontinuous") => VariableType::Semicontinuous,
            Some("semidefinite") => VariableType::Semidefinite,
            _ => VariableType::Continuous,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, VariableType::Integer | VariableType::Binary)
    }

    /// Whether a pure continuous backend can take this variable as is
    pub fn is_continuous(&self) -> bool {
        matches!(self, VariableType::Continuous | VariableType::Semidefinite)
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableType::Continuous => write!(f, "continuous"),
            VariableType::Integer => write!(f, "integer"),
            VariableType::Binary => write!(f, "binary"),
            VariableType::Semicontinuous => write!(f, "semicontinuous"),
            VariableType::Semidefinite => write!(f, "semidefinite"),
        }
    }
}

/// Relational operator as written in a constraint (`sign` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    LessThanOrEqual,
    LessThan,
    GreaterThanOrEqual,
    GreaterThan,
    Equal,
}

impl Sign {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "<=" => Some(Sign::LessThanOrEqual),
            "<" => Some(Sign::LessThan),
            ">=" => Some(Sign::GreaterThanOrEqual),
            ">" => Some(Sign::GreaterThan),
            "=" => Some(Sign::Equal),
            _ => None,
        }
    }

    /// Relation handed to the solver.
    ///
    /// Solvers have no strict inequalities: `<` and `>` are passed as `<=`
    /// and `>=`.
    pub fn constraint_type(&self) -> ConstraintType {
        match self {
            Sign::LessThanOrEqual | Sign::LessThan => ConstraintType::LessThanOrEqual,
            Sign::GreaterThanOrEqual | Sign::GreaterThan => ConstraintType::GreaterThanOrEqual,
            Sign::Equal => ConstraintType::Equal,
        }
    }
}

/// Type of constraint comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    /// Less than or equal (≤)
    LessThanOrEqual,
    /// Equal (=)
    Equal,
    /// Greater than or equal (≥)
    GreaterThanOrEqual,
}

impl ConstraintType {
    pub fn symbol(&self) -> &'static str {
        match self {
            ConstraintType::LessThanOrEqual => "<=",
            ConstraintType::Equal => "=",
            ConstraintType::GreaterThanOrEqual => ">=",
        }
    }
}

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationType {
    /// Minimize the objective function
    Minimize,
    /// Maximize the objective function
    Maximize,
}

impl OptimizationType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "minimize" => Some(OptimizationType::Minimize),
            "maximize" => Some(OptimizationType::Maximize),
            _ => None,
        }
    }
}

impl fmt::Display for OptimizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationType::Minimize => write!(f, "minimize"),
            OptimizationType::Maximize => write!(f, "maximize"),
        }
    }
}

/// Shape of the objective function (`function_type` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionType {
    Linear,
    Quadratic,
}

impl FunctionType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "linear" => Some(FunctionType::Linear),
            "quadratic" => Some(FunctionType::Quadratic),
            _ => None,
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionType::Linear => write!(f, "linear"),
            FunctionType::Quadratic => write!(f, "quadratic"),
        }
    }
}

/// Problem type declared by the caller (`problem.type` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemType {
    Lp,
    Milp,
    Qp,
    Miqp,
    Qcp,
    Miqcp,
}

impl ProblemType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LP" => Some(ProblemType::Lp),
            "MILP" => Some(ProblemType::Milp),
            "QP" => Some(ProblemType::Qp),
            "MIQP" => Some(ProblemType::Miqp),
            "QCP" => Some(ProblemType::Qcp),
            "MIQCP" => Some(ProblemType::Miqcp),
            _ => None,
        }
    }

    /// Model variant that builds this problem type
    pub fn class(&self) -> ProblemClass {
        match self {
            ProblemType::Lp | ProblemType::Milp => ProblemClass::Lp,
            ProblemType::Qp | ProblemType::Miqp => ProblemClass::Qp,
            ProblemType::Qcp | ProblemType::Miqcp => ProblemClass::Qcp,
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProblemType::Lp => "LP",
            ProblemType::Milp => "MILP",
            ProblemType::Qp => "QP",
            ProblemType::Miqp => "MIQP",
            ProblemType::Qcp => "QCP",
            ProblemType::Miqcp => "MIQCP",
        };
        write!(f, "{}", s)
    }
}

/// The three model variants sharing one build pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemClass {
    /// LP and MILP
    Lp,
    /// QP and MIQP
    Qp,
    /// QCP and MIQCP
    Qcp,
}

impl fmt::Display for ProblemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemClass::Lp => write!(f, "LP"),
            ProblemClass::Qp => write!(f, "QP"),
            ProblemClass::Qcp => write!(f, "QCP"),
        }
    }
}

/// Status of the optimization solution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// Model loaded, no definitive result
    Unknown,
    /// Found optimal solution
    Optimal,
    /// Problem has no feasible solution
    Infeasible,
    /// Solver could not tell infeasible from unbounded
    InfeasibleOrUnbounded,
    /// Objective can be improved infinitely
    Unbounded,
    /// Iteration limit reached
    IterationLimit,
    /// Node limit reached (MIP)
    NodeLimit,
    /// Time limit reached
    TimeLimit,
    /// Solve interrupted
    Interrupted,
    /// Numerical difficulties stopped the solver
    Numeric,
    /// Stopped with a feasible but unproven point
    Suboptimal,
}

impl SolutionStatus {
    /// Numeric status code reported to callers.
    ///
    /// Codes follow the Gurobi status enumeration (2 = optimal, 9 = time limit).
    pub fn code(&self) -> i32 {
        match self {
            SolutionStatus::Unknown => 1,
            SolutionStatus::Optimal => 2,
            SolutionStatus::Infeasible => 3,
            SolutionStatus::InfeasibleOrUnbounded => 4,
            SolutionStatus::Unbounded => 5,
            SolutionStatus::IterationLimit => 7,
            SolutionStatus::NodeLimit => 8,
            SolutionStatus::TimeLimit => 9,
            SolutionStatus::Interrupted => 11,
            SolutionStatus::Numeric => 12,
            SolutionStatus::Suboptimal => 13,
        }
    }

    /// Terminal outcome class used by the solve orchestrator
    pub fn outcome(&self) -> SolveOutcome {
        match self {
            SolutionStatus::Optimal => SolveOutcome::Optimal,
            SolutionStatus::TimeLimit => SolveOutcome::TimeLimitReached,
            SolutionStatus::Infeasible => SolveOutcome::Infeasible,
            SolutionStatus::Unbounded | SolutionStatus::InfeasibleOrUnbounded => {
                SolveOutcome::Unbounded
            }
            _ => SolveOutcome::Other,
        }
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::Unknown => write!(f, "Unknown"),
            SolutionStatus::Optimal => write!(f, "Optimal"),
            SolutionStatus::Infeasible => write!(f, "Infeasible"),
            SolutionStatus::InfeasibleOrUnbounded => write!(f, "Infeasible or Unbounded"),
            SolutionStatus::Unbounded => write!(f, "Unbounded"),
            SolutionStatus::IterationLimit => write!(f, "Iteration Limit Reached"),
            SolutionStatus::NodeLimit => write!(f, "Node Limit Reached"),
            SolutionStatus::TimeLimit => write!(f, "Time Limit Reached"),
            SolutionStatus::Interrupted => write!(f, "Interrupted"),
            SolutionStatus::Numeric => write!(f, "Numerical Error"),
            SolutionStatus::Suboptimal => write!(f, "Suboptimal"),
        }
    }
}

/// Terminal status classes distinguished when normalizing a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    Optimal,
    TimeLimitReached,
    Infeasible,
    Unbounded,
    Other,
}

/// Solver backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverBackend {
    /// Clarabel for models with quadratic parts, HiGHS otherwise
    #[default]
    Auto,
    /// HiGHS (LP and MILP)
    Highs,
    /// Clarabel (continuous convex QP and QCP)
    Clarabel,
    /// COIN-OR CBC (LP and MILP)
    CoinCbc,
}

impl SolverBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Some(SolverBackend::Auto),
            "highs" => Some(SolverBackend::Highs),
            "clarabel" => Some(SolverBackend::Clarabel),
            "cbc" | "coin_cbc" | "coin-cbc" => Some(SolverBackend::CoinCbc),
            _ => None,
        }
    }
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverBackend::Auto => write!(f, "Auto"),
            SolverBackend::Highs => write!(f, "HiGHS"),
            SolverBackend::Clarabel => write!(f, "Clarabel"),
            SolverBackend::CoinCbc => write!(f, "COIN-OR CBC"),
        }
    }
}
