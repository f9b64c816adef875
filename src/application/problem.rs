// Problem model variants: LP, QP and QCP share one build pipeline and differ
// only in what they allow, described by a capability descriptor.

use std::io::{self, Read};

use tracing::{debug, warn};

use super::constraints::{add_linear_constraints, add_quadratic_constraints};
use super::objective::{add_linear_objective, add_quadratic_objective};
use super::registry::add_variables;
use super::spec::ProblemSpec;
use crate::domain::{BuildError, FunctionType, Model, ProblemClass, ProblemType};
use crate::lp_format;

/// Returned by [`OptimizationProblem::problem_as_lp`] when nothing was built
pub const NO_MODEL_MESSAGE: &str = "Model is not created. Cannot write problem to file.";

/// What a model variant accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub allows_quadratic_constraints: bool,
    /// Objective kinds in order of preference
    pub objective_kinds: &'static [FunctionType],
}

impl Capabilities {
    pub fn of(class: ProblemClass) -> Self {
        match class {
            ProblemClass::Lp => Capabilities {
                allows_quadratic_constraints: false,
                objective_kinds: &[FunctionType::Linear],
            },
            ProblemClass::Qp => Capabilities {
                allows_quadratic_constraints: false,
                objective_kinds: &[FunctionType::Quadratic],
            },
            ProblemClass::Qcp => Capabilities {
                allows_quadratic_constraints: true,
                objective_kinds: &[FunctionType::Linear, FunctionType::Quadratic],
            },
        }
    }

    pub fn allows_objective(&self, kind: FunctionType) -> bool {
        self.objective_kinds.contains(&kind)
    }
}

/// Check a description against a variant before anything is constructed.
///
/// Returns the objective kind to assemble.
pub fn validate(spec: &ProblemSpec, class: ProblemClass) -> Result<FunctionType, BuildError> {
    let caps = Capabilities::of(class);

    let quadratic_count = spec.constraints.quadratic_constraints.len();
    if !caps.allows_quadratic_constraints && quadratic_count > 0 {
        return Err(BuildError::UnsupportedConstraint {
            class,
            count: quadratic_count,
        });
    }

    match FunctionType::parse(&spec.objective.function_type) {
        Some(kind) if caps.allows_objective(kind) => Ok(kind),
        _ => Err(BuildError::objective_mismatch(
            class,
            caps.objective_kinds,
            spec.objective.function_type.clone(),
        )),
    }
}

/// Run the fixed build sequence: variables, linear constraints, quadratic
/// constraints (QCP only), objective.
pub fn build_model(spec: &ProblemSpec, class: ProblemClass) -> Result<Model, BuildError> {
    let objective_kind = validate(spec, class)?;

    let mut model = Some(Model::new(spec.name()));
    let registry = add_variables(model.as_mut(), &spec.variables)?;
    add_linear_constraints(
        model.as_mut(),
        &spec.constraints.linear_constraints,
        &registry,
    )?;
    if Capabilities::of(class).allows_quadratic_constraints {
        add_quadratic_constraints(
            model.as_mut(),
            &spec.constraints.quadratic_constraints,
            &registry,
        )?;
    }
    match objective_kind {
        FunctionType::Linear => {
            add_linear_objective(model.as_mut(), &spec.objective, &registry, class)?
        }
        FunctionType::Quadratic => {
            add_quadratic_objective(model.as_mut(), &spec.objective, &registry, class)?
        }
    }

    model.ok_or(BuildError::ModelBuild("objective"))
}

/// Where a problem is in its build lifecycle
#[derive(Debug, Clone)]
pub enum BuildState {
    Unbuilt,
    Built(Model),
    /// The container was discarded with the failure
    Failed(BuildError),
}

/// One problem description bound to the variant that builds it
#[derive(Debug, Clone)]
pub struct OptimizationProblem {
    spec: ProblemSpec,
    problem_type: ProblemType,
    state: BuildState,
}

impl OptimizationProblem {
    /// Pick the variant for `problem.type`; the model is not built yet.
    pub fn from_spec(spec: ProblemSpec) -> Result<Self, BuildError> {
        let problem_type = ProblemType::parse(&spec.problem.problem_type).ok_or_else(|| {
            BuildError::UnsupportedProblemType(spec.problem.problem_type.clone())
        })?;
        Ok(Self {
            spec,
            problem_type,
            state: BuildState::Unbuilt,
        })
    }

    /// Dispatch and build in one go
    pub fn create(spec: ProblemSpec) -> Result<Self, BuildError> {
        let mut problem = Self::from_spec(spec)?;
        problem.build()?;
        Ok(problem)
    }

    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    pub fn class(&self) -> ProblemClass {
        self.problem_type.class()
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn spec(&self) -> &ProblemSpec {
        &self.spec
    }

    pub fn state(&self) -> &BuildState {
        &self.state
    }

    /// Build the model once; later calls return the recorded outcome.
    pub fn build(&mut self) -> Result<&Model, BuildError> {
        if let BuildState::Unbuilt = self.state {
            debug!(problem = self.name(), class = %self.class(), "building model");
            self.state = match build_model(&self.spec, self.class()) {
                Ok(model) => BuildState::Built(model),
                Err(e) => {
                    warn!(problem = self.name(), error = %e, "error creating model");
                    BuildState::Failed(e)
                }
            };
        }

        match &self.state {
            BuildState::Built(model) => Ok(model),
            BuildState::Failed(e) => Err(e.clone()),
            BuildState::Unbuilt => Err(BuildError::ModelBuild("model")),
        }
    }

    /// The built model, `None` if the build failed or never ran
    pub fn model(&self) -> Option<&Model> {
        match &self.state {
            BuildState::Built(model) => Some(model),
            _ => None,
        }
    }

    /// The built model as LP text, via a temporary `.lp` file.
    ///
    /// Gives [`NO_MODEL_MESSAGE`] when there is no built model.
    pub fn problem_as_lp(&self) -> io::Result<String> {
        let Some(model) = self.model() else {
            return Ok(NO_MODEL_MESSAGE.to_string());
        };

        let mut file = tempfile::Builder::new().suffix(".lp").tempfile()?;
        lp_format::write_lp_file(model, file.path())?;

        let mut text = String::new();
        file.as_file_mut().read_to_string(&mut text)?;
        file.close()?;
        Ok(text)
    }
}
