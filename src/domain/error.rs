// Errors raised while compiling a problem description into a model

use super::value_objects::{FunctionType, ProblemClass};

/// Reason a model could not be built.
///
/// Any of these aborts the build; the partially filled container is dropped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("Unsupported problem type: {0}")]
    UnsupportedProblemType(String),

    #[error(
        "Quadratic constraints are not supported in {class} problems ({count} given). \
         Use QCP for quadratic constraints."
    )]
    UnsupportedConstraint { class: ProblemClass, count: usize },

    #[error("Objective function type must be {expected} for {class} problems, got '{found}'")]
    ObjectiveTypeMismatch {
        class: ProblemClass,
        expected: String,
        found: String,
    },

    #[error("Unknown sign '{sign}' in constraint: {constraint}")]
    InvalidSign { constraint: String, sign: String },

    #[error("Unknown objective direction: {0}")]
    InvalidDirection(String),

    #[error("Unknown variable '{name}' referenced in {context}")]
    UnknownVariable { name: String, context: String },

    #[error("Model is not created. Cannot add {0}.")]
    ModelBuild(&'static str),

    #[error("Malformed problem: {0}")]
    MalformedSpec(String),
}

impl BuildError {
    pub(crate) fn objective_mismatch(
        class: ProblemClass,
        allowed: &[FunctionType],
        found: impl Into<String>,
    ) -> Self {
        let expected = allowed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        BuildError::ObjectiveTypeMismatch {
            class,
            expected,
            found: found.into(),
        }
    }
}
