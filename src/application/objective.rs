// Objective assembler: the single objective of a model and its direction

use tracing::debug;

use super::expression_builder::{build_linear_expr, build_quadratic_expr};
use super::registry::VariableRegistry;
use super::spec::ObjectiveSpec;
use crate::domain::{BuildError, FunctionType, Model, OptimizationType, ProblemClass, QuadExpr};

fn parse_direction(direction: &str) -> Result<OptimizationType, BuildError> {
    OptimizationType::parse(direction)
        .ok_or_else(|| BuildError::InvalidDirection(direction.to_string()))
}

fn require_function_type(
    spec: &ObjectiveSpec,
    expected: FunctionType,
    class: ProblemClass,
) -> Result<(), BuildError> {
    if FunctionType::parse(&spec.function_type) == Some(expected) {
        Ok(())
    } else {
        Err(BuildError::objective_mismatch(
            class,
            &[expected],
            spec.function_type.clone(),
        ))
    }
}

/// Set a linear objective, replacing any previous one.
///
/// `function_type` has to be `linear`.
pub fn add_linear_objective(
    model: Option<&mut Model>,
    spec: &ObjectiveSpec,
    registry: &VariableRegistry,
    class: ProblemClass,
) -> Result<(), BuildError> {
    let model = model.ok_or(BuildError::ModelBuild("objective"))?;
    require_function_type(spec, FunctionType::Linear, class)?;

    let direction = parse_direction(&spec.direction)?;
    let expr = build_linear_expr(&spec.linear_terms, registry, "objective")?;
    model.set_objective(QuadExpr::from_linear(expr), direction);

    debug!(%direction, "linear objective set");
    Ok(())
}

/// Set a quadratic objective (quadratic plus linear terms, no constant),
/// replacing any previous one.
///
/// `function_type` has to be `quadratic`.
pub fn add_quadratic_objective(
    model: Option<&mut Model>,
    spec: &ObjectiveSpec,
    registry: &VariableRegistry,
    class: ProblemClass,
) -> Result<(), BuildError> {
    let model = model.ok_or(BuildError::ModelBuild("objective"))?;
    require_function_type(spec, FunctionType::Quadratic, class)?;

    let direction = parse_direction(&spec.direction)?;
    let expr = build_quadratic_expr(
        &spec.quadratic_terms,
        &spec.linear_terms,
        0.0,
        registry,
        "objective",
    )?;
    model.set_objective(expr, direction);

    debug!(%direction, "quadratic objective set");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::add_variables;
    use crate::application::spec::{OrderedMap, QuadTermSpec, VarSpec};

    fn setup() -> (Model, VariableRegistry) {
        let vars: OrderedMap<VarSpec> = [("x", VarSpec::default()), ("y", VarSpec::default())]
            .into_iter()
            .collect();
        let mut model = Model::new("objective");
        let registry = add_variables(Some(&mut model), &vars).unwrap();
        (model, registry)
    }

    fn objective(direction: &str, function_type: &str) -> ObjectiveSpec {
        ObjectiveSpec {
            direction: direction.into(),
            function_type: function_type.into(),
            linear_terms: [("x", 3.0), ("y", 4.0)].into_iter().collect(),
            quadratic_terms: vec![
                QuadTermSpec {
                    var1: "x".into(),
                    var2: "x".into(),
                    coef: 1.0,
                },
                QuadTermSpec {
                    var1: "x".into(),
                    var2: "y".into(),
                    coef: 2.0,
                },
            ],
        }
    }

    #[test]
    fn linear_objective_sets_direction() {
        let (mut model, registry) = setup();
        add_linear_objective(
            Some(&mut model),
            &objective("maximize", "linear"),
            &registry,
            ProblemClass::Lp,
        )
        .unwrap();
        assert_eq!(model.objective().optimization_type, OptimizationType::Maximize);
        assert!(!model.objective().expr.has_quadratic());
        assert_eq!(model.objective().expr.evaluate(&[1.0, 1.0]), 7.0);
    }

    #[test]
    fn linear_assembler_rejects_quadratic_function_type() {
        let (mut model, registry) = setup();
        let err = add_linear_objective(
            Some(&mut model),
            &objective("minimize", "quadratic"),
            &registry,
            ProblemClass::Lp,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::ObjectiveTypeMismatch { found, .. } if found == "quadratic"));
    }

    #[test]
    fn quadratic_assembler_rejects_linear_function_type() {
        let (mut model, registry) = setup();
        let err = add_quadratic_objective(
            Some(&mut model),
            &objective("minimize", "linear"),
            &registry,
            ProblemClass::Qp,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::ObjectiveTypeMismatch { .. }));
    }

    #[test]
    fn quadratic_objective_sums_both_parts() {
        let (mut model, registry) = setup();
        add_quadratic_objective(
            Some(&mut model),
            &objective("minimize", "quadratic"),
            &registry,
            ProblemClass::Qp,
        )
        .unwrap();
        // x^2 + 2xy + 3x + 4y at (1, 2)
        assert_eq!(model.objective().expr.evaluate(&[1.0, 2.0]), 1.0 + 4.0 + 3.0 + 8.0);
        assert_eq!(model.objective().optimization_type, OptimizationType::Minimize);
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let (mut model, registry) = setup();
        let err = add_linear_objective(
            Some(&mut model),
            &objective("optimize", "linear"),
            &registry,
            ProblemClass::Lp,
        )
        .unwrap_err();
        assert_eq!(err, BuildError::InvalidDirection("optimize".into()));
    }

    #[test]
    fn second_objective_overwrites_first() {
        let (mut model, registry) = setup();
        add_quadratic_objective(
            Some(&mut model),
            &objective("minimize", "quadratic"),
            &registry,
            ProblemClass::Qcp,
        )
        .unwrap();
        add_linear_objective(
            Some(&mut model),
            &objective("maximize", "linear"),
            &registry,
            ProblemClass::Qcp,
        )
        .unwrap();
        assert!(!model.objective().expr.has_quadratic());
        assert_eq!(model.objective().optimization_type, OptimizationType::Maximize);
    }
}
