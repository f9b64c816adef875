// Constraint assembler: linear and quadratic constraint lists into the model

use tracing::debug;

use super::expression_builder::{build_linear_expr, build_quadratic_expr};
use super::registry::VariableRegistry;
use super::spec::{LinearConstraintSpec, QuadraticConstraintSpec};
use crate::domain::{BuildError, LinearConstraint, Model, QuadraticConstraint, Sign};

/// Positional default name; unique among defaults of the same list.
fn resolved_name(name: Option<&str>, prefix: &str, index: usize) -> String {
    match name {
        Some(name) => name.to_string(),
        None => format!("{}_{}", prefix, index),
    }
}

fn parse_sign(sign: &str, constraint: &str) -> Result<Sign, BuildError> {
    Sign::parse(sign).ok_or_else(|| BuildError::InvalidSign {
        constraint: constraint.to_string(),
        sign: sign.to_string(),
    })
}

/// Add `lhs (sign) rhs` for each linear constraint, then commit the batch.
///
/// Returns the number of constraints added. `<` and `>` are accepted and
/// handed over as `<=` and `>=`.
pub fn add_linear_constraints(
    model: Option<&mut Model>,
    constraints: &[LinearConstraintSpec],
    registry: &VariableRegistry,
) -> Result<usize, BuildError> {
    let model = model.ok_or(BuildError::ModelBuild("constraints"))?;

    for (index, spec) in constraints.iter().enumerate() {
        let name = resolved_name(spec.name.as_deref(), "Constraint", index);
        let expr = build_linear_expr(&spec.lhs, registry, &format!("constraint {}", name))?;
        let sign = parse_sign(&spec.sign, &name)?;
        model.add_constraint(LinearConstraint {
            name,
            expr,
            constraint_type: sign.constraint_type(),
            rhs: spec.rhs,
        });
    }
    model.update();

    debug!(count = constraints.len(), "linear constraints added");
    Ok(constraints.len())
}

/// Add `quadratic + linear + constant (sign) 0` for each quadratic
/// constraint, then commit the batch.
pub fn add_quadratic_constraints(
    model: Option<&mut Model>,
    constraints: &[QuadraticConstraintSpec],
    registry: &VariableRegistry,
) -> Result<usize, BuildError> {
    let model = model.ok_or(BuildError::ModelBuild("quadratic constraints"))?;

    for (index, spec) in constraints.iter().enumerate() {
        let name = resolved_name(spec.name.as_deref(), "QuadraticConstraint", index);
        let expr = build_quadratic_expr(
            &spec.quadratic_terms,
            &spec.linear_terms,
            spec.constant,
            registry,
            &format!("quadratic constraint {}", name),
        )?;
        let sign = parse_sign(&spec.sign, &name)?;
        model.add_quadratic_constraint(QuadraticConstraint {
            name,
            expr,
            constraint_type: sign.constraint_type(),
            rhs: 0.0,
        });
    }
    model.update();

    debug!(count = constraints.len(), "quadratic constraints added");
    Ok(constraints.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::add_variables;
    use crate::application::spec::{OrderedMap, QuadTermSpec, VarSpec};
    use crate::domain::ConstraintType;

    fn setup() -> (Model, VariableRegistry) {
        let vars: OrderedMap<VarSpec> = [("x", VarSpec::default()), ("y", VarSpec::default())]
            .into_iter()
            .collect();
        let mut model = Model::new("constraints");
        let registry = add_variables(Some(&mut model), &vars).unwrap();
        (model, registry)
    }

    fn linear(sign: &str, name: Option<&str>) -> LinearConstraintSpec {
        LinearConstraintSpec {
            lhs: [("x", 2.0), ("y", 1.0)].into_iter().collect(),
            rhs: 10.0,
            sign: sign.to_string(),
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn every_sign_maps_to_a_relation() {
        let (mut model, registry) = setup();
        let specs: Vec<_> = ["<=", "<", ">=", ">", "="]
            .iter()
            .map(|s| linear(s, None))
            .collect();
        let added = add_linear_constraints(Some(&mut model), &specs, &registry).unwrap();
        assert_eq!(added, 5);

        let relations: Vec<_> = model
            .linear_constraints()
            .iter()
            .map(|c| c.constraint_type)
            .collect();
        assert_eq!(
            relations,
            vec![
                ConstraintType::LessThanOrEqual,
                ConstraintType::LessThanOrEqual,
                ConstraintType::GreaterThanOrEqual,
                ConstraintType::GreaterThanOrEqual,
                ConstraintType::Equal,
            ]
        );
    }

    #[test]
    fn default_names_are_positional() {
        let (mut model, registry) = setup();
        let specs = vec![
            linear("<=", None),
            linear("<=", Some("c1")),
            linear(">=", None),
        ];
        add_linear_constraints(Some(&mut model), &specs, &registry).unwrap();

        let names: Vec<_> = model
            .linear_constraints()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Constraint_0", "c1", "Constraint_2"]);
    }

    #[test]
    fn invalid_sign_names_the_constraint() {
        let (mut model, registry) = setup();
        let err = add_linear_constraints(Some(&mut model), &[linear("~=", Some("c1"))], &registry)
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::InvalidSign {
                constraint: "c1".into(),
                sign: "~=".into()
            }
        );
    }

    #[test]
    fn quadratic_constraint_compares_against_zero() {
        let (mut model, registry) = setup();
        let spec = QuadraticConstraintSpec {
            quadratic_terms: vec![QuadTermSpec {
                var1: "x".into(),
                var2: "x".into(),
                coef: 1.0,
            }],
            linear_terms: [("y", 1.0)].into_iter().collect(),
            constant: -4.0,
            sign: ">".into(),
            name: None,
        };
        add_quadratic_constraints(Some(&mut model), &[spec], &registry).unwrap();

        let added = &model.quadratic_constraints()[0];
        assert_eq!(added.name, "QuadraticConstraint_0");
        assert_eq!(added.rhs, 0.0);
        assert_eq!(added.constraint_type, ConstraintType::GreaterThanOrEqual);
        assert_eq!(added.expr.evaluate(&[2.0, 1.0]), 1.0);
    }

    #[test]
    fn quadratic_invalid_sign_is_rejected() {
        let (mut model, registry) = setup();
        let spec = QuadraticConstraintSpec {
            quadratic_terms: Vec::new(),
            linear_terms: OrderedMap::new(),
            constant: 0.0,
            sign: "=>".into(),
            name: Some("q1".into()),
        };
        let err = add_quadratic_constraints(Some(&mut model), &[spec], &registry).unwrap_err();
        assert!(matches!(err, BuildError::InvalidSign { constraint, .. } if constraint == "q1"));
    }

    #[test]
    fn missing_container_is_a_build_error() {
        let (_, registry) = setup();
        assert_eq!(
            add_linear_constraints(None, &[], &registry),
            Err(BuildError::ModelBuild("constraints"))
        );
        assert_eq!(
            add_quadratic_constraints(None, &[], &registry),
            Err(BuildError::ModelBuild("quadratic constraints"))
        );
    }
}
