// Expression builder: term lists from the problem description to symbolic
// expressions over registered variables

use super::registry::VariableRegistry;
use super::spec::{OrderedMap, QuadTermSpec};
use crate::domain::{BuildError, LinearExpr, QuadExpr};

/// Sum `coef * var` over a `{var: coef}` term list.
///
/// `context` names the owner of the terms in error messages.
pub fn build_linear_expr(
    terms: &OrderedMap<f64>,
    registry: &VariableRegistry,
    context: &str,
) -> Result<LinearExpr, BuildError> {
    let mut expr = LinearExpr::new();
    for (key, &coef) in terms.iter() {
        expr.add_term(registry.resolve(key, context)?, coef);
    }
    Ok(expr)
}

/// Sum the quadratic products, then the linear part, then the constant
pub fn build_quadratic_expr(
    quad_terms: &[QuadTermSpec],
    linear_terms: &OrderedMap<f64>,
    constant: f64,
    registry: &VariableRegistry,
    context: &str,
) -> Result<QuadExpr, BuildError> {
    let mut expr = QuadExpr::new();
    for term in quad_terms {
        let var1 = registry.resolve(&term.var1, context)?;
        let var2 = registry.resolve(&term.var2, context)?;
        expr.add_quad_term(var1, var2, term.coef);
    }
    expr.linear = build_linear_expr(linear_terms, registry, context)?;
    expr.linear.add_constant(constant);
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::add_variables;
    use crate::application::spec::VarSpec;
    use crate::domain::Model;

    fn registry() -> VariableRegistry {
        let vars: OrderedMap<VarSpec> = [("x", VarSpec::default()), ("y", VarSpec::default())]
            .into_iter()
            .collect();
        let mut model = Model::new("exprs");
        add_variables(Some(&mut model), &vars).unwrap()
    }

    fn quad(var1: &str, var2: &str, coef: f64) -> QuadTermSpec {
        QuadTermSpec {
            var1: var1.into(),
            var2: var2.into(),
            coef,
        }
    }

    #[test]
    fn linear_terms_are_summed() {
        let terms: OrderedMap<f64> = [("x", 3.0), ("y", 2.0)].into_iter().collect();
        let expr = build_linear_expr(&terms, &registry(), "objective").unwrap();
        assert_eq!(expr.evaluate(&[5.0, 1.0]), 17.0);
        assert_eq!(expr.terms.len(), 2);
    }

    #[test]
    fn empty_term_lists_give_zero() {
        let expr = build_linear_expr(&OrderedMap::new(), &registry(), "objective").unwrap();
        assert!(expr.is_empty());

        let expr =
            build_quadratic_expr(&[], &OrderedMap::new(), 0.0, &registry(), "objective").unwrap();
        assert_eq!(expr.evaluate(&[3.0, 4.0]), 0.0);
    }

    #[test]
    fn zero_coefficients_are_kept_and_inert() {
        let terms: OrderedMap<f64> = [("x", 0.0)].into_iter().collect();
        let expr = build_linear_expr(&terms, &registry(), "c1").unwrap();
        assert_eq!(expr.terms.len(), 1);
        assert_eq!(expr.evaluate(&[42.0, 0.0]), 0.0);
    }

    #[test]
    fn quadratic_expression_adds_linear_part_and_constant() {
        let linear: OrderedMap<f64> = [("x", 1.0), ("y", -2.0)].into_iter().collect();
        let expr = build_quadratic_expr(
            &[quad("x", "x", 2.0), quad("x", "y", 1.0), quad("y", "y", 3.0)],
            &linear,
            -5.0,
            &registry(),
            "q1",
        )
        .unwrap();
        // 2*4 + 2*1 + 3*1 + 2 - 2 - 5 at (2, 1)
        assert_eq!(expr.evaluate(&[2.0, 1.0]), 8.0);
    }

    #[test]
    fn unknown_variable_is_never_zero() {
        let terms: OrderedMap<f64> = [("x", 1.0), ("z", 0.0)].into_iter().collect();
        let err = build_linear_expr(&terms, &registry(), "constraint c1").unwrap_err();
        assert_eq!(
            err,
            BuildError::UnknownVariable {
                name: "z".into(),
                context: "constraint c1".into()
            }
        );

        let err = build_quadratic_expr(
            &[quad("x", "w", 1.0)],
            &OrderedMap::new(),
            0.0,
            &registry(),
            "quadratic constraint q1",
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::UnknownVariable { name, .. } if name == "w"));
    }
}
