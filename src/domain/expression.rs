// Symbolic linear and quadratic expressions over model variables

use std::collections::BTreeMap;

/// Handle of a decision variable inside one [`Model`](super::Model).
///
/// The index is the position of the variable in the model's column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Sum of `coefficient * variable` terms plus a constant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.constant == 0.0
    }

    /// Coefficients with repeated variables summed, in variable order
    pub fn coefficients(&self) -> BTreeMap<VarId, f64> {
        let mut merged = BTreeMap::new();
        for &(var, coef) in &self.terms {
            *merged.entry(var).or_insert(0.0) += coef;
        }
        merged
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coef)| coef * values.get(var.index()).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }

    pub fn scaled(&self, factor: f64) -> LinearExpr {
        LinearExpr {
            terms: self.terms.iter().map(|&(v, c)| (v, c * factor)).collect(),
            constant: self.constant * factor,
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = VarId> + '_ {
        self.terms.iter().map(|&(v, _)| v)
    }
}

/// Quadratic part `coef * var1 * var2` of an expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadTerm {
    pub var1: VarId,
    pub var2: VarId,
    pub coefficient: f64,
}

/// Sum of quadratic products plus a linear expression
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadExpr {
    pub quadratic: Vec<QuadTerm>,
    pub linear: LinearExpr,
}

impl QuadExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_linear(linear: LinearExpr) -> Self {
        Self {
            quadratic: Vec::new(),
            linear,
        }
    }

    pub fn add_quad_term(&mut self, var1: VarId, var2: VarId, coefficient: f64) {
        self.quadratic.push(QuadTerm {
            var1,
            var2,
            coefficient,
        });
    }

    pub fn has_quadratic(&self) -> bool {
        !self.quadratic.is_empty()
    }

    /// Quadratic coefficients keyed by ordered pair `(min, max)`.
    ///
    /// `x*y` and `y*x` land in the same entry.
    pub fn quadratic_coefficients(&self) -> BTreeMap<(VarId, VarId), f64> {
        let mut merged = BTreeMap::new();
        for term in &self.quadratic {
            let key = if term.var1 <= term.var2 {
                (term.var1, term.var2)
            } else {
                (term.var2, term.var1)
            };
            *merged.entry(key).or_insert(0.0) += term.coefficient;
        }
        merged
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        let value_of = |v: VarId| values.get(v.index()).copied().unwrap_or(0.0);
        self.quadratic
            .iter()
            .map(|t| t.coefficient * value_of(t.var1) * value_of(t.var2))
            .sum::<f64>()
            + self.linear.evaluate(values)
    }

    pub fn scaled(&self, factor: f64) -> QuadExpr {
        QuadExpr {
            quadratic: self
                .quadratic
                .iter()
                .map(|t| QuadTerm {
                    coefficient: t.coefficient * factor,
                    ..*t
                })
                .collect(),
            linear: self.linear.scaled(factor),
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = VarId> + '_ {
        self.quadratic
            .iter()
            .flat_map(|t| [t.var1, t.var2])
            .chain(self.linear.variables())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_expressions_evaluate_to_zero() {
        assert_eq!(LinearExpr::new().evaluate(&[1.0, 2.0]), 0.0);
        assert_eq!(QuadExpr::new().evaluate(&[]), 0.0);
    }

    #[test]
    fn repeated_terms_are_merged() {
        let mut expr = LinearExpr::new();
        expr.add_term(VarId(1), 2.0);
        expr.add_term(VarId(0), 1.0);
        expr.add_term(VarId(1), -0.5);
        let merged: Vec<_> = expr.coefficients().into_iter().collect();
        assert_eq!(merged, vec![(VarId(0), 1.0), (VarId(1), 1.5)]);
    }

    #[test]
    fn quadratic_pairs_are_symmetric() {
        let mut expr = QuadExpr::new();
        expr.add_quad_term(VarId(1), VarId(0), 2.0);
        expr.add_quad_term(VarId(0), VarId(1), 3.0);
        let merged = expr.quadratic_coefficients();
        assert_eq!(merged.get(&(VarId(0), VarId(1))), Some(&5.0));
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn quadratic_evaluation_includes_linear_part() {
        // x^2 + 2xy + 3y + 1 at (2, 1)
        let mut expr = QuadExpr::new();
        expr.add_quad_term(VarId(0), VarId(0), 1.0);
        expr.add_quad_term(VarId(0), VarId(1), 2.0);
        expr.linear.add_term(VarId(1), 3.0);
        expr.linear.add_constant(1.0);
        assert_eq!(expr.evaluate(&[2.0, 1.0]), 4.0 + 4.0 + 3.0 + 1.0);
        assert_eq!(expr.scaled(-1.0).evaluate(&[2.0, 1.0]), -12.0);
    }
}
