// Dense helpers for convexity checks on the (small) quadratic blocks of a model

use std::collections::BTreeMap;

use crate::domain::VarId;

/// Symmetric matrix over the variables a quadratic form touches.
///
/// `columns[k]` is the model column of local index `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricBlock {
    pub columns: Vec<usize>,
    pub values: Vec<Vec<f64>>,
}

impl SymmetricBlock {
    /// Matrix `S` with `x'Sx` equal to the sum of `c * xi * xj` over the terms
    pub fn from_terms(terms: &BTreeMap<(VarId, VarId), f64>) -> Self {
        let mut columns: Vec<usize> = terms
            .keys()
            .flat_map(|&(a, b)| [a.index(), b.index()])
            .collect();
        columns.sort_unstable();
        columns.dedup();

        let local = |column: usize| columns.binary_search(&column).unwrap_or(0);
        let n = columns.len();
        let mut values = vec![vec![0.0; n]; n];
        for (&(a, b), &coef) in terms {
            let (i, j) = (local(a.index()), local(b.index()));
            if i == j {
                values[i][i] += coef;
            } else {
                values[i][j] += coef / 2.0;
                values[j][i] += coef / 2.0;
            }
        }
        Self { columns, values }
    }

    fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().flatten().all(|&v| v == 0.0)
    }

    pub fn negate(&mut self) {
        for v in self.values.iter_mut().flatten() {
            *v = -*v;
        }
    }

    /// Rows of `F` with `S = F'F`, or `None` when `S` is not positive
    /// semidefinite.
    ///
    /// Runs an LDL' factorization without pivoting. A zero pivot is accepted
    /// only when the rest of its column is zero as well, which holds for every
    /// PSD matrix.
    pub fn psd_factor(&self) -> Option<Vec<Vec<f64>>> {
        let n = self.len();
        let scale = self
            .values
            .iter()
            .flatten()
            .fold(1.0_f64, |acc, v| acc.max(v.abs()));
        let tol = 1e-10 * scale;

        let mut l = vec![vec![0.0; n]; n];
        let mut d = vec![0.0; n];

        for j in 0..n {
            let dj = self.values[j][j] - (0..j).map(|k| l[j][k] * l[j][k] * d[k]).sum::<f64>();
            if dj < -tol {
                return None;
            }
            l[j][j] = 1.0;

            for i in (j + 1)..n {
                let v = self.values[i][j] - (0..j).map(|k| l[i][k] * l[j][k] * d[k]).sum::<f64>();
                if dj.abs() <= tol {
                    if v.abs() > tol {
                        return None;
                    }
                } else {
                    l[i][j] = v / dj;
                }
            }
            d[j] = if dj.abs() <= tol { 0.0 } else { dj };
        }

        let rows = (0..n)
            .filter(|&r| d[r] > 0.0)
            .map(|r| {
                let root = d[r].sqrt();
                (0..n).map(|i| root * l[i][r]).collect()
            })
            .collect();
        Some(rows)
    }
}
