use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::lexer::is_name;
use super::reader::section_header;
use crate::domain::{
    LinearExpr, Model, OptimizationType, QuadExpr, VarId, VariableDef, VariableType,
};

pub(crate) fn number(value: f64) -> String {
    if value == f64::INFINITY {
        "infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-infinity".to_string()
    } else {
        format!("{}", value)
    }
}

/// A name the reader gives back unchanged: one name token that is not a
/// section header or a bound keyword
fn is_lp_name(name: &str) -> bool {
    is_name(name)
        && section_header(name).is_none()
        && !matches!(
            name.to_ascii_lowercase().as_str(),
            "free" | "inf" | "infinity" | "subject" | "such"
        )
}

/// Names as written: the model's own where the LP grammar can carry them,
/// `<prefix><position>` where a name is invalid or repeats an earlier one.
fn lp_names<'m>(names: impl Iterator<Item = &'m str>, prefix: &str) -> Vec<String> {
    let names: Vec<&str> = names.collect();
    let mut taken = HashSet::new();
    let kept: Vec<bool> = names
        .iter()
        .map(|&name| is_lp_name(name) && taken.insert(name.to_string()))
        .collect();

    names
        .iter()
        .zip(kept)
        .enumerate()
        .map(|(i, (&name, kept))| {
            if kept {
                return name.to_string();
            }
            let mut fallback = format!("{}{}", prefix, i);
            while !taken.insert(fallback.clone()) {
                fallback.push('_');
            }
            fallback
        })
        .collect()
}

/// Column and row names for one write
struct LpNames {
    columns: Vec<String>,
    rows: Vec<String>,
}

impl LpNames {
    fn of(model: &Model) -> Self {
        let columns = lp_names(model.variables().iter().map(|v| v.name.as_str()), "C");
        let rows = lp_names(
            model
                .linear_constraints()
                .iter()
                .map(|c| c.name.as_str())
                .chain(model.quadratic_constraints().iter().map(|c| c.name.as_str())),
            "R",
        );
        Self { columns, rows }
    }
}

/// Appends `+ c name` / `- c name` terms, the first one without a leading `+`.
struct TermWriter<'a> {
    out: String,
    names: &'a [String],
    empty: bool,
}

impl<'a> TermWriter<'a> {
    fn new(names: &'a [String]) -> Self {
        Self {
            out: String::new(),
            names,
            empty: true,
        }
    }

    fn name(&self, var: VarId) -> &str {
        self.names.get(var.index()).map(String::as_str).unwrap_or("?")
    }

    fn sign(&mut self, coef: f64) -> f64 {
        if self.empty {
            if coef < 0.0 {
                self.out.push('-');
            }
        } else if coef < 0.0 {
            self.out.push_str(" - ");
        } else {
            self.out.push_str(" + ");
        }
        self.empty = false;
        coef.abs()
    }

    fn linear(&mut self, coefficients: &BTreeMap<VarId, f64>) {
        for (&var, &coef) in coefficients {
            let abs = self.sign(coef);
            let name = self.name(var).to_string();
            let _ = write!(self.out, "{} {}", number(abs), name);
        }
    }

    fn quadratic(&mut self, coefficients: &BTreeMap<(VarId, VarId), f64>, scale: f64) {
        if coefficients.is_empty() {
            return;
        }
        if self.empty {
            self.out.push_str("[ ");
        } else {
            self.out.push_str(" + [ ");
        }
        let mut inner = TermWriter::new(self.names);
        for (&(v1, v2), &coef) in coefficients {
            let abs = inner.sign(coef * scale);
            let term = if v1 == v2 {
                format!("{} {} ^ 2", number(abs), inner.name(v1))
            } else {
                format!("{} {} * {}", number(abs), inner.name(v1), inner.name(v2))
            };
            inner.out.push_str(&term);
        }
        self.out.push_str(&inner.out);
        self.out.push_str(" ]");
        self.empty = false;
    }

    fn constant(&mut self, value: f64) {
        if value != 0.0 {
            let abs = self.sign(value);
            self.out.push_str(&number(abs));
        }
    }

    fn finish(self) -> String {
        if self.empty {
            "0".to_string()
        } else {
            self.out
        }
    }
}

fn linear_text(names: &[String], expr: &LinearExpr) -> String {
    let mut terms = TermWriter::new(names);
    terms.linear(&expr.coefficients());
    terms.finish()
}

fn quadratic_text(names: &[String], expr: &QuadExpr) -> String {
    let mut terms = TermWriter::new(names);
    terms.linear(&expr.linear.coefficients());
    terms.quadratic(&expr.quadratic_coefficients(), 1.0);
    terms.finish()
}

fn objective_text(model: &Model, names: &[String]) -> String {
    let expr = &model.objective().expr;
    let quadratic = expr.quadratic_coefficients();
    let mut terms = TermWriter::new(names);
    terms.linear(&expr.linear.coefficients());
    terms.quadratic(&quadratic, 2.0);
    if !quadratic.is_empty() {
        terms.out.push_str(" / 2");
    }
    terms.constant(expr.linear.constant);
    terms.finish()
}

fn bound_line(var: &VariableDef, name: &str) -> Option<String> {
    let (lb, ub) = (var.lower_bound, var.upper_bound);
    let default_ub = if var.variable_type == VariableType::Binary {
        1.0
    } else {
        f64::INFINITY
    };

    if lb == 0.0 && ub == default_ub {
        None
    } else if lb == f64::NEG_INFINITY && ub == f64::INFINITY {
        Some(format!("{} free", name))
    } else if lb == ub {
        Some(format!("{} = {}", name, number(lb)))
    } else if lb != 0.0 && ub != f64::INFINITY {
        Some(format!("{} <= {} <= {}", number(lb), name, number(ub)))
    } else if lb != 0.0 {
        Some(format!("{} >= {}", name, number(lb)))
    } else {
        Some(format!("{} <= {}", name, number(ub)))
    }
}

/// Variables that appear in no expression and carry default bounds would be
/// lost on reading, so they get an explicit bound line.
fn unreferenced(model: &Model) -> Vec<bool> {
    let mut seen = vec![false; model.num_variables()];
    let mut mark = |v: VarId| {
        if let Some(flag) = seen.get_mut(v.index()) {
            *flag = true;
        }
    };
    model.objective().expr.variables().for_each(&mut mark);
    for c in model.linear_constraints() {
        c.expr.variables().for_each(&mut mark);
    }
    for c in model.quadratic_constraints() {
        c.expr.variables().for_each(&mut mark);
    }
    seen.into_iter().map(|s| !s).collect()
}

fn name_section<W: Write>(
    out: &mut W,
    header: &str,
    model: &Model,
    names: &[String],
    variable_type: VariableType,
) -> io::Result<()> {
    let section: Vec<&str> = model
        .variables()
        .iter()
        .zip(names)
        .filter(|(v, _)| v.variable_type == variable_type)
        .map(|(_, name)| name.as_str())
        .collect();
    if !section.is_empty() {
        writeln!(out, "{}", header)?;
        for name in section {
            writeln!(out, " {}", name)?;
        }
    }
    Ok(())
}

/// Write the committed state of `model` in CPLEX LP format.
///
/// Scalar semidefinite variables have no LP section and are written as
/// continuous variables. Names the format cannot carry, and repeated
/// names, are written positionally as `C<i>` for columns and `R<i>` for
/// rows.
pub fn write_lp<W: Write>(model: &Model, out: &mut W) -> io::Result<()> {
    let names = LpNames::of(model);
    let columns = names.columns.as_slice();

    // the model name sits in a comment line
    writeln!(out, "\\ Model {}", model.name().replace(['\r', '\n'], " "))?;
    writeln!(out, "\\ LP format - for model browsing")?;

    match model.objective().optimization_type {
        OptimizationType::Minimize => writeln!(out, "Minimize")?,
        OptimizationType::Maximize => writeln!(out, "Maximize")?,
    }
    writeln!(out, " obj: {}", objective_text(model, columns))?;

    writeln!(out, "Subject To")?;
    let mut rows = names.rows.iter();
    for (c, row) in model.linear_constraints().iter().zip(&mut rows) {
        let rhs = c.rhs - c.expr.constant;
        writeln!(
            out,
            " {}: {} {} {}",
            row,
            linear_text(columns, &c.expr),
            c.constraint_type.symbol(),
            number(rhs)
        )?;
    }
    for (c, row) in model.quadratic_constraints().iter().zip(rows) {
        let rhs = c.rhs - c.expr.linear.constant;
        writeln!(
            out,
            " {}: {} {} {}",
            row,
            quadratic_text(columns, &c.expr),
            c.constraint_type.symbol(),
            number(rhs)
        )?;
    }

    let lonely = unreferenced(model);
    let bounds: Vec<String> = model
        .variables()
        .iter()
        .zip(columns)
        .enumerate()
        .filter_map(|(i, (v, name))| {
            bound_line(v, name).or_else(|| lonely[i].then(|| format!("{} >= 0", name)))
        })
        .collect();
    if !bounds.is_empty() {
        writeln!(out, "Bounds")?;
        for line in bounds {
            writeln!(out, " {}", line)?;
        }
    }

    name_section(out, "Generals", model, columns, VariableType::Integer)?;
    name_section(out, "Binaries", model, columns, VariableType::Binary)?;
    name_section(out, "Semi-continuous", model, columns, VariableType::Semicontinuous)?;
    writeln!(out, "End")
}

pub fn to_lp_string(model: &Model) -> String {
    let mut buffer = Vec::new();
    // writing into a Vec cannot fail
    let _ = write_lp(model, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn write_lp_file(model: &Model, path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_lp(model, &mut out)?;
    out.flush()
}
