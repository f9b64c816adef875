use std::collections::HashMap;

use thiserror::Error;

use super::lexer::{Lexer, Token, TokenKind};
use crate::domain::{
    ConstraintType, LinearConstraint, Model, OptimizationType, QuadExpr, QuadraticConstraint,
    VarId, VariableDef, VariableType,
};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct LpParseError {
    pub line: usize,
    pub message: String,
}

impl LpParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

type Result<T> = std::result::Result<T, LpParseError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Objective(OptimizationType),
    Constraints,
    Bounds,
    Generals,
    Binaries,
    SemiContinuous,
    End,
}

pub(crate) fn section_header(line: &str) -> Option<Section> {
    let key = line
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    let section = match key.as_str() {
        "minimize" | "minimum" | "min" => Section::Objective(OptimizationType::Minimize),
        "maximize" | "maximum" | "max" => Section::Objective(OptimizationType::Maximize),
        "subject to" | "such that" | "st" | "s.t." => Section::Constraints,
        "bounds" | "bound" => Section::Bounds,
        "generals" | "general" | "gen" => Section::Generals,
        "binaries" | "binary" | "bin" => Section::Binaries,
        "semi-continuous" | "semis" | "semi" => Section::SemiContinuous,
        "end" => Section::End,
        _ => return None,
    };
    Some(section)
}

/// Variables in order of first appearance
#[derive(Default)]
struct Columns {
    defs: Vec<VariableDef>,
    index: HashMap<String, VarId>,
    explicit_bounds: Vec<bool>,
}

impl Columns {
    fn get_or_add(&mut self, name: &str) -> VarId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = VarId(self.defs.len());
        self.defs.push(VariableDef::continuous(name));
        self.explicit_bounds.push(false);
        self.index.insert(name.to_string(), id);
        id
    }

    fn def_mut(&mut self, id: VarId) -> &mut VariableDef {
        &mut self.defs[id.index()]
    }

    /// Apply `var (relation) value`
    fn bound(&mut self, id: VarId, relation: TokenKind, value: f64) {
        self.explicit_bounds[id.index()] = true;
        let def = self.def_mut(id);
        match relation {
            TokenKind::Le => def.upper_bound = value,
            TokenKind::Ge => def.lower_bound = value,
            _ => {
                def.lower_bound = value;
                def.upper_bound = value;
            }
        }
    }

    fn set_type(&mut self, id: VarId, variable_type: VariableType) {
        let explicit = self.explicit_bounds[id.index()];
        let def = self.def_mut(id);
        def.variable_type = variable_type;
        if variable_type == VariableType::Binary && !explicit {
            def.lower_bound = 0.0;
            def.upper_bound = 1.0;
        }
    }
}

fn mirrored(relation: TokenKind) -> TokenKind {
    match relation {
        TokenKind::Le => TokenKind::Ge,
        TokenKind::Ge => TokenKind::Le,
        other => other,
    }
}

fn constraint_type(relation: TokenKind) -> ConstraintType {
    match relation {
        TokenKind::Le => ConstraintType::LessThanOrEqual,
        TokenKind::Ge => ConstraintType::GreaterThanOrEqual,
        _ => ConstraintType::Equal,
    }
}

fn is_relation(token: &Token) -> bool {
    matches!(token.kind, TokenKind::Le | TokenKind::Ge | TokenKind::Eq)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Line reported when the tokens run out
    end_line: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token], end_line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end_line,
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + offset)
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.is(kind))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn error(&self, message: impl Into<String>) -> LpParseError {
        let line = self.peek().map(|t| t.line).unwrap_or(self.end_line);
        LpParseError::new(line, message)
    }

    fn unexpected(&self, expected: &str) -> LpParseError {
        match self.peek() {
            Some(token) => self.error(format!("expected {}, found '{}'", expected, token.text)),
            None => self.error(format!("expected {}, found end of section", expected)),
        }
    }

    /// `name:` label in front of an objective or constraint
    fn label(&mut self) -> Option<&'t str> {
        let name = self.peek()?;
        if name.is(TokenKind::Ident) && self.peek_at(1).is_some_and(|t| t.is(TokenKind::Colon)) {
            self.pos += 2;
            Some(&name.text)
        } else {
            None
        }
    }

    fn number(&mut self) -> Result<f64> {
        match self.peek() {
            Some(token) if token.is(TokenKind::Number) => {
                let value = token
                    .text
                    .parse::<f64>()
                    .map_err(|_| self.error(format!("invalid number '{}'", token.text)))?;
                self.pos += 1;
                Ok(value)
            }
            Some(token) if token.is_infinity() => {
                self.pos += 1;
                Ok(f64::INFINITY)
            }
            _ => Err(self.unexpected("a number")),
        }
    }

    fn signs(&mut self) -> Option<f64> {
        let mut sign = None;
        while let Some(token) = self.peek() {
            let flip = match token.kind {
                TokenKind::Plus => 1.0,
                TokenKind::Minus => -1.0,
                _ => break,
            };
            sign = Some(sign.unwrap_or(1.0) * flip);
            self.pos += 1;
        }
        sign
    }

    /// Signed number or infinity
    fn value(&mut self) -> Result<f64> {
        let sign = self.signs().unwrap_or(1.0);
        Ok(sign * self.number()?)
    }

    fn starts_value(&self) -> bool {
        let mut offset = 0;
        while self
            .peek_at(offset)
            .is_some_and(|t| t.is(TokenKind::Plus) || t.is(TokenKind::Minus))
        {
            offset += 1;
        }
        match self.peek_at(offset) {
            Some(t) if t.is(TokenKind::Number) => true,
            Some(t) if t.is_infinity() => {
                offset > 0 || self.peek_at(offset + 1).is_some_and(is_relation)
            }
            _ => false,
        }
    }

    fn relation(&mut self) -> Result<TokenKind> {
        match self.peek() {
            Some(token) if is_relation(token) => {
                self.pos += 1;
                Ok(token.kind)
            }
            _ => Err(self.unexpected("'<=', '>=' or '='")),
        }
    }

    fn name(&mut self) -> Result<&'t str> {
        match self.peek() {
            Some(token) if token.is(TokenKind::Ident) => {
                self.pos += 1;
                Ok(&token.text)
            }
            _ => Err(self.unexpected("a variable name")),
        }
    }

    /// `[ c x ^ 2 + c x * y ... ]`, optionally followed by `/ 2`
    fn quadratic_block(&mut self, columns: &mut Columns, sign: f64, expr: &mut QuadExpr) -> Result<()> {
        let mut terms = Vec::new();
        loop {
            if self.peek_is(TokenKind::RBracket) {
                self.pos += 1;
                break;
            }
            let term_sign = self.signs().unwrap_or(1.0);
            let coef = if self.peek_is(TokenKind::Number) {
                self.number()?
            } else {
                1.0
            };
            let var1 = columns.get_or_add(self.name()?);
            let var2 = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Caret) => {
                    self.pos += 1;
                    let power = self.number()?;
                    if power != 2.0 {
                        return Err(self.error(format!("unsupported power {}", power)));
                    }
                    var1
                }
                Some(TokenKind::Star) => {
                    self.pos += 1;
                    columns.get_or_add(self.name()?)
                }
                _ => return Err(self.unexpected("'^ 2' or '* name'")),
            };
            terms.push((var1, var2, term_sign * coef));
        }

        let divisor = if self.peek_is(TokenKind::Slash) {
            self.pos += 1;
            self.number()?
        } else {
            1.0
        };
        if divisor == 0.0 {
            return Err(self.error("division by zero"));
        }
        for (var1, var2, coef) in terms {
            expr.add_quad_term(var1, var2, sign * coef / divisor);
        }
        Ok(())
    }

    /// Sum of terms up to a relation or the end of the section
    fn expression(&mut self, columns: &mut Columns) -> Result<QuadExpr> {
        let mut expr = QuadExpr::new();
        loop {
            let explicit_sign = self.signs();
            let sign = explicit_sign.unwrap_or(1.0);
            let Some(token) = self.peek() else {
                if explicit_sign.is_some() {
                    return Err(self.unexpected("a term"));
                }
                break;
            };

            match token.kind {
                TokenKind::LBracket => {
                    self.pos += 1;
                    self.quadratic_block(columns, sign, &mut expr)?;
                }
                TokenKind::Number => {
                    let coef = sign * self.number()?;
                    let names_variable = self.peek_is(TokenKind::Ident)
                        && !self.peek_at(1).is_some_and(|t| t.is(TokenKind::Colon));
                    if names_variable {
                        let var = columns.get_or_add(self.name()?);
                        expr.linear.add_term(var, coef);
                    } else {
                        expr.linear.add_constant(coef);
                    }
                }
                TokenKind::Ident if !self.peek_at(1).is_some_and(|t| t.is(TokenKind::Colon)) => {
                    let var = columns.get_or_add(self.name()?);
                    expr.linear.add_term(var, sign);
                }
                _ if explicit_sign.is_some() => return Err(self.unexpected("a term")),
                _ => break,
            }
        }
        Ok(expr)
    }
}

struct ParsedConstraint {
    name: String,
    expr: QuadExpr,
    relation: TokenKind,
    rhs: f64,
}

fn tokenize(lines: &[(usize, &str)]) -> Vec<Token> {
    lines
        .iter()
        .flat_map(|&(line, text)| Lexer::tokenize(text, line))
        .collect()
}

fn check_tokens(tokens: &[Token]) -> Result<()> {
    match tokens.iter().find(|t| t.is(TokenKind::Error)) {
        Some(bad) => Err(LpParseError::new(
            bad.line,
            format!("unexpected character '{}'", bad.text),
        )),
        None => Ok(()),
    }
}

fn parse_objective(lines: &[(usize, &str)], header_line: usize, columns: &mut Columns) -> Result<QuadExpr> {
    let tokens = tokenize(lines);
    check_tokens(&tokens)?;
    let mut parser = Parser::new(&tokens, header_line);
    parser.label();
    let expr = parser.expression(columns)?;
    if !parser.at_end() {
        return Err(parser.unexpected("end of objective"));
    }
    Ok(expr)
}

fn parse_constraints(
    lines: &[(usize, &str)],
    header_line: usize,
    columns: &mut Columns,
) -> Result<Vec<ParsedConstraint>> {
    let tokens = tokenize(lines);
    check_tokens(&tokens)?;
    let mut parser = Parser::new(&tokens, header_line);
    let mut constraints = Vec::new();
    while !parser.at_end() {
        let name = match parser.label() {
            Some(name) => name.to_string(),
            None => format!("R{}", constraints.len() + 1),
        };
        let expr = parser.expression(columns)?;
        let relation = parser.relation()?;
        let rhs = parser.value()?;
        constraints.push(ParsedConstraint {
            name,
            expr,
            relation,
            rhs,
        });
    }
    Ok(constraints)
}

/// One bound per line: `x free`, `x <= u`, `l <= x`, `l <= x <= u`
fn parse_bounds(lines: &[(usize, &str)], columns: &mut Columns) -> Result<()> {
    for &(line, text) in lines {
        let tokens = Lexer::tokenize(text, line);
        if tokens.is_empty() {
            continue;
        }
        check_tokens(&tokens)?;
        let mut parser = Parser::new(&tokens, line);

        if parser.starts_value() {
            let lower = parser.value()?;
            let relation = parser.relation()?;
            let var = columns.get_or_add(parser.name()?);
            columns.bound(var, mirrored(relation), lower);
            if !parser.at_end() {
                let relation = parser.relation()?;
                let upper = parser.value()?;
                columns.bound(var, relation, upper);
            }
        } else {
            let var = columns.get_or_add(parser.name()?);
            let is_free = parser
                .peek()
                .is_some_and(|t| t.is(TokenKind::Ident) && t.text.eq_ignore_ascii_case("free"));
            if is_free {
                parser.pos += 1;
                columns.bound(var, TokenKind::Ge, f64::NEG_INFINITY);
                columns.bound(var, TokenKind::Le, f64::INFINITY);
            } else {
                let relation = parser.relation()?;
                let value = parser.value()?;
                columns.bound(var, relation, value);
            }
        }

        if !parser.at_end() {
            return Err(parser.unexpected("end of bound"));
        }
    }
    Ok(())
}

fn parse_names(
    lines: &[(usize, &str)],
    columns: &mut Columns,
    variable_type: VariableType,
) -> Result<()> {
    let tokens = tokenize(lines);
    for token in &tokens {
        if !token.is(TokenKind::Ident) {
            return Err(LpParseError::new(
                token.line,
                format!("expected a variable name, found '{}'", token.text),
            ));
        }
        let var = columns.get_or_add(&token.text);
        columns.set_type(var, variable_type);
    }
    Ok(())
}

fn model_name(text: &str) -> String {
    text.lines()
        .find_map(|line| line.trim().strip_prefix("\\ Model "))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "lp".to_string())
}

/// Parse CPLEX LP text into a committed model.
///
/// Variables are created in order of first appearance. Constraints without a
/// label are named `R1`, `R2`, ... by position.
pub fn read_lp(text: &str) -> Result<Model> {
    let mut sections: Vec<(Section, usize, Vec<(usize, &str)>)> = Vec::new();
    let mut last_line = 0;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        last_line = line;
        let content = raw.split('\\').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        if let Some(section) = section_header(content) {
            if section == Section::End {
                sections.push((section, line, Vec::new()));
                break;
            }
            sections.push((section, line, Vec::new()));
            continue;
        }
        match sections.last_mut() {
            Some((_, _, lines)) => lines.push((line, content)),
            None => return Err(LpParseError::new(line, "expected a section header")),
        }
    }

    let mut columns = Columns::default();
    let mut objective = None;
    let mut constraints = Vec::new();
    let mut seen_end = false;

    for (section, header_line, lines) in &sections {
        match *section {
            Section::Objective(direction) => {
                if objective.is_some() {
                    return Err(LpParseError::new(*header_line, "second objective section"));
                }
                let expr = parse_objective(lines, *header_line, &mut columns)?;
                objective = Some((expr, direction));
            }
            Section::Constraints => {
                constraints.extend(parse_constraints(lines, *header_line, &mut columns)?);
            }
            Section::Bounds => parse_bounds(lines, &mut columns)?,
            Section::Generals => parse_names(lines, &mut columns, VariableType::Integer)?,
            Section::Binaries => parse_names(lines, &mut columns, VariableType::Binary)?,
            Section::SemiContinuous => {
                parse_names(lines, &mut columns, VariableType::Semicontinuous)?
            }
            Section::End => seen_end = true,
        }
    }

    let Some((objective, direction)) = objective else {
        return Err(LpParseError::new(1, "missing objective section"));
    };
    if !seen_end {
        return Err(LpParseError::new(last_line, "missing 'End'"));
    }

    let mut model = Model::new(model_name(text));
    for def in columns.defs {
        model.add_variable(def);
    }
    for c in constraints {
        let constraint_type = constraint_type(c.relation);
        if c.expr.has_quadratic() {
            let mut expr = c.expr;
            expr.linear.add_constant(-c.rhs);
            model.add_quadratic_constraint(QuadraticConstraint {
                name: c.name,
                expr,
                constraint_type,
                rhs: 0.0,
            });
        } else {
            let mut expr = c.expr.linear;
            let rhs = c.rhs - expr.constant;
            expr.constant = 0.0;
            model.add_constraint(LinearConstraint {
                name: c.name,
                expr,
                constraint_type,
                rhs,
            });
        }
    }
    model.set_objective(objective, direction);
    model.update();
    Ok(model)
}
