// Branch and bound over Clarabel relaxations for mixed-integer convex models
// (MIQP, MIQCP). Integer columns branch on floor/ceil; semi-continuous
// columns branch on {0} against [lb, ub].

use std::time::Instant;

use tracing::debug;

use crate::domain::{
    models::{Model, Solution, SolverConfig},
    solver_service::Result,
    value_objects::{OptimizationType, SolutionStatus, VariableType},
};
use crate::solver::clarabel_solver::relax;

const INTEGRALITY_TOL: f64 = 1e-6;
/// Relative gap used when the config sets none
const DEFAULT_GAP: f64 = 1e-6;
const MAX_NODES: usize = 100_000;

type Bounds = Vec<(f64, f64)>;

/// Column domains at the root: integer bounds rounded inward, semi-continuous
/// columns widened to take in zero
fn root_bounds(model: &Model) -> Bounds {
    model
        .variables()
        .iter()
        .map(|var| {
            let (lower, upper) = var.effective_bounds();
            match var.variable_type {
                VariableType::Integer | VariableType::Binary => (lower.ceil(), upper.floor()),
                VariableType::Semicontinuous => (lower.min(0.0), upper.max(0.0)),
                _ => (lower, upper),
            }
        })
        .collect()
}

/// First column the relaxed point leaves outside its domain, with the two
/// child domains to try, nearer one first
fn branch(model: &Model, bounds: &[(f64, f64)], x: &[f64]) -> Option<(usize, [(f64, f64); 2])> {
    model
        .variables()
        .iter()
        .zip(bounds.iter().zip(x))
        .enumerate()
        .find_map(|(i, (var, (&(lower, upper), &value)))| match var.variable_type {
            VariableType::Integer | VariableType::Binary => {
                let (down, up) = ((lower, value.floor()), (value.ceil(), upper));
                if (value - value.round()).abs() <= INTEGRALITY_TOL {
                    None
                } else if value - value.floor() < 0.5 {
                    Some((i, [down, up]))
                } else {
                    Some((i, [up, down]))
                }
            }
            VariableType::Semicontinuous => {
                let threshold = var.lower_bound;
                if value <= INTEGRALITY_TOL || value >= threshold - INTEGRALITY_TOL {
                    return None;
                }
                let (off, on) = ((0.0, 0.0), (threshold, upper));
                if value < threshold / 2.0 {
                    Some((i, [off, on]))
                } else {
                    Some((i, [on, off]))
                }
            }
            _ => None,
        })
}

/// Integer columns rounded, semi-continuous columns snapped to zero
fn snapped(model: &Model, mut x: Vec<f64>) -> Vec<f64> {
    for (value, var) in x.iter_mut().zip(model.variables()) {
        match var.variable_type {
            VariableType::Integer | VariableType::Binary => *value = value.round(),
            VariableType::Semicontinuous if value.abs() <= INTEGRALITY_TOL => *value = 0.0,
            _ => {}
        }
    }
    x
}

/// Depth-first branch and bound. Every node is a Clarabel solve, so the
/// model has to be convex for the bounds to be valid.
pub(crate) fn solve(model: &Model, config: &SolverConfig) -> Result<Solution> {
    let start = Instant::now();
    let sense = match model.objective().optimization_type {
        OptimizationType::Minimize => 1.0,
        OptimizationType::Maximize => -1.0,
    };
    let gap = config.gap_tolerance.unwrap_or(DEFAULT_GAP);

    let mut incumbent: Option<(f64, Vec<f64>)> = None;
    let mut stack = vec![root_bounds(model)];
    let mut nodes = 0;
    let mut stopped = None;

    while let Some(bounds) = stack.pop() {
        let elapsed = start.elapsed().as_secs_f64();
        if config.time_limit.is_some_and(|limit| elapsed >= limit) {
            stopped = Some(SolutionStatus::TimeLimit);
            break;
        }
        if nodes == MAX_NODES {
            stopped = Some(SolutionStatus::NodeLimit);
            break;
        }
        nodes += 1;

        if bounds.iter().any(|&(lower, upper)| lower > upper) {
            continue;
        }

        let node_config = SolverConfig {
            time_limit: config.time_limit.map(|limit| (limit - elapsed).max(0.0)),
            verbose: false,
            ..config.clone()
        };
        let relaxation = relax(model, &bounds, &node_config)?;
        match relaxation.status {
            SolutionStatus::Optimal => {}
            SolutionStatus::Infeasible => continue,
            SolutionStatus::TimeLimit => {
                stopped = Some(SolutionStatus::TimeLimit);
                break;
            }
            other => {
                debug!(nodes, status = %other, "relaxation stopped the search");
                return Ok(Solution::new(
                    other,
                    format!("Relaxation stopped with status {}", other),
                ));
            }
        }

        let value = sense * model.objective().expr.evaluate(&relaxation.x);
        if let Some((best, _)) = &incumbent {
            if value >= best - gap * best.abs().max(1.0) {
                continue;
            }
        }

        match branch(model, &bounds, &relaxation.x) {
            None => incumbent = Some((value, relaxation.x)),
            Some((column, [first, second])) => {
                let mut later = bounds.clone();
                later[column] = second;
                let mut sooner = bounds;
                sooner[column] = first;
                stack.push(later);
                stack.push(sooner);
            }
        }
    }

    debug!(nodes, found = incumbent.is_some(), "branch and bound finished");
    let solution = match (incumbent, stopped) {
        (Some((_, x)), stopped) => Solution::with_point(
            stopped.unwrap_or(SolutionStatus::Optimal),
            model,
            snapped(model, x),
        ),
        (None, Some(status)) => Solution::new(
            status,
            "Search stopped before an integer feasible point was found",
        ),
        (None, None) => Solution::new(
            SolutionStatus::Infeasible,
            "Problem is infeasible: no integer point satisfies all constraints",
        ),
    };
    Ok(solution)
}
