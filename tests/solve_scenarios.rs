use optool::application::BuildState;
use optool::{
    BuildError, OptimizationProblem, ProblemSpec, SolveFailure, SolveOrchestrator, SolverBackend,
    SolverConfig,
};
use serde_json::{json, Value};

const TOL: f64 = 1e-6;

fn fixture(name: &str) -> Value {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn scenario_a() -> Value {
    json!({
        "problem": {"type": "LP"},
        "objective": {"type": "maximize", "function_type": "linear", "linear_terms": {"x": 3, "y": 2}},
        "variables": {
            "x": {"type": "continuous", "lb": 0},
            "y": {"type": "continuous", "lb": 0, "ub": 1}
        },
        "constraints": {"linear_constraints": [{"lhs": {"x": 2, "y": 1}, "rhs": 10, "sign": "<=", "name": "c1"}]}
    })
}

fn build_error(spec: Value) -> BuildError {
    match SolveOrchestrator::default().solve_json(spec) {
        Err(SolveFailure::Build(e)) => e,
        other => panic!("expected a build failure, got {:?}", other),
    }
}

#[test]
fn scenario_a_solves_to_the_lp_optimum() {
    let result = SolveOrchestrator::default().solve_json(scenario_a()).unwrap();
    assert_eq!(result.status, 2);
    // c1 leaves x = (10 - y) / 2, so each unit of y nets 0.5 and y sits at 1
    assert!((result.objective_value - 15.5).abs() < TOL);
    assert!((result.solution["x"] - 4.5).abs() < TOL);
    assert!((result.solution["y"] - 1.0).abs() < TOL);
}

#[test]
fn scenario_b_qp_refuses_quadratic_constraints() {
    let mut spec = scenario_a();
    spec["problem"]["type"] = json!("QP");
    spec["constraints"]["quadratic_constraints"] = json!([{
        "quadratic_terms": [{"var1": "x", "var2": "x", "coef": 1}],
        "constant": -4,
        "sign": "<="
    }]);
    assert!(matches!(
        build_error(spec),
        BuildError::UnsupportedConstraint { count: 1, .. }
    ));
}

#[test]
fn scenario_c_lp_refuses_a_quadratic_objective() {
    let mut spec = scenario_a();
    spec["objective"]["function_type"] = json!("quadratic");
    spec["objective"]["quadratic_terms"] = json!([{"var1": "x", "var2": "x", "coef": 1}]);

    let mut problem = OptimizationProblem::from_spec(ProblemSpec::from_json(spec).unwrap()).unwrap();
    let err = problem.build().unwrap_err();
    assert!(matches!(err, BuildError::ObjectiveTypeMismatch { ref found, .. } if found == "quadratic"));
    assert!(problem.model().is_none());
}

#[test]
fn scenario_d_invalid_sign_names_the_constraint() {
    let mut spec = scenario_a();
    spec["constraints"]["linear_constraints"][0]["sign"] = json!("~=");
    assert_eq!(
        build_error(spec),
        BuildError::InvalidSign {
            constraint: "c1".into(),
            sign: "~=".into()
        }
    );
}

#[test]
fn milp_assignment_picks_the_best_pairs() {
    let result = SolveOrchestrator::default().solve_json(fixture("MILP1.json")).unwrap();
    assert_eq!(result.status, 2);
    assert!((result.objective_value - 193.0).abs() < TOL);
    for chosen in ["x_Resource1_Job1", "x_Resource2_Job3", "x_Resource3_Job2"] {
        assert!((result.solution[chosen] - 1.0).abs() < TOL, "{}", chosen);
    }
    let assigned: f64 = result.solution.values().sum();
    assert!((assigned - 3.0).abs() < TOL);
}

#[test]
fn qp_fixture_projects_onto_the_halfspace() {
    let result = SolveOrchestrator::default().solve_json(fixture("QP1.json")).unwrap();
    assert_eq!(result.status, 2);
    assert!((result.objective_value - 14.0).abs() < 1e-4);
    for (name, expected) in [("x", 1.0), ("y", 2.0), ("z", 3.0)] {
        assert!((result.solution[name] - expected).abs() < 1e-4, "{}", name);
    }
}

#[test]
fn qcp_fixture_touches_the_disc() {
    let result = SolveOrchestrator::default().solve_json(fixture("QCP1.json")).unwrap();
    assert_eq!(result.status, 2);
    assert!((result.objective_value - 2.0).abs() < 1e-4);
    assert!((result.solution["x"] - 1.0).abs() < 1e-4);
    assert!((result.solution["y"] - 1.0).abs() < 1e-4);
}

#[test]
fn qp_variant_refuses_a_linear_objective() {
    let mut spec = scenario_a();
    spec["problem"]["type"] = json!("QP");
    assert!(matches!(
        build_error(spec.clone()),
        BuildError::ObjectiveTypeMismatch { ref expected, ref found, .. }
            if expected == "quadratic" && found == "linear"
    ));

    // the same objective written as quadratic with no quadratic terms
    spec["objective"]["function_type"] = json!("quadratic");
    let result = SolveOrchestrator::default().solve_json(spec).unwrap();
    assert!((result.objective_value - 15.5).abs() < 1e-4);
}

#[test]
fn semicontinuous_variable_jumps_to_its_lower_bound() {
    let spec = json!({
        "problem": {"type": "MILP"},
        "objective": {"type": "minimize", "function_type": "linear", "linear_terms": {"s": 1, "t": 1}},
        "variables": {
            "s": {"type": "semicontinuous", "lb": 2, "ub": 5},
            "t": {"type": "semicontinuous", "lb": 3, "ub": 4}
        },
        "constraints": {"linear_constraints": [{"lhs": {"s": 1}, "rhs": 1, "sign": ">="}]}
    });
    let result = SolveOrchestrator::default().solve_json(spec).unwrap();
    assert!((result.solution["s"] - 2.0).abs() < TOL);
    assert!(result.solution["t"].abs() < TOL);
    assert!((result.objective_value - 2.0).abs() < TOL);
}

#[test]
fn solution_uses_display_names() {
    let mut spec = scenario_a();
    spec["variables"]["x"]["name"] = json!("widgets");
    let result = SolveOrchestrator::default().solve_json(spec).unwrap();
    assert!(result.solution.contains_key("widgets"));
    assert!(!result.solution.contains_key("x"));
}

#[test]
fn unknown_variable_is_never_a_zero_term() {
    let mut spec = scenario_a();
    spec["constraints"]["linear_constraints"][0]["lhs"]["ghost"] = json!(5);
    assert!(matches!(
        build_error(spec),
        BuildError::UnknownVariable { ref name, ref context } if name == "ghost" && context.contains("c1")
    ));
}

#[test]
fn separate_builds_of_one_spec_agree() {
    for spec in [scenario_a(), fixture("MILP1.json"), fixture("QP1.json"), fixture("QCP1.json")] {
        let spec = ProblemSpec::from_json(spec).unwrap();
        let mut first = OptimizationProblem::create(spec.clone()).unwrap();
        let mut second = OptimizationProblem::create(spec).unwrap();
        assert!(matches!(first.state(), BuildState::Built(_)));
        assert!(first.model().is_some());
        assert_eq!(first.model(), second.model());

        let orchestrator = SolveOrchestrator::default();
        let x = orchestrator.solve_problem(&mut first).unwrap();
        let y = orchestrator.solve_problem(&mut second).unwrap();
        assert_eq!(x.status, 2);
        assert_eq!(x.status, y.status);
        assert!((x.objective_value - y.objective_value).abs() < TOL, "{}", first.name());
    }
}

#[test]
fn infeasible_models_report_their_status() {
    let mut spec = scenario_a();
    spec["constraints"]["linear_constraints"][0]["sign"] = json!(">=");
    spec["constraints"]["linear_constraints"][0]["rhs"] = json!(100);
    spec["variables"]["x"]["ub"] = json!(1);
    let err = SolveOrchestrator::default().solve_json(spec).unwrap_err();
    // presolve may stop at "infeasible or unbounded"
    assert!(matches!(err.status_code(), Some(3) | Some(4)), "{}", err);
    assert!(err.to_string().starts_with("Error: Optimization failed with status"));
}

#[test]
fn integer_quadratic_models_are_solved() {
    // min (n - 2.6)^2 as n^2 - 5.2 n over integers
    let miqp = json!({
        "problem": {"type": "MIQP"},
        "objective": {
            "type": "minimize", "function_type": "quadratic", "linear_terms": {"n": -5.2},
            "quadratic_terms": [{"var1": "n", "var2": "n", "coef": 1}]
        },
        "variables": {"n": {"type": "integer", "lb": 0, "ub": 5}},
        "constraints": {}
    });
    let result = SolveOrchestrator::default().solve_json(miqp).unwrap();
    assert_eq!(result.status, 2);
    assert_eq!(result.solution["n"], 3.0);
    assert!((result.objective_value + 6.6).abs() < 1e-5);

    // max x + y over integer points of the disc x^2 + y^2 <= 5
    let miqcp = json!({
        "problem": {"type": "MIQCP"},
        "objective": {"type": "maximize", "function_type": "linear", "linear_terms": {"x": 1, "y": 1}},
        "variables": {"x": {"type": "integer"}, "y": {"type": "integer"}},
        "constraints": {"quadratic_constraints": [{
            "quadratic_terms": [{"var1": "x", "var2": "x", "coef": 1}, {"var1": "y", "var2": "y", "coef": 1}],
            "constant": -5,
            "sign": "<=",
            "name": "disc"
        }]}
    });
    let result = SolveOrchestrator::default().solve_json(miqcp).unwrap();
    assert_eq!(result.status, 2);
    assert!((result.objective_value - 3.0).abs() < 1e-5);
    assert_eq!(result.solution["x"] + result.solution["y"], 3.0);
}

#[test]
fn explicit_backend_is_honoured() {
    let config = SolverConfig {
        backend: SolverBackend::Clarabel,
        ..SolverConfig::default()
    };
    let result = SolveOrchestrator::new(config).solve_json(scenario_a()).unwrap();
    assert_eq!(result.status, 2);
    assert!((result.objective_value - 15.5).abs() < 1e-4);
}
