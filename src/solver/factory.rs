use crate::domain::{
    models::{Model, SolverConfig},
    solver_service::{SolverError, SolverService},
    value_objects::SolverBackend,
};
use crate::solver::{ClarabelSolver, HighsSolver};
use std::sync::Arc;

/// Factory for creating solver instances based on configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create the solver configured for a built model
    pub fn create_solver(
        model: &Model,
        config: &SolverConfig,
    ) -> Result<Arc<dyn SolverService>, SolverError> {
        Self::create_from_backend(Self::resolve(config.backend, model))
    }

    /// Concrete backend for `Auto`: Clarabel when anything is quadratic,
    /// HiGHS otherwise
    pub fn resolve(backend: SolverBackend, model: &Model) -> SolverBackend {
        match backend {
            SolverBackend::Auto if model.is_quadratic() => SolverBackend::Clarabel,
            SolverBackend::Auto => SolverBackend::Highs,
            other => other,
        }
    }

    /// Create a solver for a specific backend
    pub fn create_from_backend(
        backend: SolverBackend,
    ) -> Result<Arc<dyn SolverService>, SolverError> {
        match backend {
            SolverBackend::Auto | SolverBackend::Highs => Ok(Arc::new(HighsSolver::new())),
            SolverBackend::Clarabel => Ok(Arc::new(ClarabelSolver::new())),
            #[cfg(feature = "coin_cbc")]
            SolverBackend::CoinCbc => Ok(Arc::new(crate::solver::CoinCbcSolver::new())),
            #[cfg(not(feature = "coin_cbc"))]
            SolverBackend::CoinCbc => Err(SolverError::SolverNotAvailable(
                "COIN-OR CBC (build with the `coin_cbc` feature)".to_string(),
            )),
        }
    }

    /// Backends compiled into this build
    pub fn available() -> Vec<SolverBackend> {
        let mut backends = vec![SolverBackend::Highs, SolverBackend::Clarabel];
        if cfg!(feature = "coin_cbc") {
            backends.push(SolverBackend::CoinCbc);
        }
        backends
    }

    /// Get the default solver (HiGHS)
    pub fn default_solver() -> Arc<dyn SolverService> {
        Arc::new(HighsSolver::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OptimizationType, QuadExpr, VariableDef};

    fn quadratic_model() -> Model {
        let mut model = Model::new("q");
        let x = model.add_variable(VariableDef::continuous("x"));
        let mut obj = QuadExpr::new();
        obj.add_quad_term(x, x, 1.0);
        model.set_objective(obj, OptimizationType::Minimize);
        model.update();
        model
    }

    #[test]
    fn auto_follows_the_model_shape() {
        assert_eq!(
            SolverFactory::resolve(SolverBackend::Auto, &quadratic_model()),
            SolverBackend::Clarabel
        );
        assert_eq!(
            SolverFactory::resolve(SolverBackend::Auto, &Model::new("lp")),
            SolverBackend::Highs
        );
        assert_eq!(
            SolverFactory::resolve(SolverBackend::Highs, &quadratic_model()),
            SolverBackend::Highs
        );
    }

    #[test]
    fn created_solver_matches_backend() {
        let solver = SolverFactory::create_solver(&quadratic_model(), &SolverConfig::default()).unwrap();
        assert_eq!(solver.name(), "Clarabel");
        assert!(solver.supports_quadratic());
        assert_eq!(SolverFactory::default_solver().name(), "HiGHS");
    }

    #[cfg(not(feature = "coin_cbc"))]
    #[test]
    fn cbc_needs_its_feature() {
        assert!(matches!(
            SolverFactory::create_from_backend(SolverBackend::CoinCbc),
            Err(SolverError::SolverNotAvailable(_))
        ));
        assert!(!SolverFactory::available().contains(&SolverBackend::CoinCbc));
    }
}
