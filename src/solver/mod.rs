// Solver adapters module

pub(crate) mod branch_and_bound;
pub mod clarabel_solver;
#[cfg(feature = "coin_cbc")]
pub mod coin_cbc_solver;
pub mod factory;
pub mod highs_solver;
pub mod linalg;

pub use clarabel_solver::ClarabelSolver;
#[cfg(feature = "coin_cbc")]
pub use coin_cbc_solver::CoinCbcSolver;
pub use factory::SolverFactory;
pub use highs_solver::HighsSolver;
