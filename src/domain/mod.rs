// Domain module: model container, expressions and solver contract

pub mod error;
pub mod expression;
pub mod models;
pub mod solver_service;
pub mod value_objects;

pub use error::*;
pub use expression::*;
pub use models::*;
pub use solver_service::*;
pub use value_objects::*;
