// CPLEX LP text format: export of built models and reading them back

mod lexer;
mod reader;
mod writer;

pub use reader::{read_lp, LpParseError};
pub use writer::{to_lp_string, write_lp, write_lp_file};
