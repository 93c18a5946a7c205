pub mod eval;
pub mod graph;
pub mod parser;
pub mod projectivity;
pub mod transition;

pub use self::graph::{Graph, Node};
pub use self::parser::{OracleScorer, Parser, Scorer};
pub use self::projectivity::PseudoProjective;
