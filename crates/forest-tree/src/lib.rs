//! Event-tree construction and evaluation (spec C5/C6): compiles declarative
//! `simulation_instructions` into an explicit tree once per run, then walks
//! it per stand, applying guarded treatments and persisting every node.
#![allow(dead_code)]

mod builder;
mod evaluator;
mod generator;
mod node;
mod sink;

pub use builder::build_tree;
pub use evaluator::evaluate_tree;
pub use generator::{EventDecl, Generator, SimulationInstruction};
pub use node::{ProcessedTreatment, TreeNode};
pub use sink::{NullSink, Sink};
