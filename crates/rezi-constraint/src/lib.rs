//! Constraint expression parsing, dependency-graph construction, topological
//! ordering, and evaluation for size/display props backed by expressions
//! (as opposed to plain integers/percentages, which the layout engine
//! resolves on its own — see `rezi-layout`).
//!
//! This crate knows nothing about VNodes or runtime instances: callers
//! collect a flat `Vec<ConstraintNodeInput>` by walking their own tree and
//! hand it to [`graph::ConstraintGraph::build`].

pub mod error;
pub mod expr;
mod graph;
mod node;
pub mod parse;
mod resolver;

pub use error::ConstraintError;
pub use expr::{BinaryOp, Expr, Func, Metric, Scope};
pub use graph::ConstraintGraph;
pub use node::{ConstraintNodeInput, ConstraintProp, node_key};
pub use resolver::{ResolveCache, ResolveContext, ResolvedValues, resolve};
