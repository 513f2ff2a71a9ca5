//! Reaction dependency graph: derived-value rules, debounced scheduling,
//! cycle refusal, settle barrier.

mod graph;
mod types;

pub use graph::{ReactionGraph, ReactionId, RegisteredReaction};
pub use types::{ActionFn, ComputeFn, Reaction, ReactionHost};
