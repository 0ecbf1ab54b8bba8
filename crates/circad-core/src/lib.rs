#![forbid(unsafe_code)]

//! Core signal graph: components, branches, composite gates, and event-driven
//! signal propagation.
//!
//! This crate is the headless heart of the circuit engine. It knows nothing
//! about editors, commands, files, or string ids — it owns an arena of
//! components keyed by copyable handles and moves two-valued signals through
//! it. Everything observable (UI pin levels, editor state comparisons, the
//! persistence round-trip) is a function of this graph.
//!
//! # Invariants
//!
//! 1. Once propagation quiesces, every branch carries exactly the level its
//!    source emits at the connected output slot.
//! 2. Propagation is changed-only at every hop: delivering a level equal to
//!    the one already observed stops the wave.
//! 3. The graph is acyclic; a connection that would close a cycle is refused
//!    before any mutation.
//! 4. Components swallowed by a composite gate are frozen: no structural
//!    edit or external pin write can reach them.

pub mod composite;
pub mod gate;
pub mod graph;
pub mod signal;

pub use composite::Composite;
pub use gate::GateKind;
pub use graph::{
    BranchFault, BranchId, BranchInfo, Circuit, ComponentKind, DetachedNode, GraphError, NodeId,
};
pub use signal::Signal;
