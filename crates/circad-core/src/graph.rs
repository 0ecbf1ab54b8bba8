#![forbid(unsafe_code)]

//! The component arena and the event-driven propagation engine.
//!
//! # Design
//!
//! Components (pins, gates, composite gates) live in an arena keyed by
//! [`NodeId`]; branches are separate entities keyed by [`BranchId`] and store
//! `(source, source_slot, sink, sink_slot)` plus the level they carry. All
//! mutation goes through [`Circuit`], so there is no shared-mutable aliasing
//! between components.
//!
//! Propagation is a worklist of branch deliveries rather than recursion, so
//! stack depth is independent of the longest logical path. The changed-only
//! rule is enforced at every hop:
//!
//! - setting an input pin to its current level does nothing,
//! - a branch whose source still emits the branch's carried level is skipped,
//! - a gate whose recomputed output equals the emitted level wakes nobody.
//!
//! # Invariants
//!
//! 1. Every branch's endpoints name valid slots of live nodes.
//! 2. After `flush` returns, `branch.level == source emitted level` for every
//!    branch reachable from the mutation.
//! 3. [`Circuit::connect`] performs all legality checks (slot range, double
//!    drive, endpoint kind, cycle) before the first mutation, so a refused
//!    connection leaves the graph untouched.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use thiserror::Error;

use crate::composite::Composite;
use crate::gate::GateKind;
use crate::signal::Signal;

/// Stable handle of a component in a [`Circuit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The raw handle value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Stable handle of a branch in a [`Circuit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchId(u32);

impl BranchId {
    /// The raw handle value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// What made a connection attempt malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchFault {
    /// The connection would close a cycle through the graph.
    Cycle,
    /// An endpoint slot index is outside the component's arity.
    SlotOutOfRange,
    /// The sink input slot is already driven by another branch.
    AlreadyDriven,
    /// The sink has no input slots (an input pin cannot be driven by a wire).
    SinkHasNoInputs,
    /// A branch cannot terminate on another branch.
    BranchEndpoint,
}

impl fmt::Display for BranchFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BranchFault::Cycle => "the connection would close a cycle",
            BranchFault::SlotOutOfRange => "slot index out of range",
            BranchFault::AlreadyDriven => "input slot is already driven",
            BranchFault::SinkHasNoInputs => "target component has no input slots",
            BranchFault::BranchEndpoint => "a branch cannot end on another branch",
        };
        f.write_str(text)
    }
}

/// Errors raised by graph operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A connection attempt was refused; the graph is untouched.
    #[error("malformed branch: {0}")]
    MalformedBranch(BranchFault),

    /// Structural edit or external pin write on a component frozen inside a
    /// composite gate.
    #[error("component is locked inside a composite gate")]
    Frozen,

    /// A handle did not resolve to a live component or branch.
    #[error("unknown component handle")]
    UnknownHandle,

    /// Illegal input count for a primitive gate.
    #[error("invalid input count {given} for {kind} gate")]
    BadArity {
        /// The gate function that rejected the arity.
        kind: GateKind,
        /// The requested input count.
        given: usize,
    },

    /// The component cannot be driven externally (only input pins can).
    #[error("component cannot be driven externally")]
    NotAnInputPin,

    /// A composite interface pin does not name a pin of the inner circuit.
    #[error("composite interface pin is not a pin of the inner circuit")]
    BadComposite,
}

/// The externally visible variant of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// A signal source with one output slot, set externally.
    InputPin,
    /// A signal sink with one input slot; re-emits its input on one output
    /// slot so it can feed an outer circuit when owned by a composite gate.
    OutputPin,
    /// A primitive combinational gate.
    Gate(GateKind),
    /// A gate defined by a frozen inner sub-graph.
    Composite,
}

#[derive(Debug, Clone)]
enum NodeKind {
    InputPin,
    OutputPin,
    Gate(GateKind),
    Composite(Composite),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    changeable: bool,
    in_levels: Vec<Signal>,
    in_branches: Vec<Option<BranchId>>,
    out_levels: Vec<Signal>,
    out_branches: Vec<Vec<BranchId>>,
}

impl Node {
    fn with_arity(kind: NodeKind, inputs: usize, outputs: usize) -> Self {
        Node {
            kind,
            changeable: true,
            in_levels: vec![Signal::Low; inputs],
            in_branches: vec![None; inputs],
            out_levels: vec![Signal::Low; outputs],
            out_branches: vec![Vec::new(); outputs],
        }
    }

    fn component_kind(&self) -> ComponentKind {
        match &self.kind {
            NodeKind::InputPin => ComponentKind::InputPin,
            NodeKind::OutputPin => ComponentKind::OutputPin,
            NodeKind::Gate(kind) => ComponentKind::Gate(*kind),
            NodeKind::Composite(_) => ComponentKind::Composite,
        }
    }
}

#[derive(Debug, Clone)]
struct Branch {
    source: NodeId,
    source_slot: usize,
    sink: NodeId,
    sink_slot: usize,
    level: Signal,
    changeable: bool,
}

/// A copy of a branch's endpoints and carried level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchInfo {
    /// Component emitting into the branch.
    pub source: NodeId,
    /// Output slot of the source.
    pub source_slot: usize,
    /// Component the branch drives.
    pub sink: NodeId,
    /// Input slot of the sink.
    pub sink_slot: usize,
    /// The level currently carried.
    pub level: Signal,
}

/// A component lifted out of a circuit by [`Circuit::remove`], with its
/// levels intact but all branch wiring stripped. Re-insert it with
/// [`Circuit::restore`].
#[derive(Debug, Clone)]
pub struct DetachedNode {
    node: Node,
}

impl DetachedNode {
    /// The variant of the detached component.
    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.node.component_kind()
    }
}

/// The signal graph: an arena of components and the branches linking them.
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    nodes: BTreeMap<NodeId, Node>,
    branches: BTreeMap<BranchId, Branch>,
    next_node: u32,
    next_branch: u32,
    deliveries: u64,
}

impl Circuit {
    /// Create an empty circuit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Construction ────────────────────────────────────────────────────

    /// Add an input pin: no input slots, one output slot, level low.
    pub fn add_input_pin(&mut self) -> NodeId {
        self.insert(Node::with_arity(NodeKind::InputPin, 0, 1))
    }

    /// Add an output pin: one input slot and one output slot re-emitting it.
    pub fn add_output_pin(&mut self) -> NodeId {
        self.insert(Node::with_arity(NodeKind::OutputPin, 1, 1))
    }

    /// Add a primitive gate with the given input arity.
    ///
    /// # Errors
    ///
    /// [`GraphError::BadArity`] when the arity is illegal for the gate kind
    /// (`Not` takes exactly one input, `And`/`Or` at least one).
    pub fn add_gate(&mut self, kind: GateKind, inputs: usize) -> Result<NodeId, GraphError> {
        if !kind.accepts_arity(inputs) {
            return Err(GraphError::BadArity {
                kind,
                given: inputs,
            });
        }
        Ok(self.insert(Node::with_arity(NodeKind::Gate(kind), inputs, 1)))
    }

    /// Add a composite gate. Its output slots start at the levels the frozen
    /// inner circuit settled on.
    pub fn add_composite(&mut self, composite: Composite) -> NodeId {
        let inputs = composite.input_count();
        let outputs = composite.output_count();
        let mut node = Node::with_arity(NodeKind::Composite(composite), inputs, outputs);
        if let NodeKind::Composite(inner) = &node.kind {
            for slot in 0..outputs {
                node.out_levels[slot] = inner.output_level(slot);
            }
            for slot in 0..inputs {
                node.in_levels[slot] = inner.input_level(slot);
            }
        }
        self.insert(node)
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Re-insert a component previously lifted out by [`Circuit::remove`].
    /// A fresh handle is assigned.
    pub fn restore(&mut self, detached: DetachedNode) -> NodeId {
        self.insert(detached.node)
    }

    // ── Wiring ──────────────────────────────────────────────────────────

    /// Connect `source`'s output slot to `sink`'s input slot.
    ///
    /// The new branch copies the source's current level and forwards it
    /// immediately. All legality checks run before any mutation.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownHandle`] for a dead endpoint,
    /// [`GraphError::Frozen`] when either endpoint is frozen, and
    /// [`GraphError::MalformedBranch`] for an out-of-range slot, a sink
    /// without input slots, a double-driven input, or a cycle.
    pub fn connect(
        &mut self,
        source: NodeId,
        source_slot: usize,
        sink: NodeId,
        sink_slot: usize,
    ) -> Result<BranchId, GraphError> {
        let src = self.nodes.get(&source).ok_or(GraphError::UnknownHandle)?;
        let dst = self.nodes.get(&sink).ok_or(GraphError::UnknownHandle)?;
        if !src.changeable || !dst.changeable {
            return Err(GraphError::Frozen);
        }
        if source_slot >= src.out_levels.len() {
            return Err(GraphError::MalformedBranch(BranchFault::SlotOutOfRange));
        }
        if dst.in_levels.is_empty() {
            return Err(GraphError::MalformedBranch(BranchFault::SinkHasNoInputs));
        }
        if sink_slot >= dst.in_levels.len() {
            return Err(GraphError::MalformedBranch(BranchFault::SlotOutOfRange));
        }
        if dst.in_branches[sink_slot].is_some() {
            return Err(GraphError::MalformedBranch(BranchFault::AlreadyDriven));
        }
        if self.reaches(sink, source) {
            return Err(GraphError::MalformedBranch(BranchFault::Cycle));
        }

        let id = BranchId(self.next_branch);
        self.next_branch += 1;
        self.branches.insert(
            id,
            Branch {
                source,
                source_slot,
                sink,
                sink_slot,
                level: Signal::Low,
                changeable: true,
            },
        );
        if let Some(src) = self.nodes.get_mut(&source) {
            src.out_branches[source_slot].push(id);
        }
        if let Some(dst) = self.nodes.get_mut(&sink) {
            dst.in_branches[sink_slot] = Some(id);
        }

        let mut queue = VecDeque::from([id]);
        self.flush(&mut queue);
        Ok(id)
    }

    /// Remove a branch, waking its sink slot with [`Signal::Low`].
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownHandle`] for a dead branch,
    /// [`GraphError::Frozen`] for a branch inside a composite gate.
    pub fn disconnect(&mut self, branch: BranchId) -> Result<(), GraphError> {
        let info = {
            let b = self.branches.get(&branch).ok_or(GraphError::UnknownHandle)?;
            if !b.changeable {
                return Err(GraphError::Frozen);
            }
            (b.source, b.source_slot, b.sink, b.sink_slot)
        };
        self.unlink(branch, info);

        // The sink no longer has an input on that slot.
        let mut queue = VecDeque::new();
        self.deliver(info.2, info.3, Signal::Low, &mut queue);
        self.flush(&mut queue);
        Ok(())
    }

    fn unlink(&mut self, branch: BranchId, info: (NodeId, usize, NodeId, usize)) {
        let (source, source_slot, sink, sink_slot) = info;
        if let Some(src) = self.nodes.get_mut(&source) {
            src.out_branches[source_slot].retain(|b| *b != branch);
        }
        if let Some(dst) = self.nodes.get_mut(&sink) {
            if dst.in_branches[sink_slot] == Some(branch) {
                dst.in_branches[sink_slot] = None;
            }
        }
        self.branches.remove(&branch);
    }

    /// Remove a component, tearing down every branch attached to it.
    ///
    /// Sinks of the removed outgoing branches are woken with low. Returns
    /// the detached component (levels intact) and the endpoint records of
    /// every branch that died with it.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownHandle`], or [`GraphError::Frozen`] for a
    /// component inside a composite gate.
    pub fn remove(
        &mut self,
        node: NodeId,
    ) -> Result<(DetachedNode, Vec<(BranchId, BranchInfo)>), GraphError> {
        {
            let n = self.nodes.get(&node).ok_or(GraphError::UnknownHandle)?;
            if !n.changeable {
                return Err(GraphError::Frozen);
            }
        }

        let attached = self.attached_branches(node);
        let mut removed = Vec::with_capacity(attached.len());
        for id in attached {
            let Some(info) = self.branch_info(id) else {
                continue;
            };
            removed.push((id, info));
            self.unlink(id, (info.source, info.source_slot, info.sink, info.sink_slot));
            if info.sink != node {
                // Wake surviving sinks; the dying node needs no notification.
                let mut queue = VecDeque::new();
                self.deliver(info.sink, info.sink_slot, Signal::Low, &mut queue);
                self.flush(&mut queue);
            }
        }

        let mut n = match self.nodes.remove(&node) {
            Some(n) => n,
            None => return Err(GraphError::UnknownHandle),
        };
        for slot in &mut n.in_branches {
            *slot = None;
        }
        for slot in &mut n.out_branches {
            slot.clear();
        }
        Ok((DetachedNode { node: n }, removed))
    }

    /// Drop every component and branch and reset the handle counters.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.branches.clear();
        self.next_node = 0;
        self.next_branch = 0;
    }

    /// Mark every component and branch as non-changeable.
    ///
    /// Used when this circuit becomes the inner graph of a composite gate.
    pub fn freeze(&mut self) {
        for node in self.nodes.values_mut() {
            node.changeable = false;
        }
        for branch in self.branches.values_mut() {
            branch.changeable = false;
        }
    }

    // ── Signals ─────────────────────────────────────────────────────────

    /// Drive an input pin to `level` and propagate the change.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownHandle`], [`GraphError::NotAnInputPin`] for a
    /// component that is not an input pin, or [`GraphError::Frozen`] for a
    /// pin swallowed by a composite gate.
    pub fn set_input(&mut self, pin: NodeId, level: Signal) -> Result<(), GraphError> {
        {
            let n = self.nodes.get(&pin).ok_or(GraphError::UnknownHandle)?;
            if !matches!(n.kind, NodeKind::InputPin) {
                return Err(GraphError::NotAnInputPin);
            }
            if !n.changeable {
                return Err(GraphError::Frozen);
            }
        }
        self.force_input(pin, level);
        Ok(())
    }

    /// Drive an input pin without the changeable check. Used by a composite
    /// gate delegating to its own frozen inner pins.
    pub(crate) fn force_input(&mut self, pin: NodeId, level: Signal) {
        let Some(n) = self.nodes.get_mut(&pin) else {
            return;
        };
        if n.out_levels[0] == level {
            return;
        }
        n.out_levels[0] = level;
        let mut queue: VecDeque<BranchId> = n.out_branches[0].iter().copied().collect();
        self.flush(&mut queue);
    }

    /// Drain the delivery worklist. Each entry is a branch whose source may
    /// now emit a different level than the branch carries.
    fn flush(&mut self, queue: &mut VecDeque<BranchId>) {
        while let Some(id) = queue.pop_front() {
            let Some(branch) = self.branches.get(&id) else {
                continue;
            };
            let emitted = match self.nodes.get(&branch.source) {
                Some(src) => src.out_levels[branch.source_slot],
                None => continue,
            };
            if branch.level == emitted {
                continue;
            }
            let (sink, sink_slot) = (branch.sink, branch.sink_slot);
            if let Some(branch) = self.branches.get_mut(&id) {
                branch.level = emitted;
            }
            self.deliver(sink, sink_slot, emitted, queue);
        }
    }

    /// Deliver a level into a node's input slot, recompute its outputs, and
    /// enqueue the branches of every output slot whose level changed.
    fn deliver(&mut self, sink: NodeId, slot: usize, level: Signal, queue: &mut VecDeque<BranchId>) {
        let Some(node) = self.nodes.get_mut(&sink) else {
            return;
        };
        if slot >= node.in_levels.len() {
            return;
        }
        self.deliveries += 1;
        node.in_levels[slot] = level;
        match &mut node.kind {
            NodeKind::InputPin => {}
            NodeKind::OutputPin => {
                if node.out_levels[0] != level {
                    node.out_levels[0] = level;
                    queue.extend(node.out_branches[0].iter().copied());
                }
            }
            NodeKind::Gate(kind) => {
                let out = kind.eval(&node.in_levels);
                if node.out_levels[0] != out {
                    node.out_levels[0] = out;
                    queue.extend(node.out_branches[0].iter().copied());
                }
            }
            NodeKind::Composite(inner) => {
                inner.drive(slot, level);
                for out_slot in 0..node.out_levels.len() {
                    let emitted = inner.output_level(out_slot);
                    if node.out_levels[out_slot] != emitted {
                        node.out_levels[out_slot] = emitted;
                        queue.extend(node.out_branches[out_slot].iter().copied());
                    }
                }
            }
        }
    }

    /// Whether `to` is reachable from `from` by following branches forward.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        let mut seen = BTreeSet::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            for slot in &node.out_branches {
                for id in slot {
                    if let Some(branch) = self.branches.get(id) {
                        if branch.sink == to {
                            return true;
                        }
                        stack.push(branch.sink);
                    }
                }
            }
        }
        false
    }

    // ── Observation ─────────────────────────────────────────────────────

    /// The variant of a component.
    #[must_use]
    pub fn kind(&self, node: NodeId) -> Option<ComponentKind> {
        self.nodes.get(&node).map(Node::component_kind)
    }

    /// The level a component emits at an output slot.
    #[must_use]
    pub fn output_level(&self, node: NodeId, slot: usize) -> Option<Signal> {
        self.nodes.get(&node)?.out_levels.get(slot).copied()
    }

    /// The level a component observes at an input slot.
    #[must_use]
    pub fn input_level(&self, node: NodeId, slot: usize) -> Option<Signal> {
        self.nodes.get(&node)?.in_levels.get(slot).copied()
    }

    /// Number of input slots of a component.
    #[must_use]
    pub fn input_arity(&self, node: NodeId) -> Option<usize> {
        self.nodes.get(&node).map(|n| n.in_levels.len())
    }

    /// Number of output slots of a component.
    #[must_use]
    pub fn output_arity(&self, node: NodeId) -> Option<usize> {
        self.nodes.get(&node).map(|n| n.out_levels.len())
    }

    /// Whether a component may still be structurally edited.
    #[must_use]
    pub fn is_changeable(&self, node: NodeId) -> Option<bool> {
        self.nodes.get(&node).map(|n| n.changeable)
    }

    /// The description of a composite gate, if `node` is one.
    #[must_use]
    pub fn description(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Composite(c) => Some(c.description()),
            _ => None,
        }
    }

    /// The inner circuit of a composite gate, for read-only inspection.
    #[must_use]
    pub fn composite_inner(&self, node: NodeId) -> Option<&Circuit> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Composite(c) => Some(c.inner()),
            _ => None,
        }
    }

    /// Endpoints and carried level of a branch.
    #[must_use]
    pub fn branch_info(&self, branch: BranchId) -> Option<BranchInfo> {
        self.branches.get(&branch).map(|b| BranchInfo {
            source: b.source,
            source_slot: b.source_slot,
            sink: b.sink,
            sink_slot: b.sink_slot,
            level: b.level,
        })
    }

    /// Every branch touching `node`, incoming and outgoing, in id order.
    #[must_use]
    pub fn attached_branches(&self, node: NodeId) -> Vec<BranchId> {
        let Some(n) = self.nodes.get(&node) else {
            return Vec::new();
        };
        let mut ids: Vec<BranchId> = n.in_branches.iter().flatten().copied().collect();
        for slot in &n.out_branches {
            ids.extend(slot.iter().copied());
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Component handles in creation order.
    pub fn components(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Components of one kind, in creation order.
    pub fn components_of(&self, kind: ComponentKind) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(move |(_, n)| n.component_kind() == kind)
            .map(|(id, _)| *id)
    }

    /// Branch handles in creation order.
    pub fn branch_ids(&self) -> impl Iterator<Item = BranchId> + '_ {
        self.branches.keys().copied()
    }

    /// Number of components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of branches.
    #[must_use]
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Whether the circuit holds no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total slot deliveries performed since construction. Diagnostic
    /// counter for observing the changed-only propagation rule.
    #[must_use]
    pub fn deliveries_total(&self) -> u64 {
        self.deliveries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Signal::{High, Low};

    fn and2(circuit: &mut Circuit) -> (NodeId, NodeId, NodeId, NodeId) {
        let i0 = circuit.add_input_pin();
        let i1 = circuit.add_input_pin();
        let gate = circuit.add_gate(GateKind::And, 2).unwrap();
        let out = circuit.add_output_pin();
        circuit.connect(i0, 0, gate, 0).unwrap();
        circuit.connect(i1, 0, gate, 1).unwrap();
        circuit.connect(gate, 0, out, 0).unwrap();
        (i0, i1, gate, out)
    }

    #[test]
    fn and_gate_truth_table_end_to_end() {
        let mut circuit = Circuit::new();
        let (i0, i1, _, out) = and2(&mut circuit);

        let cases = [
            (Low, Low, Low),
            (Low, High, Low),
            (High, Low, Low),
            (High, High, High),
        ];
        for (a, b, expected) in cases {
            circuit.set_input(i0, a).unwrap();
            circuit.set_input(i1, b).unwrap();
            assert_eq!(circuit.output_level(out, 0), Some(expected), "{a} & {b}");
        }
    }

    #[test]
    fn repeated_set_is_idempotent() {
        let mut circuit = Circuit::new();
        let pin = circuit.add_input_pin();
        let gate = circuit.add_gate(GateKind::Not, 1).unwrap();
        let out = circuit.add_output_pin();
        circuit.connect(pin, 0, gate, 0).unwrap();
        circuit.connect(gate, 0, out, 0).unwrap();

        circuit.set_input(pin, High).unwrap();
        assert_eq!(circuit.output_level(out, 0), Some(Low));
        let before = circuit.deliveries_total();
        circuit.set_input(pin, High).unwrap();
        assert_eq!(circuit.deliveries_total(), before, "second set must be silent");
    }

    #[test]
    fn branch_copies_source_level_on_connect() {
        let mut circuit = Circuit::new();
        let pin = circuit.add_input_pin();
        let out = circuit.add_output_pin();
        circuit.set_input(pin, High).unwrap();
        let branch = circuit.connect(pin, 0, out, 0).unwrap();
        assert_eq!(circuit.branch_info(branch).unwrap().level, High);
        assert_eq!(circuit.output_level(out, 0), Some(High));
    }

    #[test]
    fn disconnect_wakes_sink_low() {
        let mut circuit = Circuit::new();
        let pin = circuit.add_input_pin();
        let out = circuit.add_output_pin();
        let branch = circuit.connect(pin, 0, out, 0).unwrap();
        circuit.set_input(pin, High).unwrap();
        assert_eq!(circuit.output_level(out, 0), Some(High));

        circuit.disconnect(branch).unwrap();
        assert_eq!(circuit.output_level(out, 0), Some(Low));
        assert_eq!(circuit.branch_count(), 0);
    }

    #[test]
    fn double_driven_input_is_refused() {
        let mut circuit = Circuit::new();
        let a = circuit.add_input_pin();
        let b = circuit.add_input_pin();
        let out = circuit.add_output_pin();
        circuit.connect(a, 0, out, 0).unwrap();
        let err = circuit.connect(b, 0, out, 0).unwrap_err();
        assert_eq!(
            err,
            GraphError::MalformedBranch(BranchFault::AlreadyDriven)
        );
        assert_eq!(circuit.branch_count(), 1);
    }

    #[test]
    fn cycle_is_refused_without_mutation() {
        let mut circuit = Circuit::new();
        let g1 = circuit.add_gate(GateKind::And, 2).unwrap();
        let g2 = circuit.add_gate(GateKind::Or, 2).unwrap();
        circuit.connect(g1, 0, g2, 0).unwrap();
        let before = circuit.branch_count();
        let err = circuit.connect(g2, 0, g1, 0).unwrap_err();
        assert_eq!(err, GraphError::MalformedBranch(BranchFault::Cycle));
        assert_eq!(circuit.branch_count(), before);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut circuit = Circuit::new();
        let gate = circuit.add_gate(GateKind::And, 2).unwrap();
        let err = circuit.connect(gate, 0, gate, 1).unwrap_err();
        assert_eq!(err, GraphError::MalformedBranch(BranchFault::Cycle));
    }

    #[test]
    fn out_of_range_slot_is_refused() {
        let mut circuit = Circuit::new();
        let pin = circuit.add_input_pin();
        let gate = circuit.add_gate(GateKind::And, 2).unwrap();
        let err = circuit.connect(pin, 0, gate, 2).unwrap_err();
        assert_eq!(
            err,
            GraphError::MalformedBranch(BranchFault::SlotOutOfRange)
        );
        let err = circuit.connect(pin, 1, gate, 0).unwrap_err();
        assert_eq!(
            err,
            GraphError::MalformedBranch(BranchFault::SlotOutOfRange)
        );
    }

    #[test]
    fn input_pin_cannot_be_a_sink() {
        let mut circuit = Circuit::new();
        let a = circuit.add_input_pin();
        let b = circuit.add_input_pin();
        let err = circuit.connect(a, 0, b, 0).unwrap_err();
        assert_eq!(
            err,
            GraphError::MalformedBranch(BranchFault::SinkHasNoInputs)
        );
    }

    #[test]
    fn bad_arity_is_refused() {
        let mut circuit = Circuit::new();
        assert_eq!(
            circuit.add_gate(GateKind::Not, 2).unwrap_err(),
            GraphError::BadArity {
                kind: GateKind::Not,
                given: 2
            }
        );
        assert_eq!(
            circuit.add_gate(GateKind::And, 0).unwrap_err(),
            GraphError::BadArity {
                kind: GateKind::And,
                given: 0
            }
        );
    }

    #[test]
    fn remove_tears_down_attached_branches() {
        let mut circuit = Circuit::new();
        let (i0, _, gate, out) = and2(&mut circuit);
        circuit.set_input(i0, High).unwrap();

        let (detached, removed) = circuit.remove(gate).unwrap();
        assert_eq!(detached.kind(), ComponentKind::Gate(GateKind::And));
        assert_eq!(removed.len(), 3);
        assert_eq!(circuit.branch_count(), 0);
        // The downstream output pin was told its input went away.
        assert_eq!(circuit.output_level(out, 0), Some(Low));
    }

    #[test]
    fn restore_preserves_levels() {
        let mut circuit = Circuit::new();
        let pin = circuit.add_input_pin();
        circuit.set_input(pin, High).unwrap();
        let (detached, _) = circuit.remove(pin).unwrap();
        let pin = circuit.restore(detached);
        assert_eq!(circuit.output_level(pin, 0), Some(High));
    }

    #[test]
    fn frozen_components_reject_edits() {
        let mut circuit = Circuit::new();
        let pin = circuit.add_input_pin();
        let out = circuit.add_output_pin();
        let branch = circuit.connect(pin, 0, out, 0).unwrap();
        circuit.freeze();

        assert_eq!(circuit.set_input(pin, High).unwrap_err(), GraphError::Frozen);
        assert_eq!(circuit.disconnect(branch).unwrap_err(), GraphError::Frozen);
        assert_eq!(circuit.remove(pin).unwrap_err(), GraphError::Frozen);
    }

    #[test]
    fn set_input_rejects_non_pins() {
        let mut circuit = Circuit::new();
        let gate = circuit.add_gate(GateKind::Or, 2).unwrap();
        assert_eq!(
            circuit.set_input(gate, High).unwrap_err(),
            GraphError::NotAnInputPin
        );
    }

    #[test]
    fn clear_resets_handles() {
        let mut circuit = Circuit::new();
        let first = circuit.add_input_pin();
        circuit.clear();
        assert!(circuit.is_empty());
        let second = circuit.add_input_pin();
        assert_eq!(first, second);
    }

    #[test]
    fn output_pin_can_feed_forward() {
        // An output pin may itself drive a branch, for composite wiring.
        let mut circuit = Circuit::new();
        let pin = circuit.add_input_pin();
        let mid = circuit.add_output_pin();
        let end = circuit.add_output_pin();
        circuit.connect(pin, 0, mid, 0).unwrap();
        circuit.connect(mid, 0, end, 0).unwrap();
        circuit.set_input(pin, High).unwrap();
        assert_eq!(circuit.output_level(end, 0), Some(High));
    }
}
