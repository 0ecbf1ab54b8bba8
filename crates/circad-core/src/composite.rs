#![forbid(unsafe_code)]

//! Composite gates: a frozen inner circuit packaged as a single component.
//!
//! A composite is built from an already-assembled inner [`Circuit`]. The
//! inner input pins (in creation order) become the composite's input slots
//! and the inner output pins its output slots. Construction freezes the
//! whole inner graph, so nothing outside the composite can edit it or drive
//! its pins directly; the composite itself delegates through
//! [`Composite::drive`].

use crate::graph::{Circuit, ComponentKind, GraphError, NodeId};
use crate::signal::Signal;

/// A gate whose behaviour is defined by a frozen inner sub-graph.
#[derive(Debug, Clone)]
pub struct Composite {
    circuit: Circuit,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    description: String,
}

impl Composite {
    /// Package `circuit` as a composite gate with the given interface pins
    /// and human-readable description. Freezes the inner graph.
    ///
    /// # Errors
    ///
    /// [`GraphError::BadComposite`] when an interface handle does not name
    /// an input/output pin of `circuit`.
    pub fn new(
        mut circuit: Circuit,
        inputs: Vec<NodeId>,
        outputs: Vec<NodeId>,
        description: impl Into<String>,
    ) -> Result<Self, GraphError> {
        for pin in &inputs {
            if circuit.kind(*pin) != Some(ComponentKind::InputPin) {
                return Err(GraphError::BadComposite);
            }
        }
        for pin in &outputs {
            if circuit.kind(*pin) != Some(ComponentKind::OutputPin) {
                return Err(GraphError::BadComposite);
            }
        }
        circuit.freeze();
        Ok(Composite {
            circuit,
            inputs,
            outputs,
            description: description.into(),
        })
    }

    /// Package a circuit using every inner input and output pin, in
    /// creation order, as the interface.
    ///
    /// # Errors
    ///
    /// Propagates [`Composite::new`] failures (not possible for the pin
    /// sets discovered here, but the signature stays honest).
    pub fn from_circuit(
        circuit: Circuit,
        description: impl Into<String>,
    ) -> Result<Self, GraphError> {
        let inputs: Vec<NodeId> = circuit.components_of(ComponentKind::InputPin).collect();
        let outputs: Vec<NodeId> = circuit.components_of(ComponentKind::OutputPin).collect();
        Composite::new(circuit, inputs, outputs, description)
    }

    /// Number of input slots.
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of output slots.
    #[must_use]
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// The human-readable name this composite was saved under.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The frozen inner circuit, for read-only inspection.
    #[must_use]
    pub fn inner(&self) -> &Circuit {
        &self.circuit
    }

    /// Deliver a level to an input slot by driving the matching inner pin.
    pub(crate) fn drive(&mut self, slot: usize, level: Signal) {
        if let Some(pin) = self.inputs.get(slot).copied() {
            self.circuit.force_input(pin, level);
        }
    }

    /// The level the inner output pin of `slot` currently emits.
    #[must_use]
    pub(crate) fn output_level(&self, slot: usize) -> Signal {
        self.outputs
            .get(slot)
            .and_then(|pin| self.circuit.output_level(*pin, 0))
            .unwrap_or(Signal::Low)
    }

    /// The level the inner input pin of `slot` currently holds.
    #[must_use]
    pub(crate) fn input_level(&self, slot: usize) -> Signal {
        self.inputs
            .get(slot)
            .and_then(|pin| self.circuit.output_level(*pin, 0))
            .unwrap_or(Signal::Low)
    }
}
