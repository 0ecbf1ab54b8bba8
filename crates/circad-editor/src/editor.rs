#![forbid(unsafe_code)]

//! One live circuit plus its undo/redo history.
//!
//! The editor owns the signal graph, the id-to-handle map, the two command
//! stacks, the file info, and the status sink. Every mutation of the graph
//! routes through [`Editor::execute`] so the history stays truthful.
//!
//! # Invariants
//!
//! 1. `past.len()` equals the number of net executions since the last clear.
//! 2. `execute` pushes onto the past stack and empties the future stack.
//! 3. `undo`/`redo` move exactly one command between the stacks, or do
//!    nothing at all on an empty stack.
//! 4. Every id in the item map resolves to a live handle of the circuit.

use std::fmt;

use serde::Serialize;

use circad_core::{BranchId, Circuit, NodeId, Signal};

use crate::command::{Command, ComponentType, Undoable};
use crate::error::{EditorError, Result};
use crate::logging::debug;
use crate::manager::ItemManager;
use crate::persist::{self, Workspace};
use crate::registry::{CloseDecision, ClosePrompt};

/// Handle of a first-class component: a graph node or a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentRef {
    /// A pin, gate, or composite gate.
    Node(NodeId),
    /// A wire.
    Branch(BranchId),
}

/// The file an editor is editing, and whether it has unsaved changes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileInfo {
    filename: Option<String>,
    dirty: bool,
}

impl FileInfo {
    /// The current filename, once one has been chosen.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Whether there are unsaved changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record that the current state is on disk.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Record an unsaved change.
    pub fn mark_unsaved(&mut self) {
        self.dirty = true;
    }

    /// Record the filename the editor is now bound to.
    pub fn set_file(&mut self, filename: impl Into<String>) {
        self.filename = Some(filename.into());
    }
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.filename.as_deref().unwrap_or("untitled"),
            if self.dirty { "*" } else { "" }
        )
    }
}

/// Push-message sink the UI renders. Messages accumulate newest-last.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusBar {
    messages: Vec<String>,
}

impl StatusBar {
    /// Append a message.
    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// The most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }

    /// Every message pushed so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// The live circuit, its component registry, and its command history.
#[derive(Debug, Clone)]
pub struct Editor {
    pub(crate) circuit: Circuit,
    pub(crate) items: ItemManager<ComponentRef>,
    past: Vec<Command>,
    future: Vec<Command>,
    file_info: FileInfo,
    status_bar: StatusBar,
    templates: Vec<Command>,
}

impl Editor {
    /// Create an empty editor with the standard id generators registered.
    #[must_use]
    pub fn new() -> Self {
        let mut items = ItemManager::new();
        Self::register_generators(&mut items);
        Editor {
            circuit: Circuit::new(),
            items,
            past: Vec::new(),
            future: Vec::new(),
            file_info: FileInfo::default(),
            status_bar: StatusBar::default(),
            templates: Vec::new(),
        }
    }

    fn register_generators(items: &mut ItemManager<ComponentRef>) {
        for ty in ComponentType::ALL {
            items.add_generator(ty.generator(), ty.id_template());
        }
        items.add_generator("gate", "gate{}");
    }

    // ── History ─────────────────────────────────────────────────────────

    /// Run a command and push it onto the undo stack.
    ///
    /// # Errors
    ///
    /// [`EditorError::RequirementUnfulfilled`] when the command is not
    /// ready, or whatever the command itself raises. A failed command is
    /// not recorded and the graph is untouched.
    pub fn execute(&mut self, mut command: Command) -> Result<()> {
        if !command.can_execute() {
            return Err(EditorError::RequirementUnfulfilled(command.to_string()));
        }
        command.execute(self)?;
        debug!(command = %command, "executed");
        self.past.push(command);
        self.future.clear();
        self.file_info.mark_unsaved();
        Ok(())
    }

    /// Unexecute the newest past command. Returns `false` (and changes
    /// nothing) when the history is empty.
    ///
    /// # Errors
    ///
    /// Propagates a failed unexecute; the command stays on the past stack.
    pub fn undo(&mut self) -> Result<bool> {
        let Some(mut command) = self.past.pop() else {
            return Ok(false);
        };
        match command.unexecute(self) {
            Ok(()) => {
                debug!(command = %command, "undone");
                self.future.push(command);
                self.file_info.mark_unsaved();
                Ok(true)
            }
            Err(e) => {
                self.past.push(command);
                Err(e)
            }
        }
    }

    /// Re-execute the newest undone command. Returns `false` (and changes
    /// nothing) when there is nothing to redo.
    ///
    /// # Errors
    ///
    /// Propagates a failed re-execute; the command stays on the future
    /// stack.
    pub fn redo(&mut self) -> Result<bool> {
        let Some(mut command) = self.future.pop() else {
            return Ok(false);
        };
        match command.execute(self) {
            Ok(()) => {
                debug!(command = %command, "redone");
                self.past.push(command);
                self.file_info.mark_unsaved();
                Ok(true)
            }
            Err(e) => {
                self.future.push(command);
                Err(e)
            }
        }
    }

    /// Destroy every component and empty both history stacks. The id
    /// generators restart, so a subsequent replay regenerates identical ids.
    pub fn clear(&mut self) {
        self.circuit.clear();
        let mut items = ItemManager::new();
        Self::register_generators(&mut items);
        self.items = items;
        self.past.clear();
        self.future.clear();
        self.file_info.mark_unsaved();
    }

    /// Replace the circuit, component registry, and history stacks with
    /// those of `other`, keeping this editor's file info, status bar, and
    /// palette templates. Used when a replayed file swaps in wholesale.
    pub(crate) fn adopt(&mut self, other: Editor) {
        self.circuit = other.circuit;
        self.items = other.items;
        self.past = other.past;
        self.future = other.future;
    }

    /// Number of commands on the past stack.
    #[must_use]
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    /// Number of commands on the future stack.
    #[must_use]
    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// The executed command history, oldest first. This is what SAVE writes.
    #[must_use]
    pub fn past_commands(&self) -> &[Command] {
        &self.past
    }

    // ── Composite templates ─────────────────────────────────────────────

    /// Register a user-defined composite-gate template so it becomes
    /// selectable as a component type. Does **not** execute it.
    pub fn add_create_command(&mut self, command: Command) {
        self.templates.push(command);
    }

    /// The registered composite-gate templates, in registration order.
    #[must_use]
    pub fn create_templates(&self) -> &[Command] {
        &self.templates
    }

    // ── Components ──────────────────────────────────────────────────────

    /// Resolve a component id.
    ///
    /// # Errors
    ///
    /// [`EditorError::MissingComponent`] when the id has no binding.
    pub fn resolve(&self, id: &str) -> Result<ComponentRef> {
        self.items.get(id).map(|r| *r)
    }

    /// `(id, handle)` pairs of every first-class component, in id order.
    pub fn components(&self) -> impl Iterator<Item = (&str, ComponentRef)> {
        self.items.iter().map(|(id, r)| (id, *r))
    }

    /// Number of registered components (branches included).
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.items.len()
    }

    /// The signal graph, for read-only inspection by the UI.
    #[must_use]
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Drive an input pin by id.
    ///
    /// # Errors
    ///
    /// [`EditorError::MissingComponent`] for an unknown id, or the graph's
    /// refusal for non-pins and frozen pins.
    pub fn set_input(&mut self, id: &str, level: Signal) -> Result<()> {
        match self.resolve(id)? {
            ComponentRef::Node(node) => Ok(self.circuit.set_input(node, level)?),
            ComponentRef::Branch(_) => {
                Err(EditorError::Graph(circad_core::GraphError::NotAnInputPin))
            }
        }
    }

    /// The signal a component presents: a pin or gate's first output slot,
    /// or the level a branch carries.
    ///
    /// # Errors
    ///
    /// [`EditorError::MissingComponent`] for an unknown id.
    pub fn level(&self, id: &str) -> Result<Signal> {
        match self.resolve(id)? {
            ComponentRef::Node(node) => self
                .circuit
                .output_level(node, 0)
                .ok_or(EditorError::Graph(circad_core::GraphError::UnknownHandle)),
            ComponentRef::Branch(branch) => self
                .circuit
                .branch_info(branch)
                .map(|info| info.level)
                .ok_or(EditorError::Graph(circad_core::GraphError::UnknownHandle)),
        }
    }

    /// The signal a multi-output component emits at `slot`.
    ///
    /// # Errors
    ///
    /// [`EditorError::MissingComponent`] for an unknown id, or an
    /// out-of-range slot reported through the graph error.
    pub fn output_level(&self, id: &str, slot: usize) -> Result<Signal> {
        match self.resolve(id)? {
            ComponentRef::Node(node) => {
                self.circuit.output_level(node, slot).ok_or(EditorError::Graph(
                    circad_core::GraphError::MalformedBranch(circad_core::BranchFault::SlotOutOfRange),
                ))
            }
            ComponentRef::Branch(_) => Err(EditorError::Graph(
                circad_core::GraphError::MalformedBranch(circad_core::BranchFault::BranchEndpoint),
            )),
        }
    }

    pub(crate) fn id_of_node(&self, node: NodeId) -> Result<String> {
        self.items
            .iter()
            .find_map(|(id, r)| match r {
                ComponentRef::Node(n) if *n == node => Some(id.to_string()),
                _ => None,
            })
            .ok_or_else(|| EditorError::MissingComponent(format!("component #{}", node.raw())))
    }

    pub(crate) fn id_of_branch(&self, branch: BranchId) -> Result<String> {
        self.items
            .iter()
            .find_map(|(id, r)| match r {
                ComponentRef::Branch(b) if *b == branch => Some(id.to_string()),
                _ => None,
            })
            .ok_or_else(|| EditorError::MissingComponent(format!("branch #{}", branch.raw())))
    }

    pub(crate) fn forget_branch_handles(&mut self, handles: &[BranchId]) {
        let stale: Vec<String> = self
            .items
            .iter()
            .filter_map(|(id, r)| match r {
                ComponentRef::Branch(b) if handles.contains(b) => Some(id.to_string()),
                _ => None,
            })
            .collect();
        for id in stale {
            self.items.remove(&id);
        }
    }

    /// Consume the editor, keeping only its circuit. Used when a replayed
    /// script becomes the inner graph of a composite gate.
    #[must_use]
    pub fn into_circuit(self) -> Circuit {
        self.circuit
    }

    // ── Presentation contracts ──────────────────────────────────────────

    /// Push a status message for the UI.
    pub fn status(&mut self, message: impl Into<String>) {
        self.status_bar.push(message);
    }

    /// The status sink.
    #[must_use]
    pub fn status_bar(&self) -> &StatusBar {
        &self.status_bar
    }

    /// File information: current filename and dirty bit.
    #[must_use]
    pub fn file_info(&self) -> &FileInfo {
        &self.file_info
    }

    /// Mutable file information, for SAVE/OPEN bookkeeping.
    pub fn file_info_mut(&mut self) -> &mut FileInfo {
        &mut self.file_info
    }

    /// Ask the editor to close, consulting `prompt` when there are unsaved
    /// changes. Returns `false` when the close was cancelled (including a
    /// requested save with no filename to save under).
    ///
    /// # Errors
    ///
    /// A failed save aborts the close and propagates.
    pub fn close(&mut self, prompt: &mut dyn ClosePrompt, workspace: &Workspace) -> Result<bool> {
        if !self.file_info.is_dirty() {
            return Ok(true);
        }
        match prompt.confirm_close(&self.file_info) {
            CloseDecision::Discard => Ok(true),
            CloseDecision::Cancel => Ok(false),
            CloseDecision::Save => {
                let Some(filename) = self.file_info.filename().map(str::to_string) else {
                    self.status("cannot save: no filename chosen");
                    return Ok(false);
                };
                persist::save(workspace, &filename, &self.past)?;
                self.file_info.mark_saved();
                Ok(true)
            }
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}
