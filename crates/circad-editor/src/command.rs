#![forbid(unsafe_code)]

//! Undoable editing steps.
//!
//! A [`Command`] is a plain data value: its kind, its requirement set, and
//! transient undo bookkeeping. Cloning one before execution is how templates
//! stay reusable — the clone generates its own fresh id, while a re-executed
//! (redone) command reuses the id it was first given, so redo reproduces the
//! exact pre-undo state.
//!
//! # Invariants
//!
//! 1. `execute` followed by `unexecute` restores the prior component set,
//!    every pin level, and every branch.
//! 2. `unexecute` followed by `execute` restores the executed state exactly.
//! 3. A failed `execute` leaves the editor untouched.

use std::fmt;

use circad_core::{BranchFault, Composite, DetachedNode, GateKind, GraphError};

use crate::editor::{ComponentRef, Editor};
use crate::error::{EditorError, Result};
use crate::requirement::{Requirements, StringKind};

/// Requirement keys shared between commands, actions, and the dialog
/// collaborator.
pub mod keys {
    /// The command a CREATE/DELETE action will run.
    pub const COMMAND: &str = "command";
    /// Filename for SAVE and OPEN.
    pub const FILENAME: &str = "filename";
    /// OPEN sub-mode: [`CIRCUIT`] or [`COMPONENT`].
    pub const FILETYPE: &str = "filetype";
    /// Name a component-mode OPEN registers its composite template under.
    pub const GATENAME: &str = "gatename";
    /// Input arity of an and/or gate.
    pub const IN_COUNT: &str = "in count";
    /// Target component id of a delete.
    pub const NAME: &str = "name";
    /// Source component id of a branch.
    pub const SOURCE: &str = "source";
    /// Output slot of the branch source.
    pub const SOURCE_SLOT: &str = "source slot";
    /// Sink component id of a branch.
    pub const TARGET: &str = "target";
    /// Input slot of the branch sink.
    pub const TARGET_SLOT: &str = "target slot";

    /// FILETYPE value: replace the editor's content.
    pub const CIRCUIT: &str = "circuit";
    /// FILETYPE value: register the file as a composite-gate template.
    pub const COMPONENT: &str = "component";
}

/// The built-in component families a [`Command`] can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    /// A signal source.
    InputPin,
    /// A signal sink.
    OutputPin,
    /// An AND gate with a chosen input arity.
    AndGate,
    /// An OR gate with a chosen input arity.
    OrGate,
    /// A NOT gate (single input).
    NotGate,
    /// A wire between two component slots.
    Branch,
}

impl ComponentType {
    /// Every built-in type, in palette order.
    pub const ALL: [ComponentType; 6] = [
        ComponentType::InputPin,
        ComponentType::OutputPin,
        ComponentType::AndGate,
        ComponentType::OrGate,
        ComponentType::NotGate,
        ComponentType::Branch,
    ];

    /// Lowercase human-readable name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ComponentType::InputPin => "input pin",
            ComponentType::OutputPin => "output pin",
            ComponentType::AndGate => "and gate",
            ComponentType::OrGate => "or gate",
            ComponentType::NotGate => "not gate",
            ComponentType::Branch => "branch",
        }
    }

    /// Name of the id generator this type draws from.
    #[must_use]
    pub(crate) const fn generator(self) -> &'static str {
        match self {
            ComponentType::InputPin => "in",
            ComponentType::OutputPin => "out",
            ComponentType::AndGate => "and",
            ComponentType::OrGate => "or",
            ComponentType::NotGate => "not",
            ComponentType::Branch => "br",
        }
    }

    /// Id template of the generator this type draws from.
    #[must_use]
    pub(crate) const fn id_template(self) -> &'static str {
        match self {
            ComponentType::InputPin => "in{}",
            ComponentType::OutputPin => "out{}",
            ComponentType::AndGate => "and{}",
            ComponentType::OrGate => "or{}",
            ComponentType::NotGate => "not{}",
            ComponentType::Branch => "br{}",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The contract every undoable editing step fulfils.
pub trait Undoable {
    /// Apply the step to its context.
    ///
    /// # Errors
    ///
    /// Any [`EditorError`]; a failed execute leaves the context untouched.
    fn execute(&mut self, context: &mut Editor) -> Result<()>;

    /// Revert the step, restoring the context to its pre-execute state.
    ///
    /// # Errors
    ///
    /// [`EditorError::NotExecuted`] when the step never ran, or any error
    /// from the underlying graph operations.
    fn unexecute(&mut self, context: &mut Editor) -> Result<()>;
}

#[derive(Debug, Clone)]
enum CommandKind {
    Create(ComponentType),
    CreateGate {
        script: Vec<Command>,
        description: String,
    },
    Delete,
}

/// What a delete removed, recorded for undo.
#[derive(Debug, Clone)]
struct RemovedRecord {
    id: String,
    node: Option<DetachedNode>,
    branches: Vec<BranchRecord>,
}

/// Endpoints of a removed branch, by id so undo can re-resolve them.
#[derive(Debug, Clone)]
struct BranchRecord {
    id: String,
    source: String,
    source_slot: usize,
    target: String,
    target_slot: usize,
}

#[derive(Debug, Clone, Default)]
struct ExecState {
    created_id: Option<String>,
    removed: Option<RemovedRecord>,
}

/// An undoable, serialisable editing step.
#[derive(Debug, Clone)]
pub struct Command {
    kind: CommandKind,
    reqs: Requirements,
    state: ExecState,
}

impl Command {
    /// A command that creates one component of the given type.
    ///
    /// And/or gates require an `in count`; a branch requires its four
    /// endpoint values. Pins and not gates need nothing further.
    #[must_use]
    pub fn create(component_type: ComponentType) -> Self {
        let mut reqs = Requirements::new();
        match component_type {
            ComponentType::AndGate | ComponentType::OrGate => {
                reqs.add_text(keys::IN_COUNT, StringKind::Integer);
            }
            ComponentType::Branch => {
                reqs.add_text(keys::SOURCE, StringKind::NonEmpty);
                reqs.add_text(keys::SOURCE_SLOT, StringKind::Integer);
                reqs.add_text(keys::TARGET, StringKind::NonEmpty);
                reqs.add_text(keys::TARGET_SLOT, StringKind::Integer);
            }
            _ => {}
        }
        Command {
            kind: CommandKind::Create(component_type),
            reqs,
            state: ExecState::default(),
        }
    }

    /// A command that builds a composite gate by replaying `script` in a
    /// private context and registering the result as one component.
    #[must_use]
    pub fn create_gate(script: Vec<Command>, description: impl Into<String>) -> Self {
        Command {
            kind: CommandKind::CreateGate {
                script,
                description: description.into(),
            },
            reqs: Requirements::new(),
            state: ExecState::default(),
        }
    }

    /// A command that deletes the component named by its `name` requirement.
    #[must_use]
    pub fn delete() -> Self {
        let mut reqs = Requirements::new();
        reqs.add_text(keys::NAME, StringKind::NonEmpty);
        Command {
            kind: CommandKind::Delete,
            reqs,
            state: ExecState::default(),
        }
    }

    /// Whether every requirement has been fulfilled.
    #[must_use]
    pub fn can_execute(&self) -> bool {
        self.reqs.fulfilled()
    }

    /// The requirement set, for the dialog collaborator.
    #[must_use]
    pub fn requirements(&self) -> &Requirements {
        &self.reqs
    }

    /// Mutable access to the requirement set.
    pub fn requirements_mut(&mut self) -> &mut Requirements {
        &mut self.reqs
    }

    /// Assign one requirement value. Shorthand for
    /// `requirements_mut().finalise(..)`.
    ///
    /// # Errors
    ///
    /// See [`Requirements::finalise`].
    pub fn specify(
        &mut self,
        key: &str,
        value: impl Into<crate::requirement::ReqValue>,
    ) -> Result<()> {
        self.reqs.finalise(key, value)
    }

    /// The id this command created, once executed.
    #[must_use]
    pub fn created_id(&self) -> Option<&str> {
        self.state.created_id.as_deref()
    }

    /// The script of a composite-gate command, if this is one.
    #[must_use]
    pub fn script(&self) -> Option<&[Command]> {
        match &self.kind {
            CommandKind::CreateGate { script, .. } => Some(script),
            _ => None,
        }
    }

    pub(crate) fn encode_parts(&self) -> EncodedParts<'_> {
        match &self.kind {
            CommandKind::Create(ty) => EncodedParts::Create(*ty, &self.reqs),
            CommandKind::CreateGate {
                script,
                description,
            } => EncodedParts::CreateGate(script, description),
            CommandKind::Delete => EncodedParts::Delete(&self.reqs),
        }
    }

    fn parse_slot(&self, key: &str) -> Result<usize> {
        let text = self.reqs.text(key)?;
        text.parse::<usize>()
            .map_err(|_| EditorError::InvalidRequirementValue {
                key: key.to_string(),
                value: text.to_string(),
            })
    }

    fn resolve_node(editor: &Editor, id: &str) -> Result<circad_core::NodeId> {
        match *editor.items.get(id)? {
            ComponentRef::Node(node) => Ok(node),
            ComponentRef::Branch(_) => Err(EditorError::Graph(GraphError::MalformedBranch(
                BranchFault::BranchEndpoint,
            ))),
        }
    }

    fn execute_create(&mut self, ty: ComponentType, editor: &mut Editor) -> Result<()> {
        // Branch endpoints resolve before the id is drawn, so a malformed
        // connection consumes nothing.
        if ty == ComponentType::Branch {
            let source = Self::resolve_node(editor, self.reqs.text(keys::SOURCE)?)?;
            let target = Self::resolve_node(editor, self.reqs.text(keys::TARGET)?)?;
            let source_slot = self.parse_slot(keys::SOURCE_SLOT)?;
            let target_slot = self.parse_slot(keys::TARGET_SLOT)?;
            let branch = editor.circuit.connect(source, source_slot, target, target_slot)?;
            let id = match self.state.created_id.clone() {
                Some(id) => id,
                None => editor.items.next_id(ty.generator())?,
            };
            editor.items.add(id.clone(), ComponentRef::Branch(branch))?;
            self.state.created_id = Some(id);
            return Ok(());
        }

        let node = match ty {
            ComponentType::InputPin => editor.circuit.add_input_pin(),
            ComponentType::OutputPin => editor.circuit.add_output_pin(),
            ComponentType::AndGate => {
                let arity = self.parse_slot(keys::IN_COUNT)?;
                editor.circuit.add_gate(GateKind::And, arity)?
            }
            ComponentType::OrGate => {
                let arity = self.parse_slot(keys::IN_COUNT)?;
                editor.circuit.add_gate(GateKind::Or, arity)?
            }
            ComponentType::NotGate => editor.circuit.add_gate(GateKind::Not, 1)?,
            ComponentType::Branch => unreachable!("handled above"),
        };
        let id = match self.state.created_id.clone() {
            Some(id) => id,
            None => editor.items.next_id(ty.generator())?,
        };
        editor.items.add(id.clone(), ComponentRef::Node(node))?;
        self.state.created_id = Some(id);
        Ok(())
    }

    fn execute_create_gate(
        &mut self,
        script: Vec<Command>,
        description: String,
        editor: &mut Editor,
    ) -> Result<()> {
        let mut builder = Editor::new();
        for command in script {
            builder.execute(command)?;
        }
        let composite = Composite::from_circuit(builder.into_circuit(), description)?;

        let id = match self.state.created_id.clone() {
            Some(id) => id,
            None => editor.items.next_id("gate")?,
        };
        let node = editor.circuit.add_composite(composite);
        editor.items.add(id.clone(), ComponentRef::Node(node))?;
        self.state.created_id = Some(id);
        Ok(())
    }

    fn execute_delete(&mut self, editor: &mut Editor) -> Result<()> {
        let target = self.reqs.text(keys::NAME)?.to_string();
        match *editor.items.get(&target)? {
            ComponentRef::Branch(branch) => {
                let info = editor
                    .circuit
                    .branch_info(branch)
                    .ok_or(EditorError::Graph(GraphError::UnknownHandle))?;
                let record = BranchRecord {
                    id: target.clone(),
                    source: editor.id_of_node(info.source)?,
                    source_slot: info.source_slot,
                    target: editor.id_of_node(info.sink)?,
                    target_slot: info.sink_slot,
                };
                editor.circuit.disconnect(branch)?;
                editor.items.remove(&target);
                self.state.removed = Some(RemovedRecord {
                    id: target,
                    node: None,
                    branches: vec![record],
                });
            }
            ComponentRef::Node(node) => {
                let mut records = Vec::new();
                for branch in editor.circuit.attached_branches(node) {
                    let Some(info) = editor.circuit.branch_info(branch) else {
                        continue;
                    };
                    records.push(BranchRecord {
                        id: editor.id_of_branch(branch)?,
                        source: editor.id_of_node(info.source)?,
                        source_slot: info.source_slot,
                        target: editor.id_of_node(info.sink)?,
                        target_slot: info.sink_slot,
                    });
                }
                let (detached, _) = editor.circuit.remove(node)?;
                for record in &records {
                    editor.items.remove(&record.id);
                }
                editor.items.remove(&target);
                self.state.removed = Some(RemovedRecord {
                    id: target,
                    node: Some(detached),
                    branches: records,
                });
            }
        }
        Ok(())
    }
}

impl Undoable for Command {
    fn execute(&mut self, context: &mut Editor) -> Result<()> {
        let kind = self.kind.clone();
        match kind {
            CommandKind::Create(ty) => self.execute_create(ty, context),
            CommandKind::CreateGate {
                script,
                description,
            } => self.execute_create_gate(script, description, context),
            CommandKind::Delete => self.execute_delete(context),
        }
    }

    fn unexecute(&mut self, context: &mut Editor) -> Result<()> {
        match self.kind {
            CommandKind::Create(_) | CommandKind::CreateGate { .. } => {
                let id = self
                    .state
                    .created_id
                    .clone()
                    .ok_or(EditorError::NotExecuted)?;
                match *context.items.get(&id)? {
                    ComponentRef::Node(node) => {
                        let (_, removed) = context.circuit.remove(node)?;
                        let handles: Vec<_> = removed.iter().map(|(branch, _)| *branch).collect();
                        context.forget_branch_handles(&handles);
                    }
                    ComponentRef::Branch(branch) => {
                        context.circuit.disconnect(branch)?;
                    }
                }
                context.items.remove(&id);
                Ok(())
            }
            CommandKind::Delete => {
                let record = self.state.removed.take().ok_or(EditorError::NotExecuted)?;
                if let Some(detached) = record.node {
                    let node = context.circuit.restore(detached);
                    context.items.add(record.id.clone(), ComponentRef::Node(node))?;
                }
                for branch in record.branches {
                    let source = Self::resolve_node(context, &branch.source)?;
                    let target = Self::resolve_node(context, &branch.target)?;
                    let handle = context.circuit.connect(
                        source,
                        branch.source_slot,
                        target,
                        branch.target_slot,
                    )?;
                    context.items.add(branch.id, ComponentRef::Branch(handle))?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CommandKind::Create(ty) => write!(f, "create {ty}"),
            CommandKind::CreateGate { description, .. } => write!(f, "create {description}"),
            CommandKind::Delete => write!(f, "delete component"),
        }
    }
}

/// Borrowed view of a command for the persistence codec.
pub(crate) enum EncodedParts<'a> {
    Create(ComponentType, &'a Requirements),
    CreateGate(&'a [Command], &'a str),
    Delete(&'a Requirements),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Editor;
    use circad_core::{ComponentKind, Signal};

    fn filled_branch(source: &str, target: &str) -> Command {
        let mut command = Command::create(ComponentType::Branch);
        command.specify(keys::SOURCE, source).unwrap();
        command.specify(keys::SOURCE_SLOT, "0").unwrap();
        command.specify(keys::TARGET, target).unwrap();
        command.specify(keys::TARGET_SLOT, "0").unwrap();
        command
    }

    #[test]
    fn create_assigns_generated_ids() {
        let mut editor = Editor::new();
        editor.execute(Command::create(ComponentType::InputPin)).unwrap();
        editor.execute(Command::create(ComponentType::InputPin)).unwrap();
        assert!(editor.items.contains("in0"));
        assert!(editor.items.contains("in1"));
    }

    #[test]
    fn gate_creation_reads_arity_requirement() {
        let mut editor = Editor::new();
        let mut command = Command::create(ComponentType::AndGate);
        assert!(!command.can_execute());
        command.specify(keys::IN_COUNT, "3").unwrap();
        editor.execute(command).unwrap();

        let ComponentRef::Node(node) = *editor.items.get("and0").unwrap() else {
            panic!("gate should be a node");
        };
        assert_eq!(editor.circuit.input_arity(node), Some(3));
    }

    #[test]
    fn clone_before_execute_keeps_template_reusable() {
        let mut editor = Editor::new();
        let mut template = Command::create(ComponentType::AndGate);
        template.specify(keys::IN_COUNT, "2").unwrap();

        editor.execute(template.clone()).unwrap();
        editor.execute(template.clone()).unwrap();
        assert!(editor.items.contains("and0"));
        assert!(editor.items.contains("and1"));
        assert!(template.created_id().is_none());
    }

    #[test]
    fn branch_between_missing_components_is_reported() {
        let mut editor = Editor::new();
        let command = filled_branch("ghost", "also-ghost");
        let err = editor.execute(command).unwrap_err();
        assert!(matches!(err, EditorError::MissingComponent(id) if id == "ghost"));
    }

    #[test]
    fn undo_of_create_removes_the_component() {
        let mut editor = Editor::new();
        editor.execute(Command::create(ComponentType::InputPin)).unwrap();
        editor.undo().unwrap();
        assert!(editor.circuit.is_empty());
        assert!(editor.items.is_empty());
    }

    #[test]
    fn redo_reuses_the_recorded_id() {
        let mut editor = Editor::new();
        editor.execute(Command::create(ComponentType::OutputPin)).unwrap();
        editor.undo().unwrap();
        assert!(!editor.items.contains("out0"));

        assert!(editor.redo().unwrap());
        assert!(editor.items.contains("out0"));
    }

    #[test]
    fn delete_and_undo_restore_wiring_and_levels() {
        let mut editor = Editor::new();
        editor.execute(Command::create(ComponentType::InputPin)).unwrap();
        editor.execute(Command::create(ComponentType::NotGate)).unwrap();
        editor.execute(Command::create(ComponentType::OutputPin)).unwrap();
        editor.execute(filled_branch("in0", "not0")).unwrap();
        editor.execute(filled_branch("not0", "out0")).unwrap();
        editor.set_input("in0", Signal::High).unwrap();
        assert_eq!(editor.level("out0").unwrap(), Signal::Low);

        let mut delete = Command::delete();
        delete.specify(keys::NAME, "not0").unwrap();
        editor.execute(delete).unwrap();
        assert!(!editor.items.contains("not0"));
        assert!(!editor.items.contains("br0"));
        assert_eq!(editor.level("out0").unwrap(), Signal::Low);

        editor.undo().unwrap();
        assert!(editor.items.contains("not0"));
        assert!(editor.items.contains("br0"));
        assert!(editor.items.contains("br1"));
        assert_eq!(editor.level("out0").unwrap(), Signal::Low);
        assert_eq!(editor.level("in0").unwrap(), Signal::High);
    }

    fn filled_branch_slots(
        source: &str,
        source_slot: usize,
        target: &str,
        target_slot: usize,
    ) -> Command {
        let mut command = Command::create(ComponentType::Branch);
        command.specify(keys::SOURCE, source).unwrap();
        command
            .specify(keys::SOURCE_SLOT, source_slot.to_string())
            .unwrap();
        command.specify(keys::TARGET, target).unwrap();
        command
            .specify(keys::TARGET_SLOT, target_slot.to_string())
            .unwrap();
        command
    }

    #[test]
    fn create_gate_builds_a_composite_from_its_script() {
        let mut and2 = Command::create(ComponentType::AndGate);
        and2.specify(keys::IN_COUNT, "2").unwrap();
        let script = vec![
            Command::create(ComponentType::InputPin),
            Command::create(ComponentType::InputPin),
            and2,
            Command::create(ComponentType::OutputPin),
            filled_branch_slots("in0", 0, "and0", 0),
            filled_branch_slots("in1", 0, "and0", 1),
            filled_branch_slots("and0", 0, "out0", 0),
        ];
        let mut editor = Editor::new();
        editor.execute(Command::create_gate(script, "AND2")).unwrap();

        let ComponentRef::Node(node) = *editor.items.get("gate0").unwrap() else {
            panic!("composite should be a node");
        };
        assert_eq!(editor.circuit.kind(node), Some(ComponentKind::Composite));
        assert_eq!(editor.circuit.input_arity(node), Some(2));
        assert_eq!(editor.circuit.output_arity(node), Some(1));
        assert_eq!(editor.circuit.description(node), Some("AND2"));
    }

    #[test]
    fn display_titles_are_human_readable() {
        assert_eq!(Command::create(ComponentType::AndGate).to_string(), "create and gate");
        assert_eq!(Command::delete().to_string(), "delete component");
        assert_eq!(Command::create_gate(vec![], "AND2").to_string(), "create AND2");
    }
}
