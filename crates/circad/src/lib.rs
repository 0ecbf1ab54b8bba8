#![forbid(unsafe_code)]

//! Facade crate: one `use circad::...` away from the whole engine.
//!
//! Re-exports the signal graph from [`circad_core`] and the editing layer
//! from [`circad_editor`].

pub use circad_core::{
    BranchFault, BranchId, BranchInfo, Circuit, ComponentKind, Composite, DetachedNode, GateKind,
    GraphError, NodeId, Signal,
};
pub use circad_editor::{
    keys, Action, ActionKind, CloseDecision, ClosePrompt, Command, ComponentRef, ComponentType,
    Editor, EditorError, EditorRegistry, FileInfo, HelpTopic, IdSequence, ItemManager,
    PersistError, ReqKind, ReqValue, Requirement, RequirementDescriptor, Requirements, Result,
    StatusBar, StringKind, Undoable, Workspace, END_BYTE, FILE_EXTENSION, HELP_TOPICS,
    PROTOCOL_VERSION, START_BYTE,
};
