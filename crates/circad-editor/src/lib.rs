#![forbid(unsafe_code)]

//! The editing layer of the circad circuit engine: undoable commands, the
//! editor and its history, parameterised actions with requirement sets,
//! framed persistence, and the multi-editor registry.
//!
//! The crate is library-shaped and fully headless. The GUI host supplies a
//! dialog collaborator that fills [`Requirements`], a status renderer that
//! drains [`StatusBar`], and a [`ClosePrompt`] for unsaved changes; nothing
//! in here blocks, draws, or prompts.

pub mod action;
pub mod command;
pub mod editor;
pub mod error;
pub mod manager;
pub mod persist;
pub mod registry;
pub mod requirement;

mod logging;

pub use action::{Action, ActionKind, HelpTopic, HELP_TOPICS};
pub use command::{keys, Command, ComponentType, Undoable};
pub use editor::{ComponentRef, Editor, FileInfo, StatusBar};
pub use error::{EditorError, PersistError, Result};
pub use manager::{IdSequence, ItemManager};
pub use persist::{Workspace, END_BYTE, FILE_EXTENSION, PROTOCOL_VERSION, START_BYTE};
pub use registry::{CloseDecision, ClosePrompt, EditorRegistry};
pub use requirement::{
    ReqKind, ReqValue, Requirement, RequirementDescriptor, Requirements, StringKind,
};
