#![forbid(unsafe_code)]

//! Error taxonomy of the editing layer.
//!
//! Domain errors ([`EditorError::MissingComponent`], malformed branches,
//! refused files) are caught at the action boundary and become status
//! messages; anything else propagates to the host.

use std::path::PathBuf;

use thiserror::Error;

use circad_core::GraphError;

/// Convenience alias for editor-layer results.
pub type Result<T> = std::result::Result<T, EditorError>;

/// Errors raised by commands, editors, and actions.
#[derive(Debug, Error)]
pub enum EditorError {
    /// An id lookup found no live component.
    #[error("no component with id {0:?}")]
    MissingComponent(String),

    /// A registration would overwrite a live component. Programming error.
    #[error("another component already uses id {0:?}")]
    DuplicateId(String),

    /// No id generator registered under this name. Programming error.
    #[error("no id generator named {0:?}")]
    UnknownGenerator(String),

    /// A graph operation was refused; the circuit is untouched.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A persistence operation failed.
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// A command or action ran without all of its requirements set.
    #[error("requirements not fulfilled: {0}")]
    RequirementUnfulfilled(String),

    /// A requirement key named no slot.
    #[error("no requirement named {0:?}")]
    UnknownRequirement(String),

    /// Unexecute was asked of a command that never ran. Programming error.
    #[error("command has not been executed")]
    NotExecuted,

    /// A requirement value was rejected by its slot's predicate.
    #[error("requirement {key:?} rejected value {value:?}")]
    InvalidRequirementValue {
        /// The slot name.
        key: String,
        /// The offending value.
        value: String,
    },
}

impl EditorError {
    /// Whether this error is a domain condition that actions absorb into a
    /// status message rather than propagate.
    #[must_use]
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            EditorError::MissingComponent(_)
                | EditorError::Graph(_)
                | EditorError::RequirementUnfulfilled(_)
                | EditorError::InvalidRequirementValue { .. }
        )
    }
}

fn version_direction(found: &u8, expected: &u8) -> &'static str {
    if found > expected { "newer" } else { "older" }
}

/// Errors raised while reading or writing saved circuit files.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The requested file does not exist in the workspace.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The frame bytes are wrong or the payload is undecodable.
    #[error("file is corrupted: {}", .0.display())]
    FileCorrupted(PathBuf),

    /// The file was written under a different protocol version.
    #[error(
        "incompatible file {}: written by a {} version of the program (file v{found}, program v{expected})",
        .path.display(),
        version_direction(.found, .expected)
    )]
    IncompatibleFile {
        /// The refused file.
        path: PathBuf,
        /// The version byte read from the file.
        found: u8,
        /// The version this build writes.
        expected: u8,
    },

    /// An underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
