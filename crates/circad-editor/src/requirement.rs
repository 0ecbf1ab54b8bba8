#![forbid(unsafe_code)]

//! Named, typed slots that must be filled before a command or action runs.
//!
//! A requirement set is pure data: the dialog collaborator reads the
//! [`RequirementDescriptor`]s, gathers values however it likes, and hands
//! them back through [`Requirements::finalise`]. Nothing here touches an
//! editor, so requirement handling is fully testable headlessly.
//!
//! # Invariants
//!
//! 1. `fulfilled()` is true iff every slot holds a value its kind accepts.
//! 2. `finalise` either stores an accepted value or leaves the slot exactly
//!    as it was.
//! 3. `clear()` drops values but never the slots themselves.

use serde::Serialize;

use crate::command::Command;
use crate::error::EditorError;

/// Predicate applied to free-form string slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StringKind {
    /// Accepts anything, the empty string included.
    Any,
    /// Accepts any string with at least one non-whitespace character.
    NonEmpty,
    /// Accepts a flat filename: non-empty, no path separators.
    Filename,
    /// Accepts an unsigned decimal integer.
    Integer,
}

impl StringKind {
    /// Whether `value` satisfies this predicate.
    #[must_use]
    pub fn accepts(self, value: &str) -> bool {
        match self {
            StringKind::Any => true,
            StringKind::NonEmpty => !value.trim().is_empty(),
            StringKind::Filename => {
                !value.is_empty() && !value.contains(['/', '\\']) && value != "." && value != ".."
            }
            StringKind::Integer => {
                !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
            }
        }
    }
}

/// What a slot will accept.
#[derive(Debug, Clone)]
pub enum ReqKind {
    /// A free string matching a predicate.
    Text(StringKind),
    /// One of an enumerated list of options.
    OneOf(Vec<String>),
    /// A command object (filled by the component palette, not typed in).
    Command,
}

/// A value assigned to a slot.
#[derive(Debug, Clone)]
pub enum ReqValue {
    /// A string value, for [`ReqKind::Text`] and [`ReqKind::OneOf`] slots.
    Text(String),
    /// A command value, for [`ReqKind::Command`] slots.
    Command(Command),
}

impl From<&str> for ReqValue {
    fn from(value: &str) -> Self {
        ReqValue::Text(value.to_string())
    }
}

impl From<String> for ReqValue {
    fn from(value: String) -> Self {
        ReqValue::Text(value)
    }
}

impl From<Command> for ReqValue {
    fn from(value: Command) -> Self {
        ReqValue::Command(value)
    }
}

/// One named slot.
#[derive(Debug, Clone)]
pub struct Requirement {
    key: String,
    kind: ReqKind,
    value: Option<ReqValue>,
}

impl Requirement {
    fn new(key: impl Into<String>, kind: ReqKind) -> Self {
        Requirement {
            key: key.into(),
            kind,
            value: None,
        }
    }

    /// The slot name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// What the slot accepts.
    #[must_use]
    pub fn kind(&self) -> &ReqKind {
        &self.kind
    }

    /// Whether a value has been assigned.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.value.is_some()
    }

    /// The assigned string value, if this is a text slot and it is filled.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Some(ReqValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    fn accepts(&self, value: &ReqValue) -> bool {
        match (&self.kind, value) {
            (ReqKind::Text(kind), ReqValue::Text(s)) => kind.accepts(s),
            (ReqKind::OneOf(options), ReqValue::Text(s)) => options.iter().any(|o| o == s),
            (ReqKind::Command, ReqValue::Command(_)) => true,
            _ => false,
        }
    }
}

/// Host-facing snapshot of one slot, for the dialog collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct RequirementDescriptor {
    /// Slot name.
    pub key: String,
    /// `"text"`, `"options"`, or `"command"`.
    pub kind: &'static str,
    /// The predicate of a text slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<StringKind>,
    /// The allowed values of an options slot.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// The current value, commands rendered as their title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// An ordered set of named slots.
#[derive(Debug, Clone, Default)]
pub struct Requirements {
    slots: Vec<Requirement>,
}

impl Requirements {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a free-string slot.
    pub fn add_text(&mut self, key: impl Into<String>, kind: StringKind) {
        self.slots.push(Requirement::new(key, ReqKind::Text(kind)));
    }

    /// Add an enumerated slot.
    pub fn add_options(&mut self, key: impl Into<String>, options: Vec<String>) {
        self.slots.push(Requirement::new(key, ReqKind::OneOf(options)));
    }

    /// Add a command slot.
    pub fn add_command(&mut self, key: impl Into<String>) {
        self.slots.push(Requirement::new(key, ReqKind::Command));
    }

    /// Replace the options of an enumerated slot, dropping a stored value
    /// that is no longer listed.
    ///
    /// # Errors
    ///
    /// [`EditorError::UnknownRequirement`] when `key` names no enumerated
    /// slot.
    pub fn set_options(&mut self, key: &str, options: Vec<String>) -> Result<(), EditorError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.key == key && matches!(s.kind, ReqKind::OneOf(_)))
            .ok_or_else(|| EditorError::UnknownRequirement(key.to_string()))?;
        if let Some(ReqValue::Text(current)) = &slot.value {
            if !options.iter().any(|o| o == current) {
                slot.value = None;
            }
        }
        slot.kind = ReqKind::OneOf(options);
        Ok(())
    }

    /// Assign a value to a slot.
    ///
    /// # Errors
    ///
    /// [`EditorError::UnknownRequirement`] for a key that names no slot,
    /// [`EditorError::InvalidRequirementValue`] for a value the slot's kind
    /// rejects. The slot is unchanged on error.
    pub fn finalise(&mut self, key: &str, value: impl Into<ReqValue>) -> Result<(), EditorError> {
        let value = value.into();
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.key == key)
            .ok_or_else(|| EditorError::UnknownRequirement(key.to_string()))?;
        if !slot.accepts(&value) {
            return Err(EditorError::InvalidRequirementValue {
                key: key.to_string(),
                value: match value {
                    ReqValue::Text(s) => s,
                    ReqValue::Command(c) => c.to_string(),
                },
            });
        }
        slot.value = Some(value);
        Ok(())
    }

    /// Whether every slot has been assigned.
    #[must_use]
    pub fn fulfilled(&self) -> bool {
        self.slots.iter().all(Requirement::is_fulfilled)
    }

    /// Drop every assigned value, keeping the slots.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.value = None;
        }
    }

    /// The slot named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Requirement> {
        self.slots.iter().find(|s| s.key == key)
    }

    /// The string value of a text or options slot.
    ///
    /// # Errors
    ///
    /// [`EditorError::UnknownRequirement`] for a missing slot,
    /// [`EditorError::RequirementUnfulfilled`] for an unfilled one.
    pub fn text(&self, key: &str) -> Result<&str, EditorError> {
        let slot = self
            .get(key)
            .ok_or_else(|| EditorError::UnknownRequirement(key.to_string()))?;
        slot.text()
            .ok_or_else(|| EditorError::RequirementUnfulfilled(key.to_string()))
    }

    /// Move the command value out of a command slot, leaving it unfilled.
    ///
    /// # Errors
    ///
    /// [`EditorError::UnknownRequirement`] for a missing slot,
    /// [`EditorError::RequirementUnfulfilled`] for one without a command.
    pub fn take_command(&mut self, key: &str) -> Result<Command, EditorError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.key == key)
            .ok_or_else(|| EditorError::UnknownRequirement(key.to_string()))?;
        match slot.value.take() {
            Some(ReqValue::Command(command)) => Ok(command),
            other => {
                slot.value = other;
                Err(EditorError::RequirementUnfulfilled(key.to_string()))
            }
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the set has no slots (and is therefore trivially fulfilled).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate the slots in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.slots.iter()
    }

    /// Host-facing snapshot of every slot.
    #[must_use]
    pub fn descriptors(&self) -> Vec<RequirementDescriptor> {
        self.slots
            .iter()
            .map(|slot| {
                let (kind, predicate, options) = match &slot.kind {
                    ReqKind::Text(p) => ("text", Some(*p), Vec::new()),
                    ReqKind::OneOf(o) => ("options", None, o.clone()),
                    ReqKind::Command => ("command", None, Vec::new()),
                };
                RequirementDescriptor {
                    key: slot.key.clone(),
                    kind,
                    predicate,
                    options,
                    value: match &slot.value {
                        Some(ReqValue::Text(s)) => Some(s.clone()),
                        Some(ReqValue::Command(c)) => Some(c.to_string()),
                        None => None,
                    },
                }
            })
            .collect()
    }
}
