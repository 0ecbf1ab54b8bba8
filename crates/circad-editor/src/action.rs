#![forbid(unsafe_code)]

//! Parameterised editor operations.
//!
//! An [`Action`] is a per-invocation value: it is created, its requirement
//! set is filled by the dialog collaborator, it is executed against an
//! editor, and it clears itself so the value can be refilled and reused.
//! Domain failures (missing components, malformed branches, refused files)
//! become status messages and leave the editor consistent; anything
//! unexpected propagates to the host.

use std::fmt;

use crate::command::{keys, Command};
use crate::editor::Editor;
use crate::error::{PersistError, Result};
use crate::persist::{self, Workspace};
use crate::requirement::{ReqValue, Requirements, StringKind};

/// The fixed set of editor operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Create a component by executing the command in the `command` slot.
    Create,
    /// Delete a component by executing the command in the `command` slot.
    Delete,
    /// Write the editor's command history to a file.
    Save,
    /// Read a file, as a whole circuit or as a composite-gate template.
    Open,
    /// Reset the editor.
    Clear,
    /// Unexecute the newest command.
    Undo,
    /// Re-execute the newest undone command.
    Redo,
    /// Surface the help topics.
    Help,
}

impl ActionKind {
    /// Every action, in menu order.
    pub const ALL: [ActionKind; 8] = [
        ActionKind::Create,
        ActionKind::Delete,
        ActionKind::Save,
        ActionKind::Open,
        ActionKind::Clear,
        ActionKind::Undo,
        ActionKind::Redo,
        ActionKind::Help,
    ];

    /// Dialog title of the action.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            ActionKind::Create => "Create",
            ActionKind::Delete => "Delete",
            ActionKind::Save => "Save",
            ActionKind::Open => "Open",
            ActionKind::Clear => "Clear",
            ActionKind::Undo => "Undo",
            ActionKind::Redo => "Redo",
            ActionKind::Help => "Help",
        }
    }
}

/// One help entry, rendered by the UI collaborator.
#[derive(Debug, Clone, Copy)]
pub struct HelpTopic {
    /// Dialog title.
    pub title: &'static str,
    /// Body text.
    pub message: &'static str,
}

/// The help content the HELP action surfaces.
pub const HELP_TOPICS: &[HelpTopic] = &[
    HelpTopic {
        title: "Creating components",
        message: "Pick a component type, fill in its values, and it is added to the circuit.",
    },
    HelpTopic {
        title: "Wiring",
        message: "A branch connects an output slot of one component to a free input slot of another. Connections that would loop back are refused.",
    },
    HelpTopic {
        title: "Deleting",
        message: "Deleting a component also removes every wire attached to it.",
    },
    HelpTopic {
        title: "Undo and redo",
        message: "Every create and delete can be undone and redone, in order.",
    },
    HelpTopic {
        title: "Saving and opening",
        message: "Save writes the circuit to a file. Open either replaces the current circuit or registers the file as a new component type.",
    },
    HelpTopic {
        title: "Composite gates",
        message: "A saved circuit opened as a component becomes a single gate whose pins are the circuit's input and output pins.",
    },
];

/// A parameterised, reusable editor operation.
#[derive(Debug, Clone)]
pub struct Action {
    kind: ActionKind,
    reqs: Requirements,
}

impl Action {
    /// Create an action with its declarative requirement set.
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        let mut reqs = Requirements::new();
        match kind {
            ActionKind::Create | ActionKind::Delete => {
                reqs.add_command(keys::COMMAND);
            }
            ActionKind::Save => {
                reqs.add_text(keys::FILENAME, StringKind::Filename);
            }
            ActionKind::Open => {
                reqs.add_options(keys::FILENAME, Vec::new());
                reqs.add_options(
                    keys::FILETYPE,
                    vec![keys::CIRCUIT.to_string(), keys::COMPONENT.to_string()],
                );
                reqs.add_text(keys::GATENAME, StringKind::NonEmpty);
            }
            ActionKind::Clear | ActionKind::Undo | ActionKind::Redo | ActionKind::Help => {}
        }
        Action { kind, reqs }
    }

    /// Which operation this is.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// The requirement set, for the dialog collaborator.
    #[must_use]
    pub fn requirements(&self) -> &Requirements {
        &self.reqs
    }

    /// Assign one requirement value.
    ///
    /// # Errors
    ///
    /// See [`Requirements::finalise`].
    pub fn specify(&mut self, key: &str, value: impl Into<ReqValue>) -> Result<()> {
        self.reqs.finalise(key, value)
    }

    /// Recompute dynamic requirement options before fulfilment. For OPEN
    /// this lists the saved circuit files in the workspace, creating the
    /// directory when absent.
    ///
    /// # Errors
    ///
    /// Filesystem failures while listing the workspace.
    pub fn adjust_requirements(&mut self, workspace: &Workspace) -> Result<()> {
        if self.kind == ActionKind::Open {
            let files = workspace.saved_files()?;
            self.reqs.set_options(keys::FILENAME, files)?;
        }
        Ok(())
    }

    /// Execute against `editor`, report a status, and clear the requirement
    /// set so this value can be reused.
    ///
    /// # Errors
    ///
    /// Domain failures are absorbed into status messages; unexpected errors
    /// (I/O during write, replay failures, programming errors) propagate.
    pub fn execute(&mut self, editor: &mut Editor, workspace: &Workspace) -> Result<()> {
        let result = self.run(editor, workspace);
        self.reqs.clear();
        result
    }

    fn run(&mut self, editor: &mut Editor, workspace: &Workspace) -> Result<()> {
        if !self.reqs.fulfilled() {
            editor.status(format!("{}: requirements not fulfilled", self.kind.title()));
            return Ok(());
        }
        match self.kind {
            ActionKind::Create => self.run_command(editor, "created"),
            ActionKind::Delete => self.run_command(editor, "deleted"),
            ActionKind::Save => self.run_save(editor, workspace),
            ActionKind::Open => self.run_open(editor, workspace),
            ActionKind::Clear => {
                editor.clear();
                editor.status("circuit cleared");
                Ok(())
            }
            ActionKind::Undo => {
                if editor.undo()? {
                    editor.status("undone");
                } else {
                    editor.status("nothing to undo");
                }
                Ok(())
            }
            ActionKind::Redo => {
                if editor.redo()? {
                    editor.status("redone");
                } else {
                    editor.status("nothing to redo");
                }
                Ok(())
            }
            ActionKind::Help => {
                editor.status(format!("{} help topics available", HELP_TOPICS.len()));
                Ok(())
            }
        }
    }

    fn run_command(&mut self, editor: &mut Editor, verb: &str) -> Result<()> {
        let command = self.reqs.take_command(keys::COMMAND)?;
        if !command.can_execute() {
            editor.status(format!("cannot {command}: requirements not fulfilled"));
            return Ok(());
        }
        let title = command.to_string();
        match editor.execute(command) {
            Ok(()) => {
                editor.status(format!("{title}: component {verb}"));
                Ok(())
            }
            Err(e) if e.is_domain() => {
                editor.status(e.to_string());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn run_save(&mut self, editor: &mut Editor, workspace: &Workspace) -> Result<()> {
        let filename = self.reqs.text(keys::FILENAME)?.to_string();
        match persist::save(workspace, &filename, editor.past_commands()) {
            Ok(()) => {
                editor.file_info_mut().mark_saved();
                editor.file_info_mut().set_file(filename.clone());
                editor.status(format!("saved {filename}"));
                Ok(())
            }
            Err(e) => {
                editor.status(format!("could not save {filename}"));
                Err(e.into())
            }
        }
    }

    fn run_open(&mut self, editor: &mut Editor, workspace: &Workspace) -> Result<()> {
        let filename = self.reqs.text(keys::FILENAME)?.to_string();
        let filetype = self.reqs.text(keys::FILETYPE)?.to_string();

        let commands = match persist::load(workspace, &filename) {
            Ok(commands) => commands,
            Err(
                e @ (PersistError::FileNotFound(_)
                | PersistError::FileCorrupted(_)
                | PersistError::IncompatibleFile { .. }),
            ) => {
                editor.status(e.to_string());
                return Ok(());
            }
            Err(e) => {
                editor.status(format!("could not read {filename}"));
                return Err(e.into());
            }
        };

        if filetype == keys::COMPONENT {
            let gatename = self.reqs.text(keys::GATENAME)?.to_string();
            editor.add_create_command(Command::create_gate(commands, gatename.clone()));
            editor.status(format!("loaded {filename} as component {gatename}"));
        } else {
            // Replay into a scratch editor first: a file that decodes but
            // does not replay must leave the current circuit untouched.
            let mut replayed = Editor::new();
            for command in commands {
                match replayed.execute(command) {
                    Ok(()) => {}
                    Err(e) if e.is_domain() => {
                        editor.status(format!("cannot load {filename}: {e}"));
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                }
            }
            editor.adopt(replayed);
            editor.file_info_mut().mark_saved();
            editor.file_info_mut().set_file(filename.clone());
            editor.status(format!("loaded {filename}"));
        }
        Ok(())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ComponentType;
    use tempfile::tempdir;

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        (dir, workspace)
    }

    #[test]
    fn unfulfilled_action_reports_and_mutates_nothing() {
        let (_dir, workspace) = workspace();
        let mut editor = Editor::new();
        let mut action = Action::new(ActionKind::Create);

        action.execute(&mut editor, &workspace).unwrap();
        assert!(editor.circuit().is_empty());
        assert_eq!(editor.past_len(), 0);
        assert_eq!(
            editor.status_bar().last(),
            Some("Create: requirements not fulfilled")
        );
    }

    #[test]
    fn create_action_runs_its_command_and_clears_itself() {
        let (_dir, workspace) = workspace();
        let mut editor = Editor::new();
        let mut action = Action::new(ActionKind::Create);
        action
            .specify(keys::COMMAND, Command::create(ComponentType::InputPin))
            .unwrap();

        action.execute(&mut editor, &workspace).unwrap();
        assert_eq!(editor.component_count(), 1);
        assert!(!action.requirements().fulfilled());
        assert_eq!(
            editor.status_bar().last(),
            Some("create input pin: component created")
        );
    }

    #[test]
    fn delete_of_missing_component_becomes_a_status() {
        let (_dir, workspace) = workspace();
        let mut editor = Editor::new();
        let mut delete = Command::delete();
        delete.specify(keys::NAME, "ghost").unwrap();

        let mut action = Action::new(ActionKind::Delete);
        action.specify(keys::COMMAND, delete).unwrap();
        action.execute(&mut editor, &workspace).unwrap();

        assert_eq!(editor.past_len(), 0);
        assert_eq!(
            editor.status_bar().last(),
            Some("no component with id \"ghost\"")
        );
    }

    #[test]
    fn inner_command_without_requirements_is_reported() {
        let (_dir, workspace) = workspace();
        let mut editor = Editor::new();
        let mut action = Action::new(ActionKind::Create);
        action
            .specify(keys::COMMAND, Command::create(ComponentType::AndGate))
            .unwrap();

        action.execute(&mut editor, &workspace).unwrap();
        assert!(editor.circuit().is_empty());
        assert_eq!(
            editor.status_bar().last(),
            Some("cannot create and gate: requirements not fulfilled")
        );
    }

    #[test]
    fn undo_redo_report_nothing_to_do() {
        let (_dir, workspace) = workspace();
        let mut editor = Editor::new();

        Action::new(ActionKind::Undo)
            .execute(&mut editor, &workspace)
            .unwrap();
        assert_eq!(editor.status_bar().last(), Some("nothing to undo"));

        Action::new(ActionKind::Redo)
            .execute(&mut editor, &workspace)
            .unwrap();
        assert_eq!(editor.status_bar().last(), Some("nothing to redo"));
    }

    #[test]
    fn open_adjusts_filename_options_from_the_workspace() {
        let (_dir, workspace) = workspace();
        persist::save(&workspace, "one.scad", &[]).unwrap();
        persist::save(&workspace, "two.scad", &[]).unwrap();

        let mut action = Action::new(ActionKind::Open);
        action.adjust_requirements(&workspace).unwrap();
        assert!(action.specify(keys::FILENAME, "one.scad").is_ok());
        assert!(action.specify(keys::FILENAME, "stranger.scad").is_err());
    }

    #[test]
    fn open_missing_file_reports_status_only() {
        let (_dir, workspace) = workspace();
        let mut editor = Editor::new();
        editor
            .execute(Command::create(ComponentType::InputPin))
            .unwrap();

        // The file exists when the options are listed, but vanishes before
        // the action runs.
        persist::save(&workspace, "ghost.scad", &[]).unwrap();
        let mut action = Action::new(ActionKind::Open);
        action.adjust_requirements(&workspace).unwrap();
        action.specify(keys::FILENAME, "ghost.scad").unwrap();
        action.specify(keys::FILETYPE, keys::CIRCUIT).unwrap();
        action.specify(keys::GATENAME, "x").unwrap();
        std::fs::remove_file(workspace.file_path("ghost.scad")).unwrap();

        action.execute(&mut editor, &workspace).unwrap();
        assert_eq!(editor.past_len(), 1, "editor state must be untouched");
        assert!(editor
            .status_bar()
            .last()
            .unwrap()
            .starts_with("file not found"));
    }

    #[test]
    fn open_with_unreplayable_file_keeps_the_editor_intact() {
        let (_dir, workspace) = workspace();
        // Decodes fine, but the branch names a component that never exists.
        let mut bad = Command::create(ComponentType::Branch);
        bad.specify(keys::SOURCE, "ghost").unwrap();
        bad.specify(keys::SOURCE_SLOT, "0").unwrap();
        bad.specify(keys::TARGET, "also-ghost").unwrap();
        bad.specify(keys::TARGET_SLOT, "0").unwrap();
        persist::save(&workspace, "bad.scad", &[bad]).unwrap();

        let mut editor = Editor::new();
        editor
            .execute(Command::create(ComponentType::InputPin))
            .unwrap();

        let mut open = Action::new(ActionKind::Open);
        open.adjust_requirements(&workspace).unwrap();
        open.specify(keys::FILENAME, "bad.scad").unwrap();
        open.specify(keys::FILETYPE, keys::CIRCUIT).unwrap();
        open.specify(keys::GATENAME, "x").unwrap();
        open.execute(&mut editor, &workspace).unwrap();

        assert_eq!(editor.past_len(), 1);
        assert!(editor.resolve("in0").is_ok());
        assert!(editor
            .status_bar()
            .last()
            .unwrap()
            .starts_with("cannot load bad.scad"));
    }

    #[test]
    fn every_action_has_a_distinct_title() {
        let titles: Vec<&str> = ActionKind::ALL.iter().map(|k| k.title()).collect();
        let mut deduped = titles.clone();
        deduped.dedup();
        assert_eq!(titles.len(), 8);
        assert_eq!(titles, deduped);
    }

    #[test]
    fn help_reports_topic_count() {
        let (_dir, workspace) = workspace();
        let mut editor = Editor::new();
        Action::new(ActionKind::Help)
            .execute(&mut editor, &workspace)
            .unwrap();
        assert_eq!(
            editor.status_bar().last(),
            Some("6 help topics available")
        );
        assert!(!HELP_TOPICS.is_empty());
    }
}
