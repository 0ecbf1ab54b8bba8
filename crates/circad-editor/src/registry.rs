#![forbid(unsafe_code)]

//! An ordered set of open editors with a close-with-confirmation lifecycle.
//!
//! The registry never decides for the user: closing a dirty editor consults
//! a host-supplied [`ClosePrompt`], and a refused close leaves the editor
//! exactly where it was.

use crate::editor::{Editor, FileInfo};
use crate::error::Result;
use crate::persist::Workspace;

/// What to do with unsaved changes when an editor is asked to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Save under the current filename, then close.
    Save,
    /// Close, losing the unsaved changes.
    Discard,
    /// Keep the editor open.
    Cancel,
}

/// Host-side hook consulted when a dirty editor is asked to close.
pub trait ClosePrompt {
    /// Decide what to do with the unsaved changes described by `info`.
    fn confirm_close(&mut self, info: &FileInfo) -> CloseDecision;
}

/// An ordered collection of open editors.
#[derive(Debug, Default)]
pub struct EditorRegistry {
    editors: Vec<Editor>,
}

impl EditorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an editor, returning its index.
    pub fn add(&mut self, editor: Editor) -> usize {
        self.editors.push(editor);
        self.editors.len() - 1
    }

    /// Create, register, and return the index of a fresh editor.
    pub fn spawn(&mut self) -> usize {
        self.add(Editor::new())
    }

    /// Number of open editors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.editors.len()
    }

    /// Whether no editors are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    /// The editor at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Editor> {
        self.editors.get(index)
    }

    /// The editor at `index`, mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Editor> {
        self.editors.get_mut(index)
    }

    /// Iterate the open editors in order.
    pub fn iter(&self) -> impl Iterator<Item = &Editor> {
        self.editors.iter()
    }

    /// The file info of every open editor, in order, for the outer UI.
    pub fn file_infos(&self) -> impl Iterator<Item = &FileInfo> {
        self.editors.iter().map(Editor::file_info)
    }

    /// Ask the editor at `index` to close. Drops it only when it agrees;
    /// returns whether it was dropped.
    ///
    /// # Errors
    ///
    /// A failed save aborts the close and propagates.
    pub fn close(
        &mut self,
        index: usize,
        prompt: &mut dyn ClosePrompt,
        workspace: &Workspace,
    ) -> Result<bool> {
        let Some(editor) = self.editors.get_mut(index) else {
            return Ok(false);
        };
        if editor.close(prompt, workspace)? {
            self.editors.remove(index);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, ComponentType};
    use crate::persist;
    use tempfile::tempdir;

    struct Always(CloseDecision);

    impl ClosePrompt for Always {
        fn confirm_close(&mut self, _info: &FileInfo) -> CloseDecision {
            self.0
        }
    }

    fn dirty_editor() -> Editor {
        let mut editor = Editor::new();
        editor
            .execute(Command::create(ComponentType::InputPin))
            .unwrap();
        editor
    }

    #[test]
    fn clean_editor_closes_without_prompting() {
        struct Panics;
        impl ClosePrompt for Panics {
            fn confirm_close(&mut self, _info: &FileInfo) -> CloseDecision {
                panic!("a clean editor must not prompt");
            }
        }

        let dir = tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        let mut registry = EditorRegistry::new();
        registry.spawn();
        assert!(registry.close(0, &mut Panics, &workspace).unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn cancelled_close_keeps_the_editor() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        let mut registry = EditorRegistry::new();
        registry.add(dirty_editor());

        assert!(!registry
            .close(0, &mut Always(CloseDecision::Cancel), &workspace)
            .unwrap());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn discarded_close_drops_the_editor() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        let mut registry = EditorRegistry::new();
        registry.add(dirty_editor());

        assert!(registry
            .close(0, &mut Always(CloseDecision::Discard), &workspace)
            .unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn save_close_writes_the_file_first() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        let mut registry = EditorRegistry::new();

        let mut editor = dirty_editor();
        editor.file_info_mut().set_file("kept.scad");
        registry.add(editor);

        assert!(registry
            .close(0, &mut Always(CloseDecision::Save), &workspace)
            .unwrap());
        let commands = persist::load(&workspace, "kept.scad").unwrap();
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn file_infos_follow_editor_order() {
        let mut registry = EditorRegistry::new();
        registry.spawn();
        let mut named = Editor::new();
        named.file_info_mut().set_file("b.scad");
        registry.add(named);

        let names: Vec<Option<&str>> = registry.file_infos().map(FileInfo::filename).collect();
        assert_eq!(names, vec![None, Some("b.scad")]);
    }

    #[test]
    fn save_close_without_filename_is_cancelled() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        let mut registry = EditorRegistry::new();
        registry.add(dirty_editor());

        assert!(!registry
            .close(0, &mut Always(CloseDecision::Save), &workspace)
            .unwrap());
        assert_eq!(registry.len(), 1);
    }
}
