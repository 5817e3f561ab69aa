use super::actions::{ActionSender, UiAction};
use super::ComponentError;
use std::collections::BTreeMap;

/// Binding name of the pending archive entry.
pub const ARCHIVE_MODEL: &str = "archive";

/// Editor for a job's archive list.
pub struct ArchiveConfig {
    archives: Vec<String>,
    archive: String,
    bindings: BTreeMap<String, String>,
    file_path_model: Option<String>,
    actions: ActionSender,
}

impl ArchiveConfig {
    pub fn new(archives: Vec<String>, actions: ActionSender) -> Self {
        Self {
            archives,
            archive: String::new(),
            bindings: BTreeMap::new(),
            file_path_model: None,
            actions,
        }
    }

    pub fn archives(&self) -> &[String] {
        &self.archives
    }

    pub fn pending_archive(&self) -> &str {
        &self.archive
    }

    pub fn set_pending_archive(&mut self, archive: impl Into<String>) {
        self.archive = archive.into();
    }

    pub fn binding(&self, model: &str) -> Option<&str> {
        if model == ARCHIVE_MODEL {
            return Some(&self.archive);
        }
        self.bindings.get(model).map(String::as_str)
    }

    /// Put the pending entry at the front of the list and clear it.
    pub fn add_archive(&mut self) {
        let archive = std::mem::take(&mut self.archive);
        self.archives.insert(0, archive);
    }

    pub fn delete_archive(&mut self, index: usize) -> Result<String, ComponentError> {
        if index >= self.archives.len() {
            return Err(ComponentError::IndexOutOfRange {
                index,
                len: self.archives.len(),
            });
        }
        Ok(self.archives.remove(index))
    }

    /// Remember which binding receives the chosen path and ask the host to
    /// open its file browser.
    pub fn open_file_browser(&mut self, model: impl Into<String>) -> Result<(), ComponentError> {
        let model = model.into();
        self.file_path_model = Some(model.clone());
        self.actions.send(UiAction::OpenFileBrowser { model })
    }

    pub fn file_selected(&mut self, path: impl Into<String>) -> Result<(), ComponentError> {
        let model = self
            .file_path_model
            .as_deref()
            .ok_or(ComponentError::NoFileBrowserOpen)?;
        if model == ARCHIVE_MODEL {
            self.archive = path.into();
        } else {
            self.bindings.insert(model.to_string(), path.into());
        }
        Ok(())
    }
}
