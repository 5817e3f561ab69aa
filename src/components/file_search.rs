use super::actions::{ActionSender, UiAction};
use super::debounce::Debounce;
use super::ComponentError;
use crate::constants::DEFAULT_SEARCH_DEBOUNCE_MS;
use log::warn;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Search box that widens while focused and requests a search once typing
/// has paused.
pub struct FileSearch {
    expanded: bool,
    search_text: Arc<Mutex<String>>,
    window: Duration,
    actions: ActionSender,
    debouncer: Arc<dyn Debounce>,
}

impl FileSearch {
    pub fn new(actions: ActionSender, debouncer: Arc<dyn Debounce>) -> Self {
        Self {
            expanded: false,
            search_text: Arc::new(Mutex::new(String::new())),
            window: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            actions,
            debouncer,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn focus_in(&mut self) {
        self.expanded = true;
    }

    pub fn focus_out(&mut self) {
        self.expanded = false;
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn set_search_text(&self, text: impl Into<String>) {
        *self.search_text.lock().unwrap_or_else(|p| p.into_inner()) = text.into();
    }

    pub fn search_text(&self) -> String {
        self.search_text.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Request a search with the current text right away.
    pub fn search_files(&self) -> Result<(), ComponentError> {
        self.actions.send(UiAction::SearchRequested {
            search_text: self.search_text(),
        })
    }

    /// Called on every keystroke. The search fires once, with the text as
    /// it is when the window closes.
    pub fn throttle_typing(&self) {
        let text = Arc::clone(&self.search_text);
        let actions = self.actions.clone();
        self.debouncer.debounce(
            self.window,
            Box::new(move || {
                let search_text = text.lock().unwrap_or_else(|p| p.into_inner()).clone();
                if let Err(e) = actions.send(UiAction::SearchRequested { search_text }) {
                    warn!("Search request not delivered: {}", e);
                }
            }),
        );
    }
}
