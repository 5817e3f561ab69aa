use super::ComponentError;
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub type DebouncedAction = Box<dyn FnOnce() + Send + 'static>;

/// Trailing-edge call coalescing: of the actions scheduled within one
/// window only the last runs, `window` after it was scheduled.
pub trait Debounce: Send + Sync {
    fn debounce(&self, window: Duration, action: DebouncedAction);

    /// Drop the pending action, if any.
    fn cancel(&self);
}

/// [`Debounce`] backed by a tokio timer task.
pub struct TokioDebouncer {
    runtime: Handle,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl TokioDebouncer {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            pending: Mutex::new(None),
        }
    }

    /// Bind to the runtime the caller is running on.
    pub fn from_current() -> Result<Self, ComponentError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| ComponentError::NoRuntime(e.to_string()))
    }

    fn replace_pending(&self, next: Option<JoinHandle<()>>) {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = next;
    }
}

impl Debounce for TokioDebouncer {
    fn debounce(&self, window: Duration, action: DebouncedAction) {
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            action();
        });
        self.replace_pending(Some(task));
    }

    fn cancel(&self) {
        self.replace_pending(None);
    }
}

impl Drop for TokioDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
