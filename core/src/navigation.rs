use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Directs the user somewhere. Fire-and-forget: nothing is returned.
pub trait Navigator: Send + Sync {
    fn go_to(&self, path: &str);
}

pub fn project_path(project_id: &str) -> String {
    format!("/{project_id}")
}

/// Remembers every destination in order.
#[derive(Clone, Default)]
pub struct RecordingNavigator {
    visited: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.visited.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn go_to(&self, path: &str) {
        self.visited.lock().push(path.to_owned());
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn go_to(&self, path: &str) {
        info!("path" = path, "navigating");
    }
}
