use std::sync::Mutex;

use crate::modules::guard::Route;

/// Receives hard navigations triggered outside of any screen, e.g. an irrecoverable auth failure
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Records the most recent forced navigation so the front-end can act on it
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Route> {
        self.visited
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .copied()
    }

    pub fn history(&self) -> Vec<Route> {
        self.visited.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(route = route.path(), "Forced navigation");
        self.visited
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(route);
    }
}
