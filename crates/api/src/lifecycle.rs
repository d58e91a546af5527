use dfs_rmi::{ListenAction, RmiError, SkeletonHooks};
use std::io;
use std::sync::{Condvar, Mutex, PoisonError};

/// Skeleton hooks shared by the skeletons of one server process.
///
/// Logs every failure through `tracing` and lets the process block until any of its
/// skeletons stops.
pub struct ServerHooks {
    server: &'static str,
    stopped: Mutex<bool>,
    changed: Condvar,
}

impl ServerHooks {
    pub fn new(server: &'static str) -> Self {
        Self {
            server,
            stopped: Mutex::new(false),
            changed: Condvar::new(),
        }
    }

    /// Clears the stopped flag. Called when the server (re)starts.
    pub fn started(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Returns `true` once a skeleton has stopped since the last start.
    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until a skeleton stops.
    pub fn wait(&self) {
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        while !*stopped {
            stopped = self
                .changed
                .wait(stopped)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl SkeletonHooks for ServerHooks {
    fn listen_error(&self, error: &io::Error) -> ListenAction {
        tracing::error!("{} server failed to accept a connection: {}", self.server, error);
        ListenAction::Stop
    }

    fn service_error(&self, error: &RmiError) {
        tracing::warn!("{} server failed to serve a call: {}", self.server, error);
    }

    fn stopped(&self, cause: Option<&RmiError>) {
        match cause {
            Some(cause) => tracing::error!("{} server stopped: {}", self.server, cause),
            None => tracing::info!("{} server stopped", self.server),
        }
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.changed.notify_all();
    }
}
