use std::collections::HashMap;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::debug;

/// Task Supervisor - Owns the named background tasks of one component
///
/// ## Purpose
/// Every background loop (connect attempt, receive loop, keep-alive,
/// generator, inbound handler) is registered under a name so the owner can
/// cancel it synchronously. Aborting happens in the caller's critical
/// section, so a cancelled task never observes state changed after it.
///
/// ## Usage
/// ```ignore
/// let mut supervisor = TaskSupervisor::new();
///
/// supervisor.spawn("keepalive", async move {
///     // task logic
/// });
///
/// // Later, leaving the state that needed it
/// supervisor.abort_all();
/// ```
pub struct TaskSupervisor {
    tasks: HashMap<&'static str, JoinHandle<()>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: HashMap::new(),
        }
    }

    /// Spawn a background task under `name`, replacing (and aborting) any
    /// task already registered with that name.
    pub fn spawn<F>(&mut self, name: &'static str, future: F) -> &mut Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);

        if let Some(previous) = self.tasks.insert(name, handle) {
            previous.abort();
            debug!("Replaced background task: {}", name);
        } else {
            debug!("Spawned background task: {}", name);
        }
        self
    }

    pub fn abort_all(&mut self) {
        if self.tasks.is_empty() {
            return;
        }

        debug!("Aborting {} background tasks", self.tasks.len());
        for (name, handle) in self.tasks.drain() {
            handle.abort();
            debug!("Aborted task: {}", name);
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskSupervisor {
    fn drop(&mut self) {
        self.abort_all();
    }
}
