//! Background task supervision.

use std::future::Future;

use tokio::task::JoinHandle;

/// Tracks spawned background tasks so they can be joined on shutdown.
///
/// Tasks are expected to observe the shutdown signal themselves; `stop`
/// only waits for them to finish.
#[derive(Debug, Default)]
pub struct Workers {
    handles: Vec<JoinHandle<()>>,
}

impl Workers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a task and records its handle.
    pub fn start<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.retain(|handle| !handle.is_finished());
        self.handles.push(tokio::spawn(task));
    }

    /// Waits for every recorded task to finish.
    pub async fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
    }

    /// Number of tasks still being tracked.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
