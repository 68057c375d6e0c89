use tokio::task::JoinHandle;

/// Manages background tasks with proper lifecycle handling
pub struct TaskManager {
    handles: Vec<JoinHandle<()>>,
}

impl TaskManager {
    /// Create a new empty task manager
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Spawn a task and track it
    pub fn spawn<F>(&mut self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        // Drop handles of tasks that already ran to completion
        self.handles.retain(|h| !h.is_finished());

        let handle = tokio::spawn(future);
        self.handles.push(handle);
    }

    /// Abort all tasks without waiting
    pub fn abort_all(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
        self.handles.clear();
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
