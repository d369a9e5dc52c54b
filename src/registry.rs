/*!
 * Process-wide task registry.
 *
 * Maps a task identifier to its cancellation flag and event stream for
 * the lifetime of one translation request. The registry is in-memory
 * and single-instance by contract: a multi-instance deployment needs an
 * external shared store or sticky routing, which is out of scope here.
 */

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::TaskError;
use crate::events::{self, EventStream, TaskHandle};

struct TaskEntry {
    cancelled: Arc<AtomicBool>,
    /// Consumer half, parked here until the observing stream claims it
    stream: Option<EventStream>,
}

/// Registry service object with create/get/delete operations behind a
/// single lock
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, TaskEntry>>,
}

static GLOBAL_REGISTRY: Lazy<TaskRegistry> = Lazy::new(TaskRegistry::new);

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { tasks: Mutex::new(HashMap::new()) }
    }

    /// The shared process-wide registry instance
    pub fn global() -> &'static TaskRegistry {
        &GLOBAL_REGISTRY
    }

    /// Register a new task and return its producer handle. The consumer
    /// half stays parked in the registry until `take_stream` claims it.
    /// Re-registering an id replaces the previous entry, so a stale
    /// consumer observes end-of-stream rather than foreign events.
    pub fn create(&self, task_id: &str) -> TaskHandle {
        let (handle, stream) = events::channel(task_id);

        let entry = TaskEntry { cancelled: handle.cancel_flag(), stream: Some(stream) };
        self.tasks.lock().insert(task_id.to_string(), entry);

        handle
    }

    /// Claim the consumer stream for a task. Destructive: only one
    /// consumer per task, matching the channel's delivery contract.
    pub fn take_stream(&self, task_id: &str) -> Result<EventStream, TaskError> {
        let mut tasks = self.tasks.lock();
        match tasks.get_mut(task_id) {
            Some(entry) => {
                entry.stream.take().ok_or_else(|| TaskError::NotFound(task_id.to_string()))
            }
            None => Err(TaskError::NotFound(task_id.to_string())),
        }
    }

    /// Mark a task as cancelling. Fails with `TaskError::NotFound` for
    /// unknown ids.
    pub fn cancel(&self, task_id: &str) -> Result<(), TaskError> {
        let tasks = self.tasks.lock();
        match tasks.get(task_id) {
            Some(entry) => {
                entry.cancelled.store(true, Ordering::SeqCst);
                Ok(())
            }
            None => Err(TaskError::NotFound(task_id.to_string())),
        }
    }

    /// Whether a task id is currently registered
    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.lock().contains_key(task_id)
    }

    /// Number of live tasks
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Whether the registry holds no tasks
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Remove a task entry. Called by the consumer once it observed a
    /// terminal event or gave up on the stream.
    pub fn remove(&self, task_id: &str) {
        self.tasks.lock().remove(task_id);
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventLogLevel};

    #[test]
    fn test_cancel_unknown_task_is_not_found() {
        let registry = TaskRegistry::new();
        let result = registry.cancel("missing");
        assert!(matches!(result, Err(TaskError::NotFound(_))));
    }

    #[test]
    fn test_cancel_sets_flag_on_handle() {
        let registry = TaskRegistry::new();
        let handle = registry.create("task-1");
        assert!(!handle.is_cancelled());

        registry.cancel("task-1").unwrap();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_stream_claim_is_destructive() {
        let registry = TaskRegistry::new();
        let _handle = registry.create("task-2");

        assert!(registry.take_stream("task-2").is_ok());
        assert!(matches!(registry.take_stream("task-2"), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn test_remove_makes_task_unknown() {
        let registry = TaskRegistry::new();
        let _handle = registry.create("task-3");
        assert!(registry.contains("task-3"));

        registry.remove("task-3");
        assert!(!registry.contains("task-3"));
        assert!(registry.cancel("task-3").is_err());
    }

    #[tokio::test]
    async fn test_recreated_task_gets_fresh_channel() {
        let registry = TaskRegistry::new();
        let first_handle = registry.create("task-4");
        let mut first_stream = registry.take_stream("task-4").unwrap();

        let second_handle = registry.create("task-4");
        let mut second_stream = registry.take_stream("task-4").unwrap();

        second_handle.log(EventLogLevel::Info, "new");
        drop(first_handle);
        drop(second_handle);

        // The replaced consumer drains to end-of-stream without seeing
        // the new task's events.
        assert!(first_stream.next_event().await.is_none());
        assert!(matches!(second_stream.next_event().await, Some(Event::Log { .. })));
    }
}
