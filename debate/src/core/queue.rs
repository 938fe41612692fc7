//! Task queue: one typed work item per agent turn.
//!
//! Role order is a hard precedence constraint, so at most one task may be
//! outstanding at a time. Tasks are never removed; completed and failed
//! tasks stay in the queue as an audit trail.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::DebateError;
use crate::core::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    /// The owning agent missed its deadline or the turn was abandoned.
    Failed,
}

impl TaskStatus {
    pub fn is_outstanding(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub subject: String,
    /// Context blob handed to the agent host (the rendered prompt).
    pub description: String,
    /// `None` while unassigned.
    pub owner: Option<Role>,
    pub status: TaskStatus,
    /// 1 for the first task with this subject, incremented on every re-enqueue.
    #[serde(default = "first_attempt")]
    pub attempt: u32,
    /// Why the task failed, when `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

fn first_attempt() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQueue {
    tasks: Vec<Task>,
    next_id: u32,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending task. Fails while another task is outstanding.
    pub fn enqueue(
        &mut self,
        subject: impl Into<String>,
        description: impl Into<String>,
        owner: Option<Role>,
    ) -> Result<TaskId, DebateError> {
        if let Some(current) = self.outstanding() {
            return Err(DebateError::InvalidState(format!(
                "task {} is still outstanding",
                current.id
            )));
        }
        let subject = subject.into();
        let attempt = self.attempts(&subject) + 1;
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(Task {
            id,
            subject,
            description: description.into(),
            owner,
            status: TaskStatus::Pending,
            attempt,
            failure: None,
        });
        Ok(id)
    }

    /// Mark a pending task as picked up by its owner.
    pub fn start(&mut self, id: TaskId) -> Result<(), DebateError> {
        let task = self.get_mut(id)?;
        if task.status != TaskStatus::Pending {
            return Err(DebateError::InvalidState(format!(
                "task {} cannot start from {:?}",
                id, task.status
            )));
        }
        task.status = TaskStatus::InProgress;
        Ok(())
    }

    pub fn complete(&mut self, id: TaskId) -> Result<(), DebateError> {
        let task = self.get_mut(id)?;
        match task.status {
            TaskStatus::Completed => Err(DebateError::AlreadyCompleted(id)),
            TaskStatus::Failed => Err(DebateError::InvalidState(format!(
                "task {id} already failed"
            ))),
            TaskStatus::Pending | TaskStatus::InProgress => {
                task.status = TaskStatus::Completed;
                Ok(())
            }
        }
    }

    pub fn fail(&mut self, id: TaskId, reason: impl Into<String>) -> Result<(), DebateError> {
        let task = self.get_mut(id)?;
        match task.status {
            TaskStatus::Completed => Err(DebateError::AlreadyCompleted(id)),
            TaskStatus::Failed => Err(DebateError::InvalidState(format!(
                "task {id} already failed"
            ))),
            TaskStatus::Pending | TaskStatus::InProgress => {
                task.status = TaskStatus::Failed;
                task.failure = Some(reason.into());
                Ok(())
            }
        }
    }

    /// The single pending or in-progress task, if any.
    pub fn outstanding(&self) -> Option<&Task> {
        self.tasks.iter().rev().find(|task| task.status.is_outstanding())
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of tasks ever enqueued under `subject`.
    pub fn attempts(&self, subject: &str) -> u32 {
        self.tasks.iter().filter(|task| task.subject == subject).count() as u32
    }

    fn get_mut(&mut self, id: TaskId) -> Result<&mut Task, DebateError> {
        self.tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(DebateError::UnknownTask(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_assigns_sequential_ids() {
        let mut queue = TaskQueue::new();
        let first = queue
            .enqueue("round 1: critic", "ctx", Some(Role::Critic))
            .expect("enqueue");
        queue.complete(first).expect("complete");
        let second = queue
            .enqueue("round 1: advocate", "ctx", Some(Role::Advocate))
            .expect("enqueue");

        assert_eq!(first, TaskId(1));
        assert_eq!(second, TaskId(2));
        assert_eq!(queue.get(second).map(|t| t.status), Some(TaskStatus::Pending));
    }

    #[test]
    fn enqueue_rejects_second_outstanding_task() {
        let mut queue = TaskQueue::new();
        queue
            .enqueue("round 1: critic", "ctx", Some(Role::Critic))
            .expect("enqueue");
        let err = queue
            .enqueue("round 1: advocate", "ctx", Some(Role::Advocate))
            .expect_err("second outstanding task");
        assert!(matches!(err, DebateError::InvalidState(_)));
    }

    #[test]
    fn complete_twice_fails_on_second_call() {
        let mut queue = TaskQueue::new();
        let id = queue.enqueue("s", "d", None).expect("enqueue");
        queue.start(id).expect("start");
        queue.complete(id).expect("first complete");
        assert_eq!(queue.complete(id), Err(DebateError::AlreadyCompleted(id)));
    }

    #[test]
    fn complete_unknown_task_fails() {
        let mut queue = TaskQueue::new();
        assert_eq!(
            queue.complete(TaskId(42)),
            Err(DebateError::UnknownTask(TaskId(42)))
        );
    }

    #[test]
    fn failed_task_is_retained_and_frees_the_queue() {
        let mut queue = TaskQueue::new();
        let id = queue.enqueue("s", "d", Some(Role::Judge)).expect("enqueue");
        queue.start(id).expect("start");
        queue.fail(id, "deadline exceeded").expect("fail");

        assert!(queue.outstanding().is_none());
        let task = queue.get(id).expect("task kept");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.failure.as_deref(), Some("deadline exceeded"));
        assert!(matches!(
            queue.complete(id),
            Err(DebateError::InvalidState(_))
        ));
        let retry = queue.enqueue("s", "d", Some(Role::Judge)).expect("re-enqueue");
        assert_eq!(queue.tasks().len(), 2);
        assert_eq!(queue.get(retry).map(|t| t.attempt), Some(2));
    }
}
