//! Tasks and the time logged against them.

use std::fmt;
use std::sync::Arc;

use flatrel_store::{Field, Model, Record, Schema, StoreResult};

/// A unit of work. Tasks are identified by value: two tasks with the same
/// name, project and issue are the same task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    /// Task name.
    pub name: String,
    /// Project the task belongs to. Empty when unassigned.
    pub project: String,
    /// Issue tracker id. Empty when none.
    pub issue_id: String,
}

impl Task {
    /// Creates a task with no project and no issue.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project: String::new(),
            issue_id: String::new(),
        }
    }

    /// Sets the project.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    /// Sets the issue id.
    #[must_use]
    pub fn with_issue(mut self, issue_id: impl Into<String>) -> Self {
        self.issue_id = issue_id.into();
        self
    }
}

impl Model for Task {
    fn schema() -> StoreResult<Arc<Schema>> {
        Schema::new(
            "Task",
            vec![
                Field::text("name"),
                Field::text("project"),
                Field::text("issue_id"),
            ],
        )
    }

    fn to_record(&self) -> StoreResult<Record> {
        Record::new(
            &Self::schema()?,
            vec![
                self.name.as_str().into(),
                self.project.as_str().into(),
                self.issue_id.as_str().into(),
            ],
        )
    }

    fn from_record(record: &Record) -> StoreResult<Self> {
        Ok(Self {
            name: record.text("name")?.to_string(),
            project: record.text("project")?.to_string(),
            issue_id: record.text("issue_id")?.to_string(),
        })
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.project.is_empty() {
            write!(f, " [{}]", self.project)?;
        }
        if !self.issue_id.is_empty() {
            write!(f, " #{}", self.issue_id)?;
        }
        Ok(())
    }
}

/// One interval of work on a task. Times are Unix seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Log {
    /// Task worked on.
    pub task: Task,
    /// Start of the interval.
    pub start: f64,
    /// End of the interval.
    pub end: f64,
    /// Free-form note.
    pub description: String,
}

impl Log {
    /// Creates a log entry without a description.
    pub fn new(task: Task, start: f64, end: f64) -> Self {
        Self {
            task,
            start,
            end,
            description: String::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Length of the interval in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl Model for Log {
    fn schema() -> StoreResult<Arc<Schema>> {
        Schema::new(
            "Log",
            vec![
                Field::reference("task", &Task::schema()?),
                Field::float("start"),
                Field::float("end"),
                Field::text("description"),
            ],
        )
    }

    fn to_record(&self) -> StoreResult<Record> {
        Record::new(
            &Self::schema()?,
            vec![
                self.task.to_record()?.into(),
                self.start.into(),
                self.end.into(),
                self.description.as_str().into(),
            ],
        )
    }

    fn from_record(record: &Record) -> StoreResult<Self> {
        Ok(Self {
            task: Task::from_record(record.record("task")?)?,
            start: record.float("start")?,
            end: record.float("end")?,
            description: record.text("description")?.to_string(),
        })
    }
}
