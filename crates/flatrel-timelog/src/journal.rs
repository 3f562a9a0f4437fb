//! The time journal: tasks and logs stored in one catalog.

use anyhow::Result;
use chrono::TimeZone;
use flatrel_store::{
    Aggregate, Catalog, DeleteSummary, Model, Query, Queryable, StoreConfig,
};

use crate::models::{Log, Task};
use crate::report::{build_report, TaskReport};

/// Task and log storage with the queries timelog needs.
#[derive(Debug)]
pub struct Journal {
    catalog: Catalog,
}

impl Journal {
    /// Opens the journal stored under `config.data_dir`.
    pub fn open(config: StoreConfig) -> Result<Self> {
        Ok(Self {
            catalog: Catalog::open(config)?,
        })
    }

    /// Returns the underlying catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Records a log entry, storing its task first if it is new.
    pub fn add(&self, log: &Log) -> Result<()> {
        log.create_in(&self.catalog)?;
        Ok(())
    }

    /// Tasks with the given name, in storage order.
    pub fn tasks_named(&self, name: &str) -> Result<Vec<Task>> {
        self.tasks(Query::new().filter("name_eq", name))
    }

    /// Tasks of the given project, in storage order.
    pub fn tasks_in_project(&self, project: &str) -> Result<Vec<Task>> {
        self.tasks(Query::new().filter("project_eq", project))
    }

    fn tasks(&self, query: Query) -> Result<Vec<Task>> {
        let table = Task::table(&self.catalog)?;
        Ok(Task::read_from(&table, &query)?)
    }

    /// Distinct project names in order of first use.
    pub fn projects(&self) -> Result<Vec<String>> {
        let groups = Task::table(&self.catalog)?.group_by("project", &[])?;
        let mut projects = Vec::with_capacity(groups.len()?);
        for row in &groups {
            projects.push(row.text("project")?.to_string());
        }
        Ok(projects)
    }

    /// Logs of `task` in storage order.
    pub fn logs_of(&self, task: &Task) -> Result<Vec<Log>> {
        let logs = Log::table(&self.catalog)?;
        Ok(Log::read_from(
            &logs,
            &Query::new().filter("task_eq", task.to_record()?),
        )?)
    }

    /// Deletes `tasks` together with their logs.
    pub fn delete_tasks(&self, tasks: &[Task]) -> Result<DeleteSummary> {
        let records = tasks
            .iter()
            .map(Task::to_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.catalog.delete(&records, &[Log::schema()?])?)
    }

    /// The log that ended last.
    pub fn last(&self) -> Result<Option<Log>> {
        let logs = Log::table(&self.catalog)?;
        let latest = Log::read_from(&logs, &Query::new().order([("end", "desc")]).limit(1))?;
        Ok(latest.into_iter().next())
    }

    /// Deletes the log that ended last and returns it.
    pub fn delete_last(&self) -> Result<Option<Log>> {
        let Some(last) = self.last()? else {
            return Ok(None);
        };
        self.catalog
            .delete(&[last.to_record()?], &[Log::schema()?])?;
        Ok(Some(last))
    }

    /// Tasks ordered by their most recent log, newest first.
    pub fn recent_tasks(&self, limit: usize) -> Result<Vec<Task>> {
        let groups = Log::table(&self.catalog)?.group_by("task", &[("end", Aggregate::max("end"))])?;
        let rows = groups.read(&Query::new().order([("end", "desc")]).limit(limit))?;
        let mut tasks = Vec::with_capacity(rows.len());
        for row in &rows {
            tasks.push(Task::from_record(row.record("task")?)?);
        }
        Ok(tasks)
    }

    /// Per-task report of the logs that ended at or after `since`.
    ///
    /// Tasks appear in order of their first log; days are taken in `tz`.
    pub fn report<Tz: TimeZone>(&self, since: f64, tz: &Tz) -> Result<Vec<TaskReport>> {
        let logs = Log::table(&self.catalog)?;
        let groups = logs.group_by("task", &[("end", Aggregate::max("end"))])?;

        let mut entries = Vec::with_capacity(groups.len()?);
        for row in &groups {
            let task_record = row.record("task")?;
            let query = Query::new()
                .filter("task_eq", task_record.clone())
                .filter("end_ge", since);
            entries.push((
                Task::from_record(task_record)?,
                Log::read_from(&logs, &query)?,
            ));
        }
        Ok(build_report(entries, tz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn journal(tmp: &TempDir) -> Journal {
        Journal::open(StoreConfig::with_data_dir(tmp.path())).unwrap()
    }

    fn seed(journal: &Journal) -> (Task, Task) {
        let write = Task::new("write").with_project("docs");
        let fix = Task::new("fix").with_project("core").with_issue("12");
        journal.add(&Log::new(write.clone(), 100.0, 200.0)).unwrap();
        journal.add(&Log::new(fix.clone(), 300.0, 350.0)).unwrap();
        journal.add(&Log::new(write.clone(), 400.0, 460.0).with_description("again")).unwrap();
        (write, fix)
    }

    #[test]
    fn test_add_reuses_task_rows() {
        let tmp = TempDir::new().unwrap();
        let journal = journal(&tmp);
        let (write, _) = seed(&journal);

        assert_eq!(Task::table(journal.catalog()).unwrap().len().unwrap(), 2);
        assert_eq!(journal.tasks_named("write").unwrap(), vec![write.clone()]);
        assert_eq!(journal.logs_of(&write).unwrap().len(), 2);
    }

    #[test]
    fn test_projects_and_recent() {
        let tmp = TempDir::new().unwrap();
        let journal = journal(&tmp);
        let (write, fix) = seed(&journal);

        assert_eq!(journal.projects().unwrap(), vec!["docs", "core"]);
        assert_eq!(journal.tasks_in_project("core").unwrap(), vec![fix.clone()]);
        assert_eq!(journal.recent_tasks(10).unwrap(), vec![write.clone(), fix]);
        assert_eq!(journal.recent_tasks(1).unwrap(), vec![write]);
    }

    #[test]
    fn test_last_and_delete_last() {
        let tmp = TempDir::new().unwrap();
        let journal = journal(&tmp);
        assert!(journal.last().unwrap().is_none());
        assert!(journal.delete_last().unwrap().is_none());

        let (write, _) = seed(&journal);
        let last = journal.last().unwrap().unwrap();
        assert_eq!(last.end, 460.0);

        assert_eq!(journal.delete_last().unwrap(), Some(last));
        assert_eq!(journal.last().unwrap().unwrap().end, 350.0);
        assert_eq!(journal.logs_of(&write).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_tasks_cascades_to_logs() {
        let tmp = TempDir::new().unwrap();
        let journal = journal(&tmp);
        let (write, fix) = seed(&journal);

        let summary = journal.delete_tasks(&[write]).unwrap();
        assert_eq!(summary.count("Task"), 1);
        assert_eq!(summary.count("Log"), 2);

        // the surviving log still points at its own task
        let logs = journal.logs_of(&fix).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].task, fix);
    }

    #[test]
    fn test_report_since() {
        let tmp = TempDir::new().unwrap();
        let journal = journal(&tmp);
        seed(&journal);

        let reports = journal.report(300.0, &Utc).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].task.name, "write");
        assert_eq!(reports[0].total, 60.0);
        assert_eq!(reports[1].total, 50.0);

        let reports = journal.report(400.0, &Utc).unwrap();
        assert_eq!(reports.len(), 1);
    }
}
