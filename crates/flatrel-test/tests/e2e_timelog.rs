//! End-to-end scenarios for the time journal.

use chrono::Utc;
use flatrel_store::{Model, Queryable, StoreConfig};
use flatrel_test::fixtures::Scratch;
use flatrel_timelog::report::render_report;
use flatrel_timelog::{Journal, Log, Task};
use tempfile::TempDir;

const MORNING: f64 = 1_792_054_800.0;

fn open(dir: &TempDir) -> Journal {
    Journal::open(StoreConfig::with_data_dir(dir.path())).unwrap()
}

#[test]
fn test_journal_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let review = Task::new("review").with_project("flatrel").with_issue("42");
    {
        let journal = open(&dir);
        journal
            .add(&Log::new(review.clone(), MORNING, MORNING + 5400.0).with_description("first pass"))
            .unwrap();
    }

    let journal = open(&dir);
    let logs = journal.logs_of(&review).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].task, review);
    assert_eq!(logs[0].duration(), 5400.0);
    assert_eq!(logs[0].description, "first pass");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("task.csv")).unwrap(),
        "review,flatrel,42\n"
    );
}

#[test]
fn test_delete_project_keeps_other_logs_resolvable() {
    let dir = TempDir::new().unwrap();
    let journal = open(&dir);
    let a = Task::new("a").with_project("one");
    let b = Task::new("b").with_project("two");
    let c = Task::new("c").with_project("one");
    for (i, task) in [&a, &b, &c, &b].into_iter().enumerate() {
        let start = MORNING + 1000.0 * i as f64;
        journal.add(&Log::new(task.clone(), start, start + 600.0)).unwrap();
    }

    let removed = journal.tasks_in_project("one").unwrap();
    assert_eq!(removed, vec![a, c]);
    let summary = journal.delete_tasks(&removed).unwrap();
    assert_eq!(summary.count("Task"), 2);
    assert_eq!(summary.count("Log"), 2);

    assert_eq!(journal.projects().unwrap(), vec!["two"]);
    let logs = Log::read_from(&Log::table(journal.catalog()).unwrap(), &Default::default()).unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|log| log.task == b));
}

#[test]
fn test_recent_and_report() {
    let dir = TempDir::new().unwrap();
    let journal = open(&dir);
    let write = Task::new("write");
    let fix = Task::new("fix");
    journal.add(&Log::new(write.clone(), MORNING, MORNING + 1800.0)).unwrap();
    journal.add(&Log::new(fix.clone(), MORNING + 3600.0, MORNING + 4500.0)).unwrap();
    journal
        .add(&Log::new(write.clone(), MORNING + 86_400.0, MORNING + 90_000.0))
        .unwrap();

    assert_eq!(journal.recent_tasks(5).unwrap(), vec![write.clone(), fix.clone()]);

    let reports = journal.report(0.0, &Utc).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].task, write);
    assert_eq!(reports[0].total, 5400.0);
    assert_eq!(reports[0].days.len(), 2);
    assert_eq!(reports[1].total, 900.0);

    let text = render_report(&reports, &Utc);
    assert!(text.contains("write"));
    assert!(text.contains("2026-10-16"));

    let later = journal.report(MORNING + 80_000.0, &Utc).unwrap();
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].total, 3600.0);
}

#[test]
fn test_store_scratch_and_journal_share_files() {
    let scratch = Scratch::new();
    let task = Task::new("shared").with_project("p");
    task.create_in(scratch.catalog()).unwrap();

    assert_eq!(scratch.read("Task"), "shared,p,\n");
    let tasks = Task::table(scratch.catalog()).unwrap();
    assert_eq!(tasks.len().unwrap(), 1);
    assert_eq!(Task::read_from(&tasks, &Default::default()).unwrap(), vec![task]);
}
