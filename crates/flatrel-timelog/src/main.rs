//! timelog command-line interface
//!
//! Logs time spent on tasks and reports on it.
//!
//! # Usage
//!
//! ```bash
//! # Log an interval
//! timelog add review --project flatrel --start 09:00 --end 10:30
//!
//! # Show a task and its logs
//! timelog task review
//!
//! # Report the last week
//! timelog report week
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use flatrel_timelog::clock::parse_timestamp;
use flatrel_timelog::report::{format_log, render_report};
use flatrel_timelog::{Journal, Log, Period, Task, TimelogConfig};

/// timelog command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "timelog",
    version,
    about = "Log time spent on tasks",
    long_about = "Log time spent on tasks and report on it.\n\n\
                  Tasks and logs are stored as plain delimited files in one directory."
)]
struct Args {
    /// Data directory
    #[arg(short = 'd', long, value_name = "DIR", env = "TIMELOG_DIR")]
    dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log an interval of work on a task
    Add {
        /// Task name
        task: String,

        /// Start time: `now`, `HH:MM`, `YYYY-MM-DD HH:MM`, RFC 3339 or Unix seconds
        #[arg(long)]
        start: String,

        /// End time, same forms as --start
        #[arg(long, default_value = "now")]
        end: String,

        /// Project of the task
        #[arg(short = 'p', long, default_value = "")]
        project: String,

        /// Issue id of the task
        #[arg(short = 'i', long, default_value = "")]
        issue: String,

        /// Note attached to the interval
        #[arg(short = 'm', long, default_value = "")]
        description: String,
    },

    /// Show tasks with the given name and their logs
    Task {
        /// Task name
        name: String,
    },

    /// List projects, or show the tasks of one project and their logs
    Project {
        /// Project name
        name: Option<String>,
    },

    /// Delete tasks with the given name and all their logs
    DeleteTask {
        /// Task name
        name: String,
    },

    /// Delete the tasks of a project and all their logs
    DeleteProject {
        /// Project name
        name: String,
    },

    /// Show the most recent log
    Last,

    /// Delete the most recent log
    DeleteLast,

    /// List tasks by most recent activity
    Recent {
        /// Number of tasks to list
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Report time per task and day
    Report {
        /// Window to report on; everything when omitted
        #[arg(value_enum)]
        period: Option<Period>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = load_config(&args)?;
    info!("Using data directory {}", config.store.data_dir.display());
    let journal = Journal::open(config.store.clone())?;

    match args.command {
        Command::Add {
            task,
            start,
            end,
            project,
            issue,
            description,
        } => {
            let now = Local::now();
            let task = Task::new(task).with_project(project).with_issue(issue);
            let log = Log::new(
                task,
                parse_timestamp(&start, &now)?,
                parse_timestamp(&end, &now)?,
            )
            .with_description(description);
            if log.end < log.start {
                anyhow::bail!("end is before start");
            }
            journal.add(&log)?;
            println!("{}  {}", log.task, format_log(&log, &Local));
        }
        Command::Task { name } => print_tasks(&journal, &journal.tasks_named(&name)?)?,
        Command::Project { name: None } => {
            for project in journal.projects()? {
                println!("{}", project);
            }
        }
        Command::Project { name: Some(name) } => {
            print_tasks(&journal, &journal.tasks_in_project(&name)?)?
        }
        Command::DeleteTask { name } => delete_tasks(&journal, journal.tasks_named(&name)?)?,
        Command::DeleteProject { name } => {
            delete_tasks(&journal, journal.tasks_in_project(&name)?)?
        }
        Command::Last => {
            if let Some(log) = journal.last()? {
                println!("{}  {}", log.task, format_log(&log, &Local));
            }
        }
        Command::DeleteLast => match journal.delete_last()? {
            Some(log) => println!("deleted {}  {}", log.task, format_log(&log, &Local)),
            None => println!("nothing to delete"),
        },
        Command::Recent { limit } => {
            for task in journal.recent_tasks(limit.unwrap_or(config.recent_limit))? {
                println!("{}", task);
            }
        }
        Command::Report { period } => {
            let since = period.map_or(0.0, |p| Local::now().timestamp() as f64 - p.seconds());
            print!("{}", render_report(&journal.report(since, &Local)?, &Local));
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("flatrel_store=debug,flatrel_timelog=debug,timelog=debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<TimelogConfig> {
    let mut config = if let Some(path) = &args.config {
        TimelogConfig::from_file(path)?
    } else {
        TimelogConfig::load_default()?
    };

    // Override with command line arguments
    if let Some(dir) = &args.dir {
        config.store.data_dir = dir.clone();
    }

    Ok(config)
}

fn print_tasks(journal: &Journal, tasks: &[Task]) -> Result<()> {
    for task in tasks {
        println!("{}", task);
        for log in journal.logs_of(task)? {
            println!("  {}", format_log(&log, &Local));
        }
    }
    Ok(())
}

fn delete_tasks(journal: &Journal, tasks: Vec<Task>) -> Result<()> {
    if tasks.is_empty() {
        println!("nothing to delete");
        return Ok(());
    }
    let summary = journal.delete_tasks(&tasks)?;
    for task in &tasks {
        println!("deleted {}", task);
    }
    println!(
        "removed {} tasks and {} logs",
        summary.count("Task"),
        summary.count("Log")
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        let args = Args::try_parse_from([
            "timelog", "add", "review", "--start", "09:00", "-p", "flatrel", "-m", "notes",
        ])
        .unwrap();
        match args.command {
            Command::Add {
                task,
                start,
                end,
                project,
                issue,
                description,
            } => {
                assert_eq!(task, "review");
                assert_eq!(start, "09:00");
                assert_eq!(end, "now");
                assert_eq!(project, "flatrel");
                assert_eq!(issue, "");
                assert_eq!(description, "notes");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_report_period() {
        let args = Args::try_parse_from(["timelog", "report", "week"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Report {
                period: Some(Period::Week)
            }
        ));
        assert!(Args::try_parse_from(["timelog", "report", "decade"]).is_err());
    }

    #[test]
    fn test_dir_overrides_config() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "recent_limit = 4\n[store]\ndata_dir = \"/tmp/from-file\"\n").unwrap();
        let path = path.to_str().unwrap();

        let args = Args::try_parse_from([
            "timelog", "--config", path, "--dir", "/tmp/elsewhere", "-v", "last",
        ])
        .unwrap();
        assert!(args.verbose);
        let config = load_config(&args).unwrap();
        assert_eq!(config.store.data_dir, PathBuf::from("/tmp/elsewhere"));
        assert_eq!(config.recent_limit, 4);
    }
}
