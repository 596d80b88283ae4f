//! Operator CLI over a SQLite-backed goal store.
//!
//! Every subcommand acts for the user given by `--user` and prints one JSON
//! document on stdout. Failures print `{"error": ...}` and exit non-zero.

use clap::{Parser, Subcommand};
use goalstore_core::{
    default_log_level, init_logging, open_db, ChatCompletionsGenerator, DeletionReport,
    GeneratorConfig, GoalPlanner, LogSettings, NewTask, SqliteBackend, TaskPatch, TaskStore,
};
use log::info;
use serde_json::{json, Value};
use std::error::Error;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[clap(
    name = "goalstore",
    version = env!("CARGO_PKG_VERSION"),
    about = "Break goals into ordered tasks and manage them"
)]
struct Cli {
    /// SQLite database file.
    #[clap(long, env = "GOALSTORE_DB", default_value = "goalstore.db")]
    db: PathBuf,
    /// Acting user id.
    #[clap(long, env = "GOALSTORE_USER")]
    user: String,
    /// trace|debug|info|warn|error
    #[clap(long)]
    log_level: Option<String>,
    /// Directory for rolling log files. Logging stays off when omitted.
    #[clap(long)]
    log_dir: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate tasks for a goal with the configured model and store them
    Plan {
        #[clap(long)]
        goal: String,
    },
    /// Store a goal with tasks extracted from already generated text
    Create {
        #[clap(long)]
        goal: String,
        /// File holding the generated list; stdin when omitted.
        #[clap(long)]
        from_file: Option<PathBuf>,
    },
    /// List goals
    Goals,
    /// List a goal's tasks in display order
    Tasks {
        #[clap(long)]
        goal_id: String,
    },
    /// Add a task; appended after the last task unless --order is given
    AddTask {
        #[clap(long)]
        goal_id: String,
        #[clap(long)]
        text: String,
        #[clap(long)]
        order: Option<f64>,
        #[clap(long)]
        deadline: Option<String>,
    },
    /// Edit text, deadline and/or time spent
    EditTask {
        #[clap(long)]
        goal_id: String,
        #[clap(long)]
        task_id: String,
        #[clap(long)]
        text: Option<String>,
        /// Empty string clears the deadline.
        #[clap(long)]
        deadline: Option<String>,
        #[clap(long)]
        time_spent: Option<u64>,
    },
    /// Mark a task completed (or not, with --undo)
    Complete {
        #[clap(long)]
        goal_id: String,
        #[clap(long)]
        task_id: String,
        #[clap(long)]
        undo: bool,
    },
    /// Move a task to an explicit order or between two neighbour orders
    MoveTask {
        #[clap(long)]
        goal_id: String,
        #[clap(long)]
        task_id: String,
        #[clap(long, conflicts_with_all = ["before", "after"])]
        order: Option<f64>,
        /// Order of the task that should precede it.
        #[clap(long)]
        before: Option<f64>,
        /// Order of the task that should follow it.
        #[clap(long)]
        after: Option<f64>,
    },
    /// Delete one task
    DeleteTask {
        #[clap(long)]
        goal_id: String,
        #[clap(long)]
        task_id: String,
    },
    /// Delete a goal and all of its tasks
    DeleteGoal {
        #[clap(long)]
        goal_id: String,
    },
    /// Re-space a goal's task orders evenly
    Reindex {
        #[clap(long)]
        goal_id: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", json!({ "error": err.to_string() }));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Value, Box<dyn Error>> {
    if let Some(dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(&LogSettings::new(level, dir)?)?;
    }

    let conn = open_db(&cli.db)?;
    let store = TaskStore::new(SqliteBackend::try_new(&conn)?);
    let user = cli.user.as_str();

    let output = match cli.command {
        Command::Plan { goal } => {
            let generator = ChatCompletionsGenerator::new(GeneratorConfig::from_env()?)?;
            info!("event=cli_plan module=cli model={}", generator.model());
            let created = GoalPlanner::new(generator).plan_goal(&store, user, &goal)?;
            json!({ "goal": created.goal, "tasks": created.tasks })
        }
        Command::Create { goal, from_file } => {
            let generated = match from_file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let created = store.create_goal_with_tasks(user, &goal, &generated)?;
            json!({ "goal": created.goal, "tasks": created.tasks })
        }
        Command::Goals => json!(store.list_goals(user)?),
        Command::Tasks { goal_id } => json!(store.list_tasks(user, &goal_id)?),
        Command::AddTask {
            goal_id,
            text,
            order,
            deadline,
        } => {
            let task = match order {
                Some(order) => store.add_task(
                    user,
                    &goal_id,
                    &NewTask {
                        task_text: text,
                        order,
                        deadline,
                    },
                )?,
                None => store.append_task(user, &goal_id, &text, deadline.as_deref())?,
            };
            json!(task)
        }
        Command::EditTask {
            goal_id,
            task_id,
            text,
            deadline,
            time_spent,
        } => {
            let patch = TaskPatch {
                task_text: text,
                deadline,
                time_spent,
            };
            store.edit_task(user, &goal_id, &task_id, &patch)?;
            json!({ "updated": task_id })
        }
        Command::Complete {
            goal_id,
            task_id,
            undo,
        } => {
            store.mark_task_completed(user, &goal_id, &task_id, !undo)?;
            json!({ "taskId": task_id, "completed": !undo })
        }
        Command::MoveTask {
            goal_id,
            task_id,
            order,
            before,
            after,
        } => match order {
            Some(order) => {
                store.update_task_order(user, &goal_id, &task_id, order)?;
                json!({ "taskId": task_id, "order": order, "needsReindex": false })
            }
            None => {
                let placement = store.place_task_between(user, &goal_id, &task_id, before, after)?;
                json!({
                    "taskId": task_id,
                    "order": placement.order,
                    "needsReindex": placement.needs_reindex,
                })
            }
        },
        Command::DeleteTask { goal_id, task_id } => {
            store.delete_task(user, &goal_id, &task_id)?;
            json!({ "deleted": task_id })
        }
        Command::DeleteGoal { goal_id } => {
            let deletion = store.delete_goal(user, &goal_id)?;
            json!({
                "goalId": deletion.goal_id,
                "tasks": deletion_json(&deletion.tasks),
            })
        }
        Command::Reindex { goal_id } => {
            let report = store.reindex_tasks(user, &goal_id)?;
            json!({
                "total": report.total,
                "rewritten": report.rewritten,
                "vanished": report.vanished,
            })
        }
    };
    Ok(output)
}

fn deletion_json(report: &DeletionReport) -> Value {
    json!({
        "requested": report.requested,
        "deleted": report.deleted,
        "undeleted": report
            .undeleted
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        "attempts": report
            .chunks
            .iter()
            .map(|chunk| chunk.attempts)
            .collect::<Vec<_>>(),
    })
}
