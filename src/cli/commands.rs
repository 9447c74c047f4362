use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "ft",
    about = "A perspective-based task outliner",
    version,
    arg_required_else_help = false
)]
pub struct Cli {
    /// Path to the task file (default: facet.toml's `file`, else facet.json)
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show tasks under a perspective (default: inbox)
    List(ListArgs),
    /// Add a task
    Add(AddArgs),
    /// Toggle a task done
    Done {
        /// Task id
        id: i64,
    },
    /// Delete a task and its subtree
    Rm {
        /// Task id
        id: i64,
    },
    /// List projects
    Projects,
    /// Create a project
    AddProject {
        /// Project title
        title: String,
    },
    /// Delete a project; member tasks survive without it
    RmProject {
        /// Project title
        title: String,
    },
    /// List tags
    Tags,
}

#[derive(Debug, Default, Args)]
pub struct ListArgs {
    /// Every task, in canonical hierarchy
    #[arg(long, conflicts_with_all = ["inbox", "project", "tag", "due"])]
    pub all: bool,

    /// Tasks without a project (the default perspective)
    #[arg(long, conflicts_with_all = ["project", "tag", "due"])]
    pub inbox: bool,

    /// Tasks of one project, by title
    #[arg(long, conflicts_with_all = ["tag", "due"])]
    pub project: Option<String>,

    /// Tasks carrying one tag, by title
    #[arg(long, conflicts_with = "due")]
    pub tag: Option<String>,

    /// Tasks in a due bucket: past, future, today, or a day of the month
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,

    /// Nest the new task under this task id
    #[arg(long)]
    pub under: Option<i64>,

    /// Assign a project, by title
    #[arg(long)]
    pub project: Option<String>,

    /// Due date, YYYY-MM-DD
    #[arg(long)]
    pub due: Option<String>,
}
