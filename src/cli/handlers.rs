use std::env;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};

use crate::command::Gesture;
use crate::io::repository::JsonFileRepository;
use crate::model::{Config, DueBucket, DueFilter, Filter, Space, TaskId};
use crate::session::{Session, SessionError};
use crate::tree::Tree;

use super::commands::{AddArgs, Cli, Commands, ListArgs};
use super::output;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("unknown project: {0}")]
    UnknownProject(String),
    #[error("unknown tag: {0}")]
    UnknownTag(String),
    #[error("no task with id {0}")]
    UnknownTask(i64),
    #[error("invalid due perspective: {0} (expected past, future, today, or a day of the month)")]
    BadDueSpec(String),
    #[error("invalid date: {0} (expected YYYY-MM-DD)")]
    BadDate(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}

pub fn dispatch(cli: Cli) -> Result<(), CliError> {
    let repo = JsonFileRepository::new(data_file(&cli));
    match cli.command {
        None => list(repo, ListArgs::default()),
        Some(Commands::List(args)) => list(repo, args),
        Some(Commands::Add(args)) => add(repo, args),
        Some(Commands::Done { id }) => with_task(repo, id, Gesture::ToggleDone),
        Some(Commands::Rm { id }) => with_task(repo, id, Gesture::Delete),
        Some(Commands::Projects) => {
            let space = load(repo);
            for project in &space.projects {
                println!("{}", project.title);
            }
            Ok(())
        }
        Some(Commands::Tags) => {
            let space = load(repo);
            for tag in &space.tags {
                println!("{}", tag.title);
            }
            Ok(())
        }
        Some(Commands::AddProject { title }) => {
            let mut session = Session::new(Box::new(repo), Filter::All);
            session.send(Gesture::AddProject(title))?;
            Ok(())
        }
        Some(Commands::RmProject { title }) => {
            let mut session = Session::new(Box::new(repo), Filter::All);
            let project = session
                .space
                .project_by_title(&title)
                .ok_or(CliError::UnknownProject(title))?
                .id;
            session.send(Gesture::DeleteProject(project))?;
            Ok(())
        }
    }
}

fn data_file(cli: &Cli) -> PathBuf {
    if let Some(file) = &cli.file {
        return file.clone();
    }
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    Config::load(&cwd)
        .file
        .unwrap_or_else(|| PathBuf::from("facet.json"))
}

fn load(mut repo: JsonFileRepository) -> Space {
    use crate::io::repository::Repository;
    Space::from_snapshot(repo.load())
}

/// Listing never writes the data file back.
fn list(repo: JsonFileRepository, args: ListArgs) -> Result<(), CliError> {
    let space = load(repo);
    let filter = resolve_filter(&space, &args)?;
    let tree = Tree::build(&space, filter);
    print!("{}", output::outline(&space, &tree));
    Ok(())
}

fn resolve_filter(space: &Space, args: &ListArgs) -> Result<Filter, CliError> {
    if args.all {
        return Ok(Filter::All);
    }
    if let Some(name) = &args.project {
        let project = space
            .project_by_title(name)
            .ok_or_else(|| CliError::UnknownProject(name.clone()))?;
        return Ok(Filter::Project(project.id));
    }
    if let Some(name) = &args.tag {
        let tag = space
            .tag_by_title(name)
            .ok_or_else(|| CliError::UnknownTag(name.clone()))?;
        return Ok(Filter::Tag(tag.id));
    }
    if let Some(spec) = &args.due {
        return Ok(Filter::Due(parse_due_spec(spec)?));
    }
    Ok(Filter::Inbox)
}

fn parse_due_spec(spec: &str) -> Result<DueFilter, CliError> {
    let today = Local::now().date_naive();
    match spec {
        "past" => Ok(DueFilter::anchored(DueBucket::Past, today)),
        "future" => Ok(DueFilter::anchored(DueBucket::Future, today)),
        "today" => Ok(DueFilter::containing(today, today)),
        day => day
            .parse::<u32>()
            .ok()
            .filter(|d| (1..=31).contains(d))
            .map(|d| DueFilter::anchored(DueBucket::Day(d), today))
            .ok_or_else(|| CliError::BadDueSpec(spec.to_string())),
    }
}

fn add(repo: JsonFileRepository, args: AddArgs) -> Result<(), CliError> {
    let mut session = Session::new(Box::new(repo), Filter::All);

    let project = match &args.project {
        Some(name) => Some(
            session
                .space
                .project_by_title(name)
                .ok_or_else(|| CliError::UnknownProject(name.clone()))?
                .id,
        ),
        None => None,
    };
    let due = match &args.due {
        Some(text) => Some(
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|_| CliError::BadDate(text.clone()))?,
        ),
        None => None,
    };

    match args.under {
        Some(under) => {
            let under = TaskId(under);
            if !session.space.contains(under) {
                return Err(CliError::UnknownTask(under.0));
            }
            session.send(Gesture::Select(under))?;
            session.send(Gesture::Insert)?;
            // A childless target gets the new task as its next sibling;
            // indenting tucks it underneath
            let node = session.perspective.current;
            let parent_task = node
                .and_then(|n| session.perspective.tree.parent(n))
                .and_then(|p| session.perspective.tree.task_id(p));
            if parent_task != Some(under) {
                session.send(Gesture::Indent)?;
            }
        }
        None => {
            // No target: insert at the top of the list
            session.perspective.current = None;
            session.send(Gesture::Insert)?;
        }
    }

    session.perspective.set_title(&mut session.space, args.title.as_str());
    if project.is_some() {
        session.send(Gesture::SetProject(project))?;
    }
    if due.is_some() {
        session.send(Gesture::SetDue(due))?;
    }
    session.send(Gesture::ToggleEditMode)?;

    if let Some(id) = session.perspective.current_task_id() {
        println!("added {}", id.0);
    }
    Ok(())
}

fn with_task(repo: JsonFileRepository, id: i64, gesture: Gesture) -> Result<(), CliError> {
    let mut session = Session::new(Box::new(repo), Filter::All);
    let id = TaskId(id);
    if !session.space.contains(id) {
        return Err(CliError::UnknownTask(id.0));
    }
    session.send(Gesture::Select(id))?;
    session.send(gesture)?;
    Ok(())
}
