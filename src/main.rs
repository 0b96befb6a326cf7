//! Waypoint CLI - a curriculum runner for self-paced courses.

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use waypoint::cli::{Cli, Commands, CourseCommands, LessonCommands, ProgressCommands, TaskCommands};
use waypoint::commands::{self, Output};
use waypoint::config::Config;
use waypoint::storage::Storage;

fn main() {
    // Logs go to stderr so JSON on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let human = cli.human_readable;

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable config");
            Config::default()
        }
    };

    if let Err(e) = run_command(cli, &config) {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!(r#"{{"error": "{}"}}"#, e);
        }
        process::exit(1);
    }
}

fn run_command(cli: Cli, config: &Config) -> Result<(), waypoint::Error> {
    let human = cli.human_readable;
    let admin = cli.admin || config.admin;

    match cli.command {
        Commands::Course { command } => match command {
            CourseCommands::Import { file } => {
                let result = commands::course_import(&file, cli.project)?;
                output(&result, human);
            }
            CourseCommands::Show => {
                let storage = open_storage(cli.project, config)?;
                let result = commands::course_show(&storage, admin)?;
                output(&result, human);
            }
        },

        Commands::Lesson { command } => match command {
            LessonCommands::Select { lesson, step } => {
                let mut storage = open_storage(cli.project, config)?;
                let result = commands::lesson_select(&mut storage, &lesson, step, admin)?;
                output(&result, human);
            }
            LessonCommands::Show => {
                let storage = open_storage(cli.project, config)?;
                let result = commands::lesson_show(&storage)?;
                output(&result, human);
            }
        },

        Commands::Next => {
            let mut storage = open_storage(cli.project, config)?;
            let result = commands::step_next(&mut storage)?;
            output(&result, human);
        }

        Commands::Prev => {
            let mut storage = open_storage(cli.project, config)?;
            let result = commands::step_prev(&mut storage)?;
            output(&result, human);
        }

        Commands::Goto { index } => {
            let mut storage = open_storage(cli.project, config)?;
            let result = commands::step_goto(&mut storage, index)?;
            output(&result, human);
        }

        Commands::Task { command } => match command {
            TaskCommands::List { lesson } => {
                let storage = open_storage(cli.project, config)?;
                let result = commands::task_list(&storage, lesson.as_deref())?;
                output(&result, human);
            }
            TaskCommands::Approve { id } => {
                let mut storage = open_storage(cli.project, config)?;
                let result = commands::task_approve(&mut storage, &id)?;
                output(&result, human);
            }
            TaskCommands::Reopen { id } => {
                let mut storage = open_storage(cli.project, config)?;
                let result = commands::task_reopen(&mut storage, &id)?;
                output(&result, human);
            }
        },

        Commands::Progress { command } => match command {
            ProgressCommands::Show => {
                let storage = open_storage(cli.project, config)?;
                let result = commands::progress_show(&storage)?;
                output(&result, human);
            }
            ProgressCommands::Reset { lesson } => {
                let mut storage = open_storage(cli.project, config)?;
                let result = commands::progress_reset(&mut storage, &lesson)?;
                output(&result, human);
            }
        },
    }

    Ok(())
}

/// Open storage for the resolved project.
fn open_storage(project: Option<String>, config: &Config) -> Result<Storage, waypoint::Error> {
    let project = commands::resolve_project(project, config)?;
    Storage::open(&project)
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
